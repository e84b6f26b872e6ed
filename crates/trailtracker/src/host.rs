//! Headless world host.
//!
//! Tracks which agents are connected and turns render and notification
//! requests into log events, so the tracker can run without a game client
//! attached.

use dashmap::DashMap;
use tracing::{info, trace};
use trail_core::{
    AgentId, AgentMessenger, AgentRoster, DisplayEffect, EffectRenderer, Notification,
    RenderError, SpatialPoint,
};

#[derive(Debug, Default)]
pub struct HeadlessHost {
    /// Connected agents and their display names
    agents: DashMap<AgentId, String>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, agent: AgentId, name: impl Into<String>) {
        let name = name.into();
        info!("👋 {} ({}) joined", name, agent);
        self.agents.insert(agent, name);
    }

    /// Returns the display name of the agent that left.
    pub fn leave(&self, agent: AgentId) -> Option<String> {
        let (_, name) = self.agents.remove(&agent)?;
        info!("🚪 {} ({}) left", name, agent);
        Some(name)
    }

    pub fn name_of(&self, agent: AgentId) -> Option<String> {
        self.agents.get(&agent).map(|entry| entry.value().clone())
    }

    pub fn online_count(&self) -> usize {
        self.agents.len()
    }
}

impl AgentRoster for HeadlessHost {
    fn online_agents(&self) -> Vec<AgentId> {
        self.agents.iter().map(|entry| *entry.key()).collect()
    }
}

impl EffectRenderer for HeadlessHost {
    fn render_point(
        &self,
        agent: AgentId,
        point: &SpatialPoint,
        effect: DisplayEffect,
    ) -> Result<(), RenderError> {
        if !self.agents.contains_key(&agent) {
            return Err(RenderError::AgentGone);
        }
        if !effect.is_renderable() {
            return Err(RenderError::UnsupportedEffect(effect));
        }
        trace!(%agent, %point, %effect, "render");
        Ok(())
    }
}

impl AgentMessenger for HeadlessHost {
    fn send_notification(&self, agent: AgentId, notification: &Notification) {
        let name = self.name_of(agent).unwrap_or_else(|| agent.to_string());
        info!(target: "notifications", "💬 {}: {}", name, notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_follows_joins_and_leaves() {
        let host = HeadlessHost::new();
        let agent = AgentId::new();
        host.join(agent, "alex");
        assert_eq!(host.online_agents(), vec![agent]);
        assert_eq!(host.leave(agent), Some("alex".to_string()));
        assert!(host.online_agents().is_empty());
        assert_eq!(host.leave(agent), None);
    }

    #[test]
    fn test_render_rejections() {
        let host = HeadlessHost::new();
        let agent = AgentId::new();
        let point = SpatialPoint::new("overworld", 0.0, 0.0, 0.0);
        assert_eq!(
            host.render_point(agent, &point, DisplayEffect::Flame),
            Err(RenderError::AgentGone)
        );

        host.join(agent, "alex");
        assert!(host.render_point(agent, &point, DisplayEffect::Flame).is_ok());
        assert_eq!(
            host.render_point(agent, &point, DisplayEffect::Dust),
            Err(RenderError::UnsupportedEffect(DisplayEffect::Dust))
        );
    }
}
