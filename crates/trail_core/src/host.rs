//! Seams to the host world: who is online, how a point is drawn, how an
//! agent is told something. All calls are expected to return quickly.

use crate::effect::DisplayEffect;
use crate::error::RenderError;
use crate::proximity::Notification;
use crate::types::{AgentId, SpatialPoint};

/// Enumerates agents currently connected to the world.
pub trait AgentRoster: Send + Sync {
    fn online_agents(&self) -> Vec<AgentId>;
}

/// Draws a single point, visible only to one agent.
pub trait EffectRenderer: Send + Sync {
    fn render_point(
        &self,
        agent: AgentId,
        point: &SpatialPoint,
        effect: DisplayEffect,
    ) -> Result<(), RenderError>;
}

/// Delivers status lines to an agent.
pub trait AgentMessenger: Send + Sync {
    fn send_notification(&self, agent: AgentId, notification: &Notification);
}

/// Everything the tracker needs from its host.
pub trait WorldHost: AgentRoster + EffectRenderer + AgentMessenger {}

impl<T> WorldHost for T where T: AgentRoster + EffectRenderer + AgentMessenger {}
