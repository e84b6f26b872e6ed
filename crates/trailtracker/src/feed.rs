//! Newline-delimited JSON event feed.
//!
//! Each line is one host event: an agent joining or leaving, a movement
//! sample, or a path command. Commands answer with the same
//! success-flag-plus-message outcome a chat front would relay.
//!
//! ```text
//! {"event":"join","agent_id":"…","agent_name":"alex"}
//! {"event":"start","agent_id":"…","path":"river walk"}
//! {"event":"move","agent_id":"…","agent_name":"alex","from":{…},"to":{…}}
//! ```

use serde::Deserialize;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use trail_core::{AgentId, MovementSample, Outcome, TrailService};

use crate::host::HeadlessHost;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Join {
        agent_id: AgentId,
        agent_name: String,
    },
    Leave {
        agent_id: AgentId,
    },
    Move(MovementSample),
    Start {
        agent_id: AgentId,
        path: String,
    },
    Stop {
        agent_id: AgentId,
    },
    Remove {
        path: String,
    },
    Show {
        agent_id: AgentId,
        path: String,
    },
    Hide {
        agent_id: AgentId,
        path: String,
    },
    Describe {
        path: String,
        description: String,
    },
    SetRadius {
        path: String,
        radius: f64,
    },
    SetEffect {
        path: String,
        effect: String,
    },
    SetMaxPoints {
        path: String,
        max_points: usize,
    },
}

/// Applies one event. Returns the outcome for command events.
pub fn apply(service: &TrailService, host: &HeadlessHost, event: HostEvent) -> Option<Outcome> {
    let registry = service.registry();
    match event {
        HostEvent::Join {
            agent_id,
            agent_name,
        } => {
            host.join(agent_id, agent_name);
            None
        }
        HostEvent::Leave { agent_id } => {
            host.leave(agent_id);
            service.on_agent_disconnect(agent_id);
            None
        }
        HostEvent::Move(sample) => {
            service.handle_sample(&sample);
            None
        }
        HostEvent::Start { agent_id, path } => {
            let agent_name = host.name_of(agent_id).unwrap_or_else(|| agent_id.to_string());
            Some(match registry.start_recording(agent_id, &agent_name, &path) {
                Ok(_) => Outcome::ok(format!("Started recording path '{path}'.")),
                Err(e) => Outcome::failed(e.to_string()),
            })
        }
        HostEvent::Stop { agent_id } => Some(match registry.stop_recording(agent_id) {
            Ok(path) => Outcome::ok(format!("Stopped recording path '{path}'.")),
            Err(e) => Outcome::failed(e.to_string()),
        }),
        HostEvent::Remove { path } => Some(registry.remove_path(&path).into()),
        HostEvent::Show { agent_id, path } => Some(registry.show_path(agent_id, &path).into()),
        HostEvent::Hide { agent_id, path } => Some(registry.hide_path(agent_id, &path).into()),
        HostEvent::Describe { path, description } => {
            Some(registry.describe_path(&path, &description).into())
        }
        HostEvent::SetRadius { path, radius } => {
            Some(registry.set_detection_radius(&path, radius).into())
        }
        HostEvent::SetEffect { path, effect } => {
            Some(match registry.set_display_effect(&path, &effect) {
                Ok((applied, false)) => Outcome::ok(format!("Display effect set to {applied}.")),
                Ok((applied, true)) => Outcome::ok(format!(
                    "Effect '{effect}' is not supported, using {applied} instead."
                )),
                Err(e) => Outcome::failed(e.to_string()),
            })
        }
        HostEvent::SetMaxPoints { path, max_points } => {
            Some(registry.set_max_points(&path, max_points).into())
        }
    }
}

/// Lines buffered between the stdin reader thread and [`pump`].
pub const FEED_CAPACITY: usize = 256;

/// Starts a thread that forwards stdin lines to the returned channel.
///
/// Blocking reads stay on that thread, so an open stdin never holds up
/// runtime shutdown. The channel closes at end of input.
pub fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (lines, events) = mpsc::channel(FEED_CAPACITY);
    std::thread::Builder::new()
        .name("event-feed".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if lines.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Event feed read failed: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(events)
}

/// Applies events until the channel closes. Malformed lines are logged and
/// skipped. Returns the number of events applied.
pub async fn pump(
    mut events: mpsc::Receiver<String>,
    service: Arc<TrailService>,
    host: Arc<HeadlessHost>,
) -> usize {
    let mut applied = 0;

    while let Some(line) = events.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => {
                if let Some(outcome) = apply(&service, &host, event) {
                    if outcome.success {
                        info!("✅ {}", outcome.message);
                    } else {
                        warn!("❌ {}", outcome.message);
                    }
                }
                applied += 1;
            }
            Err(e) => warn!("Ignoring malformed event: {}", e),
        }
    }

    debug!("Event feed closed after {} events", applied);
    applied
}
