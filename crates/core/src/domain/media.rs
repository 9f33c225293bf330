//! Remote media command interface
//!
//! Commands travel to a remote content surface as JSON
//! (`{"action": "rewindStream", "seconds": 15.0}`) and come back as
//! `{"success": bool, "message": String}`. Delivery reliability is the
//! transport's problem; this module only pins the wire format, bounds every
//! command with a timeout, and tracks the last action status.
//!
//! [`MediaDeck`] is a reference surface holding its own playback state,
//! used by integration tests and the CLI demo.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Default skip amount for rewind/forward, in seconds
pub const DEFAULT_SKIP_SECONDS: f64 = 15.0;

/// Deadline for a remote command round trip
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

fn default_skip() -> f64 {
    DEFAULT_SKIP_SECONDS
}

/// A command for the remote content surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MediaCommand {
    PauseStream,
    ResumeStream,
    RewindStream {
        #[serde(default = "default_skip")]
        seconds: f64,
    },
    ForwardStream {
        #[serde(default = "default_skip")]
        seconds: f64,
    },
    RestartStream,
    GetMediaStatus,
}

impl MediaCommand {
    /// Wire name of the command
    pub fn action(&self) -> &'static str {
        match self {
            MediaCommand::PauseStream => "pauseStream",
            MediaCommand::ResumeStream => "resumeStream",
            MediaCommand::RewindStream { .. } => "rewindStream",
            MediaCommand::ForwardStream { .. } => "forwardStream",
            MediaCommand::RestartStream => "restartStream",
            MediaCommand::GetMediaStatus => "getMediaStatus",
        }
    }
}

/// Reply from the remote surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    pub message: String,
}

impl CommandReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Playback status snapshot, serialized into `getMediaStatus` replies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatus {
    pub playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub can_seek: bool,
}

/// Outcome of the most recent command, for UI display
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStatus {
    pub action: String,
    pub success: bool,
    pub message: String,
}

/// Delivery mechanism for media commands
///
/// Implementations are free to drop, delay, or fail commands; the
/// controller above them converts everything into a [`CommandReply`].
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn deliver(&self, command: MediaCommand) -> CommandReply;
}

/// Timeout-bounded command dispatcher over a [`MediaTransport`]
pub struct MediaController<T: MediaTransport> {
    transport: T,
    timeout: Duration,
    last_action: Mutex<Option<ActionStatus>>,
}

impl<T: MediaTransport> MediaController<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, COMMAND_TIMEOUT)
    }

    pub fn with_timeout(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            last_action: Mutex::new(None),
        }
    }

    /// Send a command, bounded by the controller timeout. Timeouts surface
    /// as a failed reply, never as an error; there is no automatic retry.
    pub async fn send(&self, command: MediaCommand) -> CommandReply {
        let action = command.action();
        let reply = match tokio::time::timeout(self.timeout, self.transport.deliver(command)).await
        {
            Ok(reply) => reply,
            Err(_) => {
                warn!(action, timeout_ms = self.timeout.as_millis() as u64, "media command timed out");
                CommandReply::failed("Command timed out")
            }
        };
        debug!(action, success = reply.success, "media command completed");
        self.record(action, &reply);
        reply
    }

    pub async fn pause(&self) -> bool {
        self.send(MediaCommand::PauseStream).await.success
    }

    pub async fn resume(&self) -> bool {
        self.send(MediaCommand::ResumeStream).await.success
    }

    /// Rewind by `seconds`, defaulting to [`DEFAULT_SKIP_SECONDS`]
    pub async fn rewind(&self, seconds: Option<f64>) -> bool {
        self.send(MediaCommand::RewindStream {
            seconds: seconds.unwrap_or(DEFAULT_SKIP_SECONDS),
        })
        .await
        .success
    }

    /// Fast-forward by `seconds`, defaulting to [`DEFAULT_SKIP_SECONDS`]
    pub async fn forward(&self, seconds: Option<f64>) -> bool {
        self.send(MediaCommand::ForwardStream {
            seconds: seconds.unwrap_or(DEFAULT_SKIP_SECONDS),
        })
        .await
        .success
    }

    pub async fn restart(&self) -> bool {
        self.send(MediaCommand::RestartStream).await.success
    }

    /// Query playback status. `None` when the command failed or the reply
    /// did not carry a parsable status.
    pub async fn status(&self) -> Option<MediaStatus> {
        let reply = self.send(MediaCommand::GetMediaStatus).await;
        if !reply.success {
            return None;
        }
        serde_json::from_str(&reply.message).ok()
    }

    /// The most recent command outcome
    pub fn last_action(&self) -> Option<ActionStatus> {
        self.last_action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, action: &str, reply: &CommandReply) {
        *self
            .last_action
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(ActionStatus {
            action: action.to_string(),
            success: reply.success,
            message: reply.message.clone(),
        });
    }
}

#[derive(Debug, Clone, Copy)]
struct DeckState {
    playing: bool,
    position: f64,
    duration: f64,
    can_seek: bool,
}

/// Reference media surface with its own playback state
///
/// Applies commands the way the remote content surface does: pause/resume
/// toggle playback, seeks clamp to `[0, duration]`, restart returns to
/// zero, and status serializes a snapshot into the reply message.
pub struct MediaDeck {
    state: Mutex<DeckState>,
}

impl MediaDeck {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            state: Mutex::new(DeckState {
                playing: true,
                position: 0.0,
                duration: duration_secs,
                can_seek: true,
            }),
        }
    }

    /// A deck whose media cannot seek (live streams)
    pub fn unseekable(duration_secs: f64) -> Self {
        let deck = Self::new(duration_secs);
        deck.lock().can_seek = false;
        deck
    }

    pub fn status(&self) -> MediaStatus {
        let state = self.lock();
        MediaStatus {
            playing: state.playing,
            current_time: state.position,
            duration: state.duration,
            can_seek: state.can_seek,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeckState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn seek(state: &mut DeckState, target: f64) -> bool {
        if !state.can_seek {
            return false;
        }
        state.position = target.clamp(0.0, state.duration);
        true
    }
}

#[async_trait]
impl MediaTransport for MediaDeck {
    async fn deliver(&self, command: MediaCommand) -> CommandReply {
        let mut state = self.lock();
        match command {
            MediaCommand::PauseStream => {
                if state.playing {
                    state.playing = false;
                    CommandReply::ok("Media paused")
                } else {
                    CommandReply::ok("Media already paused")
                }
            }
            MediaCommand::ResumeStream => {
                if state.playing {
                    CommandReply::ok("Media already playing")
                } else {
                    state.playing = true;
                    CommandReply::ok("Media resumed")
                }
            }
            MediaCommand::RewindStream { seconds } => {
                let target = state.position - seconds;
                if Self::seek(&mut state, target) {
                    CommandReply::ok(format!("Rewound {seconds}s to {:.1}", state.position))
                } else {
                    CommandReply::failed("Failed to rewind")
                }
            }
            MediaCommand::ForwardStream { seconds } => {
                let target = state.position + seconds;
                if Self::seek(&mut state, target) {
                    CommandReply::ok(format!(
                        "Fast-forwarded {seconds}s to {:.1}",
                        state.position
                    ))
                } else {
                    CommandReply::failed("Failed to fast-forward")
                }
            }
            MediaCommand::RestartStream => {
                if Self::seek(&mut state, 0.0) {
                    CommandReply::ok("Media restarted")
                } else {
                    CommandReply::failed("Failed to restart")
                }
            }
            MediaCommand::GetMediaStatus => {
                let status = MediaStatus {
                    playing: state.playing,
                    current_time: state.position,
                    duration: state.duration,
                    can_seek: state.can_seek,
                };
                match serde_json::to_string(&status) {
                    Ok(json) => CommandReply::ok(json),
                    Err(e) => CommandReply::failed(format!("Error: {e}")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_names() {
        let json = serde_json::to_string(&MediaCommand::PauseStream).unwrap();
        assert_eq!(json, r#"{"action":"pauseStream"}"#);

        let json = serde_json::to_string(&MediaCommand::RewindStream { seconds: 15.0 }).unwrap();
        assert_eq!(json, r#"{"action":"rewindStream","seconds":15.0}"#);

        let json = serde_json::to_string(&MediaCommand::GetMediaStatus).unwrap();
        assert_eq!(json, r#"{"action":"getMediaStatus"}"#);
    }

    #[test]
    fn test_command_seconds_default_on_parse() {
        let command: MediaCommand = serde_json::from_str(r#"{"action":"forwardStream"}"#).unwrap();
        assert_eq!(
            command,
            MediaCommand::ForwardStream {
                seconds: DEFAULT_SKIP_SECONDS
            }
        );
    }

    #[test]
    fn test_status_wire_field_names() {
        let status = MediaStatus {
            playing: true,
            current_time: 12.5,
            duration: 60.0,
            can_seek: true,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"currentTime\":12.5"));
        assert!(json.contains("\"canSeek\":true"));

        let parsed: MediaStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }

    #[tokio::test]
    async fn test_deck_pause_resume() {
        let controller = MediaController::new(MediaDeck::new(60.0));

        assert!(controller.pause().await);
        assert!(!controller.status().await.unwrap().playing);

        assert!(controller.resume().await);
        assert!(controller.status().await.unwrap().playing);
    }

    #[tokio::test]
    async fn test_deck_seek_clamps() {
        let controller = MediaController::new(MediaDeck::new(60.0));

        controller.forward(Some(100.0)).await;
        assert_eq!(controller.status().await.unwrap().current_time, 60.0);

        controller.rewind(Some(500.0)).await;
        assert_eq!(controller.status().await.unwrap().current_time, 0.0);
    }

    #[tokio::test]
    async fn test_deck_default_skip() {
        let controller = MediaController::new(MediaDeck::new(60.0));

        controller.forward(None).await;
        assert_eq!(
            controller.status().await.unwrap().current_time,
            DEFAULT_SKIP_SECONDS
        );
    }

    #[tokio::test]
    async fn test_deck_restart() {
        let controller = MediaController::new(MediaDeck::new(60.0));
        controller.forward(Some(30.0)).await;

        assert!(controller.restart().await);
        assert_eq!(controller.status().await.unwrap().current_time, 0.0);
    }

    #[tokio::test]
    async fn test_unseekable_deck_fails_seeks() {
        let controller = MediaController::new(MediaDeck::unseekable(60.0));

        assert!(!controller.rewind(None).await);
        let last = controller.last_action().unwrap();
        assert_eq!(last.action, "rewindStream");
        assert!(!last.success);
    }

    struct NeverTransport;

    #[async_trait]
    impl MediaTransport for NeverTransport {
        async fn deliver(&self, _command: MediaCommand) -> CommandReply {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_failed_reply() {
        let controller =
            MediaController::with_timeout(NeverTransport, Duration::from_millis(20));

        let reply = controller.send(MediaCommand::PauseStream).await;
        assert!(!reply.success);
        assert_eq!(reply.message, "Command timed out");

        let last = controller.last_action().unwrap();
        assert_eq!(last.action, "pauseStream");
        assert!(!last.success);
    }
}
