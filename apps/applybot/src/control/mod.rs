//! Control channel: the operator's pause/stop/alternate-mode flags.
//!
//! The engine never caches these. Every `poll` is a fresh read because the writer lives in
//! another process. `ControlGate` turns polls into the engine's checkpoint semantics: return
//! on Run, block on Pause, unwind on Stop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::errors::EngineError;
use crate::models::control::ControlState;

pub mod file;

pub use file::FileControlChannel;

/// Re-poll interval while paused.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Control file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Control file serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Control file write failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Run,
    Pause,
    Stop,
}

impl From<ControlState> for ControlSignal {
    fn from(state: ControlState) -> Self {
        if state.stop {
            ControlSignal::Stop
        } else if state.pause {
            ControlSignal::Pause
        } else {
            ControlSignal::Run
        }
    }
}

#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Current flags. Unreadable state reads as all-false.
    async fn state(&self) -> ControlState;

    /// Clears every flag at the start of a run.
    async fn reset(&self) -> Result<(), ControlError>;

    async fn poll(&self) -> ControlSignal {
        self.state().await.into()
    }
}

/// Checkpoint helper wrapped around a `ControlChannel`.
#[derive(Clone)]
pub struct ControlGate {
    channel: Arc<dyn ControlChannel>,
}

impl ControlGate {
    pub fn new(channel: Arc<dyn ControlChannel>) -> Self {
        Self { channel }
    }

    /// Returns once the channel says Run; `Err(Stopped)` on Stop. Pause blocks here,
    /// re-polling every `POLL_INTERVAL`, so the caller resumes exactly where it was.
    pub async fn checkpoint(&self) -> Result<(), EngineError> {
        let mut paused = false;
        loop {
            match self.channel.poll().await {
                ControlSignal::Run => {
                    if paused {
                        info!("Resumed");
                    }
                    return Ok(());
                }
                ControlSignal::Stop => {
                    info!("Stop requested, winding down");
                    return Err(EngineError::Stopped);
                }
                ControlSignal::Pause => {
                    if !paused {
                        info!("Paused, waiting for resume");
                        paused = true;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }

    /// Non-blocking stop check for long waits that slice themselves.
    pub async fn stop_requested(&self) -> bool {
        self.channel.poll().await == ControlSignal::Stop
    }

    /// Read once per search cycle.
    pub async fn alternate_mode(&self) -> bool {
        self.channel.state().await.alternate_mode
    }

    pub async fn reset(&self) -> Result<(), ControlError> {
        self.channel.reset().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_helpers::InMemoryControl;

    #[test]
    fn test_stop_wins_over_pause() {
        let state = ControlState {
            stop: true,
            pause: true,
            alternate_mode: false,
        };
        assert_eq!(ControlSignal::from(state), ControlSignal::Stop);
        assert_eq!(ControlSignal::from(ControlState::default()), ControlSignal::Run);
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_blocks_while_paused_then_resumes() {
        let control = Arc::new(InMemoryControl::default());
        control.set_pause(true);
        let gate = ControlGate::new(control.clone());

        let flipper = {
            let control = control.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3)).await;
                control.set_pause(false);
            })
        };

        let started = tokio::time::Instant::now();
        gate.checkpoint().await.unwrap();
        flipper.await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
        // Polled repeatedly at the sub-second interval while paused.
        assert!(control.polls() >= 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_pause_unwinds() {
        let control = Arc::new(InMemoryControl::default());
        control.set_pause(true);
        let gate = ControlGate::new(control.clone());

        let stopper = {
            let control = control.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                control.set_stop(true);
            })
        };

        let result = gate.checkpoint().await;
        stopper.await.unwrap();
        assert!(matches!(result, Err(EngineError::Stopped)));
    }

    #[tokio::test]
    async fn test_alternate_mode_reads_fresh_state() {
        let control = Arc::new(InMemoryControl::default());
        let gate = ControlGate::new(control.clone());
        assert!(!gate.alternate_mode().await);
        control.set_alternate_mode(true);
        assert!(gate.alternate_mode().await);
    }
}
