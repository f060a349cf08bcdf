use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ControlChannel, ControlError};
use crate::models::control::ControlState;

/// Control flags stored as a small JSON document shared with the control surface.
#[derive(Debug, Clone)]
pub struct FileControlChannel {
    path: PathBuf,
}

impl FileControlChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets `stop` while keeping the other flags. Used by the Ctrl-C handler.
    pub async fn request_stop(&self) -> Result<(), ControlError> {
        let mut state = self.state().await;
        state.stop = true;
        self.write(state).await
    }

    async fn write(&self, state: ControlState) -> Result<(), ControlError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &state))
            .await
            .map_err(|e| ControlError::Io(std::io::Error::other(e)))?
    }
}

/// Temp file in the same directory, then rename, so readers never see a torn document.
fn write_atomically(path: &Path, state: &ControlState) -> Result<(), ControlError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, state)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[async_trait]
impl ControlChannel for FileControlChannel {
    async fn state(&self) -> ControlState {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Ignoring unreadable control file {}: {}", self.path.display(), e);
                ControlState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ControlState::default(),
            Err(e) => {
                warn!("Cannot read control file {}: {}", self.path.display(), e);
                ControlState::default()
            }
        }
    }

    async fn reset(&self) -> Result<(), ControlError> {
        debug!("Resetting control file {}", self.path.display());
        let mut state = self.state().await;
        state.pause = false;
        state.stop = false;
        self.write(state).await
    }
}
