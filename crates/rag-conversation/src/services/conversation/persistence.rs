use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::utils::error::{ConversationError, ConversationResult};

use super::types::ConversationSnapshot;

/// `conversation_<session_id>.json`
pub fn default_snapshot_path(session_id: &str) -> PathBuf {
    PathBuf::from(format!("conversation_{}.json", session_id))
}

/// Write a snapshot as pretty-printed UTF-8 JSON. Returns the path written.
pub fn save_snapshot(snapshot: &ConversationSnapshot, path: Option<&Path>) -> ConversationResult<PathBuf> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_snapshot_path(&snapshot.session_id));

    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| ConversationError::InvalidFormat(e.to_string()))?;
    fs::write(&path, json)?;

    info!(
        "Conversation {} saved to {} ({} exchanges)",
        snapshot.session_id,
        path.display(),
        snapshot.history.len()
    );
    Ok(path)
}

pub fn load_snapshot(path: &Path) -> ConversationResult<ConversationSnapshot> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| ConversationError::InvalidFormat(e.to_string()))
}
