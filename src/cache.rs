//! On-disk cache for Whisper transcription results, keyed by video ID.
//!
//! The store is a trait so the fallback chain can run against an in-memory
//! implementation in tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::Result;
use crate::transcript::TranscribedAudio;

pub trait TranscriptionStore: Send + Sync {
    fn get(&self, video_id: &str) -> Result<Option<TranscribedAudio>>;
    fn put(&self, video_id: &str, value: &TranscribedAudio) -> Result<()>;
}

/// Stores each transcription as `{dir}/{video_id}.json`.
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, video_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", video_id))
    }
}

impl TranscriptionStore for DiskStore {
    fn get(&self, video_id: &str) -> Result<Option<TranscribedAudio>> {
        let path = self.path(video_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(value) => {
                debug!("Transcription cache hit: {}", path.display());
                Ok(Some(value))
            }
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn put(&self, video_id: &str, value: &TranscribedAudio) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(self.path(video_id), content)?;
        Ok(())
    }
}

/// In-memory store for tests.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, TranscribedAudio>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptionStore for MemoryStore {
    fn get(&self, video_id: &str) -> Result<Option<TranscribedAudio>> {
        Ok(self.entries.lock().unwrap().get(video_id).cloned())
    }

    fn put(&self, video_id: &str, value: &TranscribedAudio) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(video_id.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptSegment;

    fn sample() -> TranscribedAudio {
        TranscribedAudio {
            language: "en".to_string(),
            segments: vec![TranscriptSegment::new(0.0, 1.0, "hi")],
        }
    }

    #[test]
    fn disk_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());

        assert!(store.get("vid1").unwrap().is_none());
        store.put("vid1", &sample()).unwrap();

        let loaded = store.get("vid1").unwrap().unwrap();
        assert_eq!(loaded.language, "en");
        assert_eq!(loaded.segments.len(), 1);
        assert_eq!(loaded.segments[0].text, "hi");
    }

    #[test]
    fn disk_store_ignores_corrupt_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        std::fs::write(dir.path().join("vid1.json"), "not json").unwrap();
        assert!(store.get("vid1").unwrap().is_none());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.put("vid1", &sample()).unwrap();
        assert!(store.get("vid1").unwrap().is_some());
        assert!(store.get("vid2").unwrap().is_none());
    }
}
