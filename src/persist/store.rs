//! Save-slot blob storage on disk

use std::io;
use std::path::{Path, PathBuf};

/// File extension for save slots.
pub const SLOT_EXTENSION: &str = "strata";

/// Directory of save slots. Each slot holds one LZ4-compressed save buffer.
#[derive(Clone, Debug)]
pub struct SaveStore {
    base_dir: PathBuf,
}

impl SaveStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the file path for a slot
    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", slot, SLOT_EXTENSION))
    }

    /// Compress and write a save buffer, replacing any previous content.
    pub async fn save(&self, slot: &str, buffer: &[u8]) -> Result<(), io::Error> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let compressed = compress(buffer);
        let path = self.slot_path(slot);
        tokio::fs::write(&path, &compressed).await?;

        log::info!(
            "Saved slot '{}': {} bytes -> {} bytes",
            slot,
            buffer.len(),
            compressed.len()
        );
        Ok(())
    }

    /// Read a slot back, `None` if it has never been saved.
    pub async fn load(&self, slot: &str) -> Result<Option<Vec<u8>>, io::Error> {
        let path = self.slot_path(slot);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let compressed = tokio::fs::read(&path).await?;
        decompress(&compressed).map(Some)
    }

    /// Delete a slot if present.
    pub async fn delete(&self, slot: &str) -> Result<(), io::Error> {
        let path = self.slot_path(slot);
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    /// Check if a slot exists
    pub async fn exists(&self, slot: &str) -> bool {
        tokio::fs::try_exists(self.slot_path(slot)).await.unwrap_or(false)
    }
}

/// Compress a save buffer with LZ4, size-prefixed.
pub fn compress(buffer: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(buffer)
}

/// Undo [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, io::Error> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("LZ4 decompression failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_path() {
        let store = SaveStore::new("/tmp/saves");
        assert_eq!(store.slot_path("quick"), PathBuf::from("/tmp/saves/quick.strata"));
    }

    #[test]
    fn test_compress_roundtrip() {
        let buffer: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        let compressed = compress(&buffer);
        assert!(compressed.len() < buffer.len());
        assert_eq!(decompress(&compressed).expect("decompress"), buffer);
    }

    #[test]
    fn test_decompress_garbage() {
        assert!(decompress(&[16, 0, 0, 0, 0xff]).is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SaveStore::new(dir.path().join("saves"));
        let buffer = vec![1u8, 2, 3, 4, 5, 6, 7, 8];

        store.save("slot_a", &buffer).await.expect("save");
        assert!(store.exists("slot_a").await);

        let loaded = store.load("slot_a").await.expect("load").expect("present");
        assert_eq!(loaded, buffer);

        store.delete("slot_a").await.expect("delete");
        assert!(!store.exists("slot_a").await);
    }

    #[tokio::test]
    async fn test_load_missing_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SaveStore::new(dir.path());
        assert!(store.load("nothing").await.expect("load").is_none());
    }
}
