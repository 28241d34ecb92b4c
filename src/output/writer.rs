//! Incremental JSON artifact
//!
//! The artifact is a JSON array of every record accepted so far. It is
//! rewritten in full after each record through a temporary file in the same
//! directory that is then renamed over the target, so readers only ever see
//! a complete array.

use crate::crawler::CampaignRecord;
use crate::output::OutputResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Accumulates records and keeps the artifact in sync with them
pub struct IncrementalWriter {
    path: PathBuf,
    records: Vec<CampaignRecord>,
}

impl IncrementalWriter {
    /// Creates a writer for `path`
    ///
    /// Nothing is written until the first [`push`](Self::push) or
    /// [`finish`](Self::finish).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record and rewrites the artifact
    ///
    /// The record stays in the in-memory collection even if the write
    /// fails, so the next successful write still contains it.
    pub fn push(&mut self, record: CampaignRecord) -> OutputResult<()> {
        self.records.push(record);
        self.flush()
    }

    /// Writes the final artifact, even when no record was accepted
    pub fn finish(&self) -> OutputResult<()> {
        self.flush()
    }

    fn flush(&self) -> OutputResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.records)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        debug!("Wrote {} records to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::campaign_record;
    use tempfile::TempDir;

    fn read_back(path: &Path) -> Vec<CampaignRecord> {
        let content = std::fs::read_to_string(path).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_artifact_reflects_every_push_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("paraf.json");
        let mut writer = IncrementalWriter::new(&path);

        writer.push(campaign_record("https://x/1", "Bir")).unwrap();
        assert_eq!(read_back(&path).len(), 1);

        writer.push(campaign_record("https://x/2", "İki")).unwrap();
        writer.push(campaign_record("https://x/3", "Üç")).unwrap();

        let stored = read_back(&path);
        let urls: Vec<&str> = stored.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x/1", "https://x/2", "https://x/3"]);
        assert_eq!(writer.len(), stored.len());
    }

    #[test]
    fn test_finish_writes_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bos.json");
        let writer = IncrementalWriter::new(&path);

        writer.finish().unwrap();

        assert!(writer.is_empty());
        assert!(read_back(&path).is_empty());
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("kampanyalar.json");
        let mut writer = IncrementalWriter::new(&path);

        writer.push(campaign_record("https://x/1", "Bir")).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_null_image_serializes_as_null() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let mut writer = IncrementalWriter::new(&path);
        let mut record = campaign_record("https://x/1", "Bir");
        record.image = None;

        writer.push(record).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw[0]["image"].is_null());
        assert_eq!(raw[0]["detail_html"], "<p>Kampanya koşulları</p>");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let mut writer = IncrementalWriter::new(&path);

        writer.push(campaign_record("https://x/1", "Bir")).unwrap();
        writer.push(campaign_record("https://x/2", "İki")).unwrap();

        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
