//! Snapshot persistence for the in-memory grid store.
//!
//! A snapshot is a point-in-time copy of every cell. Files start with a magic
//! string and a format version, followed by a bincode body. Saves go to a
//! temporary file that then replaces the previous snapshot atomically.

use crate::error::{GridError, Result};
use gridcrawl_types::cell::Cell;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const SNAPSHOT_MAGIC: &[u8] = b"GRIDCRAWL_SNAPSHOT";
const SNAPSHOT_VERSION: u8 = 2;

/// Persisted store contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Next id the store will hand out
    pub next_id: u64,
    pub cells: Vec<Cell>,
}

pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<SnapshotData> {
        if !self.exists() {
            return Ok(SnapshotData::default());
        }

        let file = File::open(&self.path)?;
        if file.metadata()?.len() == 0 {
            return Ok(SnapshotData::default());
        }

        let mut reader = BufReader::new(file);

        let mut magic = vec![0u8; SNAPSHOT_MAGIC.len()];
        reader.read_exact(&mut magic)?;
        if magic != SNAPSHOT_MAGIC {
            return Err(GridError::InvalidFormat);
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(GridError::InvalidFormat);
        }

        Ok(bincode::deserialize_from(&mut reader)?)
    }

    pub fn save(&self, data: &SnapshotData) -> Result<()> {
        let temp_path = self.temp_path();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&[SNAPSHOT_VERSION])?;
        bincode::serialize_into(&mut writer, data)?;

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&temp_path, &self.path)?;
        self.sync_parent_dir()?;

        log::debug!(
            "Wrote snapshot of {} cells to {}",
            data.cells.len(),
            self.path.display()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        if let Some(name) = temp.file_name() {
            let mut new_name = name.to_string_lossy().into_owned();
            new_name.push_str(".tmp");
            temp.set_file_name(new_name);
        }
        temp
    }

    fn sync_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if parent.as_os_str().is_empty() {
                return Ok(());
            }
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcrawl_types::cell::{CellId, CrawlProgress};
    use gridcrawl_types::geo::Point;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(dir.path().join("grid.snap"));
        assert!(!snapshot.exists());
        assert_eq!(snapshot.load().unwrap(), SnapshotData::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(dir.path().join("grid.snap"));

        let mut cell = Cell::new(CellId(3), "BEL", Point::new(4.35, 50.85), 2_500.0, 1);
        cell.crawl_progress = Some(CrawlProgress {
            current_page: 1,
            next_page_token: Some("token".into()),
            total_results: 20,
        });
        let data = SnapshotData {
            next_id: 4,
            cells: vec![cell],
        };

        snapshot.save(&data).unwrap();
        assert!(snapshot.exists());
        assert!(!dir.path().join("grid.snap.tmp").exists());
        assert_eq!(snapshot.load().unwrap(), data);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grid.snap");
        std::fs::write(&path, b"NOT_A_GRID_SNAPSHOT_AT_ALL").unwrap();

        let result = SnapshotFile::new(&path).load();
        assert!(matches!(result, Err(GridError::InvalidFormat)));
    }
}
