use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use patrol_common::error::RepositoryError;
use patrol_common::inspection::{InspectionRecord, TimeRange};
use patrol_common::registry::InspectionStore;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Append-only inspection store backed by a JSON-lines file, one record per line.
///
/// A batch is written with a single `write_all`, serialized against other writers of the
/// same store. A torn last line left by an interrupted writer is terminated before the next
/// batch, so only the fragment is lost.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InspectionStore for JsonLinesStore {
    async fn add(&self, records: Vec<InspectionRecord>) -> Result<(), RepositoryError> {
        let mut payload = String::new();
        for record in &records {
            payload.push_str(&serde_json::to_string(record)?);
            payload.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        if ends_mid_line(&mut file).await? {
            warn!(path = %self.path.display(), "terminating a torn record before appending");
            payload.insert(0, '\n');
        }
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), count = records.len(), "records appended");
        Ok(())
    }

    async fn query(&self, range: TimeRange) -> Result<Vec<InspectionRecord>, RepositoryError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<InspectionRecord>(line) {
                Ok(record) if range.contains(&record.timestamp) => records.push(record),
                Ok(_) => {}
                // A torn trailing line from an interrupted writer must not hide the rest.
                Err(e) => warn!(path = %self.path.display(), line = lineno + 1, "skipping unreadable record: {e}"),
            }
        }
        Ok(records)
    }
}

async fn ends_mid_line(file: &mut File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}
