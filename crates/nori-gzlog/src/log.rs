//! High-level log API.
//!
//! A [`GzLog`] is bound to one file path. Writes append a compressed frame
//! under an exclusive `flock`; rotation takes the same lock and renames the
//! live file to the next numbered archive.

use crate::codec::{CodecError, Compression};
use crate::frame::{self, FrameError};
use crate::lock::FileLock;
use crate::naming;
use crate::observe::{LogEvt, LogKind, Meter, NoopMeter};
use crate::reader::{LogReader, ReverseReader};
use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Log path has no UTF-8 file name: {0}")]
    InvalidPath(PathBuf),
    #[error("Archive sequence numbers exhausted")]
    SequenceExhausted,
}

/// Fsync policy for durability vs performance tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FsyncPolicy {
    /// Fsync after every append, before the lock is released.
    Always,
    /// Fsync at most once per the specified window.
    Batch(Duration),
    /// Let the OS handle flushing.
    #[default]
    Os,
}

/// Configuration for a log.
#[derive(Debug, Clone)]
pub struct GzLogConfig {
    /// Live file the log starts out bound to.
    pub path: PathBuf,
    /// Codec applied to every record (default: zlib level 2).
    pub compression: Compression,
    /// Fsync policy for appends (default: OS).
    pub fsync_policy: FsyncPolicy,
}

impl Default for GzLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("events.log"),
            compression: Compression::default(),
            fsync_policy: FsyncPolicy::default(),
        }
    }
}

/// Append-only compressed record log with numbered rotation.
///
/// # Example
///
/// ```no_run
/// use nori_gzlog::GzLog;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let log = GzLog::new("audit.log");
///
///     log.write(b"user=42 action=login").await?;
///
///     let mut reader = log.read(0).await?;
///     while let Some(record) = reader.next_record().await? {
///         println!("{} bytes", record.len());
///     }
///
///     // audit.log -> audit.log.001
///     log.rotate().await?;
///     Ok(())
/// }
/// ```
pub struct GzLog {
    name: RwLock<PathBuf>,
    config: GzLogConfig,
    meter: Arc<dyn Meter>,
    last_fsync: Mutex<Option<Instant>>,
}

impl GzLog {
    /// Binds a log to `path` with default settings. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(GzLogConfig {
            path: path.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: GzLogConfig) -> Self {
        Self::with_meter(config, Arc::new(NoopMeter))
    }

    /// Creates a log with a custom observability meter.
    pub fn with_meter(config: GzLogConfig, meter: Arc<dyn Meter>) -> Self {
        Self {
            name: RwLock::new(config.path.clone()),
            config,
            meter,
            last_fsync: Mutex::new(None),
        }
    }

    /// Returns the file the log currently targets.
    pub async fn path(&self) -> PathBuf {
        self.name.read().await.clone()
    }

    /// Returns the log configuration.
    pub fn config(&self) -> &GzLogConfig {
        &self.config
    }

    /// Compresses `record` and appends it as one frame.
    ///
    /// Creates the file if it does not exist. Nothing is written if the
    /// compressed record does not fit the 32-bit length field.
    pub async fn write(&self, record: &[u8]) -> Result<(), LogError> {
        let payload = self.config.compression.compress(record)?;
        let frame = frame::encode(&payload)?;
        let bytes = frame.len() as u64;

        let sync = self.should_sync().await;

        // Rotation cannot rename the file while this guard is held.
        let name = self.name.read().await;
        let path = name.clone();
        let fsync_ms = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || append_frame(&path, &frame, sync))
                .await
                .map_err(io::Error::other)??
        };
        drop(name);

        tracing::trace!(path = %path.display(), bytes, "appended frame");
        self.meter.emit(LogEvt {
            path: path.clone(),
            kind: LogKind::Append { bytes },
        });
        if let Some(ms) = fsync_ms {
            self.meter.emit(LogEvt {
                path,
                kind: LogKind::Fsync { ms },
            });
        }

        Ok(())
    }

    /// Opens a fresh cursor over the current file, skipping the first `skip`
    /// records without decompressing them.
    pub async fn read(&self, skip: usize) -> Result<LogReader, LogError> {
        let path = self.path().await;
        LogReader::open(&path, self.config.compression, skip).await
    }

    /// Collects every record after the first `skip`.
    pub async fn read_all(&self, skip: usize) -> Result<Vec<Bytes>, LogError> {
        let mut reader = self.read(skip).await?;
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Opens a cursor yielding records newest-first.
    pub async fn read_rev(&self) -> Result<ReverseReader, LogError> {
        let path = self.path().await;
        ReverseReader::open(&path, self.config.compression).await
    }

    /// Renames the live file to the next numbered archive and retargets the
    /// log at it.
    ///
    /// Returns the archive path, or `None` if the log already targets an
    /// archive, in which case nothing happens.
    pub async fn rotate(&self) -> Result<Option<PathBuf>, LogError> {
        let mut name = self.name.write().await;
        if naming::is_archived(&name) {
            tracing::debug!(path = %name.display(), "log already rotated");
            return Ok(None);
        }

        let live = name.clone();
        let archive = tokio::task::spawn_blocking(move || rotate_locked(&live))
            .await
            .map_err(io::Error::other)??;

        tracing::info!(
            from = %name.display(),
            to = %archive.display(),
            "rotated log"
        );
        self.meter.emit(LogEvt {
            path: name.clone(),
            kind: LogKind::Rotate {
                archive: archive.clone(),
            },
        });

        *name = archive.clone();
        Ok(Some(archive))
    }

    /// Decides whether the next append should fsync under the current policy.
    async fn should_sync(&self) -> bool {
        match self.config.fsync_policy {
            FsyncPolicy::Always => true,
            FsyncPolicy::Batch(window) => {
                let mut last_sync = self.last_fsync.lock().await;
                let due = match *last_sync {
                    None => true,
                    Some(last) => last.elapsed() >= window,
                };
                if due {
                    *last_sync = Some(Instant::now());
                }
                due
            }
            FsyncPolicy::Os => false,
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Appends one encoded frame under the exclusive lock.
///
/// Returns the fsync duration in milliseconds when a sync was requested.
fn append_frame(path: &Path, frame: &[u8], sync: bool) -> io::Result<Option<u32>> {
    let file = open_append(path)?;
    let _lock = FileLock::acquire(&file)?;

    (&file).write_all(frame)?;

    if !sync {
        return Ok(None);
    }
    let start = std::time::Instant::now();
    file.sync_data()?;
    Ok(Some(start.elapsed().as_millis() as u32))
}

/// Renames `live` to its next archive name while holding its lock.
fn rotate_locked(live: &Path) -> Result<PathBuf, LogError> {
    let file = open_append(live)?;
    let _lock = FileLock::acquire(&file)?;

    let archive = naming::next_archive_path(live)?;
    std::fs::rename(live, &archive)?;

    Ok(archive)
}
