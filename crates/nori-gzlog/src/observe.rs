//! Typed observability events emitted by the log.

use std::path::PathBuf;

/// What happened to a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogKind {
    /// A frame of `bytes` bytes was appended.
    Append { bytes: u64 },
    /// The file was fsynced while holding the lock.
    Fsync { ms: u32 },
    /// The live file was renamed to `archive`.
    Rotate { archive: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvt {
    /// File the event applies to (the live path for rotations).
    pub path: PathBuf,
    pub kind: LogKind,
}

/// Sink for log events. Implementations must not block.
pub trait Meter: Send + Sync {
    fn emit(&self, evt: LogEvt);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMeter;

impl Meter for NoopMeter {
    fn emit(&self, _evt: LogEvt) {}
}
