//! Append-only compressed record log with bidirectional framing and rotation.
//!
//! Implements a record log with:
//! - Zlib-compressed records (zstd and lz4 optional)
//! - Length-prefixed and length-suffixed frames, readable in either direction
//! - Appends and rotation serialized by an exclusive `flock`
//! - Lock-free readers that treat a truncated tail as end-of-stream
//! - Numbered archives (`<base>.001`, `<base>.002`, ...)
//! - Observability via a pluggable meter and `tracing`

pub mod codec;
pub mod frame;
pub mod lock;
pub mod log;
pub mod naming;
pub mod observe;
pub mod reader;

pub use codec::{CodecError, Compression};
pub use frame::FrameError;
pub use log::{FsyncPolicy, GzLog, GzLogConfig, LogError};
pub use observe::{LogEvt, LogKind, Meter, NoopMeter};
pub use reader::{LogReader, ReverseReader};
