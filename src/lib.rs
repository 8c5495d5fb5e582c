//! fdshim: POSIX-style file descriptors over a synchronous host filesystem
//!
//! The host is a call-by-name API with no cursor bookkeeping and string
//! error codes. This library layers a descriptor table, cursor tracking,
//! directory enumeration and errno translation on top of it, and can
//! record and replay the host calls it makes.

/// The host filesystem boundary and a native implementation
pub mod host;

/// Recording of host calls
pub mod recorder;

/// Replay of recorded host calls
pub mod playback;

/// The syscall surface
pub mod sys;

/// Trace event types for recording and replay
pub mod trace;

pub use anyhow::Result;
pub use host::{HostFs, NativeHost};
pub use playback::PlaybackHost;
pub use recorder::RecordingHost;
pub use sys::errno::Errno;
pub use sys::error::{SysError, SysResult};
pub use sys::flags::OpenMode;
pub use sys::stat::{Stat, Timespec};
pub use sys::FileSystem;
pub use trace::{TraceEvent, TraceFile, TraceFormat};
