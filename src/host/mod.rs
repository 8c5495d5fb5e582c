//! The boundary with the host filesystem API.
//!
//! A host is a synchronous, call-by-name primitive: every request is a
//! [`HostCall`] and either produces a [`HostValue`] or a [`HostFault`].
//! The host keeps no cursor bookkeeping the syscall layer can rely on and
//! reports failures as code strings rather than errno values.

pub mod native;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use native::NativeHost;

/// A synchronous filesystem host.
pub trait HostFs: Send + Sync {
    /// The host's open-flag constants.
    fn constants(&self) -> HostOpenConstants;

    /// Perform one host call, blocking until it completes.
    fn call(&self, call: HostCall<'_>) -> Result<HostValue, HostFault>;
}

/// Host-specific open flag bits, as the host exposes them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostOpenConstants {
    pub wronly: u32,
    pub rdwr: u32,
    pub creat: u32,
    pub trunc: u32,
    pub append: u32,
    pub excl: u32,
    pub nonblock: u32,
    pub sync: u32,
}

/// One request to the host, addressed by name.
#[derive(Debug)]
pub enum HostCall<'a> {
    Open { path: &'a str, flags: u32, mode: u32 },
    Close { fd: i32 },
    Fstat { fd: i32 },
    Stat { path: &'a str },
    Lstat { path: &'a str },
    Readdir { path: &'a str },
    Mkdir { path: &'a str, mode: u32 },
    Unlink { path: &'a str },
    Rmdir { path: &'a str },
    Chmod { path: &'a str, mode: u32 },
    Fchmod { fd: i32, mode: u32 },
    /// Access and modification times in whole seconds.
    Utimes { path: &'a str, atime: i64, mtime: i64 },
    Rename { from: &'a str, to: &'a str },
    Truncate { path: &'a str, len: i64 },
    Ftruncate { fd: i32, len: i64 },
    Readlink { path: &'a str },
    Link { existing: &'a str, new: &'a str },
    Symlink { target: &'a str, link: &'a str },
    Fsync { fd: i32 },
    /// Read into `buf`. Without an offset the host's own cursor is used.
    Read { fd: i32, buf: &'a mut [u8], offset: Option<i64> },
    Write { fd: i32, buf: &'a [u8], offset: Option<i64> },
    Cwd,
    Chdir { path: &'a str },
}

impl HostCall<'_> {
    /// The name the host knows this call by.
    pub fn name(&self) -> &'static str {
        match self {
            HostCall::Open { .. } => "open",
            HostCall::Close { .. } => "close",
            HostCall::Fstat { .. } => "fstat",
            HostCall::Stat { .. } => "stat",
            HostCall::Lstat { .. } => "lstat",
            HostCall::Readdir { .. } => "readdir",
            HostCall::Mkdir { .. } => "mkdir",
            HostCall::Unlink { .. } => "unlink",
            HostCall::Rmdir { .. } => "rmdir",
            HostCall::Chmod { .. } => "chmod",
            HostCall::Fchmod { .. } => "fchmod",
            HostCall::Utimes { .. } => "utimes",
            HostCall::Rename { .. } => "rename",
            HostCall::Truncate { .. } => "truncate",
            HostCall::Ftruncate { .. } => "ftruncate",
            HostCall::Readlink { .. } => "readlink",
            HostCall::Link { .. } => "link",
            HostCall::Symlink { .. } => "symlink",
            HostCall::Fsync { .. } => "fsync",
            HostCall::Read { .. } => "read",
            HostCall::Write { .. } => "write",
            HostCall::Cwd => "cwd",
            HostCall::Chdir { .. } => "chdir",
        }
    }
}

/// Host metadata for a file, timestamps in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HostStat {
    pub dev: i64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: i64,
    pub size: i64,
    pub blksize: i32,
    pub blocks: i32,
    pub atime_ms: i64,
    pub mtime_ms: i64,
    pub ctime_ms: i64,
    pub is_directory: bool,
}

/// What a successful host call returns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HostValue {
    Undefined,
    Int(i64),
    Str(String),
    Stat(HostStat),
    Names(Vec<String>),
}

impl HostValue {
    pub fn into_int(self) -> Result<i64, HostFault> {
        match self {
            HostValue::Int(n) => Ok(n),
            other => Err(HostFault::unexpected("int", &other)),
        }
    }

    pub fn into_str(self) -> Result<String, HostFault> {
        match self {
            HostValue::Str(s) => Ok(s),
            other => Err(HostFault::unexpected("string", &other)),
        }
    }

    pub fn into_stat(self) -> Result<HostStat, HostFault> {
        match self {
            HostValue::Stat(st) => Ok(st),
            other => Err(HostFault::unexpected("stat", &other)),
        }
    }

    pub fn into_names(self) -> Result<Vec<String>, HostFault> {
        match self {
            HostValue::Names(names) => Ok(names),
            other => Err(HostFault::unexpected("names", &other)),
        }
    }
}

/// A failure raised by the host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Error)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum HostFault {
    /// A failure tagged with a machine-readable code such as `"ENOENT"`.
    #[error("{code}: {message}")]
    Coded { code: String, message: String },
    /// Anything that is not a code-tagged failure.
    #[error("unrecognized host failure: {message}")]
    Unrecognized { message: String },
}

impl HostFault {
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        HostFault::Coded {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unrecognized(message: impl Into<String>) -> Self {
        HostFault::Unrecognized {
            message: message.into(),
        }
    }

    fn unexpected(expected: &str, got: &HostValue) -> Self {
        HostFault::unrecognized(format!("expected {expected} result, got {got:?}"))
    }
}
