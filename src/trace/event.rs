use serde::{Deserialize, Serialize};

use crate::host::{HostCall, HostFault, HostValue};

/// The arguments of a host call, in owned form.
///
/// Reads record only how much was asked for; the bytes they produced live
/// in [`TraceEvent::data`]. Writes record the bytes written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum CallRecord {
    Open { path: String, flags: u32, mode: u32 },
    Close { fd: i32 },
    Fstat { fd: i32 },
    Stat { path: String },
    Lstat { path: String },
    Readdir { path: String },
    Mkdir { path: String, mode: u32 },
    Unlink { path: String },
    Rmdir { path: String },
    Chmod { path: String, mode: u32 },
    Fchmod { fd: i32, mode: u32 },
    Utimes { path: String, atime: i64, mtime: i64 },
    Rename { from: String, to: String },
    Truncate { path: String, len: i64 },
    Ftruncate { fd: i32, len: i64 },
    Readlink { path: String },
    Link { existing: String, new: String },
    Symlink { target: String, link: String },
    Fsync { fd: i32 },
    Read { fd: i32, len: usize, offset: Option<i64> },
    Write { fd: i32, data: Vec<u8>, offset: Option<i64> },
    Cwd,
    Chdir { path: String },
}

impl From<&HostCall<'_>> for CallRecord {
    fn from(call: &HostCall<'_>) -> Self {
        match call {
            HostCall::Open { path, flags, mode } => CallRecord::Open {
                path: path.to_string(),
                flags: *flags,
                mode: *mode,
            },
            HostCall::Close { fd } => CallRecord::Close { fd: *fd },
            HostCall::Fstat { fd } => CallRecord::Fstat { fd: *fd },
            HostCall::Stat { path } => CallRecord::Stat {
                path: path.to_string(),
            },
            HostCall::Lstat { path } => CallRecord::Lstat {
                path: path.to_string(),
            },
            HostCall::Readdir { path } => CallRecord::Readdir {
                path: path.to_string(),
            },
            HostCall::Mkdir { path, mode } => CallRecord::Mkdir {
                path: path.to_string(),
                mode: *mode,
            },
            HostCall::Unlink { path } => CallRecord::Unlink {
                path: path.to_string(),
            },
            HostCall::Rmdir { path } => CallRecord::Rmdir {
                path: path.to_string(),
            },
            HostCall::Chmod { path, mode } => CallRecord::Chmod {
                path: path.to_string(),
                mode: *mode,
            },
            HostCall::Fchmod { fd, mode } => CallRecord::Fchmod {
                fd: *fd,
                mode: *mode,
            },
            HostCall::Utimes { path, atime, mtime } => CallRecord::Utimes {
                path: path.to_string(),
                atime: *atime,
                mtime: *mtime,
            },
            HostCall::Rename { from, to } => CallRecord::Rename {
                from: from.to_string(),
                to: to.to_string(),
            },
            HostCall::Truncate { path, len } => CallRecord::Truncate {
                path: path.to_string(),
                len: *len,
            },
            HostCall::Ftruncate { fd, len } => CallRecord::Ftruncate { fd: *fd, len: *len },
            HostCall::Readlink { path } => CallRecord::Readlink {
                path: path.to_string(),
            },
            HostCall::Link { existing, new } => CallRecord::Link {
                existing: existing.to_string(),
                new: new.to_string(),
            },
            HostCall::Symlink { target, link } => CallRecord::Symlink {
                target: target.to_string(),
                link: link.to_string(),
            },
            HostCall::Fsync { fd } => CallRecord::Fsync { fd: *fd },
            HostCall::Read { fd, buf, offset } => CallRecord::Read {
                fd: *fd,
                len: buf.len(),
                offset: *offset,
            },
            HostCall::Write { fd, buf, offset } => CallRecord::Write {
                fd: *fd,
                data: buf.to_vec(),
                offset: *offset,
            },
            HostCall::Cwd => CallRecord::Cwd,
            HostCall::Chdir { path } => CallRecord::Chdir {
                path: path.to_string(),
            },
        }
    }
}

/// A single host call recorded during execution, with its outcome.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub call: CallRecord,
    pub result: Result<HostValue, HostFault>,
    /// Bytes produced by a read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl TraceEvent {
    pub fn new(call: CallRecord, result: Result<HostValue, HostFault>) -> Self {
        Self {
            call,
            result,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }
}
