use thiserror::Error;

use super::errno::Errno;
use crate::host::HostFault;

/// Result of a syscall-layer operation.
pub type SysResult<T> = std::result::Result<T, SysError>;

/// Error returned by the syscall layer.
///
/// `Errno` is the recoverable class callers branch on. `Fatal` carries a
/// host failure that has no errno translation, so [`SysError::errno`]
/// returns `None` for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SysError {
    #[error("{0}")]
    Errno(Errno),
    #[error("fatal host failure: {0}")]
    Fatal(HostFault),
}

impl SysError {
    pub fn errno(&self) -> Option<Errno> {
        match self {
            SysError::Errno(errno) => Some(*errno),
            SysError::Fatal(_) => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SysError::Fatal(_))
    }
}

impl From<Errno> for SysError {
    fn from(errno: Errno) -> Self {
        SysError::Errno(errno)
    }
}
