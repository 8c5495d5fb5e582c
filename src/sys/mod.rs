//! POSIX-style syscall surface over a [`HostFs`].
//!
//! The host has no notion of a per-descriptor cursor and reports failures
//! as code strings. [`FileSystem`] keeps a descriptor table with cursor
//! state for each open descriptor and translates every host failure
//! through [`call::fs_call`].

pub mod call;
pub mod dirent;
pub mod errno;
pub mod error;
pub mod flags;
pub mod stat;
pub mod table;

use log::{debug, error, warn};

use crate::host::{HostCall, HostFault, HostFs};
use call::{fs_call, shape};
use errno::Errno;
use error::{SysError, SysResult};
use flags::OpenMode;
use stat::{Stat, Timespec};
use table::{lock, CursorMode, Descriptor, DescriptorTable, Released};

pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

/// Origin of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = SysError;

    fn try_from(whence: i32) -> SysResult<Self> {
        match whence {
            SEEK_SET => Ok(Whence::Start),
            SEEK_CUR => Ok(Whence::Current),
            SEEK_END => Ok(Whence::End),
            _ => Err(Errno::EINVAL.into()),
        }
    }
}

/// Reject paths the host must never see.
pub fn check_path(path: &str) -> SysResult<()> {
    if path.is_empty() || path.contains('\0') {
        return Err(Errno::EINVAL.into());
    }
    Ok(())
}

/// The syscall layer: one host plus the descriptors opened through it.
pub struct FileSystem<H> {
    host: H,
    files: DescriptorTable,
}

impl<H: HostFs> FileSystem<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            files: DescriptorTable::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        &self.files
    }

    pub fn open(&self, path: &str, mode: OpenMode, perm: u32) -> SysResult<i32> {
        check_path(path)?;

        let flags = flags::translate(mode, &self.host.constants());
        let fd = self.call_fd(HostCall::Open {
            path,
            flags,
            mode: perm,
        })?;

        let entries = match self.list_if_directory(fd, path) {
            Ok(entries) => entries,
            Err(err) => {
                return match fs_call(&self.host, HostCall::Close { fd }) {
                    Err(fatal @ SysError::Fatal(_)) => {
                        error!("failed to release host fd {fd} after open error {err}: {fatal}");
                        Err(fatal)
                    }
                    Err(close_err) => {
                        warn!("failed to release host fd {fd} after open error: {close_err}");
                        Err(err)
                    }
                    Ok(_) => Err(err),
                };
            }
        };

        self.files.insert(fd, Descriptor::new(path, entries));
        Ok(fd)
    }

    fn list_if_directory(&self, fd: i32, path: &str) -> SysResult<Option<Vec<String>>> {
        let st = match fs_call(&self.host, HostCall::Fstat { fd }) {
            Ok(value) => shape(value.into_stat())?,
            // Not knowing whether it is a directory just means no listing.
            Err(SysError::Errno(errno)) => {
                debug!("fstat of fresh fd {fd} failed with {errno}");
                return Ok(None);
            }
            Err(fatal) => return Err(fatal),
        };

        if !st.is_directory {
            return Ok(None);
        }
        let names = fs_call(&self.host, HostCall::Readdir { path })?;
        Ok(Some(shape(names.into_names())?))
    }

    /// Close `fd`. The record is dropped before the host is asked to
    /// release it, so a failed release never leaves the number reserved.
    /// The standard streams the table starts with are never closed.
    pub fn close(&self, fd: i32) -> SysResult<()> {
        if let Released::Kept = self.files.release(fd)? {
            return Ok(());
        }
        fs_call(&self.host, HostCall::Close { fd }).map(drop).map_err(|err| {
            warn!("host close of fd {fd} failed: {err}");
            err
        })
    }

    /// Nothing is ever exec'd, so there is nothing to do.
    pub fn close_on_exec(&self, _fd: i32) {}

    pub fn mkdir(&self, path: &str, perm: u32) -> SysResult<()> {
        check_path(path)?;
        self.call_unit(HostCall::Mkdir { path, mode: perm })
    }

    /// Fill `buf` with pending directory entries of `fd`.
    ///
    /// Returns 0 once every entry has been handed out.
    pub fn read_dirent(&self, fd: i32, buf: &mut [u8]) -> SysResult<usize> {
        let descriptor = self.files.get(fd)?;
        let mut descriptor = lock(&descriptor);
        let entries = descriptor.entries.as_mut().ok_or(Errno::EINVAL)?;
        Ok(dirent::drain_into(entries, buf))
    }

    pub fn stat(&self, path: &str) -> SysResult<Stat> {
        check_path(path)?;
        self.call_stat(HostCall::Stat { path })
    }

    pub fn lstat(&self, path: &str) -> SysResult<Stat> {
        check_path(path)?;
        self.call_stat(HostCall::Lstat { path })
    }

    pub fn fstat(&self, fd: i32) -> SysResult<Stat> {
        self.files.get(fd)?;
        self.call_stat(HostCall::Fstat { fd })
    }

    pub fn unlink(&self, path: &str) -> SysResult<()> {
        check_path(path)?;
        self.call_unit(HostCall::Unlink { path })
    }

    pub fn rmdir(&self, path: &str) -> SysResult<()> {
        check_path(path)?;
        self.call_unit(HostCall::Rmdir { path })
    }

    pub fn chmod(&self, path: &str, mode: u32) -> SysResult<()> {
        check_path(path)?;
        self.call_unit(HostCall::Chmod { path, mode })
    }

    pub fn fchmod(&self, fd: i32, mode: u32) -> SysResult<()> {
        self.files.get(fd)?;
        self.call_unit(HostCall::Fchmod { fd, mode })
    }

    pub fn chown(&self, path: &str, _uid: u32, _gid: u32) -> SysResult<()> {
        check_path(path)?;
        Err(Errno::ENOSYS.into())
    }

    pub fn fchown(&self, _fd: i32, _uid: u32, _gid: u32) -> SysResult<()> {
        Err(Errno::ENOSYS.into())
    }

    pub fn lchown(&self, path: &str, _uid: u32, _gid: u32) -> SysResult<()> {
        check_path(path)?;
        Err(Errno::ENOSYS.into())
    }

    /// Set access and modification times; `times` is `[atime, mtime]`.
    /// The host only takes whole seconds.
    pub fn utimes_nano(&self, path: &str, times: &[Timespec]) -> SysResult<()> {
        check_path(path)?;
        let [atime, mtime] = times else {
            return Err(Errno::EINVAL.into());
        };
        self.call_unit(HostCall::Utimes {
            path,
            atime: atime.sec,
            mtime: mtime.sec,
        })
    }

    pub fn rename(&self, from: &str, to: &str) -> SysResult<()> {
        check_path(from)?;
        check_path(to)?;
        self.call_unit(HostCall::Rename { from, to })
    }

    pub fn truncate(&self, path: &str, len: i64) -> SysResult<()> {
        check_path(path)?;
        self.call_unit(HostCall::Truncate { path, len })
    }

    pub fn ftruncate(&self, fd: i32, len: i64) -> SysResult<()> {
        self.files.get(fd)?;
        self.call_unit(HostCall::Ftruncate { fd, len })
    }

    /// Copy the current directory into `buf`, truncating if it is short.
    pub fn getcwd(&self, buf: &mut [u8]) -> SysResult<usize> {
        let cwd = self.current_dir()?;
        let n = cwd.len().min(buf.len());
        buf[..n].copy_from_slice(&cwd.as_bytes()[..n]);
        Ok(n)
    }

    pub fn current_dir(&self) -> SysResult<String> {
        let value = fs_call(&self.host, HostCall::Cwd)?;
        shape(value.into_str())
    }

    pub fn chdir(&self, path: &str) -> SysResult<()> {
        check_path(path)?;
        self.call_unit(HostCall::Chdir { path })
    }

    /// Change into the directory `fd` was opened on.
    pub fn fchdir(&self, fd: i32) -> SysResult<()> {
        let path = {
            let descriptor = self.files.get(fd)?;
            let descriptor = lock(&descriptor);
            descriptor.path.clone()
        };
        self.chdir(&path)
    }

    pub fn readlink(&self, path: &str, buf: &mut [u8]) -> SysResult<usize> {
        check_path(path)?;
        let value = fs_call(&self.host, HostCall::Readlink { path })?;
        let target = shape(value.into_str())?;
        let n = target.len().min(buf.len());
        buf[..n].copy_from_slice(&target.as_bytes()[..n]);
        Ok(n)
    }

    pub fn link(&self, existing: &str, new: &str) -> SysResult<()> {
        check_path(existing)?;
        check_path(new)?;
        self.call_unit(HostCall::Link { existing, new })
    }

    pub fn symlink(&self, target: &str, link: &str) -> SysResult<()> {
        check_path(target)?;
        check_path(link)?;
        self.call_unit(HostCall::Symlink { target, link })
    }

    pub fn fsync(&self, fd: i32) -> SysResult<()> {
        self.files.get(fd)?;
        self.call_unit(HostCall::Fsync { fd })
    }

    pub fn read(&self, fd: i32, buf: &mut [u8]) -> SysResult<usize> {
        let descriptor = self.files.get(fd)?;
        let mut descriptor = lock(&descriptor);

        let offset = match descriptor.cursor {
            CursorMode::Explicit => Some(descriptor.position),
            CursorMode::Tracked => None,
        };
        let n = self.call_len(HostCall::Read { fd, buf, offset })?;
        descriptor.advance(n);
        Ok(n)
    }

    pub fn write(&self, fd: i32, buf: &[u8]) -> SysResult<usize> {
        let descriptor = self.files.get(fd)?;
        let mut descriptor = lock(&descriptor);

        let offset = match descriptor.cursor {
            CursorMode::Explicit => Some(descriptor.position),
            CursorMode::Tracked => None,
        };
        let n = self.call_len(HostCall::Write { fd, buf, offset })?;
        descriptor.advance(n);
        Ok(n)
    }

    /// Read at `offset` without touching the descriptor's cursor.
    pub fn pread(&self, fd: i32, buf: &mut [u8], offset: i64) -> SysResult<usize> {
        if offset < 0 {
            return Err(Errno::EINVAL.into());
        }
        self.files.get(fd)?;
        self.call_len(HostCall::Read {
            fd,
            buf,
            offset: Some(offset),
        })
    }

    /// Write at `offset` without touching the descriptor's cursor.
    pub fn pwrite(&self, fd: i32, buf: &[u8], offset: i64) -> SysResult<usize> {
        if offset < 0 {
            return Err(Errno::EINVAL.into());
        }
        self.files.get(fd)?;
        self.call_len(HostCall::Write {
            fd,
            buf,
            offset: Some(offset),
        })
    }

    pub fn seek(&self, fd: i32, offset: i64, whence: i32) -> SysResult<i64> {
        let descriptor = self.files.get(fd)?;
        let mut descriptor = lock(&descriptor);

        let base = match Whence::try_from(whence)? {
            Whence::Start => 0,
            Whence::Current => descriptor.position,
            Whence::End => self.call_stat(HostCall::Fstat { fd })?.size,
        };

        let position = base.checked_add(offset).ok_or(Errno::EINVAL)?;
        if position < 0 {
            return Err(Errno::EINVAL.into());
        }

        descriptor.seek_to(position);
        Ok(position)
    }

    pub fn dup(&self, _fd: i32) -> SysResult<i32> {
        Err(Errno::ENOSYS.into())
    }

    pub fn dup2(&self, _fd: i32, _new_fd: i32) -> SysResult<()> {
        Err(Errno::ENOSYS.into())
    }

    pub fn pipe(&self) -> SysResult<[i32; 2]> {
        Err(Errno::ENOSYS.into())
    }

    fn call_unit(&self, call: HostCall<'_>) -> SysResult<()> {
        fs_call(&self.host, call).map(drop)
    }

    fn call_stat(&self, call: HostCall<'_>) -> SysResult<Stat> {
        let value = fs_call(&self.host, call)?;
        let st = shape(value.into_stat())?;
        Ok(Stat::from(&st))
    }

    fn call_fd(&self, call: HostCall<'_>) -> SysResult<i32> {
        let n = shape(fs_call(&self.host, call)?.into_int())?;
        i32::try_from(n).map_err(|_| {
            SysError::Fatal(HostFault::unrecognized(format!(
                "host returned out-of-range descriptor {n}"
            )))
        })
    }

    fn call_len(&self, call: HostCall<'_>) -> SysResult<usize> {
        let n = shape(fs_call(&self.host, call)?.into_int())?;
        usize::try_from(n).map_err(|_| {
            SysError::Fatal(HostFault::unrecognized(format!(
                "host returned negative byte count {n}"
            )))
        })
    }
}
