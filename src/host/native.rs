//! A host backed by the operating system.
//!
//! Failures are reported the way a code-tagged host would: the OS error
//! number is turned back into its code string (`"ENOENT"`, ...). Errors
//! that carry no OS error number are reported as unrecognized.

use std::collections::HashMap;
use std::fs::{self, DirBuilder, File, FileTimes, Metadata, OpenOptions, Permissions};
use std::io::{self, Read, Write};
use std::os::unix::fs::{DirBuilderExt, FileExt, MetadataExt, OpenOptionsExt, PermissionsExt};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::warn;

use super::{HostCall, HostFault, HostFs, HostOpenConstants, HostStat, HostValue};
use crate::sys::errno::Errno;

type HostResult = Result<HostValue, HostFault>;

#[derive(Debug, Default)]
pub struct NativeHost {
    files: Mutex<HashMap<i32, Arc<File>>>,
}

impl NativeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<i32, Arc<File>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn file(&self, fd: i32) -> Result<Arc<File>, HostFault> {
        self.files()
            .get(&fd)
            .cloned()
            .ok_or_else(|| HostFault::coded(Errno::EBADF.code(), format!("fd {fd} is not open")))
    }

    fn open(&self, path: &str, flags: u32, mode: u32) -> HostResult {
        let flags = flags as i32;
        let access = flags & libc::O_ACCMODE;
        let file = OpenOptions::new()
            .read(access != libc::O_WRONLY)
            .write(access != libc::O_RDONLY)
            .custom_flags(flags & !libc::O_ACCMODE)
            .mode(mode)
            .open(path)
            .map_err(fault)?;

        let fd = file.as_raw_fd();
        self.files().insert(fd, Arc::new(file));
        Ok(HostValue::Int(fd.into()))
    }

    fn close(&self, fd: i32) -> HostResult {
        match self.files().remove(&fd) {
            Some(_) => Ok(HostValue::Undefined),
            None => Err(HostFault::coded(
                Errno::EBADF.code(),
                format!("fd {fd} is not open"),
            )),
        }
    }

    fn fstat(&self, fd: i32) -> HostResult {
        let meta = match fd {
            0..=2 => fs::metadata(Path::new("/dev/fd").join(fd.to_string())),
            _ => self.file(fd)?.metadata(),
        };
        Ok(HostValue::Stat(host_stat(&meta.map_err(fault)?)))
    }

    fn read(&self, fd: i32, buf: &mut [u8], offset: Option<i64>) -> HostResult {
        let n = match (fd, offset) {
            (0, None) => io::stdin().lock().read(buf),
            (0..=2, Some(_)) => return Err(stream_fault(Errno::ESPIPE, fd)),
            (1..=2, None) => return Err(stream_fault(Errno::EBADF, fd)),
            (_, None) => (&*self.file(fd)?).read(buf),
            (_, Some(offset)) => self.file(fd)?.read_at(buf, offset as u64),
        };
        Ok(HostValue::Int(n.map_err(fault)? as i64))
    }

    fn write(&self, fd: i32, buf: &[u8], offset: Option<i64>) -> HostResult {
        let n = match (fd, offset) {
            (1, None) => write_flushed(&mut io::stdout().lock(), buf),
            (2, None) => write_flushed(&mut io::stderr().lock(), buf),
            (0..=2, Some(_)) => return Err(stream_fault(Errno::ESPIPE, fd)),
            (0, None) => return Err(stream_fault(Errno::EBADF, fd)),
            (_, None) => (&*self.file(fd)?).write(buf),
            (_, Some(offset)) => self.file(fd)?.write_at(buf, offset as u64),
        };
        Ok(HostValue::Int(n.map_err(fault)? as i64))
    }
}

impl HostFs for NativeHost {
    fn constants(&self) -> HostOpenConstants {
        HostOpenConstants {
            wronly: libc::O_WRONLY as u32,
            rdwr: libc::O_RDWR as u32,
            creat: libc::O_CREAT as u32,
            trunc: libc::O_TRUNC as u32,
            append: libc::O_APPEND as u32,
            excl: libc::O_EXCL as u32,
            nonblock: libc::O_NONBLOCK as u32,
            sync: libc::O_SYNC as u32,
        }
    }

    fn call(&self, call: HostCall<'_>) -> HostResult {
        match call {
            HostCall::Open { path, flags, mode } => self.open(path, flags, mode),
            HostCall::Close { fd } => self.close(fd),
            HostCall::Fstat { fd } => self.fstat(fd),
            HostCall::Stat { path } => stat_with(fs::metadata(path)),
            HostCall::Lstat { path } => stat_with(fs::symlink_metadata(path)),
            HostCall::Readdir { path } => {
                let mut names = Vec::new();
                for entry in fs::read_dir(path).map_err(fault)? {
                    let name = entry.map_err(fault)?.file_name();
                    match name.into_string() {
                        Ok(name) => names.push(name),
                        // It could not be opened again under a lossy name.
                        Err(name) => warn!("skipping non-UTF-8 entry {name:?} in {path}"),
                    }
                }
                // read_dir order depends on the filesystem.
                names.sort();
                Ok(HostValue::Names(names))
            }
            HostCall::Mkdir { path, mode } => {
                unit(DirBuilder::new().mode(mode).create(path))
            }
            HostCall::Unlink { path } => unit(fs::remove_file(path)),
            HostCall::Rmdir { path } => unit(fs::remove_dir(path)),
            HostCall::Chmod { path, mode } => {
                unit(fs::set_permissions(path, Permissions::from_mode(mode)))
            }
            HostCall::Fchmod { fd, mode } => {
                unit(self.file(fd)?.set_permissions(Permissions::from_mode(mode)))
            }
            HostCall::Utimes { path, atime, mtime } => {
                let times = FileTimes::new()
                    .set_accessed(system_time(atime))
                    .set_modified(system_time(mtime));
                unit(File::open(path).and_then(|file| file.set_times(times)))
            }
            HostCall::Rename { from, to } => unit(fs::rename(from, to)),
            HostCall::Truncate { path, len } => unit(
                OpenOptions::new()
                    .write(true)
                    .open(path)
                    .and_then(|file| file.set_len(len as u64)),
            ),
            HostCall::Ftruncate { fd, len } => unit(self.file(fd)?.set_len(len as u64)),
            HostCall::Readlink { path } => {
                let target = fs::read_link(path).map_err(fault)?;
                Ok(HostValue::Str(target.to_string_lossy().into_owned()))
            }
            HostCall::Link { existing, new } => unit(fs::hard_link(existing, new)),
            HostCall::Symlink { target, link } => {
                unit(std::os::unix::fs::symlink(target, link))
            }
            HostCall::Fsync { fd } => match fd {
                1 => unit(io::stdout().flush()),
                2 => unit(io::stderr().flush()),
                _ => unit(self.file(fd)?.sync_all()),
            },
            HostCall::Read { fd, buf, offset } => self.read(fd, buf, offset),
            HostCall::Write { fd, buf, offset } => self.write(fd, buf, offset),
            HostCall::Cwd => {
                let cwd = std::env::current_dir().map_err(fault)?;
                Ok(HostValue::Str(cwd.to_string_lossy().into_owned()))
            }
            HostCall::Chdir { path } => unit(std::env::set_current_dir(path)),
        }
    }
}

fn fault(err: io::Error) -> HostFault {
    match err.raw_os_error() {
        Some(raw) => match Errno::from_raw(raw) {
            Some(errno) => HostFault::coded(errno.code(), err.to_string()),
            None => HostFault::coded(format!("ERRNO{raw}"), err.to_string()),
        },
        None => HostFault::unrecognized(err.to_string()),
    }
}

fn unit(result: io::Result<()>) -> HostResult {
    result.map(|()| HostValue::Undefined).map_err(fault)
}

fn stat_with(meta: io::Result<Metadata>) -> HostResult {
    Ok(HostValue::Stat(host_stat(&meta.map_err(fault)?)))
}

fn write_flushed(out: &mut impl Write, buf: &[u8]) -> io::Result<usize> {
    let n = out.write(buf)?;
    out.flush()?;
    Ok(n)
}

fn stream_fault(errno: Errno, fd: i32) -> HostFault {
    HostFault::coded(errno.code(), format!("unsupported operation on standard stream {fd}"))
}

fn system_time(secs: i64) -> SystemTime {
    match u64::try_from(secs) {
        Ok(secs) => UNIX_EPOCH + Duration::from_secs(secs),
        Err(_) => UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()),
    }
}

fn host_stat(meta: &Metadata) -> HostStat {
    HostStat {
        dev: meta.dev() as i64,
        ino: meta.ino(),
        mode: meta.mode(),
        nlink: meta.nlink() as u32,
        uid: meta.uid(),
        gid: meta.gid(),
        rdev: meta.rdev() as i64,
        size: meta.size() as i64,
        blksize: meta.blksize() as i32,
        blocks: meta.blocks() as i32,
        atime_ms: millis(meta.atime(), meta.atime_nsec()),
        mtime_ms: millis(meta.mtime(), meta.mtime_nsec()),
        ctime_ms: millis(meta.ctime(), meta.ctime_nsec()),
        is_directory: meta.is_dir(),
    }
}

fn millis(secs: i64, nsecs: i64) -> i64 {
    secs * 1000 + nsecs / 1_000_000
}
