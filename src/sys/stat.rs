use serde::Serialize;

use crate::host::HostStat;

/// File type mask and directory bit of `Stat::mode`.
pub const S_IFMT: u32 = 0o170000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFLNK: u32 = 0o120000;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: i64,
}

impl Timespec {
    /// Split a millisecond timestamp into seconds and nanoseconds.
    pub fn from_millis(ms: i64) -> Self {
        Self {
            sec: ms / 1000,
            nsec: (ms % 1000) * 1_000_000,
        }
    }
}

/// File metadata in the shape POSIX callers expect.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Stat {
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
    pub atime: Timespec,
    pub mtime: Timespec,
    pub ctime: Timespec,
}

impl Stat {
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }
}

impl From<&HostStat> for Stat {
    fn from(st: &HostStat) -> Self {
        Self {
            dev: st.dev,
            ino: st.ino,
            mode: st.mode,
            nlink: st.nlink,
            uid: st.uid,
            gid: st.gid,
            rdev: st.rdev,
            size: st.size,
            blksize: st.blksize,
            blocks: st.blocks,
            atime: Timespec::from_millis(st.atime_ms),
            mtime: Timespec::from_millis(st.mtime_ms),
            ctime: Timespec::from_millis(st.ctime_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_split() {
        assert_eq!(
            Timespec::from_millis(1500),
            Timespec {
                sec: 1,
                nsec: 500_000_000
            }
        );
        assert_eq!(Timespec::from_millis(999).sec, 0);
        assert_eq!(Timespec::from_millis(2000).nsec, 0);
    }

    #[test]
    fn copies_host_fields() {
        let host = HostStat {
            dev: 3,
            ino: 99,
            mode: S_IFDIR | 0o755,
            nlink: 2,
            uid: 1000,
            gid: 100,
            rdev: 0,
            size: 4096,
            blksize: 4096,
            blocks: 8,
            atime_ms: 1_700_000_000_123,
            mtime_ms: 1_700_000_001_000,
            ctime_ms: 1_700_000_002_999,
            is_directory: true,
        };
        let st = Stat::from(&host);
        assert_eq!(st.ino, 99);
        assert_eq!(st.size, 4096);
        assert!(st.is_dir());
        assert!(!st.is_symlink());
        assert_eq!(st.atime.sec, 1_700_000_000);
        assert_eq!(st.atime.nsec, 123_000_000);
        assert_eq!(st.ctime.nsec, 999_000_000);
    }
}
