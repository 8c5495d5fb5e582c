use std::fmt;

macro_rules! errnos {
    ($($name:ident = $num:path, $desc:literal;)*) => {
        /// POSIX error numbers surfaced to callers of the syscall layer.
        ///
        /// Numbers are the target platform's, taken from `libc`. The variant
        /// name doubles as the code string a host attaches to a failure
        /// (`"ENOENT"`, ...).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        #[allow(clippy::upper_case_acronyms)]
        pub enum Errno {
            $($name = $num,)*
        }

        impl Errno {
            /// The code string for this errno, e.g. `"ENOENT"`.
            pub fn code(self) -> &'static str {
                match self {
                    $(Errno::$name => stringify!($name),)*
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $(Errno::$name => $desc,)*
                }
            }

            fn from_canonical_raw(raw: i32) -> Option<Errno> {
                $(
                    if raw == $num {
                        return Some(Errno::$name);
                    }
                )*
                None
            }

            fn from_canonical_code(code: &str) -> Option<Errno> {
                $(
                    if code == stringify!($name) {
                        return Some(Errno::$name);
                    }
                )*
                None
            }
        }
    };
}

errnos! {
    EPERM = libc::EPERM, "operation not permitted";
    ENOENT = libc::ENOENT, "no such file or directory";
    ESRCH = libc::ESRCH, "no such process";
    EINTR = libc::EINTR, "interrupted system call";
    EIO = libc::EIO, "input/output error";
    ENXIO = libc::ENXIO, "no such device or address";
    E2BIG = libc::E2BIG, "argument list too long";
    ENOEXEC = libc::ENOEXEC, "exec format error";
    EBADF = libc::EBADF, "bad file descriptor";
    ECHILD = libc::ECHILD, "no child processes";
    EAGAIN = libc::EAGAIN, "resource temporarily unavailable";
    ENOMEM = libc::ENOMEM, "cannot allocate memory";
    EACCES = libc::EACCES, "permission denied";
    EFAULT = libc::EFAULT, "bad address";
    EBUSY = libc::EBUSY, "device or resource busy";
    EEXIST = libc::EEXIST, "file exists";
    EXDEV = libc::EXDEV, "invalid cross-device link";
    ENODEV = libc::ENODEV, "no such device";
    ENOTDIR = libc::ENOTDIR, "not a directory";
    EISDIR = libc::EISDIR, "is a directory";
    EINVAL = libc::EINVAL, "invalid argument";
    ENFILE = libc::ENFILE, "too many open files in system";
    EMFILE = libc::EMFILE, "too many open files";
    ENOTTY = libc::ENOTTY, "inappropriate ioctl for device";
    ETXTBSY = libc::ETXTBSY, "text file busy";
    EFBIG = libc::EFBIG, "file too large";
    ENOSPC = libc::ENOSPC, "no space left on device";
    ESPIPE = libc::ESPIPE, "illegal seek";
    EROFS = libc::EROFS, "read-only file system";
    EMLINK = libc::EMLINK, "too many links";
    EPIPE = libc::EPIPE, "broken pipe";
    ERANGE = libc::ERANGE, "numerical result out of range";
    EDEADLK = libc::EDEADLK, "resource deadlock avoided";
    ENAMETOOLONG = libc::ENAMETOOLONG, "file name too long";
    ENOSYS = libc::ENOSYS, "function not implemented";
    ENOTEMPTY = libc::ENOTEMPTY, "directory not empty";
    ELOOP = libc::ELOOP, "too many levels of symbolic links";
    ENOTSUP = libc::ENOTSUP, "operation not supported";
    EADDRINUSE = libc::EADDRINUSE, "address already in use";
    ECONNRESET = libc::ECONNRESET, "connection reset by peer";
    ETIMEDOUT = libc::ETIMEDOUT, "connection timed out";
    ESTALE = libc::ESTALE, "stale file handle";
    EDQUOT = libc::EDQUOT, "disk quota exceeded";
    ECANCELED = libc::ECANCELED, "operation canceled";
}

impl Errno {
    /// Translate a host failure code into an errno.
    ///
    /// Returns `None` for codes outside the table; those are not normal
    /// I/O errors and must be treated as fatal by the caller.
    pub fn from_code(code: &str) -> Option<Errno> {
        match code {
            "EWOULDBLOCK" => Some(Errno::EAGAIN),
            "EOPNOTSUPP" => Some(Errno::ENOTSUP),
            "EDEADLOCK" => Some(Errno::EDEADLK),
            other => Errno::from_canonical_code(other),
        }
    }

    /// Look up a raw OS error number.
    pub fn from_raw(raw: i32) -> Option<Errno> {
        match Errno::from_canonical_raw(raw) {
            Some(errno) => Some(errno),
            // A separate number on some platforms, the same one elsewhere.
            None if raw == libc::EOPNOTSUPP => Some(Errno::ENOTSUP),
            None => None,
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

impl std::error::Error for Errno {}
