use bitflags::bitflags;

use crate::host::HostOpenConstants;

bitflags! {
    /// Abstract open mode, as passed to [`FileSystem::open`](super::FileSystem::open).
    ///
    /// Read-only is the absence of both access bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u32 {
        const WRONLY   = 0o1;
        const RDWR     = 0o2;
        const CREATE   = 0o100;
        const EXCL     = 0o200;
        const TRUNC    = 0o1000;
        const APPEND   = 0o2000;
        const NONBLOCK = 0o4000;
        const SYNC     = 0o10000;
        /// Accepted for compatibility; nothing is ever exec'd.
        const CLOEXEC  = 0o2000000;
    }
}

impl OpenMode {
    pub const RDONLY: OpenMode = OpenMode::empty();
}

/// Map an abstract open mode onto the host's flag bits.
pub fn translate(mode: OpenMode, host: &HostOpenConstants) -> u32 {
    let table = [
        (OpenMode::WRONLY, host.wronly),
        (OpenMode::RDWR, host.rdwr),
        (OpenMode::CREATE, host.creat),
        (OpenMode::TRUNC, host.trunc),
        (OpenMode::APPEND, host.append),
        (OpenMode::EXCL, host.excl),
        (OpenMode::NONBLOCK, host.nonblock),
        (OpenMode::SYNC, host.sync),
    ];

    table
        .iter()
        .filter(|(bit, _)| mode.contains(*bit))
        .fold(0, |flags, (_, host_bit)| flags | host_bit)
}
