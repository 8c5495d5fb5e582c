//! Directory entry records handed out by `read_dirent`.
//!
//! Each record is a little-endian `u16` holding the total record length
//! (header included) followed by the raw name bytes.

use std::collections::VecDeque;

use log::warn;

pub const HEADER_LEN: usize = 2;

/// Move whole records from the front of `entries` into `buf`.
///
/// Stops at the first entry that does not fit in what is left of `buf`;
/// it stays queued. Returns the number of bytes written.
pub fn drain_into(entries: &mut VecDeque<String>, buf: &mut [u8]) -> usize {
    let mut written = 0;

    while let Some(name) = entries.front() {
        let len = HEADER_LEN + name.len();
        if len > usize::from(u16::MAX) {
            warn!(
                "dropping directory entry of {} bytes: too long for a record",
                name.len()
            );
            entries.pop_front();
            continue;
        }

        let rest = &mut buf[written..];
        if len > rest.len() {
            break;
        }

        rest[..HEADER_LEN].copy_from_slice(&(len as u16).to_le_bytes());
        rest[HEADER_LEN..len].copy_from_slice(name.as_bytes());
        written += len;
        entries.pop_front();
    }

    written
}

/// Split a buffer filled by [`drain_into`] back into names.
pub fn parse(mut buf: &[u8]) -> Option<Vec<String>> {
    let mut names = Vec::new();
    while !buf.is_empty() {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let len = usize::from(u16::from_le_bytes([buf[0], buf[1]]));
        if len < HEADER_LEN || len > buf.len() {
            return None;
        }
        let name = std::str::from_utf8(&buf[HEADER_LEN..len]).ok()?;
        names.push(name.to_owned());
        buf = &buf[len..];
    }
    Some(names)
}
