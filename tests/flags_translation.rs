use quickcheck_macros::quickcheck;

use fdshim::host::HostOpenConstants;
use fdshim::sys::flags::translate;
use fdshim::OpenMode;

/// One distinct bit per host constant, in an order unrelated to the
/// abstract layout.
fn shuffled(shift: u8) -> HostOpenConstants {
    let bit = |n: u32| 1u32 << ((n + u32::from(shift)) % 32);
    HostOpenConstants {
        wronly: bit(7),
        rdwr: bit(3),
        creat: bit(19),
        trunc: bit(0),
        append: bit(25),
        excl: bit(11),
        nonblock: bit(30),
        sync: bit(14),
    }
}

/// Exactly the host bits of the abstract bits that are set, nothing else.
#[quickcheck]
fn translation_sets_exactly_the_requested_bits(raw: u32, shift: u8) -> bool {
    let mode = OpenMode::from_bits_truncate(raw);
    let host = shuffled(shift);

    let expected = [
        (OpenMode::WRONLY, host.wronly),
        (OpenMode::RDWR, host.rdwr),
        (OpenMode::CREATE, host.creat),
        (OpenMode::TRUNC, host.trunc),
        (OpenMode::APPEND, host.append),
        (OpenMode::EXCL, host.excl),
        (OpenMode::NONBLOCK, host.nonblock),
        (OpenMode::SYNC, host.sync),
    ]
    .into_iter()
    .all(|(bit, host_bit)| {
        let set = translate(mode, &host) & host_bit != 0;
        set == mode.contains(bit)
    });

    let all_host = host.wronly
        | host.rdwr
        | host.creat
        | host.trunc
        | host.append
        | host.excl
        | host.nonblock
        | host.sync;
    expected && translate(mode, &host) & !all_host == 0
}

#[quickcheck]
fn cloexec_never_reaches_the_host(raw: u32) -> bool {
    let mode = OpenMode::from_bits_truncate(raw);
    let host = shuffled(0);
    translate(mode | OpenMode::CLOEXEC, &host) == translate(mode - OpenMode::CLOEXEC, &host)
}
