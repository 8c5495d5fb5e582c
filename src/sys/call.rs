use log::{error, trace};

use super::errno::Errno;
use super::error::{SysError, SysResult};
use crate::host::{HostCall, HostFault, HostFs, HostValue};

/// Issue a host call and translate its failure.
///
/// Every host call made by the syscall layer goes through here. A
/// code-tagged fault whose code is in the errno table becomes
/// [`SysError::Errno`]; any other fault is passed on untouched as
/// [`SysError::Fatal`].
pub fn fs_call<H: HostFs + ?Sized>(host: &H, call: HostCall<'_>) -> SysResult<HostValue> {
    let name = call.name();
    trace!("host call {name}");

    host.call(call).map_err(|fault| translate_fault(name, fault))
}

fn translate_fault(name: &str, fault: HostFault) -> SysError {
    if let HostFault::Coded { code, .. } = &fault {
        if let Some(errno) = Errno::from_code(code) {
            trace!("host call {name} failed with {code}");
            return SysError::Errno(errno);
        }
    }

    error!("host call {name} raised an untranslatable failure: {fault}");
    SysError::Fatal(fault)
}

/// Treat a malformed host result as a fatal failure.
pub(crate) fn shape<T>(result: Result<T, HostFault>) -> SysResult<T> {
    result.map_err(SysError::Fatal)
}
