mod convert;
mod event;
mod format;

pub use convert::convert;
pub use event::{CallRecord, TraceEvent};
pub(crate) use format::{next_cbor_event, read_cbor_header};
pub use format::{TraceFile, TraceFormat};
