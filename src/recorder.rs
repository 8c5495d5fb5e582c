use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::info;

use crate::host::{HostCall, HostFault, HostFs, HostOpenConstants, HostValue};
use crate::trace::{CallRecord, TraceEvent, TraceFile, TraceFormat};
use crate::Result;

/// A host wrapper that records every call and its outcome.
pub struct RecordingHost<H> {
    inner: H,
    events: Mutex<Vec<TraceEvent>>,
}

impl<H: HostFs> RecordingHost<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn into_trace(self) -> TraceFile {
        let constants = self.inner.constants();
        let events = self
            .events
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        TraceFile { constants, events }
    }

    pub fn save(self, output: &Path, format: TraceFormat) -> Result<()> {
        let trace = self.into_trace();
        info!(
            "saving {} host calls to {}",
            trace.events.len(),
            output.display()
        );
        trace.write(output, format)
    }

    fn record(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl<H: HostFs> HostFs for RecordingHost<H> {
    fn constants(&self) -> HostOpenConstants {
        self.inner.constants()
    }

    fn call(&self, call: HostCall<'_>) -> std::result::Result<HostValue, HostFault> {
        let record = CallRecord::from(&call);

        match call {
            HostCall::Read { fd, buf, offset } => {
                let result = self.inner.call(HostCall::Read {
                    fd,
                    buf: &mut *buf,
                    offset,
                });
                let mut event = TraceEvent::new(record, result.clone());
                if let Ok(HostValue::Int(n)) = &result {
                    let n = usize::try_from(*n).unwrap_or(0).min(buf.len());
                    event = event.with_data(buf[..n].to_vec());
                }
                self.record(event);
                result
            }
            call => {
                let result = self.inner.call(call);
                self.record(TraceEvent::new(record, result.clone()));
                result
            }
        }
    }
}
