use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Context};
use log::debug;

use crate::host::{HostCall, HostFault, HostFs, HostOpenConstants, HostValue};
use crate::trace::{next_cbor_event, read_cbor_header, CallRecord, TraceEvent, TraceFile, TraceFormat};
use crate::Result;

enum PlaybackSource {
    /// All events loaded in memory (used for JSON traces)
    Memory(VecDeque<TraceEvent>),
    /// Streaming from a CBOR file
    Stream(BufReader<File>),
}

/// A host that answers every call from a recorded trace.
///
/// Each call must match the next recorded call exactly. Anything else
/// (a different call, an exhausted trace) is reported as an unrecognized
/// fault, which the syscall layer treats as fatal.
pub struct PlaybackHost {
    constants: HostOpenConstants,
    source: Mutex<PlaybackSource>,
}

impl PlaybackHost {
    pub fn from_file(path: &Path, format: TraceFormat) -> Result<Self> {
        match format {
            TraceFormat::Json => Ok(Self::from_trace(TraceFile::read(path, format)?)),
            TraceFormat::Cbor => {
                // For CBOR, we stream events on demand instead of loading all at once
                let file = File::open(path)
                    .with_context(|| format!("failed to open trace file at {}", path.display()))?;
                let mut reader = BufReader::new(file);
                let constants = read_cbor_header(&mut reader).with_context(|| {
                    format!("failed to parse CBOR trace file at {}", path.display())
                })?;
                Ok(Self {
                    constants,
                    source: Mutex::new(PlaybackSource::Stream(reader)),
                })
            }
        }
    }

    pub fn from_trace(trace: TraceFile) -> Self {
        Self {
            constants: trace.constants,
            source: Mutex::new(PlaybackSource::Memory(trace.events.into())),
        }
    }

    fn source(&self) -> MutexGuard<'_, PlaybackSource> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_event(&self) -> Result<TraceEvent> {
        match &mut *self.source() {
            PlaybackSource::Memory(events) => events.pop_front().ok_or(anyhow!("trace exhausted")),
            PlaybackSource::Stream(reader) => next_cbor_event(reader)
                .context("failed to read next event from CBOR trace")?
                .ok_or(anyhow!("trace exhausted")),
        }
    }

    /// Succeeds only if every recorded event has been replayed.
    pub fn finish(self) -> Result<()> {
        let source = self
            .source
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        match source {
            PlaybackSource::Memory(events) => {
                if events.is_empty() {
                    Ok(())
                } else {
                    Err(anyhow!(
                        "trace contains {} unused events, starting with: {:?}",
                        events.len(),
                        events.front()
                    ))
                }
            }
            PlaybackSource::Stream(mut reader) => match next_cbor_event(&mut reader)
                .context("error while checking for remaining events in CBOR trace")?
            {
                None => Ok(()),
                Some(event) => Err(anyhow!(
                    "trace contains unused events, starting with: {:?}",
                    event
                )),
            },
        }
    }

    fn replay(&self, call: HostCall<'_>) -> Result<std::result::Result<HostValue, HostFault>> {
        let actual = CallRecord::from(&call);
        let TraceEvent {
            call: expected,
            result,
            data,
        } = self.next_event()?;

        if actual != expected {
            return Err(anyhow!(
                "host call mismatch: expected {:?}, got {:?}",
                expected,
                actual
            ));
        }
        debug!("replaying host call {}", call.name());

        match call {
            HostCall::Read { buf, .. } => {
                let data = data.unwrap_or_default();
                if data.len() > buf.len() {
                    return Err(anyhow!(
                        "recorded read of {} bytes does not fit a {} byte buffer",
                        data.len(),
                        buf.len()
                    ));
                }
                buf[..data.len()].copy_from_slice(&data);
            }
            HostCall::Write {
                fd: fd @ (1 | 2),
                buf,
                offset: None,
            } if result.is_ok() => echo(fd, buf),
            _ => {}
        }

        Ok(result)
    }
}

/// Replayed writes to stdout and stderr still show up on the terminal.
fn echo(fd: i32, buf: &[u8]) {
    let written = if fd == 1 {
        io::stdout().lock().write_all(buf)
    } else {
        io::stderr().lock().write_all(buf)
    };
    if let Err(err) = written {
        debug!("failed to echo replayed write to fd {fd}: {err}");
    }
}

impl HostFs for PlaybackHost {
    fn constants(&self) -> HostOpenConstants {
        self.constants
    }

    fn call(&self, call: HostCall<'_>) -> std::result::Result<HostValue, HostFault> {
        self.replay(call)
            .unwrap_or_else(|err| Err(HostFault::unrecognized(format!("{err:#}"))))
    }
}
