use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use super::event::TraceEvent;
use crate::host::HostOpenConstants;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    Json,
    Cbor,
}

impl TraceFormat {
    pub fn from_path_and_option(path: &Path, format_opt: Option<&str>) -> Result<Self> {
        if let Some(format_str) = format_opt {
            return match format_str {
                "json" => Ok(TraceFormat::Json),
                "cbor" => Ok(TraceFormat::Cbor),
                _ => bail!("unsupported format: {}", format_str),
            };
        }

        // Infer from file extension
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Ok(TraceFormat::Json),
            Some("cbor") => Ok(TraceFormat::Cbor),
            Some(ext) => bail!("unsupported file extension: .{}", ext),
            None => bail!("cannot determine trace format: no file extension"),
        }
    }
}

/// A trace of host calls, with the open-flag constants of the host it was
/// recorded against.
///
/// As JSON this is one document. As CBOR it is the constants followed by
/// one item per event, so events can be streamed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TraceFile {
    pub constants: HostOpenConstants,
    pub events: Vec<TraceEvent>,
}

impl TraceFile {
    pub fn read(path: &Path, format: TraceFormat) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open trace file at {}", path.display()))?;
        let mut reader = BufReader::new(file);

        match format {
            TraceFormat::Json => serde_json::from_reader(reader).with_context(|| {
                format!("failed to parse JSON trace file at {}", path.display())
            }),
            TraceFormat::Cbor => {
                let constants = read_cbor_header(&mut reader).with_context(|| {
                    format!("failed to parse CBOR trace file at {}", path.display())
                })?;
                let mut events = Vec::new();
                while let Some(event) = next_cbor_event(&mut reader).with_context(|| {
                    format!("failed to parse CBOR trace file at {}", path.display())
                })? {
                    events.push(event);
                }
                Ok(TraceFile { constants, events })
            }
        }
    }

    pub fn write(&self, path: &Path, format: TraceFormat) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create trace file at {}", path.display()))?;

        match format {
            TraceFormat::Json => {
                serde_json::to_writer_pretty(file, self).with_context(|| {
                    format!("failed to write JSON trace file at {}", path.display())
                })?;
            }
            TraceFormat::Cbor => {
                let mut writer = BufWriter::new(file);
                ciborium::into_writer(&self.constants, &mut writer).with_context(|| {
                    format!("failed to write CBOR trace file at {}", path.display())
                })?;
                for event in &self.events {
                    ciborium::into_writer(event, &mut writer).with_context(|| {
                        format!("failed to write CBOR trace file at {}", path.display())
                    })?;
                }
                writer.flush().with_context(|| {
                    format!("failed to flush CBOR trace file at {}", path.display())
                })?;
            }
        }

        Ok(())
    }
}

pub(crate) fn read_cbor_header<R: Read>(reader: &mut R) -> Result<HostOpenConstants> {
    ciborium::from_reader(reader)
        .map_err(|e| anyhow::Error::msg(format!("{}", e)))
        .context("failed to read host constants")
}

/// The next event of a CBOR stream, or `None` at end of file.
pub(crate) fn next_cbor_event<R: Read>(reader: &mut R) -> Result<Option<TraceEvent>> {
    match ciborium::from_reader::<TraceEvent, _>(reader) {
        Ok(event) => Ok(Some(event)),
        Err(ciborium::de::Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(anyhow::Error::msg(format!("{}", e))).context("failed to read trace event"),
    }
}
