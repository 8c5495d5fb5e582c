use anyhow::Result;
use log::info;
use std::path::Path;

use super::format::{TraceFile, TraceFormat};

pub fn convert(
    input: &Path,
    output: &Path,
    input_format: TraceFormat,
    output_format: TraceFormat,
) -> Result<()> {
    let trace = TraceFile::read(input, input_format)?;
    info!(
        "converting {} events from {} ({:?}) to {} ({:?})",
        trace.events.len(),
        input.display(),
        input_format,
        output.display(),
        output_format
    );
    trace.write(output, output_format)
}
