// SPDX-License-Identifier: MIT
//
// Word-processing to PDF via the external document engine.
//
// The engine writes its output next to the staged input, named after the
// input stem with a `.pdf` extension. The existence of that file is the
// authoritative success signal: engines have been observed exiting zero
// after producing nothing, and exiting nonzero after producing a usable
// document.

use tracing::{debug, info, instrument};

use vellum_core::error::{Result, VellumError};

use crate::engine::DocxEngine;
use crate::scratch::ScratchDir;

/// Converts an uploaded word-processing document to PDF.
///
/// The input bytes are staged under the scratch directory, the engine is
/// invoked with that path, and the produced PDF is read back. Both the
/// staged input and the produced output are transient artifacts and are
/// removed on every exit path, including timeout and engine failure.
#[instrument(skip_all, fields(filename = %filename, bytes = bytes.len()))]
pub async fn convert(
    scratch: &ScratchDir,
    engine: &DocxEngine,
    filename: &str,
    bytes: &[u8],
) -> Result<Vec<u8>> {
    let input = scratch.acquire(filename);
    tokio::fs::write(input.path(), bytes).await?;

    // Claim the expected output path up front so it is cleaned up even
    // when the engine half-writes it and then fails.
    let expected = input.path().with_extension("pdf");
    let output = scratch.adopt(expected);

    engine.convert_to_pdf(input.path(), scratch.root()).await?;

    if !output.path().exists() {
        debug!(expected = %output.path().display(), "engine exited without producing output");
        return Err(VellumError::ConversionFailed(
            "document engine produced no output file".into(),
        ));
    }

    let pdf = tokio::fs::read(output.path()).await?;
    info!(output_bytes = pdf.len(), "word-processing document converted");
    Ok(pdf)
}

// --
