// SPDX-License-Identifier: MIT
//
// PDF to word-processing conversion.
//
// The upload is staged as a scratch artifact and text is extracted per
// page with `lopdf`, then re-flowed into a DOCX with `docx-rs`, one
// paragraph per extracted line and an explicit page break between source
// pages. Layout is not reconstructed; the output is the editable text of
// the document. Both the staged input and the produced output are
// transient artifacts, released on every exit path.

use std::fs::File;

use docx_rs::{BreakType, Docx, Paragraph, Run};
use tracing::{debug, info, instrument};

use vellum_core::error::{Result, VellumError};
use vellum_core::types::converted_filename;

use crate::scratch::ScratchDir;

/// Convert PDF bytes into a DOCX document. Blocking; callers run it on
/// the blocking pool.
///
/// A page whose text cannot be extracted (image-only scans, exotic
/// encodings) becomes an empty page rather than failing the whole
/// document. Only an unparseable container is an error.
#[instrument(skip_all, fields(filename = %filename, bytes = bytes.len()))]
pub fn convert(scratch: &ScratchDir, filename: &str, bytes: &[u8]) -> Result<Vec<u8>> {
    let input = scratch.acquire(filename);
    std::fs::write(input.path(), bytes)?;

    let doc = lopdf::Document::load(input.path())
        .map_err(|err| VellumError::ConversionFailed(format!("unreadable PDF: {err}")))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut docx = Docx::new();

    for (idx, page_number) in page_numbers.iter().enumerate() {
        if idx > 0 {
            docx = docx
                .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
        }

        let text = match doc.extract_text(&[*page_number]) {
            Ok(text) => text,
            Err(err) => {
                debug!(page = page_number, %err, "no extractable text on page");
                String::new()
            }
        };

        for line in text.lines() {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
        }
    }

    let output = scratch.acquire(&converted_filename(filename, "docx"));
    let file = File::create(output.path())?;
    docx.build()
        .pack(file)
        .map_err(|err| VellumError::ConversionFailed(format!("DOCX packaging: {err}")))?;

    let bytes_out = std::fs::read(output.path())?;
    info!(
        pages = page_numbers.len(),
        output_bytes = bytes_out.len(),
        "PDF converted to word-processing document"
    );
    Ok(bytes_out)
}

// --
