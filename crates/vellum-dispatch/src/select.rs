// SPDX-License-Identifier: MIT
//
// Strategy selection: a pure mapping from (operation, format) to the
// strategy that handles it. Unmapped pairs are rejected here, before any
// bytes are touched.

use vellum_core::error::{Result, VellumError};
use vellum_core::types::{FormatTag, OperationKind};

/// A concrete strategy the dispatcher can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PdfLock,
    PdfUnlock,
    OoxmlLock,
    OoxmlUnlock,
    PdfToWordProcessing,
    WordProcessingToPdf,
    ImagesToPdf,
}

/// Select the strategy for an (operation, format) pair.
///
/// The filename is only used to build the rejection message for pairs no
/// strategy handles, like locking an image or converting a spreadsheet.
pub fn select(operation: OperationKind, format: FormatTag, filename: &str) -> Result<Strategy> {
    let strategy = match (operation, format) {
        (OperationKind::Lock, FormatTag::Pdf) => Strategy::PdfLock,
        (OperationKind::Unlock, FormatTag::Pdf) => Strategy::PdfUnlock,
        (OperationKind::Lock, tag) if tag.is_ooxml() => Strategy::OoxmlLock,
        (OperationKind::Unlock, tag) if tag.is_ooxml() => Strategy::OoxmlUnlock,
        (OperationKind::ConvertToWordProcessing, FormatTag::Pdf) => Strategy::PdfToWordProcessing,
        (OperationKind::ConvertToPdf, FormatTag::WordProcessing) => Strategy::WordProcessingToPdf,
        (OperationKind::ImagesToPdf, FormatTag::Image) => Strategy::ImagesToPdf,
        _ => return Err(VellumError::UnsupportedFormat(filename.to_string())),
    };
    Ok(strategy)
}
