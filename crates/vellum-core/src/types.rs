// SPDX-License-Identifier: MIT
//
// Core domain types for Vellum.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VellumError};

/// Supported container formats, derived once from the uploaded filename.
///
/// Everything downstream of classification is keyed on this tag: strategy
/// selection never looks at raw extension strings again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatTag {
    Pdf,
    WordProcessing,
    Spreadsheet,
    Presentation,
    Image,
}

impl FormatTag {
    /// Classify an uploaded filename by its extension (case-insensitive).
    ///
    /// Unknown extensions fail with [`VellumError::UnsupportedFormat`]
    /// carrying the full filename for diagnostics.
    pub fn classify(filename: &str) -> Result<Self> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" | "doc" => Ok(Self::WordProcessing),
            "xlsx" => Ok(Self::Spreadsheet),
            "pptx" => Ok(Self::Presentation),
            "jpg" | "jpeg" | "png" | "webp" => Ok(Self::Image),
            _ => Err(VellumError::UnsupportedFormat(filename.to_string())),
        }
    }

    /// MIME type for the Content-Type response header.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::WordProcessing => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            Self::Presentation => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Image => "application/octet-stream",
        }
    }

    /// Whether this format is an OOXML ZIP package (all three office
    /// formats share one encryption strategy).
    pub fn is_ooxml(&self) -> bool {
        matches!(
            self,
            Self::WordProcessing | Self::Spreadsheet | Self::Presentation
        )
    }
}

/// The operation a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    ConvertToWordProcessing,
    ConvertToPdf,
    ImagesToPdf,
    Lock,
    Unlock,
}

/// An uploaded file: original name plus raw bytes. Immutable for the
/// lifetime of the request.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// The successful result of one operation: output bytes plus the response
/// metadata the boundary layer needs.
#[derive(Debug, Clone)]
pub struct OperationOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub filename: String,
}

// -- Filename conventions -----------------------------------------------------
//
// Display conventions only; they say nothing about whether the bytes are
// actually encrypted.

/// Insert a `_locked` marker before the extension: `report.pdf` →
/// `report_locked.pdf`.
pub fn locked_filename(original: &str) -> String {
    append_marker(original, "_locked")
}

/// Replace a `_locked` marker with `_unlocked` if present, otherwise append
/// `_unlocked` before the extension.
pub fn unlocked_filename(original: &str) -> String {
    let (stem, ext) = split_name(original);
    if stem.contains("_locked") {
        let stem = stem.replace("_locked", "_unlocked");
        join_name(&stem, ext)
    } else {
        append_marker(original, "_unlocked")
    }
}

/// Swap the extension: `report.pdf` + `docx` → `report.docx`.
pub fn converted_filename(original: &str, new_ext: &str) -> String {
    let (stem, _) = split_name(original);
    format!("{stem}.{new_ext}")
}

fn append_marker(original: &str, marker: &str) -> String {
    let (stem, ext) = split_name(original);
    join_name(&format!("{stem}{marker}"), ext)
}

fn split_name(name: &str) -> (String, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext)),
        _ => (name.to_string(), None),
    }
}

fn join_name(stem: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}
