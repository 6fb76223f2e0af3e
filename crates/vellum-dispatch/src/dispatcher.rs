// SPDX-License-Identifier: MIT
//
// The operation dispatcher.
//
// Validation runs up front and in a fixed order: password policy, input
// presence, format classification, strategy selection. Only a request that
// passes all four reaches a strategy, so rejected requests never allocate
// scratch artifacts or spawn work. CPU-bound strategies run on the
// blocking pool; the word-to-pdf strategy awaits the external engine.

use tracing::instrument;

use vellum_convert::{DocxEngine, ScratchDir, images, pdf_to_docx, word_to_pdf};
use vellum_core::error::{Result, VellumError};
use vellum_core::types::{
    FormatTag, OperationKind, OperationOutput, UploadedDocument, converted_filename,
    locked_filename, unlocked_filename,
};

use crate::select::{Strategy, select};

/// Minimum password length accepted when locking a document.
pub const MIN_LOCK_PASSWORD_LEN: usize = 4;

/// Fixed output name for assembled photo albums.
const ALBUM_FILENAME: &str = "photos_converted.pdf";

/// Routes validated requests to their strategy and assembles the response.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    scratch: ScratchDir,
    engine: Option<DocxEngine>,
}

impl Dispatcher {
    /// `engine` is `None` when startup detection found no document engine;
    /// the word-to-pdf operation then fails per request with
    /// `ConversionUnavailable` while everything else keeps working.
    pub fn new(scratch: ScratchDir, engine: Option<DocxEngine>) -> Self {
        Self { scratch, engine }
    }

    /// Whether startup detection found a document engine. Reported by the
    /// health endpoint.
    pub fn engine_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn scratch_root(&self) -> &std::path::Path {
        self.scratch.root()
    }

    // -- Protection operations ------------------------------------------------

    /// Password-protect a PDF or OOXML document.
    #[instrument(skip_all)]
    pub async fn lock(
        &self,
        input: Option<UploadedDocument>,
        password: &str,
    ) -> Result<OperationOutput> {
        if password.chars().count() < MIN_LOCK_PASSWORD_LEN {
            return Err(VellumError::PasswordTooShort {
                min: MIN_LOCK_PASSWORD_LEN,
            });
        }
        let input = require_input(input)?;
        let format = FormatTag::classify(&input.filename)?;
        let strategy = select(OperationKind::Lock, format, &input.filename)?;

        let filename = locked_filename(&input.filename);
        let password = password.to_string();
        let bytes = run_blocking(move || match strategy {
            Strategy::PdfLock => vellum_crypto::pdf::lock(&input.bytes, &password),
            Strategy::OoxmlLock => vellum_crypto::ooxml::lock(&input.bytes, &password),
            other => Err(VellumError::Internal(format!(
                "lock dispatched to {other:?}"
            ))),
        })
        .await?;

        Ok(OperationOutput {
            bytes,
            mime_type: format.mime_type(),
            filename,
        })
    }

    /// Remove password protection from a PDF or OOXML document.
    #[instrument(skip_all)]
    pub async fn unlock(
        &self,
        input: Option<UploadedDocument>,
        password: &str,
    ) -> Result<OperationOutput> {
        if password.is_empty() {
            return Err(VellumError::PasswordRequired);
        }
        let input = require_input(input)?;
        let format = FormatTag::classify(&input.filename)?;
        let strategy = select(OperationKind::Unlock, format, &input.filename)?;

        let filename = unlocked_filename(&input.filename);
        let password = password.to_string();
        let bytes = run_blocking(move || match strategy {
            Strategy::PdfUnlock => vellum_crypto::pdf::unlock(&input.bytes, &password),
            Strategy::OoxmlUnlock => vellum_crypto::ooxml::unlock(&input.bytes, &password),
            other => Err(VellumError::Internal(format!(
                "unlock dispatched to {other:?}"
            ))),
        })
        .await?;

        Ok(OperationOutput {
            bytes,
            mime_type: format.mime_type(),
            filename,
        })
    }

    // -- Conversion operations ------------------------------------------------

    /// Convert a PDF to an editable word-processing document.
    #[instrument(skip_all)]
    pub async fn pdf_to_word(&self, input: Option<UploadedDocument>) -> Result<OperationOutput> {
        let input = require_input(input)?;
        let format = FormatTag::classify(&input.filename)?;
        select(
            OperationKind::ConvertToWordProcessing,
            format,
            &input.filename,
        )?;

        let filename = converted_filename(&input.filename, "docx");
        let scratch = self.scratch.clone();
        let bytes =
            run_blocking(move || pdf_to_docx::convert(&scratch, &input.filename, &input.bytes))
                .await?;

        Ok(OperationOutput {
            bytes,
            mime_type: FormatTag::WordProcessing.mime_type(),
            filename,
        })
    }

    /// Convert a word-processing document to PDF via the external engine.
    #[instrument(skip_all)]
    pub async fn word_to_pdf(&self, input: Option<UploadedDocument>) -> Result<OperationOutput> {
        let input = require_input(input)?;
        let format = FormatTag::classify(&input.filename)?;
        select(OperationKind::ConvertToPdf, format, &input.filename)?;

        let engine = self.engine.as_ref().ok_or_else(|| {
            VellumError::ConversionUnavailable("no document engine detected at startup".into())
        })?;

        let bytes =
            word_to_pdf::convert(&self.scratch, engine, &input.filename, &input.bytes).await?;

        Ok(OperationOutput {
            bytes,
            mime_type: FormatTag::Pdf.mime_type(),
            filename: converted_filename(&input.filename, "pdf"),
        })
    }

    /// Assemble the uploaded images into a single PDF album.
    #[instrument(skip_all, fields(count = inputs.len()))]
    pub async fn photos_to_pdf(&self, inputs: Vec<UploadedDocument>) -> Result<OperationOutput> {
        if inputs.is_empty() {
            return Err(VellumError::NoInputProvided);
        }
        for upload in &inputs {
            let format = FormatTag::classify(&upload.filename)?;
            select(OperationKind::ImagesToPdf, format, &upload.filename)?;
        }

        let bytes = run_blocking(move || images::assemble(&inputs)).await?;

        Ok(OperationOutput {
            bytes,
            mime_type: FormatTag::Pdf.mime_type(),
            filename: ALBUM_FILENAME.to_string(),
        })
    }
}

// --

fn require_input(input: Option<UploadedDocument>) -> Result<UploadedDocument> {
    match input {
        Some(doc) if !doc.bytes.is_empty() => Ok(doc),
        _ => Err(VellumError::NoInputProvided),
    }
}

async fn run_blocking<F>(job: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> Result<Vec<u8>> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| VellumError::Internal(format!("blocking task failed: {err}")))?
}

// --
