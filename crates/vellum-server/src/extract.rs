// SPDX-License-Identifier: MIT
//
// Multipart form extraction.
//
// Uploads arrive as `multipart/form-data`: a `file` part (plus an optional
// `password` text part) for single-document operations, and repeated
// `files` parts for album assembly. Missing parts are not an HTTP error;
// the dispatcher owns input-presence validation so the rejection is the
// same whether the part was absent or empty.

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;

use vellum_core::types::UploadedDocument;

use crate::error::ApiError;

/// A single-document form: the upload plus the password fields share.
#[derive(Debug, Default)]
pub struct DocumentForm {
    pub file: Option<UploadedDocument>,
    pub password: String,
}

/// Extract the `file` and `password` parts. Unknown parts are ignored.
pub async fn document_form(mut multipart: Multipart) -> Result<DocumentForm, ApiError> {
    let mut form = DocumentForm::default();

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(read_error)?;
                form.file = Some(UploadedDocument::new(filename, bytes.to_vec()));
            }
            "password" => form.password = field.text().await.map_err(read_error)?,
            _ => {}
        }
    }

    Ok(form)
}

/// Extract every repeated `files` part, preserving upload order.
pub async fn files_form(mut multipart: Multipart) -> Result<Vec<UploadedDocument>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some("files") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(read_error)?;
        files.push(UploadedDocument::new(filename, bytes.to_vec()));
    }

    Ok(files)
}

fn read_error(err: MultipartError) -> ApiError {
    ApiError::bad_request(format!("malformed multipart body: {err}"))
}
