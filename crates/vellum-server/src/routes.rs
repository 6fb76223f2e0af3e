// SPDX-License-Identifier: MIT
//
// Router and request handlers.
//
// Each handler is a thin adapter: extract the multipart form, call the
// dispatcher, wrap the result as a file download. All policy lives in the
// dispatcher; all status-code knowledge lives in `error`.

use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use vellum_core::types::OperationOutput;
use vellum_dispatch::Dispatcher;

use crate::error::ApiError;
use crate::extract;

/// Upload size cap; office documents and photo batches can be large.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Build the application router.
pub fn build_router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/pdf-to-word", post(pdf_to_word))
        .route("/word-to-pdf", post(word_to_pdf))
        .route("/photo-to-pdf", post(photo_to_pdf))
        .route("/lock", post(lock))
        .route("/unlock", post(unlock))
        .with_state(dispatcher)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// -- Service endpoints --------------------------------------------------------

async fn index() -> impl IntoResponse {
    Json(json!({
        "service": "vellum",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/pdf-to-word",
            "/word-to-pdf",
            "/photo-to-pdf",
            "/lock",
            "/unlock",
        ],
    }))
}

async fn health(State(dispatcher): State<Dispatcher>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "engine_available": dispatcher.engine_available(),
        "scratch_dir": dispatcher.scratch_root().display().to_string(),
    }))
}

// -- Operation handlers -------------------------------------------------------

async fn pdf_to_word(
    State(dispatcher): State<Dispatcher>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = extract::document_form(multipart).await?;
    let output = dispatcher.pdf_to_word(form.file).await?;
    Ok(download(output))
}

async fn word_to_pdf(
    State(dispatcher): State<Dispatcher>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = extract::document_form(multipart).await?;
    let output = dispatcher.word_to_pdf(form.file).await?;
    Ok(download(output))
}

async fn photo_to_pdf(
    State(dispatcher): State<Dispatcher>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let files = extract::files_form(multipart).await?;
    let output = dispatcher.photos_to_pdf(files).await?;
    Ok(download(output))
}

async fn lock(
    State(dispatcher): State<Dispatcher>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = extract::document_form(multipart).await?;
    let output = dispatcher.lock(form.file, &form.password).await?;
    Ok(download(output))
}

async fn unlock(
    State(dispatcher): State<Dispatcher>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = extract::document_form(multipart).await?;
    let output = dispatcher.unlock(form.file, &form.password).await?;
    Ok(download(output))
}

/// Wrap operation output as a file download.
fn download(output: OperationOutput) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        output.filename.replace('"', "_")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(output.mime_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.bytes,
    )
        .into_response()
}

// --

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};
    use tower::ServiceExt;

    use vellum_convert::ScratchDir;

    use super::*;

    const BOUNDARY: &str = "vellum-test-boundary";

    fn app() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path()).unwrap();
        (build_router(Dispatcher::new(scratch, None)), dir)
    }

    /// Build a multipart body: each part is (field name, optional filename,
    /// content bytes).
    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Body {
        let mut body: Vec<u8> = Vec::new();
        for (name, filename, bytes) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(parts))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn sample_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([0, 128, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn index_and_health_answer() {
        let (app, _dir) = app();
        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        assert!(String::from_utf8(body).unwrap().contains("healthy"));
    }

    #[tokio::test]
    async fn lock_returns_a_named_download() {
        let (app, _dir) = app();
        let pdf = sample_pdf();
        let request = multipart_request(
            "/lock",
            &[
                ("file", Some("report.pdf"), &pdf),
                ("password", None, b"hunter22"),
            ],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("report_locked.pdf"), "{disposition}");
    }

    #[tokio::test]
    async fn short_password_is_a_400_with_json_error() {
        let (app, _dir) = app();
        let pdf = sample_pdf();
        let request = multipart_request(
            "/lock",
            &[("file", Some("report.pdf"), &pdf), ("password", None, b"ab")],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.contains("error"), "{body}");
        assert!(body.contains("at least 4"), "{body}");
    }

    #[tokio::test]
    async fn wrong_unlock_password_is_a_401() {
        let (app, _dir) = app();
        let pdf = sample_pdf();
        let locked = {
            let request = multipart_request(
                "/lock",
                &[
                    ("file", Some("report.pdf"), &pdf),
                    ("password", None, b"hunter22"),
                ],
            );
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            body_bytes(response).await
        };

        let request = multipart_request(
            "/unlock",
            &[
                ("file", Some("report_locked.pdf"), &locked),
                ("password", None, b"wrong"),
            ],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_file_is_a_400() {
        let (app, _dir) = app();
        let request = multipart_request("/lock", &[("password", None, b"hunter22")]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn word_to_pdf_without_engine_is_a_503() {
        let (app, _dir) = app();
        let request = multipart_request("/word-to-pdf", &[("file", Some("memo.docx"), b"PK fake")]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unsupported_upload_is_a_400() {
        let (app, _dir) = app();
        let request = multipart_request("/pdf-to-word", &[("file", Some("notes.txt"), b"hello")]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn photo_album_roundtrip() {
        let (app, _dir) = app();
        let png = sample_png();
        let request = multipart_request(
            "/photo-to-pdf",
            &[
                ("files", Some("a.png"), &png),
                ("files", Some("b.png"), &png),
            ],
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("photos_converted.pdf"));
        let body = body_bytes(response).await;
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn empty_album_is_a_400() {
        let (app, _dir) = app();
        let request = multipart_request("/photo-to-pdf", &[]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pdf_to_word_returns_a_docx() {
        let (app, _dir) = app();
        let pdf = sample_pdf();
        let request = multipart_request("/pdf-to-word", &[("file", Some("report.pdf"), &pdf)]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("report.docx"), "{disposition}");
        let body = body_bytes(response).await;
        assert_eq!(&body[..2], b"PK");
    }
}
