// SPDX-License-Identifier: MIT
//
// Photo album assembly: the uploaded images become one PDF, one A4 page
// per image in upload order, built with `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: pages are `Vec<Op>` operation
// lists and the document is serialised in one `save()` call, so the whole
// assembly happens in memory without touching the scratch directory.

use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use vellum_core::error::{Result, VellumError};
use vellum_core::types::UploadedDocument;

// A4 portrait.
const PAGE_W_MM: f32 = 210.0;
const PAGE_H_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;

/// Placement DPI for raster content; reasonable for print.
const DPI: f32 = 150.0;

/// Assemble the uploaded images into a single PDF, preserving upload order.
///
/// Each image gets its own page, scaled to fit within the page margins
/// while preserving aspect ratio and never upscaled. A single undecodable
/// image fails the whole operation; partial albums are never produced.
#[instrument(skip_all, fields(count = images.len()))]
pub fn assemble(images: &[UploadedDocument]) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::new("Photo Album");
    let mut pages: Vec<PdfPage> = Vec::with_capacity(images.len());

    for upload in images {
        let decoded = image::load_from_memory(&upload.bytes).map_err(|err| {
            VellumError::ConversionFailed(format!(
                "failed to decode image '{}': {err}",
                upload.filename
            ))
        })?;

        let img_width = decoded.width() as usize;
        let img_height = decoded.height() as usize;
        let rgb = decoded.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: img_width,
            height: img_height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = doc.add_image(&raw);

        pages.push(image_page(xobject_id, img_width, img_height));
        debug!(filename = %upload.filename, img_width, img_height, "image placed");
    }

    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);

    info!(
        pages = images.len(),
        output_bytes = output.len(),
        "photo album assembled"
    );
    Ok(output)
}

/// Build one A4 page showing the image centred inside the margins.
fn image_page(xobject_id: printpdf::XObjectId, img_width: usize, img_height: usize) -> PdfPage {
    let usable_w_pt = Mm(PAGE_W_MM - 2.0 * MARGIN_MM).into_pt().0;
    let usable_h_pt = Mm(PAGE_H_MM - 2.0 * MARGIN_MM).into_pt().0;

    // Native size at the placement DPI, then fit-to-page without upscaling.
    let img_w_pt = img_width as f32 / DPI * 72.0;
    let img_h_pt = img_height as f32 / DPI * 72.0;
    let scale = (usable_w_pt / img_w_pt)
        .min(usable_h_pt / img_h_pt)
        .min(1.0);

    let margin_pt = Mm(MARGIN_MM).into_pt().0;
    let x_offset = margin_pt + (usable_w_pt - img_w_pt * scale) / 2.0;
    let y_offset = margin_pt + (usable_h_pt - img_h_pt * scale) / 2.0;

    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(x_offset)),
            translate_y: Some(Pt(y_offset)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(DPI),
            rotate: None,
        },
    }];

    PdfPage::new(Mm(PAGE_W_MM), Mm(PAGE_H_MM), ops)
}

// --
