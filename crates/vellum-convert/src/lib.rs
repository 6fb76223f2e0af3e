// SPDX-License-Identifier: MIT
//
// vellum-convert: format conversion strategies and their supporting
// machinery: the shared scratch directory, the external process bridge,
// and the startup-probed conversion engine.

pub mod bridge;
pub mod engine;
pub mod images;
pub mod pdf_to_docx;
pub mod scratch;
pub mod word_to_pdf;

pub use bridge::{BridgeOutput, CommandRunner, ProcessBridge};
pub use engine::DocxEngine;
pub use scratch::{ScratchDir, TransientArtifact};
