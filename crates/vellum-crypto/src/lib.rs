// SPDX-License-Identifier: MIT
//
// vellum-crypto: password protection for document containers.
//
// Two strategy families, selected by format tag:
//   - `pdf`: lock/unlock via the PDF standard security handler (lopdf).
//   - `ooxml`: lock/unlock via ECMA-376 Agile Encryption, shared by
//     word-processing, spreadsheet, and presentation packages.

pub mod ooxml;
pub mod pdf;
