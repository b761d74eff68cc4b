// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: the `lopdf`-backed document sink and the content, font and
// image objects it writes.

pub mod content;
pub mod document;
mod font;
mod xobject;

pub use content::{encode_win_ansi, win_ansi_char};
pub use document::PdfDocument;
