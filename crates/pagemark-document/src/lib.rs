// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagemark-document: Marker placement and pagination for the Pagemark engine.
//
// Places fixed-size marker images onto their owning pages in a row-major grid,
// appends overflow pages when a page runs out of vertical space, and appends a
// three-column index of every marker. Drawing goes through the `DocumentSink`
// trait; `PdfDocument` implements it on top of `lopdf`, `RecordingSink` keeps
// everything in memory for previews and tests.

pub mod engine;
pub mod layout;
pub mod pdf;
pub mod recording;
pub mod resources;
pub mod sink;

// Re-export the primary structs so callers can use `pagemark_document::MarkerEngine` etc.
pub use engine::MarkerEngine;
pub use layout::grid::GridPlacer;
pub use layout::index::{IndexEntry, IndexPaginator};
pub use pdf::document::PdfDocument;
pub use recording::RecordingSink;
pub use resources::ResourceCache;
pub use sink::{DocumentSink, DrawOp, DrawingContext, FontHandle, ImageHandle};
