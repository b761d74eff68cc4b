// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document sink: the mutable document the placement passes draw into.
//
// A `DrawingContext` buffers the draw calls for one page and hands them to the
// sink when it is closed. It holds the only mutable borrow of the sink while it
// is open, so a page cannot be appended (or another context opened) until the
// current one has been closed.

use std::path::Path;

use pagemark_core::error::Result;
use pagemark_core::{DocumentId, FontSource, PageGeometry, Point, Rect};

use crate::resources::ResourceCache;

/// A font loaded into one specific document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontHandle {
    pub document: DocumentId,
    /// Sink-assigned key, unique within the document.
    pub key: u32,
}

/// A raster image embedded into one specific document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    pub document: DocumentId,
    pub key: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

/// One buffered draw call. Coordinates are page space relative to the media
/// box origin.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Stroke the outline of `rect`.
    Rect { rect: Rect, line_width: f32 },
    /// Paint `image` scaled into `rect`.
    Image { image: ImageHandle, rect: Rect },
    /// Show `text` with its baseline starting at `origin`.
    Text {
        font: FontHandle,
        size: f32,
        origin: Point,
        text: String,
    },
}

/// The document the engine draws into.
///
/// Implementations must fail every call with `DocumentClosed` once the
/// underlying handle has been closed.
pub trait DocumentSink {
    /// Identity of the currently open handle.
    fn document_id(&self) -> Result<DocumentId>;

    fn page_count(&self) -> Result<u32>;

    /// Geometry of a 1-indexed page; `PageOutOfRange` outside `[1, page_count]`.
    fn page_geometry(&self, page: u32) -> Result<PageGeometry>;

    /// Append a blank page at the end of the document and return its number.
    fn append_page(&mut self, geometry: PageGeometry) -> Result<u32>;

    /// Load the drawing font into this document.
    fn load_font(&mut self, source: &FontSource) -> Result<FontHandle>;

    /// Embed a PNG/JPEG artifact. Unreadable or undecodable artifacts fail with
    /// `ArtifactUnavailable`.
    fn embed_image(&mut self, artifact: &Path) -> Result<ImageHandle>;

    /// Append a batch of draw calls to a page.
    fn commit(&mut self, page: u32, ops: Vec<DrawOp>) -> Result<()>;
}

/// The single open drawing surface of one page.
pub struct DrawingContext<'s, S: DocumentSink + ?Sized> {
    sink: &'s mut S,
    page: u32,
    geometry: PageGeometry,
    ops: Vec<DrawOp>,
}

impl<'s, S: DocumentSink + ?Sized> DrawingContext<'s, S> {
    /// Open the drawing surface of `page`.
    pub fn open(sink: &'s mut S, page: u32) -> Result<Self> {
        let geometry = sink.page_geometry(page)?;
        Ok(Self {
            sink,
            page,
            geometry,
            ops: Vec::new(),
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Number of draw calls buffered so far.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn stroke_rect(&mut self, rect: Rect, line_width: f32) {
        self.ops.push(DrawOp::Rect { rect, line_width });
    }

    pub fn draw_image(&mut self, image: &ImageHandle, rect: Rect) {
        self.ops.push(DrawOp::Image {
            image: image.clone(),
            rect,
        });
    }

    /// Queue a text run. Empty text draws nothing.
    pub fn show_text(&mut self, font: &FontHandle, size: f32, origin: Point, text: &str) {
        if text.is_empty() {
            return;
        }
        self.ops.push(DrawOp::Text {
            font: font.clone(),
            size,
            origin,
            text: text.to_string(),
        });
    }

    /// Resolve an artifact through the run's cache while this context is open.
    pub fn resolve_image(
        &mut self,
        resources: &mut ResourceCache,
        artifact: &Path,
    ) -> Result<ImageHandle> {
        resources.image(&mut *self.sink, artifact)
    }

    /// Close the context, handing the buffered draw calls to the sink.
    pub fn close(self) -> Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        self.sink.commit(self.page, self.ops)
    }
}
