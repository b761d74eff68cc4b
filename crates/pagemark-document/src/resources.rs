// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resource cache: document-scoped drawing resources loaded once per run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pagemark_core::error::Result;
use pagemark_core::{DocumentId, FontSource};
use tracing::{debug, info};

use crate::sink::{DocumentSink, FontHandle, ImageHandle};

/// Lazily loaded font and image handles bound to one document handle.
///
/// Handles are only valid inside the document that produced them, so the
/// cache remembers which document it was filled from and starts over as soon
/// as it is asked about a different one (including the same file reopened).
#[derive(Debug)]
pub struct ResourceCache {
    source: FontSource,
    document: Option<DocumentId>,
    font: Option<FontHandle>,
    images: HashMap<PathBuf, ImageHandle>,
}

impl ResourceCache {
    pub fn new(source: FontSource) -> Self {
        Self {
            source,
            document: None,
            font: None,
            images: HashMap::new(),
        }
    }

    /// The drawing font for `sink`'s document, loading it on first use.
    pub fn font<S: DocumentSink + ?Sized>(&mut self, sink: &mut S) -> Result<FontHandle> {
        self.bind(sink.document_id()?);
        if let Some(font) = &self.font {
            return Ok(font.clone());
        }

        info!(source = ?self.source, "Loading drawing font");
        let font = sink.load_font(&self.source)?;
        self.font = Some(font.clone());
        Ok(font)
    }

    /// The embedded image for `artifact`, embedding it on first use.
    ///
    /// Failures are not cached; the caller decides whether to skip or abort.
    pub fn image<S: DocumentSink + ?Sized>(
        &mut self,
        sink: &mut S,
        artifact: &Path,
    ) -> Result<ImageHandle> {
        self.bind(sink.document_id()?);
        if let Some(image) = self.images.get(artifact) {
            return Ok(image.clone());
        }

        let image = sink.embed_image(artifact)?;
        debug!(
            artifact = %artifact.display(),
            width = image.pixel_width,
            height = image.pixel_height,
            "Artifact embedded"
        );
        self.images.insert(artifact.to_path_buf(), image.clone());
        Ok(image)
    }

    /// Drop every cached handle.
    pub fn invalidate(&mut self) {
        self.document = None;
        self.font = None;
        self.images.clear();
    }

    /// Whether a font handle is currently cached.
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn cached_images(&self) -> usize {
        self.images.len()
    }

    fn bind(&mut self, document: DocumentId) {
        if self.document != Some(document) {
            if self.document.is_some() {
                debug!(%document, "Document handle changed, dropping cached resources");
            }
            self.invalidate();
            self.document = Some(document);
        }
    }
}
