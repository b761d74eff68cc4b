// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording sink: an in-memory `DocumentSink` that keeps every draw call.
//
// Used for dry runs (layout previews without touching a PDF) and as the test
// double for the placement passes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use pagemark_core::error::{PagemarkError, Result};
use pagemark_core::{DocumentId, FontSource, PageGeometry};
use tracing::debug;

use crate::sink::{DocumentSink, DrawOp, FontHandle, ImageHandle};

/// Pixel size reported for artifacts that are accepted without being read.
const UNREAD_ARTIFACT_PX: u32 = 250;

/// One page of a [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct RecordedPage {
    pub geometry: PageGeometry,
    /// True for pages appended during the run.
    pub appended: bool,
    /// One entry per closed drawing context, in commit order.
    pub commits: Vec<Vec<DrawOp>>,
}

impl RecordedPage {
    /// All draw calls on this page in order.
    pub fn ops(&self) -> impl Iterator<Item = &DrawOp> {
        self.commits.iter().flatten()
    }
}

/// In-memory document.
#[derive(Debug)]
pub struct RecordingSink {
    id: DocumentId,
    open: bool,
    pages: Vec<RecordedPage>,
    missing: HashSet<PathBuf>,
    verify_artifacts: bool,
    images: HashMap<PathBuf, ImageHandle>,
    next_key: u32,
    font_loads: u32,
    image_embeds: u32,
}

impl RecordingSink {
    /// A document with one page per geometry.
    pub fn new(geometries: Vec<PageGeometry>) -> Self {
        let pages = geometries
            .into_iter()
            .map(|geometry| RecordedPage {
                geometry,
                appended: false,
                commits: Vec::new(),
            })
            .collect();
        Self {
            id: DocumentId::new(),
            open: true,
            pages,
            missing: HashSet::new(),
            verify_artifacts: false,
            images: HashMap::new(),
            next_key: 1,
            font_loads: 0,
            image_embeds: 0,
        }
    }

    /// A document of `count` identical pages.
    pub fn uniform(geometry: PageGeometry, count: usize) -> Self {
        Self::new(vec![geometry; count])
    }

    /// Treat `artifact` as unreadable.
    pub fn with_missing(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.missing.insert(artifact.into());
        self
    }

    /// Check artifacts on disk (existence and PNG/JPEG signature) instead of
    /// accepting every path.
    pub fn verifying_artifacts(mut self) -> Self {
        self.verify_artifacts = true;
        self
    }

    /// Simulate closing and reopening the document: a new handle identity,
    /// and nothing previously loaded is valid any more.
    pub fn reopen(&mut self) {
        self.id = DocumentId::new();
        self.open = true;
        self.images.clear();
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn pages(&self) -> &[RecordedPage] {
        &self.pages
    }

    /// Page by 1-indexed number.
    pub fn page(&self, page: u32) -> Option<&RecordedPage> {
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
    }

    /// How many times a font was loaded into this sink.
    pub fn font_loads(&self) -> u32 {
        self.font_loads
    }

    /// How many artifacts were embedded (cache misses in the sink itself).
    pub fn image_embeds(&self) -> u32 {
        self.image_embeds
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(PagemarkError::DocumentClosed)
        }
    }

    fn next_key(&mut self) -> u32 {
        let key = self.next_key;
        self.next_key += 1;
        key
    }

    fn check_artifact(&self, artifact: &Path) -> Result<(u32, u32)> {
        let unavailable = |reason: String| PagemarkError::ArtifactUnavailable {
            artifact: artifact.to_path_buf(),
            reason,
        };

        if self.missing.contains(artifact) {
            return Err(unavailable("marked missing".to_string()));
        }
        if !self.verify_artifacts {
            return Ok((UNREAD_ARTIFACT_PX, UNREAD_ARTIFACT_PX));
        }

        let reader = ImageReader::open(artifact)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|err| unavailable(err.to_string()))?;
        match reader.format() {
            Some(ImageFormat::Png | ImageFormat::Jpeg) => {}
            other => return Err(unavailable(format!("unsupported format {other:?}"))),
        }
        reader
            .into_dimensions()
            .map_err(|err| unavailable(err.to_string()))
    }
}

impl DocumentSink for RecordingSink {
    fn document_id(&self) -> Result<DocumentId> {
        self.ensure_open()?;
        Ok(self.id)
    }

    fn page_count(&self) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.pages.len() as u32)
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry> {
        self.ensure_open()?;
        self.page(page)
            .map(|recorded| recorded.geometry)
            .ok_or(PagemarkError::PageOutOfRange {
                page,
                page_count: self.pages.len() as u32,
            })
    }

    fn append_page(&mut self, geometry: PageGeometry) -> Result<u32> {
        self.ensure_open()?;
        self.pages.push(RecordedPage {
            geometry,
            appended: true,
            commits: Vec::new(),
        });
        debug!(page = self.pages.len(), "Recorded page appended");
        Ok(self.pages.len() as u32)
    }

    fn load_font(&mut self, source: &FontSource) -> Result<FontHandle> {
        self.ensure_open()?;
        if let FontSource::TrueType { path } = source
            && !path.is_file()
        {
            return Err(PagemarkError::ResourceNotFound(path.display().to_string()));
        }
        self.font_loads += 1;
        Ok(FontHandle {
            document: self.id,
            key: self.next_key(),
        })
    }

    fn embed_image(&mut self, artifact: &Path) -> Result<ImageHandle> {
        self.ensure_open()?;
        if let Some(image) = self.images.get(artifact) {
            return Ok(image.clone());
        }
        let (pixel_width, pixel_height) = self.check_artifact(artifact)?;
        self.image_embeds += 1;
        let image = ImageHandle {
            document: self.id,
            key: self.next_key(),
            pixel_width,
            pixel_height,
        };
        self.images.insert(artifact.to_path_buf(), image.clone());
        Ok(image)
    }

    fn commit(&mut self, page: u32, ops: Vec<DrawOp>) -> Result<()> {
        self.ensure_open()?;
        let page_count = self.pages.len() as u32;
        let recorded = page
            .checked_sub(1)
            .and_then(|index| self.pages.get_mut(index as usize))
            .ok_or(PagemarkError::PageOutOfRange { page, page_count })?;
        recorded.commits.push(ops);
        Ok(())
    }
}
