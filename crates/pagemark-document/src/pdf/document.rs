// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF document: an open `lopdf` document acting as the drawing sink for a
// placement run: page geometry, page appends, font and image registration,
// and content streams.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pagemark_core::error::{PagemarkError, Result};
use pagemark_core::fingerprint::hash_bytes;
use pagemark_core::{DocumentId, FontSource, PageGeometry, Point};
use tracing::{debug, info, instrument, warn};

use super::{content, font, xobject};
use crate::sink::{DocumentSink, DrawOp, FontHandle, ImageHandle};

/// Upper bound on page tree depth when walking `/Parent` links.
const MAX_TREE_DEPTH: usize = 64;

/// A PDF opened for marker placement.
///
/// Every open (including [`PdfDocument::blank`]) gets a fresh [`DocumentId`];
/// handles issued by one document are rejected by every other. After
/// [`PdfDocument::close`] every operation fails with `DocumentClosed`.
pub struct PdfDocument {
    id: DocumentId,
    /// `None` once closed.
    document: Option<Document>,
    /// Source path, if opened from a file.
    source_path: Option<PathBuf>,
    fonts: HashMap<u32, ObjectId>,
    images: HashMap<u32, ObjectId>,
    /// Embedded images by SHA-256 of the artifact bytes.
    fingerprints: HashMap<String, ImageHandle>,
    /// Pages whose original content has already been wrapped in `q`/`Q`.
    isolated: HashSet<ObjectId>,
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        if !path_ref.is_file() {
            return Err(PagemarkError::ResourceNotFound(
                path_ref.display().to_string(),
            ));
        }

        let document = Document::load(path_ref).map_err(|err| {
            PagemarkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        Self::wrap(document, Some(path_ref.to_path_buf()))
    }

    /// Open a PDF from raw bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            PagemarkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        Self::wrap(document, None)
    }

    /// A new document with one empty page per entry of `pages`.
    pub fn blank(pages: &[PageGeometry]) -> Result<Self> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();

        let kids: Vec<Object> = pages
            .iter()
            .map(|geometry| {
                document
                    .add_object(dictionary! {
                        "Type" => "Page",
                        "Parent" => pages_id,
                        "MediaBox" => media_box(geometry),
                    })
                    .into()
            })
            .collect();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self::wrap(document, None)
    }

    fn wrap(document: Document, source_path: Option<PathBuf>) -> Result<Self> {
        if document.is_encrypted() {
            return Err(PagemarkError::InvalidDocument(
                "encrypted documents are not supported".to_string(),
            ));
        }
        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PagemarkError::InvalidDocument(
                "document has no pages".to_string(),
            ));
        }

        let id = DocumentId::new();
        info!(%id, pages = page_count, "PDF opened");
        Ok(Self {
            id,
            document: Some(document),
            source_path,
            fonts: HashMap::new(),
            images: HashMap::new(),
            fingerprints: HashMap::new(),
            isolated: HashSet::new(),
        })
    }

    // -- Lifecycle ------------------------------------------------------------

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    /// Return the source path if the document was created via [`PdfDocument::open`].
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Release the document. Further operations fail with `DocumentClosed`.
    pub fn close(&mut self) {
        if self.document.take().is_some() {
            info!(id = %self.id, "PDF closed");
        }
        self.fonts.clear();
        self.images.clear();
        self.fingerprints.clear();
        self.isolated.clear();
    }

    /// Write the document to `path`, adding a `.pdf` extension when missing.
    ///
    /// Returns the path actually written.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let target = with_pdf_extension(path.as_ref());
        let document = self.document_mut()?;
        document.compress();
        document.save(&target).map_err(|err| {
            PagemarkError::PdfError(format!("failed to save {}: {}", target.display(), err))
        })?;
        info!(path = %target.display(), "PDF saved");
        Ok(target)
    }

    /// Serialise the document to bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let document = self.document_mut()?;
        document.compress();
        let mut output = Vec::new();
        document.save_to(&mut output).map_err(|err| {
            PagemarkError::PdfError(format!("failed to serialise PDF: {}", err))
        })?;
        debug!(output_bytes = output.len(), "PDF serialised");
        Ok(output)
    }

    /// Geometry of every page, in page order.
    pub fn page_geometries(&self) -> Result<Vec<PageGeometry>> {
        let document = self.document()?;
        document
            .get_pages()
            .values()
            .map(|&page_id| page_geometry(document, page_id))
            .collect()
    }

    // -- Helpers --------------------------------------------------------------

    fn document(&self) -> Result<&Document> {
        self.document.as_ref().ok_or(PagemarkError::DocumentClosed)
    }

    fn document_mut(&mut self) -> Result<&mut Document> {
        self.document.as_mut().ok_or(PagemarkError::DocumentClosed)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        let pages = self.document()?.get_pages();
        pages
            .get(&page)
            .copied()
            .ok_or(PagemarkError::PageOutOfRange {
                page,
                page_count: pages.len() as u32,
            })
    }

    fn font_object(&self, font: &FontHandle) -> Result<ObjectId> {
        if font.document != self.id {
            return Err(PagemarkError::InvalidDocument(format!(
                "font handle belongs to document {}",
                font.document
            )));
        }
        self.fonts.get(&font.key).copied().ok_or_else(|| {
            PagemarkError::InvalidDocument(format!("unknown font handle {}", font.key))
        })
    }

    fn image_object(&self, image: &ImageHandle) -> Result<ObjectId> {
        if image.document != self.id {
            return Err(PagemarkError::InvalidDocument(format!(
                "image handle belongs to document {}",
                image.document
            )));
        }
        self.images.get(&image.key).copied().ok_or_else(|| {
            PagemarkError::InvalidDocument(format!("unknown image handle {}", image.key))
        })
    }
}

impl DocumentSink for PdfDocument {
    fn document_id(&self) -> Result<DocumentId> {
        self.document()?;
        Ok(self.id)
    }

    fn page_count(&self) -> Result<u32> {
        Ok(self.document()?.get_pages().len() as u32)
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry> {
        let page_id = self.page_id(page)?;
        page_geometry(self.document()?, page_id)
    }

    fn append_page(&mut self, geometry: PageGeometry) -> Result<u32> {
        let document = self.document_mut()?;
        let pages_id = page_tree_root(document)?;
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box(&geometry),
            "Resources" => Dictionary::new(),
        });

        let pages = dictionary_mut(document, pages_id)?;
        match pages.get_mut(b"Kids") {
            Ok(Object::Array(kids)) => kids.push(page_id.into()),
            _ => {
                return Err(PagemarkError::InvalidDocument(
                    "page tree root has no /Kids array".to_string(),
                ));
            }
        }
        let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        pages.set("Count", count + 1);

        let page = document.get_pages().len() as u32;
        debug!(page, width = geometry.width, height = geometry.height, "Page appended");
        Ok(page)
    }

    fn load_font(&mut self, source: &FontSource) -> Result<FontHandle> {
        let document = self.document_mut()?;
        let font_id = match source {
            FontSource::Builtin(builtin) => document.add_object(font::builtin_font(*builtin)),
            FontSource::TrueType { path } => font::embed_truetype(document, path)?,
        };
        self.fonts.insert(font_id.0, font_id);
        debug!(object = font_id.0, ?source, "Font registered");
        Ok(FontHandle {
            document: self.id,
            key: font_id.0,
        })
    }

    fn embed_image(&mut self, artifact: &Path) -> Result<ImageHandle> {
        self.document()?;
        let bytes = xobject::read_artifact(artifact)?;
        let fingerprint = hash_bytes(&bytes);
        if let Some(image) = self.fingerprints.get(&fingerprint) {
            debug!(artifact = %artifact.display(), key = image.key, "Identical artifact already embedded");
            return Ok(image.clone());
        }

        let decoded = xobject::decode_artifact(artifact, &bytes)?;
        let image_id = xobject::add_image_xobject(self.document_mut()?, &decoded);
        let image = ImageHandle {
            document: self.id,
            key: image_id.0,
            pixel_width: decoded.width,
            pixel_height: decoded.height,
        };
        self.images.insert(image_id.0, image_id);
        self.fingerprints.insert(fingerprint, image.clone());
        Ok(image)
    }

    fn commit(&mut self, page: u32, ops: Vec<DrawOp>) -> Result<()> {
        let page_id = self.page_id(page)?;
        let geometry = page_geometry(self.document()?, page_id)?;

        let mut fonts = BTreeMap::new();
        let mut images = BTreeMap::new();
        for op in &ops {
            match op {
                DrawOp::Text { font, .. } => {
                    fonts.insert(content::font_name(font.key), self.font_object(font)?);
                }
                DrawOp::Image { image, .. } => {
                    images.insert(content::image_name(image.key), self.image_object(image)?);
                }
                DrawOp::Rect { .. } => {}
            }
        }
        let bytes = content::encode(content::draw_operations(geometry.origin, &ops))?;

        let first_commit = self.isolated.insert(page_id);
        let document = self.document_mut()?;
        if first_commit {
            isolate_existing_content(document, page_id)?;
        }
        register_resources(document, page_id, b"Font", &fonts)?;
        register_resources(document, page_id, b"XObject", &images)?;

        let stream_id = document.add_object(Stream::new(Dictionary::new(), bytes));
        let mut contents = content_refs(document, page_id)?;
        contents.push(stream_id.into());
        dictionary_mut(document, page_id)?.set("Contents", contents);

        debug!(page, ops = ops.len(), stream = stream_id.0, "Drawing committed");
        Ok(())
    }
}

// -- Page tree ----------------------------------------------------------------

fn media_box(geometry: &PageGeometry) -> Vec<Object> {
    let geometry = geometry.normalized();
    vec![
        0.into(),
        0.into(),
        geometry.width.into(),
        geometry.height.into(),
    ]
}

fn with_pdf_extension(path: &Path) -> PathBuf {
    let has_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if has_pdf {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".pdf");
    PathBuf::from(name)
}

fn dictionary_mut(document: &mut Document, id: ObjectId) -> Result<&mut Dictionary> {
    document
        .get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| PagemarkError::InvalidDocument(format!("object {:?}: {}", id, err)))
}

fn page_tree_root(document: &Document) -> Result<ObjectId> {
    document
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|err| PagemarkError::InvalidDocument(format!("no page tree root: {}", err)))
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look `key` up on the page, then on each ancestor in the page tree.
fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(document, value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

fn page_geometry(document: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    let corners: Vec<f32> = inherited(document, page_id, b"MediaBox")
        .and_then(|value| value.as_array().ok())
        .map(|values| values.iter().filter_map(number).collect())
        .unwrap_or_default();
    let [x0, y0, x1, y1] = corners[..] else {
        return Err(PagemarkError::InvalidDocument(format!(
            "page object {:?} has no usable /MediaBox",
            page_id
        )));
    };

    Ok(PageGeometry::new((x1 - x0).abs(), (y1 - y0).abs())
        .with_origin(Point::new(x0.min(x1), y0.min(y1))))
}

// -- Content and resources ----------------------------------------------------

/// References to the page's content streams, in order.
fn content_refs(document: &mut Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let contents = dictionary_mut(document, page_id)?.get(b"Contents").ok().cloned();
    let refs = match contents {
        None => Vec::new(),
        Some(Object::Reference(id)) => match document.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(items)) => items,
        Some(Object::Stream(stream)) => vec![document.add_object(stream).into()],
        Some(other) => {
            warn!(?other, "Ignoring malformed /Contents entry");
            Vec::new()
        }
    };
    Ok(refs)
}

/// Wrap the page's existing content in its own `q`/`Q` pair.
fn isolate_existing_content(document: &mut Document, page_id: ObjectId) -> Result<()> {
    let existing = content_refs(document, page_id)?;
    if existing.is_empty() {
        return Ok(());
    }

    let save = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore = document.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(save.into());
    contents.extend(existing);
    contents.push(restore.into());
    dictionary_mut(document, page_id)?.set("Contents", contents);
    debug!(page = ?page_id, "Existing page content isolated");
    Ok(())
}

/// Add `entries` to the page's own `/Resources` under `category`.
///
/// Inherited resources are copied onto the page first so the page keeps
/// everything its existing content refers to.
fn register_resources(
    document: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    entries: &BTreeMap<Vec<u8>, ObjectId>,
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut resources = inherited(document, page_id, b"Resources")
        .and_then(|value| value.as_dict().ok())
        .cloned()
        .unwrap_or_default();
    let mut named = resources
        .get(category)
        .ok()
        .and_then(|value| resolve(document, value))
        .and_then(|value| value.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    for (name, id) in entries {
        named.set(name.clone(), *id);
    }
    resources.set(category.to_vec(), named);
    dictionary_mut(document, page_id)?.set("Resources", resources);
    Ok(())
}
