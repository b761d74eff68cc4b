// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marker data model: one record per visual marker, grouped by source page.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PagemarkError, Result};

/// Maximum number of characters kept when a label is derived from a link.
pub const DERIVED_LABEL_LEN: usize = 7;

/// Label used when a link has no usable path segment.
const UNKNOWN_LABEL: &str = "Unknown";

/// One visual marker: a pre-rendered raster image plus a short label, tied to
/// the page its link was found on.
///
/// Equality and hashing cover `(page_no, link, artifact_ref)` only; the label
/// is presentation and may change freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawMarker")]
pub struct MarkerRecord {
    #[serde(rename = "page")]
    page_no: u32,
    link: String,
    #[serde(rename = "artifact")]
    artifact_ref: PathBuf,
    label: String,
}

/// Unvalidated wire form of a [`MarkerRecord`].
#[derive(Deserialize)]
struct RawMarker {
    page: u32,
    link: String,
    artifact: PathBuf,
    #[serde(default)]
    label: Option<String>,
}

impl TryFrom<RawMarker> for MarkerRecord {
    type Error = PagemarkError;

    fn try_from(raw: RawMarker) -> Result<Self> {
        Self::new(raw.page, raw.link, raw.artifact, raw.label)
    }
}

impl MarkerRecord {
    /// Create a validated record. Without an explicit label one is derived
    /// from the link (see [`derive_label`]).
    pub fn new(
        page_no: u32,
        link: impl Into<String>,
        artifact_ref: impl Into<PathBuf>,
        label: Option<String>,
    ) -> Result<Self> {
        let link = link.into();
        let artifact_ref = artifact_ref.into();

        if page_no < 1 {
            return Err(PagemarkError::InvalidMarker(format!(
                "page number must be >= 1, got {page_no}"
            )));
        }
        if link.is_empty() {
            return Err(PagemarkError::InvalidMarker(
                "link cannot be empty".to_string(),
            ));
        }
        if artifact_ref.as_os_str().is_empty() {
            return Err(PagemarkError::InvalidMarker(format!(
                "artifact reference cannot be empty (link {link})"
            )));
        }

        let label = label.unwrap_or_else(|| derive_label(&link));
        Ok(Self {
            page_no,
            link,
            artifact_ref,
            label,
        })
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn artifact_ref(&self) -> &Path {
        &self.artifact_ref
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace the label. Empty labels are allowed and render as blank.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }
}

impl PartialEq for MarkerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.page_no == other.page_no
            && self.link == other.link
            && self.artifact_ref == other.artifact_ref
    }
}

impl Eq for MarkerRecord {}

impl Hash for MarkerRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.page_no.hash(state);
        self.link.hash(state);
        self.artifact_ref.hash(state);
    }
}

/// Derive a short label from a link: its last non-empty `/` segment, cut to
/// [`DERIVED_LABEL_LEN`] characters.
pub fn derive_label(link: &str) -> String {
    let segment = link
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if segment.is_empty() {
        return UNKNOWN_LABEL.to_string();
    }
    segment.chars().take(DERIVED_LABEL_LEN).collect()
}

/// Markers grouped by source page.
///
/// Pages iterate in ascending numeric order regardless of insertion order;
/// within a page, records keep the order they were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MarkerRecord>", into = "Vec<MarkerRecord>")]
pub struct MarkerSet {
    pages: BTreeMap<u32, Vec<MarkerRecord>>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the end of its page's list.
    pub fn push(&mut self, record: MarkerRecord) {
        self.pages.entry(record.page_no).or_default().push(record);
    }

    /// Markers for one page, in stored order.
    pub fn page(&self, page_no: u32) -> &[MarkerRecord] {
        self.pages.get(&page_no).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(page, markers)` pairs in ascending page order.
    pub fn pages(&self) -> impl Iterator<Item = (u32, &[MarkerRecord])> {
        self.pages
            .iter()
            .map(|(page, records)| (*page, records.as_slice()))
    }

    /// Every record in global order: ascending page, then stored order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerRecord> {
        self.pages.values().flatten()
    }

    pub fn page_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }

    /// Total number of records across all pages.
    pub fn len(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.values().all(Vec::is_empty)
    }

    /// Mutable access to one page's records, e.g. to relabel them.
    pub fn page_mut(&mut self, page_no: u32) -> Option<&mut [MarkerRecord]> {
        self.pages.get_mut(&page_no).map(Vec::as_mut_slice)
    }

    /// Rewrite every artifact stored under `from` to the same relative path
    /// under `to`. Records outside `from` are left alone. Returns how many
    /// records were rewritten.
    pub fn relocate_artifacts(&mut self, from: &Path, to: &Path) -> usize {
        let mut moved = 0;
        for record in self.pages.values_mut().flatten() {
            if let Ok(relative) = record.artifact_ref.strip_prefix(from) {
                record.artifact_ref = to.join(relative);
                moved += 1;
            }
        }
        moved
    }

    /// Load a manifest: a JSON array of `{page, link, artifact, label?}`.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<Vec<MarkerRecord>> for MarkerSet {
    fn from(records: Vec<MarkerRecord>) -> Self {
        records.into_iter().collect()
    }
}

impl From<MarkerSet> for Vec<MarkerRecord> {
    fn from(set: MarkerSet) -> Self {
        set.pages.into_values().flatten().collect()
    }
}

impl FromIterator<MarkerRecord> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = MarkerRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.push(record);
        }
        set
    }
}
