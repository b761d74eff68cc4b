// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run report: what was drawn where, and what was skipped and why.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Rect;

/// One marker drawn by the grid pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Page the marker belongs to.
    pub source_page: u32,
    /// Page it was drawn on; differs from `source_page` after overflow.
    pub target_page: u32,
    pub link: String,
    pub label: String,
    /// Marker box at draw time.
    pub rect: Rect,
    pub overflow: bool,
}

/// One entry of the index table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexCell {
    pub source_page: u32,
    pub target_page: u32,
    pub link: String,
    /// Row counted across all index pages, starting at 0.
    pub row: u32,
    pub column: u32,
    pub cell: Rect,
    pub image: Rect,
}

/// Why a marker was not drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum SkipReason {
    /// The marker's page does not exist in the document.
    PageOutOfRange { page_count: u32 },
    /// The artifact could not be read or decoded.
    ArtifactUnavailable { reason: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PageOutOfRange { page_count } => {
                write!(f, "page out of range (document has {page_count} pages)")
            }
            Self::ArtifactUnavailable { reason } => write!(f, "artifact unavailable: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedMarker {
    pub page: u32,
    pub link: String,
    pub artifact: PathBuf,
    pub reason: SkipReason,
}

/// Everything one engine run did to a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    /// Page count before anything was appended.
    pub original_pages: u32,
    pub placements: Vec<Placement>,
    /// Overflow pages appended by the grid pass, in creation order.
    pub overflow_pages: Vec<u32>,
    pub index_cells: Vec<IndexCell>,
    pub index_pages: Vec<u32>,
    pub skipped: Vec<SkippedMarker>,
}

impl RunReport {
    pub fn new(original_pages: u32) -> Self {
        Self {
            started_at: Utc::now(),
            original_pages,
            placements: Vec::new(),
            overflow_pages: Vec::new(),
            index_cells: Vec::new(),
            index_pages: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Page count after the run.
    pub fn final_pages(&self) -> u32 {
        self.original_pages + self.overflow_pages.len() as u32 + self.index_pages.len() as u32
    }

    /// Placements whose source page is `page`, in draw order.
    pub fn placements_for(&self, page: u32) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(move |placement| placement.source_page == page)
    }

    /// Placements drawn on `page`, in draw order.
    pub fn drawn_on(&self, page: u32) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(move |placement| placement.target_page == page)
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "{} markers drawn, {} skipped, {} overflow pages, {} index pages",
            self.placements.len(),
            self.skipped.len(),
            self.overflow_pages.len(),
            self.index_pages.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(source_page: u32, target_page: u32) -> Placement {
        Placement {
            source_page,
            target_page,
            link: format!("https://a/{source_page}"),
            label: String::new(),
            rect: Rect::new(50.0, 650.0, 100.0, 100.0),
            overflow: source_page != target_page,
        }
    }

    #[test]
    fn final_page_count_adds_appended_pages() {
        let mut report = RunReport::new(4);
        report.overflow_pages.push(5);
        report.index_pages.extend([6, 7]);
        assert_eq!(report.final_pages(), 7);
    }

    #[test]
    fn filters_by_source_and_target() {
        let mut report = RunReport::new(3);
        report.placements.extend([placement(1, 1), placement(1, 4), placement(2, 2)]);
        assert_eq!(report.placements_for(1).count(), 2);
        assert_eq!(report.drawn_on(4).count(), 1);
        assert_eq!(
            report.summary(),
            "3 markers drawn, 0 skipped, 0 overflow pages, 0 index pages"
        );
    }

    #[test]
    fn skip_reason_serializes_tagged() {
        let json = serde_json::to_string(&SkipReason::PageOutOfRange { page_count: 2 }).unwrap();
        assert_eq!(json, r#"{"kind":"page-out-of-range","page_count":2}"#);
    }
}
