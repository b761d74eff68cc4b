// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagemark.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Pagemark operations.
#[derive(Debug, Error)]
pub enum PagemarkError {
    // -- Input validation --
    #[error("invalid marker: {0}")]
    InvalidMarker(String),

    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),

    // -- Shared drawing resources --
    #[error("drawing resource not found: {0}")]
    ResourceNotFound(String),

    #[error("drawing resource could not be loaded: {0}")]
    ResourceLoadError(String),

    // -- Placement --
    #[error(
        "a {width}x{height} box cannot fit an empty page (usable area {usable_width}x{usable_height})"
    )]
    MarkerTooLarge {
        width: f32,
        height: f32,
        usable_width: f32,
        usable_height: f32,
    },

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("artifact {} unavailable: {reason}", artifact.display())]
    ArtifactUnavailable { artifact: PathBuf, reason: String },

    // -- Document handle --
    #[error("document handle is closed")]
    DocumentClosed,

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How far an error reaches: whether the run, the current page, or only the
/// current marker has to be abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the run; the caller closes the document.
    Fatal,
    /// Skip the whole page's markers and continue with the next page.
    PerPage,
    /// Skip this marker and continue with the rest of the page.
    PerMarker,
}

impl PagemarkError {
    /// Classify the error for the engine's propagation policy.
    pub fn severity(&self) -> Severity {
        match self {
            Self::ArtifactUnavailable { .. } => Severity::PerMarker,
            Self::PageOutOfRange { .. } => Severity::PerPage,
            _ => Severity::Fatal,
        }
    }

    /// True when the run can continue after reporting this error.
    pub fn is_recoverable(&self) -> bool {
        self.severity() != Severity::Fatal
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagemarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_is_per_marker() {
        let err = PagemarkError::ArtifactUnavailable {
            artifact: PathBuf::from("qr/1.png"),
            reason: "not found".into(),
        };
        assert_eq!(err.severity(), Severity::PerMarker);
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "artifact qr/1.png unavailable: not found");
    }

    #[test]
    fn out_of_range_page_is_per_page() {
        let err = PagemarkError::PageOutOfRange {
            page: 9,
            page_count: 4,
        };
        assert_eq!(err.severity(), Severity::PerPage);
    }

    #[test]
    fn resource_and_geometry_errors_are_fatal() {
        assert_eq!(
            PagemarkError::ResourceNotFound("times.ttf".into()).severity(),
            Severity::Fatal
        );
        assert_eq!(PagemarkError::DocumentClosed.severity(), Severity::Fatal);
        let too_large = PagemarkError::MarkerTooLarge {
            width: 500.0,
            height: 500.0,
            usable_width: 400.0,
            usable_height: 700.0,
        };
        assert!(!too_large.is_recoverable());
    }
}
