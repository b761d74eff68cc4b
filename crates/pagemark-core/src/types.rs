// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core geometry and identity types for the Pagemark engine. All lengths are in
// PDF points (1/72 inch) with the origin at the bottom-left of the page.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one open document handle.
///
/// A fresh id is minted every time a document is opened, so anything cached
/// against a handle goes stale when the document is closed and reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in page space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box anchored at its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Width and height of one page, plus the lower-left corner of its media box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    /// Media box origin; drawing coordinates are relative to it.
    #[serde(default)]
    pub origin: Point,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            origin: Point::default(),
        }
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// Same size, origin moved back to zero. Appended pages always use this.
    pub fn normalized(&self) -> Self {
        Self::new(self.width, self.height)
    }

    /// Width and height left after removing `margin` on every side.
    pub fn usable(&self, margin: f32) -> (f32, f32) {
        (self.width - 2.0 * margin, self.height - 2.0 * margin)
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Tabloid => (279, 432),
        }
    }

    /// Page geometry in points, using the exact PDF sizes where they are
    /// conventionally rounded (A4 is 595x842).
    pub fn geometry(&self) -> PageGeometry {
        match self {
            Self::A4 => PageGeometry::new(595.0, 842.0),
            Self::Letter => PageGeometry::new(612.0, 792.0),
            Self::Legal => PageGeometry::new(612.0, 1008.0),
            Self::Tabloid => PageGeometry::new(792.0, 1224.0),
            other => {
                let (w_mm, h_mm) = other.dimensions_mm();
                PageGeometry::new(mm_to_pt(w_mm as f32), mm_to_pt(h_mm as f32))
            }
        }
    }
}

/// Convert millimetres to points.
pub fn mm_to_pt(mm: f32) -> f32 {
    (mm * 72.0 / 25.4).round()
}
