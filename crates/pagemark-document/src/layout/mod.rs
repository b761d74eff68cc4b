// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout module: the per-page marker grid and the appended index table.

pub mod grid;
pub mod index;

pub use grid::GridPlacer;
pub use index::{IndexEntry, IndexPaginator};

use pagemark_core::{PageGeometry, Point};

/// Next draw position: the top-left corner of the next box.
///
/// Lives for one page's placement pass and is reset on every new page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

impl Cursor {
    /// Top-left corner of the area inside the margins.
    pub fn start(page: &PageGeometry, margin: f32) -> Self {
        Self {
            x: margin,
            y: page.height - margin,
        }
    }

    /// Back to the left margin, one row further down.
    pub fn wrap(&mut self, margin: f32, row_step: f32) {
        self.x = margin;
        self.y -= row_step;
    }

    pub fn advance(&mut self, column_step: f32) {
        self.x += column_step;
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
