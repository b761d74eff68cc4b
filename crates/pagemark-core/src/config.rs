// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout configuration for the marker grid, the index table and the shared font.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PagemarkError, Result};
use crate::types::{PageGeometry, PaperSize};

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Per-page marker grid.
    pub grid: GridSpec,
    /// Appended index table.
    pub index: IndexSpec,
    /// Font used for labels, captions and titles.
    pub font: FontSource,
}

/// Geometry and styling of the per-page marker grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Edge length of the square marker image.
    pub marker_size: f32,
    pub horizontal_spacing: f32,
    pub vertical_spacing: f32,
    pub margin: f32,
    pub label_font_size: f32,
    /// Label origin relative to the bottom-left corner of the marker box;
    /// `label_offset_y` is measured downwards.
    pub label_offset_x: f32,
    pub label_offset_y: f32,
    /// Line width of the box drawn around each marker; `None` draws no box.
    pub border: Option<f32>,
    /// Draw "Continued from page N" on every overflow page.
    pub continuation_header: bool,
    pub header_font_size: f32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            marker_size: 100.0,
            horizontal_spacing: 20.0,
            vertical_spacing: 30.0,
            margin: 50.0,
            label_font_size: 10.0,
            label_offset_x: 5.0,
            label_offset_y: 15.0,
            border: Some(0.5),
            continuation_header: true,
            header_font_size: 12.0,
        }
    }
}

impl GridSpec {
    /// Fail unless one marker fits an empty page of the given geometry.
    pub fn check_fits(&self, page: &PageGeometry) -> Result<()> {
        let (usable_width, usable_height) = page.usable(self.margin);
        if self.marker_size > usable_width || self.marker_size > usable_height {
            return Err(PagemarkError::MarkerTooLarge {
                width: self.marker_size,
                height: self.marker_size,
                usable_width,
                usable_height,
            });
        }
        Ok(())
    }
}

/// Where index pages take their size from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexPage {
    /// Copy the geometry of the document's first page.
    #[default]
    FirstPage,
    /// A fixed paper size.
    Paper(PaperSize),
}

/// Geometry and styling of the appended index table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSpec {
    pub columns: u32,
    pub cell_height: f32,
    pub margin: f32,
    pub page: IndexPage,
    pub title: String,
    pub title_font_size: f32,
    /// Vertical space reserved for the title block on the first index page.
    pub title_gap: f32,
    /// Draw a "Total markers: N" line under the title.
    pub summary: bool,
    pub caption_font_size: f32,
    pub label_font_size: f32,
    /// Line width of the cell outline; `None` draws no outline.
    pub cell_border: Option<f32>,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            columns: 3,
            cell_height: 150.0,
            margin: 50.0,
            page: IndexPage::FirstPage,
            title: "Markers Index".to_string(),
            title_font_size: 16.0,
            title_gap: 50.0,
            summary: true,
            caption_font_size: 12.0,
            label_font_size: 10.0,
            cell_border: Some(1.0),
        }
    }
}

impl IndexSpec {
    /// Horizontal padding removed from the cell width to size the image.
    pub const IMAGE_PAD_X: f32 = 20.0;
    /// Vertical space reserved in a cell for the caption and the label.
    pub const IMAGE_PAD_Y: f32 = 60.0;

    /// Leading between the title and the summary line.
    pub const SUMMARY_LEADING: f32 = 6.0;

    /// Height of the title, plus the summary line when it is drawn.
    pub fn title_block_height(&self) -> f32 {
        if self.summary {
            self.title_font_size + Self::SUMMARY_LEADING + self.caption_font_size
        } else {
            self.title_font_size
        }
    }

    pub fn cell_width(&self, page: &PageGeometry) -> f32 {
        (page.width - 2.0 * self.margin) / self.columns as f32
    }

    /// Edge length of the marker image inside one cell.
    pub fn image_size(&self, page: &PageGeometry) -> f32 {
        (self.cell_width(page) - Self::IMAGE_PAD_X).min(self.cell_height - Self::IMAGE_PAD_Y)
    }

    /// Fail unless a cell, with room for its image, fits an empty index page.
    pub fn check_fits(&self, page: &PageGeometry) -> Result<()> {
        let (usable_width, usable_height) = page.usable(self.margin);
        if self.cell_height > usable_height || self.image_size(page) <= 0.0 {
            return Err(PagemarkError::MarkerTooLarge {
                width: self.cell_width(page),
                height: self.cell_height,
                usable_width,
                usable_height,
            });
        }
        Ok(())
    }
}

/// The 14 standard PDF fonts that need no embedding (text faces only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuiltinFont {
    #[default]
    #[serde(rename = "Times-Roman")]
    TimesRoman,
    #[serde(rename = "Times-Bold")]
    TimesBold,
    Helvetica,
    #[serde(rename = "Helvetica-Bold")]
    HelveticaBold,
    Courier,
}

impl BuiltinFont {
    /// PostScript name used as `/BaseFont`.
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::Courier => "Courier",
        }
    }
}

/// Where the drawing font comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSource {
    Builtin(BuiltinFont),
    /// A TrueType file embedded into the target document.
    TrueType { path: PathBuf },
}

impl Default for FontSource {
    fn default() -> Self {
        Self::Builtin(BuiltinFont::default())
    }
}

impl LayoutConfig {
    /// Read a JSON configuration file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no layout can work with.
    pub fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        positive("grid.marker_size", grid.marker_size)?;
        non_negative("grid.horizontal_spacing", grid.horizontal_spacing)?;
        non_negative("grid.vertical_spacing", grid.vertical_spacing)?;
        non_negative("grid.margin", grid.margin)?;
        positive("grid.label_font_size", grid.label_font_size)?;
        positive("grid.header_font_size", grid.header_font_size)?;
        if let Some(width) = grid.border {
            positive("grid.border", width)?;
        }

        let index = &self.index;
        if index.columns == 0 {
            return Err(PagemarkError::InvalidConfig(
                "index.columns must be at least 1".to_string(),
            ));
        }
        positive("index.cell_height", index.cell_height)?;
        non_negative("index.margin", index.margin)?;
        non_negative("index.title_gap", index.title_gap)?;
        positive("index.title_font_size", index.title_font_size)?;
        positive("index.caption_font_size", index.caption_font_size)?;
        positive("index.label_font_size", index.label_font_size)?;
        if index.title_gap < index.title_block_height() {
            return Err(PagemarkError::InvalidConfig(format!(
                "index.title_gap must be at least {} to clear the title block",
                index.title_block_height()
            )));
        }
        if index.cell_height <= IndexSpec::IMAGE_PAD_Y {
            return Err(PagemarkError::InvalidConfig(format!(
                "index.cell_height must exceed {} to leave room for the image",
                IndexSpec::IMAGE_PAD_Y
            )));
        }
        if let Some(width) = index.cell_border {
            positive("index.cell_border", width)?;
        }

        if let FontSource::TrueType { path } = &self.font
            && path.as_os_str().is_empty()
        {
            return Err(PagemarkError::InvalidConfig(
                "font.true-type.path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PagemarkError::InvalidConfig(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PagemarkError::InvalidConfig(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}
