// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font objects: standard Type1 fonts by name, or a TrueType file embedded as
// a simple WinAnsi-encoded font with widths measured by `ttf-parser`.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pagemark_core::BuiltinFont;
use pagemark_core::error::{PagemarkError, Result};
use tracing::{debug, instrument};
use ttf_parser::Face;

use super::content::win_ansi_char;

const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;
/// FontDescriptor flag for fonts using the standard Latin character set.
const NONSYMBOLIC: i64 = 1 << 5;

/// Font dictionary for one of the standard 14 fonts.
pub(crate) fn builtin_font(font: BuiltinFont) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_name(),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Metrics pulled from a TrueType file, in PDF glyph space (1/1000 em).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrueTypeMetrics {
    pub base_font: String,
    /// Advance widths for codes `FIRST_CHAR..=LAST_CHAR`.
    pub widths: Vec<i64>,
    pub bbox: [i64; 4],
    pub ascent: i64,
    pub descent: i64,
    pub cap_height: i64,
}

impl TrueTypeMetrics {
    pub fn parse(data: &[u8], base_font: String) -> Result<Self> {
        let face = Face::parse(data, 0).map_err(|err| {
            PagemarkError::ResourceLoadError(format!("failed to parse font {base_font}: {err}"))
        })?;

        let units_per_em = f32::from(face.units_per_em().max(1));
        let scale = |value: f32| (value * 1000.0 / units_per_em).round() as i64;

        let widths = (FIRST_CHAR..=LAST_CHAR)
            .map(|code| {
                win_ansi_char(code)
                    .and_then(|ch| face.glyph_index(ch))
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .map_or(0, |advance| scale(f32::from(advance)))
            })
            .collect();

        let bbox = face.global_bounding_box();
        let ascent = scale(f32::from(face.ascender()));
        Ok(Self {
            base_font,
            widths,
            bbox: [
                scale(f32::from(bbox.x_min)),
                scale(f32::from(bbox.y_min)),
                scale(f32::from(bbox.x_max)),
                scale(f32::from(bbox.y_max)),
            ],
            ascent,
            descent: scale(f32::from(face.descender())),
            cap_height: face
                .capital_height()
                .map_or(ascent, |height| scale(f32::from(height))),
        })
    }
}

/// Embed the TrueType file at `path` and return the font dictionary's id.
#[instrument(skip(doc), fields(path = %path.display()))]
pub(crate) fn embed_truetype(doc: &mut Document, path: &Path) -> Result<ObjectId> {
    if !path.is_file() {
        return Err(PagemarkError::ResourceNotFound(path.display().to_string()));
    }
    let data = std::fs::read(path).map_err(|err| {
        PagemarkError::ResourceLoadError(format!("failed to read {}: {err}", path.display()))
    })?;
    let metrics = TrueTypeMetrics::parse(&data, base_font_name(path))?;
    debug!(base_font = %metrics.base_font, bytes = data.len(), "TrueType font parsed");

    let length = data.len() as i64;
    let file_id = doc.add_object(Stream::new(dictionary! { "Length1" => length }, data));
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(metrics.base_font.clone().into_bytes()),
        "Flags" => NONSYMBOLIC,
        "FontBBox" => metrics.bbox.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        "ItalicAngle" => 0,
        "Ascent" => metrics.ascent,
        "Descent" => metrics.descent,
        "CapHeight" => metrics.cap_height,
        "StemV" => 80,
        "FontFile2" => file_id,
    });

    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => Object::Name(metrics.base_font.into_bytes()),
        "FirstChar" => i64::from(FIRST_CHAR),
        "LastChar" => i64::from(LAST_CHAR),
        "Widths" => metrics.widths.into_iter().map(Object::Integer).collect::<Vec<_>>(),
        "FontDescriptor" => descriptor_id,
        "Encoding" => "WinAnsiEncoding",
    }))
}

/// PostScript-safe font name derived from the file stem.
fn base_font_name(path: &Path) -> String {
    let name: String = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect();
    if name.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        name
    }
}
