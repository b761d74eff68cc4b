// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content streams: turns buffered draw calls into PDF operators and encodes
// label text for the WinAnsi-encoded fonts the sink registers.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use pagemark_core::Point;
use pagemark_core::error::{PagemarkError, Result};

use crate::sink::DrawOp;

/// Code points of WinAnsi bytes 0x80..=0x9F. Zero marks an unassigned byte.
const WIN_ANSI_HIGH: [u32; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
    0x0152, 0, 0x017D, 0, 0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, 0x02DC,
    0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

/// Resource name of a registered font.
pub(crate) fn font_name(key: u32) -> Vec<u8> {
    format!("PmF{key}").into_bytes()
}

/// Resource name of a registered image XObject.
pub(crate) fn image_name(key: u32) -> Vec<u8> {
    format!("PmI{key}").into_bytes()
}

/// Character printed for a WinAnsi byte, if the byte is assigned.
pub fn win_ansi_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(char::from(code)),
        0x80..=0x9F => match WIN_ANSI_HIGH[usize::from(code - 0x80)] {
            0 => None,
            point => char::from_u32(point),
        },
        _ => None,
    }
}

/// Encode `text` as WinAnsi bytes. Characters without a WinAnsi code become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| {
            let point = u32::from(ch);
            match point {
                0x20..=0x7E | 0xA0..=0xFF => point as u8,
                _ => WIN_ANSI_HIGH
                    .iter()
                    .position(|&high| high != 0 && high == point)
                    .map_or(b'?', |index| 0x80 + index as u8),
            }
        })
        .collect()
}

/// Operators for one committed drawing context, wrapped in a `q`/`Q` pair.
///
/// Coordinates in `ops` are relative to the lower-left corner of the page's
/// MediaBox; a non-zero `origin` is applied with a single `cm`.
pub(crate) fn draw_operations(origin: Point, ops: &[DrawOp]) -> Vec<Operation> {
    let mut operations = Vec::with_capacity(ops.len() * 5 + 3);
    operations.push(Operation::new("q", vec![]));
    if origin != Point::default() {
        operations.push(Operation::new(
            "cm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                origin.x.into(),
                origin.y.into(),
            ],
        ));
    }

    for op in ops {
        match op {
            DrawOp::Rect { rect, line_width } => {
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new("w", vec![(*line_width).into()]));
                operations.push(Operation::new(
                    "re",
                    vec![
                        rect.x.into(),
                        rect.y.into(),
                        rect.width.into(),
                        rect.height.into(),
                    ],
                ));
                operations.push(Operation::new("S", vec![]));
                operations.push(Operation::new("Q", vec![]));
            }
            DrawOp::Image { image, rect } => {
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        rect.width.into(),
                        0.into(),
                        0.into(),
                        rect.height.into(),
                        rect.x.into(),
                        rect.y.into(),
                    ],
                ));
                operations.push(Operation::new(
                    "Do",
                    vec![Object::Name(image_name(image.key))],
                ));
                operations.push(Operation::new("Q", vec![]));
            }
            DrawOp::Text {
                font,
                size,
                origin,
                text,
            } => {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font_name(font.key)), (*size).into()],
                ));
                operations.push(Operation::new("Td", vec![origin.x.into(), origin.y.into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
        }
    }

    operations.push(Operation::new("Q", vec![]));
    operations
}

/// Serialise operators into content stream bytes.
pub(crate) fn encode(operations: Vec<Operation>) -> Result<Vec<u8>> {
    Content { operations }
        .encode()
        .map_err(|err| PagemarkError::PdfError(format!("failed to encode content stream: {err}")))
}
