// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Index paginator: appends a fixed-column table of every drawn marker after
// the last page of the document.

use pagemark_core::error::Result;
use pagemark_core::{IndexCell, IndexSpec, PageGeometry, Point, Rect, RunReport};
use tracing::{debug, info, instrument};

use crate::layout::Cursor;
use crate::sink::{DocumentSink, DrawingContext, FontHandle, ImageHandle};

/// Horizontal inset of the caption and label inside a cell.
const TEXT_INSET: f32 = 5.0;
/// Caption baseline, measured down from the top of the cell.
const CAPTION_DROP: f32 = 20.0;
/// Bottom edge of the image, measured up from the bottom of the cell.
const IMAGE_LIFT: f32 = 30.0;
/// Label baseline, measured up from the bottom of the cell.
const LABEL_LIFT: f32 = 10.0;

/// One row of input for the index: a marker that was actually drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub source_page: u32,
    pub link: String,
    pub label: String,
    pub image: ImageHandle,
}

/// Lays out the index table.
pub struct IndexPaginator<'a> {
    spec: &'a IndexSpec,
    font: &'a FontHandle,
    geometry: PageGeometry,
}

impl<'a> IndexPaginator<'a> {
    /// `geometry` is used for every index page.
    pub fn new(spec: &'a IndexSpec, font: &'a FontHandle, geometry: PageGeometry) -> Self {
        Self {
            spec,
            font,
            geometry: geometry.normalized(),
        }
    }

    /// Append index pages holding one cell per entry, in the given order.
    ///
    /// Rows wrap after `columns` cells; a new page starts when the next row
    /// would cross the bottom margin. The title block is drawn once, on the
    /// first index page. Nothing is appended for an empty entry list.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub fn paginate<S: DocumentSink + ?Sized>(
        &self,
        sink: &mut S,
        entries: &[IndexEntry],
        report: &mut RunReport,
    ) -> Result<()> {
        if entries.is_empty() {
            debug!("No drawn markers, index skipped");
            return Ok(());
        }

        let spec = self.spec;
        let geometry = self.geometry;
        spec.check_fits(&geometry)?;

        let margin = spec.margin;
        let cell_width = spec.cell_width(&geometry);
        let cell_height = spec.cell_height;
        let image_size = spec.image_size(&geometry);
        let y_start = geometry.height - margin;

        info!(
            entries = entries.len(),
            columns = spec.columns,
            "Appending index pages"
        );

        let first_page = sink.append_page(geometry)?;
        report.index_pages.push(first_page);
        let mut ctx = DrawingContext::open(&mut *sink, first_page)?;

        let title_baseline = y_start - spec.title_font_size;
        ctx.show_text(
            self.font,
            spec.title_font_size,
            Point::new(margin, title_baseline),
            &spec.title,
        );
        if spec.summary {
            let summary_baseline =
                title_baseline - IndexSpec::SUMMARY_LEADING - spec.caption_font_size;
            ctx.show_text(
                self.font,
                spec.caption_font_size,
                Point::new(margin, summary_baseline),
                &format!("Total markers: {}", entries.len()),
            );
        }

        let mut cursor = Cursor {
            x: margin,
            y: y_start - spec.title_gap,
        };
        let mut column = 0;
        let mut row = 0;

        for entry in entries {
            if column == spec.columns {
                column = 0;
                row += 1;
                cursor.wrap(margin, cell_height);
            }

            if cursor.y - cell_height < margin {
                ctx.close()?;
                let next_page = sink.append_page(geometry)?;
                debug!(next_page, row, "Index continues on a new page");
                report.index_pages.push(next_page);
                ctx = DrawingContext::open(&mut *sink, next_page)?;
                cursor = Cursor::start(&geometry, margin);
            }

            let cell = Rect::new(cursor.x, cursor.y - cell_height, cell_width, cell_height);
            if let Some(line_width) = spec.cell_border {
                ctx.stroke_rect(cell, line_width);
            }
            ctx.show_text(
                self.font,
                spec.caption_font_size,
                Point::new(cell.x + TEXT_INSET, cell.top() - CAPTION_DROP),
                &format!("Page {}", entry.source_page),
            );
            let image_rect = Rect::new(
                cell.x + (cell_width - image_size) / 2.0,
                cell.y + IMAGE_LIFT,
                image_size,
                image_size,
            );
            ctx.draw_image(&entry.image, image_rect);
            ctx.show_text(
                self.font,
                spec.label_font_size,
                Point::new(cell.x + TEXT_INSET, cell.y + LABEL_LIFT),
                &entry.label,
            );

            report.index_cells.push(IndexCell {
                source_page: entry.source_page,
                target_page: ctx.page(),
                link: entry.link.clone(),
                row,
                column,
                cell,
                image: image_rect,
            });

            cursor.advance(cell_width);
            column += 1;
        }

        ctx.close()?;
        info!(pages = report.index_pages.len(), "Index pages appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingSink;
    use crate::sink::DrawOp;
    use pagemark_core::DocumentId;

    fn entries(count: u32) -> Vec<IndexEntry> {
        let document = DocumentId::new();
        (0..count)
            .map(|i| IndexEntry {
                source_page: i / 4 + 1,
                link: format!("https://example.com/{i}"),
                label: format!("{i}"),
                image: ImageHandle {
                    document,
                    key: i,
                    pixel_width: 250,
                    pixel_height: 250,
                },
            })
            .collect()
    }

    fn paginate(sink: &mut RecordingSink, spec: &IndexSpec, count: u32) -> RunReport {
        let font = FontHandle {
            document: DocumentId::new(),
            key: 0,
        };
        let geometry = sink.page_geometry(1).unwrap();
        let mut report = RunReport::new(sink.page_count().unwrap());
        IndexPaginator::new(spec, &font, geometry)
            .paginate(sink, &entries(count), &mut report)
            .unwrap();
        report
    }

    fn texts(sink: &RecordingSink, page: u32) -> Vec<String> {
        sink.page(page)
            .unwrap()
            .ops()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn ten_markers_break_after_third_row_with_single_title() {
        // y_start 550, first row top 500: rows at 500, 350, 200 fit, row 4 would end below 50
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 600.0), 1);
        let spec = IndexSpec::default();
        let report = paginate(&mut sink, &spec, 10);

        assert_eq!(report.index_pages, vec![2, 3]);
        assert_eq!(report.index_cells.len(), 10);
        assert_eq!(report.index_cells.iter().filter(|c| c.target_page == 2).count(), 9);

        let last = &report.index_cells[9];
        assert_eq!((last.row, last.column, last.target_page), (3, 0, 3));
        assert_eq!(last.cell.top(), 550.0);

        assert!(texts(&sink, 2).contains(&spec.title));
        assert!(texts(&sink, 2).contains(&"Total markers: 10".to_string()));
        assert!(!texts(&sink, 3).contains(&spec.title));
    }

    #[test]
    fn rows_are_ceil_of_entries_over_columns() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 1);
        let report = paginate(&mut sink, &IndexSpec::default(), 10);

        assert_eq!(report.index_pages, vec![2]);
        let rows = report.index_cells.iter().map(|c| c.row).max().unwrap() + 1;
        assert_eq!(rows, 4);
        // partially filled final row is not padded
        assert_eq!(
            sink.page(2)
                .unwrap()
                .ops()
                .filter(|op| matches!(op, DrawOp::Image { .. }))
                .count(),
            10
        );
    }

    #[test]
    fn cells_split_table_width_evenly() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(650.0, 800.0), 1);
        let report = paginate(&mut sink, &IndexSpec::default(), 3);

        let width = 550.0 / 3.0;
        for (i, cell) in report.index_cells.iter().enumerate() {
            assert!((cell.cell.x - (50.0 + width * i as f32)).abs() < 1e-3);
            assert!((cell.cell.width - width).abs() < 1e-3);
        }
        let first = &report.index_cells[0];
        assert_eq!(first.cell.top(), 700.0);
        // image: min(183.33 - 20, 150 - 60) = 90, centred, 30 above the cell bottom
        assert_eq!(first.image.width, 90.0);
        assert_eq!(first.image.y, first.cell.y + 30.0);
        assert!((first.image.x - (50.0 + (width - 90.0) / 2.0)).abs() < 1e-3);
    }

    #[test]
    fn smallest_title_gap_keeps_title_block_above_first_row() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 1);
        let mut spec = IndexSpec::default();
        spec.title_gap = spec.title_block_height();
        let report = paginate(&mut sink, &spec, 3);

        let first_row_top = report.index_cells[0].cell.top();
        let baselines: Vec<f32> = sink
            .page(2)
            .unwrap()
            .ops()
            .filter_map(|op| match op {
                DrawOp::Text { origin, text, .. }
                    if *text == spec.title || text.starts_with("Total markers") =>
                {
                    Some(origin.y)
                }
                _ => None,
            })
            .collect();
        assert_eq!(baselines.len(), 2);
        assert!(baselines.iter().all(|y| *y >= first_row_top));
    }

    #[test]
    fn empty_index_appends_nothing() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 1);
        let report = paginate(&mut sink, &IndexSpec::default(), 0);
        assert!(report.index_pages.is_empty());
        assert_eq!(sink.pages().len(), 1);
    }

    #[test]
    fn captions_name_source_pages() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 1);
        paginate(&mut sink, &IndexSpec::default(), 5);
        let captions: Vec<String> = texts(&sink, 2)
            .into_iter()
            .filter(|text| text.starts_with("Page "))
            .collect();
        assert_eq!(captions, vec!["Page 1", "Page 1", "Page 1", "Page 1", "Page 2"]);
    }
}
