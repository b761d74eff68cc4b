// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid placer: lays one page's markers out left-to-right, top-to-bottom,
// wrapping rows on horizontal exhaustion and continuing on appended overflow
// pages on vertical exhaustion.

use std::collections::VecDeque;

use pagemark_core::error::{PagemarkError, Result};
use pagemark_core::{
    GridSpec, MarkerRecord, PageGeometry, Placement, Point, Rect, RunReport, Severity,
    SkipReason, SkippedMarker,
};
use tracing::{debug, info, instrument, warn};

use crate::layout::Cursor;
use crate::layout::index::IndexEntry;
use crate::resources::ResourceCache;
use crate::sink::{DocumentSink, DrawingContext, FontHandle};

/// Places markers on their owning page.
pub struct GridPlacer<'a> {
    spec: &'a GridSpec,
    font: &'a FontHandle,
    /// Geometry given to every appended overflow page.
    overflow_geometry: PageGeometry,
}

impl<'a> GridPlacer<'a> {
    pub fn new(spec: &'a GridSpec, font: &'a FontHandle, overflow_geometry: PageGeometry) -> Self {
        Self {
            spec,
            font,
            overflow_geometry,
        }
    }

    /// Place `markers` (all belonging to `page`) starting on `page` itself.
    ///
    /// Markers are taken from the front of a queue and removed only once they
    /// are drawn or skipped, so each one is handled exactly once and in order,
    /// however many overflow pages are needed. Returns the drawn markers for
    /// the index, in draw order.
    #[instrument(skip_all, fields(page = page, markers = markers.len()))]
    pub fn place_page<S: DocumentSink + ?Sized>(
        &self,
        sink: &mut S,
        resources: &mut ResourceCache,
        page: u32,
        markers: &[MarkerRecord],
        report: &mut RunReport,
    ) -> Result<Vec<IndexEntry>> {
        let spec = self.spec;
        let size = spec.marker_size;
        let margin = spec.margin;
        let row_step = size + spec.vertical_spacing;
        let column_step = size + spec.horizontal_spacing;

        let mut ctx = DrawingContext::open(&mut *sink, page)?;
        let mut geometry = *ctx.geometry();
        let mut cursor = Cursor::start(&geometry, margin);
        let mut on_overflow_page = false;
        // Set while the current overflow page has nothing drawn on it yet.
        let mut fresh_overflow = false;

        let mut pending: VecDeque<&MarkerRecord> = markers.iter().collect();
        let mut entries = Vec::with_capacity(markers.len());

        info!(page, markers = markers.len(), "Embedding markers");

        while let Some(&record) = pending.front() {
            let image = match ctx.resolve_image(resources, record.artifact_ref()) {
                Ok(image) => image,
                Err(err) if err.severity() == Severity::PerMarker => {
                    warn!(
                        page,
                        link = record.link(),
                        artifact = %record.artifact_ref().display(),
                        error = %err,
                        "Skipping marker"
                    );
                    report.skipped.push(SkippedMarker {
                        page,
                        link: record.link().to_string(),
                        artifact: record.artifact_ref().to_path_buf(),
                        reason: SkipReason::ArtifactUnavailable {
                            reason: err.to_string(),
                        },
                    });
                    pending.pop_front();
                    continue;
                }
                Err(err) => return Err(err),
            };

            // Wrapping cannot help on a page narrower than one marker.
            let (usable_width, usable_height) = geometry.usable(margin);
            if size > usable_width {
                return Err(PagemarkError::MarkerTooLarge {
                    width: size,
                    height: size,
                    usable_width,
                    usable_height,
                });
            }

            if cursor.x + size > geometry.width - margin {
                cursor.wrap(margin, row_step);
            }

            if cursor.y - size < margin {
                if fresh_overflow {
                    return Err(PagemarkError::MarkerTooLarge {
                        width: size,
                        height: size,
                        usable_width,
                        usable_height,
                    });
                }

                ctx.close()?;
                let overflow_page = sink.append_page(self.overflow_geometry)?;
                info!(
                    page,
                    overflow_page,
                    remaining = pending.len(),
                    "Adding a new page due to insufficient space"
                );
                report.overflow_pages.push(overflow_page);

                ctx = DrawingContext::open(&mut *sink, overflow_page)?;
                geometry = *ctx.geometry();
                cursor = Cursor::start(&geometry, margin);
                on_overflow_page = true;
                fresh_overflow = true;

                if spec.continuation_header {
                    ctx.show_text(
                        self.font,
                        spec.header_font_size,
                        Point::new(margin, geometry.height - margin / 2.0),
                        &format!("Continued from page {page}"),
                    );
                }
                continue;
            }

            let rect = Rect::new(cursor.x, cursor.y - size, size, size);
            if let Some(line_width) = spec.border {
                ctx.stroke_rect(rect, line_width);
            }
            ctx.draw_image(&image, rect);
            ctx.show_text(
                self.font,
                spec.label_font_size,
                Point::new(rect.x + spec.label_offset_x, rect.y - spec.label_offset_y),
                record.label(),
            );

            debug!(
                page,
                target_page = ctx.page(),
                x = rect.x,
                y = rect.y,
                link = record.link(),
                "Marker placed"
            );
            report.placements.push(Placement {
                source_page: page,
                target_page: ctx.page(),
                link: record.link().to_string(),
                label: record.label().to_string(),
                rect,
                overflow: on_overflow_page,
            });
            entries.push(IndexEntry {
                source_page: page,
                link: record.link().to_string(),
                label: record.label().to_string(),
                image,
            });

            cursor.advance(column_step);
            fresh_overflow = false;
            pending.pop_front();
        }

        ctx.close()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingSink;
    use crate::sink::DrawOp;
    use pagemark_core::FontSource;

    fn spec(spacing: f32) -> GridSpec {
        GridSpec {
            horizontal_spacing: spacing,
            vertical_spacing: spacing,
            ..GridSpec::default()
        }
    }

    fn markers(page: u32, count: usize) -> Vec<MarkerRecord> {
        (0..count)
            .map(|i| {
                MarkerRecord::new(
                    page,
                    format!("https://example.com/item-{i}"),
                    format!("qr/p{page}-{i}.png"),
                    None,
                )
                .unwrap()
            })
            .collect()
    }

    fn run(
        sink: &mut RecordingSink,
        spec: &GridSpec,
        page: u32,
        markers: &[MarkerRecord],
    ) -> Result<RunReport> {
        let mut resources = ResourceCache::new(FontSource::default());
        let font = resources.font(sink)?;
        let overflow = sink.page_geometry(1)?;
        let mut report = RunReport::new(sink.page_count()?);
        GridPlacer::new(spec, &font, overflow).place_page(
            sink,
            &mut resources,
            page,
            markers,
            &mut report,
        )?;
        Ok(report)
    }

    #[test]
    fn fifth_marker_wraps_one_row_down() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 1);
        let report = run(&mut sink, &spec(20.0), 1, &markers(1, 6)).unwrap();

        let xs: Vec<f32> = report.placements.iter().map(|p| p.rect.x).collect();
        assert_eq!(xs, vec![50.0, 170.0, 290.0, 410.0, 50.0, 170.0]);

        let first_top = report.placements[0].rect.top();
        let fifth_top = report.placements[4].rect.top();
        assert_eq!(first_top, 750.0);
        assert_eq!(first_top - fifth_top, 120.0);
        assert!(report.overflow_pages.is_empty());
    }

    #[test]
    fn draws_border_image_and_label_in_order() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 1);
        run(&mut sink, &GridSpec::default(), 1, &markers(1, 1)).unwrap();

        let ops: Vec<&DrawOp> = sink.page(1).unwrap().ops().collect();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], DrawOp::Rect { line_width, .. } if *line_width == 0.5));
        assert!(matches!(ops[1], DrawOp::Image { rect, .. } if *rect == Rect::new(50.0, 650.0, 100.0, 100.0)));
        match ops[2] {
            DrawOp::Text { origin, text, size, .. } => {
                assert_eq!(*origin, Point::new(55.0, 635.0));
                assert_eq!(text, "item-0");
                assert_eq!(*size, 10.0);
            }
            other => panic!("expected label, got {other:?}"),
        }
    }

    #[test]
    fn overflow_continues_on_appended_page_in_order() {
        // 4 per row, row tops at 750, 630, 510, 390, 270, 150 -> 24 fit on 600x800.
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 2);
        let page_markers = markers(1, 27);
        let report = run(&mut sink, &spec(20.0), 1, &page_markers).unwrap();

        assert_eq!(report.overflow_pages, vec![3]);
        assert_eq!(report.placements.len(), 27);
        assert_eq!(report.drawn_on(1).count(), 24);
        assert_eq!(report.drawn_on(3).count(), 3);

        let drawn: Vec<&str> = report.placements.iter().map(|p| p.link.as_str()).collect();
        let expected: Vec<&str> = page_markers.iter().map(MarkerRecord::link).collect();
        assert_eq!(drawn, expected);

        let first_overflow = &report.placements[24];
        assert!(first_overflow.overflow);
        assert_eq!((first_overflow.rect.x, first_overflow.rect.top()), (50.0, 750.0));
        // page 2 is untouched
        assert!(sink.page(2).unwrap().commits.is_empty());
        assert!(sink.page(3).unwrap().appended);
    }

    #[test]
    fn continuation_header_names_source_page() {
        let mut sink = RecordingSink::new(vec![
            PageGeometry::new(600.0, 800.0),
            PageGeometry::new(600.0, 199.0),
        ]);
        run(&mut sink, &GridSpec::default(), 2, &markers(2, 1)).unwrap();

        let header = sink.page(3).unwrap().ops().next().cloned();
        match header {
            Some(DrawOp::Text { text, origin, .. }) => {
                assert_eq!(text, "Continued from page 2");
                assert_eq!(origin, Point::new(50.0, 775.0));
            }
            other => panic!("expected header, got {other:?}"),
        }
    }

    #[test]
    fn immediate_overflow_places_marker_on_new_page() {
        // page 2 is exactly one point too short for a single marker
        let mut sink = RecordingSink::new(vec![
            PageGeometry::new(600.0, 800.0),
            PageGeometry::new(600.0, 2.0 * 50.0 + 100.0 - 1.0),
        ]);
        let report = run(&mut sink, &GridSpec::default(), 2, &markers(2, 1)).unwrap();

        assert_eq!(report.overflow_pages, vec![3]);
        assert_eq!(sink.pages().len(), 3);
        let placed = &report.placements[0];
        assert_eq!(placed.target_page, 3);
        assert_eq!((placed.rect.x, placed.rect.y), (50.0, 800.0 - 50.0 - 100.0));
    }

    #[test]
    fn marker_larger_than_empty_page_fails_instead_of_looping() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 199.0), 1);
        let err = run(&mut sink, &GridSpec::default(), 1, &markers(1, 1)).unwrap_err();
        assert!(matches!(err, PagemarkError::MarkerTooLarge { .. }));
        // the one overflow attempt is the only page added
        assert_eq!(sink.pages().len(), 2);
    }

    #[test]
    fn page_narrower_than_one_marker_fails_before_drawing() {
        let mut sink = RecordingSink::new(vec![
            PageGeometry::new(600.0, 800.0),
            PageGeometry::new(150.0, 800.0),
        ]);
        let err = run(&mut sink, &GridSpec::default(), 2, &markers(2, 2)).unwrap_err();

        assert!(matches!(
            err,
            PagemarkError::MarkerTooLarge { usable_width, .. } if usable_width == 50.0
        ));
        assert_eq!(sink.pages().len(), 2);
        assert_eq!(sink.page(2).unwrap().ops().count(), 0);
    }

    #[test]
    fn missing_artifact_is_skipped_without_leaving_a_gap() {
        let page_markers = markers(1, 3);
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 1)
            .with_missing(page_markers[1].artifact_ref());
        let report = run(&mut sink, &spec(20.0), 1, &page_markers).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].link, page_markers[1].link());
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::ArtifactUnavailable { .. }
        ));
        let xs: Vec<f32> = report.placements.iter().map(|p| p.rect.x).collect();
        assert_eq!(xs, vec![50.0, 170.0]);
    }

    #[test]
    fn borderless_grid_draws_no_rectangles() {
        let mut sink = RecordingSink::uniform(PageGeometry::new(600.0, 800.0), 1);
        let spec = GridSpec {
            border: None,
            ..GridSpec::default()
        };
        run(&mut sink, &spec, 1, &markers(1, 2)).unwrap();
        assert!(
            sink.page(1)
                .unwrap()
                .ops()
                .all(|op| !matches!(op, DrawOp::Rect { .. }))
        );
    }
}
