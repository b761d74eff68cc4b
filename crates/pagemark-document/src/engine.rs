// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marker engine: drives one placement run: per-page grids in ascending page
// order, then the index, against any `DocumentSink`.

use pagemark_core::error::Result;
use pagemark_core::{
    IndexPage, LayoutConfig, MarkerRecord, MarkerSet, RunReport, SkipReason, SkippedMarker,
};
use tracing::{info, instrument, warn};

use crate::layout::{GridPlacer, IndexPaginator};
use crate::resources::ResourceCache;
use crate::sink::DocumentSink;

/// Places a marker set onto a document and appends the index.
///
/// The engine owns the run's [`ResourceCache`], so running it twice against
/// the same open document reuses the font and every embedded artifact.
#[derive(Debug)]
pub struct MarkerEngine {
    config: LayoutConfig,
    resources: ResourceCache,
}

impl MarkerEngine {
    /// Create an engine after validating `config`.
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        let resources = ResourceCache::new(config.font.clone());
        Ok(Self { config, resources })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }

    /// Place every marker of `markers` and append the index.
    ///
    /// Pages are processed in ascending order, markers in input order. Markers
    /// on pages beyond the document's original page count and markers whose
    /// artifact cannot be loaded are skipped and listed in the report; every
    /// other error aborts the run.
    #[instrument(skip_all, fields(markers = markers.len()))]
    pub fn run<S: DocumentSink + ?Sized>(
        &mut self,
        sink: &mut S,
        markers: &MarkerSet,
    ) -> Result<RunReport> {
        let document = sink.document_id()?;
        let page_count = sink.page_count()?;
        let mut report = RunReport::new(page_count);

        if markers.is_empty() {
            info!(%document, "No markers to place");
            return Ok(report);
        }
        if page_count == 0 {
            for (page, records) in markers.pages() {
                skip_out_of_range(&mut report, page, page_count, records);
            }
            info!(
                %document,
                summary = %report.summary(),
                "Document has no pages, nothing placed"
            );
            return Ok(report);
        }

        // Overflow pages copy the first page's size; index pages may use a paper size.
        let overflow_geometry = sink.page_geometry(1)?.normalized();
        let index_geometry = match self.config.index.page {
            IndexPage::FirstPage => overflow_geometry,
            IndexPage::Paper(paper) => paper.geometry(),
        };
        self.config.grid.check_fits(&overflow_geometry)?;
        self.config.index.check_fits(&index_geometry)?;

        let font = self.resources.font(sink)?;
        info!(
            %document,
            pages = page_count,
            markers = markers.len(),
            "Starting placement run"
        );

        let placer = GridPlacer::new(&self.config.grid, &font, overflow_geometry);
        let mut entries = Vec::with_capacity(markers.len());

        for (page, records) in markers.pages() {
            if page > page_count {
                skip_out_of_range(&mut report, page, page_count, records);
                continue;
            }

            let drawn = placer.place_page(sink, &mut self.resources, page, records, &mut report)?;
            entries.extend(drawn);
        }

        IndexPaginator::new(&self.config.index, &font, index_geometry).paginate(
            sink,
            &entries,
            &mut report,
        )?;

        info!(%document, summary = %report.summary(), "Placement run finished");
        Ok(report)
    }
}

fn skip_out_of_range(
    report: &mut RunReport,
    page: u32,
    page_count: u32,
    records: &[MarkerRecord],
) {
    warn!(
        page,
        page_count,
        skipped = records.len(),
        "Page is out of range, skipping its markers"
    );
    report.skipped.extend(records.iter().map(|record| SkippedMarker {
        page,
        link: record.link().to_string(),
        artifact: record.artifact_ref().to_path_buf(),
        reason: SkipReason::PageOutOfRange { page_count },
    }));
}
