// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end placement runs against real PDF documents and image artifacts.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use lopdf::{Document, Object};
use pagemark_core::{
    FontSource, LayoutConfig, MarkerRecord, MarkerSet, PageGeometry, PagemarkError, SkipReason,
};
use pagemark_document::{DocumentSink, MarkerEngine, PdfDocument, RecordingSink};
use tempfile::TempDir;

fn letter() -> PageGeometry {
    PageGeometry::new(612.0, 792.0)
}

/// Write a small opaque image artifact; the extension picks PNG or JPEG.
fn artifact(dir: &TempDir, name: &str, shade: u8) -> PathBuf {
    let path = dir.path().join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([shade, shade, shade])))
        .save(&path)
        .unwrap();
    path
}

fn marker(page: u32, name: &str, artifact: &Path) -> MarkerRecord {
    MarkerRecord::new(
        page,
        format!("https://example.com/{name}"),
        artifact,
        None,
    )
    .unwrap()
}

fn image_xobjects(document: &Document) -> usize {
    document
        .objects
        .values()
        .filter_map(|object| object.as_stream().ok())
        .filter(|stream| {
            stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|name| name == b"Image")
        })
        .count()
}

#[test]
fn markers_index_and_skips_survive_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let png = artifact(&dir, "a.png", 10);
    let jpeg = artifact(&dir, "b.jpg", 200);

    let mut markers = MarkerSet::new();
    for i in 0..5 {
        markers.push(marker(1, &format!("one/{i}"), &png));
    }
    markers.push(marker(2, "two/jpeg", &jpeg));
    markers.push(marker(2, "two/missing", &dir.path().join("missing.png")));
    markers.push(marker(3, "three/late", &png));

    let mut doc = PdfDocument::blank(&[letter(), letter()]).unwrap();
    let mut engine = MarkerEngine::new(LayoutConfig::default()).unwrap();
    let report = engine.run(&mut doc, &markers).unwrap();

    assert_eq!(report.placements.len(), 6);
    assert_eq!(report.index_cells.len(), 6);
    assert_eq!(report.index_pages, vec![3]);
    assert_eq!(report.skipped.len(), 2);
    assert!(matches!(
        report.skipped[0].reason,
        SkipReason::ArtifactUnavailable { .. }
    ));
    assert!(matches!(
        report.skipped[1].reason,
        SkipReason::PageOutOfRange { page_count: 2 }
    ));

    let reloaded = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    assert_eq!(reloaded.get_pages().len() as u32, report.final_pages());
    // one XObject per distinct artifact, reused by the index
    assert_eq!(image_xobjects(&reloaded), 2);
}

#[test]
fn overflow_pages_follow_original_pages() {
    let dir = tempfile::tempdir().unwrap();
    let png = artifact(&dir, "qr.png", 0);
    // letter: 4 markers per row, 5 rows per page
    let markers: MarkerSet = (0..30)
        .map(|i| marker(1, &format!("item/{i}"), &png))
        .collect();

    let mut doc = PdfDocument::blank(&[letter(), letter()]).unwrap();
    let report = MarkerEngine::new(LayoutConfig::default())
        .unwrap()
        .run(&mut doc, &markers)
        .unwrap();

    assert_eq!(report.overflow_pages, vec![3]);
    assert_eq!(report.drawn_on(1).count(), 20);
    assert_eq!(report.drawn_on(3).count(), 10);
    assert_eq!(report.drawn_on(2).count(), 0);
    assert_eq!(report.index_pages.first(), Some(&4));
    assert_eq!(doc.page_count().unwrap(), report.final_pages());

    let reloaded = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let page_two = reloaded.get_pages()[&2];
    assert!(reloaded.get_page_contents(page_two).is_empty());
}

#[test]
fn short_page_overflows_onto_first_page_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let png = artifact(&dir, "qr.png", 0);
    let markers: MarkerSet = vec![marker(2, "short", &png)].into_iter().collect();

    let mut doc =
        PdfDocument::blank(&[letter(), PageGeometry::new(612.0, 2.0 * 50.0 + 100.0 - 1.0)])
            .unwrap();
    let report = MarkerEngine::new(LayoutConfig::default())
        .unwrap()
        .run(&mut doc, &markers)
        .unwrap();

    assert_eq!(report.overflow_pages, vec![3]);
    let placed = &report.placements[0];
    assert_eq!(placed.target_page, 3);
    assert_eq!((placed.rect.x, placed.rect.y), (50.0, 792.0 - 50.0 - 100.0));
    assert_eq!(doc.page_geometry(3).unwrap(), letter());
}

#[test]
fn identical_artifacts_are_embedded_once() {
    let dir = tempfile::tempdir().unwrap();
    let first = artifact(&dir, "first.png", 42);
    let copy = dir.path().join("copy.png");
    std::fs::copy(&first, &copy).unwrap();

    let markers: MarkerSet = vec![marker(1, "a", &first), marker(1, "b", &copy)]
        .into_iter()
        .collect();
    let mut doc = PdfDocument::blank(&[letter()]).unwrap();
    MarkerEngine::new(LayoutConfig::default())
        .unwrap()
        .run(&mut doc, &markers)
        .unwrap();

    let reloaded = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    assert_eq!(image_xobjects(&reloaded), 1);
}

#[test]
fn dry_run_matches_pdf_layout() {
    let dir = tempfile::tempdir().unwrap();
    let png = artifact(&dir, "qr.png", 0);
    let mut markers: MarkerSet = (0..25)
        .map(|i| marker(i % 2 + 1, &format!("item/{i}"), &png))
        .collect();
    markers.push(marker(1, "gone", &dir.path().join("gone.png")));

    let mut doc = PdfDocument::blank(&[letter(), letter()]).unwrap();
    let mut dry = RecordingSink::new(doc.page_geometries().unwrap()).verifying_artifacts();

    let pdf_report = MarkerEngine::new(LayoutConfig::default())
        .unwrap()
        .run(&mut doc, &markers)
        .unwrap();
    let dry_report = MarkerEngine::new(LayoutConfig::default())
        .unwrap()
        .run(&mut dry, &markers)
        .unwrap();

    assert_eq!(pdf_report.placements, dry_report.placements);
    assert_eq!(pdf_report.index_cells, dry_report.index_cells);
    let skipped = |report: &pagemark_core::RunReport| {
        report
            .skipped
            .iter()
            .map(|skip| (skip.page, skip.link.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(skipped(&pdf_report), skipped(&dry_report));
    assert_eq!(pdf_report.final_pages(), dry_report.final_pages());
}

#[test]
fn saved_output_reopens_with_new_handle() {
    let dir = tempfile::tempdir().unwrap();
    let png = artifact(&dir, "qr.png", 0);
    let markers: MarkerSet = vec![marker(1, "a", &png)].into_iter().collect();
    let mut engine = MarkerEngine::new(LayoutConfig::default()).unwrap();

    let mut doc = PdfDocument::blank(&[letter()]).unwrap();
    engine.run(&mut doc, &markers).unwrap();
    let saved = doc.save(dir.path().join("marked")).unwrap();
    doc.close();
    assert!(matches!(
        engine.run(&mut doc, &markers),
        Err(PagemarkError::DocumentClosed)
    ));

    // the engine notices the new handle and loads the font into it
    let mut reopened = PdfDocument::open(&saved).unwrap();
    assert_eq!(reopened.page_count().unwrap(), 2);
    let report = engine.run(&mut reopened, &markers).unwrap();
    assert_eq!(report.final_pages(), 3);
    assert!(Document::load_mem(&reopened.to_bytes().unwrap()).is_ok());
}

#[test]
fn missing_font_aborts_before_any_change() {
    let dir = tempfile::tempdir().unwrap();
    let png = artifact(&dir, "qr.png", 0);
    let markers: MarkerSet = vec![marker(1, "a", &png)].into_iter().collect();
    let config = LayoutConfig {
        font: FontSource::TrueType {
            path: dir.path().join("missing.ttf"),
        },
        ..LayoutConfig::default()
    };

    let mut doc = PdfDocument::blank(&[letter()]).unwrap();
    let err = MarkerEngine::new(config)
        .unwrap()
        .run(&mut doc, &markers)
        .unwrap_err();
    assert!(matches!(err, PagemarkError::ResourceNotFound(_)));
    assert_eq!(doc.page_count().unwrap(), 1);
}
