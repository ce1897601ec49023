mod common;

use common::*;
use docscan::NoArtifacts;
use image::Rgb;
use std::collections::HashSet;

/// Coordinates of the outermost ring of a `width` x `height` image.
fn border_pixels(width: u32, height: u32) -> Vec<(u32, u32)> {
    (0..width)
        .flat_map(|x| [(x, 0), (x, height - 1)])
        .chain((0..height).flat_map(|y| [(0, y), (width - 1, y)]))
        .collect()
}

#[test]
fn skewed_sheet_is_found_and_flattened() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&small_config())?;
    let mut sink = MemoryArtifacts::new();

    let outcome = pipeline.run(skewed_document(), &mut sink)?;

    assert!(
        outcome.degradations.is_empty(),
        "unexpected fallbacks: {:?}",
        outcome.degradations
    );
    let (w, h) = (outcome.rectified.width(), outcome.rectified.height());
    let aspect = w as f64 / h as f64;
    let expected = sheet_aspect_ratio();
    assert!(
        (aspect - expected).abs() / expected < 0.05,
        "aspect {} ({}x{}) vs expected {}",
        aspect,
        w,
        h,
        expected
    );
    assert_eq!(outcome.scan.dimensions(), (w, h));

    let rectified = outcome.rectified.to_rgb8();
    for (x, y) in border_pixels(w, h) {
        assert_ne!(
            *rectified.get_pixel(x, y),
            Rgb([0, 0, 0]),
            "background at ({}, {})",
            x,
            y
        );
    }
    Ok(())
}

#[test]
fn detected_corners_are_near_the_sheet() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&small_config())?;
    let outcome = pipeline.run(skewed_document(), &mut NoArtifacts)?;

    let found = outcome.quadrilateral.scaled(outcome.ratio);
    for &(x, y) in &SHEET_CORNERS {
        let corner = Point2D::new(x as f64, y as f64);
        let nearest = found
            .corners
            .iter()
            .map(|c| c.distance(&corner))
            .fold(f64::INFINITY, f64::min);
        assert!(nearest < 8.0, "no detected corner near {:?}", corner);
    }
    Ok(())
}

#[test]
fn scan_is_strictly_black_and_white() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&small_config())?;
    let outcome = pipeline.run(skewed_document(), &mut NoArtifacts)?;

    let values: HashSet<u8> = outcome.scan.pixels().map(|p| p.0[0]).collect();
    assert!(values.is_subset(&HashSet::from([0, 255])), "{:?}", values);
    Ok(())
}

#[test]
fn every_run_writes_five_artifacts_in_order() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&small_config())?;
    for img in [skewed_document(), uniform_image(120, 90), uniform_image(3, 2)] {
        let mut sink = MemoryArtifacts::new();
        pipeline.run(img, &mut sink)?;
        assert_eq!(
            sink.names(),
            vec![
                "1_grayscale.png",
                "2_edges.png",
                "3_contour.png",
                "4_rectified.png",
                "5_scan.png"
            ]
        );
    }
    Ok(())
}

#[test]
fn uniform_image_falls_back_to_full_frame() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&ScanConfig::default())?;
    let mut sink = MemoryArtifacts::new();

    let outcome = pipeline.run(uniform_image(160, 120), &mut sink)?;

    assert!(matches!(
        outcome.degradations.as_slice(),
        [Degradation::FullFrame(_)]
    ));
    assert_eq!(outcome.rectified.width(), 159);
    assert_eq!(outcome.rectified.height(), 119);
    let rectified = outcome.rectified.to_rgb8();
    for (x, y) in border_pixels(159, 119) {
        let px = rectified.get_pixel(x, y);
        assert!(
            px.0.iter().all(|c| c.abs_diff(128) <= 2),
            "{:?} at ({}, {})",
            px,
            x,
            y
        );
    }
    assert!(outcome.scan.pixels().all(|p| p.0[0] == 255));
    Ok(())
}

#[test]
fn contour_artifact_is_drawn_on_working_image() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&small_config())?;
    let mut sink = MemoryArtifacts::new();
    pipeline.run(skewed_document(), &mut sink)?;

    let contour = sink.get("3_contour.png").expect("contour artifact").to_rgb8();
    assert_eq!(contour.width(), 200);
    assert!(contour.pixels().any(|p| p.0 == [0, 255, 0]));
    Ok(())
}

#[test]
fn even_block_size_fails_before_any_stage() {
    let config = ScanConfig {
        block_size: 10,
        ..ScanConfig::default()
    };
    let err = Pipeline::new(&config).unwrap_err();
    assert!(matches!(err, ScanError::InvalidConfiguration(_)));
}
