use docscan::{MemoryArtifacts, Pipeline, ScanConfig, ThresholdMethod};
use image::Rgb;

fn main() -> anyhow::Result<()> {
    let img = docscan::load_image("test_image.jpg")?;

    println!("Testing document pipeline with a custom configuration...\n");

    // Larger working image and a plain mean threshold with a wider window
    let config = ScanConfig {
        working_width: 800,
        block_size: 21,
        bias: 15,
        method: ThresholdMethod::Mean,
        ..ScanConfig::default()
    };
    let pipeline = Pipeline::new(&config)?.with_background(Rgb([255, 255, 255]));

    // Keep the stages in memory instead of writing them out
    let mut artifacts = MemoryArtifacts::new();
    let outcome = pipeline.run(img, &mut artifacts)?;

    println!("\n✓ Pipeline completed successfully!");
    println!("  Stages recorded: {}", artifacts.names().join(", "));
    println!(
        "  Document outline (working scale {:.2}):",
        outcome.ratio.get()
    );
    for (i, corner) in outcome.quadrilateral.corners.iter().enumerate() {
        println!("    corner {}: ({:.1}, {:.1})", i + 1, corner.x, corner.y);
    }
    println!(
        "  Rectified size: {}x{}",
        outcome.rectified.width(),
        outcome.rectified.height()
    );
    if outcome.is_degraded() {
        println!("  Fallbacks: {:?}", outcome.degradations);
    }

    outcome.scan.save("custom_scan.png")?;
    println!("\nSaved custom_scan.png");
    Ok(())
}
