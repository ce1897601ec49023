use docscan::Point2D;
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use tempfile::NamedTempFile;

pub const PAPER: Rgb<u8> = Rgb([225, 222, 215]);
pub const TABLE: Rgb<u8> = Rgb([35, 30, 28]);

/// Corners of the sheet in [`skewed_document`], clockwise from top-left.
pub const SHEET_CORNERS: [(i32, i32); 4] = [(60, 50), (330, 70), (340, 250), (50, 240)];

/// A 400x300 photo of a light sheet lying skewed on a dark table.
pub fn skewed_document() -> DynamicImage {
    let mut img = RgbImage::from_pixel(400, 300, TABLE);
    let sheet: Vec<Point<i32>> = SHEET_CORNERS
        .iter()
        .map(|&(x, y)| Point::new(x, y))
        .collect();
    draw_polygon_mut(&mut img, &sheet, PAPER);
    DynamicImage::ImageRgb8(img)
}

/// Expected width/height ratio of the flattened sheet: longest top/bottom
/// side over longest left/right side.
pub fn sheet_aspect_ratio() -> f64 {
    let c: Vec<Point2D> = SHEET_CORNERS
        .iter()
        .map(|&(x, y)| Point2D::new(x as f64, y as f64))
        .collect();
    let width = c[0].distance(&c[1]).max(c[3].distance(&c[2]));
    let height = c[0].distance(&c[3]).max(c[1].distance(&c[2]));
    width / height
}

/// A featureless grey image of the given size.
pub fn uniform_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([128u8, 128, 128])))
}

/// Writes `img` to a temporary PNG file.
/// The file will be automatically cleaned up when dropped.
pub fn write_temp_png(img: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Config tuned for the small synthetic photos used in tests.
pub fn small_config() -> docscan::ScanConfig {
    docscan::ScanConfig {
        working_width: 200,
        ..docscan::ScanConfig::default()
    }
}
