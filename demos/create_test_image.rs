use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;

fn main() -> anyhow::Result<()> {
    let mut img = RgbImage::new(1200, 900);

    // Wooden-ish table: dark with a faint vertical gradient
    for y in 0..900 {
        for x in 0..1200 {
            let shade = 40 + (y * 30 / 900) as u8;
            img.put_pixel(x, y, Rgb([shade + 10, shade, shade.saturating_sub(10)]));
        }
    }

    // Sheet of paper, photographed at an angle
    let sheet = [
        Point::new(210, 120),
        Point::new(980, 180),
        Point::new(1020, 800),
        Point::new(150, 760),
    ];
    draw_polygon_mut(&mut img, &sheet, Rgb([232, 228, 220]));

    // A few "lines of text" inside the sheet
    for row in 0..8 {
        let y = 260 + row * 55;
        draw_filled_rect_mut(
            &mut img,
            Rect::at(300, y).of_size(500 - (row as u32 % 3) * 80, 12),
            Rgb([40, 40, 45]),
        );
    }

    img.save("test_image.jpg")?;
    println!("Created test_image.jpg (1200x900 skewed document on a dark table)");
    Ok(())
}
