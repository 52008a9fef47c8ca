use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

use crate::automation::config::Region;
use crate::logging::Logger;

/// Converts any decoded screenshot to 8-bit RGB.
///
/// Dimensions are unchanged, so region coordinates stay valid.
pub fn normalize_rgb(img: &DynamicImage, log: &dyn Logger) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        other => {
            log.debug(
                "DigitExtractor",
                &format!("Converting {:?} screenshot to RGB8", other.color()),
            );
            other.to_rgb8()
        }
    }
}

/// Mean luma of the image, rounded to the nearest integer.
///
/// Uses the ITU-R 601 weights 299/587/114. Each pixel's luma is rounded
/// before averaging, the way an 8-bit greyscale conversion does.
pub fn mean_luma(img: &RgbImage) -> u8 {
    let pixel_count = img.width() as u64 * img.height() as u64;
    if pixel_count == 0 {
        return 0;
    }

    let total: u64 = img
        .pixels()
        .map(|p| (p[0] as u64 * 299 + p[1] as u64 * 587 + p[2] as u64 * 114 + 500) / 1000)
        .sum();

    (total as f64 / pixel_count as f64 + 0.5) as u8
}

/// Stretches contrast around the mean luma.
///
/// Every channel becomes `mean + factor * (value - mean)`, clamped to
/// 0..=255. A factor of 1.0 leaves the image unchanged; 2.0 doubles the
/// distance of each channel from the mean grey.
pub fn enhance_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luma(img) as f32;
    let (width, height) = img.dimensions();
    let mut output: RgbImage = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let stretch = |value: u8| -> u8 {
            let v = mean + factor * (value as f32 - mean);
            (v as i32).clamp(0, 255) as u8
        };
        output.put_pixel(x, y, Rgb([stretch(pixel[0]), stretch(pixel[1]), stretch(pixel[2])]));
    }

    output
}

/// Crops a region given in absolute pixel coordinates.
///
/// Clamps to image bounds, so a region hanging off the edge yields a
/// smaller (possibly empty) image instead of panicking.
pub fn crop_region(img: &RgbImage, region: &Region) -> RgbImage {
    let (w, h) = img.dimensions();

    let x0 = region.x.min(w);
    let y0 = region.y.min(h);
    let rw = region.width.min(w - x0);
    let rh = region.height.min(h - y0);

    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}
