use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use super::geom::{self, Point};

const INK_LEVEL: u8 = 128;
const MIN_CORRECTION_DEGREES: f32 = 0.1;

/// Estimates the skew of the ink in `image` in degrees, positive when text
/// lines descend to the right. `None` when there is not enough ink.
pub(crate) fn estimate_skew(image: &GrayImage) -> Option<f32> {
    // Only the outermost ink pixel of each row can sit on the convex hull.
    let mut points = Vec::new();
    for (y, row) in image.rows().enumerate() {
        let mut first = None;
        let mut last = None;
        for (x, pixel) in row.enumerate() {
            if pixel[0] < INK_LEVEL {
                if first.is_none() {
                    first = Some(x);
                }
                last = Some(x);
            }
        }
        if let (Some(first), Some(last)) = (first, last) {
            points.push(Point::new(first as f32, y as f32));
            if last != first {
                points.push(Point::new(last as f32, y as f32));
            }
        }
    }
    let rect = geom::min_area_rect(&points)?;
    if rect.width < 1.0 || rect.height < 1.0 {
        return None;
    }
    tracing::trace!(
        "ink block {:.1}x{:.1} at ({:.1}, {:.1}), angle {:.2}",
        rect.width,
        rect.height,
        rect.center.x,
        rect.center.y,
        rect.angle
    );
    Some(geom::normalize_skew(rect.angle))
}

/// Rotates the page so the dominant ink block is axis aligned. Returns the
/// corrected image and the skew that was removed.
pub(crate) fn deskew(image: &GrayImage) -> (GrayImage, f32) {
    let skew = match estimate_skew(image) {
        Some(angle) if angle.abs() >= MIN_CORRECTION_DEGREES => angle,
        _ => return (image.clone(), 0.0),
    };
    let rotated = rotate_about_center(
        image,
        -skew.to_radians(),
        Interpolation::Bicubic,
        Luma([255u8]),
    );
    (rotated, skew)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::synthetic_page;

    fn tilted_page(degrees: f32) -> GrayImage {
        let page = synthetic_page(400, 300);
        rotate_about_center(
            &page,
            degrees.to_radians(),
            Interpolation::Nearest,
            Luma([255u8]),
        )
    }

    #[test]
    fn blank_page_is_left_alone() {
        let blank = GrayImage::from_pixel(50, 50, Luma([255]));
        let (out, skew) = deskew(&blank);
        assert_eq!(skew, 0.0);
        assert_eq!(out, blank);
    }

    #[test]
    fn straight_page_reports_no_skew() {
        let page = synthetic_page(400, 300);
        let skew = estimate_skew(&page).expect("skew");
        assert!(skew.abs() < 0.01, "got {skew}");
    }

    #[test]
    fn tilted_page_is_straightened() {
        for degrees in [4.0f32, -6.0] {
            let tilted = tilted_page(degrees);
            let (straight, removed) = deskew(&tilted);
            assert!(
                (removed - degrees).abs() < 1.0,
                "expected about {degrees}, removed {removed}"
            );
            assert_eq!(straight.dimensions(), tilted.dimensions());
            let residual = estimate_skew(&straight).expect("residual skew");
            assert!(residual.abs() < 1.0, "residual {residual}");
        }
    }
}
