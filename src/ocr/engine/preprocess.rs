use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

use crate::settings::PreprocessSettings;

use super::deskew;

pub(crate) struct Preprocessed {
    pub(crate) image: GrayImage,
    pub(crate) skew_degrees: f32,
}

/// grayscale -> upscale -> denoise -> threshold -> deskew
pub(crate) fn preprocess_image(image: &DynamicImage, settings: &PreprocessSettings) -> Preprocessed {
    let gray = to_grayscale(image);
    let gray = upscale(gray, settings.upscale_min_width, settings.upscale_factor);
    let denoised = remove_noise(
        &gray,
        settings.bilateral_diameter,
        settings.bilateral_sigma_color,
        settings.bilateral_sigma_space,
    );
    let binary = adaptive_threshold(&denoised, settings.threshold_block_size, settings.threshold_c);
    let (image, skew_degrees) = deskew::deskew(&binary);
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        skew_degrees,
        "preprocessing finished"
    );
    Preprocessed {
        image,
        skew_degrees,
    }
}

pub(crate) fn to_grayscale(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
        let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
        let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
        let value = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
        luma.put_pixel(x, y, Luma([value]));
    }
    luma
}

pub(crate) fn upscale(image: GrayImage, min_width: u32, factor: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width >= min_width || factor <= 1 {
        return image;
    }
    image::imageops::resize(
        &image,
        width.saturating_mul(factor),
        height.saturating_mul(factor),
        image::imageops::FilterType::CatmullRom,
    )
}

/// Bilateral filter over a circular window of the given diameter; borders
/// replicate the edge pixel.
pub(crate) fn remove_noise(
    image: &GrayImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    let radius = (diameter / 2) as i64;
    if radius == 0 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let color_weights: Vec<f32> = (0..256)
        .map(|d| (((d * d) as f32) * color_coeff).exp())
        .collect();
    let mut window = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist2 = (dx * dx + dy * dy) as f32;
            if dist2.sqrt() > radius as f32 {
                continue;
            }
            window.push((dx, dy, (dist2 * space_coeff).exp()));
        }
    }

    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;
    let mut output = GrayImage::new(width, height);
    for (x, y, out) in output.enumerate_pixels_mut() {
        let center = image.get_pixel(x, y)[0];
        let mut sum = 0.0f32;
        let mut weight_sum = 0.0f32;
        for &(dx, dy, space_weight) in &window {
            let sx = (x as i64 + dx).clamp(0, max_x) as u32;
            let sy = (y as i64 + dy).clamp(0, max_y) as u32;
            let value = image.get_pixel(sx, sy)[0];
            let weight = space_weight * color_weights[center.abs_diff(value) as usize];
            sum += weight * value as f32;
            weight_sum += weight;
        }
        out[0] = (sum / weight_sum).round().clamp(0.0, 255.0) as u8;
    }
    output
}

/// Gaussian-weighted local mean over `block_size`, binarized against
/// `mean - c`: brighter pixels become 255, the rest 0.
pub(crate) fn adaptive_threshold(image: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let sigma = gaussian_sigma_for_block(block_size);
    let mean = gaussian_blur_f32(image, sigma);
    let mut output = image.clone();
    for (out, local) in output.pixels_mut().zip(mean.pixels()) {
        out[0] = if out[0] as f32 > local[0] as f32 - c {
            255
        } else {
            0
        };
    }
    output
}

pub(crate) fn gaussian_sigma_for_block(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}
