use anyhow::{Context, Result};
use image::GrayImage;
use std::path::{Path, PathBuf};

pub(crate) fn debug_image_path(dir: &Path, name: &str) -> PathBuf {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|value| value.to_str())
        .map(sanitize_stem)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "debug".to_string());
    dir.join(format!("{}_{}.png", stem, uuid::Uuid::new_v4().simple()))
}

fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

pub(crate) fn save_debug_image(image: &GrayImage, dir: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create debug dir: {}", dir.display()))?;
    let path = debug_image_path(dir, name);
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write debug image: {}", path.display()))?;
    Ok(path)
}
