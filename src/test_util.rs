#[cfg(test)]
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: HOME is only mutated while holding HOME_MUTEX.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    unsafe {
        if let Some(old) = old_home {
            std::env::set_var("HOME", old);
        } else {
            std::env::remove_var("HOME");
        }
    }
    result
}

#[cfg(test)]
pub(crate) fn synthetic_page(width: u32, height: u32) -> image::GrayImage {
    let mut page = image::GrayImage::from_pixel(width, height, image::Luma([255]));
    for y0 in (height / 10..height * 9 / 10).step_by(10) {
        for y in y0..(y0 + 3).min(height * 9 / 10) {
            for x in (width / 10)..(width * 9 / 10) {
                if (x / 4) % 3 != 2 {
                    page.put_pixel(x, y, image::Luma([0]));
                }
            }
        }
    }
    page
}
