use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const TESSERACT_CMD_ENV: &str = "OCR_TESSERACT_CMD";

pub const DEFAULT_WHITELIST: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.,-:()/?! ";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub max_upload_bytes: usize,
    pub ocr: EngineSettings,
    pub preprocess: PreprocessSettings,
    pub debug_save_images: bool,
    pub debug_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tesseract_cmd: String,
    pub languages: String,
    pub oem: u32,
    pub psm: u32,
    pub whitelist: String,
}

/// Fixed parameters of the five preprocessing steps.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessSettings {
    pub upscale_min_width: u32,
    pub upscale_factor: u32,
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    pub threshold_block_size: u32,
    pub threshold_c: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:5000".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            ocr: EngineSettings::default(),
            preprocess: PreprocessSettings::default(),
            debug_save_images: false,
            debug_dir: PathBuf::from("debug_images"),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tesseract_cmd: "tesseract".to_string(),
            languages: "ind+eng".to_string(),
            oem: 3,
            psm: 3,
            whitelist: DEFAULT_WHITELIST.to_string(),
        }
    }
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            upscale_min_width: 300,
            upscale_factor: 2,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            threshold_block_size: 11,
            threshold_c: 2.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSection>,
    ocr: Option<OcrSection>,
    preprocess: Option<PreprocessSection>,
    debug: Option<DebugSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSection {
    tesseract_cmd: Option<String>,
    languages: Option<String>,
    oem: Option<u32>,
    psm: Option<u32>,
    whitelist: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PreprocessSection {
    upscale_min_width: Option<u32>,
    upscale_factor: Option<u32>,
    bilateral_diameter: Option<u32>,
    bilateral_sigma_color: Option<f32>,
    bilateral_sigma_space: Option<f32>,
    threshold_block_size: Option<u32>,
    threshold_c: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct DebugSection {
    save_images: Option<bool>,
    dir: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge(parse_settings(DEFAULT_SETTINGS_TOML, Path::new("<embedded>"))?);
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge(parse_settings(&content, &path)?);
        }
    }

    if let Ok(cmd) = std::env::var(TESSERACT_CMD_ENV) {
        if !cmd.trim().is_empty() {
            settings.ocr.tesseract_cmd = cmd.trim().to_string();
        }
    }
    settings.validate()?;
    Ok(settings)
}

fn parse_settings(content: &str, path: &Path) -> Result<SettingsFile> {
    toml::from_str(content).with_context(|| format!("failed to parse settings: {}", path.display()))
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr.trim().to_string();
                }
            }
            if let Some(limit) = server.max_upload_bytes {
                if limit > 0 {
                    self.max_upload_bytes = limit;
                }
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(cmd) = ocr.tesseract_cmd {
                if !cmd.trim().is_empty() {
                    self.ocr.tesseract_cmd = cmd;
                }
            }
            if let Some(languages) = ocr.languages {
                if !languages.trim().is_empty() {
                    self.ocr.languages = languages;
                }
            }
            if let Some(oem) = ocr.oem {
                self.ocr.oem = oem;
            }
            if let Some(psm) = ocr.psm {
                self.ocr.psm = psm;
            }
            if let Some(whitelist) = ocr.whitelist {
                self.ocr.whitelist = whitelist;
            }
        }
        if let Some(pre) = incoming.preprocess {
            let target = &mut self.preprocess;
            merge_positive(&mut target.upscale_min_width, pre.upscale_min_width);
            merge_positive(&mut target.upscale_factor, pre.upscale_factor);
            merge_positive(&mut target.bilateral_diameter, pre.bilateral_diameter);
            merge_positive(&mut target.threshold_block_size, pre.threshold_block_size);
            if let Some(sigma) = pre.bilateral_sigma_color {
                if sigma > 0.0 {
                    target.bilateral_sigma_color = sigma;
                }
            }
            if let Some(sigma) = pre.bilateral_sigma_space {
                if sigma > 0.0 {
                    target.bilateral_sigma_space = sigma;
                }
            }
            if let Some(c) = pre.threshold_c {
                target.threshold_c = c;
            }
        }
        if let Some(debug) = incoming.debug {
            if let Some(save) = debug.save_images {
                self.debug_save_images = save;
            }
            if let Some(dir) = debug.dir {
                if !dir.trim().is_empty() {
                    self.debug_dir = PathBuf::from(dir.trim());
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let block = self.preprocess.threshold_block_size;
        if block < 3 || block % 2 == 0 {
            return Err(anyhow!(
                "preprocess.threshold_block_size must be odd and >= 3 (got {})",
                block
            ));
        }
        if self.preprocess.upscale_factor > 8 {
            return Err(anyhow!(
                "preprocess.upscale_factor is too large (got {})",
                self.preprocess.upscale_factor
            ));
        }
        Ok(())
    }
}

fn merge_positive(target: &mut u32, value: Option<u32>) {
    if let Some(value) = value {
        if value > 0 {
            *target = value;
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".receipt-ocr"))
        }
    })
}
