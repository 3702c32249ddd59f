use anyhow::{Context, Result, anyhow};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Output};

use crate::ocr::OcrError;
use crate::settings::EngineSettings;

pub(super) fn list_tesseract_languages(cmd: &str) -> Result<Vec<String>> {
    let output = spawn(cmd, [OsString::from("--list-langs")])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_language_list(&stdout))
}

fn parse_language_list(stdout: &str) -> Vec<String> {
    let mut langs = Vec::new();
    for (idx, line) in stdout.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let value = line.trim();
        if !value.is_empty() {
            langs.push(value.to_string());
        }
    }
    langs
}

pub(super) fn normalize_ocr_languages(cmd: &str, requested: &str) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }

    let available = match list_tesseract_languages(cmd) {
        Ok(list) => list,
        Err(err) => {
            tracing::debug!("could not list tesseract languages: {:#}", err);
            return Ok(trimmed.to_string());
        }
    };
    select_languages(trimmed, &available)
}

fn select_languages(requested: &str, available: &[String]) -> Result<String> {
    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for raw in requested.split(['+', ',', ' ']) {
        let lang = raw.trim();
        if lang.is_empty() {
            continue;
        }
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        tracing::warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }

    Ok(chosen.join("+"))
}

pub(super) fn build_args(path: &Path, languages: &str, settings: &EngineSettings) -> Vec<OsString> {
    let mut args = vec![
        path.as_os_str().to_os_string(),
        OsString::from("stdout"),
        OsString::from("-l"),
        OsString::from(languages),
        OsString::from("--oem"),
        OsString::from(settings.oem.to_string()),
        OsString::from("--psm"),
        OsString::from(settings.psm.to_string()),
    ];
    if !settings.whitelist.is_empty() {
        args.push(OsString::from("-c"));
        args.push(OsString::from(format!(
            "tessedit_char_whitelist={}",
            settings.whitelist
        )));
    }
    args
}

pub(super) fn run_tesseract_text(
    path: &Path,
    languages: &str,
    settings: &EngineSettings,
) -> Result<String> {
    let output = spawn(&settings.tesseract_cmd, build_args(path, languages, settings))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract failed: {}", stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn spawn<I>(cmd: &str, args: I) -> Result<Output>
where
    I: IntoIterator<Item = OsString>,
{
    match Command::new(cmd).args(args).output() {
        Ok(output) => Ok(output),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(OcrError::EngineNotFound(cmd.to_string()).into())
        }
        Err(err) => Err(err).with_context(|| format!("failed to run {}", cmd)),
    }
}
