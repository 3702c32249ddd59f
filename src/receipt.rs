//! Line-item extraction from OCR'd receipt text.
//!
//! Receipts are expected to carry one item per line in the shape
//! `<qty> <name> <price>`, e.g. `2 Nasi Goreng 25.000`. Header, footer and
//! summary lines are recognised by keyword and skipped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NON_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)total|subtotal|ppn|tax|cash|kembali|change|payment|thank|date|time|item|qty|harga|rp\s*\d|disc",
    )
    .expect("valid non-item pattern")
});

static ITEM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([^\d].*?)\s+([\d.,]+)$").expect("valid item pattern"));

static NAME_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-•*|,]+").expect("valid name noise pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    pub qty: u32,
    pub price: f64,
}

pub fn parse_items(text: &str) -> Vec<ReceiptItem> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !NON_ITEM.is_match(line))
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<ReceiptItem> {
    let line = line.trim_end_matches(|ch: char| ch == ',' || ch.is_whitespace());
    let caps = ITEM_LINE.captures(line)?;
    let qty: u32 = caps[1].parse().ok()?;
    let price = parse_price(&caps[3])?;
    let name = NAME_NOISE.replace_all(caps[2].trim(), " ");
    let name = WHITESPACE.replace_all(&name, " ").trim().to_string();

    if qty == 0 || price <= 0.0 || name.chars().count() <= 1 {
        return None;
    }
    Some(ReceiptItem { name, qty, price })
}

/// Dots and commas are both read as thousands separators.
fn parse_price(raw: &str) -> Option<f64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
