//! Supplier price comparison across receipts.
//!
//! Every item name becomes one row holding the lowest price each supplier
//! was seen charging for it. The lowest of those prices is flagged as the
//! cheapest; ties flag every supplier that matches.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::receipt::ReceiptItem;

const UNKNOWN_SUPPLIER: &str = "?";

#[derive(Debug, Clone, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
}

/// A receipt line that has been assigned to a supplier (or not yet).
#[derive(Debug, Clone, Deserialize)]
pub struct SuppliedItem {
    #[serde(flatten)]
    pub item: ReceiptItem,
    #[serde(default, alias = "supplierId")]
    pub supplier_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupplierReceipt {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<SuppliedItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonInput {
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    pub receipts: Vec<SupplierReceipt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierPrice {
    pub supplier_id: String,
    pub supplier: String,
    pub price: f64,
    pub cheapest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub name: String,
    pub prices: Vec<SupplierPrice>,
}

pub fn load_comparison_input(path: &Path) -> Result<ComparisonInput> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read receipts: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse receipts: {}", path.display()))
}

pub fn compare_prices(input: &ComparisonInput) -> Vec<ComparisonRow> {
    let mut by_name: HashMap<String, BTreeMap<String, f64>> = HashMap::new();
    for receipt in &input.receipts {
        for supplied in &receipt.items {
            let name = supplied.item.name.trim();
            if name.is_empty() {
                continue;
            }
            let prices = by_name.entry(name.to_string()).or_default();
            let supplier_id = supplied.supplier_id.as_deref().unwrap_or_default();
            if supplier_id.is_empty() {
                continue;
            }
            let price = supplied.item.price;
            prices
                .entry(supplier_id.to_string())
                .and_modify(|current| *current = current.min(price))
                .or_insert(price);
        }
    }

    let mut rows: Vec<ComparisonRow> = by_name
        .into_iter()
        .map(|(name, prices)| build_row(name, prices, &input.suppliers))
        .collect();
    rows.sort_by(|a, b| compare_names(&a.name, &b.name));
    rows
}

/// Known suppliers come first in their listed order, unknown ids after.
fn build_row(name: String, mut prices: BTreeMap<String, f64>, suppliers: &[Supplier]) -> ComparisonRow {
    let lowest = prices.values().copied().reduce(f64::min);
    let mut ordered = Vec::with_capacity(prices.len());
    for supplier in suppliers {
        if let Some(price) = prices.remove(&supplier.id) {
            ordered.push(SupplierPrice {
                supplier_id: supplier.id.clone(),
                supplier: supplier.name.clone(),
                price,
                cheapest: lowest == Some(price),
            });
        }
    }
    for (supplier_id, price) in prices {
        ordered.push(SupplierPrice {
            supplier_id,
            supplier: UNKNOWN_SUPPLIER.to_string(),
            price,
            cheapest: lowest == Some(price),
        });
    }
    ComparisonRow {
        name,
        prices: ordered,
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
