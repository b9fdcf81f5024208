//! Stock movement models and reconciliation planning
//!
//! A movement is a ledger entry recording stock entering (`entry`) or
//! leaving (`exit`) the warehouse across one or more products. The planning
//! functions here translate a movement's type and line items into the stock
//! deltas the backend applies or reverses against each referenced product.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hours after `occurred_at` during which line items and type may be edited
pub const EDIT_WINDOW_HOURS: i64 = 24;

/// Whole days after `occurred_at` during which a movement may be deleted
pub const DELETE_WINDOW_DAYS: i64 = 3;

/// Movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Entry,
    Exit,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(MovementType::Entry),
            "exit" => Some(MovementType::Exit),
            _ => None,
        }
    }
}

/// One product-quantity-price/cost entry within a movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    /// Client-supplied code, cross-checked against the referenced product
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    pub quantity: i32,
    /// Required and positive for exit lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    /// Required and positive for entry lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
}

/// Fiscal document reference (NF-e). Purely descriptive, no stock effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceInfo {
    pub number: String,
    pub series: String,
    pub access_key: String,
    pub issued_at: DateTime<Utc>,
}

/// How a planned delta mutates a product's stock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Add to stock. Entry applications also touch the product's last entry date.
    Increase { touch_last_entry: bool },
    /// Subtract from stock; fails when available stock is below the quantity.
    Decrease,
    /// Subtract from stock, clamping at zero (entry reversal).
    DecreaseClamped,
}

/// A planned stock mutation for one line item
#[derive(Debug, Clone)]
pub struct StockDelta {
    pub product_id: Uuid,
    pub product_code: Option<String>,
    pub quantity: i32,
    pub effect: StockEffect,
}

impl StockDelta {
    /// Signed quantity this delta contributes to stock, ignoring the zero clamp
    pub fn signed_quantity(&self) -> i64 {
        match self.effect {
            StockEffect::Increase { .. } => i64::from(self.quantity),
            StockEffect::Decrease | StockEffect::DecreaseClamped => -i64::from(self.quantity),
        }
    }
}

/// Plan the deltas that put a movement's effect in force.
///
/// Entries add stock and refresh the product's last entry date; exits
/// subtract and must be covered by available stock. Deltas are ordered as
/// the line items are, so later lines observe earlier lines' effects when
/// they share a product.
pub fn application_deltas(movement_type: MovementType, items: &[LineItem]) -> Vec<StockDelta> {
    items
        .iter()
        .map(|item| StockDelta {
            product_id: item.product_id,
            product_code: item.product_code.clone(),
            quantity: item.quantity,
            effect: match movement_type {
                MovementType::Entry => StockEffect::Increase {
                    touch_last_entry: true,
                },
                MovementType::Exit => StockEffect::Decrease,
            },
        })
        .collect()
}

/// Plan the deltas that reverse a movement's previously applied effect.
///
/// Exit reversals return stock unconditionally; entry reversals subtract
/// clamped at zero, since intervening exits may already have consumed the
/// quantity being reversed.
pub fn reversal_deltas(movement_type: MovementType, items: &[LineItem]) -> Vec<StockDelta> {
    items
        .iter()
        .map(|item| StockDelta {
            product_id: item.product_id,
            product_code: item.product_code.clone(),
            quantity: item.quantity,
            effect: match movement_type {
                MovementType::Entry => StockEffect::DecreaseClamped,
                MovementType::Exit => StockEffect::Increase {
                    touch_last_entry: false,
                },
            },
        })
        .collect()
}

/// Whether a movement's line items or type may still be edited
pub fn economic_edit_allowed(occurred_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(occurred_at) <= Duration::hours(EDIT_WINDOW_HOURS)
}

/// Whether a movement may still be deleted. Counts whole elapsed days.
pub fn delete_allowed(occurred_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(occurred_at).num_days() <= DELETE_WINDOW_DAYS
}

/// Total units moved across all line items
pub fn total_quantity(items: &[LineItem]) -> i64 {
    items.iter().map(|i| i64::from(i.quantity)).sum()
}

/// Aggregate acquisition cost of an entry movement
pub fn total_cost(items: &[LineItem]) -> Decimal {
    items
        .iter()
        .filter_map(|i| i.unit_cost.map(|c| c * Decimal::from(i.quantity)))
        .sum()
}

/// Aggregate sale value of an exit movement
pub fn total_price(items: &[LineItem]) -> Decimal {
    items
        .iter()
        .filter_map(|i| i.unit_price.map(|p| p * Decimal::from(i.quantity)))
        .sum()
}
