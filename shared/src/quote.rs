//! Quote / invoice totals. Percentages are whole numbers (`10` means 10%).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Blank cells arrive as `null` or `""`. Anything that is not a number, or a
/// string holding one, reads as zero.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LineItem {
    #[serde(deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(deserialize_with = "lenient_number")]
    pub quantity: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub rate: f64,
    /// Tax percentage applied to this line after the document discount
    #[serde(deserialize_with = "lenient_number")]
    pub tax: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteRequest {
    pub line_items: Vec<LineItem>,
    #[serde(deserialize_with = "lenient_number")]
    pub discount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineTotal {
    pub description: String,
    pub amount: f64,
    pub tax_amount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTotals {
    pub lines: Vec<LineTotal>,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total: f64,
}

/// Largest accepted quantity, rate or percentage. Keeps every product and
/// sum finite.
pub const MAX_INPUT: f64 = 1e12;

/// Negative, NaN and infinite inputs count as zero.
fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value.min(MAX_INPUT)
    } else {
        0.0
    }
}

fn percent(value: f64) -> f64 {
    non_negative(value) / 100.0
}

pub fn calculate(items: &[LineItem], discount: f64) -> QuoteTotals {
    let discount = percent(discount).min(1.0);

    let lines: Vec<LineTotal> = items
        .iter()
        .map(|item| {
            let amount = non_negative(item.quantity) * non_negative(item.rate);
            LineTotal {
                description: item.description.clone(),
                amount,
                tax_amount: amount * (1.0 - discount) * percent(item.tax),
            }
        })
        .collect();

    let subtotal: f64 = lines.iter().map(|l| l.amount).sum();
    let tax_amount: f64 = lines.iter().map(|l| l.tax_amount).sum();
    let discount_amount = subtotal * discount;

    QuoteTotals {
        lines,
        subtotal,
        discount_amount,
        tax_amount,
        total: subtotal - discount_amount + tax_amount,
    }
}

/// Round half away from zero to two decimals, for display.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl QuoteTotals {
    pub fn rounded(&self) -> QuoteTotals {
        QuoteTotals {
            lines: self
                .lines
                .iter()
                .map(|l| LineTotal {
                    description: l.description.clone(),
                    amount: round_cents(l.amount),
                    tax_amount: round_cents(l.tax_amount),
                })
                .collect(),
            subtotal: round_cents(self.subtotal),
            discount_amount: round_cents(self.discount_amount),
            tax_amount: round_cents(self.tax_amount),
            total: round_cents(self.total),
        }
    }
}
