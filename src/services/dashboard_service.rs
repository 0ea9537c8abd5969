//! Display sink for the market panel.
//!
//! The poller writes formatted text into named fields; the terminal view keeps
//! the latest value of each and prints the panel when asked to present.

use std::io::Write;

use tracing::warn;

use crate::models::MarketSnapshot;
use crate::utils::format::{format_billions, format_change, format_usd, Tone};
use crate::utils::Table;

pub const LOADING_TEXT: &str = "Loading...";

/// The four numeric fields of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    MarketCap,
    Price,
    Change,
    Volume,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::MarketCap, Field::Price, Field::Change, Field::Volume];
}

/// Text plus tone for one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub text: String,
    pub tone: Tone,
}

impl FieldValue {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Neutral,
        }
    }
}

pub trait DashboardView: Send {
    fn set_field(&mut self, field: Field, value: FieldValue);

    /// Label above the price, e.g. `BTC Price`
    fn set_price_label(&mut self, label: String);

    /// Flush pending changes to the screen
    fn present(&mut self) {}
}

/// Formatted values for a snapshot, in `Field::ALL` order
pub fn snapshot_fields(snapshot: &MarketSnapshot) -> [(Field, FieldValue); 4] {
    let (change_text, change_tone) = format_change(snapshot.change_24h);
    [
        (Field::MarketCap, FieldValue::plain(format_billions(snapshot.market_cap))),
        (Field::Price, FieldValue::plain(format_usd(snapshot.current_price))),
        (
            Field::Change,
            FieldValue {
                text: change_text,
                tone: change_tone,
            },
        ),
        (Field::Volume, FieldValue::plain(format_billions(snapshot.volume_24h))),
    ]
}

pub fn price_label(snapshot: &MarketSnapshot) -> String {
    format!("{} Price", snapshot.symbol.to_uppercase())
}

/// Write a snapshot into the view
pub fn show_snapshot<V: DashboardView + ?Sized>(view: &mut V, snapshot: &MarketSnapshot) {
    for (field, value) in snapshot_fields(snapshot) {
        view.set_field(field, value);
    }
    view.set_price_label(price_label(snapshot));
}

/// Put the same text in every numeric field
pub fn fill_fields<V: DashboardView + ?Sized>(view: &mut V, text: &str) {
    for field in Field::ALL {
        view.set_field(field, FieldValue::plain(text));
    }
}

/// Prints the panel to stdout
pub struct TerminalView {
    values: [FieldValue; 4],
    price_label: String,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|_| FieldValue::plain("-")),
            price_label: "Price".to_string(),
        }
    }

    fn label(&self, field: Field) -> &str {
        match field {
            Field::MarketCap => "Market Cap",
            Field::Price => &self.price_label,
            Field::Change => "24h Change",
            Field::Volume => "24h Volume",
        }
    }

    fn render(&self) -> String {
        let mut table = Table::new(vec!["Market", "Value"]);
        for (field, value) in Field::ALL.iter().zip(self.values.iter()) {
            let row = vec![self.label(*field), value.text.as_str()];
            match value.tone.hex().and_then(ansi_foreground) {
                Some(escape) => table.add_styled_row(row, escape),
                None => table.add_row(row),
            }
        }
        table.render()
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardView for TerminalView {
    fn set_field(&mut self, field: Field, value: FieldValue) {
        self.values[field as usize] = value;
    }

    fn set_price_label(&mut self, label: String) {
        self.price_label = label;
    }

    fn present(&mut self) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "\n{}", self.render()) {
            warn!("Failed to write market panel: {}", e);
        }
    }
}

/// `#16a34a` -> 24-bit ANSI foreground escape
fn ansi_foreground(hex: &str) -> Option<String> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(format!("\x1b[38;2;{};{};{}m", channel(0)?, channel(2)?, channel(4)?))
}
