use crate::models::{Asset, RangeBucket};
use crate::utils::Table;

pub fn help_text() -> String {
    let assets: Vec<String> = Asset::ALL
        .iter()
        .map(|a| format!("{} ({})", a.id(), a.display_name()))
        .collect();
    let ranges: Vec<String> = RangeBucket::ALL.iter().map(|r| r.days().to_string()).collect();

    let mut table = Table::new(vec!["Command", "Description"]);
    table.add_row(vec!["asset <id>", "Switch the displayed asset"]);
    table.add_row(vec!["range <days>", "Switch the chart range"]);
    table.add_row(vec!["refresh", "Refresh now"]);
    table.add_row(vec!["help", "Show this help message"]);
    table.add_row(vec!["quit", "Stop the dashboard"]);

    format!(
        "📖 Market Pulse Commands\n{}\nAssets: {}\nRanges (days): {}",
        table.render(),
        assets.join(", "),
        ranges.join(", ")
    )
}
