/// Visual tone of a formatted value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Positive,
    Negative,
}

impl Tone {
    /// Hex color for the change field; `TerminalView` turns it into an ANSI escape
    pub fn hex(self) -> Option<&'static str> {
        match self {
            Tone::Neutral => None,
            Tone::Positive => Some("#16a34a"),
            Tone::Negative => Some("#ef4444"),
        }
    }
}

/// Insert `,` between groups of three digits of an unsigned integer string
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `1234567.891` -> `$1,234,567.89`
pub fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, group_thousands(int_part), frac_part)
}

/// `7.5e9` -> `$7.50B`
pub fn format_billions(value: f64) -> String {
    format!("${:.2}B", value / 1e9)
}

/// `2.0` -> `+2.00%` (positive), `-3.456` -> `-3.46%` (negative)
pub fn format_change(change: f64) -> (String, Tone) {
    // -0.0 counts as non-negative
    let change = if change == 0.0 { 0.0 } else { change };
    if change >= 0.0 {
        (format!("+{:.2}%", change), Tone::Positive)
    } else {
        (format!("{:.2}%", change), Tone::Negative)
    }
}

/// Y-axis tick label: whole dollars from $1,000 up, cents below
pub fn format_axis_usd(value: f64) -> String {
    if value.abs() >= 1000.0 {
        let whole = format!("{:.0}", value.abs());
        let sign = if value < 0.0 { "-" } else { "" };
        format!("{}${}", sign, group_thousands(&whole))
    } else {
        format_usd(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_billions() {
        assert_eq!(format_billions(7.5e9), "$7.50B");
        assert_eq!(format_billions(1.3456e12), "$1345.60B");
        assert_eq!(format_billions(0.0), "$0.00B");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(67123.456), "$67,123.46");
        assert_eq!(format_usd(1234567.891), "$1,234,567.89");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(0.5), "$0.50");
        assert_eq!(format_usd(-42.0), "-$42.00");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(-3.456), ("-3.46%".to_string(), Tone::Negative));
        assert_eq!(format_change(2.0), ("+2.00%".to_string(), Tone::Positive));
        assert_eq!(format_change(0.0), ("+0.00%".to_string(), Tone::Positive));
        assert_eq!(format_change(-0.0), ("+0.00%".to_string(), Tone::Positive));
    }

    #[test]
    fn test_tone_colors() {
        assert_eq!(Tone::Positive.hex(), Some("#16a34a"));
        assert_eq!(Tone::Negative.hex(), Some("#ef4444"));
        assert_eq!(Tone::Neutral.hex(), None);
    }

    #[test]
    fn test_format_axis_usd() {
        assert_eq!(format_axis_usd(67123.4), "$67,123");
        assert_eq!(format_axis_usd(0.52), "$0.52");
    }
}
