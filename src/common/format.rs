/// Insert `,` between groups of three integer digits.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 { out.push(',') }
        out.push(c);
    }
    out
}

/// Human-readable number: thousands separators, at most `decimals` places,
/// trailing zeros dropped.
pub fn format_number(value: f64, decimals: usize) -> String {
    if !value.is_finite() { return value.to_string() }

    let text = format!("{:.*}", decimals, value.abs());
    let (int, frac) = text.split_once('.').unwrap_or((&text, ""));
    let frac = frac.trim_end_matches('0');

    let mut out = String::new();
    if value < 0.0 && text.bytes().any(|b| b.is_ascii_digit() && b != b'0') { out.push('-') }
    out.push_str(&group_thousands(int));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `format_number` for optional values, `n/a` when missing.
pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format_number(v, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_and_trims() {
        assert_eq!(format_number(1234567.0, 2), "1,234,567");
        assert_eq!(format_number(999.5, 2), "999.5");
        assert_eq!(format_number(-1234.567, 2), "-1,234.57");
        assert_eq!(format_number(-0.001, 2), "0");
        assert_eq!(format_optional(None, 2), "n/a");
    }
}
