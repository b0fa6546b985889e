/// Formats a price the way Indonesian shops print it: `Rp 15.000`.
pub fn format_rupiah(value: f64) -> String {
    if !value.is_finite() {
        return "Rp -".to_string();
    }
    let rounded = value.round().abs() as u64;
    let digits = rounded.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if value.round() < 0.0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// Lowercases for case-insensitive matching.
pub fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

/// Cuts a string to `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rupiah_groups_thousands_without_decimals() {
        assert_eq!(format_rupiah(0.0), "Rp 0");
        assert_eq!(format_rupiah(950.0), "Rp 950");
        assert_eq!(format_rupiah(15000.0), "Rp 15.000");
        assert_eq!(format_rupiah(1234567.4), "Rp 1.234.567");
        assert_eq!(format_rupiah(18000.5), "Rp 18.001");
        assert_eq!(format_rupiah(-2500.0), "-Rp 2.500");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Kopi", 10), "Kopi");
        assert_eq!(truncate("Kerajinan Tangan", 6), "Keraj…");
        assert_eq!(truncate("éééé", 3), "éé…");
    }
}
