/// Trim whitespace + strip outer quotes if present.
pub fn parse_string(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a count cell. Empty means zero; thousands separators are ignored;
/// a non-negative decimal below `u64::MAX` is truncated. Anything else is `None`.
pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Some(0);
    }
    if let Ok(n) = cleaned.parse::<u64>() {
        return Some(n);
    }
    match cleaned.parse::<f64>() {
        // `u64::MAX as f64` rounds up to 2^64, so the bound is strict.
        Ok(f) if f.is_finite() && f >= 0.0 && f < u64::MAX as f64 => Some(f.trunc() as u64),
        _ => None,
    }
}

/// Strip the float artifact (`4013.0`) and left-pad to five digits.
pub fn normalize_fips(raw: &str) -> String {
    let trimmed = raw.trim();
    let code = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    format!("{:0>5}", code)
}
