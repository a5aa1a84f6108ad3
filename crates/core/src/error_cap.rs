//! Error capper — SPEC_FULL §4.N.

/// Cap `errors` at `max` entries, appending a truncation sentinel when needed.
///
/// `max == usize::MAX` is treated as "non-finite" (return as-is), mirroring
/// the spec's `non-finite` branch for a language without a native infinity
/// for integers.
pub fn cap_errors(errors: Vec<String>, max: usize) -> Vec<String> {
    if max == usize::MAX {
        return errors;
    }
    if max == 0 {
        return Vec::new();
    }
    if errors.len() <= max {
        return errors;
    }
    if max == 1 {
        return vec![format!("errors truncated: {} total", errors.len())];
    }

    let total = errors.len();
    let mut kept: Vec<String> = errors.into_iter().take(max - 1).collect();
    kept.push(format!("errors truncated: showing {} of {total}", max - 1));
    kept
}
