/// Canonical cache key for an address: trimmed, inner whitespace collapsed
/// to single spaces, and case-folded.
///
/// Two spellings that differ only in case or spacing share one cache entry
/// and one in-flight lookup.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_case_folds() {
        assert_eq!(
            normalize_address("  Bahnhofstr 1, BERLIN "),
            "bahnhofstr 1, berlin"
        );
    }

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(
            normalize_address("Bahnhofstr\t 1,\n  Berlin"),
            "bahnhofstr 1, berlin"
        );
    }

    #[test]
    fn blank_input_normalizes_to_empty() {
        assert_eq!(normalize_address(" \t\n"), "");
    }

    #[test]
    fn folds_non_ascii_case() {
        assert_eq!(normalize_address("MÜNCHEN"), "münchen");
    }
}
