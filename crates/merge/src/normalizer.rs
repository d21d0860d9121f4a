/// Canonical identity key for entity names and relationship endpoints:
/// lowercase, trimmed, internal whitespace runs collapsed into a single `_`.
///
/// Relationship types are only trimmed when stored; they go through this
/// function solely to build grouping keys.
pub fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(normalize("Patient"), "patient");
        assert_eq!(normalize("patient "), "patient");
        assert_eq!(normalize("  Blood Pressure  "), "blood_pressure");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(normalize("Heart \t  Rate\nMonitor"), "heart_rate_monitor");
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("  Medical  Device ");
        assert_eq!(normalize(&once), once);
    }
}
