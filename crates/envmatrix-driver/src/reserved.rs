//! Platform-managed runtime keys
//!
//! These are injected by the platform at build or run time. They are hidden
//! from loaded snapshots and never written back.

use std::collections::BTreeMap;

/// Exact reserved names
pub const RESERVED_RUNTIME_KEYS: [&str; 6] = [
    "NX_DAEMON",
    "TURBO_CACHE",
    "TURBO_DOWNLOAD_LOCAL_ENABLED",
    "TURBO_REMOTE_ONLY",
    "TURBO_RUN_SUMMARY",
    "VERCEL",
];

/// Reserved name prefixes
pub const RESERVED_RUNTIME_KEY_PREFIXES: [&str; 1] = ["VERCEL_"];

#[must_use]
pub fn is_reserved_runtime_key(key: &str) -> bool {
    RESERVED_RUNTIME_KEYS.contains(&key)
        || RESERVED_RUNTIME_KEY_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
}

/// Split pulled values into editable ones and the sorted reserved key names
#[must_use]
pub fn filter_reserved_keys(
    values: BTreeMap<String, String>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let mut reserved = Vec::new();
    let editable = values
        .into_iter()
        .filter(|(key, _)| {
            if is_reserved_runtime_key(key) {
                reserved.push(key.clone());
                false
            } else {
                true
            }
        })
        .collect();
    (editable, reserved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_prefixed_names() {
        assert!(is_reserved_runtime_key("VERCEL"));
        assert!(is_reserved_runtime_key("VERCEL_OIDC_TOKEN"));
        assert!(is_reserved_runtime_key("TURBO_CACHE"));
        assert!(!is_reserved_runtime_key("TURBO_TOKEN"));
        assert!(!is_reserved_runtime_key("MY_VERCEL_KEY"));
    }

    #[test]
    fn filter_splits_values() {
        let values = BTreeMap::from([
            ("API_URL".to_string(), "https://x".to_string()),
            ("VERCEL_ENV".to_string(), "production".to_string()),
            ("NX_DAEMON".to_string(), "false".to_string()),
        ]);
        let (editable, reserved) = filter_reserved_keys(values);
        assert_eq!(editable.keys().collect::<Vec<_>>(), vec!["API_URL"]);
        assert_eq!(reserved, vec!["NX_DAEMON", "VERCEL_ENV"]);
    }
}
