use std::path::PathBuf;

/// Default base URL of the mask store.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_USER_ID: &str = "guest";
pub const DEFAULT_PROJECT: &str = "untitled";

/// Editor configuration loaded from environment variables.
///
/// Every field has a default suitable for a local store.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Base URL of the store API, without a trailing slash.
    pub api_url: String,
    /// Sent as the `user-id` header and in every object patch.
    pub user_id: String,
    /// Project used for mask lookups, listing and finalization.
    pub project_name: String,
    /// Directory that downloaded artifacts and exports are written to.
    pub download_dir: PathBuf,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default                     |
    /// |---------------------|-----------------------------|
    /// | `MASK_API_URL`      | `http://localhost:8000/api` |
    /// | `MASK_USER_ID`      | `guest`                     |
    /// | `MASK_PROJECT`      | `untitled`                  |
    /// | `MASK_DOWNLOAD_DIR` | `.`                         |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source. Empty
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            api_url: var("MASK_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            user_id: var("MASK_USER_ID", DEFAULT_USER_ID),
            project_name: var("MASK_PROJECT", DEFAULT_PROJECT),
            download_dir: PathBuf::from(var("MASK_DOWNLOAD_DIR", ".")),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = SyncConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.user_id, "guest");
        assert_eq!(config.project_name, "untitled");
        assert_eq!(config.download_dir, PathBuf::from("."));
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MASK_API_URL", "http://store:9000/api/"),
            ("MASK_USER_ID", "observer1"),
            ("MASK_PROJECT", "  "),
            ("MASK_DOWNLOAD_DIR", "/tmp/masks"),
        ]);
        let config = SyncConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_url, "http://store:9000/api");
        assert_eq!(config.user_id, "observer1");
        assert_eq!(config.project_name, "untitled");
        assert_eq!(config.download_dir, PathBuf::from("/tmp/masks"));
    }
}
