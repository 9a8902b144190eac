use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use vellum_core::{OrderPolicy, SortDirection};

/// Repository configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Sort setting of sibling lists (default: ascending)
    pub sort_direction: SortDirection,
    /// Containers whose documents get a new id when moved in
    pub path_id_containers: BTreeSet<String>,
    /// Header cache entries; 0 disables the cache (default: 1024)
    pub header_cache_capacity: usize,
    /// Language used when a caller passes none (default: "fr")
    pub default_language: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            sort_direction: SortDirection::Ascending,
            path_id_containers: BTreeSet::new(),
            header_cache_capacity: 1024,
            default_language: "fr".to_string(),
        }
    }
}

impl RepositoryConfig {
    /// Create config for testing (small cache).
    pub fn for_testing() -> Self {
        Self {
            header_cache_capacity: 16,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_sort_direction(mut self, direction: SortDirection) -> Self {
        self.sort_direction = direction;
        self
    }

    pub fn with_path_ids(mut self, container_id: impl Into<String>) -> Self {
        self.path_id_containers.insert(container_id.into());
        self
    }

    pub fn order_policy(&self) -> OrderPolicy {
        OrderPolicy::new(self.sort_direction)
    }

    pub fn uses_path_ids(&self, container_id: &str) -> bool {
        self.path_id_containers.contains(container_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RepositoryConfig::from_json(
            r#"{"sort_direction":"Descending","path_id_containers":["kmelia36"]}"#,
        )
        .unwrap();
        assert_eq!(config.sort_direction, SortDirection::Descending);
        assert!(config.uses_path_ids("kmelia36"));
        assert!(!config.uses_path_ids("kmelia73"));
        assert_eq!(config.header_cache_capacity, 1024);
        assert_eq!(config.default_language, "fr");
    }

    #[test]
    fn test_from_json_rejects_unknown_direction() {
        assert!(RepositoryConfig::from_json(r#"{"sort_direction":"Sideways"}"#).is_err());
    }

    #[test]
    fn test_for_testing() {
        let config = RepositoryConfig::for_testing().with_path_ids("kmelia36");
        assert_eq!(config.header_cache_capacity, 16);
        assert!(config.uses_path_ids("kmelia36"));
    }
}
