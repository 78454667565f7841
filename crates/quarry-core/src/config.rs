//! Session configuration: a string-keyed map of JSON-typed values with
//! per-repository overrides.
//!
//! A lookup for key `k` in the context of repository `r` first tries `k.r`,
//! then plain `k`. Typed accessors return `None` both for missing keys and
//! for values of the wrong shape.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    values: HashMap<String, Value>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set an override of `key` that only applies to repository `repo_id`.
    pub fn set_for_repository(
        &mut self,
        key: &str,
        repo_id: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.values.insert(format!("{key}.{repo_id}"), value.into());
        self
    }

    pub fn get(&self, key: &str, repo_id: Option<&str>) -> Option<&Value> {
        if let Some(repo) = repo_id {
            if let Some(value) = self.values.get(&format!("{key}.{repo}")) {
                return Some(value);
            }
        }
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str, repo_id: Option<&str>) -> Option<&str> {
        self.get(key, repo_id)?.as_str()
    }

    pub fn get_u64(&self, key: &str, repo_id: Option<&str>) -> Option<u64> {
        self.get(key, repo_id)?.as_u64()
    }

    pub fn get_bool(&self, key: &str, repo_id: Option<&str>) -> Option<bool> {
        self.get(key, repo_id)?.as_bool()
    }

    /// An object-valued entry, e.g. a header map. Non-object values yield
    /// `None`.
    pub fn get_object(
        &self,
        key: &str,
        repo_id: Option<&str>,
    ) -> Option<&serde_json::Map<String, Value>> {
        self.get(key, repo_id)?.as_object()
    }

    /// A list of strings; scalar strings are promoted to a one-element list.
    pub fn get_str_list(&self, key: &str, repo_id: Option<&str>) -> Option<Vec<String>> {
        match self.get(key, repo_id)? {
            Value::String(s) => Some(vec![s.clone()]),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_lookup() {
        let mut config = ConfigMap::new();
        config.set("connect-timeout", 5000u64);
        assert_eq!(config.get_u64("connect-timeout", None), Some(5000));
        assert_eq!(config.get_u64("request-timeout", None), None);
    }

    #[test]
    fn repository_override_wins() {
        let mut config = ConfigMap::new();
        config.set("request-timeout", 10_000u64);
        config.set_for_repository("request-timeout", "snapshots", 60_000u64);
        assert_eq!(config.get_u64("request-timeout", Some("snapshots")), Some(60_000));
        assert_eq!(config.get_u64("request-timeout", Some("releases")), Some(10_000));
        assert_eq!(config.get_u64("request-timeout", None), Some(10_000));
    }

    #[test]
    fn wrong_type_reads_as_missing() {
        let mut config = ConfigMap::new();
        config.set("user-agent", 42u64);
        assert_eq!(config.get_str("user-agent", None), None);
    }

    #[test]
    fn header_map_values() {
        let mut config = ConfigMap::new();
        config.set("http-headers", json!({"X-Custom": "yes", "X-Dropped": null}));
        let headers = config.get_object("http-headers", None).unwrap();
        assert_eq!(headers.get("X-Custom").and_then(|v| v.as_str()), Some("yes"));
        assert!(headers.get("X-Dropped").unwrap().is_null());
    }

    #[test]
    fn string_list_promotion() {
        let mut config = ConfigMap::new();
        config.set("https.protocols", "TLSv1.3");
        assert_eq!(
            config.get_str_list("https.protocols", None),
            Some(vec!["TLSv1.3".to_string()])
        );
        config.set("https.protocols", json!(["TLSv1.2", "TLSv1.3"]));
        assert_eq!(
            config.get_str_list("https.protocols", None).unwrap().len(),
            2
        );
    }
}
