//! Stub registry: registration-ordered storage and lookup.
//!
//! The registry is shared, process-lifetime state: one instance per test
//! run, constructed explicitly and passed by reference to the responder
//! and to test setup/teardown code.

use crate::config::Stub;
use serde_json::{Map, Value};
use std::sync::RwLock;
use tracing::debug;

/// Effective request parameters as a string-keyed JSON map.
pub type ParamMap = Map<String, Value>;

/// Registration-ordered collection of active stubs.
///
/// All access goes through a read/write lock: `find` takes the read lock
/// and may run concurrently with other lookups, while `add` and `clear`
/// take the write lock, so an overlapping lookup observes either the old
/// or the new list in full. No operation performs I/O while holding the
/// lock.
#[derive(Debug, Default)]
pub struct StubRegistry {
    stubs: RwLock<Vec<Stub>>,
}

impl StubRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stub, normalizing its method to uppercase.
    ///
    /// Appends unconditionally: no dedup, no overwrite-by-url. Earlier
    /// registrations take precedence during lookup.
    pub fn add(&self, mut stub: Stub) {
        stub.method = stub.method.to_uppercase();
        let mut stubs = self.stubs.write().unwrap();
        stubs.push(stub);
        debug!(total = stubs.len(), "registered stub");
    }

    /// Bulk-register stubs, e.g. preloaded from a configuration file.
    pub fn extend(&self, stubs: impl IntoIterator<Item = Stub>) {
        for stub in stubs {
            self.add(stub);
        }
    }

    /// Remove all stubs. Idempotent; used between test cases.
    pub fn clear(&self) {
        self.stubs.write().unwrap().clear();
        debug!("cleared stub registry");
    }

    /// Number of registered stubs.
    pub fn len(&self) -> usize {
        self.stubs.read().unwrap().len()
    }

    /// Whether the registry holds no stubs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the first registered stub matching the request.
    ///
    /// A stub matches when its url equals `url`, its method equals
    /// `method` case-insensitively, and either it declares no parameter
    /// constraints or every declared key/value pair is present and equal
    /// in `params`. Extra request parameters never disqualify a stub.
    ///
    /// Values are compared in a canonical string form: a JSON string by
    /// its raw content, any other value by its compact JSON text, so a
    /// stub declaring `page: 1` matches a request carrying `page="1"`.
    pub fn find(&self, url: &str, method: &str, params: &ParamMap) -> Option<Stub> {
        let method = method.to_uppercase();
        let stubs = self.stubs.read().unwrap();
        stubs
            .iter()
            .find(|stub| stub_matches(stub, url, &method, params))
            .cloned()
    }
}

fn stub_matches(stub: &Stub, url: &str, method: &str, params: &ParamMap) -> bool {
    if stub.url != url || stub.method != method {
        return false;
    }
    stub.params.is_empty()
        || stub
            .params
            .iter()
            .all(|(key, want)| params.get(key).is_some_and(|got| param_eq(want, got)))
}

fn param_eq(want: &Value, got: &Value) -> bool {
    canonical(want) == canonical(got)
}

/// Canonical comparable form of a parameter value.
fn canonical(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn param_map(pairs: &[(&str, Value)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_find_exact_match() {
        let registry = StubRegistry::new();
        registry.add(Stub::new("/foo", "GET", json!({"foo": "bar"})));

        let found = registry.find("/foo", "GET", &ParamMap::new());
        assert_eq!(found.unwrap().response, json!({"foo": "bar"}));

        assert!(registry.find("/bar", "GET", &ParamMap::new()).is_none());
        assert!(registry.find("/foo", "POST", &ParamMap::new()).is_none());
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let registry = StubRegistry::new();
        registry.add(Stub::new("/foo", "get", json!(null)));

        assert!(registry.find("/foo", "GET", &ParamMap::new()).is_some());
        assert!(registry.find("/foo", "Get", &ParamMap::new()).is_some());
    }

    #[test]
    fn test_empty_params_accept_anything() {
        let registry = StubRegistry::new();
        registry.add(Stub::new("/foo", "GET", json!(42)));

        let params = param_map(&[("whatever", json!("value"))]);
        assert!(registry.find("/foo", "GET", &params).is_some());
    }

    #[test]
    fn test_declared_params_must_all_be_present() {
        let registry = StubRegistry::new();
        registry.add(
            Stub::new("/foo", "GET", json!(null))
                .with_param("a", "1")
                .with_param("b", "2"),
        );

        let full = param_map(&[("a", json!("1")), ("b", json!("2"))]);
        assert!(registry.find("/foo", "GET", &full).is_some());

        let partial = param_map(&[("a", json!("1"))]);
        assert!(registry.find("/foo", "GET", &partial).is_none());

        let wrong_value = param_map(&[("a", json!("1")), ("b", json!("3"))]);
        assert!(registry.find("/foo", "GET", &wrong_value).is_none());
    }

    #[test]
    fn test_extra_request_params_never_block() {
        let registry = StubRegistry::new();
        registry.add(Stub::new("/foo", "GET", json!(null)).with_param("a", "1"));

        let params = param_map(&[("a", json!("1")), ("extra", json!("ignored"))]);
        assert!(registry.find("/foo", "GET", &params).is_some());
    }

    #[test]
    fn test_registration_order_wins() {
        let registry = StubRegistry::new();
        registry.add(Stub::new("/foo", "GET", json!("first")));
        registry.add(Stub::new("/foo", "GET", json!("second")));

        let found = registry.find("/foo", "GET", &ParamMap::new());
        assert_eq!(found.unwrap().response, json!("first"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_numeric_stub_param_matches_string_request_param() {
        let registry = StubRegistry::new();
        registry.add(Stub::new("/foo", "GET", json!(null)).with_param("page", 1));

        let params = param_map(&[("page", json!("1"))]);
        assert!(registry.find("/foo", "GET", &params).is_some());

        let params = param_map(&[("page", json!("2"))]);
        assert!(registry.find("/foo", "GET", &params).is_none());
    }

    #[test]
    fn test_nested_param_values_compare_structurally() {
        let registry = StubRegistry::new();
        registry
            .add(Stub::new("/foo", "POST", json!(null)).with_param("filter", json!({"a": 1})));

        let params = param_map(&[("filter", json!({"a": 1}))]);
        assert!(registry.find("/foo", "POST", &params).is_some());

        let params = param_map(&[("filter", json!({"a": 2}))]);
        assert!(registry.find("/foo", "POST", &params).is_none());
    }

    #[test]
    fn test_clear_removes_everything() {
        let registry = StubRegistry::new();
        registry.add(Stub::new("/foo", "GET", json!(null)));
        registry.add(Stub::new("/bar", "GET", json!(null)));
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.find("/foo", "GET", &ParamMap::new()).is_none());

        // Idempotent.
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_extend_preserves_order() {
        let registry = StubRegistry::new();
        registry.extend(vec![
            Stub::new("/foo", "get", json!("first")),
            Stub::new("/foo", "get", json!("second")),
        ]);

        let found = registry.find("/foo", "GET", &ParamMap::new());
        assert_eq!(found.unwrap().response, json!("first"));
    }

    #[test]
    fn test_concurrent_find_and_add() {
        let registry = Arc::new(StubRegistry::new());
        let mut handles = Vec::new();

        for i in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for j in 0..50 {
                    registry.add(Stub::new(format!("/t{i}/{j}"), "GET", json!(j)));
                    registry.find("/t0/0", "GET", &ParamMap::new());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 200);
        assert!(registry.find("/t3/49", "GET", &ParamMap::new()).is_some());
    }
}
