//! Parameter storage.
//!
//! `ParameterStore` holds every parameter of one node. Values may be
//! overwritten with a value of another type; reads, however, are strictly
//! typed and never coerce.

use std::collections::HashMap;

use super::error::{ParameterError, Result};
use super::value::{
    ListParametersResult, Parameter, ParameterDescriptor, ParameterKind, ParameterType,
    ParameterValue, SetParametersResult, extract, extract_or,
};

/// `depth` value of a list request asking for every level.
pub const DEPTH_RECURSIVE: u64 = 0;

const SEPARATOR: char = '.';

#[derive(Debug, Clone)]
struct ParameterEntry {
    value: ParameterValue,
    descriptor: ParameterDescriptor,
}

/// What committing a parameter did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterChange {
    New,
    Changed,
    Deleted,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct ParameterStore {
    parameters: HashMap<String, ParameterEntry>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `overrides`, typically loaded from a
    /// parameter file.
    pub fn with_overrides(overrides: HashMap<String, ParameterValue>) -> Self {
        let mut store = Self::new();
        for (name, value) in overrides {
            store.commit(&Parameter { name, value });
        }
        store
    }

    /// Declare a parameter with a default value and descriptor.
    ///
    /// An existing value (an override, or an earlier set) wins over
    /// `default` as long as its type matches. Returns the effective value.
    pub fn declare(
        &mut self,
        name: &str,
        default: ParameterValue,
        mut descriptor: ParameterDescriptor,
    ) -> Result<ParameterValue> {
        if descriptor.type_ == ParameterType::NotSet {
            descriptor.type_ = default.parameter_type();
        }
        descriptor.name = name.to_string();

        if let Some(entry) = self.parameters.get_mut(name) {
            let actual = entry.value.parameter_type();
            if actual != descriptor.type_ {
                return Err(ParameterError::TypeMismatch {
                    name: name.to_string(),
                    requested: descriptor.type_,
                    actual,
                });
            }
            entry.descriptor = descriptor;
            return Ok(entry.value.clone());
        }

        if default.is_set() {
            self.parameters.insert(
                name.to_string(),
                ParameterEntry {
                    value: default.clone(),
                    descriptor,
                },
            );
        }
        Ok(default)
    }

    /// Check whether `param` may be committed.
    pub fn validate(&self, param: &Parameter) -> std::result::Result<(), String> {
        if param.name.is_empty() {
            return Err("parameter name must not be empty".to_string());
        }
        match self.parameters.get(&param.name) {
            Some(entry) if entry.descriptor.read_only => {
                Err(format!("parameter '{}' is read-only", param.name))
            }
            _ => Ok(()),
        }
    }

    /// Commit `param` without validation. A `NotSet` value deletes the entry.
    pub fn commit(&mut self, param: &Parameter) -> ParameterChange {
        if !param.value.is_set() {
            return match self.parameters.remove(&param.name) {
                Some(_) => ParameterChange::Deleted,
                None => ParameterChange::Unchanged,
            };
        }
        match self.parameters.get_mut(&param.name) {
            Some(entry) => {
                if entry.value == param.value {
                    return ParameterChange::Unchanged;
                }
                entry.value = param.value.clone();
                entry.descriptor.type_ = param.value.parameter_type();
                ParameterChange::Changed
            }
            None => {
                let descriptor =
                    ParameterDescriptor::new(param.name.clone(), param.value.parameter_type());
                self.parameters.insert(
                    param.name.clone(),
                    ParameterEntry {
                        value: param.value.clone(),
                        descriptor,
                    },
                );
                ParameterChange::New
            }
        }
    }

    /// Insert or overwrite a parameter.
    pub fn set(&mut self, param: &Parameter) -> SetParametersResult {
        match self.validate(param) {
            Ok(()) => {
                self.commit(param);
                SetParametersResult::success()
            }
            Err(reason) => SetParametersResult::failure(reason),
        }
    }

    pub fn get(&self, name: &str) -> Result<Parameter> {
        self.parameters
            .get(name)
            .map(|entry| Parameter {
                name: name.to_string(),
                value: entry.value.clone(),
            })
            .ok_or_else(|| ParameterError::NotFound(name.to_string()))
    }

    /// Stored value, `NotSet` when absent.
    pub fn value(&self, name: &str) -> ParameterValue {
        self.parameters
            .get(name)
            .map(|entry| entry.value.clone())
            .unwrap_or_default()
    }

    pub fn get_as<T: ParameterKind>(&self, name: &str) -> Result<T> {
        extract(name, self.value(name))
    }

    pub fn get_or<T: ParameterKind>(&self, name: &str, default: T) -> Result<T> {
        extract_or(name, self.value(name), default)
    }

    pub fn has(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get_many(&self, names: &[String]) -> Vec<ParameterValue> {
        names.iter().map(|name| self.value(name)).collect()
    }

    pub fn get_types(&self, names: &[String]) -> Vec<ParameterType> {
        names
            .iter()
            .map(|name| self.value(name).parameter_type())
            .collect()
    }

    /// Descriptors in request order; absent names get a `NotSet` descriptor.
    pub fn describe(&self, names: &[String]) -> Vec<ParameterDescriptor> {
        names
            .iter()
            .map(|name| {
                self.parameters
                    .get(name)
                    .map(|entry| entry.descriptor.clone())
                    .unwrap_or_else(|| ParameterDescriptor::new(name.clone(), ParameterType::NotSet))
            })
            .collect()
    }

    /// Names below `prefixes` (all names when empty), at most `depth` levels
    /// below the prefix unless `depth` is [`DEPTH_RECURSIVE`].
    pub fn list(&self, prefixes: &[String], depth: u64) -> ListParametersResult {
        let within_depth =
            |s: &str| depth == DEPTH_RECURSIVE || (s.matches(SEPARATOR).count() as u64) < depth;

        let mut result = ListParametersResult::default();
        let mut names: Vec<&String> = self.parameters.keys().collect();
        names.sort();

        for name in names {
            let get_all = prefixes.is_empty() && within_depth(name.as_str());
            let prefix_matches = prefixes.iter().any(|prefix| {
                if name == prefix {
                    return true;
                }
                name.strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix(SEPARATOR))
                    .is_some_and(within_depth)
            });
            if !(get_all || prefix_matches) {
                continue;
            }
            result.names.push(name.clone());
            if let Some((prefix, _)) = name.rsplit_once(SEPARATOR) {
                if !result.prefixes.iter().any(|p| p == prefix) {
                    result.prefixes.push(prefix.to_string());
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn sample_store() -> ParameterStore {
        let mut store = ParameterStore::new();
        for param in [
            Parameter::new("foo", 2),
            Parameter::new("bar", "hello"),
            Parameter::new("baz", 1.45),
            Parameter::new("foobar", true),
            Parameter::new("barfoo", vec![0u8, 1, 2]),
        ] {
            assert!(store.set(&param).successful);
        }
        store
    }

    #[test]
    fn set_then_get_returns_exact_values() {
        let store = sample_store();
        assert_eq!(store.get_as::<i64>("foo").unwrap(), 2);
        assert_eq!(store.get_as::<String>("bar").unwrap(), "hello");
        assert_eq!(store.get_as::<f64>("baz").unwrap(), 1.45);
        assert!(store.get_as::<bool>("foobar").unwrap());
        assert_eq!(store.get_as::<Vec<u8>>("barfoo").unwrap(), vec![0, 1, 2]);
        assert_eq!(store.get("foo").unwrap(), Parameter::new("foo", 2));
    }

    #[test]
    fn missing_names_report_not_found_or_default() {
        let store = sample_store();
        assert!(!store.has("not_there"));
        assert!(store.get("not_there").unwrap_err().is_not_found());
        assert!(store.get_as::<i64>("not_there").unwrap_err().is_not_found());
        assert_eq!(store.get_or("not_there", 42i64).unwrap(), 42);
        assert_eq!(
            store.get_or("not_there", vec![3u8, 4, 5]).unwrap(),
            vec![3, 4, 5]
        );
    }

    #[test]
    fn default_never_masks_a_type_error() {
        let store = sample_store();
        assert!(store.get_as::<f64>("foo").unwrap_err().is_type_mismatch());
        assert!(store.get_or("foo", -4.2).unwrap_err().is_type_mismatch());
        assert!(store.get_or("barfoo", "x".to_string()).unwrap_err().is_type_mismatch());
        assert_eq!(store.get_or("foo", 42i64).unwrap(), 2);
    }

    #[test]
    fn overwrite_may_change_the_type() {
        let mut store = sample_store();
        assert_eq!(store.commit(&Parameter::new("foo", "now a string")), ParameterChange::Changed);
        assert_eq!(store.get_as::<String>("foo").unwrap(), "now a string");
        assert!(store.get_as::<i64>("foo").unwrap_err().is_type_mismatch());
        assert_eq!(store.get_types(&names(&["foo"])), vec![ParameterType::String]);
    }

    #[test]
    fn commit_reports_changes() {
        let mut store = ParameterStore::new();
        assert_eq!(store.commit(&Parameter::new("a", 1)), ParameterChange::New);
        assert_eq!(store.commit(&Parameter::new("a", 1)), ParameterChange::Unchanged);
        assert_eq!(store.commit(&Parameter::new("a", 2)), ParameterChange::Changed);
        assert_eq!(store.commit(&Parameter::unset("a")), ParameterChange::Deleted);
        assert_eq!(store.commit(&Parameter::unset("a")), ParameterChange::Unchanged);
        assert!(store.is_empty());
    }

    #[test]
    fn read_only_and_empty_names_are_rejected() {
        let mut store = ParameterStore::new();
        store
            .declare(
                "fixed",
                ParameterValue::String("immutable".into()),
                ParameterDescriptor::default().read_only(),
            )
            .unwrap();
        let result = store.set(&Parameter::new("fixed", "changed"));
        assert!(!result.successful);
        assert!(result.reason.contains("read-only"));
        assert_eq!(store.get_as::<String>("fixed").unwrap(), "immutable");
        assert!(!store.set(&Parameter::new("", 1)).successful);
    }

    #[test]
    fn declare_prefers_overrides_of_matching_type() {
        let mut overrides = HashMap::new();
        overrides.insert("count".to_string(), ParameterValue::Integer(99));
        overrides.insert("label".to_string(), ParameterValue::Bool(true));
        let mut store = ParameterStore::with_overrides(overrides);

        let count = store
            .declare("count", ParameterValue::Integer(1), ParameterDescriptor::default())
            .unwrap();
        assert_eq!(count, ParameterValue::Integer(99));

        let fresh = store
            .declare("fresh", ParameterValue::Double(0.5), ParameterDescriptor::default())
            .unwrap();
        assert_eq!(fresh, ParameterValue::Double(0.5));
        assert_eq!(store.describe(&names(&["fresh"]))[0].type_, ParameterType::Double);

        let err = store
            .declare("label", ParameterValue::String("x".into()), ParameterDescriptor::default())
            .unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn bulk_reads_keep_request_order() {
        let store = sample_store();
        let req = names(&["baz", "missing", "foo"]);
        assert_eq!(
            store.get_many(&req),
            vec![
                ParameterValue::Double(1.45),
                ParameterValue::NotSet,
                ParameterValue::Integer(2)
            ]
        );
        assert_eq!(
            store.get_types(&req),
            vec![ParameterType::Double, ParameterType::NotSet, ParameterType::Integer]
        );
        let described = store.describe(&req);
        assert_eq!(described[1].name, "missing");
        assert_eq!(described[1].type_, ParameterType::NotSet);
    }

    #[test]
    fn list_honours_prefixes_and_depth() {
        let mut store = ParameterStore::new();
        for name in ["a", "motor.gain", "motor.limits.max", "motor.limits.min", "sensor.rate"] {
            store.set(&Parameter::new(name, 1));
        }

        let all = store.list(&[], DEPTH_RECURSIVE);
        assert_eq!(all.names.len(), 5);
        assert_eq!(all.prefixes, names(&["motor", "motor.limits", "sensor"]));

        let top = store.list(&[], 1);
        assert_eq!(top.names, names(&["a"]));

        let motor = store.list(&names(&["motor"]), 1);
        assert_eq!(motor.names, names(&["motor.gain"]));

        let motor_deep = store.list(&names(&["motor"]), DEPTH_RECURSIVE);
        assert_eq!(
            motor_deep.names,
            names(&["motor.gain", "motor.limits.max", "motor.limits.min"])
        );

        let exact = store.list(&names(&["sensor.rate"]), 1);
        assert_eq!(exact.names, names(&["sensor.rate"]));

        assert!(store.list(&names(&["mot"]), DEPTH_RECURSIVE).names.is_empty());
    }
}
