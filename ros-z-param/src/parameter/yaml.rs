//! Parameter files in the ROS 2 YAML layout.
//!
//! ```yaml
//! /**:
//!   ros__parameters:
//!     use_sim_time: false
//!
//! /robot/driver:
//!   ros__parameters:
//!     port: /dev/ttyUSB0
//!     motor:
//!       gain: 0.5
//!       limits: [-1.0, 1.0]
//! ```
//!
//! Nested mappings flatten into dotted names (`motor.gain`). Sections for a
//! specific node take precedence over wildcard sections, whatever their order
//! in the file.

use std::collections::HashMap;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::error::ParameterFileError;
use super::value::ParameterValue;

const PARAMETERS_KEY: &str = "ros__parameters";

type Overrides = HashMap<String, ParameterValue>;

pub fn load_parameter_file(
    path: impl AsRef<Path>,
    node_fqn: &str,
) -> Result<Overrides, ParameterFileError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ParameterFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_parameter_string(&content, node_fqn)
}

/// Parameters of `yaml` that apply to the node named `node_fqn`.
pub fn load_parameter_string(yaml: &str, node_fqn: &str) -> Result<Overrides, ParameterFileError> {
    let doc: Value = serde_yaml::from_str(yaml)?;
    let sections = match doc {
        Value::Mapping(sections) => sections,
        Value::Null => return Ok(Overrides::new()),
        _ => {
            return Err(ParameterFileError::Format(
                "top level must map node names to sections".to_string(),
            ));
        }
    };

    let mut matching: Vec<(Specificity, &str, &Value)> = Vec::new();
    for (selector, section) in &sections {
        let selector = selector.as_str().ok_or_else(|| {
            ParameterFileError::Format(format!("node selector {:?} is not a string", selector))
        })?;
        if let Some(specificity) = match_selector(selector, node_fqn) {
            matching.push((specificity, selector, section));
        }
    }
    matching.sort_by_key(|(specificity, _, _)| *specificity);

    let mut overrides = Overrides::new();
    for (_, selector, section) in matching {
        let Some(params) = section.get(PARAMETERS_KEY) else {
            continue;
        };
        let Value::Mapping(params) = params else {
            return Err(ParameterFileError::Format(format!(
                "'{selector}/{PARAMETERS_KEY}' must be a mapping"
            )));
        };
        debug!("[PARAMS] Applying section '{}' to {}", selector, node_fqn);
        flatten("", params, &mut overrides)?;
    }
    Ok(overrides)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Specificity {
    Wildcard,
    Namespace,
    Exact,
}

fn match_selector(selector: &str, node_fqn: &str) -> Option<Specificity> {
    let selector = if selector.starts_with('/') {
        selector.to_string()
    } else {
        format!("/{selector}")
    };
    if selector == "/**" {
        return Some(Specificity::Wildcard);
    }
    if let Some(namespace) = selector.strip_suffix("/**") {
        let below = node_fqn
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('/'));
        return below.then_some(Specificity::Namespace);
    }
    if let Some(namespace) = selector.strip_suffix("/*") {
        let direct_child = node_fqn
            .strip_prefix(namespace)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.is_empty() && !name.contains('/'));
        return direct_child.then_some(Specificity::Namespace);
    }
    (selector == node_fqn).then_some(Specificity::Exact)
}

fn flatten(prefix: &str, params: &Mapping, out: &mut Overrides) -> Result<(), ParameterFileError> {
    for (key, value) in params {
        let key = match key {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(ParameterFileError::Format(format!(
                    "parameter name {:?} is not a scalar",
                    other
                )));
            }
        };
        let name = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Mapping(nested) => flatten(&name, nested, out)?,
            Value::Null => {}
            value => {
                out.insert(name.clone(), to_parameter_value(&name, value)?);
            }
        }
    }
    Ok(())
}

fn to_parameter_value(name: &str, value: &Value) -> Result<ParameterValue, ParameterFileError> {
    let unsupported = || {
        ParameterFileError::Format(format!("parameter '{name}' has an unsupported value"))
    };
    Ok(match value {
        Value::Bool(b) => ParameterValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ParameterValue::Integer(i),
            None => ParameterValue::Double(n.as_f64().ok_or_else(unsupported)?),
        },
        Value::String(s) => ParameterValue::String(s.clone()),
        Value::Sequence(items) => to_array(name, items)?,
        Value::Tagged(tagged) => to_parameter_value(name, &tagged.value)?,
        Value::Null | Value::Mapping(_) => return Err(unsupported()),
    })
}

/// Arrays must be homogeneous. Integers mixed with floats widen to doubles.
fn to_array(name: &str, items: &[Value]) -> Result<ParameterValue, ParameterFileError> {
    let mixed = || {
        ParameterFileError::Format(format!("array parameter '{name}' mixes element types"))
    };
    let Some(first) = items.first() else {
        return Ok(ParameterValue::StringArray(Vec::new()));
    };
    match first {
        Value::Bool(_) => items
            .iter()
            .map(Value::as_bool)
            .collect::<Option<Vec<_>>>()
            .map(ParameterValue::BoolArray)
            .ok_or_else(mixed),
        Value::String(_) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(ParameterValue::StringArray)
            .ok_or_else(mixed),
        Value::Number(_) => {
            if let Some(ints) = items.iter().map(Value::as_i64).collect::<Option<Vec<_>>>() {
                Ok(ParameterValue::IntegerArray(ints))
            } else {
                items
                    .iter()
                    .map(Value::as_f64)
                    .collect::<Option<Vec<_>>>()
                    .map(ParameterValue::DoubleArray)
                    .ok_or_else(mixed)
            }
        }
        _ => Err(mixed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r#"
/robot/driver:
  ros__parameters:
    port: /dev/ttyUSB0
    rate: 50
    motor:
      gain: 0.5
      limits: [-1.0, 1]
/**:
  ros__parameters:
    rate: 10
    use_sim_time: false
    frames: [base, odom]
/robot/*:
  ros__parameters:
    robot_name: r2
/other:
  ros__parameters:
    ignored: true
"#;

    #[test]
    fn exact_sections_win_over_wildcards() {
        let params = load_parameter_string(FILE, "/robot/driver").unwrap();
        assert_eq!(params["rate"], ParameterValue::Integer(50));
        assert_eq!(params["use_sim_time"], ParameterValue::Bool(false));
        assert_eq!(params["robot_name"], ParameterValue::String("r2".into()));
        assert_eq!(params["port"], ParameterValue::String("/dev/ttyUSB0".into()));
        assert!(!params.contains_key("ignored"));
    }

    #[test]
    fn nested_mappings_become_dotted_names() {
        let params = load_parameter_string(FILE, "/robot/driver").unwrap();
        assert_eq!(params["motor.gain"], ParameterValue::Double(0.5));
        assert_eq!(
            params["motor.limits"],
            ParameterValue::DoubleArray(vec![-1.0, 1.0])
        );
        assert_eq!(
            params["frames"],
            ParameterValue::StringArray(vec!["base".into(), "odom".into()])
        );
    }

    #[test]
    fn selectors_scope_to_namespaces() {
        let params = load_parameter_string(FILE, "/other").unwrap();
        assert_eq!(params["ignored"], ParameterValue::Bool(true));
        assert_eq!(params["rate"], ParameterValue::Integer(10));
        assert!(!params.contains_key("robot_name"));

        assert_eq!(match_selector("/robot/**", "/robot/arm/joint"), Some(Specificity::Namespace));
        assert_eq!(match_selector("/robot/*", "/robot/arm/joint"), None);
        assert_eq!(match_selector("talker", "/talker"), Some(Specificity::Exact));
    }

    #[test]
    fn malformed_files_are_rejected() {
        assert!(matches!(
            load_parameter_string("- a\n- b\n", "/n"),
            Err(ParameterFileError::Format(_))
        ));
        assert!(matches!(
            load_parameter_string("/n:\n  ros__parameters:\n    v: [1, a]\n", "/n"),
            Err(ParameterFileError::Format(_))
        ));
        assert!(matches!(
            load_parameter_string("/n: [unclosed", "/n"),
            Err(ParameterFileError::Yaml(_))
        ));
        assert!(load_parameter_string("", "/n").unwrap().is_empty());
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = load_parameter_file("/nonexistent/params.yaml", "/n").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/params.yaml"));
    }
}
