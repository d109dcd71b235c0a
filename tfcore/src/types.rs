//! Core type system for tfcore
//!
//! Dynamic values are the exchange format between the host runtime and a
//! provider: configuration, planned state and stored state all arrive as
//! loosely-typed trees that providers read through typed accessors.

use crate::error::{Result, TfcoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A Terraform value of any type.
///
/// Use the typed accessors on [`DynamicValue`] instead of matching on this
/// directly; they produce proper type-mismatch errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// Ordered list of values
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str("__unknown__"),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Dynamic, E> {
                if value == "__unknown__" {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut values = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    values.insert(key, value);
                }
                Ok(Dynamic::Map(values))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue wraps a [`Dynamic`] tree and provides typed access plus the
/// wire codecs the host runtime uses (msgpack by default, json for state
/// upgrades).
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    /// Convenience constructor for the common top-level object case.
    pub fn object(values: HashMap<String, Dynamic>) -> Self {
        Self {
            value: Dynamic::Map(values),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.value, Dynamic::Unknown)
    }

    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        match &self.value {
            Dynamic::Null => Ok(vec![]),
            value => rmp_serde::encode::to_vec(value)
                .map_err(|e| TfcoreError::EncodingError(format!("msgpack encoding failed: {}", e))),
        }
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }
        let value = rmp_serde::decode::from_slice(data)
            .map_err(|e| TfcoreError::DecodingError(format!("msgpack decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfcoreError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(data)
            .map_err(|e| TfcoreError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        match self.navigate(path)? {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(TfcoreError::TypeMismatch {
                expected: "string".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        match self.navigate(path)? {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(TfcoreError::TypeMismatch {
                expected: "bool".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        match self.navigate(path)? {
            Dynamic::Number(n) => Ok(*n),
            other => Err(TfcoreError::TypeMismatch {
                expected: "number".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        match self.navigate(path)? {
            Dynamic::List(l) => Ok(l.clone()),
            other => Err(TfcoreError::TypeMismatch {
                expected: "list".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    /// Typed accessor for lists of strings, the dominant list shape in
    /// resource schemas. Fails on the first non-string element.
    pub fn get_string_list(&self, path: &AttributePath) -> Result<Vec<String>> {
        self.get_list(path)?
            .into_iter()
            .map(|item| match item {
                Dynamic::String(s) => Ok(s),
                other => Err(TfcoreError::TypeMismatch {
                    expected: "string".to_string(),
                    actual: other.type_name().to_string(),
                }),
            })
            .collect()
    }

    pub fn get_map(&self, path: &AttributePath) -> Result<HashMap<String, Dynamic>> {
        match self.navigate(path)? {
            Dynamic::Map(m) => Ok(m.clone()),
            other => Err(TfcoreError::TypeMismatch {
                expected: "map".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set(path, Dynamic::String(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set(path, Dynamic::Bool(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set(path, Dynamic::Number(value))
    }

    pub fn set_list(&mut self, path: &AttributePath, value: Vec<Dynamic>) -> Result<()> {
        self.set(path, Dynamic::List(value))
    }

    pub fn set_string_list(&mut self, path: &AttributePath, value: Vec<String>) -> Result<()> {
        self.set(
            path,
            Dynamic::List(value.into_iter().map(Dynamic::String).collect()),
        )
    }

    fn navigate<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;
        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name)) => {
                    m.get(name).ok_or_else(|| {
                        TfcoreError::Custom(format!("attribute '{}' not found", name))
                    })?
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    l.get(*idx as usize).ok_or_else(|| {
                        TfcoreError::Custom(format!("list index {} out of bounds", idx))
                    })?
                }
                _ => {
                    return Err(TfcoreError::Custom(
                        "invalid path navigation".to_string(),
                    ))
                }
            };
        }
        Ok(current)
    }

    /// Set a value at a path, creating intermediate maps as needed. Setting
    /// through list indices requires the element to already exist.
    fn set(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        if path.steps.is_empty() {
            self.value = new_value;
            return Ok(());
        }

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        let last = path.steps.len() - 1;

        for (idx, step) in path.steps.iter().enumerate() {
            match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name)) => {
                    if idx == last {
                        m.insert(name.clone(), new_value);
                        return Ok(());
                    }
                    current = m
                        .entry(name.clone())
                        .or_insert_with(|| Dynamic::Map(HashMap::new()));
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(i)) => {
                    let i = *i as usize;
                    if i >= l.len() {
                        return Err(TfcoreError::Custom(format!(
                            "list index {} out of bounds",
                            i
                        )));
                    }
                    if idx == last {
                        l[i] = new_value;
                        return Ok(());
                    }
                    current = &mut l[i];
                }
                _ => {
                    return Err(TfcoreError::Custom(
                        "invalid path navigation".to_string(),
                    ))
                }
            }
        }

        Err(TfcoreError::Custom("failed to set value".to_string()))
    }
}

/// Path to an attribute within a [`DynamicValue`]
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an [`AttributePath`]
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    /// Access attribute by name in an object/map
    AttributeName(String),
    /// Access element by integer index (for lists)
    ElementKeyInt(i64),
}

/// Diagnostic represents a warning or error reported to the host runtime
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// True if any diagnostic in the slice is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| d.severity == DiagnosticSeverity::Error)
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_value_string_access() {
        let mut dv = DynamicValue::object(HashMap::new());
        dv.set_string(&AttributePath::new("name"), "test".to_string())
            .unwrap();

        assert_eq!(dv.get_string(&AttributePath::new("name")).unwrap(), "test");
    }

    #[test]
    fn dynamic_value_nested_access() {
        let mut dv = DynamicValue::object(HashMap::new());
        let path = AttributePath::new("provider").attribute("endpoint");
        dv.set_string(&path, "https://flags.example.com".to_string())
            .unwrap();

        assert_eq!(
            dv.get_string(&path).unwrap(),
            "https://flags.example.com"
        );
    }

    #[test]
    fn dynamic_value_string_list_round_trip() {
        let mut dv = DynamicValue::object(HashMap::new());
        dv.set_string_list(
            &AttributePath::new("environments"),
            vec!["dev".to_string(), "prod".to_string()],
        )
        .unwrap();

        let envs = dv
            .get_string_list(&AttributePath::new("environments"))
            .unwrap();
        assert_eq!(envs, vec!["dev", "prod"]);
    }

    #[test]
    fn string_list_accessor_rejects_mixed_elements() {
        let mut dv = DynamicValue::object(HashMap::new());
        dv.set_list(
            &AttributePath::new("tags"),
            vec![Dynamic::String("a".to_string()), Dynamic::Number(1.0)],
        )
        .unwrap();

        let result = dv.get_string_list(&AttributePath::new("tags"));
        assert!(matches!(result, Err(TfcoreError::TypeMismatch { .. })));
    }

    #[test]
    fn type_mismatch_reports_actual_type() {
        let mut dv = DynamicValue::object(HashMap::new());
        dv.set_bool(&AttributePath::new("enabled"), true).unwrap();

        let err = dv.get_string(&AttributePath::new("enabled")).unwrap_err();
        assert!(err.to_string().contains("expected string, got bool"));
    }

    #[test]
    fn msgpack_round_trip() {
        let mut dv = DynamicValue::object(HashMap::new());
        dv.set_string(&AttributePath::new("name"), "dark-mode".to_string())
            .unwrap();
        dv.set_bool(&AttributePath::new("enabled"), true).unwrap();

        let encoded = dv.encode_msgpack().unwrap();
        let decoded = DynamicValue::decode_msgpack(&encoded).unwrap();

        assert_eq!(
            decoded.get_string(&AttributePath::new("name")).unwrap(),
            "dark-mode"
        );
        assert!(decoded.get_bool(&AttributePath::new("enabled")).unwrap());
    }

    #[test]
    fn msgpack_empty_payload_is_null() {
        let decoded = DynamicValue::decode_msgpack(&[]).unwrap();
        assert!(decoded.is_null());
    }

    #[test]
    fn json_round_trip_preserves_lists() {
        let mut dv = DynamicValue::object(HashMap::new());
        dv.set_string_list(
            &AttributePath::new("tags"),
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();

        let encoded = dv.encode_json().unwrap();
        let decoded = DynamicValue::decode_json(&encoded).unwrap();
        assert_eq!(
            decoded.get_string_list(&AttributePath::new("tags")).unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn attribute_path_display() {
        let path = AttributePath::new("environments").index(2);
        assert_eq!(path.to_string(), "environments[2]");
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let diags = vec![Diagnostic::warning("w", "warning only")];
        assert!(!has_errors(&diags));

        let diags = vec![
            Diagnostic::warning("w", ""),
            Diagnostic::error("e", "broken"),
        ];
        assert!(has_errors(&diags));
    }
}
