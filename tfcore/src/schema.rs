//! Schema types and builders for tfcore
//!
//! Providers describe their resources through [`Schema`] values built with the
//! fluent builders here. [`validate_config`] checks a configuration tree
//! against a schema before any state-changing operation runs: required
//! attributes must be present, every present attribute must match its declared
//! type, and per-attribute validators are applied. Validation never has side
//! effects.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>), // Ordered, allows duplicates
    Set(Box<AttributeType>),  // Unordered, no duplicates
    Map(Box<AttributeType>),  // String keys only
}

impl AttributeType {
    fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Number => "number",
            AttributeType::Bool => "bool",
            AttributeType::List(_) => "list",
            AttributeType::Set(_) => "set",
            AttributeType::Map(_) => "map",
        }
    }
}

/// Schema describes a resource, data source or provider configuration block.
/// Version is used for state migration.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Attribute represents a single configuration attribute
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing this attribute forces the host to plan delete-then-create.
    pub requires_replace: bool,
    pub validators: Vec<Box<dyn Validator>>,
}

// Manual Debug implementation since validators don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("requires_replace", &self.requires_replace)
            .field("validators", &format!("{} validators", self.validators.len()))
            .finish()
    }
}

// Manual Clone implementation; validator boxes are not cloneable
impl Clone for Attribute {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            r#type: self.r#type.clone(),
            description: self.description.clone(),
            required: self.required,
            optional: self.optional,
            computed: self.computed,
            sensitive: self.sensitive,
            requires_replace: self.requires_replace,
            validators: vec![],
        }
    }
}

/// Validator performs validation on attribute values during planning
pub trait Validator: Send + Sync {
    /// Human-readable description of the constraint
    fn description(&self) -> String;
    /// Perform validation, appending diagnostics on failure
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

/// Enforces minimum/maximum length on string attributes
pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length within [{:?}, {:?}]", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Dynamic::String(s) = value {
            if let Some(min) = self.min {
                if s.chars().count() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have minimum length {}", path, min),
                            format!("Got length {}", s.chars().count()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if s.chars().count() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have maximum length {}", path, max),
                            format!("Got length {}", s.chars().count()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

/// Enforces minimum/maximum item counts on list and set attributes
pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!("list length within [{:?}, {:?}]", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Dynamic::List(items) = value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at least {} items", path, min),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at most {} items", path, max),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

/// Validate a configuration tree against a schema.
///
/// Returns one diagnostic per violation; an empty vec means the configuration
/// is acceptable. Unknown values (not yet resolved during planning) pass type
/// checks and skip validators.
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let values = match &config.value {
        Dynamic::Map(m) => m,
        Dynamic::Null => {
            for attr in schema.attributes.iter().filter(|a| a.required) {
                diagnostics.push(missing_required(&attr.name));
            }
            return diagnostics;
        }
        other => {
            diagnostics.push(Diagnostic::error(
                "Invalid configuration",
                format!("Expected an object, got {}", other.type_name()),
            ));
            return diagnostics;
        }
    };

    for attr in &schema.attributes {
        let path = AttributePath::new(&attr.name);
        match values.get(&attr.name) {
            None | Some(Dynamic::Null) => {
                if attr.required {
                    diagnostics.push(missing_required(&attr.name));
                }
            }
            Some(Dynamic::Unknown) => {}
            Some(value) => {
                if !check_type(value, &attr.r#type) {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Invalid type for '{}'", attr.name),
                            format!(
                                "Expected {}, got {}",
                                attr.r#type.name(),
                                value.type_name()
                            ),
                        )
                        .with_attribute(path.clone()),
                    );
                    continue;
                }
                for validator in &attr.validators {
                    validator.validate(value, &path, &mut diagnostics);
                }
            }
        }
    }

    diagnostics
}

fn missing_required(name: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Missing required attribute '{}'", name),
        format!("The '{}' attribute must be set", name),
    )
    .with_attribute(AttributePath::new(name))
}

fn check_type(value: &Dynamic, expected: &AttributeType) -> bool {
    match (value, expected) {
        (Dynamic::Unknown, _) => true,
        (Dynamic::String(_), AttributeType::String) => true,
        (Dynamic::Number(_), AttributeType::Number) => true,
        (Dynamic::Bool(_), AttributeType::Bool) => true,
        (Dynamic::List(items), AttributeType::List(elem))
        | (Dynamic::List(items), AttributeType::Set(elem)) => {
            items.iter().all(|item| check_type(item, elem))
        }
        (Dynamic::Map(entries), AttributeType::Map(elem)) => {
            entries.values().all(|item| check_type(item, elem))
        }
        _ => false,
    }
}

/// AttributeBuilder provides a fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                requires_replace: false,
                validators: Vec::new(),
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.attribute.requires_replace = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides a fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                description: String::new(),
                attributes: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.attributes.push(attr);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_schema() -> Schema {
        SchemaBuilder::new()
            .version(1)
            .description("Test schema")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .requires_replace()
                    .validator(Box::new(StringLengthValidator {
                        min: Some(1),
                        max: None,
                    }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("environments", AttributeType::List(Box::new(AttributeType::String)))
                    .required()
                    .validator(Box::new(ListLengthValidator {
                        min: Some(1),
                        max: None,
                    }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .optional()
                    .build(),
            )
            .build()
    }

    fn valid_config() -> DynamicValue {
        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::String("dark-mode".to_string()));
        values.insert("enabled".to_string(), Dynamic::Bool(true));
        values.insert(
            "environments".to_string(),
            Dynamic::List(vec![Dynamic::String("prod".to_string())]),
        );
        DynamicValue::object(values)
    }

    #[test]
    fn valid_config_passes() {
        let diags = validate_config(&test_schema(), &valid_config());
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn missing_required_attribute_is_reported() {
        let mut config = valid_config();
        if let Dynamic::Map(m) = &mut config.value {
            m.remove("enabled");
        }

        let diags = validate_config(&test_schema(), &config);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("enabled"));
    }

    #[test]
    fn null_required_attribute_is_reported() {
        let mut config = valid_config();
        if let Dynamic::Map(m) = &mut config.value {
            m.insert("name".to_string(), Dynamic::Null);
        }

        let diags = validate_config(&test_schema(), &config);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("name"));
    }

    #[test]
    fn wrong_type_is_reported() {
        let mut config = valid_config();
        if let Dynamic::Map(m) = &mut config.value {
            m.insert("enabled".to_string(), Dynamic::String("yes".to_string()));
        }

        let diags = validate_config(&test_schema(), &config);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("Expected bool"));
    }

    #[test]
    fn wrong_list_element_type_is_reported() {
        let mut config = valid_config();
        if let Dynamic::Map(m) = &mut config.value {
            m.insert(
                "environments".to_string(),
                Dynamic::List(vec![Dynamic::Number(1.0)]),
            );
        }

        let diags = validate_config(&test_schema(), &config);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("environments"));
    }

    #[test]
    fn empty_required_list_fails_list_length_validator() {
        let mut config = valid_config();
        if let Dynamic::Map(m) = &mut config.value {
            m.insert("environments".to_string(), Dynamic::List(vec![]));
        }

        let diags = validate_config(&test_schema(), &config);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("at least 1"));
    }

    #[test]
    fn absent_optional_attribute_is_fine() {
        // tags is optional and absent in valid_config
        let diags = validate_config(&test_schema(), &valid_config());
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_values_skip_type_checks() {
        let mut config = valid_config();
        if let Dynamic::Map(m) = &mut config.value {
            m.insert("enabled".to_string(), Dynamic::Unknown);
        }

        let diags = validate_config(&test_schema(), &config);
        assert!(diags.is_empty());
    }

    #[test]
    fn null_config_reports_all_required() {
        let diags = validate_config(&test_schema(), &DynamicValue::null());
        assert_eq!(diags.len(), 3);
    }

    #[test]
    fn schema_lookup_by_name() {
        let schema = test_schema();
        assert!(schema.attribute("name").unwrap().requires_replace);
        assert!(schema.attribute("tags").unwrap().optional);
        assert!(schema.attribute("nope").is_none());
    }
}
