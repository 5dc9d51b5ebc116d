//! Core types for field definitions.
//!
//! All types serialize to/from JSON (and YAML) via serde. A field definition
//! describes a single named, typed input; layout trees reference definitions
//! by id or key rather than embedding behavior.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// A single option in a select, radio, dropdown or multiselect field.
///
/// Authors may write options either as plain strings or as
/// `{value, label}` objects; both deserialize to the same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "SelectOptionRepr")]
pub struct SelectOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SelectOption {
    /// Create an option whose label is the value itself.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    /// Create an option with an explicit label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectOptionRepr {
    Bare(String),
    Full {
        value: String,
        #[serde(default)]
        label: Option<String>,
    },
}

impl From<SelectOptionRepr> for SelectOption {
    fn from(repr: SelectOptionRepr) -> Self {
        match repr {
            SelectOptionRepr::Bare(value) => Self { value, label: None },
            SelectOptionRepr::Full { value, label } => Self { value, label },
        }
    }
}

/// The declared type of a field.
///
/// The wire format is a plain string (`"text"`, `"number"`, ...). Unrecognized
/// strings are preserved in `Unknown` so they survive round trips and can be
/// surfaced as an unsupported-type placeholder downstream instead of failing
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Int,
    Float,
    Date,
    DateTime,
    Select,
    Radio,
    Dropdown,
    MultiSelect,
    Checkbox,
    Switch,
    Boolean,
    File,
    Document,
    Sum,
    Unknown(String),
}

impl FieldKind {
    /// Canonical wire string for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Int => "int",
            Self::Float => "float",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Dropdown => "dropdown",
            Self::MultiSelect => "multiselect",
            Self::Checkbox => "checkbox",
            Self::Switch => "switch",
            Self::Boolean => "boolean",
            Self::File => "file",
            Self::Document => "document",
            Self::Sum => "sum",
            Self::Unknown(s) => s,
        }
    }

    /// True for kinds whose value is a number.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number | Self::Int | Self::Float | Self::Sum)
    }

    /// True for kinds whose value must be a whole number.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int)
    }

    /// True for single- and multi-choice kinds backed by an option list.
    pub fn is_selection(&self) -> bool {
        matches!(
            self,
            Self::Select | Self::Radio | Self::Dropdown | Self::MultiSelect
        )
    }

    /// True for boolean-valued kinds.
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Checkbox | Self::Switch | Self::Boolean)
    }

    /// True for opaque upload kinds.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File | Self::Document)
    }

    /// True for kinds derived from other fields rather than entered directly.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Sum)
    }

    /// True when this kind has no rendering or validation mapping.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Display label for a freshly created field of this kind.
    pub fn default_label(&self) -> String {
        match self {
            Self::Text => "Text".into(),
            Self::Textarea => "Text area".into(),
            Self::Number => "Number".into(),
            Self::Int => "Integer".into(),
            Self::Float => "Decimal".into(),
            Self::Date => "Date".into(),
            Self::DateTime => "Date and time".into(),
            Self::Select => "Select".into(),
            Self::Radio => "Radio group".into(),
            Self::Dropdown => "Dropdown".into(),
            Self::MultiSelect => "Multi-select".into(),
            Self::Checkbox => "Checkbox".into(),
            Self::Switch => "Switch".into(),
            Self::Boolean => "Yes/no".into(),
            Self::File => "File upload".into(),
            Self::Document => "Document".into(),
            Self::Sum => "Sum".into(),
            Self::Unknown(s) => s.clone(),
        }
    }
}

impl Default for FieldKind {
    fn default() -> Self {
        Self::Text
    }
}

impl From<String> for FieldKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => Self::Text,
            "textarea" => Self::Textarea,
            "number" => Self::Number,
            "int" | "integer" => Self::Int,
            "float" => Self::Float,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "select" => Self::Select,
            "radio" => Self::Radio,
            "dropdown" => Self::Dropdown,
            "multiselect" => Self::MultiSelect,
            "checkbox" => Self::Checkbox,
            "switch" => Self::Switch,
            "boolean" => Self::Boolean,
            "file" => Self::File,
            "document" => Self::Document,
            "sum" => Self::Sum,
            _ => Self::Unknown(s),
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator in a visibility condition clause.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOp {
    #[serde(alias = "equals")]
    Eq,
    #[serde(alias = "notEquals")]
    Neq,
    Gt,
    Lt,
    Exists,
    In,
}

/// One clause of a hide condition: `{key, op, value}`.
///
/// A field carrying clauses is hidden when ALL of them evaluate true against
/// the live value map; with zero clauses it is always visible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub key: String,
    pub op: ConditionOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(key: impl Into<String>, op: ConditionOp, value: Option<Value>) -> Self {
        Self {
            key: key.into(),
            op,
            value,
        }
    }
}

/// A field definition — the complete schema for a single named input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Static options for selection kinds. A selection field without options
    /// falls back to an unconstrained string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Accepted extensions/MIME types for file kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<Vec<String>>,
    #[serde(rename = "maxSizeMB", default, skip_serializing_if = "Option::is_none")]
    pub max_size_mb: Option<f64>,
    /// Sibling field keys an aggregate kind derives its value from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// Hide clauses. Wire name kept for compatibility with existing saved forms.
    #[serde(
        rename = "condicionesOcultar",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub hide_when: Vec<Condition>,
}

impl FieldDefinition {
    /// Create a definition with a fresh ULID id.
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        let key = key.into();
        Self {
            id: Ulid::new().to_string(),
            label: key.clone(),
            key,
            kind,
            required: false,
            options: None,
            min: None,
            max: None,
            step: None,
            max_length: None,
            pattern: None,
            accept: None,
            max_size_mb: None,
            sources: None,
            hide_when: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn hide_when(mut self, clause: Condition) -> Self {
        self.hide_when.push(clause);
        self
    }

    /// Option value strings, if this definition carries static options.
    pub fn option_values(&self) -> Option<Vec<&str>> {
        self.options
            .as_ref()
            .map(|opts| opts.iter().map(|o| o.value.as_str()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_kind_round_trip() {
        for s in [
            "text",
            "textarea",
            "number",
            "int",
            "float",
            "date",
            "datetime",
            "select",
            "radio",
            "dropdown",
            "multiselect",
            "checkbox",
            "switch",
            "boolean",
            "file",
            "document",
            "sum",
        ] {
            let kind: FieldKind = serde_json::from_value(json!(s)).unwrap();
            assert_eq!(serde_json::to_value(&kind).unwrap(), json!(s));
        }
    }

    #[test]
    fn field_kind_integer_alias() {
        let kind: FieldKind = serde_json::from_value(json!("integer")).unwrap();
        assert_eq!(kind, FieldKind::Int);
    }

    #[test]
    fn field_kind_unknown_preserved() {
        let kind: FieldKind = serde_json::from_value(json!("signature")).unwrap();
        assert_eq!(kind, FieldKind::Unknown("signature".into()));
        assert!(kind.is_unknown());
        assert_eq!(serde_json::to_value(&kind).unwrap(), json!("signature"));
    }

    #[test]
    fn field_kind_predicates() {
        assert!(FieldKind::Int.is_numeric());
        assert!(FieldKind::Int.is_integer());
        assert!(!FieldKind::Number.is_integer());
        assert!(FieldKind::Sum.is_aggregate());
        assert!(FieldKind::Sum.is_numeric());
        assert!(FieldKind::Radio.is_selection());
        assert!(FieldKind::Switch.is_boolean());
        assert!(FieldKind::Document.is_file());
        assert!(!FieldKind::Text.is_numeric());
    }

    #[test]
    fn select_option_from_bare_string() {
        let opt: SelectOption = serde_json::from_value(json!("red")).unwrap();
        assert_eq!(opt.value, "red");
        assert!(opt.label.is_none());
    }

    #[test]
    fn select_option_from_object() {
        let opt: SelectOption =
            serde_json::from_value(json!({"value": "red", "label": "Red"})).unwrap();
        assert_eq!(opt.value, "red");
        assert_eq!(opt.label, Some("Red".into()));
    }

    #[test]
    fn condition_op_aliases() {
        let op: ConditionOp = serde_json::from_value(json!("equals")).unwrap();
        assert_eq!(op, ConditionOp::Eq);
        let op: ConditionOp = serde_json::from_value(json!("notEquals")).unwrap();
        assert_eq!(op, ConditionOp::Neq);
        let op: ConditionOp = serde_json::from_value(json!("eq")).unwrap();
        assert_eq!(op, ConditionOp::Eq);
    }

    #[test]
    fn condition_op_serializes_short_form() {
        assert_eq!(serde_json::to_value(ConditionOp::Eq).unwrap(), json!("eq"));
        assert_eq!(
            serde_json::to_value(ConditionOp::Neq).unwrap(),
            json!("neq")
        );
    }

    #[test]
    fn field_definition_json_round_trip() {
        let def = FieldDefinition::new("status", FieldKind::Select)
            .with_label("Status")
            .required()
            .with_options(vec![
                SelectOption::new("open"),
                SelectOption::new("closed").with_label("Closed"),
            ]);
        let json = serde_json::to_string(&def).unwrap();
        let parsed: FieldDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(def, parsed);
    }

    #[test]
    fn field_definition_yaml_round_trip() {
        let def = FieldDefinition::new("amount", FieldKind::Number)
            .with_bounds(Some(0.0), Some(100.0));
        let yaml = serde_yaml_ng::to_string(&def).unwrap();
        let parsed: FieldDefinition = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(def, parsed);
    }

    #[test]
    fn field_definition_wire_names() {
        let def = FieldDefinition::new("upload", FieldKind::File);
        let mut def = def;
        def.max_length = Some(10);
        def.max_size_mb = Some(5.0);
        def.hide_when = vec![Condition::new("other", ConditionOp::Eq, Some(json!(1)))];
        let value = serde_json::to_value(&def).unwrap();
        assert!(value.get("maxLength").is_some());
        assert!(value.get("maxSizeMB").is_some());
        assert!(value.get("condicionesOcultar").is_some());
        assert_eq!(value["type"], json!("file"));
    }

    #[test]
    fn field_definition_defaults_on_deserialize() {
        let def: FieldDefinition =
            serde_json::from_value(json!({"id": "f1", "key": "name"})).unwrap();
        assert_eq!(def.kind, FieldKind::Text);
        assert!(!def.required);
        assert!(def.hide_when.is_empty());
    }

    #[test]
    fn parses_wire_condition_from_saved_form() {
        let def: FieldDefinition = serde_json::from_value(json!({
            "id": "f1",
            "key": "discount",
            "type": "number",
            "condicionesOcultar": [
                {"key": "memberLevel", "op": "notEquals", "value": "gold"}
            ]
        }))
        .unwrap();
        assert_eq!(def.hide_when.len(), 1);
        assert_eq!(def.hide_when[0].op, ConditionOp::Neq);
    }
}
