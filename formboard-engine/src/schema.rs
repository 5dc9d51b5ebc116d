//! Schema generator: derives a structural validator from a layout tree and a
//! definition collection. No hand-written schema anywhere — the validator is
//! re-derived from the same tree the renderer consumes.
//!
//! `generate_schema` is a pure function: identical inputs produce an
//! identical validator (rules in resolution order, no environment input).
//! Author mistakes (invalid regex, inverted bounds) are swallowed with a
//! diagnostic, never fatal.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use formboard_fields::{DefinitionSet, FieldDefinition, FieldKind};

use crate::resolve::resolve;
use crate::types::{FieldPath, FormLayout};
use crate::values::{as_number, flatten, is_blank, lookup};

/// Structural constraint attached to one resolved field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Constraint {
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        integer: bool,
    },
    Date,
    Select {
        options: Vec<String>,
    },
    MultiSelect {
        options: Vec<String>,
    },
    Bool,
    /// Opaque by default; `accept`/`max_size_mb` are carried for callers that
    /// enforce uploads through [`StructuralValidator::validate_with_file_check`].
    File {
        #[serde(skip_serializing_if = "Option::is_none")]
        accept: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_size_mb: Option<f64>,
    },
    Any,
}

/// One field's validation rule, keyed by its resolved path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRule {
    pub path: FieldPath,
    pub required: bool,
    pub constraint: Constraint,
}

/// A problem found while validating submitted values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueIssue {
    /// Concrete path the issue applies to (indices substituted for repeater
    /// instances).
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValueIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The derived validator: rules keyed by template path strings.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StructuralValidator {
    rules: IndexMap<String, FieldRule>,
}

/// Derive a validator from a layout and its definitions.
///
/// Resolution is re-derived internally so the generator composes with any
/// caller, not a particular resolver instance. Field nodes whose reference is
/// missing are excluded (they render as placeholders and must not block
/// submission); unknown field types participate as `Any` so required checks
/// never silently vanish.
pub fn generate_schema(layout: &FormLayout, defs: &DefinitionSet) -> StructuralValidator {
    let resolution = resolve(layout, defs);
    let mut rules = IndexMap::new();

    for field in resolution.iter() {
        let Some(def) = field.definition() else {
            continue;
        };
        let template = field.path.template();
        if rules.contains_key(&template) {
            // Same logical field appearing twice (same repeater template):
            // one rule covers both.
            continue;
        }
        rules.insert(
            template,
            FieldRule {
                path: field.path.clone(),
                required: def.required,
                constraint: constraint_for(def, &field.path),
            },
        );
    }

    StructuralValidator { rules }
}

/// Single exhaustive kind-to-rule dispatch.
fn constraint_for(def: &FieldDefinition, path: &FieldPath) -> Constraint {
    match &def.kind {
        FieldKind::Text | FieldKind::Textarea => Constraint::Text {
            max_length: def.max_length,
            pattern: def.pattern.clone(),
        },
        FieldKind::Number | FieldKind::Int | FieldKind::Float | FieldKind::Sum => {
            let (min, max) = check_bounds(def.min, def.max, path);
            Constraint::Number {
                min,
                max,
                integer: def.kind.is_integer(),
            }
        }
        FieldKind::Date | FieldKind::DateTime => Constraint::Date,
        FieldKind::Select | FieldKind::Radio | FieldKind::Dropdown => {
            match non_empty_options(def) {
                Some(options) => Constraint::Select { options },
                // No static options: unconstrained string.
                None => Constraint::Text {
                    max_length: None,
                    pattern: None,
                },
            }
        }
        FieldKind::MultiSelect => Constraint::MultiSelect {
            options: non_empty_options(def).unwrap_or_default(),
        },
        FieldKind::Checkbox | FieldKind::Switch | FieldKind::Boolean => Constraint::Bool,
        FieldKind::File | FieldKind::Document => Constraint::File {
            accept: def.accept.clone(),
            max_size_mb: def.max_size_mb,
        },
        FieldKind::Unknown(kind) => {
            warn!(
                kind = kind.as_str(),
                path = %path,
                "no validation mapping for field type; treating as any"
            );
            Constraint::Any
        }
    }
}

fn non_empty_options(def: &FieldDefinition) -> Option<Vec<String>> {
    def.options
        .as_ref()
        .filter(|opts| !opts.is_empty())
        .map(|opts| opts.iter().map(|o| o.value.clone()).collect())
}

/// Malformed bounds (min above max) are dropped, not fatal.
fn check_bounds(
    min: Option<f64>,
    max: Option<f64>,
    path: &FieldPath,
) -> (Option<f64>, Option<f64>) {
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            warn!(min = lo, max = hi, path = %path, "inverted numeric bounds; dropping both");
            return (None, None);
        }
    }
    (min, max)
}

impl StructuralValidator {
    /// Rules in resolution order.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The rule for a template path.
    pub fn rule(&self, path: &str) -> Option<&FieldRule> {
        self.rules.get(path)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validate submitted values against every rule.
    pub fn validate(&self, values: &Value) -> Vec<ValueIssue> {
        self.validate_inner(values, None, None)
    }

    /// Validate, skipping required-ness for hidden fields. Hidden fields keep
    /// their values; they just cannot block submission.
    pub fn validate_visible(&self, values: &Value, hidden: &HashSet<String>) -> Vec<ValueIssue> {
        self.validate_inner(values, Some(hidden), None)
    }

    /// Validate with an upload predicate: called for every present file
    /// value, returning an issue message to reject it.
    pub fn validate_with_file_check<F>(&self, values: &Value, file_check: F) -> Vec<ValueIssue>
    where
        F: Fn(&FieldRule, &Value) -> Option<String>,
    {
        self.validate_inner(values, None, Some(&file_check))
    }

    fn validate_inner(
        &self,
        values: &Value,
        hidden: Option<&HashSet<String>>,
        file_check: Option<&dyn Fn(&FieldRule, &Value) -> Option<String>>,
    ) -> Vec<ValueIssue> {
        let flat = flatten(values);
        let mut issues = Vec::new();

        for (template, rule) in &self.rules {
            let skip_required =
                hidden.map_or(false, |h| h.contains(template.as_str()));

            if rule.path.has_wildcard() {
                // Validate each concrete instance independently. Instances
                // are discovered from the value tree: any object matching
                // the template's prefix is live, so the required check fires
                // even when the key itself is absent from that instance.
                let Some(terminal) = rule.path.terminal_key() else {
                    continue;
                };
                let prefix = FieldPath::from(
                    template
                        .rsplit_once('.')
                        .map(|(p, _)| p.to_string())
                        .unwrap_or_default(),
                );
                for (concrete_prefix, value) in &flat {
                    if value.is_object() && prefix.matches(concrete_prefix) {
                        let concrete = format!("{concrete_prefix}.{terminal}");
                        check_value(
                            rule,
                            &concrete,
                            flat.get(concrete.as_str()).copied(),
                            skip_required,
                            file_check,
                            &mut issues,
                        );
                    }
                }
            } else {
                let value = lookup(values, template);
                check_value(rule, template, value, skip_required, file_check, &mut issues);
            }
        }

        issues
    }
}

fn check_value(
    rule: &FieldRule,
    path: &str,
    value: Option<&Value>,
    skip_required: bool,
    file_check: Option<&dyn Fn(&FieldRule, &Value) -> Option<String>>,
    issues: &mut Vec<ValueIssue>,
) {
    let issue = |message: String| ValueIssue {
        path: path.to_string(),
        message,
    };

    // Required checkboxes force affirmative consent: literal `true` only.
    if let Constraint::Bool = rule.constraint {
        match value {
            Some(Value::Bool(true)) => {}
            Some(Value::Bool(false)) | None | Some(Value::Null) => {
                if rule.required && !skip_required {
                    issues.push(issue("must be accepted".into()));
                }
            }
            Some(_) => issues.push(issue("expected a boolean".into())),
        }
        return;
    }

    let Some(value) = value.filter(|v| !is_blank(v)) else {

        if rule.required && !skip_required {
            issues.push(issue("required".into()));
        }
        return;
    };

    match &rule.constraint {
        Constraint::Text {
            max_length,
            pattern,
        } => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => {
                    issues.push(issue("expected text".into()));
                    return;
                }
            };
            if let Some(max) = max_length {
                if text.chars().count() > *max {
                    issues.push(issue(format!("must be at most {max} characters")));
                }
            }
            if let Some(pattern) = pattern {
                match regex::Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(&text) {
                            issues.push(issue("does not match the expected format".into()));
                        }
                    }
                    Err(_) => {
                        // Author-supplied pattern is broken; not the user's
                        // problem.
                        warn!(pattern = %pattern, path, "invalid pattern; constraint skipped");
                    }
                }
            }
        }
        Constraint::Number { min, max, integer } => match as_number(value) {
            Some(n) => {
                if *integer && n.fract() != 0.0 {
                    issues.push(issue("must be a whole number".into()));
                }
                if let Some(lo) = min {
                    if n < *lo {
                        issues.push(issue(format!("must be at least {lo}")));
                    }
                }
                if let Some(hi) = max {
                    if n > *hi {
                        issues.push(issue(format!("must be at most {hi}")));
                    }
                }
            }
            None => issues.push(issue("expected a number".into())),
        },
        Constraint::Date => {
            let ok = value
                .as_str()
                .map(|s| parse_date(s))
                .unwrap_or(false);
            if !ok {
                issues.push(issue("expected a date".into()));
            }
        }
        Constraint::Select { options } => match value.as_str() {
            Some(s) => {
                if !options.iter().any(|o| o == s) {
                    issues.push(issue("not one of the allowed options".into()));
                }
            }
            None => issues.push(issue("not one of the allowed options".into())),
        },
        Constraint::MultiSelect { options } => match value {
            Value::Array(items) => {
                if !options.is_empty() {
                    for item in items {
                        let allowed = item
                            .as_str()
                            .map_or(false, |s| options.iter().any(|o| o == s));
                        if !allowed {
                            issues.push(issue("contains a value outside the allowed options".into()));
                        }
                    }
                }
            }
            _ => issues.push(issue("expected a list".into())),
        },
        Constraint::Bool => unreachable!("handled above"),
        Constraint::File { .. } => {
            if let Some(check) = file_check {
                if let Some(message) = check(rule, value) {
                    issues.push(issue(message));
                }
            }
        }
        Constraint::Any => {}
    }
}

fn parse_date(s: &str) -> bool {
    let s = s.trim();
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defs(json: &str) -> DefinitionSet {
        DefinitionSet::from_json(json).unwrap()
    }

    fn layout_for(keys: &[&str]) -> FormLayout {
        let children: Vec<Value> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| json!({"type": "field", "id": format!("n{i}"), "fieldKey": key}))
            .collect();
        serde_json::from_value(json!({
            "version": 1,
            "nodes": [{"type": "section", "id": "s1", "children": children}]
        }))
        .unwrap()
    }

    #[test]
    fn required_text_rejects_blank() {
        let defs = defs(r#"[{"id":"d1","key":"name","type":"text","required":true}]"#);
        let schema = generate_schema(&layout_for(&["name"]), &defs);
        assert_eq!(schema.validate(&json!({"name": ""})).len(), 1);
        assert_eq!(schema.validate(&json!({})).len(), 1);
        assert!(schema.validate(&json!({"name": "Ada"})).is_empty());
    }

    #[test]
    fn text_max_length_and_pattern() {
        let defs = defs(
            r#"[{"id":"d1","key":"code","type":"text","maxLength":4,"pattern":"^[A-Z]+$"}]"#,
        );
        let schema = generate_schema(&layout_for(&["code"]), &defs);
        assert!(schema.validate(&json!({"code": "ABC"})).is_empty());
        // Length violation alone
        assert_eq!(schema.validate(&json!({"code": "ABCDE"})).len(), 1);
        // Pattern violation alone
        assert_eq!(schema.validate(&json!({"code": "abc"})).len(), 1);
        // Both at once
        assert_eq!(schema.validate(&json!({"code": "abcde"})).len(), 2);
    }

    #[test]
    fn invalid_author_regex_is_swallowed() {
        let defs = defs(r#"[{"id":"d1","key":"code","type":"text","pattern":"["}]"#);
        let schema = generate_schema(&layout_for(&["code"]), &defs);
        assert!(schema.validate(&json!({"code": "anything"})).is_empty());
    }

    #[test]
    fn number_bounds_inclusive_and_integer_flag() {
        let defs = defs(
            r#"[{"id":"d1","key":"age","type":"int","min":0,"max":130},
                {"id":"d2","key":"rate","type":"float"}]"#,
        );
        let schema = generate_schema(&layout_for(&["age", "rate"]), &defs);
        assert!(schema.validate(&json!({"age": 0, "rate": 1.5})).is_empty());
        assert!(schema.validate(&json!({"age": 130})).is_empty());
        assert_eq!(schema.validate(&json!({"age": 131})).len(), 1);
        assert_eq!(schema.validate(&json!({"age": 2.5})).len(), 1);
        assert_eq!(schema.validate(&json!({"age": "abc"})).len(), 1);
        // Numeric strings coerce
        assert!(schema.validate(&json!({"age": "42"})).is_empty());
    }

    #[test]
    fn inverted_bounds_are_dropped() {
        let defs = defs(r#"[{"id":"d1","key":"n","type":"number","min":10,"max":1}]"#);
        let schema = generate_schema(&layout_for(&["n"]), &defs);
        assert!(schema.validate(&json!({"n": 100})).is_empty());
    }

    #[test]
    fn date_coercion() {
        let defs = defs(
            r#"[{"id":"d1","key":"born","type":"date"},
                {"id":"d2","key":"at","type":"datetime"}]"#,
        );
        let schema = generate_schema(&layout_for(&["born", "at"]), &defs);
        assert!(schema
            .validate(&json!({"born": "1990-04-01", "at": "2024-01-02T10:30:00Z"}))
            .is_empty());
        assert_eq!(schema.validate(&json!({"born": "not a date"})).len(), 1);
    }

    #[test]
    fn select_restricted_to_option_values() {
        let defs = defs(
            r#"[{"id":"d1","key":"status","type":"select","required":true,
                 "options":[{"value":"open"},{"value":"closed"}]}]"#,
        );
        let schema = generate_schema(&layout_for(&["status"]), &defs);
        assert!(schema.validate(&json!({"status": "open"})).is_empty());
        assert_eq!(schema.validate(&json!({"status": "weird"})).len(), 1);
        assert_eq!(schema.validate(&json!({})).len(), 1);
    }

    #[test]
    fn select_without_options_falls_back_to_string() {
        let defs = defs(r#"[{"id":"d1","key":"status","type":"dropdown"}]"#);
        let schema = generate_schema(&layout_for(&["status"]), &defs);
        assert!(matches!(
            schema.rule("status").unwrap().constraint,
            Constraint::Text { .. }
        ));
        assert!(schema.validate(&json!({"status": "anything"})).is_empty());
    }

    #[test]
    fn multiselect_required_means_at_least_one() {
        let defs = defs(
            r#"[{"id":"d1","key":"tags","type":"multiselect","required":true,
                 "options":[{"value":"a"},{"value":"b"}]}]"#,
        );
        let schema = generate_schema(&layout_for(&["tags"]), &defs);
        assert_eq!(schema.validate(&json!({"tags": []})).len(), 1);
        assert!(schema.validate(&json!({"tags": ["a"]})).is_empty());
        assert_eq!(schema.validate(&json!({"tags": ["a", "z"]})).len(), 1);
        assert_eq!(schema.validate(&json!({"tags": "a"})).len(), 1);
    }

    #[test]
    fn required_checkbox_accepts_only_literal_true() {
        let defs = defs(r#"[{"id":"d1","key":"consent","type":"checkbox","required":true}]"#);
        let schema = generate_schema(&layout_for(&["consent"]), &defs);
        assert!(schema.validate(&json!({"consent": true})).is_empty());
        assert_eq!(schema.validate(&json!({"consent": false})).len(), 1);
        assert_eq!(schema.validate(&json!({})).len(), 1);
        assert_eq!(schema.validate(&json!({"consent": "yes"})).len(), 1);
    }

    #[test]
    fn optional_checkbox_allows_false_and_absent() {
        let defs = defs(r#"[{"id":"d1","key":"newsletter","type":"switch"}]"#);
        let schema = generate_schema(&layout_for(&["newsletter"]), &defs);
        assert!(schema.validate(&json!({"newsletter": false})).is_empty());
        assert!(schema.validate(&json!({})).is_empty());
    }

    #[test]
    fn unknown_kind_is_any_but_required_still_checked() {
        let defs = defs(r#"[{"id":"d1","key":"sig","type":"signature","required":true}]"#);
        let schema = generate_schema(&layout_for(&["sig"]), &defs);
        assert!(matches!(
            schema.rule("sig").unwrap().constraint,
            Constraint::Any
        ));
        assert_eq!(schema.validate(&json!({})).len(), 1);
        assert!(schema.validate(&json!({"sig": "whatever"})).is_empty());
    }

    #[test]
    fn missing_definition_excluded_from_rules() {
        let defs = defs(r#"[{"id":"d1","key":"name","type":"text"}]"#);
        let layout: FormLayout = serde_json::from_value(json!({
            "version": 1,
            "nodes": [{"type": "section", "id": "s1", "children": [
                {"type": "field", "id": "n1", "fieldKey": "name"},
                {"type": "field", "id": "n2", "fieldId": "ghost"}
            ]}]
        }))
        .unwrap();
        let schema = generate_schema(&layout, &defs);
        assert_eq!(schema.len(), 1);
        assert!(schema.rule("ghost").is_none());
    }

    #[test]
    fn wildcard_rules_validate_each_instance() {
        let defs = defs(r#"[{"id":"d1","key":"price","type":"number","required":true,"min":0}]"#);
        let layout: FormLayout = serde_json::from_value(json!({
            "version": 1,
            "nodes": [{"type": "section", "id": "s1", "children": [
                {"type": "repeater", "id": "rep1", "children": [
                    {"type": "field", "id": "n1", "fieldKey": "price"}
                ]}
            ]}]
        }))
        .unwrap();
        let schema = generate_schema(&layout, &defs);
        let issues = schema.validate(&json!({"0": {"price": 5}, "1": {"price": -2}}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "1.price");
    }

    #[test]
    fn required_is_checked_in_every_live_instance() {
        let defs = defs(
            r#"[{"id":"d1","key":"price","type":"number","required":true},
                {"id":"d2","key":"qty","type":"int"}]"#,
        );
        let layout: FormLayout = serde_json::from_value(json!({
            "version": 1,
            "nodes": [{"type": "section", "id": "s1", "children": [
                {"type": "repeater", "id": "rep1", "children": [
                    {"type": "field", "id": "n1", "fieldKey": "price"},
                    {"type": "field", "id": "n2", "fieldKey": "qty"}
                ]}
            ]}]
        }))
        .unwrap();
        let schema = generate_schema(&layout, &defs);

        // An instance that never entered the required key still flags it.
        let issues = schema.validate(&json!({"0": {"qty": 3}}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "0.price");
        assert_eq!(issues[0].message, "required");

        // Only the incomplete instance flags.
        let issues = schema.validate(&json!({"0": {"price": 1}, "1": {"qty": 2}}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "1.price");

        // No instances at all: nothing to require.
        assert!(schema.validate(&json!({})).is_empty());
    }

    #[test]
    fn generation_is_deterministic() {
        let defs = defs(
            r#"[{"id":"d1","key":"name","type":"text","required":true},
                {"id":"d2","key":"age","type":"int","min":0}]"#,
        );
        let layout = layout_for(&["name", "age"]);
        let a = serde_json::to_string(&generate_schema(&layout, &defs)).unwrap();
        let b = serde_json::to_string(&generate_schema(&layout, &defs)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn validate_visible_skips_required_for_hidden() {
        let defs = defs(r#"[{"id":"d1","key":"name","type":"text","required":true}]"#);
        let schema = generate_schema(&layout_for(&["name"]), &defs);
        let hidden: HashSet<String> = ["name".to_string()].into();
        assert!(schema.validate_visible(&json!({}), &hidden).is_empty());
        // Non-required checks still apply to hidden fields' present values.
        assert_eq!(schema.validate(&json!({})).len(), 1);
    }

    #[test]
    fn file_check_hook() {
        let defs = defs(
            r#"[{"id":"d1","key":"doc","type":"file","accept":[".pdf"],"maxSizeMB":5}]"#,
        );
        let schema = generate_schema(&layout_for(&["doc"]), &defs);
        // Opaque by default
        assert!(schema.validate(&json!({"doc": {"name": "x.exe"}})).is_empty());

        let issues = schema.validate_with_file_check(&json!({"doc": {"name": "x.exe"}}), |rule, value| {
            let Constraint::File { accept, .. } = &rule.constraint else {
                return None;
            };
            let name = value.get("name")?.as_str()?;
            let ok = accept
                .as_ref()
                .map_or(true, |exts| exts.iter().any(|e| name.ends_with(e.as_str())));
            (!ok).then(|| "file type not accepted".to_string())
        });
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "doc");
    }
}
