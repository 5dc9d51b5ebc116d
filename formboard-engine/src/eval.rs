//! Runtime evaluator: visibility conditions and aggregate recomputation.
//!
//! Both concerns are pure functions of the current form values. The engine
//! defines no subscription model — the host calls [`evaluate`] from its own
//! change notification and the result is deterministic for memoization by
//! inputs.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use formboard_fields::{Condition, ConditionOp, FieldKind};

use crate::resolve::{Resolution, ResolvedField};
use crate::values::{as_number, flatten, is_blank, lookup, loose_eq};

/// Result of one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    hidden: HashSet<String>,
    computed: IndexMap<String, Value>,
}

impl Evaluation {
    /// Template paths of currently hidden fields.
    pub fn hidden(&self) -> &HashSet<String> {
        &self.hidden
    }

    pub fn is_hidden(&self, path: &str) -> bool {
        self.hidden.contains(path)
    }

    /// Derived values keyed by concrete path, to be republished read-only.
    pub fn computed(&self) -> &IndexMap<String, Value> {
        &self.computed
    }

    pub fn computed_value(&self, path: &str) -> Option<&Value> {
        self.computed.get(path)
    }

    /// The resolved fields that should actually be rendered. Hidden fields
    /// stay mounted in the data model; they are only excluded from the
    /// rendered tree.
    pub fn visible_fields<'a>(&self, resolution: &'a Resolution) -> Vec<&'a ResolvedField> {
        resolution
            .iter()
            .filter(|f| !self.is_hidden(&f.path.template()))
            .collect()
    }
}

/// Evaluate visibility and aggregates against the current values.
pub fn evaluate(resolution: &Resolution, values: &Value) -> Evaluation {
    let mut eval = Evaluation::default();

    for field in resolution.iter() {
        if field_is_hidden(field, values) {
            eval.hidden.insert(field.path.template());
        }

        let Some(def) = field.definition() else {
            continue;
        };
        if def.kind == FieldKind::Sum {
            compute_sum(field, def.sources.as_deref().unwrap_or(&[]), values, &mut eval);
        }
    }

    eval
}

/// Each carrier (enclosing sections, then the field itself) contributes one
/// conjunction; any conjunction holding hides the field.
fn field_is_hidden(field: &ResolvedField, values: &Value) -> bool {
    let own = field
        .definition()
        .map(|d| d.hide_when.as_slice())
        .unwrap_or(&[]);

    field
        .section_hide
        .iter()
        .map(Vec::as_slice)
        .chain((!own.is_empty()).then_some(own))
        .any(|group| group.iter().all(|clause| clause_holds(clause, values)))
}

/// Evaluate one `{key, op, value}` clause against the value map.
pub fn clause_holds(clause: &Condition, values: &Value) -> bool {
    let actual = lookup(values, &clause.key);
    let expected = clause.value.as_ref().unwrap_or(&Value::Null);

    match clause.op {
        ConditionOp::Eq => loose_eq(actual.unwrap_or(&Value::Null), expected),
        ConditionOp::Neq => !loose_eq(actual.unwrap_or(&Value::Null), expected),
        ConditionOp::Gt => match (actual.and_then(as_number), as_number(expected)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        ConditionOp::Lt => match (actual.and_then(as_number), as_number(expected)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
        ConditionOp::Exists => actual.map_or(false, |v| !is_blank(v)),
        ConditionOp::In => match expected {
            Value::Array(items) => actual
                .map_or(false, |a| items.iter().any(|item| loose_eq(a, item))),
            _ => false,
        },
    }
}

/// Sum over source keys: each parsed as a float, non-numeric/missing = 0.
fn compute_sum(field: &ResolvedField, sources: &[String], values: &Value, eval: &mut Evaluation) {
    if !field.path.has_wildcard() {
        let total: f64 = sources
            .iter()
            .map(|src| lookup(values, src).and_then(as_number).unwrap_or(0.0))
            .sum();
        eval.computed.insert(field.path.template(), number(total));
        return;
    }

    // Inside a repeater the sources are per-item siblings: find every live
    // instance via the source keys, then sum within each instance prefix.
    let flat = flatten(values);
    let mut prefixes: Vec<String> = Vec::new();
    for src in sources {
        let mut segments = field.path.segments().to_vec();
        segments.pop();
        let src_path = crate::types::FieldPath::from_segments(&segments, src.clone());
        for key in flat.keys() {
            if src_path.matches(key) {
                let prefix = key
                    .rsplit_once('.')
                    .map(|(p, _)| p.to_string())
                    .unwrap_or_default();
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        }
    }

    let terminal = field.path.terminal_key().unwrap_or_default().to_string();
    for prefix in prefixes {
        let total: f64 = sources
            .iter()
            .map(|src| {
                lookup(values, &format!("{prefix}.{src}"))
                    .and_then(as_number)
                    .unwrap_or(0.0)
            })
            .sum();
        eval.computed
            .insert(format!("{prefix}.{terminal}"), number(total));
    }
}

fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
