//! Field resolver: walks a layout tree against a definition collection and
//! produces the flat, addressable list of bound fields.
//!
//! Containers contribute nothing to a field's path; repeaters contribute a
//! wildcard segment; the definition key is terminal. Unresolvable references
//! become typed [`Binding::Missing`] markers, never errors — downstream
//! renders a placeholder and validation treats them as unconstrained.

use indexmap::IndexMap;
use tracing::debug;

use formboard_fields::{Condition, DefinitionSet, FieldDefinition};

use crate::types::{FieldPath, FormLayout, LayoutNode, NodeId, PathSegment};

/// What a field node's reference resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// The definition this node is bound to.
    Resolved(FieldDefinition),
    /// No definition matched the node's reference.
    Missing { reference: String },
}

/// One entry in the resolver output: `(layout node, definition, path)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub node_id: NodeId,
    pub col_span: u8,
    pub path: FieldPath,
    pub binding: Binding,
    /// Hide clause groups inherited from enclosing sections. Each group is
    /// one carrier's conjunction; any group holding hides the field.
    pub section_hide: Vec<Vec<Condition>>,
}

impl ResolvedField {
    pub fn definition(&self) -> Option<&FieldDefinition> {
        match &self.binding {
            Binding::Resolved(def) => Some(def),
            Binding::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.binding, Binding::Missing { .. })
    }

    /// The fully-qualified form-state name the presentation adapter must
    /// register its input under, given the current repeater item indices.
    pub fn name(&self, indices: &[usize]) -> String {
        self.path.bind(indices)
    }
}

/// Ordered resolver output plus an alias lookup map.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    fields: Vec<ResolvedField>,
    index: IndexMap<String, usize>,
}

impl Resolution {
    /// Resolved fields in depth-first layout order.
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    /// Look up by any alias: node id, fieldId, fieldKey, definition id, or
    /// definition key. First writer wins on collision.
    pub fn lookup(&self, alias: &str) -> Option<&ResolvedField> {
        self.index.get(alias).map(|&i| &self.fields[i])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedField> {
        self.fields.iter()
    }

    fn push(&mut self, field: ResolvedField, aliases: Vec<String>) {
        let idx = self.fields.len();
        for alias in aliases {
            self.index.entry(alias).or_insert(idx);
        }
        self.fields.push(field);
    }
}

/// Resolve every field node in `layout` against `defs`.
pub fn resolve(layout: &FormLayout, defs: &DefinitionSet) -> Resolution {
    let mut resolution = Resolution::default();
    let mut prefix: Vec<PathSegment> = Vec::new();
    let mut section_hide: Vec<Vec<Condition>> = Vec::new();

    for node in &layout.nodes {
        visit(node, defs, &mut prefix, &mut section_hide, &mut resolution);
    }

    let missing = resolution.iter().filter(|f| f.is_missing()).count();
    debug!(
        fields = resolution.len(),
        missing, "layout resolved against definition set"
    );
    resolution
}

fn visit(
    node: &LayoutNode,
    defs: &DefinitionSet,
    prefix: &mut Vec<PathSegment>,
    section_hide: &mut Vec<Vec<Condition>>,
    out: &mut Resolution,
) {
    match node {
        LayoutNode::Section {
            hide_when,
            children,
            ..
        } => {
            let pushed = !hide_when.is_empty();
            if pushed {
                section_hide.push(hide_when.clone());
            }
            for child in children {
                visit(child, defs, prefix, section_hide, out);
            }
            if pushed {
                section_hide.pop();
            }
        }
        LayoutNode::Row {
            columns, children, ..
        } => {
            for child in columns.iter().chain(children) {
                visit(child, defs, prefix, section_hide, out);
            }
        }
        LayoutNode::Column { children, .. } => {
            for child in children {
                visit(child, defs, prefix, section_hide, out);
            }
        }
        LayoutNode::Tabs {
            tabs,
            tabs_children,
            ..
        } => {
            // Tabs without a children entry render empty, not as an error.
            for tab in tabs {
                if let Some(children) = tabs_children.get(&tab.id) {
                    for child in children {
                        visit(child, defs, prefix, section_hide, out);
                    }
                }
            }
        }
        LayoutNode::Repeater { children, .. } => {
            prefix.push(PathSegment::Wildcard);
            for child in children {
                visit(child, defs, prefix, section_hide, out);
            }
            prefix.pop();
        }
        LayoutNode::Field {
            id,
            field_id,
            field_key,
            col_span,
            field,
        } => {
            let binding = bind(id, field_id.as_deref(), field_key.as_deref(), field, defs);

            let terminal = match &binding {
                Binding::Resolved(def) => def.key.clone(),
                Binding::Missing { reference } => reference.clone(),
            };
            let path = FieldPath::from_segments(prefix, terminal);

            let mut aliases = vec![id.to_string()];
            aliases.extend(field_id.clone());
            aliases.extend(field_key.clone());
            if let Binding::Resolved(def) = &binding {
                aliases.push(def.id.clone());
                aliases.push(def.key.clone());
            }

            out.push(
                ResolvedField {
                    node_id: id.clone(),
                    col_span: *col_span,
                    path,
                    binding,
                    section_hide: section_hide.clone(),
                },
                aliases,
            );
        }
    }
}

/// Resolution order: embedded definition, then fieldId, fieldKey, node id.
fn bind(
    id: &NodeId,
    field_id: Option<&str>,
    field_key: Option<&str>,
    embedded: &Option<FieldDefinition>,
    defs: &DefinitionSet,
) -> Binding {
    if let Some(def) = embedded {
        return Binding::Resolved(def.clone());
    }
    if let Some(reference) = field_id {
        if let Some(def) = defs.get(reference) {
            return Binding::Resolved(def.clone());
        }
    }
    if let Some(key) = field_key {
        if let Some(def) = defs.get_by_key(key) {
            return Binding::Resolved(def.clone());
        }
    }
    if let Some(def) = defs.get(id.as_str()) {
        return Binding::Resolved(def.clone());
    }

    let reference = field_id
        .or(field_key)
        .unwrap_or(id.as_str())
        .to_string();
    Binding::Missing { reference }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formboard_fields::FieldKind;
    use serde_json::json;

    fn defs() -> DefinitionSet {
        DefinitionSet::from_json(
            r#"[
                {"id": "d1", "key": "name", "type": "text"},
                {"id": "d2", "key": "price", "type": "number"},
                {"id": "d3", "key": "qty", "type": "int"}
            ]"#,
        )
        .unwrap()
    }

    fn layout(nodes: serde_json::Value) -> FormLayout {
        serde_json::from_value(json!({"version": 1, "nodes": nodes})).unwrap()
    }

    #[test]
    fn resolves_by_field_id_key_and_node_id() {
        let layout = layout(json!([
            {"type": "section", "id": "s1", "children": [
                {"type": "field", "id": "n1", "fieldId": "d1"},
                {"type": "field", "id": "n2", "fieldKey": "price"},
                {"type": "field", "id": "qty"}
            ]}
        ]));
        let res = resolve(&layout, &defs());
        assert_eq!(res.len(), 3);
        assert_eq!(res.fields()[0].path.template(), "name");
        assert_eq!(res.fields()[1].path.template(), "price");
        assert_eq!(res.fields()[2].path.template(), "qty");
        assert!(res.iter().all(|f| !f.is_missing()));
    }

    #[test]
    fn embedded_definition_wins() {
        let layout = layout(json!([
            {"type": "section", "id": "s1", "children": [
                {"type": "field", "id": "n1", "fieldId": "d1",
                 "field": {"id": "inline", "key": "inline_key", "type": "int"}}
            ]}
        ]));
        let res = resolve(&layout, &defs());
        let def = res.fields()[0].definition().unwrap();
        assert_eq!(def.key, "inline_key");
        assert_eq!(def.kind, FieldKind::Int);
    }

    #[test]
    fn unresolvable_reference_yields_missing_marker() {
        let layout = layout(json!([
            {"type": "section", "id": "s1", "children": [
                {"type": "field", "id": "n1", "fieldId": "ghost"}
            ]}
        ]));
        let res = resolve(&layout, &defs());
        assert_eq!(res.len(), 1);
        let field = &res.fields()[0];
        assert!(field.is_missing());
        assert_eq!(
            field.binding,
            Binding::Missing {
                reference: "ghost".into()
            }
        );
        // Still addressable: the path falls back to the dangling reference.
        assert_eq!(field.path.template(), "ghost");
    }

    #[test]
    fn repeater_contributes_wildcard_segment() {
        let layout = layout(json!([
            {"type": "section", "id": "s1", "children": [
                {"type": "repeater", "id": "rep1", "children": [
                    {"type": "field", "id": "n1", "fieldKey": "price"}
                ]}
            ]}
        ]));
        let res = resolve(&layout, &defs());
        let field = &res.fields()[0];
        assert_eq!(field.path.template(), "*.price");
        assert_eq!(field.name(&[3]), "3.price");
    }

    #[test]
    fn same_key_in_one_template_shares_path_and_is_not_deduplicated() {
        let layout = layout(json!([
            {"type": "section", "id": "s1", "children": [
                {"type": "repeater", "id": "rep1", "children": [
                    {"type": "field", "id": "n1", "fieldKey": "price"},
                    {"type": "field", "id": "n2", "fieldKey": "price"}
                ]}
            ]}
        ]));
        let res = resolve(&layout, &defs());
        assert_eq!(res.len(), 2);
        assert_eq!(res.fields()[0].path, res.fields()[1].path);
    }

    #[test]
    fn containers_contribute_nothing_to_paths() {
        let layout = layout(json!([
            {"type": "section", "id": "s1", "children": [
                {"type": "row", "id": "r1", "columns": [
                    {"type": "column", "id": "c1", "span": 6, "children": [
                        {"type": "field", "id": "n1", "fieldKey": "name"}
                    ]}
                ]}
            ]}
        ]));
        let res = resolve(&layout, &defs());
        assert_eq!(res.fields()[0].path.template(), "name");
    }

    #[test]
    fn tabs_resolve_in_declared_tab_order_and_tolerate_missing_entries() {
        let layout = layout(json!([
            {"type": "tabs", "id": "t1",
             "tabs": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
             "tabsChildren": {
                "c": [{"type": "field", "id": "n2", "fieldKey": "price"}],
                "a": [{"type": "field", "id": "n1", "fieldKey": "name"}]
             }}
        ]));
        let res = resolve(&layout, &defs());
        let templates: Vec<_> = res.iter().map(|f| f.path.template()).collect();
        assert_eq!(templates, vec!["name", "price"]);
    }

    #[test]
    fn alias_index_first_writer_wins() {
        let layout = layout(json!([
            {"type": "section", "id": "s1", "children": [
                {"type": "field", "id": "n1", "fieldKey": "price"},
                {"type": "field", "id": "n2", "fieldKey": "price"}
            ]}
        ]));
        let res = resolve(&layout, &defs());
        // "price" aliases the first node; node ids stay distinct.
        assert_eq!(res.lookup("price").unwrap().node_id.as_str(), "n1");
        assert_eq!(res.lookup("n2").unwrap().node_id.as_str(), "n2");
        assert_eq!(res.lookup("d2").unwrap().node_id.as_str(), "n1");
    }

    #[test]
    fn section_hide_clauses_are_inherited() {
        let layout = layout(json!([
            {"type": "section", "id": "s1",
             "condicionesOcultar": [{"key": "mode", "op": "eq", "value": "simple"}],
             "children": [
                {"type": "field", "id": "n1", "fieldKey": "name"}
             ]}
        ]));
        let res = resolve(&layout, &defs());
        assert_eq!(res.fields()[0].section_hide.len(), 1);
        assert_eq!(res.fields()[0].section_hide[0][0].key, "mode");
    }
}
