//! Scope tree construction and definition numbering.
//!
//! Function, method, and type scopes are always rooted directly under `/`
//! (function scopes: `/<name>`; methods: `/<Receiver>_<Name>`). Block scopes
//! nest under whichever scope dynamically encloses them, numbered `if_<n>`
//! by source order *within that parent* — every block-bearing construct
//! counts toward the same ordinal, regardless of whether it originated from
//! an `if`, a loop, or a `switch`; the counter never distinguishes construct
//! kind, so `if_2` might immediately follow a `for` loop in the same scope.

use std::collections::HashMap;

use gonav_common::model::{Definition, Position, Range, Scope, ScopeType, SymbolKind};

use crate::loader::{RawDefinition, RawScopeNode};

const ROOT_SCOPE_ID: &str = "/";

/// Output of walking one file's raw scope tree.
pub struct ScopeExtraction {
    pub scopes: Vec<Scope>,
    pub definitions: Vec<Definition>,
    /// `(line, col) -> def_id`, used by the reference pass to resolve
    /// `RawResolution::Local` back to a generated definition id.
    pub def_positions: HashMap<(u32, u32), String>,
}

pub fn extract(root: &RawScopeNode) -> ScopeExtraction {
    let mut scopes = Vec::new();
    let mut definitions = Vec::new();
    let mut def_positions = HashMap::new();
    let mut def_counter = 0usize;
    let mut block_counters: HashMap<String, usize> = HashMap::new();

    // The raw root node itself represents the file's implicit `/` scope: we
    // do not emit a Scope record for it, but its direct definitions (e.g.
    // top-level function/type/var/const names) are attached at scope_id "/".
    emit_definitions(
        root,
        ROOT_SCOPE_ID,
        &mut def_counter,
        &mut definitions,
        &mut def_positions,
    );

    for child in &root.children {
        walk(
            child,
            ROOT_SCOPE_ID,
            &mut scopes,
            &mut definitions,
            &mut def_positions,
            &mut def_counter,
            &mut block_counters,
        );
    }

    ScopeExtraction {
        scopes,
        definitions,
        def_positions,
    }
}

fn walk(
    node: &RawScopeNode,
    dynamic_parent_id: &str,
    scopes: &mut Vec<Scope>,
    definitions: &mut Vec<Definition>,
    def_positions: &mut HashMap<(u32, u32), String>,
    def_counter: &mut usize,
    block_counters: &mut HashMap<String, usize>,
) {
    let (scope_id, scope_type) = match node.kind.as_str() {
        "function" => (
            format!("/{}", node.name.clone().unwrap_or_default()),
            ScopeType::Function,
        ),
        "type" => (
            format!("/{}", node.name.clone().unwrap_or_default()),
            ScopeType::Type,
        ),
        "method" => {
            let receiver = node
                .receiver
                .as_ref()
                .map(|r| r.type_name.clone())
                .unwrap_or_default();
            let name = node.name.clone().unwrap_or_default();
            (format!("/{receiver}_{name}"), ScopeType::Method)
        }
        _ => {
            let ordinal = block_counters
                .entry(dynamic_parent_id.to_string())
                .and_modify(|n| *n += 1)
                .or_insert(1);
            (format!("{dynamic_parent_id}/if_{ordinal}"), ScopeType::Block)
        }
    };

    scopes.push(Scope {
        id: scope_id.clone(),
        kind: scope_type,
        name: node.name.clone(),
        range: Range {
            start: Position { line: node.start.line, col: node.start.col },
            end: Position { line: node.end.line, col: node.end.col },
        },
    });

    emit_definitions(node, &scope_id, def_counter, definitions, def_positions);

    // Function/method/type scopes reset the block ordinal namespace for
    // their own direct children (each parent id gets its own counter entry
    // on first use above); nested blocks recurse with this node's id as the
    // new dynamic parent regardless of scope kind.
    for child in &node.children {
        walk(
            child,
            &scope_id,
            scopes,
            definitions,
            def_positions,
            def_counter,
            block_counters,
        );
    }
}

fn emit_definitions(
    node: &RawScopeNode,
    scope_id: &str,
    def_counter: &mut usize,
    definitions: &mut Vec<Definition>,
    def_positions: &mut HashMap<(u32, u32), String>,
) {
    for raw in &node.definitions {
        *def_counter += 1;
        let id = format!("def_{def_counter}");
        def_positions.insert((raw.line, raw.column), id.clone());
        definitions.push(Definition {
            id,
            name: raw.name.clone(),
            kind: map_kind(&raw.kind),
            line: raw.line,
            column: raw.column,
            scope_id: scope_id.to_string(),
            signature: raw.signature.clone(),
        });
    }
}

fn map_kind(raw: &str) -> SymbolKind {
    match raw {
        "function" => SymbolKind::Function,
        "type" => SymbolKind::Type,
        "variable" => SymbolKind::Variable,
        "constant" => SymbolKind::Constant,
        "field" => SymbolKind::Field,
        "package" => SymbolKind::Package,
        _ => SymbolKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RawPos;

    fn pos(line: u32, col: u32) -> RawPos {
        RawPos { line, col }
    }

    fn leaf(kind: &str, name: Option<&str>, defs: Vec<RawDefinition>, children: Vec<RawScopeNode>) -> RawScopeNode {
        RawScopeNode {
            kind: kind.to_string(),
            name: name.map(String::from),
            receiver: None,
            start: pos(1, 1),
            end: pos(99, 1),
            definitions: defs,
            children,
        }
    }

    fn def(name: &str, line: u32, col: u32) -> RawDefinition {
        RawDefinition {
            name: name.to_string(),
            kind: "variable".to_string(),
            line,
            column: col,
            signature: "int".to_string(),
        }
    }

    #[test]
    fn function_scope_rooted_at_slash() {
        let root = leaf("root", None, vec![], vec![leaf("function", Some("New"), vec![], vec![])]);
        let result = extract(&root);
        assert_eq!(result.scopes[0].id, "/New");
    }

    #[test]
    fn blocks_numbered_in_source_order_within_parent() {
        let func = leaf(
            "function",
            Some("Run"),
            vec![],
            vec![
                leaf("block", None, vec![], vec![]),
                leaf("block", None, vec![], vec![]),
            ],
        );
        let root = leaf("root", None, vec![], vec![func]);
        let result = extract(&root);
        let ids: Vec<&str> = result.scopes.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"/Run/if_1"));
        assert!(ids.contains(&"/Run/if_2"));
    }

    #[test]
    fn nested_blocks_chain_under_enclosing_block() {
        let inner_block = leaf("block", None, vec![], vec![]);
        let outer_block = leaf("block", None, vec![], vec![inner_block]);
        let func = leaf("function", Some("Run"), vec![], vec![outer_block]);
        let root = leaf("root", None, vec![], vec![func]);
        let result = extract(&root);
        let ids: Vec<&str> = result.scopes.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"/Run/if_1"));
        assert!(ids.contains(&"/Run/if_1/if_1"));
    }

    #[test]
    fn method_scope_uses_receiver_underscore_name() {
        let mut method = leaf("method", Some("Write"), vec![], vec![]);
        method.receiver = Some(crate::loader::RawReceiver { type_name: "Buffer".into(), is_pointer: true });
        let root = leaf("root", None, vec![], vec![method]);
        let result = extract(&root);
        assert_eq!(result.scopes[0].id, "/Buffer_Write");
    }

    #[test]
    fn function_declaration_definition_is_global_scope() {
        let root = leaf("root", None, vec![def("New", 5, 6)], vec![]);
        let result = extract(&root);
        assert_eq!(result.definitions[0].scope_id, "/");
    }

    #[test]
    fn definition_ids_are_monotonic_and_unique() {
        let func = leaf("function", Some("Run"), vec![def("x", 2, 2)], vec![]);
        let root = leaf("root", None, vec![def("Run", 1, 1)], vec![func]);
        let result = extract(&root);
        let ids: Vec<&str> = result.definitions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["def_1", "def_2"]);
    }
}
