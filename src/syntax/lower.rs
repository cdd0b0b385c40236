//! Lowering from the tree-sitter concrete tree to the syntax model

use super::{Clause, ClassDef, Compound, FunctionDef, Module, Simple, SimpleKind, Stmt};
use std::collections::BTreeSet;
use std::ops::Range;
use thiserror::Error;
use tree_sitter::{Node, Parser};

/// Clause nodes that continue a compound statement after its first block
const CLAUSE_KINDS: &[&str] = &[
    "elif_clause",
    "else_clause",
    "except_clause",
    "except_group_clause",
    "finally_clause",
];

/// Extras that may show up between statements
const SKIPPED_KINDS: &[&str] = &["comment", "line_continuation"];

/// Python 2 statements the grammar still accepts but Python 3 rejects
const LEGACY_STATEMENTS: &[(&str, &str)] = &[
    ("print_statement", "Missing parentheses in call to 'print'"),
    ("exec_statement", "Missing parentheses in call to 'exec'"),
];

/// Source that tree-sitter could not parse cleanly
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}, column {column}: {message}")]
pub struct SyntaxError {
    /// 1-based line
    pub line: usize,
    /// 1-based column (bytes)
    pub column: usize,
    pub message: String,
}

/// Parse source text into a module and the set of identifiers it mentions
pub(super) fn parse_module(source: &str) -> Result<(Module, BTreeSet<String>), SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| SyntaxError {
            line: 0,
            column: 0,
            message: format!("Python grammar unavailable: {}", e),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| SyntaxError {
        line: 0,
        column: 0,
        message: "parser produced no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(first_error(root));
    }
    if let Some(err) = first_legacy_statement(root) {
        return Err(err);
    }

    let lowerer = Lowerer { source };
    let module = Module {
        body: lowerer.lower_body(root),
    };
    Ok((module, lowerer.identifiers(root)))
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Locate the first ERROR or MISSING node in source order
fn first_error(root: Node<'_>) -> SyntaxError {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            return SyntaxError {
                line: pos.row + 1,
                column: pos.column + 1,
                message,
            };
        }
        // Reverse so the leftmost child is popped first
        for child in children(node).into_iter().rev() {
            if child.has_error() {
                stack.push(child);
            }
        }
    }

    let pos = root.start_position();
    SyntaxError {
        line: pos.row + 1,
        column: pos.column + 1,
        message: "invalid syntax".to_string(),
    }
}

/// Locate the first Python 2 only statement in source order
fn first_legacy_statement(root: Node<'_>) -> Option<SyntaxError> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let legacy = LEGACY_STATEMENTS
            .iter()
            .find(|(kind, _)| *kind == node.kind());
        if let Some((_, message)) = legacy {
            let pos = node.start_position();
            return Some(SyntaxError {
                line: pos.row + 1,
                column: pos.column + 1,
                message: message.to_string(),
            });
        }
        stack.extend(children(node).into_iter().rev());
    }
    None
}

struct Lowerer<'a> {
    source: &'a str,
}

impl<'a> Lowerer<'a> {
    fn text(&self, range: Range<usize>) -> &'a str {
        self.source.get(range).unwrap_or("")
    }

    fn node_text(&self, node: Node<'_>) -> &'a str {
        self.text(node.byte_range())
    }

    fn identifiers(&self, root: Node<'_>) -> BTreeSet<String> {
        let mut identifiers = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind() == "identifier" {
                identifiers.insert(self.node_text(node).to_string());
            }
            stack.extend(children(node));
        }
        identifiers
    }

    /// Lower the statements of a `module` or `block` node
    fn lower_body(&self, node: Node<'_>) -> Vec<Stmt> {
        named_children(node)
            .into_iter()
            .filter_map(|child| self.lower_stmt(child))
            .collect()
    }

    fn lower_stmt(&self, node: Node<'_>) -> Option<Stmt> {
        match node.kind() {
            kind if SKIPPED_KINDS.contains(&kind) => None,
            "function_definition" => Some(Stmt::FunctionDef(self.lower_function(node, Vec::new()))),
            "class_definition" => Some(Stmt::ClassDef(self.lower_class(node, Vec::new()))),
            "decorated_definition" => self.lower_decorated(node),
            _ if has_block(node) => {
                let mut clauses = Vec::new();
                self.collect_clauses(node, &mut clauses);
                Some(Stmt::Compound(Compound { clauses }))
            }
            _ => Some(Stmt::Simple(self.lower_simple(node))),
        }
    }

    fn lower_decorated(&self, node: Node<'_>) -> Option<Stmt> {
        let decorators: Vec<String> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .map(|child| self.node_text(child).to_string())
            .collect();

        let definition = node.child_by_field_name("definition")?;
        match definition.kind() {
            "function_definition" => {
                Some(Stmt::FunctionDef(self.lower_function(definition, decorators)))
            }
            "class_definition" => Some(Stmt::ClassDef(self.lower_class(definition, decorators))),
            _ => Some(Stmt::simple(self.node_text(node))),
        }
    }

    /// Header text runs from the start of `node` to the start of its body
    fn header(&self, node: Node<'_>, body: Option<Node<'_>>) -> String {
        let end = body.map_or(node.end_byte(), |b| b.start_byte());
        self.text(node.start_byte()..end).trim_end().to_string()
    }

    fn lower_function(&self, node: Node<'_>, decorators: Vec<String>) -> FunctionDef {
        let body = node.child_by_field_name("body");
        FunctionDef {
            name: node
                .child_by_field_name("name")
                .map(|n| self.node_text(n).to_string())
                .unwrap_or_default(),
            is_async: children(node).first().is_some_and(|c| c.kind() == "async"),
            decorators,
            header: self.header(node, body),
            body: body.map(|b| self.lower_body(b)).unwrap_or_default(),
        }
    }

    fn lower_class(&self, node: Node<'_>, decorators: Vec<String>) -> ClassDef {
        let body = node.child_by_field_name("body");
        ClassDef {
            name: node
                .child_by_field_name("name")
                .map(|n| self.node_text(n).to_string())
                .unwrap_or_default(),
            decorators,
            header: self.header(node, body),
            body: body.map(|b| self.lower_body(b)).unwrap_or_default(),
        }
    }

    /// Flatten `if/elif/else`, `try/except/finally` and friends into clauses
    fn collect_clauses(&self, node: Node<'_>, clauses: &mut Vec<Clause>) {
        let mut header_start = Some(node.start_byte());
        for child in children(node) {
            match child.kind() {
                "block" => {
                    let start = header_start.take().unwrap_or(child.start_byte());
                    clauses.push(Clause {
                        header: self
                            .text(start..child.start_byte())
                            .trim_end()
                            .to_string(),
                        body: self.lower_body(child),
                    });
                }
                kind if CLAUSE_KINDS.contains(&kind) => self.collect_clauses(child, clauses),
                kind if SKIPPED_KINDS.contains(&kind) => {}
                _ => {
                    if header_start.is_none() {
                        header_start = Some(child.start_byte());
                    }
                }
            }
        }
    }

    fn lower_simple(&self, node: Node<'_>) -> Simple {
        let kind = match node.kind() {
            "future_import_statement" => SimpleKind::FutureImport,
            "expression_statement" if is_string_statement(node) => SimpleKind::StringLiteral,
            _ => SimpleKind::Other,
        };
        Simple {
            text: self.node_text(node).to_string(),
            kind,
        }
    }
}

/// True for nodes that own a nested block (directly or through a clause)
fn has_block(node: Node<'_>) -> bool {
    children(node)
        .iter()
        .any(|c| c.kind() == "block" || CLAUSE_KINDS.contains(&c.kind()))
}

/// Expression statement consisting of one plain (non f-) string literal
fn is_string_statement(node: Node<'_>) -> bool {
    let named = named_children(node);
    match named.as_slice() {
        [only] => is_plain_string(*only),
        _ => false,
    }
}

fn is_plain_string(node: Node<'_>) -> bool {
    match node.kind() {
        "string" => !children(node).iter().any(|c| c.kind() == "interpolation"),
        "concatenated_string" => named_children(node)
            .into_iter()
            .filter(|c| !SKIPPED_KINDS.contains(&c.kind()))
            .all(is_plain_string),
        _ => false,
    }
}
