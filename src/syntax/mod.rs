//! Syntax model for Python sources
//!
//! A tagged-variant tree that is just rich enough to rewrite function bodies
//! and print the result back as valid Python:
//! - Function, class and compound statements keep their header text and own
//!   a nested body, so the tree can be walked and mutated
//! - Simple statements are kept as verbatim source text
//! - Synthetic statements (assignments, calls, imports, try/finally) are
//!   structured and rendered by the emitter
//!
//! Parsing is done by tree-sitter-python; `lower` turns its concrete tree into
//! this model.

mod emit;
mod lower;
mod visit;

pub use emit::{python_string_literal, unparse};
pub use lower::SyntaxError;
pub use visit::{
    walk_body, walk_body_mut, walk_class_def, walk_class_def_mut, walk_function_def,
    walk_function_def_mut, walk_module, walk_module_mut, walk_stmt, walk_stmt_mut, Visit,
    VisitMut,
};

use std::collections::BTreeSet;

/// Parsed Python module
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `def` / `async def`, possibly decorated
    FunctionDef(FunctionDef),
    /// `class`, possibly decorated
    ClassDef(ClassDef),
    /// `if`, `for`, `while`, `try`, `with`, `match`, `case`
    Compound(Compound),
    /// Any statement without a nested body, kept as source text
    Simple(Simple),
    /// `target = value`
    Assign(Assign),
    /// Expression statement
    Expr(Expr),
    /// `import module [as alias]`
    Import(Import),
    /// `try: ... finally: ...`
    TryFinally(TryFinally),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub is_async: bool,
    pub decorators: Vec<String>,
    /// Source text from `def` (or `async`) up to and including the colon
    pub header: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub decorators: Vec<String>,
    pub header: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub clauses: Vec<Clause>,
}

/// One header/body pair of a compound statement (`if`, `elif`, `else`, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub header: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Simple {
    pub text: String,
    pub kind: SimpleKind,
}

/// Simple statements that matter for placement decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    /// Bare string literal (a docstring when it is the first statement)
    StringLiteral,
    /// `from __future__ import ...`
    FutureImport,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryFinally {
    pub body: Vec<Stmt>,
    pub finalbody: Vec<Stmt>,
}

/// Expression kinds used by synthetic statements
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Attribute { value: Box<Expr>, attr: String },
    Call { func: Box<Expr>, args: Vec<Expr> },
    BinOp { left: Box<Expr>, op: Operator, right: Box<Expr> },
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
        }
    }
}

impl Expr {
    pub fn name(id: impl Into<String>) -> Self {
        Expr::Name(id.into())
    }

    pub fn attr(value: Expr, attr: impl Into<String>) -> Self {
        Expr::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: Box::new(func),
            args,
        }
    }

    pub fn binop(left: Expr, op: Operator, right: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

impl Stmt {
    /// Verbatim simple statement of kind `Other`
    pub fn simple(text: impl Into<String>) -> Self {
        Stmt::Simple(Simple {
            text: text.into(),
            kind: SimpleKind::Other,
        })
    }

    pub fn assign(target: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign(Assign {
            target: target.into(),
            value,
        })
    }

    pub fn is_string_literal(&self) -> bool {
        matches!(
            self,
            Stmt::Simple(Simple {
                kind: SimpleKind::StringLiteral,
                ..
            })
        )
    }

    pub fn is_future_import(&self) -> bool {
        matches!(
            self,
            Stmt::Simple(Simple {
                kind: SimpleKind::FutureImport,
                ..
            })
        )
    }
}

/// Index of the first statement after a leading docstring
pub fn docstring_offset(body: &[Stmt]) -> usize {
    match body.first() {
        Some(stmt) if stmt.is_string_literal() => 1,
        _ => 0,
    }
}

/// Source text together with its parsed tree
///
/// Immutable once parsed. Consumers that rewrite the tree work on a clone of
/// [`SourceUnit::module`].
#[derive(Debug, Clone)]
pub struct SourceUnit {
    text: String,
    module: Module,
    identifiers: BTreeSet<String>,
}

impl SourceUnit {
    /// Parse Python source text
    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        // tree-sitter handles CRLF, but verbatim statement text must not carry
        // stray carriage returns into re-indented output
        let text = text.replace("\r\n", "\n");
        let (module, identifiers) = lower::parse_module(&text)?;
        Ok(Self {
            text,
            module,
            identifiers,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Every identifier token that appears anywhere in the source
    pub fn identifiers(&self) -> &BTreeSet<String> {
        &self.identifiers
    }
}

/// Qualified names of every function in a module, in source order
pub fn function_qualnames(module: &Module) -> Vec<String> {
    struct Collector {
        scopes: Vec<Scope>,
        names: Vec<String>,
    }

    impl Visit for Collector {
        fn visit_function_def(&mut self, func: &FunctionDef) {
            self.names.push(qualname(&self.scopes, &func.name));
            self.scopes.push(Scope::Function(func.name.clone()));
            walk_function_def(self, func);
            self.scopes.pop();
        }

        fn visit_class_def(&mut self, class: &ClassDef) {
            self.scopes.push(Scope::Class(class.name.clone()));
            walk_class_def(self, class);
            self.scopes.pop();
        }
    }

    let mut collector = Collector {
        scopes: Vec::new(),
        names: Vec::new(),
    };
    collector.visit_module(module);
    collector.names
}

/// Enclosing definition of a node, used to build qualified names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Function(String),
    Class(String),
}

/// Build a `__qualname__`-style name (`Outer.method`, `outer.<locals>.inner`)
pub fn qualname(scopes: &[Scope], name: &str) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(scopes.len() * 2 + 1);
    for scope in scopes {
        match scope {
            Scope::Function(n) => {
                parts.push(n);
                parts.push("<locals>");
            }
            Scope::Class(n) => parts.push(n),
        }
    }
    parts.push(name);
    parts.join(".")
}
