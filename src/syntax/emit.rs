//! Serialization of the syntax model back to Python source
//!
//! Indentation is normalized to four spaces per level. Verbatim text keeps
//! its continuation lines untouched: those only occur inside brackets,
//! strings or after a backslash, where Python ignores indentation.

use super::{Expr, Module, Stmt};
use std::fmt::Write as _;

const INDENT: &str = "    ";

/// Render a module as Python source text
pub fn unparse(module: &Module) -> String {
    let mut writer = SourceWriter::default();
    writer.body(&module.body);
    writer.out
}

#[derive(Default)]
struct SourceWriter {
    out: String,
    depth: usize,
}

impl SourceWriter {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn line(&mut self, text: &str) {
        self.indent();
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// First line at the current depth, the rest exactly as written
    fn verbatim(&mut self, text: &str) {
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            self.indent();
            self.out.push_str(first.trim_start());
        }
        for rest in lines {
            self.out.push('\n');
            self.out.push_str(rest);
        }
        self.out.push('\n');
    }

    fn block(&mut self, body: &[Stmt]) {
        self.depth += 1;
        self.body(body);
        self.depth -= 1;
    }

    fn body(&mut self, body: &[Stmt]) {
        if body.is_empty() && self.depth > 0 {
            self.line("pass");
            return;
        }
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(func) => {
                for decorator in &func.decorators {
                    self.verbatim(decorator);
                }
                self.verbatim(&func.header);
                self.block(&func.body);
            }
            Stmt::ClassDef(class) => {
                for decorator in &class.decorators {
                    self.verbatim(decorator);
                }
                self.verbatim(&class.header);
                self.block(&class.body);
            }
            Stmt::Compound(compound) => {
                for clause in &compound.clauses {
                    self.verbatim(&clause.header);
                    self.block(&clause.body);
                }
            }
            Stmt::Simple(simple) => self.verbatim(&simple.text),
            Stmt::Assign(assign) => {
                let mut text = format!("{} = ", assign.target);
                render_expr(&assign.value, &mut text);
                self.line(&text);
            }
            Stmt::Expr(expr) => {
                let mut text = String::new();
                render_expr(expr, &mut text);
                self.line(&text);
            }
            Stmt::Import(import) => match &import.alias {
                Some(alias) => self.line(&format!("import {} as {}", import.module, alias)),
                None => self.line(&format!("import {}", import.module)),
            },
            Stmt::TryFinally(try_finally) => {
                self.line("try:");
                self.block(&try_finally.body);
                self.line("finally:");
                self.block(&try_finally.finalbody);
            }
        }
    }
}

fn render_operand(expr: &Expr, out: &mut String) {
    if matches!(expr, Expr::BinOp { .. }) {
        out.push('(');
        render_expr(expr, out);
        out.push(')');
    } else {
        render_expr(expr, out);
    }
}

fn render_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Name(id) => out.push_str(id),
        Expr::Attribute { value, attr } => {
            render_operand(value, out);
            out.push('.');
            out.push_str(attr);
        }
        Expr::Call { func, args } => {
            render_operand(func, out);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_expr(arg, out);
            }
            out.push(')');
        }
        Expr::BinOp { left, op, right } => {
            render_operand(left, out);
            let _ = write!(out, " {} ", op.symbol());
            render_operand(right, out);
        }
        Expr::Str(s) => out.push_str(&python_string_literal(s)),
    }
}

/// Quote a string as a single-quoted Python literal
pub fn python_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
