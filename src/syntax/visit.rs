//! Visitors over the syntax model
//!
//! Each `visit_*` method defaults to the matching `walk_*` function, so an
//! implementation overrides only the nodes it cares about and calls `walk_*`
//! to keep descending.

use super::{ClassDef, FunctionDef, Module, Stmt};

/// Read-only traversal
pub trait Visit {
    fn visit_module(&mut self, module: &Module) {
        walk_module(self, module);
    }

    fn visit_body(&mut self, body: &[Stmt]) {
        walk_body(self, body);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_function_def(&mut self, func: &FunctionDef) {
        walk_function_def(self, func);
    }

    fn visit_class_def(&mut self, class: &ClassDef) {
        walk_class_def(self, class);
    }
}

pub fn walk_module<V: Visit + ?Sized>(v: &mut V, module: &Module) {
    v.visit_body(&module.body);
}

pub fn walk_body<V: Visit + ?Sized>(v: &mut V, body: &[Stmt]) {
    for stmt in body {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::FunctionDef(func) => v.visit_function_def(func),
        Stmt::ClassDef(class) => v.visit_class_def(class),
        Stmt::Compound(compound) => {
            for clause in &compound.clauses {
                v.visit_body(&clause.body);
            }
        }
        Stmt::TryFinally(try_finally) => {
            v.visit_body(&try_finally.body);
            v.visit_body(&try_finally.finalbody);
        }
        Stmt::Simple(_) | Stmt::Assign(_) | Stmt::Expr(_) | Stmt::Import(_) => {}
    }
}

pub fn walk_function_def<V: Visit + ?Sized>(v: &mut V, func: &FunctionDef) {
    v.visit_body(&func.body);
}

pub fn walk_class_def<V: Visit + ?Sized>(v: &mut V, class: &ClassDef) {
    v.visit_body(&class.body);
}

/// Mutating traversal
pub trait VisitMut {
    fn visit_module_mut(&mut self, module: &mut Module) {
        walk_module_mut(self, module);
    }

    fn visit_body_mut(&mut self, body: &mut Vec<Stmt>) {
        walk_body_mut(self, body);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_function_def_mut(&mut self, func: &mut FunctionDef) {
        walk_function_def_mut(self, func);
    }

    fn visit_class_def_mut(&mut self, class: &mut ClassDef) {
        walk_class_def_mut(self, class);
    }
}

pub fn walk_module_mut<V: VisitMut + ?Sized>(v: &mut V, module: &mut Module) {
    v.visit_body_mut(&mut module.body);
}

pub fn walk_body_mut<V: VisitMut + ?Sized>(v: &mut V, body: &mut Vec<Stmt>) {
    for stmt in body.iter_mut() {
        v.visit_stmt_mut(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::FunctionDef(func) => v.visit_function_def_mut(func),
        Stmt::ClassDef(class) => v.visit_class_def_mut(class),
        Stmt::Compound(compound) => {
            for clause in &mut compound.clauses {
                v.visit_body_mut(&mut clause.body);
            }
        }
        Stmt::TryFinally(try_finally) => {
            v.visit_body_mut(&mut try_finally.body);
            v.visit_body_mut(&mut try_finally.finalbody);
        }
        Stmt::Simple(_) | Stmt::Assign(_) | Stmt::Expr(_) | Stmt::Import(_) => {}
    }
}

pub fn walk_function_def_mut<V: VisitMut + ?Sized>(v: &mut V, func: &mut FunctionDef) {
    v.visit_body_mut(&mut func.body);
}

pub fn walk_class_def_mut<V: VisitMut + ?Sized>(v: &mut V, class: &mut ClassDef) {
    v.visit_body_mut(&mut class.body);
}
