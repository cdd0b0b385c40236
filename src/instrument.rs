//! Source instrumentation: timing probes for every Python function
//!
//! Each function definition (nested functions, methods, decorated and async
//! functions included) receives a probe:
//!
//! ```text
//! _tprobe_start = _tprobe_time.perf_counter()
//! _tprobe_end = _tprobe_time.perf_counter()
//! _tprobe_duration = _tprobe_end - _tprobe_start
//! _tprobe_builtins.print('Function add took:', _tprobe_duration)
//! ```
//!
//! The module gains `import time as _tprobe_time` and
//! `import builtins as _tprobe_builtins`, so neither the clock nor `print`
//! can be shadowed by a user binding.
//!
//! With [`ProbePlacement::Prologue`] the four statements open the body, so
//! the duration covers only the probe itself. [`ProbePlacement::Enclosing`]
//! wraps the original body in `try`/`finally` and measures every exit path.
//!
//! # Example
//!
//! ```
//! use timeprobe::instrument::{Instrumenter, ProbePlacement};
//!
//! let out = Instrumenter::new(ProbePlacement::Prologue)
//!     .instrument_source("def add(a, b):\n    return a + b\n")
//!     .unwrap();
//! assert_eq!(out.functions, vec!["add".to_string()]);
//! assert!(out.source.contains("_tprobe_builtins.print('Function add took:', _tprobe_duration)"));
//! ```

use crate::error::{ProbeError, Result};
use crate::syntax::{
    self, docstring_offset, qualname, walk_class_def_mut, walk_function_def_mut, ClassDef, Expr,
    FunctionDef, Import, Module, Operator, Scope, SourceUnit, Stmt, SyntaxError, TryFinally,
    VisitMut,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to the file stem of the instrumented artifact
pub const ARTIFACT_SUFFIX: &str = "_instrumented";

/// Where probe statements go inside a function body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbePlacement {
    /// All four statements before the original body
    #[default]
    Prologue,
    /// Start before the body, end/duration/emission in a `finally` after it
    Enclosing,
}

/// Identifiers used by injected statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeNames {
    pub start: String,
    pub end: String,
    pub duration: String,
    pub time_module: String,
    pub builtins_module: String,
}

impl ProbeNames {
    const BASES: [&'static str; 5] = [
        "_tprobe_start",
        "_tprobe_end",
        "_tprobe_duration",
        "_tprobe_time",
        "_tprobe_builtins",
    ];

    /// Pick names that do not appear among `taken`
    ///
    /// Tries the plain names first, then `_1`, `_2`, ... applied to all five at
    /// once. Deterministic for a given identifier set.
    pub fn avoiding(taken: &BTreeSet<String>) -> Self {
        let mut suffix = 0usize;
        loop {
            let names: Vec<String> = Self::BASES
                .iter()
                .map(|base| {
                    if suffix == 0 {
                        base.to_string()
                    } else {
                        format!("{}_{}", base, suffix)
                    }
                })
                .collect();

            if names.iter().all(|n| !taken.contains(n)) {
                let mut names = names.into_iter();
                // BASES has exactly five entries
                return Self {
                    start: names.next().unwrap_or_default(),
                    end: names.next().unwrap_or_default(),
                    duration: names.next().unwrap_or_default(),
                    time_module: names.next().unwrap_or_default(),
                    builtins_module: names.next().unwrap_or_default(),
                };
            }
            suffix += 1;
        }
    }
}

/// Result of instrumenting source text in memory
#[derive(Debug, Clone)]
pub struct Instrumented {
    /// Complete artifact source
    pub source: String,
    /// Qualified names of probed functions, in source order
    pub functions: Vec<String>,
    pub names: ProbeNames,
}

/// Instrumented file persisted next to the original
#[derive(Debug, Clone)]
pub struct InstrumentedArtifact {
    pub path: PathBuf,
    pub functions: Vec<String>,
}

/// Rewrites Python sources with timing probes
#[derive(Debug, Clone, Copy, Default)]
pub struct Instrumenter {
    placement: ProbePlacement,
}

impl Instrumenter {
    pub fn new(placement: ProbePlacement) -> Self {
        Self { placement }
    }

    pub fn placement(&self) -> ProbePlacement {
        self.placement
    }

    /// Instrument source text without touching the filesystem
    pub fn instrument_source(&self, text: &str) -> std::result::Result<Instrumented, SyntaxError> {
        let unit = SourceUnit::parse(text)?;
        let names = ProbeNames::avoiding(unit.identifiers());

        let mut module = unit.module().clone();
        let mut injector = ProbeInjector {
            names: &names,
            placement: self.placement,
            scopes: Vec::new(),
            probed: Vec::new(),
        };
        injector.visit_module_mut(&mut module);
        let functions = injector.probed;

        insert_probe_imports(&mut module, &names);

        Ok(Instrumented {
            source: syntax::unparse(&module),
            functions,
            names,
        })
    }

    /// Instrument a file and write `<stem>_instrumented<ext>` next to it
    pub fn instrument_file(&self, path: &Path) -> Result<InstrumentedArtifact> {
        if !path.exists() {
            return Err(ProbeError::InputNotFound(path.to_path_buf()));
        }

        let text = fs::read_to_string(path).map_err(|source| ProbeError::ReadFailure {
            path: path.to_path_buf(),
            source,
        })?;

        let instrumented = self
            .instrument_source(&text)
            .map_err(|e| ProbeError::ParseFailure {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        debug!(
            functions = instrumented.functions.len(),
            placement = ?self.placement,
            "Probes injected"
        );

        let dest = instrumented_path(path);
        write_atomically(&dest, instrumented.source.as_bytes())?;
        info!("Instrumented code written to {}", dest.display());

        Ok(InstrumentedArtifact {
            path: dest,
            functions: instrumented.functions,
        })
    }
}

/// Derive the artifact path: `dir/name.py` becomes `dir/name_instrumented.py`
pub fn instrumented_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, ARTIFACT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, ARTIFACT_SUFFIX),
    };
    path.with_file_name(name)
}

/// Write through a temporary file in the destination directory, then rename
fn write_atomically(dest: &Path, contents: &[u8]) -> Result<()> {
    let write_failure = |source| ProbeError::WriteFailure {
        path: dest.to_path_buf(),
        source,
    };

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_failure)?;
    tmp.write_all(contents).map_err(write_failure)?;
    tmp.flush().map_err(write_failure)?;
    tmp.persist(dest).map_err(|e| write_failure(e.error))?;
    Ok(())
}

/// Add the aliased `time` and `builtins` imports after the docstring and
/// `__future__` imports
fn insert_probe_imports(module: &mut Module, names: &ProbeNames) {
    let mut pos = docstring_offset(&module.body);
    while module.body.get(pos).is_some_and(Stmt::is_future_import) {
        pos += 1;
    }
    let imports = [("time", &names.time_module), ("builtins", &names.builtins_module)];
    for (offset, (name, alias)) in imports.into_iter().enumerate() {
        module.body.insert(
            pos + offset,
            Stmt::Import(Import {
                module: name.to_string(),
                alias: Some(alias.to_string()),
            }),
        );
    }
}

struct ProbeInjector<'a> {
    names: &'a ProbeNames,
    placement: ProbePlacement,
    scopes: Vec<Scope>,
    probed: Vec<String>,
}

impl ProbeInjector<'_> {
    fn timestamp(&self, target: &str) -> Stmt {
        Stmt::assign(
            target,
            Expr::call(
                Expr::attr(Expr::name(&self.names.time_module), "perf_counter"),
                Vec::new(),
            ),
        )
    }

    fn duration(&self) -> Stmt {
        Stmt::assign(
            &self.names.duration,
            Expr::binop(
                Expr::name(&self.names.end),
                Operator::Sub,
                Expr::name(&self.names.start),
            ),
        )
    }

    fn emission(&self, qualname: &str) -> Stmt {
        Stmt::Expr(Expr::call(
            Expr::attr(Expr::name(&self.names.builtins_module), "print"),
            vec![
                Expr::Str(format!("Function {} took:", qualname)),
                Expr::name(&self.names.duration),
            ],
        ))
    }

    fn inject(&self, body: &mut Vec<Stmt>, qualname: &str) {
        let offset = docstring_offset(body);
        match self.placement {
            ProbePlacement::Prologue => {
                let probe = [
                    self.timestamp(&self.names.start),
                    self.timestamp(&self.names.end),
                    self.duration(),
                    self.emission(qualname),
                ];
                let original = body.split_off(offset);
                body.extend(probe);
                body.extend(original);
            }
            ProbePlacement::Enclosing => {
                let mut original = body.split_off(offset);
                if original.is_empty() {
                    original.push(Stmt::simple("pass"));
                }
                body.push(self.timestamp(&self.names.start));
                body.push(Stmt::TryFinally(TryFinally {
                    body: original,
                    finalbody: vec![
                        self.timestamp(&self.names.end),
                        self.duration(),
                        self.emission(qualname),
                    ],
                }));
            }
        }
    }
}

impl VisitMut for ProbeInjector<'_> {
    fn visit_function_def_mut(&mut self, func: &mut FunctionDef) {
        let name = qualname(&self.scopes, &func.name);
        self.probed.push(name.clone());

        // Nested definitions first, so their probes land in the original body
        self.scopes.push(Scope::Function(func.name.clone()));
        walk_function_def_mut(self, func);
        self.scopes.pop();

        self.inject(&mut func.body, &name);
    }

    fn visit_class_def_mut(&mut self, class: &mut ClassDef) {
        self.scopes.push(Scope::Class(class.name.clone()));
        walk_class_def_mut(self, class);
        self.scopes.pop();
    }
}
