//! Pipeline orchestrator and CLI-facing surface for the semantic front-end.
//! It does not implement any pass itself; it wires a parsed program through
//! `gulc_sema::run_pipeline` and shapes the result for a CLI or embedder.
//!
//! The lexer/parser is an out-of-scope collaborator, so there is no "read
//! source text" entry point here — callers hand in a [`ParsedProgram`]
//! already built (by a real parser in production, or by
//! `gulc_ast::builder::AstBuilder` in tests and the `gulcc` binary's
//! smoke-test mode).

pub mod linker;

use gulc_ast::{Ast, DeclId};
use gulc_diagnostics::{Diagnostic, FatalError};
use gulc_sema::Sess;
use serde::Serialize;

pub use linker::{LinkerCollaborator, NullLinker};

/// A parser collaborator's output: the arena plus the file path each
/// `source_file_id` names, needed for diagnostic messages.
pub struct ParsedProgram {
    pub ast: Ast,
    pub file_paths: Vec<String>,
}

impl ParsedProgram {
    pub fn new(ast: Ast, file_paths: Vec<String>) -> Self {
        Self { ast, file_paths }
    }
}

/// Everything left over after a successful run of P1..P8: the mutated AST
/// (every declaration now has a `mangled_name`, every expression a
/// `value_type`), the top-level namespace prototypes P1 produced, and any
/// warnings accumulated along the way.
pub struct CompileOutcome {
    pub ast: Ast,
    pub globals: Vec<DeclId>,
    pub warnings: Vec<Diagnostic>,
}

/// Runs the fixed P1..P8 pass order over a parsed program. A fatal
/// diagnostic aborts immediately and is returned; the caller decides how to
/// report it (the `gulcc` binary formats it via `Diagnostic`'s `Display`
/// impl and exits non-zero).
pub fn compile(mut program: ParsedProgram) -> Result<CompileOutcome, FatalError> {
    let mut sess = Sess::new(program.file_paths);
    let globals = gulc_sema::run_pipeline(&mut program.ast, &mut sess)?;
    Ok(CompileOutcome { ast: program.ast, globals, warnings: sess.warnings.into_vec() })
}

/// A machine-readable summary of a compile run, serialized to JSON for
/// `-o`-less inspection or tooling.
#[derive(Debug, Serialize)]
pub struct CompileReport {
    pub mangled_names: Vec<String>,
    pub warnings: Vec<String>,
}

impl CompileReport {
    /// Walks every declaration reachable from the program's top-level
    /// namespace prototypes and collects its mangled name, skipping any
    /// declaration P8 never reached (its `mangled_name` is still empty,
    /// which is expected for e.g. unreferenced template parameters, not a
    /// bug).
    pub fn from_outcome(outcome: &CompileOutcome) -> Self {
        let mut mangled_names = Vec::new();
        for &root in &outcome.globals {
            collect_mangled_names(&outcome.ast, root, &mut mangled_names);
        }
        let warnings = outcome.warnings.iter().map(|d| d.to_string()).collect();
        CompileReport { mangled_names, warnings }
    }
}

fn collect_mangled_names(ast: &Ast, decl_id: DeclId, out: &mut Vec<String>) {
    use gulc_ast::DeclKind;

    let decl = ast.decl(decl_id);
    if !decl.common.mangled_name.is_empty() {
        out.push(decl.common.mangled_name.clone());
    }

    let children: Vec<DeclId> = match &decl.kind {
        DeclKind::Namespace { nested_decls, .. } => nested_decls.clone(),
        DeclKind::Struct(body) | DeclKind::TemplateStructInst { body, .. } => {
            let mut v = body.members.clone();
            v.extend(body.constructors.iter().copied());
            v.extend(body.destructor);
            v
        }
        DeclKind::Trait(body) | DeclKind::TemplateTraitInst { body, .. } => body.members.clone(),
        _ => Vec::new(),
    };
    for child in children {
        collect_mangled_names(ast, child, out);
    }
}
