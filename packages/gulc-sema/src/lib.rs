//! The semantic resolution pipeline: eight ordered passes over
//! a `gulc_ast::Ast`, run strictly in sequence and never in parallel or
//! cancelled partway.

pub mod const_inheriter;
pub mod lookup;
pub mod p1_namespace_prototyper;
pub mod p2_basic_type_resolver;
pub mod p3_circular_reference_checker;
pub mod p4_base_resolver;
pub mod p5_const_type_resolver;
pub mod p6_template_copy;
pub mod p7_expr_type_resolver;
pub mod p8_name_mangler;
pub mod session;
pub mod sizeof_util;

pub use session::Sess;

use gulc_ast::{Ast, DeclId};
use gulc_diagnostics::FatalError;

/// Runs P1 through P8 in fixed order over every file currently held in
/// `ast.files`. Returns the merged top-level namespace prototypes (what a
/// caller needs to resolve an external import against this program) along
/// with the session's accumulated warnings.
pub fn run_pipeline(ast: &mut Ast, sess: &mut Sess) -> Result<Vec<DeclId>, FatalError> {
    let file_decls: Vec<Vec<DeclId>> = ast.files.iter().map(|f| f.top_level_decls.clone()).collect();
    let globals = p1_namespace_prototyper::NamespacePrototyper::new(ast).run(&file_decls);

    const_inheriter::ConstInheriter::new(ast).run(&globals);

    p2_basic_type_resolver::BasicTypeResolver::new(ast).run(sess, &globals)?;

    p3_circular_reference_checker::CircularReferenceChecker::new(ast).run(sess, &globals)?;

    p4_base_resolver::BaseResolver::new(ast).run(sess, &globals)?;

    p5_const_type_resolver::ConstTypeResolver::new(ast).run(sess, &globals)?;

    p6_template_copy::TemplateCopier::new(ast).run(&globals);

    p7_expr_type_resolver::ExprTypeResolver::new(ast).run(sess, &globals)?;

    p8_name_mangler::NameMangler::new(ast).run(&globals);

    Ok(globals)
}
