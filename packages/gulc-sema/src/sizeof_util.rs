//! `sizeof`/`alignof` support for the `SizeOf`/`AlignOf`/`OffsetOf` prefix
//! operators, which fold to a `usize` constant rather than dispatching to an
//! overload.
//!
//! Built-ins report their own width, `bool` is always one byte,
//! pointers/references report the target's pointer width, and a struct
//! reports the sum of its members' sizes with the target's struct
//! alignment. This assumes a single 64-bit target (8-byte pointers, 8-byte
//! struct alignment) rather than modeling a configurable one, since nothing
//! in the pipeline threads a target description through today.

use gulc_ast::{Ast, BuiltInKind, DeclKind, TypeId, TypeKind};

pub const POINTER_SIZE_BYTES: u64 = 8;
pub const STRUCT_ALIGN_BYTES: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeAndAlign {
    pub size: u64,
    pub align: u64,
}

impl SizeAndAlign {
    fn new(size: u64, align: u64) -> Self {
        Self { size, align }
    }
}

/// Returns `None` for a type this pipeline can't yet size (templates not
/// instantiated, unresolved references, function pointers) — callers turn
/// that into a `const_violation`/`unresolved_reference` diagnostic rather
/// than aborting the process.
pub fn size_and_align_of(ast: &Ast, ty_id: TypeId) -> Option<SizeAndAlign> {
    match &ast.ty(ty_id).kind {
        TypeKind::BuiltIn(kind) => {
            let bytes = (kind.size_bits() / 8).max(1) as u64;
            Some(SizeAndAlign::new(bytes, bytes))
        }
        TypeKind::Bool => Some(SizeAndAlign::new(1, 1)),
        TypeKind::Pointer { .. } | TypeKind::Reference { .. } | TypeKind::RValueReference { .. } | TypeKind::VTable { .. } => {
            Some(SizeAndAlign::new(POINTER_SIZE_BYTES, POINTER_SIZE_BYTES))
        }
        TypeKind::Enum { decl } => {
            let base = match &ast.decl(*decl).kind {
                DeclKind::Enum(body) => body.base_type,
                _ => None,
            };
            match base {
                Some(t) => size_and_align_of(ast, t),
                None => Some(SizeAndAlign::new(4, 4)),
            }
        }
        TypeKind::Struct { decl } => {
            let body = ast.decl(*decl).kind.struct_body()?;
            let mut total = 0u64;
            for &member in &body.members {
                if let DeclKind::Variable { var_type: Some(t), .. } = &ast.decl(member).kind {
                    total += size_and_align_of(ast, *t)?.size;
                }
            }
            Some(SizeAndAlign::new(total, STRUCT_ALIGN_BYTES))
        }
        _ => None,
    }
}

/// The byte offset of `member` within its enclosing struct's layout, for the
/// `offsetof` prefix operator. `None` if the field isn't a direct member.
pub fn offset_of(ast: &Ast, struct_ty: TypeId, member: gulc_ast::DeclId) -> Option<u64> {
    let TypeKind::Struct { decl } = &ast.ty(struct_ty).kind else { return None };
    let body = ast.decl(*decl).kind.struct_body()?;
    let mut offset = 0u64;
    for &m in &body.members {
        if m == member {
            return Some(offset);
        }
        if let DeclKind::Variable { var_type: Some(t), .. } = &ast.decl(m).kind {
            offset += size_and_align_of(ast, *t)?.size;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulc_ast::builder::AstBuilder;
    use gulc_ast::Ast;

    #[test]
    fn builtin_sizes_match_width() {
        let mut ast = Ast::new();
        let mut b = AstBuilder::new(&mut ast, 0);
        let i64_ty = b.builtin(BuiltInKind::I64);
        drop(b);
        assert_eq!(size_and_align_of(&ast, i64_ty), Some(SizeAndAlign::new(8, 8)));
    }

    #[test]
    fn struct_size_sums_members() {
        let mut ast = Ast::new();
        let strukt = {
            let mut b = AstBuilder::new(&mut ast, 0);
            let s = b.struct_decl("Point");
            let i32_ty = b.builtin(BuiltInKind::I32);
            let x = b.variable("x", Some(i32_ty), None);
            let y = b.variable("y", Some(i32_ty), None);
            b.add_struct_member(s, x);
            b.add_struct_member(s, y);
            s
        };
        let mut b = AstBuilder::new(&mut ast, 0);
        let struct_ty = b.ty(TypeKind::Struct { decl: strukt });
        drop(b);

        let sz = size_and_align_of(&ast, struct_ty).unwrap();
        assert_eq!(sz.size, 8);
    }
}
