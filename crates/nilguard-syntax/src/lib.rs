//! Syntax frontend for nilguard: lexing, parsing, and type resolution of the
//! analyzed Go subset.
//!
//! The crate is the analyzer's platform seam. Downstream code consumes a
//! [`resolve::Program`]: the syntax trees, a [`token::FileSet`] for position
//! rendering, and the identifier→object and object→type tables. Object and
//! type handles are arena indices with identity equality; the same
//! declaration always resolves to the same handle.

pub mod ast;
mod error;
mod lexer;
pub mod parser;
pub mod resolve;
pub mod token;
pub mod types;

pub use crate::{
    error::SyntaxError,
    parser::parse_file,
    resolve::{MethodTable, Package, ParsedPackage, Program, TypeInfo, resolve_program},
    token::{FileSet, Pos, Position, Span},
    types::{FieldDef, MethodDef, ObjId, ObjKind, Object, Objects, TypeId, TypeKind, TypeTable},
};

#[cfg(test)]
mod tests {
    use crate::{
        ast::IdentIds,
        resolve::{ParsedPackage, resolve_program},
        token::FileSet,
        types::{ObjKind, TypeKind},
    };

    fn resolve_single(src: &str) -> crate::resolve::Program {
        let mut fset = FileSet::new();
        let base = fset.add("test.go", src);
        let mut ids = IdentIds::new();
        let file = crate::parse_file("test.go", src, base, &mut ids).expect("parses");
        resolve_program(
            fset,
            vec![ParsedPackage {
                path: String::from("example.com/mod/test"),
                files: vec![file],
            }],
        )
    }

    #[test]
    fn resolves_param_uses_to_the_same_object() {
        let program = resolve_single("package p\n\nfunc f(ptr *int) {\n\tprint(*ptr)\n}\n");
        let file = &program.packages[0].files[0];
        let crate::ast::Decl::Func(func) = &file.decls[0] else {
            panic!("expected func");
        };
        let param_ident = &func.sig.params[0].names[0];
        let param_obj = program.info.defs[&param_ident.id];
        assert_eq!(program.objects.get(param_obj).kind, ObjKind::Param);

        // The `ptr` inside the body must resolve to the declaration handle.
        let mut seen = false;
        crate::ast::walk_block(func.body.as_ref().expect("body"), &mut |node| {
            if let crate::ast::NodeRef::Expr(crate::ast::Expr::Ident(id)) = node
                && id.name == "ptr"
            {
                assert_eq!(program.info.uses[&id.id], param_obj);
                seen = true;
            }
        });
        assert!(seen, "body use of ptr was visited");
    }

    #[test]
    fn struct_fields_resolve_through_chains() {
        let program = resolve_single(
            "package p\n\ntype A struct {\n\ta *int\n}\n\ntype B struct {\n\ta A\n}\n\nfunc f(b B) {\n\tprint(*b.a.a)\n}\n",
        );
        // Both selector hops must resolve: `b.a` to B's field, `b.a.a` to A's.
        let int_t = {
            let mut found = None;
            for (_, obj) in &program.info.uses {
                let o = program.objects.get(*obj);
                if o.kind == ObjKind::Field
                    && matches!(program.types.kind(o.typ), TypeKind::Pointer(_))
                {
                    found = Some(o.typ);
                }
            }
            found
        };
        assert!(int_t.is_some(), "pointer field use resolved");
    }

    #[test]
    fn interface_methods_resolve() {
        let program = resolve_single(
            "package p\n\ntype Itf interface {\n\tGet() int\n}\n\nfunc f(i Itf) int {\n\treturn i.Get()\n}\n",
        );
        let method_use = program
            .info
            .uses
            .iter()
            .any(|(_, obj)| {
                let o = program.objects.get(*obj);
                o.kind == ObjKind::Method && o.name == "Get"
            });
        assert!(method_use, "interface method use resolved");
    }

    #[test]
    fn foreign_qualified_types_synthesize_sentinel_string() {
        let program = resolve_single("package p\n\nimport \"testing\"\n\nfunc f(t *testing.T) {\n\t_ = t\n}\n");
        let sentinel = program.info.defs.iter().any(|(_, obj)| {
            let o = program.objects.get(*obj);
            o.kind == ObjKind::Param && program.types.type_string(o.typ, &program.objects) == "*testing.T"
        });
        assert!(sentinel, "sentinel parameter type string");
    }
}
