//! Parameter collection and recursive field expansion.
//!
//! For each analyzed function this produces the set of nilable formal
//! parameters plus, for record-kinded parameters, every transitively
//! reachable nilable field. The expander passes an *accumulator* of
//! already-collected fields down the recursion and clone-merges at each
//! level; sharing one mutable set instead would prune sibling branches that
//! reach the same record type through different paths.

use indexmap::{IndexMap, IndexSet};
use nilguard_syntax::{ObjId, Program, TypeId, TypeKind, ast::FuncDecl};

use crate::shapes::RecordShapes;

/// Parameters whose static type string matches this sentinel are never
/// tracked; test harness values are deliberately out of scope.
pub const TESTING_SENTINEL: &str = "*testing.T";

/// Reachable fields per record type: `record type → field objects`.
///
/// The inner collection is keyed by the field's declaring object, so two
/// same-named fields of different records stay distinct entries.
pub type FieldCollection = IndexMap<TypeId, IndexSet<ObjId>>;

/// Per-function tracking context: the nilable formals and the transitive
/// field collection of their record types.
#[derive(Debug, Default)]
pub struct ParamContext {
    pub params: Vec<ObjId>,
    pub typ_collection: FieldCollection,
}

/// Builds the tracking context for one function declaration.
#[must_use]
pub fn collect(program: &Program, shapes: &RecordShapes, func: &FuncDecl) -> ParamContext {
    let params = nilable_params(program, func);
    let typ_collection = expand_fields(program, shapes, &FieldCollection::new(), &params);
    ParamContext {
        params,
        typ_collection,
    }
}

/// Filters the formal parameters down to those of nilable underlying kind,
/// excluding the test-fixture sentinel type.
#[must_use]
pub fn nilable_params(program: &Program, func: &FuncDecl) -> Vec<ObjId> {
    let mut out = Vec::new();
    for group in &func.sig.params {
        for name in &group.names {
            let Some(&obj) = program.info.defs.get(&name.id) else {
                continue;
            };
            let typ = program.objects.get(obj).typ;
            if !program.types.is_nilable(typ) {
                continue;
            }
            if program.types.type_string(typ, &program.objects) == TESTING_SENTINEL {
                continue;
            }
            out.push(obj);
        }
    }
    out
}

/// Recursively collects the fields reachable from `params` through known
/// record shapes.
///
/// `collected` accumulates the fields gathered on the path from the original
/// parameters to here; recursion through a field already present in it stops
/// (self- and mutually-recursive records terminate), while sibling fields
/// keep their own accumulator view via clone-merge.
#[must_use]
pub fn expand_fields(
    program: &Program,
    shapes: &RecordShapes,
    collected: &FieldCollection,
    params: &[ObjId],
) -> FieldCollection {
    let mut m = FieldCollection::new();
    for &param in params {
        let param_typ = program.objects.get(param).typ;
        for (owner, fields) in shapes.iter() {
            let owner_typ = program.objects.get(owner).typ;
            if !matches!(program.types.kind(owner_typ), TypeKind::Named { .. }) {
                continue;
            }
            if program.types.unwrap_ptr(param_typ) != owner_typ {
                continue;
            }
            m.entry(owner_typ).or_default();
            for field in fields {
                m.entry(owner_typ).or_default().insert(field.obj);

                if is_collected(collected, field.obj) {
                    continue;
                }
                let merged = merge(&m, collected);
                let inner = expand_fields(program, shapes, &merged, &[field.obj]);
                for (_, inner_fields) in inner {
                    let entry = m.entry(owner_typ).or_default();
                    for inner_field in inner_fields {
                        entry.insert(inner_field);
                    }
                }
            }
        }
    }
    m
}

fn is_collected(collected: &FieldCollection, target: ObjId) -> bool {
    collected.values().any(|fields| fields.contains(&target))
}

/// Merges two collections; entries of `overlay` replace same-typed entries
/// of `base` wholesale.
fn merge(base: &FieldCollection, overlay: &FieldCollection) -> FieldCollection {
    let mut out = base.clone();
    for (typ, fields) in overlay {
        out.insert(*typ, fields.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shapes, testutil::resolve_units};
    use nilguard_syntax::{Program, ast::Decl};

    fn context_for(src: &str, func_name_index: usize) -> (Program, ParamContext) {
        let program = resolve_units(&[("a.go", src)]);
        let shapes = shapes::collect(&program, &program.packages[0]);
        let mut funcs = Vec::new();
        for decl in &program.packages[0].files[0].decls {
            if let Decl::Func(f) = decl {
                funcs.push(f.clone());
            }
        }
        let ctx = collect(&program, &shapes, &funcs[func_name_index]);
        (program, ctx)
    }

    #[test]
    fn keeps_only_nilable_parameters() {
        let (program, ctx) = context_for(
            "package p\n\nfunc f(a *int, b int, c []string, d map[string]int, e func(), g string) {\n}\n",
            0,
        );
        let names: Vec<_> = ctx
            .params
            .iter()
            .map(|p| program.objects.get(*p).name.clone())
            .collect();
        assert_eq!(names, vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn excludes_testing_sentinel() {
        let (_, ctx) = context_for(
            "package p\n\nimport \"testing\"\n\nfunc f(t *testing.T, p *int) {\n}\n",
            0,
        );
        assert_eq!(ctx.params.len(), 1);
    }

    #[test]
    fn expands_nested_record_fields() {
        let (program, ctx) = context_for(
            "package p\n\ntype A struct {\n\tn *int\n}\n\ntype B struct {\n\ta *A\n}\n\ntype C struct {\n\tb *B\n\tf float32\n}\n\nfunc f(c C) {\n}\n",
            0,
        );
        // C's collection must reach b, a, n, and f transitively.
        let all: Vec<String> = ctx
            .typ_collection
            .values()
            .flat_map(|fields| fields.iter().map(|f| program.objects.get(*f).name.clone()))
            .collect();
        assert!(all.contains(&String::from("b")));
        assert!(all.contains(&String::from("a")));
        assert!(all.contains(&String::from("n")));
    }

    #[test]
    fn self_referential_records_terminate() {
        let (_, ctx) = context_for(
            "package p\n\ntype Node struct {\n\tnext *Node\n\tval *int\n}\n\nfunc f(n *Node) {\n}\n",
            0,
        );
        assert!(!ctx.typ_collection.is_empty());
    }

    #[test]
    fn mutually_recursive_records_terminate() {
        let (_, ctx) = context_for(
            "package p\n\ntype A struct {\n\tb *B\n}\n\ntype B struct {\n\ta *A\n}\n\nfunc f(a A) {\n}\n",
            0,
        );
        assert!(!ctx.typ_collection.is_empty());
    }

    #[test]
    fn sibling_fields_of_same_type_both_expand() {
        // Two fields sharing one record type: expanding the first must not
        // prune the second's recursion.
        let (program, ctx) = context_for(
            "package p\n\ntype Inner struct {\n\tp *int\n}\n\ntype Outer struct {\n\tx Inner\n\ty Inner\n}\n\nfunc f(o Outer) {\n}\n",
            0,
        );
        let all: Vec<String> = ctx
            .typ_collection
            .values()
            .flat_map(|fields| fields.iter().map(|f| program.objects.get(*f).name.clone()))
            .collect();
        assert!(all.contains(&String::from("x")));
        assert!(all.contains(&String::from("y")));
        assert!(all.contains(&String::from("p")));
    }
}
