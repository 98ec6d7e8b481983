//! Whole-program call-graph construction and caller-chain caching.
//!
//! The graph composes two approximations: direct edges for statically
//! resolved calls, and class-hierarchy candidates for interface dispatch
//! narrowed to receiver types the program actually instantiates. Edges whose
//! endpoints fall outside the project-internal package prefix are discarded.
//! For every internal callee the builder caches one flattened caller chain,
//! bounded by the configured maximum depth; multiple callers at one level
//! collapse into a `[a, b]` grouping token and the walk continues through
//! each of them.

use ahash::AHashSet;
use indexmap::{IndexMap, IndexSet};
use nilguard_syntax::{
    ObjId, ObjKind, Program, TypeKind,
    ast::{self, Decl, Expr, NodeRef},
};

/// Cached caller chains keyed by the callee's full function name.
#[derive(Debug, Default)]
pub struct CallGraph {
    paths: IndexMap<String, Vec<String>>,
}

impl CallGraph {
    #[must_use]
    pub fn paths_for(&self, full_name: &str) -> Option<&[String]> {
        self.paths.get(full_name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Platform-style canonical function name: `pkg.Func` for plain functions,
/// `(pkg.Recv).Method` for methods.
#[must_use]
pub fn full_name(program: &Program, func: ObjId) -> String {
    let obj = program.objects.get(func);
    if obj.kind == ObjKind::Method
        && let Some(&owner) = program.methods.owner.get(&func)
        && let TypeKind::Named { obj: owner_obj, .. } = program.types.kind(owner)
    {
        let owner = program.objects.get(*owner_obj);
        let qualifier = if owner.pkg.is_empty() {
            owner.name.clone()
        } else {
            format!("{}.{}", owner.pkg, owner.name)
        };
        return format!("({}).{}", qualifier, obj.name);
    }
    if obj.pkg.is_empty() {
        obj.name.clone()
    } else {
        format!("{}.{}", obj.pkg, obj.name)
    }
}

/// Builds the call graph and caches up to `max_path − 1` levels of callers
/// per internal callee.
#[must_use]
pub fn build(program: &Program, max_path: usize) -> CallGraph {
    let edges = collect_edges(program);
    let Some(prefix) = project_prefix(program) else {
        return CallGraph::default();
    };

    // Predecessor lists in first-seen order, restricted to internal edges.
    let mut preds: IndexMap<ObjId, IndexSet<ObjId>> = IndexMap::new();
    let mut internal_callees: IndexSet<ObjId> = IndexSet::new();
    for (caller, callee) in &edges {
        let caller_pkg = &program.objects.get(*caller).pkg;
        let callee_pkg = &program.objects.get(*callee).pkg;
        if !caller_pkg.contains(&prefix) || !callee_pkg.contains(&prefix) {
            continue;
        }
        preds.entry(*callee).or_default().insert(*caller);
        internal_callees.insert(*callee);
    }

    let mut graph = CallGraph::default();
    for &callee in &internal_callees {
        let mut visited = Vec::new();
        visit_in(program, &preds, callee, &mut visited, max_path.saturating_sub(1));
        graph.paths.insert(full_name(program, callee), visited);
    }
    graph
}

/// Appends caller names level by level: a single predecessor contributes its
/// full name, several contribute one grouping token, and the walk recurses
/// through every predecessor until entry nodes or depth exhaustion.
fn visit_in(
    program: &Program,
    preds: &IndexMap<ObjId, IndexSet<ObjId>>,
    node: ObjId,
    visited: &mut Vec<String>,
    max: usize,
) {
    if visited.len() > max {
        return;
    }
    let Some(callers) = preds.get(&node) else {
        return;
    };
    let names: Vec<String> = callers.iter().map(|c| full_name(program, *c)).collect();
    match names.as_slice() {
        [] => return,
        [single] => visited.push(single.clone()),
        many => visited.push(format!("[{}]", many.join(", "))),
    }
    for &caller in callers {
        visit_in(program, preds, caller, visited, max);
    }
}

/// The project-internal prefix: the first three slash-separated segments of
/// any built package's path.
fn project_prefix(program: &Program) -> Option<String> {
    let path = &program.packages.first()?.path;
    let segments: Vec<&str> = path.split('/').collect();
    let take = segments.len().min(3);
    Some(segments[..take].join("/"))
}

/// Collects `(caller, callee)` edges over every function body.
fn collect_edges(program: &Program) -> Vec<(ObjId, ObjId)> {
    let concrete_methods = methods_by_name(program);
    let mut edges = Vec::new();
    for pkg in &program.packages {
        for file in &pkg.files {
            for decl in &file.decls {
                let Decl::Func(func) = decl else { continue };
                let Some(body) = &func.body else { continue };
                let Some(&caller) = program.info.defs.get(&func.name.id) else {
                    continue;
                };
                ast::walk_block(body, &mut |node| {
                    let NodeRef::Expr(Expr::Call { func: callee_expr, .. }) = node else {
                        return;
                    };
                    for callee in resolve_callees(program, &concrete_methods, callee_expr) {
                        edges.push((caller, callee));
                    }
                });
            }
        }
    }
    edges
}

/// Concrete methods indexed by name, for class-hierarchy candidate lookup.
fn methods_by_name(program: &Program) -> IndexMap<String, Vec<(nilguard_syntax::TypeId, ObjId)>> {
    let mut by_name: IndexMap<String, Vec<(nilguard_syntax::TypeId, ObjId)>> = IndexMap::new();
    for (&(recv, ref name), &obj) in &program.methods.concrete {
        by_name.entry(name.clone()).or_default().push((recv, obj));
    }
    // Map iteration order is arbitrary; keep candidate lists deterministic.
    for candidates in by_name.values_mut() {
        candidates.sort_by_key(|(_, obj)| program.objects.get(*obj).pos);
    }
    by_name
}

fn resolve_callees(
    program: &Program,
    concrete_methods: &IndexMap<String, Vec<(nilguard_syntax::TypeId, ObjId)>>,
    callee_expr: &Expr,
) -> Vec<ObjId> {
    match callee_expr {
        Expr::Paren { x, .. } => resolve_callees(program, concrete_methods, x),
        Expr::Ident(ident) => {
            let Some(obj) = program.info.object_of(ident.id) else {
                return Vec::new();
            };
            match program.objects.get(obj).kind {
                ObjKind::Func => vec![obj],
                _ => Vec::new(),
            }
        }
        Expr::Selector { sel, .. } => {
            let Some(obj) = program.info.uses.get(&sel.id).copied() else {
                return Vec::new();
            };
            if program.objects.get(obj).kind != ObjKind::Method {
                return Vec::new();
            }
            match program.methods.owner.get(&obj).map(|t| program.types.kind(*t)) {
                // Concrete receiver: a single direct edge.
                Some(TypeKind::Named { .. }) => vec![obj],
                // Interface dispatch: every same-named method on an
                // implementing, instantiated receiver type.
                Some(TypeKind::Interface { methods }) => {
                    let iface_names: AHashSet<&str> = methods.iter().map(|m| m.name.as_str()).collect();
                    let Some(candidates) = concrete_methods.get(&sel.name) else {
                        return Vec::new();
                    };
                    candidates
                        .iter()
                        .filter(|(recv, _)| {
                            program.instantiated.contains(recv) && implements(program, *recv, &iface_names)
                        })
                        .map(|(_, obj)| *obj)
                        .collect()
                }
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// Name-set implementation check: the receiver type must carry a concrete
/// method for every interface method name.
fn implements(program: &Program, recv: nilguard_syntax::TypeId, iface_names: &AHashSet<&str>) -> bool {
    iface_names
        .iter()
        .all(|name| program.methods.concrete.contains_key(&(recv, (*name).to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::resolve_units;

    #[test]
    fn direct_call_chains() {
        let program = resolve_units(&[(
            "a/b/c/a.go",
            "package p\n\nfunc leaf() {\n}\n\nfunc mid() {\n\tleaf()\n}\n\nfunc top() {\n\tmid()\n}\n",
        )]);
        let graph = build(&program, 30);
        let chain = graph.paths_for("a/b/c.leaf").expect("leaf has a chain");
        assert_eq!(chain, ["a/b/c.mid", "a/b/c.top"]);
    }

    #[test]
    fn multiple_callers_collapse_into_group_token() {
        let program = resolve_units(&[(
            "a/b/c/a.go",
            "package p\n\nfunc leaf() {\n}\n\nfunc one() {\n\tleaf()\n}\n\nfunc two() {\n\tleaf()\n}\n",
        )]);
        let graph = build(&program, 30);
        let chain = graph.paths_for("a/b/c.leaf").expect("leaf has a chain");
        assert_eq!(chain[0], "[a/b/c.one, a/b/c.two]");
    }

    #[test]
    fn chain_depth_is_bounded() {
        let src = "package p\n\nfunc f0() {\n}\nfunc f1() {\n\tf0()\n}\nfunc f2() {\n\tf1()\n}\nfunc f3() {\n\tf2()\n}\nfunc f4() {\n\tf3()\n}\n";
        let program = resolve_units(&[("a/b/c/a.go", src)]);
        let graph = build(&program, 3);
        let chain = graph.paths_for("a/b/c.f0").expect("f0 has a chain");
        assert!(chain.len() <= 3, "chain {chain:?} respects maxpath");
    }

    #[test]
    fn recursive_functions_terminate() {
        let program = resolve_units(&[(
            "a/b/c/a.go",
            "package p\n\nfunc rec() {\n\trec()\n}\n",
        )]);
        let graph = build(&program, 8);
        assert!(graph.paths_for("a/b/c.rec").is_some());
    }

    #[test]
    fn interface_calls_reach_instantiated_implementers_only() {
        let src = "package p\n\ntype Itf interface {\n\tGet() int\n}\n\ntype Used struct {\n\tn int\n}\n\nfunc (u Used) Get() int {\n\treturn u.n\n}\n\ntype Unused struct {\n\tn int\n}\n\nfunc (u Unused) Get() int {\n\treturn u.n\n}\n\nfunc construct() Itf {\n\treturn Used{n: 1}\n}\n\nfunc dispatch(i Itf) int {\n\treturn i.Get()\n}\n";
        let program = resolve_units(&[("a/b/c/a.go", src)]);
        let graph = build(&program, 30);
        assert!(
            graph.paths_for("(a/b/c.Used).Get").is_some(),
            "instantiated implementer gets an edge"
        );
        assert!(
            graph.paths_for("(a/b/c.Unused).Get").is_none(),
            "never-instantiated implementer is pruned"
        );
    }
}
