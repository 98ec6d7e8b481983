//! Expression classification and guard/use pairing.
//!
//! The classifier walks a function body in pre-order and recognizes a fixed
//! repertoire of syntactic patterns: dereferences, selector accesses,
//! index/slice operations and calls of tracked values count as *uses*;
//! nil comparisons, slice-length comparisons and type switches count as
//! *guards*. Pairing is position-based, not control-flow based: a use is
//! sanitized exactly when a guard of the same object occurs at a source
//! position not later than the use.

use nilguard_syntax::{
    ObjId, Program, Span, TypeKind,
    ast::{self, Block, Expr, Ident, NodeRef, Stmt},
};

use crate::{params::ParamContext, usage::ParamUsage};

/// Analysis context for one function body.
pub struct FnContext<'a> {
    pub program: &'a Program,
    pub ctx: &'a ParamContext,
}

/// One selector hop: the receiver expression and the selected field name.
/// Chains are listed outermost-first (`a.b.c` before `a.b`).
struct SelectorHop<'a> {
    x: &'a Expr,
    sel: &'a Ident,
}

/// Analyzes one function body and returns its unsanitized uses, stamped with
/// the enclosing function object and ordered by use position.
#[must_use]
pub fn run_body(fcx: &FnContext<'_>, body: &Block, func: ObjId) -> Vec<ParamUsage> {
    let mut guards: Vec<ParamUsage> = Vec::new();
    let mut uses: Vec<ParamUsage> = Vec::new();

    ast::walk_block(body, &mut |node| {
        for usage in classify(fcx, node) {
            if usage.guard_at.is_some() {
                guards.push(usage);
            } else if usage.use_at.is_some() {
                uses.push(usage);
            }
        }
    });

    let mut sanitized = vec![false; uses.len()];
    for guard in &guards {
        let Some(guard_at) = guard.guard_at else { continue };
        for (i, usage) in uses.iter().enumerate() {
            let Some(use_at) = usage.use_at else { continue };
            // Inclusive: a guard and use registered at the same position do
            // not report each other.
            if guard.param == usage.param && guard_at.start <= use_at.start {
                sanitized[i] = true;
            }
        }
    }

    let mut unsanitized: Vec<ParamUsage> = uses
        .into_iter()
        .zip(sanitized)
        .filter(|(_, sanitized)| !sanitized)
        .map(|(mut usage, _)| {
            usage.func = Some(func);
            usage
        })
        .collect();
    unsanitized.sort_by_key(|u| u.use_at.map(|s| s.start));
    unsanitized
}

/// Classifies one node, emitting zero or more guard/use records.
fn classify(fcx: &FnContext<'_>, node: NodeRef<'_>) -> Vec<ParamUsage> {
    match node {
        NodeRef::Expr(expr) => classify_expr(fcx, expr),
        NodeRef::Stmt(Stmt::TypeSwitch { subject, span, .. }) => classify_type_switch(fcx, subject, *span),
        NodeRef::Stmt(_) => Vec::new(),
    }
}

fn classify_expr(fcx: &FnContext<'_>, expr: &Expr) -> Vec<ParamUsage> {
    match expr {
        // Calling a tracked callable value dereferences it.
        Expr::Call { func, span, .. } => {
            if let Some(param) = targeted_param(fcx, func) {
                let declared_at = fcx.program.objects.get(param).pos;
                return vec![ParamUsage::usage(param, *span, declared_at)];
            }
            Vec::new()
        }
        Expr::Binary { x, op, y, span } => classify_binary(fcx, x, *op, y, *span),
        Expr::Star { x, span } => classify_deref(fcx, expr, x, *span),
        Expr::Selector { .. } => {
            // A chain whose middle selectors touch tracked pointer or
            // interface fields wins over the plain receiver rule.
            let chain = selector_tree(fcx, expr, true);
            if !chain.is_empty() {
                return chain;
            }
            let hops = selector_hops(expr);
            if let Some(hop) = hops.first()
                && hops.len() == 1
                && let Some(param) = targeted_param(fcx, hop.x)
            {
                let typ = fcx.program.objects.get(param).typ;
                let underlying = fcx.program.types.underlying(typ);
                if matches!(
                    fcx.program.types.kind(underlying),
                    TypeKind::Pointer(_) | TypeKind::Interface { .. }
                ) {
                    let declared_at = fcx.program.objects.get(param).pos;
                    return vec![ParamUsage::usage(param, expr.span(), declared_at)];
                }
            }
            Vec::new()
        }
        Expr::Slice { x, span, .. } | Expr::Index { x, span, .. } => {
            if let Some(param) = targeted_param(fcx, x) {
                let declared_at = fcx.program.objects.get(param).pos;
                return vec![ParamUsage::usage(param, *span, declared_at)];
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// `*E`: a dereference of a tracked pointer, either directly or through a
/// selector chain ending in a tracked pointer field.
fn classify_deref(fcx: &FnContext<'_>, whole: &Expr, inner: &Expr, span: Span) -> Vec<ParamUsage> {
    let hops = selector_hops(inner);
    if let (Some(outer), Some(last)) = (hops.first(), hops.last())
        && let Some(param) = targeted_param(fcx, last.x)
    {
        let last_child = outer.sel;
        for fields in fcx.ctx.typ_collection.values() {
            for &field in fields {
                let field_obj = fcx.program.objects.get(field);
                if field_obj.name != last_child.name {
                    continue;
                }
                let underlying = fcx.program.types.underlying(field_obj.typ);
                if !matches!(fcx.program.types.kind(underlying), TypeKind::Pointer(_)) {
                    continue;
                }
                let Some(&use_obj) = fcx.program.info.uses.get(&last_child.id) else {
                    continue;
                };
                let declared_at = fcx.program.objects.get(param).pos;
                return vec![ParamUsage::usage(use_obj, span, declared_at).with_context(param)];
            }
        }
    }

    if let Some(param) = targeted_param(fcx, whole) {
        let declared_at = fcx.program.objects.get(param).pos;
        return vec![ParamUsage::usage(param, span, declared_at)];
    }
    Vec::new()
}

fn classify_binary(fcx: &FnContext<'_>, x: &Expr, op: ast::BinOp, y: &Expr, span: Span) -> Vec<ParamUsage> {
    // Chain guards: a comparison whose operand is a selector chain ending in
    // a tracked pointer/interface field guards that field.
    for side in [x, y] {
        let mut chain = selector_tree(fcx, side, false);
        if !chain.is_empty() {
            for usage in &mut chain {
                usage.guard_at = Some(span);
            }
            return chain;
        }
    }

    let x_hops = selector_hops(x);
    let y_hops = selector_hops(y);
    let x_base = x_hops.last().map_or(x, |hop| hop.x);
    let y_base = y_hops.last().map_or(y, |hop| hop.x);
    let x_param = targeted_param(fcx, x_base);
    let y_param = targeted_param(fcx, y_base);

    if op.is_equality() {
        for (param, base_hops, other) in [(x_param, &x_hops, y_base), (y_param, &y_hops, x_base)] {
            let Some(param) = param else { continue };
            let Some(other_ident) = cast_to_ident(other) else { continue };
            if other_ident.name != "nil" {
                continue;
            }
            let declared_at = fcx.program.objects.get(param).pos;
            let mut usage = ParamUsage::guard(param, span, declared_at);
            // Guarding `p.f` sanitizes later uses of the field, not of the
            // whole parameter.
            if let Some(outer) = base_hops.first()
                && let Some(&field_use) = fcx.program.info.uses.get(&outer.sel.id)
            {
                usage.param = field_use;
            }
            return vec![usage];
        }
    }

    if op.is_ordering_or_equality() {
        for side in [x_base, y_base] {
            if let Some(usage) = slice_len_guard(fcx, side, span) {
                return vec![usage];
            }
        }
    }
    Vec::new()
}

/// `len(s) op N` where `s` is a tracked slice parameter.
fn slice_len_guard(fcx: &FnContext<'_>, expr: &Expr, guard_span: Span) -> Option<ParamUsage> {
    let Expr::Call { func, args, .. } = expr else {
        return None;
    };
    let fn_ident = cast_to_ident(func)?;
    if fn_ident.name != "len" {
        return None;
    }
    let param = targeted_param(fcx, args.first()?)?;
    let typ = fcx.program.objects.get(param).typ;
    let underlying = fcx.program.types.underlying(typ);
    if !matches!(fcx.program.types.kind(underlying), TypeKind::Slice(_)) {
        return None;
    }
    let declared_at = fcx.program.objects.get(param).pos;
    Some(ParamUsage::guard(param, guard_span, declared_at))
}

fn classify_type_switch(fcx: &FnContext<'_>, subject: &Expr, span: Span) -> Vec<ParamUsage> {
    // `switch p.f.(type)` guards the chain-reached field.
    let mut chain = selector_tree(fcx, subject, false);
    if !chain.is_empty() {
        for usage in &mut chain {
            usage.guard_at = Some(span);
        }
        return chain;
    }

    // `switch i.(type)` on an interface-kinded parameter.
    if let Some(param) = targeted_param(fcx, subject) {
        let typ = fcx.program.objects.get(param).typ;
        let underlying = fcx.program.types.underlying(typ);
        if matches!(fcx.program.types.kind(underlying), TypeKind::Interface { .. }) {
            let declared_at = fcx.program.objects.get(param).pos;
            return vec![ParamUsage::guard(param, span, declared_at)];
        }
    }
    Vec::new()
}

/// Scans a selector chain rooted at a tracked parameter for hops that touch
/// recorded pointer/interface fields of the parameter's record type.
///
/// In use mode the scan starts at the second hop: the outermost selector
/// names the use site, and an earlier matching hop is the member actually
/// dereferenced on the way there. In guard mode only the outermost hop (the
/// guarded member itself) is admissible, and one record per match is emitted
/// either way.
fn selector_tree(fcx: &FnContext<'_>, expr: &Expr, use_mode: bool) -> Vec<ParamUsage> {
    let hops = selector_hops(expr);
    if hops.is_empty() {
        return Vec::new();
    }
    let Some(last) = hops.last() else {
        return Vec::new();
    };
    let most_parent = last.x;
    let Some(outer) = hops.first() else {
        return Vec::new();
    };
    let last_child = outer.sel;

    let Some(param) = targeted_param(fcx, most_parent) else {
        return Vec::new();
    };
    let Some(mp_ident) = cast_to_ident(most_parent) else {
        return Vec::new();
    };
    let Some(&mp_obj) = fcx.program.info.uses.get(&mp_ident.id) else {
        return Vec::new();
    };
    let mp_typ = fcx.program.types.unwrap_ptr(fcx.program.objects.get(mp_obj).typ);
    let declared_at = fcx.program.objects.get(param).pos;

    let mut usages = Vec::new();
    for (typ, fields) in &fcx.ctx.typ_collection {
        if *typ != mp_typ {
            continue;
        }
        for &field in fields {
            let field_obj = fcx.program.objects.get(field);
            let underlying = fcx.program.types.underlying(field_obj.typ);
            if !matches!(
                fcx.program.types.kind(underlying),
                TypeKind::Pointer(_) | TypeKind::Interface { .. }
            ) {
                continue;
            }
            let start = usize::from(use_mode);
            for hop in &hops[start.min(hops.len())..] {
                if hop.sel.name != field_obj.name {
                    continue;
                }
                let Some(&use_obj) = fcx.program.info.uses.get(&hop.sel.id) else {
                    continue;
                };
                // Same-named fields of unrelated records must not match.
                if fcx.program.objects.get(use_obj).typ != field_obj.typ {
                    continue;
                }
                if use_mode {
                    usages.push(ParamUsage::usage(use_obj, expr.span(), declared_at).with_context(param));
                } else if last_child.name == field_obj.name {
                    usages.push(ParamUsage::guard(use_obj, expr.span(), declared_at).with_context(param));
                }
            }
        }
    }
    usages
}

/// Resolves an expression to a tracked parameter: after peeling dereference,
/// call, and parenthesis layers, the remaining identifier's object must have
/// the static type of one of the function's tracked formals.
fn targeted_param(fcx: &FnContext<'_>, expr: &Expr) -> Option<ObjId> {
    let ident = cast_to_ident(expr)?;
    let obj = fcx.program.info.object_of(ident.id)?;
    let obj_typ = fcx.program.objects.get(obj).typ;
    fcx.ctx
        .params
        .iter()
        .copied()
        .find(|&param| fcx.program.objects.get(param).typ == obj_typ)
}

/// Unwraps dereference and call-target layers down to an identifier.
fn cast_to_ident(expr: &Expr) -> Option<&Ident> {
    match expr {
        Expr::Star { x, .. } => cast_to_ident(x),
        Expr::Call { func, .. } => cast_to_ident(func),
        Expr::Ident(ident) => Some(ident),
        _ => None,
    }
}

/// Collects the selector hops of `expr`, outermost-first. Returns an empty
/// list when `expr` is not a selector.
fn selector_hops(expr: &Expr) -> Vec<SelectorHop<'_>> {
    let Expr::Selector { x, sel, .. } = expr else {
        return Vec::new();
    };
    let mut hops = vec![SelectorHop { x, sel }];
    let mut current = x.as_ref();
    while let Expr::Selector { x, sel, .. } = current {
        hops.push(SelectorHop { x, sel });
        current = x.as_ref();
    }
    hops
}
