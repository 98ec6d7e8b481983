//! End-to-end analyzer tests over in-memory fixtures.
//!
//! Each fixture runs through the full driver in test mode and asserts the
//! emitted `Declared '<name>'` / `Unsafely used '<name>'` markers by file and
//! line. Declaration markers anchor at the parameter declaration; use
//! markers anchor at the offending expression.

use nilguard::{AnalysisOptions, SourceUnit, run_units};
use pretty_assertions::assert_eq;

fn run(units: &[(&str, &str)]) -> Vec<(String, u32, String)> {
    let units = units
        .iter()
        .map(|(name, src)| SourceUnit {
            name: (*name).to_owned(),
            src: (*src).to_owned(),
        })
        .collect();
    let options = AnalysisOptions {
        config: None,
        test_mode: true,
    };
    let outcome = run_units(units, &options).expect("analysis runs");
    assert!(outcome.syntax_errors.is_empty(), "fixtures parse: {:?}", outcome.syntax_errors);
    outcome
        .markers
        .into_iter()
        .map(|m| (m.position.file, m.position.line, m.msg))
        .collect()
}

fn check(units: &[(&str, &str)], expected: &[(&str, u32, &str)]) {
    let mut got = run(units);
    got.sort();
    let mut expected: Vec<(String, u32, String)> = expected
        .iter()
        .map(|(f, l, m)| ((*f).to_owned(), *l, (*m).to_owned()))
        .collect();
    expected.sort();
    assert_eq!(got, expected);
}

// ============================================================================
// Pointer parameters
// ============================================================================

#[test]
fn unguarded_pointer_deref_is_reported() {
    check(
        &[(
            "pointer/err.go",
            "package pointer\n\nfunc _(p *int) {\n\tprint(*p)\n}\n",
        )],
        &[
            ("pointer/err.go", 3, "Declared 'p'"),
            ("pointer/err.go", 4, "Unsafely used 'p'"),
        ],
    );
}

#[test]
fn nil_guard_sanitizes_pointer_deref() {
    check(
        &[(
            "pointer/noterr.go",
            "package pointer\n\nfunc _(p *int) {\n\tif p != nil {\n\t\tprint(*p)\n\t}\n}\n",
        )],
        &[],
    );
}

#[test]
fn guard_after_use_does_not_sanitize() {
    check(
        &[(
            "pointer/late.go",
            "package pointer\n\nfunc _(p *int) {\n\tprint(*p)\n\tif p != nil {\n\t\tprint(*p)\n\t}\n}\n",
        )],
        &[
            ("pointer/late.go", 3, "Declared 'p'"),
            ("pointer/late.go", 4, "Unsafely used 'p'"),
        ],
    );
}

#[test]
fn callable_alias_parameter_is_tracked() {
    check(
        &[(
            "pointer/fptr.go",
            "package pointer\n\ntype fptr = func(int, int) int\n\nfunc _(f fptr) {\n\tf(1, 2)\n}\n\nfunc _(f fptr) {\n\tif f != nil {\n\t\tf(1, 2)\n\t}\n}\n",
        )],
        &[
            ("pointer/fptr.go", 5, "Declared 'f'"),
            ("pointer/fptr.go", 6, "Unsafely used 'f'"),
        ],
    );
}

#[test]
fn pointer_field_reached_through_record_chain() {
    check(
        &[(
            "pointer/chain.go",
            "package pointer\n\ntype A struct {\n\ta *int\n}\n\ntype B struct {\n\ta A\n}\n\nfunc _(b B) {\n\tprint(*b.a.a)\n}\n",
        )],
        &[
            ("pointer/chain.go", 11, "Declared 'a'"),
            ("pointer/chain.go", 12, "Unsafely used 'a'"),
        ],
    );
}

#[test]
fn chain_guard_sanitizes_field_deref() {
    check(
        &[(
            "pointer/chainok.go",
            "package pointer\n\ntype A struct {\n\ta *int\n}\n\ntype B struct {\n\ta A\n}\n\nfunc _(b B) {\n\tif b.a.a != nil {\n\t\tprint(*b.a.a)\n\t}\n}\n",
        )],
        &[],
    );
}

// ============================================================================
// Interface parameters
// ============================================================================

const ITF_TYPES: &str = "package itf\n\ntype Itf interface {\n\tGet() int\n}\n\ntype A struct {\n\tb B\n}\n\ntype B struct {\n\titf Itf\n}\n";

#[test]
fn unguarded_interface_method_call() {
    check(
        &[
            ("itf/types.go", ITF_TYPES),
            (
                "itf/err.go",
                "package itf\n\nfunc _(i Itf) int {\n\treturn i.Get()\n}\n",
            ),
        ],
        &[
            ("itf/err.go", 3, "Declared 'i'"),
            ("itf/err.go", 4, "Unsafely used 'i'"),
        ],
    );
}

#[test]
fn interface_field_reached_through_record_chain() {
    check(
        &[
            ("itf/types.go", ITF_TYPES),
            (
                "itf/err.go",
                "package itf\n\nfunc _(a A) int {\n\treturn a.b.itf.Get()\n}\n",
            ),
        ],
        &[
            ("itf/err.go", 3, "Declared 'itf'"),
            ("itf/err.go", 4, "Unsafely used 'itf'"),
        ],
    );
}

#[test]
fn interface_guards_sanitize_all_forms() {
    check(
        &[
            ("itf/types.go", ITF_TYPES),
            (
                "itf/noterr.go",
                concat!(
                    "package itf\n",
                    "\n",
                    "func _(i Itf) int {\n",
                    "\tif i != nil {\n",
                    "\t\treturn i.Get()\n",
                    "\t}\n",
                    "\treturn 0\n",
                    "}\n",
                    "\n",
                    "func _(i Itf) int {\n",
                    "\tswitch i.(type) {\n",
                    "\tcase Itf:\n",
                    "\t\treturn i.Get()\n",
                    "\tdefault:\n",
                    "\t\treturn 0\n",
                    "\t}\n",
                    "}\n",
                    "\n",
                    "func _(a A) int {\n",
                    "\tif a.b.itf != nil {\n",
                    "\t\treturn a.b.itf.Get()\n",
                    "\t}\n",
                    "\treturn 0\n",
                    "}\n",
                    "\n",
                    "func _(a A) int {\n",
                    "\tswitch a.b.itf.(type) {\n",
                    "\tcase Itf:\n",
                    "\t\treturn a.b.itf.Get()\n",
                    "\tdefault:\n",
                    "\t\treturn 0\n",
                    "\t}\n",
                    "}\n",
                ),
            ),
        ],
        &[],
    );
}

// ============================================================================
// Record parameters
// ============================================================================

const STRUCT_TYPES: &str = "package nilstruct\n\ntype S struct {\n\ta int\n\tb int\n}\n\ntype A struct {\n\tn *int\n}\n\ntype B struct {\n\ta *A\n}\n\ntype C struct {\n\tb *B\n\tf float32\n}\n";

#[test]
fn selector_on_pointer_record_parameter() {
    check(
        &[
            ("nilstruct/types.go", STRUCT_TYPES),
            (
                "nilstruct/err.go",
                "package nilstruct\n\nfunc _(s *S) {\n\tprint(s.a)\n}\n",
            ),
        ],
        &[
            ("nilstruct/err.go", 3, "Declared 's'"),
            ("nilstruct/err.go", 4, "Unsafely used 's'"),
        ],
    );
}

#[test]
fn single_pointer_field_access_through_record() {
    check(
        &[
            ("nilstruct/types.go", STRUCT_TYPES),
            (
                "nilstruct/err.go",
                "package nilstruct\n\nfunc _(c C) {\n\tprint(c.b.a)\n}\n",
            ),
        ],
        &[
            ("nilstruct/err.go", 3, "Declared 'b'"),
            ("nilstruct/err.go", 4, "Unsafely used 'b'"),
        ],
    );
}

#[test]
fn deep_chain_reports_each_traversed_pointer_field() {
    check(
        &[
            ("nilstruct/types.go", STRUCT_TYPES),
            (
                "nilstruct/err.go",
                "package nilstruct\n\nfunc _(c C) {\n\tprint(c.b.a.n)\n}\n",
            ),
        ],
        &[
            ("nilstruct/err.go", 3, "Declared 'a'"),
            ("nilstruct/err.go", 3, "Declared 'b'"),
            ("nilstruct/err.go", 4, "Unsafely used 'a'"),
            ("nilstruct/err.go", 4, "Unsafely used 'b'"),
        ],
    );
}

#[test]
fn record_guards_sanitize_chain_accesses() {
    check(
        &[
            ("nilstruct/types.go", STRUCT_TYPES),
            (
                "nilstruct/noterr.go",
                concat!(
                    "package nilstruct\n",
                    "\n",
                    "func _(s *S) {\n",
                    "\tif s != nil {\n",
                    "\t\tprint(s.a)\n",
                    "\t}\n",
                    "}\n",
                    "\n",
                    "func _(c C) {\n",
                    "\tif c.b != nil {\n",
                    "\t\tprint(c.b.a)\n",
                    "\t}\n",
                    "}\n",
                    "\n",
                    "func _(c C) {\n",
                    "\tif c.b != nil && c.b.a != nil {\n",
                    "\t\tprint(c.b.a.n)\n",
                    "\t}\n",
                    "}\n",
                ),
            ),
        ],
        &[],
    );
}

// ============================================================================
// Slice, map, and length guards
// ============================================================================

#[test]
fn unguarded_slice_index() {
    check(
        &[(
            "coll/slice.go",
            "package coll\n\nfunc _(s []int) int {\n\treturn s[0]\n}\n",
        )],
        &[
            ("coll/slice.go", 3, "Declared 's'"),
            ("coll/slice.go", 4, "Unsafely used 's'"),
        ],
    );
}

#[test]
fn length_comparison_guards_slice_access() {
    check(
        &[(
            "coll/slice.go",
            "package coll\n\nfunc _(s []int) int {\n\tif len(s) > 0 {\n\t\treturn s[0]\n\t}\n\treturn 0\n}\n",
        )],
        &[],
    );
}

#[test]
fn slice_expression_counts_as_use() {
    check(
        &[(
            "coll/slice.go",
            "package coll\n\nfunc _(s []int) []int {\n\treturn s[1:2]\n}\n",
        )],
        &[
            ("coll/slice.go", 3, "Declared 's'"),
            ("coll/slice.go", 4, "Unsafely used 's'"),
        ],
    );
}

#[test]
fn unguarded_map_index() {
    check(
        &[(
            "coll/map.go",
            "package coll\n\nfunc _(m map[string]int) int {\n\treturn m[\"k\"]\n}\n",
        )],
        &[
            ("coll/map.go", 3, "Declared 'm'"),
            ("coll/map.go", 4, "Unsafely used 'm'"),
        ],
    );
}

#[test]
fn nil_guard_sanitizes_map_index() {
    check(
        &[(
            "coll/map.go",
            "package coll\n\nfunc _(m map[string]int) int {\n\tif m != nil {\n\t\treturn m[\"k\"]\n\t}\n\treturn 0\n}\n",
        )],
        &[],
    );
}

// ============================================================================
// Recursive record declarations
// ============================================================================

#[test]
fn self_referential_record_terminates_and_reports() {
    // Three findings: the dereferenced `val`, the traversed `next`, and the
    // inner `n.next` selector on the pointer parameter itself.
    check(
        &[(
            "cyc/self.go",
            "package cyc\n\ntype Node struct {\n\tnext *Node\n\tval *int\n}\n\nfunc _(n *Node) {\n\tprint(*n.next.val)\n}\n",
        )],
        &[
            ("cyc/self.go", 8, "Declared 'n'"),
            ("cyc/self.go", 8, "Declared 'next'"),
            ("cyc/self.go", 8, "Declared 'val'"),
            ("cyc/self.go", 9, "Unsafely used 'n'"),
            ("cyc/self.go", 9, "Unsafely used 'next'"),
            ("cyc/self.go", 9, "Unsafely used 'val'"),
        ],
    );
}

#[test]
fn mutually_recursive_records_terminate() {
    check(
        &[(
            "cyc/mutual.go",
            "package cyc\n\ntype A struct {\n\tb *B\n}\n\ntype B struct {\n\ta *A\n}\n\nfunc _(a A) {\n\tif a.b != nil {\n\t\tprint(a.b)\n\t}\n}\n",
        )],
        &[],
    );
}

// ============================================================================
// Sentinel and misc behavior
// ============================================================================

#[test]
fn testing_t_parameter_is_never_tracked() {
    check(
        &[(
            "sent/a.go",
            "package sent\n\nimport \"testing\"\n\nfunc helper(t *testing.T) {\n\tprint(*t)\n}\n",
        )],
        &[],
    );
}

#[test]
fn equality_guard_form_also_sanitizes() {
    // The pairing is position-based, so even `== nil` (whose body runs in
    // the nil case) counts as a guard for anything after it.
    check(
        &[(
            "pointer/eq.go",
            "package pointer\n\nfunc _(p *int) {\n\tif p == nil {\n\t\treturn\n\t}\n\tprint(*p)\n}\n",
        )],
        &[],
    );
}

#[test]
fn unrelated_guard_does_not_sanitize() {
    check(
        &[(
            "pointer/two.go",
            "package pointer\n\nfunc _(p *int, q *string) {\n\tif q != nil {\n\t\tprint(*p)\n\t}\n}\n",
        )],
        &[
            ("pointer/two.go", 3, "Declared 'p'"),
            ("pointer/two.go", 5, "Unsafely used 'p'"),
        ],
    );
}

#[test]
fn same_typed_parameters_share_guards() {
    // Targeting is by static type, so a guard on one `*int` parameter
    // sanitizes later uses of another. This conflation is part of the
    // heuristic's contract.
    check(
        &[(
            "pointer/shared.go",
            "package pointer\n\nfunc _(p *int, q *int) {\n\tif q != nil {\n\t\tprint(*p)\n\t}\n}\n",
        )],
        &[],
    );
}

#[test]
fn analysis_is_idempotent_across_runs() {
    let units = &[(
        "nilstruct/a.go",
        "package nilstruct\n\ntype A struct {\n\tn *int\n}\n\nfunc _(a *A) {\n\tprint(a.n)\n}\n",
    )];
    let first = run(units);
    let second = run(units);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}
