//! Report aggregation and rendering.
//!
//! Findings from all compilation units funnel into one process-wide map
//! keyed by the violated parameter's declaration position. Aggregation takes
//! the write half of a readers-writer lock; printing takes the read half.
//! Each fresh declaration position claims the next report index and exactly
//! one declaration line; every finding contributes one use line, plus a
//! call-graph line when the enricher knows the enclosing function.

use ahash::AHashSet;
use colored::Colorize;
use indexmap::IndexMap;
use parking_lot::RwLock;

use nilguard_syntax::{Pos, Position, Program};

use crate::{callgraph::CallGraph, usage::ParamUsage};

/// One rendered report line, anchored to a source position.
#[derive(Debug, Clone)]
pub struct ReportMsg {
    pub pos: Pos,
    pub msg: String,
}

/// A test-mode marker: message emitted at an exact AST position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub position: Position,
    pub msg: String,
}

#[derive(Default)]
struct ReportState {
    reports: IndexMap<Pos, Vec<ReportMsg>>,
    index: usize,
    markers: Vec<Marker>,
    emitted: AHashSet<String>,
}

/// Process-wide report sink, shared across units.
pub struct Reporter {
    state: RwLock<ReportState>,
    test_mode: bool,
}

impl Reporter {
    #[must_use]
    pub fn new(test_mode: bool) -> Self {
        Self {
            state: RwLock::new(ReportState::default()),
            test_mode,
        }
    }

    /// Aggregates the violations of one function.
    pub fn add_reports(&self, program: &Program, callgraph: Option<&CallGraph>, violations: &[ParamUsage]) {
        for violated in violations {
            let (Some(func), Some(use_at)) = (violated.func, violated.use_at) else {
                continue;
            };
            let decl_pos = violated.declared_at;
            let use_pos = use_at.start;
            let decl_loc = program.fset.position(decl_pos);
            let use_loc = program.fset.position(use_pos);

            let member_name = program.objects.get(violated.param).name.clone();
            let (param_name, context_note) = match violated.context {
                Some(context) => (
                    program.objects.get(context).name.clone(),
                    format!("(member: '{member_name}')"),
                ),
                None => (member_name.clone(), String::new()),
            };

            let full_name = crate::callgraph::full_name(program, func);
            let chain_line = callgraph
                .and_then(|graph| graph.paths_for(&full_name))
                .map(|paths| format!("  ==> Feasible Callgraph path => [{}]", paths.join(", ")));

            let mut guard = self.state.write();
            let state = &mut *guard;
            let idx = format!("{:4}", state.index).as_str().red();
            let decl_msg = format!("[{idx}] Declared '{param_name}' at {full_name} -> {decl_loc}");
            let use_msg = format!("  --> Unsafely used '{param_name}' {context_note} at -> {use_loc}");

            let entry = state.reports.entry(decl_pos).or_default();
            if entry.is_empty() {
                entry.push(ReportMsg {
                    pos: decl_pos,
                    msg: decl_msg,
                });
                state.index += 1;
            }
            if let Some(chain_line) = chain_line {
                state.reports.entry(decl_pos).or_default().push(ReportMsg {
                    pos: use_pos,
                    msg: chain_line,
                });
            }
            state.reports.entry(decl_pos).or_default().push(ReportMsg {
                pos: use_pos,
                msg: use_msg,
            });

            if self.test_mode {
                // Test mode reports the member's own name at exact positions,
                // deduplicated by position-message keys.
                let decl_marker = format!("Declared '{member_name}'");
                let use_marker = format!("Unsafely used '{member_name}'");
                let decl_key = format!("{}-{decl_marker}", decl_pos.offset());
                let use_key = format!("{}-{use_marker}", use_pos.offset());
                if state.emitted.insert(decl_key) {
                    state.markers.push(Marker {
                        position: decl_loc.clone(),
                        msg: decl_marker,
                    });
                }
                if state.emitted.insert(use_key) {
                    state.markers.push(Marker {
                        position: use_loc.clone(),
                        msg: use_marker,
                    });
                }
            }
        }
    }

    /// Number of distinct violations (use lines) aggregated so far.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        let state = self.state.read();
        state
            .reports
            .values()
            .map(|msgs| msgs.iter().filter(|m| m.msg.contains("Unsafely used")).count())
            .sum()
    }

    /// Renders every aggregated line. Grouping is per declaration position;
    /// group order follows aggregation order and carries no meaning.
    pub fn print(&self, out: &mut impl std::io::Write) -> std::io::Result<()> {
        let state = self.state.read();
        for msgs in state.reports.values() {
            for msg in msgs {
                writeln!(out, "{}", msg.msg)?;
            }
        }
        Ok(())
    }

    /// Test-mode markers, ordered by position for stable comparison.
    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        let state = self.state.read();
        let mut markers = state.markers.clone();
        markers.sort_by(|a, b| {
            (&a.position.file, a.position.line, a.position.column, &a.msg).cmp(&(
                &b.position.file,
                b.position.line,
                b.position.column,
                &b.msg,
            ))
        });
        markers
    }
}
