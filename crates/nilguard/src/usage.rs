//! Guard and use records.

use nilguard_syntax::{ObjId, Pos, Span};

/// One classified occurrence of a tracked parameter (or tracked field).
///
/// Exactly one of `guard_at`/`use_at` is set at construction and neither is
/// mutated afterwards; the pairing stage only reads them. `context` is set
/// when the occurrence concerns a field reached through a parameter: it
/// names the root parameter while `param` names the field's use-site object.
#[derive(Debug, Clone)]
pub struct ParamUsage {
    pub param: ObjId,
    pub context: Option<ObjId>,
    pub guard_at: Option<Span>,
    pub use_at: Option<Span>,
    /// Declaration position of the root parameter, where the finding's
    /// declaration line is anchored.
    pub declared_at: Pos,
    /// Enclosing function, stamped by the pairing stage at emission time.
    pub func: Option<ObjId>,
}

impl ParamUsage {
    #[must_use]
    pub fn guard(param: ObjId, at: Span, declared_at: Pos) -> Self {
        Self {
            param,
            context: None,
            guard_at: Some(at),
            use_at: None,
            declared_at,
            func: None,
        }
    }

    #[must_use]
    pub fn usage(param: ObjId, at: Span, declared_at: Pos) -> Self {
        Self {
            param,
            context: None,
            guard_at: None,
            use_at: Some(at),
            declared_at,
            func: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: ObjId) -> Self {
        self.context = Some(context);
        self
    }
}
