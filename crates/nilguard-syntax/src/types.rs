//! Resolved objects and types.
//!
//! Both are arena-allocated handles: equality of an [`ObjId`] or [`TypeId`]
//! is identity of the declaration or type it stands for. The type table
//! hash-conses composite types (pointer, slice, map, func, …) so that two
//! occurrences of `*A` resolve to the same handle, which is what the
//! analyzer's type-equality checks rely on. Struct and interface types are
//! allocated once at their declaration site and never merged.

use ahash::AHashMap;

use crate::token::Pos;

/// Handle for a resolved declaration (parameter, field, function, type name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    Var,
    Param,
    Field,
    Func,
    Method,
    TypeName,
    PkgName,
    Builtin,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjKind,
    pub typ: TypeId,
    pub pos: Pos,
    /// Package qualifier: the package path for locally declared objects, the
    /// import name for synthesized foreign types (`testing` in `testing.T`).
    pub pkg: String,
}

/// Arena of resolved objects. "Same declaration ⇒ same handle" holds because
/// resolution allocates each declaration exactly once and lookups return the
/// stored handle.
#[derive(Debug, Default)]
pub struct Objects {
    arena: Vec<Object>,
}

impl Objects {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, obj: Object) -> ObjId {
        let id = ObjId(u32::try_from(self.arena.len()).unwrap_or(u32::MAX));
        self.arena.push(obj);
        id
    }

    #[must_use]
    pub fn get(&self, id: ObjId) -> &Object {
        &self.arena[id.0 as usize]
    }

    pub fn set_type(&mut self, id: ObjId, typ: TypeId) {
        self.arena[id.0 as usize].typ = typ;
    }
}

/// Handle for a type in the [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub obj: ObjId,
    pub typ: TypeId,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub obj: ObjId,
    pub typ: TypeId,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Invalid,
    Basic(&'static str),
    Pointer(TypeId),
    Slice(TypeId),
    Array(TypeId),
    Map(TypeId, TypeId),
    Chan(TypeId),
    Func {
        params: Vec<TypeId>,
        results: Vec<TypeId>,
    },
    Struct {
        fields: Vec<FieldDef>,
    },
    Interface {
        methods: Vec<MethodDef>,
    },
    Named {
        obj: ObjId,
        underlying: TypeId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InternKey {
    Basic(&'static str),
    Pointer(TypeId),
    Slice(TypeId),
    Array(TypeId),
    Map(TypeId, TypeId),
    Chan(TypeId),
    Func(Vec<TypeId>, Vec<TypeId>),
}

#[derive(Debug, Default)]
pub struct TypeTable {
    arena: Vec<TypeKind>,
    interned: AHashMap<InternKey, TypeId>,
}

impl TypeTable {
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self::default();
        // Slot 0 is the invalid type so that `TypeId::default()`-free code
        // can still use a well-known handle for "no type".
        table.arena.push(TypeKind::Invalid);
        table
    }

    #[must_use]
    pub fn invalid(&self) -> TypeId {
        TypeId(0)
    }

    #[must_use]
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.arena[id.0 as usize]
    }

    fn alloc(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(u32::try_from(self.arena.len()).unwrap_or(u32::MAX));
        self.arena.push(kind);
        id
    }

    fn intern(&mut self, key: InternKey, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let id = self.alloc(kind);
        self.interned.insert(key, id);
        id
    }

    pub fn basic(&mut self, name: &'static str) -> TypeId {
        self.intern(InternKey::Basic(name), TypeKind::Basic(name))
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.intern(InternKey::Pointer(elem), TypeKind::Pointer(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.intern(InternKey::Slice(elem), TypeKind::Slice(elem))
    }

    pub fn array(&mut self, elem: TypeId) -> TypeId {
        self.intern(InternKey::Array(elem), TypeKind::Array(elem))
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(InternKey::Map(key, value), TypeKind::Map(key, value))
    }

    pub fn chan(&mut self, elem: TypeId) -> TypeId {
        self.intern(InternKey::Chan(elem), TypeKind::Chan(elem))
    }

    pub fn func(&mut self, params: Vec<TypeId>, results: Vec<TypeId>) -> TypeId {
        self.intern(
            InternKey::Func(params.clone(), results.clone()),
            TypeKind::Func { params, results },
        )
    }

    pub fn struct_type(&mut self, fields: Vec<FieldDef>) -> TypeId {
        self.alloc(TypeKind::Struct { fields })
    }

    pub fn interface(&mut self, methods: Vec<MethodDef>) -> TypeId {
        self.alloc(TypeKind::Interface { methods })
    }

    /// Allocates a named type with a placeholder underlying; the resolver
    /// fills the underlying in a second pass so mutually recursive
    /// declarations work.
    pub fn named(&mut self, obj: ObjId) -> TypeId {
        let invalid = self.invalid();
        self.alloc(TypeKind::Named {
            obj,
            underlying: invalid,
        })
    }

    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        if let TypeKind::Named { underlying: u, .. } = &mut self.arena[named.0 as usize] {
            *u = underlying;
        }
    }

    /// Strips `named` layers down to the structural type.
    #[must_use]
    pub fn underlying(&self, mut id: TypeId) -> TypeId {
        let mut budget = 64u8;
        while let TypeKind::Named { underlying, .. } = self.kind(id) {
            if *underlying == id || budget == 0 {
                return self.invalid();
            }
            id = *underlying;
            budget -= 1;
        }
        id
    }

    /// Strips direct pointer layers (`**A` → `A`). Mirrors the shape check
    /// used when matching record parameters against record declarations; it
    /// deliberately does not look through named types.
    #[must_use]
    pub fn unwrap_ptr(&self, mut id: TypeId) -> TypeId {
        while let TypeKind::Pointer(elem) = self.kind(id) {
            id = *elem;
        }
        id
    }

    /// Whether the structural form of `id` admits the nil literal (or, for
    /// records, contains fields that may).
    #[must_use]
    pub fn is_nilable(&self, id: TypeId) -> bool {
        matches!(
            self.kind(self.underlying(id)),
            TypeKind::Pointer(_)
                | TypeKind::Slice(_)
                | TypeKind::Map(..)
                | TypeKind::Interface { .. }
                | TypeKind::Func { .. }
                | TypeKind::Struct { .. }
        )
    }

    /// Canonical string form, used for the `*testing.T` sentinel and for
    /// diagnostics. Named types print as `pkg.Name` and never recurse, so
    /// self-referential declarations are safe to print.
    #[must_use]
    pub fn type_string(&self, id: TypeId, objects: &Objects) -> String {
        match self.kind(id) {
            TypeKind::Invalid => String::from("invalid type"),
            TypeKind::Basic(name) => (*name).to_owned(),
            TypeKind::Pointer(elem) => format!("*{}", self.type_string(*elem, objects)),
            TypeKind::Slice(elem) => format!("[]{}", self.type_string(*elem, objects)),
            TypeKind::Array(elem) => format!("[...]{}", self.type_string(*elem, objects)),
            TypeKind::Map(k, v) => format!(
                "map[{}]{}",
                self.type_string(*k, objects),
                self.type_string(*v, objects)
            ),
            TypeKind::Chan(elem) => format!("chan {}", self.type_string(*elem, objects)),
            TypeKind::Func { params, results } => {
                let params = params
                    .iter()
                    .map(|p| self.type_string(*p, objects))
                    .collect::<Vec<_>>()
                    .join(", ");
                match results.as_slice() {
                    [] => format!("func({params})"),
                    [one] => format!("func({params}) {}", self.type_string(*one, objects)),
                    many => {
                        let results = many
                            .iter()
                            .map(|r| self.type_string(*r, objects))
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!("func({params}) ({results})")
                    }
                }
            }
            TypeKind::Struct { .. } => String::from("struct{...}"),
            TypeKind::Interface { .. } => String::from("interface{...}"),
            TypeKind::Named { obj, .. } => {
                let obj = objects.get(*obj);
                if obj.pkg.is_empty() {
                    obj.name.clone()
                } else {
                    format!("{}.{}", obj.pkg, obj.name)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_types_are_interned() {
        let mut types = TypeTable::new();
        let int = types.basic("int");
        let p1 = types.pointer(int);
        let p2 = types.pointer(int);
        assert_eq!(p1, p2);
        let s1 = types.slice(p1);
        let s2 = types.slice(p2);
        assert_eq!(s1, s2);
    }

    #[test]
    fn struct_types_are_not_merged() {
        let mut types = TypeTable::new();
        let a = types.struct_type(Vec::new());
        let b = types.struct_type(Vec::new());
        assert_ne!(a, b);
    }

    #[test]
    fn sentinel_type_string() {
        let mut objects = Objects::new();
        let mut types = TypeTable::new();
        let invalid = types.invalid();
        let obj = objects.alloc(Object {
            name: String::from("T"),
            kind: ObjKind::TypeName,
            typ: invalid,
            pos: crate::token::Pos::NONE,
            pkg: String::from("testing"),
        });
        let named = types.named(obj);
        objects.set_type(obj, named);
        let ptr = types.pointer(named);
        assert_eq!(types.type_string(ptr, &objects), "*testing.T");
    }

    #[test]
    fn underlying_tolerates_cycles() {
        let mut objects = Objects::new();
        let mut types = TypeTable::new();
        let invalid = types.invalid();
        let obj = objects.alloc(Object {
            name: String::from("A"),
            kind: ObjKind::TypeName,
            typ: invalid,
            pos: crate::token::Pos::NONE,
            pkg: String::new(),
        });
        let named = types.named(obj);
        types.set_underlying(named, named);
        assert_eq!(types.underlying(named), types.invalid());
    }
}
