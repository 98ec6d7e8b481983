//! Name resolution and type inference.
//!
//! Resolution runs per package in three passes: collect package-level names,
//! resolve declared type structure (so mutually recursive records work), then
//! walk function bodies recording a use object for every identifier the
//! checker can make sense of. Anything it cannot resolve — foreign packages,
//! unsupported constructs — is silently left without an object; the analyzer
//! treats such nodes as unclassifiable and moves on.

use ahash::{AHashMap, AHashSet};

use crate::{
    ast::{self, Decl, Expr, FieldGroup, File, FuncDecl, Ident, IdentId, Stmt, TypeExpr},
    token::{FileSet, Pos},
    types::{FieldDef, MethodDef, ObjId, ObjKind, Object, Objects, TypeId, TypeKind, TypeTable},
};

/// Identifier-to-object tables produced by resolution.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// Declaring identifier occurrence → declared object.
    pub defs: AHashMap<IdentId, ObjId>,
    /// Use-site identifier occurrence → referenced object.
    pub uses: AHashMap<IdentId, ObjId>,
}

impl TypeInfo {
    /// Declared-or-used object of an identifier occurrence.
    #[must_use]
    pub fn object_of(&self, id: IdentId) -> Option<ObjId> {
        self.defs.get(&id).or_else(|| self.uses.get(&id)).copied()
    }
}

/// Method lookup tables for selector resolution and call-graph construction.
#[derive(Debug, Default)]
pub struct MethodTable {
    /// `(named receiver type, method name)` → concrete method object.
    pub concrete: AHashMap<(TypeId, String), ObjId>,
    /// Method object → owner type (named type for concrete methods,
    /// interface type for interface methods).
    pub owner: AHashMap<ObjId, TypeId>,
}

/// A parsed package before resolution: its path plus its files.
pub struct ParsedPackage {
    pub path: String,
    pub files: Vec<File>,
}

/// A resolved package.
pub struct Package {
    pub name: String,
    pub path: String,
    pub files: Vec<File>,
}

/// The resolved whole program: syntax plus the object/type universe.
pub struct Program {
    pub fset: FileSet,
    pub objects: Objects,
    pub types: TypeTable,
    pub info: TypeInfo,
    pub methods: MethodTable,
    /// Named types observed being constructed (composite literals, `new`,
    /// variable declarations); the call-graph enricher uses this set to
    /// narrow interface dispatch.
    pub instantiated: AHashSet<TypeId>,
    pub packages: Vec<Package>,
}

/// Resolves all packages into a single program with shared arenas.
#[must_use]
pub fn resolve_program(fset: FileSet, parsed: Vec<ParsedPackage>) -> Program {
    let mut program = Program {
        fset,
        objects: Objects::new(),
        types: TypeTable::new(),
        info: TypeInfo::default(),
        methods: MethodTable::default(),
        instantiated: AHashSet::new(),
        packages: Vec::new(),
    };

    let mut resolver = Resolver {
        objects: &mut program.objects,
        types: &mut program.types,
        info: &mut program.info,
        methods: &mut program.methods,
        instantiated: &mut program.instantiated,
        scopes: Vec::new(),
        imported: AHashMap::new(),
        pkg_path: String::new(),
    };
    resolver.install_universe();

    for pkg in parsed {
        let name = pkg
            .files
            .first()
            .map(|f| f.package.name.clone())
            .unwrap_or_default();
        let pkg = Package {
            name,
            path: pkg.path,
            files: pkg.files,
        };
        resolver.resolve_package(&pkg);
        program.packages.push(pkg);
    }
    program
}

struct Resolver<'a> {
    objects: &'a mut Objects,
    types: &'a mut TypeTable,
    info: &'a mut TypeInfo,
    methods: &'a mut MethodTable,
    instantiated: &'a mut AHashSet<TypeId>,
    /// Scope stack; index 0 is the universe scope.
    scopes: Vec<AHashMap<String, ObjId>>,
    /// Synthesized opaque named types for `pkg.T` references.
    imported: AHashMap<(String, String), TypeId>,
    pkg_path: String,
}

impl Resolver<'_> {
    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, obj: ObjId) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), obj);
        }
    }

    fn lookup(&self, name: &str) -> Option<ObjId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.contains_key(name))
    }

    fn alloc(&mut self, name: &str, kind: ObjKind, typ: TypeId, pos: Pos) -> ObjId {
        self.objects.alloc(Object {
            name: name.to_owned(),
            kind,
            typ,
            pos,
            pkg: self.pkg_path.clone(),
        })
    }

    /// Predeclared identifiers: basic types, builtin functions, constants.
    fn install_universe(&mut self) {
        self.push_scope();
        let basics = [
            "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32",
            "uint64", "uintptr", "float32", "float64", "complex64", "complex128", "byte", "rune",
        ];
        for name in basics {
            let typ = self.types.basic(name);
            let obj = self.alloc(name, ObjKind::TypeName, typ, Pos::NONE);
            self.declare(name, obj);
        }

        // `error` is a named interface with a single Error() string method.
        let invalid = self.types.invalid();
        let error_obj = self.alloc("error", ObjKind::TypeName, invalid, Pos::NONE);
        let error_named = self.types.named(error_obj);
        self.objects.set_type(error_obj, error_named);
        let string_t = self.types.basic("string");
        let error_sig = self.types.func(Vec::new(), vec![string_t]);
        let error_method = self.alloc("Error", ObjKind::Method, error_sig, Pos::NONE);
        let error_iface = self.types.interface(vec![MethodDef {
            name: String::from("Error"),
            obj: error_method,
            typ: error_sig,
        }]);
        self.types.set_underlying(error_named, error_iface);
        self.methods.owner.insert(error_method, error_iface);
        self.declare("error", error_obj);

        let builtins = [
            "len", "cap", "new", "make", "append", "copy", "delete", "panic", "recover", "print", "println",
            "close", "nil",
        ];
        for name in builtins {
            let obj = self.alloc(name, ObjKind::Builtin, invalid, Pos::NONE);
            self.declare(name, obj);
        }

        let bool_t = self.types.basic("bool");
        for name in ["true", "false"] {
            let obj = self.alloc(name, ObjKind::Var, bool_t, Pos::NONE);
            self.declare(name, obj);
        }
        let int_t = self.types.basic("int");
        let iota = self.alloc("iota", ObjKind::Var, int_t, Pos::NONE);
        self.declare("iota", iota);
    }

    // ------------------------------------------------------------------
    // Package passes
    // ------------------------------------------------------------------

    fn resolve_package(&mut self, pkg: &Package) {
        self.pkg_path = pkg.path.clone();
        self.scopes.truncate(1);
        self.push_scope();

        self.collect_package_names(pkg);
        self.resolve_declared_types(pkg);
        self.resolve_bodies(pkg);

        self.pop_scope();
        self.pkg_path = String::new();
    }

    /// Pass 1: enter every package-level name into the package scope so
    /// declaration order never matters.
    fn collect_package_names(&mut self, pkg: &Package) {
        for file in &pkg.files {
            for decl in &file.decls {
                match decl {
                    Decl::Import(specs) => {
                        let invalid = self.types.invalid();
                        for spec in specs {
                            let obj = self.alloc(&spec.name, ObjKind::PkgName, invalid, spec.span.start);
                            self.declare(&spec.name, obj);
                        }
                    }
                    Decl::Type(specs) => {
                        for spec in specs {
                            let invalid = self.types.invalid();
                            let obj = self.alloc(&spec.name.name, ObjKind::TypeName, invalid, spec.name.span.start);
                            if !spec.alias {
                                let named = self.types.named(obj);
                                self.objects.set_type(obj, named);
                            }
                            self.info.defs.insert(spec.name.id, obj);
                            self.declare(&spec.name.name, obj);
                        }
                    }
                    Decl::Func(func) => {
                        let invalid = self.types.invalid();
                        let kind = if func.recv.is_some() {
                            ObjKind::Method
                        } else {
                            ObjKind::Func
                        };
                        let obj = self.alloc(&func.name.name, kind, invalid, func.name.span.start);
                        self.info.defs.insert(func.name.id, obj);
                        if func.recv.is_none() {
                            self.declare(&func.name.name, obj);
                        }
                    }
                    Decl::Var(stmts) => {
                        let invalid = self.types.invalid();
                        for stmt in stmts {
                            if let Stmt::Var { names, .. } = stmt {
                                for name in names {
                                    let obj = self.alloc(&name.name, ObjKind::Var, invalid, name.span.start);
                                    self.info.defs.insert(name.id, obj);
                                    self.declare(&name.name, obj);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Pass 2: resolve the structure of declared types and signatures.
    fn resolve_declared_types(&mut self, pkg: &Package) {
        for file in &pkg.files {
            for decl in &file.decls {
                match decl {
                    Decl::Type(specs) => {
                        for spec in specs {
                            let Some(&obj) = self.info.defs.get(&spec.name.id) else {
                                continue;
                            };
                            let resolved = self.resolve_type(&spec.typ);
                            if spec.alias {
                                self.objects.set_type(obj, resolved);
                            } else {
                                let named = self.objects.get(obj).typ;
                                self.types.set_underlying(named, resolved);
                            }
                        }
                    }
                    Decl::Func(func) => self.resolve_signature(func),
                    Decl::Var(stmts) => {
                        for stmt in stmts {
                            if let Stmt::Var { names, typ: Some(te), .. } = stmt {
                                let resolved = self.resolve_type(te);
                                for name in names {
                                    if let Some(&obj) = self.info.defs.get(&name.id) {
                                        self.objects.set_type(obj, resolved);
                                    }
                                }
                            }
                        }
                    }
                    Decl::Import(_) => {}
                }
            }
        }
    }

    /// Resolves a function's parameter/result types, creates the parameter
    /// objects, and registers methods on their receiver type.
    fn resolve_signature(&mut self, func: &FuncDecl) {
        let Some(&fn_obj) = self.info.defs.get(&func.name.id) else {
            return;
        };

        if let Some(recv) = &func.recv {
            let recv_type = self.resolve_type(&recv.typ);
            for name in &recv.names {
                let obj = self.alloc(&name.name, ObjKind::Param, recv_type, name.span.start);
                self.info.defs.insert(name.id, obj);
            }
            let base = self.types.unwrap_ptr(recv_type);
            if matches!(self.types.kind(base), TypeKind::Named { .. }) {
                self.methods
                    .concrete
                    .insert((base, func.name.name.clone()), fn_obj);
                self.methods.owner.insert(fn_obj, base);
            }
        }

        let params = self.resolve_param_groups(&func.sig.params, ObjKind::Param);
        let results = self.resolve_param_groups(&func.sig.results, ObjKind::Var);
        let sig_type = self.types.func(params, results);
        self.objects.set_type(fn_obj, sig_type);
    }

    /// Resolves parameter groups, creating one object per declared name, and
    /// returns the flattened type list.
    fn resolve_param_groups(&mut self, groups: &[FieldGroup], kind: ObjKind) -> Vec<TypeId> {
        let mut flat = Vec::new();
        for group in groups {
            let typ = self.resolve_type(&group.typ);
            if group.names.is_empty() {
                flat.push(typ);
            } else {
                for name in &group.names {
                    let obj = self.alloc(&name.name, kind, typ, name.span.start);
                    self.info.defs.insert(name.id, obj);
                    flat.push(typ);
                }
            }
        }
        flat
    }

    // ------------------------------------------------------------------
    // Type expressions
    // ------------------------------------------------------------------

    fn resolve_type(&mut self, te: &TypeExpr) -> TypeId {
        match te {
            TypeExpr::Name(ident) => {
                let Some(obj) = self.lookup(&ident.name) else {
                    return self.types.invalid();
                };
                self.info.uses.insert(ident.id, obj);
                match self.objects.get(obj).kind {
                    ObjKind::TypeName => self.objects.get(obj).typ,
                    _ => self.types.invalid(),
                }
            }
            TypeExpr::Qualified { pkg, name, .. } => {
                if let Some(obj) = self.lookup(&pkg.name) {
                    self.info.uses.insert(pkg.id, obj);
                }
                self.foreign_named(&pkg.name, &name.name)
            }
            TypeExpr::Pointer { elem, .. } => {
                let elem = self.resolve_type(elem);
                self.types.pointer(elem)
            }
            TypeExpr::Slice { elem, .. } => {
                let elem = self.resolve_type(elem);
                self.types.slice(elem)
            }
            TypeExpr::Array { elem, .. } => {
                let elem = self.resolve_type(elem);
                self.types.array(elem)
            }
            TypeExpr::Map { key, value, .. } => {
                let key = self.resolve_type(key);
                let value = self.resolve_type(value);
                self.types.map(key, value)
            }
            TypeExpr::Chan { elem, .. } => {
                let elem = self.resolve_type(elem);
                self.types.chan(elem)
            }
            TypeExpr::Func { sig, .. } => {
                let params = self.type_list(&sig.params);
                let results = self.type_list(&sig.results);
                self.types.func(params, results)
            }
            TypeExpr::Struct { fields, .. } => {
                let mut defs = Vec::new();
                for group in fields {
                    let typ = self.resolve_type(&group.typ);
                    for name in &group.names {
                        let obj = self.alloc(&name.name, ObjKind::Field, typ, name.span.start);
                        self.info.defs.insert(name.id, obj);
                        defs.push(FieldDef {
                            name: name.name.clone(),
                            obj,
                            typ,
                        });
                    }
                    // Embedded fields are carried as unnamed entries so the
                    // struct shape stays faithful, but they are not tracked.
                }
                self.types.struct_type(defs)
            }
            TypeExpr::Interface { methods, .. } => {
                let mut defs = Vec::new();
                for spec in methods {
                    let params = self.type_list(&spec.sig.params);
                    let results = self.type_list(&spec.sig.results);
                    let sig = self.types.func(params, results);
                    let obj = self.alloc(&spec.name.name, ObjKind::Method, sig, spec.name.span.start);
                    self.info.defs.insert(spec.name.id, obj);
                    defs.push(MethodDef {
                        name: spec.name.name.clone(),
                        obj,
                        typ: sig,
                    });
                }
                let iface = self.types.interface(defs.clone());
                for def in &defs {
                    self.methods.owner.insert(def.obj, iface);
                }
                iface
            }
        }
    }

    fn type_list(&mut self, groups: &[FieldGroup]) -> Vec<TypeId> {
        let mut flat = Vec::new();
        for group in groups {
            let typ = self.resolve_type(&group.typ);
            let n = group.names.len().max(1);
            flat.extend(std::iter::repeat_n(typ, n));
        }
        flat
    }

    /// Synthesizes one opaque named type per distinct `pkg.T` reference, so
    /// the sentinel check can see `*testing.T` spelled out.
    fn foreign_named(&mut self, pkg: &str, name: &str) -> TypeId {
        let key = (pkg.to_owned(), name.to_owned());
        if let Some(&typ) = self.imported.get(&key) {
            return typ;
        }
        let invalid = self.types.invalid();
        let obj = self.objects.alloc(Object {
            name: name.to_owned(),
            kind: ObjKind::TypeName,
            typ: invalid,
            pos: Pos::NONE,
            pkg: pkg.to_owned(),
        });
        let named = self.types.named(obj);
        self.objects.set_type(obj, named);
        self.imported.insert(key, named);
        named
    }

    // ------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------

    fn resolve_bodies(&mut self, pkg: &Package) {
        for file in &pkg.files {
            for decl in &file.decls {
                match decl {
                    Decl::Var(stmts) => {
                        for stmt in stmts {
                            if let Stmt::Var { names, values, typ, .. } = stmt {
                                for value in values {
                                    let inferred = self.infer_expr(value);
                                    if typ.is_none() && names.len() == values.len() {
                                        for name in names {
                                            if let Some(&obj) = self.info.defs.get(&name.id) {
                                                self.objects.set_type(obj, inferred);
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    Decl::Func(func) => self.resolve_func_body(func),
                    Decl::Import(_) | Decl::Type(_) => {}
                }
            }
        }
    }

    fn resolve_func_body(&mut self, func: &FuncDecl) {
        let Some(body) = &func.body else {
            return;
        };
        self.push_scope();
        if let Some(recv) = &func.recv {
            for name in &recv.names {
                if let Some(&obj) = self.info.defs.get(&name.id) {
                    self.declare(&name.name, obj);
                }
            }
        }
        for group in func.sig.params.iter().chain(func.sig.results.iter()) {
            for name in &group.names {
                if let Some(&obj) = self.info.defs.get(&name.id) {
                    self.declare(&name.name, obj);
                }
            }
        }
        for stmt in &body.stmts {
            self.resolve_stmt(stmt);
        }
        self.pop_scope();
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) | Stmt::IncDec { x: e, .. } | Stmt::GoDefer { call: e, .. } => {
                self.infer_expr(e);
            }
            Stmt::Assign {
                lhs, rhs, define, ..
            } => {
                let rhs_types: Vec<TypeId> = rhs.iter().map(|e| self.infer_expr(e)).collect();
                if *define {
                    for (i, target) in lhs.iter().enumerate() {
                        let Expr::Ident(ident) = target else {
                            self.infer_expr(target);
                            continue;
                        };
                        if self.in_current_scope(&ident.name) {
                            self.use_ident(ident);
                        } else {
                            let typ = if lhs.len() == rhs_types.len() {
                                rhs_types[i]
                            } else {
                                self.types.invalid()
                            };
                            let obj = self.alloc(&ident.name, ObjKind::Var, typ, ident.span.start);
                            self.info.defs.insert(ident.id, obj);
                            self.declare(&ident.name, obj);
                        }
                    }
                } else {
                    for target in lhs {
                        self.infer_expr(target);
                    }
                }
            }
            Stmt::Var {
                names, typ, values, ..
            } => {
                let declared = typ.as_ref().map(|te| self.resolve_type(te));
                let value_types: Vec<TypeId> = values.iter().map(|e| self.infer_expr(e)).collect();
                for (i, name) in names.iter().enumerate() {
                    let typ = declared.unwrap_or_else(|| {
                        value_types.get(i).copied().unwrap_or_else(|| self.types.invalid())
                    });
                    let obj = self.alloc(&name.name, ObjKind::Var, typ, name.span.start);
                    self.info.defs.insert(name.id, obj);
                    self.declare(&name.name, obj);
                    if let Some(declared) = declared {
                        self.mark_instantiated(declared);
                    }
                }
            }
            Stmt::Return { results, .. } => {
                for e in results {
                    self.infer_expr(e);
                }
            }
            Stmt::Block(block) => self.resolve_block(block),
            Stmt::If {
                init,
                cond,
                then,
                els,
                ..
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                self.infer_expr(cond);
                self.resolve_block(then);
                if let Some(els) = els {
                    self.resolve_stmt(els);
                }
                self.pop_scope();
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
                ..
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = cond {
                    self.infer_expr(cond);
                }
                if let Some(post) = post {
                    self.resolve_stmt(post);
                }
                self.resolve_block(body);
                self.pop_scope();
            }
            Stmt::Range {
                key,
                value,
                define,
                x,
                body,
                ..
            } => {
                self.push_scope();
                let subject = self.infer_expr(x);
                let (key_t, value_t) = self.range_binding_types(subject);
                for (target, typ) in [(key, key_t), (value, value_t)] {
                    let Some(target) = target else { continue };
                    if *define {
                        if let Expr::Ident(ident) = target {
                            let obj = self.alloc(&ident.name, ObjKind::Var, typ, ident.span.start);
                            self.info.defs.insert(ident.id, obj);
                            self.declare(&ident.name, obj);
                            continue;
                        }
                    }
                    self.infer_expr(target);
                }
                self.resolve_block(body);
                self.pop_scope();
            }
            Stmt::Switch {
                init, tag, cases, ..
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(tag) = tag {
                    self.infer_expr(tag);
                }
                for case in cases {
                    self.push_scope();
                    for e in &case.exprs {
                        self.infer_expr(e);
                    }
                    for s in &case.body {
                        self.resolve_stmt(s);
                    }
                    self.pop_scope();
                }
                self.pop_scope();
            }
            Stmt::TypeSwitch {
                bind,
                subject,
                cases,
                ..
            } => {
                self.push_scope();
                let subject_type = self.infer_expr(subject);
                if let Some(bind) = bind {
                    let obj = self.alloc(&bind.name, ObjKind::Var, subject_type, bind.span.start);
                    self.info.defs.insert(bind.id, obj);
                    self.declare(&bind.name, obj);
                }
                for case in cases {
                    for te in &case.types {
                        self.resolve_type(te);
                    }
                    self.push_scope();
                    for s in &case.body {
                        self.resolve_stmt(s);
                    }
                    self.pop_scope();
                }
                self.pop_scope();
            }
            Stmt::Branch { .. } | Stmt::Empty { .. } => {}
        }
    }

    fn resolve_block(&mut self, block: &ast::Block) {
        self.push_scope();
        for s in &block.stmts {
            self.resolve_stmt(s);
        }
        self.pop_scope();
    }

    fn range_binding_types(&mut self, subject: TypeId) -> (TypeId, TypeId) {
        let int_t = self.types.basic("int");
        match self.types.kind(self.types.underlying(subject)) {
            TypeKind::Slice(elem) | TypeKind::Array(elem) => (int_t, *elem),
            TypeKind::Map(k, v) => (*k, *v),
            TypeKind::Basic("string") => (int_t, self.types.basic("rune")),
            _ => (self.types.invalid(), self.types.invalid()),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn use_ident(&mut self, ident: &Ident) -> Option<ObjId> {
        let obj = self.lookup(&ident.name)?;
        self.info.uses.insert(ident.id, obj);
        Some(obj)
    }

    fn infer_expr(&mut self, expr: &Expr) -> TypeId {
        match expr {
            Expr::Ident(ident) => match self.use_ident(ident) {
                Some(obj) => self.objects.get(obj).typ,
                None => self.types.invalid(),
            },
            Expr::Lit { kind, .. } => match kind {
                ast::LitKind::Int => self.types.basic("int"),
                ast::LitKind::Float => self.types.basic("float64"),
                ast::LitKind::Char => self.types.basic("rune"),
                ast::LitKind::Str => self.types.basic("string"),
            },
            Expr::Selector { x, sel, .. } => self.infer_selector(x, sel),
            Expr::Call { func, args, .. } => self.infer_call(func, args),
            Expr::Star { x, .. } => {
                let t = self.infer_expr(x);
                match self.types.kind(self.types.underlying(t)) {
                    TypeKind::Pointer(elem) => *elem,
                    _ => self.types.invalid(),
                }
            }
            Expr::Unary { op, x, .. } => {
                let t = self.infer_expr(x);
                match op {
                    ast::UnOp::Addr => self.types.pointer(t),
                    ast::UnOp::Not => self.types.basic("bool"),
                    ast::UnOp::Neg | ast::UnOp::Pos => t,
                    ast::UnOp::Recv => match self.types.kind(self.types.underlying(t)) {
                        TypeKind::Chan(elem) => *elem,
                        _ => self.types.invalid(),
                    },
                }
            }
            Expr::Binary { x, op, y, .. } => {
                let t = self.infer_expr(x);
                self.infer_expr(y);
                if op.is_ordering_or_equality() || matches!(op, ast::BinOp::LogAnd | ast::BinOp::LogOr) {
                    self.types.basic("bool")
                } else {
                    t
                }
            }
            Expr::Index { x, index, .. } => {
                let t = self.infer_expr(x);
                self.infer_expr(index);
                match self.types.kind(self.types.underlying(t)) {
                    TypeKind::Slice(elem) | TypeKind::Array(elem) => *elem,
                    TypeKind::Map(_, value) => *value,
                    TypeKind::Basic("string") => self.types.basic("byte"),
                    _ => self.types.invalid(),
                }
            }
            Expr::Slice { x, low, high, .. } => {
                let t = self.infer_expr(x);
                if let Some(low) = low {
                    self.infer_expr(low);
                }
                if let Some(high) = high {
                    self.infer_expr(high);
                }
                t
            }
            Expr::TypeAssert { x, typ, .. } => {
                self.infer_expr(x);
                match typ {
                    Some(te) => self.resolve_type(te),
                    None => self.types.invalid(),
                }
            }
            Expr::Composite { typ, elts, .. } => {
                let t = self.resolve_type(typ);
                self.mark_instantiated(t);
                self.infer_composite_elts(t, elts);
                t
            }
            Expr::KeyValue { key, value, .. } => {
                self.infer_expr(key);
                self.infer_expr(value)
            }
            Expr::Paren { x, .. } => self.infer_expr(x),
            Expr::TypeRef { typ, .. } => self.resolve_type(typ),
        }
    }

    fn infer_composite_elts(&mut self, t: TypeId, elts: &[Expr]) {
        let underlying = self.types.underlying(self.types.unwrap_ptr(t));
        let struct_fields: Option<Vec<(String, ObjId, TypeId)>> = match self.types.kind(underlying) {
            TypeKind::Struct { fields } => Some(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), f.obj, f.typ))
                    .collect(),
            ),
            _ => None,
        };
        for elt in elts {
            match (elt, &struct_fields) {
                // `Field: value` in a struct literal: the key names a field,
                // not a scope entry.
                (Expr::KeyValue { key, value, .. }, Some(fields)) => {
                    if let Expr::Ident(ident) = key.as_ref()
                        && let Some((_, obj, _)) = fields.iter().find(|(n, ..)| *n == ident.name)
                    {
                        self.info.uses.insert(ident.id, *obj);
                    }
                    self.infer_expr(value);
                }
                _ => {
                    self.infer_expr(elt);
                }
            }
        }
    }

    fn infer_selector(&mut self, x: &Expr, sel: &Ident) -> TypeId {
        // Selectors through an imported package are opaque.
        if let Expr::Ident(base) = x
            && let Some(obj) = self.lookup(&base.name)
            && self.objects.get(obj).kind == ObjKind::PkgName
        {
            self.info.uses.insert(base.id, obj);
            return self.types.invalid();
        }

        let t = self.infer_expr(x);
        let base = self.types.unwrap_ptr(t);

        // Concrete methods on the named receiver type win over fields.
        if matches!(self.types.kind(base), TypeKind::Named { .. })
            && let Some(&method) = self.methods.concrete.get(&(base, sel.name.clone()))
        {
            self.info.uses.insert(sel.id, method);
            return self.objects.get(method).typ;
        }

        match self.types.kind(self.types.underlying(base)) {
            TypeKind::Struct { fields } => {
                if let Some(field) = fields.iter().find(|f| f.name == sel.name) {
                    let (obj, typ) = (field.obj, field.typ);
                    self.info.uses.insert(sel.id, obj);
                    return typ;
                }
                self.types.invalid()
            }
            TypeKind::Interface { methods } => {
                if let Some(method) = methods.iter().find(|m| m.name == sel.name) {
                    let (obj, typ) = (method.obj, method.typ);
                    self.info.uses.insert(sel.id, obj);
                    return typ;
                }
                self.types.invalid()
            }
            _ => self.types.invalid(),
        }
    }

    fn infer_call(&mut self, func: &Expr, args: &[Expr]) -> TypeId {
        // Builtins and conversions need the callee object, not just its type.
        if let Expr::Ident(ident) = peel_parens(func) {
            if let Some(obj) = self.use_ident(ident) {
                match self.objects.get(obj).kind {
                    ObjKind::Builtin => {
                        let name = self.objects.get(obj).name.clone();
                        return self.infer_builtin_call(&name, args);
                    }
                    ObjKind::TypeName => {
                        // Conversion `T(x)`.
                        for arg in args {
                            self.infer_expr(arg);
                        }
                        return self.objects.get(obj).typ;
                    }
                    _ => {}
                }
            } else {
                for arg in args {
                    self.infer_expr(arg);
                }
                return self.types.invalid();
            }
        }

        let t = self.infer_expr(func);
        for arg in args {
            self.infer_expr(arg);
        }
        match self.types.kind(self.types.underlying(t)) {
            TypeKind::Func { results, .. } => match results.as_slice() {
                [one] => *one,
                _ => self.types.invalid(),
            },
            _ => self.types.invalid(),
        }
    }

    fn infer_builtin_call(&mut self, name: &str, args: &[Expr]) -> TypeId {
        let arg_types: Vec<TypeId> = args.iter().map(|a| self.infer_expr(a)).collect();
        match name {
            "len" | "cap" | "copy" => self.types.basic("int"),
            "new" => {
                let elem = arg_types.first().copied().unwrap_or_else(|| self.types.invalid());
                self.mark_instantiated(elem);
                self.types.pointer(elem)
            }
            "make" | "append" => arg_types.first().copied().unwrap_or_else(|| self.types.invalid()),
            _ => self.types.invalid(),
        }
    }

    fn mark_instantiated(&mut self, t: TypeId) {
        let base = self.types.unwrap_ptr(t);
        if matches!(self.types.kind(base), TypeKind::Named { .. }) {
            self.instantiated.insert(base);
        }
    }
}

fn peel_parens(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren { x, .. } => peel_parens(x),
        other => other,
    }
}
