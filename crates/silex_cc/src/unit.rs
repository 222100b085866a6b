//! The translation unit.
//!
//! A [`TranslationUnit`] is one file's worth of parsing state: the scope
//! tree, the declaration arena, the diagnostic sink and the configured C
//! standard. The parser writes into it; later passes read from it. Nothing
//! here is shared across translation units — a parallel driver gives each
//! unit its own instance.

use crate::ast::decl::{Decl, DeclId};
use crate::scope::{Scope, ScopeId};
use crate::standard::Standard;
use once_cell::sync::Lazy;
use silex_base::{Diagnostic, DiagnosticSink, Interner, Location, Symbol};
use std::rc::Rc;

/// Sister-language builtin type names usable in type position.
static BUILTIN_TYPES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Float32", "Float64", "Int16", "Int32", "Int64", "Int8", "Isize", "Uint16", "Uint32",
        "Uint64", "Uint8", "Usize",
    ]
});

static BUILTIN_FUNCTIONS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["__builtin_alloca", "__builtin_memcpy", "__builtin_memset"]);

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.binary_search(&name).is_ok()
}

pub fn is_builtin_function(name: &str) -> bool {
    BUILTIN_FUNCTIONS.binary_search(&name).is_ok()
}

pub struct TranslationUnit {
    pub name: Rc<str>,
    pub standard: Standard,
    pub sink: Rc<DiagnosticSink>,
    scopes: Vec<Scope>,
    decls: Vec<Decl>,
}

impl TranslationUnit {
    pub fn new(name: impl Into<Rc<str>>, standard: Standard, sink: Rc<DiagnosticSink>) -> Self {
        TranslationUnit {
            name: name.into(),
            standard,
            sink,
            scopes: vec![Scope::new(ScopeId(0), None, false)],
            decls: Vec::new(),
        }
    }

    /// The translation-unit root scope.
    pub fn base_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn add_scope(&mut self, parent: ScopeId, is_function_body: bool) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(id, Some(parent), is_function_body));
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.0]
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    fn push_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len());
        self.decls.push(decl);
        id
    }

    /// Registers `decl` into `scope`'s table for its category.
    ///
    /// A definition supersedes an earlier prototype of the same name; a
    /// second definition (or a prototype after a definition of a variable)
    /// reports a duplicate. Redefining a builtin is always an error.
    pub fn add_decl_to_scope(
        &mut self,
        decl: Decl,
        scope: ScopeId,
        interner: &Interner,
        location: &Location,
    ) -> DeclId {
        if let Some(name) = decl.name() {
            let text = interner.resolve(name);
            let redefined_builtin = match &decl {
                Decl::Typedef { .. } => is_builtin_type(text),
                Decl::Function { .. } => is_builtin_function(text),
                _ => false,
            };
            if redefined_builtin {
                self.sink.emit(Diagnostic::error(
                    format!("cannot redefine builtin `{}`", text),
                    location.clone(),
                ));
            }
        }

        let id = self.push_decl(decl);
        let name = match self.decls[id.0].name() {
            Some(name) => name,
            None => return id,
        };
        let is_prototype = self.decls[id.0].is_prototype();

        let existing = {
            let scope = &mut self.scopes[scope.0];
            match &self.decls[id.0] {
                Decl::Enum { .. } => scope.add_enum(name, id),
                Decl::EnumVariant { .. } => scope.add_enum_variant(name, id),
                Decl::Function { .. } => scope.add_function(name, id),
                Decl::Label { .. } => scope.add_label(name, id),
                Decl::Struct { .. } => scope.add_struct(name, id),
                Decl::Typedef { .. } => scope.add_typedef(name, id),
                Decl::Union { .. } => scope.add_union(name, id),
                Decl::Variable { .. } => scope.add_variable(name, id),
            }
        };

        if let Err(existing) = existing {
            let existing_is_prototype = self.decls[existing.0].is_prototype();

            if existing_is_prototype && !is_prototype {
                let scope = &mut self.scopes[scope.0];
                match &self.decls[id.0] {
                    Decl::Function { .. } => scope.replace_function(name, id),
                    Decl::Struct { .. } => scope.replace_struct(name, id),
                    Decl::Union { .. } => scope.replace_union(name, id),
                    Decl::Enum { .. } => scope.replace_enum(name, id),
                    _ => {
                        self.sink.emit(Diagnostic::error(
                            format!("`{}` is already declared", interner.resolve(name)),
                            location.clone(),
                        ));
                    }
                }
            } else if !is_prototype {
                self.sink.emit(Diagnostic::error(
                    format!("`{}` is already declared", interner.resolve(name)),
                    location.clone(),
                ));
            }
            // A repeated prototype is tolerated; the first binding wins.
        }

        id
    }

    /// Walks the scope chain from `scope` to the root.
    fn search(
        &self,
        scope: ScopeId,
        name: Symbol,
        get: impl Fn(&Scope, Symbol) -> Option<DeclId>,
    ) -> Option<DeclId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(found) = get(scope, name) {
                return Some(found);
            }
            current = scope.parent;
        }
        None
    }

    pub fn search_typedef(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        self.search(scope, name, Scope::typedef)
    }

    pub fn search_struct(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        self.search(scope, name, Scope::struct_)
    }

    pub fn search_union(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        self.search(scope, name, Scope::union_)
    }

    pub fn search_enum(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        self.search(scope, name, Scope::enum_)
    }

    pub fn search_enum_variant(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        self.search(scope, name, Scope::enum_variant)
    }

    pub fn search_function(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        self.search(scope, name, Scope::function)
    }

    pub fn search_variable(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        self.search(scope, name, Scope::variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::data_type::{DataType, DataTypeKind, StorageClasses};

    fn unit() -> (TranslationUnit, Interner) {
        (
            TranslationUnit::new("test.c", Standard::C23, Rc::new(DiagnosticSink::new())),
            Interner::new(),
        )
    }

    #[test]
    fn builtin_tables_are_sorted_for_binary_search() {
        let mut types = BUILTIN_TYPES.clone();
        types.sort_unstable();
        assert_eq!(*BUILTIN_TYPES, types);
        assert!(is_builtin_type("Usize"));
        assert!(!is_builtin_type("usize"));
        assert!(is_builtin_function("__builtin_memcpy"));
    }

    #[test]
    fn variable_search_walks_parent_scopes() {
        let (mut unit, mut interner) = unit();
        let name = interner.intern("x");
        let loc = Location::new(unit.name.clone());
        let id = unit.add_decl_to_scope(
            Decl::Variable {
                storage: StorageClasses::NONE,
                data_type: DataType::rc(DataTypeKind::Int),
                name,
                init: None,
                is_local: false,
            },
            unit.base_scope(),
            &interner,
            &loc,
        );

        let child = unit.add_scope(unit.base_scope(), true);
        assert_eq!(unit.search_variable(child, name), Some(id));
    }

    #[test]
    fn definition_supersedes_prototype() {
        let (mut unit, mut interner) = unit();
        let name = interner.intern("S");
        let loc = Location::new(unit.name.clone());

        unit.add_decl_to_scope(
            Decl::Struct {
                storage: StorageClasses::NONE,
                name: Some(name),
                generic_params: None,
                fields: None,
            },
            unit.base_scope(),
            &interner,
            &loc,
        );

        let mut fields = crate::ast::field::Fields::new();
        fields
            .add(
                Some(name),
                None,
                crate::ast::field::FieldKind::Member {
                    data_type: DataType::rc(DataTypeKind::Int),
                    bit: 0,
                },
            )
            .unwrap();
        let def = unit.add_decl_to_scope(
            Decl::Struct {
                storage: StorageClasses::NONE,
                name: Some(name),
                generic_params: None,
                fields: Some(Rc::new(fields)),
            },
            unit.base_scope(),
            &interner,
            &loc,
        );

        assert_eq!(unit.search_struct(unit.base_scope(), name), Some(def));
        assert_eq!(unit.sink.count_error(), 0);
    }

    #[test]
    fn redefining_builtin_function_is_reported() {
        let (mut unit, mut interner) = unit();
        let name = interner.intern("__builtin_memcpy");
        let loc = Location::new(unit.name.clone());
        unit.add_decl_to_scope(
            Decl::Function {
                storage: StorageClasses::NONE,
                name,
                ret: DataType::rc(DataTypeKind::Void),
                generic_params: None,
                params: None,
                body: None,
                attributes: Vec::new(),
            },
            unit.base_scope(),
            &interner,
            &loc,
        );
        assert_eq!(unit.sink.count_error(), 1);
    }
}
