//! Scope tree.
//!
//! Scopes form a tree rooted at the translation-unit scope; each scope
//! holds one flat symbol table per declaration category, keyed by interned
//! name. Child scopes reference their parent by [`ScopeId`], never by
//! pointer, so the tree is owned wholesale by the translation unit.

use crate::ast::decl::DeclId;
use rustc_hash::FxHashMap;
use silex_base::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScopeId(pub usize);

#[derive(Debug, Default)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub is_function_body: bool,
    functions: FxHashMap<Symbol, DeclId>,
    variables: FxHashMap<Symbol, DeclId>,
    enums: FxHashMap<Symbol, DeclId>,
    enum_variants: FxHashMap<Symbol, DeclId>,
    structs: FxHashMap<Symbol, DeclId>,
    unions: FxHashMap<Symbol, DeclId>,
    typedefs: FxHashMap<Symbol, DeclId>,
    labels: FxHashMap<Symbol, DeclId>,
}

macro_rules! table {
    ($add:ident, $get:ident, $field:ident) => {
        /// Registers a name; returns the already-registered id when the
        /// name exists in this table.
        pub fn $add(&mut self, name: Symbol, decl: DeclId) -> Result<(), DeclId> {
            match self.$field.get(&name) {
                Some(existing) => Err(*existing),
                None => {
                    self.$field.insert(name, decl);
                    Ok(())
                }
            }
        }

        pub fn $get(&self, name: Symbol) -> Option<DeclId> {
            self.$field.get(&name).copied()
        }
    };
}

impl Scope {
    pub fn new(id: ScopeId, parent: Option<ScopeId>, is_function_body: bool) -> Self {
        Scope {
            id,
            parent,
            is_function_body,
            ..Scope::default()
        }
    }

    table!(add_function, function, functions);
    table!(add_variable, variable, variables);
    table!(add_enum, enum_, enums);
    table!(add_enum_variant, enum_variant, enum_variants);
    table!(add_struct, struct_, structs);
    table!(add_union, union_, unions);
    table!(add_typedef, typedef, typedefs);
    table!(add_label, label, labels);

    /// Replaces an existing binding; used when a definition supersedes a
    /// prototype.
    pub fn replace_function(&mut self, name: Symbol, decl: DeclId) {
        self.functions.insert(name, decl);
    }

    pub fn replace_struct(&mut self, name: Symbol, decl: DeclId) {
        self.structs.insert(name, decl);
    }

    pub fn replace_union(&mut self, name: Symbol, decl: DeclId) {
        self.unions.insert(name, decl);
    }

    pub fn replace_enum(&mut self, name: Symbol, decl: DeclId) {
        self.enums.insert(name, decl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_returns_existing() {
        let mut scope = Scope::new(ScopeId(0), None, false);
        scope.add_variable(Symbol(1), DeclId(0)).unwrap();
        assert_eq!(scope.add_variable(Symbol(1), DeclId(1)), Err(DeclId(0)));
        assert_eq!(scope.variable(Symbol(1)), Some(DeclId(0)));
    }

    #[test]
    fn categories_do_not_collide() {
        let mut scope = Scope::new(ScopeId(0), None, false);
        scope.add_struct(Symbol(1), DeclId(0)).unwrap();
        assert!(scope.add_typedef(Symbol(1), DeclId(1)).is_ok());
    }
}
