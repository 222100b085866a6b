//! Declarations.
//!
//! Declarations are owned by the translation unit's arena and referenced by
//! [`DeclId`] from scopes and function bodies, so a declaration registered
//! in several places (a comma chain inside a body, a struct named from a
//! variable declaration) has exactly one owner.

use crate::ast::data_type::{DataType, FunctionParam, GenericParams, StorageClasses};
use crate::ast::field::Fields;
use crate::ast::stmt::Body;
use silex_base::Symbol;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: Symbol,
    pub value: i64,
}

/// A `[[..]]` standard attribute, including the GNU spellings the parser
/// accepts (`__deprecated__`, …) which normalize onto the same kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Deprecated(Option<Symbol>),
    Fallthrough,
    MaybeUnused,
    Nodiscard(Option<Symbol>),
    Noreturn,
    Unsequenced,
    Reproducible,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Enum {
        storage: StorageClasses,
        name: Option<Symbol>,
        variants: Option<Vec<EnumVariant>>,
        underlying: Option<Rc<DataType>>,
    },
    EnumVariant {
        parent: Option<Symbol>,
        underlying: Option<Rc<DataType>>,
        name: Symbol,
        value: i64,
    },
    Function {
        storage: StorageClasses,
        name: Symbol,
        ret: Rc<DataType>,
        generic_params: Option<GenericParams>,
        params: Option<Vec<FunctionParam>>,
        body: Option<Body>,
        attributes: Vec<Attribute>,
    },
    Label {
        name: Symbol,
    },
    Struct {
        storage: StorageClasses,
        name: Option<Symbol>,
        generic_params: Option<GenericParams>,
        fields: Option<Rc<Fields>>,
    },
    Typedef {
        name: Symbol,
        generic_params: Option<GenericParams>,
        aliased: Rc<DataType>,
    },
    Union {
        storage: StorageClasses,
        name: Option<Symbol>,
        generic_params: Option<GenericParams>,
        fields: Option<Rc<Fields>>,
    },
    Variable {
        storage: StorageClasses,
        data_type: Rc<DataType>,
        name: Symbol,
        init: Option<crate::ast::expr::Expr>,
        is_local: bool,
    },
}

impl Decl {
    pub fn name(&self) -> Option<Symbol> {
        match self {
            Decl::Enum { name, .. } | Decl::Struct { name, .. } | Decl::Union { name, .. } => {
                *name
            }
            Decl::EnumVariant { name, .. }
            | Decl::Function { name, .. }
            | Decl::Label { name }
            | Decl::Typedef { name, .. }
            | Decl::Variable { name, .. } => Some(*name),
        }
    }

    /// A declaration without a body or field list.
    pub fn is_prototype(&self) -> bool {
        match self {
            Decl::Enum { variants, .. } => variants.is_none(),
            Decl::Function { body, .. } => body.is_none(),
            Decl::Struct { fields, .. } | Decl::Union { fields, .. } => fields.is_none(),
            Decl::Variable { init, .. } => init.is_none(),
            Decl::EnumVariant { .. } | Decl::Label { .. } | Decl::Typedef { .. } => false,
        }
    }
}
