//! Syntactic AST of the CI front-end.
//!
//! Everything here is what the parser saw, not what the checker proved:
//! data types may name unknown typedefs, expressions are unfolded, generic
//! parameters are uninstantiated. The checked lattice lives in `silex-sema`.

pub mod data_type;
pub mod decl;
pub mod expr;
pub mod field;
pub mod stmt;

pub use data_type::{
    ArrayKind, DataType, DataTypeKind, FunctionParam, GenericParams, Qualifiers, StorageClasses,
    TypeContexts,
};
pub use decl::{Attribute, Decl, DeclId, EnumVariant};
pub use expr::{BinaryKind, Expr, InitializerItem, Literal, UnaryKind};
pub use field::{Field, FieldId, FieldKind, Fields};
pub use stmt::{Body, BodyItem, IfBranch, Stmt};
