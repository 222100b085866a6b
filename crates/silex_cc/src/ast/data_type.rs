//! Syntactic data types and their flag sets.
//!
//! A [`DataType`] is the parser's view of a C type: a [`DataTypeKind`] plus
//! the qualifier bitset (`const`, `volatile`, …) and the dialect's `!name`
//! context bitset (`!heap`, `!free`, …). Types are shared via `Rc`;
//! [`crate::parser`]'s generic substitution returns the same `Rc` when a
//! type contains no generic, so cloning stays cheap.

use crate::ast::expr::Expr;
use crate::ast::field::Fields;
use crate::scope::ScopeId;
use silex_base::Symbol;
use std::fmt;
use std::ops::BitOr;
use std::rc::Rc;

/// `const` / `volatile` / `restrict` / `_Atomic` / `_Noreturn` bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Qualifiers(u8);

impl Qualifiers {
    pub const NONE: Qualifiers = Qualifiers(0);
    pub const CONST: Qualifiers = Qualifiers(1);
    pub const VOLATILE: Qualifiers = Qualifiers(1 << 1);
    pub const RESTRICT: Qualifiers = Qualifiers(1 << 2);
    pub const ATOMIC: Qualifiers = Qualifiers(1 << 3);
    pub const NORETURN: Qualifiers = Qualifiers(1 << 4);

    pub fn contains(self, other: Qualifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Qualifiers) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Qualifiers {
    type Output = Qualifiers;
    fn bitor(self, rhs: Qualifiers) -> Qualifiers {
        Qualifiers(self.0 | rhs.0)
    }
}

/// Storage-class specifier bitset. `typedef` gates "this declaration is a
/// type alias".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageClasses(u16);

impl StorageClasses {
    pub const NONE: StorageClasses = StorageClasses(0);
    pub const AUTO: StorageClasses = StorageClasses(1);
    pub const CONSTEXPR: StorageClasses = StorageClasses(1 << 1);
    pub const EXTERN: StorageClasses = StorageClasses(1 << 2);
    pub const INLINE: StorageClasses = StorageClasses(1 << 3);
    pub const REGISTER: StorageClasses = StorageClasses(1 << 4);
    pub const STATIC: StorageClasses = StorageClasses(1 << 5);
    pub const THREAD_LOCAL: StorageClasses = StorageClasses(1 << 6);
    pub const TYPEDEF: StorageClasses = StorageClasses(1 << 7);

    pub fn contains(self, other: StorageClasses) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StorageClasses) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has_typedef(self) -> bool {
        self.contains(StorageClasses::TYPEDEF)
    }

    /// Everything except `typedef`; a typedef may not combine with other
    /// storage classes.
    pub fn without_typedef(self) -> StorageClasses {
        StorageClasses(self.0 & !StorageClasses::TYPEDEF.0)
    }
}

impl BitOr for StorageClasses {
    type Output = StorageClasses;
    fn bitor(self, rhs: StorageClasses) -> StorageClasses {
        StorageClasses(self.0 | rhs.0)
    }
}

/// `!name` data-type context bitset.
///
/// Exclusions: `heap` with `stack`, `drop` with `free`, `free` with `trace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeContexts(u16);

impl TypeContexts {
    pub const NONE: TypeContexts = TypeContexts(0);
    pub const HEAP: TypeContexts = TypeContexts(1);
    pub const NON_NULL: TypeContexts = TypeContexts(1 << 1);
    pub const STACK: TypeContexts = TypeContexts(1 << 2);
    pub const TRACE: TypeContexts = TypeContexts(1 << 3);
    pub const INDEX: TypeContexts = TypeContexts(1 << 4);
    pub const REALLOC: TypeContexts = TypeContexts(1 << 5);
    pub const DROP: TypeContexts = TypeContexts(1 << 6);
    pub const STATIC: TypeContexts = TypeContexts(1 << 7);
    pub const FREE: TypeContexts = TypeContexts(1 << 8);

    pub fn contains(self, other: TypeContexts) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: TypeContexts) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Context name as written after `!`, or `None` if unknown.
    pub fn from_name(name: &str) -> Option<TypeContexts> {
        Some(match name {
            "heap" => TypeContexts::HEAP,
            "non_null" => TypeContexts::NON_NULL,
            "stack" => TypeContexts::STACK,
            "trace" => TypeContexts::TRACE,
            "index" => TypeContexts::INDEX,
            "realloc" => TypeContexts::REALLOC,
            "drop" => TypeContexts::DROP,
            "static" => TypeContexts::STATIC,
            "free" => TypeContexts::FREE,
            _ => return None,
        })
    }

    /// Checks the mutual-exclusion pairs; returns the offending pair's
    /// names when incompatible.
    pub fn incompatible_pair(self) -> Option<(&'static str, &'static str)> {
        const EXCLUSIONS: [(TypeContexts, TypeContexts, &str, &str); 3] = [
            (TypeContexts::HEAP, TypeContexts::STACK, "heap", "stack"),
            (TypeContexts::DROP, TypeContexts::FREE, "drop", "free"),
            (TypeContexts::FREE, TypeContexts::TRACE, "free", "trace"),
        ];
        for (a, b, an, bn) in EXCLUSIONS {
            if self.contains(a) && self.contains(b) {
                return Some((an, bn));
            }
        }
        None
    }
}

impl BitOr for TypeContexts {
    type Output = TypeContexts;
    fn bitor(self, rhs: TypeContexts) -> TypeContexts {
        TypeContexts(self.0 | rhs.0)
    }
}

/// `.[T1, T2, …]` generic parameter/argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParams {
    pub params: Vec<Rc<DataType>>,
}

impl GenericParams {
    pub fn new(params: Vec<Rc<DataType>>) -> Self {
        GenericParams { params }
    }

    /// True if any parameter still contains an unsubstituted generic.
    pub fn has_generic(&self) -> bool {
        self.params.iter().any(|p| p.contains_generic())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionParam {
    Normal {
        name: Option<Symbol>,
        data_type: Rc<DataType>,
    },
    Variadic,
}

/// Array declarator shape: a resolved size or a flexible array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Sized(usize),
    Unsized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataTypeKind {
    Bool,
    Char,
    Double,
    DoubleComplex,
    DoubleImaginary,
    Decimal32,
    Decimal64,
    Decimal128,
    Float,
    FloatComplex,
    FloatImaginary,
    Int,
    LongDouble,
    LongDoubleComplex,
    LongDoubleImaginary,
    LongInt,
    LongLongInt,
    ShortInt,
    SignedChar,
    UnsignedChar,
    UnsignedInt,
    UnsignedLongInt,
    UnsignedLongLongInt,
    UnsignedShortInt,
    Void,
    NullptrT,
    /// A sister-language builtin type name (`Usize`, `Int32`, …).
    Builtin(Symbol),
    Typedef {
        name: Symbol,
        generic_params: Option<GenericParams>,
    },
    Struct {
        name: Option<Symbol>,
        generic_params: Option<GenericParams>,
        fields: Option<Rc<Fields>>,
    },
    Union {
        name: Option<Symbol>,
        generic_params: Option<GenericParams>,
        fields: Option<Rc<Fields>>,
    },
    Enum {
        name: Option<Symbol>,
        variants: Option<Vec<crate::ast::decl::EnumVariant>>,
        underlying: Option<Rc<DataType>>,
    },
    Ptr {
        name: Option<Symbol>,
        pointee: Rc<DataType>,
    },
    Array {
        kind: ArrayKind,
        elem: Rc<DataType>,
        name: Option<Symbol>,
        size_expr: Option<Rc<Expr>>,
        is_static: bool,
        qualifier: Qualifiers,
    },
    Function {
        name: Option<Symbol>,
        params: Option<Vec<FunctionParam>>,
        ret: Rc<DataType>,
        generic_params: Option<GenericParams>,
        parent_scope: Option<ScopeId>,
    },
    /// `@T` generic type parameter reference.
    Generic(Symbol),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataType {
    pub kind: DataTypeKind,
    pub qualifier: Qualifiers,
    pub ctx: TypeContexts,
}

impl DataType {
    pub fn new(kind: DataTypeKind) -> Self {
        DataType {
            kind,
            qualifier: Qualifiers::NONE,
            ctx: TypeContexts::NONE,
        }
    }

    pub fn with_qualifier(mut self, qualifier: Qualifiers) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub fn rc(kind: DataTypeKind) -> Rc<DataType> {
        Rc::new(DataType::new(kind))
    }

    /// The declarator name attached to this type node, if any.
    pub fn name(&self) -> Option<Symbol> {
        match &self.kind {
            DataTypeKind::Ptr { name, .. }
            | DataTypeKind::Array { name, .. }
            | DataTypeKind::Function { name, .. } => *name,
            DataTypeKind::Struct { name, .. }
            | DataTypeKind::Union { name, .. }
            | DataTypeKind::Enum { name, .. } => *name,
            DataTypeKind::Typedef { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// Attaches a declarator name to a ptr/array/function node. Returns
    /// `false` when this kind does not carry one (the caller keeps the
    /// name for the declaration itself).
    pub fn set_name(kind: &mut DataTypeKind, name: Symbol) -> bool {
        match kind {
            DataTypeKind::Ptr { name: slot, .. }
            | DataTypeKind::Array { name: slot, .. }
            | DataTypeKind::Function { name: slot, .. } => {
                *slot = Some(name);
                true
            }
            _ => false,
        }
    }

    pub fn fields(&self) -> Option<&Rc<Fields>> {
        match &self.kind {
            DataTypeKind::Struct { fields, .. } | DataTypeKind::Union { fields, .. } => {
                fields.as_ref()
            }
            _ => None,
        }
    }

    /// True if a `Generic` node occurs anywhere in this type.
    pub fn contains_generic(&self) -> bool {
        match &self.kind {
            DataTypeKind::Generic(_) => true,
            DataTypeKind::Ptr { pointee, .. } => pointee.contains_generic(),
            DataTypeKind::Array { elem, .. } => elem.contains_generic(),
            DataTypeKind::Function { params, ret, .. } => {
                ret.contains_generic()
                    || params.iter().flatten().any(|p| match p {
                        FunctionParam::Normal { data_type, .. } => data_type.contains_generic(),
                        FunctionParam::Variadic => false,
                    })
            }
            DataTypeKind::Typedef { generic_params, .. } => {
                generic_params.as_ref().is_some_and(|g| g.has_generic())
            }
            DataTypeKind::Struct {
                generic_params,
                fields,
                ..
            }
            | DataTypeKind::Union {
                generic_params,
                fields,
                ..
            } => {
                generic_params.as_ref().is_some_and(|g| g.has_generic())
                    || fields.as_ref().is_some_and(|f| f.contains_generic())
            }
            _ => false,
        }
    }
}

impl fmt::Display for DataTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataTypeKind::Bool => "bool",
            DataTypeKind::Char => "char",
            DataTypeKind::Double => "double",
            DataTypeKind::DoubleComplex => "double _Complex",
            DataTypeKind::DoubleImaginary => "double _Imaginary",
            DataTypeKind::Decimal32 => "_Decimal32",
            DataTypeKind::Decimal64 => "_Decimal64",
            DataTypeKind::Decimal128 => "_Decimal128",
            DataTypeKind::Float => "float",
            DataTypeKind::FloatComplex => "float _Complex",
            DataTypeKind::FloatImaginary => "float _Imaginary",
            DataTypeKind::Int => "int",
            DataTypeKind::LongDouble => "long double",
            DataTypeKind::LongDoubleComplex => "long double _Complex",
            DataTypeKind::LongDoubleImaginary => "long double _Imaginary",
            DataTypeKind::LongInt => "long int",
            DataTypeKind::LongLongInt => "long long int",
            DataTypeKind::ShortInt => "short int",
            DataTypeKind::SignedChar => "signed char",
            DataTypeKind::UnsignedChar => "unsigned char",
            DataTypeKind::UnsignedInt => "unsigned int",
            DataTypeKind::UnsignedLongInt => "unsigned long int",
            DataTypeKind::UnsignedLongLongInt => "unsigned long long int",
            DataTypeKind::UnsignedShortInt => "unsigned short int",
            DataTypeKind::Void => "void",
            DataTypeKind::NullptrT => "nullptr_t",
            DataTypeKind::Builtin(_) => "builtin",
            DataTypeKind::Typedef { .. } => "typedef",
            DataTypeKind::Struct { .. } => "struct",
            DataTypeKind::Union { .. } => "union",
            DataTypeKind::Enum { .. } => "enum",
            DataTypeKind::Ptr { .. } => "pointer",
            DataTypeKind::Array { .. } => "array",
            DataTypeKind::Function { .. } => "function",
            DataTypeKind::Generic(_) => "generic",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_and_stack_are_incompatible() {
        let ctx = TypeContexts::HEAP | TypeContexts::STACK;
        assert_eq!(ctx.incompatible_pair(), Some(("heap", "stack")));
    }

    #[test]
    fn heap_and_non_null_are_compatible() {
        let ctx = TypeContexts::HEAP | TypeContexts::NON_NULL;
        assert_eq!(ctx.incompatible_pair(), None);
    }

    #[test]
    fn context_names_resolve() {
        assert_eq!(TypeContexts::from_name("realloc"), Some(TypeContexts::REALLOC));
        assert_eq!(TypeContexts::from_name("borrow"), None);
    }

    #[test]
    fn typedef_may_not_combine() {
        let mut s = StorageClasses::TYPEDEF;
        s.insert(StorageClasses::STATIC);
        assert!(!s.without_typedef().is_empty());
        assert!(StorageClasses::TYPEDEF.without_typedef().is_empty());
    }

    #[test]
    fn generic_detection_walks_wrappers() {
        let generic = DataType::rc(DataTypeKind::Generic(Symbol(1)));
        let ptr = DataType::rc(DataTypeKind::Ptr {
            name: None,
            pointee: generic,
        });
        assert!(ptr.contains_generic());

        let plain = DataType::rc(DataTypeKind::Int);
        assert!(!plain.contains_generic());
    }
}
