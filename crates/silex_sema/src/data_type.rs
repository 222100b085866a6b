//! The checked data type: representation, equality, updating,
//! serialization, choice refinement and guarantees.

use silex_base::{Location, Symbol};
use std::fmt::Write as _;

/// Length of a `bytes`/`str` type: concrete, or not yet determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Len {
    Def(usize),
    Undef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomKind {
    Class,
    Enum,
    EnumObject,
    Error,
    Generic,
    Record,
    RecordObject,
    Trait,
}

/// A nominal type: class, record, enum, error, trait or a generic
/// parameter standing for one.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomType {
    pub scope_id: usize,
    pub name: Symbol,
    pub global_name: Symbol,
    pub generics: Option<Vec<CheckedDataType>>,
    pub kind: CustomKind,
    pub is_recursive: bool,
}

/// One row of a conditional compiler choice: when the parameters unify
/// with `params`, the result is `choices[return_data_type_id]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub params: Vec<CheckedDataType>,
    pub return_data_type_id: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Dynamic,
    MultiPointers,
    Sized(usize),
    Undetermined,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckedType {
    Any,
    Array {
        kind: ArrayKind,
        elem: Box<CheckedDataType>,
    },
    Bool,
    Byte,
    Bytes(Len),
    Char,
    CShort,
    CUshort,
    CInt,
    CUint,
    CLong,
    CUlong,
    CLongLong,
    CUlongLong,
    CFloat,
    CDouble,
    CStr,
    CVoid,
    Custom(CustomType),
    Float32,
    Float64,
    Int16,
    Int32,
    Int64,
    Int8,
    Isize,
    Lambda {
        params: Option<Vec<CheckedDataType>>,
        ret: Box<CheckedDataType>,
    },
    List(Box<CheckedDataType>),
    Mut(Box<CheckedDataType>),
    Never,
    Optional(Box<CheckedDataType>),
    Ptr(Box<CheckedDataType>),
    PtrMut(Box<CheckedDataType>),
    Ref(Box<CheckedDataType>),
    RefMut(Box<CheckedDataType>),
    Result {
        ok: Box<CheckedDataType>,
        errs: Option<Vec<CheckedDataType>>,
    },
    Str(Len),
    Trace(Box<CheckedDataType>),
    TraceMut(Box<CheckedDataType>),
    Tuple(Vec<CheckedDataType>),
    Uint16,
    Uint32,
    Uint64,
    Uint8,
    Unit,
    Unknown,
    Usize,
    ConditionalCompilerChoice {
        choices: Vec<CheckedDataType>,
        conds: Vec<Condition>,
    },
    CompilerChoice(Vec<CheckedDataType>),
    CompilerGeneric(Symbol),
}

/// Payload-free mirror of [`CheckedType`], used for guarantees and as the
/// serialization tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckedTypeKind {
    Any,
    Array,
    Bool,
    Byte,
    Bytes,
    Char,
    CShort,
    CUshort,
    CInt,
    CUint,
    CLong,
    CUlong,
    CLongLong,
    CUlongLong,
    CFloat,
    CDouble,
    CStr,
    CVoid,
    Custom,
    Float32,
    Float64,
    Int16,
    Int32,
    Int64,
    Int8,
    Isize,
    Lambda,
    List,
    Mut,
    Never,
    Optional,
    Ptr,
    PtrMut,
    Ref,
    RefMut,
    Result,
    Str,
    Trace,
    TraceMut,
    Tuple,
    Uint16,
    Uint32,
    Uint64,
    Uint8,
    Unit,
    Unknown,
    Usize,
    ConditionalCompilerChoice,
    CompilerChoice,
    CompilerGeneric,
}

impl CheckedType {
    pub fn kind(&self) -> CheckedTypeKind {
        use CheckedType as T;
        use CheckedTypeKind as K;
        match self {
            T::Any => K::Any,
            T::Array { .. } => K::Array,
            T::Bool => K::Bool,
            T::Byte => K::Byte,
            T::Bytes(_) => K::Bytes,
            T::Char => K::Char,
            T::CShort => K::CShort,
            T::CUshort => K::CUshort,
            T::CInt => K::CInt,
            T::CUint => K::CUint,
            T::CLong => K::CLong,
            T::CUlong => K::CUlong,
            T::CLongLong => K::CLongLong,
            T::CUlongLong => K::CUlongLong,
            T::CFloat => K::CFloat,
            T::CDouble => K::CDouble,
            T::CStr => K::CStr,
            T::CVoid => K::CVoid,
            T::Custom(_) => K::Custom,
            T::Float32 => K::Float32,
            T::Float64 => K::Float64,
            T::Int16 => K::Int16,
            T::Int32 => K::Int32,
            T::Int64 => K::Int64,
            T::Int8 => K::Int8,
            T::Isize => K::Isize,
            T::Lambda { .. } => K::Lambda,
            T::List(_) => K::List,
            T::Mut(_) => K::Mut,
            T::Never => K::Never,
            T::Optional(_) => K::Optional,
            T::Ptr(_) => K::Ptr,
            T::PtrMut(_) => K::PtrMut,
            T::Ref(_) => K::Ref,
            T::RefMut(_) => K::RefMut,
            T::Result { .. } => K::Result,
            T::Str(_) => K::Str,
            T::Trace(_) => K::Trace,
            T::TraceMut(_) => K::TraceMut,
            T::Tuple(_) => K::Tuple,
            T::Uint16 => K::Uint16,
            T::Uint32 => K::Uint32,
            T::Uint64 => K::Uint64,
            T::Uint8 => K::Uint8,
            T::Unit => K::Unit,
            T::Unknown => K::Unknown,
            T::Usize => K::Usize,
            T::ConditionalCompilerChoice { .. } => K::ConditionalCompilerChoice,
            T::CompilerChoice(_) => K::CompilerChoice,
            T::CompilerGeneric(_) => K::CompilerGeneric,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedDataType {
    pub ty: CheckedType,
    pub location: Location,
    /// A locked type may no longer be narrowed or updated.
    pub is_lock: bool,
}

impl CheckedDataType {
    /// Choice kinds start unlocked; everything else is born locked.
    pub fn new(ty: CheckedType, location: Location) -> Self {
        let is_lock = !matches!(
            ty,
            CheckedType::CompilerChoice(_) | CheckedType::ConditionalCompilerChoice { .. }
        );
        CheckedDataType {
            ty,
            location,
            is_lock,
        }
    }

    pub fn kind(&self) -> CheckedTypeKind {
        self.ty.kind()
    }

    pub fn lock(&mut self) {
        self.is_lock = true;
    }

    // ── Choices ────────────────────────────────────────────────────────

    /// The internal choice vector for choice/conditional-choice variants.
    pub fn get_choices(&self) -> Option<&Vec<CheckedDataType>> {
        match &self.ty {
            CheckedType::CompilerChoice(choices) => Some(choices),
            CheckedType::ConditionalCompilerChoice { choices, .. } => Some(choices),
            _ => None,
        }
    }

    pub(crate) fn choices_mut(&mut self) -> Option<&mut Vec<CheckedDataType>> {
        match &mut self.ty {
            CheckedType::CompilerChoice(choices) => Some(choices),
            CheckedType::ConditionalCompilerChoice { choices, .. } => Some(choices),
            _ => None,
        }
    }

    /// Removes choice `id`; on a conditional choice, conditions returning
    /// the removed id are dropped and higher ids are renumbered.
    pub fn remove_choice(&mut self, id: usize) {
        match &mut self.ty {
            CheckedType::ConditionalCompilerChoice { choices, conds } => {
                choices.remove(id);
                conds.retain_mut(|cond| {
                    if cond.return_data_type_id == id {
                        return false;
                    }
                    if cond.return_data_type_id > id {
                        cond.return_data_type_id -= 1;
                    }
                    true
                });
            }
            CheckedType::CompilerChoice(choices) => {
                choices.remove(id);
            }
            _ => {}
        }
    }

    /// Appends `choice` unless an equal choice is already present.
    pub fn add_choice(choices: &mut Vec<CheckedDataType>, mut choice: CheckedDataType) {
        for existing in choices.iter_mut() {
            if eq(existing, &mut choice) {
                return;
            }
        }
        choices.push(choice);
    }

    /// Index of the conditional-choice row matching `cond`, if any.
    pub fn conditional_return_id(&mut self, cond: &mut [CheckedDataType]) -> Option<usize> {
        let conds_len = match &self.ty {
            CheckedType::ConditionalCompilerChoice { conds, .. } => conds.len(),
            _ => return None,
        };

        for i in 0..conds_len {
            let mut is_match = true;
            {
                let CheckedType::ConditionalCompilerChoice { conds, .. } = &mut self.ty else {
                    return None;
                };
                let row = &mut conds[i];
                if row.params.len() != cond.len() {
                    continue;
                }
                for (a, b) in row.params.iter_mut().zip(cond.iter_mut()) {
                    if !eq(a, b) {
                        is_match = false;
                        break;
                    }
                }
            }

            if is_match {
                let CheckedType::ConditionalCompilerChoice { conds, choices } = &self.ty else {
                    return None;
                };
                let id = conds[i].return_data_type_id;
                if id < choices.len() {
                    return Some(id);
                }
                return None;
            }
        }

        None
    }

    // ── Updating ───────────────────────────────────────────────────────

    /// Only placeholders may be overwritten: `unknown`, `compiler_generic`
    /// and arrays whose element shape is still unknown.
    pub fn can_update(&self) -> bool {
        match &self.ty {
            CheckedType::Array { kind, .. } => *kind == ArrayKind::Unknown,
            CheckedType::Unknown | CheckedType::CompilerGeneric(_) => true,
            _ => false,
        }
    }

    /// Writes `other`'s shape into this placeholder. Inference uses this to
    /// fill the holes the parser left behind.
    pub fn update(&mut self, other: &CheckedDataType) {
        if !self.can_update() || other.kind() == CheckedTypeKind::Unknown {
            return;
        }

        // An unknown-shaped array adopts the other array's kind, keeping
        // its own element type.
        if let CheckedType::Array { kind, .. } = &mut self.ty {
            if let CheckedType::Array { kind: other_kind, .. } = &other.ty {
                *kind = *other_kind;
            }
            return;
        }

        self.ty = match &other.ty {
            // Lengths are not carried over: an inferred `bytes`/`str`
            // starts with an undetermined length.
            CheckedType::Bytes(_) => CheckedType::Bytes(Len::Undef),
            CheckedType::Str(_) => CheckedType::Str(Len::Undef),
            other_ty => other_ty.clone(),
        };
    }

    // ── Guarantees ─────────────────────────────────────────────────────

    /// True if this type is already of `guarantee` (every branch of a
    /// choice), or is still open — in which case it is *rewritten* to the
    /// guaranteed kind. The rewrite is destructive: only call on an owned,
    /// unaliased type.
    pub fn is_guarantee(&mut self, guarantee: CheckedTypeKind) -> bool {
        use CheckedTypeKind as K;

        debug_assert!(!matches!(
            guarantee,
            K::Custom | K::Lambda | K::Tuple | K::Array
        ));

        match &mut self.ty {
            CheckedType::ConditionalCompilerChoice { choices, .. }
            | CheckedType::CompilerChoice(choices) => {
                for choice in choices.iter_mut() {
                    if !choice.is_guarantee(guarantee) {
                        return false;
                    }
                }
                true
            }
            CheckedType::Unknown | CheckedType::CompilerGeneric(_) => {
                let inner = CheckedDataType {
                    ty: std::mem::replace(&mut self.ty, CheckedType::Unknown),
                    location: self.location.clone(),
                    is_lock: self.is_lock,
                };

                self.ty = match guarantee {
                    K::Result => CheckedType::Result {
                        ok: Box::new(inner),
                        errs: None,
                    },
                    K::List => CheckedType::List(Box::new(inner)),
                    K::Mut => CheckedType::Mut(Box::new(inner)),
                    K::Optional => CheckedType::Optional(Box::new(inner)),
                    K::Ptr => CheckedType::Ptr(Box::new(inner)),
                    K::PtrMut => CheckedType::PtrMut(Box::new(inner)),
                    K::Ref => CheckedType::Ref(Box::new(inner)),
                    K::RefMut => CheckedType::RefMut(Box::new(inner)),
                    K::Trace => CheckedType::Trace(Box::new(inner)),
                    K::TraceMut => CheckedType::TraceMut(Box::new(inner)),
                    simple => Self::simple_type(simple),
                };
                true
            }
            _ => self.kind() == guarantee,
        }
    }

    fn simple_type(kind: CheckedTypeKind) -> CheckedType {
        use CheckedType as T;
        use CheckedTypeKind as K;
        match kind {
            K::Any => T::Any,
            K::Bool => T::Bool,
            K::Byte => T::Byte,
            K::Bytes => T::Bytes(Len::Undef),
            K::Char => T::Char,
            K::CShort => T::CShort,
            K::CUshort => T::CUshort,
            K::CInt => T::CInt,
            K::CUint => T::CUint,
            K::CLong => T::CLong,
            K::CUlong => T::CUlong,
            K::CLongLong => T::CLongLong,
            K::CUlongLong => T::CUlongLong,
            K::CFloat => T::CFloat,
            K::CDouble => T::CDouble,
            K::CStr => T::CStr,
            K::CVoid => T::CVoid,
            K::Float32 => T::Float32,
            K::Float64 => T::Float64,
            K::Int16 => T::Int16,
            K::Int32 => T::Int32,
            K::Int64 => T::Int64,
            K::Int8 => T::Int8,
            K::Isize => T::Isize,
            K::Never => T::Never,
            K::Str => T::Str(Len::Undef),
            K::Uint16 => T::Uint16,
            K::Uint32 => T::Uint32,
            K::Uint64 => T::Uint64,
            K::Uint8 => T::Uint8,
            K::Unit => T::Unit,
            K::Usize => T::Usize,
            _ => T::Unknown,
        }
    }

    // ── Direct custom peeling ──────────────────────────────────────────

    /// Peels `mut`/`optional`/`ptr*`/`ref*`/`trace*`/`result` wrappers down
    /// to a nominal type.
    pub fn get_direct_custom_data_type(&self) -> Option<&CheckedDataType> {
        match &self.ty {
            CheckedType::Custom(_) => Some(self),
            CheckedType::Result { ok, .. } => ok.get_direct_custom_data_type(),
            CheckedType::Mut(inner)
            | CheckedType::Optional(inner)
            | CheckedType::Ptr(inner)
            | CheckedType::PtrMut(inner)
            | CheckedType::Ref(inner)
            | CheckedType::RefMut(inner)
            | CheckedType::Trace(inner)
            | CheckedType::TraceMut(inner) => inner.get_direct_custom_data_type(),
            _ => None,
        }
    }

    pub fn contains_direct_custom_data_type(&self) -> bool {
        self.get_direct_custom_data_type().is_some()
    }

    /// True when `kind` occurs at this type or through a traversable
    /// wrapper.
    pub fn is_contains_kind(&self, kind: CheckedTypeKind) -> bool {
        if self.kind() == kind {
            return true;
        }
        match &self.ty {
            CheckedType::Mut(inner)
            | CheckedType::Optional(inner)
            | CheckedType::Ptr(inner)
            | CheckedType::PtrMut(inner)
            | CheckedType::Ref(inner)
            | CheckedType::RefMut(inner)
            | CheckedType::Trace(inner)
            | CheckedType::TraceMut(inner) => inner.is_contains_kind(kind),
            _ => false,
        }
    }

    pub fn is_string_data_type(&self) -> bool {
        matches!(
            self.ty,
            CheckedType::Bytes(_) | CheckedType::Str(_) | CheckedType::CStr
        )
    }

    // ── Serialization ──────────────────────────────────────────────────

    /// Flat textual encoding uniquely identifying a monomorphized type;
    /// used as the monomorphization cache key.
    pub fn serialize(&self, out: &mut String) {
        use CheckedType as T;

        let tag = self.kind() as u16;

        match &self.ty {
            T::Unknown => {}
            T::Array { kind, elem } => {
                let array_tag = match kind {
                    ArrayKind::Dynamic => 0,
                    ArrayKind::MultiPointers => 1,
                    ArrayKind::Sized(_) => 2,
                    ArrayKind::Undetermined => 3,
                    ArrayKind::Unknown => 4,
                };
                let _ = write!(out, "{}{}", tag, array_tag);
                if let ArrayKind::Sized(size) = kind {
                    let _ = write!(out, "s{}", size);
                }
                elem.serialize(out);
            }
            T::Custom(custom) => {
                let _ = write!(out, "{}{}n{}", tag, custom.global_name.0, custom.scope_id);
                for generic in custom.generics.iter().flatten() {
                    generic.serialize(out);
                }
            }
            T::Lambda { params, ret } => {
                let _ = write!(out, "{}", tag);
                for param in params.iter().flatten() {
                    param.serialize(out);
                }
                ret.serialize(out);
            }
            T::List(inner)
            | T::Mut(inner)
            | T::Optional(inner)
            | T::Ptr(inner)
            | T::PtrMut(inner)
            | T::Ref(inner)
            | T::RefMut(inner)
            | T::Trace(inner)
            | T::TraceMut(inner) => {
                let _ = write!(out, "{}", tag);
                inner.serialize(out);
            }
            T::Result { ok, errs } => {
                let _ = write!(out, "{}", tag);
                for err in errs.iter().flatten() {
                    err.serialize(out);
                }
                ok.serialize(out);
            }
            T::Tuple(items) => {
                let _ = write!(out, "{}", tag);
                for item in items {
                    item.serialize(out);
                }
            }
            T::ConditionalCompilerChoice { choices, conds } => {
                let _ = write!(out, "{}", tag);
                for cond in conds {
                    for param in &cond.params {
                        param.serialize(out);
                    }
                    let _ = write!(out, "r{}", cond.return_data_type_id);
                }
                for choice in choices {
                    choice.serialize(out);
                }
            }
            T::CompilerChoice(choices) => {
                let _ = write!(out, "{}", tag);
                for choice in choices {
                    choice.serialize(out);
                }
            }
            T::CompilerGeneric(name) => {
                let _ = write!(out, "{}{}", tag, name.0);
            }
            _ => {
                let _ = write!(out, "{}", tag);
            }
        }
    }
}

// ── Equality ───────────────────────────────────────────────────────────

/// Structural equality with the three refinements of the lattice:
/// mut-transparency, optional promotion, and choice-set refinement on
/// unlocked sides.
pub fn eq(a: &mut CheckedDataType, b: &mut CheckedDataType) -> bool {
    use CheckedType as T;
    use CheckedTypeKind as K;

    let a_is_choice = matches!(a.kind(), K::CompilerChoice | K::ConditionalCompilerChoice);
    let b_is_choice = matches!(b.kind(), K::CompilerChoice | K::ConditionalCompilerChoice);

    // Normalize so the choice-ish and `mut` sides lead.
    if !a_is_choice && b_is_choice {
        return eq(b, a);
    }
    if b.kind() == K::Mut && a.kind() != K::Mut && !a_is_choice {
        return eq(b, a);
    }

    // `mut` is only a mutability annotation, never a distinct shape.
    if a.kind() == K::Mut {
        let T::Mut(a_inner) = &mut a.ty else {
            return false;
        };
        if b.kind() == K::Mut {
            let T::Mut(b_inner) = &mut b.ty else {
                return false;
            };
            return eq(a_inner, b_inner);
        }
        return eq(a_inner, b);
    }

    // `optional(t)` equals `t`: the unwrapped side is promoted.
    if a.kind() == K::Optional && b.kind() != K::Optional && !b_is_choice {
        let T::Optional(a_inner) = &mut a.ty else {
            return false;
        };
        return eq(a_inner, b);
    }
    if b.kind() == K::Optional && a.kind() != K::Optional && !a_is_choice {
        let T::Optional(b_inner) = &mut b.ty else {
            return false;
        };
        return eq(a, b_inner);
    }

    if a_is_choice {
        return eq_choice(a, b, b_is_choice);
    }

    // `unknown` and `compiler_generic` unify with anything.
    if a.kind() == K::Unknown || b.kind() == K::Unknown {
        return true;
    }
    if let (T::CompilerGeneric(x), T::CompilerGeneric(y)) = (&a.ty, &b.ty) {
        return x == y;
    }
    if matches!(a.ty, T::CompilerGeneric(_)) || matches!(b.ty, T::CompilerGeneric(_)) {
        return true;
    }

    let same_kind = a.kind() == b.kind();

    match (&mut a.ty, &mut b.ty) {
        (T::Array { kind: ak, elem: ae }, T::Array { kind: bk, elem: be }) => {
            if ak == bk {
                return eq(ae, be);
            }
            // An unknown-shaped array adopts the other side's shape.
            if *ak == ArrayKind::Unknown {
                *ak = *bk;
                return true;
            }
            if *bk == ArrayKind::Unknown {
                *bk = *ak;
                return true;
            }
            // Same kind discriminant with different sizes is unequal, and
            // `Sized(n)` vs `Sized(m)` lands here.
            false
        }
        (T::Custom(x), T::Custom(y)) => {
            if x.kind == CustomKind::Generic && y.kind == CustomKind::Generic {
                return true;
            }
            x.global_name == y.global_name && x.kind == y.kind
        }
        (T::Result { ok: a_ok, errs: a_errs }, T::Result { ok: b_ok, errs: b_errs }) => {
            if let (Some(a_errs), Some(b_errs)) = (a_errs, b_errs) {
                if a_errs.len() != b_errs.len() {
                    return false;
                }
                for (x, y) in a_errs.iter_mut().zip(b_errs.iter_mut()) {
                    if !eq(x, y) {
                        return false;
                    }
                }
            }
            eq(a_ok, b_ok)
        }
        (
            T::Lambda {
                params: a_params,
                ret: a_ret,
            },
            T::Lambda {
                params: b_params,
                ret: b_ret,
            },
        ) => {
            match (a_params, b_params) {
                (Some(a_params), Some(b_params)) => {
                    if a_params.len() != b_params.len() {
                        return false;
                    }
                    for (x, y) in a_params.iter_mut().zip(b_params.iter_mut()) {
                        if !eq(x, y) {
                            return false;
                        }
                    }
                }
                (None, None) => {}
                _ => return false,
            }
            eq(a_ret, b_ret)
        }
        (T::List(x), T::List(y))
        | (T::Optional(x), T::Optional(y))
        | (T::Ptr(x), T::Ptr(y))
        | (T::PtrMut(x), T::PtrMut(y))
        | (T::Ref(x), T::Ref(y))
        | (T::RefMut(x), T::RefMut(y))
        | (T::Trace(x), T::Trace(y))
        | (T::TraceMut(x), T::TraceMut(y)) => eq(x, y),
        (T::Tuple(xs), T::Tuple(ys)) => {
            if xs.len() != ys.len() {
                return false;
            }
            for (x, y) in xs.iter_mut().zip(ys.iter_mut()) {
                if !eq(x, y) {
                    return false;
                }
            }
            true
        }
        _ => same_kind,
    }
}

/// Choice-side equality: `a` is a choice/conditional choice.
fn eq_choice(a: &mut CheckedDataType, b: &mut CheckedDataType, b_is_choice: bool) -> bool {
    if b_is_choice {
        let a_lock = a.is_lock;
        let b_lock = b.is_lock;

        if a_lock && b_lock {
            // Locked sets: equal iff same cardinality and every element of
            // one has a match in the other. Choice sets hold no
            // duplicates, so cardinality plus coverage is enough.
            let len_a = a.get_choices().map(|c| c.len()).unwrap_or(0);
            let len_b = b.get_choices().map(|c| c.len()).unwrap_or(0);
            if len_a != len_b {
                return false;
            }

            for i in 0..len_a {
                if !choice_has_match(b, a, i) {
                    return false;
                }
            }
            return true;
        }

        // At least one side is open: refine every unlocked side down to
        // the common subset.
        if !a_lock {
            refine_against(a, b);
        }
        if !b_lock {
            refine_against(b, a);
        }

        let len_a = a.get_choices().map(|c| c.len()).unwrap_or(0);
        let len_b = b.get_choices().map(|c| c.len()).unwrap_or(0);
        return len_a == len_b && len_a != 0;
    }

    // Choice against a concrete type.
    if a.is_lock {
        let len = a.get_choices().map(|c| c.len()).unwrap_or(0);
        for i in 0..len {
            let Some(choices) = a.choices_mut() else {
                return false;
            };
            if eq(&mut choices[i], b) {
                return true;
            }
        }
        return false;
    }

    // Unlocked: keep only the choices equal to the concrete type.
    let mut i = 0;
    loop {
        let len = a.get_choices().map(|c| c.len()).unwrap_or(0);
        if i >= len {
            break;
        }
        let matched = {
            let Some(choices) = a.choices_mut() else {
                break;
            };
            eq(&mut choices[i], b)
        };
        if matched {
            i += 1;
        } else {
            a.remove_choice(i);
        }
    }

    a.get_choices().map(|c| !c.is_empty()).unwrap_or(false)
}

/// True when `holder`'s choice set contains a match for `other`'s `index`th
/// choice.
fn choice_has_match(holder: &mut CheckedDataType, other: &mut CheckedDataType, index: usize) -> bool {
    let holder_len = holder.get_choices().map(|c| c.len()).unwrap_or(0);

    for j in 0..holder_len {
        let matched = {
            let Some(other_choices) = other.choices_mut() else {
                return false;
            };
            let target = &mut other_choices[index];
            let Some(holder_choices) = holder.choices_mut() else {
                return false;
            };
            eq(target, &mut holder_choices[j])
        };
        if matched {
            return true;
        }
    }

    false
}

/// Removes from `dt` (unlocked) every choice with no match in `other`'s
/// set. Choice monotonicity: the result is always a subset.
fn refine_against(dt: &mut CheckedDataType, other: &mut CheckedDataType) {
    let mut i = 0;
    loop {
        let len = dt.get_choices().map(|c| c.len()).unwrap_or(0);
        if i >= len {
            break;
        }

        let other_len = other.get_choices().map(|c| c.len()).unwrap_or(0);
        let mut matched = false;

        for j in 0..other_len {
            let is_eq = {
                let Some(dt_choices) = dt.choices_mut() else {
                    return;
                };
                let choice = &mut dt_choices[i];
                let Some(other_choices) = other.choices_mut() else {
                    return;
                };
                eq(choice, &mut other_choices[j])
            };
            if is_eq {
                matched = true;
                break;
            }
        }

        if matched {
            i += 1;
        } else {
            dt.remove_choice(i);
        }
    }
}

/// Equality specialized for return types: conditional choices compare
/// their condition tables pairwise instead of refining.
pub fn eq_return_data_type(a: &mut CheckedDataType, b: &mut CheckedDataType) -> bool {
    use CheckedTypeKind as K;

    if a.kind() != K::ConditionalCompilerChoice && b.kind() == K::ConditionalCompilerChoice {
        return eq_return_data_type(b, a);
    }

    if a.kind() == K::ConditionalCompilerChoice && b.kind() == K::ConditionalCompilerChoice {
        let a_len = match &a.ty {
            CheckedType::ConditionalCompilerChoice { conds, .. } => conds.len(),
            _ => 0,
        };
        let b_len = match &b.ty {
            CheckedType::ConditionalCompilerChoice { conds, .. } => conds.len(),
            _ => 0,
        };
        if a_len != b_len {
            return false;
        }

        for i in 0..a_len {
            let params_len = match &a.ty {
                CheckedType::ConditionalCompilerChoice { conds, .. } => conds[i].params.len(),
                _ => 0,
            };

            for j in 0..params_len {
                let matched = {
                    let (CheckedType::ConditionalCompilerChoice { conds: a_conds, .. },
                         CheckedType::ConditionalCompilerChoice { conds: b_conds, .. }) =
                        (&mut a.ty, &mut b.ty)
                    else {
                        return false;
                    };
                    if j >= b_conds[i].params.len() {
                        return false;
                    }
                    // Split the two tables; they live in different types.
                    let a_param = &mut a_conds[i].params[j];
                    let b_param = &mut b_conds[i].params[j];
                    eq(a_param, b_param)
                };
                if !matched {
                    return false;
                }
            }
        }
        return true;
    }

    eq(a, b)
}
