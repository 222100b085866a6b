//! Checked data-type lattice.
//!
//! This crate holds the semantic type representation the analyzer works
//! with: a tagged sum over scalars, wrappers (`ptr`, `ref`, `trace`,
//! `optional`, `mut`), nominal types with generics, and the two
//! compiler-inference forms — the open *compiler choice* (a set of
//! candidate types the checker narrows as constraints accumulate) and the
//! *conditional compiler choice* (a choice set plus a table mapping
//! parameter-type tuples to the choice they imply).
//!
//! Equality is structural but *active*: comparing an unlocked choice type
//! refines its choice set. Once a type is locked, its shape is immutable —
//! only `unknown`, `compiler_generic` and unknown-element arrays may ever
//! be updated in place.

pub mod data_type;
pub mod generic;

pub use data_type::{
    ArrayKind, CheckedDataType, CheckedType, CheckedTypeKind, Condition, CustomKind, CustomType,
    Len,
};
pub use generic::{
    generate_generic_params_from_resolved_data_type, generate_generic_params_from_resolved_fields,
    resolve_generics, resolve_generics_ordered, OrderedGenericMap,
};
