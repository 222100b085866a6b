//! Generic resolution over checked types.
//!
//! Two symmetric substitution forms exist: over an insertion-ordered map
//! (used when parameters are explicitly ordered) and over an unordered
//! map (used after unification). Both walk the type, replace
//! `custom(generic)` nodes by the mapped concrete type, clone children and
//! preserve locations.

use crate::data_type::{CheckedDataType, CheckedType, CustomKind, CustomType};
use rustc_hash::FxHashMap;
use silex_base::Symbol;

/// Insertion-ordered generic-name → type map.
#[derive(Debug, Clone, Default)]
pub struct OrderedGenericMap {
    entries: Vec<(Symbol, CheckedDataType)>,
}

impl OrderedGenericMap {
    pub fn new() -> Self {
        OrderedGenericMap::default()
    }

    /// Inserts or overwrites, preserving first-insertion order.
    pub fn insert(&mut self, name: Symbol, data_type: CheckedDataType) {
        for (existing, slot) in self.entries.iter_mut() {
            if *existing == name {
                *slot = data_type;
                return;
            }
        }
        self.entries.push((name, data_type));
    }

    pub fn get(&self, name: Symbol) -> Option<&CheckedDataType> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, dt)| dt)
    }

    /// Entry by insertion index.
    pub fn get_by_id(&self, id: usize) -> Option<&(Symbol, CheckedDataType)> {
        self.entries.get(id)
    }

    pub fn get_by_id_mut(&mut self, id: usize) -> Option<&mut (Symbol, CheckedDataType)> {
        self.entries.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Symbol, CheckedDataType)> {
        self.entries.iter()
    }
}

/// True if a `custom(generic)` node occurs anywhere in `dt`.
pub fn contains_generic_data_type(dt: &CheckedDataType) -> bool {
    match &dt.ty {
        CheckedType::Array { elem, .. } => contains_generic_data_type(elem),
        CheckedType::Custom(custom) => custom.kind == CustomKind::Generic,
        CheckedType::Result { ok, errs } => {
            errs.iter()
                .flatten()
                .any(contains_generic_data_type)
                || contains_generic_data_type(ok)
        }
        CheckedType::Lambda { params, ret } => {
            params.iter().flatten().any(contains_generic_data_type)
                || contains_generic_data_type(ret)
        }
        CheckedType::List(inner)
        | CheckedType::Mut(inner)
        | CheckedType::Optional(inner)
        | CheckedType::Ptr(inner)
        | CheckedType::PtrMut(inner)
        | CheckedType::Ref(inner)
        | CheckedType::RefMut(inner)
        | CheckedType::Trace(inner)
        | CheckedType::TraceMut(inner) => contains_generic_data_type(inner),
        CheckedType::Tuple(items) => items.iter().any(contains_generic_data_type),
        _ => false,
    }
}

/// Collects the free generic names of `dt`, in first-occurrence order.
pub fn collect_generic_names(dt: &CheckedDataType, out: &mut Vec<Symbol>) {
    match &dt.ty {
        CheckedType::Array { elem, .. } => collect_generic_names(elem, out),
        CheckedType::Custom(custom) => {
            if custom.kind == CustomKind::Generic && !out.contains(&custom.name) {
                out.push(custom.name);
            }
            for generic in custom.generics.iter().flatten() {
                collect_generic_names(generic, out);
            }
        }
        CheckedType::Result { ok, errs } => {
            for err in errs.iter().flatten() {
                collect_generic_names(err, out);
            }
            collect_generic_names(ok, out);
        }
        CheckedType::Lambda { params, ret } => {
            for param in params.iter().flatten() {
                collect_generic_names(param, out);
            }
            collect_generic_names(ret, out);
        }
        CheckedType::List(inner)
        | CheckedType::Mut(inner)
        | CheckedType::Optional(inner)
        | CheckedType::Ptr(inner)
        | CheckedType::PtrMut(inner)
        | CheckedType::Ref(inner)
        | CheckedType::RefMut(inner)
        | CheckedType::Trace(inner)
        | CheckedType::TraceMut(inner) => collect_generic_names(inner, out),
        CheckedType::Tuple(items) => {
            for item in items {
                collect_generic_names(item, out);
            }
        }
        _ => {}
    }
}

/// Core resolution walk, parameterized over the lookup. Returns `None`
/// when a generic has no mapping.
fn resolve_with(
    dt: &CheckedDataType,
    lookup: &dyn Fn(Symbol) -> Option<CheckedDataType>,
) -> Option<CheckedDataType> {
    let ty = match &dt.ty {
        CheckedType::Array { kind, elem } => {
            let elem = resolve_with(elem, lookup)?;
            CheckedType::Array {
                kind: *kind,
                elem: Box::new(elem),
            }
        }
        CheckedType::Custom(custom) => match custom.kind {
            CustomKind::Generic => return lookup(custom.name),
            _ => {
                let generics = match &custom.generics {
                    Some(generics) => {
                        let mut resolved = Vec::with_capacity(generics.len());
                        for generic in generics {
                            resolved.push(resolve_with(generic, lookup)?);
                        }
                        Some(resolved)
                    }
                    None => None,
                };
                CheckedType::Custom(CustomType {
                    scope_id: custom.scope_id,
                    name: custom.name,
                    global_name: custom.global_name,
                    generics,
                    kind: custom.kind,
                    is_recursive: custom.is_recursive,
                })
            }
        },
        CheckedType::Lambda { params, ret } => {
            let params = match params {
                Some(params) => {
                    let mut resolved = Vec::with_capacity(params.len());
                    for param in params {
                        resolved.push(resolve_with(param, lookup)?);
                    }
                    Some(resolved)
                }
                None => None,
            };
            let ret = resolve_with(ret, lookup)?;
            CheckedType::Lambda {
                params,
                ret: Box::new(ret),
            }
        }
        CheckedType::List(inner) => CheckedType::List(Box::new(resolve_with(inner, lookup)?)),
        CheckedType::Mut(inner) => CheckedType::Mut(Box::new(resolve_with(inner, lookup)?)),
        CheckedType::Optional(inner) => {
            CheckedType::Optional(Box::new(resolve_with(inner, lookup)?))
        }
        CheckedType::Ptr(inner) => CheckedType::Ptr(Box::new(resolve_with(inner, lookup)?)),
        CheckedType::PtrMut(inner) => CheckedType::PtrMut(Box::new(resolve_with(inner, lookup)?)),
        CheckedType::Ref(inner) => CheckedType::Ref(Box::new(resolve_with(inner, lookup)?)),
        CheckedType::RefMut(inner) => CheckedType::RefMut(Box::new(resolve_with(inner, lookup)?)),
        CheckedType::Trace(inner) => CheckedType::Trace(Box::new(resolve_with(inner, lookup)?)),
        CheckedType::TraceMut(inner) => {
            CheckedType::TraceMut(Box::new(resolve_with(inner, lookup)?))
        }
        CheckedType::Result { ok, errs } => {
            let errs = match errs {
                Some(errs) => {
                    let mut resolved = Vec::with_capacity(errs.len());
                    for err in errs {
                        resolved.push(resolve_with(err, lookup)?);
                    }
                    Some(resolved)
                }
                None => None,
            };
            CheckedType::Result {
                ok: Box::new(resolve_with(ok, lookup)?),
                errs,
            }
        }
        CheckedType::Tuple(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_with(item, lookup)?);
            }
            CheckedType::Tuple(resolved)
        }
        _ => return Some(dt.clone()),
    };

    Some(CheckedDataType {
        ty,
        location: dt.location.clone(),
        is_lock: dt.is_lock,
    })
}

/// Substitution over an ordered map.
pub fn resolve_generics_ordered(
    dt: &CheckedDataType,
    generic_params: &OrderedGenericMap,
) -> Option<CheckedDataType> {
    resolve_with(dt, &|name| generic_params.get(name).cloned())
}

/// Substitution over an unordered map.
pub fn resolve_generics(
    dt: &CheckedDataType,
    generic_params: &FxHashMap<Symbol, CheckedDataType>,
) -> Option<CheckedDataType> {
    resolve_with(dt, &|name| generic_params.get(&name).cloned())
}

/// Finds the subterm of `resolved` standing where `name` occurs in
/// `original`, or `None`.
fn generate_generic_param(
    resolved: &CheckedDataType,
    name: Symbol,
    original: &CheckedDataType,
) -> Option<CheckedDataType> {
    macro_rules! descend {
        ($resolved_inner:expr, $original_inner:expr) => {{
            if contains_generic_data_type($original_inner) {
                generate_generic_param($resolved_inner, name, $original_inner)
            } else {
                None
            }
        }};
    }

    match (&resolved.ty, &original.ty) {
        (_, CheckedType::Custom(custom)) if custom.kind == CustomKind::Generic => {
            (custom.name == name).then(|| resolved.clone())
        }
        (CheckedType::Array { elem: r, .. }, CheckedType::Array { elem: o, .. }) => descend!(r, o),
        (
            CheckedType::Lambda {
                params: r_params,
                ret: r_ret,
            },
            CheckedType::Lambda {
                params: o_params,
                ret: o_ret,
            },
        ) => {
            if let (Some(r_params), Some(o_params)) = (r_params, o_params) {
                for (r, o) in r_params.iter().zip(o_params.iter()) {
                    if contains_generic_data_type(o) {
                        if let Some(res) = generate_generic_param(r, name, o) {
                            return Some(res);
                        }
                    }
                }
            }
            descend!(r_ret, o_ret)
        }
        (CheckedType::List(r), CheckedType::List(o))
        | (CheckedType::Mut(r), CheckedType::Mut(o))
        | (CheckedType::Optional(r), CheckedType::Optional(o))
        | (CheckedType::Ptr(r), CheckedType::Ptr(o))
        | (CheckedType::PtrMut(r), CheckedType::PtrMut(o))
        | (CheckedType::Ref(r), CheckedType::Ref(o))
        | (CheckedType::RefMut(r), CheckedType::RefMut(o))
        | (CheckedType::Trace(r), CheckedType::Trace(o))
        | (CheckedType::TraceMut(r), CheckedType::TraceMut(o)) => descend!(r, o),
        (
            CheckedType::Result {
                ok: r_ok,
                errs: r_errs,
            },
            CheckedType::Result {
                ok: o_ok,
                errs: o_errs,
            },
        ) => {
            if let (Some(r_errs), Some(o_errs)) = (r_errs, o_errs) {
                for (r, o) in r_errs.iter().zip(o_errs.iter()) {
                    if contains_generic_data_type(o) {
                        if let Some(res) = generate_generic_param(r, name, o) {
                            return Some(res);
                        }
                    }
                }
            }
            descend!(r_ok, o_ok)
        }
        (CheckedType::Tuple(r_items), CheckedType::Tuple(o_items)) => {
            for (r, o) in r_items.iter().zip(o_items.iter()) {
                if contains_generic_data_type(o) {
                    if let Some(res) = generate_generic_param(r, name, o) {
                        return Some(res);
                    }
                }
            }
            None
        }
        (
            CheckedType::Custom(r_custom),
            CheckedType::Custom(o_custom),
        ) => {
            if let (Some(r_generics), Some(o_generics)) =
                (&r_custom.generics, &o_custom.generics)
            {
                for (r, o) in r_generics.iter().zip(o_generics.iter()) {
                    if contains_generic_data_type(o) {
                        if let Some(res) = generate_generic_param(r, name, o) {
                            return Some(res);
                        }
                    }
                }
            }
            None
        }
        _ => None,
    }
}

/// For each declared generic name, the structurally-matching subterm of
/// the resolved argument type — or `unknown` when undetermined.
pub fn generate_generic_params_from_resolved_data_type(
    resolved: &CheckedDataType,
    generic_params: &[Symbol],
    original: &CheckedDataType,
) -> OrderedGenericMap {
    let mut map = OrderedGenericMap::new();

    for name in generic_params {
        match generate_generic_param(resolved, *name, original) {
            Some(data_type) => map.insert(*name, data_type),
            None => map.insert(
                *name,
                CheckedDataType::new(CheckedType::Unknown, resolved.location.clone()),
            ),
        }
    }

    map
}

/// Same inference over a record literal: `params` are the resolved value
/// types in field order, `fields` the declared field types.
pub fn generate_generic_params_from_resolved_fields(
    params: &[CheckedDataType],
    generic_params: &[Symbol],
    fields: &[CheckedDataType],
) -> OrderedGenericMap {
    let mut map = OrderedGenericMap::new();

    for (resolved, original) in params.iter().zip(fields.iter()) {
        for name in generic_params {
            if let Some(existing) = map.get(*name) {
                if existing.kind() != crate::data_type::CheckedTypeKind::Unknown {
                    continue;
                }
            }

            match generate_generic_param(resolved, *name, original) {
                Some(data_type) => map.insert(*name, data_type),
                None => {
                    if map.get(*name).is_none() {
                        map.insert(
                            *name,
                            CheckedDataType::new(CheckedType::Unknown, resolved.location.clone()),
                        );
                    }
                }
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::Len;
    use std::rc::Rc;

    fn loc() -> silex_base::Location {
        silex_base::Location::new(Rc::from("t.sx"))
    }

    fn generic(name: u32) -> CheckedDataType {
        CheckedDataType::new(
            CheckedType::Custom(CustomType {
                scope_id: 0,
                name: Symbol(name),
                global_name: Symbol(name),
                generics: None,
                kind: CustomKind::Generic,
                is_recursive: false,
            }),
            loc(),
        )
    }

    fn int32() -> CheckedDataType {
        CheckedDataType::new(CheckedType::Int32, loc())
    }

    #[test]
    fn ordered_map_preserves_insertion_order() {
        let mut map = OrderedGenericMap::new();
        map.insert(Symbol(2), int32());
        map.insert(Symbol(1), int32());
        map.insert(Symbol(2), CheckedDataType::new(CheckedType::Bool, loc()));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get_by_id(0).map(|(n, _)| *n), Some(Symbol(2)));
        assert_eq!(
            map.get(Symbol(2)).map(|dt| dt.kind()),
            Some(crate::data_type::CheckedTypeKind::Bool)
        );
    }

    #[test]
    fn resolve_replaces_generic_nodes() {
        let mut map = OrderedGenericMap::new();
        map.insert(Symbol(1), int32());

        let dt = CheckedDataType::new(CheckedType::Ptr(Box::new(generic(1))), loc());
        let resolved = resolve_generics_ordered(&dt, &map).expect("resolved");

        match &resolved.ty {
            CheckedType::Ptr(inner) => {
                assert_eq!(inner.kind(), crate::data_type::CheckedTypeKind::Int32)
            }
            other => panic!("expected ptr, got {:?}", other),
        }
    }

    #[test]
    fn resolve_fails_on_unmapped_generic() {
        let map = OrderedGenericMap::new();
        let dt = generic(1);
        assert!(resolve_generics_ordered(&dt, &map).is_none());
    }

    #[test]
    fn generate_finds_subterm_through_wrappers() {
        // original: Optional(ptr(@T)), resolved: Optional(ptr(Str)).
        let original = CheckedDataType::new(
            CheckedType::Optional(Box::new(CheckedDataType::new(
                CheckedType::Ptr(Box::new(generic(1))),
                loc(),
            ))),
            loc(),
        );
        let resolved = CheckedDataType::new(
            CheckedType::Optional(Box::new(CheckedDataType::new(
                CheckedType::Ptr(Box::new(CheckedDataType::new(
                    CheckedType::Str(Len::Undef),
                    loc(),
                ))),
                loc(),
            ))),
            loc(),
        );

        let map =
            generate_generic_params_from_resolved_data_type(&resolved, &[Symbol(1)], &original);
        assert_eq!(
            map.get(Symbol(1)).map(|dt| dt.kind()),
            Some(crate::data_type::CheckedTypeKind::Str)
        );
    }

    #[test]
    fn undetermined_generics_become_unknown() {
        let original = int32();
        let resolved = int32();
        let map =
            generate_generic_params_from_resolved_data_type(&resolved, &[Symbol(9)], &original);
        assert_eq!(
            map.get(Symbol(9)).map(|dt| dt.kind()),
            Some(crate::data_type::CheckedTypeKind::Unknown)
        );
    }

    #[test]
    fn fields_inference_unifies_positionally() {
        // record Pair.[T, U] { first: @T, second: Ptr(@U) }
        let fields = vec![
            generic(1),
            CheckedDataType::new(CheckedType::Ptr(Box::new(generic(2))), loc()),
        ];
        let params = vec![
            int32(),
            CheckedDataType::new(
                CheckedType::Ptr(Box::new(CheckedDataType::new(CheckedType::Bool, loc()))),
                loc(),
            ),
        ];

        let map = generate_generic_params_from_resolved_fields(
            &params,
            &[Symbol(1), Symbol(2)],
            &fields,
        );

        assert_eq!(
            map.get(Symbol(1)).map(|dt| dt.kind()),
            Some(crate::data_type::CheckedTypeKind::Int32)
        );
        assert_eq!(
            map.get(Symbol(2)).map(|dt| dt.kind()),
            Some(crate::data_type::CheckedTypeKind::Bool)
        );
    }

    #[test]
    fn substitution_leaves_no_covered_generics_behind() {
        let mut map = OrderedGenericMap::new();
        map.insert(Symbol(1), int32());

        let dt = CheckedDataType::new(
            CheckedType::Tuple(vec![generic(1), int32()]),
            loc(),
        );
        let resolved = resolve_generics_ordered(&dt, &map).expect("resolved");

        let mut names = Vec::new();
        collect_generic_names(&resolved, &mut names);
        assert!(names.is_empty());
    }
}
