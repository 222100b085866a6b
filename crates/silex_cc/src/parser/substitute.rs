//! Generic-parameter substitution over syntactic types.
//!
//! Given a declared generic-parameter list and the arguments of a call
//! site, [`substitute_data_type`] rewrites every `@T` occurrence with the
//! argument at `T`'s declared index. Types containing no generic are
//! returned by shared reference — the same `Rc` — so substitution over
//! monomorphic code costs nothing.

use crate::ast::data_type::{DataType, DataTypeKind, FunctionParam, GenericParams};
use crate::ast::field::{FieldKind, Fields};
use std::rc::Rc;

/// Looks up `generic_name` in the declared list and returns the matching
/// called argument.
fn substitute_generic(
    generic_name: silex_base::Symbol,
    generic_params: &GenericParams,
    called_generic_params: &GenericParams,
) -> Option<Rc<DataType>> {
    let index = generic_params.params.iter().position(|p| {
        matches!(&p.kind, DataTypeKind::Generic(name) if *name == generic_name)
    })?;
    called_generic_params.params.get(index).cloned()
}

/// Substitutes a nested generic-argument list (`Vec.[@T]` used inside
/// another generic type).
pub fn substitute_generic_params(
    unresolved: Option<&GenericParams>,
    generic_params: &GenericParams,
    called_generic_params: &GenericParams,
) -> Option<GenericParams> {
    let unresolved = unresolved?;

    if !unresolved.has_generic() {
        return Some(unresolved.clone());
    }

    let params = unresolved
        .params
        .iter()
        .map(|p| substitute_data_type(p, generic_params, called_generic_params))
        .collect();

    Some(GenericParams::new(params))
}

/// Rewrites a field graph with substituted member types. Indices are
/// stable, so the graph links carry over unchanged.
fn substitute_fields(
    fields: &Fields,
    generic_params: &GenericParams,
    called_generic_params: &GenericParams,
) -> Fields {
    let mut out = Fields::new();

    for (_, field) in fields.iter() {
        let kind = match &field.kind {
            FieldKind::Member { data_type, bit } => FieldKind::Member {
                data_type: substitute_data_type(data_type, generic_params, called_generic_params),
                bit: *bit,
            },
            other => other.clone(),
        };

        // The source graph was duplicate-checked when built; re-adding the
        // same shape cannot fail.
        let _ = out.add(field.name, field.parent, kind);
    }

    out
}

pub fn substitute_data_type(
    data_type: &Rc<DataType>,
    generic_params: &GenericParams,
    called_generic_params: &GenericParams,
) -> Rc<DataType> {
    if !data_type.contains_generic() {
        return Rc::clone(data_type);
    }

    let kind = match &data_type.kind {
        DataTypeKind::Generic(name) => {
            return match substitute_generic(*name, generic_params, called_generic_params) {
                Some(resolved) => resolved,
                None => Rc::clone(data_type),
            };
        }
        DataTypeKind::Ptr { name, pointee } => DataTypeKind::Ptr {
            name: *name,
            pointee: substitute_data_type(pointee, generic_params, called_generic_params),
        },
        DataTypeKind::Array {
            kind,
            elem,
            name,
            size_expr,
            is_static,
            qualifier,
        } => DataTypeKind::Array {
            kind: *kind,
            elem: substitute_data_type(elem, generic_params, called_generic_params),
            name: *name,
            size_expr: size_expr.clone(),
            is_static: *is_static,
            qualifier: *qualifier,
        },
        DataTypeKind::Function {
            name,
            params,
            ret,
            generic_params: fn_generic_params,
            parent_scope,
        } => DataTypeKind::Function {
            name: *name,
            params: params.as_ref().map(|params| {
                params
                    .iter()
                    .map(|param| match param {
                        FunctionParam::Normal { name, data_type } => FunctionParam::Normal {
                            name: *name,
                            data_type: substitute_data_type(
                                data_type,
                                generic_params,
                                called_generic_params,
                            ),
                        },
                        FunctionParam::Variadic => FunctionParam::Variadic,
                    })
                    .collect()
            }),
            ret: substitute_data_type(ret, generic_params, called_generic_params),
            generic_params: substitute_generic_params(
                fn_generic_params.as_ref(),
                generic_params,
                called_generic_params,
            ),
            parent_scope: *parent_scope,
        },
        DataTypeKind::Typedef {
            name,
            generic_params: args,
        } => DataTypeKind::Typedef {
            name: *name,
            generic_params: substitute_generic_params(
                args.as_ref(),
                generic_params,
                called_generic_params,
            ),
        },
        DataTypeKind::Struct {
            name,
            generic_params: args,
            fields,
        } => DataTypeKind::Struct {
            name: *name,
            generic_params: substitute_generic_params(
                args.as_ref(),
                generic_params,
                called_generic_params,
            ),
            fields: fields
                .as_ref()
                .map(|f| Rc::new(substitute_fields(f, generic_params, called_generic_params))),
        },
        DataTypeKind::Union {
            name,
            generic_params: args,
            fields,
        } => DataTypeKind::Union {
            name: *name,
            generic_params: substitute_generic_params(
                args.as_ref(),
                generic_params,
                called_generic_params,
            ),
            fields: fields
                .as_ref()
                .map(|f| Rc::new(substitute_fields(f, generic_params, called_generic_params))),
        },
        _ => return Rc::clone(data_type),
    };

    let mut substituted = DataType::new(kind);
    substituted.qualifier = data_type.qualifier;
    substituted.ctx = data_type.ctx;
    Rc::new(substituted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use silex_base::Symbol;

    fn generic(name: u32) -> Rc<DataType> {
        DataType::rc(DataTypeKind::Generic(Symbol(name)))
    }

    fn int() -> Rc<DataType> {
        DataType::rc(DataTypeKind::Int)
    }

    #[test]
    fn monomorphic_types_are_shared_not_cloned() {
        let declared = GenericParams::new(vec![generic(1)]);
        let called = GenericParams::new(vec![int()]);

        let plain = int();
        let substituted = substitute_data_type(&plain, &declared, &called);
        assert!(Rc::ptr_eq(&plain, &substituted));
    }

    #[test]
    fn generic_resolves_by_declared_index() {
        let declared = GenericParams::new(vec![generic(1), generic(2)]);
        let called = GenericParams::new(vec![int(), DataType::rc(DataTypeKind::Char)]);

        let substituted = substitute_data_type(&generic(2), &declared, &called);
        assert_eq!(substituted.kind, DataTypeKind::Char);
    }

    #[test]
    fn pointer_wrappers_are_rebuilt_around_substitution() {
        let declared = GenericParams::new(vec![generic(1)]);
        let called = GenericParams::new(vec![int()]);

        let ptr = DataType::rc(DataTypeKind::Ptr {
            name: None,
            pointee: generic(1),
        });
        let substituted = substitute_data_type(&ptr, &declared, &called);

        match &substituted.kind {
            DataTypeKind::Ptr { pointee, .. } => assert_eq!(pointee.kind, DataTypeKind::Int),
            other => panic!("expected pointer, got {:?}", other),
        }
    }

    #[test]
    fn substitution_is_idempotent_when_covering() {
        let declared = GenericParams::new(vec![generic(1)]);
        let called = GenericParams::new(vec![int()]);

        let ptr = DataType::rc(DataTypeKind::Ptr {
            name: None,
            pointee: generic(1),
        });
        let once = substitute_data_type(&ptr, &declared, &called);
        let twice = substitute_data_type(&once, &declared, &called);
        assert_eq!(once, twice);
        // The second pass sees no generic and shares the input.
        assert!(Rc::ptr_eq(&once, &twice));
    }

    #[test]
    fn struct_fields_are_rewritten() {
        use crate::ast::field::{FieldKind, Fields};

        let declared = GenericParams::new(vec![generic(1)]);
        let called = GenericParams::new(vec![int()]);

        let mut fields = Fields::new();
        fields
            .add(
                Some(Symbol(7)),
                None,
                FieldKind::Member {
                    data_type: DataType::rc(DataTypeKind::Ptr {
                        name: None,
                        pointee: generic(1),
                    }),
                    bit: 0,
                },
            )
            .unwrap();

        let st = DataType::rc(DataTypeKind::Struct {
            name: Some(Symbol(9)),
            generic_params: Some(declared.clone()),
            fields: Some(Rc::new(fields)),
        });

        let substituted = substitute_data_type(&st, &declared, &called);
        let DataTypeKind::Struct { fields: Some(fields), .. } = &substituted.kind else {
            panic!("expected struct");
        };
        let (_, field) = fields.iter().next().expect("one field");
        let FieldKind::Member { data_type, .. } = &field.kind else {
            panic!("expected member");
        };
        let DataTypeKind::Ptr { pointee, .. } = &data_type.kind else {
            panic!("expected pointer member");
        };
        assert_eq!(pointee.kind, DataTypeKind::Int);
    }
}
