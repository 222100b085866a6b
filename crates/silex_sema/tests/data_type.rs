//! Checked data-type scenario tests: choice refinement, conditional
//! collapse, equality laws, updating, serialization, guarantees.

use silex_base::{Location, Symbol};
use silex_sema::data_type::{eq, eq_return_data_type};
use silex_sema::{
    ArrayKind, CheckedDataType, CheckedType, CheckedTypeKind, Condition, CustomKind, CustomType,
    Len,
};
use std::rc::Rc;

fn loc() -> Location {
    Location::new(Rc::from("t.sx"))
}

fn dt(ty: CheckedType) -> CheckedDataType {
    CheckedDataType::new(ty, loc())
}

fn int32() -> CheckedDataType {
    dt(CheckedType::Int32)
}

fn int64() -> CheckedDataType {
    dt(CheckedType::Int64)
}

fn float64() -> CheckedDataType {
    dt(CheckedType::Float64)
}

fn str_ty() -> CheckedDataType {
    dt(CheckedType::Str(Len::Undef))
}

fn choice(choices: Vec<CheckedDataType>) -> CheckedDataType {
    dt(CheckedType::CompilerChoice(choices))
}

fn kinds_of(choices: &[CheckedDataType]) -> Vec<CheckedTypeKind> {
    choices.iter().map(|c| c.kind()).collect()
}

fn custom(kind: CustomKind, name: u32) -> CheckedDataType {
    dt(CheckedType::Custom(CustomType {
        scope_id: 3,
        name: Symbol(name),
        global_name: Symbol(name),
        generics: None,
        kind,
        is_recursive: false,
    }))
}

// ── S5: choice refinement ──────────────────────────────────────────────

#[test]
fn s5_unlocked_choices_refine_to_common_subset() {
    let mut a = choice(vec![int32(), int64(), float64()]);
    let mut b = choice(vec![int64(), float64(), str_ty()]);
    assert!(!a.is_lock);
    assert!(!b.is_lock);

    assert!(eq(&mut a, &mut b));

    assert_eq!(
        kinds_of(a.get_choices().expect("choices")),
        vec![CheckedTypeKind::Int64, CheckedTypeKind::Float64]
    );
    assert_eq!(
        kinds_of(b.get_choices().expect("choices")),
        vec![CheckedTypeKind::Int64, CheckedTypeKind::Float64]
    );
}

#[test]
fn s5_locked_choices_compare_without_mutation() {
    let mut a = choice(vec![int32(), int64(), float64()]);
    let mut b = choice(vec![int64(), float64(), str_ty()]);
    a.lock();
    b.lock();

    assert!(!eq(&mut a, &mut b));

    assert_eq!(a.get_choices().map(|c| c.len()), Some(3));
    assert_eq!(b.get_choices().map(|c| c.len()), Some(3));
}

#[test]
fn locked_equal_choice_sets_match_in_any_order() {
    let mut a = choice(vec![int32(), int64()]);
    let mut b = choice(vec![int64(), int32()]);
    a.lock();
    b.lock();
    assert!(eq(&mut a, &mut b));
}

// ── S6: conditional choice collapse ────────────────────────────────────

#[test]
fn s6_conditional_choice_collapses_and_renumbers_conds() {
    let mut cc = dt(CheckedType::ConditionalCompilerChoice {
        choices: vec![int32(), int64(), float64()],
        conds: vec![
            Condition {
                params: vec![dt(CheckedType::Uint8)],
                return_data_type_id: 0,
            },
            Condition {
                params: vec![dt(CheckedType::Uint16)],
                return_data_type_id: 1,
            },
            Condition {
                params: vec![dt(CheckedType::Uint32)],
                return_data_type_id: 2,
            },
        ],
    });
    assert!(!cc.is_lock);

    let mut b = int64();
    assert!(eq(&mut cc, &mut b));

    let CheckedType::ConditionalCompilerChoice { choices, conds } = &cc.ty else {
        panic!("expected conditional choice");
    };

    assert_eq!(kinds_of(choices), vec![CheckedTypeKind::Int64]);
    assert_eq!(conds.len(), 1);
    assert_eq!(conds[0].return_data_type_id, 0);
    assert_eq!(conds[0].params[0].kind(), CheckedTypeKind::Uint16);
}

#[test]
fn conditional_return_id_matches_param_row() {
    let mut cc = dt(CheckedType::ConditionalCompilerChoice {
        choices: vec![int32(), int64()],
        conds: vec![
            Condition {
                params: vec![dt(CheckedType::Uint8)],
                return_data_type_id: 0,
            },
            Condition {
                params: vec![dt(CheckedType::Uint16)],
                return_data_type_id: 1,
            },
        ],
    });

    let mut probe = vec![dt(CheckedType::Uint16)];
    assert_eq!(cc.conditional_return_id(&mut probe), Some(1));

    let mut probe = vec![dt(CheckedType::Bool)];
    assert_eq!(cc.conditional_return_id(&mut probe), None);
}

// ── Choice monotonicity (property 7) ───────────────────────────────────

#[test]
fn refinement_only_shrinks_choice_sets() {
    let mut a = choice(vec![int32(), int64(), float64()]);
    let before: Vec<CheckedTypeKind> = kinds_of(a.get_choices().expect("choices"));

    let mut b = int64();
    assert!(eq(&mut a, &mut b));

    let after = kinds_of(a.get_choices().expect("choices"));
    assert!(after.iter().all(|k| before.contains(k)));
    assert_eq!(after, vec![CheckedTypeKind::Int64]);
}

#[test]
fn refining_to_empty_reports_inequality() {
    let mut a = choice(vec![int32(), int64()]);
    let mut b = str_ty();
    assert!(!eq(&mut a, &mut b));
    assert_eq!(a.get_choices().map(|c| c.len()), Some(0));
}

// ── Equality refinements ───────────────────────────────────────────────

#[test]
fn mut_is_transparent_both_directions() {
    let mut a = dt(CheckedType::Mut(Box::new(int32())));
    let mut b = int32();
    assert!(eq(&mut a, &mut b));
    assert!(eq(&mut b, &mut a));

    let mut c = dt(CheckedType::Mut(Box::new(int64())));
    assert!(!eq(&mut a, &mut c));
}

#[test]
fn optional_promotes_the_unwrapped_side() {
    let mut a = dt(CheckedType::Optional(Box::new(int32())));
    let mut b = int32();
    assert!(eq(&mut a, &mut b));
    assert!(eq(&mut b, &mut a));

    let mut c = str_ty();
    assert!(!eq(&mut a, &mut c));
}

#[test]
fn pointer_target_structure_is_compared() {
    let mut a = dt(CheckedType::Ptr(Box::new(int32())));
    let mut b = dt(CheckedType::Ptr(Box::new(int32())));
    let mut c = dt(CheckedType::PtrMut(Box::new(int32())));

    assert!(eq(&mut a, &mut b));
    assert!(!eq(&mut a, &mut c));
}

#[test]
fn custom_types_compare_by_global_name_and_kind() {
    let mut a = custom(CustomKind::Record, 1);
    let mut b = custom(CustomKind::Record, 1);
    let mut c = custom(CustomKind::Record, 2);
    let mut d = custom(CustomKind::Enum, 1);

    assert!(eq(&mut a, &mut b));
    assert!(!eq(&mut a, &mut c));
    assert!(!eq(&mut a, &mut d));
}

#[test]
fn generic_customs_always_unify() {
    let mut a = custom(CustomKind::Generic, 1);
    let mut b = custom(CustomKind::Generic, 2);
    assert!(eq(&mut a, &mut b));
}

#[test]
fn locked_equality_is_reflexive_and_symmetric() {
    let samples = vec![
        int32(),
        dt(CheckedType::Ptr(Box::new(str_ty()))),
        dt(CheckedType::Tuple(vec![int32(), float64()])),
        dt(CheckedType::Result {
            ok: Box::new(int32()),
            errs: Some(vec![custom(CustomKind::Error, 4)]),
        }),
        dt(CheckedType::Lambda {
            params: Some(vec![int32()]),
            ret: Box::new(dt(CheckedType::Unit)),
        }),
    ];

    for sample in &samples {
        let mut a = sample.clone();
        let mut b = sample.clone();
        assert!(eq(&mut a, &mut b), "reflexivity failed for {:?}", sample);
    }

    let mut a = dt(CheckedType::Ptr(Box::new(str_ty())));
    let mut b = dt(CheckedType::Ptr(Box::new(int32())));
    assert_eq!(eq(&mut a, &mut b), eq(&mut b, &mut a));
}

#[test]
fn unknown_unifies_with_anything() {
    let mut a = dt(CheckedType::Unknown);
    let mut b = dt(CheckedType::Tuple(vec![int32()]));
    assert!(eq(&mut a, &mut b));
    assert!(eq(&mut b, &mut a));
}

#[test]
fn array_with_unknown_shape_adopts_the_other_side() {
    let mut a = dt(CheckedType::Array {
        kind: ArrayKind::Unknown,
        elem: Box::new(int32()),
    });
    let mut b = dt(CheckedType::Array {
        kind: ArrayKind::Sized(4),
        elem: Box::new(int32()),
    });

    assert!(eq(&mut a, &mut b));
    match &a.ty {
        CheckedType::Array { kind, .. } => assert_eq!(*kind, ArrayKind::Sized(4)),
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn sized_arrays_differ_by_size() {
    let mut a = dt(CheckedType::Array {
        kind: ArrayKind::Sized(4),
        elem: Box::new(int32()),
    });
    let mut b = dt(CheckedType::Array {
        kind: ArrayKind::Sized(5),
        elem: Box::new(int32()),
    });
    assert!(!eq(&mut a, &mut b));
}

// ── Updating ───────────────────────────────────────────────────────────

#[test]
fn update_fills_placeholders_only() {
    let mut placeholder = dt(CheckedType::Unknown);
    placeholder.update(&int64());
    assert_eq!(placeholder.kind(), CheckedTypeKind::Int64);

    let mut locked = int32();
    locked.update(&int64());
    assert_eq!(locked.kind(), CheckedTypeKind::Int32);
}

#[test]
fn update_from_unknown_is_a_no_op() {
    let mut placeholder = dt(CheckedType::Unknown);
    placeholder.update(&dt(CheckedType::Unknown));
    assert_eq!(placeholder.kind(), CheckedTypeKind::Unknown);
}

#[test]
fn update_adopts_array_shape() {
    let mut array = dt(CheckedType::Array {
        kind: ArrayKind::Unknown,
        elem: Box::new(int32()),
    });
    array.update(&dt(CheckedType::Array {
        kind: ArrayKind::Dynamic,
        elem: Box::new(int64()),
    }));

    match &array.ty {
        CheckedType::Array { kind, elem } => {
            assert_eq!(*kind, ArrayKind::Dynamic);
            // Element type is kept; only the shape is adopted.
            assert_eq!(elem.kind(), CheckedTypeKind::Int32);
        }
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn update_erases_inferred_lengths() {
    let mut placeholder = dt(CheckedType::Unknown);
    placeholder.update(&dt(CheckedType::Str(Len::Def(5))));
    assert_eq!(placeholder.ty, CheckedType::Str(Len::Undef));
}

// ── Serialization ──────────────────────────────────────────────────────

#[test]
fn serialization_distinguishes_monomorphizations() {
    let vec_of_int = dt(CheckedType::Custom(CustomType {
        scope_id: 1,
        name: Symbol(10),
        global_name: Symbol(10),
        generics: Some(vec![int32()]),
        kind: CustomKind::Record,
        is_recursive: false,
    }));
    let vec_of_str = dt(CheckedType::Custom(CustomType {
        scope_id: 1,
        name: Symbol(10),
        global_name: Symbol(10),
        generics: Some(vec![str_ty()]),
        kind: CustomKind::Record,
        is_recursive: false,
    }));

    let mut a = String::new();
    let mut b = String::new();
    vec_of_int.serialize(&mut a);
    vec_of_str.serialize(&mut b);
    assert_ne!(a, b);

    let mut c = String::new();
    vec_of_int.clone().serialize(&mut c);
    assert_eq!(a, c);
}

#[test]
fn serialization_distinguishes_wrapper_depth() {
    let one = dt(CheckedType::Ptr(Box::new(int32())));
    let two = dt(CheckedType::Ptr(Box::new(dt(CheckedType::Ptr(Box::new(
        int32(),
    ))))));

    let mut a = String::new();
    let mut b = String::new();
    one.serialize(&mut a);
    two.serialize(&mut b);
    assert_ne!(a, b);
}

#[test]
fn serialization_includes_array_sizes() {
    let four = dt(CheckedType::Array {
        kind: ArrayKind::Sized(4),
        elem: Box::new(int32()),
    });
    let five = dt(CheckedType::Array {
        kind: ArrayKind::Sized(5),
        elem: Box::new(int32()),
    });

    let mut a = String::new();
    let mut b = String::new();
    four.serialize(&mut a);
    five.serialize(&mut b);
    assert_ne!(a, b);
}

// ── Guarantees ─────────────────────────────────────────────────────────

#[test]
fn guarantee_rewrites_open_types() {
    let mut open = dt(CheckedType::Unknown);
    assert!(open.is_guarantee(CheckedTypeKind::Int64));
    assert_eq!(open.kind(), CheckedTypeKind::Int64);

    let mut open = dt(CheckedType::CompilerGeneric(Symbol(1)));
    assert!(open.is_guarantee(CheckedTypeKind::Optional));
    match &open.ty {
        CheckedType::Optional(inner) => {
            assert_eq!(inner.kind(), CheckedTypeKind::CompilerGeneric)
        }
        other => panic!("expected optional, got {:?}", other),
    }
}

#[test]
fn guarantee_checks_closed_types_without_rewriting() {
    let mut closed = int32();
    assert!(closed.is_guarantee(CheckedTypeKind::Int32));
    assert!(!closed.is_guarantee(CheckedTypeKind::Int64));
    assert_eq!(closed.kind(), CheckedTypeKind::Int32);
}

#[test]
fn guarantee_requires_every_choice_branch() {
    let mut all_int = choice(vec![int32(), int32()]);
    assert!(all_int.is_guarantee(CheckedTypeKind::Int32));

    let mut mixed = choice(vec![int32(), float64()]);
    assert!(!mixed.is_guarantee(CheckedTypeKind::Int32));
}

// ── Helpers ────────────────────────────────────────────────────────────

#[test]
fn direct_custom_peels_through_wrappers() {
    let nominal = custom(CustomKind::Record, 6);
    let wrapped = dt(CheckedType::Optional(Box::new(dt(CheckedType::PtrMut(
        Box::new(dt(CheckedType::Result {
            ok: Box::new(nominal.clone()),
            errs: None,
        })),
    )))));

    assert!(wrapped.contains_direct_custom_data_type());
    let direct = wrapped
        .get_direct_custom_data_type()
        .expect("nominal type inside");
    assert_eq!(direct.kind(), CheckedTypeKind::Custom);

    let plain = dt(CheckedType::Tuple(vec![nominal]));
    assert!(!plain.contains_direct_custom_data_type());
}

#[test]
fn is_contains_kind_traverses_wrappers() {
    let wrapped = dt(CheckedType::Ref(Box::new(dt(CheckedType::Trace(
        Box::new(str_ty()),
    )))));
    assert!(wrapped.is_contains_kind(CheckedTypeKind::Str));
    assert!(wrapped.is_contains_kind(CheckedTypeKind::Trace));
    assert!(!wrapped.is_contains_kind(CheckedTypeKind::Int32));
}

#[test]
fn add_choice_deduplicates() {
    let mut choices = vec![int32()];
    CheckedDataType::add_choice(&mut choices, int32());
    assert_eq!(choices.len(), 1);

    CheckedDataType::add_choice(&mut choices, int64());
    assert_eq!(choices.len(), 2);
}

#[test]
fn string_kinds_are_string_data_types() {
    assert!(str_ty().is_string_data_type());
    assert!(dt(CheckedType::Bytes(Len::Def(4))).is_string_data_type());
    assert!(dt(CheckedType::CStr).is_string_data_type());
    assert!(!int32().is_string_data_type());
}

#[test]
fn eq_return_data_type_compares_condition_tables() {
    let make = || {
        dt(CheckedType::ConditionalCompilerChoice {
            choices: vec![int32(), int64()],
            conds: vec![Condition {
                params: vec![dt(CheckedType::Uint8)],
                return_data_type_id: 0,
            }],
        })
    };

    let mut a = make();
    let mut b = make();
    assert!(eq_return_data_type(&mut a, &mut b));

    let mut c = dt(CheckedType::ConditionalCompilerChoice {
        choices: vec![int32(), int64()],
        conds: vec![Condition {
            params: vec![dt(CheckedType::Bool)],
            return_data_type_id: 0,
        }],
    });
    let mut d = make();
    assert!(!eq_return_data_type(&mut c, &mut d));
}
