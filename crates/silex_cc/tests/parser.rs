//! Parser scenario tests: declarators, generic typedefs, fields, enums,
//! statements, typedef rules.

use silex_base::{DiagnosticSink, Interner, Symbol};
use silex_cc::ast::data_type::{ArrayKind, DataTypeKind, StorageClasses, TypeContexts};
use silex_cc::ast::decl::Decl;
use silex_cc::ast::expr::{BinaryKind, Expr, Literal};
use silex_cc::ast::stmt::{BodyItem, Stmt};
use silex_cc::parser::Parser;
use silex_cc::scanner::{Scanner, SourceFile};
use silex_cc::standard::Standard;
use silex_cc::unit::TranslationUnit;
use std::rc::Rc;

fn parse(source: &str, standard: Standard) -> (TranslationUnit, Interner, Rc<DiagnosticSink>) {
    let mut interner = Interner::new();
    let sink = Rc::new(DiagnosticSink::new());

    let mut scanner = Scanner::new(
        SourceFile::new("test.c", source),
        standard,
        sink.clone(),
        &mut interner,
    );
    scanner.scan_tokens();
    let tokens = scanner.tokens;

    let mut unit = TranslationUnit::new("test.c", standard, sink.clone());
    {
        let mut parser = Parser::new(&mut unit, &mut interner);
        parser.parse(tokens);
    }

    (unit, interner, sink)
}

fn variable_type<'u>(
    unit: &'u TranslationUnit,
    interner: &mut Interner,
    name: &str,
) -> &'u DataTypeKind {
    let sym = interner.intern(name);
    let id = unit
        .search_variable(unit.base_scope(), sym)
        .unwrap_or_else(|| panic!("variable `{}` not found", name));
    match unit.decl(id) {
        Decl::Variable { data_type, .. } => &data_type.kind,
        other => panic!("expected variable, got {:?}", other),
    }
}

#[test]
fn s3_pointer_to_function_declarator() {
    let (unit, mut interner, sink) = parse("int *(*fn)(int, int);", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    match variable_type(&unit, &mut interner, "fn") {
        DataTypeKind::Ptr { pointee, .. } => match &pointee.kind {
            DataTypeKind::Function { params, ret, .. } => {
                let params = params.as_ref().expect("two parameters");
                assert_eq!(params.len(), 2);
                match &ret.kind {
                    DataTypeKind::Ptr { pointee, .. } => {
                        assert_eq!(pointee.kind, DataTypeKind::Int)
                    }
                    other => panic!("expected pointer return, got {:?}", other),
                }
            }
            other => panic!("expected function pointee, got {:?}", other),
        },
        other => panic!("expected pointer, got {:?}", other),
    }
}

#[test]
fn declarator_round_trip_array_vs_pointer() {
    // `int *a[3]` is array-of-pointer-to-int.
    let (unit, mut interner, sink) = parse("int *a[3];", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    match variable_type(&unit, &mut interner, "a") {
        DataTypeKind::Array { kind, elem, .. } => {
            assert_eq!(*kind, ArrayKind::Sized(3));
            match &elem.kind {
                DataTypeKind::Ptr { pointee, .. } => assert_eq!(pointee.kind, DataTypeKind::Int),
                other => panic!("expected pointer element, got {:?}", other),
            }
        }
        other => panic!("expected array, got {:?}", other),
    }

    // `int (*b)[3]` is pointer-to-array-of-int.
    let (unit, mut interner, sink) = parse("int (*b)[3];", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    match variable_type(&unit, &mut interner, "b") {
        DataTypeKind::Ptr { pointee, .. } => match &pointee.kind {
            DataTypeKind::Array { kind, elem, .. } => {
                assert_eq!(*kind, ArrayKind::Sized(3));
                assert_eq!(elem.kind, DataTypeKind::Int);
            }
            other => panic!("expected array pointee, got {:?}", other),
        },
        other => panic!("expected pointer, got {:?}", other),
    }
}

#[test]
fn nested_array_chain_nests_right() {
    let (unit, mut interner, sink) = parse("int m[2][5];", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    match variable_type(&unit, &mut interner, "m") {
        DataTypeKind::Array { kind, elem, .. } => {
            assert_eq!(*kind, ArrayKind::Sized(2));
            match &elem.kind {
                DataTypeKind::Array { kind, elem, .. } => {
                    assert_eq!(*kind, ArrayKind::Sized(5));
                    assert_eq!(elem.kind, DataTypeKind::Int);
                }
                other => panic!("expected nested array, got {:?}", other),
            }
        }
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn s4_typedef_struct_with_generic_params() {
    let (unit, mut interner, sink) = parse(
        "typedef struct Vec.[@T] { @T *data; Usize len; } Vec.[@T];",
        Standard::C11,
    );
    assert_eq!(sink.count_error(), 0);

    let vec_sym = interner.intern("Vec");
    let t_sym = interner.intern("T");

    let id = unit
        .search_typedef(unit.base_scope(), vec_sym)
        .expect("typedef Vec registered");

    let Decl::Typedef {
        name,
        generic_params,
        aliased,
    } = unit.decl(id)
    else {
        panic!("expected typedef");
    };

    assert_eq!(*name, vec_sym);
    let generics = generic_params.as_ref().expect("generic params");
    assert!(matches!(
        generics.params[0].kind,
        DataTypeKind::Generic(sym) if sym == t_sym
    ));

    let DataTypeKind::Struct {
        name: struct_name,
        fields: Some(fields),
        generic_params: Some(_),
    } = &aliased.kind
    else {
        panic!("expected struct alias with fields, got {:?}", aliased.kind);
    };
    assert_eq!(*struct_name, Some(vec_sym));

    let field_ids: Vec<_> = fields.children(None).collect();
    assert_eq!(field_ids.len(), 2);

    let data_field = fields.get(field_ids[0]);
    assert_eq!(data_field.name, Some(interner.intern("data")));
    match &data_field.kind {
        silex_cc::ast::field::FieldKind::Member { data_type, .. } => match &data_type.kind {
            DataTypeKind::Ptr { pointee, .. } => {
                assert!(matches!(pointee.kind, DataTypeKind::Generic(sym) if sym == t_sym));
            }
            other => panic!("expected pointer member, got {:?}", other),
        },
        other => panic!("expected member, got {:?}", other),
    }

    // The struct declaration itself is also registered.
    assert!(unit.search_struct(unit.base_scope(), vec_sym).is_some());
}

#[test]
fn fields_with_bit_widths_and_anonymous_nesting() {
    let (unit, mut interner, sink) = parse(
        "struct Packet { int kind : 3; struct { int x; int y; }; unsigned flags : 2; };",
        Standard::C11,
    );
    assert_eq!(sink.count_error(), 0);

    let packet = interner.intern("Packet");
    let id = unit
        .search_struct(unit.base_scope(), packet)
        .expect("struct Packet");

    let Decl::Struct {
        fields: Some(fields),
        ..
    } = unit.decl(id)
    else {
        panic!("expected struct definition");
    };

    let top: Vec<_> = fields.children(None).collect();
    assert_eq!(top.len(), 3);

    assert_eq!(fields.get(top[0]).bit(), 3);
    assert!(matches!(
        fields.get(top[1]).kind,
        silex_cc::ast::field::FieldKind::AnonymousStruct
    ));
    assert_eq!(fields.get(top[2]).bit(), 2);

    let nested: Vec<_> = fields.children(Some(top[1])).collect();
    assert_eq!(nested.len(), 2);
    assert_eq!(fields.get(nested[0]).name, Some(interner.intern("x")));
}

#[test]
fn duplicate_sibling_field_is_rejected() {
    let (_, _, sink) = parse("struct D { int a; int a; };", Standard::C11);
    assert!(sink.any_message_contains("duplicate field"));
}

#[test]
fn enum_with_underlying_type_and_values() {
    let (unit, mut interner, sink) = parse(
        "enum Color : unsigned int { RED, GREEN = 5, BLUE };",
        Standard::C23,
    );
    assert_eq!(sink.count_error(), 0);

    let color = interner.intern("Color");
    let id = unit
        .search_enum(unit.base_scope(), color)
        .expect("enum Color");

    let Decl::Enum {
        variants: Some(variants),
        underlying: Some(underlying),
        ..
    } = unit.decl(id)
    else {
        panic!("expected enum definition with underlying type");
    };

    assert_eq!(underlying.kind, DataTypeKind::UnsignedInt);
    assert_eq!(variants.len(), 3);
    assert_eq!(variants[0].value, 0);
    assert_eq!(variants[1].value, 5);
    assert_eq!(variants[2].value, 6);

    // Variants are registered as their own declarations.
    let green = interner.intern("GREEN");
    assert!(unit.search_enum_variant(unit.base_scope(), green).is_some());
}

#[test]
fn function_parameters_are_visible_in_the_body_scope() {
    let (unit, mut interner, sink) = parse("int add(int a, int b) { return a + b; }", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    let add = interner.intern("add");
    let id = unit
        .search_function(unit.base_scope(), add)
        .expect("function add");

    let Decl::Function {
        body: Some(body),
        params: Some(params),
        ..
    } = unit.decl(id)
    else {
        panic!("expected function definition");
    };

    assert_eq!(params.len(), 2);

    let a = interner.intern("a");
    assert!(unit.search_variable(body.scope, a).is_some());

    match &body.items[0] {
        BodyItem::Stmt(Stmt::Return(Some(Expr::Binary { kind, .. }))) => {
            assert_eq!(*kind, BinaryKind::Add);
        }
        other => panic!("expected return statement, got {:?}", other),
    }
}

#[test]
fn comma_chain_declares_each_declarator() {
    let (unit, mut interner, sink) = parse("int a, *b, c[2];", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    assert_eq!(*variable_type(&unit, &mut interner, "a"), DataTypeKind::Int);
    assert!(matches!(
        variable_type(&unit, &mut interner, "b"),
        DataTypeKind::Ptr { .. }
    ));
    assert!(matches!(
        variable_type(&unit, &mut interner, "c"),
        DataTypeKind::Array {
            kind: ArrayKind::Sized(2),
            ..
        }
    ));
}

#[test]
fn break_outside_loop_is_rejected() {
    let (_, _, sink) = parse("void f() { break; }", Standard::C11);
    assert!(sink.any_message_contains("break is not expected"));
}

#[test]
fn continue_inside_loop_is_accepted() {
    let (_, _, sink) = parse("void f() { while (1) { continue; } }", Standard::C11);
    assert_eq!(sink.count_error(), 0);
}

#[test]
fn case_outside_switch_is_rejected() {
    let (_, _, sink) = parse("void f() { case 1: ; }", Standard::C11);
    assert!(sink.any_message_contains("case is not expected"));
}

#[test]
fn switch_with_cases_and_default() {
    let (_, _, sink) = parse(
        "void f(int x) { switch (x) { case 1: break; default: break; } }",
        Standard::C11,
    );
    assert_eq!(sink.count_error(), 0);
}

#[test]
fn for_init_declaration_requires_c99() {
    let source = "void f() { for (int i = 0; i < 3; i++) { } }";

    let (_, _, sink) = parse(source, Standard::C89);
    assert!(sink.any_message_contains("before C99"));

    let (_, _, sink) = parse(source, Standard::C99);
    assert!(!sink.any_message_contains("before C99"));
}

#[test]
fn do_while_and_goto_parse() {
    let (_, _, sink) = parse(
        "void f() { again: do { x++; } while (x < 10); goto again; }",
        Standard::C11,
    );
    assert_eq!(sink.count_error(), 0);
}

#[test]
fn variable_declaration_after_label_is_rejected() {
    let (_, _, sink) = parse("void f() { lbl: int x = 1; }", Standard::C11);
    assert!(sink.any_message_contains("not expected in a label"));
}

#[test]
fn typedef_with_initializer_is_rejected() {
    let (_, _, sink) = parse("typedef int T = 3;", Standard::C11);
    assert!(sink.any_message_contains("expression is not expected with typedef"));
}

#[test]
fn typedef_combined_with_static_is_rejected() {
    let (_, _, sink) = parse("typedef static int T;", Standard::C11);
    assert!(sink.any_message_contains("cannot combine other storage class"));
}

#[test]
fn typedef_name_becomes_a_data_type() {
    let (unit, mut interner, sink) = parse("typedef int MyInt; MyInt v;", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    match variable_type(&unit, &mut interner, "v") {
        DataTypeKind::Typedef { name, .. } => assert_eq!(*name, interner.intern("MyInt")),
        other => panic!("expected typedef reference, got {:?}", other),
    }
}

#[test]
fn storage_classes_are_collected() {
    let (unit, mut interner, sink) = parse("static const int limit = 10;", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    let sym = interner.intern("limit");
    let id = unit.search_variable(unit.base_scope(), sym).expect("limit");
    let Decl::Variable { storage, init, .. } = unit.decl(id) else {
        panic!("expected variable");
    };
    assert!(storage.contains(StorageClasses::STATIC));
    assert!(matches!(
        init,
        Some(Expr::Literal(Literal::SignedInt(10)))
    ));
}

#[test]
fn pointer_contexts_parse_in_either_order() {
    let (unit, mut interner, sink) = parse("int *!heap !non_null p;", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    let sym = interner.intern("p");
    let id = unit.search_variable(unit.base_scope(), sym).expect("p");
    let Decl::Variable { data_type, .. } = unit.decl(id) else {
        panic!("expected variable");
    };
    assert!(data_type.ctx.contains(TypeContexts::HEAP));
    assert!(data_type.ctx.contains(TypeContexts::NON_NULL));

    let (_, _, sink) = parse("int * const !trace q;", Standard::C11);
    assert_eq!(sink.count_error(), 0);
}

#[test]
fn incompatible_contexts_are_rejected() {
    let (_, _, sink) = parse("int *!heap !stack p;", Standard::C11);
    assert!(sink.any_message_contains("incompatible data type context"));
}

#[test]
fn prototype_array_accepts_static_and_qualifiers() {
    let (_, _, sink) = parse("void f(int a[static 10]);", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    let (_, _, sink) = parse("void g(int a[const static 4]);", Standard::C11);
    assert_eq!(sink.count_error(), 0);
}

#[test]
fn generic_function_declaration() {
    let (unit, mut interner, sink) = parse("@T get.[@T](@T x) { return x; }", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    let get = interner.intern("get");
    let id = unit
        .search_function(unit.base_scope(), get)
        .expect("function get");

    let Decl::Function {
        generic_params: Some(generics),
        body: Some(body),
        ret,
        ..
    } = unit.decl(id)
    else {
        panic!("expected generic function definition");
    };

    assert_eq!(generics.params.len(), 1);
    assert!(matches!(ret.kind, DataTypeKind::Generic(_)));

    let x = interner.intern("x");
    assert!(unit.search_variable(body.scope, x).is_some());
}

#[test]
fn generic_params_on_plain_variable_are_rejected() {
    let (_, _, sink) = parse("int value.[@T];", Standard::C11);
    assert!(sink.any_message_contains("generic params"));
}

#[test]
fn ternary_parses_right_associative() {
    let (unit, _, sink) = parse("void f(int a) { a ? 1 : a ? 2 : 3; }", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    // Dig the expression back out of the function body.
    let mut found = false;
    for i in 0..unit.decl_count() {
        if let Decl::Function {
            body: Some(body), ..
        } = unit.decl(silex_cc::ast::decl::DeclId(i))
        {
            if let Some(BodyItem::Expr(Expr::Ternary { else_, .. })) = body.items.first() {
                assert!(matches!(**else_, Expr::Ternary { .. }));
                found = true;
            }
        }
    }
    assert!(found, "ternary expression not found");
}

#[test]
fn member_access_chains_fold_left() {
    let (_, _, sink) = parse("void f(struct S *s) { s->a.b[0]++; }", Standard::C11);
    assert_eq!(sink.count_error(), 0);
}

#[test]
fn sizeof_and_cast_expressions() {
    let (_, _, sink) = parse(
        "void f() { Usize n = sizeof(int); int x = (int)1.5; }",
        Standard::C11,
    );
    assert_eq!(sink.count_error(), 0);
}

#[test]
fn array_variable_requires_initializer_expression() {
    let (_, _, sink) = parse("int a[2] = 5;", Standard::C11);
    assert!(sink.any_message_contains("need initialization expression"));

    let (_, _, sink) = parse("int a[2] = { 1, 2 };", Standard::C11);
    assert_eq!(sink.count_error(), 0);
}

#[test]
fn initializer_with_designators() {
    let (unit, mut interner, sink) = parse(
        "struct P { int x; int y; }; struct P p = { .x = 1, .y = 2 };",
        Standard::C11,
    );
    assert_eq!(sink.count_error(), 0);

    let sym = interner.intern("p");
    let id = unit.search_variable(unit.base_scope(), sym).expect("p");
    let Decl::Variable {
        init: Some(Expr::Initializer { items }),
        ..
    } = unit.decl(id)
    else {
        panic!("expected initialized variable");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0].path.as_deref(),
        Some(&[interner.intern("x")][..])
    );
}

#[test]
fn missing_identifier_synthesizes_error_name() {
    let (unit, mut interner, sink) = parse("int = 5;", Standard::C11);
    assert!(sink.count_error() > 0);

    // The placeholder keeps later analysis alive.
    let placeholder: Vec<Symbol> = (0..unit.decl_count())
        .filter_map(|i| unit.decl(silex_cc::ast::decl::DeclId(i)).name())
        .collect();
    let error_name = interner.intern("__error__0");
    assert!(placeholder.contains(&error_name));
}

#[test]
fn function_prototype_then_definition() {
    let (unit, mut interner, sink) = parse(
        "int twice(int x); int twice(int x) { return x + x; }",
        Standard::C11,
    );
    assert_eq!(sink.count_error(), 0);

    let twice = interner.intern("twice");
    let id = unit
        .search_function(unit.base_scope(), twice)
        .expect("twice");
    let Decl::Function { body, .. } = unit.decl(id) else {
        panic!("expected function");
    };
    assert!(body.is_some(), "definition supersedes the prototype");
}

#[test]
fn anonymous_struct_as_variable_type() {
    let (unit, mut interner, sink) = parse("struct { int x; } point;", Standard::C11);
    assert_eq!(sink.count_error(), 0);

    match variable_type(&unit, &mut interner, "point") {
        DataTypeKind::Struct {
            name: None,
            fields: Some(fields),
            ..
        } => assert_eq!(fields.len(), 1),
        other => panic!("expected anonymous struct, got {:?}", other),
    }
}
