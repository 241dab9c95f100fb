use std::sync::Arc;

use ixl_types::{DataType, StructType};
use ixl_value::{MapValue, StructValue, Value, WeightedSetValue};
use proptest::prelude::*;

use super::*;
use crate::adapter::{DocumentAdapter, DocumentSchema, UpdateAdapter};
use crate::context::{ExecutionContext, VerificationContext};
use crate::errors::{ExecResult, ExecutionErrorKind};
use crate::ops::{Operation, OperationRegistry};

// Helpers

fn op(name: &str) -> Expression {
    OperationRegistry::with_builtins()
        .call(name, Vec::new())
        .unwrap()
}

fn str_const(s: &str) -> Expression {
    Expression::constant(Value::string(s))
}

fn schema() -> DocumentSchema {
    DocumentSchema::new()
        .with_field("my_str", DataType::String)
        .with_field("my_int", DataType::Long)
        .with_synthetic_field("my_str_lc", DataType::String)
        .with_synthetic_field("my_int_copy", DataType::Long)
}

fn verify(exp: &Expression, input: Option<DataType>) -> VerifyResult<Option<DataType>> {
    let schema = schema();
    let mut ctx = VerificationContext::new(&schema).with_input_type(input);
    exp.verify(&mut ctx)?;
    Ok(ctx.current_type().cloned())
}

fn verify_err(exp: &Expression, input: Option<DataType>) -> VerificationError {
    verify(exp, input).unwrap_err()
}

fn run(exp: &Expression, input: Option<Value>) -> ExecResult<Option<Value>> {
    let mut ctx = ExecutionContext::default();
    ctx.set_value(input);
    exp.execute(&mut ctx)?;
    Ok(ctx.take_value())
}

fn identity(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    Ok(ctx.value().cloned())
}

fn foo_struct() -> Arc<StructType> {
    Arc::new(StructType::new("foo_struct").with_field("foo", DataType::Int))
}

// Leaves

mod leaf_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_input_is_reported() {
        let err = verify_err(&op("lowercase"), None);
        assert_eq!(
            err.kind,
            VerificationErrorKind::MissingTypedInput {
                expected: DataType::String
            }
        );
        assert_eq!(
            err.to_string(),
            "invalid expression 'lowercase': expected type string, but no input is specified"
        );

        let err = verify_err(&Expression::attribute("my_str"), None);
        assert_eq!(err.kind, VerificationErrorKind::MissingInput);
    }

    #[test]
    fn unresolved_output_is_not_a_mismatch() {
        let mut registry = OperationRegistry::new();
        registry.register(Operation::new("mystery", identity).creates(DataType::Unresolved));
        let exp = registry.call("mystery", Vec::new()).unwrap();

        for input in [None, Some(DataType::String)] {
            let err = verify_err(&exp, input);
            assert_eq!(err.kind, VerificationErrorKind::UnresolvedOutput);
            assert!(err.to_string().contains("failed to resolve output type"));
        }
    }

    #[test]
    fn input_takes_field_type() {
        assert_eq!(
            verify(&Expression::input("my_int"), None),
            Ok(Some(DataType::Long))
        );
        let err = verify_err(&Expression::input("nope"), None);
        assert_eq!(
            err.kind,
            VerificationErrorKind::UnknownField {
                name: "nope".into()
            }
        );
    }

    #[test]
    fn output_checks_field_type() {
        let exp = Expression::statement(vec![
            Expression::constant(Value::Int(1)),
            Expression::attribute("my_str"),
        ]);
        let err = verify_err(&exp, None);
        assert_eq!(err.expression, "attribute my_str");
        assert_eq!(
            err.to_string(),
            "invalid expression 'attribute my_str': can not assign int to field 'my_str' which is string"
        );

        let exp = Expression::statement(vec![str_const("x"), Expression::summary("nope")]);
        assert!(matches!(
            verify_err(&exp, None).kind,
            VerificationErrorKind::UnknownField { .. }
        ));
    }

    #[test]
    fn variables_keep_one_type() {
        let exp = Expression::statement(vec![
            Expression::constant(Value::Int(1)),
            Expression::set_var("x"),
            str_const("s"),
            Expression::set_var("x"),
        ]);
        assert_eq!(
            verify_err(&exp, None).kind,
            VerificationErrorKind::ConflictingVariableTypes {
                name: "x".into(),
                existing: DataType::Int,
                new: DataType::String,
            }
        );

        let exp = Expression::statement(vec![
            Expression::constant(Value::Int(1)),
            Expression::set_var("x"),
            Expression::get_var("x"),
        ]);
        assert_eq!(verify(&exp, None), Ok(Some(DataType::Int)));

        assert_eq!(
            verify_err(&Expression::get_var("y"), None).kind,
            VerificationErrorKind::UnknownVariable { name: "y".into() }
        );
    }

    #[test]
    fn required_leaf_skips_absent_value() {
        assert_eq!(run(&op("lowercase"), None), Ok(None));
        assert_eq!(run(&Expression::set_var("x"), None), Ok(None));
    }
}

// Statement

mod statement_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn types_come_from_first_requiring_and_last_creating_child() {
        let exp = Expression::statement(vec![Expression::This, op("lowercase"), op("to_int")]);
        assert_eq!(exp.required_input_type(), Some(DataType::String));
        assert_eq!(exp.created_output_type(), Some(DataType::Int));

        let exp = Expression::statement(vec![op("to_int"), Expression::set_var("n")]);
        assert_eq!(exp.created_output_type(), Some(DataType::Int));

        let exp = Expression::statement(vec![str_const("a"), op("lowercase")]);
        assert_eq!(exp.required_input_type(), None);
    }

    #[test]
    fn mismatched_pair_names_the_consumer() {
        let exp = Expression::statement(vec![Expression::constant(Value::Int(1)), op("lowercase")]);
        let err = verify_err(&exp, None);
        assert_eq!(
            err.kind,
            VerificationErrorKind::TypeMismatch {
                expected: DataType::String,
                got: DataType::Int,
            }
        );
        assert_eq!(
            err.to_string(),
            "invalid expression 'lowercase': expected type string, got type int"
        );
    }

    #[test]
    fn flattening_is_associative() {
        let nested = Expression::statement(vec![
            Expression::statement(vec![str_const("Hi"), op("lowercase")]),
            Expression::set_var("x"),
        ]);
        let flat = Expression::statement(vec![
            str_const("Hi"),
            op("lowercase"),
            Expression::set_var("x"),
        ]);
        assert_eq!(nested, flat);
        assert_eq!(verify(&nested, None), verify(&flat, None));
        assert_eq!(run(&nested, None), run(&flat, None));
        assert_eq!(run(&flat, None), Ok(Some(Value::string("hi"))));
    }

    #[test]
    fn absence_flows_through() {
        let exp = Expression::statement(vec![
            Expression::get_var("unset"),
            op("lowercase"),
            op("to_int"),
        ]);
        assert_eq!(run(&exp, None), Ok(None));
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let mut exp = Expression::This;
        for _ in 0..2_000 {
            exp = Expression::paren(exp);
        }
        assert_eq!(
            verify(&exp, Some(DataType::Int)),
            Ok(Some(DataType::Int))
        );
        assert_eq!(run(&exp, Some(Value::Int(7))), Ok(Some(Value::Int(7))));
    }
}

// Script

mod script_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_clause_script() -> Expression {
        Expression::script(vec![
            Expression::statement(vec![
                Expression::input("my_str"),
                op("lowercase"),
                Expression::attribute("my_str_lc"),
            ]),
            Expression::statement(vec![
                Expression::input("my_int"),
                Expression::attribute("my_int_copy"),
            ]),
        ])
        .unwrap()
    }

    #[test]
    fn verifies_every_statement() {
        // Statements producing different types leave the input type in place.
        assert_eq!(verify(&two_clause_script(), None), Ok(None));

        let exp = Expression::script(vec![
            Expression::statement(vec![str_const("a"), Expression::set_var("x")]),
            str_const("b"),
        ])
        .unwrap();
        assert_eq!(verify(&exp, None), Ok(Some(DataType::String)));

        let exp = Expression::script(vec![
            Expression::input("my_str"),
            Expression::statement(vec![Expression::input("nope")]),
        ])
        .unwrap();
        assert_eq!(verify_err(&exp, None).expression, "input nope");
    }

    #[test]
    fn conflicting_statements_fail_at_construction() {
        let err = Expression::script(vec![op("lowercase"), op("hex_encode")]).unwrap_err();
        assert_eq!(
            err.kind,
            VerificationErrorKind::ConflictingStatementTypes {
                first: DataType::String,
                second: DataType::Raw,
            }
        );
    }

    #[test]
    fn partial_update_skips_untouched_statements() {
        let schema = Arc::new(schema());
        let mut update =
            UpdateAdapter::new(Arc::clone(&schema)).with_assignment("my_str", Value::string("ABC"));
        {
            let mut ctx = ExecutionContext::new(&mut update);
            two_clause_script().execute(&mut ctx).unwrap();
        }
        assert_eq!(update.output("my_str_lc"), Some(&Value::string("abc")));
        assert_eq!(update.output("my_int_copy"), None);
        assert_eq!(update.output_count(), 1);
    }

    #[test]
    fn full_document_runs_every_statement() {
        let schema = Arc::new(schema());
        let mut doc = DocumentAdapter::new(schema)
            .with_value("my_str", Value::string("ABC"))
            .with_value("my_int", Value::Long(4));
        {
            let mut ctx = ExecutionContext::new(&mut doc);
            two_clause_script().execute(&mut ctx).unwrap();
        }
        assert_eq!(doc.output("my_str_lc"), Some(&Value::string("abc")));
        assert_eq!(doc.output("my_int_copy"), Some(&Value::Long(4)));
    }

    #[test]
    fn restores_outer_value_and_leaks_variables() {
        let exp = Expression::script(vec![Expression::statement(vec![
            Expression::constant(Value::Int(1)),
            Expression::set_var("a"),
        ])])
        .unwrap();
        let mut ctx = ExecutionContext::default();
        ctx.set_value(Some(Value::string("outer")));
        exp.execute(&mut ctx).unwrap();
        assert_eq!(ctx.value(), Some(&Value::string("outer")));
        assert_eq!(ctx.variable("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn each_statement_sees_script_input() {
        let exp = Expression::script(vec![
            Expression::statement(vec![op("uppercase"), Expression::set_var("up")]),
            Expression::statement(vec![op("lowercase"), Expression::set_var("down")]),
        ])
        .unwrap();
        let mut ctx = ExecutionContext::default();
        ctx.set_value(Some(Value::string("MiXeD")));
        exp.execute(&mut ctx).unwrap();
        assert_eq!(ctx.variable("up"), Some(&Value::string("MIXED")));
        assert_eq!(ctx.variable("down"), Some(&Value::string("mixed")));
    }
}

// ForEach

mod for_each_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn struct_fields_must_keep_their_type() {
        let ty = DataType::Struct(foo_struct());
        let same = Expression::for_each(op("to_int"));
        assert_eq!(verify(&same, Some(ty.clone())), Ok(Some(ty.clone())));

        let changed = Expression::for_each(op("to_string"));
        let err = verify_err(&changed, Some(ty));
        assert_eq!(
            err.kind,
            VerificationErrorKind::StructFieldMismatch {
                field: "foo".into(),
                expected: DataType::Int,
                got: "string".into(),
            }
        );
        assert!(err.to_string().contains("'foo'"));
    }

    #[test]
    fn struct_fields_update_in_place() {
        let mut st = StructValue::new(foo_struct());
        assert!(st.set_field("foo", Some(Value::Int(5))));
        let exp = Expression::for_each(Expression::statement(vec![
            Expression::constant(Value::Int(9)),
        ]));
        let out = run(&exp, Some(st.into())).unwrap().unwrap();
        assert_eq!(out.as_struct().unwrap().field("foo"), Some(&Value::Int(9)));
    }

    #[test]
    fn struct_field_rejects_wrong_runtime_type() {
        let mut st = StructValue::new(foo_struct());
        st.set_field("foo", Some(Value::Int(5)));
        let err = run(&Expression::for_each(op("to_string")), Some(st.into())).unwrap_err();
        assert!(matches!(
            err.kind,
            ExecutionErrorKind::StructFieldMismatch { ref field, .. } if field == "foo"
        ));
    }

    #[test]
    fn array_elements_change_type() {
        let exp = Expression::for_each(op("to_string"));
        assert_eq!(
            verify(&exp, Some(DataType::array(DataType::Int))),
            Ok(Some(DataType::array(DataType::String)))
        );
        let input = Value::array(DataType::Int, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            run(&exp, Some(input)),
            Ok(Some(Value::array(
                DataType::String,
                vec![Value::string("1"), Value::string("2")]
            )))
        );
    }

    #[test]
    fn map_values_keep_keys() {
        let mut map = MapValue::new(DataType::String, DataType::Int);
        map.insert(Value::string("a"), Value::Int(1));
        let exp = Expression::for_each(op("to_long"));
        assert_eq!(
            verify(&exp, Some(DataType::map(DataType::String, DataType::Int))),
            Ok(Some(DataType::map(DataType::String, DataType::Long)))
        );
        let out = run(&exp, Some(map.into())).unwrap().unwrap();
        let out = out.as_map().unwrap();
        assert_eq!(out.get(&Value::string("a")), Some(&Value::Long(1)));
        assert_eq!(out.value_type(), &DataType::Long);
    }

    #[test]
    fn weighted_set_keeps_weights() {
        let mut set = WeightedSetValue::new(DataType::String);
        set.insert(Value::string("a"), 3);
        let out = run(&Expression::for_each(op("uppercase")), Some(set.into()))
            .unwrap()
            .unwrap();
        assert_eq!(
            out.as_weighted_set().unwrap().weight(&Value::string("A")),
            Some(3)
        );
    }

    #[test]
    fn empty_array_takes_the_body_type() {
        let schema = Arc::new(
            DocumentSchema::new()
                .with_field("ints", DataType::array(DataType::Int))
                .with_synthetic_field("strs", DataType::array(DataType::String)),
        );
        let exp = Expression::statement(vec![
            Expression::input("ints"),
            Expression::for_each(op("to_string")),
            Expression::attribute("strs"),
        ]);
        let mut ctx = VerificationContext::new(&*schema);
        exp.verify(&mut ctx).unwrap();
        assert_eq!(ctx.current_type(), Some(&DataType::array(DataType::String)));

        let mut doc = DocumentAdapter::new(Arc::clone(&schema))
            .with_value("ints", Value::array(DataType::Int, Vec::new()));
        exp.execute(&mut ExecutionContext::new(&mut doc)).unwrap();
        assert_eq!(
            doc.output("strs"),
            Some(&Value::array(DataType::String, Vec::new()))
        );
    }

    #[test]
    fn empty_map_and_set_take_the_body_type() {
        let map = MapValue::new(DataType::String, DataType::Int);
        let out = run(&Expression::for_each(op("to_long")), Some(map.into()))
            .unwrap()
            .unwrap();
        assert_eq!(out.as_map().unwrap().value_type(), &DataType::Long);

        let set = WeightedSetValue::new(DataType::Int);
        let out = run(&Expression::for_each(op("to_string")), Some(set.into()))
            .unwrap()
            .unwrap();
        assert_eq!(
            out.as_weighted_set().unwrap().element_type(),
            &DataType::String
        );
    }

    #[test]
    fn empty_array_with_pass_through_body_keeps_its_type() {
        let input = Value::array(DataType::Int, Vec::new());
        assert_eq!(
            run(&Expression::for_each(Expression::This), Some(input.clone())),
            Ok(Some(input))
        );
    }

    #[test]
    fn scalars_are_not_iterable() {
        let exp = Expression::for_each(Expression::This);
        assert_eq!(
            verify_err(&exp, Some(DataType::Int)).kind,
            VerificationErrorKind::NotIterable { got: DataType::Int }
        );
        let err = run(&exp, Some(Value::Int(1))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected array, struct, weighted-set, or map input, got int"
        );
    }
}

// IfThen

mod if_then_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COMPARATORS: [Comparator; 6] = [
        Comparator::Eq,
        Comparator::Ne,
        Comparator::Gt,
        Comparator::Ge,
        Comparator::Lt,
        Comparator::Le,
    ];

    fn conditional(comparator: Comparator, with_else: bool) -> Expression {
        Expression::if_then(
            Expression::get_var("a"),
            comparator,
            Expression::get_var("b"),
            str_const("yes"),
            with_else.then(|| str_const("no")),
        )
        .unwrap()
    }

    fn eval(exp: &Expression, a: Option<Value>, b: Option<Value>) -> Option<Value> {
        let mut ctx = ExecutionContext::default();
        ctx.set_variable("a", a);
        ctx.set_variable("b", b);
        exp.execute(&mut ctx).unwrap();
        ctx.take_value()
    }

    #[test]
    fn signed_zeros_compare_equal() {
        let exp = Expression::if_then(
            Expression::constant(Value::Double(0.0)),
            Comparator::Eq,
            Expression::constant(Value::Double(-0.0)),
            str_const("eq"),
            Some(str_const("ne")),
        )
        .unwrap();
        assert_eq!(run(&exp, None), Ok(Some(Value::string("eq"))));
    }

    #[test]
    fn absent_operand_gives_absent_result() {
        for comparator in COMPARATORS {
            let exp = conditional(comparator, true);
            assert_eq!(eval(&exp, Some(Value::Int(1)), None), None);
            assert_eq!(eval(&exp, None, Some(Value::Int(1))), None);
        }
    }

    #[test]
    fn numbers_compare_across_widths() {
        let exp = conditional(Comparator::Eq, true);
        assert_eq!(
            eval(&exp, Some(Value::Int(1)), Some(Value::Long(1))),
            Some(Value::string("yes"))
        );
        let exp = conditional(Comparator::Lt, true);
        assert_eq!(
            eval(&exp, Some(Value::Byte(2)), Some(Value::Double(1.5))),
            Some(Value::string("no"))
        );
    }

    #[test]
    fn missing_else_gives_absent_result() {
        let exp = conditional(Comparator::Gt, false);
        assert_eq!(eval(&exp, Some(Value::Int(1)), Some(Value::Int(1))), None);
        assert_eq!(
            eval(&exp, Some(Value::Int(2)), Some(Value::Int(1))),
            Some(Value::string("yes"))
        );
    }

    #[test]
    fn branches_see_conditional_input() {
        let exp = Expression::if_then(
            Expression::This,
            Comparator::Eq,
            str_const("Go"),
            op("uppercase"),
            Some(op("lowercase")),
        )
        .unwrap();
        assert_eq!(verify(&exp, Some(DataType::String)), Ok(Some(DataType::String)));
        assert_eq!(
            run(&exp, Some(Value::string("Go"))),
            Ok(Some(Value::string("GO")))
        );
        assert_eq!(
            run(&exp, Some(Value::string("Stop"))),
            Ok(Some(Value::string("stop")))
        );
    }

    #[test]
    fn conflicting_operands_fail_at_construction() {
        let err = Expression::if_then(
            op("lowercase"),
            Comparator::Eq,
            op("hex_encode"),
            Expression::This,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            VerificationErrorKind::ConflictingOperandTypes {
                left: DataType::String,
                right: DataType::Raw,
            }
        );
    }

    #[test]
    fn conflicting_branches_fail_at_construction() {
        let one = || Expression::constant(Value::Int(1));
        let err = Expression::if_then(one(), Comparator::Eq, one(), one(), Some(str_const("x")))
            .unwrap_err();
        assert_eq!(
            err.kind,
            VerificationErrorKind::ConflictingOutputTypes {
                first: DataType::Int,
                second: DataType::String,
            }
        );
    }
}

// Switch and SelectInput

mod dispatch_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn writer(value: &str) -> Expression {
        Expression::statement(vec![str_const(value), Expression::set_var("out")])
    }

    fn switch() -> Expression {
        Expression::switch(
            vec![("foo".into(), writer("bar")), ("baz".into(), writer("cox"))],
            None,
        )
    }

    #[test]
    fn switch_dispatches_on_exact_key() {
        let exp = switch();
        for (input, expected) in [("foo", Some("bar")), ("baz", Some("cox")), ("???", None)] {
            let mut ctx = ExecutionContext::default();
            ctx.set_value(Some(Value::string(input)));
            exp.execute(&mut ctx).unwrap();
            assert_eq!(ctx.variable("out"), expected.map(Value::string).as_ref());
            assert_eq!(ctx.value(), Some(&Value::string(input)));
        }
    }

    #[test]
    fn switch_default_runs_when_unmatched() {
        let exp = Expression::switch(vec![("foo".into(), writer("bar"))], Some(writer("other")));
        let mut ctx = ExecutionContext::default();
        ctx.set_value(Some(Value::string("zzz")));
        exp.execute(&mut ctx).unwrap();
        assert_eq!(ctx.variable("out"), Some(&Value::string("other")));
    }

    #[test]
    fn switch_requires_string() {
        let exp = switch();
        assert_eq!(exp.required_input_type(), Some(DataType::String));
        assert_eq!(Expression::switch(Vec::new(), None).required_input_type(), None);
        assert_eq!(
            verify_err(&exp, Some(DataType::Int)).kind,
            VerificationErrorKind::TypeMismatch {
                expected: DataType::String,
                got: DataType::Int,
            }
        );
        let err = run(&exp, Some(Value::Int(1))).unwrap_err();
        assert_eq!(err.to_string(), "expected string input, got int");
    }

    #[test]
    fn switch_cases_verify_against_string() {
        let exp = Expression::switch(vec![("x".into(), op("hex_decode"))], None);
        assert_eq!(verify(&exp, Some(DataType::String)), Ok(Some(DataType::String)));
        let exp = Expression::switch(vec![("x".into(), op("hex_encode"))], None);
        assert!(matches!(
            verify_err(&exp, Some(DataType::String)).kind,
            VerificationErrorKind::TypeMismatch { .. }
        ));
    }

    fn select() -> Expression {
        Expression::select_input(vec![
            (
                "my_int".into(),
                Expression::statement(vec![op("to_string"), Expression::set_var("out")]),
            ),
            ("my_str".into(), Expression::set_var("out")),
        ])
    }

    #[test]
    fn select_input_takes_first_available_field() {
        let schema = Arc::new(schema());
        let exp = select();
        assert_eq!(verify(&exp, None), Ok(None));

        let mut update = UpdateAdapter::new(Arc::clone(&schema))
            .with_assignment("my_str", Value::string("text"));
        let mut ctx = ExecutionContext::new(&mut update);
        exp.execute(&mut ctx).unwrap();
        assert_eq!(ctx.variable("out"), Some(&Value::string("text")));

        let mut update = UpdateAdapter::new(Arc::clone(&schema))
            .with_assignment("my_str", Value::string("text"))
            .with_assignment("my_int", Value::Long(5));
        let mut ctx = ExecutionContext::new(&mut update);
        exp.execute(&mut ctx).unwrap();
        assert_eq!(ctx.variable("out"), Some(&Value::string("5")));

        let mut update = UpdateAdapter::new(schema);
        let mut ctx = ExecutionContext::new(&mut update);
        exp.execute(&mut ctx).unwrap();
        assert_eq!(ctx.variable("out"), None);
    }

    #[test]
    fn select_input_rejects_unknown_field() {
        let exp = Expression::select_input(vec![("nope".into(), Expression::This)]);
        assert_eq!(
            verify_err(&exp, None).kind,
            VerificationErrorKind::UnknownField {
                name: "nope".into()
            }
        );
    }
}

// Guard

mod guard_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stamp() -> Expression {
        Expression::guard(Expression::statement(vec![
            op("now"),
            Expression::attribute("my_int"),
        ]))
    }

    #[test]
    fn guard_runs_on_complete_document() {
        let exp = stamp();
        assert_eq!(verify(&exp, None), Ok(Some(DataType::Long)));

        let mut doc = DocumentAdapter::new(Arc::new(schema()))
            .with_value("my_str", Value::string("x"));
        {
            let mut ctx = ExecutionContext::new(&mut doc);
            exp.execute(&mut ctx).unwrap();
        }
        assert!(matches!(doc.output("my_int"), Some(Value::Long(n)) if *n > 0));
    }

    #[test]
    fn guard_skips_partial_update() {
        let mut update = UpdateAdapter::new(Arc::new(schema()))
            .with_assignment("my_str", Value::string("x"));
        {
            let mut ctx = ExecutionContext::new(&mut update);
            stamp().execute(&mut ctx).unwrap();
            assert_eq!(ctx.value(), None);
        }
        assert_eq!(update.output("my_int"), None);
        assert_eq!(update.output_count(), 0);
    }

    #[test]
    fn guard_runs_when_update_touches_its_inputs() {
        let exp = Expression::guard(Expression::statement(vec![
            Expression::input("my_str"),
            op("lowercase"),
            Expression::attribute("my_str_lc"),
        ]));
        let schema = Arc::new(schema());

        let mut update = UpdateAdapter::new(Arc::clone(&schema))
            .with_assignment("my_str", Value::string("HI"));
        exp.execute(&mut ExecutionContext::new(&mut update)).unwrap();
        assert_eq!(update.output("my_str_lc"), Some(&Value::string("hi")));

        let mut update = UpdateAdapter::new(schema).with_assignment("my_int", Value::Long(1));
        exp.execute(&mut ExecutionContext::new(&mut update)).unwrap();
        assert_eq!(update.output("my_str_lc"), None);
    }
}

// Cat and Paren

mod cat_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int_array(items: &[i32]) -> Value {
        Value::array(DataType::Int, items.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn strings_concatenate() {
        let exp = Expression::cat(vec![str_const("6"), str_const("9")]).unwrap();
        assert_eq!(exp.created_output_type(), Some(DataType::String));
        assert_eq!(verify(&exp, None), Ok(Some(DataType::String)));
        assert_eq!(run(&exp, None), Ok(Some(Value::string("69"))));
    }

    #[test]
    fn mixed_primitives_concatenate_as_text() {
        let exp = Expression::cat(vec![
            str_const("n="),
            Expression::constant(Value::Int(4)),
        ])
        .unwrap();
        assert_eq!(run(&exp, None), Ok(Some(Value::string("n=4"))));
    }

    #[test]
    fn arrays_concatenate() {
        let exp = Expression::cat(vec![
            Expression::constant(int_array(&[1])),
            Expression::constant(int_array(&[2, 3])),
        ])
        .unwrap();
        assert_eq!(exp.created_output_type(), Some(DataType::array(DataType::Int)));
        assert_eq!(run(&exp, None), Ok(Some(int_array(&[1, 2, 3]))));
    }

    #[test]
    fn absent_operand_gives_absent_result() {
        for right in [str_const("9"), Expression::constant(int_array(&[9]))] {
            let exp = Expression::cat(vec![Expression::get_var("missing"), right]).unwrap();
            assert_eq!(run(&exp, None), Ok(None));
        }
    }

    #[test]
    fn null_child_type_fails_verification() {
        let exp = Expression::cat(vec![Expression::This, str_const("9")]).unwrap();
        let err = verify_err(&exp, None);
        assert_eq!(
            err.kind,
            VerificationErrorKind::ConcatenateNull { child: "_".into() }
        );
        assert_eq!(verify(&exp, Some(DataType::String)), Ok(Some(DataType::String)));
    }

    #[test]
    fn children_share_input() {
        let exp = Expression::cat(vec![op("uppercase"), op("lowercase")]).unwrap();
        assert_eq!(exp.required_input_type(), Some(DataType::String));
        assert_eq!(
            run(&exp, Some(Value::string("Ab"))),
            Ok(Some(Value::string("ABab")))
        );
    }

    #[test]
    fn paren_is_transparent() {
        let inner = Expression::statement(vec![op("lowercase"), op("to_int")]);
        let exp = Expression::paren(inner.clone());
        assert_eq!(exp.required_input_type(), inner.required_input_type());
        assert_eq!(exp.created_output_type(), inner.created_output_type());
        assert_eq!(
            run(&exp, Some(Value::string("42"))),
            run(&inner, Some(Value::string("42")))
        );
    }
}

// Arithmetic and Choice

mod arithmetic_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn arith(left: Value, op: ArithmeticOp, right: Value) -> Expression {
        Expression::arithmetic(Expression::constant(left), op, Expression::constant(right))
            .unwrap()
    }

    #[test]
    fn operands_widen() {
        let exp = arith(Value::Int(2), ArithmeticOp::Add, Value::Long(3));
        assert_eq!(exp.created_output_type(), Some(DataType::Long));
        assert_eq!(verify(&exp, None), Ok(Some(DataType::Long)));
        assert_eq!(run(&exp, None), Ok(Some(Value::Long(5))));

        let exp = arith(Value::Byte(2), ArithmeticOp::Mul, Value::Byte(100));
        assert_eq!(run(&exp, None), Ok(Some(Value::Int(200))));

        let exp = arith(Value::Float(1.5), ArithmeticOp::Sub, Value::Double(0.5));
        assert_eq!(run(&exp, None), Ok(Some(Value::Double(1.0))));

        let exp = arith(Value::Int(7), ArithmeticOp::Mod, Value::Int(4));
        assert_eq!(run(&exp, None), Ok(Some(Value::Int(3))));
    }

    #[test]
    fn integer_errors() {
        let err = run(&arith(Value::Int(1), ArithmeticOp::Div, Value::Int(0)), None).unwrap_err();
        assert_eq!(err.kind, ExecutionErrorKind::DivisionByZero);

        let err = run(&arith(Value::Long(1), ArithmeticOp::Mod, Value::Int(0)), None).unwrap_err();
        assert_eq!(err.kind, ExecutionErrorKind::ModuloByZero);

        let err = run(
            &arith(Value::Int(i32::MAX), ArithmeticOp::Add, Value::Int(1)),
            None,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "integer overflow in addition");
    }

    #[test]
    fn floating_division_by_zero_is_infinite() {
        let exp = arith(Value::Double(1.0), ArithmeticOp::Div, Value::Double(0.0));
        assert_eq!(run(&exp, None), Ok(Some(Value::Double(f64::INFINITY))));
    }

    #[test]
    fn operands_must_be_numeric() {
        let exp = arith(Value::string("a"), ArithmeticOp::Add, Value::Int(1));
        assert_eq!(
            verify_err(&exp, None).to_string(),
            "invalid expression '\"a\" + 1': the first argument must be a number, but has type string"
        );
        let exp = Expression::arithmetic(
            Expression::constant(Value::Int(1)),
            ArithmeticOp::Add,
            Expression::This,
        )
        .unwrap();
        assert_eq!(
            verify_err(&exp, None).kind,
            VerificationErrorKind::NotNumeric {
                position: "second",
                got: "null".into(),
            }
        );
    }

    #[test]
    fn absent_operand_gives_absent_result() {
        let exp = Expression::arithmetic(
            Expression::get_var("missing"),
            ArithmeticOp::Add,
            Expression::constant(Value::Int(1)),
        )
        .unwrap();
        assert_eq!(run(&exp, None), Ok(None));
    }

    #[test]
    fn choice_takes_first_present_value() {
        let exp =
            Expression::choice(vec![Expression::get_var("a"), str_const("fallback")]).unwrap();
        assert_eq!(run(&exp, None), Ok(Some(Value::string("fallback"))));

        let mut ctx = ExecutionContext::default();
        ctx.set_variable("a", Some(Value::string("set")));
        exp.execute(&mut ctx).unwrap();
        assert_eq!(ctx.value(), Some(&Value::string("set")));
    }

    #[test]
    fn choice_alternatives_must_agree() {
        let err = Expression::choice(vec![Expression::constant(Value::Int(1)), str_const("x")])
            .unwrap_err();
        assert!(matches!(
            err.kind,
            VerificationErrorKind::ConflictingOutputTypes { .. }
        ));
    }
}

// Display

mod display_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_script_syntax() {
        let exp = Expression::script(vec![Expression::statement(vec![
            Expression::input("my_str"),
            op("lowercase"),
            Expression::attribute("my_str_lc"),
        ])])
        .unwrap();
        assert_eq!(
            exp.to_string(),
            "{ input my_str | lowercase | attribute my_str_lc; }"
        );

        let exp = Expression::if_then(
            Expression::get_var("a"),
            Comparator::Ge,
            Expression::constant(Value::Long(1)),
            str_const("yes"),
            Some(str_const("no")),
        )
        .unwrap();
        assert_eq!(
            exp.to_string(),
            "if (get_var a >= 1L) { \"yes\"; } else { \"no\"; }"
        );

        let exp = Expression::switch(
            vec![(
                "foo".into(),
                Expression::statement(vec![str_const("bar"), Expression::set_var("out")]),
            )],
            None,
        );
        assert_eq!(
            exp.to_string(),
            "switch { case \"foo\": \"bar\" | set_var out; }"
        );

        let exp = Expression::for_each(Expression::paren(op("trim")));
        assert_eq!(exp.to_string(), "for_each { (trim) }");
    }
}

// Propagation

mod propagation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STRING_OPS: [&str; 3] = ["lowercase", "uppercase", "trim"];
    const NUMERIC_OPS: [&str; 4] = ["to_int", "to_long", "to_float", "to_double"];

    fn chain(ops: &[usize], convert: usize) -> Expression {
        let mut children: Vec<Expression> = ops.iter().map(|&i| op(STRING_OPS[i])).collect();
        children.insert(0, op("trim"));
        children.push(op(NUMERIC_OPS[convert]));
        Expression::statement(children)
    }

    fn shape(kind: usize, ops: &[usize], convert: usize) -> Expression {
        match kind {
            0 => chain(ops, convert),
            1 => Expression::paren(chain(ops, convert)),
            2 => Expression::guard(chain(ops, convert)),
            3 => Expression::cat(vec![chain(ops, convert), chain(ops, convert)]).unwrap(),
            _ => Expression::arithmetic(
                chain(ops, convert),
                ArithmeticOp::Add,
                chain(ops, convert),
            )
            .unwrap(),
        }
    }

    proptest! {
        #[test]
        fn set_input_then_set_output_round_trips(
            ops in prop::collection::vec(0usize..3, 0..4),
            convert in 0usize..4,
            kind in 0usize..5,
        ) {
            let exp = shape(kind, &ops, convert);
            let schema = schema();
            let ctx = VerificationContext::new(&schema);
            let required = exp.required_input_type();
            let created = exp.created_output_type();
            prop_assert_eq!(required.clone(), Some(DataType::String));

            let forward = exp.set_input_type(required.as_ref(), &ctx).unwrap();
            prop_assert_eq!(&forward, &created);
            let backward = exp.set_output_type(forward.as_ref(), &ctx).unwrap();
            prop_assert_eq!(backward, required);
        }
    }

    #[test]
    fn forward_rejects_incompatible_input() {
        let schema = schema();
        let ctx = VerificationContext::new(&schema);
        let err = op("lowercase")
            .set_input_type(Some(&DataType::Int), &ctx)
            .unwrap_err();
        assert_eq!(err.expression, "lowercase");
        assert_eq!(
            err.kind,
            VerificationErrorKind::TypeMismatch {
                expected: DataType::String,
                got: DataType::Int,
            }
        );
    }

    #[test]
    fn backward_rejects_unproducible_output() {
        let schema = schema();
        let ctx = VerificationContext::new(&schema);
        let exp = Expression::statement(vec![op("lowercase"), op("to_int")]);
        let err = exp.set_output_type(Some(&DataType::String), &ctx).unwrap_err();
        assert_eq!(err.expression, "to_int");
    }

    #[test]
    fn for_each_maps_element_type() {
        let schema = schema();
        let ctx = VerificationContext::new(&schema);
        let exp = Expression::for_each(op("to_string"));
        assert_eq!(
            exp.set_input_type(Some(&DataType::weighted_set(DataType::Int)), &ctx),
            Ok(Some(DataType::weighted_set(DataType::String)))
        );
        assert!(exp.set_input_type(Some(&DataType::Bool), &ctx).is_err());
    }

    #[test]
    fn to_array_resolves_from_input() {
        let schema = schema();
        let ctx = VerificationContext::new(&schema);
        let exp = op("to_array");
        assert_eq!(exp.created_output_type(), Some(DataType::Unresolved));
        assert_eq!(
            exp.set_input_type(Some(&DataType::Long), &ctx),
            Ok(Some(DataType::array(DataType::Long)))
        );
        assert_eq!(
            verify(&exp, Some(DataType::Long)),
            Ok(Some(DataType::array(DataType::Long)))
        );
    }
}
