use super::*;

#[test]
fn parses_arithmetic_precedence() {
    let e = parse_expr("1+2*3").unwrap();
    match e {
        Expr::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        )),
        other => panic!("unexpected ast: {other:?}"),
    }
}

#[test]
fn parses_member_and_index_chains() {
    let e = parse_expr("items[i].label").unwrap();
    assert_eq!(
        e,
        Expr::Member {
            object: Box::new(Expr::Index {
                object: Box::new(Expr::Var("items".to_owned())),
                index: Box::new(Expr::Var("i".to_owned())),
            }),
            name: "label".to_owned(),
        }
    );
}

#[test]
fn parses_calls_on_identifiers_only() {
    match parse_expr("max(1, 2, 3)").unwrap() {
        Expr::Call { func, args } => {
            assert_eq!(func, "max");
            assert_eq!(args.len(), 3);
        }
        other => panic!("unexpected ast: {other:?}"),
    }
    assert!(parse_expr("a.b(1)").is_err());
}

#[test]
fn ternary_is_right_associative() {
    let e = parse_expr("a ? 1 : b ? 2 : 3").unwrap();
    match e {
        Expr::Conditional { otherwise, .. } => {
            assert!(matches!(*otherwise, Expr::Conditional { .. }))
        }
        other => panic!("unexpected ast: {other:?}"),
    }
}

#[test]
fn nullish_binds_looser_than_or() {
    let e = parse_expr("a || b ?? c").unwrap();
    assert!(matches!(
        e,
        Expr::Logical {
            op: LogicalOp::Nullish,
            ..
        }
    ));
}

#[test]
fn parses_object_literals_with_shorthand() {
    let e = parse_expr("{ width, 'height': 2, }").unwrap();
    assert_eq!(
        e,
        Expr::Object(vec![
            ("width".to_owned(), Expr::Var("width".to_owned())),
            ("height".to_owned(), Expr::Lit(Lit::Number(2.0))),
        ])
    );
}

#[test]
fn parses_string_literals_with_escapes() {
    let e = parse_expr(r#"'it\'s' + "a\tb""#).unwrap();
    match e {
        Expr::Binary { left, right, .. } => {
            assert_eq!(*left, Expr::Lit(Lit::Str("it's".to_owned())));
            assert_eq!(*right, Expr::Lit(Lit::Str("a\tb".to_owned())));
        }
        other => panic!("unexpected ast: {other:?}"),
    }
}

#[test]
fn error_offsets_account_for_leading_whitespace() {
    let err = parse_expr("  1 + #").unwrap_err();
    assert_eq!(err.offset, 6);
    assert!(err.message.contains("unexpected character"));
}

#[test]
fn rejects_empty_and_trailing_input() {
    assert!(parse_expr("   ").is_err());
    assert!(parse_expr("1 2").is_err());
    assert!(parse_expr("(1").is_err());
    assert!(parse_expr("'open").is_err());
}
