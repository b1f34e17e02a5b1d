use calcbridge::EvalError;
use calcbridge::local::evaluate_locally;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-10
}

#[test]
fn matches_standard_precedence() {
    let cases: &[(&str, f64)] = &[
        ("1 + 2 * 3", 7.0),
        ("(1 + 2) * 3", 9.0),
        ("2 ^ 3 * 2", 16.0),
        ("2 * 3 ^ 2", 18.0),
        ("2 ^ 3 ^ 2", 512.0),
        ("-2 ^ 2", -4.0),
        ("10 - 2 - 3", 5.0),
        ("100 / 10 / 2", 5.0),
        ("7 % 4 * 2", 6.0),
        ("1.5 * 4 + .5", 6.5),
        ("((2))", 2.0),
        ("3 - -3", 6.0),
        ("2 ^ 0.5", std::f64::consts::SQRT_2),
        ("1 / 7", 1.0 / 7.0),
        ("(0.1 + 0.2) * 10", 3.0),
    ];
    for (expr, expected) in cases {
        let got = evaluate_locally(expr).unwrap();
        assert!(close(got, *expected), "{expr}: got {got}, expected {expected}");
    }
}

#[test]
fn every_foreign_character_is_rejected() {
    let foreign = "abcdefghijklmnopqrstuvwxyzABCXYZ_=!?;:,'\"`$#@&|~<>[]{}\\\n\r\u{0}é∞";
    for c in foreign.chars() {
        let expr = format!("1{c}2");
        assert!(
            matches!(evaluate_locally(&expr), Err(EvalError::InvalidExpression(_))),
            "{expr:?} was not rejected"
        );
    }
}

#[test]
fn code_shaped_input_is_rejected() {
    for expr in [
        "constructor.constructor('return 1')()",
        "require('fs')",
        "1; 2",
        "[1]+[2]",
        "Infinity",
        "NaN",
    ] {
        assert!(
            matches!(evaluate_locally(expr), Err(EvalError::InvalidExpression(_))),
            "{expr}"
        );
    }
}

#[test]
fn non_finite_results() {
    for expr in ["1/0", "-1/0", "0/0", "0%0", "9^999"] {
        assert_eq!(evaluate_locally(expr), Err(EvalError::InvalidCalculation), "{expr}");
    }
}

#[test]
fn blank_input() {
    assert_eq!(evaluate_locally(""), Err(EvalError::EmptyExpression));
    assert_eq!(evaluate_locally(" \t "), Err(EvalError::EmptyExpression));
}
