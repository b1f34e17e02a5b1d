//! Pre-flight checks shared by both evaluation paths.

use crate::error::EvalError;

/// Characters the arithmetic grammar is built from, besides ASCII digits.
const OPERATORS: &[char] = &['.', '+', '-', '*', '/', '%', '^', '(', ')'];

/// Check that `expression` is non-blank, uses only the arithmetic
/// alphabet, and has balanced parentheses.
///
/// Only space and tab count as whitespace. A newline would split one
/// request into two engine lines, so it is rejected like any other
/// foreign character.
pub fn validate(expression: &str) -> Result<(), EvalError> {
    if expression.trim().is_empty() {
        return Err(EvalError::EmptyExpression);
    }

    let mut depth: usize = 0;
    for (pos, c) in expression.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    EvalError::InvalidExpression(format!("unmatched ')' at position {pos}"))
                })?;
            }
            c if c.is_ascii_digit() || c == ' ' || c == '\t' || OPERATORS.contains(&c) => {}
            other => {
                return Err(EvalError::InvalidExpression(format!(
                    "unexpected character {other:?} at position {pos}"
                )));
            }
        }
    }

    if depth > 0 {
        return Err(EvalError::InvalidExpression("unclosed '('".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_alphabet() {
        assert!(validate("(1.5 + 2) * 3 - 4 / 5 % 6 ^ 7").is_ok());
        assert!(validate("\t2+2 ").is_ok());
    }

    #[test]
    fn blank_is_empty_expression() {
        assert_eq!(validate(""), Err(EvalError::EmptyExpression));
        assert_eq!(validate("   "), Err(EvalError::EmptyExpression));
        assert_eq!(validate("\t"), Err(EvalError::EmptyExpression));
    }

    #[test]
    fn rejects_letters_and_code() {
        for input in ["exit", "2+x", "alert(1)", "Math.PI", "1e3", "2;3", "a=1"] {
            let err = validate(input).unwrap_err();
            assert!(
                matches!(err, EvalError::InvalidExpression(_)),
                "{input} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_newlines() {
        assert!(matches!(
            validate("1+1\n2+2"),
            Err(EvalError::InvalidExpression(_))
        ));
        assert!(matches!(
            validate("1+1\r"),
            Err(EvalError::InvalidExpression(_))
        ));
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(matches!(validate("(1+2"), Err(EvalError::InvalidExpression(_))));
        assert!(matches!(validate("1+2)"), Err(EvalError::InvalidExpression(_))));
        assert!(matches!(validate(")("), Err(EvalError::InvalidExpression(_))));
    }

    #[test]
    fn error_names_offending_character() {
        let err = validate("2 $ 3").unwrap_err();
        assert!(err.to_string().contains("'$'"));
        assert!(err.to_string().contains("position 2"));
    }
}
