//! Textual form of expressions, as used in verification errors.
//!
//! The output follows the script syntax (`input a | lowercase | attribute b`)
//! closely enough that an error points the author at the right clause.

use std::fmt;

use ixl_value::Value;

use super::{Expression, StatementExpr};

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => fmt_literal(value, f),
            Expression::This => f.write_str("_"),
            Expression::Input(field) => write!(f, "input {field}"),
            Expression::Output { kind, field } => write!(f, "{} {field}", kind.keyword()),
            Expression::GetVar(name) => write!(f, "get_var {name}"),
            Expression::SetVar(name) => write!(f, "set_var {name}"),
            Expression::Operation(call) => write!(f, "{call}"),
            Expression::Statement(s) => write!(f, "{s}"),
            Expression::Script(s) => {
                f.write_str("{ ")?;
                for statement in &s.statements {
                    write!(f, "{statement}; ")?;
                }
                f.write_str("}")
            }
            Expression::ForEach(inner) => write!(f, "for_each {{ {inner} }}"),
            Expression::IfThen(s) => {
                write!(
                    f,
                    "if ({} {} {}) {{ {}; }}",
                    s.left,
                    s.comparator.symbol(),
                    s.right,
                    s.if_true
                )?;
                if let Some(if_false) = &s.if_false {
                    write!(f, " else {{ {if_false}; }}")?;
                }
                Ok(())
            }
            Expression::Switch(s) => {
                f.write_str("switch { ")?;
                for (key, exp) in &s.cases {
                    write!(f, "case \"{key}\": {exp}; ")?;
                }
                if let Some(default) = &s.default {
                    write!(f, "default: {default}; ")?;
                }
                f.write_str("}")
            }
            Expression::SelectInput(s) => {
                f.write_str("select_input { ")?;
                for (field, exp) in &s.cases {
                    write!(f, "{field}: {exp}; ")?;
                }
                f.write_str("}")
            }
            Expression::Guard(s) => write!(f, "guard {{ {} }}", s.inner),
            Expression::Cat(s) => join(f, &s.children, " . "),
            Expression::Paren(inner) => write!(f, "({inner})"),
            Expression::Arithmetic(s) => write!(f, "{} {} {}", s.left, s.op.symbol(), s.right),
            Expression::Choice(s) => join(f, &s.alternatives, " || "),
        }
    }
}

impl fmt::Display for StatementExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        join(f, &self.children, " | ")
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: &[Expression], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Literals render as they would be written: strings quoted and escaped.
fn fmt_literal(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Str(s) => write!(f, "{:?}", s.as_str()),
        Value::Long(n) => write!(f, "{n}L"),
        other => write!(f, "{other}"),
    }
}
