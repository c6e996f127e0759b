//! Gate parameter expressions.
//!
//! Parameters keep the arithmetic form they were written in so that a
//! circuit prints back exactly as it was parsed (`p(pi/32) q[0];`).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// A concrete arithmetic expression over numbers and π.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A numeric literal.
    Constant(f64),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Evaluate the expression. Returns `None` when the result is not finite,
    /// e.g. on division by zero.
    pub fn value(&self) -> Option<f64> {
        let v = self.eval();
        v.is_finite().then_some(v)
    }

    fn eval(&self) -> f64 {
        match self {
            ParameterExpression::Constant(v) => *v,
            ParameterExpression::Pi => PI,
            ParameterExpression::Neg(e) => -e.eval(),
            ParameterExpression::Add(a, b) => a.eval() + b.eval(),
            ParameterExpression::Sub(a, b) => a.eval() - b.eval(),
            ParameterExpression::Mul(a, b) => a.eval() * b.eval(),
            ParameterExpression::Div(a, b) => a.eval() / b.eval(),
        }
    }

    /// Binding strength used when printing; higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            ParameterExpression::Add(..) | ParameterExpression::Sub(..) => 1,
            ParameterExpression::Mul(..) | ParameterExpression::Div(..) => 2,
            ParameterExpression::Neg(_) => 3,
            ParameterExpression::Constant(v) if v.is_sign_negative() => 3,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_binary(
        f: &mut fmt::Formatter<'_>,
        lhs: &Self,
        op: &str,
        rhs: &Self,
        precedence: u8,
    ) -> fmt::Result {
        // Operators are left-associative: the right operand needs parens at equal precedence.
        lhs.fmt_operand(f, precedence)?;
        f.write_str(op)?;
        rhs.fmt_operand(f, precedence + 1)
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Pi => write!(f, "pi"),
            ParameterExpression::Neg(e) => {
                f.write_str("-")?;
                e.fmt_operand(f, 4)
            }
            ParameterExpression::Add(a, b) => Self::fmt_binary(f, a, "+", b, 1),
            ParameterExpression::Sub(a, b) => Self::fmt_binary(f, a, "-", b, 1),
            ParameterExpression::Mul(a, b) => Self::fmt_binary(f, a, "*", b, 2),
            ParameterExpression::Div(a, b) => Self::fmt_binary(f, a, "/", b, 2),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self {
        ParameterExpression::Neg(Box::new(self))
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}
