use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use super::{parse, SymbolicError};

/// Named unary functions understood by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryFn {
    Sin,
    Cos,
    Exp,
    Log,
    Sqrt,
    Tan,
}

impl UnaryFn {
    pub const ALL: [UnaryFn; 6] = [
        UnaryFn::Sin,
        UnaryFn::Cos,
        UnaryFn::Exp,
        UnaryFn::Log,
        UnaryFn::Sqrt,
        UnaryFn::Tan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UnaryFn::Sin => "sin",
            UnaryFn::Cos => "cos",
            UnaryFn::Exp => "exp",
            UnaryFn::Log => "log",
            UnaryFn::Sqrt => "sqrt",
            UnaryFn::Tan => "tan",
        }
    }

    pub fn from_name(name: &str) -> Option<UnaryFn> {
        UnaryFn::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Apply the function without any domain checks.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryFn::Sin => x.sin(),
            UnaryFn::Cos => x.cos(),
            UnaryFn::Exp => x.exp(),
            UnaryFn::Log => x.ln(),
            UnaryFn::Sqrt => x.sqrt(),
            UnaryFn::Tan => x.tan(),
        }
    }
}

/// A scalar expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(f64),
    Var(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Func(UnaryFn, Box<Expr>),
}

impl Expr {
    /// A constant, with negative zero folded to zero.
    pub fn constant(value: f64) -> Expr {
        Expr::Const(if value == 0.0 { 0.0 } else { value })
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn zero() -> Expr {
        Expr::Const(0.0)
    }

    pub fn one() -> Expr {
        Expr::Const(1.0)
    }

    pub fn pow(self, exponent: Expr) -> Expr {
        Expr::Pow(Box::new(self), Box::new(exponent))
    }

    pub fn apply(f: UnaryFn, arg: Expr) -> Expr {
        Expr::Func(f, Box::new(arg))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 1.0)
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(c) => Some(*c),
            _ => None,
        }
    }

    pub fn contains_var(&self, name: &str) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::Var(v) => v == name,
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.contains_var(name) || b.contains_var(name),
            Expr::Neg(a) | Expr::Func(_, a) => a.contains_var(name),
        }
    }

    /// Names of every variable in the expression.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(v) => {
                out.insert(v.clone());
            }
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Expr::Neg(a) | Expr::Func(_, a) => a.collect_variables(out),
        }
    }

    /// Binding strength used when printing; higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Const(c) if c.is_sign_negative() => 3,
            Expr::Pow(..) => 4,
            Expr::Const(_) | Expr::Var(_) | Expr::Func(..) => 5,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter, operand: &Expr, min_precedence: u8) -> fmt::Result {
    if operand.precedence() < min_precedence {
        write!(f, "({operand})")
    } else {
        write!(f, "{operand}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{c}"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Add(a, b) => {
                write_operand(f, a, 1)?;
                f.write_str(" + ")?;
                write_operand(f, b, 1)
            }
            Expr::Sub(a, b) => {
                write_operand(f, a, 1)?;
                f.write_str(" - ")?;
                write_operand(f, b, 2)
            }
            Expr::Mul(a, b) => {
                write_operand(f, a, 2)?;
                f.write_str(" * ")?;
                write_operand(f, b, 2)
            }
            Expr::Div(a, b) => {
                write_operand(f, a, 2)?;
                f.write_str(" / ")?;
                write_operand(f, b, 3)
            }
            Expr::Pow(a, b) => {
                write_operand(f, a, 5)?;
                f.write_str("^")?;
                write_operand(f, b, 4)
            }
            Expr::Neg(a) => {
                f.write_str("-")?;
                match **a {
                    Expr::Neg(_) => write!(f, "{a}"),
                    _ => write_operand(f, a, 5),
                }
            }
            Expr::Func(func, a) => write!(f, "{}({a})", func.name()),
        }
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

/// An ordered list of expressions, one per state variable, such as $f(x)$
/// or a column of $g(x)$.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorField(Vec<Expr>);

impl VectorField {
    pub fn new(components: Vec<Expr>) -> Self {
        VectorField(components)
    }

    /// Parse every component against the declared variables.
    pub fn parse<S: AsRef<str>>(sources: &[S], variables: &[S]) -> Result<Self, SymbolicError> {
        sources
            .iter()
            .map(|src| parse(src.as_ref(), variables))
            .collect::<Result<Vec<_>, _>>()
            .map(VectorField::new)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn components(&self) -> &[Expr] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_minimal_parentheses() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        assert_eq!((x.clone() + y.clone() * x.clone()).to_string(), "x + y * x");
        assert_eq!(((x.clone() + y.clone()) * x.clone()).to_string(), "(x + y) * x");
        assert_eq!((x.clone() - (y.clone() - x.clone())).to_string(), "x - (y - x)");
        assert_eq!((x.clone() / (y.clone() * x.clone())).to_string(), "x / (y * x)");
        assert_eq!((-x.clone()).pow(Expr::constant(2.0)).to_string(), "(-x)^2");
        assert_eq!((-(x.clone().pow(Expr::constant(2.0)))).to_string(), "-(x^2)");
        assert_eq!(
            (-Expr::apply(UnaryFn::Sin, x.clone())).to_string(),
            "-sin(x)"
        );
        assert_eq!(Expr::constant(-0.0).to_string(), "0");
    }

    #[test]
    fn test_variables() {
        let e = Expr::var("b") * Expr::apply(UnaryFn::Cos, Expr::var("a")) + Expr::var("b");
        let vars: Vec<_> = e.variables().into_iter().collect();
        assert_eq!(vars, vec!["a".to_string(), "b".to_string()]);
        assert!(e.contains_var("a"));
        assert!(!e.contains_var("c"));
    }

    #[test]
    fn test_function_names() {
        for f in UnaryFn::ALL {
            assert_eq!(UnaryFn::from_name(f.name()), Some(f));
        }
        assert_eq!(UnaryFn::from_name("cosh"), None);
    }
}
