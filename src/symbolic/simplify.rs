use super::Expr;

/// Upper bound on bottom-up passes; each pass is already close to a fixed point.
const MAX_PASSES: usize = 8;

impl Expr {
    /// Normalize the expression with exact rewrite rules only.
    ///
    /// The result is [`Expr::zero`] whenever the rules are able to prove the
    /// expression identically zero.
    pub fn simplify(&self) -> Expr {
        let mut current = self.clone();
        for _ in 0..MAX_PASSES {
            let next = simplify_pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

fn simplify_pass(expr: &Expr) -> Expr {
    match expr {
        Expr::Const(_) | Expr::Var(_) => expr.clone(),
        Expr::Add(a, b) => fold_add(simplify_pass(a), simplify_pass(b)),
        Expr::Sub(a, b) => fold_sub(simplify_pass(a), simplify_pass(b)),
        Expr::Mul(a, b) => fold_mul(simplify_pass(a), simplify_pass(b)),
        Expr::Div(a, b) => fold_div(simplify_pass(a), simplify_pass(b)),
        Expr::Pow(a, b) => fold_pow(simplify_pass(a), simplify_pass(b)),
        Expr::Neg(a) => fold_neg(simplify_pass(a)),
        Expr::Func(f, a) => {
            let arg = simplify_pass(a);
            if let Some(c) = arg.as_const() {
                let value = f.apply(c);
                if value.is_finite() && value.fract() == 0.0 {
                    return Expr::constant(value);
                }
            }
            Expr::apply(*f, arg)
        }
    }
}

/// A folded constant, or `None` when the arithmetic left the reals.
fn finite(value: f64) -> Option<Expr> {
    value.is_finite().then(|| Expr::constant(value))
}

/// Split a term into its numeric coefficient and the remaining factor.
fn split_coefficient(expr: &Expr) -> (f64, Expr) {
    match expr {
        Expr::Mul(a, b) => match a.as_const() {
            Some(c) => (c, (**b).clone()),
            None => (1.0, expr.clone()),
        },
        Expr::Neg(a) => {
            let (c, rest) = split_coefficient(a);
            (-c, rest)
        }
        _ => (1.0, expr.clone()),
    }
}

fn scaled(coefficient: f64, term: Expr) -> Expr {
    fold_mul(Expr::constant(coefficient), term)
}

fn fold_add(a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
        if let Some(c) = finite(x + y) {
            return c;
        }
    }
    if a.is_zero() {
        return b;
    }
    if b.is_zero() {
        return a;
    }
    let (ca, ra) = split_coefficient(&a);
    let (cb, rb) = split_coefficient(&b);
    if ra == rb && a.as_const().is_none() {
        return scaled(ca + cb, ra);
    }
    match (a, b) {
        (a, Expr::Neg(x)) => fold_sub(a, *x),
        (a, Expr::Const(c)) if c < 0.0 => fold_sub(a, Expr::constant(-c)),
        (Expr::Neg(x), b) => fold_sub(b, *x),
        (a, b) => a + b,
    }
}

fn fold_sub(a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
        if let Some(c) = finite(x - y) {
            return c;
        }
    }
    if b.is_zero() {
        return a;
    }
    if a.is_zero() {
        return fold_neg(b);
    }
    if a == b {
        return Expr::zero();
    }
    let (ca, ra) = split_coefficient(&a);
    let (cb, rb) = split_coefficient(&b);
    if ra == rb && a.as_const().is_none() {
        return scaled(ca - cb, ra);
    }
    match (a, b) {
        (a, Expr::Neg(x)) => fold_add(a, *x),
        (a, Expr::Const(c)) if c < 0.0 => fold_add(a, Expr::constant(-c)),
        (a, b) => a - b,
    }
}

fn fold_mul(a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
        if let Some(c) = finite(x * y) {
            return c;
        }
    }
    if a.is_zero() || b.is_zero() {
        return Expr::zero();
    }
    if a.is_one() {
        return b;
    }
    if b.is_one() {
        return a;
    }
    if a.as_const() == Some(-1.0) {
        return fold_neg(b);
    }
    if b.as_const().is_some() {
        return fold_mul(b, a);
    }
    match (a, b) {
        (Expr::Const(c1), Expr::Mul(inner, rest)) if inner.as_const().is_some() => {
            let c2 = inner.as_const().unwrap_or(1.0);
            match finite(c1 * c2) {
                Some(c) => fold_mul(c, *rest),
                None => Expr::Const(c1) * Expr::Mul(inner, rest),
            }
        }
        (Expr::Neg(x), b) => fold_neg(fold_mul(*x, b)),
        (a, Expr::Neg(x)) => fold_neg(fold_mul(a, *x)),
        (a, b) if a == b => a.pow(Expr::constant(2.0)),
        (a, b) => a * b,
    }
}

fn fold_div(a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
        if y != 0.0 {
            if let Some(c) = finite(x / y) {
                return c;
            }
        }
    }
    if b.is_one() {
        return a;
    }
    if b.is_zero() {
        return a / b;
    }
    if a.is_zero() {
        return Expr::zero();
    }
    if b.as_const() == Some(-1.0) {
        return fold_neg(a);
    }
    if a == b {
        return Expr::one();
    }
    match (a, b) {
        (Expr::Neg(x), b) => fold_neg(fold_div(*x, b)),
        (a, Expr::Neg(x)) => fold_neg(fold_div(a, *x)),
        (a, b) => a / b,
    }
}

fn fold_pow(a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
        if let Some(c) = finite(x.powf(y)) {
            return c;
        }
    }
    if b.is_zero() || a.is_one() {
        return Expr::one();
    }
    if b.is_one() {
        return a;
    }
    if a.is_zero() && b.as_const().map_or(false, |y| y > 0.0) {
        return Expr::zero();
    }
    a.pow(b)
}

fn fold_neg(a: Expr) -> Expr {
    match a {
        Expr::Const(c) => Expr::constant(-c),
        Expr::Neg(x) => *x,
        Expr::Mul(c, rest) if c.as_const().is_some() => {
            let c = c.as_const().unwrap_or(1.0);
            fold_mul(Expr::constant(-c), *rest)
        }
        Expr::Sub(x, y) => fold_sub(*y, *x),
        other => -other,
    }
}

#[cfg(test)]
mod tests {
    use crate::symbolic::{parse, Expr};

    const VARS: [&str; 2] = ["x", "y"];

    fn simplified(source: &str) -> String {
        parse(source, &VARS).unwrap().simplify().to_string()
    }

    #[test]
    fn test_identities() {
        let cases = [
            ("0 * sin(x) + 1 * y", "y"),
            ("x + 0", "x"),
            ("0 - x", "-x"),
            ("x - x", "0"),
            ("x + x", "2 * x"),
            ("x * 3", "3 * x"),
            ("2 * (3 * x)", "6 * x"),
            ("x / 1", "x"),
            ("0 / y", "0"),
            ("sin(x) / sin(x)", "1"),
            ("x^0", "1"),
            ("x^1", "x"),
            ("1^x", "1"),
            ("--x", "x"),
            ("x + -y", "x - y"),
            ("x - -y", "x + y"),
            ("-x * y", "-(x * y)"),
            ("-1 * x", "-x"),
            ("x * x", "x^2"),
            ("2 * x - x", "x"),
            ("-x + x", "0"),
        ];
        for (source, expected) in cases {
            assert_eq!(simplified(source), expected, "simplify {source}");
        }
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(simplified("2 + 3 * 4"), "14");
        assert_eq!(simplified("2^3 - 1"), "7");
        assert_eq!(simplified("sin(0) + cos(0) + exp(0) + log(1)"), "2");
        assert_eq!(simplified("sqrt(4) * x"), "2 * x");
        // Irrational values stay symbolic.
        assert_eq!(simplified("sqrt(2)"), "sqrt(2)");
    }

    #[test]
    fn test_undefined_constants_are_not_folded() {
        assert_eq!(simplified("1 / 0"), "1 / 0");
        assert_eq!(simplified("log(0)"), "log(0)");
    }

    #[test]
    fn test_trigonometric_identity_is_not_applied() {
        let e = parse("sin(x)^2 + cos(x)^2 - 1", &VARS).unwrap().simplify();
        assert_ne!(e, Expr::zero());
    }
}
