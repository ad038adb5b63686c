use super::{Expr, UnaryFn};

impl Expr {
    /// Exact structural derivative with respect to `var`, without simplification.
    pub fn derivative(&self, var: &str) -> Expr {
        if !self.contains_var(var) {
            return Expr::zero();
        }
        match self {
            Expr::Const(_) => Expr::zero(),
            Expr::Var(name) => {
                if name == var {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            Expr::Add(a, b) => a.derivative(var) + b.derivative(var),
            Expr::Sub(a, b) => a.derivative(var) - b.derivative(var),
            // (ab)' = a'b + ab'
            Expr::Mul(a, b) => {
                a.derivative(var) * (**b).clone() + (**a).clone() * b.derivative(var)
            }
            // (a/b)' = (a'b - ab') / b^2
            Expr::Div(a, b) => {
                (a.derivative(var) * (**b).clone() - (**a).clone() * b.derivative(var))
                    / (**b).clone().pow(Expr::constant(2.0))
            }
            Expr::Pow(base, exponent) => {
                match (base.contains_var(var), exponent.contains_var(var)) {
                    // (u^n)' = n u^(n-1) u'
                    (true, false) => {
                        let lowered = match exponent.as_const() {
                            Some(n) => Expr::constant(n - 1.0),
                            None => (**exponent).clone() - Expr::one(),
                        };
                        (**exponent).clone()
                            * (**base).clone().pow(lowered)
                            * base.derivative(var)
                    }
                    // (a^v)' = a^v log(a) v'
                    (false, _) => {
                        self.clone()
                            * Expr::apply(UnaryFn::Log, (**base).clone())
                            * exponent.derivative(var)
                    }
                    // (u^v)' = u^v (v' log(u) + v u' / u)
                    (true, true) => {
                        self.clone()
                            * (exponent.derivative(var)
                                * Expr::apply(UnaryFn::Log, (**base).clone())
                                + (**exponent).clone() * base.derivative(var)
                                    / (**base).clone())
                    }
                }
            }
            Expr::Neg(a) => -a.derivative(var),
            Expr::Func(func, arg) => {
                let u = (**arg).clone();
                let outer = match func {
                    UnaryFn::Sin => Expr::apply(UnaryFn::Cos, u),
                    UnaryFn::Cos => -Expr::apply(UnaryFn::Sin, u),
                    UnaryFn::Exp => Expr::apply(UnaryFn::Exp, u),
                    UnaryFn::Log => Expr::one() / u,
                    UnaryFn::Sqrt => Expr::one() / (Expr::constant(2.0) * Expr::apply(UnaryFn::Sqrt, u)),
                    UnaryFn::Tan => {
                        Expr::one() / Expr::apply(UnaryFn::Cos, u).pow(Expr::constant(2.0))
                    }
                };
                outer * arg.derivative(var)
            }
        }
    }

    /// Simplified partial derivative $\partial e / \partial x$.
    pub fn partial(&self, var: &str) -> Expr {
        self.derivative(var).simplify()
    }
}
