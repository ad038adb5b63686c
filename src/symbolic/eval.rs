use super::{Expr, SymbolicError, UnaryFn};

/// Verdict of [`Expr::zero_test`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZeroTest {
    /// Simplification reduced the expression to the constant 0.
    Zero,
    /// The expression takes a non-zero value somewhere.
    NonZero,
    /// Simplification could not decide, and every sample point evaluated to
    /// (numerically) zero or was outside the domain.
    Ambiguous,
}

/// A sample value proves non-zeroness only if it exceeds this fraction of the
/// rounding scale of the expression at that point.
const RELATIVE_ZERO: f64 = 1e-9;

fn domain(message: String) -> SymbolicError {
    SymbolicError::Domain(message)
}

fn checked(value: f64, what: impl FnOnce() -> String) -> Result<f64, SymbolicError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(domain(format!("{} is not a finite number", what())))
    }
}

/// Deterministic sample point `k` in $(0.1, 2.1)^n$, positive so that
/// `log` and `sqrt` stay defined.
fn sample_point(n: usize, k: usize) -> Vec<f64> {
    const GOLDEN: f64 = 0.618_033_988_749_895;
    (0..n)
        .map(|i| {
            let t = (i + 1) as f64 * GOLDEN + (k + 1) as f64 * std::f64::consts::SQRT_2;
            0.1 + 2.0 * t.fract()
        })
        .collect()
}

/// $|f'(x)|$
fn slope(f: UnaryFn, x: f64) -> f64 {
    match f {
        UnaryFn::Sin => x.cos().abs(),
        UnaryFn::Cos => x.sin().abs(),
        UnaryFn::Exp => x.exp(),
        UnaryFn::Log => 1.0 / x.abs(),
        UnaryFn::Sqrt => 0.5 / x.sqrt(),
        UnaryFn::Tan => 1.0 + x.tan().powi(2),
    }
}

/// Carry an operand's magnitude through a local slope. An exact operand
/// contributes nothing, even where the slope is infinite.
fn propagate(slope: f64, magnitude: f64) -> f64 {
    if magnitude == 0.0 {
        0.0
    } else {
        slope * magnitude
    }
}

/// The value of a subexpression together with its magnitude, the scale that
/// rounding errors in the value are proportional to (to first order). Sums add the magnitudes of their terms, so cancellation keeps the
/// magnitude of the cancelled terms.
#[derive(Clone, Copy, Debug)]
struct Estimate {
    value: f64,
    magnitude: f64,
}

impl Estimate {
    fn exact(value: f64) -> Self {
        Estimate {
            value,
            magnitude: value.abs(),
        }
    }
}

impl Expr {
    /// Evaluate the expression with `values[i]` substituted for `variables[i]`.
    ///
    /// Division by zero, `log` of a non-positive number, `sqrt` of a negative
    /// number and any other non-finite intermediate result are reported as
    /// [`SymbolicError::Domain`].
    pub fn evaluate<S: AsRef<str>>(
        &self,
        variables: &[S],
        values: &[f64],
    ) -> Result<f64, SymbolicError> {
        self.estimate(variables, values).map(|e| e.value)
    }

    fn estimate<S: AsRef<str>>(
        &self,
        variables: &[S],
        values: &[f64],
    ) -> Result<Estimate, SymbolicError> {
        if variables.len() != values.len() {
            return Err(SymbolicError::DimensionMismatch(format!(
                "{} variables but {} values",
                variables.len(),
                values.len()
            )));
        }
        self.eval_with(variables, values)
    }

    fn eval_with<S: AsRef<str>>(
        &self,
        variables: &[S],
        values: &[f64],
    ) -> Result<Estimate, SymbolicError> {
        match self {
            Expr::Const(c) => Ok(Estimate::exact(checked(*c, || self.to_string())?)),
            Expr::Var(name) => variables
                .iter()
                .position(|v| v.as_ref() == name)
                .map(|i| Estimate::exact(values[i]))
                .ok_or_else(|| SymbolicError::UnknownVariable { name: name.clone() }),
            Expr::Add(a, b) => {
                let (a, b) = (a.eval_with(variables, values)?, b.eval_with(variables, values)?);
                Ok(Estimate {
                    value: checked(a.value + b.value, || self.to_string())?,
                    magnitude: a.magnitude + b.magnitude,
                })
            }
            Expr::Sub(a, b) => {
                let (a, b) = (a.eval_with(variables, values)?, b.eval_with(variables, values)?);
                Ok(Estimate {
                    value: checked(a.value - b.value, || self.to_string())?,
                    magnitude: a.magnitude + b.magnitude,
                })
            }
            Expr::Mul(a, b) => {
                let (a, b) = (a.eval_with(variables, values)?, b.eval_with(variables, values)?);
                Ok(Estimate {
                    value: checked(a.value * b.value, || self.to_string())?,
                    magnitude: a.magnitude * b.magnitude,
                })
            }
            Expr::Div(a, b) => {
                let (num, den) = (a.eval_with(variables, values)?, b.eval_with(variables, values)?);
                if den.value == 0.0 {
                    return Err(domain(format!("division by zero in {self}")));
                }
                let value = checked(num.value / den.value, || self.to_string())?;
                Ok(Estimate {
                    value,
                    magnitude: (num.magnitude + value.abs() * den.magnitude) / den.value.abs(),
                })
            }
            Expr::Pow(a, b) => {
                let (base, exponent) =
                    (a.eval_with(variables, values)?, b.eval_with(variables, values)?);
                let value = checked(base.value.powf(exponent.value), || {
                    format!("{}^{}", base.value, exponent.value)
                })?;
                let d_base = (exponent.value * base.value.powf(exponent.value - 1.0)).abs();
                let d_exponent = if base.value == 0.0 {
                    0.0
                } else {
                    (value * base.value.abs().ln()).abs()
                };
                Ok(Estimate {
                    value,
                    magnitude: value.abs().max(
                        propagate(d_base, base.magnitude)
                            + propagate(d_exponent, exponent.magnitude),
                    ),
                })
            }
            Expr::Neg(a) => {
                let a = a.eval_with(variables, values)?;
                Ok(Estimate {
                    value: -a.value,
                    magnitude: a.magnitude,
                })
            }
            Expr::Func(f, a) => {
                let a = a.eval_with(variables, values)?;
                let x = a.value;
                let value = match f {
                    UnaryFn::Log if x <= 0.0 => {
                        return Err(domain(format!("log of non-positive value {x}")))
                    }
                    UnaryFn::Sqrt if x < 0.0 => {
                        return Err(domain(format!("sqrt of negative value {x}")))
                    }
                    _ => checked(f.apply(x), || format!("{}({x})", f.name()))?,
                };
                Ok(Estimate {
                    value,
                    magnitude: value.abs().max(propagate(slope(*f, x), a.magnitude)),
                })
            }
        }
    }

    /// Decide whether the expression is identically zero.
    ///
    /// Simplification decides [`ZeroTest::Zero`]. Otherwise the expression
    /// is evaluated at `samples` deterministic points. A value proves
    /// [`ZeroTest::NonZero`] only when it stands clear of the rounding error
    /// its own terms could produce, so a cancellation like
    /// $10^8 \sin^2 x + 10^8 \cos^2 x - 10^8$ stays [`ZeroTest::Ambiguous`].
    pub fn zero_test<S: AsRef<str>>(&self, variables: &[S], samples: usize) -> ZeroTest {
        let simplified = self.simplify();
        match simplified.as_const() {
            Some(c) if c == 0.0 => return ZeroTest::Zero,
            Some(c) if c.is_finite() => return ZeroTest::NonZero,
            _ => {}
        }
        let witnessed = (0..samples).any(|k| {
            let point = sample_point(variables.len(), k);
            matches!(
                simplified.estimate(variables, &point),
                Ok(e) if e.value.abs() > RELATIVE_ZERO * e.magnitude
            )
        });
        if witnessed {
            ZeroTest::NonZero
        } else {
            ZeroTest::Ambiguous
        }
    }
}
