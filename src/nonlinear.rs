//! Lie derivatives and relative degree of single-output affine systems
//! $\dot{x} = f(x) + g(x)u$, $y = h(x)$.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{ControlError, ControlResult};
use crate::symbolic::{parse, Expr, UnaryFn, VectorField, ZeroTest};

/// Message returned when no $k \le n$ makes $L_g L_f^{k-1} h$ non-zero.
pub const UNDEFINED_MESSAGE: &str =
    "Relative degree not well-defined or larger than system dimension.";

/// An affine nonlinear system with its declared state variables.
#[derive(Clone, Debug)]
pub struct AffineSystem {
    variables: Vec<String>,
    f: VectorField,
    g: VectorField,
    h: Expr,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl AffineSystem {
    /// Parse $f$, $g$ and $h$ against the declared variables.
    ///
    /// # Examples
    /// ```
    /// use geometric_control::nonlinear::AffineSystem;
    ///
    /// let vars = vec!["x1".to_string(), "x2".to_string()];
    /// let pendulum = AffineSystem::parse(
    ///     &["x2".to_string(), "-sin(x1)".to_string()],
    ///     &["0".to_string(), "1".to_string()],
    ///     "x1",
    ///     &vars,
    /// )
    /// .unwrap();
    /// assert_eq!(pendulum.n_state(), 2);
    /// ```
    pub fn parse(
        f: &[String],
        g: &[String],
        h: &str,
        variables: &[String],
    ) -> ControlResult<Self> {
        if variables.is_empty() {
            return Err(ControlError::InvalidInput(
                "at least one state variable must be declared".into(),
            ));
        }
        let mut seen = HashSet::new();
        for name in variables {
            if !is_identifier(name) || UnaryFn::from_name(name).is_some() {
                return Err(ControlError::InvalidInput(format!(
                    "'{name}' is not a valid variable name"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(ControlError::InvalidInput(format!(
                    "variable '{name}' is declared twice"
                )));
            }
        }
        let n = variables.len();
        if f.len() != n || g.len() != n {
            return Err(ControlError::DimensionMismatch(format!(
                "vector fields f and g must have {n} components to match the variables, got {} and {}",
                f.len(),
                g.len()
            )));
        }
        Ok(AffineSystem {
            variables: variables.to_vec(),
            f: VectorField::parse(f, variables)?,
            g: VectorField::parse(g, variables)?,
            h: parse(h, variables)?,
        })
    }

    pub fn n_state(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn drift(&self) -> &VectorField {
        &self.f
    }

    pub fn input_field(&self) -> &VectorField {
        &self.g
    }

    pub fn output(&self) -> &Expr {
        &self.h
    }
}

/// $L_v h = \sum_i \frac{\partial h}{\partial x_i} v_i$, simplified.
pub fn lie_derivative(h: &Expr, field: &VectorField, variables: &[String]) -> Expr {
    variables
        .iter()
        .zip(field.components())
        .map(|(x, v)| h.partial(x) * v.clone())
        .fold(Expr::zero(), |acc, term| acc + term)
        .simplify()
}

/// Relative degree analysis result.
#[derive(Clone, Debug, PartialEq)]
pub struct RelativeDegree {
    /// `None` when the relative degree is undefined.
    pub relative_degree: Option<usize>,
    /// $L_g L_f^{r-1} h$ at the relative degree.
    pub decoupling: Option<Expr>,
    /// $h, L_f h, \dots, L_f^{r-1} h$ (up to $L_f^{n-1} h$ when undefined).
    pub lie_derivatives: Vec<Expr>,
    pub message: Option<String>,
}

/// Find the smallest $r \in [1, n]$ with $L_g L_f^{r-1} h \not\equiv 0$.
///
/// `samples` is the number of sample points used by the zero test when
/// simplification alone cannot decide. An undecidable test makes the
/// relative degree undefined rather than guessing.
///
/// # Examples
/// ```
/// use geometric_control::nonlinear::{relative_degree, AffineSystem};
///
/// let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
/// let pendulum = AffineSystem::parse(&s(&["x2", "-sin(x1)"]), &s(&["0", "1"]), "x1", &s(&["x1", "x2"]))
///     .unwrap();
/// let result = relative_degree(&pendulum, 8);
/// assert_eq!(result.relative_degree, Some(2));
/// assert_eq!(result.decoupling.unwrap().to_string(), "1");
/// ```
pub fn relative_degree(system: &AffineSystem, samples: usize) -> RelativeDegree {
    let n = system.n_state();
    let vars = system.variables();
    let mut lie_derivatives = Vec::with_capacity(n);
    let mut current = system.output().simplify();

    for k in 1..=n {
        let decoupling = lie_derivative(&current, system.input_field(), vars);
        debug!(k, lg_lf_h = %decoupling, lf_h = %current, "Lie derivative step");
        match decoupling.zero_test(vars, samples) {
            ZeroTest::NonZero => {
                lie_derivatives.push(current);
                info!(relative_degree = k, "relative degree found");
                return RelativeDegree {
                    relative_degree: Some(k),
                    decoupling: Some(decoupling),
                    lie_derivatives,
                    message: None,
                };
            }
            ZeroTest::Ambiguous => {
                lie_derivatives.push(current);
                info!(k, "zero test undecided, relative degree undefined");
                return RelativeDegree {
                    relative_degree: None,
                    decoupling: None,
                    lie_derivatives,
                    message: Some(format!(
                        "Could not decide whether L_g L_f^{} h = {decoupling} vanishes identically; \
                         relative degree treated as undefined.",
                        k - 1
                    )),
                };
            }
            ZeroTest::Zero => {}
        }
        let next = (k < n).then(|| lie_derivative(&current, system.drift(), vars));
        lie_derivatives.push(current);
        match next {
            Some(next) => current = next,
            None => break,
        }
    }
    info!(n, "relative degree undefined");
    RelativeDegree {
        relative_degree: None,
        decoupling: None,
        lie_derivatives,
        message: Some(UNDEFINED_MESSAGE.to_string()),
    }
}
