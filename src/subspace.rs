//! Linear-algebra primitives on subspaces of $\mathbb{R}^n$.
//!
//! A [`Subspace`] is stored as an orthonormal basis matrix whose columns come
//! out of a singular value decomposition, so bases are always canonical up to
//! rank. Comparisons between subspaces go through ranks of stacked bases and
//! never through the raw column values.
//!
//! Every rank decision in the crate is made by [`Tolerance`].

use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use ndarray_linalg::SVD;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// The numerical tolerance used for every rank decision.
///
/// A singular value $\sigma$ is treated as non-zero iff
/// $\sigma > \text{rel} \cdot s$ where $s$ is the scale of the matrix being
/// decomposed (its largest singular value unless the caller supplies a better
/// one). Only a zero scale falls back to the absolute cutoff $\text{rel}$.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Relative singular value cutoff.
    pub rel: f64,
    /// Condition number above which a least-squares solve is reported as unstable.
    pub max_condition: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            rel: 1e-9,
            max_condition: 1e8,
        }
    }
}

impl Tolerance {
    /// The singular value threshold for a matrix of the given scale.
    pub fn threshold(&self, scale: f64) -> f64 {
        if scale > f64::MIN_POSITIVE {
            self.rel * scale
        } else {
            self.rel
        }
    }
}

/// Full singular value decomposition $M = U \Sigma V^\text{T}$.
struct Decomposition {
    u: Array2<f64>,
    sigma: Array1<f64>,
    vt: Array2<f64>,
}

fn decompose(mat: &Array2<f64>) -> ControlResult<Decomposition> {
    let (u, sigma, vt) = mat.svd(true, true)?;
    match (u, vt) {
        (Some(u), Some(vt)) => Ok(Decomposition { u, sigma, vt }),
        _ => Err(ControlError::Linalg(
            "singular vectors were not returned by the SVD".to_string(),
        )),
    }
}

/// Count the leading singular values above the threshold (they are sorted).
fn numerical_rank(sigma: &Array1<f64>, threshold: f64) -> usize {
    sigma.iter().take_while(|&&v| v > threshold).count()
}

fn largest(sigma: &Array1<f64>) -> f64 {
    sigma.iter().copied().fold(0.0, f64::max)
}

/// Concatenate matrices column-wise.
pub(crate) fn hstack(blocks: &[ArrayView2<f64>]) -> ControlResult<Array2<f64>> {
    ndarray::concatenate(Axis(1), blocks)
        .map_err(|e| ControlError::DimensionMismatch(format!("cannot stack columns: {e}")))
}

/// $\lVert M \rVert_2$, the largest singular value.
fn spectral_norm(mat: &Array2<f64>) -> ControlResult<f64> {
    if mat.is_empty() {
        return Ok(0.0);
    }
    let (_, singular_values, _) = mat.svd(false, false)?;
    Ok(largest(&singular_values))
}

/// Determine the rank of a matrix (using the SVD).
///
/// # Examples
/// ```
/// use ndarray::array;
/// use geometric_control::subspace::rank;
///
/// let mat = array![[1., 2., 1.], [0., 1., 0.], [2., 5., 2.]];
///
/// assert_eq!(rank(&mat, Default::default()).expect("Error in rank"), 2);
/// ```
pub fn rank(mat: &Array2<f64>, tol: Tolerance) -> ControlResult<usize> {
    if mat.is_empty() {
        return Ok(0);
    }
    let (_, singular_values, _) = mat.svd(false, false)?;
    let threshold = tol.threshold(largest(&singular_values));
    Ok(numerical_rank(&singular_values, threshold))
}

/// Basis for the column space of `mat`.
pub fn image(mat: &Array2<f64>, tol: Tolerance) -> ControlResult<Subspace> {
    if mat.is_empty() {
        return Ok(Subspace::zero(mat.nrows()));
    }
    let svd = decompose(mat)?;
    let r = numerical_rank(&svd.sigma, tol.threshold(largest(&svd.sigma)));
    Ok(Subspace {
        basis: svd.u.slice(s![.., ..r]).to_owned(),
    })
}

/// Basis for the null space of `mat`.
pub fn kernel(mat: &Array2<f64>, tol: Tolerance) -> ControlResult<Subspace> {
    kernel_at_scale(mat, None, tol)
}

/// Null space with the rank threshold taken relative to `scale` instead of
/// the matrix's own largest singular value.
fn kernel_at_scale(
    mat: &Array2<f64>,
    scale: Option<f64>,
    tol: Tolerance,
) -> ControlResult<Subspace> {
    if mat.is_empty() {
        return Ok(Subspace::full(mat.ncols()));
    }
    let svd = decompose(mat)?;
    let scale = scale.unwrap_or_else(|| largest(&svd.sigma));
    let r = numerical_rank(&svd.sigma, tol.threshold(scale));
    Ok(Subspace {
        basis: svd.vt.slice(s![r.., ..]).t().to_owned(),
    })
}

/// Basis for the preimage $A^{-1}(S) = \\{x : Ax \in S\\}$.
///
/// Computed as the kernel of $(I - P_S)A$ where $P_S$ is the orthogonal
/// projector onto $S$. The rank threshold is relative to
/// $\lVert A \rVert_2$ so that the cancellation inside $(I - P_S)A$ is not
/// mistaken for a non-trivial residual.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use geometric_control::subspace::{preimage, Subspace};
///
/// let a_mat = array![[0., 1.], [0., 0.]];
/// let s = Subspace::zero(2);
/// // The preimage of {0} is the kernel of A.
/// assert_eq!(preimage(&a_mat, &s, Default::default()).unwrap().dim(), 1);
/// ```
pub fn preimage(a_mat: &Array2<f64>, s: &Subspace, tol: Tolerance) -> ControlResult<Subspace> {
    if a_mat.nrows() != s.ambient_dim() {
        return Err(ControlError::DimensionMismatch(format!(
            "preimage of a subspace of R^{} under a map into R^{}",
            s.ambient_dim(),
            a_mat.nrows()
        )));
    }
    if s.dim() == 0 {
        return kernel(a_mat, tol);
    }
    let residual = a_mat - &s.projector().dot(a_mat);
    kernel_at_scale(&residual, Some(spectral_norm(a_mat)?), tol)
}

/// Moore-Penrose pseudo-inverse together with the information needed to judge
/// whether it can be trusted.
#[derive(Clone, Debug)]
pub struct PseudoInverse {
    pub matrix: Array2<f64>,
    pub rank: usize,
    /// Ratio of the largest to the smallest retained singular value.
    pub condition: f64,
}

/// Compute $M^+ = V_r \Sigma_r^{-1} U_r^\text{T}$ over the singular values
/// that pass the tolerance.
pub fn pseudo_inverse(mat: &Array2<f64>, tol: Tolerance) -> ControlResult<PseudoInverse> {
    if mat.is_empty() {
        return Ok(PseudoInverse {
            matrix: Array2::zeros((mat.ncols(), mat.nrows())),
            rank: 0,
            condition: 1.0,
        });
    }
    let svd = decompose(mat)?;
    let sv_max = largest(&svd.sigma);
    let r = numerical_rank(&svd.sigma, tol.threshold(sv_max));
    let mut v_r = svd.vt.slice(s![..r, ..]).t().to_owned();
    for (mut column, &sigma) in v_r.columns_mut().into_iter().zip(svd.sigma.iter()) {
        column /= sigma;
    }
    let matrix = v_r.dot(&svd.u.slice(s![.., ..r]).t());
    let condition = if r == 0 { 1.0 } else { sv_max / svd.sigma[r - 1] };
    Ok(PseudoInverse {
        matrix,
        rank: r,
        condition,
    })
}

/// A linear subspace of $\mathbb{R}^n$, held as an orthonormal basis
/// (an $n \times k$ matrix).
#[derive(Clone, Debug)]
pub struct Subspace {
    basis: Array2<f64>,
}

impl Subspace {
    /// The trivial subspace $\\{0\\} \subset \mathbb{R}^n$.
    pub fn zero(n: usize) -> Self {
        Subspace {
            basis: Array2::zeros((n, 0)),
        }
    }

    /// The whole space $\mathbb{R}^n$.
    pub fn full(n: usize) -> Self {
        Subspace {
            basis: Array2::eye(n),
        }
    }

    /// The span of the columns of `generators` (any generating set).
    pub fn span(generators: &Array2<f64>, tol: Tolerance) -> ControlResult<Self> {
        image(generators, tol)
    }

    /// Orthonormal basis, one column per dimension.
    pub fn basis(&self) -> &Array2<f64> {
        &self.basis
    }

    pub fn dim(&self) -> usize {
        self.basis.ncols()
    }

    pub fn ambient_dim(&self) -> usize {
        self.basis.nrows()
    }

    /// Orthogonal projector $P = V V^\text{T}$ onto the subspace.
    pub fn projector(&self) -> Array2<f64> {
        self.basis.dot(&self.basis.t())
    }

    fn check_ambient(&self, other: &Subspace, op: &str) -> ControlResult<()> {
        if self.ambient_dim() != other.ambient_dim() {
            return Err(ControlError::DimensionMismatch(format!(
                "{op} of subspaces of R^{} and R^{}",
                self.ambient_dim(),
                other.ambient_dim()
            )));
        }
        Ok(())
    }

    /// $S_1 + S_2$.
    pub fn sum(&self, other: &Subspace, tol: Tolerance) -> ControlResult<Subspace> {
        self.check_ambient(other, "sum")?;
        image(&hstack(&[self.basis.view(), other.basis.view()])?, tol)
    }

    /// $S_1 \cap S_2$, from the null space of $[S_1 \mid -S_2]$.
    ///
    /// # Examples
    /// ```
    /// use ndarray::array;
    /// use geometric_control::subspace::Subspace;
    ///
    /// let tol = Default::default();
    /// let s1 = Subspace::span(&array![[1., 0.], [0., 1.], [0., 0.]], tol).unwrap();
    /// let s2 = Subspace::span(&array![[0., 0.], [1., 0.], [0., 1.]], tol).unwrap();
    /// let both = s1.intersect(&s2, tol).unwrap();
    /// assert_eq!(both.dim(), 1);
    /// ```
    pub fn intersect(&self, other: &Subspace, tol: Tolerance) -> ControlResult<Subspace> {
        self.check_ambient(other, "intersection")?;
        if self.dim() == 0 || other.dim() == 0 {
            return Ok(Subspace::zero(self.ambient_dim()));
        }
        let negated = -&other.basis;
        let stacked = hstack(&[self.basis.view(), negated.view()])?;
        let coefficients = kernel(&stacked, tol)?;
        if coefficients.dim() == 0 {
            return Ok(Subspace::zero(self.ambient_dim()));
        }
        let top = coefficients.basis.slice(s![..self.dim(), ..]);
        image(&self.basis.dot(&top), tol)
    }

    /// True iff `other` $\subseteq$ `self`.
    pub fn contains(&self, other: &Subspace, tol: Tolerance) -> ControlResult<bool> {
        self.check_ambient(other, "containment")?;
        if other.dim() == 0 {
            return Ok(true);
        }
        if self.dim() == 0 {
            return Ok(false);
        }
        let stacked = hstack(&[self.basis.view(), other.basis.view()])?;
        Ok(rank(&stacked, tol)? == self.dim())
    }

    /// Column-space equality, tested by containment both ways.
    pub fn equals(&self, other: &Subspace, tol: Tolerance) -> ControlResult<bool> {
        Ok(self.dim() == other.dim() && self.contains(other, tol)? && other.contains(self, tol)?)
    }
}
