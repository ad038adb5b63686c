//! This module contains the geometric control computations: the maximal
//! controlled-invariant subspace and the disturbance decoupling problem.

use ndarray::{s, Array2};
use tracing::{debug, info, warn};

use crate::error::{ControlError, ControlResult};
use crate::subspace::{self, hstack, kernel, preimage, pseudo_inverse, Subspace, Tolerance};
use crate::system::LinearSystem;

/// The sequence $V_0 \supseteq V_1 \supseteq \dots$ of the $V^*$ fixed-point
/// iteration, ending at the fixed point.
///
/// $V_0 = \ker C$ and $V_{i+1} = \ker C \cap A^{-1}(V_i + \operatorname{Im} B)$.
/// The dimensions are non-increasing, so the sequence stabilizes after at
/// most $n$ steps.
pub fn v_star_iterates(system: &LinearSystem, tol: Tolerance) -> ControlResult<Vec<Subspace>> {
    let n = system.n_state();
    let ker_c = kernel(system.c_mat(), tol)?;
    let im_b = subspace::image(system.b_mat(), tol)?;

    let mut iterates = vec![ker_c.clone()];
    for i in 0..=n {
        let current = &iterates[iterates.len() - 1];
        let reachable = current.sum(&im_b, tol)?;
        let next = ker_c.intersect(&preimage(system.a_mat(), &reachable, tol)?, tol)?;
        debug!(iteration = i, dim = next.dim(), "V* iteration");
        if next.equals(current, tol)? {
            return Ok(iterates);
        }
        iterates.push(next);
    }
    warn!(n, "V* iteration did not settle within n steps, returning the last iterate");
    Ok(iterates)
}

/// Compute $V^*$, the maximal $(A, B)$-controlled-invariant subspace
/// contained in $\ker C$.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use geometric_control::control_theory::v_star;
/// use geometric_control::system::LinearSystem;
///
/// // Double integrator measured at the position: V* is trivial.
/// let system = LinearSystem::new(
///     array![[0., 1.], [0., 0.]],
///     array![[0.], [1.]],
///     array![[1., 0.]],
///     None,
/// )
/// .unwrap();
/// assert_eq!(v_star(&system, Default::default()).unwrap().dim(), 0);
/// ```
pub fn v_star(system: &LinearSystem, tol: Tolerance) -> ControlResult<Subspace> {
    let iterates = v_star_iterates(system, tol)?;
    let fixed_point = iterates
        .into_iter()
        .last()
        .unwrap_or_else(|| Subspace::zero(system.n_state()));
    info!(
        n = system.n_state(),
        dim = fixed_point.dim(),
        "computed V*"
    );
    Ok(fixed_point)
}

/// A friend feedback together with any numerical trouble met while
/// synthesizing it.
#[derive(Clone, Debug)]
pub struct FriendFeedback {
    /// The $m \times n$ feedback matrix $F$.
    pub matrix: Array2<f64>,
    /// Best-effort warnings; always [`ControlError::NumericalInstability`].
    pub diagnostics: Vec<ControlError>,
}

/// Determine a friend feedback $F$ with $(A + BF)V^* \subseteq V^*$.
///
/// For every basis column $v_j$ of $V^*$ the system
/// $\begin{bmatrix}V^* & B\end{bmatrix}\begin{bmatrix}x_j \\\\ y_j\end{bmatrix} = Av_j$
/// is solved in the least-squares sense, and $u_j = -y_j$ gives
/// $Av_j + Bu_j = V^* x_j \in V^*$. Then $F = U (V^*)^+$, which is zero on
/// the orthogonal complement of $V^*$.
pub fn friend_feedback(
    a_mat: &Array2<f64>,
    b_mat: &Array2<f64>,
    v_star: &Subspace,
    tol: Tolerance,
) -> ControlResult<FriendFeedback> {
    let n = a_mat.nrows();
    let m = b_mat.ncols();
    let k = v_star.dim();
    if k == 0 {
        return Ok(FriendFeedback {
            matrix: Array2::zeros((m, n)),
            diagnostics: Vec::new(),
        });
    }
    let basis = v_star.basis();
    let stacked = hstack(&[basis.view(), b_mat.view()])?;
    let targets = a_mat.dot(basis);
    let pinv = pseudo_inverse(&stacked, tol)?;
    let solution = pinv.matrix.dot(&targets);

    let mut diagnostics = Vec::new();
    if pinv.condition > tol.max_condition {
        diagnostics.push(ControlError::NumericalInstability(format!(
            "[V* | B] is ill-conditioned (condition number {:.3e})",
            pinv.condition
        )));
    }
    let residual = stacked.dot(&solution) - &targets;
    let scale = targets.iter().map(|v| v * v).sum::<f64>().sqrt();
    for (j, column) in residual.columns().into_iter().enumerate() {
        let norm = column.dot(&column).sqrt();
        if norm > tol.threshold(scale) {
            diagnostics.push(ControlError::NumericalInstability(format!(
                "A v_{j} is not reached from V* + Im B (residual {norm:.3e})"
            )));
        }
    }
    for diagnostic in &diagnostics {
        warn!(%diagnostic, "friend feedback is best-effort");
    }

    let inputs = -&solution.slice(s![k.., ..]);
    // The basis is orthonormal, so its transpose is its pseudo-inverse.
    let matrix = inputs.dot(&basis.t());
    Ok(FriendFeedback {
        matrix,
        diagnostics,
    })
}

/// Outcome of the disturbance decoupling problem.
#[derive(Clone, Debug)]
pub struct DdpResult {
    pub is_solvable: bool,
    pub v_star: Subspace,
    /// Present only when the problem is solvable.
    pub feedback: Option<Array2<f64>>,
    pub diagnostics: Vec<ControlError>,
}

/// Decide whether the disturbance $E d$ can be decoupled from $y = Cx$ and,
/// if so, synthesize the decoupling feedback.
///
/// The problem is solvable iff $\operatorname{Im} E \subseteq V^*$.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use geometric_control::control_theory::disturbance_decoupling;
/// use geometric_control::system::LinearSystem;
///
/// let system = LinearSystem::new(
///     array![[0., 1.], [2., 0.]],
///     array![[0.], [1.]],
///     array![[1., -1.]],
///     Some(array![[1.], [1.]]),
/// )
/// .unwrap();
/// let ddp = disturbance_decoupling(&system, Default::default()).unwrap();
/// assert!(ddp.is_solvable);
/// assert_eq!(ddp.feedback.unwrap().dim(), (1, 2));
/// ```
pub fn disturbance_decoupling(system: &LinearSystem, tol: Tolerance) -> ControlResult<DdpResult> {
    let e_mat = system.require_e()?;
    let v_star = v_star(system, tol)?;
    let im_e = subspace::image(e_mat, tol)?;
    let is_solvable = v_star.contains(&im_e, tol)?;
    info!(is_solvable, dim_im_e = im_e.dim(), "checked disturbance decoupling");

    if !is_solvable {
        return Ok(DdpResult {
            is_solvable,
            v_star,
            feedback: None,
            diagnostics: Vec::new(),
        });
    }
    let friend = friend_feedback(system.a_mat(), system.b_mat(), &v_star, tol)?;
    Ok(DdpResult {
        is_solvable,
        v_star,
        feedback: Some(friend.matrix),
        diagnostics: friend.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn tol() -> Tolerance {
        Tolerance::default()
    }

    fn textbook(e_mat: Array2<f64>) -> LinearSystem {
        LinearSystem::new(
            array![[0., 1.], [2., 0.]],
            array![[0.], [1.]],
            array![[1., -1.]],
            Some(e_mat),
        )
        .unwrap()
    }

    fn assert_invariant(a_cl: &Array2<f64>, v: &Subspace) {
        let mapped = Subspace::span(&a_cl.dot(v.basis()), tol()).unwrap();
        assert!(v.contains(&mapped, tol()).unwrap());
    }

    #[test]
    fn test_v_star_unobserved_state_is_everything() {
        let system = LinearSystem::new(
            Array2::eye(2),
            Array2::zeros((2, 1)),
            Array2::zeros((1, 2)),
            None,
        )
        .unwrap();
        assert_eq!(v_star(&system, tol()).unwrap().dim(), 2);
    }

    #[test]
    fn test_v_star_integrator_chain_is_trivial() {
        let system = LinearSystem::new(
            array![[0., 1.], [0., 0.]],
            array![[0.], [1.]],
            array![[1., 0.]],
            None,
        )
        .unwrap();
        assert_eq!(v_star(&system, tol()).unwrap().dim(), 0);
    }

    #[test]
    fn test_v_star_ignores_output_scale() {
        let v_star_for = |c_mat: Array2<f64>| {
            let system =
                LinearSystem::new(array![[0., 1.], [0., 0.]], array![[0.], [1.]], c_mat, None)
                    .unwrap();
            v_star(&system, tol()).unwrap()
        };
        let unit = v_star_for(array![[1., 0.]]);
        let small = v_star_for(array![[1e-10, 0.]]);
        assert_eq!(small.dim(), 0);
        assert!(small.equals(&unit, tol()).unwrap());
    }

    #[test]
    fn test_v_star_textbook() {
        let system = textbook(array![[1.], [1.]]);
        let v = v_star(&system, tol()).unwrap();
        let expected = Subspace::span(&array![[1.], [1.]], tol()).unwrap();
        assert!(v.equals(&expected, tol()).unwrap());
    }

    #[test]
    fn test_v_star_iterates_shrink() {
        // Chain of three integrators, output at the middle state.
        let system = LinearSystem::new(
            array![[0., 1., 0.], [0., 0., 1.], [0., 0., 0.]],
            array![[0.], [0.], [1.]],
            array![[0., 1., 0.]],
            None,
        )
        .unwrap();
        let iterates = v_star_iterates(&system, tol()).unwrap();
        assert!(iterates.len() <= system.n_state() + 1);
        for pair in iterates.windows(2) {
            assert!(pair[1].dim() <= pair[0].dim());
            assert!(pair[0].contains(&pair[1], tol()).unwrap());
        }
        let v = iterates.last().unwrap();
        let e1 = Subspace::span(&array![[1.], [0.], [0.]], tol()).unwrap();
        assert!(v.equals(&e1, tol()).unwrap());
    }

    #[test]
    fn test_v_star_is_controlled_invariant() {
        let system = LinearSystem::new(
            array![[1., 2., 0., 1.], [0., -1., 1., 0.], [3., 0., 0., 2.], [1., 1., 1., 1.]],
            array![[0., 1.], [1., 0.], [0., 0.], [0., 1.]],
            array![[1., 0., 1., 0.]],
            None,
        )
        .unwrap();
        let v = v_star(&system, tol()).unwrap();
        let im_b = subspace::image(system.b_mat(), tol()).unwrap();
        let target = v.sum(&im_b, tol()).unwrap();
        let mapped = Subspace::span(&system.a_mat().dot(v.basis()), tol()).unwrap();
        assert!(target.contains(&mapped, tol()).unwrap());
        let ker_c = kernel(system.c_mat(), tol()).unwrap();
        assert!(ker_c.contains(&v, tol()).unwrap());
    }

    #[test]
    fn test_ddp_solvable() {
        let system = textbook(array![[1.], [1.]]);
        let ddp = disturbance_decoupling(&system, tol()).unwrap();
        assert!(ddp.is_solvable);
        assert!(ddp.diagnostics.is_empty());
        let f_mat = ddp.feedback.unwrap();
        let a_cl = system.a_mat() + &system.b_mat().dot(&f_mat);
        assert_invariant(&a_cl, &ddp.v_star);
        // F vanishes on the orthogonal complement of V* = span{(1, 1)}.
        assert!(f_mat.dot(&array![1., -1.]).iter().all(|v| v.abs() < 1e-10));
        assert!(f_mat.abs_diff_eq(&array![[-0.5, -0.5]], 1e-10));
    }

    #[test]
    fn test_ddp_unsolvable() {
        let system = textbook(array![[1.], [0.]]);
        let ddp = disturbance_decoupling(&system, tol()).unwrap();
        assert!(!ddp.is_solvable);
        assert!(ddp.feedback.is_none());
        assert_eq!(ddp.v_star.dim(), 1);
    }

    #[test]
    fn test_ddp_zero_disturbance_is_solvable() {
        let system = textbook(array![[0.], [0.]]);
        assert!(disturbance_decoupling(&system, tol()).unwrap().is_solvable);
    }

    #[test]
    fn test_ddp_requires_e() {
        let system = LinearSystem::new(
            array![[0., 1.], [2., 0.]],
            array![[0.], [1.]],
            array![[1., -1.]],
            None,
        )
        .unwrap();
        let err = disturbance_decoupling(&system, tol()).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[test]
    fn test_friend_feedback_multi_input() {
        let system = LinearSystem::new(
            array![[0., 1., 0.], [0., 0., 1.], [1., 2., 3.]],
            array![[0., 0.], [1., 0.], [0., 1.]],
            array![[1., 0., 0.]],
            Some(array![[0.], [0.], [1.]]),
        )
        .unwrap();
        let ddp = disturbance_decoupling(&system, tol()).unwrap();
        assert!(ddp.is_solvable);
        let f_mat = ddp.feedback.unwrap();
        assert_eq!(f_mat.dim(), (2, 3));
        let a_cl = system.a_mat() + &system.b_mat().dot(&f_mat);
        assert_invariant(&a_cl, &ddp.v_star);
    }

    #[test]
    fn test_friend_feedback_on_trivial_subspace() {
        let friend = friend_feedback(
            &array![[0., 1.], [0., 0.]],
            &array![[0.], [1.]],
            &Subspace::zero(2),
            tol(),
        )
        .unwrap();
        assert_eq!(friend.matrix, Array2::<f64>::zeros((1, 2)));
    }
}
