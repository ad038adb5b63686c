//! Feedback laws that plug into the integrators as input functions.

use ndarray::{Array1, Array2, LinalgScalar};

/// Create the static state feedback law $u(t, x) = F x$.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use geometric_control::control_laws::state_feedback;
/// use geometric_control::dynamics::{DisturbedLti, Sine};
/// use geometric_control::integrator::{EulerIntegration, Integrator};
///
/// let control = state_feedback(&array![[-1., -2.]]);
/// assert_eq!(control(0., &array![1., 1.]), array![-3.]);
///
/// let double_integrator = DisturbedLti::new(
///     array![[0., 1.], [0., 0.]],
///     array![[0.], [1.]],
///     array![[0.], [0.]],
///     Sine::default(),
/// );
/// let x1 = EulerIntegration::step(0.0, 1.0, &array![1., 1.], &double_integrator, &control);
/// assert_eq!(x1, array![2., -2.]);
/// ```
pub fn state_feedback<T: LinalgScalar>(feedback: &Array2<T>) -> impl Fn(T, &Array1<T>) -> Array1<T> {
    let feedback_mat = feedback.to_owned();
    move |_t: T, x: &Array1<T>| -> Array1<T> { feedback_mat.dot(x) }
}

/// The open-loop input $u = 0 \in \mathbb{R}^m$.
pub fn zero_input<T: LinalgScalar>(n_input: usize) -> impl Fn(T, &Array1<T>) -> Array1<T> {
    move |_t: T, _x: &Array1<T>| -> Array1<T> { Array1::zeros(n_input) }
}
