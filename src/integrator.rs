//! Fixed-step integrators for the closed-loop simulation.

use std::ops::Mul;

use ndarray::{Array1, Array2, LinalgScalar, ScalarOperand, ShapeBuilder};

use crate::dynamics::Dynamics;

/// Define the interface for integrating dynamics.
pub trait Integrator<T, D, U>
where
    T: LinalgScalar,
    D: Dynamics<T>,
    U: Fn(T, &Array1<T>) -> Array1<T>,
{
    /// Integrate over the dynamics and input for one time step from
    /// `t0` to `tf`, with initial state `x0`.
    ///
    /// The input is a function of time and state, typically a feedback law.
    fn step(t0: T, tf: T, x0: &Array1<T>, dynamics: &D, input: &U) -> Array1<T>;

    /// Simulate the dynamics with the input function over a time
    /// vector, `times`, starting at initial state `x0`.
    ///
    /// Column `i` of the result is the state at `times[i]`; column 0 is `x0`.
    /// The default implementation applies `step` over each adjacent pair of
    /// times.
    fn simulate(times: &[T], x0: &Array1<T>, dynamics: &D, input: &U) -> Array2<T> {
        let mut history = Array2::zeros((x0.len(), times.len()).f());
        if times.is_empty() {
            return history;
        }
        history.column_mut(0).assign(x0);
        let mut x_curr = x0.clone();
        for (i, window) in times.windows(2).enumerate() {
            let x_next = Self::step(window[0], window[1], &x_curr, dynamics, input);
            history.column_mut(i + 1).assign(&x_next);
            x_curr = x_next;
        }
        history
    }
}

/// Explicit Euler integration
///
/// I.e.,
/// $\int_{t_0}^{t_f} \dot{x} = x_0 + (t_f - t_0) f(t_0, x_0, u(t_0, x_0))$
pub struct EulerIntegration;

impl<T, D, U> Integrator<T, D, U> for EulerIntegration
where
    T: LinalgScalar + ScalarOperand,
    D: Dynamics<T>,
    U: Fn(T, &Array1<T>) -> Array1<T>,
{
    fn step(t0: T, tf: T, x0: &Array1<T>, dynamics: &D, input: &U) -> Array1<T> {
        let delta_t = tf - t0;
        let u = input(t0, x0);
        x0 + dynamics.dynamics(t0, x0, &u) * delta_t
    }
}

/// The classic Runge-Kutta Order 4 integrator
///
/// I.e.,
/// $$
///     \int_{t_0}^{t_f} \dot{x} = x_0 + h / 6 (k_1 + 2k_2 + 2k_3 + k4)
/// $$
/// $$
///     k_1 = f(t_0, x_0, u(t_0, x_0))
/// $$
/// $$
///     k_2 = f(t_0 + h/2, x_0 + k_1 h / 2, u(t_0 + h/2, x_0 + k_1 h/2))
/// $$
/// $$
///     k_3 = f(t_0 + h/2, x_0 + k_2 h/2, u(t_0 + h/2, x_0 + k_2 h/2))
/// $$
/// $$
///     k_4 = f(t_0 + h, x_0 + k_3 h, u(t_0 + h, x_0 + k_3 h))
/// $$
/// where $h = t_f - t_0$.
pub struct RK4;

impl<T, D, U> Integrator<T, D, U> for RK4
where
    T: LinalgScalar + ScalarOperand + From<f64>,
    D: Dynamics<T>,
    U: Fn(T, &Array1<T>) -> Array1<T>,
{
    fn step(t0: T, tf: T, x0: &Array1<T>, dynamics: &D, input: &U) -> Array1<T> {
        let delta_t = tf - t0;
        let t_half = delta_t * T::from(0.5);
        let k1 = &dynamics.dynamics(t0, x0, &input(t0, x0));
        let t_mid = t0 + t_half;
        let x_mid_1 = x0 + &k1.mul(t_half);
        let k2 = &dynamics.dynamics(t_mid, &x_mid_1, &input(t_mid, &x_mid_1));
        let x_mid_2 = x0 + &k2.mul(t_half);
        let k3 = &dynamics.dynamics(t_mid, &x_mid_2, &input(t_mid, &x_mid_2));
        let x_end_pre = x0 + &k3.mul(delta_t);
        let k4 = &dynamics.dynamics(tf, &x_end_pre, &input(tf, &x_end_pre));
        x0 + (k1 + k2.mul(T::from(2.0)) + k3.mul(T::from(2.0)) + k4)
            .mul(delta_t.mul(T::from(1. / 6.)))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, s, Array};

    use super::*;
    use crate::dynamics::{DisturbedLti, Sine};

    fn undisturbed(a_mat: Array2<f64>) -> DisturbedLti<Sine> {
        let n = a_mat.nrows();
        DisturbedLti::new(a_mat, Array2::zeros((n, 1)), Array2::zeros((n, 1)), Sine::default())
    }

    fn grid(end: f64, n: usize) -> Vec<f64> {
        Array::linspace(0., end, n).to_vec()
    }

    #[test]
    fn test_rk4_harmonic_oscillator() {
        let lti = undisturbed(array![[0., 1.], [-1., 0.]]);
        let control = |_t, _x: &_| array![0.];
        let x_0 = array![2., 0.];
        let states = RK4::simulate(&grid(1., 100), &x_0, &lti, &control);

        assert_eq!(states.dim(), (2, 100));
        assert_eq!(states.column(0), x_0);
        assert!(states
            .slice(s![.., -1])
            .abs_diff_eq(&array![1.080604611736280, -1.682941969615793], 1e-8));
    }

    #[test]
    fn test_rk4_stable() {
        let lti = undisturbed(array![[-1., 1.], [0., -1.]]);
        let control = |_t, _x: &_| array![0.];
        let states = RK4::simulate(&grid(1., 100), &array![2., 0.], &lti, &control);

        assert!(states.slice(s![.., -1]).abs_diff_eq(&array![0.735758882342885, 0.], 1e-8));
    }

    #[test]
    fn test_rk4_forced_response() {
        // x' = -x + sin(t), x(0) = 0
        let lti = DisturbedLti::new(array![[-1.]], array![[0.]], array![[1.]], Sine::default());
        let control = |_t, _x: &_| array![0.];
        let states = RK4::simulate(&grid(2., 201), &array![0.], &lti, &control);
        let t: f64 = 2.0;
        let exact = 0.5 * (t.sin() - t.cos() + (-t).exp());
        assert!((states[[0, 200]] - exact).abs() < 1e-9);
    }

    #[test]
    fn test_euler_step_and_convergence() {
        let lti = undisturbed(array![[-1.]]);
        let control = |_t, _x: &_| array![0.];
        assert_eq!(
            EulerIntegration::step(0., 0.5, &array![2.], &lti, &control),
            array![1.]
        );

        let error_at = |n: usize| {
            let states = EulerIntegration::simulate(&grid(1., n), &array![1.], &lti, &control);
            (states[[0, n - 1]] - (-1f64).exp()).abs()
        };
        let coarse = error_at(101);
        let fine = error_at(201);
        assert!(fine < coarse);
        assert!((coarse / fine - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_feedback_input() {
        // x' = u with u = -2x
        let lti = DisturbedLti::new(array![[0.]], array![[1.]], array![[0.]], Sine::default());
        let control = |_t, x: &Array1<f64>| x * -2.0;
        let states = RK4::simulate(&grid(1., 1001), &array![1.], &lti, &control);
        assert!((states[[0, 1000]] - (-2f64).exp()).abs() < 1e-10);
    }

    #[test]
    fn test_empty_time_grid() {
        let lti = undisturbed(array![[0.]]);
        let control = |_t, _x: &_| array![0.];
        let states = RK4::simulate(&[], &array![1.], &lti, &control);
        assert_eq!(states.dim(), (1, 0));
    }
}
