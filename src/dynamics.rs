//! Continuous-time dynamics driven by a control input and a scalar disturbance.

use ndarray::{Array1, Array2, Axis, LinalgScalar};

use crate::system::LinearSystem;

/// Continuous-time dynamics of the form $\dot{x} = f(t, x, u)$.
/// I.e., fully non-linear and time-varying dynamics.
///
/// Integrators only ever see this trait, so any other plant can be
/// simulated by implementing it.
pub trait Dynamics<T: LinalgScalar> {
    /// Calculate the dynamics, i.e., $\dot{x} = f(t, x, u(t, x))$
    fn dynamics(&self, t: T, x: &Array1<T>, u: &Array1<T>) -> Array1<T>;
    /// Get the dimension of the state $x$.
    fn n_state(&self) -> usize;
    /// Get the dimension of the input $u$.
    fn n_input(&self) -> usize;
}

/// A scalar disturbance signal $d(t)$.
///
/// Any `Fn(f64) -> f64` is a disturbance.
///
/// # Examples
/// ```
/// use geometric_control::dynamics::{Disturbance, Sine};
///
/// let step = |t: f64| if t < 1.0 { 0.0 } else { 1.0 };
/// assert_eq!(step.value(2.0), 1.0);
/// assert_eq!(Sine::default().value(0.0), 0.0);
/// ```
pub trait Disturbance {
    fn value(&self, t: f64) -> f64;
}

impl<F: Fn(f64) -> f64> Disturbance for F {
    fn value(&self, t: f64) -> f64 {
        self(t)
    }
}

/// $d(t) = a \sin(\omega t)$, with unit amplitude and frequency by default.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sine {
    pub amplitude: f64,
    pub frequency: f64,
}

impl Default for Sine {
    fn default() -> Self {
        Sine {
            amplitude: 1.0,
            frequency: 1.0,
        }
    }
}

impl Disturbance for Sine {
    fn value(&self, t: f64) -> f64 {
        self.amplitude * (self.frequency * t).sin()
    }
}

/// Linear, time-invariant dynamics with an additive disturbance, i.e.,
/// $\dot{x} = A x + B u + E \mathbf{1}_q d(t)$.
///
/// Every column of $E$ receives the same scalar signal $d(t)$.
///
/// Example
/// ```
/// use ndarray::array;
/// use geometric_control::dynamics::{DisturbedLti, Dynamics};
///
/// let dynamics = DisturbedLti::new(
///     array![[0., 1.], [0., 0.]],
///     array![[0.], [1.]],
///     array![[1.], [0.]],
///     |_t: f64| 0.5,
/// );
/// assert_eq!(dynamics.dynamics(0., &array![1., 2.], &array![3.]), array![2.5, 3.]);
/// assert_eq!(dynamics.n_input(), 1);
/// assert_eq!(dynamics.n_state(), 2);
/// ```
#[derive(Debug)]
pub struct DisturbedLti<D> {
    a_mat: Array2<f64>,
    b_mat: Array2<f64>,
    disturbance_direction: Array1<f64>,
    disturbance: D,
}

impl<D: Disturbance> DisturbedLti<D> {
    /// Create the dynamics from $A$, $B$ and $E$ matrices of compatible shape.
    pub fn new(a_mat: Array2<f64>, b_mat: Array2<f64>, e_mat: Array2<f64>, disturbance: D) -> Self {
        DisturbedLti {
            a_mat,
            b_mat,
            disturbance_direction: e_mat.sum_axis(Axis(1)),
            disturbance,
        }
    }

    /// Build the dynamics of a validated system. A missing $E$ means no
    /// disturbance enters the state.
    pub fn from_system(system: &LinearSystem, disturbance: D) -> Self {
        let e_mat = system
            .e_mat()
            .cloned()
            .unwrap_or_else(|| Array2::zeros((system.n_state(), 1)));
        Self::new(system.a_mat().clone(), system.b_mat().clone(), e_mat, disturbance)
    }

    /// $d(t)$
    pub fn disturbance(&self, t: f64) -> f64 {
        self.disturbance.value(t)
    }
}

impl<D: Disturbance> Dynamics<f64> for DisturbedLti<D> {
    fn n_input(&self) -> usize {
        self.b_mat.ncols()
    }

    fn n_state(&self) -> usize {
        self.a_mat.ncols()
    }

    fn dynamics(&self, t: f64, x: &Array1<f64>, u: &Array1<f64>) -> Array1<f64> {
        self.a_mat.dot(x) + self.b_mat.dot(u) + &self.disturbance_direction * self.disturbance(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_disturbed_dynamics() {
        let dynamics = DisturbedLti::new(
            array![[0., 1.], [0., 0.]],
            array![[0.], [1.]],
            array![[1., 2.], [0., -1.]],
            Sine::default(),
        );
        let t = std::f64::consts::FRAC_PI_2;
        assert_eq!(dynamics.n_input(), 1);
        assert_eq!(dynamics.n_state(), 2);
        assert_eq!(
            dynamics.dynamics(t, &array![1., 1.], &array![2.]),
            array![4., 1.]
        );
    }

    #[test]
    fn test_from_system_without_disturbance_matrix() {
        let system = LinearSystem::new(
            array![[-1., 0.], [0., -2.]],
            array![[1.], [0.]],
            array![[1., 1.]],
            None,
        )
        .unwrap();
        let dynamics = DisturbedLti::from_system(&system, |_t: f64| 100.0);
        assert_eq!(
            dynamics.dynamics(0., &array![1., 1.], &array![0.]),
            array![-1., -2.]
        );
        assert_eq!(dynamics.disturbance(3.0), 100.0);
    }

    #[test]
    fn test_sine() {
        let d = Sine {
            amplitude: 2.0,
            frequency: 0.5,
        };
        assert!((d.value(std::f64::consts::PI) - 2.0).abs() < 1e-15);
    }
}
