//! Closed-loop simulation of a disturbance-decoupled linear system.
//!
//! The decoupling feedback $F$ (or $F = 0$ when the problem is not solvable)
//! closes the loop $\dot{x} = (A + BF)x + E\,d(t)$ from $x(0) = 0$, and the
//! output $y = Cx$ is recorded on a uniform time grid.

use ndarray::{Array, Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::control_laws::{state_feedback, zero_input};
use crate::control_theory::disturbance_decoupling;
use crate::dynamics::{DisturbedLti, Disturbance, Dynamics};
use crate::error::{ControlError, ControlResult};
use crate::integrator::{EulerIntegration, Integrator, RK4};
use crate::subspace::Tolerance;
use crate::system::LinearSystem;

/// Fixed-step integration scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    #[default]
    Rk4,
    Euler,
}

/// Time grid and integration scheme of a simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Final time of the grid.
    pub horizon: f64,
    /// Number of samples, both ends included.
    pub steps: usize,
    pub method: IntegrationMethod,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            horizon: 10.0,
            steps: 1000,
            method: IntegrationMethod::Rk4,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> ControlResult<()> {
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(ControlError::Config(format!(
                "simulation horizon must be positive and finite, got {}",
                self.horizon
            )));
        }
        if self.steps < 2 {
            return Err(ControlError::Config(format!(
                "simulation needs at least 2 steps, got {}",
                self.steps
            )));
        }
        Ok(())
    }

    /// `linspace(0, horizon, steps)`
    pub fn times(&self) -> Vec<f64> {
        Array::linspace(0.0, self.horizon, self.steps).to_vec()
    }
}

/// One point of a trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub state: Array1<f64>,
    pub output: Array1<f64>,
    pub disturbance: f64,
}

/// A simulated closed-loop response. Immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    samples: Vec<Sample>,
    is_ddp_solved: bool,
}

impl Trajectory {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Whether the decoupling feedback was applied.
    pub fn is_ddp_solved(&self) -> bool {
        self.is_ddp_solved
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn outputs(&self) -> Vec<Vec<f64>> {
        self.samples.iter().map(|s| s.output.to_vec()).collect()
    }

    pub fn disturbances(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.disturbance).collect()
    }

    /// $\max_t \|y(t)\|_\infty$
    pub fn peak_output(&self) -> f64 {
        self.samples
            .iter()
            .flat_map(|s| s.output.iter())
            .fold(0.0, |acc: f64, y| acc.max(y.abs()))
    }
}

fn integrate<D, U>(
    method: IntegrationMethod,
    times: &[f64],
    x0: &Array1<f64>,
    dynamics: &D,
    control: &U,
) -> Array2<f64>
where
    D: Dynamics<f64>,
    U: Fn(f64, &Array1<f64>) -> Array1<f64>,
{
    match method {
        IntegrationMethod::Rk4 => RK4::simulate(times, x0, dynamics, control),
        IntegrationMethod::Euler => EulerIntegration::simulate(times, x0, dynamics, control),
    }
}

/// Simulate the response of `system` to `disturbance`, with the
/// decoupling feedback applied whenever the problem is solvable.
///
/// A missing $E$ is treated as an $n \times 1$ zero matrix.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use geometric_control::dynamics::Sine;
/// use geometric_control::simulation::{simulate, SimulationConfig};
/// use geometric_control::subspace::Tolerance;
/// use geometric_control::system::LinearSystem;
///
/// let system = LinearSystem::new(
///     array![[1., 1.], [0., 2.]],
///     array![[1.], [1.]],
///     array![[1., -1.]],
///     Some(array![[1.], [1.]]),
/// )
/// .unwrap();
/// let trajectory = simulate(&system, &SimulationConfig::default(), Sine::default(), Tolerance::default()).unwrap();
/// assert!(trajectory.is_ddp_solved());
/// assert!(trajectory.peak_output() < 1e-6);
/// ```
pub fn simulate<D: Disturbance>(
    system: &LinearSystem,
    config: &SimulationConfig,
    disturbance: D,
    tol: Tolerance,
) -> ControlResult<Trajectory> {
    config.validate()?;
    let system = system.clone().with_default_disturbance();
    let ddp = disturbance_decoupling(&system, tol)?;

    let times = config.times();
    let x0 = Array1::zeros(system.n_state());
    let dynamics = DisturbedLti::from_system(&system, disturbance);
    let history = match (ddp.is_solvable, &ddp.feedback) {
        (true, Some(f_mat)) => {
            integrate(config.method, &times, &x0, &dynamics, &state_feedback(f_mat))
        }
        _ => integrate(config.method, &times, &x0, &dynamics, &zero_input(system.n_input())),
    };

    let samples = times
        .iter()
        .zip(history.columns())
        .map(|(&time, state)| {
            if state.iter().any(|v| !v.is_finite()) {
                return Err(ControlError::Domain(format!(
                    "state is no longer finite at t = {time}"
                )));
            }
            Ok(Sample {
                time,
                output: system.c_mat().dot(&state),
                state: state.to_owned(),
                disturbance: dynamics.disturbance(time),
            })
        })
        .collect::<ControlResult<Vec<_>>>()?;

    let trajectory = Trajectory {
        samples,
        is_ddp_solved: ddp.is_solvable,
    };
    info!(
        steps = config.steps,
        method = ?config.method,
        is_ddp_solved = ddp.is_solvable,
        peak_output = trajectory.peak_output(),
        "simulation finished"
    );
    Ok(trajectory)
}
