//! A library for geometric control of linear and affine nonlinear systems
//!
//! The linear side computes the maximal controlled-invariant subspace $V^*$
//! contained in $\ker C$, decides the disturbance decoupling problem and
//! synthesizes the decoupling feedback, then simulates the closed loop.
//! The nonlinear side computes Lie derivatives and the relative degree of
//! single-output affine systems with a small symbolic expression engine.
//!
//! The `api` module wraps every computation behind serde request and
//! response types. The most commonly used functionality is re-exported to
//! the top level for ease-of-use.
//!
//! ```
//! use ndarray::array;
//! use geometric_control::{disturbance_decoupling, LinearSystem, Tolerance};
//!
//! let system = LinearSystem::new(
//!     array![[1., 1.], [0., 2.]],
//!     array![[1.], [1.]],
//!     array![[1., -1.]],
//!     Some(array![[1.], [1.]]),
//! )
//! .unwrap();
//! let ddp = disturbance_decoupling(&system, Tolerance::default()).unwrap();
//! assert!(ddp.is_solvable);
//! assert_eq!(ddp.v_star.dim(), 1);
//! ```

pub mod api;
pub mod config;
pub mod control_laws;
pub mod control_theory;
pub mod dynamics;
pub mod error;
pub mod integrator;
pub mod nonlinear;
pub mod simulation;
pub mod subspace;
pub mod symbolic;
pub mod system;

pub use api::{Engine, Request, Response};
pub use config::EngineConfig;
pub use control_theory::{disturbance_decoupling, friend_feedback, v_star, DdpResult};
pub use dynamics::{Disturbance, DisturbedLti, Dynamics, Sine};
pub use error::{ControlError, ControlResult};
pub use integrator::{EulerIntegration, Integrator, RK4};
pub use nonlinear::{lie_derivative, relative_degree, AffineSystem, RelativeDegree};
pub use simulation::{simulate, IntegrationMethod, SimulationConfig, Trajectory};
pub use subspace::{Subspace, Tolerance};
pub use system::LinearSystem;
