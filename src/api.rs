//! The request/response boundary.
//!
//! Requests and responses are plain serde types whose field names follow the
//! JSON wire format (`A`, `V_star`, `Lg_Lf_h`, ...). An [`Engine`] validates
//! a request, runs the matching computation and turns every failure into an
//! [`ErrorPayload`]. Engines hold only their configuration, so one engine can
//! serve requests from many threads at once.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::control_theory::{disturbance_decoupling, v_star};
use crate::dynamics::Sine;
use crate::error::{ControlError, ControlResult};
use crate::nonlinear::{relative_degree, AffineSystem};
use crate::simulation;
use crate::system::{matrix_to_rows, LinearSystem};

/// Message reported by the health check.
pub const HEALTH_MESSAGE: &str = "Isidori Engine Running";

/// A linear system in nested-row form. `E` is optional on the wire and only
/// required by the decoupling check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearSystemRequest {
    #[serde(rename = "A")]
    pub a: Vec<Vec<f64>>,
    #[serde(rename = "B")]
    pub b: Vec<Vec<f64>>,
    #[serde(rename = "C")]
    pub c: Vec<Vec<f64>>,
    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    pub e: Option<Vec<Vec<f64>>>,
}

impl LinearSystemRequest {
    fn to_system(&self) -> ControlResult<LinearSystem> {
        LinearSystem::from_rows(&self.a, &self.b, &self.c, self.e.as_deref())
    }
}

/// An affine nonlinear system given as expression strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NonlinearSystemRequest {
    pub f: Vec<String>,
    pub g: Vec<String>,
    pub h: String,
    pub vars: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VStarResponse {
    /// Orthonormal basis of $V^*$, one row per state.
    #[serde(rename = "V_star")]
    pub v_star: Vec<Vec<f64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DdpResponse {
    pub is_solvable: bool,
    #[serde(rename = "V_star")]
    pub v_star: Vec<Vec<f64>>,
    #[serde(rename = "F", default, skip_serializing_if = "Option::is_none")]
    pub f: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ErrorPayload>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeDegreeResponse {
    pub relative_degree: Option<usize>,
    #[serde(rename = "Lg_Lf_h")]
    pub lg_lf_h: Option<String>,
    #[serde(rename = "Lie_derivatives")]
    pub lie_derivatives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulateResponse {
    pub time: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    pub d: Vec<f64>,
    pub is_ddp_solved: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// A failure as seen by a client: a machine-readable kind plus a
/// human-readable detail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub detail: String,
}

impl From<&ControlError> for ErrorPayload {
    fn from(e: &ControlError) -> Self {
        ErrorPayload {
            kind: e.kind().to_string(),
            detail: e.to_string(),
        }
    }
}

impl From<ControlError> for ErrorPayload {
    fn from(e: ControlError) -> Self {
        ErrorPayload::from(&e)
    }
}

/// A request tagged by its `"op"` field.
///
/// ```
/// use geometric_control::api::Request;
///
/// let request: Request = serde_json::from_str(r#"{"op": "health"}"#).unwrap();
/// assert_eq!(request, Request::Health);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    Vstar(LinearSystemRequest),
    Ddp(LinearSystemRequest),
    Reldeg(NonlinearSystemRequest),
    Simulate(LinearSystemRequest),
    Health,
}

/// The response to a [`Request`]; serialized without a tag.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    VStar(VStarResponse),
    Ddp(DdpResponse),
    RelativeDegree(RelativeDegreeResponse),
    Simulate(SimulateResponse),
    Health(HealthResponse),
    Error { error: ErrorPayload },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Serves requests with a fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine after validating its configuration.
    pub fn new(config: EngineConfig) -> ControlResult<Self> {
        config.validate()?;
        Ok(Engine { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Basis of the maximal controlled-invariant subspace in $\ker C$.
    pub fn compute_v_star(&self, request: &LinearSystemRequest) -> Result<VStarResponse, ErrorPayload> {
        let system = request.to_system()?;
        let v = v_star(&system, self.config.tolerance)?;
        Ok(VStarResponse {
            v_star: matrix_to_rows(v.basis()),
        })
    }

    /// Solvability of disturbance decoupling and, when solvable, the feedback.
    pub fn check_ddp(&self, request: &LinearSystemRequest) -> Result<DdpResponse, ErrorPayload> {
        let system = request.to_system()?;
        let ddp = disturbance_decoupling(&system, self.config.tolerance)?;
        Ok(DdpResponse {
            is_solvable: ddp.is_solvable,
            v_star: matrix_to_rows(ddp.v_star.basis()),
            f: ddp.feedback.as_ref().map(matrix_to_rows),
            diagnostics: ddp.diagnostics.iter().map(ErrorPayload::from).collect(),
        })
    }

    pub fn compute_relative_degree(
        &self,
        request: &NonlinearSystemRequest,
    ) -> Result<RelativeDegreeResponse, ErrorPayload> {
        let system = AffineSystem::parse(&request.f, &request.g, &request.h, &request.vars)?;
        let result = relative_degree(&system, self.config.zero_test_samples);
        Ok(RelativeDegreeResponse {
            relative_degree: result.relative_degree,
            lg_lf_h: result.decoupling.map(|e| e.to_string()),
            lie_derivatives: result.lie_derivatives.iter().map(|e| e.to_string()).collect(),
            message: result.message,
        })
    }

    /// Closed-loop response to $d(t) = \sin t$ from the zero state.
    pub fn simulate(&self, request: &LinearSystemRequest) -> Result<SimulateResponse, ErrorPayload> {
        let system = request.to_system()?;
        let trajectory = simulation::simulate(
            &system,
            &self.config.simulation,
            Sine::default(),
            self.config.tolerance,
        )?;
        Ok(SimulateResponse {
            time: trajectory.times(),
            y: trajectory.outputs(),
            d: trajectory.disturbances(),
            is_ddp_solved: trajectory.is_ddp_solved(),
        })
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            message: HEALTH_MESSAGE.to_string(),
        }
    }

    /// Dispatch a request to the matching operation.
    pub fn handle(&self, request: &Request) -> Response {
        debug!(?request, "handling request");
        let response = match request {
            Request::Vstar(r) => self.compute_v_star(r).map(Response::VStar),
            Request::Ddp(r) => self.check_ddp(r).map(Response::Ddp),
            Request::Reldeg(r) => self.compute_relative_degree(r).map(Response::RelativeDegree),
            Request::Simulate(r) => self.simulate(r).map(Response::Simulate),
            Request::Health => Ok(Response::Health(self.health())),
        };
        response.unwrap_or_else(|error| {
            warn!(kind = %error.kind, detail = %error.detail, "request failed");
            Response::Error { error }
        })
    }

    /// Parse a JSON request, handle it and serialize the response.
    pub fn handle_json(&self, json: &str) -> Response {
        match serde_json::from_str::<Request>(json) {
            Ok(request) => self.handle(&request),
            Err(e) => Response::Error {
                error: ControlError::InvalidInput(format!("malformed request: {e}")).into(),
            },
        }
    }
}
