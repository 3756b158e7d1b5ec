//! API handlers
//!
//! Each handler returns an [`Envelope`] on success or an [`ApiError`] whose
//! code decides the HTTP status.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use super::envelope::{ApiError, Envelope};
use crate::analysis::{AnalysisSettings, PowerQualityAnalyzer, SystemParameters};
use crate::limits::ResolvedLimits;
use crate::types::{AnalysisReport, InputTables};

// ============================================================================
// State
// ============================================================================

/// Shared state handed to every handler.
///
/// Read-only: each analysis is an independent, stateless run.
#[derive(Clone)]
pub struct ApiState {
    /// Engine tuning applied to every request
    pub settings: AnalysisSettings,
    /// Process start, for uptime reporting
    pub started: Instant,
}

impl ApiState {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            settings,
            started: Instant::now(),
        }
    }
}

// ============================================================================
// Request / response types
// ============================================================================

/// Body of `POST /api/v1/analyze`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzeRequest {
    pub nominal_voltage: f64,
    pub isc: f64,
    pub il: f64,
    /// Worksheets keyed by name: "Trend", "Vh Harmonic %", "Ah Harmonic %"
    pub tables: InputTables,
}

impl AnalyzeRequest {
    pub fn parameters(&self) -> SystemParameters {
        SystemParameters {
            nominal_voltage: self.nominal_voltage,
            isc: self.isc,
            il: self.il,
        }
    }
}

/// Payload of `GET /api/v1/health`
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub sustained_window_minutes: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/health
pub async fn health(State(state): State<ApiState>) -> Envelope<HealthStatus> {
    Envelope::new(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        sustained_window_minutes: state.settings.window_minutes,
    })
}

/// GET /api/v1/limits?nominal_voltage=..&isc=..&il=..
///
/// Limit rows the analyzer would apply for the given system parameters.
pub async fn limits(
    params: Result<Query<SystemParameters>, QueryRejection>,
) -> Result<Envelope<ResolvedLimits>, ApiError> {
    let Query(params) = params?;
    Ok(Envelope::new(ResolvedLimits::resolve(
        params.nominal_voltage,
        params.isc,
        params.il,
    )))
}

/// POST /api/v1/analyze
///
/// Runs the engine on a blocking worker so a long analysis does not stall
/// other requests.
pub async fn analyze(
    State(state): State<ApiState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Envelope<AnalysisReport>, ApiError> {
    let Json(request) = payload?;

    let params = request.parameters();
    info!(
        nominal_voltage = params.nominal_voltage,
        isc = params.isc,
        il = params.il,
        "Analysis requested"
    );

    let started = Instant::now();
    let analyzer = PowerQualityAnalyzer::new(state.settings);
    let report = tokio::task::spawn_blocking(move || analyzer.analyze(&request.tables, &params))
        .await
        .map_err(|join_error| ApiError::internal(&join_error))??;

    Ok(Envelope::timed(report, started))
}
