pub mod cli;
pub mod registry;
pub mod state;
pub mod ws;

use axum::routing::get;
use axum::Router;

pub use registry::CallRegistry;
pub use state::GatewayState;

/// Build the axum router: the carrier WS upgrade endpoint plus a bare
/// liveness probe (spec §4.8 names no public HTTP surface beyond the
/// carrier socket, so this is deliberately minimal next to the teacher's
/// many-route `api::router`).
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/carrier/ws", get(ws::carrier_ws))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
