use std::sync::Arc;

use axum::{extract::State, Json};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::RelayConfig;
use crate::relay::{Relay, Status};

pub async fn get_status(State(relay): State<Arc<Relay>>) -> Json<Status> {
    Json(relay.status())
}

pub async fn get_config(State(relay): State<Arc<Relay>>) -> Json<RelayConfig> {
    Json(relay.snapshot())
}

pub async fn get_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
