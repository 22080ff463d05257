//! Metrics collection and exposition.
//!
//! # Metrics
//! - `panel_config_reloads_total` (counter): reloads by `result` (ok, error)
//! - `panel_config_version` (gauge): current config cache version
//! - `panel_session_rejections_total` (counter): rejected requests by `reason`
//! - `panel_logins_total` (counter): login attempts by `result`
//! - `panel_entrance_events_total` (counter): gate outcomes by `outcome`
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::cache::ConfigVersion;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_config_reload(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!("panel_config_reloads_total", "result" => result).increment(1);
}

pub fn record_config_version(version: ConfigVersion) {
    gauge!("panel_config_version").set(version.as_u64() as f64);
}

pub fn record_session_rejection(reason: &'static str) {
    counter!("panel_session_rejections_total", "reason" => reason).increment(1);
}

pub fn record_login(ok: bool) {
    let result = if ok { "ok" } else { "rejected" };
    counter!("panel_logins_total", "result" => result).increment(1);
}

pub fn record_entrance_event(outcome: &'static str) {
    counter!("panel_entrance_events_total", "outcome" => outcome).increment(1);
}
