use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use metrics::{Unit, counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const LIVE_AGENTS_METRIC: &str = "fleet_live_agents";
pub const TICKS_METRIC: &str = "fleet_ticks_total";
pub const TICK_FAILURES_METRIC: &str = "fleet_tick_failures_total";
pub const TICKS_SKIPPED_BUSY_METRIC: &str = "fleet_ticks_skipped_busy_total";
pub const ATTESTATION_REJECTIONS_METRIC: &str = "fleet_attestation_rejections_total";

const DEFAULT_METRICS_PORT: u16 = 9464;

#[derive(Debug, Clone, Copy)]
pub struct MetricsRuntime {
    pub listen_addr: SocketAddr,
}

impl MetricsRuntime {
    pub fn default_listen_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_METRICS_PORT)
    }
}

pub fn start_prometheus_exporter(listen_addr: SocketAddr) -> Result<MetricsRuntime, BuildError> {
    describe_gauge!(
        LIVE_AGENTS_METRIC,
        Unit::Count,
        "Agents currently registered with a live tick loop."
    );
    describe_counter!(
        TICKS_METRIC,
        Unit::Count,
        "Completed ticks, labelled by the branch taken."
    );
    describe_counter!(
        TICK_FAILURES_METRIC,
        Unit::Count,
        "Ticks that ended in a caught error or panic."
    );
    describe_counter!(
        TICKS_SKIPPED_BUSY_METRIC,
        Unit::Count,
        "Ticks not started because the previous tick was still running."
    );
    describe_counter!(
        ATTESTATION_REJECTIONS_METRIC,
        Unit::Count,
        "Publishes suppressed because the attestation quote failed verification."
    );

    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()?;

    Ok(MetricsRuntime { listen_addr })
}

pub fn record_live_agents(count: usize) {
    gauge!(LIVE_AGENTS_METRIC).set(count as f64);
}

pub fn record_tick(branch: &'static str) {
    counter!(TICKS_METRIC, "branch" => branch).increment(1);
}

pub fn record_tick_failure() {
    counter!(TICK_FAILURES_METRIC).increment(1);
}

pub fn record_tick_skipped_busy() {
    counter!(TICKS_SKIPPED_BUSY_METRIC).increment(1);
}

pub fn record_attestation_rejection() {
    counter!(ATTESTATION_REJECTIONS_METRIC).increment(1);
}
