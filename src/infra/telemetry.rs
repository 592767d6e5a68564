use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "canopy_route_lookup_memory_hit_total",
            Unit::Count,
            "Route lookups answered from the in-process copy."
        );
        describe_counter!(
            "canopy_route_lookup_storage_hit_total",
            Unit::Count,
            "Route lookups adopted from the storage backend."
        );
        describe_counter!(
            "canopy_route_lookup_rebuild_total",
            Unit::Count,
            "Route lookup rebuilds from the CMS."
        );
        describe_histogram!(
            "canopy_route_lookup_rebuild_ms",
            Unit::Milliseconds,
            "Route lookup rebuild latency in milliseconds."
        );
        describe_counter!(
            "canopy_post_fetch_failed_total",
            Unit::Count,
            "CMS documents skipped because retrieval or mapping failed."
        );
        describe_counter!(
            "canopy_storage_write_failed_total",
            Unit::Count,
            "Route lookup envelopes that could not be persisted."
        );
        describe_counter!(
            "canopy_route_lookup_stale_served_total",
            Unit::Count,
            "Stale route lookups served because a rebuild could not list documents."
        );
    });
}
