use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REPORTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "hub_reports_total",
        "Total telemetry reports received"
    ))
    .unwrap();
    pub static ref REPORTS_REJECTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "hub_reports_rejected_total",
        "Total telemetry reports rejected before reaching the snapshot"
    ))
    .unwrap();
    pub static ref EVENTS_APPENDED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "hub_events_appended_total",
        "Total events appended to the history log"
    ))
    .unwrap();
    pub static ref DB_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "hub_db_failures_total",
        "Total database failures surfaced to clients"
    ))
    .unwrap();
    pub static ref REPORT_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "hub_report_latency_seconds",
            "Time taken to apply a report to the device snapshot"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(REPORTS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(REPORTS_REJECTED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(EVENTS_APPENDED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(DB_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(REPORT_LATENCY_SECONDS.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
