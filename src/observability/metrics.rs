use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub scans_total: IntCounterVec,
    pub trip_transitions_total: IntCounterVec,
    pub outbound_calls_total: IntCounterVec,
    pub outbound_call_latency_seconds: HistogramVec,
    pub tracking_requests_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let scans_total = IntCounterVec::new(
            Opts::new("scans_total", "Document scans by outcome"),
            &["outcome"],
        )
        .expect("valid scans_total metric");

        let trip_transitions_total = IntCounterVec::new(
            Opts::new("trip_transitions_total", "Trip lifecycle transitions"),
            &["transition"],
        )
        .expect("valid trip_transitions_total metric");

        let outbound_calls_total = IntCounterVec::new(
            Opts::new("outbound_calls_total", "Outbound collaborator calls by outcome"),
            &["target", "outcome"],
        )
        .expect("valid outbound_calls_total metric");

        let outbound_call_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "outbound_call_latency_seconds",
                "Latency of outbound collaborator calls in seconds",
            ),
            &["target"],
        )
        .expect("valid outbound_call_latency_seconds metric");

        let tracking_requests_total =
            IntCounter::new("tracking_requests_total", "Public tracking lookups")
                .expect("valid tracking_requests_total metric");

        registry
            .register(Box::new(scans_total.clone()))
            .expect("register scans_total");
        registry
            .register(Box::new(trip_transitions_total.clone()))
            .expect("register trip_transitions_total");
        registry
            .register(Box::new(outbound_calls_total.clone()))
            .expect("register outbound_calls_total");
        registry
            .register(Box::new(outbound_call_latency_seconds.clone()))
            .expect("register outbound_call_latency_seconds");
        registry
            .register(Box::new(tracking_requests_total.clone()))
            .expect("register tracking_requests_total");

        Self {
            registry,
            scans_total,
            trip_transitions_total,
            outbound_calls_total,
            outbound_call_latency_seconds,
            tracking_requests_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
