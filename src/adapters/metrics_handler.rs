use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

pub struct MetricsCollector {
    registry: Registry,

    // Chat metrics
    pub chat_requests: CounterVec,
    pub requests_in_flight: Gauge,

    // Streaming metrics
    pub stream_fragments: Counter,

    // Provider metrics
    pub llm_duration: HistogramVec,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let chat_requests = CounterVec::new(
            Opts::new("agents_chat_requests_total", "Total number of chat requests"),
            &["mode", "outcome"],
        )?;
        registry.register(Box::new(chat_requests.clone()))?;

        let requests_in_flight = Gauge::new(
            "agents_requests_in_flight",
            "Number of chat requests currently being processed",
        )?;
        registry.register(Box::new(requests_in_flight.clone()))?;

        let stream_fragments = Counter::new(
            "agents_stream_fragments_total",
            "Total answer fragments streamed to callers",
        )?;
        registry.register(Box::new(stream_fragments.clone()))?;

        let llm_duration = HistogramVec::new(
            HistogramOpts::new(
                "agents_llm_duration_seconds",
                "Time from request to final answer fragment",
            ),
            &["mode"],
        )?;
        registry.register(Box::new(llm_duration.clone()))?;

        Ok(Self {
            registry,
            chat_requests,
            requests_in_flight,
            stream_fragments,
            llm_duration,
        })
    }

    /// Count a finished request; `outcome` is `"ok"` or an error kind
    pub fn record_request(&self, mode: &str, outcome: &str) {
        self.chat_requests.with_label_values(&[mode, outcome]).inc();
    }

    /// Track one in-flight request until the guard is dropped
    pub fn in_flight(self: &Arc<Self>) -> InFlightGuard {
        self.requests_in_flight.inc();
        InFlightGuard {
            collector: Arc::clone(self),
        }
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Decrements the in-flight gauge on drop, so an abandoned stream still
/// releases its slot
pub struct InFlightGuard {
    collector: Arc<MetricsCollector>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.collector.requests_in_flight.dec();
    }
}

pub struct MetricsHandler {
    collector: Arc<MetricsCollector>,
}

impl MetricsHandler {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub async fn metrics(&self) -> String {
        self.collector.encode().unwrap_or_else(|e| {
            tracing::error!("Failed to encode metrics: {}", e);
            String::from("# Error encoding metrics\n")
        })
    }
}
