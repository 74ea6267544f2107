use prometheus::{opts, Counter, CounterVec, Encoder, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    stats_requests_total: Counter,
    stats_failures_total: Counter,
    chat_messages_total: Counter,
    collect_errors_total: CounterVec,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let stats_requests_total = Counter::with_opts(opts!(
            "sysbotd_stats_requests_total",
            "Number of /stats requests served"
        ))?;
        let stats_failures_total = Counter::with_opts(opts!(
            "sysbotd_stats_failures_total",
            "Number of /stats requests that failed entirely"
        ))?;
        let chat_messages_total = Counter::with_opts(opts!(
            "sysbotd_chat_messages_total",
            "Number of chat messages handled"
        ))?;
        let collect_errors_total = CounterVec::new(
            opts!(
                "sysbotd_collect_errors_total",
                "Number of telemetry collection errors by category"
            ),
            &["category"],
        )?;

        registry.register(Box::new(stats_requests_total.clone()))?;
        registry.register(Box::new(stats_failures_total.clone()))?;
        registry.register(Box::new(chat_messages_total.clone()))?;
        registry.register(Box::new(collect_errors_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            stats_requests_total,
            stats_failures_total,
            chat_messages_total,
            collect_errors_total,
        }))
    }

    pub fn inc_stats_request(&self) {
        self.stats_requests_total.inc();
    }

    pub fn inc_stats_failure(&self) {
        self.stats_failures_total.inc();
    }

    pub fn inc_chat_message(&self) {
        self.chat_messages_total.inc();
    }

    pub fn inc_collect_error(&self, category: &str) {
        self.collect_errors_total
            .with_label_values(&[category])
            .inc();
    }

    pub fn encode_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = Metrics::new().expect("metrics init");
        metrics.inc_stats_request();
        metrics.inc_chat_message();
        metrics.inc_collect_error("gpu");

        let text = metrics.encode_metrics().expect("encoding");
        assert!(text.contains("sysbotd_stats_requests_total 1"));
        assert!(text.contains("sysbotd_chat_messages_total 1"));
        assert!(text.contains("category=\"gpu\""));
    }
}
