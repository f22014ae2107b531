use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::warn;

use super::{ExternalError, SmsSender, StatusSync};
use crate::models::document::DocStatus;
use crate::observability::metrics::Metrics;

/// Runs an outbound call under `limit`, recording latency and outcome.
pub async fn observed<T, F>(
    metrics: &Metrics,
    target: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, ExternalError>
where
    F: Future<Output = Result<T, ExternalError>>,
{
    let started = Instant::now();
    let result = match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ExternalError::Timeout {
            target,
            secs: limit.as_secs(),
        }),
    };

    metrics
        .outbound_call_latency_seconds
        .with_label_values(&[target])
        .observe(started.elapsed().as_secs_f64());
    let outcome = match &result {
        Ok(_) => "success",
        Err(ExternalError::Timeout { .. }) => "timeout",
        Err(_) => "error",
    };
    metrics
        .outbound_calls_total
        .with_label_values(&[target, outcome])
        .inc();

    result
}

/// Detached, bounded outbound notifications. Failures are logged and never
/// reach the caller.
#[derive(Clone)]
pub struct Notifier {
    status_sync: Arc<dyn StatusSync>,
    sms: Arc<dyn SmsSender>,
    metrics: Metrics,
    timeout: Duration,
}

impl Notifier {
    pub fn new(
        status_sync: Arc<dyn StatusSync>,
        sms: Arc<dyn SmsSender>,
        metrics: Metrics,
        timeout: Duration,
    ) -> Self {
        Self {
            status_sync,
            sms,
            metrics,
            timeout,
        }
    }

    pub fn status_changed(
        &self,
        doc_id: String,
        status: DocStatus,
        user_id: String,
    ) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let call = this.status_sync.notify(&doc_id, status, &user_id);
            if let Err(err) = observed(&this.metrics, "erp_status", this.timeout, call).await {
                warn!(doc_id = %doc_id, %status, error = %err, "status sync failed");
            }
        })
    }

    pub fn tracking_sms(&self, phone: String, doc_id: String, token: String) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let call = this.sms.send_tracking_link(&phone, &doc_id, &token);
            if let Err(err) = observed(&this.metrics, "sms", this.timeout, call).await {
                warn!(doc_id = %doc_id, error = %err, "tracking sms failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Hanging;

    #[async_trait]
    impl StatusSync for Hanging {
        async fn notify(&self, _: &str, _: DocStatus, _: &str) -> Result<(), ExternalError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_call_is_cut_off_and_counted() {
        let metrics = Metrics::new();
        let result = observed(
            &metrics,
            "erp_status",
            Duration::from_millis(20),
            Hanging.notify("D1", DocStatus::Delivered, "U1"),
        )
        .await;

        assert!(matches!(result, Err(ExternalError::Timeout { .. })));
        let timeouts = metrics
            .outbound_calls_total
            .with_label_values(&["erp_status", "timeout"])
            .get();
        assert_eq!(timeouts, 1);
    }
}
