use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::error::{FeedbackError, FeedbackResult, StoreError};

static RECORDER: OnceCell<PrometheusHandle> = OnceCell::new();

pub const MUTATIONS_TOTAL: &str = "feedback_mutations_total";
pub const STORE_ERRORS_TOTAL: &str = "feedback_store_errors_total";

#[derive(Clone)]
pub struct MetricsService {
    handle: PrometheusHandle,
}

impl MetricsService {
    /// Installs the global Prometheus recorder on first call and hands out
    /// the shared handle afterwards.
    pub fn initialize() -> FeedbackResult<Self> {
        let handle = RECORDER.get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|err| FeedbackError::Internal(err.to_string()))?;
            info!("installed Prometheus recorder");
            Ok::<_, FeedbackError>(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}

pub fn record_mutation(op: &'static str) {
    metrics::counter!(MUTATIONS_TOTAL, 1, "op" => op);
}

pub fn record_store_error(err: &StoreError) {
    metrics::counter!(STORE_ERRORS_TOTAL, 1, "kind" => err.kind());
}
