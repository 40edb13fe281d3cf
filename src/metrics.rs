use std::sync::OnceLock;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::realtime::Table;
use crate::relay::{RelayError, TriggerDomain};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Safe to call more than once (tests build one app per case); later calls
/// return the first handle.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let handle = match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => handle,
                Err(e) => {
                    // Another recorder owns the process; keep a detached one
                    // so /metrics still answers.
                    tracing::warn!(error = %e, "Prometheus recorder not installed");
                    PrometheusBuilder::new().build_recorder().handle()
                }
            };

            // Pre-register so every series shows up before the first trigger.
            // Labels match the ones used at the increment sites.
            for domain in TriggerDomain::ALL {
                let name = domain.as_str();
                counter!("trigger_requests_total", "domain" => name).absolute(0);
                for kind in RelayError::KINDS {
                    counter!("trigger_failures_total", "domain" => name, "kind" => kind).absolute(0);
                }
                for table in domain.tables() {
                    counter!("persistence_errors_total", "domain" => name, "table" => table.as_str())
                        .absolute(0);
                }
            }
            for table in Table::ALL {
                counter!("change_events_total", "table" => table.as_str()).absolute(0);
            }
            gauge!("realtime_subscribers").set(0.0);

            handle
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_series(rendered: &str, name: &str, labels: &[&str]) -> bool {
        rendered.lines().any(|line| {
            line.starts_with(&format!("{name}{{"))
                && labels.iter().all(|l| line.contains(l))
                && line.ends_with(" 0")
        })
    }

    #[test]
    fn test_series_are_registered_with_their_labels() {
        let rendered = init_metrics().render();

        assert!(has_series(
            &rendered,
            "trigger_failures_total",
            &[r#"domain="portfolio""#, r#"kind="webhook""#]
        ));
        assert!(has_series(&rendered, "change_events_total", &[r#"table="user_alerts""#]));
        assert!(has_series(
            &rendered,
            "persistence_errors_total",
            &[r#"domain="dashboard""#, r#"table="stocks""#]
        ));
        // No unlabeled series that the increments would never touch
        assert!(!rendered.lines().any(|l| l.starts_with("persistence_errors_total ")));
    }
}
