// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_reconcile_outcomes_share_duration_histogram() {
        let kind = "MetricsTestInfrastructure";
        record_reconciliation_success(kind, Duration::from_millis(300));
        record_reconciliation_error(kind, Duration::from_secs(2));

        assert_eq!(RECONCILIATION_TOTAL.with_label_values(&[kind, "success"]).get(), 1.0);
        assert_eq!(RECONCILIATION_TOTAL.with_label_values(&[kind, "error"]).get(), 1.0);
        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[kind]);
        assert_eq!(histogram.get_sample_count(), 2);
    }

    #[test]
    fn test_requeue_is_keyed_by_code() {
        record_reconciliation_requeue("MetricsTestWorker", "ERR_INFRA_UNAVAILABLE");
        let requeues =
            REQUEUE_TOTAL.with_label_values(&["MetricsTestWorker", "ERR_INFRA_UNAVAILABLE"]);
        assert_eq!(requeues.get(), 1.0);
    }

    #[test]
    fn test_leader_gauge_follows_transitions() {
        let identity = "metrics-test-pod";
        record_leader_elected(identity);
        assert_eq!(IS_LEADER.with_label_values(&[identity]).get(), 1.0);
        record_leader_lost(identity);
        assert_eq!(IS_LEADER.with_label_values(&[identity]).get(), 0.0);
    }

    #[test]
    fn test_exposition_uses_namespace_prefix() {
        record_metal_request("metrics_test_find_networks", "success", Duration::from_millis(20));
        record_admission_review("validate", "CREATE", "allowed");
        record_resource_created("metrics-test-network");

        let text = gather_metrics().unwrap();
        assert!(text.contains("provider_metal_metal_api_requests_total"));
        assert!(text.contains("provider_metal_admission_reviews_total"));
        assert!(text.contains("provider_metal_objects_created_total"));
    }
}
