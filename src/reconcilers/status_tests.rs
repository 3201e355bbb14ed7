// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;

    #[test]
    fn test_processing_patch() {
        let patch = processing_patch(LastOperationType::Migrate).unwrap();
        let op = &patch["status"]["lastOperation"];
        assert_eq!(op["type"], "Migrate");
        assert_eq!(op["state"], "Processing");
        assert!(op["lastUpdateTime"].is_string());
        assert!(patch["status"].get("lastError").is_none());
    }

    #[test]
    fn test_success_patch_clears_error_and_sets_generation() {
        let patch = success_patch(
            LastOperationType::Reconcile,
            Some(4),
            json!({ "nodesCIDR": "10.0.0.0/22" }),
            false,
        )
        .unwrap();
        let status = &patch["status"];
        assert_eq!(status["lastOperation"]["state"], "Succeeded");
        assert_eq!(status["lastOperation"]["progress"], 100);
        assert!(status["lastError"].is_null());
        assert!(status.as_object().unwrap().contains_key("lastError"));
        assert_eq!(status["observedGeneration"], 4);
        assert_eq!(status["nodesCIDR"], "10.0.0.0/22");
    }

    #[test]
    fn test_pending_success_keeps_processing() {
        let patch = success_patch(LastOperationType::Reconcile, Some(4), json!({}), true).unwrap();
        let status = &patch["status"];
        assert_eq!(status["lastOperation"]["state"], "Processing");
        assert!(status.get("observedGeneration").is_none());
    }

    #[test]
    fn test_error_patch_states() {
        let transient = Error::transient("allocate firewall", "503 Service Unavailable");
        let patch = error_patch(LastOperationType::Reconcile, &transient).unwrap();
        assert_eq!(patch["status"]["lastOperation"]["state"], "Error");
        assert_eq!(patch["status"]["lastError"]["codes"], json!(["ERR_INFRA_UNAVAILABLE"]));

        let invalid = Error::InvalidProviderConfig("bad".to_string());
        let patch = error_patch(LastOperationType::Delete, &invalid).unwrap();
        assert_eq!(patch["status"]["lastOperation"]["state"], "Failed");
    }

    #[test]
    fn test_last_error_uses_root_code() {
        let err = Error::Conflict("two firewalls".to_string()).context("Infrastructure", "ns/name", "reconcile");
        let last = last_error(&err);
        assert_eq!(last.codes, vec!["ERR_CONFLICT".to_string()]);
        assert!(last.description.contains("two firewalls"));
    }

    #[test]
    fn test_merge_objects_later_wins() {
        let mut target = json!({ "a": 1, "b": 2 });
        merge_objects(&mut target, json!({ "b": 3, "c": 4 }));
        assert_eq!(target, json!({ "a": 1, "b": 3, "c": 4 }));

        let mut scalar = json!(1);
        merge_objects(&mut scalar, json!({ "a": 1 }));
        assert_eq!(scalar, json!(1));
    }
}
