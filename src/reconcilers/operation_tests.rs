// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `operation.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use chrono::Utc;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use std::collections::BTreeMap;

    use crate::gardener::extensions::{LastOperation, LastOperationState};

    fn meta(annotation: Option<&str>, deleting: bool) -> ObjectMeta {
        ObjectMeta {
            name: Some("shoot--foo--bar".to_string()),
            namespace: Some("shoot--foo--bar".to_string()),
            annotations: annotation.map(|op| {
                BTreeMap::from([(ANNOTATION_OPERATION.to_string(), op.to_string())])
            }),
            deletion_timestamp: deleting.then(|| Time(k8s_openapi::jiff::Timestamp::now())),
            ..Default::default()
        }
    }

    #[test]
    fn test_determine_operation() {
        assert_eq!(determine_operation(&meta(None, false)), Operation::Reconcile);
        assert_eq!(determine_operation(&meta(Some("migrate"), false)), Operation::Migrate);
        assert_eq!(determine_operation(&meta(Some("restore"), false)), Operation::Restore);
        assert_eq!(determine_operation(&meta(Some("reconcile"), false)), Operation::Reconcile);
        assert_eq!(determine_operation(&meta(Some("wait-for-me"), false)), Operation::Reconcile);
    }

    #[test]
    fn test_deletion_wins_over_annotation() {
        assert_eq!(determine_operation(&meta(Some("migrate"), true)), Operation::Delete);
        assert_eq!(determine_operation(&meta(None, true)), Operation::Delete);
    }

    #[test]
    fn test_first_reconcile_is_create() {
        assert_eq!(
            Operation::Reconcile.last_operation_type(None),
            LastOperationType::Create
        );

        let status = DefaultStatus {
            last_operation: Some(LastOperation {
                operation_type: LastOperationType::Create,
                state: LastOperationState::Succeeded,
                description: String::new(),
                last_update_time: Utc::now(),
                progress: 100,
            }),
            ..Default::default()
        };
        assert_eq!(
            Operation::Reconcile.last_operation_type(Some(&status)),
            LastOperationType::Reconcile
        );
        assert_eq!(
            Operation::Migrate.last_operation_type(Some(&status)),
            LastOperationType::Migrate
        );
    }

    #[test]
    fn test_finalizer_and_annotation_handling() {
        assert!(Operation::Delete.releases_finalizer());
        assert!(Operation::Migrate.releases_finalizer());
        assert!(!Operation::Restore.releases_finalizer());
        assert!(!Operation::Reconcile.releases_finalizer());

        assert!(Operation::Migrate.consumes_annotation());
        assert!(Operation::Restore.consumes_annotation());
        assert!(!Operation::Delete.consumes_annotation());
    }

    #[test]
    fn test_is_metal() {
        assert!(is_metal("metal"));
        assert!(!is_metal("aws"));
        assert!(!is_metal(""));
    }

    #[test]
    fn test_outcome_then() {
        let first = Outcome::with_status(json!({ "a": 1, "b": 1 }));
        let combined = first.then(Outcome::pending(json!({ "b": 2 }), Duration::from_secs(5)));
        assert_eq!(combined.status, json!({ "a": 1, "b": 2 }));
        assert_eq!(combined.pending, Some(Duration::from_secs(5)));

        let combined = Outcome::default().then(Outcome::with_status(json!({ "c": 3 })));
        assert_eq!(combined.status, json!({ "c": 3 }));
        assert_eq!(combined.pending, None);
    }
}
