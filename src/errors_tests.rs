// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::time::Duration;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(
            kube::core::Status::failure("boom", "Test")
                .with_code(code)
                .boxed(),
        )
    }

    #[test]
    fn test_field_path_rendering() {
        let path = FieldPath::new("metalControlPlanes")
            .key("prod")
            .child("partitions")
            .key("muc")
            .child("networkIsolation");
        assert_eq!(
            path.as_str(),
            "metalControlPlanes[prod].partitions[muc].networkIsolation"
        );

        let root = FieldPath::root().child("firewall").child("networks").index(2);
        assert_eq!(root.to_string(), "firewall.networks[2]");
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError::invalid(&FieldPath::new("partitionID"), "unknown", "field is immutable");
        assert_eq!(
            err.to_string(),
            "partitionID: Invalid value: \"unknown\": field is immutable"
        );

        let err = FieldError::required(&FieldPath::new("iamconfig"), "");
        assert_eq!(err.to_string(), "iamconfig: Required value");
    }

    #[test]
    fn test_not_supported_lists_values() {
        let err = FieldError::not_supported(
            &FieldPath::new("networkAccessType"),
            "open",
            &["baseline", "restricted"],
        );
        assert_eq!(err.error_type, FieldErrorType::NotSupported);
        assert!(err.detail.contains("\"baseline\", \"restricted\""));
    }

    #[test]
    fn test_field_error_list_into_result() {
        assert!(FieldErrorList::new().into_result().is_ok());

        let mut list = FieldErrorList::new();
        list.push(FieldError::forbidden(&FieldPath::new("a"), "nope"));
        list.push(FieldError::too_many(&FieldPath::new("b"), 4, 3));
        let err = list.into_result().unwrap_err();
        match err {
            Error::Validation(list) => assert_eq!(list.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_field_error_list_display_multiple() {
        let list: FieldErrorList = vec![
            FieldError::required(&FieldPath::new("a"), ""),
            FieldError::duplicate(&FieldPath::new("b"), "x"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            list.to_string(),
            "[a: Required value, b: Duplicate value: \"x\"]"
        );
    }

    #[test]
    fn test_requeue_policy() {
        assert_eq!(
            Error::InvalidProviderConfig("bad".into()).requeue_after(),
            None
        );
        assert_eq!(
            Error::Validation(FieldErrorList::new()).requeue_after(),
            None
        );
        assert_eq!(
            Error::transient("find firewall", "503").requeue_after(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            Error::ExternalDependencyUnready("fcm".into()).requeue_after(),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            Error::Internal("x".into()).requeue_after(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_context_is_transparent_for_classification() {
        let err = Error::InvalidProviderConfig("bad".into()).context(
            "Infrastructure",
            "shoot--p--c/c",
            "reconcile",
        );
        assert_eq!(err.requeue_after(), None);
        assert_eq!(err.code(), "ERR_CONFIGURATION_PROBLEM");
        assert!(err.to_string().starts_with("reconcile Infrastructure shoot--p--c/c"));
    }

    #[test]
    fn test_kube_error_classification() {
        assert!(Error::from(api_error(503)).is_transient());
        assert!(Error::from(api_error(429)).is_transient());
        assert!(!Error::from(api_error(400)).is_transient());
        assert!(Error::from(api_error(404)).is_not_found());
        assert!(Error::not_found("network", "n1").is_not_found());
    }
}
