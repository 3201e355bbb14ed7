// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resources.rs`

#[cfg(test)]
mod tests {
    use super::super::{is_already_exists, is_kube_not_found, orphan_delete_params};
    use kube::api::PropagationPolicy;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(
            kube::core::Status::failure(reason, reason)
                .with_code(code)
                .boxed(),
        )
    }

    #[test]
    fn test_already_exists() {
        assert!(is_already_exists(&api_error(409, "AlreadyExists")));
        assert!(!is_already_exists(&api_error(404, "NotFound")));
    }

    #[test]
    fn test_not_found() {
        assert!(is_kube_not_found(&api_error(404, "NotFound")));
        assert!(!is_kube_not_found(&api_error(500, "InternalError")));
    }

    #[test]
    fn test_orphan_delete_params() {
        let params = orphan_delete_params();
        assert!(matches!(params.propagation_policy, Some(PropagationPolicy::Orphan)));
        assert!(params.grace_period_seconds.is_none());
    }
}
