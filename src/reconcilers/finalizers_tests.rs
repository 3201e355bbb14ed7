// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use super::super::{finalizers_without, has_finalizer};
    use crate::constants::EXTENSION_FINALIZER;
    use crate::labels::FINALIZER_MACHINE_CONTROLLER;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn meta(finalizers: Option<Vec<&str>>) -> ObjectMeta {
        ObjectMeta {
            name: Some("shoot--foo--bar".to_string()),
            namespace: Some("shoot--foo--bar".to_string()),
            finalizers: finalizers.map(|f| f.into_iter().map(str::to_string).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!has_finalizer(&meta(None), EXTENSION_FINALIZER));
        assert!(!has_finalizer(&meta(Some(vec![])), EXTENSION_FINALIZER));
        assert!(has_finalizer(
            &meta(Some(vec!["other", EXTENSION_FINALIZER])),
            EXTENSION_FINALIZER
        ));
    }

    #[test]
    fn test_finalizers_without_absent() {
        assert_eq!(finalizers_without(&meta(None), EXTENSION_FINALIZER), None);
        assert_eq!(
            finalizers_without(&meta(Some(vec!["other"])), EXTENSION_FINALIZER),
            None
        );
    }

    #[test]
    fn test_finalizers_without_keeps_others() {
        let remaining = finalizers_without(
            &meta(Some(vec![FINALIZER_MACHINE_CONTROLLER, "keep.me/finalizer"])),
            FINALIZER_MACHINE_CONTROLLER,
        );
        assert_eq!(remaining, Some(vec!["keep.me/finalizer".to_string()]));
    }

    #[test]
    fn test_finalizers_without_last_one() {
        let remaining =
            finalizers_without(&meta(Some(vec![EXTENSION_FINALIZER])), EXTENSION_FINALIZER);
        assert_eq!(remaining, Some(vec![]));
    }
}
