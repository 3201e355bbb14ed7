// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the control plane actuator helpers

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::gardener::extensions::ControlPlaneSpec;
    use crate::reconcilers::fixtures::{self, PRIVATE_NETWORK};
    use k8s_openapi::api::core::v1::SecretReference;
    use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;
    use sha2::Sha256;

    fn control_plane(provider_config: Option<serde_json::Value>) -> ControlPlane {
        ControlPlane::new(
            "cp",
            ControlPlaneSpec {
                provider_type: "metal".to_string(),
                provider_config: provider_config.map(RawExtension),
                infrastructure_provider_status: None,
                region: "local".to_string(),
                secret_ref: SecretReference {
                    name: Some("cloudprovider".to_string()),
                    namespace: Some(fixtures::NAMESPACE.to_string()),
                },
                purpose: None,
            },
        )
    }

    #[test]
    fn test_handles_purpose() {
        assert!(handles_purpose(None));
        assert!(handles_purpose(Some("normal")));
        assert!(!handles_purpose(Some("exposure")));
    }

    #[test]
    fn test_absent_control_plane_config_is_default() {
        let config = control_plane_config(&control_plane(None)).unwrap();
        assert!(config.iam_config.is_none());
        assert!(config.cloud_controller_manager.is_none());
    }

    #[test]
    fn test_control_plane_config_is_decoded() {
        let cp = control_plane(Some(json!({
            "apiVersion": "metal.provider.extensions.gardener.cloud/v1alpha1",
            "kind": "ControlPlaneConfig",
            "cloudControllerManager": {
                "defaultExternalNetwork": "internet",
            },
        })));
        let config = control_plane_config(&cp).unwrap();
        assert_eq!(
            config
                .cloud_controller_manager
                .and_then(|c| c.default_external_network)
                .as_deref(),
            Some("internet")
        );
    }

    #[test]
    fn test_malformed_control_plane_config_is_rejected() {
        let cp = control_plane(Some(json!({
            "apiVersion": "metal.provider.extensions.gardener.cloud/v1alpha1",
            "kind": "ControlPlaneConfig",
            "featureGates": "not-an-object",
        })));
        assert!(control_plane_config(&cp).is_err());
    }

    #[test]
    fn test_charts_are_deleted_shoot_first() {
        let reversed: Vec<_> = CHARTS.iter().rev().copied().collect();
        assert_eq!(reversed[0], CHART_SHOOT_CONTROL_PLANE);
        assert_eq!(reversed[2], CHART_CLOUD_PROVIDER_CONFIG);
    }

    #[test]
    fn test_firewall_signature_verifies_against_the_ca_key() {
        let (_, key_pem) = fixtures::cluster_ca();
        let key = parse_rsa_key(&key_pem).unwrap();
        let spec = json!({"size": fixtures::FIREWALL_SIZE, "networks": [PRIVATE_NETWORK]});

        let signature = sign_firewall_spec(&key, &spec).unwrap();
        let raw = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, signature).unwrap();
        let verifying = VerifyingKey::<Sha256>::new(key.to_public_key());
        verifying
            .verify(
                &serde_json::to_vec(&spec).unwrap(),
                &Signature::try_from(raw.as_slice()).unwrap(),
            )
            .unwrap();
    }
}
