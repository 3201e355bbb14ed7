// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the admission handlers

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::{FieldError, FieldPath};
    use crate::reconcilers::fixtures;
    use serde_json::json;

    fn shoot_json(provider: &str) -> Value {
        json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Shoot",
            "metadata": {"name": "cluster", "namespace": "garden-project"},
            "spec": {
                "cloudProfileName": "metal",
                "region": "local",
                "kubernetes": {"version": "1.24.0"},
                "provider": {"type": provider, "workers": []},
            },
        })
    }

    fn request(kind: &str, object: Value) -> AdmissionRequest<DynamicObject> {
        let review: AdmissionReview<DynamicObject> = serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "core.gardener.cloud", "version": "v1beta1", "kind": kind},
                "resource": {"group": "core.gardener.cloud", "version": "v1beta1", "resource": "shoots"},
                "name": "cluster",
                "namespace": "garden-project",
                "operation": "CREATE",
                "userInfo": {"username": "admin"},
                "object": object,
                "dryRun": false,
            },
        }))
        .unwrap();
        review.try_into().unwrap()
    }

    #[test]
    fn test_operation_labels() {
        assert_eq!(operation_label(&Operation::Create), "create");
        assert_eq!(operation_label(&Operation::Update), "update");
        assert_eq!(operation_label(&Operation::Delete), "delete");
    }

    #[test]
    fn test_metal_shoot_detection() {
        assert!(is_metal_shoot(&shoot_json("metal")));
        assert!(!is_metal_shoot(&shoot_json("aws")));
        assert!(!is_metal_shoot(&json!({"spec": {}})));
    }

    #[test]
    fn test_dynamic_object_is_retyped() {
        let request = request("Shoot", shoot_json("metal"));
        let shoot: Shoot = typed(request.object.as_ref().unwrap()).unwrap();
        assert_eq!(shoot.spec.cloud_profile_name.as_deref(), Some("metal"));
        assert_eq!(shoot.spec.provider.provider_type, "metal");
    }

    #[test]
    fn test_validation_response() {
        let request = request("Shoot", shoot_json("metal"));
        assert!(validation_response(&request, Ok(FieldErrorList::new())).allowed);

        let mut errors = FieldErrorList::new();
        errors.push(FieldError::required(
            &FieldPath::new("spec").child("provider").child("infrastructureConfig"),
            "infrastructure config must be set",
        ));
        let denied = validation_response(&request, Ok(errors));
        assert!(!denied.allowed);
        assert!(denied.result.message.contains("spec.provider.infrastructureConfig"));

        let failed = validation_response(
            &request,
            Err(Error::InvalidProviderConfig("unknown field `surprise`".to_string())),
        );
        assert!(!failed.allowed);
        assert!(failed.result.message.contains("surprise"));
    }

    #[test]
    fn test_default_response_carries_patch() {
        let shoot = shoot_json("metal");
        let request = request("Shoot", shoot.clone());
        let response = default_response(&request, &shoot, None, &DefaulterConfig::default());
        assert!(response.allowed);

        let patch: json_patch::Patch = serde_json::from_slice(&response.patch.unwrap()).unwrap();
        let mut patched = shoot.clone();
        json_patch::patch(&mut patched, &patch).unwrap();
        assert_eq!(patched["spec"]["kubernetes"]["kubelet"]["maxPods"], 250);
    }

    #[test]
    fn test_default_response_without_changes() {
        let mut shoot = shoot_json("metal");
        defaulter::default_shoot(&mut shoot, None, &DefaulterConfig::default()).unwrap();
        let request = request("Shoot", shoot.clone());
        let response = default_response(&request, &shoot, None, &DefaulterConfig::default());
        assert!(response.allowed);
        assert!(response.patch.is_none());
    }

    #[test]
    fn test_default_response_with_profile() {
        let mut shoot = shoot_json("metal");
        shoot["spec"]["provider"]["infrastructureConfig"] =
            crate::apis::codec::encode_value(&fixtures::infrastructure_config()).unwrap();
        shoot["spec"]["provider"]["infrastructureConfig"]["firewall"]["image"] = json!("");
        let request = request("Shoot", shoot.clone());

        let profile = fixtures::cloud_profile_config();
        let response = default_response(&request, &shoot, Some(&profile), &DefaulterConfig::default());
        assert!(response.allowed);

        let patch: json_patch::Patch = serde_json::from_slice(&response.patch.unwrap()).unwrap();
        let mut patched = shoot;
        json_patch::patch(&mut patched, &patch).unwrap();
        assert_eq!(
            patched["spec"]["provider"]["infrastructureConfig"]["firewall"]["image"],
            fixtures::FIREWALL_IMAGE
        );
    }
}
