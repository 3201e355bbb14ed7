// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `registration.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    fn service_config() -> RegistrationConfig {
        RegistrationConfig {
            name: "provider-metal".to_string(),
            mode: ConfigMode::Service,
            url: None,
            namespace: "extension-provider-metal".to_string(),
            service_name: "provider-metal-admission".to_string(),
            service_selectors: BTreeMap::from([(
                "app".to_string(),
                "provider-metal-admission".to_string(),
            )]),
            server_port: 9443,
            ca_bundle: Some(b"-----BEGIN CERTIFICATE-----".to_vec()),
        }
    }

    #[test]
    fn test_service_selectors() {
        assert!(parse_service_selectors("").unwrap().is_empty());
        let selectors = parse_service_selectors(r#"{"app":"admission","role":"webhook"}"#).unwrap();
        assert_eq!(selectors.get("role").map(String::as_str), Some("webhook"));
        assert!(parse_service_selectors("app=admission").is_err());
    }

    #[test]
    fn test_service_mode_client_config() {
        let client_config = service_config().client_config(WEBHOOK_VALIDATE_PATH).unwrap();
        let service = client_config.service.unwrap();
        assert_eq!(service.name, "provider-metal-admission");
        assert_eq!(service.namespace, "extension-provider-metal");
        assert_eq!(service.path.as_deref(), Some(WEBHOOK_VALIDATE_PATH));
        assert_eq!(service.port, Some(SERVICE_PORT));
        assert!(client_config.url.is_none());
        assert!(client_config.ca_bundle.is_some());
    }

    #[test]
    fn test_url_mode_client_config() {
        let config = RegistrationConfig {
            mode: ConfigMode::Url,
            url: Some("https://admission.example.com:9443/".to_string()),
            ..service_config()
        };
        let client_config = config.client_config(WEBHOOK_DEFAULT_PATH).unwrap();
        assert_eq!(
            client_config.url.as_deref(),
            Some("https://admission.example.com:9443/webhooks/default")
        );
        assert!(client_config.service.is_none());

        let missing = RegistrationConfig {
            mode: ConfigMode::Url,
            url: None,
            ..service_config()
        };
        assert!(missing.client_config(WEBHOOK_DEFAULT_PATH).is_err());
    }

    #[test]
    fn test_validating_configuration() {
        let configuration = validating_configuration(&service_config()).unwrap();
        assert_eq!(configuration.metadata.name.as_deref(), Some("provider-metal"));

        let webhooks = configuration.webhooks.unwrap();
        assert_eq!(webhooks.len(), 2);
        let resources: Vec<String> = webhooks[0]
            .rules
            .iter()
            .flatten()
            .flat_map(|r| r.resources.clone().unwrap_or_default())
            .collect();
        assert_eq!(resources, vec!["shoots", "cloudprofiles", "seeds"]);
        assert!(webhooks[0].object_selector.is_none());
        assert_eq!(webhooks[0].failure_policy.as_deref(), Some("Fail"));

        let selector = webhooks[1].object_selector.clone().unwrap().match_labels.unwrap();
        assert_eq!(selector.get(LABEL_PROVIDER_SECRET).map(String::as_str), Some("true"));
    }

    #[test]
    fn test_mutating_configuration_targets_shoots() {
        let configuration = mutating_configuration(&service_config()).unwrap();
        let webhooks = configuration.webhooks.unwrap();
        assert_eq!(webhooks.len(), 1);
        let rules = webhooks[0].rules.clone().unwrap();
        assert_eq!(rules[0].resources, Some(vec!["shoots".to_string()]));
        assert_eq!(
            rules[0].operations,
            Some(vec!["CREATE".to_string(), "UPDATE".to_string()])
        );
        assert_eq!(
            webhooks[0].client_config.service.as_ref().and_then(|s| s.path.as_deref()),
            Some(WEBHOOK_DEFAULT_PATH)
        );
    }

    #[test]
    fn test_webhook_service_targets_server_port() {
        let service = webhook_service(&service_config());
        assert_eq!(service.metadata.namespace.as_deref(), Some("extension-provider-metal"));
        let spec = service.spec.unwrap();
        let port = &spec.ports.unwrap()[0];
        assert_eq!(port.port, 443);
        assert_eq!(port.target_port, Some(IntOrString::Int(9443)));
        assert_eq!(
            spec.selector.unwrap().get("app").map(String::as_str),
            Some("provider-metal-admission")
        );
    }

    #[test]
    fn test_missing_ca_bundle() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_ca_bundle(dir.path()).is_none());
        std::fs::write(dir.path().join("ca.crt"), "pem").unwrap();
        assert_eq!(read_ca_bundle(dir.path()), Some(b"pem".to_vec()));
    }
}
