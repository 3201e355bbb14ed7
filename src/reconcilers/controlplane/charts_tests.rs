// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `charts.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;

    #[test]
    fn test_values_secret_name() {
        assert_eq!(values_secret_name("control-plane"), "control-plane-values");
    }

    #[test]
    fn test_values_secret_holds_yaml() {
        let values = json!({"cloudControllerManager": {"replicas": 1}});
        let secret = values_secret("shoot--p--c", "control-plane", &values).unwrap();

        assert_eq!(secret.metadata.name.as_deref(), Some("control-plane-values"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("shoot--p--c"));
        let labels = secret.metadata.labels.unwrap();
        assert_eq!(labels.get(LABEL_CHART).map(String::as_str), Some("control-plane"));

        let raw = secret.string_data.unwrap().remove(SECRET_KEY_VALUES).unwrap();
        let decoded: Value = serde_yaml::from_str(&raw).unwrap();
        assert_eq!(decoded, values);
    }
}
