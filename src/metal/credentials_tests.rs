// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `credentials.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret(entries: &[(&str, &str)]) -> Secret {
        let data: BTreeMap<String, ByteString> = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
            .collect();
        Secret {
            data: Some(data),
            ..Default::default()
        }
    }

    #[test]
    fn test_api_key_only() {
        let creds = Credentials::from_secret(&secret(&[(SECRET_KEY_API_KEY, "token\n")])).unwrap();
        assert_eq!(creds, Credentials::ApiKey("token".to_string()));
        assert_eq!(creds.api_key(), "token");
        assert_eq!(creds.hmac(), "");
    }

    #[test]
    fn test_hmac_only() {
        let creds = Credentials::from_secret(&secret(&[(SECRET_KEY_HMAC, "shared")])).unwrap();
        assert_eq!(creds, Credentials::Hmac("shared".to_string()));
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let creds = Credentials::from_secret(&secret(&[
            (SECRET_KEY_API_KEY, ""),
            (SECRET_KEY_HMAC, "shared"),
        ]))
        .unwrap();
        assert_eq!(creds, Credentials::Hmac("shared".to_string()));
    }

    #[test]
    fn test_neither_is_unauthorized() {
        let err = Credentials::from_secret(&secret(&[])).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_both_is_unauthorized() {
        let err = Credentials::from_secret(&secret(&[
            (SECRET_KEY_API_KEY, "a"),
            (SECRET_KEY_HMAC, "b"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = Credentials::ApiKey("super-secret".to_string());
        assert!(!format!("{creds:?}").contains("super-secret"));
    }

    #[test]
    fn test_validate_cloud_provider_secret() {
        assert!(validate_cloud_provider_secret(&secret(&[(SECRET_KEY_API_KEY, "a")])).is_empty());

        let missing = validate_cloud_provider_secret(&secret(&[]));
        assert_eq!(missing.len(), 1);
        assert_eq!(missing.0[0].error_type, crate::errors::FieldErrorType::Required);

        let both = validate_cloud_provider_secret(&secret(&[
            (SECRET_KEY_API_KEY, "a"),
            (SECRET_KEY_HMAC, "b"),
        ]));
        assert_eq!(both.len(), 1);
        assert_eq!(both.0[0].field, "data[metalAPIHMac]");
    }
}
