// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `client.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_key_client(server: &MockServer) -> MetalClient {
        MetalClient::new(&server.uri(), Credentials::ApiKey("token".to_string())).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let err = MetalClient::new("not a url", Credentials::ApiKey("t".to_string())).unwrap_err();
        assert!(matches!(err, Error::InvalidProviderConfig(_)));

        let err = MetalClient::new("ftp://metal", Credentials::ApiKey("t".to_string())).unwrap_err();
        assert!(matches!(err, Error::InvalidProviderConfig(_)));
    }

    #[test]
    fn test_hmac_signature_properties() {
        let a = hmac_signature("secret", "2024-01-01T00:00:00Z", b"{}").unwrap();
        let b = hmac_signature("secret", "2024-01-01T00:00:00Z", b"{}").unwrap();
        let c = hmac_signature("secret", "2024-01-01T00:00:00Z", b"{\"a\":1}").unwrap();
        let d = hmac_signature("other", "2024-01-01T00:00:00Z", b"{}").unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_map_status() {
        assert!(map_status("op", "v1/x", StatusCode::NOT_FOUND, "").is_not_found());
        assert!(matches!(
            map_status("op", "v1/x", StatusCode::FORBIDDEN, ""),
            Error::Unauthorized(_)
        ));
        assert!(matches!(
            map_status("op", "v1/x", StatusCode::UNAUTHORIZED, ""),
            Error::Unauthorized(_)
        ));
        assert!(matches!(
            map_status("op", "v1/x", StatusCode::CONFLICT, ""),
            Error::Conflict(_)
        ));
        assert!(map_status("op", "v1/x", StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(matches!(
            map_status("op", "v1/x", StatusCode::BAD_REQUEST, "bad"),
            Error::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_find_networks_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/network/find"))
            .and(header("Authorization", "Bearer token"))
            .and(body_json(json!({"projectid": "p1", "prefixes": ["10.0.0.0/22"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "net-1", "projectid": "p1", "prefixes": ["10.0.0.0/22"]}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let networks = api_key_client(&server)
            .find_networks(&NetworkFindRequest {
                projectid: Some("p1".to_string()),
                prefixes: vec!["10.0.0.0/22".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].id, "net-1");
        assert_eq!(networks[0].project(), "p1");
    }

    #[tokio::test]
    async fn test_hmac_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/firewall/fw-1"))
            .and(header_exists("X-Date"))
            .and(header_regex("Authorization", "^Metal-Admin [0-9a-f]{64}$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "fw-1",
                "allocation": {"project": "p1", "succeeded": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = MetalClient::new(&server.uri(), Credentials::Hmac("shared".to_string())).unwrap();
        let firewall = client.get_firewall("fw-1").await.unwrap();
        assert!(firewall.allocation_succeeded());
        assert_eq!(firewall.project(), "p1");
    }

    #[tokio::test]
    async fn test_not_found_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/machine/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such machine"))
            .mount(&server)
            .await;

        let err = api_key_client(&server).get_machine("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/firewall/allocate"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = api_key_client(&server)
            .allocate_firewall(&FirewallCreateRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_free_ip_ignores_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/ip/free/10.0.0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ipaddress": "10.0.0.1"})))
            .expect(1)
            .mount(&server)
            .await;

        api_key_client(&server).free_ip("10.0.0.1").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_ip_sends_type_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ip"))
            .and(body_json(json!({
                "ipaddress": "10.0.0.2",
                "type": "ephemeral",
                "tags": ["other=1"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ipaddress": "10.0.0.2",
                "type": "ephemeral",
                "tags": ["other=1"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ip = api_key_client(&server)
            .update_ip(&IpUpdateRequest {
                ipaddress: "10.0.0.2".to_string(),
                ip_type: "ephemeral".to_string(),
                tags: vec!["other=1".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ip.tags, vec!["other=1".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_response_is_internal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/network/n1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = api_key_client(&server).get_network("n1").await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
