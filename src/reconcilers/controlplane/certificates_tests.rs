// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `certificates.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::reconcilers::fixtures;

    fn ca() -> ClusterCa {
        let (cert_pem, key_pem) = fixtures::cluster_ca();
        ClusterCa { cert_pem, key_pem }
    }

    fn data(secret: &Secret, key: &str) -> String {
        secret_string(secret, key).unwrap()
    }

    #[test]
    fn test_shoot_certificates() {
        let names: Vec<_> = SHOOT_CERTIFICATES
            .iter()
            .map(|c| (c.namespace, c.name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("audit", "audittailer-server"),
                ("firewall", "droptailer-server"),
                ("firewall", "droptailer-client"),
            ]
        );
    }

    #[test]
    fn test_dns_names() {
        let server = &SHOOT_CERTIFICATES[0];
        assert_eq!(
            server.dns_names(),
            vec![
                "audittailer",
                "audittailer.audit",
                "audittailer.audit.svc",
                "audittailer.audit.svc.cluster.local",
            ]
        );
        assert!(SHOOT_CERTIFICATES[2].dns_names().is_empty());
    }

    #[test]
    fn test_issue_certificate() {
        let (cert, key) = issue_certificate(&ca(), &SHOOT_CERTIFICATES[1], Utc::now()).unwrap();
        assert!(cert.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(key.contains("PRIVATE KEY"));
        assert!(Issuer::from_ca_cert_pem(&cert, KeyPair::generate().unwrap()).is_ok());
    }

    #[test]
    fn test_issue_certificate_rejects_broken_ca() {
        let broken = ClusterCa {
            cert_pem: ca().cert_pem,
            key_pem: "not a key".to_string(),
        };
        assert!(issue_certificate(&broken, &SHOOT_CERTIFICATES[0], Utc::now()).is_err());
    }

    #[test]
    fn test_certificate_secret() {
        let ca = ca();
        let now = Utc::now();
        let secret = certificate_secret(&ca, &SHOOT_CERTIFICATES[2], now).unwrap();

        assert_eq!(secret.metadata.name.as_deref(), Some("droptailer-client"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("firewall"));
        assert_eq!(secret.type_.as_deref(), Some("kubernetes.io/tls"));
        assert_eq!(data(&secret, SECRET_KEY_CA_CERT), ca.cert_pem);
        assert!(data(&secret, SECRET_KEY_TLS_CERT).starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(!needs_renewal(&secret, &ca, now));
    }

    #[test]
    fn test_needs_renewal() {
        let ca = ca();
        let now = Utc::now();
        let secret = certificate_secret(&ca, &SHOOT_CERTIFICATES[0], now).unwrap();

        // a third of the validity left
        assert!(needs_renewal(&secret, &ca, now + ChronoDuration::days(21)));
        assert!(!needs_renewal(&secret, &ca, now + ChronoDuration::days(19)));

        let rotated = ClusterCa {
            cert_pem: "other".to_string(),
            key_pem: ca.key_pem.clone(),
        };
        assert!(needs_renewal(&secret, &rotated, now));

        let mut unannotated = secret;
        unannotated.metadata.annotations = None;
        assert!(needs_renewal(&unannotated, &ca, now));
    }
}
