// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificates of the audittailer and droptailer in the shoot.
//!
//! The certificates are signed by the shoot's cluster CA, which the host
//! platform keeps as secret `ca` in the seed namespace. A deployed secret is
//! renewed once a third of its validity remains or the CA changed.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};
use rcgen::string::Ia5String;
use rcgen::{
    CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose,
    SanType,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::constants::{
    AUDIT_NAMESPACE, CLUSTER_CA_SECRET_NAME, FIELD_MANAGER, FIREWALL_NAMESPACE,
    SHOOT_CERT_VALIDITY_DAYS,
};
use crate::errors::{Error, Result};
use crate::labels::{LABEL_MANAGED_BY, MANAGED_BY_VALUE};
use crate::reconcilers::resources::{create_or_apply, is_already_exists};

use super::signing::{parse_rsa_key, to_pkcs8_pem};

/// Secret key of the CA certificate
pub const SECRET_KEY_CA_CERT: &str = "ca.crt";

/// Secret key of the CA private key
pub const SECRET_KEY_CA_KEY: &str = "ca.key";

/// Secret key of the issued certificate
pub const SECRET_KEY_TLS_CERT: &str = "tls.crt";

/// Secret key of the issued private key
pub const SECRET_KEY_TLS_KEY: &str = "tls.key";

/// Annotation recording the expiry of an issued certificate (RFC 3339)
pub const ANNOTATION_NOT_AFTER: &str = "metal.provider.extensions.gardener.cloud/not-after";

/// Usage of an issued certificate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CertUsage {
    Server,
    Client,
}

/// A certificate deployed into the shoot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShootCertificate {
    /// Secret name in the shoot
    pub name: &'static str,
    /// Namespace in the shoot
    pub namespace: &'static str,
    pub common_name: &'static str,
    pub usage: CertUsage,
}

impl ShootCertificate {
    /// DNS names of a server certificate
    #[must_use]
    pub fn dns_names(&self) -> Vec<String> {
        match self.usage {
            CertUsage::Client => Vec::new(),
            CertUsage::Server => vec![
                self.common_name.to_string(),
                format!("{}.{}", self.common_name, self.namespace),
                format!("{}.{}.svc", self.common_name, self.namespace),
                format!("{}.{}.svc.cluster.local", self.common_name, self.namespace),
            ],
        }
    }
}

/// The certificates the control plane deploys into every shoot
pub const SHOOT_CERTIFICATES: [ShootCertificate; 3] = [
    ShootCertificate {
        name: "audittailer-server",
        namespace: AUDIT_NAMESPACE,
        common_name: "audittailer",
        usage: CertUsage::Server,
    },
    ShootCertificate {
        name: "droptailer-server",
        namespace: FIREWALL_NAMESPACE,
        common_name: "droptailer",
        usage: CertUsage::Server,
    },
    ShootCertificate {
        name: "droptailer-client",
        namespace: FIREWALL_NAMESPACE,
        common_name: "droptailer",
        usage: CertUsage::Client,
    },
];

/// The shoot's cluster CA
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterCa {
    pub cert_pem: String,
    /// RSA key in PKCS#1 or PKCS#8 PEM form
    pub key_pem: String,
}

fn secret_string(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .and_then(|v| String::from_utf8(v.0.clone()).ok())
}

/// Read the cluster CA of a seed namespace.
///
/// # Errors
///
/// Returns [`Error::ExternalDependencyUnready`] while the CA secret or one of
/// its keys is missing.
pub async fn read_cluster_ca(client: &Client, namespace: &str) -> Result<ClusterCa> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets.get_opt(CLUSTER_CA_SECRET_NAME).await?.ok_or_else(|| {
        Error::ExternalDependencyUnready(format!(
            "cluster CA secret {namespace}/{CLUSTER_CA_SECRET_NAME} does not exist"
        ))
    })?;
    let missing = |key: &str| {
        Error::ExternalDependencyUnready(format!(
            "cluster CA secret {namespace}/{CLUSTER_CA_SECRET_NAME} has no {key}"
        ))
    };
    Ok(ClusterCa {
        cert_pem: secret_string(&secret, SECRET_KEY_CA_CERT).ok_or_else(|| missing(SECRET_KEY_CA_CERT))?,
        key_pem: secret_string(&secret, SECRET_KEY_CA_KEY).ok_or_else(|| missing(SECRET_KEY_CA_KEY))?,
    })
}

fn cert_error(what: &str, e: impl std::fmt::Display) -> Error {
    Error::Internal(format!("{what}: {e}"))
}

/// Issue a certificate signed by the cluster CA.
///
/// Returns `(certificate PEM, private key PEM)`.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the CA is unusable or signing fails.
pub fn issue_certificate(
    ca: &ClusterCa,
    cert: &ShootCertificate,
    now: DateTime<Utc>,
) -> Result<(String, String)> {
    let ca_key = KeyPair::from_pem(&to_pkcs8_pem(&parse_rsa_key(&ca.key_pem)?)?)
        .map_err(|e| cert_error("loading cluster CA key", e))?;
    let issuer = Issuer::from_ca_cert_pem(&ca.cert_pem, &ca_key)
        .map_err(|e| cert_error("loading cluster CA certificate", e))?;

    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, cert.common_name);
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![match cert.usage {
        CertUsage::Server => ExtendedKeyUsagePurpose::ServerAuth,
        CertUsage::Client => ExtendedKeyUsagePurpose::ClientAuth,
    }];
    params.not_before = ::time::OffsetDateTime::from_unix_timestamp(now.timestamp())
        .map_err(|e| cert_error("certificate start", e))?;
    params.not_after = params.not_before + ::time::Duration::days(SHOOT_CERT_VALIDITY_DAYS);
    params.subject_alt_names = cert
        .dns_names()
        .into_iter()
        .map(|name| {
            Ia5String::try_from(name.clone())
                .map(SanType::DnsName)
                .map_err(|e| cert_error(&format!("invalid DNS name {name}"), e))
        })
        .collect::<Result<Vec<_>>>()?;

    let key = KeyPair::generate().map_err(|e| cert_error("generating key", e))?;
    let signed = params
        .signed_by(&key, &issuer)
        .map_err(|e| cert_error(&format!("signing {}", cert.name), e))?;
    Ok((signed.pem(), key.serialize_pem()))
}

/// The secret of an issued certificate
///
/// # Errors
///
/// See [`issue_certificate`].
pub fn certificate_secret(ca: &ClusterCa, cert: &ShootCertificate, now: DateTime<Utc>) -> Result<Secret> {
    let (tls_cert, tls_key) = issue_certificate(ca, cert, now)?;
    let not_after = now + ChronoDuration::days(SHOOT_CERT_VALIDITY_DAYS);
    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(cert.name.to_string()),
            namespace: Some(cert.namespace.to_string()),
            labels: Some(BTreeMap::from([(
                LABEL_MANAGED_BY.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            annotations: Some(BTreeMap::from([(
                ANNOTATION_NOT_AFTER.to_string(),
                not_after.to_rfc3339(),
            )])),
            ..Default::default()
        },
        type_: Some("kubernetes.io/tls".to_string()),
        data: Some(BTreeMap::from([
            (SECRET_KEY_CA_CERT.to_string(), ByteString(ca.cert_pem.clone().into_bytes())),
            (SECRET_KEY_TLS_CERT.to_string(), ByteString(tls_cert.into_bytes())),
            (SECRET_KEY_TLS_KEY.to_string(), ByteString(tls_key.into_bytes())),
        ])),
        ..Default::default()
    })
}

/// `true` if a deployed certificate secret must be reissued
#[must_use]
pub fn needs_renewal(existing: &Secret, ca: &ClusterCa, now: DateTime<Utc>) -> bool {
    if secret_string(existing, SECRET_KEY_CA_CERT).as_deref() != Some(ca.cert_pem.as_str()) {
        return true;
    }
    let Some(not_after) = existing
        .annotations()
        .get(ANNOTATION_NOT_AFTER)
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
    else {
        return true;
    };
    let remaining = not_after.with_timezone(&Utc) - now;
    remaining < ChronoDuration::days(SHOOT_CERT_VALIDITY_DAYS) / 3
}

async fn ensure_namespace(shoot: &Client, name: &str) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(shoot.clone());
    if namespaces.get_opt(name).await?.is_some() {
        return Ok(());
    }
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    match namespaces.create(&PostParams::default(), &namespace).await {
        Ok(_) => {
            info!(namespace = %name, "created shoot namespace");
            Ok(())
        }
        Err(e) if is_already_exists(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Deploy the add-on certificates into the shoot.
///
/// Returns the number of (re)issued certificates.
///
/// # Errors
///
/// Propagates API and signing errors.
pub async fn deploy_shoot_certificates(shoot: &Client, ca: &ClusterCa) -> Result<usize> {
    let now = Utc::now();
    let mut issued = 0;
    for cert in &SHOOT_CERTIFICATES {
        ensure_namespace(shoot, cert.namespace).await?;

        let secrets: Api<Secret> = Api::namespaced(shoot.clone(), cert.namespace);
        if let Some(existing) = secrets.get_opt(cert.name).await? {
            if !needs_renewal(&existing, ca, now) {
                continue;
            }
        }
        let secret = certificate_secret(ca, cert, now)?;
        create_or_apply(shoot, cert.namespace, &secret, FIELD_MANAGER).await?;
        debug!(namespace = %cert.namespace, secret = %cert.name, "issued shoot certificate");
        issued += 1;
    }
    Ok(issued)
}

#[cfg(test)]
#[path = "certificates_tests.rs"]
mod certificates_tests;
