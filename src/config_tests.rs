// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::collections::HashMap;

    const CONFIG: &str = r"
machineImages:
  - name: ubuntu
    version: '22.04'
    image: ubuntu-22.04-metal
clusterAudit:
  enabled: true
accountingExporter:
  enabled: true
  networkTraffic:
    enabled: true
    internalNetworks:
      - 10.0.0.0/8
storage:
  duros:
    enabled: true
    seedConfig:
      seed-a:
        endpoints: ['10.1.0.1:443']
        storageClasses:
          - name: partition-silver
            replicaCount: 2
concurrency:
  worker: 10
";

    #[test]
    fn test_parse_controller_config() {
        let config = ControllerConfig::from_yaml(CONFIG).unwrap();
        assert_eq!(config.machine_image("ubuntu", "22.04"), Some("ubuntu-22.04-metal"));
        assert_eq!(config.machine_image("ubuntu", "20.04"), None);
        assert!(config.cluster_audit.enabled);
        assert!(!config.audit_to_splunk.enabled);
        assert_eq!(config.firewall_internal_prefixes(), vec!["10.0.0.0/8".to_string()]);
        assert_eq!(
            config.storage.duros.seed_config["seed-a"].storage_classes[0].replica_count,
            2
        );
        assert_eq!(config.concurrency.worker, Some(10));
        assert_eq!(config.concurrency.infrastructure, None);
    }

    #[test]
    fn test_internal_prefixes_require_accounting() {
        let mut config = ControllerConfig::from_yaml(CONFIG).unwrap();
        config.accounting_exporter.enabled = false;
        assert!(config.firewall_internal_prefixes().is_empty());
    }

    #[test]
    fn test_empty_controller_config() {
        assert_eq!(ControllerConfig::from_yaml("").unwrap(), ControllerConfig::default());
        assert!(ControllerConfig::from_yaml("machineImages: 3").is_err());
    }

    #[test]
    fn test_controller_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();
        let config = ControllerConfig::from_file(&path).unwrap();
        assert!(config.storage.duros.enabled);

        let missing = ControllerConfig::from_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, Error::InvalidProviderConfig(_)));
    }

    #[test]
    fn test_defaulter_defaults() {
        let config = DefaulterConfig::from_lookup(|_| None);
        assert_eq!(config, DefaulterConfig::default());
        assert_eq!(config.max_pods, 250);
        assert_eq!(config.node_cidr_mask_size, 23);
        assert_eq!(config.cilium_devices, vec!["lan+".to_string(), "lo".to_string()]);
    }

    #[test]
    fn test_defaulter_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEFAULTER_MAXPODS", "110"),
            ("DEFAULTER_NETWORKTYPE", "cilium"),
            ("DEFAULTER_CILIUMPSPENABLED", "true"),
            ("DEFAULTER_CILIUMDEVICES", "lan+, eth0"),
            ("DEFAULTER_CILIUMMTU", " 9000 "),
        ]);
        let config = DefaulterConfig::from_lookup(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.max_pods, 110);
        assert_eq!(config.network_type, "cilium");
        assert!(config.cilium_psp_enabled);
        assert_eq!(config.cilium_devices, vec!["lan+".to_string(), "eth0".to_string()]);
        assert_eq!(config.cilium_mtu, 9000);
    }

    #[test]
    fn test_defaulter_malformed_values_keep_default() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEFAULTER_MAXPODS", "many"),
            ("DEFAULTER_CALICOTYPHAENABLED", "yes please"),
        ]);
        let config = DefaulterConfig::from_lookup(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.max_pods, 250);
        assert!(!config.calico_typha_enabled);
    }

    #[test]
    fn test_concurrency_precedence() {
        assert_eq!(ConcurrencyConfig::resolve(Some(10), Some(3)), 10);
        assert_eq!(ConcurrencyConfig::resolve(None, Some(3)), 3);
        assert_eq!(ConcurrencyConfig::resolve(None, None), 5);
        assert_eq!(ConcurrencyConfig::resolve(Some(0), None), 5);
    }
}
