// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `helper.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::apis::metal::{CloudProfileConfig, IamConfig, IssuerConfig, MetalControlPlane};

    fn images() -> Vec<String> {
        vec![
            "firewall-2.0.2020121".to_string(),
            "firewall-2.0.20210207".to_string(),
            "firewall-ubuntu-2.0.19700101".to_string(),
            "firewall-ubuntu-2.0.20210316".to_string(),
        ]
    }

    #[test]
    fn test_latest_firewall_image() {
        assert_eq!(
            latest_firewall_image(&images()).unwrap(),
            "firewall-2.0.20210207"
        );
    }

    #[test]
    fn test_latest_firewall_image_ignores_input_order() {
        let mut shuffled = images();
        shuffled.reverse();
        shuffled.swap(0, 2);
        assert_eq!(
            latest_firewall_image(&shuffled).unwrap(),
            latest_firewall_image(&images()).unwrap()
        );
    }

    #[test]
    fn test_sort_orders_by_os_then_version_descending() {
        let sorted: Vec<String> = sort_firewall_images(&images())
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(
            sorted,
            vec![
                "firewall-2.0.20210207",
                "firewall-2.0.2020121",
                "firewall-ubuntu-2.0.20210316",
                "firewall-ubuntu-2.0.19700101",
            ]
        );
    }

    #[test]
    fn test_latest_of_empty_list_fails() {
        assert!(latest_firewall_image(&[]).is_err());
    }

    #[test]
    fn test_image_without_dash_fails() {
        assert!(FirewallImage::parse("firewall").is_err());
        assert!(FirewallImage::parse("firewall-latest").is_err());
    }

    #[test]
    fn test_patch_update() {
        assert!(
            is_firewall_patch_update("firewall-ubuntu-3.0.20240101", "firewall-ubuntu-3.0.20240201")
                .unwrap()
        );
        assert!(
            !is_firewall_patch_update("firewall-ubuntu-3.0.20240101", "firewall-ubuntu-3.1.20240101")
                .unwrap()
        );
        assert!(
            is_firewall_patch_update("firewall-ubuntu-3.0", "firewall-ubuntu-3.0.20240101").unwrap()
        );
        assert!(!is_firewall_patch_update("firewall-3.0.1", "firewall-ubuntu-3.0.1").unwrap());
    }

    #[test]
    fn test_parse_lenient_semver() {
        assert_eq!(parse_lenient_semver("v2").unwrap(), semver::Version::new(2, 0, 0));
        assert_eq!(parse_lenient_semver("2.1").unwrap(), semver::Version::new(2, 1, 0));
        assert_eq!(
            parse_lenient_semver("v1.2.3").unwrap(),
            semver::Version::new(1, 2, 3)
        );
        assert!(parse_lenient_semver("1.2-rc.1").is_some());
        assert!(parse_lenient_semver("latest").is_none());
        assert!(parse_lenient_semver("").is_none());
    }

    #[test]
    fn test_machine_id_round_trip() {
        let encoded = encode_machine_id("fra-equ01", "43c96a25-4328-4aed-9aae-426515bef162");
        assert_eq!(
            encoded,
            "metal:///fra-equ01/43c96a25-4328-4aed-9aae-426515bef162"
        );
        assert_eq!(
            decode_machine_id(&encoded),
            "43c96a25-4328-4aed-9aae-426515bef162"
        );
        assert_eq!(decode_machine_id("plain-id"), "plain-id");
    }

    #[test]
    fn test_find_metal_control_plane() {
        let mut cp = MetalControlPlane::default();
        cp.partitions.insert("muc".to_string(), Default::default());
        let mut config = CloudProfileConfig::default();
        config.metal_control_planes.insert("prod".to_string(), cp);

        let (name, _, _) = find_metal_control_plane(&config, "muc").unwrap();
        assert_eq!(name, "prod");
        assert!(find_metal_control_plane(&config, "fra").unwrap_err().is_not_found());
    }

    #[test]
    fn test_merge_iam_config_child_wins() {
        let parent = IamConfig {
            issuer_config: Some(IssuerConfig {
                url: "https://parent".to_string(),
                client_id: "parent-id".to_string(),
            }),
            ..Default::default()
        };
        let child = IamConfig {
            issuer_config: Some(IssuerConfig {
                url: String::new(),
                client_id: "child-id".to_string(),
            }),
            ..Default::default()
        };

        let merged = merge_iam_config(Some(&parent), Some(&child)).unwrap();
        let issuer = merged.issuer_config.unwrap();
        assert_eq!(issuer.url, "https://parent");
        assert_eq!(issuer.client_id, "child-id");

        assert_eq!(merge_iam_config(Some(&parent), None), Some(parent.clone()));
        assert_eq!(merge_iam_config(None, None), None);
    }
}
