// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `worker.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::{FieldErrorType, FieldPath};
    use crate::gardener::garden::{
        CloudProfileMachineImage, CloudProfileSpec, MachineImageVersion, ShootMachine,
        ShootMachineImage, ShootWorker,
    };

    fn profile() -> CloudProfileSpec {
        CloudProfileSpec {
            machine_images: vec![CloudProfileMachineImage {
                name: "ubuntu".to_string(),
                versions: vec![MachineImageVersion {
                    version: "22.04".to_string(),
                }],
            }],
            ..Default::default()
        }
    }

    fn worker(image: Option<(&str, Option<&str>)>) -> ShootWorker {
        ShootWorker {
            name: "pool-a".to_string(),
            machine: ShootMachine {
                machine_type: "c1-xlarge-x86".to_string(),
                image: image.map(|(name, version)| ShootMachineImage {
                    name: name.to_string(),
                    version: version.map(str::to_string),
                }),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_worker() {
        let workers = vec![worker(Some(("ubuntu", Some("22.04"))))];
        assert!(validate_workers(&workers, &profile(), &FieldPath::new("workers")).is_empty());
    }

    #[test]
    fn test_volume_and_zones_forbidden() {
        let mut w = worker(Some(("ubuntu", Some("22.04"))));
        w.volume = Some(serde_json::json!({"size": "20Gi"}));
        w.zones = vec!["partition-a".to_string()];

        let errors = validate_workers(&[w], &profile(), &FieldPath::new("workers"));
        let summary: Vec<(FieldErrorType, &str)> = errors
            .iter()
            .map(|e| (e.error_type, e.field.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (FieldErrorType::Forbidden, "workers[0].volume"),
                (FieldErrorType::Forbidden, "workers[0].zones"),
            ]
        );
    }

    #[test]
    fn test_machine_image_checks() {
        let workers = vec![
            worker(None),
            worker(Some(("ubuntu", None))),
            worker(Some(("debian", Some("12")))),
        ];
        let errors = validate_workers(&workers, &profile(), &FieldPath::new("workers"));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "workers[0].machine.image",
                "workers[1].machine.image.version",
                "workers[2].machine.image",
            ]
        );
    }
}
