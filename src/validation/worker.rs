// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Validation of shoot worker pools.

use crate::errors::{FieldError, FieldErrorList, FieldPath};
use crate::gardener::garden::{CloudProfileSpec, ShootWorker};

/// Validate the worker pools of a shoot.
///
/// Volume overrides and zone lists are not supported on bare metal, and every
/// machine image must be offered by the cloud profile.
#[must_use]
pub fn validate_workers(
    workers: &[ShootWorker],
    profile: &CloudProfileSpec,
    path: &FieldPath,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    for (i, worker) in workers.iter().enumerate() {
        let worker_path = path.index(i);

        if worker.volume.is_some() {
            errors.push(FieldError::forbidden(
                &worker_path.child("volume"),
                "volumes are not supported",
            ));
        }
        if !worker.zones.is_empty() {
            errors.push(FieldError::forbidden(
                &worker_path.child("zones"),
                "zone spreading is not supported",
            ));
        }

        let image_path = worker_path.child("machine").child("image");
        match &worker.machine.image {
            None => errors.push(FieldError::required(&image_path, "machine image must be set")),
            Some(image) => match image.version.as_deref().filter(|v| !v.is_empty()) {
                None => errors.push(FieldError::required(
                    &image_path.child("version"),
                    "machine image version must be set",
                )),
                Some(version) => {
                    if !profile.offers_machine_image(&image.name, version) {
                        errors.push(FieldError::invalid(
                            &image_path,
                            format!("{}:{version}", image.name),
                            "machine image is not offered by the cloud profile",
                        ));
                    }
                }
            },
        }
    }

    errors
}
