// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider config schema generator
//!
//! Generates JSON schemas (as YAML) for the `v1alpha1` provider config wire
//! types defined in src/apis/v1alpha1.rs.
//!
//! Usage:
//!   cargo run --bin schemagen [output-dir]
//!
//! Files are written to deploy/schemas/ unless another directory is given.

use provider_metal::apis::v1alpha1::{
    CloudProfileConfig, ControlPlaneConfig, InfrastructureConfig, InfrastructureStatus,
    WorkerConfig, WorkerStatus,
};
use schemars::JsonSchema;
use std::fs;
use std::path::{Path, PathBuf};

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/apis/v1alpha1.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin schemagen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("deploy/schemas"), PathBuf::from);
    fs::create_dir_all(&output_dir)?;

    println!("Generating provider config schemas from src/apis/v1alpha1.rs...");

    generate_schema::<CloudProfileConfig>("cloudprofileconfig.schema.yaml", &output_dir)?;
    generate_schema::<InfrastructureConfig>("infrastructureconfig.schema.yaml", &output_dir)?;
    generate_schema::<InfrastructureStatus>("infrastructurestatus.schema.yaml", &output_dir)?;
    generate_schema::<ControlPlaneConfig>("controlplaneconfig.schema.yaml", &output_dir)?;
    generate_schema::<WorkerConfig>("workerconfig.schema.yaml", &output_dir)?;
    generate_schema::<WorkerStatus>("workerstatus.schema.yaml", &output_dir)?;

    println!("✓ Successfully generated schemas in {}", output_dir.display());
    Ok(())
}

fn generate_schema<T: JsonSchema>(filename: &str, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let schema = schemars::schema_for!(T);
    let yaml = serde_yaml::to_string(&schema)?;
    fs::write(output_dir.join(filename), format!("{COPYRIGHT_HEADER}{yaml}"))?;
    println!("  ✓ Generated {filename}");
    Ok(())
}
