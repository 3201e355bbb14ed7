// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Container images this extension was built against.
//!
//! The image vector is embedded at compile time. Setting
//! `IMAGEVECTOR_OVERWRITE` to a YAML file in the same format replaces
//! entries with matching names and appends new ones.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::errors::{Error, Result};

/// Environment variable naming an image vector override file
pub const IMAGEVECTOR_OVERWRITE_ENV: &str = "IMAGEVECTOR_OVERWRITE";

const EMBEDDED_IMAGE_VECTOR: &str = include_str!("../imagevector/images.yaml");

/// One container image
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_repository: String,
    pub repository: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

impl ImageSource {
    /// `repository:tag`, or the bare repository if untagged
    #[must_use]
    pub fn image(&self) -> String {
        if self.tag.is_empty() {
            self.repository.clone()
        } else {
            format!("{}:{}", self.repository, self.tag)
        }
    }
}

/// Named list of images
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVector {
    #[serde(default)]
    pub images: Vec<ImageSource>,
}

impl ImageVector {
    /// Parse an image vector from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] if the document is malformed.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// The embedded image vector with the override file of
    /// `IMAGEVECTOR_OVERWRITE` applied, if set.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded vector or the override is malformed,
    /// or the override file cannot be read.
    pub fn load() -> Result<Self> {
        let mut vector = Self::from_yaml(EMBEDDED_IMAGE_VECTOR)?;
        if let Ok(path) = std::env::var(IMAGEVECTOR_OVERWRITE_ENV) {
            if !path.is_empty() {
                info!(path = %path, "applying image vector override");
                vector.overwrite(Self::from_file(Path::new(&path))?);
            }
        }
        Ok(vector)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidProviderConfig(format!("reading image vector {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    /// Replace entries by name and append unknown ones.
    pub fn overwrite(&mut self, other: ImageVector) {
        for image in other.images {
            match self.images.iter_mut().find(|i| i.name == image.name) {
                Some(existing) => *existing = image,
                None => self.images.push(image),
            }
        }
    }

    /// Look up an image by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ImageSource> {
        self.images.iter().find(|i| i.name == name)
    }

    /// Look up an image by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the image is not part of the vector.
    pub fn get(&self, name: &str) -> Result<&ImageSource> {
        self.find(name)
            .ok_or_else(|| Error::Internal(format!("image {name} not found in image vector")))
    }
}

#[cfg(test)]
#[path = "imagevector_tests.rs"]
mod imagevector_tests;
