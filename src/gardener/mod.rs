// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Host platform resource types.
//!
//! - [`garden`] - `Shoot`, `CloudProfile` and `Seed`
//! - [`extensions`] - `Infrastructure`, `Worker`, `ControlPlane` and `Cluster`

pub mod garden;
pub mod extensions;

#[cfg(test)]
mod extensions_tests;
