// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider configuration types.
//!
//! - [`metal`] - internal types used by all controllers
//! - [`v1alpha1`] - the persisted wire format
//! - [`codec`] - decode/encode between raw extensions and internal types
//! - [`helper`] - lookups over the internal types

pub mod codec;
mod conversion;
pub mod helper;
pub mod metal;
pub mod v1alpha1;
