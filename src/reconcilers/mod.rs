// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controllers of the extension resources.
//!
//! Every controller follows the same pattern, implemented once in
//! [`operation::run`]:
//!
//! 1. **Filter** - Skip resources of other providers
//! 2. **Dispatch** - Pick reconcile, delete, migrate or restore from the
//!    deletion timestamp and the operation annotation
//! 3. **Act** - Run the resource's [`operation::Actuator`]
//! 4. **Status** - Record the last operation (or error) in the status
//!
//! # Available Controllers
//!
//! - [`infrastructure`] - Private network and firewall of a shoot
//! - [`worker`] - Machine classes, machine deployments and firewall deployment
//! - [`controlplane`] - Values of the control plane charts
//!
//! # Example
//!
//! ```rust,no_run
//! use provider_metal::context::Context;
//! use provider_metal::reconcilers::{controlplane, infrastructure, worker};
//! use std::sync::Arc;
//!
//! async fn run_all(ctx: Arc<Context>) {
//!     tokio::join!(
//!         infrastructure::run_controller(ctx.clone(), 5),
//!         worker::run_controller(ctx.clone(), 5),
//!         controlplane::run_controller(ctx, 5),
//!     );
//! }
//! ```

pub mod common;
pub mod controlplane;
pub mod finalizers;
pub mod infrastructure;
pub mod operation;
pub mod resources;
pub mod retry;
pub mod status;
pub mod worker;

#[cfg(test)]
pub(crate) mod fixtures;

pub use controlplane::ControlPlaneActuator;
pub use infrastructure::InfrastructureActuator;
pub use operation::{Actuator, Operation, Outcome};
pub use worker::WorkerActuator;
