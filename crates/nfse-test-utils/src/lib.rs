// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for NFSe integration tests.
//!
//! - [`ScriptedService`]: an `InvoiceService` replaying queued status codes
//!   and counting calls
//! - [`fixtures`]: sample records, batches, fixed sources, and generated
//!   signing credentials

pub mod fixtures;
pub mod scripted_service;

pub use fixtures::{FixedBatchNumber, StaticSource, TestCredentials};
pub use scripted_service::ScriptedService;
