// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote service implementations for the NFSe batch issuer.
//!
//! [`AbacoService`] speaks SOAP to the municipality's ABRASF endpoints;
//! [`SimulatedService`] answers in-process for homologation dry runs.

pub mod client;
pub mod envelope;
pub mod responses;
pub mod service;
pub mod simulated;

use std::sync::Arc;

use nfse_config::{NfseConfig, ServiceMode};
use nfse_core::{InvoiceService, NfseError};

pub use client::SoapClient;
pub use service::AbacoService;
pub use simulated::SimulatedService;

/// Builds the service selected by `service.mode`.
pub fn service_from_config(config: &NfseConfig) -> Result<Arc<dyn InvoiceService>, NfseError> {
    match config.service.mode {
        ServiceMode::Simulated => Ok(Arc::new(SimulatedService)),
        ServiceMode::Live => {
            let client = SoapClient::new(
                config.service.connect_timeout(),
                config.service.request_timeout(),
                config.service.soap_namespace.clone(),
            )?;
            Ok(Arc::new(AbacoService::new(
                client,
                config.endpoints.clone(),
                config.issuer.identity(),
            )))
        }
    }
}
