// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nfse process`: one run of the issuance workflow.

use std::sync::Arc;

use nfse_config::NfseConfig;
use nfse_core::NfseError;
use nfse_workflow::{Orchestrator, PollingPolicy, SampleInvoiceSource, WorkflowResult};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wires the configured service and signer into an orchestrator.
pub fn build_orchestrator(
    config: &NfseConfig,
    shutdown: CancellationToken,
) -> Result<Orchestrator, NfseError> {
    let service = nfse_abaco::service_from_config(config)?;
    let signer = nfse_signer::signer_from_config(config)?;
    let source = Arc::new(SampleInvoiceSource::new(
        config.issuer.codigo_municipio.clone(),
    ));

    info!(
        service = service.name(),
        signing = signer.mode(),
        max_attempts = config.polling.max_attempts,
        "workflow configured"
    );

    Ok(
        Orchestrator::new(source, signer, service, config.issuer.identity())
            .with_polling(PollingPolicy::from(&config.polling))
            .with_shutdown(shutdown),
    )
}

pub async fn run_process(
    config: &NfseConfig,
    shutdown: CancellationToken,
) -> Result<WorkflowResult, NfseError> {
    let orchestrator = build_orchestrator(config, shutdown)?;
    Ok(orchestrator.run().await)
}
