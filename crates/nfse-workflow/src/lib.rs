// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Issuance workflow for the NFSe batch issuer.
//!
//! The [`Orchestrator`] drives a batch from pending records to generated
//! invoices, using the [`StatusPoller`] and [`ResultRetriever`] for the
//! asynchronous half of the exchange with the municipality.

pub mod orchestrator;
pub mod poller;
pub mod result;
pub mod retriever;
pub mod shutdown;
pub mod source;

pub use orchestrator::Orchestrator;
pub use poller::{PollOutcome, PollingPolicy, StatusPoller};
pub use result::{WorkflowResult, WorkflowStep};
pub use retriever::{ResultRetriever, RetrievalError, RetrievalResult};
pub use shutdown::install_signal_handler;
pub use source::{ClockBatchNumbers, SampleInvoiceSource};
