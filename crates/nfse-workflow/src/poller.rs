// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded status polling for a submitted batch.
//!
//! Every query, successful or not, spends one attempt of the same budget.
//! Attempts are separated by a fixed interval; there is no sleep after the
//! last one. The sleep races the shutdown token so a pending poll can be
//! abandoned without waiting out the interval.

use std::sync::Arc;
use std::time::Duration;

use nfse_config::model::PollingConfig;
use nfse_core::{InvoiceService, ProcessingStatus, Protocol, ServiceFailure, StatusReport};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Attempt budget and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollingPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            interval: config.interval(),
        }
    }
}

/// How a polling loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The batch reached SUCCESS.
    Succeeded(StatusReport),
    /// The batch reached ERROR.
    Failed(StatusReport),
    /// The budget ran out without a terminal status.
    TimedOut {
        attempts: u32,
        last_status: Option<ProcessingStatus>,
    },
    /// The last attempt failed to obtain any status.
    PersistentFailure {
        attempts: u32,
        failure: ServiceFailure,
    },
    /// The shutdown token fired between attempts.
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// The last business status observed, if any.
    pub fn status(&self) -> Option<ProcessingStatus> {
        match self {
            Self::Succeeded(report) | Self::Failed(report) => Some(report.status),
            Self::TimedOut { last_status, .. } => *last_status,
            Self::PersistentFailure { .. } | Self::Cancelled { .. } => None,
        }
    }
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded(report) | Self::Failed(report) => {
                write!(f, "batch {} ended with status {}", report.protocol, report.status)
            }
            Self::TimedOut {
                attempts,
                last_status: Some(status),
            } => write!(
                f,
                "no terminal status after {attempts} attempts (last: {status})"
            ),
            Self::TimedOut { attempts, .. } => {
                write!(f, "no terminal status after {attempts} attempts")
            }
            Self::PersistentFailure { attempts, failure } => {
                write!(f, "status query failed on attempt {attempts}: {failure}")
            }
            Self::Cancelled { attempts } => {
                write!(f, "polling cancelled after {attempts} attempts")
            }
        }
    }
}

/// Queries a batch status until it is terminal or the budget is spent.
#[derive(Clone)]
pub struct StatusPoller {
    service: Arc<dyn InvoiceService>,
    policy: PollingPolicy,
    shutdown: CancellationToken,
}

impl StatusPoller {
    pub fn new(
        service: Arc<dyn InvoiceService>,
        policy: PollingPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            service,
            policy,
            shutdown,
        }
    }

    pub fn policy(&self) -> PollingPolicy {
        self.policy
    }

    pub async fn poll(&self, protocol: &Protocol) -> PollOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_status = None;

        info!(
            protocol = %protocol,
            max_attempts,
            interval_secs = self.policy.interval.as_secs(),
            "polling batch status"
        );

        for attempt in 1..=max_attempts {
            if self.shutdown.is_cancelled() {
                return PollOutcome::Cancelled {
                    attempts: attempt - 1,
                };
            }

            match self.service.query_status(protocol).await {
                Ok(report) => {
                    debug!(protocol = %protocol, attempt, status = %report.status, "status received");
                    match report.status {
                        ProcessingStatus::Success => {
                            info!(protocol = %protocol, attempt, "batch processed successfully");
                            return PollOutcome::Succeeded(report);
                        }
                        ProcessingStatus::Error => {
                            warn!(protocol = %protocol, attempt, "batch processing failed");
                            return PollOutcome::Failed(report);
                        }
                        status => last_status = Some(status),
                    }
                }
                Err(failure) => {
                    warn!(protocol = %protocol, attempt, error = %failure, "status query failed");
                    if attempt == max_attempts {
                        return PollOutcome::PersistentFailure {
                            attempts: attempt,
                            failure,
                        };
                    }
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!(protocol = %protocol, attempt, "polling cancelled by shutdown");
                        return PollOutcome::Cancelled { attempts: attempt };
                    }
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }
        }

        warn!(protocol = %protocol, attempts = max_attempts, "polling budget exhausted");
        PollOutcome::TimedOut {
            attempts: max_attempts,
            last_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfse_test_utils::ScriptedService;

    fn poller(service: Arc<ScriptedService>, max_attempts: u32) -> StatusPoller {
        StatusPoller::new(
            service,
            PollingPolicy {
                max_attempts,
                interval: Duration::from_secs(15),
            },
            CancellationToken::new(),
        )
    }

    fn protocol() -> Protocol {
        Protocol("987654".into())
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_processing_states() {
        let service = Arc::new(ScriptedService::new("987654").with_statuses([2, 2, 2, 4]));

        let outcome = poller(service.clone(), 10).poll(&protocol()).await;

        assert!(outcome.is_success());
        assert_eq!(service.status_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn never_terminal_times_out_after_budget() {
        let service = Arc::new(ScriptedService::new("987654").with_statuses([2]));
        let started = tokio::time::Instant::now();

        let outcome = poller(service.clone(), 3).poll(&protocol()).await;

        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                attempts: 3,
                last_status: Some(ProcessingStatus::Processing),
            }
        );
        assert_eq!(service.status_calls(), 3);
        // two sleeps between three attempts, none after the last
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn error_status_stops_immediately() {
        let service = Arc::new(ScriptedService::new("987654").with_statuses([2, 3]));

        let outcome = poller(service.clone(), 10).poll(&protocol()).await;

        assert!(matches!(outcome, PollOutcome::Failed(ref r) if r.status == ProcessingStatus::Error));
        assert_eq!(service.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_spend_the_same_budget() {
        let service = Arc::new(ScriptedService::new("987654").with_status_script([
            Err(ServiceFailure::transport("connection reset")),
            Ok(2),
            Ok(4),
        ]));

        let outcome = poller(service.clone(), 5).poll(&protocol()).await;

        assert!(outcome.is_success());
        assert_eq!(service.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_on_last_attempt_is_persistent() {
        let service = Arc::new(ScriptedService::new("987654").with_status_script([
            Ok(2),
            Err(ServiceFailure::timeout("request timed out")),
        ]));

        let outcome = poller(service.clone(), 2).poll(&protocol()).await;

        match outcome {
            PollOutcome::PersistentFailure { attempts, failure } => {
                assert_eq!(attempts, 2);
                assert_eq!(failure.code, "TIMEOUT");
            }
            other => panic!("expected persistent failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_the_sleep() {
        let service = Arc::new(ScriptedService::new("987654").with_statuses([2]));
        let shutdown = CancellationToken::new();
        let poller = StatusPoller::new(
            service.clone(),
            PollingPolicy {
                max_attempts: 20,
                interval: Duration::from_secs(15),
            },
            shutdown.clone(),
        );

        let handle = tokio::spawn(async move { poller.poll(&Protocol("987654".into())).await });
        tokio::time::sleep(Duration::from_secs(20)).await;
        shutdown.cancel();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, PollOutcome::Cancelled { attempts: 2 });
        assert_eq!(service.status_calls(), 2);
    }

    #[test]
    fn display_mentions_attempts() {
        let outcome = PollOutcome::TimedOut {
            attempts: 20,
            last_status: Some(ProcessingStatus::Processing),
        };
        assert_eq!(
            outcome.to_string(),
            "no terminal status after 20 attempts (last: 2 - Processando)"
        );
    }
}
