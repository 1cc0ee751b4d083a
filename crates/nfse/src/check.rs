// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nfse check`: pre-flight diagnostics before talking to the municipality.
//!
//! Checks the issuer identity and endpoints, then loads the signing key
//! and signs and verifies a sample batch offline. Nothing is sent.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use nfse_config::{NfseConfig, ServiceMode, SigningMode};
use nfse_core::{Batch, BatchNumberSource, InvoiceSource, ProviderIdentity};
use nfse_signer::{sign_document, verify, CredentialSource, SigningCredential, SigningStrategy};
use nfse_workflow::{ClockBatchNumbers, SampleInvoiceSource};

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Runs every check and prints the report. Returns `false` if any failed.
pub async fn run_check(config: &NfseConfig, plain: bool) -> bool {
    let results = collect_checks(config).await;
    print_report(&results, !plain && std::io::stdout().is_terminal());
    results.iter().all(|r| r.status != CheckStatus::Fail)
}

pub async fn collect_checks(config: &NfseConfig) -> Vec<CheckResult> {
    let mut results = vec![check_issuer(config), check_endpoints(config)];

    match config.signing.mode {
        SigningMode::Skip => results.push(CheckResult::new(
            "Signing",
            CheckStatus::Warn,
            "disabled (signing.mode = \"skip\"), batches go out unsigned",
            Instant::now(),
        )),
        SigningMode::Simulated => results.push(CheckResult::new(
            "Signing",
            CheckStatus::Warn,
            "simulated (signing.mode = \"simulated\"), no real signature",
            Instant::now(),
        )),
        SigningMode::Xmldsig => {
            let start = Instant::now();
            let source = match (
                &config.signing.key_path,
                &config.signing.certificate_path,
                nfse_config::signing_passphrase(config),
            ) {
                (Some(key), Some(cert), Ok(passphrase)) => {
                    CredentialSource::new(key, cert, passphrase)
                }
                (_, _, Err(e)) => {
                    results.push(CheckResult::new("Credential", CheckStatus::Fail, e.to_string(), start));
                    return results;
                }
                _ => {
                    results.push(CheckResult::new(
                        "Credential",
                        CheckStatus::Fail,
                        "key_path and certificate_path are required",
                        start,
                    ));
                    return results;
                }
            };

            let (result, credential) = check_credential(&source);
            results.push(result);
            if let Some(credential) = credential {
                results.push(
                    check_signature(
                        &credential,
                        config.issuer.identity(),
                        &config.issuer.codigo_municipio,
                    )
                    .await,
                );
            }
        }
    }

    results
}

fn check_issuer(config: &NfseConfig) -> CheckResult {
    let start = Instant::now();
    let identity = config.issuer.identity();
    if nfse_core::taxid::is_valid_cnpj(&identity.cnpj) {
        CheckResult::new(
            "Issuer",
            CheckStatus::Pass,
            format!(
                "CNPJ {} / IM {} / municipality {}",
                identity.cnpj, identity.inscricao_municipal, config.issuer.codigo_municipio
            ),
            start,
        )
    } else {
        CheckResult::new(
            "Issuer",
            CheckStatus::Fail,
            format!("CNPJ {} fails its check digits", identity.cnpj),
            start,
        )
    }
}

fn check_endpoints(config: &NfseConfig) -> CheckResult {
    let start = Instant::now();
    match config.service.mode {
        ServiceMode::Simulated => CheckResult::new(
            "Web service",
            CheckStatus::Warn,
            "simulated (service.mode = \"simulated\"), endpoints unused",
            start,
        ),
        ServiceMode::Live => CheckResult::new(
            "Web service",
            CheckStatus::Pass,
            format!(
                "{} (timeouts {}s connect / {}s total)",
                config.endpoints.recepcionar_lote_rps,
                config.service.connect_timeout_secs,
                config.service.request_timeout_secs
            ),
            start,
        ),
    }
}

fn check_credential(source: &CredentialSource) -> (CheckResult, Option<SigningCredential>) {
    let start = Instant::now();
    match source.load() {
        Ok(credential) => (
            CheckResult::new(
                "Credential",
                CheckStatus::Pass,
                format!("key loaded from {}", source.key_path().display()),
                start,
            ),
            Some(credential),
        ),
        Err(e) => (
            CheckResult::new("Credential", CheckStatus::Fail, e.to_string(), start),
            None,
        ),
    }
}

/// Signs a one-record sample batch and verifies it with the same key.
async fn check_signature(
    credential: &SigningCredential,
    provider: ProviderIdentity,
    municipality_code: &str,
) -> CheckResult {
    let start = Instant::now();
    let records = match SampleInvoiceSource::new(municipality_code).pending_invoices().await {
        Ok(records) => records,
        Err(e) => return CheckResult::new("Signature", CheckStatus::Fail, e.to_string(), start),
    };
    let batch = Batch::new(ClockBatchNumbers::new().next_batch_number(), provider, records);

    let outcome = nfse_xml::build_batch(&batch).and_then(|mut document| {
        sign_document(&mut document, &SigningStrategy::default(), credential)?;
        let signed = document.to_bytes()?;
        verify(&signed, credential.public_key())
    });

    match outcome {
        Ok(report) => CheckResult::new(
            "Signature",
            CheckStatus::Pass,
            format!("sample batch signed and verified ({} references)", report.references.len()),
            start,
        ),
        Err(e) => CheckResult::new("Signature", CheckStatus::Fail, e.to_string(), start),
    }
}

fn print_report(results: &[CheckResult], use_color: bool) {
    use colored::Colorize;

    println!();
    println!("  nfse check");
    println!();

    let mut issues = 0;
    for result in results {
        let duration_ms = result.duration.as_millis();
        let (tag, symbol, message) = match result.status {
            CheckStatus::Pass => ("[OK]  ", "✓".green(), result.message.normal()),
            CheckStatus::Warn => ("[WARN]", "!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("[FAIL]", "✗".red(), result.message.red()),
        };
        if result.status != CheckStatus::Pass {
            issues += 1;
        }

        if use_color {
            println!("    {symbol} {:<12} {message} ({duration_ms}ms)", result.name);
        } else {
            println!("    {tag} {:<12} {} ({duration_ms}ms)", result.name, result.message);
        }
    }

    println!();
    match issues {
        0 => println!("  All checks passed."),
        1 => println!("  1 issue found."),
        n => println!("  {n} issues found."),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfse_test_utils::TestCredentials;
    use secrecy::SecretString;

    fn simulated_config() -> NfseConfig {
        nfse_config::load_and_validate_str(
            "[signing]\nmode = \"simulated\"\n\n[service]\nmode = \"simulated\"\n",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn simulated_modes_warn_without_failing() {
        let results = collect_checks(&simulated_config()).await;

        let statuses: Vec<_> = results.iter().map(|r| (r.name.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("Issuer", CheckStatus::Pass),
                ("Web service", CheckStatus::Warn),
                ("Signing", CheckStatus::Warn),
            ]
        );
    }

    #[test]
    fn invalid_cnpj_fails_issuer_check() {
        let mut config = simulated_config();
        config.issuer.cnpj = "32649500000146".into();

        assert_eq!(check_issuer(&config).status, CheckStatus::Fail);
    }

    #[tokio::test]
    async fn generated_key_signs_and_verifies() {
        let credentials = TestCredentials::generate().unwrap();
        let source = CredentialSource::new(
            credentials.key_path(),
            credentials.certificate_path(),
            SecretString::from(credentials.passphrase().to_string()),
        );

        let (loaded, credential) = check_credential(&source);
        assert_eq!(loaded.status, CheckStatus::Pass);

        let signed = check_signature(
            &credential.unwrap(),
            simulated_config().issuer.identity(),
            "2700102",
        )
        .await;
        assert_eq!(signed.status, CheckStatus::Pass, "{}", signed.message);
        assert!(signed.message.contains("2 references"));
    }

    #[test]
    fn wrong_passphrase_fails_credential_check() {
        let credentials = TestCredentials::generate().unwrap();
        let source = CredentialSource::new(
            credentials.key_path(),
            credentials.certificate_path(),
            SecretString::from("senha-errada".to_string()),
        );

        let (result, credential) = check_credential(&source);
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(credential.is_none());
    }

    #[tokio::test]
    async fn missing_passphrase_variable_fails() {
        let mut config = simulated_config();
        config.signing.mode = SigningMode::Xmldsig;
        config.signing.key_path = Some("/nonexistent/key.pem".into());
        config.signing.certificate_path = Some("/nonexistent/cert.pem".into());
        config.signing.passphrase_env = "NFSE_TEST_CHECK_UNSET_VAR".into();

        let results = collect_checks(&config).await;

        let last = results.last().unwrap();
        assert_eq!(last.name, "Credential");
        assert_eq!(last.status, CheckStatus::Fail);
    }
}
