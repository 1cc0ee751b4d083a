// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the `nfse` binary against simulated configurations.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("nfse.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn simulated_config(dir: &Path) -> PathBuf {
    let log = dir.join("nfse_orchestrator.log");
    write_config(
        dir,
        &format!(
            r#"
[signing]
mode = "simulated"

[service]
mode = "simulated"

[polling]
max_attempts = 2
interval_secs = 1

[logging]
level = "info"
operation_log = "{}"
"#,
            log.display()
        ),
    )
}

fn nfse(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nfse"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .current_dir(config.parent().unwrap())
        .output()
        .unwrap()
}

#[test]
fn process_prints_workflow_result() {
    let dir = tempfile::tempdir().unwrap();
    let config = simulated_config(dir.path());

    let output = nfse(&config, &["process"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["sucesso"], true);
    assert_eq!(json["etapas_concluidas"].as_array().unwrap().len(), 6);
    assert_eq!(json["nfse_geradas"][0]["numero"], "000000001");
    assert!(json["protocolo"].as_str().unwrap().starts_with("TESTE_"));
}

#[test]
fn operation_log_accumulates_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = simulated_config(dir.path());

    assert!(nfse(&config, &["process"]).status.success());
    let after_first = std::fs::read_to_string(dir.path().join("nfse_orchestrator.log")).unwrap();
    assert!(after_first.contains("issuance workflow completed"));

    assert!(nfse(&config, &["process"]).status.success());
    let after_second = std::fs::read_to_string(dir.path().join("nfse_orchestrator.log")).unwrap();
    assert!(after_second.starts_with(&after_first));
    assert_eq!(after_second.matches("issuance workflow completed").count(), 2);
}

#[test]
fn status_of_simulated_batch_is_success() {
    let dir = tempfile::tempdir().unwrap();
    let config = simulated_config(dir.path());

    let output = nfse(&config, &["status", "TESTE_20250930112656"]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["situacao"], 4);
    assert_eq!(json["descricao"], "Processado com Sucesso");
}

#[test]
fn check_warns_for_simulated_modes() {
    let dir = tempfile::tempdir().unwrap();
    let config = simulated_config(dir.path());

    let output = nfse(&config, &["check", "--plain"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[OK]   Issuer"), "{stdout}");
    assert!(stdout.contains("[WARN] Signing"), "{stdout}");
}

#[test]
fn invalid_config_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[polling]\nmax_atempts = 3\n");

    let output = nfse(&config, &["process"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
