use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const DETAIL: &str = "cd_paciente,dt_atendimento,tp_atendimento,sn_fechada,cd_multi_empresa,vl_em_aberto,tipo
1,30/06/2024,Urgencia,S,1,\"1000,00\",CONTA
1,30/05/2024,Urgencia,S,1,500,CONTA
2,10/01/2022,Internacao,S,1,800,CONTA EXTRA
3,01/02/2024,Internacao,N,2,700,CONTA
4,01/03/2021,Ambulatorio,N,2,50,CONTA
";

fn delinquency_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("delinquency"));
    cmd.env_remove("DELINQUENCY_USER")
        .env_remove("DELINQUENCY_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn setup_config(temp_dir: &TempDir) -> PathBuf {
    let config_path = temp_dir.path().join("delinquency-config");
    delinquency_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();
    config_path
}

fn setup_with_data(temp_dir: &TempDir) -> PathBuf {
    let config_path = setup_config(temp_dir);
    fs::write(config_path.join("data").join("dados.csv"), DETAIL).unwrap();
    config_path
}

fn cmd_in(config_path: &Path) -> Command {
    let mut cmd = delinquency_cmd();
    cmd.args(["-C", config_path.to_str().unwrap()]);
    cmd
}

#[test]
fn test_help() {
    delinquency_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Billing delinquency reports"));
}

#[test]
fn test_version() {
    delinquency_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("delinquency"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("delinquency-config");

    delinquency_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized delinquency config"));

    assert!(config_path.join("config.toml").exists());
    assert!(config_path.join("data").join("annotations").is_dir());
}

#[test]
fn test_init_fails_if_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    cmd_in(&config_path)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    cmd_in(&config_path)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config directory not found"));
}

#[test]
fn test_status_without_data() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    cmd_in(&config_path)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Detail file:      not found"));
}

#[test]
fn test_status_lists_filters() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Records:          5"))
        .stdout(predicate::str::contains("2021, 2022, 2024"))
        .stdout(predicate::str::contains("Companies:        1, 2"));
}

#[test]
fn test_summary() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("R$ 1.500,00"))
        .stdout(predicate::str::contains("R$ 2.200,00"))
        .stdout(predicate::str::contains("Total"));
}

#[test]
fn test_summary_without_detail_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);

    cmd_in(&config_path)
        .arg("summary")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No detail CSV found"));
}

#[test]
fn test_top_ranks_by_window_sum() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .args(["top", "recent-closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("R$ 1.500,00"))
        .stdout(predicate::str::contains("30/06/2024"));
}

#[test]
fn test_top_rejects_bad_as_of() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .args(["top", "aged-open", "--as-of", "30/06/2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn test_top_rejects_as_of_without_room_for_aged_window() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .args(["top", "aged-closed", "--as-of=-262143-01-05"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn test_top_warns_when_amount_column_is_missing() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_config(&temp_dir);
    fs::write(
        config_path.join("data").join("dados.csv"),
        "cd_paciente,dt_atendimento,tp_atendimento,sn_fechada\n1,30/06/2024,Urgencia,S\n",
    )
    .unwrap();

    cmd_in(&config_path)
        .args(["top", "recent-closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Warning: Column 'vl_em_aberto' is missing"))
        .stderr(predicate::str::contains("vl_em_aberto"));

    cmd_in(&config_path)
        .arg("summary")
        .assert()
        .success()
        .stderr(predicate::str::contains("amounts are zero"));
}

#[test]
fn test_monthly_lists_totals_by_type() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .args(["monthly", "--state", "closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("By type: Urgencia 1,5k (2)"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_annotate_then_top_and_notes() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .args(["annotate", "recent-closed", "1", "--cause", "disputed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved note for patient 1"));

    assert!(config_path
        .join("data/annotations/top_15_inadimplentes_12_meses.csv")
        .exists());

    cmd_in(&config_path)
        .args(["top", "recent-closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disputed"));

    cmd_in(&config_path)
        .args(["notes", "recent-closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disputed"))
        .stdout(predicate::str::contains("06/2024"));

    cmd_in(&config_path)
        .args(["notes", "aged-closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No case notes stored"));
}

#[test]
fn test_annotate_unranked_patient() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .args(["annotate", "recent-closed", "3", "--status", "paid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not listed"));
}

#[test]
fn test_annotate_requires_a_change() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .args(["annotate", "recent-closed", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to change"));
}

#[test]
fn test_dashboard_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    let output = cmd_in(&config_path)
        .args(["dashboard", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["closed"]["recent"]["rows"][0]["patient_id"], "1");
    assert_eq!(json["closed"]["aged"]["rows"][0]["patient_id"], "2");
    assert_eq!(json["open"]["recent"]["rows"][0]["patient_id"], "3");
    assert_eq!(json["open"]["aged"]["rows"][0]["patient_id"], "4");
    assert_eq!(json["windows"]["reference"], "2024-06-30");
    assert!(json["notices"][0]
        .as_str()
        .unwrap()
        .contains("Monthly totals file not found"));
}

#[test]
fn test_dashboard_tables() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);

    cmd_in(&config_path)
        .args(["dashboard", "--company", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Top offenders - open accounts, last 12 months"))
        .stdout(predicate::str::contains("Reference date 01/02/2024"));
}

#[test]
fn test_annual_with_totals() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);
    fs::write(
        config_path.join("data").join("totais_mensais.csv"),
        "mes_ano,vl_total,qtd_contas\n01/06/2024,15000,20\n01/01/2022,8000,10\n",
    )
    .unwrap();

    cmd_in(&config_path)
        .args(["annual", "--state", "closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10,0%"))
        .stdout(predicate::str::contains("100,0%"));
}

#[test]
fn test_export() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);
    let output = temp_dir.path().join("export.csv");

    cmd_in(&config_path)
        .args(["export", "--output", output.to_str().unwrap(), "--company", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 records"));

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("cd_paciente,dt_atendimento"));
    assert!(content.contains("10/01/2022"));
}

#[test]
fn test_auth_requires_credentials() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = setup_with_data(&temp_dir);
    let config_file = config_path.join("config.toml");
    let mut config = fs::read_to_string(&config_file).unwrap();
    config.push_str("\n[auth]\nurl = \"http://127.0.0.1:9/roles\"\nportal_url = \"http://portal.local/\"\n");
    fs::write(&config_file, config).unwrap();

    cmd_in(&config_path)
        .arg("summary")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing credentials"));
}
