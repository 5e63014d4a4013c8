//! End-to-end CLI flow over temp files and a real SQLite registry.

use canary::cli::approve::{self, ApproveArgs};
use canary::cli::config::CanaryConfig;
use canary::cli::draft::{self, DraftArgs};
use canary::cli::drift::{self, DriftArgs};
use canary::cli::history::{self, HistoryArgs};
use canary::cli::show::{self, ShowArgs};
use canary::cli::CliContext;
use canary_contract::{ContractStatus, Severity};
use canary_protocol::ColumnRole;
use std::path::{Path, PathBuf};

const SNAPSHOT_V1: &str = r#"{
    "row_count": 4,
    "columns": [
        {"source_name": "usr_id", "physical_type": "Int64", "null_fraction": 0.0, "distinct_count": 4},
        {"source_name": "amt", "physical_type": "Float64", "null_fraction": 0.0, "distinct_count": 4,
         "quantiles": {"p25": 10.0, "p50": 20.0, "p75": 30.0}, "min": 5.0, "max": 40.0},
        {"source_name": "status", "physical_type": "String", "null_fraction": 0.0, "distinct_count": 2,
         "top_values": [{"value": "open", "count": 3}, {"value": "closed", "count": 1}]}
    ]
}"#;

const SUGGESTIONS: &str = r#"{
    "suggestions": [
        {"column_name": "amt", "suggested_name": "amount", "suggested_logical_type": "CURRENCY",
         "suggested_polars_type": "Decimal(10,2)", "reasoning": "monetary values"},
        {"column_name": "status", "suggested_logical_type": "CATEGORY"}
    ]
}"#;

const OVERRIDES: &str = r#"{
    "usr_id": {"target_name": "user_id", "role": "PRIMARY_KEY"}
}"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn context(dir: &Path) -> CliContext {
    CliContext {
        config: CanaryConfig::default(),
        registry_path: dir.join("registry").join("contracts.sqlite3"),
    }
}

fn draft_args(dir: &Path, snapshot: PathBuf, out: &str) -> DraftArgs {
    DraftArgs {
        table: "orders".to_string(),
        snapshot,
        suggestions: vec![write(dir, "suggestions.json", SUGGESTIONS)],
        overrides: Some(write(dir, "overrides.json", OVERRIDES)),
        sources: vec!["s3://raw/orders.csv".to_string()],
        target_path: Some("s3://curated/orders".to_string()),
        created_by: "tester".to_string(),
        out: Some(dir.join(out)),
        json: false,
    }
}

fn drift_args(snapshot: PathBuf) -> DriftArgs {
    DriftArgs {
        table: "orders".to_string(),
        snapshot,
        accept: false,
        accepted_by: None,
        note: String::new(),
        json: false,
    }
}

#[test]
fn test_draft_approve_drift_history() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path();
    let ctx = context(dir);
    let snapshot = write(dir, "batch1.json", SNAPSHOT_V1);

    // draft
    let contract_path = draft::run(&ctx, draft_args(dir, snapshot.clone(), "orders.v1.json")).unwrap();
    let written = std::fs::read_to_string(&contract_path).unwrap();
    assert!(written.contains("\"status\": \"validated\""));

    // approve
    let approved = approve::run(
        &ctx,
        ApproveArgs {
            contract: contract_path.clone(),
            approved_by: "alice".to_string(),
        },
    )
    .unwrap();
    assert_eq!(approved.version(), 1);
    let key = approved.primary_key().unwrap();
    assert_eq!(key.target_name, "user_id");
    assert_eq!(approved.column("amount").unwrap().physical_type, "Decimal(10,2)");
    assert_eq!(approved.column("status").unwrap().role, ColumnRole::Category);

    // approving the same file again is stale
    let err = approve::run(
        &ctx,
        ApproveArgs {
            contract: contract_path,
            approved_by: "bob".to_string(),
        },
    )
    .unwrap_err();
    assert!(format!("{:?}", err).contains("version_not_monotonic"));

    // same batch shape: no drift
    let report = drift::run(&ctx, drift_args(snapshot.clone())).unwrap();
    assert_eq!(report.severity, Severity::Info);

    // dropped column blocks until accepted
    let dropped = write(
        dir,
        "batch2.json",
        r#"{"row_count": 4, "columns": [
            {"source_name": "usr_id", "physical_type": "Int64", "null_fraction": 0.0, "distinct_count": 4},
            {"source_name": "amt", "physical_type": "Float64", "null_fraction": 0.0, "distinct_count": 4}
        ]}"#,
    );
    let err = drift::run(&ctx, drift_args(dropped.clone())).unwrap_err();
    assert!(format!("{:?}", err).contains("status"));

    let accepted = drift::run(
        &ctx,
        DriftArgs {
            accept: true,
            accepted_by: Some("alice".to_string()),
            note: "status retired".to_string(),
            ..drift_args(dropped)
        },
    )
    .unwrap();
    assert!(accepted.blocks_append());

    // v2, then history shows supersession
    let v2_path = draft::run(&ctx, draft_args(dir, snapshot, "orders.v2.json")).unwrap();
    let v2 = approve::run(
        &ctx,
        ApproveArgs {
            contract: v2_path,
            approved_by: "carol".to_string(),
        },
    )
    .unwrap();
    assert_eq!(v2.version(), 2);

    let history = history::run(
        &ctx,
        HistoryArgs {
            table: "orders".to_string(),
            json: true,
        },
    )
    .unwrap();
    let statuses: Vec<_> = history.iter().map(|c| c.status()).collect();
    assert_eq!(statuses, vec![ContractStatus::Superseded, ContractStatus::Approved]);

    let first = show::run(
        &ctx,
        ShowArgs {
            table: "orders".to_string(),
            version: Some(1),
            json: false,
        },
    )
    .unwrap();
    assert_eq!(first.status(), ContractStatus::Superseded);
    assert_eq!(first.identity.approved_by.as_deref(), Some("alice"));
}

#[test]
fn test_draft_reports_every_violation() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path();
    let ctx = context(dir);
    let snapshot = write(
        dir,
        "batch.json",
        r#"{"row_count": 10, "columns": [
            {"source_name": "usr_id", "physical_type": "Int64", "null_fraction": 0.2, "distinct_count": 8},
            {"source_name": "amt", "physical_type": "Float64", "null_fraction": 0.0, "distinct_count": 10}
        ]}"#,
    );

    let mut args = draft_args(dir, snapshot, "bad.json");
    args.suggestions.clear();
    let err = draft::run(&ctx, args).unwrap_err();
    let text = format!("{:?}", err);
    assert!(text.contains("2 violation(s)"));
    assert!(text.contains("primary_key_nullable"));
    assert!(text.contains("primary_key_not_unique"));
    assert!(!dir.join("bad.json").exists());
}

#[test]
fn test_drift_without_contract_is_helpful() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = context(temp.path());
    let snapshot = write(temp.path(), "batch.json", SNAPSHOT_V1);

    let err = drift::run(&ctx, drift_args(snapshot)).unwrap_err();
    let text = format!("{:?}", err);
    assert!(text.contains("No approved contract for table 'orders'"));
    assert!(text.contains("canary draft"));
}

#[test]
fn test_stale_override_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path();
    let ctx = context(dir);
    let snapshot = write(dir, "batch.json", SNAPSHOT_V1);

    let mut args = draft_args(dir, snapshot, "out.json");
    args.overrides = Some(write(dir, "stale.json", r#"{"customer": {"target_name": "c"}}"#));
    let err = draft::run(&ctx, args).unwrap_err();
    assert!(format!("{:?}", err).contains("customer"));
}
