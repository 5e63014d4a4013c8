//! End-to-End tests for the Contract Engine
//!
//! Full lifecycle: snapshot -> resolve -> build -> validate -> approve ->
//! registry -> drift on the next batch. Uses REAL SQLite databases - no mocks.

use canary_contract::{
    approve, build_contract, check_contract, detect_drift, gate_append, prepare_contract,
    resolve_columns, validate_contract, AppendDecision, Authority, ColumnDrift, Contract,
    ContractError, ContractIdentity, ContractStatus, ContractStorage, DraftRequest,
    DriftAcceptance, DriftConfig, Severity, StorageError, ViolationKind,
};
use canary_protocol::{
    ColumnRole, ColumnStat, LogicalType, Override, OverrideMap, ProfilingSnapshot, Suggestion,
    SuggestionReport,
};

fn identity(table: &str) -> ContractIdentity {
    ContractIdentity::new(table, 1, "test_user").with_source_path(format!("{}.csv", table))
}

fn draft(
    snapshot: &ProfilingSnapshot,
    suggestions: Option<&SuggestionReport>,
    overrides: &OverrideMap,
    table: &str,
) -> Contract {
    let columns = resolve_columns(snapshot, suggestions, overrides).unwrap();
    build_contract(columns, snapshot, identity(table)).unwrap()
}

fn approved_baseline(snapshot: &ProfilingSnapshot, table: &str) -> Contract {
    let contract = draft(snapshot, None, &OverrideMap::new(), table);
    approve(validate_contract(contract, None).unwrap(), "approver").unwrap()
}

// =============================================================================
// CONTRACT CREATION
// =============================================================================

fn users_snapshot(usr_id_nulls: f64) -> ProfilingSnapshot {
    ProfilingSnapshot::new(
        1000,
        vec![
            ColumnStat::new("usr_id", "Int64", usr_id_nulls, 1000),
            ColumnStat::new("amt", "Float64", 0.0, 950)
                .with_range(0.5, 990.0)
                .with_quantiles(100.0, 250.0, 500.0),
        ],
    )
}

fn primary_key_override() -> OverrideMap {
    let mut overrides = OverrideMap::new();
    overrides.insert(
        "usr_id".into(),
        Override::rename("user_id").with_role(ColumnRole::PrimaryKey),
    );
    overrides
}

/// Renamed primary key with clean statistics validates.
#[test]
fn test_scenario_a_primary_key_contract_validates() {
    let snapshot = users_snapshot(0.0);
    let contract = draft(&snapshot, None, &primary_key_override(), "users");
    let validated = validate_contract(contract, None).unwrap();

    assert_eq!(validated.status(), ContractStatus::Validated);
    let keys: Vec<_> = validated
        .physical_schema
        .iter()
        .filter(|c| c.role == ColumnRole::PrimaryKey)
        .collect();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].target_name, "user_id");
    assert_eq!(keys[0].source_name(), "usr_id");
    assert_eq!(keys[0].name_source, Authority::User);
    assert_eq!(keys[0].role_source, Authority::User);
    assert_eq!(keys[0].type_source, Authority::Original);

    let amt = validated.column("amt").unwrap();
    assert_eq!(amt.name_source, Authority::Original);
    assert!(validated.statistical_profile.get("user_id").is_some());
}

/// Nullable primary key fails on the nullability invariant only.
#[test]
fn test_scenario_b_nullable_primary_key_rejected() {
    let snapshot = users_snapshot(0.02);
    let contract = draft(&snapshot, None, &primary_key_override(), "users");

    match validate_contract(contract, None) {
        Err(ContractError::Validation(failure)) => {
            assert_eq!(failure.violations.len(), 1);
            assert_eq!(failure.violations[0].kind, ViolationKind::PrimaryKeyNullable);
            assert_eq!(failure.violations[0].column.as_deref(), Some("user_id"));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_ai_suggestions_fill_gaps_user_wins_conflicts() {
    let snapshot = ProfilingSnapshot::new(
        10,
        vec![
            ColumnStat::new("User ID", "Int64", 0.0, 10),
            ColumnStat::new("Order Total", "Float64", 0.0, 9),
            ColumnStat::new("created", "String", 0.0, 10),
        ],
    );
    let report = SuggestionReport::new(vec![Suggestion::new("User ID").with_name("user_id")]).merge(
        SuggestionReport::new(vec![
            Suggestion::new("Order Total")
                .with_name("order_total")
                .with_physical_type("Decimal(12,2)")
                .with_logical_type(LogicalType::Currency),
            Suggestion::new("created")
                .with_physical_type("Datetime")
                .with_logical_type(LogicalType::Timestamp),
        ]),
    );
    let mut overrides = OverrideMap::new();
    overrides.insert("Order Total".into(), Override::rename("total_amount"));

    let contract = draft(&snapshot, Some(&report), &overrides, "orders");
    let validated = validate_contract(contract, None).unwrap();

    let total = validated.column("total_amount").unwrap();
    assert_eq!(total.name_source, Authority::User);
    assert_eq!(total.physical_type, "Decimal(12,2)");
    assert_eq!(total.type_source, Authority::Ai);
    assert_eq!(total.role, ColumnRole::Metric);
    assert_eq!(total.ai_suggested_name.as_deref(), Some("order_total"));

    let created = validated.column("created").unwrap();
    assert_eq!(created.role, ColumnRole::EventMarker);
    assert_eq!(created.physical_type, "Datetime");

    assert_eq!(validated.target_names(), vec!["user_id", "total_amount", "created"]);
}

// =============================================================================
// VALIDATION INVARIANTS
// =============================================================================

#[test]
fn test_stale_override_rejected() {
    let snapshot = users_snapshot(0.0);
    let mut overrides = OverrideMap::new();
    overrides.insert("customer_id".into(), Override::rename("customer"));

    let err = resolve_columns(&snapshot, None, &overrides).unwrap_err();
    assert_eq!(err.columns, vec!["customer_id".to_string()]);
}

#[test]
fn test_two_independent_breaks_yield_two_violations() {
    let snapshot = users_snapshot(0.0);
    let mut overrides = OverrideMap::new();
    overrides.insert("usr_id".into(), Override::rename("user id"));
    overrides.insert("amt".into(), Override::default().with_type("Money"));

    let contract = draft(&snapshot, None, &overrides, "users");
    let violations = check_contract(&contract, None);
    let kinds: Vec<_> = violations.iter().map(|v| v.kind).collect();
    assert_eq!(
        kinds,
        vec![ViolationKind::InvalidTargetName, ViolationKind::UnsupportedType]
    );
}

#[test]
fn test_case_insensitive_collision_is_one_violation() {
    let snapshot = users_snapshot(0.0);
    let mut overrides = OverrideMap::new();
    overrides.insert("usr_id".into(), Override::rename("UserID"));
    overrides.insert("amt".into(), Override::rename("userid"));

    let contract = draft(&snapshot, None, &overrides, "users");
    let violations = check_contract(&contract, None);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::DuplicateTargetName);
}

#[test]
fn test_version_not_above_latest_rejected() {
    let snapshot = users_snapshot(0.0);
    for (version, latest) in [(1, Some(1)), (2, Some(3)), (3, Some(3)), (2, None)] {
        let mut contract = draft(&snapshot, None, &OverrideMap::new(), "users");
        contract.identity.version = version;
        let violations = check_contract(&contract, latest);
        assert!(
            violations.iter().any(|v| v.kind == ViolationKind::VersionNotMonotonic),
            "version {} against latest {:?} should be rejected",
            version,
            latest
        );
    }

    let mut contract = draft(&snapshot, None, &OverrideMap::new(), "users");
    contract.identity.version = 4;
    assert!(check_contract(&contract, Some(3)).is_empty());
}

// =============================================================================
// DRIFT
// =============================================================================

/// Null fraction 0.10 -> 0.40 is a single warning.
#[test]
fn test_scenario_c_null_drift_warning() {
    let baseline = approved_baseline(
        &ProfilingSnapshot::new(500, vec![ColumnStat::new("revenue", "Decimal(18,2)", 0.10, 400)]),
        "sales",
    );
    let snapshot = ProfilingSnapshot::new(520, vec![ColumnStat::new("revenue", "Decimal(18,2)", 0.40, 300)]);

    let report = detect_drift(&baseline, &snapshot, &DriftConfig::default());
    assert_eq!(report.columns.len(), 1);
    let revenue = report.column("revenue").unwrap();
    assert_eq!(revenue.severity, Severity::Warning);
    match &revenue.drift {
        ColumnDrift::NullDriftExceeded { before, after, .. } => {
            assert_eq!(*before, 0.10);
            assert_eq!(*after, 0.40);
        }
        other => panic!("expected null drift, got {:?}", other),
    }
    assert_eq!(report.severity, Severity::Warning);
    assert!(!report.blocks_append());
}

/// Dropped column is an error, added column a warning.
#[test]
fn test_scenario_d_dropped_and_added_columns() {
    let baseline = approved_baseline(
        &ProfilingSnapshot::new(
            100,
            vec![
                ColumnStat::new("a", "Int64", 0.0, 100),
                ColumnStat::new("b", "String", 0.0, 20),
            ],
        ),
        "events",
    );
    let snapshot = ProfilingSnapshot::new(
        100,
        vec![
            ColumnStat::new("a", "Int64", 0.0, 100),
            ColumnStat::new("c", "Boolean", 0.0, 2),
        ],
    );

    let report = detect_drift(&baseline, &snapshot, &DriftConfig::default());
    let b = report.column("b").unwrap();
    assert!(matches!(b.drift, ColumnDrift::SchemaDropped { .. }));
    assert_eq!(b.severity, Severity::Error);

    let c = report.column("c").unwrap();
    assert!(matches!(c.drift, ColumnDrift::SchemaAdded { .. }));
    assert_eq!(c.severity, Severity::Warning);

    assert_eq!(report.column("a").unwrap().drift, ColumnDrift::Unchanged);
    assert_eq!(report.severity, Severity::Error);
    assert!(report.blocks_append());
    assert!(gate_append(&report, None).is_err());
}

#[test]
fn test_health_report_serializes_tagged_drift() {
    let baseline = approved_baseline(
        &ProfilingSnapshot::new(10, vec![ColumnStat::new("a", "Int32", 0.0, 10)]),
        "t",
    );
    let snapshot = ProfilingSnapshot::new(10, vec![ColumnStat::new("a", "Int64", 0.0, 10)]);
    let report = detect_drift(&baseline, &snapshot, &DriftConfig::default());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["severity"], "warning");
    assert_eq!(json["columns"][0]["drift"]["kind"], "type_changed");
    assert_eq!(json["columns"][0]["drift"]["widening"], true);
}

// =============================================================================
// FULL LIFECYCLE WITH REGISTRY
// =============================================================================

#[tokio::test]
async fn test_full_lifecycle_with_registry() {
    let temp = tempfile::tempdir().unwrap();
    let storage = ContractStorage::open(&temp.path().join("contracts.sqlite3"))
        .await
        .unwrap();

    // v1
    let snapshot = users_snapshot(0.0);
    let overrides = primary_key_override();
    let latest = storage.latest_approved("users").await.unwrap();
    let v1 = prepare_contract(DraftRequest {
        snapshot: &snapshot,
        suggestions: None,
        overrides: &overrides,
        identity: identity("users"),
        latest_approved: latest.as_ref(),
    })
    .unwrap();
    let v1 = approve(v1, "alice").unwrap();
    storage.record_approved(&v1).await.unwrap();

    // Next batch drops `amt`
    let batch = ProfilingSnapshot::new(1200, vec![ColumnStat::new("usr_id", "Int64", 0.0, 1200)]);
    let baseline = storage.latest_approved("users").await.unwrap().unwrap();
    let report = detect_drift(&baseline, &batch, &DriftConfig::default());
    assert!(report.blocks_append());
    assert_eq!(report.row_count_delta, 200);

    let acceptance = DriftAcceptance::for_report(&report, "alice", "amt moved to another table");
    assert_eq!(
        gate_append(&report, Some(&acceptance)).unwrap(),
        AppendDecision::Accepted
    );

    // v2 reflects the new shape
    let v2 = prepare_contract(DraftRequest {
        snapshot: &batch,
        suggestions: None,
        overrides: &overrides,
        identity: identity("users"),
        latest_approved: Some(&baseline),
    })
    .unwrap();
    assert_eq!(v2.version(), 2);
    let v2 = approve(v2, "bob").unwrap();
    storage.record_approved(&v2).await.unwrap();

    // Replaying v2 loses the optimistic check
    let err = storage.record_approved(&v2).await.unwrap_err();
    assert!(matches!(err, StorageError::ConcurrentModification(_)));

    let history = storage.history("users").await.unwrap();
    let statuses: Vec<_> = history.iter().map(|c| c.status()).collect();
    assert_eq!(statuses, vec![ContractStatus::Superseded, ContractStatus::Approved]);

    let current = storage.latest_approved("users").await.unwrap().unwrap();
    let clean = detect_drift(&current, &batch, &DriftConfig::default());
    assert_eq!(clean.severity, Severity::Info);
    assert_eq!(gate_append(&clean, None).unwrap(), AppendDecision::Clear);
}
