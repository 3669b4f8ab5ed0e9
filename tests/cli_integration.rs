//! CLI integration tests for herd
//!
//! These tests drive the binary end to end: a temp project is initialized,
//! then fields, animals and events are recorded through the commands.

use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const OWNER: &str = "ranch-a";

/// Get a command instance for the herd binary
fn herd_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("herd"));
    cmd.env_remove("HERD_OWNER").env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory and initialize a herd project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    herd_cmd().arg("init").arg(dir.path()).assert().success();
    dir
}

/// Runs a command in the project as the test owner
fn herd(dir: &TempDir, args: &[&str]) -> assert_cmd::assert::Assert {
    herd_cmd()
        .current_dir(dir.path())
        .args(["--owner", OWNER])
        .args(args)
        .assert()
}

/// Runs a command with `--format json` and parses stdout
fn herd_json(dir: &TempDir, args: &[&str]) -> Value {
    let output = herd_cmd()
        .current_dir(dir.path())
        .args(["--owner", OWNER, "--format", "json"])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// A project with fields North and South and animal A1 placed in North
fn setup_herd() -> TempDir {
    let dir = setup_project();
    herd(&dir, &["field", "add", "North", "--area", "10"]).success();
    herd(&dir, &["field", "add", "South", "--area", "4"]).success();
    herd(
        &dir,
        &["animal", "intake", "A1", "--breed", "Angus", "--sex", "female", "--field", "North", "--date", "2024-01-01"],
    )
    .success();
    dir
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    herd_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized herd project"));

    assert!(dir.path().join(".herd").is_dir());
    assert!(dir.path().join(".herd/config.toml").is_file());
    assert!(dir.path().join(".herd/.gitignore").is_file());
    assert!(dir.path().join(".herd/herd.db").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    herd_cmd().arg("init").arg(dir.path()).assert().success();
    herd_cmd().arg("init").arg(dir.path()).assert().success();
}

#[test]
fn test_commands_require_project() {
    let dir = TempDir::new().unwrap();

    herd_cmd()
        .current_dir(dir.path())
        .args(["--owner", OWNER, "field", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("herd init"));
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_field_add_and_list() {
    let dir = setup_project();

    herd(&dir, &["field", "add", "North", "--area", "10", "--location", "Hill"])
        .success()
        .stdout(predicate::str::contains("Created field"));

    herd(&dir, &["field", "list"])
        .success()
        .stdout(predicate::str::contains("North"))
        .stdout(predicate::str::contains("low"));
}

#[test]
fn test_duplicate_field_name_rejected() {
    let dir = setup_project();

    herd(&dir, &["field", "add", "North"]).success();
    herd(&dir, &["field", "add", "North"])
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_intake_places_animal() {
    let dir = setup_project();
    herd(&dir, &["field", "add", "North", "--area", "10"]).success();

    let intake = herd_json(
        &dir,
        &["animal", "intake", "A1", "--breed", "Angus", "--sex", "male", "--field", "North", "--date", "2024-01-01"],
    );

    assert_eq!(intake["animal"]["tag"], "A1");
    assert_eq!(intake["placement"], "placed");
    assert_eq!(intake["stay"]["entry_date"], "2024-01-01");
    assert_eq!(intake["status"]["general_status"], "active");
    assert_eq!(intake["status"]["health"], "healthy");
    assert_eq!(intake["status"]["productive_cycle"], "calf");
}

#[test]
fn test_intake_with_unknown_field_is_skipped() {
    let dir = setup_project();

    let intake = herd_json(
        &dir,
        &["animal", "intake", "A1", "--breed", "Angus", "--sex", "m", "--field", "Nowhere"],
    );

    assert_eq!(intake["placement"], "skipped");
    assert_eq!(intake["reason"], "No field named 'Nowhere'");
    let state = herd_json(&dir, &["state", "A1"]);
    assert_eq!(state["field"], Value::Null);
    assert_eq!(state["general_status"], "active");
}

#[test]
fn test_intake_with_unknown_field_reports_it() {
    let dir = setup_project();

    herd(&dir, &["animal", "intake", "A1", "--breed", "Angus", "--sex", "m", "--field", "Nowhere"])
        .success()
        .stdout(predicate::str::contains("not placed: No field named 'Nowhere'"));
}

#[test]
fn test_id_shaped_tag_resolves() {
    let dir = setup_herd();

    herd(&dir, &["animal", "intake", "a-1234567", "--breed", "Angus", "--sex", "f", "--field", "South"])
        .success();

    let state = herd_json(&dir, &["state", "a-1234567"]);
    assert_eq!(state["tag"], "a-1234567");
    assert_eq!(state["field_name"], "South");
}

#[test]
fn test_duplicate_tag_rejected() {
    let dir = setup_herd();

    herd(&dir, &["animal", "intake", "A1", "--breed", "Hereford", "--sex", "male"])
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_vaccine_add_and_vaccinate() {
    let dir = setup_herd();

    herd(&dir, &["vaccine", "add", "Aftosa", "--laboratory", "Lab One"])
        .success()
        .stdout(predicate::str::contains("Created vaccine"));

    herd(&dir, &["animal", "show", "A1"])
        .success()
        .stdout(predicate::str::contains("Pending vaccines: Aftosa"));

    herd(&dir, &["vaccinate", "A1", "aftosa", "--date", "2024-01-10", "--dose", "5ml"])
        .success()
        .stdout(predicate::str::contains("Vaccinated A1"));

    let vaccinations = herd_json(&dir, &["vaccinations", "--animal", "A1"]);
    assert_eq!(vaccinations.as_array().unwrap().len(), 1);
    assert_eq!(vaccinations[0]["dose"], "5ml");

    herd(&dir, &["animal", "show", "A1"])
        .success()
        .stdout(predicate::str::contains("Pending vaccines").not());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_transfer_then_sell() {
    let dir = setup_herd();

    herd(&dir, &["transfer", "A1", "South", "--date", "2024-02-01"])
        .success()
        .stdout(predicate::str::contains("Moved A1 from North to South"));

    let state = herd_json(&dir, &["state", "A1"]);
    assert_eq!(state["field_name"], "South");
    assert_eq!(state["since"], "2024-02-01");
    assert_eq!(state["general_status"], "transferred");

    let sale = herd_json(
        &dir,
        &["sell", "A1", "--buyer", "Buyer X", "--price", "500000", "--date", "2024-03-01"],
    );
    assert_eq!(sale["sale"]["buyer"], "Buyer X");
    assert_eq!(sale["closed_stay"]["exit_date"], "2024-03-01");

    let state = herd_json(&dir, &["state", "A1"]);
    assert_eq!(state["general_status"], "sold");
    assert_eq!(state["field"], Value::Null);

    let history = herd_json(&dir, &["animal", "history", "A1"]);
    let stays = history["stays"].as_array().unwrap();
    assert_eq!(stays.len(), 2);
    assert!(stays.iter().all(|stay| !stay["exit_date"].is_null()));

    let transfers = herd_json(&dir, &["transfers"]);
    assert_eq!(transfers.as_array().unwrap().len(), 1);
}

#[test]
fn test_transfer_to_current_field_is_noop() {
    let dir = setup_herd();

    let outcome = herd_json(&dir, &["transfer", "A1", "North", "--date", "2024-02-01"]);
    assert_eq!(outcome["outcome"], "already_there");

    let transfers = herd_json(&dir, &["transfers"]);
    assert_eq!(transfers, Value::Array(vec![]));

    herd(&dir, &["transfer", "A1", "North"])
        .success()
        .stdout(predicate::str::contains("already in North"));
}

#[test]
fn test_transfer_before_entry_rejected() {
    let dir = setup_herd();

    herd(&dir, &["transfer", "A1", "South", "--date", "2023-12-01"])
        .failure()
        .stderr(predicate::str::contains("Invalid input"));

    let state = herd_json(&dir, &["state", "A1"]);
    assert_eq!(state["field_name"], "North");
}

#[test]
fn test_sell_rejects_negative_price() {
    let dir = setup_herd();

    herd(&dir, &["sell", "A1", "--buyer", "Buyer X", "--price=-1"])
        .code(2)
        .stderr(predicate::str::contains("must not be negative"));

    let state = herd_json(&dir, &["state", "A1"]);
    assert_eq!(state["general_status"], "active");
}

#[test]
fn test_status_records_death() {
    let dir = setup_herd();

    herd(&dir, &["status", "A1", "--general", "dead", "--notes", "lightning"])
        .success()
        .stdout(predicate::str::contains("general=dead"));

    let state = herd_json(&dir, &["state", "A1"]);
    assert_eq!(state["general_status"], "dead");
    assert_eq!(state["productive_cycle"], "calf");

    herd(&dir, &["status", "A1"])
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn test_unknown_animal_reference() {
    let dir = setup_herd();

    herd(&dir, &["transfer", "ZZ", "South"])
        .failure()
        .stderr(predicate::str::contains("No animal tagged 'ZZ'"));
}

// =============================================================================
// Tenancy Tests
// =============================================================================

#[test]
fn test_other_owner_cannot_touch_records() {
    let dir = setup_herd();
    let fields = herd_json(&dir, &["field", "list"]);
    let north = fields[0]["id"].as_str().unwrap().to_string();

    let other = |args: &[&str]| {
        herd_cmd()
            .current_dir(dir.path())
            .args(["--owner", "ranch-b"])
            .args(args)
            .assert()
    };

    // Names are resolved per owner
    other(&["state", "A1"])
        .failure()
        .stderr(predicate::str::contains("No animal tagged 'A1'"));

    other(&["animal", "intake", "B1", "--breed", "Angus", "--sex", "f"]).success();
    other(&["transfer", "B1", &north])
        .failure()
        .stderr(predicate::str::contains("belongs to another owner"));

    other(&["field", "list"])
        .success()
        .stdout(predicate::str::contains("No fields found"));

    let occupancy = herd_json(&dir, &["occupancy", "North"]);
    assert_eq!(occupancy["count"], 1);
}

#[test]
fn test_owner_from_environment() {
    let dir = setup_herd();

    herd_cmd()
        .current_dir(dir.path())
        .env("HERD_OWNER", OWNER)
        .args(["state", "A1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("North"));
}

// =============================================================================
// Report Tests
// =============================================================================

#[test]
fn test_occupancy_levels() {
    let dir = setup_project();
    herd(&dir, &["field", "add", "Small", "--area", "1"]).success();
    for tag in ["T1", "T2", "T3"] {
        herd(&dir, &["animal", "intake", tag, "--breed", "Angus", "--sex", "f", "--field", "Small"]).success();
    }

    let occupancy = herd_json(&dir, &["occupancy", "Small"]);
    assert_eq!(occupancy["count"], 3);
    assert_eq!(occupancy["density"], 3.0);
    assert_eq!(occupancy["level"], "high");
    assert_eq!(occupancy["percent_of_recommended"], 150.0);
}

#[test]
fn test_dashboard_month_to_date() {
    let dir = setup_herd();
    herd(&dir, &["transfer", "A1", "South", "--date", "2024-03-05"]).success();
    herd(&dir, &["sell", "A1", "--buyer", "Buyer X", "--price", "1200.50", "--date", "2024-03-10"]).success();

    let dashboard = herd_json(&dir, &["dashboard", "--date", "2024-03-20"]);
    assert_eq!(dashboard["month_start"], "2024-03-01");
    assert_eq!(dashboard["fields"], 2);
    assert_eq!(dashboard["animals"], 1);
    assert_eq!(dashboard["animals_sold"], 1);
    assert_eq!(dashboard["transfers_this_month"], 1);
    assert_eq!(dashboard["sales_this_month"], "1200.50");
    assert_eq!(dashboard["avg_animals_per_field"], 0.5);

    herd(&dir, &["dashboard", "--date", "2024-03-20"])
        .success()
        .stdout(predicate::str::contains("Animals sold:          1"));
}

#[test]
fn test_market_prices() {
    let dir = setup_project();

    herd(&dir, &["price", "add", "steer", "--price", "1850.00", "--date", "2024-03-01"])
        .success()
        .stdout(predicate::str::contains("Recorded steer"));

    herd(&dir, &["price", "add", "steer", "--price", "1900", "--date", "2024-03-01"])
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let prices = herd_json(&dir, &["price", "list", "--category", "steer"]);
    assert_eq!(prices.as_array().unwrap().len(), 1);
}
