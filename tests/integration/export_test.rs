//! End-to-end export tests: fan-out over mock clients, then write the
//! consolidated results through each exporter.

use prismatic::db::{
    CommandKind, Column, Connection, Executor, Manager, MockDatabaseClient, ResultSet,
    RunOptions, Value,
};
use prismatic::export::{self, ExportOptions, OutputFormat};
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn export_options() -> RunOptions {
    RunOptions {
        use_cache: false,
        commit: false,
        command: CommandKind::Export,
    }
}

fn fleet_manager() -> Manager {
    let mut connections = HashMap::new();
    for (name, id) in [("alpha", 1), ("beta", 2), ("gamma", 3)] {
        let client = MockDatabaseClient::with_data(
            vec![
                Column::new(0, "id", "int64"),
                Column::new(1, "label", "string"),
            ],
            vec![vec![Value::Int(id), Value::String(format!("row_{name}"))]],
        );
        connections.insert(name.to_string(), Connection::ready(Box::new(client)));
    }
    Manager::from_connections(connections)
}

async fn fan_out(manager: &Manager) -> HashMap<String, ResultSet> {
    let executor = Executor::new(manager);
    let cancel = CancellationToken::new();
    let outcome = executor
        .run(&cancel, 4, "SELECT id, label FROM t", export_options(), &[])
        .await;

    assert!(outcome.errors.is_empty());
    outcome.results
}

#[tokio::test]
async fn merged_workbook_from_fan_out() {
    let manager = fleet_manager();
    let results = fan_out(&manager).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("fleet.xlsx");
    let options = ExportOptions::new(false, false, "connection".to_string());

    export::export(&results, &output, OutputFormat::Xlsx, &options).unwrap();

    assert!(output.exists());
    assert!(output.metadata().unwrap().len() > 0);
}

#[tokio::test]
async fn workbook_per_connection_from_fan_out() {
    let manager = fleet_manager();
    let results = fan_out(&manager).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("fleet.xlsx");
    let options = ExportOptions::new(true, false, "connection".to_string());

    export::export(&results, &output, OutputFormat::Xlsx, &options).unwrap();

    for name in ["alpha", "beta", "gamma"] {
        assert!(dir.path().join(format!("fleet_{name}.xlsx")).exists());
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn json_export_is_deterministic() {
    let manager = fleet_manager();
    let results = fan_out(&manager).await;

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");
    let options = ExportOptions::new(false, false, "connection".to_string());

    export::export(&results, &first, OutputFormat::Json, &options).unwrap();
    export::export(&results, &second, OutputFormat::Json, &options).unwrap();

    let first_content = std::fs::read_to_string(&first).unwrap();
    let second_content = std::fs::read_to_string(&second).unwrap();
    assert_eq!(first_content, second_content);

    // Name-sorted order in the document.
    let alpha = first_content.find("\"alpha\"").unwrap();
    let beta = first_content.find("\"beta\"").unwrap();
    let gamma = first_content.find("\"gamma\"").unwrap();
    assert!(alpha < beta && beta < gamma);
}

#[tokio::test]
async fn csv_export_splices_connection_names() {
    let manager = fleet_manager();
    let results = fan_out(&manager).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("fleet.csv");
    let options = ExportOptions::new(false, false, "connection".to_string());

    export::export(&results, &output, OutputFormat::Csv, &options).unwrap();

    let alpha = std::fs::read_to_string(dir.path().join("fleet_alpha.csv")).unwrap();
    assert!(alpha.starts_with("id,label"));
    assert!(alpha.contains("1,row_alpha"));
}

#[test]
fn format_inference_matches_cli_contract() {
    assert_eq!(
        OutputFormat::from_path(Path::new("report.xlsx")).unwrap(),
        OutputFormat::Xlsx
    );
    assert_eq!(
        OutputFormat::from_path(Path::new("report.csv")).unwrap(),
        OutputFormat::Csv
    );
    assert!(OutputFormat::from_path(Path::new("report")).is_err());
    assert!("parquet".parse::<OutputFormat>().is_err());
}
