//! Table-driven conformance tests
//!
//! Each file under `tests/suite/` uses the JSON-Schema-Test-Suite layout: a list
//! of groups with a `schema` and `tests` of `{description, data, valid}`.
//! `suite/remotes.json` maps URLs to the documents remote references load;
//! every group sees all of them.

use schemata::{CompileOptions, Dialect, JsonSchema};
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG=schemata=trace cargo test` shows compilation and resolution logs
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schemata=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn run_suite(name: &str, source: &str, dialect: Dialect) {
    init_tracing();
    let groups: Vec<Value> = serde_json::from_str(source).unwrap();
    let remotes: Map<String, Value> = serde_json::from_str(include_str!("suite/remotes.json")).unwrap();
    let options = CompileOptions::default().with_dialect(dialect);
    let mut failures = Vec::new();

    for group in &groups {
        let description = group["description"].as_str().unwrap_or_default();
        let mut schema = JsonSchema::compile(&group["schema"], &options)
            .unwrap_or_else(|e| panic!("{name}: '{description}' failed to compile: {e}"));
        for (url, remote) in &remotes {
            schema.add_remote_schema(url, remote).unwrap();
        }
        for case in group["tests"].as_array().unwrap() {
            let expected = case["valid"].as_bool().unwrap();
            let report = schema.validate(&case["data"]);
            if report.valid != expected {
                failures.push(format!(
                    "{name}: {description} / {}: expected valid={expected}, errors={:?}",
                    case["description"].as_str().unwrap_or_default(),
                    report.errors.iter().map(|e| &e.code).collect::<Vec<_>>()
                ));
            }
            // The report is valid exactly when it carries no errors
            assert_eq!(report.valid, report.errors.is_empty());
        }
    }

    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn test_draft4_suite() {
    run_suite("draft4", include_str!("suite/draft4.json"), Dialect::Draft04);
}

#[test]
fn test_draft6_suite() {
    run_suite("draft6", include_str!("suite/draft6.json"), Dialect::Draft06);
}

#[test]
fn test_draft7_suite() {
    run_suite("draft7", include_str!("suite/draft7.json"), Dialect::Draft07);
}

#[test]
fn test_draft2019_09_suite() {
    run_suite(
        "draft2019-09",
        include_str!("suite/draft2019-09.json"),
        Dialect::Draft2019_09,
    );
}

#[test]
fn test_draft2020_12_suite() {
    run_suite(
        "draft2020-12",
        include_str!("suite/draft2020-12.json"),
        Dialect::Draft2020_12,
    );
}
