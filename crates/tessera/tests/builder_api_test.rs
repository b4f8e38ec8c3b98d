//! Integration tests for the SchemaBuilder API
//!
//! These tests verify that the public API works and is usable.

use std::io::Write;

use tessera::{
    DefaultObserver, ErrorCode, Flags, RawItem, SchemaBuilder, TesseraError,
    config::AppConfig,
    location::SourceLocation,
    report::{Reportable, Source},
    typeinfo::FundamentalKind,
    value::Value,
};

#[test]
fn test_builder_api_exists() {
    let _builder = SchemaBuilder::default();
}

#[test]
fn test_analyze_simple_schema() {
    let roots = vec![
        RawItem::fundamental("name", FundamentalKind::String),
        RawItem::object("Person").with_child(RawItem::reference("name", "name")),
    ];

    let builder = SchemaBuilder::default();
    let result = builder.analyze(roots, &DefaultObserver::default());
    assert!(
        result.is_ok(),
        "Should analyze valid schema: {:?}",
        result.err()
    );
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "[metadata.default]").unwrap();
    writeln!(file, "max_length = 16").unwrap();

    let config = AppConfig::from_path(file.path()).expect("Failed to load config");
    let builder = SchemaBuilder::new(config);
    let tree = builder
        .analyze(
            vec![RawItem::fundamental("name", FundamentalKind::String)],
            &DefaultObserver::default(),
        )
        .expect("Failed to analyze");

    let type_info = tree.find("name").unwrap().type_info().unwrap();
    assert!(type_info.validate(&Value::from("x".repeat(16))).is_ok());
    assert!(type_info.validate(&Value::from("x".repeat(17))).is_err());
}

#[test]
fn test_config_requires_observer_support() {
    let config = AppConfig::from_toml_str("[metadata.default]\nmax_length = 16\n").unwrap();
    let observer = DefaultObserver::default().without(Flags::CONFIG_DECLARATIONS);

    let err = SchemaBuilder::new(config)
        .analyze(
            vec![RawItem::fundamental("name", FundamentalKind::String)],
            &observer,
        )
        .unwrap_err();
    assert_eq!(err.diagnostic().map(|d| d.code()), Some(ErrorCode::E400));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::from_path(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, TesseraError::Io(_)));
}

#[test]
fn test_error_report_points_into_source() {
    let source = "Person {\n  id: int\n  id: string\n}\n";
    let at = |line| SourceLocation::new("person.tsr", line, 3);
    let roots = vec![
        RawItem::object("Person")
            .with_location(SourceLocation::new("person.tsr", 1, 1))
            .with_child(RawItem::fundamental("id", FundamentalKind::Integer).with_location(at(2)))
            .with_child(RawItem::fundamental("id", FundamentalKind::String).with_location(at(3))),
    ];

    let err = SchemaBuilder::default()
        .analyze(roots, &DefaultObserver::default())
        .unwrap_err();
    let report = Reportable::new(&err, Some(Source::new("person.tsr", source)));

    let mut out = String::new();
    miette::GraphicalReportHandler::new_themed(miette::GraphicalTheme::unicode_nocolor())
        .render_report(&mut out, &report)
        .unwrap();
    assert!(out.contains("E201"), "{out}");
    assert!(out.contains("first declared here"), "{out}");
}
