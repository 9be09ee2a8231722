mod common;

use tabular_intake::{
    ImportConfig, ImportPipeline, build_keyed_row,
    data::CellValue,
    error::FormatError,
    file_type::FileType,
    matcher::{MatchType, NewColumnProposal, OverrideTarget, apply_override},
    sanitize::{SanitizedValue, WarningType, sanitize_row},
    schema::{ColumnDefinition, ColumnType, Schema},
};

use common::{TestWorkspace, fixture_bytes, fixture_path, inventory_columns, strings};

#[test]
fn csv_scenario_sanitizes_without_warnings() {
    let pipeline = ImportPipeline::default();
    let parsed = pipeline
        .parse_file("stock.csv", b"name,qty,price\nWidget, 10 ,$19.99\n")
        .unwrap();
    assert_eq!(parsed.file_type, FileType::Csv);
    assert_eq!(parsed.suggested_header_row, 0);

    let headers = parsed.headers(parsed.suggested_header_row);
    assert_eq!(headers, strings(&["name", "qty", "price"]));
    let columns = inventory_columns();
    let mappings = pipeline.auto_match(&headers, &columns);
    assert_eq!(mappings[0].match_type, MatchType::Exact);
    assert_eq!(mappings[1].match_type, MatchType::Alias);
    assert_eq!(mappings[2].match_type, MatchType::Exact);

    let data = parsed.data_rows(parsed.suggested_header_row);
    let keyed = build_keyed_row(&data[0], &mappings);
    let result = sanitize_row(&keyed, &columns);
    assert_eq!(result.warning_count, 0);
    assert_eq!(result.data["c1"], Some(SanitizedValue::Text("Widget".to_string())));
    assert_eq!(result.data["c2"], Some(SanitizedValue::Number(10.0)));
    assert_eq!(result.data["c3"], Some(SanitizedValue::Number(19.99)));
}

#[test]
fn fixture_import_report() {
    let schema = Schema::load(&fixture_path("schema.yml")).unwrap();
    let columns: Vec<_> = schema.ordered_columns().into_iter().cloned().collect();
    let pipeline = ImportPipeline::default();
    let parsed = pipeline
        .parse_file("inventory.csv", &fixture_bytes("inventory.csv"))
        .unwrap();
    assert_eq!(parsed.suggested_header_row, 1);

    let headers = parsed.headers(1);
    let mappings = pipeline.auto_match(&headers, &columns);
    let targets: Vec<(Option<&str>, MatchType)> = mappings
        .iter()
        .map(|m| (m.schema_column_id.as_deref(), m.match_type))
        .collect();
    assert_eq!(
        targets,
        vec![
            (Some("c1"), MatchType::Alias),
            (Some("c2"), MatchType::Alias),
            (Some("c3"), MatchType::Alias),
            (Some("c4"), MatchType::Fuzzy),
            (Some("c5"), MatchType::Alias),
            (Some("c6"), MatchType::Exact),
        ]
    );

    let report = pipeline.sanitize(parsed.data_rows(1), &mappings, &columns).unwrap();
    assert_eq!(report.rows.len(), 4);
    assert_eq!(report.total_warnings, 4);
    assert_eq!(report.rows_with_warnings, 3);
    for warning_type in [
        WarningType::CurrencyParsing,
        WarningType::Whitespace,
        WarningType::NumberExtraction,
        WarningType::DateParsing,
    ] {
        assert_eq!(report.warnings_by_type.get(&warning_type), Some(&1), "{warning_type:?}");
    }

    let widget = &report.rows[0];
    assert_eq!(widget.warning_count, 0);
    assert_eq!(widget.data["c4"], Some(SanitizedValue::Date("2024-01-15".to_string())));

    let sprocket = &report.rows[2];
    assert_eq!(sprocket.data["c1"], Some(SanitizedValue::Text("Sprocket Large".to_string())));
    assert_eq!(sprocket.data["c3"], Some(SanitizedValue::Number(-4.5)));
    assert_eq!(sprocket.data["c4"], Some(SanitizedValue::Date("2024-03-15".to_string())));

    let bolt = &report.rows[3];
    assert_eq!(bolt.data["c2"], None);
    assert!(!bolt.warnings.contains_key("c2"));
    assert_eq!(bolt.warnings["c4"].warning_type, WarningType::DateParsing);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["totalWarnings"], 4);
    assert_eq!(json["warningsByType"]["date_parsing"], 1);
    assert_eq!(json["rows"][1]["data"]["c3"], 1234.56);
}

#[test]
fn overrides_feed_sanitization() {
    let columns = inventory_columns();
    let pipeline = ImportPipeline::default();
    let parsed = pipeline
        .parse_file("feed.json", &fixture_bytes("stock.json"))
        .unwrap();
    let headers = parsed.headers(0);
    let mut mappings = pipeline.auto_match(&headers, &columns);
    let sku = headers.iter().position(|h| h == "sku").unwrap();
    assert!(mappings[sku].skip);

    let price = headers.iter().position(|h| h == "price").unwrap();
    apply_override(
        &mut mappings,
        sku,
        OverrideTarget::NewColumn(NewColumnProposal {
            name: "SKU".into(),
            column_type: ColumnType::Text,
        }),
        &columns,
    )
    .unwrap();
    apply_override(&mut mappings, price, OverrideTarget::Skip, &columns).unwrap();

    let report = pipeline.sanitize(parsed.data_rows(0), &mappings, &columns).unwrap();
    assert_eq!(report.rows[0].data["c3"], None);
    assert_eq!(report.rows[0].data["c2"], Some(SanitizedValue::Number(3.0)));
    assert_eq!(report.total_warnings, 0);
}

#[test]
fn format_errors_are_typed() {
    let pipeline = ImportPipeline::default();
    assert!(matches!(
        pipeline.parse_file("notes.txt", b"x"),
        Err(FormatError::UnsupportedFileType(_))
    ));
    assert_eq!(pipeline.parse_file("empty.csv", b"\n"), Err(FormatError::EmptyFile));

    let small = ImportPipeline::new(&ImportConfig {
        reader: tabular_intake::config::ReaderConfig {
            max_file_size_bytes: 4,
            ..Default::default()
        },
        ..ImportConfig::default()
    });
    assert!(matches!(
        small.parse_file("big.csv", b"name,qty\n"),
        Err(FormatError::FileTooLarge { .. })
    ));
}

#[test]
fn config_file_changes_heuristics() {
    let workspace = TestWorkspace::new();
    let config_path = workspace.write(
        "intake.yml",
        "header:\n  scan_rows: 1\nmatching:\n  fuzzy_threshold: 0.95\n",
    );
    let config = ImportConfig::load(&config_path).unwrap();
    let pipeline = ImportPipeline::new(&config);
    let parsed = pipeline
        .parse_file("inventory.csv", &fixture_bytes("inventory.csv"))
        .unwrap();
    assert_eq!(parsed.suggested_header_row, 0);

    let schema = Schema::load(&fixture_path("schema.yml")).unwrap();
    let mappings = pipeline.auto_match(&parsed.headers(1), &schema.columns);
    assert_eq!(mappings[3].schema_column_id, None);
    assert_eq!(mappings[3].match_type, MatchType::None);
    assert_eq!(
        build_keyed_row(&[CellValue::text("only")], &mappings).get("c6"),
        Some(&CellValue::Empty)
    );
}

#[test]
fn workbook_dates_sanitize_to_iso() {
    let pipeline = ImportPipeline::default();
    let parsed = pipeline
        .parse_file("stock.xlsx", &fixture_bytes("stock.xlsx"))
        .unwrap();
    assert_eq!(parsed.file_type, FileType::Xlsx);
    assert_eq!(parsed.suggested_header_row, 0);

    let headers = parsed.headers(0);
    assert_eq!(&headers[1..], &strings(&["Name", "Qty", "Received"])[..]);
    let columns = vec![
        ColumnDefinition::new("c1", "Name", ColumnType::Text),
        ColumnDefinition::new("c2", "Received", ColumnType::Date),
    ];
    let mappings = pipeline.auto_match(&headers, &columns);
    let report = pipeline.sanitize(parsed.data_rows(0), &mappings, &columns).unwrap();
    assert_eq!(report.total_warnings, 0);
    assert_eq!(report.rows[0].data["c2"], Some(SanitizedValue::Date("2024-01-15".to_string())));
    assert_eq!(report.rows[1].data["c1"], Some(SanitizedValue::Text("Gadget".to_string())));
}

