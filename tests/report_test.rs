use std::fs;

use textlens::model::DocModel;
use textlens::report::{self, Table, MAX_COLS};
use textlens::TextlensError;

fn small_table() -> Table {
    Table::numeric(
        vec!["doc a".into(), "doc b".into()],
        vec!["x".into(), "y, z".into()],
        vec![vec![1.0, 0.5], vec![0.0, 2.0]],
    )
    .unwrap()
}

fn wide_table() -> Table {
    Table::numeric(
        vec!["only".into()],
        (0..MAX_COLS).map(|i| format!("w{i}")).collect(),
        vec![vec![1.0; MAX_COLS]],
    )
    .unwrap()
}

#[test]
fn report_writes_one_csv_per_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("result.xlsx");
    let sheets = vec![
        ("counts".to_string(), small_table()),
        ("summary".to_string(), small_table().summary()),
    ];
    let written = report::write_report(&out, &sheets, true).unwrap();
    assert_eq!(
        written,
        vec![dir.path().join("result_counts.csv"), dir.path().join("result_summary.csv")]
    );

    let counts = fs::read_to_string(&written[0]).unwrap();
    let lines: Vec<&str> = counts.lines().collect();
    assert_eq!(lines[0], ",x,\"y, z\"");
    assert_eq!(lines[1], "doc a,1,0.5");
    assert_eq!(lines[2], "doc b,0,2");
}

#[test]
fn report_oversized_sheet_falls_back_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("big.csv");
    let sheets = vec![("small".to_string(), small_table()), ("wide".to_string(), wide_table())];
    let written = report::write_report(&out, &sheets, true).unwrap();
    assert_eq!(written, vec![dir.path().join("big.json")]);

    let text = fs::read_to_string(&written[0]).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["name"], "small");
    assert_eq!(arr[0]["index"][1], "doc b");
    assert_eq!(arr[0]["rows"][1][1], 2.0);
    assert_eq!(arr[1]["columns"].as_array().unwrap().len(), MAX_COLS);
    assert!(!dir.path().join("big_small.csv").exists());
}

#[test]
fn report_oversized_without_fallback_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("big.csv");
    let sheets = vec![("wide".to_string(), wide_table())];
    let err = report::write_report(&out, &sheets, false).unwrap_err();
    assert!(matches!(err, TextlensError::Configuration(_)));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn report_missing_directory_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nope").join("out.csv");
    let err = report::write_report(&out, &[("s".to_string(), small_table())], true).unwrap_err();
    assert_eq!(err.kind().as_str(), "io");
}

#[test]
fn report_failed_sheet_removes_earlier_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("run.csv");
    // A directory where the second sheet should go makes that write fail.
    fs::create_dir(dir.path().join("run_second.csv")).unwrap();
    let sheets = vec![
        ("first".to_string(), small_table()),
        ("second".to_string(), small_table()),
    ];
    assert!(report::write_report(&out, &sheets, true).is_err());
    assert!(!dir.path().join("run_first.csv").exists());
    assert!(dir.path().join("run_second.csv").is_dir());
}

#[test]
fn model_report_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let model = DocModel::new(
        vec![vec![0.25, 0.75]],
        vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        vec!["alpha".into(), "beta".into()],
        Some(vec!["intro".into()]),
    )
    .unwrap();
    let written = model
        .write_report(&dir.path().join("topics"), "topic", true, true)
        .unwrap();
    assert_eq!(written.len(), 2);

    let mut rdr = csv::Reader::from_path(&written[0]).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["", "topic0", "topic1"]);
    let row = rdr.records().next().unwrap().unwrap();
    assert_eq!(&row[0], "intro");
    assert_eq!(row[2].parse::<f64>().unwrap(), 0.75);

    let terms = fs::read_to_string(&written[1]).unwrap();
    assert!(terms.starts_with(",alpha,beta"));
}
