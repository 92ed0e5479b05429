mod test_data_gen;

use chronoflow_core::prelude::*;
use chronoflow_operators::distinct::{Distinct, DistinctSpec};
use chronoflow_operators::unique::{Unique, UniqueSpec};
use chronoflow_operators::{OpError, Transformation};
use test_data_gen::{dataset, float_series, key, labels, run, series, PARENT};

fn distinct(spec: DistinctSpec, tables: &[Table]) -> Vec<Table> {
    let (ds, sink) = dataset();
    let mut op = Distinct::new(spec, ds);
    run(&mut op, tables);
    sink.tables()
}

fn unique(tables: &[Table]) -> Vec<Table> {
    let (ds, sink) = dataset();
    let mut op = Unique::new(UniqueSpec::default(), ds);
    run(&mut op, tables);
    sink.tables()
}

#[test]
fn distinct_emits_key_columns_and_values() {
    let k = key(&[("host", "a")]);
    let t = float_series(&k, &[1.0, 2.0, 1.0, 3.0, 2.0]).rechunk(&[2]).expect("rechunk");
    let out = distinct(DistinctSpec::default(), &[t]);
    assert_eq!(out.len(), 1);
    assert_eq!(labels(&out[0]), vec!["host", "_value"]);
    assert_eq!(
        out[0].column_by_label("_value"),
        Some(vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)])
    );
    assert_eq!(out[0].column_by_label("host"), Some(vec![Value::from("a"); 3]));
}

#[test]
fn distinct_is_idempotent() {
    let k = key(&[("host", "a")]);
    let t = series(&k, 0, 10, Column::from(vec![5i64, 5, 7, 5, 9]));
    let once = distinct(DistinctSpec::default(), &[t]);
    let twice = distinct(DistinctSpec::default(), &once);
    assert_eq!(once, twice);
}

#[test]
fn distinct_collapses_nans() {
    let t = float_series(&key(&[]), &[f64::NAN, 1.0, f64::NAN]);
    let out = distinct(DistinctSpec::default(), &[t]);
    assert_eq!(out[0].rows(), 2);
}

#[test]
fn distinct_of_missing_column_is_an_empty_string() {
    let spec = DistinctSpec {
        column: "nope".into(),
        ..DistinctSpec::default()
    };
    let out = distinct(spec, &[float_series(&key(&[("host", "a")]), &[1.0])]);
    let j = out[0].col_idx("_value").expect("value");
    assert_eq!(out[0].cols()[j].col_type, ColType::String);
    assert_eq!(out[0].column_by_label("_value"), Some(vec![Value::from("")]));
}

#[test]
fn distinct_of_key_column_is_the_key_value() {
    let spec = DistinctSpec {
        column: "host".into(),
        ..DistinctSpec::default()
    };
    let out = distinct(spec, &[float_series(&key(&[("host", "a")]), &[1.0, 2.0])]);
    assert_eq!(out[0].column_by_label("_value"), Some(vec![Value::from("a")]));
}

#[test]
fn unique_keeps_first_occurrence_rows() {
    let k = key(&[("host", "a")]);
    let t = float_series(&k, &[1.0, 2.0, 1.0, 3.0]).rechunk(&[1, 3]).expect("rechunk");
    let out = unique(&[t]);
    assert_eq!(
        out[0].column_by_label("_time"),
        Some(vec![
            Value::Time(Time::from_secs(0)),
            Value::Time(Time::from_secs(10)),
            Value::Time(Time::from_secs(30)),
        ])
    );
}

#[test]
fn unique_twice_equals_once() {
    let k = key(&[("host", "b")]);
    let t = float_series(&k, &[4.0, 4.0, 2.0, 4.0, 2.0]);
    let once = unique(&[t]);
    let twice = unique(&once);
    assert_eq!(once, twice);
}

#[test]
fn unique_requires_its_column() {
    let (ds, _sink) = dataset();
    let mut op = Unique::new(
        UniqueSpec {
            column: "nope".into(),
        },
        ds,
    );
    let err = op.process(PARENT, &float_series(&key(&[]), &[1.0]));
    assert!(matches!(err, Err(OpError::MissingColumn { .. })));
}
