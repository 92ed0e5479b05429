//! Table generators and drivers shared by the integration suites.
#![allow(dead_code)]

use chronoflow_core::prelude::*;
use chronoflow_operators::Transformation;

pub const PARENT: DatasetId = DatasetId::new(1);
pub const OUTPUT: DatasetId = DatasetId::new(100);

/// A fresh output dataset and the sink it writes to.
pub fn dataset() -> (Dataset, CollectingSink) {
    let sink = CollectingSink::new();
    (Dataset::new(OUTPUT, Box::new(sink.clone())), sink)
}

pub fn key(pairs: &[(&str, &str)]) -> GroupKey {
    GroupKey::from_pairs(pairs.iter().map(|(l, v)| (*l, *v)))
}

/// `_time`, the string key columns of `key`, then `_value`.
///
/// Row `i` is stamped `start_secs + i * step_secs`.
pub fn series(key: &GroupKey, start_secs: i64, step_secs: i64, values: Column) -> Table {
    let n = values.len();
    let times: Vec<Time> = (0..n as i64)
        .map(|i| Time::from_secs(start_secs + i * step_secs))
        .collect();
    let mut cols = vec![ColMeta::new("_time", ColType::Time)];
    let mut columns = vec![Column::from(times)];
    for (c, v) in key.iter() {
        cols.push(c.clone());
        let mut col = Column::new(c.col_type);
        for _ in 0..n {
            col.push_value(v.clone()).expect("key value");
        }
        columns.push(col);
    }
    cols.push(ColMeta::new("_value", values.col_type()));
    columns.push(values);
    Table::from_columns(key.clone(), cols, columns).expect("series table")
}

pub fn float_series(key: &GroupKey, values: &[f64]) -> Table {
    series(key, 0, 10, Column::from(values.to_vec()))
}

/// `count` rows of a float series, one every `step_secs`, from `start_secs`.
pub fn ramp(key: &GroupKey, start_secs: i64, step_secs: i64, count: usize) -> Table {
    let values: Vec<f64> = (0..count).map(|i| i as f64).collect();
    series(key, start_secs, step_secs, Column::from(values))
}

/// Feed every table from [`PARENT`], then finish cleanly.
pub fn run(op: &mut dyn Transformation, tables: &[Table]) {
    for t in tables {
        op.process(PARENT, t).expect("process");
    }
    op.finish(PARENT, None);
}

pub fn float_values(table: &Table, label: &str) -> Vec<f64> {
    let j = table.col_idx(label).expect("column");
    table
        .chunks()
        .flat_map(|cr| cr.values::<f64>(j).expect("float column").to_vec())
        .collect()
}

pub fn int_values(table: &Table, label: &str) -> Vec<i64> {
    let j = table.col_idx(label).expect("column");
    table
        .chunks()
        .flat_map(|cr| cr.values::<i64>(j).expect("int column").to_vec())
        .collect()
}

pub fn labels(table: &Table) -> Vec<&str> {
    table.cols().iter().map(|c| c.label.as_str()).collect()
}
