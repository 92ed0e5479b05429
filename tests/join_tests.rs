mod test_data_gen;

use chronoflow_core::prelude::*;
use chronoflow_operators::join::{JoinSpec, MergeJoin};
use chronoflow_operators::{OpError, Transformation};
use test_data_gen::{dataset, float_values, key, labels, series};

const LEFT: DatasetId = DatasetId::new(1);
const RIGHT: DatasetId = DatasetId::new(2);

fn join() -> (MergeJoin, CollectingSink) {
    let (ds, sink) = dataset();
    let op = MergeJoin::new(JoinSpec::default(), [LEFT, RIGHT], ds).expect("join");
    (op, sink)
}

/// Rows all stamped at `secs`.
fn at(k: &GroupKey, secs: i64, values: &[f64]) -> Table {
    series(k, secs, 0, Column::from(values.to_vec()))
}

#[test]
fn duplicate_keys_produce_the_cross_product() {
    let k = key(&[("host", "a")]);
    let (mut op, sink) = join();
    op.process(LEFT, &at(&k, 0, &[1.0, 2.0])).expect("left");
    op.process(RIGHT, &at(&k, 0, &[10.0, 20.0, 30.0])).expect("right");
    op.finish(LEFT, None);
    op.finish(RIGHT, None);

    assert_eq!(sink.finished(), Some(Ok(())));
    let out = sink.tables();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].key(), &k);
    assert_eq!(
        labels(&out[0]),
        vec!["_time", "_value_left", "_value_right", "host"]
    );
    assert_eq!(out[0].rows(), 6);
    assert_eq!(
        float_values(&out[0], "_value_left"),
        vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]
    );
    // Each right row is paired with every buffered left row as it arrives.
    assert_eq!(
        float_values(&out[0], "_value_right"),
        vec![10.0, 10.0, 20.0, 20.0, 30.0, 30.0]
    );
}

#[test]
fn unmatched_rows_are_dropped() {
    let k = key(&[("host", "a")]);
    let (mut op, sink) = join();
    op.process(LEFT, &series(&k, 0, 10, Column::from(vec![1.0f64, 2.0, 3.0])))
        .expect("left");
    op.process(RIGHT, &series(&k, 10, 100, Column::from(vec![5.0f64, 6.0])))
        .expect("right");
    op.finish(LEFT, None);
    op.finish(RIGHT, None);

    let out = sink.tables();
    assert_eq!(out.len(), 1);
    assert_eq!(float_values(&out[0], "_value_left"), vec![2.0]);
    assert_eq!(float_values(&out[0], "_value_right"), vec![5.0]);
}

#[test]
fn arrival_order_does_not_change_cardinality() {
    let k = key(&[("host", "a")]);
    let (mut op, sink) = join();
    op.process(RIGHT, &at(&k, 0, &[1.0, 2.0])).expect("right");
    op.process(LEFT, &at(&k, 0, &[3.0, 4.0])).expect("left");
    op.finish(RIGHT, None);
    op.finish(LEFT, None);
    assert_eq!(sink.tables()[0].rows(), 4);
}

#[test]
fn coarser_key_joins_every_compatible_partition() {
    let a = key(&[("host", "a")]);
    let b = key(&[("host", "b")]);
    // The right side is not grouped by host but still carries it.
    let right = Table::from_columns(
        GroupKey::empty(),
        vec![
            ColMeta::new("_time", ColType::Time),
            ColMeta::new("host", ColType::String),
            ColMeta::new("_value", ColType::Float),
        ],
        vec![
            Column::from(vec![Time::from_secs(0), Time::from_secs(0)]),
            Column::from(vec!["a", "b"]),
            Column::from(vec![10.0f64, 20.0]),
        ],
    )
    .expect("right");

    let (mut op, sink) = join();
    op.process(LEFT, &at(&a, 0, &[1.0])).expect("left a");
    op.process(LEFT, &at(&b, 0, &[2.0])).expect("left b");
    op.process(RIGHT, &right).expect("right");
    op.finish(LEFT, None);
    op.finish(RIGHT, None);

    let out = sink.tables();
    assert_eq!(out.len(), 2);
    let ta = sink.table(&a).expect("host=a");
    assert_eq!(float_values(&ta, "_value_right"), vec![10.0]);
    let tb = sink.table(&b).expect("host=b");
    assert_eq!(float_values(&tb, "_value_right"), vec![20.0]);
}

#[test]
fn rows_after_one_side_finished_still_match() {
    let k = key(&[("host", "a")]);
    let (mut op, sink) = join();
    op.process(LEFT, &at(&k, 0, &[1.0])).expect("left");
    op.finish(LEFT, None);
    assert_eq!(sink.finished(), None);
    op.process(RIGHT, &at(&k, 0, &[7.0])).expect("right");
    op.finish(RIGHT, None);
    assert_eq!(float_values(&sink.tables()[0], "_value_right"), vec![7.0]);
}

#[test]
fn progress_is_the_minimum_of_both_parents() {
    let (mut op, sink) = join();
    op.update_watermark(LEFT, Time::from_secs(10)).expect("left");
    op.update_watermark(RIGHT, Time::from_secs(5)).expect("right");
    op.update_watermark(RIGHT, Time::from_secs(30)).expect("right");
    assert_eq!(
        sink.snapshot().watermarks,
        vec![Time::MIN, Time::from_secs(5), Time::from_secs(10)]
    );
}

#[test]
fn an_error_finishes_immediately() {
    let (mut op, sink) = join();
    op.process(LEFT, &at(&key(&[]), 0, &[1.0])).expect("left");
    op.finish(RIGHT, Some(Error::Upstream("source failed".into())));
    assert!(matches!(sink.finished(), Some(Err(_))));
    assert!(sink.tables().is_empty());
    assert!(matches!(
        op.process(LEFT, &at(&key(&[]), 0, &[2.0])),
        Err(OpError::Finished { .. })
    ));
}

#[test]
fn protocol_errors() {
    let (mut op, _sink) = join();
    assert!(matches!(
        op.process(DatasetId::new(9), &at(&key(&[]), 0, &[1.0])),
        Err(OpError::UnknownParent { .. })
    ));
    assert!(matches!(
        op.retract_table(LEFT, &key(&[])),
        Err(OpError::NotImplemented { .. })
    ));
    let (ds, _sink) = dataset();
    assert!(matches!(
        MergeJoin::new(JoinSpec::default(), [LEFT, LEFT], ds),
        Err(OpError::Config(_))
    ));
}

#[test]
fn nan_join_values_never_match() {
    let side = |values: [f64; 2]| {
        Table::from_columns(
            GroupKey::empty(),
            vec![
                ColMeta::new("_time", ColType::Time),
                ColMeta::new("level", ColType::Float),
                ColMeta::new("_value", ColType::Float),
            ],
            vec![
                Column::from(vec![Time::from_secs(0), Time::from_secs(10)]),
                Column::from(vec![f64::NAN, 1.0]),
                Column::from(values.to_vec()),
            ],
        )
        .expect("table")
    };
    let (ds, sink) = dataset();
    let mut op =
        MergeJoin::new(JoinSpec::default().on(["level"]), [LEFT, RIGHT], ds).expect("join");
    op.process(LEFT, &side([1.0, 2.0])).expect("left");
    op.process(RIGHT, &side([10.0, 20.0])).expect("right");
    op.finish(LEFT, None);
    op.finish(RIGHT, None);

    let out = sink.tables();
    assert_eq!(out.len(), 1);
    assert_eq!(float_values(&out[0], "_value_left"), vec![2.0]);
    assert_eq!(float_values(&out[0], "_value_right"), vec![20.0]);
}
