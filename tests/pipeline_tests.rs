mod test_data_gen;

use chronoflow_core::prelude::*;
use chronoflow_operators::cumulative_sum::{CumulativeSum, CumulativeSumSpec};
use chronoflow_operators::limit::{Limit, LimitSpec};
use chronoflow_operators::selector::{SelectorKind, SelectorSpec};
use chronoflow_operators::unique::{Unique, UniqueSpec};
use chronoflow_operators::window::{Window, WindowSpec};
use chronoflow_operators::{OpError, Transformation, TransformationSink};
use test_data_gen::{float_values, key, ramp, run, PARENT};

const WINDOWED: DatasetId = DatasetId::new(2);
const SUMMED: DatasetId = DatasetId::new(3);

#[test]
fn window_feeds_cumulative_sum() {
    let sink = CollectingSink::new();
    let sum = CumulativeSum::new(
        CumulativeSumSpec::default(),
        Dataset::new(SUMMED, Box::new(sink.clone())),
    );
    let mut window = Window::new(
        WindowSpec::every(Duration::from_secs(30)),
        Bounds::new(Time::from_secs(0), Time::from_secs(60)),
        Dataset::new(WINDOWED, Box::new(TransformationSink::new(sum))),
    )
    .expect("window");

    // Values 0..6, one every 10s.
    run(&mut window, &[ramp(&key(&[("host", "a")]), 0, 10, 6)]);

    assert_eq!(sink.finished(), Some(Ok(())));
    let out = sink.tables();
    assert_eq!(out.len(), 2);
    // Running sums restart in every bucket.
    assert_eq!(float_values(&out[0], "_value"), vec![0.0, 1.0, 3.0]);
    assert_eq!(float_values(&out[1], "_value"), vec![3.0, 7.0, 12.0]);
}

#[test]
fn progress_marks_flow_downstream() {
    let sink = CollectingSink::new();
    let sum = CumulativeSum::new(
        CumulativeSumSpec::default(),
        Dataset::new(SUMMED, Box::new(sink.clone())),
    );
    let mut limit = Limit::new(
        LimitSpec::new(1),
        Dataset::new(WINDOWED, Box::new(TransformationSink::new(sum))),
    )
    .expect("limit");
    limit
        .update_watermark(PARENT, Time::from_secs(5))
        .expect("watermark");
    limit
        .update_processing_time(PARENT, Time::from_secs(7))
        .expect("processing time");
    limit
        .retract_table(PARENT, &key(&[("host", "a")]))
        .expect("retract");

    let seen = sink.snapshot();
    assert_eq!(seen.watermarks, vec![Time::from_secs(5)]);
    assert_eq!(seen.processing_times, vec![Time::from_secs(7)]);
    assert_eq!(seen.retracted, vec![key(&[("host", "a")])]);
}

#[test]
fn downstream_failure_reaches_the_terminal_sink() {
    let sink = CollectingSink::new();
    let unique = Unique::new(
        UniqueSpec {
            column: "missing".into(),
        },
        Dataset::new(SUMMED, Box::new(sink.clone())),
    );
    let mut limit = Limit::new(
        LimitSpec::new(2),
        Dataset::new(WINDOWED, Box::new(TransformationSink::new(unique))),
    )
    .expect("limit");
    run(&mut limit, &[ramp(&key(&[]), 0, 10, 3)]);

    match sink.finished() {
        Some(Err(msg)) => assert!(msg.contains("missing"), "{msg}"),
        other => panic!("expected a failure, got {other:?}"),
    }
    assert!(sink.tables().is_empty());
}

#[test]
fn specs_read_defaults_from_config() {
    let cfg = EngineConfig::from_json(r#"{"value_column":"reading"}"#).expect("config");
    assert_eq!(
        CumulativeSumSpec::from_config(&cfg).columns,
        vec!["reading".to_string()]
    );
    assert_eq!(
        SelectorSpec::from_config(SelectorKind::Last, &cfg).column,
        "reading"
    );
    let window = WindowSpec::from_config(&cfg);
    assert_eq!(window.time_column, "_time");
    assert_eq!(window.start_column, "_start");
}

#[test]
fn window_spec_deserializes_with_defaults() {
    let spec: WindowSpec =
        serde_json::from_str(r#"{"every": 60000000000, "create_empty": true}"#).expect("spec");
    assert_eq!(spec.every, Some(Duration::from_mins(1)));
    assert_eq!(spec.period, None);
    assert!(spec.create_empty);
    assert_eq!(spec.stop_column, "_stop");
    assert_eq!(
        spec.durations().expect("durations"),
        (Duration::from_mins(1), Duration::from_mins(1))
    );
}

#[test]
fn process_after_finish_is_refused() {
    let sink = CollectingSink::new();
    let mut sum = CumulativeSum::new(
        CumulativeSumSpec::default(),
        Dataset::new(SUMMED, Box::new(sink.clone())),
    );
    sum.finish(PARENT, None);
    assert!(sum
        .process(PARENT, &ramp(&key(&[]), 0, 10, 1))
        .is_err());
    assert_eq!(sink.finished(), Some(Ok(())));
}

#[test]
fn watermark_flushes_a_chain_before_finish() {
    let sink = CollectingSink::new();
    let sum = CumulativeSum::new(
        CumulativeSumSpec::default(),
        Dataset::new(SUMMED, Box::new(sink.clone())),
    );
    let mut window = Window::new(
        WindowSpec::every(Duration::from_secs(30)),
        Bounds::new(Time::from_secs(0), Time::from_secs(60)),
        Dataset::new(WINDOWED, Box::new(TransformationSink::new(sum))),
    )
    .expect("window");
    window
        .process(PARENT, &ramp(&key(&[("host", "a")]), 0, 10, 6))
        .expect("process");
    window
        .update_watermark(PARENT, Time::MAX)
        .expect("watermark");

    let out = sink.tables();
    assert_eq!(out.len(), 2);
    assert_eq!(float_values(&out[1], "_value"), vec![3.0, 7.0, 12.0]);
    assert_eq!(sink.finished(), None);
}

#[test]
fn table_after_its_key_was_emitted_is_a_duplicate() {
    let sink = CollectingSink::new();
    let mut sum = CumulativeSum::new(
        CumulativeSumSpec::default(),
        Dataset::new(SUMMED, Box::new(sink.clone())),
    );
    let t = ramp(&key(&[("host", "a")]), 0, 10, 2);
    sum.process(PARENT, &t).expect("first");
    sum.update_watermark(PARENT, Time::MAX).expect("watermark");
    assert_eq!(sink.tables().len(), 1);
    assert!(matches!(
        sum.process(PARENT, &t),
        Err(OpError::DuplicateTable { .. })
    ));
}
