// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use trellis_metadata::{ErrorSummary, ExecutionPhase, FailureTreeNode, TrellisExitCode};
use trellis_runner::{
    emitter::Emitter,
    group::Group,
    hooks::Cleanup,
    refiner::Refiner,
    runner::{Reporter, Runner},
    suite::Suite,
    test::Test,
};

#[tokio::test(start_paused = true)]
async fn test_run_builds_failure_tree() -> Result<()> {
    test_init();
    let emitter = Emitter::new();
    let refiner = Refiner::new();
    let log = EventLog::attach(&emitter);

    let mut group = Group::new("G", emitter.clone(), refiner.clone());
    group.test("T1").run(|(), _| async { Ok(()) });
    group
        .test("T2")
        .run(|(), _| async { Err("expected 1, found 2".into()) });

    let mut t3 = Test::new("T3", emitter.clone(), refiner.clone());
    t3.run(|(), _| async { Ok(()) });

    let mut suite = Suite::new("unit", emitter.clone());
    suite.add_group(group).add_test(t3);

    let mut runner = Runner::new(emitter);
    runner.add(suite);
    let summary = runner.run().await?;

    assert_eq!(
        log.lines(),
        [
            "runner:start",
            "suite:start unit",
            "group:start G",
            "test:start T1",
            "test:end T1 (ok)",
            "test:start T2",
            "test:end T2 (error)",
            "group:end G",
            "test:start T3",
            "test:end T3 (ok)",
            "suite:end unit",
            "runner:end",
        ]
    );

    let summary = summary.to_metadata();
    assert_eq!(summary.aggregates.total, 3);
    assert_eq!(summary.aggregates.passed, 2);
    assert_eq!(summary.aggregates.failed, 1);
    assert!(summary.has_error);
    assert_eq!(summary.failed_tests_titles, ["T2"]);
    assert_eq!(
        summary.failure_tree,
        [FailureTreeNode::Suite {
            name: "unit".to_owned(),
            errors: vec![],
            children: vec![FailureTreeNode::Group {
                name: "G".to_owned(),
                errors: vec![],
                children: vec![FailureTreeNode::Test {
                    title: "T2".to_owned(),
                    errors: vec![ErrorSummary {
                        phase: ExecutionPhase::Test,
                        message: "expected 1, found 2".to_owned(),
                    }],
                }],
            }],
        }]
    );
    assert_eq!(summary.exit_code(), TrellisExitCode::TEST_RUN_FAILED);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dataset_rows_expand_titles() -> Result<()> {
    test_init();
    let emitter = Emitter::new();
    let log = EventLog::attach(&emitter);
    let seen = Trace::default();

    let mut test = Test::new("add {a} + {b} = {sum}", emitter, Refiner::new());
    test.with_value(json!([
        {"a": 1, "b": 1, "sum": 2},
        {"a": 2, "b": 2, "sum": 4},
    ]))?;
    let seen2 = seen.clone();
    test.run(move |(), handle| {
        let seen = seen2.clone();
        async move {
            let row = handle.row().ok_or("dataset row missing")?;
            let [a, b] = ["a", "b"].map(|key| row[key].as_i64().unwrap_or_default());
            let sum = a + b;
            seen.push(format!("{} -> {sum}", handle.title()));
            Ok(())
        }
    });
    test.exec().await?;

    assert_eq!(seen.entries(), ["add 1 + 1 = 2 -> 2", "add 2 + 2 = 4 -> 4"]);
    let ends = log.test_ends();
    assert_eq!(ends.len(), 2);
    for (index, end) in ends.iter().enumerate() {
        ensure!(!end.has_error, "row {index} failed: {:?}", end.errors);
        assert_eq!(end.title.original, "add {a} + {b} = {sum}");
        let dataset = end.dataset.as_ref().expect("dataset info is present");
        assert_eq!((dataset.size, dataset.index), (2, index));
    }
    assert_eq!(ends[1].title.expanded, "add 2 + 2 = 4");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cleanups_run_in_reverse() -> Result<()> {
    test_init();
    let trace = Trace::default();
    let mut test = Test::new("cleanups", Emitter::new(), Refiner::new());

    for name in ["first setup", "second setup"] {
        let trace = trace.clone();
        test.setup(move |_| {
            let trace = trace.clone();
            async move {
                trace.push(name);
                Ok(Some(Cleanup::new(move || async move {
                    trace.push(format!("undo {name}"));
                    Ok(())
                })))
            }
        });
    }
    let trace2 = trace.clone();
    test.run(move |(), handle| {
        let trace = trace2.clone();
        async move {
            for name in ["first resource", "second resource"] {
                let trace = trace.clone();
                handle.cleanup(move || async move {
                    trace.push(format!("release {name}"));
                    Ok(())
                });
            }
            trace.push("body");
            Ok(())
        }
    });
    test.exec().await?;

    assert_eq!(
        trace.entries(),
        [
            "first setup",
            "second setup",
            "body",
            "release second resource",
            "release first resource",
            "undo second setup",
            "undo first setup",
        ]
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_retries_until_success() -> Result<()> {
    test_init();
    let emitter = Emitter::new();
    let log = EventLog::attach(&emitter);

    let mut test = Test::new("flaky", emitter, Refiner::new());
    test.retry(3).run(|(), handle| async move {
        if handle.attempt() < 3 {
            Err(format!("attempt {} failed", handle.attempt()).into())
        } else {
            Ok(())
        }
    });
    test.exec().await?;

    let ends = log.test_ends();
    assert_eq!(ends.len(), 1, "retries are not reported as separate tests");
    assert!(!ends[0].has_error);
    assert_eq!(ends[0].retry_attempt, Some(3));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeouts() -> Result<()> {
    test_init();
    let emitter = Emitter::new();
    let log = EventLog::attach(&emitter);

    let mut slow = Test::new("slow", emitter.clone(), Refiner::new());
    slow.timeout(Duration::from_millis(100))
        .run(|(), _| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        });
    slow.exec().await?;

    let mut extended = Test::new("extended", emitter.clone(), Refiner::new());
    extended
        .timeout(Duration::from_millis(100))
        .run(|(), handle| async move {
            handle.reset_timeout(Some(Duration::from_millis(500)));
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        });
    extended.exec().await?;

    let ends = log.test_ends();
    assert!(ends[0].has_error);
    assert_eq!(ends[0].errors[0].phase, ExecutionPhase::Test);
    assert_eq!(
        ends[0].errors[0].error.to_string(),
        "test timed out after 100ms"
    );
    assert_eq!(ends[0].duration, Duration::from_millis(100));

    assert!(!ends[1].has_error, "errors: {:?}", ends[1].errors);
    assert_eq!(ends[1].duration, Duration::from_millis(300));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_expected_failures() -> Result<()> {
    test_init();
    let emitter = Emitter::new();
    let mut runner = Runner::new(emitter.clone());
    let mut suite = Suite::new("regressions", emitter.clone());

    let mut known_bug = Test::new("known bug", emitter.clone(), Refiner::new());
    known_bug
        .fails(Some("issue 42"))
        .run(|(), _| async { Err("still broken".into()) });
    let mut fixed_bug = Test::new("fixed bug", emitter.clone(), Refiner::new());
    fixed_bug
        .fails(Some("issue 43"))
        .run(|(), _| async { Ok(()) });
    let mut later = Test::new("later", emitter.clone(), Refiner::new());
    later
        .skip(true, Some("not yet"))
        .run(|(), _| async { Err("skipped tests never run".into()) });
    let todo = Test::new("someday", emitter, Refiner::new());
    suite
        .add_test(known_bug)
        .add_test(fixed_bug)
        .add_test(later)
        .add_test(todo);
    runner.add(suite);

    let summary = runner.run().await?;
    let aggregates = summary.aggregates;
    assert_eq!(aggregates.total, 3, "todo tests are not reported");
    assert_eq!(aggregates.regression, 1);
    assert_eq!(aggregates.failed, 1);
    assert_eq!(aggregates.skipped, 1);
    assert_eq!(summary.failed_tests_titles, ["fixed bug"]);

    let tree = summary.to_metadata().failure_tree;
    let [FailureTreeNode::Suite { children, .. }] = tree.as_slice() else {
        panic!("expected a single suite in {tree:?}");
    };
    let [FailureTreeNode::Test { errors, .. }] = children.as_slice() else {
        panic!("expected a single failing test in {children:?}");
    };
    assert_eq!(
        errors[0].message,
        "test marked with fails() must finish with an error (issue 43)"
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reporters_read_summary_at_end() -> Result<()> {
    test_init();
    let emitter = Emitter::new();
    let finished = Trace::default();

    let mut runner = Runner::new(emitter.clone());
    let finished2 = finished.clone();
    runner.reporter(Reporter::named("summary", move |handle, emitter| {
        let finished = finished2.clone();
        async move {
            emitter.on(trellis_runner::events::EventKind::RunnerEnd, move |_| {
                let summary = handle.summary();
                finished.push(format!(
                    "{} passed of {}",
                    summary.aggregates.passed, summary.aggregates.total
                ));
                Ok(())
            });
            Ok(())
        }
    }));

    let mut suite = Suite::new("reported", emitter.clone());
    let mut test = Test::new("passes", emitter, Refiner::new());
    test.run(|(), _| async { Ok(()) });
    suite.add_test(test);
    runner.add(suite);
    runner.run().await?;

    assert_eq!(finished.entries(), ["1 passed of 1"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_panicking_callbacks_stay_contained() -> Result<()> {
    test_init();
    let emitter = Emitter::new();
    let log = EventLog::attach(&emitter);
    let refiner = Refiner::new();

    let mut group = Group::new("G", emitter.clone(), refiner.clone());
    group
        .test("bad predicate")
        .skip_if(|| panic!("predicate exploded"), None)
        .run(|(), _| async { Ok(()) });
    group
        .test("bad rows")
        .with_lazy(|| -> Vec<u32> { panic!("dataset exploded") })
        .run(|(), _| async { Ok(()) });
    group.test("fine").run(|(), _| async { Ok(()) });

    let mut suite = Suite::new("unit", emitter.clone());
    suite.add_group(group);
    suite.exec().await?;

    assert_eq!(
        log.lines(),
        [
            "suite:start unit",
            "group:start G",
            "test:start bad predicate",
            "test:end bad predicate (error)",
            "test:start bad rows",
            "test:end bad rows (error)",
            "test:start fine",
            "test:end fine (ok)",
            "group:end G",
            "suite:end unit",
        ]
    );
    let ends = log.test_ends();
    assert_eq!(ends[0].errors[0].phase, ExecutionPhase::Setup);
    assert_eq!(
        ends[1].errors[0].error.to_string(),
        "panicked: dataset exploded"
    );

    Ok(())
}
