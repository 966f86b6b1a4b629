//! Asynchronous scoped runs: interceptions stay installed across suspension
//! points and are restored once the work unit's future resolves.

use std::time::Duration;

use procmock::io::process::WriteArgs;
use procmock::mocks::{
    mock_console_log, mock_process_exit, mock_process_stderr, mock_process_stdout,
};
use procmock::test_support::{all_restored, default_scope, fault, report_and_exit, targets};
use procmock::{Fault, Outcome, Scope};

#[tokio::test]
async fn every_mock_is_called_once() {
    let t = targets();
    let outcome = default_scope(&t)
        .run_async(|| async { report_and_exit(&t) })
        .await;

    for name in ["stdout", "stderr", "exit", "log"] {
        assert_eq!(outcome.mocks[name].call_count(), 1, "{name}");
    }
    assert!(outcome.result().is_some());
    assert!(all_restored(&t));
}

#[tokio::test]
async fn resolves_with_value() {
    let t = targets();
    let outcome = default_scope(&t)
        .run_async(|| async { Ok::<_, Fault>("return string") })
        .await;

    assert_eq!(outcome.result(), Some(&"return string"));
    assert!(outcome.error().is_none());
}

#[tokio::test]
async fn rejection_is_captured_by_identity() {
    let t = targets();
    let expected = fault("Mock error");
    let outcome: Outcome<(), Fault> = default_scope(&t)
        .run_async(|| async { Err(expected.clone()) })
        .await;

    assert!(outcome.result().is_none());
    assert!(Fault::ptr_eq(outcome.error().expect("error"), &expected));
    assert!(all_restored(&t));
}

/// Calls on both sides of a suspension are recorded, and nothing is
/// restored until the suspension resolves.
#[tokio::test]
async fn interceptions_span_suspension() {
    let t = targets();
    let outcome = default_scope(&t)
        .run_async(|| async {
            t.process.stdout().write("before sleep")?;
            tokio::time::sleep(Duration::from_millis(10)).await;
            let still_installed = !all_restored(&t);
            t.process.stderr().write("after sleep")?;
            Ok::<_, Fault>(still_installed)
        })
        .await;

    assert_eq!(outcome.result(), Some(&true));
    let stdout = outcome.mocks["stdout"].calls::<WriteArgs, bool>().expect("stdout");
    assert_eq!(stdout[0].args, WriteArgs::from("before sleep"));
    let stderr = outcome.mocks["stderr"].calls::<WriteArgs, bool>().expect("stderr");
    assert_eq!(stderr[0].args, WriteArgs::from("after sleep"));
    assert!(all_restored(&t));
}

#[tokio::test]
async fn raising_exit_rejects_work_unit() {
    let t = targets();
    let expected = fault("Mock process exit");
    let raising = expected.clone();
    let (out, err, exit, log) = (
        t.process.clone(),
        t.process.clone(),
        t.process.clone(),
        t.console.clone(),
    );
    let scope = Scope::new()
        .with("stdout", move || mock_process_stdout(&out))
        .with("stderr", move || mock_process_stderr(&err))
        .with("exit", move || mock_process_exit(&exit, Some(raising.clone())))
        .with("log", move || mock_console_log(&log));

    let outcome = scope
        .run_async(|| async {
            tokio::task::yield_now().await;
            report_and_exit(&t)
        })
        .await;

    assert_eq!(outcome.mocks["exit"].call_count(), 1);
    assert!(!outcome.mocks["log"].was_called());
    assert!(outcome.result().is_none());
    assert!(Fault::ptr_eq(outcome.error().expect("error"), &expected));
    assert!(all_restored(&t));
}

#[tokio::test]
async fn dropped_run_restores() {
    let t = targets();
    let scope = default_scope(&t);

    let pending = scope.run_async(|| async {
        t.process.stdout().write("started")?;
        std::future::pending::<()>().await;
        Ok::<_, Fault>(())
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;

    assert!(timed_out.is_err());
    assert!(all_restored(&t));
}
