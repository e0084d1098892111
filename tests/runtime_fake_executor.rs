// tests/runtime_fake_executor.rs

mod common;
use crate::common::builders::{standard_registry, SASS_FILE, SCRIPT_FILE, STANDARD_TASKS};
use crate::common::init_tracing;

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};

use assetwatch::engine::{
    BuildSummary, ChangeEvent, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome,
};
use assetwatch::scheduler::Scheduler;
use assetwatch_test_utils::fake_executor::{FakeExecutor, ManualExecutor};
use assetwatch_test_utils::reload::RecordingReload;

type TestResult = Result<(), Box<dyn Error>>;

fn core(exit_when_idle: bool) -> CoreRuntime {
    let (registry, chains) = standard_registry();
    CoreRuntime::new(
        Scheduler::new(registry, chains),
        RuntimeOptions { exit_when_idle },
    )
}

async fn run_bounded<E>(runtime: Runtime<E>) -> Result<BuildSummary, Box<dyn Error>>
where
    E: assetwatch::exec::ExecutorBackend,
{
    match timeout(Duration::from_secs(3), runtime.run()).await {
        Ok(Ok(summary)) => Ok(summary),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err("runtime did not exit within timeout".into()),
    }
}

#[tokio::test]
async fn once_mode_builds_every_task_in_canonical_order_then_exits() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());
    let reload = RecordingReload::new();

    rt_tx.send(RuntimeEvent::InitialBuildRequested).await?;

    let runtime = Runtime::new(core(true), rt_rx, executor, Arc::new(reload.clone()));
    let summary = run_bounded(runtime).await?;

    let executed = executed.lock().unwrap().clone();
    assert_eq!(executed, STANDARD_TASKS.to_vec());
    assert_eq!(
        summary,
        BuildSummary {
            bursts: 1,
            task_runs: 6,
            task_failures: 0,
        }
    );
    assert_eq!(reload.count(), 1);

    Ok(())
}

#[tokio::test]
async fn initial_build_failures_are_counted_and_do_not_stop_the_build() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone()).failing(["scripts", "svg"]);
    let (built_tx, built_rx) = oneshot::channel();

    rt_tx.send(RuntimeEvent::InitialBuildRequested).await?;

    let runtime = Runtime::new(core(true), rt_rx, executor, Arc::new(RecordingReload::new()))
        .on_initial_build(built_tx);
    let summary = run_bounded(runtime).await?;

    assert_eq!(built_rx.await?, 2);
    assert_eq!(summary.task_failures, 2);
    assert_eq!(summary.task_runs, 6);
    assert_eq!(executed.lock().unwrap().len(), 6);

    Ok(())
}

#[tokio::test]
async fn change_then_shutdown_reloads_once_per_finished_burst() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = ManualExecutor::default();
    let reload = RecordingReload::new();

    // The channel is FIFO, so every event below is handled in order.
    rt_tx
        .send(RuntimeEvent::FileChanged(ChangeEvent::new(SASS_FILE)))
        .await?;
    rt_tx
        .send(RuntimeEvent::TaskCompleted {
            task: "styles".into(),
            outcome: TaskOutcome::Success,
        })
        .await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let runtime = Runtime::new(core(false), rt_rx, executor.clone(), Arc::new(reload.clone()));
    let summary = run_bounded(runtime).await?;

    assert_eq!(executor.names(), vec!["styles".to_string()]);
    assert_eq!(summary.bursts, 1);
    assert_eq!(reload.count(), 1);

    Ok(())
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_runs_and_drops_queued_work() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = ManualExecutor::default();
    let reload = RecordingReload::new();

    let runtime = Runtime::new(core(false), rt_rx, executor.clone(), Arc::new(reload.clone()));
    let handle = tokio::spawn(runtime.run());

    for _ in 0..3 {
        rt_tx
            .send(RuntimeEvent::FileChanged(ChangeEvent::new(SCRIPT_FILE)))
            .await?;
    }
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    // Still draining: the first run of `scripts` has not completed.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());

    rt_tx
        .send(RuntimeEvent::TaskCompleted {
            task: "scripts".into(),
            outcome: TaskOutcome::Success,
        })
        .await?;

    let summary = timeout(Duration::from_secs(3), handle).await???;
    assert_eq!(executor.names(), vec!["scripts".to_string()]);
    assert_eq!(summary.task_runs, 1);
    assert_eq!(summary.bursts, 0);
    assert_eq!(reload.count(), 0);

    Ok(())
}

#[tokio::test]
async fn runtime_exits_when_the_event_channel_closes() -> TestResult {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(4);
    let runtime = Runtime::new(
        core(false),
        rt_rx,
        ManualExecutor::default(),
        Arc::new(RecordingReload::new()),
    );
    drop(rt_tx);

    let summary = run_bounded(runtime).await?;
    assert_eq!(summary, BuildSummary::default());
    Ok(())
}
