// tests/scheduler_chains.rs

mod common;

use assetwatch::engine::TaskOutcome;
use assetwatch::rules::ChainTable;
use assetwatch::scheduler::{BurstKind, Scheduler, TaskState};
use assetwatch::types::Category;
use assetwatch_test_utils::builders::{
    registry_for, standard_registry, ConfigFileBuilder, HTML_FILE, HTML_PARTIAL, IMAGE_FILE,
    SASS_FILE, SASS_PARTIAL, SCRIPT_FILE, STANDARD_TASKS,
};
use common::{change, drive, init_tracing};

fn scheduler() -> Scheduler {
    let (registry, chains) = standard_registry();
    Scheduler::new(registry, chains)
}

#[test]
fn sass_change_runs_only_the_style_task_and_finishes_one_burst() {
    init_tracing();
    let mut s = scheduler();

    let step = s.handle_change(&change(SASS_FILE));
    assert_eq!(step.dispatched_names(), vec!["styles"]);
    assert!(step.opened.is_some());

    let (ran, finished) = drive(&mut s, step, &[]);
    assert_eq!(ran, vec!["styles"]);
    assert_eq!(finished.len(), 1);
    assert!(finished[0].failures.is_empty());
    assert!(s.is_idle());
}

#[test]
fn nested_sass_partial_is_owned_by_the_style_rule() {
    let mut s = scheduler();
    let step = s.handle_change(&change(SASS_PARTIAL));
    assert_eq!(step.dispatched_names(), vec!["styles"]);
}

#[test]
fn html_change_escalates_to_every_task_in_canonical_order() {
    init_tracing();
    let mut s = scheduler();

    let step = s.handle_change(&change(HTML_FILE));
    // Chain tasks run one at a time.
    assert_eq!(step.dispatched.len(), 1);

    let (ran, finished) = drive(&mut s, step, &[]);
    assert_eq!(ran, STANDARD_TASKS.to_vec());
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].kind, BurstKind::Change);
    assert!(s.is_idle());
}

#[test]
fn html_partial_change_escalates_too() {
    let mut s = scheduler();
    let step = s.handle_change(&change(HTML_PARTIAL));
    let (ran, finished) = drive(&mut s, step, &[]);
    assert_eq!(ran.len(), 6);
    assert_eq!(finished.len(), 1);
}

#[test]
fn html_chain_skips_unregistered_categories() {
    let cfg = ConfigFileBuilder::standard_pipeline()
        .without_rule("fonts")
        .without_rule("svg")
        .build();
    let fs = assetwatch::fs::mock::MockFileSystem::new();
    let (registry, chains) = registry_for(&cfg, &fs, std::path::Path::new(".")).unwrap();
    let mut s = Scheduler::new(registry, chains);

    let step = s.handle_change(&change(HTML_FILE));
    let (ran, _) = drive(&mut s, step, &[]);
    assert_eq!(ran, vec!["styles", "scripts", "images", "html"]);
}

#[test]
fn style_failure_aborts_the_chain_but_the_scheduler_keeps_serving() {
    init_tracing();
    let mut s = scheduler();

    let step = s.handle_change(&change(HTML_FILE));
    let (ran, finished) = drive(&mut s, step, &["styles"]);
    assert_eq!(ran, vec!["styles"]);
    assert_eq!(finished.len(), 1, "an aborted burst still reloads once");
    assert!(finished[0].aborted);
    assert_eq!(finished[0].failures, vec!["styles".to_string()]);
    assert!(s.is_idle());

    let step = s.handle_change(&change(SCRIPT_FILE));
    let (ran, finished) = drive(&mut s, step, &[]);
    assert_eq!(ran, vec!["scripts"]);
    assert_eq!(finished.len(), 1);
}

#[test]
fn rapid_repeat_changes_coalesce_into_exactly_one_rerun() {
    init_tracing();
    let mut s = scheduler();

    let first = s.handle_change(&change(SCRIPT_FILE));
    assert_eq!(first.dispatched_names(), vec!["scripts"]);

    let second = s.handle_change(&change(SCRIPT_FILE));
    assert!(second.dispatched.is_empty());
    assert!(second.opened.is_some());
    assert_eq!(s.task_state("scripts"), Some(TaskState::RerunPending));

    // Further triggers before the re-run starts are absorbed.
    for _ in 0..5 {
        let step = s.handle_change(&change(SCRIPT_FILE));
        assert!(step.opened.is_none());
        assert!(step.dispatched.is_empty());
    }
    assert_eq!(s.open_bursts(), 2);

    let step = s.handle_completion("scripts", &TaskOutcome::Success);
    assert_eq!(step.dispatched_names(), vec!["scripts"]);
    assert_eq!(step.finished.len(), 1);
    assert_eq!(s.task_state("scripts"), Some(TaskState::Running));

    let step = s.handle_completion("scripts", &TaskOutcome::Success);
    assert!(step.dispatched.is_empty());
    assert_eq!(step.finished.len(), 1);
    assert_eq!(step.finished[0].triggers.len(), 6);

    assert_eq!(s.runs_of("scripts"), Some(2));
    assert!(s.is_idle());
}

#[test]
fn a_rerun_still_happens_after_a_failed_run() {
    let mut s = scheduler();
    s.handle_change(&change(SCRIPT_FILE));
    s.handle_change(&change(SCRIPT_FILE));

    let step = s.handle_completion("scripts", &TaskOutcome::Failed("syntax".into()));
    assert_eq!(step.dispatched_names(), vec!["scripts"]);
    assert_eq!(step.finished.len(), 1);
    assert!(step.finished[0].aborted);
}

#[test]
fn unmatched_paths_do_nothing() {
    let mut s = scheduler();
    for path in ["README.md", "src/assets/images/notes.txt", "build/index.html"] {
        let step = s.handle_change(&change(path));
        assert!(step.dispatched.is_empty(), "{path} dispatched work");
        assert!(step.finished.is_empty());
        assert!(step.opened.is_none());
    }
    assert!(s.is_idle());
    assert_eq!(s.runs_of("styles"), Some(0));
}

#[test]
fn html_change_behind_a_running_style_task_shares_one_rerun() {
    init_tracing();
    let mut s = scheduler();

    // styles runs for a sass change.
    let step = s.handle_change(&change(SASS_FILE));
    assert_eq!(step.dispatched_names(), vec!["styles"]);

    // An HTML change starts with styles too: it must wait.
    let html = s.handle_change(&change(HTML_FILE));
    assert!(html.dispatched.is_empty());
    // Another sass change merges into the queued HTML burst.
    let merged = s.handle_change(&change(SASS_FILE));
    assert!(merged.opened.is_none());

    let step = s.handle_completion("styles", &TaskOutcome::Success);
    assert_eq!(step.dispatched_names(), vec!["styles"]);
    assert_eq!(step.finished.len(), 1);

    let (ran, finished) = drive(&mut s, step, &[]);
    assert_eq!(ran, STANDARD_TASKS.to_vec());
    assert_eq!(finished.len(), 2);
    assert_eq!(s.runs_of("styles"), Some(2));
}

#[test]
fn different_tasks_run_concurrently_across_bursts() {
    let mut s = scheduler();
    let html = s.handle_change(&change(HTML_FILE));
    assert_eq!(html.dispatched_names(), vec!["styles"]);

    let image = s.handle_change(&change(IMAGE_FILE));
    assert_eq!(image.dispatched_names(), vec!["images"]);
    assert_eq!(s.task_state("styles"), Some(TaskState::Running));
    assert_eq!(s.task_state("images"), Some(TaskState::Running));
}

#[test]
fn initial_build_continues_past_failures() {
    let mut s = scheduler();
    let step = s.start_initial_build();
    assert_eq!(step.dispatched_names(), vec!["styles"]);

    let (ran, finished) = drive(&mut s, step, &["styles", "images"]);
    assert_eq!(ran, STANDARD_TASKS.to_vec());
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].kind, BurstKind::InitialBuild);
    assert_eq!(finished[0].failures, vec!["styles".to_string(), "images".to_string()]);
    assert!(!finished[0].aborted);
}

#[test]
fn shutdown_drops_queued_work_and_reports_nothing_further() {
    let mut s = scheduler();
    s.handle_change(&change(SCRIPT_FILE));
    s.handle_change(&change(SCRIPT_FILE));
    assert_eq!(s.task_state("scripts"), Some(TaskState::RerunPending));

    s.begin_shutdown();
    assert!(s.is_draining());
    assert!(!s.is_idle(), "the in-flight run is still running");

    let ignored = s.handle_change(&change(SASS_FILE));
    assert!(ignored.dispatched.is_empty());

    let step = s.handle_completion("scripts", &TaskOutcome::Success);
    assert!(step.dispatched.is_empty());
    assert!(step.finished.is_empty());
    assert!(s.is_idle());
    assert_eq!(s.runs_of("scripts"), Some(1));
}

#[test]
fn chain_overrides_replace_the_default_escalation() {
    let cfg = ConfigFileBuilder::standard_pipeline()
        .with_chain(Category::Html, &["styles", "html"])
        .with_chain(Category::Image, &["images", "html"])
        .build();
    let fs = assetwatch::fs::mock::MockFileSystem::new();
    let (registry, chains) = registry_for(&cfg, &fs, std::path::Path::new(".")).unwrap();
    assert_eq!(
        chains.get(Category::Script),
        Some(&["scripts".to_string()][..])
    );

    let mut s = Scheduler::new(registry, chains);
    let step = s.handle_change(&change(HTML_FILE));
    let (ran, _) = drive(&mut s, step, &[]);
    assert_eq!(ran, vec!["styles", "html"]);

    let step = s.handle_change(&change(IMAGE_FILE));
    let (ran, _) = drive(&mut s, step, &[]);
    assert_eq!(ran, vec!["images", "html"]);
}

#[test]
fn chain_table_defaults_follow_the_registry() {
    let (registry, _) = standard_registry();
    let chains = ChainTable::defaults(&registry);
    assert_eq!(
        chains.get(Category::Html).map(|c| c.to_vec()),
        Some(STANDARD_TASKS.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    );
    assert_eq!(chains.get(Category::Svg), Some(&["svg".to_string()][..]));
}
