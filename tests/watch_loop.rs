// tests/watch_loop.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sitepipe::dag::Scheduler;
use sitepipe::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, Trigger, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use sitepipe::exec::RealExecutorBackend;
use sitepipe::pipeline::{Pipeline, TaskId};
use sitepipe::tasks::run_task;
use sitepipe_test_utils::{ConfigFileBuilder, SiteFixture, init_tracing, with_timeout};

async fn next_trigger(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Trigger {
    loop {
        match with_timeout(rx.recv()).await {
            Some(RuntimeEvent::Triggered(trigger)) => return trigger,
            Some(_) => continue,
            None => panic!("event channel closed"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn html_change_triggers_html_with_reload() {
    init_tracing();
    let site = SiteFixture::new();
    site.source("index.html", "<p>one</p>");
    let (ctx, mut rx) = site.context(ConfigFileBuilder::new().build());

    run_task(TaskId::Watcher, Arc::clone(&ctx)).await.unwrap();
    assert!(ctx.is_watching());

    site.source("index.html", "<p>two</p>");
    let trigger = next_trigger(&mut rx).await;
    assert_eq!(trigger.tasks, vec![TaskId::Html]);
    assert!(trigger.reload);
    assert_eq!(trigger.reason, TriggerReason::FileWatch);

    ctx.stop_watching();
    assert!(!ctx.is_watching());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unbound_files_are_ignored() {
    init_tracing();
    let site = SiteFixture::new();
    site.source("notes.txt", "x");
    site.source("sass/style.scss", "a { color: red; }");
    let (ctx, mut rx) = site.context(ConfigFileBuilder::new().build());

    run_task(TaskId::Watcher, Arc::clone(&ctx)).await.unwrap();
    site.source("notes.txt", "y");
    site.source("sass/style.scss", "a { color: blue; }");

    let trigger = next_trigger(&mut rx).await;
    assert_eq!(trigger.tasks, vec![TaskId::Styles]);
    assert!(!trigger.reload);

    ctx.stop_watching();
}

#[tokio::test]
async fn empty_bindings_start_nothing() {
    let site = SiteFixture::new();
    site.source("index.html", "<p>one</p>");
    let (ctx, mut rx) = site.context(ConfigFileBuilder::new().without_watch().build());

    run_task(TaskId::Watcher, Arc::clone(&ctx)).await.unwrap();
    assert!(!ctx.is_watching());

    site.source("index.html", "<p>two</p>");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());
}

/// Wait until `task` completes with `outcome` and `done` holds.
async fn completion_where(
    seen: &mut mpsc::UnboundedReceiver<(TaskId, TaskOutcome)>,
    task: TaskId,
    outcome: TaskOutcome,
    done: impl Fn() -> bool,
) {
    with_timeout(async {
        loop {
            match seen.recv().await {
                Some(got) if got == (task, outcome) && done() => return,
                Some(_) => continue,
                None => panic!("runtime stopped forwarding events"),
            }
        }
    })
    .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watch_loop_survives_a_sass_error() {
    init_tracing();
    let site = SiteFixture::new();
    site.source("sass/style.scss", "body { color: blue; }\n");
    let (ctx, mut task_events) = site.context(ConfigFileBuilder::new().build());

    // Sit between tasks and the runtime to observe completions.
    let (runtime_tx, runtime_rx) = mpsc::channel(64);
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = task_events.recv().await {
            if let RuntimeEvent::TaskCompleted { task, outcome, .. } = &event {
                let _ = seen_tx.send((*task, *outcome));
            }
            if runtime_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    let core = CoreRuntime::new(
        Scheduler::from_pipeline(&Pipeline::default_flow()),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let executor = RealExecutorBackend::new(Arc::clone(&ctx), ctx.events.clone());
    let runtime = tokio::spawn(Runtime::new(core, runtime_rx, executor).run());

    ctx.events
        .send(RuntimeEvent::Triggered(Trigger::manual(vec![TaskId::Watcher])))
        .await
        .unwrap();
    completion_where(&mut seen_rx, TaskId::Watcher, TaskOutcome::Success, || true).await;

    site.source("sass/style.scss", "body { color: red;\n");
    completion_where(&mut seen_rx, TaskId::Styles, TaskOutcome::Failed, || true).await;

    let css = site.build_path("css/style.min.css");
    site.source("sass/style.scss", "body { color: red; }\n");
    completion_where(&mut seen_rx, TaskId::Styles, TaskOutcome::Success, || {
        std::fs::read_to_string(&css).is_ok_and(|c| c.starts_with("body{color:red}"))
    })
    .await;

    ctx.events.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    let report = with_timeout(runtime).await.unwrap().unwrap();
    let failed = report.failed_tasks();
    assert!(!failed.is_empty());
    assert!(failed.iter().all(|t| *t == TaskId::Styles), "got {failed:?}");

    ctx.stop_watching();
}
