mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Mode, Recorder, TestEvent, TestKind, eventually, manager, spawn_dispatcher};
use greenbus::{Context, EventManager};

const WITHIN: Duration = Duration::from_secs(1);

fn spawn_runner(
    manager: &Arc<EventManager<TestEvent>>,
    ctx: &Context,
    rec: &Arc<Recorder>,
) -> tokio::task::JoinHandle<Result<(), greenbus::EventError>> {
    let (manager, ctx, rec) = (Arc::clone(manager), ctx.clone(), Arc::clone(rec));
    tokio::spawn(async move { manager.run_subscription(&ctx, rec.as_ref()).await })
}

async fn subscribed(manager: &EventManager<TestEvent>, n: usize) -> bool {
    eventually(WITHIN, || async { manager.subscriber_count(TestKind::Alpha) == Ok(n) }).await
}

#[tokio::test]
async fn handler_errors_do_not_stop_the_runner() {
    let manager = manager();
    let ctx = Context::background().with_cancel();
    let dispatcher = spawn_dispatcher(&manager, &ctx);
    let rec = Recorder::new("fail-odd", TestKind::Alpha, Mode::FailOdd);
    let runner = spawn_runner(&manager, &ctx, &rec);
    assert!(subscribed(&manager, 1).await);

    for seq in 0..4 {
        manager.publish(&ctx, TestEvent::alpha(seq)).await.unwrap();
    }
    assert!(eventually(WITHIN, || async { rec.seen().await.len() == 4 }).await);
    assert_eq!(rec.seen().await, vec![0, 1, 2, 3]);

    ctx.cancel();
    runner.await.unwrap().unwrap();
    dispatcher.await.unwrap();
}

#[tokio::test]
async fn handler_panic_is_contained() {
    let manager = manager();
    let ctx = Context::background().with_cancel();
    let dispatcher = spawn_dispatcher(&manager, &ctx);
    let rec = Recorder::new("panics", TestKind::Alpha, Mode::PanicOnFirst);
    let runner = spawn_runner(&manager, &ctx, &rec);
    assert!(subscribed(&manager, 1).await);

    for seq in 0..3 {
        manager.publish(&ctx, TestEvent::alpha(seq)).await.unwrap();
    }
    assert!(eventually(WITHIN, || async { rec.seen().await.len() == 3 }).await);

    ctx.cancel();
    runner.await.unwrap().unwrap();
    dispatcher.await.unwrap();
}

#[tokio::test]
async fn runner_unsubscribes_on_cancel() {
    let manager = manager();
    let ctx = Context::background().with_cancel();
    let rec = Recorder::new("ok", TestKind::Alpha, Mode::Ok);
    let runner = spawn_runner(&manager, &ctx, &rec);
    assert!(subscribed(&manager, 1).await);

    ctx.cancel();
    tokio::time::timeout(WITHIN, runner).await.unwrap().unwrap().unwrap();
    assert_eq!(manager.subscriber_count(TestKind::Alpha), Ok(0));
}

#[tokio::test]
async fn runner_for_unknown_kind_fails_fast() {
    let manager = manager();
    let ctx = Context::background();
    let rec = Recorder::new("lost", TestKind::Unregistered, Mode::Ok);

    let err = manager.run_subscription(&ctx, rec.as_ref()).await.unwrap_err();
    assert_eq!(err.as_label(), "event_unknown_kind");
}
