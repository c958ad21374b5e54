mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Mode, Recorder, TestEvent, TestKind, eventually, manager};
use greenbus::{Config, Context, Handle, RuntimeError, Supervisor};

const WITHIN: Duration = Duration::from_secs(1);

fn cfg(grace: Duration) -> Config {
    Config {
        grace,
        ..Config::default()
    }
}

#[tokio::test]
async fn cancel_stops_dispatcher_and_runners_cleanly() {
    let manager = manager();
    let rec = Recorder::new("recorder", TestKind::Alpha, Mode::Ok);
    let sup = Supervisor::builder(cfg(WITHIN), Arc::clone(&manager))
        .with_handler(rec.clone())
        .build();

    // Subscriptions are taken before `run` spawns anything.
    let ctx = Context::background().with_cancel();
    let run = {
        let (sup, ctx) = (Arc::clone(&sup), ctx.clone());
        tokio::spawn(async move { sup.run(&ctx).await })
    };
    let subscribed = || async { manager.subscriber_count(TestKind::Alpha) == Ok(1) };
    assert!(eventually(WITHIN, subscribed).await);

    for seq in 0..5 {
        sup.manager().publish(&ctx, TestEvent::alpha(seq)).await.unwrap();
    }
    assert!(eventually(WITHIN, || async { rec.seen().await.len() == 5 }).await);
    assert_eq!(rec.seen().await, vec![0, 1, 2, 3, 4]);

    ctx.cancel();
    let res = tokio::time::timeout(WITHIN, run).await.unwrap().unwrap();
    assert!(res.is_ok(), "{res:?}");
    assert_eq!(manager.subscriber_count(TestKind::Alpha), Ok(0));
}

#[tokio::test]
async fn stuck_handler_is_reported_after_grace() {
    let manager = manager();
    let stuck = Recorder::new("stuck-handler", TestKind::Alpha, Mode::Hang);
    let fine = Recorder::new("fine-handler", TestKind::Beta, Mode::Ok);
    let sup = Supervisor::builder(cfg(Duration::from_millis(50)), Arc::clone(&manager))
        .with_handlers(vec![stuck.clone() as Arc<dyn Handle<TestEvent>>, fine])
        .build();

    let ctx = Context::background().with_cancel();
    let run = {
        let (sup, ctx) = (Arc::clone(&sup), ctx.clone());
        tokio::spawn(async move { sup.run(&ctx).await })
    };

    manager.publish(&ctx, TestEvent::alpha(0)).await.unwrap();
    assert!(eventually(WITHIN, || async { stuck.seen().await.len() == 1 }).await);

    ctx.cancel();
    let res = tokio::time::timeout(WITHIN, run).await.unwrap().unwrap();
    match res {
        Err(RuntimeError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_millis(50));
            assert_eq!(stuck, vec!["stuck-handler".to_string()]);
        }
        other => panic!("expected grace exceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_handler_kind_aborts_startup() {
    let manager = manager();
    let good = Recorder::new("good", TestKind::Alpha, Mode::Ok);
    let lost = Recorder::new("lost", TestKind::Unregistered, Mode::Ok);
    let sup = Supervisor::builder(cfg(WITHIN), Arc::clone(&manager))
        .with_handlers(vec![good as Arc<dyn Handle<TestEvent>>, lost])
        .build();

    let err = sup.run(&Context::background()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Subscribe { handler: "lost", .. }), "{err:?}");
    assert_eq!(manager.subscriber_count(TestKind::Alpha), Ok(0));
}
