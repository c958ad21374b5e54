#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use greenbus::{Config, Context, Event, EventManager, Handle, HandlerError};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    Alpha,
    Beta,
    Unregistered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEvent {
    pub kind: TestKind,
    pub seq: u64,
}

impl TestEvent {
    pub fn alpha(seq: u64) -> Self {
        Self {
            kind: TestKind::Alpha,
            seq,
        }
    }
}

impl Event for TestEvent {
    type Kind = TestKind;

    fn kind(&self) -> TestKind {
        self.kind
    }
}

pub fn manager() -> Arc<EventManager<TestEvent>> {
    Arc::new(EventManager::new([TestKind::Alpha, TestKind::Beta]))
}

pub fn manager_with(cfg: Config) -> Arc<EventManager<TestEvent>> {
    Arc::new(EventManager::with_config(cfg, [TestKind::Alpha, TestKind::Beta]))
}

/// Runs the dispatcher on its own task until `ctx` ends.
pub fn spawn_dispatcher(
    manager: &Arc<EventManager<TestEvent>>,
    ctx: &Context,
) -> tokio::task::JoinHandle<()> {
    let (manager, ctx) = (Arc::clone(manager), ctx.clone());
    tokio::spawn(async move { manager.run(&ctx).await })
}

/// Polls `cond` every 5ms until it holds or `within` elapses.
pub async fn eventually<F, Fut>(within: Duration, mut cond: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if cond().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// What a [`Recorder`] does with each event.
#[derive(Clone, Copy, Debug)]
pub enum Mode {
    Ok,
    FailOdd,
    PanicOnFirst,
    Hang,
}

/// Records the sequence numbers it handles.
pub struct Recorder {
    pub kind: TestKind,
    pub mode: Mode,
    pub name: &'static str,
    pub seen: Mutex<Vec<u64>>,
    pub calls: AtomicUsize,
}

impl Recorder {
    pub fn new(name: &'static str, kind: TestKind, mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            kind,
            mode,
            name,
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub async fn seen(&self) -> Vec<u64> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Handle<TestEvent> for Recorder {
    fn event_kind(&self) -> TestKind {
        self.kind
    }

    async fn handle_event(&self, _ctx: &Context, event: &TestEvent) -> Result<(), HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().await.push(event.seq);
        match self.mode {
            Mode::Ok => Ok(()),
            Mode::FailOdd if event.seq % 2 == 1 => Err(HandlerError::fail("odd sequence")),
            Mode::FailOdd => Ok(()),
            Mode::PanicOnFirst if call == 0 => panic!("first event"),
            Mode::PanicOnFirst => Ok(()),
            Mode::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
