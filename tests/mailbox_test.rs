use actor_runtime::framework::{
    Actor, ActorError, ActorProcessOptions, Context, Message, Pid, Router, System, SystemConfig,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records every value it receives, in order.
#[derive(Default)]
struct Recorder {
    seen: Vec<u32>,
}

#[async_trait]
impl Actor for Recorder {
    fn routes(router: &mut Router<Self>) {
        router
            .handle("Record", |rec, _, n: u32| {
                rec.seen.push(n);
                Box::pin(async { Ok(()) })
            })
            .handle_call("Seen", |rec, _, _: u8| {
                let seen = rec.seen.clone();
                Box::pin(async move { Ok(seen) })
            });
    }
}

/// Shared counters observed from outside the actor.
#[derive(Clone, Default)]
struct Probe {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    handled: Arc<AtomicUsize>,
}

/// Yields in the middle of every message so an overlapping drain would be visible.
#[derive(Default)]
struct Guarded {
    probe: Probe,
}

impl Guarded {
    async fn enter(&mut self) -> Result<(), ActorError> {
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.peak.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.probe.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Actor for Guarded {
    fn routes(router: &mut Router<Self>) {
        router.handle_notify("Enter", |guarded, _| Box::pin(guarded.enter()));
    }

    async fn on_init(&mut self, ctx: &mut Context) -> Result<(), ActorError> {
        if let Some(probe) = ctx.init_params::<Probe>() {
            self.probe = probe.clone();
        }
        Ok(())
    }
}

/// Plain counter for the load test.
#[derive(Default)]
struct Counter {
    count: u64,
}

#[async_trait]
impl Actor for Counter {
    fn routes(router: &mut Router<Self>) {
        router
            .handle_notify("Inc", |counter, _| {
                counter.count += 1;
                Box::pin(async { Ok(()) })
            })
            .handle_call("Count", |counter, _, _: u8| {
                let count = counter.count;
                Box::pin(async move { Ok(count) })
            });
    }
}

async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// A message without payload, for `handle_notify` methods.
fn notify(pid: &Pid, method: &str) -> Message {
    Message::inner(None, pid.clone(), method, Bytes::new())
}

#[tokio::test]
async fn test_messages_from_one_sender_arrive_in_order() {
    let system = System::new(SystemConfig::default());
    let pid = system
        .spawn(Recorder::default, (), ActorProcessOptions::new())
        .await
        .unwrap();

    for n in 0..500u32 {
        system.send(None, &pid, "Record", &n).await.unwrap();
    }
    let seen: Vec<u32> = system.call(None, &pid, "Seen", &0u8).await.unwrap();
    assert_eq!(seen, (0..500).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handlers_never_overlap() {
    let system = System::new(SystemConfig::default());
    let probe = Probe::default();
    let pid = system
        .spawn(Guarded::default, probe.clone(), ActorProcessOptions::new())
        .await
        .unwrap();

    let mut senders = Vec::new();
    for _ in 0..8 {
        let system = system.clone();
        let pid = pid.clone();
        senders.push(tokio::spawn(async move {
            for _ in 0..250 {
                let msg = notify(&pid, "Enter");
                system.post_message(&pid, msg).await.unwrap();
            }
        }));
    }
    for sender in senders {
        sender.await.unwrap();
    }

    let handled = probe.handled.clone();
    wait_until("all messages", || handled.load(Ordering::SeqCst) == 2000).await;
    assert_eq!(probe.peak.load(Ordering::SeqCst), 1);

    let stats = system.find(&pid).unwrap().mailbox_stats();
    assert_eq!(stats.in_count, 2001); // plus Init
    assert_eq!(stats.out_count, 2001);
    assert_eq!(stats.queued, 0);
}

/// 100 actors, 10 senders, 1000 messages per actor.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_actors_many_senders() {
    let system = System::new(SystemConfig::default());
    let mut actors = Vec::new();
    for _ in 0..100 {
        let pid = system
            .spawn(Counter::default, (), ActorProcessOptions::new())
            .await
            .unwrap();
        actors.push(pid);
    }
    let actors = Arc::new(actors);

    let mut senders = Vec::new();
    for _ in 0..10 {
        let system = system.clone();
        let actors = actors.clone();
        senders.push(tokio::spawn(async move {
            for _ in 0..100 {
                for pid in actors.iter() {
                    let msg = notify(pid, "Inc");
                    system.post_message(pid, msg).await.unwrap();
                }
            }
        }));
    }
    for sender in senders {
        sender.await.unwrap();
    }

    for pid in actors.iter() {
        let count: u64 = system
            .call_with_timeout(None, pid, "Count", &0u8, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(count, 1000, "actor {pid}");
    }
    system.shutdown().await;
}

#[tokio::test]
async fn test_synchronized_dispatcher_runs_inline() {
    let system = System::new(SystemConfig::default());
    let options = ActorProcessOptions::new().with_dispatcher(system.synchronized_dispatcher());
    let pid = system.spawn(Counter::default, (), options).await.unwrap();

    for _ in 0..3 {
        let msg = notify(&pid, "Inc");
        system.post_message(&pid, msg).await.unwrap();
    }
    // Each post drained before returning
    let stats = system.find(&pid).unwrap().mailbox_stats();
    assert_eq!(stats.out_count, 4);
    assert_eq!(stats.queued, 0);

    let count: u64 = system.call(None, &pid, "Count", &0u8).await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_panicking_message_does_not_stop_the_actor() {
    struct Fragile;

    impl Fragile {
        async fn boom(&mut self) -> Result<(), ActorError> {
            panic!("boom")
        }
    }

    #[async_trait]
    impl Actor for Fragile {
        fn routes(router: &mut Router<Self>) {
            router
                .handle_notify("Boom", |fragile, _| Box::pin(fragile.boom()))
                .handle_call("Ping", |_, _, n: i32| Box::pin(async move { Ok(n + 1) }));
        }
    }

    let system = System::new(SystemConfig::default());
    let pid = system
        .spawn(|| Fragile, (), ActorProcessOptions::new())
        .await
        .unwrap();

    let msg = notify(&pid, "Boom");
    let rsp = system.request(&pid, msg, Duration::from_millis(100)).await;
    assert_eq!(rsp.err, Some(ActorError::CallTimeout));

    let reply: i32 = system.call(None, &pid, "Ping", &1).await.unwrap();
    assert_eq!(reply, 2);
    assert_eq!(system.workers().panics(), 1);
}
