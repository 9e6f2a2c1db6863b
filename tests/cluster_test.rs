use actor_runtime::framework::mock::MockTransport;
use actor_runtime::framework::{
    Actor, ActorError, ActorProcessOptions, Context, LocalCluster, Pid, Router, System,
    SystemConfig,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Keeps the notices it receives; answers `Where` with its node id.
#[derive(Default)]
struct Board {
    notices: Vec<String>,
}

#[async_trait]
impl Actor for Board {
    fn routes(router: &mut Router<Self>) {
        router
            .handle("Notice", |board, _, text: String| {
                board.notices.push(text);
                Box::pin(async { Ok(()) })
            })
            .handle_call("Notices", |board, _, _: u8| {
                let notices = board.notices.clone();
                Box::pin(async move { Ok(notices) })
            })
            .handle_call("Where", |_, ctx, _: u8| {
                let node = ctx.self_pid().node_id();
                Box::pin(async move { Ok(node) })
            })
            .handle_call("Ask", |board, ctx, to: Pid| Box::pin(board.ask(ctx, to)));
    }
}

impl Board {
    /// Calls `Where` on another board, usually on another node.
    async fn ask(&mut self, ctx: &mut Context, to: Pid) -> Result<u64, ActorError> {
        ctx.call(&to, "Where", &0u8).await
    }
}

fn node(id: u64) -> System {
    System::new(SystemConfig {
        node_id: id,
        ..SystemConfig::default()
    })
}

async fn board(system: &System) -> Pid {
    system
        .spawn(Board::default, (), ActorProcessOptions::new().with_name("board"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_call_is_location_transparent() {
    let cluster = LocalCluster::new();
    let (one, two) = (node(1), node(2));
    cluster.join(&one, &[]);
    cluster.join(&two, &[]);
    let local = board(&one).await;
    let remote = board(&two).await;

    // Same code path from the caller's side
    let here: u64 = one.call(None, &local, "Where", &0u8).await.unwrap();
    let there: u64 = one.call(None, &remote, "Where", &0u8).await.unwrap();
    assert_eq!((here, there), (1, 2));

    // By name on the other node, and actor to actor across nodes
    let named: u64 = one.call(None, &Pid::named(2, "board"), "Where", &0u8).await.unwrap();
    assert_eq!(named, 2);
    let asked: u64 = one.call(None, &local, "Ask", &remote).await.unwrap();
    assert_eq!(asked, 2);

    // Errors cross the cluster unchanged
    let missing: Result<u64, _> = one.call(None, &remote, "Nope", &0u8).await;
    assert_eq!(missing, Err(ActorError::ActorNotMethod));
    let gone: Result<u64, _> = one.call(None, &Pid::new(2, 99), "Where", &0u8).await;
    assert_eq!(gone, Err(ActorError::ProcessNotExist));
    let unknown: Result<u64, _> = one.call(None, &Pid::new(3, 1), "Where", &0u8).await;
    assert_eq!(unknown, Err(ActorError::ProcessNotExist));
}

#[tokio::test]
async fn test_remote_kill_is_refused() {
    let cluster = LocalCluster::new();
    let (one, two) = (node(1), node(2));
    cluster.join(&one, &[]);
    cluster.join(&two, &[]);
    let remote = board(&two).await;

    assert_eq!(one.kill(&remote).await, Err(ActorError::NotLocalPid));
    assert!(two.find(&remote).is_some());
}

#[tokio::test]
async fn test_broadcast_reaches_subscribed_nodes() {
    let cluster = LocalCluster::new();
    let (one, two, three) = (node(1), node(2), node(3));
    cluster.join(&one, &["board"]);
    cluster.join(&two, &["board"]);
    cluster.join(&three, &[]);
    let boards = [board(&one).await, board(&two).await, board(&three).await];

    one.broadcast(None, "board", "Notice", "hello")
        .await
        .unwrap();

    let mut received = Vec::new();
    for (system, pid) in [&one, &two, &three].into_iter().zip(&boards) {
        let notices: Vec<String> = system.call(None, pid, "Notices", &0u8).await.unwrap();
        received.push(notices.len());
    }
    assert_eq!(received, vec![1, 1, 0]);
}

#[tokio::test]
async fn test_stopped_node_is_unreachable() {
    let cluster = LocalCluster::new();
    let one = node(1);
    cluster.join(&one, &[]);
    {
        let two = node(2);
        cluster.join(&two, &[]);
        board(&two).await;
        two.shutdown().await;
    }
    let result: Result<u64, _> = one
        .call_with_timeout(None, &Pid::named(2, "board"), "Where", &0u8, Duration::from_millis(200))
        .await;
    assert!(result.is_err());
}

/// Checks outbound cluster traffic without a second node.
#[tokio::test]
async fn test_mock_transport_sees_remote_traffic() {
    let system = node(1);
    let mock = MockTransport::new();
    system.set_remote(Arc::new(mock.clone()));

    mock.expect_send(Pid::named(2, "board")).return_ok();
    mock.expect_call(Pid::new(2, 7)).return_ok(&2u64);
    mock.expect_broadcast("board").return_err(ActorError::TransportNil);

    system
        .send(None, &Pid::named(2, "board"), "Notice", "hi")
        .await
        .unwrap();
    let node: u64 = system.call(None, &Pid::new(2, 7), "Where", &0u8).await.unwrap();
    assert_eq!(node, 2);
    let failed = system.broadcast(None, "board", "Notice", "all").await;
    assert_eq!(failed, Err(ActorError::TransportNil));

    // Local traffic never reaches the transport
    let local = board(&system).await;
    let _: u64 = system.call(None, &local, "Where", &0u8).await.unwrap();

    mock.verify();
    assert_eq!(mock.received().len(), 3);
}
