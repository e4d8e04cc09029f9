//! End-to-end tests: producer thread -> store -> hub -> TCP subscriber.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parkwatch_core::{
    BoundingBox, Detection, OccupancyMap, PipelineStatus, Point, StateStore, ZoneId,
    ZoneRegistry, ZoneState,
};
use parkwatch_protocol::DaemonMessage;
use parkwatchd::detect::ReplayDetector;
use parkwatchd::hub::{spawn_hub, HubHandle};
use parkwatchd::producer::{Producer, ProducerExit};
use parkwatchd::publisher::ChangePublisher;
use parkwatchd::server::DaemonServer;
use parkwatchd::source::{FrameSource, StubReader};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

struct Pipeline {
    addr: SocketAddr,
    zones: Arc<ZoneRegistry>,
    store: StateStore,
    hub: HubHandle,
    cancel: CancellationToken,
}

impl Pipeline {
    async fn start() -> Self {
        let zones = Arc::new(
            ZoneRegistry::from_polygons(vec![vec![
                Point::new(50, 50),
                Point::new(150, 50),
                Point::new(150, 100),
                Point::new(50, 100),
            ]])
            .unwrap(),
        );
        let store = StateStore::new(&zones);
        let hub = spawn_hub(store.clone());
        let cancel = CancellationToken::new();
        let server = DaemonServer::bind("127.0.0.1:0".parse().unwrap(), hub.clone(), cancel.clone())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        Self {
            addr,
            zones,
            store,
            hub,
            cancel,
        }
    }

    fn producer(&self, frames: Option<u64>, script: Vec<Vec<Detection>>) -> Producer<HubHandle> {
        let source = FrameSource::new(Box::new(StubReader::new("lot", 200, 120, frames)));
        Producer::new(
            source,
            Box::new(ReplayDetector::new(script)),
            Arc::clone(&self.zones),
            ChangePublisher::new(self.store.clone(), self.hub.clone()),
            self.cancel.child_token(),
        )
        .with_cycle_delay(Duration::from_millis(5))
    }

    async fn wait_for_subscribers(&self, expected: usize) {
        let start = tokio::time::Instant::now();
        while self.hub.subscriber_count().await != expected {
            assert!(start.elapsed() < RECV_TIMEOUT, "subscriber never registered");
            sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn next_update(reader: &mut BufReader<OwnedReadHalf>) -> OccupancyMap {
    loop {
        let mut line = String::new();
        let n = timeout(RECV_TIMEOUT, reader.read_line(&mut line))
            .await
            .expect("timed out waiting for update")
            .unwrap();
        assert!(n > 0, "server closed the connection");
        match serde_json::from_str::<DaemonMessage>(&line).unwrap() {
            DaemonMessage::ParkingUpdate { status } => return status,
            DaemonMessage::Connected { .. } => continue,
            other => panic!("unexpected message {other:?}"),
        }
    }
}

fn car() -> Vec<Detection> {
    vec![Detection::new(BoundingBox::new(90, 60, 110, 80), 0.9, 2)]
}

fn zone1(map: &OccupancyMap) -> Option<ZoneState> {
    map.get(&ZoneId::numbered(1))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscriber_sees_every_transition_in_order() {
    let pipeline = Pipeline::start().await;
    let stream = TcpStream::connect(pipeline.addr).await.unwrap();
    let (reader, _writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    assert_eq!(zone1(&next_update(&mut reader).await), Some(ZoneState::Free));
    pipeline.wait_for_subscribers(1).await;

    // Replay wraps: occupied, occupied, free, free, occupied, ...
    let producer = pipeline
        .producer(None, vec![car(), car(), Vec::new(), Vec::new()])
        .spawn()
        .unwrap();

    let expected = [
        ZoneState::Occupied,
        ZoneState::Free,
        ZoneState::Occupied,
        ZoneState::Free,
    ];
    for state in expected {
        assert_eq!(zone1(&next_update(&mut reader).await), Some(state));
    }

    pipeline.cancel.cancel();
    let exit = tokio::task::spawn_blocking(move || producer.join().unwrap())
        .await
        .unwrap();
    assert!(matches!(exit, ProducerExit::Cancelled { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_subscriber_gets_current_state() {
    let pipeline = Pipeline::start().await;

    // Every frame carries the same car, so occupancy changes once even
    // as the finite source rewinds.
    let producer = pipeline.producer(Some(3), vec![car()]);
    let store = pipeline.store.clone();
    let handle = producer.spawn().unwrap();

    let start = tokio::time::Instant::now();
    while store.occupancy().1 == 0 {
        assert!(start.elapsed() < RECV_TIMEOUT, "producer never published");
        sleep(Duration::from_millis(10)).await;
    }

    let stream = TcpStream::connect(pipeline.addr).await.unwrap();
    let (reader, _writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    assert_eq!(
        zone1(&next_update(&mut reader).await),
        Some(ZoneState::Occupied)
    );

    pipeline.cancel.cancel();
    tokio::task::spawn_blocking(move || handle.join().unwrap())
        .await
        .unwrap();
    // Only one change was ever published
    assert_eq!(store.occupancy().1, 1);
    assert!(!matches!(store.status(), PipelineStatus::Failed(_)));
}
