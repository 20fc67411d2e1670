//! RoboVac session, cache and accessor tests.
//!
//! Runs against an in-memory transport that records every call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use robovac::{
    CleanSpeed, DataPoint, DpMap, ErrorCode, ObserverList, Result, RoboVac, RoboVacConfig,
    RoboVacError, SessionState, StatusSnapshot, Transport, TransportEvent, TransportObserver,
    WorkMode, WorkStatus,
};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Find,
    Connect,
    Disconnect,
    Get,
    Set(serde_json::Value),
}

struct MockTransport {
    calls: Mutex<Vec<Call>>,
    observers: ObserverList,
    address: Mutex<Option<String>>,
    discoverable: AtomicBool,
    fail_connect: AtomicBool,
    fail_get: AtomicBool,
    snapshot: Mutex<StatusSnapshot>,
    /// How long `find` takes before it answers
    find_delay: Mutex<Duration>,
    find_started: Notify,
}

impl MockTransport {
    fn new(address: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            observers: ObserverList::new(),
            address: Mutex::new(address.map(str::to_string)),
            discoverable: AtomicBool::new(true),
            fail_connect: AtomicBool::new(false),
            fail_get: AtomicBool::new(false),
            snapshot: Mutex::new(default_snapshot()),
            find_delay: Mutex::new(Duration::ZERO),
            find_started: Notify::new(),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn set_dp(&self, index: &str, value: serde_json::Value) {
        self.snapshot.lock().unwrap().dps.insert(index.to_string(), value);
    }

    fn emit(&self, event: TransportEvent) {
        self.observers.notify(&event);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Connect);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(RoboVacError::Connection("connection refused".to_string()));
        }
        self.observers.notify(&TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Disconnect);
        self.observers.notify(&TransportEvent::Disconnected);
        Ok(())
    }

    async fn find(&self, _timeout: Duration) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Find);
        self.find_started.notify_one();
        let delay = *self.find_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.discoverable.load(Ordering::SeqCst) {
            *self.address.lock().unwrap() = Some("192.168.1.50".to_string());
            Ok(())
        } else {
            Err(RoboVacError::Discovery("no broadcast received".to_string()))
        }
    }

    async fn get(&self) -> Result<StatusSnapshot> {
        self.calls.lock().unwrap().push(Call::Get);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(RoboVacError::Transport("device busy".to_string()));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn set(&self, data: DpMap) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Set(serde_json::to_value(&data).unwrap()));
        Ok(())
    }

    fn resolved_address(&self) -> Option<String> {
        self.address.lock().unwrap().clone()
    }

    fn subscribe(&self, observer: Arc<dyn TransportObserver>) {
        self.observers.add(observer);
    }
}

fn default_snapshot() -> StatusSnapshot {
    let dps: DpMap = serde_json::from_value(json!({
        "1": true,
        "2": false,
        "3": "forward",
        "5": "auto",
        "15": "Charging",
        "101": false,
        "102": "Standard",
        "103": false,
        "104": 73,
        "106": "no_error"
    }))
    .unwrap();
    StatusSnapshot::new("vac1", dps)
}

fn make_robovac(transport: &Arc<MockTransport>) -> RoboVac {
    let config = RoboVacConfig::new("vac1", "localkey").with_debug_log(true);
    RoboVac::new(config, transport.clone()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_cached_status_reused_within_max_age() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    let first = robovac.get_statuses(false).await.unwrap();
    transport.set_dp("104", json!(10));

    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(robovac.get_statuses(false).await.unwrap(), first);
    }

    assert_eq!(transport.count(&Call::Get), 1);
    assert_eq!(robovac.battery_level(false).await.unwrap(), 73);
}

#[tokio::test]
async fn test_forced_read_always_fetches() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    robovac.get_statuses(true).await.unwrap();
    robovac.get_statuses(true).await.unwrap();
    transport.set_dp("104", json!(72));

    assert_eq!(robovac.battery_level(true).await.unwrap(), 72);
    assert_eq!(transport.count(&Call::Get), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stale_cache_triggers_one_fetch() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    robovac.get_statuses(false).await.unwrap();

    tokio::time::advance(Duration::from_millis(30_000)).await;
    robovac.get_statuses(false).await.unwrap();
    assert_eq!(transport.count(&Call::Get), 1);

    tokio::time::advance(Duration::from_millis(1)).await;
    robovac.get_statuses(false).await.unwrap();
    robovac.get_statuses(false).await.unwrap();
    assert_eq!(transport.count(&Call::Get), 2);
}

#[tokio::test]
async fn test_empty_device_id_fails_before_network() {
    let transport = MockTransport::new(None);

    let result = RoboVac::new(RoboVacConfig::new("", "localkey"), transport.clone());

    assert!(matches!(result, Err(RoboVacError::Config(_))));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_set_clean_speed_writes_single_entry() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    robovac.set_clean_speed(CleanSpeed::Max).await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![Call::Connect, Call::Set(json!({ "102": "Max" }))]
    );
}

#[tokio::test]
async fn test_battery_level_returned_unchanged() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    assert_eq!(robovac.battery_level(false).await.unwrap(), 73);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_runs_before_connect_even_when_it_fails() {
    let transport = MockTransport::new(None);
    transport.discoverable.store(false, Ordering::SeqCst);
    let robovac = make_robovac(&transport);

    robovac.go_home().await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![Call::Find, Call::Connect, Call::Set(json!({ "101": true }))]
    );
}

#[tokio::test]
async fn test_start_cleaning_end_to_end() {
    let transport = MockTransport::new(None);
    let robovac = make_robovac(&transport);
    assert_eq!(robovac.session_state(), SessionState::Disconnected);

    robovac.start_cleaning(false).await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![
            Call::Find,
            Call::Connect,
            Call::Get,
            Call::Set(json!({ "5": "auto" })),
        ]
    );
    assert_eq!(robovac.session_state(), SessionState::Connected);

    // Second run reuses the connection and the cached status
    robovac.start_cleaning(false).await.unwrap();
    assert_eq!(transport.count(&Call::Connect), 1);
    assert_eq!(transport.count(&Call::Get), 1);
    assert_eq!(transport.count(&Call::Set(json!({ "5": "auto" }))), 2);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_entry() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    let cached = robovac.get_statuses(false).await.unwrap();
    transport.fail_get.store(true, Ordering::SeqCst);

    let err = robovac.get_statuses(true).await.unwrap_err();
    assert!(matches!(err, RoboVacError::Transport(_)));

    assert_eq!(robovac.last_status().unwrap().snapshot, cached);
    assert_eq!(robovac.get_statuses(false).await.unwrap(), cached);
    assert_eq!(transport.count(&Call::Get), 2);
}

#[tokio::test]
async fn test_connect_failure_propagates_and_retries_next_call() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    transport.fail_connect.store(true, Ordering::SeqCst);
    let robovac = make_robovac(&transport);

    let err = robovac.set_find_robot(true).await.unwrap_err();
    assert!(matches!(err, RoboVacError::Connection(_)));
    assert!(robovac.last_status().is_none());

    transport.fail_connect.store(false, Ordering::SeqCst);
    robovac.set_find_robot(true).await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![Call::Connect, Call::Connect, Call::Set(json!({ "103": true }))]
    );
}

#[tokio::test]
async fn test_disconnect_event_forces_reconnect() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    robovac.play().await.unwrap();
    assert!(robovac.is_connected());

    transport.emit(TransportEvent::Disconnected);
    assert_eq!(robovac.session_state(), SessionState::Disconnected);

    robovac.go_home().await.unwrap();
    assert_eq!(transport.count(&Call::Connect), 2);
}

#[tokio::test]
async fn test_explicit_disconnect_keeps_cached_status() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    robovac.connect().await.unwrap();
    robovac.connect().await.unwrap();
    robovac.get_statuses(false).await.unwrap();
    robovac.disconnect().await.unwrap();

    assert!(!robovac.is_connected());
    assert!(robovac.last_status().is_some());
    assert_eq!(transport.calls(), vec![Call::Connect, Call::Get, Call::Disconnect]);
}

#[tokio::test]
async fn test_play_and_pause_write_same_command() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    robovac.play().await.unwrap();
    robovac.pause().await.unwrap();

    assert_eq!(transport.count(&Call::Set(json!({ "2": true }))), 2);
}

#[tokio::test]
async fn test_multi_entry_set_is_one_write() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    robovac
        .set([
            (DataPoint::WorkMode, json!(WorkMode::Spot.as_str())),
            (DataPoint::CleanSpeed, json!(CleanSpeed::BoostIq.as_str())),
        ])
        .await
        .unwrap();

    assert_eq!(
        transport.calls(),
        vec![
            Call::Connect,
            Call::Set(json!({ "5": "Spot", "102": "Boost_IQ" })),
        ]
    );
}

#[tokio::test]
async fn test_typed_reads() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);

    assert_eq!(robovac.work_status(false).await.unwrap(), WorkStatus::Charging);
    assert_eq!(robovac.work_mode(false).await.unwrap(), WorkMode::Auto);
    assert_eq!(robovac.clean_speed(false).await.unwrap(), CleanSpeed::Standard);
    assert_eq!(robovac.error_code(false).await.unwrap(), ErrorCode::NoError);
    assert!(!robovac.play_pause(false).await.unwrap());
    assert!(!robovac.is_going_home(false).await.unwrap());
    assert!(!robovac.find_robot(false).await.unwrap());
    assert_eq!(robovac.get(DataPoint::Power, false).await.unwrap(), json!(true));
    assert_eq!(transport.count(&Call::Get), 1);
}

#[tokio::test]
async fn test_out_of_domain_value_passes_through() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    transport.set_dp("15", json!("Mopping"));
    transport.set_dp("106", json!("Dustbin_full"));
    let robovac = make_robovac(&transport);

    assert_eq!(
        robovac.work_status(false).await.unwrap(),
        WorkStatus::Other("Mopping".to_string())
    );
    let code = robovac.error_code(false).await.unwrap();
    assert!(!code.is_known());
    assert_eq!(code.as_str(), "Dustbin_full");
}

#[tokio::test]
async fn test_missing_and_mistyped_values() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    transport.snapshot.lock().unwrap().dps.remove("106");
    transport.set_dp("104", json!("full"));
    transport.set_dp("101", json!("true"));
    transport.set_dp("102", json!(3));
    let robovac = make_robovac(&transport);

    assert!(matches!(
        robovac.error_code(false).await,
        Err(RoboVacError::MissingDataPoint(DataPoint::ErrorCode))
    ));
    assert!(matches!(
        robovac.battery_level(false).await,
        Err(RoboVacError::UnexpectedValue { dp: DataPoint::BatteryLevel, .. })
    ));
    assert!(matches!(
        robovac.is_going_home(false).await,
        Err(RoboVacError::UnexpectedValue { dp: DataPoint::GoHome, .. })
    ));
    assert!(matches!(
        robovac.clean_speed(false).await,
        Err(RoboVacError::UnexpectedValue { dp: DataPoint::CleanSpeed, .. })
    ));
}

#[tokio::test]
async fn test_events_reach_subscribers() {
    let transport = MockTransport::new(Some("192.168.1.50"));
    let robovac = make_robovac(&transport);
    let mut events = robovac.subscribe_events();

    robovac.connect().await.unwrap();
    transport.emit(TransportEvent::DpRefresh(json!({ "104": 70 })));

    assert_eq!(events.recv().await.unwrap(), TransportEvent::Connected);
    assert_eq!(
        events.recv().await.unwrap(),
        TransportEvent::DpRefresh(json!({ "104": 70 }))
    );

    // Partial refreshes are not merged into the cache
    assert_eq!(robovac.battery_level(false).await.unwrap(), 73);
}

#[tokio::test(start_paused = true)]
async fn test_state_is_discovering_while_find_runs() {
    let transport = MockTransport::new(None);
    *transport.find_delay.lock().unwrap() = Duration::from_secs(3600);
    transport.fail_connect.store(true, Ordering::SeqCst);
    let robovac = Arc::new(make_robovac(&transport));

    let task = tokio::spawn({
        let robovac = robovac.clone();
        async move { robovac.go_home().await }
    });

    transport.find_started.notified().await;
    assert_eq!(robovac.session_state(), SessionState::Discovering);

    // The find never answers; the session gives up and still tries to connect
    let result = task.await.unwrap();
    assert!(matches!(result, Err(RoboVacError::Connection(_))));
    assert_eq!(robovac.session_state(), SessionState::Disconnected);
    assert_eq!(transport.calls(), vec![Call::Find, Call::Connect]);
}

#[tokio::test(start_paused = true)]
async fn test_find_answering_at_its_deadline_is_kept() {
    let transport = MockTransport::new(None);
    // Same as the configured timeoutDuration of 2 s
    *transport.find_delay.lock().unwrap() = Duration::from_secs(2);
    let robovac = make_robovac(&transport);

    robovac.go_home().await.unwrap();

    assert_eq!(transport.resolved_address().as_deref(), Some("192.168.1.50"));
    assert_eq!(
        transport.calls(),
        vec![Call::Find, Call::Connect, Call::Set(json!({ "101": true }))]
    );

    // Address is known now, so a reconnect skips discovery
    transport.emit(TransportEvent::Disconnected);
    robovac.go_home().await.unwrap();
    assert_eq!(transport.count(&Call::Find), 1);
}
