use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;
use zmirror_core::Value;
use zmirror_driver::{DriverEvent, EventKind};
use zmirror_proto::{encode_state, TopicScheme};
use zmirror_remote::{parse_broker_url, RemoteAdapter, RemoteConfig};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mirror_message_roundtrip() {
    if std::env::var("ZMIRROR_INTEGRATION").is_err() {
        eprintln!("Skipping integration test; set ZMIRROR_INTEGRATION=1 to run");
        return;
    }

    let broker = std::env::var("ZMIRROR_MQTT_BROKER")
        .unwrap_or_else(|_| "tcp://localhost:1883".to_string());
    let prefix = format!("it-{}", Uuid::new_v4().simple());

    let config = RemoteConfig {
        mqtt_broker: broker.clone(),
        prefix: prefix.clone(),
        ready_delay: Duration::from_millis(100),
        ..RemoteConfig::default()
    };
    let (mut adapter, eventloop) = RemoteAdapter::new(&config).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    for kind in [EventKind::NodeAdded, EventKind::ValueAdded] {
        let tx = tx.clone();
        adapter.on(kind, move |event| {
            let _ = tx.send(event.clone());
        });
    }

    adapter.subscribe().await.unwrap();
    tokio::spawn(adapter.run(eventloop));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (host, port) = parse_broker_url(&broker).unwrap();
    let mut pub_opts = MqttOptions::new(format!("pub-{}", Uuid::new_v4()), host, port);
    pub_opts.set_keep_alive(Duration::from_secs(5));
    let (pub_client, mut pub_eventloop) = AsyncClient::new(pub_opts, 10);
    tokio::spawn(async move { while pub_eventloop.poll().await.is_ok() {} });

    let scheme = TopicScheme::new(prefix);
    let record = Value {
        node_id: 3,
        class_id: 37,
        instance: 1,
        index: 0,
        label: Some("Switch".to_string()),
        value: Some(json!(0)),
        ..Value::default()
    };
    pub_client
        .publish(
            scheme.value(&record.id()),
            QoS::AtLeastOnce,
            true,
            encode_state(&record).unwrap(),
        )
        .await
        .unwrap();

    let first = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout waiting for mirror event")
        .expect("adapter dropped");
    assert!(matches!(first, DriverEvent::NodeAdded(3)));

    let second = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout waiting for mirror event")
        .expect("adapter dropped");
    let DriverEvent::ValueAdded(3, 37, value) = second else {
        panic!("expected a value added event, got {second:?}");
    };
    assert_eq!(value.value, Some(json!(0)));
}
