mod common;

use tokio::sync::mpsc;

use consensus_core::notify::{ConsensusEvent, VirtualChainChanges};
use graph_inspector::config::ProcessingConfig;
use graph_inspector::{EventIngestor, ProcessingError};

use common::{block_count, hash, open_database, processing, stored, MockEngine};

#[tokio::test]
async fn events_are_applied_in_order_until_channel_closes() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let (sender, receiver) = mpsc::unbounded_channel();

    for (n, parents) in [(1, vec![]), (2, vec![1]), (3, vec![2])] {
        let block = engine.add_block(n, &parents);
        sender.send(ConsensusEvent::BlockAdded(block)).unwrap();
    }
    sender.send(ConsensusEvent::VirtualChange(VirtualChainChanges::new(vec![], vec![hash(2), hash(3)]))).unwrap();
    drop(sender);

    let ingestor = EventIngestor::new(processing(&engine, &db, ProcessingConfig::default()));
    tokio_test::assert_ok!(ingestor.spawn(receiver).await.unwrap());

    assert_eq!(block_count(&db).await, 3);
    assert_eq!(stored(&db, 3).await.unwrap().height, 2);
    assert!(stored(&db, 3).await.unwrap().is_in_virtual_selected_parent_chain);
}

#[tokio::test]
async fn unsupported_event_stops_ingestion() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let (sender, receiver) = mpsc::unbounded_channel();

    sender.send(ConsensusEvent::BlockAdded(engine.add_block(1, &[]))).unwrap();
    sender.send(ConsensusEvent::Unsupported("pruningPointUtxoSetOverride".into())).unwrap();
    sender.send(ConsensusEvent::BlockAdded(engine.add_block(2, &[1]))).unwrap();

    let ingestor = EventIngestor::new(processing(&engine, &db, ProcessingConfig::default()));
    let err = ingestor.run(receiver).await.unwrap_err();

    assert!(matches!(err, ProcessingError::UnsupportedEvent(ref kind) if kind == "pruningPointUtxoSetOverride"));
    assert_eq!(block_count(&db).await, 1);
    drop(sender);
}

#[tokio::test]
async fn failed_event_is_fatal() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let (sender, receiver) = mpsc::unbounded_channel();
    let block = engine.add_block(1, &[]);
    engine.fail_block_info(1);
    sender.send(ConsensusEvent::BlockAdded(block)).unwrap();
    drop(sender);

    let ingestor = EventIngestor::new(processing(&engine, &db, ProcessingConfig::default()));
    let err = ingestor.run(receiver).await.unwrap_err();

    assert!(err.to_string().starts_with("Failed to process block added consensus event"));
    assert_eq!(block_count(&db).await, 0);
}

#[tokio::test]
async fn broken_event_stream_is_fatal() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let (sender, receiver) = mpsc::unbounded_channel();
    sender.send(ConsensusEvent::BlockAdded(engine.add_block(1, &[]))).unwrap();
    sender.send(ConsensusEvent::StreamError("Notification stream error: connection reset".into())).unwrap();
    drop(sender);

    let ingestor = EventIngestor::new(processing(&engine, &db, ProcessingConfig::default()));
    let err = ingestor.spawn(receiver).await.unwrap().unwrap_err();

    assert!(matches!(err, ProcessingError::EventStream(ref reason) if reason.contains("connection reset")));
    assert_eq!(block_count(&db).await, 1);
}
