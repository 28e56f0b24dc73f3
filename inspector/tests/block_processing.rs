mod common;

use consensus_core::block::BlockStatus;
use database::HeightGroup;
use graph_inspector::config::ProcessingConfig;

use common::{block_count, edge_count, hash, open_database, processing, stored, stored_id, MockEngine};

#[tokio::test]
async fn siblings_share_a_height_group() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let h0 = engine.add_block(1, &[]);
    let h1a = engine.add_block(2, &[1]);
    let h1b = engine.add_block(3, &[1]);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    for block in [&h0, &h1a, &h1b] {
        processing.process_block(block).await.unwrap();
    }

    let mut conn = db.pool().acquire().await.unwrap();
    assert_eq!(db.height_groups().height_group(&mut conn, 0).await.unwrap(), Some(HeightGroup { height: 0, size: 1 }));
    assert_eq!(db.height_groups().height_group(&mut conn, 1).await.unwrap(), Some(HeightGroup { height: 1, size: 2 }));

    let root = stored(&db, 1).await.unwrap();
    let first = stored(&db, 2).await.unwrap();
    let second = stored(&db, 3).await.unwrap();
    assert_eq!((root.height, root.height_group_index), (0, 0));
    assert_eq!((first.height, first.height_group_index), (1, 0));
    assert_eq!((second.height, second.height_group_index), (1, 1));
    assert_eq!(first.parent_ids, vec![root.id]);

    for child in [&first, &second] {
        let edges = db.edges().edges_from(&mut conn, child.id).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to_block_id, root.id);
        assert_eq!(edges[0].to_height, 0);
        assert_eq!(edges[0].from_height_group_index, child.height_group_index);
    }
    assert_eq!(edge_count(&db).await, 2);

    // GHOSTDAG data of a fully available block is recorded
    assert_eq!(first.selected_parent_id, Some(root.id));
    assert_eq!(first.merge_set_blue_ids, vec![root.id]);
    assert_eq!(root.selected_parent_id, None);
}

#[tokio::test]
async fn height_follows_highest_parent() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let blocks = [
        engine.add_block(1, &[]),
        engine.add_block(2, &[1]),
        engine.add_block(3, &[2]),
        engine.add_block(4, &[2, 3]),
        engine.add_block(5, &[1, 4]),
    ];
    let processing = processing(&engine, &db, ProcessingConfig::default());
    for block in &blocks {
        processing.process_block(block).await.unwrap();
    }

    let heights: Vec<u64> = heights_of(&db, 1..=5).await;
    assert_eq!(heights, vec![0, 1, 2, 3, 4]);
    assert_eq!(edge_count(&db).await, 6);
}

async fn heights_of(db: &database::Database, range: std::ops::RangeInclusive<u64>) -> Vec<u64> {
    let mut heights = Vec::new();
    for n in range {
        heights.push(stored(db, n).await.unwrap().height);
    }
    heights
}

#[tokio::test]
async fn processing_is_idempotent() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let root = engine.add_block(1, &[]);
    let child = engine.add_block(2, &[1]);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    processing.process_block(&root).await.unwrap();
    processing.process_block(&child).await.unwrap();
    let before = stored(&db, 2).await.unwrap();

    processing.process_block(&child).await.unwrap();
    processing.process_block(&root).await.unwrap();

    assert_eq!(block_count(&db).await, 2);
    assert_eq!(edge_count(&db).await, 1);
    assert_eq!(stored(&db, 2).await.unwrap(), before);
    let mut conn = db.pool().acquire().await.unwrap();
    assert_eq!(db.height_groups().height_group_size(&mut conn, 1).await.unwrap(), 1);
}

#[tokio::test]
async fn missing_ancestors_are_inserted_first() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let root = engine.add_block(1, &[]);
    engine.add_block(2, &[1]);
    engine.add_block(3, &[2]);
    engine.add_block(4, &[2]);
    let tip = engine.add_block(5, &[3, 4]);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    processing.process_block(&root).await.unwrap();
    processing.process_block(&tip).await.unwrap();

    assert_eq!(block_count(&db).await, 5);
    assert_eq!(edge_count(&db).await, 5);
    assert_eq!(stored(&db, 2).await.unwrap().height, 1);
    assert_eq!(stored(&db, 5).await.unwrap().height, 3);

    let mut layout: Vec<u64> = vec![stored(&db, 3).await.unwrap().height_group_index, stored(&db, 4).await.unwrap().height_group_index];
    layout.sort();
    assert_eq!(layout, vec![0, 1]);

    // Every collected block is complete, so all of them carry a selected parent
    for n in 2..=5 {
        assert!(stored(&db, n).await.unwrap().selected_parent_id.is_some(), "block {}", n);
    }
}

#[tokio::test]
async fn dependency_reached_through_two_paths_precedes_both() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let root = engine.add_block(1, &[]);
    engine.add_block(2, &[1]);
    engine.add_block(3, &[2]);
    // 2 is a parent of the target and of its other parent 3
    let target = engine.add_block(4, &[2, 3]);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    processing.process_block(&root).await.unwrap();
    processing.process_block(&target).await.unwrap();

    assert_eq!(stored(&db, 2).await.unwrap().height, 1);
    assert_eq!(stored(&db, 3).await.unwrap().height, 2);
    assert_eq!(stored(&db, 4).await.unwrap().height, 3);
    assert_eq!(edge_count(&db).await, 4);
    assert!(stored(&db, 2).await.unwrap().id < stored(&db, 3).await.unwrap().id);
}

#[tokio::test]
async fn incomplete_block_is_inserted_without_ghostdag_data() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let root = engine.add_block(1, &[]);
    // Parent 9 is unknown to the engine
    let orphan = engine.add_block(2, &[1, 9]);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    processing.process_block(&root).await.unwrap();
    processing.process_block(&orphan).await.unwrap();

    let record = stored(&db, 2).await.unwrap();
    assert_eq!(record.height, 1);
    assert_eq!(record.parent_ids, vec![stored_id(&db, 1).await]);
    assert_eq!(record.selected_parent_id, None);
    assert!(record.merge_set_blue_ids.is_empty());
    assert_eq!(edge_count(&db).await, 1);

    // Once the engine serves the missing parent, a descendant pulls it in
    engine.add_block(9, &[1]);
    let child = engine.add_block(3, &[2, 9]);
    processing.process_block(&child).await.unwrap();

    let parent = stored(&db, 9).await.unwrap();
    assert_eq!(parent.height, 1);
    assert_eq!(parent.height_group_index, 1);
    let child = stored(&db, 3).await.unwrap();
    assert_eq!(child.height, 2);
    assert_eq!(child.parent_ids.len(), 2);
    assert!(child.selected_parent_id.is_some());
}

#[tokio::test]
async fn incomplete_block_keeps_its_structure_when_reprocessed() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let root = engine.add_block(1, &[]);
    let orphan = engine.add_block(2, &[1, 9]);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    processing.process_block(&root).await.unwrap();
    processing.process_block(&orphan).await.unwrap();

    let late_parent = engine.add_block(9, &[1]);
    processing.process_block(&late_parent).await.unwrap();
    processing.process_block(&orphan).await.unwrap();

    // Height, parents and edges stay as first inserted, only GHOSTDAG data is filled in
    let record = stored(&db, 2).await.unwrap();
    assert_eq!(record.height, 1);
    assert_eq!(record.parent_ids, vec![stored_id(&db, 1).await]);
    assert_eq!(record.selected_parent_id, Some(stored_id(&db, 1).await));
    assert_eq!(record.merge_set_blue_ids, vec![stored_id(&db, 1).await, stored_id(&db, 9).await]);
    assert_eq!(edge_count(&db).await, 2);
    assert_eq!(block_count(&db).await, 3);
}

#[tokio::test]
async fn header_only_block_is_enriched_later() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let root = engine.add_block(1, &[]);
    let block = engine.add_block(2, &[1]);
    engine.set_status(2, BlockStatus::HeaderOnly);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    processing.process_block(&root).await.unwrap();
    processing.process_block(&block).await.unwrap();
    assert_eq!(stored(&db, 2).await.unwrap().selected_parent_id, None);

    engine.set_status(2, BlockStatus::UtxoValid);
    processing.process_block(&block).await.unwrap();
    assert_eq!(stored(&db, 2).await.unwrap().selected_parent_id, Some(stored_id(&db, 1).await));
    assert_eq!(block_count(&db).await, 2);
}

#[tokio::test]
async fn unresolvable_merge_set_members_are_skipped() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let root = engine.add_block(1, &[]);
    let side = engine.add_block(2, &[1]);
    let block = engine.add_block(3, &[1, 2]);
    engine.set_ghostdag(3, 7, &[1, 8], &[2, 9]);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    for block in [&root, &side, &block] {
        processing.process_block(block).await.unwrap();
    }

    let record = stored(&db, 3).await.unwrap();
    assert_eq!(record.selected_parent_id, None);
    assert_eq!(record.merge_set_blue_ids, vec![stored_id(&db, 1).await]);
    assert_eq!(record.merge_set_red_ids, vec![stored_id(&db, 2).await]);
}

#[tokio::test]
async fn failed_block_is_rolled_back() {
    let (_tmp, db) = open_database().await;
    let engine = MockEngine::new();
    let root = engine.add_block(1, &[]);
    engine.add_block(2, &[1]);
    let tip = engine.add_block(3, &[2]);
    engine.fail_block_info(3);
    let processing = processing(&engine, &db, ProcessingConfig::default());

    processing.process_block(&root).await.unwrap();
    let err = processing.process_block(&tip).await.unwrap_err();
    assert!(err.to_string().contains(&hash(3).to_string()));

    // Neither the block nor its collected dependency survive, in the cache or on disk
    assert!(db.cache().is_empty());
    assert_eq!(block_count(&db).await, 1);
    assert!(stored(&db, 2).await.is_none());
    let mut conn = db.pool().acquire().await.unwrap();
    assert!(!db.blocks().does_block_exist(&mut conn, &hash(2)).await.unwrap());
    assert_eq!(db.height_groups().height_group_size(&mut conn, 1).await.unwrap(), 0);
}
