//! Bbox statistics cache integration tests.
//!
//! Tests verify:
//! - Coarse-scale bboxstats requests read the source once per TTL window
//! - Fine-scale requests never touch the source
//! - Concurrent misses share a single computation
//! - Failures surface with their status and are not cached

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;

use tiler_postprocess::raster::BoundingBox;
use tiler_postprocess::stats::ManualClock;
use tiler_postprocess::{ErrorResponse, ProcessRequest};

use super::test_utils::{
    processor, request_tile, stats_cache, TrackingSource, HEATMAP_ASSET,
};

const COARSE: &str = r#"{"bbox": [0, 0, 50, 50], "scale": 7}"#;
const FINE: &str = r#"{"bbox": [0, 0, 50, 50], "scale": 6}"#;

fn bboxstats(params: &str) -> ProcessRequest {
    ProcessRequest::new().with_algorithm("bboxstats", Some(params))
}

// =============================================================================
// Reuse and Expiry
// =============================================================================

#[tokio::test]
async fn test_repeated_requests_read_once() {
    let source = TrackingSource::with_heatmap().await;
    let clock = Arc::new(ManualClock::new());
    let processor = processor(stats_cache(source.clone(), clock.clone()));
    let tile = request_tile();

    for _ in 0..3 {
        let processed = processor.process(&tile, &bboxstats(COARSE)).await.unwrap();
        // bbox min/max is [10, 20]
        assert_eq!(processed.tile.data()[[0, 0, 0]], 0);
        assert_eq!(processed.tile.data()[[0, 0, 1]], 127);
        assert_eq!(processed.tile.data()[[0, 1, 1]], 0);
        assert_eq!(processed.tile.mask()[[0, 1, 1]], 255);
    }
    assert_eq!(source.open_count(), 1);

    clock.advance(Duration::from_secs(30));
    processor.process(&tile, &bboxstats(COARSE)).await.unwrap();
    assert_eq!(source.open_count(), 1);

    clock.advance(Duration::from_secs(31));
    processor.process(&tile, &bboxstats(COARSE)).await.unwrap();
    assert_eq!(source.open_count(), 2);
}

#[tokio::test]
async fn test_fine_scale_uses_dataset_statistics() {
    let source = TrackingSource::with_heatmap().await;
    let processor = processor(stats_cache(source.clone(), Arc::new(ManualClock::new())));

    let processed = processor
        .process(&request_tile(), &bboxstats(FINE))
        .await
        .unwrap();

    // dataset min/max is [0, 1000]
    assert_eq!(processed.tile.data()[[0, 0, 0]], 2);
    assert_eq!(processed.tile.data()[[0, 0, 1]], 3);
    assert_eq!(source.open_count(), 0);
}

#[tokio::test]
async fn test_distinct_bboxes_are_cached_separately() {
    let source = TrackingSource::with_heatmap().await;
    let cache = stats_cache(source.clone(), Arc::new(ManualClock::new()));

    let lower = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
    let full = BoundingBox::new(0.0, 0.0, 100.0, 100.0);

    let lower_stats = cache.get_or_compute(HEATMAP_ASSET, &lower).await.unwrap();
    let full_stats = cache.get_or_compute(HEATMAP_ASSET, &full).await.unwrap();

    assert_eq!(lower_stats[0].min, 10.0);
    assert_eq!(lower_stats[0].max, 20.0);
    assert_eq!(full_stats[0].min, 0.0);
    assert_eq!(full_stats[0].max, 1000.0);
    assert_eq!(source.open_count(), 2);
    assert_eq!(cache.len().await, 2);

    cache.get_or_compute(HEATMAP_ASSET, &lower).await.unwrap();
    assert_eq!(source.open_count(), 2);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_misses_compute_once() {
    let source = TrackingSource::with_heatmap()
        .await
        .with_delay(Duration::from_millis(50));
    let processor = Arc::new(processor(stats_cache(
        source.clone(),
        Arc::new(ManualClock::new()),
    )));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let processor = processor.clone();
            tokio::spawn(async move {
                processor
                    .process(&request_tile(), &bboxstats(COARSE))
                    .await
                    .map(|processed| processed.tile.data()[[0, 0, 1]])
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 127);
    }
    assert_eq!(source.open_count(), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_missing_resource_is_not_cached() {
    let source = TrackingSource::new();
    let processor = processor(stats_cache(source.clone(), Arc::new(ManualClock::new())));
    let tile = request_tile();

    let err = processor
        .process(&tile, &bboxstats(COARSE))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.to_string().contains(HEATMAP_ASSET));

    let response = ErrorResponse::from(&err);
    assert_eq!(response.error, "not_found");
    assert_eq!(response.status, 500);

    // Once the resource appears the next request reads it.
    source.insert(HEATMAP_ASSET, super::test_utils::heatmap_raster()).await;
    let processed = processor.process(&tile, &bboxstats(COARSE)).await.unwrap();
    assert_eq!(processed.tile.data()[[0, 0, 1]], 127);
    assert_eq!(source.open_count(), 2);
}

#[tokio::test]
async fn test_tile_without_asset_fails() {
    let processor = processor(stats_cache(
        TrackingSource::with_heatmap().await,
        Arc::new(ManualClock::new()),
    ));
    let tile = tiler_postprocess::RasterTile::new(
        request_tile().data().clone(),
        *request_tile().transform(),
        "EPSG:3857",
    );

    let err = processor
        .process(&tile, &bboxstats(COARSE))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ErrorResponse::from(&err).error, "missing_asset");
}
