//! # Sync Scenario Tests
//!
//! End-to-end runs of the relay runtime against an in-memory source chain
//! and an in-memory mirror.
//!
//! ## Covered
//!
//! - Catch-up, reorg healing, and the catastrophic-reorg bound
//! - Daemon survival across a transient source outage
//! - No-op, batch-bound and payload contiguity properties

use std::sync::Arc;
use std::time::Duration;

use relay_runtime::{RelayRuntime, RunOutcome};
use relay_sync::{
    build_header_chain, BlockHash, BlockHeader, InMemoryMirror, MockSourceChain, RelayError,
    ReorgResolver, SyncConfig, HEADER_SIZE,
};

// =============================================================================
// Helpers
// =============================================================================

const BASE: u64 = 717_690;

fn sync_config() -> SyncConfig {
    SyncConfig {
        tick_interval_secs: 60,
        ..SyncConfig::for_testing()
    }
}

/// Headers for heights `BASE..BASE + len`.
fn chain(len: usize) -> Vec<BlockHeader> {
    build_header_chain(BlockHash::ZERO, len, 0)
}

/// Source holds all of `headers`; the mirror has accepted the first `mirror_len`.
fn fixture(
    headers: &[BlockHeader],
    mirror_len: usize,
) -> (Arc<MockSourceChain>, Arc<InMemoryMirror>) {
    let source = Arc::new(MockSourceChain::new(BASE, headers.to_vec()));
    let mirror = Arc::new(InMemoryMirror::with_chain(BASE, &headers[..mirror_len]));
    (source, mirror)
}

/// Replace everything above `fork_height` with `count` fresh headers.
fn reorg(source: &MockSourceChain, fork_height: u64, count: usize) {
    let parent = source.hash_at_height(fork_height).unwrap();
    source.reorg_from(fork_height, build_header_chain(parent, count, 0xfeed));
}

fn single_shot(source: &Arc<MockSourceChain>, mirror: &Arc<InMemoryMirror>) -> RelayRuntime {
    RelayRuntime::with_adapters(sync_config(), source.clone(), mirror.clone(), false)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_catch_up_two_headers() {
    let headers = chain(7);
    let (source, mirror) = fixture(&headers, 5);
    assert_eq!(mirror.current_tip().unwrap().height, 717_694);
    assert_eq!(source.tip_height(), 717_696);

    let outcome = single_shot(&source, &mirror).run().await.unwrap();

    let report = match outcome {
        RunOutcome::Single(Some(report)) => report,
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(report.submitted, 2);
    assert_eq!(report.reorg_depth(), 0);

    let tip = mirror.current_tip().unwrap();
    assert_eq!(tip.height, 717_696);
    assert_eq!(tip.hash, headers[6].block_hash());

    let batches = mirror.accepted_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].start_height, 717_695);
    assert_eq!(batches[0].header_count, 2);
}

#[tokio::test]
async fn test_depth_one_reorg_heals() {
    let headers = chain(6);
    let (source, mirror) = fixture(&headers, 6);
    reorg(&source, 717_694, 3);
    assert_ne!(
        mirror.stored_hash(717_695),
        source.hash_at_height(717_695)
    );

    let resolver = ReorgResolver::new(source.clone(), mirror.clone());
    let tip = mirror.current_tip().unwrap();
    assert_eq!(resolver.find_common_ancestor(&tip, 50).await.unwrap(), 717_694);

    single_shot(&source, &mirror).run().await.unwrap();

    let batches = mirror.accepted_batches();
    assert_eq!(batches[0].start_height, 717_695);
    assert_eq!(mirror.current_tip().unwrap().height, 717_697);
    assert_eq!(
        mirror.stored_hash(717_695),
        source.hash_at_height(717_695)
    );
}

#[tokio::test]
async fn test_reorg_beyond_lookback_is_catastrophic() {
    let headers = chain(60);
    let (source, mirror) = fixture(&headers, 60);
    let mirror_tip = mirror.current_tip().unwrap().height;
    reorg(&source, mirror_tip - 51, 53);

    let err = single_shot(&source, &mirror).run().await.unwrap_err();

    assert!(matches!(err, RelayError::CatastrophicReorg { max_lookback: 50, .. }));
    assert_eq!(mirror.write_calls(), 0);
    assert_eq!(mirror.current_tip().unwrap().height, mirror_tip);
}

#[tokio::test(start_paused = true)]
async fn test_daemon_survives_source_outage() {
    let headers = chain(7);
    let (source, mirror) = fixture(&headers, 5);
    source.fail_next_calls(1);

    let runtime = Arc::new(RelayRuntime::with_adapters(
        sync_config(),
        source.clone(),
        mirror.clone(),
        true,
    ));
    let shutdown = runtime.shutdown_handle();
    let daemon = {
        let runtime = runtime.clone();
        tokio::spawn(async move { runtime.run().await })
    };

    // Tick 1 has failed; the loop is still alive.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(!daemon.is_finished());
    assert_eq!(mirror.current_tip().unwrap().height, 717_694);

    // Tick 2 succeeds.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(mirror.current_tip().unwrap().height, 717_696);

    shutdown.send(true).unwrap();
    let outcome = daemon.await.unwrap().unwrap();
    match outcome {
        RunOutcome::Daemon(summary) => {
            assert_eq!(summary.ticks, 2);
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.succeeded, 1);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_daemon_keeps_running_after_rejection() {
    let headers = chain(7);
    let (source, mirror) = fixture(&headers, 5);
    mirror.reject_next_submission("Invalid proof of work");

    let runtime = Arc::new(RelayRuntime::with_adapters(
        sync_config(),
        source.clone(),
        mirror.clone(),
        true,
    ));
    let shutdown = runtime.shutdown_handle();
    let daemon = {
        let runtime = runtime.clone();
        tokio::spawn(async move { runtime.run().await })
    };

    tokio::time::sleep(Duration::from_secs(90)).await;
    shutdown.send(true).unwrap();
    daemon.await.unwrap().unwrap();

    assert_eq!(mirror.submit_calls(), 2);
    assert_eq!(mirror.current_tip().unwrap().height, 717_696);
}

#[tokio::test]
async fn test_signal_listener_only_in_daemon_mode() {
    let headers = chain(5);
    let (source, mirror) = fixture(&headers, 5);

    assert!(single_shot(&source, &mirror).listen_for_shutdown().is_none());

    let daemon = RelayRuntime::with_adapters(sync_config(), source.clone(), mirror.clone(), true);
    let listener = daemon.listen_for_shutdown().unwrap();
    listener.abort();
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_caught_up_run_writes_nothing() {
    let headers = chain(5);
    let (source, mirror) = fixture(&headers, 5);

    let outcome = single_shot(&source, &mirror).run().await.unwrap();

    match outcome {
        RunOutcome::Single(Some(report)) => assert_eq!(report.submitted, 0),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(mirror.write_calls(), 0);
}

#[tokio::test]
async fn test_source_far_ahead_respects_batch_bound() {
    let headers = chain(45);
    let (source, mirror) = fixture(&headers, 5);
    let runtime = single_shot(&source, &mirror);

    for _ in 0..4 {
        runtime.run().await.unwrap();
    }

    let batches = mirror.accepted_batches();
    assert_eq!(batches.len(), 4);
    for (i, batch) in batches.iter().enumerate() {
        assert!(batch.header_count <= 10);
        assert_eq!(batch.start_height, BASE + 5 + 10 * i as u64);
        assert_eq!(batch.payload_len, batch.header_count * HEADER_SIZE);
    }
    assert_eq!(mirror.current_tip().unwrap().height, source.tip_height());
}

#[tokio::test]
async fn test_uninitialized_mirror_fails_single_shot() {
    let source = Arc::new(MockSourceChain::synthetic(BASE, 3));
    let mirror = Arc::new(InMemoryMirror::new());

    let err = single_shot(&source, &mirror).run().await.unwrap_err();
    assert_eq!(err, RelayError::MirrorUninitialized);
}
