// tests/pool_tests.rs
use pylon::proxy::{Backend, BackendPool, ConnectionGuard};
use std::sync::Arc;

async fn make_pool(urls: &[&str]) -> (Arc<BackendPool>, Vec<Arc<Backend>>) {
    let pool = Arc::new(BackendPool::new());
    let mut backends = Vec::new();
    for url in urls {
        let backend = Arc::new(Backend::new(url, 1).unwrap());
        pool.add(Arc::clone(&backend)).await;
        backends.push(backend);
    }
    (pool, backends)
}

#[tokio::test]
async fn new_pool_is_empty() {
    let pool = BackendPool::new();
    assert_eq!(pool.size().await, 0);
    assert_eq!(pool.healthy_count().await, 0);
    assert!(pool.healthy_snapshot().is_empty());
}

#[tokio::test]
async fn snapshot_all_is_an_independent_copy() {
    let (pool, _) = make_pool(&["http://localhost:8081", "http://localhost:8082"]).await;

    let mut snapshot = pool.snapshot_all().await;
    snapshot.clear();

    assert_eq!(pool.size().await, 2);
    assert_eq!(pool.snapshot_all().await.len(), 2);
}

#[tokio::test]
async fn healthy_counts_follow_transitions() {
    let (pool, backends) = make_pool(&[
        "http://localhost:8081",
        "http://localhost:8082",
        "http://localhost:8083",
    ])
    .await;

    assert_eq!(pool.healthy_count().await, 3);

    pool.set_status(&backends[1], false).await;
    assert_eq!(pool.healthy_count().await, 2);
    assert_eq!(pool.healthy_snapshot().len(), 2);

    pool.set_status(&backends[0], false).await;
    pool.set_status(&backends[2], false).await;
    assert_eq!(pool.healthy_count().await, 0);
    assert!(pool.healthy_snapshot().is_empty());
}

#[tokio::test]
async fn healthy_snapshot_preserves_insertion_order() {
    let (pool, backends) = make_pool(&[
        "http://localhost:8081",
        "http://localhost:8082",
        "http://localhost:8083",
    ])
    .await;

    pool.set_status(&backends[1], false).await;
    pool.set_status(&backends[1], true).await;

    let healthy = pool.healthy_snapshot();
    let urls: Vec<&str> = healthy.iter().map(|b| b.url_str()).collect();
    assert_eq!(
        urls,
        vec![
            backends[0].url_str(),
            backends[1].url_str(),
            backends[2].url_str(),
        ]
    );
}

#[tokio::test]
async fn concurrent_guards_balance_to_zero() {
    let (pool, backends) = make_pool(&["http://localhost:8081"]).await;
    let backend = Arc::clone(&backends[0]);
    drop(pool);

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let backend = Arc::clone(&backend);
        tasks.push(tokio::spawn(async move {
            for _ in 0..10 {
                let guard = ConnectionGuard::new(Arc::clone(&backend));
                tokio::task::yield_now().await;
                drop(guard);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(backend.connections(), 0);
}

#[tokio::test]
async fn concurrent_status_writes_converge() {
    let (pool, backends) = make_pool(&["http://localhost:8081", "http://localhost:8082"]).await;

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        let backend = Arc::clone(&backends[0]);
        tasks.push(tokio::spawn(async move {
            for i in 0..50 {
                pool.set_status(&backend, i % 2 == 0).await;
            }
        }));
    }

    // Readers run against the snapshot while writers flip the flag.
    let reader_pool = Arc::clone(&pool);
    let reader = tokio::spawn(async move {
        for _ in 0..200 {
            let healthy = reader_pool.healthy_snapshot();
            assert!(healthy.len() <= 2);
            tokio::task::yield_now().await;
        }
    });

    for task in tasks {
        task.await.unwrap();
    }
    reader.await.unwrap();

    pool.set_status(&backends[0], true).await;
    assert_eq!(pool.healthy_count().await, 2);
    assert_eq!(pool.healthy_snapshot().len(), 2);
}
