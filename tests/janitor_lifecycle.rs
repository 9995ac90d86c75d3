use mapkv::storage::{Janitor, JanitorConfig, Storage};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn open_starts_default_janitor() {
    init_tracing();
    let (storage, janitor) = Storage::open();

    storage.put_scalar("session", "token");
    storage.put_scalar("user", "ariz");
    storage.set_expiry("session", 30);

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(storage.list_keys(), vec!["user".to_string()]);
    assert_eq!(storage.len(), 1);
    assert_eq!(storage.stats().expired, 1);

    janitor.shutdown().await;
}

#[tokio::test]
async fn sweep_leaves_unexpired_keys() {
    init_tracing();
    let (storage, janitor) =
        Storage::open_with(JanitorConfig::new().with_interval(Duration::from_millis(5)));

    storage.put_scalar("long", "v");
    storage.set_expiry("long", 60_000);

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(storage.exists("long"));
    janitor.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_sweeping() {
    init_tracing();
    let (storage, janitor) =
        Storage::open_with(JanitorConfig::new().with_interval(Duration::from_millis(5)));

    janitor.shutdown().await;

    storage.put_scalar("k", "v");
    storage.set_expiry("k", 5);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Hidden from reads, but no longer reclaimed in the background
    assert!(!storage.exists("k"));
    assert_eq!(storage.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn janitor_runs_alongside_writers() {
    init_tracing();
    let storage = Arc::new(Storage::new());
    let janitor = Janitor::start(
        &storage,
        JanitorConfig::new().with_interval(Duration::from_millis(2)),
    );

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let storage = Arc::clone(&storage);
            tokio::task::spawn_blocking(move || {
                for i in 0..500 {
                    let key = format!("key:{}:{}", t, i);
                    storage.put_list(key.clone(), vec![key.clone()]);
                    // Odd keys expire almost immediately
                    if i % 2 == 1 {
                        storage.set_expiry(key.clone(), 1);
                    }
                    let _ = storage.get_list_element(&key, 0);
                }
            })
        })
        .collect();

    for writer in writers {
        writer.await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(storage.len(), 4 * 250);
    assert!(storage.list_keys().iter().all(|key| {
        let index: u32 = key.rsplit(':').next().unwrap().parse().unwrap();
        index % 2 == 0
    }));

    janitor.shutdown().await;
}
