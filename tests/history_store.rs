// tests/history_store.rs
use announce_bot::history::{Compaction, HistoryStore, MatchMode};

fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
    HistoryStore::new(dir.path().join("torrentHistory.log"), 500, MatchMode::Substring)
}

#[tokio::test]
async fn unseen_id_is_absent_until_appended() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(!store.contains("12345").await);
    store.append("12345").await.unwrap();
    assert!(store.contains("12345").await);
}

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(!store.path().exists());
    assert!(!store.try_contains("x").await.unwrap());
    assert_eq!(
        store.compact(100, 51).await.unwrap(),
        Compaction::Untouched { lines: 0 }
    );
}

#[tokio::test]
async fn stored_42_matches_query_142_in_substring_mode() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.append("42").await.unwrap();
    assert!(store.contains("142").await);
}

#[tokio::test]
async fn query_inside_a_longer_stored_line_is_seen() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.append("Name: [Some.Movie.2023.1080p]").await.unwrap();
    assert!(store.contains("some.movie.2023").await);
    assert!(!store.contains("Other.Show.S01").await);
}

#[tokio::test]
async fn exact_mode_does_not_match_partial_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path().join("h.log"), 500, MatchMode::Exact);
    store.append("142").await.unwrap();
    assert!(!store.contains("42").await);
    assert!(store.contains("142").await);
}

#[tokio::test]
async fn only_the_lookback_window_counts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.log");
    let mut body = String::from("ancient\n");
    for i in 0..500 {
        body.push_str(&format!("id-{i}\n"));
    }
    std::fs::write(&path, body).unwrap();

    let store = HistoryStore::new(&path, 500, MatchMode::Substring);
    assert!(!store.contains("ancient").await);
    assert!(store.contains("id-0").await);
    assert!(store.contains("id-499").await);
}

#[tokio::test]
async fn compaction_keeps_the_newest_low_water_lines() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    for i in 0..101 {
        store.append(&format!("id-{i}")).await.unwrap();
    }

    let c = store.compact(100, 51).await.unwrap();
    assert_eq!(
        c,
        Compaction::Truncated {
            before: 101,
            after: 51
        }
    );
    let lines = store.read_lines().await.unwrap();
    assert_eq!(lines.len(), 51);
    assert_eq!(lines.first().map(String::as_str), Some("id-50"));
    assert_eq!(lines.last().map(String::as_str), Some("id-100"));
}

#[tokio::test]
async fn compaction_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    for i in 0..150 {
        store.append(&format!("id-{i}")).await.unwrap();
    }
    store.compact(100, 51).await.unwrap();
    let after_first = std::fs::read_to_string(store.path()).unwrap();

    let second = store.compact(100, 51).await.unwrap();
    assert_eq!(second, Compaction::Untouched { lines: 51 });
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), after_first);
}

#[tokio::test]
async fn at_high_water_nothing_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    for i in 0..100 {
        store.append(&format!("id-{i}")).await.unwrap();
    }
    assert_eq!(
        store.compact(100, 51).await.unwrap(),
        Compaction::Untouched { lines: 100 }
    );
}

#[tokio::test]
async fn unreadable_store_fails_safe_as_seen() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be makes every read fail.
    let path = dir.path().join("history.log");
    std::fs::create_dir(&path).unwrap();
    let store = HistoryStore::new(&path, 500, MatchMode::Substring);

    assert!(store.try_contains("anything").await.is_err());
    assert!(store.contains("anything").await);
    assert!(store.append("anything").await.is_err());
}

#[tokio::test]
async fn history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.log");
    {
        let store = HistoryStore::open(&path, 500, MatchMode::Substring)
            .await
            .unwrap();
        store.append("777").await.unwrap();
    }
    let reopened = HistoryStore::open(&path, 500, MatchMode::Substring)
        .await
        .unwrap();
    assert!(reopened.contains("777").await);
}
