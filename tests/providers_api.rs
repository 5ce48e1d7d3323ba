// tests/providers_api.rs
use announce_bot::ingest::providers::torrent_api::{format_bytes, TorrentApiReader};
use announce_bot::ingest::{Field, SourceReader};

const API_JSON: &str = include_str!("fixtures/torrents_api.json");

#[tokio::test]
async fn fixture_listing_parses_in_upstream_order() {
    let reader = TorrentApiReader::from_fixture_str(API_JSON);
    let items = reader.fetch_new().await.expect("listing parses");

    let ids: Vec<_> = items.iter().map(|a| a.id()).collect();
    // The third entry has neither id nor name and is dropped.
    assert_eq!(ids, vec!["3301", "3302"]);
}

#[tokio::test]
async fn attributes_map_onto_announce_fields() {
    let reader = TorrentApiReader::from_fixture_str(API_JSON);
    let items = reader.fetch_new().await.unwrap();

    let movie = &items[0];
    assert_eq!(movie.field(Field::Name), Some("Some.Movie.2023.2160p.UHD.BluRay.x265-GRP"));
    assert_eq!(movie.field(Field::Category), Some("Movie"));
    assert_eq!(movie.field(Field::Type), Some("Encode"));
    assert_eq!(movie.field(Field::Resolution), Some("2160p"));
    assert_eq!(movie.field(Field::Size), Some("4.2 GB"));
    assert_eq!(movie.field(Field::Freeleech), Some("0%"));
    assert_eq!(movie.field(Field::DoubleUpload), Some("No"));
    assert_eq!(movie.field(Field::Uploader), Some("alice"));
    assert_eq!(movie.field(Field::Url), Some("https://tracker.example/torrents/3301"));
}

#[tokio::test]
async fn numeric_flags_and_download_links_are_understood() {
    let reader = TorrentApiReader::from_fixture_str(API_JSON);
    let items = reader.fetch_new().await.unwrap();

    let show = &items[1];
    assert_eq!(show.field(Field::DoubleUpload), Some("Yes"));
    assert_eq!(show.field(Field::Size), Some("1.5 kB"));
    assert_eq!(
        show.field(Field::Url),
        Some("https://tracker.example/torrents/download/3302")
    );
}

#[test]
fn payload_without_data_is_empty_and_garbage_is_rejected() {
    let reader = TorrentApiReader::from_fixture_str("");
    assert!(reader.parse(r#"{"meta":{}}"#).unwrap().is_empty());
    assert!(reader.parse("<html>maintenance</html>").is_err());
}

#[test]
fn sizes_use_binary_suffixes() {
    assert_eq!(format_bytes(512), "512 B");
    assert_eq!(format_bytes(10 * 1024 * 1024 * 1024), "10 GB");
    assert_eq!(format_bytes(3 * 1024_u64.pow(4)), "3 TB");
}
