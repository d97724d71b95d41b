//! Catalog loading from files and URLs

use std::io::Write;
use tastemap_cli::loader::{load_catalog, source_for, FileSource, HttpSource};
use tastemap_common::{Error, WineType};
use tempfile::NamedTempFile;

fn table(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write table");
    file
}

/// **Given:** both tables on disk, one coordinate record malformed
/// **When:** the catalog is loaded
/// **Then:** valid items are merged with names and prices, the bad record is reported
#[tokio::test]
async fn test_load_from_files() {
    let coordinates = table(
        "JAN,BodyAxis,SweetAxis,Type\n\
         4901,0.5,-1.25,White\n\
         4902,oops,2.0,Red\n\
         4903,-3.0,0.75,Rose\n",
    );
    let metadata = table("JAN,商品名,希望小売価格\n4901,Koshu,2200\n4903,Rose Sec,\n");

    let report = load_catalog(
        &FileSource::new(coordinates.path()),
        &FileSource::new(metadata.path()),
    )
    .await
    .expect("catalog loads");

    assert_eq!(report.catalog.len(), 2);
    assert_eq!(report.skipped.len(), 1);

    let koshu = report.catalog.get("4901").unwrap();
    assert_eq!(koshu.name, "Koshu");
    assert_eq!(koshu.price_label(), "2,200 yen");
    assert_eq!(koshu.wine_type, WineType::White);

    let rose = report.catalog.get("4903").unwrap();
    assert_eq!(rose.price, None);
    assert_eq!(rose.price_label(), "price not set");

    let bounds = report.catalog.bounds();
    assert_eq!(bounds.body.min, -3.0);
    assert_eq!(bounds.sweetness.max, 0.75);
}

/// **Given:** a metadata table that does not exist
/// **When:** the catalog is loaded
/// **Then:** the load fails as a whole with DataUnavailable
#[tokio::test]
async fn test_missing_table_is_data_unavailable() {
    let coordinates = table("JAN,BodyAxis,SweetAxis,Type\n4901,0.5,-1.25,White\n");
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Merged_TasteDataDB15.csv");

    let result = load_catalog(&FileSource::new(coordinates.path()), &FileSource::new(missing)).await;
    match result {
        Err(e @ Error::DataUnavailable(_)) => assert!(e.is_fatal()),
        other => panic!("expected DataUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_url_is_data_unavailable() {
    let coordinates = table("JAN,BodyAxis,SweetAxis\n1,0,0\n");
    let result = load_catalog(
        &FileSource::new(coordinates.path()),
        &HttpSource::new("http://127.0.0.1:9/Merged_TasteDataDB15.csv"),
    )
    .await;
    assert!(matches!(result, Err(Error::DataUnavailable(_))));
}

#[tokio::test]
async fn test_source_for_reads_local_path() {
    let coordinates = table("JAN,BodyAxis,SweetAxis\n1,2,3\n");
    let metadata = table("JAN\n");
    let path = coordinates.path().to_string_lossy().to_string();

    let report = load_catalog(
        source_for(&path).as_ref(),
        source_for(&metadata.path().to_string_lossy()).as_ref(),
    )
    .await
    .unwrap();
    assert_eq!(report.catalog.get("1").unwrap().position().y, 3.0);
}
