mod common;

use image::GenericImageView;
use tempfile::tempdir;

use common::{file_names, spu_payload, storefront_payload, PngFetcher};
use menu_harvester_core::activity::ActivityLog;
use menu_harvester_core::download::{BulkDownloader, DownloadJob, ImageTarget};
use menu_harvester_core::fs_access::{FileAccess, LocalFileAccess, PromptFileAccess};
use menu_harvester_core::monitor::SessionKind;
use menu_harvester_core::persistence::StoreHistory;
use menu_harvester_core::{Config, Harvester};

fn harvester() -> Harvester {
    Harvester::with_history(Config::default(), StoreHistory::in_memory(10))
}

#[test]
fn test_download_everything_harvested() {
    let out = tempdir().unwrap();
    let mut h = harvester();
    h.process_content(SessionKind::Storefront, &storefront_payload("Tea: House", "9"), "store");
    h.process_content(
        SessionKind::Products,
        &spu_payload(&[("1", "Milk Tea", "http://x/milk.jpg"), ("2", "Lemon/Tea", "http://x/lemon.png")]),
        "products",
    );

    let fetcher = PngFetcher::default();
    let mut fs = LocalFileAccess::new().with_directory(out.path());
    let report = h.download_all(&fetcher, &mut fs, false).unwrap();

    assert_eq!(report.summary(), "6 of 6 saved");
    assert_eq!(
        file_names(out.path()),
        vec![
            "Lemon_Tea.jpg",
            "Milk Tea.jpg",
            "Tea_ House_头像.jpg",
            "Tea_ House_店招.jpg",
            "Tea_ House_海报1.jpg",
            "Tea_ House_海报2.jpg",
        ]
    );

    let bytes = std::fs::read(out.path().join("Lemon_Tea.jpg")).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    assert_eq!((decoded.width(), decoded.height()), (4, 3));

    // Storefront images are fetched before products
    let requests = fetcher.requests.borrow();
    assert_eq!(requests[0], "https://img.example.com/9/avatar.jpg");
    assert_eq!(requests[5], "http://x/lemon.png");
}

#[test]
fn test_failed_item_does_not_stop_batch() {
    let out = tempdir().unwrap();
    let jobs = vec![
        DownloadJob::new("http://x/missing.jpg", "gone.jpg"),
        DownloadJob::new("http://x/ok.jpg", "ok.jpg"),
    ];

    let fetcher = PngFetcher::default();
    let mut fs = LocalFileAccess::new().with_directory(out.path());
    let mut activity = ActivityLog::new();
    let report = BulkDownloader::new(&fetcher, 80)
        .run(&jobs, &mut fs, &mut activity)
        .unwrap();

    assert_eq!(report.summary(), "1 of 2 saved");
    assert_eq!(report.failures[0].file_name, "gone.jpg");
    assert!(report.failures[0].message.contains("404"));
    assert_eq!(file_names(out.path()), vec!["ok.jpg"]);
}

#[test]
fn test_prompted_directory_and_cancel() {
    let out = tempdir().unwrap();
    let jobs = vec![DownloadJob::new("http://x/a.jpg", "a.jpg")];
    let fetcher = PngFetcher::default();

    let answer = format!("{}\n", out.path().display());
    let mut fs = PromptFileAccess::new(answer.as_bytes(), Vec::new());
    let mut activity = ActivityLog::new();
    let report = BulkDownloader::new(&fetcher, 95)
        .run(&jobs, &mut fs, &mut activity)
        .unwrap();
    assert_eq!(report.directory.as_deref(), Some(out.path()));
    assert_eq!(file_names(out.path()), vec!["a.jpg"]);

    // An empty answer cancels before anything is fetched
    let mut fs = PromptFileAccess::new("\n".as_bytes(), Vec::new());
    let before = fetcher.requests.borrow().len();
    let err = BulkDownloader::new(&fetcher, 95)
        .run(&jobs, &mut fs, &mut activity)
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(fetcher.requests.borrow().len(), before);
}

#[test]
fn test_nothing_to_download() {
    let mut h = harvester();
    let fetcher = PngFetcher::default();
    let mut fs = LocalFileAccess::new();

    // No directory is preset, so reaching the picker would fail
    let report = h.download_all(&fetcher, &mut fs, false).unwrap();
    assert_eq!(report.total, 0);
    assert!(fs.select_directory("unused").is_err());
}

#[test]
fn test_save_one_image_by_role() {
    let out = tempdir().unwrap();
    let mut h = harvester();
    h.process_content(SessionKind::Storefront, &storefront_payload("Tea: House", "9"), "store");
    h.process_content(
        SessionKind::Products,
        &spu_payload(&[("1", "Milk Tea", "http://x/milk.jpg")]),
        "products",
    );

    let fetcher = PngFetcher::default();
    let mut fs = LocalFileAccess::new().with_directory(out.path());
    let report = h.save_image(&ImageTarget::Poster(2), &fetcher, &mut fs).unwrap();

    assert_eq!(report.summary(), "1 of 1 saved");
    assert_eq!(file_names(out.path()), vec!["Tea_ House_海报2.jpg"]);
    assert_eq!(
        fetcher.requests.borrow().as_slice(),
        &["https://img.example.com/9/poster2.jpg".to_string()]
    );

    let report = h
        .save_image(&ImageTarget::Product("Milk Tea".to_string()), &fetcher, &mut fs)
        .unwrap();
    assert_eq!(report.saved, 1);
    assert_eq!(file_names(out.path()), vec!["Milk Tea.jpg", "Tea_ House_海报2.jpg"]);
}
