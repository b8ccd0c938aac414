// Import, scan and sync tests against an in-memory catalog and temp storage

use super::*;
use crate::config::PreviewCacheKey;
use crate::db::schema::AssetKind;
use crate::preview::testing::FakeTool;
use std::io::Write as IoWrite;
use tempfile::TempDir;

struct Fixture {
    tmp: TempDir,
    conn: Connection,
    storage: PathBuf,
    previews: PreviewGenerator<FakeTool>,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let conn = crate::db::open_in_memory().unwrap();
        let storage = tmp.path().join("storage");
        let previews = PreviewGenerator::new(
            tmp.path().join("cache"),
            PreviewCacheKey::FileName,
            FakeTool::default(),
        );
        Self { tmp, conn, storage, previews }
    }

    fn ingestor(&self) -> Ingestor<'_, FakeTool> {
        Ingestor::new(&self.conn, &self.storage, &self.previews)
    }

    fn source_dir(&self) -> PathBuf {
        self.tmp.path().join("source")
    }
}

/// Write files (relative names, may contain folders) under `dir`.
fn create_source_files(dir: &Path, files: &[(&str, &[u8])]) {
    for (name, content) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
    }
}

fn write_archive(path: &Path, members: &[&str]) {
    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    for name in members {
        zip.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
        zip.write_all(b"{ macro }").unwrap();
    }
    zip.finish().unwrap();
}

// ---------------------------------------------------------------
// import_file
// ---------------------------------------------------------------

#[test]
fn test_import_image_round_trip() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[("wood.png", b"pixels")]);
    let source = fx.source_dir().join("wood.png");

    let outcome = fx.ingestor().import_file(&source, None).unwrap();
    let (id, stored) = match outcome {
        ImportOutcome::Asset { id, storage_path } => (id, storage_path),
        other => panic!("expected a new asset, got {:?}", other),
    };

    assert!(stored.starts_with(&fx.storage));
    assert_eq!(std::fs::read(&stored).unwrap(), b"pixels");
    assert!(source.exists(), "source must never be touched");

    let asset = schema::get_asset(&fx.conn, id).unwrap().unwrap();
    assert_eq!(asset.display_name, "wood.png");
    assert_eq!(asset.kind, AssetKind::Image);
    assert_eq!(asset.category_path, None);
    assert_eq!(asset.storage_path, stored.to_string_lossy());
    // Images preview themselves
    assert_eq!(asset.preview_path.as_deref(), Some(asset.storage_path.as_str()));
    assert_eq!(fx.previews.tool().calls.get(), 0);
}

#[test]
fn test_import_into_category_folder() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[("oak.jpg", b"jpeg")]);

    let outcome = fx.ingestor()
        .import_file(&fx.source_dir().join("oak.jpg"), Some("Textures\\Wood"))
        .unwrap();

    let ImportOutcome::Asset { id, storage_path } = outcome else {
        panic!("expected a new asset");
    };
    assert_eq!(storage_path.parent().unwrap(), fx.storage.join("Textures").join("Wood"));

    let asset = schema::get_asset(&fx.conn, id).unwrap().unwrap();
    assert_eq!(asset.category_path.as_deref(), Some("Textures/Wood"));
}

#[test]
fn test_import_video_renders_preview_into_cache() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[("Take 1.MOV", b"frames")]);

    let outcome = fx.ingestor().import_file(&fx.source_dir().join("Take 1.MOV"), None).unwrap();
    let ImportOutcome::Asset { id, storage_path } = outcome else {
        panic!("expected a new asset");
    };
    assert_eq!(storage_path.extension().unwrap(), "mov");

    let asset = schema::get_asset(&fx.conn, id).unwrap().unwrap();
    assert_eq!(asset.kind, AssetKind::Video);
    let preview = PathBuf::from(asset.preview_path.unwrap());
    assert!(preview.starts_with(fx.previews.cache_dir()));
    assert!(preview.exists());
    assert_eq!(fx.previews.tool().calls.get(), 1);
}

#[test]
fn test_failed_preview_still_imports() {
    let tmp = TempDir::new().unwrap();
    let conn = crate::db::open_in_memory().unwrap();
    let storage = tmp.path().join("storage");
    let previews = PreviewGenerator::new(tmp.path().join("cache"), PreviewCacheKey::FileName, FakeTool::failing());
    create_source_files(tmp.path(), &[("hit.wav", b"riff")]);

    let outcome = Ingestor::new(&conn, &storage, &previews)
        .import_file(&tmp.path().join("hit.wav"), Some("Sfx"))
        .unwrap();

    let ImportOutcome::Asset { id, .. } = outcome else {
        panic!("expected a new asset");
    };
    let asset = schema::get_asset(&conn, id).unwrap().unwrap();
    assert_eq!(asset.kind, AssetKind::Audio);
    assert_eq!(asset.preview_path, None);
}

#[test]
fn test_import_missing_source() {
    let fx = Fixture::new();
    let err = fx.ingestor()
        .import_file(&fx.source_dir().join("nope.mp4"), None)
        .unwrap_err();

    assert!(matches!(err, ShelfError::SourceNotFound(_)));
    assert_eq!(schema::count_assets(&fx.conn).unwrap(), 0);
    assert!(!fx.storage.exists());
}

#[test]
fn test_import_rejects_escaping_category() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[("lut.cube", b"LUT_3D_SIZE 2")]);

    let err = fx.ingestor()
        .import_file(&fx.source_dir().join("lut.cube"), Some("../outside"))
        .unwrap_err();

    assert!(matches!(err, ShelfError::InvalidPath(_)));
    assert_eq!(schema::count_assets(&fx.conn).unwrap(), 0);
    assert!(!fx.tmp.path().join("outside").exists());
}

#[test]
fn test_import_archive_fans_out() {
    let fx = Fixture::new();
    std::fs::create_dir_all(fx.source_dir()).unwrap();
    let pack = fx.source_dir().join("Pack.drfx");
    write_archive(&pack, &[
        "Templates/Edit/Transitions/Wipe.setting",
        "Templates/Edit/Generators/Noise.setting",
    ]);

    let outcome = fx.ingestor().import_file(&pack, Some("Ignored")).unwrap();
    let ImportOutcome::Archive(expansion) = outcome else {
        panic!("expected an archive expansion");
    };

    assert_eq!(expansion.registered, 2);
    assert!(expansion.extract_dir.starts_with(&fx.storage));
    assert!(schema::list_assets_by_category(&fx.conn, "Ignored").unwrap().is_empty());

    let generators = schema::list_assets_by_category(&fx.conn, "Templates/Edit/Generators").unwrap();
    assert_eq!(generators.len(), 1);
    assert_eq!(generators[0].kind, AssetKind::Generator);
}

// ---------------------------------------------------------------
// scan_directory
// ---------------------------------------------------------------

#[test]
fn test_scan_derives_categories_from_folders() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[
        ("A/x.png", b"img"),
        ("A/B/y.cube", b"lut"),
        ("z.mp3", b"mp3"),
        ("notes.txt", b"skip me"),
    ]);

    let options = ScanOptions {
        base_category: Some("Proj".to_string()),
        ..Default::default()
    };
    let mut seen = Vec::new();
    let summary = fx.ingestor()
        .scan_directory(&fx.source_dir(), &options, |p| {
            seen.push(p.clone());
            ScanControl::Continue
        })
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cancelled);

    assert_eq!(seen.len(), 3);
    assert_eq!(seen.last().unwrap().percent, 100.0);

    let categories = schema::list_categories(&fx.conn).unwrap();
    assert_eq!(categories, vec!["Proj", "Proj/A", "Proj/A/B"]);
    assert_eq!(schema::list_assets_by_category(&fx.conn, "Proj").unwrap()[0].display_name, "z.mp3");
}

#[test]
fn test_scan_without_base_leaves_top_level_uncategorized() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[("top.png", b"img"), ("Sub/low.png", b"img")]);

    fx.ingestor()
        .scan_directory(&fx.source_dir(), &ScanOptions::default(), |_| ScanControl::Continue)
        .unwrap();

    let assets = schema::list_assets(&fx.conn).unwrap();
    let top = assets.iter().find(|a| a.display_name == "top.png").unwrap();
    let low = assets.iter().find(|a| a.display_name == "low.png").unwrap();
    assert_eq!(top.category_path, None);
    assert_eq!(low.category_path.as_deref(), Some("Sub"));
}

#[test]
fn test_scan_cancel_flag_stops_between_files() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[("a.png", b"1"), ("b.png", b"2"), ("c.png", b"3")]);

    let cancel = CancelFlag::new();
    let options = ScanOptions {
        base_category: None,
        cancel: Some(cancel.clone()),
    };
    let summary = fx.ingestor()
        .scan_directory(&fx.source_dir(), &options, |_| {
            cancel.cancel();
            ScanControl::Continue
        })
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 1);
    // Work done before the cancel is kept
    assert_eq!(schema::count_assets(&fx.conn).unwrap(), 1);
}

#[test]
fn test_scan_abort_from_callback() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[("a.png", b"1"), ("b.png", b"2"), ("c.png", b"3")]);

    let summary = fx.ingestor()
        .scan_directory(&fx.source_dir(), &ScanOptions::default(), |p| {
            if p.current == 2 { ScanControl::Abort } else { ScanControl::Continue }
        })
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.processed, 2);
    assert_eq!(schema::count_assets(&fx.conn).unwrap(), 2);
}

#[test]
fn test_scan_isolates_failing_files() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[
        ("a.png", b"img"),
        ("broken.drfx", b"definitely not a zip"),
        ("c.wav", b"riff"),
    ]);

    let mut errors = 0;
    let summary = fx.ingestor()
        .scan_directory(&fx.source_dir(), &ScanOptions::default(), |p| {
            if p.is_error {
                errors += 1;
            }
            ScanControl::Continue
        })
        .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(errors, 1);
    assert_eq!(schema::count_assets(&fx.conn).unwrap(), 2);
}

#[test]
fn test_scan_counts_archive_as_one_import() {
    let fx = Fixture::new();
    std::fs::create_dir_all(fx.source_dir()).unwrap();
    write_archive(&fx.source_dir().join("Pack.drfx"), &["Effects/Glow.setting", "Effects/Blur.setting"]);

    let summary = fx.ingestor()
        .scan_directory(&fx.source_dir(), &ScanOptions::default(), |_| ScanControl::Continue)
        .unwrap();

    assert_eq!(summary.imported, 1);
    assert_eq!(schema::count_assets(&fx.conn).unwrap(), 2);
}

#[test]
fn test_scan_missing_root() {
    let fx = Fixture::new();
    let err = fx.ingestor()
        .scan_directory(&fx.tmp.path().join("nowhere"), &ScanOptions::default(), |_| ScanControl::Continue)
        .unwrap_err();
    assert!(matches!(err, ShelfError::SourceNotFound(_)));
}

// ---------------------------------------------------------------
// sync_with_storage
// ---------------------------------------------------------------

#[test]
fn test_sync_after_external_delete() {
    let fx = Fixture::new();
    create_source_files(&fx.source_dir(), &[("a.png", b"1"), ("b.png", b"2")]);
    let ingestor = fx.ingestor();

    let ImportOutcome::Asset { storage_path, .. } =
        ingestor.import_file(&fx.source_dir().join("a.png"), None).unwrap()
    else {
        panic!("expected a new asset");
    };
    ingestor.import_file(&fx.source_dir().join("b.png"), None).unwrap();

    std::fs::remove_file(&storage_path).unwrap();

    assert_eq!(ingestor.sync_with_storage().unwrap(), 1);
    let left = schema::list_assets(&fx.conn).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].display_name, "b.png");
}
