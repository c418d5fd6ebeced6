//! Pipeline tests: full units of work over fixture directories, sink shutdown, failure policies.

use image::{DynamicImage, Rgb, RgbImage};
use imgpack::engine::ProgressAggregator;
use imgpack::pipeline::{ArchiveSink, SinkOutcome, TransformStage, run_enumeration};
use imgpack::pipeline::context::SkippedFiles;
use imgpack::{
    EncodeFailurePolicy, EntryNaming, PackOpts, PipelineConfig, ResultItem, ShutdownSignal,
    TargetFormat, Transformed, UnitOutcome, WorkItem, pack_dir, pack_unit,
};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

fn write_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([180, 40, 90]))
        .save(path)
        .unwrap();
}

fn quiet_opts(format: TargetFormat, max_width: u32, threads: usize) -> PackOpts {
    PackOpts {
        pipeline: PipelineConfig {
            format,
            quality: 80.0,
            max_width,
            ..PipelineConfig::default()
        },
        num_threads: Some(threads),
        progress: false,
        ..PackOpts::default()
    }
}

fn entry_names(archive: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    zip.file_names().map(String::from).collect()
}

fn entry_bytes(archive: &Path, name: &str) -> Vec<u8> {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut buf = Vec::new();
    zip.by_name(name).unwrap().read_to_end(&mut buf).unwrap();
    buf
}

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

fn completed(outcome: UnitOutcome) -> imgpack::UnitSummary {
    match outcome {
        UnitOutcome::Completed(s) => s,
        other => panic!("expected completed unit, got {other:?}"),
    }
}

// --- full unit of work ---

#[test]
fn test_chapter_example_resizes_wide_and_keeps_narrow() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("chapter1");
    fs::create_dir(&set).unwrap();
    write_image(&set.join("p1.jpg"), 2000, 300);
    write_image(&set.join("p2.png"), 800, 200);

    let opts = PackOpts {
        entry_naming: EntryNaming::Bare,
        ..quiet_opts(TargetFormat::Webp, 1080, 4)
    };
    let summary = completed(pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap());

    let archive = tmp.path().join("chapter1.zip");
    assert_eq!(summary.archive, archive);
    assert_eq!(summary.items_processed, 2);
    assert_eq!(summary.items_expected, 2);
    assert_eq!(summary.entries_written, 2);
    assert_eq!(sorted(entry_names(&archive)), vec!["p1", "p2"]);

    let p1 = image::load_from_memory(&entry_bytes(&archive, "p1")).unwrap();
    assert_eq!((p1.width(), p1.height()), (1080, 162));
    let p2 = image::load_from_memory(&entry_bytes(&archive, "p2")).unwrap();
    assert_eq!((p2.width(), p2.height()), (800, 200));
}

#[test]
fn test_default_naming_appends_target_extension() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("set");
    fs::create_dir(&set).unwrap();
    write_image(&set.join("p1.png"), 40, 20);

    let opts = quiet_opts(TargetFormat::Jpeg, 0, 2);
    pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap();
    assert_eq!(entry_names(&tmp.path().join("set.zip")), vec!["p1.jpg"]);
}

#[test]
fn test_max_width_zero_disables_resize() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("set");
    fs::create_dir(&set).unwrap();
    write_image(&set.join("wide.png"), 1500, 10);

    let opts = quiet_opts(TargetFormat::Png, 0, 1);
    pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap();
    let img =
        image::load_from_memory(&entry_bytes(&tmp.path().join("set.zip"), "wide.png")).unwrap();
    assert_eq!(img.width(), 1500);
}

#[test]
fn test_bad_and_ineligible_files_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("set");
    fs::create_dir(&set).unwrap();
    write_image(&set.join("a.png"), 30, 30);
    write_image(&set.join("c.png"), 30, 30);
    fs::write(set.join("b.jpg"), b"definitely not a jpeg").unwrap();
    fs::write(set.join("notes.txt"), b"hello").unwrap();
    fs::create_dir(set.join("nested")).unwrap();
    write_image(&set.join("nested").join("d.png"), 30, 30);

    let opts = quiet_opts(TargetFormat::Gif, 0, 3);
    let summary = completed(pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap());

    assert_eq!(summary.items_expected, 3);
    assert_eq!(summary.items_processed, 2);
    assert_eq!(
        sorted(entry_names(&summary.archive)),
        vec!["a.gif", "c.gif"]
    );
    for name in ["a.gif", "c.gif"] {
        assert!(!entry_bytes(&summary.archive, name).is_empty());
    }
}

#[test]
fn test_single_worker_preserves_file_name_order() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("set");
    fs::create_dir(&set).unwrap();
    for name in ["c.png", "a.png", "b.png"] {
        write_image(&set.join(name), 8, 8);
    }

    let opts = quiet_opts(TargetFormat::Png, 0, 1);
    let summary = completed(pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap());
    assert_eq!(entry_names(&summary.archive), vec!["a.png", "b.png", "c.png"]);
}

#[test]
fn test_rerun_yields_same_entry_names() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("set");
    fs::create_dir(&set).unwrap();
    for i in 0..12 {
        write_image(&set.join(format!("page{i:02}.png")), 64, 32);
    }
    let opts = quiet_opts(TargetFormat::Webp, 32, 4);

    let first = completed(pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap());
    let names_first = sorted(entry_names(&first.archive));
    let second = completed(pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap());
    let names_second = sorted(entry_names(&second.archive));

    assert_eq!(names_first.len(), 12);
    assert_eq!(names_first, names_second);
    assert_eq!(second.items_processed, 12);
}

#[test]
fn test_empty_set_creates_no_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("empty");
    fs::create_dir(&set).unwrap();
    fs::write(set.join("readme.txt"), b"no images").unwrap();

    let outcome = pack_unit(&set, tmp.path(), &PackOpts::default(), &ShutdownSignal::new()).unwrap();
    assert_eq!(outcome, UnitOutcome::Empty);
    assert!(!tmp.path().join("empty.zip").exists());
}

// --- encode failure policy ---

// Wider than the webp format allows, so the webp encoder rejects it.
fn unencodable() -> DynamicImage {
    DynamicImage::new_rgb8(16_384, 1)
}

fn work_item(identity: &str, image: DynamicImage) -> WorkItem {
    WorkItem {
        identity: identity.to_string(),
        original_size: 1234,
        image,
    }
}

#[test]
fn test_placeholder_policy_forwards_failed_encode() {
    let stage = TransformStage::new(PipelineConfig {
        format: TargetFormat::Webp,
        max_width: 0,
        on_encode_failure: EncodeFailurePolicy::Placeholder,
        ..PipelineConfig::default()
    });
    match stage.transform(work_item("huge", unencodable())) {
        Transformed::Encoded(item) => {
            assert_eq!(item.identity, "huge");
            assert_eq!(item.original_size, 1234);
            assert!(item.encoded.is_empty());
        }
        other => panic!("expected placeholder, got {other:?}"),
    }
}

#[test]
fn test_skip_policy_drops_failed_encode() {
    let stage = TransformStage::new(PipelineConfig {
        format: TargetFormat::Webp,
        max_width: 0,
        on_encode_failure: EncodeFailurePolicy::Skip,
        ..PipelineConfig::default()
    });
    assert!(matches!(
        stage.transform(work_item("huge", unencodable())),
        Transformed::Dropped { ref identity } if identity == "huge"
    ));
    assert!(matches!(
        stage.transform(work_item("ok", DynamicImage::new_rgb8(4, 4))),
        Transformed::Encoded(_)
    ));
}

#[test]
fn test_skip_policy_unit_reaches_full_progress() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("set");
    fs::create_dir(&set).unwrap();
    write_image(&set.join("ok.png"), 16, 16);
    write_image(&set.join("huge.png"), 16_384, 1);

    let mut opts = quiet_opts(TargetFormat::Webp, 0, 2);
    opts.pipeline.on_encode_failure = EncodeFailurePolicy::Skip;
    let summary = completed(pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap());
    assert_eq!(entry_names(&summary.archive), vec!["ok.webp"]);
    assert_eq!(summary.items_processed, 1);
    assert_eq!(summary.items_expected, 1);

    opts.pipeline.on_encode_failure = EncodeFailurePolicy::Placeholder;
    let summary = completed(pack_unit(&set, tmp.path(), &opts, &ShutdownSignal::new()).unwrap());
    assert_eq!(
        sorted(entry_names(&summary.archive)),
        vec!["huge.webp", "ok.webp"]
    );
    assert!(entry_bytes(&summary.archive, "huge.webp").is_empty());
    assert_eq!(summary.items_processed, 2);
}

// --- sink ---

fn result(identity: &str, bytes: &[u8]) -> Transformed {
    Transformed::Encoded(ResultItem {
        identity: identity.to_string(),
        original_size: 100,
        encoded: bytes.to_vec(),
    })
}

fn new_sink(path: &Path, expected: usize) -> ArchiveSink {
    ArchiveSink::create(
        path,
        EntryNaming::Bare,
        TargetFormat::Webp,
        ProgressAggregator::new(expected, "test", false),
    )
    .unwrap()
}

#[test]
fn test_sink_writes_in_arrival_order() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("out.zip");
    let sink = new_sink(&path, 3);
    let (tx, rx) = crossbeam_channel::bounded(3);
    for name in ["z", "a", "m"] {
        tx.send(result(name, name.as_bytes())).unwrap();
    }
    drop(tx);

    let outcome = sink.run(rx, &ShutdownSignal::new()).unwrap();
    let SinkOutcome::Drained(summary) = outcome else {
        panic!("expected drained sink");
    };
    assert_eq!(summary.items_processed, 3);
    assert_eq!(summary.encoded_bytes, 3);
    assert_eq!(entry_names(&path), vec!["z", "a", "m"]);
    assert_eq!(entry_bytes(&path, "m"), b"m");
}

#[test]
fn test_sink_duplicate_entry_is_logged_and_counted() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("dup.zip");
    let sink = new_sink(&path, 2);
    let (tx, rx) = crossbeam_channel::bounded(2);
    tx.send(result("p1", b"first")).unwrap();
    tx.send(result("p1", b"second")).unwrap();
    drop(tx);

    let SinkOutcome::Drained(summary) = sink.run(rx, &ShutdownSignal::new()).unwrap() else {
        panic!("expected drained sink");
    };
    assert_eq!(summary.items_processed, 2);
    assert_eq!(summary.entries_written, 1);
    assert_eq!(entry_names(&path), vec!["p1"]);
}

#[test]
fn test_sink_interrupt_keeps_written_entries_readable() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("partial.zip");
    let sink = new_sink(&path, 10);
    let shutdown = ShutdownSignal::new();
    // Zero capacity: each send returns only once the sink has taken the item.
    let (tx, rx) = crossbeam_channel::bounded(0);
    let sink_shutdown = shutdown.clone();
    let handle = thread::spawn(move || sink.run(rx, &sink_shutdown));

    tx.send(result("one", b"1111")).unwrap();
    tx.send(result("two", b"2222")).unwrap();
    shutdown.trigger();
    let outcome = handle.join().unwrap().unwrap();
    assert!(tx.send(result("three", b"3333")).is_err());

    let SinkOutcome::Interrupted(summary) = outcome else {
        panic!("expected interrupted sink");
    };
    assert_eq!(summary.entries_written, 2);
    assert_eq!(entry_names(&path), vec!["one", "two"]);
    assert_eq!(entry_bytes(&path, "two"), b"2222");
}

#[test]
fn test_sink_with_pending_shutdown_ignores_queued_results() {
    for round in 0..50 {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("queued.zip");
        let sink = new_sink(&path, 20);
        let shutdown = ShutdownSignal::new();
        let (tx, rx) = crossbeam_channel::bounded(20);
        for i in 0..20 {
            tx.send(result(&format!("p{i}"), b"data")).unwrap();
        }
        shutdown.trigger();

        let SinkOutcome::Interrupted(summary) = sink.run(rx, &shutdown).unwrap() else {
            panic!("round {round}: expected interrupted sink");
        };
        assert_eq!(summary.entries_written, 0, "round {round}");
        assert_eq!(summary.items_processed, 0, "round {round}");
        assert!(entry_names(&path).is_empty(), "round {round}");
    }
}

#[test]
fn test_sink_stops_writing_once_shutdown_arrives_mid_run() {
    for round in 0..10 {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("late.zip");
        let sink = new_sink(&path, 20);
        let shutdown = ShutdownSignal::new();
        let (tx, rx) = crossbeam_channel::bounded(20);
        let pending = rx.clone();
        let sink_shutdown = shutdown.clone();
        let handle = thread::spawn(move || sink.run(rx, &sink_shutdown));

        tx.send(result("first", b"1")).unwrap();
        while !pending.is_empty() {
            thread::yield_now();
        }
        // Let the sink finish "first" and block waiting for more.
        thread::sleep(std::time::Duration::from_millis(20));
        shutdown.trigger();
        for i in 0..19 {
            tx.send(result(&format!("late{i}"), b"x")).unwrap();
        }

        let SinkOutcome::Interrupted(summary) = handle.join().unwrap().unwrap() else {
            panic!("round {round}: expected interrupted sink");
        };
        assert_eq!(summary.entries_written, 1, "round {round}");
        assert_eq!(entry_names(&path), vec!["first"], "round {round}");
        assert_eq!(pending.len(), 19, "round {round}");
    }
}

#[test]
fn test_unit_with_pending_shutdown_leaves_valid_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let set = tmp.path().join("set");
    fs::create_dir(&set).unwrap();
    for i in 0..6 {
        write_image(&set.join(format!("{i}.png")), 32, 32);
    }
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let outcome = pack_unit(&set, tmp.path(), &quiet_opts(TargetFormat::Png, 0, 2), &shutdown)
        .unwrap();
    let UnitOutcome::Interrupted(summary) = outcome else {
        panic!("expected interrupted unit");
    };
    assert_eq!(summary.entries_written, 0);
    assert!(entry_names(&summary.archive).is_empty());
}

// --- enumerator ---

#[test]
fn test_enumeration_records_skips_and_closes_queue() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    write_image(&dir.join("good.png"), 10, 5);
    fs::write(dir.join("broken.webp"), b"RIFF....nope").unwrap();

    let skipped: SkippedFiles = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = crossbeam_channel::bounded(4);
    let sent = run_enumeration(dir, tx, &skipped);

    assert_eq!(sent, 1);
    let items: Vec<WorkItem> = rx.iter().collect();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].identity, "good");
    assert_eq!(items[0].image.width(), 10);
    assert_eq!(
        items[0].original_size,
        fs::metadata(dir.join("good.png")).unwrap().len()
    );
    let skipped = skipped.lock().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, dir.join("broken.webp"));
}

// --- root driver ---

#[test]
fn test_pack_dir_one_archive_per_subdirectory() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    let out = tmp.path().join("out");
    for (set, n) in [("ch1", 2), ("ch2", 1), ("empty", 0)] {
        fs::create_dir_all(root.join(set)).unwrap();
        for i in 0..n {
            write_image(&root.join(set).join(format!("{i}.jpg")), 20, 10);
        }
    }
    write_image(&root.join("loose.png"), 5, 5);

    let opts = PackOpts {
        output_dir: Some(out.clone()),
        ..quiet_opts(TargetFormat::Webp, 0, 2)
    };
    let report = pack_dir(&root, &opts, None).unwrap();

    assert!(!report.interrupted);
    assert!(report.failed.is_empty());
    let mut archives: Vec<PathBuf> = report.archives().into_iter().cloned().collect();
    archives.sort();
    assert_eq!(archives, vec![out.join("ch1.zip"), out.join("ch2.zip")]);
    assert!(!out.join("empty.zip").exists());
    assert_eq!(entry_names(&out.join("ch2.zip")), vec!["0.webp"]);
}

#[test]
fn test_archive_create_failure_only_aborts_that_unit() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    for set in ["a", "b"] {
        fs::create_dir(root.join(set)).unwrap();
        write_image(&root.join(set).join("p.png"), 8, 8);
    }
    // A directory where a.zip should go makes the archive uncreatable.
    fs::create_dir(root.join("a.zip")).unwrap();

    let report = pack_dir(root, &quiet_opts(TargetFormat::Png, 0, 1), None).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, root.join("a"));
    assert_eq!(entry_names(&root.join("b.zip")), vec!["p.png"]);
}

#[test]
fn test_pack_dir_stops_when_already_interrupted() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    fs::create_dir(root.join("a")).unwrap();
    write_image(&root.join("a").join("p.png"), 8, 8);
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let report = pack_dir(root, &quiet_opts(TargetFormat::Png, 0, 1), Some(&shutdown)).unwrap();
    assert!(report.interrupted);
    assert!(report.units.is_empty());
    assert!(!root.join("a.zip").exists());
}
