mod common;

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use common::{local_time, Bench, Faulty};
use recycle_core::{
    format_timestamp,
    retention_cutoff,
    ConflictChoice,
    ItemKind,
    PurgeScope,
    CoreError,
    DeleteOutcome,
    LifecycleEngine,
    RestoreOutcome,
    SkipReason,
};

#[test]
fn test_delete_then_restore_is_byte_identical() {
    let bench = Bench::new();
    let content: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let file = bench.file("data.bin", &content);
    std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o751)).unwrap();

    let engine = bench.engine();
    let report = engine.delete(&[&file]);
    let id = report.trashed().next().unwrap().id.clone();
    assert!(!file.exists());

    match engine.restore(&id, Some(ConflictChoice::Overwrite)).unwrap() {
        RestoreOutcome::Restored { destination, .. } => {
            assert_eq!(destination.file_name().unwrap(), "data.bin");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(std::fs::read(&file).unwrap(), content);
    let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o7777;
    assert_eq!(mode, 0o751);
    assert!(bench.record_ids().is_empty());
    assert!(bench.payloads().is_empty());
}

#[test]
fn test_every_payload_has_exactly_one_record() {
    let bench = Bench::new();
    let engine = bench.engine();
    let files: Vec<_> = (0..6).map(|i| bench.file(&format!("f{i}.txt"), b"abc")).collect();
    let folder = bench.work.join("dir");
    std::fs::create_dir(&folder).unwrap();

    let report = engine.delete(&files);
    engine.delete(&[&folder]);
    let ids: Vec<String> = report.trashed().map(|r| r.id.clone()).collect();

    engine.restore(&ids[0], None).unwrap();
    engine.restore(&ids[1], None).unwrap();
    let doomed = engine.purge_candidates(&PurgeScope::Id(ids[2].clone())).unwrap();
    engine.purge(&doomed).unwrap();
    let doomed = engine.purge_candidates(&PurgeScope::Pattern("f3.txt".into())).unwrap();
    engine.purge(&doomed).unwrap();

    assert_eq!(bench.record_ids(), bench.payloads());
    assert_eq!(bench.payloads().len(), 3);

    let report = bench.queries().check_consistency().unwrap();
    assert!(report.is_clean());
}

#[test]
fn test_consistency_check_reports_both_directions() {
    let bench = Bench::new();
    bench.plant("100_dangling", "a.txt", "2025-10-05 10:00:00", 1, ItemKind::File);
    std::fs::remove_file(bench.config.paths.files_dir.join("100_dangling")).unwrap();
    std::fs::write(bench.config.paths.files_dir.join("200_orphan"), b"x").unwrap();

    let report = bench.queries().check_consistency().unwrap();
    assert_eq!(report.dangling, ["100_dangling"]);
    assert_eq!(report.orphans, ["200_orphan"]);
}

#[test]
fn test_retention_boundary_is_inclusive() {
    let now = local_time(2025, 11, 4, 12, 0, 0);
    let bench = Bench::at(now);
    let cutoff = retention_cutoff(now, 30);
    let just_after = format_timestamp(now - Duration::from_secs(30 * 86_400) + Duration::from_secs(1));

    bench.plant("1_expired", "old.txt", &cutoff, 4, ItemKind::File);
    bench.plant("2_fresh", "new.txt", &just_after, 8, ItemKind::File);

    let engine = bench.engine();
    let preview = engine.sweep(true).unwrap();
    assert_eq!(preview.cutoff, cutoff);
    assert_eq!(preview.candidates.len(), 1);
    assert!(preview.summary.is_none());
    assert_eq!(bench.record_ids().len(), 2);

    let applied = engine.sweep(false).unwrap();
    let summary = applied.summary.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.bytes_freed, 4);
    assert_eq!(bench.record_ids(), ["2_fresh"]);
    assert_eq!(bench.payloads(), ["2_fresh"]);
    assert!(bench.audit_lines().iter().any(|l| l.contains("[AUTO_CLEAN]")));
}

#[test]
fn test_sweep_and_purge_on_empty_store_leave_header_only() {
    let bench = Bench::new();
    let before = std::fs::read_to_string(&bench.config.paths.metadata_file).unwrap();
    let engine = bench.engine();

    assert!(engine.purge_candidates(&PurgeScope::All).unwrap().is_empty());
    let report = engine.sweep(false).unwrap();
    assert!(report.candidates.is_empty());
    assert_eq!(report.summary.unwrap().count, 0);
    assert_eq!(std::fs::read_to_string(&bench.config.paths.metadata_file).unwrap(), before);
    assert_eq!(before.lines().count(), 2);
}

#[test]
fn test_restore_rename_keeps_new_file() {
    let now = local_time(2025, 10, 5, 9, 30, 15);
    let bench = Bench::at(now);
    let engine = bench.engine();

    let note = bench.file("note.txt", b"original");
    let id = engine.delete(&[&note]).trashed().next().unwrap().id.clone();
    std::fs::write(&note, b"replacement").unwrap();

    let outcome = engine.restore(&id, Some(ConflictChoice::Rename)).unwrap();
    let stamp = DateTime::<Local>::from(now).format("%Y%m%d_%H%M%S").to_string();
    let expected = bench.work.canonicalize().unwrap().join(format!("note_{stamp}.txt"));
    assert_eq!(
        outcome,
        RestoreOutcome::Restored {
            id,
            destination: expected.clone()
        }
    );
    assert_eq!(std::fs::read(&expected).unwrap(), b"original");
    assert_eq!(std::fs::read(&note).unwrap(), b"replacement");
}

#[test]
fn test_delete_writes_audit_lines() {
    let bench = Bench::new();
    let engine = bench.engine();
    let file = bench.file("a.txt", b"1");
    engine.delete(&[file, bench.work.join("ghost.txt")]);

    let lines = bench.audit_lines();
    assert_eq!(lines.iter().filter(|l| l.contains("[DELETE]")).count(), 2);
    assert!(lines.iter().any(|l| l.contains("skipped") && l.contains("ghost.txt")));
}

#[test]
fn test_background_sweep_reports_through_handle() {
    let bench = Bench::new();
    bench.plant("946684800_ancient", "ancient.txt", "2000-01-01 00:00:00", 3, ItemKind::File);
    let file = bench.file("today.txt", b"now");

    let engine = bench.engine();
    let (report, handle) = engine.delete_and_sweep(&[&file]);
    assert_eq!(report.trashed().count(), 1);

    let sweep = handle.wait().expect("sweep reported").unwrap();
    assert_eq!(sweep.summary.unwrap().count, 1);
    let ids = bench.record_ids();
    assert_eq!(ids.len(), 1);
    assert_ne!(ids[0], "946684800_ancient");
    assert_eq!(ids, bench.payloads());
}

#[test]
fn test_background_sweep_failure_does_not_touch_delete_result() {
    let bench = Bench::new();
    let mut config = bench.config.clone();
    config.retention_days = 0;
    let engine = LifecycleEngine::new(config, Arc::clone(&bench.fs));

    let file = bench.file("kept.txt", b"x");
    let (report, handle) = engine.delete_and_sweep(&[&file]);
    assert_eq!(report.trashed().count(), 1);
    assert!(handle.wait().expect("sweep reported").is_err());
    assert_eq!(bench.record_ids().len(), 1);
}

#[test]
fn test_failed_record_write_puts_payload_back() {
    let bench = Bench::new();
    let file = bench.file("keep.txt", b"precious");
    let faulty = Faulty {
        fail_appends: true,
        ..Faulty::default()
    };
    let engine = LifecycleEngine::new(bench.config.clone(), Arc::new(faulty));

    let report = engine.delete(&[&file]);
    assert!(matches!(
        &report.outcomes[0],
        DeleteOutcome::Skipped { reason: SkipReason::Failed(_), .. }
    ));
    assert_eq!(std::fs::read(&file).unwrap(), b"precious");
    assert!(bench.payloads().is_empty());
    assert!(bench.record_ids().is_empty());
}

#[test]
fn test_unwritable_parent_is_skipped() {
    let bench = Bench::new();
    let file = bench.file("locked.txt", b"x");
    let faulty = Faulty {
        deny_writes: true,
        ..Faulty::default()
    };
    let engine = LifecycleEngine::new(bench.config.clone(), Arc::new(faulty));

    let report = engine.delete(&[&file]);
    assert!(matches!(
        &report.outcomes[0],
        DeleteOutcome::Skipped { reason: SkipReason::PermissionDenied(_), .. }
    ));
    assert!(file.exists());
    assert!(bench.payloads().is_empty());
}

#[test]
fn test_restore_into_unwritable_directory_is_denied() {
    let bench = Bench::new();
    let file = bench.file("doc.txt", b"x");
    let id = bench.engine().delete(&[&file]).trashed().next().unwrap().id.clone();

    let faulty = Faulty {
        deny_writes: true,
        ..Faulty::default()
    };
    let engine = LifecycleEngine::new(bench.config.clone(), Arc::new(faulty));
    let err = engine.restore(&id, None).unwrap_err();
    assert!(matches!(err, CoreError::PermissionDenied(_)));
    assert_eq!(err.category(), recycle_core::ErrorCategory::Permission);
    assert_eq!(bench.record_ids(), [id.clone()]);
    assert_eq!(bench.payloads(), [id]);
    assert!(!file.exists());
}
