//! File actions against a real filesystem.

use dupemark::actions::{
    ActionKind, ActionOutcome, ActionProgressCallback, BatchReport, DeleteOptions, FileOutcome,
    LocalFileOps, SkipReason,
};
use dupemark::engine::{Command, Engine, Outcome};
use dupemark::results::{
    Directories, DirectoryState, DuplicateGroup, FileRef, ResultsBuilder, ScannedFile,
};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn write_file(path: &Path, content: &[u8]) -> ScannedFile {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    let modified = fs::metadata(path).unwrap().modified().unwrap();
    ScannedFile::new(path, content.len() as u64).with_modified(modified)
}

/// One group of `names` under `dir`, all with the same content.
fn group_of(dir: &Path, names: &[&str]) -> Vec<DuplicateGroup> {
    let files: Vec<ScannedFile> = names
        .iter()
        .map(|n| write_file(&dir.join(n), b"duplicate content"))
        .collect();
    ResultsBuilder::new().group(files).build()
}

fn engine_with(groups: Vec<DuplicateGroup>, ops: LocalFileOps) -> Engine {
    let mut engine = Engine::new(Arc::new(ops));
    engine.execute(Command::LoadResults(groups)).unwrap();
    engine
}

fn completed(outcome: Outcome) -> (BatchReport, usize) {
    match outcome {
        Outcome::ActionCompleted {
            report, removed, ..
        } => (report, removed),
        other => panic!("expected ActionCompleted, got {:?}", other),
    }
}

fn run(engine: &mut Engine, kind: ActionKind) -> (BatchReport, usize) {
    completed(engine.execute(Command::ExecuteAction(kind)).unwrap())
}

// ==================== Delete Tests ====================

#[test]
fn test_permanent_delete_marked_files() {
    let dir = tempdir().unwrap();
    let mut engine = engine_with(
        group_of(dir.path(), &["a.txt", "b.txt", "c.txt"]),
        LocalFileOps::new(),
    );
    engine.execute(Command::MarkAllGroups).unwrap();

    let (report, removed) = run(&mut engine, ActionKind::Delete(DeleteOptions::permanent()));

    assert!(report.all_succeeded());
    assert_eq!(report.applied_count(), 2);
    assert_eq!(report.bytes_processed, 2 * 17);
    assert_eq!(removed, 2);
    assert!(dir.path().join("a.txt").exists());
    assert!(!dir.path().join("b.txt").exists());
    assert!(!dir.path().join("c.txt").exists());
    assert!(engine.groups().is_empty());
    assert!(engine.marks().is_empty());
}

#[test]
fn test_modified_file_is_not_deleted() {
    let dir = tempdir().unwrap();
    let mut engine = engine_with(
        group_of(dir.path(), &["a.txt", "b.txt", "c.txt"]),
        LocalFileOps::new(),
    );
    engine.execute(Command::MarkAllGroups).unwrap();

    let changed = dir.path().join("b.txt");
    set_file_mtime(&changed, FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let (report, removed) = run(&mut engine, ActionKind::Delete(DeleteOptions::permanent()));

    assert_eq!(report.applied_count(), 1);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(removed, 1);
    assert!(changed.exists());
    assert!(!dir.path().join("c.txt").exists());

    let key = engine.key_for_path(&changed).unwrap();
    assert!(engine.is_marked(key));
    assert_eq!(engine.groups()[0].len(), 2);
}

#[test]
fn test_verify_disabled_deletes_modified_file() {
    let dir = tempdir().unwrap();
    let mut engine = engine_with(
        group_of(dir.path(), &["a.txt", "b.txt"]),
        LocalFileOps::new().with_verify_mtime(false),
    );
    engine.execute(Command::MarkAllGroups).unwrap();
    set_file_mtime(
        dir.path().join("b.txt"),
        FileTime::from_unix_time(1_000_000, 0),
    )
    .unwrap();

    let (report, _) = run(&mut engine, ActionKind::Delete(DeleteOptions::permanent()));
    assert!(report.all_succeeded());
    assert!(!dir.path().join("b.txt").exists());
}

#[test]
fn test_already_deleted_file_is_skipped() {
    let dir = tempdir().unwrap();
    let mut engine = engine_with(
        group_of(dir.path(), &["a.txt", "b.txt", "c.txt"]),
        LocalFileOps::new(),
    );
    engine.execute(Command::MarkAllGroups).unwrap();
    fs::remove_file(dir.path().join("b.txt")).unwrap();

    let (report, removed) = run(&mut engine, ActionKind::Delete(DeleteOptions::permanent()));

    let gone: Vec<&FileOutcome> = report
        .entries
        .iter()
        .filter(|e| e.outcome == ActionOutcome::Skipped(SkipReason::Gone))
        .collect();
    assert_eq!(gone.len(), 1);
    assert_eq!(gone[0].file.path(), dir.path().join("b.txt"));
    assert_eq!(report.failed_count(), 0);
    assert_eq!(removed, 2);
    assert!(engine.groups().is_empty());
}

#[test]
fn test_direct_only_skips_excluded_directory() {
    let dir = tempfile::Builder::new()
        .prefix("dupemark")
        .tempdir()
        .unwrap();
    let root = dir.path();
    let groups = group_of(root, &["keep/a.txt", "keep/b.txt", "archive/c.txt"]);

    let mut directories = Directories::new();
    directories.add_path(root).unwrap();
    directories.set_state(&root.join("archive"), DirectoryState::Excluded);

    let mut engine = Engine::new(Arc::new(LocalFileOps::new())).with_directories(directories);
    engine.execute(Command::LoadResults(groups)).unwrap();
    engine.execute(Command::MarkAllGroups).unwrap();

    let options = DeleteOptions::permanent().with_direct_only(true);
    let (report, removed) = run(&mut engine, ActionKind::Delete(options));

    assert_eq!(report.applied_count(), 1);
    assert_eq!(report.skipped_count(), 1);
    let excluded = report
        .entries
        .iter()
        .find(|e| e.outcome == ActionOutcome::Skipped(SkipReason::Excluded))
        .unwrap();
    assert_eq!(excluded.file.path(), root.join("archive/c.txt"));
    assert!(root.join("archive/c.txt").exists());
    assert!(!root.join("keep/b.txt").exists());
    assert_eq!(removed, 1);
}

// ==================== Move and Copy Tests ====================

#[test]
fn test_move_marked_files() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("moved");
    let mut engine = engine_with(
        group_of(dir.path(), &["src/a.txt", "src/b.txt", "other/c.txt"]),
        LocalFileOps::new(),
    );
    engine.execute(Command::MarkAllGroups).unwrap();

    let (report, removed) = run(&mut engine, ActionKind::Move { dest: dest.clone() });

    assert!(report.all_succeeded());
    assert_eq!(removed, 2);
    assert!(dest.join("b.txt").exists());
    assert!(dest.join("c.txt").exists());
    assert!(!dir.path().join("src/b.txt").exists());
    let targets: Vec<PathBuf> = report
        .entries
        .iter()
        .filter_map(|e| e.target.clone())
        .collect();
    assert_eq!(targets, vec![dest.join("b.txt"), dest.join("c.txt")]);
}

#[test]
fn test_move_collision_fails_and_keeps_source() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("moved");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("b.txt"), b"already here").unwrap();

    let mut engine = engine_with(
        group_of(dir.path(), &["a.txt", "src/b.txt"]),
        LocalFileOps::new(),
    );
    engine.execute(Command::MarkAllGroups).unwrap();

    let (report, removed) = run(&mut engine, ActionKind::Move { dest: dest.clone() });

    assert_eq!(report.failed_count(), 1);
    assert_eq!(removed, 0);
    assert!(dir.path().join("src/b.txt").exists());
    assert_eq!(fs::read(dest.join("b.txt")).unwrap(), b"already here");
}

#[test]
fn test_copy_keeps_originals_and_marks() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("backup");
    let mut engine = engine_with(
        group_of(dir.path(), &["a.txt", "x/b.txt", "y/c.txt"]),
        LocalFileOps::new(),
    );
    engine.execute(Command::MarkAllGroups).unwrap();

    let (report, removed) = run(&mut engine, ActionKind::Copy { dest: dest.clone() });

    assert!(report.all_succeeded());
    assert_eq!(removed, 0);
    assert!(dest.join("b.txt").exists());
    assert!(dest.join("c.txt").exists());
    assert!(dir.path().join("x/b.txt").exists());
    assert_eq!(engine.groups()[0].len(), 3);
    assert_eq!(engine.marks().len(), 2);
}

// ==================== Rename Tests ====================

#[test]
fn test_rename_on_disk_keeps_key() {
    let dir = tempdir().unwrap();
    let mut engine = engine_with(group_of(dir.path(), &["a.txt", "b.txt"]), LocalFileOps::new());
    let old = dir.path().join("b.txt");
    let key = engine.key_for_path(&old).unwrap();

    engine
        .execute(Command::Rename {
            file: key,
            new_name: "renamed.txt".to_string(),
        })
        .unwrap();

    let new = dir.path().join("renamed.txt");
    assert!(new.exists());
    assert!(!old.exists());
    assert_eq!(engine.key_for_path(&new), Some(key));
}

#[test]
fn test_rename_rejects_path_separator() {
    let dir = tempdir().unwrap();
    let mut engine = engine_with(group_of(dir.path(), &["a.txt", "b.txt"]), LocalFileOps::new());
    let key = engine.key_for_path(&dir.path().join("b.txt")).unwrap();

    let result = engine.execute(Command::Rename {
        file: key,
        new_name: "../escape.txt".to_string(),
    });
    assert!(result.is_err());
    assert!(dir.path().join("b.txt").exists());
}

// ==================== Background Batch Tests ====================

/// Raises the cancel flag once the first file has been handled.
struct CancelAfterFirst {
    flag: Arc<AtomicBool>,
}

impl ActionProgressCallback for CancelAfterFirst {
    fn on_start(&self, _total: usize) {}
    fn on_file(&self, _file: &FileRef, _index: usize, _total: usize) {}
    fn on_outcome(&self, _outcome: &FileOutcome) {
        self.flag.store(true, Ordering::SeqCst);
    }
    fn on_complete(&self, _report: &BatchReport) {}
}

#[test]
fn test_background_batch_cancelled_midway() {
    let dir = tempdir().unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let groups = group_of(dir.path(), &["a.txt", "b.txt", "c.txt", "d.txt"]);
    let mut engine = Engine::new(Arc::new(LocalFileOps::new())).with_cancel_flag(Arc::clone(&flag));
    engine.execute(Command::LoadResults(groups)).unwrap();
    engine.execute(Command::MarkAllGroups).unwrap();

    let batch = engine
        .begin_action(ActionKind::Delete(DeleteOptions::permanent()))
        .unwrap();
    let ops = engine.file_operations();
    let callback = CancelAfterFirst {
        flag: Arc::clone(&flag),
    };
    let worker = std::thread::spawn(move || {
        let callback: &dyn ActionProgressCallback = &callback;
        batch.run_with_progress(ops.as_ref(), Some(callback))
    });

    assert!(engine.execute(Command::UnmarkAll).is_err());
    let report = worker.join().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.applied_count(), 1);
    assert_eq!(report.skipped_count(), 2);
    assert!(report
        .entries
        .iter()
        .skip(1)
        .all(|e| e.outcome == ActionOutcome::Skipped(SkipReason::Cancelled)));

    let (_, removed) = completed(engine.complete_action(report).unwrap());
    assert_eq!(removed, 1);
    assert!(!flag.load(Ordering::SeqCst));
    assert_eq!(engine.groups()[0].len(), 3);
    assert_eq!(engine.marks().len(), 2);
    assert!(dir.path().join("c.txt").exists());
    assert!(dir.path().join("d.txt").exists());
}
