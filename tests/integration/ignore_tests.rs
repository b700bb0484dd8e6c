use dupemark::actions::LocalFileOps;
use dupemark::engine::{Command, Engine, Outcome};
use dupemark::results::{IgnoreList, ResultsBuilder, ScannedFile};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn groups() -> Vec<dupemark::results::DuplicateGroup> {
    ResultsBuilder::new()
        .group(vec![
            ScannedFile::new("/photos/a.jpg", 10),
            ScannedFile::new("/backup/a.jpg", 10),
            ScannedFile::new("/tmp/a.jpg", 10),
        ])
        .group(vec![
            ScannedFile::new("/docs/x.pdf", 3),
            ScannedFile::new("/mail/x.pdf", 3),
        ])
        .build()
}

#[test]
fn test_ignore_marked_is_saved_and_applied_next_run() {
    let dir = tempdir().unwrap();
    let list_path = dir.path().join("state/ignore_list.json");

    let mut engine = Engine::new(Arc::new(LocalFileOps::new()))
        .with_ignore_list(IgnoreList::load_or_default(&list_path), Some(list_path.clone()));
    engine.execute(Command::LoadResults(groups())).unwrap();

    let backup = engine.key_for_path(Path::new("/backup/a.jpg")).unwrap();
    let mail = engine.key_for_path(Path::new("/mail/x.pdf")).unwrap();
    engine.execute(Command::Mark(backup)).unwrap();
    engine.execute(Command::Mark(mail)).unwrap();

    let outcome = engine.execute(Command::IgnoreMarked).unwrap();
    let Outcome::Ignored { pairs, dissolved } = outcome else {
        panic!("expected Ignored");
    };
    assert_eq!(pairs, 2);
    assert_eq!(dissolved.len(), 1);
    assert_eq!(engine.groups().len(), 1);
    assert!(list_path.exists());

    // A later run loads the saved list and filters fresh results
    let saved = IgnoreList::load(&list_path).unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.contains(Path::new("/backup/a.jpg"), Path::new("/photos/a.jpg")));

    let mut next = Engine::new(Arc::new(LocalFileOps::new())).with_ignore_list(saved, None);
    let outcome = next.execute(Command::LoadResults(groups())).unwrap();
    assert_eq!(outcome, Outcome::Loaded { groups: 1, ignored: 2 });
    assert_eq!(next.groups()[0].len(), 2);
    assert!(next.key_for_path(Path::new("/tmp/a.jpg")).is_some());
}

#[test]
fn test_ignore_list_removal_restores_pair() {
    let mut list = IgnoreList::new();
    list.add(Path::new("/docs/x.pdf"), Path::new("/mail/x.pdf"));

    let mut engine = Engine::new(Arc::new(LocalFileOps::new())).with_ignore_list(list.clone(), None);
    engine.execute(Command::LoadResults(groups())).unwrap();
    assert_eq!(engine.groups().len(), 1);

    assert!(list.remove(Path::new("/mail/x.pdf"), Path::new("/docs/x.pdf")));
    let mut engine = Engine::new(Arc::new(LocalFileOps::new())).with_ignore_list(list, None);
    engine.execute(Command::LoadResults(groups())).unwrap();
    assert_eq!(engine.groups().len(), 2);
}

#[test]
fn test_corrupt_ignore_list_starts_empty() {
    let dir = tempdir().unwrap();
    let list_path = dir.path().join("ignore_list.json");
    fs::write(&list_path, "{ not json").unwrap();

    assert!(IgnoreList::load(&list_path).is_err());
    assert!(IgnoreList::load_or_default(&list_path).is_empty());
}
