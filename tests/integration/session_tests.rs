use dupemark::actions::LocalFileOps;
use dupemark::engine::{Command, Engine};
use dupemark::results::PowerMarker;
use dupemark::session::{Session, SessionFile, SessionGroup, SESSION_VERSION};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn engine() -> Engine {
    Engine::new(Arc::new(LocalFileOps::new()))
}

fn sample_session() -> Session {
    Session::new(vec![
        SessionGroup {
            id: 0,
            reference: 0,
            files: vec![
                SessionFile::new("/data/a.jpg", 100),
                SessionFile::new("/backup/a.jpg", 100),
                SessionFile::new("/old/a.jpg", 100),
            ],
        },
        SessionGroup {
            id: 1,
            reference: 1,
            files: vec![
                SessionFile::new("/data/b.txt", 7),
                SessionFile::new("/backup/b.txt", 7),
            ],
        },
    ])
}

#[test]
fn test_session_workflow_full() {
    let dir = tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    sample_session().save(&session_path).unwrap();

    // 1. Load into an engine and review
    let mut first = engine();
    Session::load(&session_path)
        .unwrap()
        .restore_into(&mut first)
        .unwrap();
    let old = first.key_for_path(Path::new("/old/a.jpg")).unwrap();
    first.execute(Command::MakeReference(old)).unwrap();
    let backup = first.key_for_path(Path::new("/backup/a.jpg")).unwrap();
    first.execute(Command::Mark(backup)).unwrap();

    // 2. Save the reviewed state
    Session::from_engine(&first).save(&session_path).unwrap();

    // 3. Reload into a fresh engine
    let mut second = engine();
    Session::load(&session_path)
        .unwrap()
        .restore_into(&mut second)
        .unwrap();

    assert_eq!(second.groups().len(), 2);
    let key = second.key_for_path(Path::new("/backup/a.jpg")).unwrap();
    assert!(second.is_marked(key));
    assert_eq!(second.marks().len(), 1);
    assert_eq!(second.groups()[0].reference().path(), Path::new("/old/a.jpg"));
    assert_eq!(
        second.groups()[1].reference().path(),
        Path::new("/backup/b.txt")
    );
}

#[test]
fn test_session_power_marker_survives() {
    let dir = tempdir().unwrap();
    let session_path = dir.path().join("session.json");

    let mut first = engine();
    sample_session().restore_into(&mut first).unwrap();
    first.execute(Command::TogglePowerMarker).unwrap();
    Session::from_engine(&first).save(&session_path).unwrap();

    let loaded = Session::load(&session_path).unwrap();
    assert_eq!(loaded.power_marker, PowerMarker::On);
    assert_eq!(loaded.marked.len(), 3);

    let mut second = engine();
    loaded.restore_into(&mut second).unwrap();
    assert_eq!(second.power_marker(), PowerMarker::On);
    assert_eq!(second.marks().len(), 3);
}

#[test]
fn test_session_with_singleton_group_is_trimmed() {
    let mut session = sample_session();
    session.groups.push(SessionGroup {
        id: 2,
        reference: 0,
        files: vec![SessionFile::new("/lonely.txt", 1)],
    });

    let mut engine = engine();
    session.restore_into(&mut engine).unwrap();
    assert_eq!(engine.groups().len(), 2);
    assert!(engine.key_for_path(Path::new("/lonely.txt")).is_none());
}

#[test]
fn test_session_corrupted_checksum_rejected() {
    let dir = tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    sample_session().save(&session_path).unwrap();

    let content = fs::read_to_string(&session_path).unwrap();
    let tampered = content.replace("/data/a.jpg", "/data/z.jpg");
    fs::write(&session_path, tampered).unwrap();

    let err = Session::load(&session_path).unwrap_err();
    assert!(err.to_string().contains("integrity check failed"));
}

#[test]
fn test_session_missing_file() {
    let dir = tempdir().unwrap();
    assert!(Session::load(&dir.path().join("missing.json")).is_err());
}

#[test]
fn test_session_version_constant() {
    assert_eq!(sample_session().version, SESSION_VERSION);
}
