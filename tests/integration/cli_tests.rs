//! The binary's commands, driven through `run_app`.

use clap::Parser;
use dupemark::cli::Cli;
use dupemark::error::ExitCode;
use dupemark::results::{IgnoreList, PowerMarker};
use dupemark::session::{Session, SessionFile, SessionGroup};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// A temp workspace with real duplicate files, a session and a config
/// pointing the ignore list into the workspace.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(names: &[&str]) -> Self {
        let dir = tempdir().unwrap();
        let files: Vec<SessionFile> = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, b"same bytes").unwrap();
                let modified = fs::metadata(&path).unwrap().modified().unwrap();
                SessionFile::new(path, 10).with_modified(modified)
            })
            .collect();
        Session::new(vec![SessionGroup {
            id: 0,
            reference: 0,
            files,
        }])
        .save(&dir.path().join("session.json"))
        .unwrap();

        let config = format!(
            "use_trash = false\nignore_list_path = {:?}\n",
            dir.path().join("ignore_list.json")
        );
        fs::write(dir.path().join("config.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn session(&self) -> Session {
        Session::load(&self.path("session.json")).unwrap()
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<ExitCode> {
        let config = self.path("config.toml");
        let session = self.path("session.json");
        let mut argv: Vec<String> = vec![
            "dupemark".into(),
            "-q".into(),
            "--config".into(),
            config.display().to_string(),
        ];
        for arg in args {
            argv.push(match *arg {
                "SESSION" => session.display().to_string(),
                other => other.to_string(),
            });
        }
        dupemark::run_app(Cli::try_parse_from(argv).unwrap())
    }
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_mark_then_delete() {
    let ws = Workspace::new(&["a.txt", "b.txt", "c.txt"]);

    assert_eq!(ws.run(&["mark", "SESSION", "--all"]).unwrap(), ExitCode::Success);
    assert_eq!(ws.session().marked.len(), 2);

    assert_eq!(ws.run(&["apply", "SESSION", "delete"]).unwrap(), ExitCode::Success);
    assert!(ws.path("a.txt").exists());
    assert!(!ws.path("b.txt").exists());
    assert!(!ws.path("c.txt").exists());
    assert!(ws.session().groups.is_empty());
}

#[test]
fn test_apply_without_marks_is_nothing_to_do() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    assert_eq!(
        ws.run(&["apply", "SESSION", "delete"]).unwrap(),
        ExitCode::NothingToDo
    );
    assert!(ws.path("b.txt").exists());
}

#[test]
fn test_apply_partial_failure() {
    let ws = Workspace::new(&["a.txt", "b.txt", "c.txt"]);
    ws.run(&["mark", "SESSION", "--all"]).unwrap();
    set_file_mtime(ws.path("c.txt"), FileTime::from_unix_time(1_000_000, 0)).unwrap();

    assert_eq!(
        ws.run(&["apply", "SESSION", "delete"]).unwrap(),
        ExitCode::PartialSuccess
    );
    assert!(ws.path("c.txt").exists());

    let session = ws.session();
    assert_eq!(session.groups[0].files.len(), 2);
    assert!(session.marked.contains(&ws.path("c.txt")));
}

#[test]
fn test_mark_file_reference_and_power_marker() {
    let ws = Workspace::new(&["a.txt", "b.txt", "c.txt"]);
    let b = arg(&ws.path("b.txt"));
    let c = arg(&ws.path("c.txt"));

    ws.run(&["mark", "SESSION", "--reference", &c, "--file", &b])
        .unwrap();
    let session = ws.session();
    assert_eq!(session.groups[0].reference, 2);
    assert_eq!(session.marked.iter().collect::<Vec<_>>(), vec![&ws.path("b.txt")]);

    ws.run(&["mark", "SESSION", "--power-marker", "on"]).unwrap();
    let session = ws.session();
    assert_eq!(session.power_marker, PowerMarker::On);
    assert_eq!(session.marked.len(), 2);
    assert!(!session.marked.contains(&ws.path("c.txt")));
}

#[test]
fn test_mark_unknown_path_fails() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    let err = ws
        .run(&["mark", "SESSION", "--file", "/not/in/results"])
        .unwrap_err();
    assert!(err.to_string().contains("not in the results"));
}

#[test]
fn test_mark_reprioritize_by_depth() {
    let ws = Workspace::new(&["deep/er/a.txt", "b.txt"]);
    ws.run(&["mark", "SESSION", "--reprioritize", "depth", "--all"])
        .unwrap();

    let session = ws.session();
    assert_eq!(session.groups[0].reference, 1);
    assert!(session.marked.contains(&ws.path("deep/er/a.txt")));
}

#[test]
fn test_apply_copy_and_move() {
    let ws = Workspace::new(&["a.txt", "x/b.txt", "y/c.txt"]);
    let backup = arg(&ws.path("backup"));
    let moved = arg(&ws.path("moved"));
    ws.run(&["mark", "SESSION", "--all"]).unwrap();

    assert_eq!(
        ws.run(&["apply", "SESSION", "copy", "--dest", &backup]).unwrap(),
        ExitCode::Success
    );
    assert!(ws.path("backup/b.txt").exists());
    assert_eq!(ws.session().groups[0].files.len(), 3);

    assert_eq!(
        ws.run(&["apply", "SESSION", "move", "--dest", &moved]).unwrap(),
        ExitCode::Success
    );
    assert!(ws.path("moved/c.txt").exists());
    assert!(!ws.path("y/c.txt").exists());
    assert!(ws.session().groups.is_empty());
}

#[test]
fn test_apply_ignore_and_manage_list() {
    let ws = Workspace::new(&["a.txt", "b.txt", "c.txt"]);
    let b = arg(&ws.path("b.txt"));
    ws.run(&["mark", "SESSION", "--file", &b]).unwrap();

    assert_eq!(ws.run(&["apply", "SESSION", "ignore"]).unwrap(), ExitCode::Success);
    assert_eq!(ws.session().groups[0].files.len(), 2);
    assert!(ws.path("b.txt").exists());

    let list = IgnoreList::load(&ws.path("ignore_list.json")).unwrap();
    assert!(list.contains(&ws.path("a.txt"), &ws.path("b.txt")));

    let a = arg(&ws.path("a.txt"));
    assert_eq!(
        ws.run(&["ignore", "remove", &b, &a]).unwrap(),
        ExitCode::Success
    );
    assert!(IgnoreList::load(&ws.path("ignore_list.json"))
        .unwrap()
        .is_empty());
    assert_eq!(
        ws.run(&["ignore", "remove", &b, &a]).unwrap(),
        ExitCode::NothingToDo
    );
    assert_eq!(ws.run(&["ignore", "clear"]).unwrap(), ExitCode::Success);
}

#[test]
fn test_apply_remove_leaves_disk_alone() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    ws.run(&["mark", "SESSION", "--all"]).unwrap();

    assert_eq!(ws.run(&["apply", "SESSION", "remove"]).unwrap(), ExitCode::Success);
    assert!(ws.path("b.txt").exists());
    assert!(ws.session().groups.is_empty());
}

#[test]
fn test_rename_updates_session() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    let b = arg(&ws.path("b.txt"));

    assert_eq!(
        ws.run(&["rename", "SESSION", &b, "b-copy.txt"]).unwrap(),
        ExitCode::Success
    );
    assert!(ws.path("b-copy.txt").exists());
    assert_eq!(ws.session().groups[0].files[1].path, ws.path("b-copy.txt"));
}

#[test]
fn test_show_formats() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    for format in ["text", "json", "csv"] {
        assert_eq!(
            ws.run(&["show", "SESSION", "--format", format]).unwrap(),
            ExitCode::Success
        );
    }
    assert_eq!(
        ws.run(&["show", "SESSION", "--filter", "nothing-matches", "--delta"])
            .unwrap(),
        ExitCode::Success
    );
}

#[test]
fn test_corrupt_session_is_an_error() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    fs::write(ws.path("session.json"), "{}").unwrap();
    assert!(ws.run(&["show", "SESSION"]).is_err());
}

#[test]
fn test_scanner_session_without_checksum() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    let scanned = serde_json::json!({
        "groups": [
            {"files": [
                {"path": ws.path("a.txt"), "size": 10},
                {"path": ws.path("b.txt"), "size": 10}
            ]}
        ]
    });
    fs::write(ws.path("session.json"), scanned.to_string()).unwrap();

    assert_eq!(ws.run(&["mark", "SESSION", "--all"]).unwrap(), ExitCode::Success);
    assert!(fs::read_to_string(ws.path("session.json"))
        .unwrap()
        .contains("\"checksum\""));

    assert_eq!(ws.run(&["apply", "SESSION", "delete"]).unwrap(), ExitCode::Success);
    assert!(ws.path("a.txt").exists());
    assert!(!ws.path("b.txt").exists());
}
