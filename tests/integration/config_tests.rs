use dupemark::actions::DeleteOptions;
use dupemark::config::Config;
use dupemark::results::{Criterion, Direction, PowerMarker};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_file_full() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
use_trash = false
direct_only = true
verify_mtime = false
power_marker = true
ignore_list_path = "/var/lib/dupemark/ignore.json"
directories_path = "/var/lib/dupemark/dirs.json"

[[reprioritize]]
kind = "modified"
prefer = "highest"

[[reprioritize]]
kind = "folder_priority"
folders = ["/photos", "/backup"]
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(
        config.delete_options(),
        DeleteOptions::permanent().with_direct_only(true)
    );
    assert!(!config.verify_mtime);
    assert_eq!(config.power_marker(), PowerMarker::On);
    assert_eq!(
        config.reprioritize,
        vec![
            Criterion::Modified {
                prefer: Direction::Highest
            },
            Criterion::FolderPriority {
                folders: vec![PathBuf::from("/photos"), PathBuf::from("/backup")]
            },
        ]
    );
    assert_eq!(
        config.directories_path,
        Some(PathBuf::from("/var/lib/dupemark/dirs.json"))
    );
}

#[test]
fn test_config_partial_file_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "direct_only = true\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert!(config.use_trash);
    assert!(config.verify_mtime);
    assert!(config.direct_only);
    assert!(config.reprioritize.is_empty());
}

#[test]
fn test_config_unknown_criterion_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[[reprioritize]]\nkind = \"colour\"\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Invalid configuration"));
}
