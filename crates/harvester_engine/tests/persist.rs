use std::fs;
use std::io::Write;

use harvester_engine::{OutputBatch, PersistError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn listing(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn staged_files_appear_only_on_commit() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("out").join("nested");

    let mut batch = OutputBatch::create(&target).unwrap();
    assert!(target.is_dir());
    write!(batch.stage("a.md").unwrap(), "first").unwrap();
    batch.stage_bytes("manifest.json", b"{}").unwrap();
    assert_eq!(batch.staged_count(), 2);
    assert!(!target.join("a.md").exists());

    let published = batch.commit().unwrap();

    assert_eq!(published, vec![target.join("a.md"), target.join("manifest.json")]);
    assert_eq!(fs::read_to_string(target.join("a.md")).unwrap(), "first");
    assert_eq!(listing(&target), vec!["a.md", "manifest.json"]);
}

#[test]
fn dropping_an_uncommitted_batch_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    {
        let mut batch = OutputBatch::create(temp.path()).unwrap();
        batch.stage_bytes("a.md", b"draft").unwrap();
    }
    assert!(listing(temp.path()).is_empty());
}

#[test]
fn commit_replaces_files_from_an_earlier_run() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.md"), "old").unwrap();

    let mut batch = OutputBatch::create(temp.path()).unwrap();
    batch.stage_bytes("a.md", b"new").unwrap();
    batch.commit().unwrap();

    assert_eq!(fs::read_to_string(temp.path().join("a.md")).unwrap(), "new");
}

#[test]
fn failed_commit_removes_what_it_published() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("b.md");
    fs::create_dir(&blocker).unwrap();
    fs::write(blocker.join("keep"), "x").unwrap();

    let mut batch = OutputBatch::create(temp.path()).unwrap();
    batch.stage_bytes("a.md", b"first").unwrap();
    batch.stage_bytes("b.md", b"second").unwrap();
    batch.stage_bytes("c.md", b"third").unwrap();
    let err = batch.commit().unwrap_err();

    assert!(matches!(err, PersistError::Publish { ref file, .. } if file == "b.md"));
    assert_eq!(listing(temp.path()), vec!["b.md"]);
    assert!(blocker.join("keep").exists());
}

#[test]
fn a_name_can_only_be_staged_once() {
    let temp = TempDir::new().unwrap();
    let mut batch = OutputBatch::create(temp.path()).unwrap();
    batch.stage_bytes("a.md", b"one").unwrap();

    let err = batch.stage_bytes("a.md", b"two").unwrap_err();
    assert!(matches!(err, PersistError::Duplicate(ref name) if name == "a.md"));
    assert_eq!(batch.staged_count(), 1);
}

#[test]
fn refuses_a_file_as_output_dir() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let result = OutputBatch::create(&file_path);
    assert!(matches!(result, Err(PersistError::OutputDir { .. })));
}
