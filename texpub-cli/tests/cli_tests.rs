//! Integration tests for the Texpub CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a file below the temp dir, creating parent directories
fn create_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// A stand-in for pandoc: echoes the document (already HTML) to stdout and
/// fails on documents containing FAIL
#[cfg(unix)]
fn fake_pandoc(dir: &TempDir) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = create_file(
        dir,
        "bin/fake-pandoc",
        "#!/bin/sh\nif grep -q FAIL \"$1\"; then echo 'conversion failed' >&2; exit 3; fi\ncat \"$1\"\n",
    );
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn texpub() -> Command {
    Command::cargo_bin("texpub").unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help() {
    texpub()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn test_version() {
    texpub()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("texpub"));
}

#[test]
fn test_build_help() {
    texpub()
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build an EPUB"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--extract-media"))
        .stdout(predicate::str::contains("--jobs"));
}

#[test]
fn test_info_help() {
    texpub()
        .args(["info", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Display information"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_build_invalid_jobs() {
    texpub()
        .args(["build", "job.json", "--jobs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_build_nonexistent_config() {
    texpub()
        .args(["build", "/nonexistent/job.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_info_nonexistent_file() {
    texpub()
        .args(["info", "/nonexistent/file.epub"])
        .assert()
        .failure();
}

#[test]
fn test_info_rejects_non_epub() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_file(&temp_dir, "notes.epub", "definitely not a zip file");

    texpub().args(["info", path_str(&input)]).assert().failure();
}

#[test]
fn test_validate_reports_missing_files() {
    let temp_dir = TempDir::new().unwrap();
    create_file(&temp_dir, "a.tex", "<p>a</p>");
    let config = create_file(
        &temp_dir,
        "job.json",
        r#"{"materials": ["a.tex", "b.tex"], "cover": "cover.jpg"}"#,
    );

    texpub()
        .args(["validate", path_str(&config)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("material not found: "))
        .stderr(predicate::str::contains("b.tex"))
        .stderr(predicate::str::contains("cover not found"));
}

#[test]
fn test_validate_empty_materials() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_file(&temp_dir, "job.json", r#"{"materials": []}"#);

    texpub()
        .args(["validate", path_str(&config)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no materials"));
}

#[test]
fn test_validate_success() {
    let temp_dir = TempDir::new().unwrap();
    create_file(&temp_dir, "chapters/a.tex", "<p>a</p>");
    let config = create_file(
        &temp_dir,
        "job.json",
        r#"{"materials": ["chapters/a.tex"], "title": "Signals"}"#,
    );

    texpub()
        .args(["validate", path_str(&config)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid configuration"))
        .stdout(predicate::str::contains("Signals"));
}

#[cfg(unix)]
#[test]
fn test_build_and_inspect() {
    let temp_dir = TempDir::new().unwrap();
    let pandoc = fake_pandoc(&temp_dir);
    create_file(&temp_dir, "cover.jpg", "jpeg bytes");
    create_file(&temp_dir, "fig1.png", "png bytes");
    create_file(
        &temp_dir,
        "a.tex",
        "<h1>Sampling</h1>\n<img src=\"fig1.png\" alt=\"fig\" />",
    );
    create_file(&temp_dir, "b.tex", "<h2>Filters</h2>\n<p>text</p>");
    let config = create_file(
        &temp_dir,
        "job.json",
        r#"{"materials": ["a.tex", "b.tex"], "cover": "cover.jpg", "title": "Signals", "extractMedia": true}"#,
    );
    let output = temp_dir.path().join("out/signals.epub");

    texpub()
        .current_dir(temp_dir.path())
        .args([
            "build",
            path_str(&config),
            "--output",
            path_str(&output),
            "--pandoc",
            path_str(&pandoc),
        ])
        .assert()
        .success();
    assert!(output.exists());

    let result = texpub()
        .args(["info", path_str(&output), "--json"])
        .assert()
        .success();
    let info: serde_json::Value =
        serde_json::from_slice(&result.get_output().stdout).expect("info prints JSON");

    assert_eq!(info["title"], "Signals");
    assert_eq!(info["cover"], "cover.jpg");
    assert_eq!(info["chapters"][0]["title"], "Sampling");
    assert_eq!(info["chapters"][1]["title"], "Filters");
    assert_eq!(info["media"][0], "media/0001-fig1.png");
}

#[cfg(unix)]
#[test]
fn test_build_prompts_for_config() {
    let temp_dir = TempDir::new().unwrap();
    let pandoc = fake_pandoc(&temp_dir);
    create_file(&temp_dir, "a.tex", "<p>a</p>");
    let config = create_file(&temp_dir, "job.json", r#"{"materials": ["a.tex"]}"#);

    texpub()
        .current_dir(temp_dir.path())
        .args(["build", "--pandoc", path_str(&pandoc)])
        .write_stdin(format!("{}\n", path_str(&config)))
        .assert()
        .success()
        .stderr(predicate::str::contains("Path to the job configuration"));
    assert!(temp_dir.path().join("output.epub").exists());
}

#[cfg(unix)]
#[test]
fn test_build_partial_failure_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let pandoc = fake_pandoc(&temp_dir);
    create_file(&temp_dir, "a.tex", "<h1>Good</h1>");
    create_file(&temp_dir, "b.tex", "FAIL");
    let config = create_file(
        &temp_dir,
        "job.json",
        r#"{"materials": ["a.tex", "b.tex"], "output": "book.epub"}"#,
    );

    texpub()
        .args(["build", path_str(&config), "--pandoc", path_str(&pandoc)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conversion failed"))
        .stderr(predicate::str::contains("1 of 2 documents failed"));

    // The successful document is still packaged
    assert!(temp_dir.path().join("book.epub").exists());
}

#[cfg(unix)]
#[test]
fn test_build_missing_cover_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let pandoc = fake_pandoc(&temp_dir);
    create_file(&temp_dir, "a.tex", "<p>a</p>");
    let config = create_file(
        &temp_dir,
        "job.json",
        r#"{"materials": ["a.tex"], "cover": "missing.jpg", "output": "book.epub"}"#,
    );

    texpub()
        .args(["build", path_str(&config), "--pandoc", path_str(&pandoc)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cover image not found"));
    assert!(!temp_dir.path().join("book.epub").exists());
}

#[test]
fn test_build_rejects_unknown_page_format() {
    let temp_dir = TempDir::new().unwrap();
    create_file(&temp_dir, "a.tex", "<p>a</p>");
    let config = create_file(&temp_dir, "job.json", r#"{"materials": ["a.tex"]}"#);

    texpub()
        .args(["build", path_str(&config), "--page-format", "tiff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported page format 'tiff'"));
}

#[cfg(unix)]
#[test]
fn test_build_logs_dropped_media_and_cleans_scratch_dir() {
    let temp_dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let pandoc = fake_pandoc(&temp_dir);
    create_file(
        &temp_dir,
        "a.tex",
        "<h1>A</h1>\n<img src=\"missing.png\" alt=\"gone\" />",
    );
    let config = create_file(
        &temp_dir,
        "job.json",
        r#"{"materials": ["a.tex"], "extractMedia": true, "output": "book.epub"}"#,
    );

    texpub()
        .args([
            "build",
            path_str(&config),
            "--pandoc",
            path_str(&pandoc),
            "--scratch-dir",
            path_str(scratch.path()),
            "--page-format",
            "jpeg",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("WARN"))
        .stderr(predicate::str::contains("dropped 'missing.png'"));

    assert!(temp_dir.path().join("book.epub").exists());
    let leftovers: Vec<_> = fs::read_dir(scratch.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "scratch not removed: {:?}", leftovers);
}

#[test]
fn test_build_missing_engine() {
    let temp_dir = TempDir::new().unwrap();
    create_file(&temp_dir, "a.tex", "<p>a</p>");
    let config = create_file(&temp_dir, "job.json", r#"{"materials": ["a.tex"]}"#);

    texpub()
        .args([
            "build",
            path_str(&config),
            "--pandoc",
            "/nonexistent/bin/pandoc",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No document converted successfully"));
}
