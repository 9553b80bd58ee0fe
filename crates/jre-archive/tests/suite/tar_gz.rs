use jre_archive::{extract, Archive, ArchiveError, ArchiveFormat, ExtractSummary};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use super::fixtures::{write_tar_gz, write_tar_gz_with_raw_path, Node};

fn runtime_nodes() -> Vec<Node<'static>> {
    vec![
        Node::Dir("ibm-java-x86_64-80/"),
        Node::Dir("ibm-java-x86_64-80/jre/"),
        Node::Dir("ibm-java-x86_64-80/jre/bin/"),
        Node::File("ibm-java-x86_64-80/jre/bin/java", b"#!/bin/sh\necho java\n", 0o755),
        Node::File("ibm-java-x86_64-80/release", b"JAVA_VERSION=\"1.8.0\"\n", 0o644),
        Node::Symlink("ibm-java-x86_64-80/bin", "jre/bin"),
        Node::HardLink("ibm-java-x86_64-80/release.copy", "ibm-java-x86_64-80/release"),
    ]
}

#[test]
fn extracts_with_leading_directory_stripped() {
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("jre.tar.gz");
    write_tar_gz(&archive_path, &runtime_nodes());

    let dest = dir.path().join("app/.java");
    let archive = Archive::new(&archive_path);
    assert_eq!(archive.format().unwrap(), ArchiveFormat::TarGz);

    let summary = archive.extract(&dest, 1).unwrap();
    assert_eq!(
        summary,
        ExtractSummary {
            files: 2,
            directories: 2,
            links: 2,
        }
    );

    assert_eq!(
        std::fs::read_to_string(dest.join("release")).unwrap(),
        "JAVA_VERSION=\"1.8.0\"\n"
    );
    assert_eq!(
        std::fs::read_to_string(dest.join("release.copy")).unwrap(),
        "JAVA_VERSION=\"1.8.0\"\n"
    );
    assert!(dest.join("jre/bin/java").is_file());
    assert!(!dest.join("ibm-java-x86_64-80").exists());
}

#[cfg(unix)]
#[test]
fn preserves_modes_and_relative_symlinks() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("jre.tar.gz");
    write_tar_gz(&archive_path, &runtime_nodes());

    let dest = dir.path().join("out");
    extract(&archive_path, &dest, 1).unwrap();

    let mode = std::fs::metadata(dest.join("jre/bin/java"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o111, 0o111, "java launcher should stay executable");

    let link = std::fs::read_link(dest.join("bin")).unwrap();
    assert_eq!(link, std::path::PathBuf::from("jre/bin"));
    assert!(dest.join("bin/java").is_file());
}

#[test]
fn strip_zero_keeps_top_level_directory() {
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("jre.tar.gz");
    write_tar_gz(
        &archive_path,
        &[Node::File("top/bin/java", b"java", 0o755)],
    );

    let dest = dir.path().join("out");
    extract(&archive_path, &dest, 0).unwrap();
    assert!(dest.join("top/bin/java").is_file());
}

#[test]
fn rejects_parent_dir_entries() {
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("evil.tar.gz");
    write_tar_gz_with_raw_path(&archive_path, "top/../../escaped", b"gotcha");

    let dest = dir.path().join("out");
    let err = extract(&archive_path, &dest, 1).unwrap_err();
    assert!(
        matches!(err, ArchiveError::UnsafeEntryPath { .. }),
        "unexpected error: {err}"
    );
    assert!(!dir.path().join("escaped").exists());
}

#[test]
fn rejects_symlinks_escaping_destination() {
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("evil.tar.gz");
    write_tar_gz(
        &archive_path,
        &[Node::Symlink("top/lib/passwd", "../../../etc/passwd")],
    );

    let err = extract(&archive_path, &dir.path().join("out"), 1).unwrap_err();
    assert!(
        matches!(err, ArchiveError::UnsafeLinkTarget { .. }),
        "unexpected error: {err}"
    );
}

#[cfg(unix)]
#[test]
fn rejects_entries_written_through_extracted_symlinks() {
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("chained.tar.gz");
    // Each link resolves inside the destination on its own, but `up/x` would
    // be created inside `up`'s target, one level above the destination.
    write_tar_gz(
        &archive_path,
        &[
            Node::Dir("top/a/b/"),
            Node::Symlink("top/a/b/up", "../.."),
            Node::Symlink("top/a/b/up/x", ".."),
            Node::File("top/a/b/up/x/pwned", b"overwritten", 0o644),
        ],
    );

    let app = dir.path().join("app");
    let err = extract(&archive_path, &app.join(".java"), 1).unwrap_err();
    assert!(
        matches!(err, ArchiveError::UnsafeEntryPath { .. }),
        "unexpected error: {err}"
    );
    assert!(!app.join(".java/x").exists());
    assert!(!app.join("x").exists());
    assert!(!app.join("pwned").exists());
}

#[cfg(unix)]
#[test]
fn rejects_hard_links_resolved_through_extracted_symlinks() {
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("hardlink.tar.gz");
    write_tar_gz(
        &archive_path,
        &[
            Node::Dir("top/a/"),
            Node::Symlink("top/a/up", ".."),
            Node::HardLink("top/stolen", "top/a/up/secret"),
        ],
    );

    let dest = dir.path().join("out");
    let err = extract(&archive_path, &dest, 1).unwrap_err();
    assert!(
        matches!(err, ArchiveError::UnsafeLinkTarget { .. }),
        "unexpected error: {err}"
    );
    assert!(!dest.join("stolen").exists());
}

#[test]
fn corrupt_archive_is_an_error_not_an_empty_extraction() {
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("corrupt.tar.gz");
    // A well-formed gzip header followed by a deflate block with a reserved block type.
    let mut bytes = vec![0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff];
    bytes.extend_from_slice(&[0xff; 64]);
    std::fs::write(&archive_path, bytes).unwrap();

    let err = extract(&archive_path, &dir.path().join("out"), 1).unwrap_err();
    assert!(matches!(err, ArchiveError::Read { .. }), "unexpected error: {err}");
}

#[test]
fn missing_archive_reports_open_error() {
    let dir = tempdir().unwrap();
    let err = extract(&dir.path().join("nope.tar.gz"), &dir.path().join("out"), 1).unwrap_err();
    assert!(matches!(err, ArchiveError::Open { .. }), "unexpected error: {err}");
}
