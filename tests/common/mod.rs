use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use std::path::Path;

/// A folder with one three-shot burst at 10:00 and a lone shot at noon.
pub fn setup_burst_folder(temp_dir: &TempDir) -> ChildPath {
    let photos = temp_dir.child("photos");
    for name in [
        "20240101_100000.jpg",
        "20240101_100001.jpg",
        "20240101_100002.jpg",
        "20240101_120000.jpg",
    ] {
        photos.child(name).write_str(name).unwrap();
    }
    photos
}

/// `burstcull` with metadata reading off and progress stored inside the temp dir.
pub fn burstcull(subcommand: &str, dir: &Path, temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("burstcull").unwrap();
    cmd.arg(subcommand)
        .arg(dir)
        .arg("--state-file")
        .arg(temp_dir.path().join("sessions.json"));
    cmd
}
