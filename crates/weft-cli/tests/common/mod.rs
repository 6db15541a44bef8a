//! Shared E2E test helpers for `weft` binary tests.

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Default timeout for CLI tests.
pub const TIMEOUT: Duration = Duration::from_secs(20);

/// Build a Command for the `weft` binary isolated from the user's
/// environment: no global config, no `WEFT_*` overrides.
pub fn weft_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("weft");
    cmd.timeout(TIMEOUT);
    for var in [
        "WEFT_DEBUG",
        "WEFT_WORKERS",
        "WEFT_RESULT_TIMEOUT_MS",
        "WEFT_CACHE_DIR",
        "WEFT_MODE",
        "WEFT_LOG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--config").arg(home.join("config.toml"));
    cmd
}

/// Creates a project directory with the given files.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("create project dir");
    for (rel, content) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write project file");
    }
    dir
}
