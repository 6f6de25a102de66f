//! Common test utilities shared across integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Get the path to the gauntlet binary built by `cargo test`.
///
/// Uses `CARGO_BIN_EXE_gauntlet` which cargo sets at compile time for
/// integration tests in packages with a `[[bin]]` target, avoiding a nested
/// `cargo build` inside the test.
pub fn get_gauntlet_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gauntlet"))
}

/// Run the gauntlet binary in the specified directory.
pub fn run_gauntlet_in_dir(dir: &Path, args: &[&str]) -> Output {
    let binary = get_gauntlet_binary();

    Command::new(&binary)
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute gauntlet binary")
}

/// Parse the stdout of a pipeline run as the JSON outcome array.
pub fn parse_outcomes(output: &Output) -> Vec<serde_json::Value> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|err| {
        panic!("stdout is not a JSON array: {err}\nstdout: {stdout}");
    })
}
