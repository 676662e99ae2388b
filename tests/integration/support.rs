//! Compiles the small C fixtures under `tests/assets/` into debuggable,
//! non-PIE executables with stable frame pointers, so source positions
//! and backtraces reproduce across runs.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;

fn target_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("target/test-fixtures")
}

/// Compiles `tests/assets/{name}.c` into `target/test-fixtures/{name}` the
/// first time it's requested, then returns the cached path. Panics on a
/// compiler failure; these fixtures are small enough that failure only
/// means `cc` is missing from the test environment.
pub fn fixture(name: &str) -> PathBuf {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        std::fs::create_dir_all(target_dir()).expect("create fixture output dir");
    });

    let src = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/assets")
        .join(format!("{name}.c"));
    let out = target_dir().join(name);

    if !out.exists() {
        let status = Command::new("cc")
            .args([
                "-g",
                "-O0",
                "-no-pie",
                "-fno-omit-frame-pointer",
                "-o",
            ])
            .arg(&out)
            .arg(&src)
            .status()
            .expect("invoke cc to build test fixture");
        assert!(status.success(), "failed to compile fixture {name}");
    }

    out
}
