//! Ready-made Fuego bundles.

use crate::archive::ArchiveBuilder;
use anyhow::Result;

/// A `.ftp` test package holding `<name>/test.yaml` and a test script.
pub fn test_package(name: &str, test_yaml: &str) -> Result<Vec<u8>> {
    ArchiveBuilder::new()
        .gzip(true)
        .dir(&format!("{}/", name))
        .file(&format!("{}/test.yaml", name), test_yaml)
        .file(&format!("{}/fuego_test.sh", name), "#!/bin/sh\necho ok\n")
        .build()
}

/// A `.ftbp` binary package with `binary-package.json` one level deep.
pub fn binary_package(dir: &str, manifest_json: &str) -> Result<Vec<u8>> {
    ArchiveBuilder::new()
        .gzip(true)
        .file(&format!("{}/binary-package.json", dir), manifest_json)
        .file(&format!("{}/bin/payload", dir), "\x7fELF")
        .build()
}

/// A `.frp` run bundle: `run/run.json` plus a log file.
pub fn run_bundle(run_json: &str) -> Result<Vec<u8>> {
    ArchiveBuilder::new()
        .gzip(true)
        .dir("run/")
        .file("run/run.json", run_json)
        .file("run/testlog.txt", "test passed\n")
        .build()
}
