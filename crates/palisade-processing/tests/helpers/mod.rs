//! Test helpers: build an `UploadGate` over a temporary storage root.
//!
//! Run from workspace root: `cargo test -p palisade-processing --test pipeline_test`.

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use palisade_core::GateConfig;
use palisade_processing::{ContentSniffer, InferSniffer, UploadGate};
use palisade_storage::{LocalStorage, Storage};
use tempfile::TempDir;

pub struct TestGate {
    pub gate: UploadGate,
    pub root: PathBuf,
    /// Parent of `root`; lets tests check nothing escaped the storage root.
    pub outer: PathBuf,
    _dir: TempDir,
}

pub async fn setup_test_gate() -> TestGate {
    setup_test_gate_with(|config| config, Arc::new(InferSniffer)).await
}

pub async fn setup_test_gate_with<F>(configure: F, sniffer: Arc<dyn ContentSniffer>) -> TestGate
where
    F: FnOnce(GateConfig) -> GateConfig,
{
    let dir = tempfile::tempdir().unwrap();
    let outer = dir.path().to_path_buf();
    let root = outer.join("uploads");

    let config = configure(GateConfig::new(&root));
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(&root).await.unwrap());

    TestGate {
        gate: UploadGate::new(config, storage, sniffer),
        root,
        outer,
        _dir: dir,
    }
}

/// Sorted names of the entries directly under `dir`.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
