//! Conformance test helpers for gatesim.
//!
//! Provides a small test-workspace builder that writes `.sv` module files
//! (and ROM data files) to a temporary directory following gatesim's
//! directory-layout contract — a module `Foo` referenced from a file lives
//! at `Foo.sv` beside it — so integration tests can assemble a multi-file
//! design without each test hand-rolling a `tempfile::tempdir()` dance.

#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use gatesim_diagnostics::DiagnosticSink;
use gatesim_eval::ModuleCache;

/// A temporary directory of `.sv` module files (and optional ROM data
/// files), ready to hand to a [`ModuleCache`].
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    /// Creates a new, empty workspace.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create conformance workspace"),
        }
    }

    /// Writes a module's source text to `{name}.sv` in the workspace root.
    pub fn module(&self, name: &str, source: &str) -> &Self {
        std::fs::write(self.path().join(format!("{name}.sv")), source)
            .expect("write module source");
        self
    }

    /// Writes a ROM data file (one binary literal per line) to `{name}.txt`
    /// in the workspace root.
    pub fn rom_data(&self, name: &str, contents: &str) -> &Self {
        std::fs::write(self.path().join(format!("{name}.txt")), contents)
            .expect("write ROM data file");
        self
    }

    /// The workspace's root directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A fresh [`ModuleCache`] rooted at this workspace.
    pub fn cache(&self) -> ModuleCache {
        ModuleCache::new(vec![self.path().to_path_buf()])
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Asserts that `sink` recorded no error-severity diagnostics, printing
/// them if it did.
pub fn assert_no_errors(sink: &DiagnosticSink) {
    assert!(
        !sink.has_errors(),
        "unexpected diagnostics: {:#?}",
        sink.diagnostics()
    );
}

/// Convenience re-export so test files don't need a direct
/// `gatesim_common` dependency just for `Value::new`.
pub use gatesim_common::value::Value;

/// The workspace-relative path a module named `name` would resolve to.
pub fn module_path(workspace: &TestWorkspace, name: &str) -> PathBuf {
    workspace.path().join(format!("{name}.sv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_round_trips_a_module_file() {
        let ws = TestWorkspace::new();
        ws.module("nand_gate", "module nand_gate(input a, input b, output y); endmodule");
        assert!(module_path(&ws, "nand_gate").is_file());
    }
}
