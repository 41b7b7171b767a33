//! File naming for per-layer artifacts.
//!
//! Every path is a pure function of `(output_dir, layer_name)`. No collision
//! detection is done: layer names must be unique within a run.

use std::fs;
use std::path::PathBuf;

use crate::error::Result;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LOG_DIR: &str = "log";
pub const REPORT_FILE_NAME: &str = "report.csv";

/// Output and log directories for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    output_dir: String,
    log_dir: String,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR, DEFAULT_LOG_DIR)
    }
}

impl Workspace {
    pub fn new(output_dir: impl Into<String>, log_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            log_dir: log_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn log_dir(&self) -> &str {
        &self.log_dir
    }

    /// Creates the output and log directories if they do not exist yet.
    /// Existing directories and their contents are left untouched.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.log_dir] {
            if !fs::metadata(dir).is_ok_and(|m| m.is_dir()) {
                tracing::info!("make directory: {dir}/");
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Report file every layer's profiler appends to.
    pub fn report_file(&self) -> String {
        format!("{}/{}", self.output_dir, REPORT_FILE_NAME)
    }

    /// Artifact paths for `layer_name`.
    pub fn layer_paths(&self, layer_name: &str) -> LayerPaths {
        let base = format!("{}/{}", self.output_dir, layer_name);
        LayerPaths {
            gen_code: format!("{base}.cc"),
            gaia_code: format!("{base}.gaia"),
            sim_binary: format!("{base}_sim"),
            latency_file: format!("{base}.vl"),
            timestamp_file: format!("{base}.json"),
            tiling_dump: format!("{base}_tiling.dump"),
            loop_seq_dump: format!("{base}_loop_seq.dump"),
            report_file: self.report_file(),
        }
    }
}

/// Files exchanged with the external tools for a single layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPaths {
    /// Generated simulation source.
    pub gen_code: String,
    /// Intermediate representation.
    pub gaia_code: String,
    pub sim_binary: String,
    pub latency_file: String,
    pub timestamp_file: String,
    pub tiling_dump: String,
    pub loop_seq_dump: String,
    /// Cumulative report shared by every layer, appended to by the profiler.
    pub report_file: String,
}

impl LayerPaths {
    /// Program path for running the simulation binary from the current
    /// directory.
    pub fn sim_program(&self) -> PathBuf {
        let path = PathBuf::from(&self.sim_binary);
        if path.is_absolute() || self.sim_binary.starts_with("./") {
            path
        } else {
            PathBuf::from(format!("./{}", self.sim_binary))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_paths() {
        let ws = Workspace::new("out", "log");
        let p = ws.layer_paths("conv_1");
        assert_eq!(p.gen_code, "out/conv_1.cc");
        assert_eq!(p.gaia_code, "out/conv_1.gaia");
        assert_eq!(p.sim_binary, "out/conv_1_sim");
        assert_eq!(p.latency_file, "out/conv_1.vl");
        assert_eq!(p.timestamp_file, "out/conv_1.json");
        assert_eq!(p.tiling_dump, "out/conv_1_tiling.dump");
        assert_eq!(p.loop_seq_dump, "out/conv_1_loop_seq.dump");
        assert_eq!(p.report_file, "out/report.csv");
        assert_eq!(p.sim_program(), PathBuf::from("./out/conv_1_sim"));
    }

    #[test]
    fn test_report_file_is_shared() {
        let ws = Workspace::default();
        assert_eq!(ws.layer_paths("a").report_file, ws.layer_paths("b").report_file);
        assert_eq!(ws.report_file(), "output/report.csv");
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("output");
        let log = tmp.path().join("log");
        let ws = Workspace::new(out.to_string_lossy(), log.to_string_lossy());

        ws.prepare().unwrap();
        let marker = out.join("report.csv");
        fs::write(&marker, "layer,latency\n").unwrap();
        ws.prepare().unwrap();

        assert!(log.is_dir());
        assert_eq!(fs::read_to_string(marker).unwrap(), "layer,latency\n");
    }
}
