//! Command lines for the external tools.
//!
//! The order of the `--key=value` tokens is part of the contract with the
//! code generator and profiler, which parse them positionally in places.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::geometry::LayerGeometry;
use crate::workspace::LayerPaths;

pub const CODEGEN_BINARY: &str = "compiler";
pub const PROFILER_BINARY: &str = "profiler";
pub const DEFAULT_CXX: &str = "g++";
const CXX_FLAGS: [&str; 4] = ["-std=c++11", "-Ofast", "-Wall", "-Werror"];

/// One process to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Host C++ compiler used to build the generated simulation source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCompiler {
    pub program: String,
    /// Extra arguments placed before the fixed flags.
    pub args: Vec<String>,
}

impl Default for HostCompiler {
    fn default() -> Self {
        Self {
            program: DEFAULT_CXX.to_string(),
            args: Vec::new(),
        }
    }
}

/// Renders a float the way the tools expect: shortest round-trip form,
/// integral values keep a trailing `.0`.
fn float_arg(value: f64) -> String {
    format!("{value:?}")
}

/// Builds argument vectors for one layer.
pub struct ArgvBuilder<'a> {
    geometry: &'a LayerGeometry,
    paths: &'a LayerPaths,
}

impl<'a> ArgvBuilder<'a> {
    pub fn new(geometry: &'a LayerGeometry, paths: &'a LayerPaths) -> Self {
        Self { geometry, paths }
    }

    /// Arguments shared by the code generator and the profiler.
    pub fn common(&self) -> Vec<String> {
        let g = self.geometry;
        let p = self.paths;
        vec![
            format!("--stride={}", g.stride),
            format!("--iw={}", g.input_width),
            format!("--ih={}", g.input_height),
            format!("--ic={}", g.input_channel),
            format!("--pw={}", g.padding_width),
            format!("--ph={}", g.padding_height),
            format!("--kw={}", g.kernel_width),
            format!("--kh={}", g.kernel_height),
            format!("--oc={}", g.output_channel),
            format!("--mac-cycles={}", g.mac_cycles),
            format!("--frequency={}", float_arg(g.frequency)),
            format!("--bandwidth={}", float_arg(g.bandwidth)),
            format!("--input-mem-size={}", float_arg(g.input_mem_size)),
            format!("--weight-mem-size={}", float_arg(g.weight_mem_size)),
            format!("--output-mem-size={}", float_arg(g.output_mem_size)),
            format!("--pe-dim={}", g.pe_dim),
            format!("--pe-structure={}", g.pe_strt),
            format!("--latency-path={}", p.latency_file),
            format!("--tiling-dump={}", p.tiling_dump),
            format!("--loop-seq-dump={}", p.loop_seq_dump),
            format!("--layer={}", g.layer_name),
        ]
    }

    /// Code generator arguments.
    pub fn codegen(&self, presched: bool) -> Vec<String> {
        let mut argv = self.common();
        if presched {
            argv.push("-p".to_string());
        }
        argv.push(format!("--code-path={}", self.paths.gen_code));
        argv.push(format!("--gaia-path={}", self.paths.gaia_code));
        argv.push(format!("--timestamp-path={}", self.paths.timestamp_file));
        argv
    }

    /// Profiler arguments.
    pub fn profiler(&self, verbose: bool, debug: bool) -> Vec<String> {
        let g = self.geometry;
        let mut argv = self.common();
        argv.push(format!("--mac-energy={}", float_arg(g.mac_energy)));
        argv.push(format!("--on-chip-32-energy={}", float_arg(g.on_chip_energy)));
        argv.push(format!("--off-chip-32-energy={}", float_arg(g.off_chip_energy)));
        argv.push(format!("--report-path={}", self.paths.report_file));
        if verbose {
            argv.push("-v".to_string());
        }
        if debug {
            argv.push("-g".to_string());
        }
        argv
    }

    pub fn codegen_invocation(&self, toolpath: &Path, presched: bool) -> Invocation {
        Invocation {
            program: toolpath.join(CODEGEN_BINARY),
            args: self.codegen(presched),
        }
    }

    pub fn host_compile_invocation(&self, cxx: &HostCompiler) -> Invocation {
        let mut args = cxx.args.clone();
        args.extend(CXX_FLAGS.iter().map(|s| s.to_string()));
        args.push("-o".to_string());
        args.push(self.paths.sim_binary.clone());
        args.push(self.paths.gen_code.clone());
        Invocation {
            program: PathBuf::from(&cxx.program),
            args,
        }
    }

    pub fn execute_invocation(&self) -> Invocation {
        Invocation {
            program: self.paths.sim_program(),
            args: Vec::new(),
        }
    }

    pub fn profiler_invocation(&self, toolpath: &Path, verbose: bool, debug: bool) -> Invocation {
        Invocation {
            program: toolpath.join(PROFILER_BINARY),
            args: self.profiler(verbose, debug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::HardwareSpec;
    use crate::hardware::tests::SIMD_JSON;
    use crate::layer::{LayerModule, TensorShape};
    use crate::workspace::Workspace;

    fn conv_geometry() -> LayerGeometry {
        let hw = HardwareSpec::from_json(SIMD_JSON).unwrap();
        LayerGeometry::derive(
            "conv_1",
            TensorShape::new(1, 3, 224, 224),
            &LayerModule::conv2d(3, 64, 7, 2, 3),
            &hw,
        )
        .unwrap()
    }

    const EXPECTED_COMMON: [&str; 21] = [
        "--stride=2",
        "--iw=224",
        "--ih=224",
        "--ic=3",
        "--pw=3",
        "--ph=3",
        "--kw=7",
        "--kh=7",
        "--oc=64",
        "--mac-cycles=1",
        "--frequency=800.0",
        "--bandwidth=12.8",
        "--input-mem-size=64.0",
        "--weight-mem-size=128.0",
        "--output-mem-size=64.0",
        "--pe-dim=[[16, 16]]",
        "--pe-structure=[[3, 2], [6, 0]]",
        "--latency-path=out/conv_1.vl",
        "--tiling-dump=out/conv_1_tiling.dump",
        "--loop-seq-dump=out/conv_1_loop_seq.dump",
        "--layer=conv_1",
    ];

    #[test]
    fn test_common_prefix_order() {
        let g = conv_geometry();
        let paths = Workspace::new("out", "log").layer_paths("conv_1");
        assert_eq!(ArgvBuilder::new(&g, &paths).common(), EXPECTED_COMMON);
    }

    #[test]
    fn test_codegen_tail() {
        let g = conv_geometry();
        let paths = Workspace::new("out", "log").layer_paths("conv_1");
        let builder = ArgvBuilder::new(&g, &paths);

        let plain = builder.codegen(false);
        assert_eq!(plain[..21], EXPECTED_COMMON);
        assert_eq!(
            plain[21..],
            ["--code-path=out/conv_1.cc", "--gaia-path=out/conv_1.gaia", "--timestamp-path=out/conv_1.json"]
        );

        let presched = builder.codegen(true);
        assert_eq!(presched[21], "-p");
        assert_eq!(presched.len(), plain.len() + 1);
    }

    #[test]
    fn test_profiler_tail() {
        let g = conv_geometry();
        let paths = Workspace::new("out", "log").layer_paths("conv_1");
        let builder = ArgvBuilder::new(&g, &paths);

        let quiet = builder.profiler(false, false);
        assert_eq!(
            quiet[21..],
            [
                "--mac-energy=0.0032",
                "--on-chip-32-energy=0.006",
                "--off-chip-32-energy=0.64",
                "--report-path=out/report.csv",
            ]
        );

        let loud = builder.profiler(true, true);
        assert_eq!(loud[loud.len() - 2..], ["-v", "-g"]);
        let debug_only = builder.profiler(false, true);
        assert_eq!(debug_only.last().map(String::as_str), Some("-g"));
        assert!(!debug_only.contains(&"-v".to_string()));
    }

    #[test]
    fn test_invocations() {
        let g = conv_geometry();
        let paths = Workspace::new("out", "log").layer_paths("conv_1");
        let builder = ArgvBuilder::new(&g, &paths);

        let codegen = builder.codegen_invocation(Path::new("build"), false);
        assert_eq!(codegen.program, PathBuf::from("build/compiler"));

        let cxx = builder.host_compile_invocation(&HostCompiler::default());
        assert_eq!(cxx.to_string(), "g++ -std=c++11 -Ofast -Wall -Werror -o out/conv_1_sim out/conv_1.cc");

        let custom = HostCompiler {
            program: "clang++".to_string(),
            args: vec!["-march=native".to_string()],
        };
        let cxx = builder.host_compile_invocation(&custom);
        assert_eq!(cxx.args[0], "-march=native");
        assert_eq!(cxx.args[1], "-std=c++11");

        let run = builder.execute_invocation();
        assert_eq!(run.program, PathBuf::from("./out/conv_1_sim"));
        assert!(run.args.is_empty());

        let profiler = builder.profiler_invocation(Path::new("build"), false, false);
        assert_eq!(profiler.program, PathBuf::from("build/profiler"));
    }
}
