//! Accelerator hardware description.
//!
//! A [`HardwareSpec`] is loaded once per run from a JSON file and shared by
//! reference across every layer. It is immutable; changes go through a
//! [`HardwareSpecBuilder`], whose `build` step applies the KB to byte
//! conversion of `mem_size` exactly once.
//!
//! # JSON format
//! ```json
//! {
//!   "mac_cycles": 1,
//!   "frequency": 800,
//!   "bandwidth": 12.8,
//!   "mac_energy": 0.0032,
//!   "on_chip_energy_32": 0.006,
//!   "off_chip_energy_32": 0.64,
//!   "mem_size": [64, 128, 64],
//!   "pe_dim": [[16, 16]],
//!   "pe_structure": [["IC", "KH", "KW"], ["OC"]]
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PlannerError, Result};

/// Tensor-dimension role assigned to one axis position of the PE array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PeRole {
    #[default]
    Unknown = 0,
    KW = 1,
    KH = 2,
    IC = 3,
    OW = 4,
    OH = 5,
    OC = 6,
    IW = 7,
    IH = 8,
}

impl PeRole {
    /// Maps a configuration token to its role. Never fails: anything not
    /// recognized is `Unknown`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "KW" => PeRole::KW,
            "KH" => PeRole::KH,
            "IC" => PeRole::IC,
            "OW" => PeRole::OW,
            "OH" => PeRole::OH,
            "OC" => PeRole::OC,
            "IW" => PeRole::IW,
            "IH" => PeRole::IH,
            _ => PeRole::Unknown,
        }
    }

    /// Integer code understood by the external tools.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Physical PE array dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeDim(pub Vec<Vec<u32>>);

/// PE array axis mapping, one role per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeStructure(pub Vec<Vec<PeRole>>);

impl PeStructure {
    /// Maps every token of a raw grid.
    pub fn from_tokens<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        PeStructure(
            rows.iter()
                .map(|row| row.iter().map(|t| PeRole::from_token(t.as_ref())).collect())
                .collect(),
        )
    }

    /// Row lengths of the grid.
    pub fn grid_shape(&self) -> Vec<usize> {
        self.0.iter().map(Vec::len).collect()
    }
}

/// Writes a 2-D grid as `[[a, b], [c]]`, the form the external tools parse.
fn write_grid<T, F>(f: &mut fmt::Formatter<'_>, rows: &[Vec<T>], cell: F) -> fmt::Result
where
    F: Fn(&T) -> u32,
{
    f.write_str("[")?;
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str("[")?;
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", cell(value))?;
        }
        f.write_str("]")?;
    }
    f.write_str("]")
}

impl fmt::Display for PeDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_grid(f, &self.0, |v| *v)
    }
}

impl fmt::Display for PeStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_grid(f, &self.0, |r| u32::from(r.code()))
    }
}

#[derive(Debug, Deserialize)]
struct RawHardwareConfig {
    mac_cycles: u32,
    bandwidth: f64,
    frequency: f64,
    mac_energy: f64,
    on_chip_energy_32: f64,
    off_chip_energy_32: f64,
    mem_size: Vec<f64>,
    pe_dim: Vec<Vec<u32>>,
    pe_structure: Vec<Vec<String>>,
}

/// Description of an accelerator target.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareSpec {
    mac_cycles: u32,
    frequency: f64,
    bandwidth: f64,
    mac_energy: f64,
    on_chip_energy_32: f64,
    off_chip_energy_32: f64,
    mem_size: [f64; 3],
    pe_dim: PeDim,
    pe_strt: PeStructure,
}

impl HardwareSpec {
    /// Loads a hardware description from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Config` if the file is missing or unreadable,
    /// is not valid JSON, lacks a required key, or `mem_size` does not have
    /// exactly three entries.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlannerError::Config(format!("cannot read hardware config '{}': {e}", path.display()))
        })?;
        Self::from_json(&content).map_err(|e| match e {
            PlannerError::Config(msg) => {
                PlannerError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parses a hardware description from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawHardwareConfig = serde_json::from_str(json)
            .map_err(|e| PlannerError::Config(format!("hardware config parse error: {e}")))?;

        let mem_size: [f64; 3] = raw.mem_size.as_slice().try_into().map_err(|_| {
            PlannerError::Config(format!(
                "mem_size must have 3 entries (input, weight, output), got {}",
                raw.mem_size.len()
            ))
        })?;

        Ok(HardwareSpec {
            mac_cycles: raw.mac_cycles,
            frequency: raw.frequency,
            bandwidth: raw.bandwidth,
            mac_energy: raw.mac_energy,
            on_chip_energy_32: raw.on_chip_energy_32,
            off_chip_energy_32: raw.off_chip_energy_32,
            mem_size,
            pe_dim: PeDim(raw.pe_dim),
            pe_strt: PeStructure::from_tokens(&raw.pe_structure),
        })
    }

    /// Starts a builder seeded with these values.
    pub fn to_builder(&self) -> HardwareSpecBuilder {
        HardwareSpecBuilder::new(self.clone())
    }

    /// MAC cycles for calculating one period.
    pub fn mac_cycles(&self) -> u32 {
        self.mac_cycles
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Off-chip bandwidth.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn mac_energy(&self) -> f64 {
        self.mac_energy
    }

    /// On-chip access energy for 32-bit data.
    pub fn on_chip_energy_32(&self) -> f64 {
        self.on_chip_energy_32
    }

    /// Off-chip access energy for 32-bit data.
    pub fn off_chip_energy_32(&self) -> f64 {
        self.off_chip_energy_32
    }

    /// Input, weight and output buffer capacities.
    pub fn mem_size(&self) -> [f64; 3] {
        self.mem_size
    }

    pub fn pe_dim(&self) -> &PeDim {
        &self.pe_dim
    }

    /// How tensor dimensions are distributed over the PE array. For example
    /// PE width may stand for IC*KH*KW and PE height for OC*OH*OW.
    pub fn pe_strt(&self) -> &PeStructure {
        &self.pe_strt
    }
}

/// Explicit second phase for changing a loaded [`HardwareSpec`].
#[derive(Debug, Clone)]
pub struct HardwareSpecBuilder {
    spec: HardwareSpec,
    mem_size_kb: Option<[f64; 3]>,
    pe_tokens: Option<Vec<Vec<String>>>,
}

impl HardwareSpecBuilder {
    fn new(spec: HardwareSpec) -> Self {
        Self {
            spec,
            mem_size_kb: None,
            pe_tokens: None,
        }
    }

    pub fn mac_cycles(mut self, mac_cycles: u32) -> Self {
        self.spec.mac_cycles = mac_cycles;
        self
    }

    pub fn frequency(mut self, frequency: impl Into<f64>) -> Self {
        self.spec.frequency = frequency.into();
        self
    }

    pub fn bandwidth(mut self, bandwidth: impl Into<f64>) -> Self {
        self.spec.bandwidth = bandwidth.into();
        self
    }

    pub fn mac_energy(mut self, mac_energy: impl Into<f64>) -> Self {
        self.spec.mac_energy = mac_energy.into();
        self
    }

    pub fn on_chip_energy_32(mut self, energy: impl Into<f64>) -> Self {
        self.spec.on_chip_energy_32 = energy.into();
        self
    }

    pub fn off_chip_energy_32(mut self, energy: impl Into<f64>) -> Self {
        self.spec.off_chip_energy_32 = energy.into();
        self
    }

    /// Sets buffer capacities given in KB; `build` stores them in bytes.
    pub fn mem_size_kb<T: Into<f64>>(mut self, mem_size: [T; 3]) -> Self {
        self.mem_size_kb = Some(mem_size.map(Into::into));
        self
    }

    pub fn pe_dim(mut self, pe_dim: Vec<Vec<u32>>) -> Self {
        self.spec.pe_dim = PeDim(pe_dim);
        self
    }

    /// Replaces the PE mapping with raw tokens, mapped again on `build`.
    pub fn pe_structure<S: Into<String>>(mut self, rows: Vec<Vec<S>>) -> Self {
        self.pe_tokens = Some(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        );
        self
    }

    /// Finalizes the hardware description.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Config` if a new PE structure does not have
    /// the grid shape the spec was loaded with.
    pub fn build(self) -> Result<HardwareSpec> {
        let mut spec = self.spec;

        if let Some(kb) = self.mem_size_kb {
            spec.mem_size = kb.map(|size| size * 1024.0);
        }

        if let Some(tokens) = self.pe_tokens {
            let mapped = PeStructure::from_tokens(&tokens);
            if mapped.grid_shape() != spec.pe_strt.grid_shape() {
                return Err(PlannerError::Config(format!(
                    "pe_structure grid shape {:?} differs from loaded shape {:?}",
                    mapped.grid_shape(),
                    spec.pe_strt.grid_shape()
                )));
            }
            spec.pe_strt = mapped;
        }

        Ok(spec)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SIMD_JSON: &str = r#"{
        "mac_cycles": 1,
        "frequency": 800,
        "bandwidth": 12.8,
        "mac_energy": 0.0032,
        "on_chip_energy_32": 0.006,
        "off_chip_energy_32": 0.64,
        "mem_size": [64, 128, 64],
        "pe_dim": [[16, 16]],
        "pe_structure": [["IC", "KH"], ["OC", "XX"]]
    }"#;

    #[test]
    fn test_pe_role_codes() {
        let tokens = ["KW", "KH", "IC", "OW", "OH", "OC", "IW", "IH"];
        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(PeRole::from_token(token).code() as usize, i + 1);
        }
        assert_eq!(PeRole::from_token("kw"), PeRole::Unknown);
        assert_eq!(PeRole::from_token(""), PeRole::Unknown);
        assert_eq!(PeRole::from_token("BATCH").code(), 0);
    }

    #[test]
    fn test_from_json_keeps_mem_size_as_written() {
        let spec = HardwareSpec::from_json(SIMD_JSON).unwrap();
        assert_eq!(spec.mac_cycles(), 1);
        assert_eq!(spec.frequency(), 800.0);
        assert_eq!(spec.mem_size(), [64.0, 128.0, 64.0]);
        assert_eq!(spec.pe_dim().to_string(), "[[16, 16]]");
        assert_eq!(spec.pe_strt().to_string(), "[[3, 2], [6, 0]]");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let json = SIMD_JSON.replace("\"bandwidth\": 12.8,", "");
        let err = HardwareSpec::from_json(&json).unwrap_err();
        assert!(matches!(err, PlannerError::Config(ref m) if m.contains("bandwidth")), "{err}");
    }

    #[test]
    fn test_mem_size_needs_three_entries() {
        let json = SIMD_JSON.replace("[64, 128, 64]", "[64, 128]");
        assert!(matches!(HardwareSpec::from_json(&json), Err(PlannerError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = HardwareSpec::load("/nonexistent/hw.json").unwrap_err();
        assert!(matches!(err, PlannerError::Config(_)));
    }

    #[test]
    fn test_builder_converts_mem_size_once() {
        let spec = HardwareSpec::from_json(SIMD_JSON).unwrap();
        let spec = spec.to_builder().mem_size_kb([4, 8, 2]).build().unwrap();
        assert_eq!(spec.mem_size(), [4096.0, 8192.0, 2048.0]);

        // Rebuilding without touching mem_size leaves it alone.
        let again = spec.to_builder().frequency(1000).build().unwrap();
        assert_eq!(again.mem_size(), [4096.0, 8192.0, 2048.0]);
        assert_eq!(again.frequency(), 1000.0);
    }

    #[test]
    fn test_builder_remaps_pe_structure() {
        let spec = HardwareSpec::from_json(SIMD_JSON).unwrap();
        let spec = spec
            .to_builder()
            .pe_structure(vec![vec!["OW", "OH"], vec!["IW", "??"]])
            .build()
            .unwrap();
        assert_eq!(
            spec.pe_strt().0,
            vec![vec![PeRole::OW, PeRole::OH], vec![PeRole::IW, PeRole::Unknown]]
        );
    }

    #[test]
    fn test_builder_rejects_reshaped_pe_structure() {
        let spec = HardwareSpec::from_json(SIMD_JSON).unwrap();
        let result = spec.to_builder().pe_structure(vec![vec!["OW"]]).build();
        assert!(matches!(result, Err(PlannerError::Config(_))));
    }
}
