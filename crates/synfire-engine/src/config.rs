// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration types, validation, and TOML loading

use std::path::Path;

use serde::{Deserialize, Serialize};
use synfire_types::{CoreError, Result};

use crate::groups::BinningPolicy;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub runtime: RuntimeConfig,
    pub simulation: SimulationConfig,
}

/// Worker pool and seeding
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads; 0 = auto-detect
    pub threads: usize,
    /// Base RNG seed for stochastic schedules
    pub seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            seed: 0,
        }
    }
}

/// Epoch loop parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub t_final: f64,
    /// Integration step; also an upper bound on the epoch length
    pub dt: f64,
    /// Epoch ceiling used when the network has no connections at all
    pub min_delay_ceiling: f64,
    pub binning: BinningKind,
    /// Quantisation interval for `binning = "regular"`
    pub bin_interval: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            t_final: 100.0,
            dt: 0.025,
            min_delay_ceiling: 1.0,
            binning: BinningKind::None,
            bin_interval: 0.0,
        }
    }
}

/// Event-time quantisation kind, as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BinningKind {
    #[default]
    None,
    Regular,
    Following,
}

impl SimulationConfig {
    /// The group-facing policy for this configuration.
    pub fn binning_policy(&self) -> BinningPolicy {
        match self.binning {
            BinningKind::None => BinningPolicy::None,
            BinningKind::Regular => BinningPolicy::Regular(self.bin_interval),
            BinningKind::Following => BinningPolicy::Following,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<EngineConfig> {
        let config: EngineConfig = toml::from_str(raw)
            .map_err(|e| CoreError::Config(format!("failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse, and validate a TOML file.
    pub fn from_path(path: &Path) -> Result<EngineConfig> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if !(sim.dt.is_finite() && sim.dt > 0.0) {
            return Err(CoreError::Config(format!(
                "simulation.dt must be finite and > 0, got {}",
                sim.dt
            )));
        }
        if !(sim.t_final.is_finite() && sim.t_final >= 0.0) {
            return Err(CoreError::Config(format!(
                "simulation.t_final must be finite and >= 0, got {}",
                sim.t_final
            )));
        }
        if !(sim.min_delay_ceiling.is_finite() && sim.min_delay_ceiling > 0.0) {
            return Err(CoreError::Config(format!(
                "simulation.min_delay_ceiling must be finite and > 0, got {}",
                sim.min_delay_ceiling
            )));
        }
        if sim.binning == BinningKind::Regular
            && !(sim.bin_interval.is_finite() && sim.bin_interval > 0.0)
        {
            return Err(CoreError::Config(format!(
                "simulation.bin_interval must be finite and > 0 with regular binning, got {}",
                sim.bin_interval
            )));
        }
        Ok(())
    }
}
