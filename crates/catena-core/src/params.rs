//! Simulation configuration: the full coefficient set and the governing
//! model variant. Parameters are immutable for the whole run; the rain
//! intensity actually applied each step is computed by the orchestrator
//! (base intensity plus ponded-depth feedback) and passed into the step.

use crate::error::EvolutionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The governing erosion model, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelVariant {
    /// Stochastic process-based erosion-deposition (walker hydrology +
    /// sediment transport).
    Simwe,
    /// Unit Stream Power Erosion/Deposition: transport-capacity divergence.
    Usped,
    /// Revised Universal Soil Loss Equation: detachment-limited flux.
    Rusle,
}

impl FromStr for ModelVariant {
    type Err = EvolutionError;

    /// Accepts both the bare name and the legacy `*_mode` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simwe" | "simwe_mode" => Ok(ModelVariant::Simwe),
            "usped" | "usped_mode" => Ok(ModelVariant::Usped),
            "rusle" | "rusle_mode" => Ok(ModelVariant::Rusle),
            other => Err(EvolutionError::Configuration(format!(
                "unknown mode `{other}` (expected simwe_mode, usped_mode, or rusle_mode)"
            ))),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelVariant::Simwe => write!(f, "simwe"),
            ModelVariant::Usped => write!(f, "usped"),
            ModelVariant::Rusle => write!(f, "rusle"),
        }
    }
}

/// Immutable configuration for one evolution run.
///
/// Defaults are calibrated to a moderate silt-loam storm scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Event-mode base rain intensity (mm/hr).
    pub rain_intensity: f64,
    /// Total rainfall duration (minutes).
    pub rain_duration: f64,
    /// Step interval (minutes).
    pub rain_interval: f64,
    /// Walker count for the stochastic hydrologic solver.
    pub walkers: usize,
    /// Worker-pool size passed through to the stochastic solver.
    pub threads: usize,
    /// Runoff coefficient (fraction of rainfall becoming overland flow).
    pub runoff: f64,
    /// Manning's roughness coefficient.
    pub mannings: f64,
    /// Detachment coefficient (s/m).
    pub detachment: f64,
    /// Transport coefficient (s/m).
    pub transport: f64,
    /// Critical shear stress (Pa).
    pub shear_stress: f64,
    /// Sediment mass density (g/cm³).
    pub density: f64,
    /// Soil mass per area (kg/m²), RUSLE flux-to-elevation conversion.
    pub mass: f64,
    /// Gravitational diffusion coefficient (m²/s).
    pub grav_diffusion: f64,
    /// Lower clip bound for erosion-deposition (kg·m⁻²·s⁻¹).
    pub erdepmin: f64,
    /// Upper clip bound for erosion-deposition (kg·m⁻²·s⁻¹).
    pub erdepmax: f64,
    /// Upper clip bound for the RUSLE sediment flux (kg·m⁻¹·s⁻¹).
    pub fluxmax: f64,
    /// Soil erodibility factor K.
    pub k_factor: f64,
    /// Land cover factor C.
    pub c_factor: f64,
    /// Water-flow exponent m.
    pub m: f64,
    /// Slope exponent n.
    pub n: f64,
    /// Fill depressions after each step (SIMWE only).
    pub fill_sinks: bool,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            rain_intensity: 50.0,
            rain_duration: 60.0,
            rain_interval: 10.0,
            walkers: 10_000,
            threads: 1,
            runoff: 0.35,
            mannings: 0.1,
            detachment: 0.01,
            transport: 0.01,
            shear_stress: 0.0,
            density: 1.4,
            mass: 116.0,
            grav_diffusion: 0.2,
            erdepmin: -0.5,
            erdepmax: 0.5,
            fluxmax: 0.25,
            k_factor: 0.25,
            c_factor: 0.1,
            m: 1.5,
            n: 1.2,
            fill_sinks: false,
        }
    }
}

impl SimulationParameters {
    /// Step interval in seconds.
    pub fn interval_seconds(&self) -> f64 {
        self.rain_interval * 60.0
    }

    /// Eager validation, run before the loop starts. Every rejected value
    /// names the offending coefficient.
    pub fn validate(&self) -> Result<(), EvolutionError> {
        let bad = |name: &str, got: f64, want: &str| {
            Err(EvolutionError::Configuration(format!(
                "coefficient `{name}` = {got} out of range ({want})"
            )))
        };

        if !(self.rain_interval > 0.0) {
            return bad("rain_interval", self.rain_interval, "> 0");
        }
        if !(self.rain_duration > 0.0) {
            return bad("rain_duration", self.rain_duration, "> 0");
        }
        if !(self.rain_intensity >= 0.0) {
            return bad("rain_intensity", self.rain_intensity, ">= 0");
        }
        if self.walkers == 0 {
            return bad("walkers", 0.0, ">= 1");
        }
        if self.threads == 0 {
            return bad("threads", 0.0, ">= 1");
        }
        if !(self.runoff > 0.0 && self.runoff <= 1.0) {
            return bad("runoff", self.runoff, "in (0, 1]");
        }
        if !(self.mannings > 0.0) {
            return bad("mannings", self.mannings, "> 0");
        }
        if !(self.detachment >= 0.0) {
            return bad("detachment", self.detachment, ">= 0");
        }
        if !(self.transport >= 0.0) {
            return bad("transport", self.transport, ">= 0");
        }
        if !(self.shear_stress >= 0.0) {
            return bad("shearstress", self.shear_stress, ">= 0");
        }
        if !(self.density > 0.0) {
            return bad("density", self.density, "> 0");
        }
        if !(self.mass > 0.0) {
            return bad("mass", self.mass, "> 0");
        }
        if !(self.grav_diffusion >= 0.0) {
            return bad("grav_diffusion", self.grav_diffusion, ">= 0");
        }
        if !(self.erdepmin < self.erdepmax) {
            return Err(EvolutionError::Configuration(format!(
                "erdepmin ({}) must be below erdepmax ({})",
                self.erdepmin, self.erdepmax
            )));
        }
        if !(self.fluxmax > 0.0) {
            return bad("fluxmax", self.fluxmax, "> 0");
        }
        if !(self.k_factor >= 0.0) {
            return bad("k_factor", self.k_factor, ">= 0");
        }
        if !(self.c_factor >= 0.0) {
            return bad("c_factor", self.c_factor, ">= 0");
        }
        if !(self.m >= 0.0) {
            return bad("m", self.m, ">= 0");
        }
        if !(self.n >= 0.0) {
            return bad("n", self.n, ">= 0");
        }
        Ok(())
    }
}
