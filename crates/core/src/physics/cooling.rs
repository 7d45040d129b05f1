//! Radiative cooling and heating of the gas
//!
//! The per-cell cooling rate comes from a [`CoolingFunction`]. The solver
//! around it adds the bookkeeping the feedback problem needs:
//! - the innermost cell is never cooled (it is dominated by injection noise)
//! - the numerically smeared contact discontinuity of a hot bubble can be
//!   masked so diffusion does not drain its energy
//! - temperatures are floored after every application
//!
//! # Scientific References
//! - Koyama, H. & Inutsuka, S. (2002). "An origin of supersonic motions in
//!   interstellar clouds", ApJ 564, L97
//! - Audit, E. & Hennebelle, P. (2005). "Thermal condensation in a turbulent
//!   atomic hydrogen flow", A&A 433, 1

use crate::core_types::units::BOLTZMANN;
use crate::grid::HydroGrid;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Gas hotter than this is treated as shocked wind or supernova material
const HOT_GAS_TEMPERATURE: f64 = 1e6;

/// The edge search stops once the gas is cooler than this
const WARM_GAS_TEMPERATURE: f64 = 1e4;

/// Per-cell cooling rate model
pub trait CoolingFunction: Debug + Send + Sync {
    /// Temperature change in K over `dt`
    ///
    /// # Arguments
    ///
    /// * `nh` - Hydrogen number density (cm^-3)
    /// * `temperature` - Current temperature (K)
    /// * `zsolar` - Metallicity in solar units
    /// * `dt` - Interval (s)
    /// * `gamma` - Adiabatic index
    fn temperature_change(
        &self,
        nh: f64,
        temperature: f64,
        zsolar: f64,
        dt: f64,
        gamma: f64,
    ) -> f64;
}

/// Koyama & Inutsuka (2002) fit to the thermal balance of the atomic ISM
///
/// Heating: Γ = 2e-26 erg/s per H
/// Cooling: Λ/Γ = 1e7 exp(-118400 / (T + 1000)) + 1.4e-2 Z sqrt(T) exp(-92 / T)
///
/// The fit is calibrated below ~2e4 K. Hot bubbles are normally kept out of
/// its reach with [`ContactMask`] or by supplying a different function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticIsmCooling {
    /// Photoelectric heating rate per hydrogen atom (erg/s)
    pub heating: f64,
    /// Largest fractional temperature change in one sub-cycle
    pub max_fractional_change: f64,
    /// Upper bound on sub-cycles per call
    pub max_subcycles: usize,
}

impl Default for AnalyticIsmCooling {
    fn default() -> Self {
        Self {
            heating: 2e-26,
            max_fractional_change: 0.1,
            max_subcycles: 1000,
        }
    }
}

impl AnalyticIsmCooling {
    /// Cooling function Λ(T) in erg cm^3/s
    pub fn cooling_rate(&self, temperature: f64, zsolar: f64) -> f64 {
        let t = temperature.max(1.0);
        let lyman_alpha = 1e7 * (-1.184e5 / (t + 1000.0)).exp();
        let metal_lines = zsolar * 1.4e-2 * t.sqrt() * (-92.0 / t).exp();
        self.heating * (lyman_alpha + metal_lines)
    }

    /// dT/dt in K/s
    fn heating_rate(&self, nh: f64, temperature: f64, zsolar: f64, gamma: f64) -> f64 {
        (gamma - 1.0) / BOLTZMANN * (self.heating - nh * self.cooling_rate(temperature, zsolar))
    }
}

impl CoolingFunction for AnalyticIsmCooling {
    fn temperature_change(
        &self,
        nh: f64,
        temperature: f64,
        zsolar: f64,
        dt: f64,
        gamma: f64,
    ) -> f64 {
        if nh <= 0.0 || dt <= 0.0 {
            return 0.0;
        }

        let mut t = temperature.max(1.0);
        let mut elapsed = 0.0;
        for _ in 0..self.max_subcycles {
            let rate = self.heating_rate(nh, t, zsolar, gamma);
            if rate == 0.0 || !rate.is_finite() {
                break;
            }
            let remaining = dt - elapsed;
            let step = (self.max_fractional_change * t / rate.abs()).min(remaining);
            t = (t + rate * step).max(1.0);
            elapsed += step;
            if elapsed >= dt {
                break;
            }
        }
        t - temperature
    }
}

/// Heuristic used to protect a smeared contact discontinuity from cooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContactMask {
    /// No masking
    #[default]
    None,
    /// Zero the correction in a five-cell window around the outermost hot cell
    FixedWindow,
    /// Walk out from the outermost hot cell until the temperature profile
    /// flattens on both sides, then give the whole region the inner edge's
    /// correction
    EdgeSearch,
}

impl ContactMask {
    /// Apply the mask to a temperature correction in place
    pub fn apply(self, temperature: &[f64], dt: &mut [f64]) {
        let n = temperature.len().min(dt.len());
        let Some(edge) = temperature[..n]
            .iter()
            .rposition(|&t| t >= HOT_GAS_TEMPERATURE)
        else {
            return;
        };

        match self {
            ContactMask::None => {}
            ContactMask::FixedWindow => {
                let start = edge.saturating_sub(2);
                let end = (edge + 3).min(n);
                dt[start..end].fill(0.0);
            }
            ContactMask::EdgeSearch => {
                let mut outer = edge;
                while outer + 1 < n
                    && temperature[outer] - temperature[outer + 1] > 1.0
                    && temperature[outer] > WARM_GAS_TEMPERATURE
                {
                    outer += 1;
                }
                let mut inner = edge;
                while inner >= 1 && temperature[inner - 1] - temperature[inner] > 1.0 {
                    inner -= 1;
                }
                let inner = inner.saturating_sub(1);
                let value = dt[inner];
                dt[inner..=outer].fill(value);
            }
        }
    }
}

/// Applies a cooling function to the grid
#[derive(Debug)]
pub struct CoolingSolver {
    function: Box<dyn CoolingFunction>,
    mask: ContactMask,
    temperature_floor: f64,
}

impl CoolingSolver {
    /// # Arguments
    ///
    /// * `function` - Per-cell cooling model
    /// * `mask` - Contact discontinuity heuristic
    /// * `temperature_floor` - Minimum temperature in K
    pub fn new(
        function: Box<dyn CoolingFunction>,
        mask: ContactMask,
        temperature_floor: f64,
    ) -> Self {
        Self {
            function,
            mask,
            temperature_floor,
        }
    }

    pub fn mask(&self) -> ContactMask {
        self.mask
    }

    pub fn temperature_floor(&self) -> f64 {
        self.temperature_floor
    }

    pub fn set_mask(&mut self, mask: ContactMask) {
        self.mask = mask;
    }

    pub fn set_temperature_floor(&mut self, floor: f64) {
        self.temperature_floor = floor;
    }

    /// Swap the per-cell cooling model
    pub fn set_function(&mut self, function: Box<dyn CoolingFunction>) {
        self.function = function;
    }

    /// Temperature change for every cell over `dt` seconds
    ///
    /// The innermost cell is always left unchanged, then the contact mask
    /// is applied.
    pub fn temperature_change(&self, grid: &HydroGrid, dt: f64) -> Vec<f64> {
        let n = grid.ncells();
        let gamma = grid.gamma();
        let temperature: Vec<f64> = (0..n).map(|i| grid.temperature(i)).collect();
        let inputs: Vec<(f64, f64, f64)> = (0..n)
            .map(|i| (grid.nh(i), temperature[i], grid.zsolar()[i]))
            .collect();

        let mut change: Vec<f64> = inputs
            .par_iter()
            .map(|&(nh, t, z)| self.function.temperature_change(nh, t, z, dt, gamma))
            .collect();

        if let Some(first) = change.first_mut() {
            *first = 0.0;
        }
        self.mask.apply(&temperature, &mut change);
        change
    }

    /// Cool the grid by one interval and floor the result
    pub fn solve_cooling(&self, grid: &mut HydroGrid, dt: f64) {
        let change = self.temperature_change(grid, dt);
        for (i, dtemp) in change.into_iter().enumerate() {
            let t = grid.temperature(i);
            grid.set_temperature(i, t + dtemp);
        }
        self.check_temperature(grid);
    }

    /// Clamp every cell to the temperature floor
    pub fn check_temperature(&self, grid: &mut HydroGrid) {
        for i in 0..grid.ncells() {
            let t = grid.temperature(i);
            if t.is_nan() || t < self.temperature_floor {
                grid.set_temperature(i, self.temperature_floor);
            }
        }
    }
}
