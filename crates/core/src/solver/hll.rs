//! HLL (Harten-Lax-van Leer) approximate Riemann solver for the 1D Euler equations.
//!
//! The HLL solver uses a two-wave approximation to the Riemann problem.
//! It smears contact discontinuities but is robust for the strong shocks
//! that winds and supernovae drive, and keeps density and pressure positive
//! under the usual CFL restriction.
//!
//! F* = (s_r * F_l - s_l * F_r + s_l * s_r * (q_r - q_l)) / (s_r - s_l)
//!
//! Reference: Toro, "Riemann Solvers and Numerical Methods for Fluid Dynamics"

/// Conserved state: mass, momentum and total energy density
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerState {
    pub rho: f64,
    pub mom: f64,
    pub energy: f64,
}

impl EulerState {
    pub const fn new(rho: f64, mom: f64, energy: f64) -> Self {
        Self { rho, mom, energy }
    }

    /// Build conserved variables from primitives
    pub fn from_primitive(rho: f64, vel: f64, pressure: f64, gamma: f64) -> Self {
        Self {
            rho,
            mom: rho * vel,
            energy: pressure / (gamma - 1.0) + 0.5 * rho * vel * vel,
        }
    }
}

/// Primitive state used to build fluxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub rho: f64,
    pub vel: f64,
    pub pressure: f64,
}

impl Primitive {
    #[inline]
    fn sound_speed(&self, gamma: f64) -> f64 {
        if self.rho > 0.0 {
            (gamma * self.pressure.max(0.0) / self.rho).sqrt()
        } else {
            0.0
        }
    }

    #[inline]
    fn physical_flux(&self, q: &EulerState) -> EulerState {
        EulerState::new(
            q.mom,
            q.mom * self.vel + self.pressure,
            (q.energy + self.pressure) * self.vel,
        )
    }
}

/// HLL numerical flux between a left and right cell.
///
/// Uses Davis wave speed estimates bounded by the Roe-averaged
/// characteristics (Einfeldt).
///
/// # Arguments
/// * `left` - Primitive state left of the face
/// * `right` - Primitive state right of the face
/// * `gamma` - Adiabatic index
///
/// # Returns
/// Numerical flux through the face (per unit area)
pub fn hll_flux_euler(left: &Primitive, right: &Primitive, gamma: f64) -> EulerState {
    let q_l = EulerState::from_primitive(left.rho, left.vel, left.pressure, gamma);
    let q_r = EulerState::from_primitive(right.rho, right.vel, right.pressure, gamma);

    let (s_l, s_r) = wave_speeds(left, right, gamma);

    let f_l = left.physical_flux(&q_l);
    let f_r = right.physical_flux(&q_r);

    if s_l >= 0.0 {
        f_l
    } else if s_r <= 0.0 {
        f_r
    } else {
        let inv_ds = 1.0 / (s_r - s_l);
        let blend = |fl: f64, fr: f64, ql: f64, qr: f64| {
            inv_ds * (s_r * fl - s_l * fr + s_l * s_r * (qr - ql))
        };
        EulerState::new(
            blend(f_l.rho, f_r.rho, q_l.rho, q_r.rho),
            blend(f_l.mom, f_r.mom, q_l.mom, q_r.mom),
            blend(f_l.energy, f_r.energy, q_l.energy, q_r.energy),
        )
    }
}

/// Fastest signal speed either side of a face, used for the CFL bound.
pub fn max_signal_speed(state: &Primitive, gamma: f64) -> f64 {
    state.vel.abs() + state.sound_speed(gamma)
}

/// Einfeldt wave speed estimates.
fn wave_speeds(left: &Primitive, right: &Primitive, gamma: f64) -> (f64, f64) {
    let c_l = left.sound_speed(gamma);
    let c_r = right.sound_speed(gamma);

    let sqrt_l = left.rho.max(0.0).sqrt();
    let sqrt_r = right.rho.max(0.0).sqrt();

    let (u_roe, c_roe) = if sqrt_l + sqrt_r > 0.0 {
        let w = 1.0 / (sqrt_l + sqrt_r);
        let u_roe = (sqrt_l * left.vel + sqrt_r * right.vel) * w;
        // Roe-averaged sound speed via the Einfeldt eta term
        let eta = 0.5 * sqrt_l * sqrt_r * w * w;
        let d2 = (sqrt_l * c_l * c_l + sqrt_r * c_r * c_r) * w
            + eta * (right.vel - left.vel).powi(2);
        (u_roe, d2.max(0.0).sqrt())
    } else {
        (0.0, 0.0)
    };

    let s_l = (left.vel - c_l).min(u_roe - c_roe);
    let s_r = (right.vel + c_r).max(u_roe + c_roe);
    (s_l, s_r)
}
