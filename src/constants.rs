/*
    Galmass, galaxy mass and rotation curve modeling
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use serde_derive::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Newtonian constant of gravitation, in m^3 kg^-1 s^-2
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67428e-11;

/// One parsec, in meters
pub const PARSEC: f64 = 3.08568025e16;

/// One solar mass, in kilograms
pub const SOLAR_MASS: f64 = 1.9891e30;

/// Meters per kilometer, used to express velocities in km/s
const M_PER_KM: f64 = 1.0e3;

/// Parsecs per megaparsec, used to express the Hubble constant in km/s/Mpc
const PC_PER_MPC: f64 = 1.0e6;

/// Default Hubble constant in km/s/Mpc, used when an NFW halo parameterized by M200 omits it
pub const DEFAULT_HUBBLE: f64 = 73.0;

/// Physical constants used by every profile evaluator.
///
/// All profiles work in model units: lengths in parsec, masses in solar masses,
/// velocities in km/s. These SI values are only used to derive the constants in those units,
/// and they are never mutated during a run: build them once and pass them by reference.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    /// Gravitational constant, in m^3 kg^-1 s^-2
    #[serde(default = "default_g")]
    pub g: f64,
    /// Length unit (one parsec), in meters
    #[serde(default = "default_parsec")]
    pub parsec: f64,
    /// Mass unit (one solar mass), in kilograms
    #[serde(default = "default_solar_mass")]
    pub solar_mass: f64,
}

fn default_g() -> f64 {
    GRAVITATIONAL_CONSTANT
}

fn default_parsec() -> f64 {
    PARSEC
}

fn default_solar_mass() -> f64 {
    SOLAR_MASS
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            g: GRAVITATIONAL_CONSTANT,
            parsec: PARSEC,
            solar_mass: SOLAR_MASS,
        }
    }
}

impl Constants {
    /// Gravitational constant in pc (km/s)^2 / Msun, so that `G M / R` with M in Msun and R in pc is in (km/s)^2.
    pub fn g_model(&self) -> f64 {
        self.g * self.solar_mass / (self.parsec * M_PER_KM * M_PER_KM)
    }

    /// Hubble constant given in km/s/Mpc, converted to 1/s.
    pub fn hubble_per_second(&self, h: f64) -> f64 {
        h * M_PER_KM / (PC_PER_MPC * self.parsec)
    }

    /// Critical density of the Universe, 3 H^2 / (8 pi G), in Msun / pc^3.
    pub fn critical_density(&self, h: f64) -> f64 {
        let hubble = self.hubble_per_second(h);
        // kg / m^3
        let rho_si = 3.0 * hubble.powi(2) / (8.0 * PI * self.g);
        rho_si * self.parsec.powi(3) / self.solar_mass
    }

    /// Circular velocity squared, in (km/s)^2, of a test particle at `radius` (pc) enclosing `mass` (Msun).
    ///
    /// The center is special-cased to zero instead of computing a limit.
    pub fn v_squared(&self, mass: f64, radius: f64) -> f64 {
        if radius == 0.0 {
            0.0
        } else {
            self.g_model() * mass / radius
        }
    }
}

impl fmt::Display for Constants {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "G = {:e} m^3/kg/s^2, pc = {:e} m, Msun = {:e} kg (G = {:.6e} pc (km/s)^2/Msun)",
            self.g,
            self.parsec,
            self.solar_mass,
            self.g_model()
        )
    }
}

#[cfg(test)]
mod ut_constants {
    use super::*;

    #[test]
    fn g_in_model_units() {
        // The textbook value is 4.3009e-3 pc (km/s)^2 / Msun
        let g = Constants::default().g_model();
        assert!((g - 4.3009e-3).abs() / 4.3009e-3 < 1e-3, "got {g}");
    }

    #[test]
    fn critical_density_h70() {
        // About 1.36e-7 Msun / pc^3 for h = 70 km/s/Mpc
        let rho = Constants::default().critical_density(70.0);
        assert!((rho - 1.36e-7).abs() / 1.36e-7 < 1e-2, "got {rho}");
    }

    #[test]
    fn center_is_zero() {
        assert_eq!(Constants::default().v_squared(1e10, 0.0), 0.0);
    }
}
