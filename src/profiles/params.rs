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
use snafu::ensure;
use statrs::function::gamma::ln_gamma;
use std::f64::consts::PI;

use super::sersic::{bn, BnNormalization};
use crate::constants::{Constants, DEFAULT_HUBBLE};
use crate::errors::{AritySnafu, DomainError, NegativeSnafu, NonFiniteSnafu, NonPositiveSnafu};

/// Default mass-to-light ratio when a disk or a Sersic profile omits it
pub const DEFAULT_MASS_TO_LIGHT: f64 = 1.0;

fn arity(profile: &'static str, params: &[f64], min: usize, max: usize) -> Result<(), DomainError> {
    let got = params.len();
    ensure!(
        (min..=max).contains(&got),
        AritySnafu {
            profile,
            min,
            max,
            got
        }
    );
    Ok(())
}

fn finite(profile: &'static str, name: &'static str, value: f64) -> Result<f64, DomainError> {
    ensure!(
        value.is_finite(),
        NonFiniteSnafu {
            profile,
            name,
            value
        }
    );
    Ok(value)
}

fn non_negative(profile: &'static str, name: &'static str, value: f64) -> Result<f64, DomainError> {
    let value = finite(profile, name, value)?;
    ensure!(
        value >= 0.0,
        NegativeSnafu {
            profile,
            name,
            value
        }
    );
    Ok(value)
}

fn positive(profile: &'static str, name: &'static str, value: f64) -> Result<f64, DomainError> {
    let value = finite(profile, name, value)?;
    ensure!(
        value > 0.0,
        NonPositiveSnafu {
            profile,
            name,
            value
        }
    );
    Ok(value)
}

/// Exponential disk (Freeman 1970): `[central surface density (Msun/pc^2), scale length (pc), M/L?]`
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiskParams {
    pub central_density: f64,
    pub scale_length: f64,
    #[serde(default = "default_mass_to_light")]
    pub mass_to_light: f64,
}

fn default_mass_to_light() -> f64 {
    DEFAULT_MASS_TO_LIGHT
}

impl DiskParams {
    pub fn from_slice(params: &[f64]) -> Result<Self, DomainError> {
        const PROFILE: &str = "disk";
        arity(PROFILE, params, 2, 3)?;
        Ok(Self {
            central_density: non_negative(PROFILE, "central density", params[0])?,
            scale_length: positive(PROFILE, "scale length", params[1])?,
            mass_to_light: match params.get(2) {
                Some(ml) => non_negative(PROFILE, "M/L", *ml)?,
                None => DEFAULT_MASS_TO_LIGHT,
            },
        })
    }

    /// Total mass of the disk, 2 pi Sigma0 Rd^2 M/L (Freeman 1970, eq. 11)
    pub fn total_mass(&self) -> f64 {
        2.0 * PI * self.central_density * self.scale_length.powi(2) * self.mass_to_light
    }

    /// Mass enclosed within `radius` (Binney & Tremaine 2008, eq. 2.166)
    pub fn enclosed_mass(&self, radius: f64) -> f64 {
        let x = radius / self.scale_length;
        self.total_mass() * (1.0 - (-x).exp() * (1.0 + x))
    }
}

/// Sersic law: `[central intensity I0 (Msun/pc^2), effective radius Re (pc), index n, M/L?]`
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SersicParams {
    pub central_intensity: f64,
    pub effective_radius: f64,
    pub index: f64,
    #[serde(default = "default_mass_to_light")]
    pub mass_to_light: f64,
}

impl SersicParams {
    pub fn from_slice(profile: &'static str, params: &[f64]) -> Result<Self, DomainError> {
        arity(profile, params, 3, 4)?;
        Ok(Self {
            central_intensity: non_negative(profile, "central intensity", params[0])?,
            effective_radius: positive(profile, "effective radius", params[1])?,
            index: positive(profile, "Sersic index", params[2])?,
            mass_to_light: match params.get(3) {
                Some(ml) => non_negative(profile, "M/L", *ml)?,
                None => DEFAULT_MASS_TO_LIGHT,
            },
        })
    }

    /// The b_n coefficient of this profile for the requested normalization.
    pub fn bn(&self, normalization: BnNormalization) -> Result<f64, DomainError> {
        bn(self.index, normalization)
    }

    /// Surface density `I0 exp(-b_n (R/Re)^(1/n))` at `radius`, in Msun/pc^2 (without M/L).
    pub fn surface_density(&self, radius: f64, bn: f64) -> f64 {
        self.central_intensity * (-bn * (radius / self.effective_radius).powf(1.0 / self.index)).exp()
    }

    /// Total mass, `pi I0 Re^2 (2n / b_n^2n) Gamma(2n) M/L` (Simonneau & Prada 2004, eq. 3)
    pub fn total_mass(&self, normalization: BnNormalization) -> Result<f64, DomainError> {
        let bn = self.bn(normalization)?;
        let n2 = 2.0 * self.index;
        let ln_factor = n2.ln() - n2 * bn.ln() + ln_gamma(n2);
        Ok(PI
            * self.central_intensity
            * self.effective_radius.powi(2)
            * ln_factor.exp()
            * self.mass_to_light)
    }
}

/// A density normalization and a scale radius, shared by the Jaffe, Hernquist, NFW, isothermal
/// and pseudo-isothermal profiles: `[rho0 (Msun/pc^3), a (pc)]`
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DensityScaleParams {
    pub density: f64,
    pub scale_radius: f64,
}

impl DensityScaleParams {
    pub fn from_slice(profile: &'static str, params: &[f64]) -> Result<Self, DomainError> {
        arity(profile, params, 2, 2)?;
        Ok(Self {
            density: non_negative(profile, "density", params[0])?,
            scale_radius: positive(profile, "scale radius", params[1])?,
        })
    }
}

/// A total mass and a scale length: `[M (Msun), a (pc)]`
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MassScaleParams {
    pub mass: f64,
    pub scale_length: f64,
}

impl MassScaleParams {
    pub fn from_slice(profile: &'static str, params: &[f64]) -> Result<Self, DomainError> {
        arity(profile, params, 2, 2)?;
        Ok(Self {
            mass: non_negative(profile, "mass", params[0])?,
            scale_length: positive(profile, "scale length", params[1])?,
        })
    }
}

/// Hernquist (1993) halo: `[M (Msun), core radius gamma (pc), cutoff radius rc (pc)]`
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HaloHernquistParams {
    pub mass: f64,
    pub core_radius: f64,
    pub cutoff_radius: f64,
}

impl HaloHernquistParams {
    pub fn from_slice(profile: &'static str, params: &[f64]) -> Result<Self, DomainError> {
        arity(profile, params, 3, 3)?;
        Ok(Self {
            mass: non_negative(profile, "mass", params[0])?,
            core_radius: non_negative(profile, "core radius", params[1])?,
            cutoff_radius: positive(profile, "cutoff radius", params[2])?,
        })
    }
}

/// NFW halo from its concentration: `[c, M200 (Msun), h (km/s/Mpc)?]`
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NfwM200Params {
    pub concentration: f64,
    pub m200: f64,
    #[serde(default = "default_hubble")]
    pub hubble: f64,
}

fn default_hubble() -> f64 {
    DEFAULT_HUBBLE
}

impl NfwM200Params {
    pub fn from_slice(profile: &'static str, params: &[f64]) -> Result<Self, DomainError> {
        arity(profile, params, 2, 3)?;
        Ok(Self {
            concentration: positive(profile, "concentration", params[0])?,
            m200: non_negative(profile, "M200", params[1])?,
            hubble: match params.get(2) {
                Some(h) => positive(profile, "Hubble constant", *h)?,
                None => DEFAULT_HUBBLE,
            },
        })
    }

    /// Radius where the mean enclosed density is 200 times the critical density, in pc.
    pub fn r200(&self, constants: &Constants) -> f64 {
        let rho_crit = constants.critical_density(self.hubble);
        (3.0 * self.m200 / (4.0 * PI * 200.0 * rho_crit)).cbrt()
    }

    /// Characteristic density and scale radius of the equivalent NFW halo.
    pub fn to_density_scale(&self, constants: &Constants) -> DensityScaleParams {
        let c = self.concentration;
        let rho_crit = constants.critical_density(self.hubble);
        DensityScaleParams {
            density: (200.0 / 3.0) * c.powi(3) * rho_crit / ((1.0 + c).ln() - c / (1.0 + c)),
            scale_radius: self.r200(constants) / c,
        }
    }
}

#[cfg(test)]
mod ut_params {
    use super::*;

    #[test]
    fn optional_mass_to_light() {
        let disk = DiskParams::from_slice(&[10.0, 2000.0]).unwrap();
        assert_eq!(disk.mass_to_light, DEFAULT_MASS_TO_LIGHT);
        let disk = DiskParams::from_slice(&[10.0, 2000.0, 2.5]).unwrap();
        assert_eq!(disk.mass_to_light, 2.5);
        assert!(matches!(
            DiskParams::from_slice(&[10.0]),
            Err(DomainError::Arity { got: 1, .. })
        ));
        assert!(matches!(
            DiskParams::from_slice(&[10.0, 1.0, 1.0, 1.0]),
            Err(DomainError::Arity { got: 4, .. })
        ));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            DiskParams::from_slice(&[10.0, -1.0]),
            Err(DomainError::NonPositive { .. })
        ));
        assert!(matches!(
            DensityScaleParams::from_slice("nfw", &[-1.0, 1.0]),
            Err(DomainError::Negative { .. })
        ));
        assert!(matches!(
            SersicParams::from_slice("sersic_quad", &[1.0, 1.0, f64::NAN]),
            Err(DomainError::NonFinite { .. })
        ));
        assert!(matches!(
            SersicParams::from_slice("sersic_quad", &[1.0, 1.0, 0.0]),
            Err(DomainError::NonPositive { .. })
        ));
    }

    #[test]
    fn nfw_m200_closure() {
        // The mass enclosed within R200 must be M200 by construction
        let constants = Constants::default();
        let halo = NfwM200Params::from_slice("nfw_m200", &[10.0, 1e12, 70.0]).unwrap();
        let ds = halo.to_density_scale(&constants);
        let x = halo.r200(&constants) / ds.scale_radius;
        let m = 4.0 * PI * ds.density * ds.scale_radius.powi(3) * ((1.0 + x).ln() - x / (1.0 + x));
        assert!((m - 1e12).abs() / 1e12 < 1e-12, "{m}");
        assert_eq!(
            NfwM200Params::from_slice("nfw_m200", &[10.0, 1e12])
                .unwrap()
                .hubble,
            DEFAULT_HUBBLE
        );
    }

    #[test]
    fn sersic_exponential_total_mass() {
        // For n = 1 the Sersic law is an exponential disk of scale length Re / b_1
        let sersic = SersicParams::from_slice("sersic_quad", &[100.0, 1000.0, 1.0]).unwrap();
        let b1 = sersic.bn(BnNormalization::Exact).unwrap();
        let disk = DiskParams::from_slice(&[100.0, 1000.0 / b1]).unwrap();
        let total = sersic.total_mass(BnNormalization::Exact).unwrap();
        assert!((total - disk.total_mass()).abs() / total < 1e-12);
    }
}
