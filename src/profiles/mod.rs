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

use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::constants::Constants;
use crate::errors::{DecreasingRadiusSnafu, DomainError, InvalidRadiusSnafu};
use crate::integrators::IntegrationWarning;
use crate::model::{ModelContext, RotationCurve};

pub mod closed_form;
pub mod halo_hernquist;
mod params;
pub mod sersic;

pub use params::{
    DensityScaleParams, DiskParams, HaloHernquistParams, MassScaleParams, NfwM200Params,
    SersicParams, DEFAULT_MASS_TO_LIGHT,
};
pub use sersic::{BnNormalization, SersicStrategy};

/// Radii, in parsec, where a profile is evaluated: finite, non-negative and non-decreasing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct RadialGrid(Vec<f64>);

impl RadialGrid {
    pub fn new(radii: Vec<f64>) -> Result<Self, DomainError> {
        for (index, radius) in radii.iter().copied().enumerate() {
            ensure!(
                radius.is_finite() && radius >= 0.0,
                InvalidRadiusSnafu { index, radius }
            );
            if index > 0 {
                let previous = radii[index - 1];
                ensure!(
                    radius >= previous,
                    DecreasingRadiusSnafu {
                        index,
                        radius,
                        previous
                    }
                );
            }
        }
        Ok(Self(radii))
    }

    /// `num` evenly spaced radii from `start` to `stop` inclusive.
    pub fn linspace(start: f64, stop: f64, num: usize) -> Result<Self, DomainError> {
        let radii = match num {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (num - 1) as f64;
                (0..num)
                    .map(|i| if i == num - 1 { stop } else { start + step * i as f64 })
                    .collect()
            }
        };
        Self::new(radii)
    }

    pub fn radii(&self) -> &[f64] {
        &self.0
    }

    /// Number of radii exactly at the center.
    pub fn leading_zeros(&self) -> usize {
        self.0.iter().take_while(|r| **r == 0.0).count()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for RadialGrid {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for RadialGrid {
    type Error = DomainError;

    fn try_from(radii: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(radii)
    }
}

impl From<RadialGrid> for Vec<f64> {
    fn from(grid: RadialGrid) -> Self {
        grid.0
    }
}

/// Output of a profile on a radial grid, index `i` of each vector corresponds to radius `i` of the grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileCurve {
    /// Circular velocity squared, in (km/s)^2
    pub v_squared: Vec<f64>,
    /// Enclosed mass, in Msun
    pub mass: Vec<f64>,
    /// Quadratures whose estimated error exceeded the configured threshold
    pub warnings: Vec<IntegrationWarning>,
}

impl ProfileCurve {
    /// A curve of zeros, as contributed by a disabled component.
    pub fn zeros(len: usize) -> Self {
        Self {
            v_squared: vec![0.0; len],
            mass: vec![0.0; len],
            warnings: Vec::new(),
        }
    }

    /// Builds the curve from the enclosed mass, the center is exactly (0, 0).
    pub(crate) fn from_mass(
        grid: &RadialGrid,
        mut mass: Vec<f64>,
        constants: &Constants,
        warnings: Vec<IntegrationWarning>,
    ) -> Self {
        let v_squared = grid
            .iter()
            .zip(mass.iter_mut())
            .map(|(r, m)| {
                if *r == 0.0 {
                    *m = 0.0;
                }
                constants.v_squared(*m, *r)
            })
            .collect();
        Self {
            v_squared,
            mass,
            warnings,
        }
    }

    /// Circular velocity in km/s
    pub fn velocity(&self) -> Vec<f64> {
        self.v_squared.iter().map(|v2| v2.max(0.0).sqrt()).collect()
    }

    pub fn len(&self) -> usize {
        self.v_squared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v_squared.is_empty()
    }
}

/// Physical mass distributions with a rotation curve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
pub enum RadialProfile {
    /// Exponential disk: [Sigma0, Rd, M/L?]
    #[serde(rename = "disk")]
    Disk,
    /// Jaffe sphere: [rho0, a]
    #[serde(rename = "jaffe")]
    Jaffe,
    /// Hernquist sphere: [rho0, a]
    #[serde(rename = "hernquist")]
    Hernquist,
    /// Hernquist (1993) cored and truncated halo: [M, core radius, cutoff radius]
    #[serde(rename = "halohernq")]
    HaloHernquist,
    /// Hernquist (1990) bulge: [M, a]
    #[serde(rename = "bulgehernq")]
    BulgeHernquist,
    /// NFW halo: [rho_c, r_c]
    #[serde(rename = "nfw")]
    Nfw,
    /// NFW halo from its concentration: [c, M200, h?]
    #[serde(rename = "nfw_m200")]
    NfwM200,
    /// Isothermal sphere: [rho0, a]
    #[serde(rename = "iso")]
    Isothermal,
    /// Pseudo-isothermal sphere: [rho0, a]
    #[serde(rename = "pseudoiso")]
    PseudoIsothermal,
    /// Sersic bulge with adaptive quadrature: [I0, Re, n, M/L?]
    #[serde(rename = "sersic_quad")]
    SersicQuad,
    /// Sersic bulge with fixed-order Gauss quadrature, n > 1: [I0, Re, n, M/L?]
    #[serde(rename = "sersic_gauss")]
    SersicGauss,
}

impl RadialProfile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Jaffe => "jaffe",
            Self::Hernquist => "hernquist",
            Self::HaloHernquist => "halohernq",
            Self::BulgeHernquist => "bulgehernq",
            Self::Nfw => "nfw",
            Self::NfwM200 => "nfw_m200",
            Self::Isothermal => "iso",
            Self::PseudoIsothermal => "pseudoiso",
            Self::SersicQuad => "sersic_quad",
            Self::SersicGauss => "sersic_gauss",
        }
    }

    /// Number of parameters, including the optional trailing ones.
    pub fn arity(&self) -> usize {
        match self {
            Self::Disk | Self::NfwM200 | Self::HaloHernquist => 3,
            Self::SersicQuad | Self::SersicGauss => 4,
            _ => 2,
        }
    }

    /// Minimum number of parameters accepted.
    pub fn required_arity(&self) -> usize {
        match self {
            Self::Disk | Self::NfwM200 => 2,
            Self::SersicQuad | Self::SersicGauss => 3,
            other => other.arity(),
        }
    }

    /// Whether this is one of the Sersic profiles, whose strategy may be overridden.
    pub fn is_sersic(&self) -> bool {
        matches!(self, Self::SersicQuad | Self::SersicGauss)
    }

    /// Evaluates the circular velocity squared and the enclosed mass of this profile on the grid.
    pub fn evaluate(
        &self,
        params: &[f64],
        grid: &RadialGrid,
        ctx: &ModelContext,
    ) -> Result<ProfileCurve, DomainError> {
        let strategy = match self {
            Self::SersicGauss => SersicStrategy::Gauss,
            _ => SersicStrategy::Adaptive,
        };
        self.evaluate_with(params, grid, ctx, strategy)
    }

    /// Same as `evaluate`, but Sersic profiles use the provided strategy.
    pub(crate) fn evaluate_with(
        &self,
        params: &[f64],
        grid: &RadialGrid,
        ctx: &ModelContext,
        strategy: SersicStrategy,
    ) -> Result<ProfileCurve, DomainError> {
        let constants = &ctx.constants;
        let name = self.name();
        match self {
            Self::Disk => {
                let p = DiskParams::from_slice(params)?;
                Ok(closed_form::curve(grid, constants, |r| p.enclosed_mass(r)))
            }
            Self::Jaffe => {
                let p = DensityScaleParams::from_slice(name, params)?;
                Ok(closed_form::curve(grid, constants, |r| {
                    closed_form::jaffe_mass(&p, r)
                }))
            }
            Self::Hernquist => {
                let p = DensityScaleParams::from_slice(name, params)?;
                Ok(closed_form::curve(grid, constants, |r| {
                    closed_form::hernquist_mass(&p, r)
                }))
            }
            Self::BulgeHernquist => {
                let p = MassScaleParams::from_slice(name, params)?;
                Ok(closed_form::curve(grid, constants, |r| {
                    closed_form::bulge_hernquist_mass(&p, r)
                }))
            }
            Self::Nfw => {
                let p = DensityScaleParams::from_slice(name, params)?;
                Ok(closed_form::curve(grid, constants, |r| {
                    closed_form::nfw_mass(&p, r)
                }))
            }
            Self::NfwM200 => {
                let p = NfwM200Params::from_slice(name, params)?.to_density_scale(constants);
                Ok(closed_form::curve(grid, constants, |r| {
                    closed_form::nfw_mass(&p, r)
                }))
            }
            Self::Isothermal => {
                let p = DensityScaleParams::from_slice(name, params)?;
                Ok(closed_form::curve(grid, constants, |r| {
                    closed_form::isothermal_mass(&p, r)
                }))
            }
            Self::PseudoIsothermal => {
                let p = DensityScaleParams::from_slice(name, params)?;
                Ok(closed_form::curve(grid, constants, |r| {
                    closed_form::pseudo_isothermal_mass(&p, r)
                }))
            }
            Self::HaloHernquist => {
                let p = HaloHernquistParams::from_slice(name, params)?;
                Ok(halo_hernquist::evaluate(&p, grid, ctx))
            }
            Self::SersicQuad | Self::SersicGauss => {
                let p = SersicParams::from_slice(name, params)?;
                sersic::evaluate(&p, strategy, grid, ctx)
            }
        }
    }
}

impl fmt::Display for RadialProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RadialProfile {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        enum_iterator::all::<Self>()
            .find(|profile| profile.name() == name)
            .ok_or(DomainError::UnknownProfile { name })
    }
}

impl RotationCurve for RadialProfile {
    fn arity(&self) -> usize {
        RadialProfile::arity(self)
    }

    fn evaluate(
        &self,
        params: &[f64],
        grid: &RadialGrid,
        ctx: &ModelContext,
    ) -> Result<ProfileCurve, DomainError> {
        RadialProfile::evaluate(self, params, grid, ctx)
    }
}
