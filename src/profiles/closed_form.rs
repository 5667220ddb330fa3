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

use std::f64::consts::PI;

use super::params::{DensityScaleParams, MassScaleParams};
use super::{ProfileCurve, RadialGrid};
use crate::constants::Constants;

/// Builds the curve of a profile whose enclosed mass is known analytically.
pub(crate) fn curve<F>(grid: &RadialGrid, constants: &Constants, enclosed_mass: F) -> ProfileCurve
where
    F: Fn(f64) -> f64,
{
    let mass = grid
        .iter()
        .map(|r| if *r == 0.0 { 0.0 } else { enclosed_mass(*r) })
        .collect();
    ProfileCurve::from_mass(grid, mass, constants, Vec::new())
}

/// 4 pi rho0 a^3, the mass scale of every density/scale radius profile
fn mass_scale(p: &DensityScaleParams) -> f64 {
    4.0 * PI * p.density * p.scale_radius.powi(3)
}

/// Jaffe (1983), Binney & Tremaine (2008) eq. 2.64
pub fn jaffe_mass(p: &DensityScaleParams, radius: f64) -> f64 {
    let x = radius / p.scale_radius;
    mass_scale(p) * x / (1.0 + x).sqrt()
}

/// Hernquist (1990), Binney & Tremaine (2008) eq. 2.66
pub fn hernquist_mass(p: &DensityScaleParams, radius: f64) -> f64 {
    let x = radius / p.scale_radius;
    mass_scale(p) * x * x / (2.0 * (1.0 + x).powi(2))
}

/// Hernquist (1990) bulge parameterized by its total mass, eq. 3
pub fn bulge_hernquist_mass(p: &MassScaleParams, radius: f64) -> f64 {
    p.mass * radius.powi(2) / (radius + p.scale_length).powi(2)
}

/// Navarro, Frenk & White (1995)
pub fn nfw_mass(p: &DensityScaleParams, radius: f64) -> f64 {
    let x = radius / p.scale_radius;
    mass_scale(p) * ((1.0 + x).ln() - x / (1.0 + x))
}

/// Isothermal sphere (Kravtsov et al. 1998)
pub fn isothermal_mass(p: &DensityScaleParams, radius: f64) -> f64 {
    let x = radius / p.scale_radius;
    mass_scale(p) * (x.asinh() - x / (1.0 + x * x).sqrt())
}

/// Pseudo-isothermal sphere (Begeman 1987)
pub fn pseudo_isothermal_mass(p: &DensityScaleParams, radius: f64) -> f64 {
    let x = radius / p.scale_radius;
    mass_scale(p) * (x - x.atan())
}

#[cfg(test)]
mod ut_closed_form {
    use super::*;

    fn unit() -> DensityScaleParams {
        DensityScaleParams {
            density: 1.0 / (4.0 * PI),
            scale_radius: 1.0,
        }
    }

    #[test]
    fn nfw_shape_ratio() {
        let p = unit();
        let ratio = nfw_mass(&p, 1.0) / nfw_mass(&p, 2.0);
        let expect = (2.0_f64.ln() - 0.5) / (3.0_f64.ln() - 2.0 / 3.0);
        assert!((ratio - expect).abs() < 1e-14);
    }

    #[test]
    fn small_radius_limits() {
        // All these profiles have a constant or cusped density near the center, so M -> 0
        let p = unit();
        for f in [
            jaffe_mass,
            hernquist_mass,
            nfw_mass,
            isothermal_mass,
            pseudo_isothermal_mass,
        ] {
            assert!(f(&p, 1e-9) < 1e-8);
        }
        let bulge = MassScaleParams {
            mass: 1e10,
            scale_length: 500.0,
        };
        // Half of the mass of a Hernquist bulge lies within (1 + sqrt 2) a
        let half = bulge_hernquist_mass(&bulge, (1.0 + 2.0_f64.sqrt()) * 500.0);
        assert!((half - 5e9).abs() / 5e9 < 1e-12);
    }

    #[test]
    fn pseudo_isothermal_is_asymptotically_linear() {
        let p = unit();
        let m1 = pseudo_isothermal_mass(&p, 1e6);
        let m2 = pseudo_isothermal_mass(&p, 2e6);
        assert!((m2 / m1 - 2.0).abs() < 1e-5);
    }
}
