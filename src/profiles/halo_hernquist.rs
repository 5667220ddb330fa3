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

use rayon::prelude::*;
use statrs::function::erf::erfc;
use std::f64::consts::PI;

use super::params::HaloHernquistParams;
use super::{ProfileCurve, RadialGrid};
use crate::integrators::adaptive_quad;
use crate::model::ModelContext;

/// Above this q, e^(q^2) erfc(q) is computed from its asymptotic series to avoid overflow
const ASYMPTOTIC_Q: f64 = 10.0;

/// Normalization of the cored and truncated isothermal halo of Hernquist (1993), eq. 2.3:
/// `1 / (1 - sqrt(pi) q exp(q^2) erfc(q))`.
pub fn alpha(q: f64) -> f64 {
    let deficit = if q < ASYMPTOTIC_Q {
        1.0 - PI.sqrt() * q * (q * q).exp() * erfc(q)
    } else {
        // 1 - sqrt(pi) q erfcx(q) = sum_k (-1)^(k+1) (2k-1)!! / (2 q^2)^k
        let u = 1.0 / (2.0 * q * q);
        u * (1.0 - 3.0 * u * (1.0 - 5.0 * u * (1.0 - 7.0 * u * (1.0 - 9.0 * u))))
    };
    1.0 / deficit
}

/// Enclosed mass and circular velocity of the halo, Hernquist (1993) eq. 2.4.
pub fn evaluate(params: &HaloHernquistParams, grid: &RadialGrid, ctx: &ModelContext) -> ProfileCurve {
    let opts = &ctx.integration;
    let q = params.core_radius / params.cutoff_radius;
    let q2 = q * q;
    let scale = 2.0 * params.mass * alpha(q) / PI.sqrt();

    let estimates: Vec<_> = grid
        .radii()
        .par_iter()
        .map(|r| {
            let est = adaptive_quad(
                |z| {
                    let z2 = z * z;
                    z2 * (-z2).exp() / (z2 + q2)
                },
                0.0,
                r / params.cutoff_radius,
                opts,
            );
            (*r, est)
        })
        .collect();

    let warnings: Vec<_> = estimates
        .iter()
        .filter_map(|(r, est)| est.warning(*r, opts.warn_threshold))
        .collect();
    for warning in &warnings {
        warn!("Hernquist halo: {warning}");
    }

    let mass = estimates
        .iter()
        .map(|(_, est)| scale * est.value)
        .collect();

    ProfileCurve::from_mass(grid, mass, &ctx.constants, warnings)
}

#[cfg(test)]
mod ut_halo_hernquist {
    use super::*;

    #[test]
    fn alpha_is_continuous_across_the_asymptotic_switch() {
        let below = alpha(ASYMPTOTIC_Q * (1.0 - 1e-9));
        let above = alpha(ASYMPTOTIC_Q);
        assert!((below - above).abs() / above < 1e-7, "{below} vs {above}");
        // Without a core the halo is a truncated isothermal sphere
        assert_eq!(alpha(0.0), 1.0);
    }

    #[test]
    fn total_mass_is_reached() {
        // Far beyond the cutoff radius the enclosed mass is M
        let params = HaloHernquistParams {
            mass: 1e12,
            core_radius: 2000.0,
            cutoff_radius: 50_000.0,
        };
        let grid = RadialGrid::new(vec![0.0, 1e3, 1e5, 1e6]).unwrap();
        let curve = evaluate(&params, &grid, &ModelContext::default());
        assert_eq!(curve.mass[0], 0.0);
        assert!((curve.mass[3] - 1e12).abs() / 1e12 < 1e-6, "{:?}", curve.mass);
        assert!(curve.mass.windows(2).all(|w| w[1] >= w[0]));
    }
}
