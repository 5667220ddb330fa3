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
use std::fmt;
use typed_builder::TypedBuilder;

use crate::profiles::BnNormalization;

mod gauss;
mod kronrod;
mod simpson;

pub use gauss::GaussLegendre;
pub use kronrod::{adaptive_quad, adaptive_quad_semi_infinite};
pub use simpson::{cumulative_simpson_segments, SimpsonGrid};

/// Options shared by every quadrature-backed profile.
///
/// These are set once per model context and never modified during an evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct IntegrationOptions {
    /// Relative tolerance of the adaptive quadrature
    #[builder(default = 1.49e-8)]
    pub rel_tol: f64,
    /// Absolute tolerance of the adaptive quadrature
    #[builder(default = 1.49e-8)]
    pub abs_tol: f64,
    /// Maximum number of subintervals the adaptive quadrature may bisect into
    #[builder(default = 200)]
    pub max_subintervals: usize,
    /// Order of the Gauss-Legendre rule of the transformed Sersic strategy
    #[builder(default = 5)]
    pub gauss_order: usize,
    /// Simpson intervals between the inner floor and the first radius (rounded up to even)
    #[builder(default = 1000)]
    pub fine_steps: usize,
    /// Simpson intervals between two consecutive radii (rounded up to even)
    #[builder(default = 32)]
    pub coarse_steps: usize,
    /// Lower bound of the mass accumulation, in parsec
    #[builder(default = 1.0)]
    pub inner_floor: f64,
    /// Relative error above which a quadrature result raises an `IntegrationWarning`
    #[builder(default = 1e-6)]
    pub warn_threshold: f64,
    /// How the Sersic b_n coefficient is computed
    #[builder(default)]
    pub normalization: BnNormalization,
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Display for IntegrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rtol: {:e}, atol: {:e}, max sub: {}, GL order: {}, Simpson: {}/{} from {} pc, b_n: {}",
            self.rel_tol,
            self.abs_tol,
            self.max_subintervals,
            self.gauss_order,
            self.fine_steps,
            self.coarse_steps,
            self.inner_floor,
            self.normalization
        )
    }
}

/// Result of an adaptive quadrature: the best estimate is always returned, with its error estimate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuadEstimate {
    pub value: f64,
    /// Estimated absolute error
    pub error: f64,
    /// Number of integrand evaluations
    pub evaluations: usize,
    /// Whether the requested tolerance was met within the subinterval budget
    pub converged: bool,
}

impl QuadEstimate {
    /// Returns the warning this estimate raises at `radius`, if its relative error exceeds `threshold`
    /// or if it did not converge. Callers are responsible for logging it.
    pub fn warning(&self, radius: f64, threshold: f64) -> Option<IntegrationWarning> {
        if !self.converged || self.error > threshold * self.value.abs() {
            Some(IntegrationWarning {
                radius,
                value: self.value,
                error: self.error,
            })
        } else {
            None
        }
    }
}

/// Non-fatal report of a quadrature whose estimated error exceeds the configured threshold.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationWarning {
    /// Radius, in parsec, where the quadrature was evaluated
    pub radius: f64,
    pub value: f64,
    pub error: f64,
}

impl fmt::Display for IntegrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quadrature at R = {} pc: {:e} with estimated error {:e}",
            self.radius, self.value, self.error
        )
    }
}
