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

//! Deprojected Sersic law (Simonneau & Prada 2004).
//!
//! The volume density follows from the Abel inversion of the surface density law, and the enclosed mass
//! from a piecewise Simpson accumulation of `4 pi R^2 rho(R)` over the requested radii.

use enum_iterator::Sequence;
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use statrs::function::gamma::{checked_gamma_lr, ln_gamma};
use std::f64::consts::PI;
use std::fmt;

use super::params::SersicParams;
use super::{ProfileCurve, RadialGrid};
use crate::errors::{DomainError, InvalidRadiusSnafu, NormalizationSnafu, SersicIndexSnafu};
use crate::integrators::{
    adaptive_quad, adaptive_quad_semi_infinite, GaussLegendre, IntegrationOptions, QuadEstimate,
    SimpsonGrid,
};
use crate::model::ModelContext;

/// Maximum number of safeguarded Newton iterations when solving for the exact b_n
const BN_MAX_ITER: usize = 200;
const BN_TOL: f64 = 1e-14;

/// Selects how the b_n coefficient, ensuring that Re encloses half of the total mass, is computed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BnNormalization {
    /// Inverse of the regularized lower incomplete gamma function, `P(2n, b_n) = 1/2`
    #[default]
    Exact,
    /// `2n - 0.324` (Ciotti 1991), within 0.1% for n >= 1, undefined below n = 0.5
    Approximate,
    /// Asymptotic expansion of Ciotti & Bertin (1999), with the MacArthur et al. (2003) fit for n < 0.36
    Asymptotic,
}

impl fmt::Display for BnNormalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Approximate => write!(f, "approximate"),
            Self::Asymptotic => write!(f, "asymptotic"),
        }
    }
}

/// Computes b_n for a strictly positive Sersic index.
pub fn bn(n: f64, normalization: BnNormalization) -> Result<f64, DomainError> {
    let value = match normalization {
        BnNormalization::Exact => bn_exact(n)?,
        BnNormalization::Approximate => {
            ensure!(
                n >= 0.5,
                NormalizationSnafu {
                    n,
                    normalization: "approximate"
                }
            );
            2.0 * n - 0.324
        }
        BnNormalization::Asymptotic => bn_asymptotic(n),
    };
    ensure!(
        value.is_finite() && value > 0.0,
        NormalizationSnafu {
            n,
            normalization: match normalization {
                BnNormalization::Exact => "exact",
                BnNormalization::Approximate => "approximate",
                BnNormalization::Asymptotic => "asymptotic",
            }
        }
    );
    Ok(value)
}

fn bn_asymptotic(n: f64) -> f64 {
    if n >= 0.36 {
        2.0 * n - 1.0 / 3.0 + 4.0 / (405.0 * n) + 46.0 / (25_515.0 * n.powi(2))
            + 131.0 / (1_148_175.0 * n.powi(3))
            - 2_194_697.0 / (30_690_717_750.0 * n.powi(4))
    } else {
        0.01945 - 0.8902 * n + 10.95 * n.powi(2) - 19.67 * n.powi(3) + 13.43 * n.powi(4)
    }
}

/// Solves `P(2n, x) = 1/2` with Newton iterations kept inside a shrinking bracket.
fn bn_exact(n: f64) -> Result<f64, DomainError> {
    let a = 2.0 * n;
    let ln_gamma_a = ln_gamma(a);
    let fail = || DomainError::Normalization {
        n,
        normalization: "exact",
    };

    let mut x = bn_asymptotic(n);
    if !(x.is_finite() && x > 0.0) {
        // For small a, P(a, x) ~ x^a / Gamma(a + 1)
        x = (0.5 * (ln_gamma_a + a.ln()).exp()).powf(1.0 / a);
    }
    if !(x.is_finite() && x > 0.0) {
        return Err(fail());
    }

    let mut lo = 0.0;
    let mut hi = f64::INFINITY;
    for _ in 0..BN_MAX_ITER {
        let residual = checked_gamma_lr(a, x).map_err(|_| fail())? - 0.5;
        if residual == 0.0 {
            return Ok(x);
        }
        if residual > 0.0 {
            hi = x;
        } else {
            lo = x;
        }
        let slope = ((a - 1.0) * x.ln() - x - ln_gamma_a).exp();
        let mut next = x - residual / slope;
        if !(next.is_finite() && next > lo && next < hi) {
            next = if hi.is_finite() {
                0.5 * (lo + hi)
            } else {
                2.0 * x
            };
        }
        if (next - x).abs() <= BN_TOL * x {
            return Ok(next);
        }
        x = next;
    }
    debug!("b_n for n = {n} did not reach {BN_TOL:e} in {BN_MAX_ITER} iterations");
    Ok(x)
}

/// How the Abel deprojection integral of the Sersic law is evaluated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SersicStrategy {
    /// Adaptive Gauss-Kronrod quadrature, valid for any n > 0
    Adaptive,
    /// Fixed-order Gauss-Legendre quadrature on the transformed integral, valid only for n > 1
    Gauss,
    /// Gauss when n >= 2, adaptive otherwise
    #[default]
    Auto,
}

/// Smallest index for which `Auto` picks the fixed-order rule. Just above n = 1 the transformed integrand
/// is too steep for a low order rule and underflows to zero.
pub const AUTO_GAUSS_MIN_INDEX: f64 = 2.0;

/// Upper bound of the finite part of the adaptive deprojection, cosh(50) is about 2.6e21.
const MAX_T_SPLIT: f64 = 50.0;

impl SersicStrategy {
    /// Resolves `Auto` for the given index.
    pub fn resolve(self, n: f64) -> Self {
        match self {
            Self::Auto if n >= AUTO_GAUSS_MIN_INDEX => Self::Gauss,
            Self::Auto => Self::Adaptive,
            other => other,
        }
    }
}

impl fmt::Display for SersicStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adaptive => write!(f, "adaptive"),
            Self::Gauss => write!(f, "gauss"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Precomputed state needed to evaluate the volume density at any radius.
struct Deprojection<'a> {
    params: &'a SersicParams,
    bn: f64,
    strategy: SersicStrategy,
    rule: Option<GaussLegendre>,
    opts: &'a IntegrationOptions,
}

impl<'a> Deprojection<'a> {
    fn new(
        params: &'a SersicParams,
        strategy: SersicStrategy,
        opts: &'a IntegrationOptions,
    ) -> Result<Self, DomainError> {
        let n = params.index;
        let strategy = strategy.resolve(n);
        let rule = match strategy {
            SersicStrategy::Gauss => {
                ensure!(
                    n > 1.0,
                    SersicIndexSnafu {
                        n,
                        strategy: "gauss",
                        bound: 1.0
                    }
                );
                Some(GaussLegendre::new(opts.gauss_order))
            }
            _ => None,
        };
        Ok(Self {
            params,
            bn: params.bn(opts.normalization)?,
            strategy,
            rule,
            opts,
        })
    }

    /// Volume density at `radius` in Msun/pc^3, without the M/L ratio.
    fn density(&self, radius: f64) -> QuadEstimate {
        let n = self.params.index;
        let re = self.params.effective_radius;
        let i0 = self.params.central_intensity;
        let k = self.bn;
        let s = radius / re;

        match &self.rule {
            Some(rule) => {
                let q = 1.0 / (n - 1.0);
                let ks = k * s.powf(1.0 / n);
                let integral = rule.integrate(
                    |x| {
                        let base = 1.0 - x * x;
                        let x1 = base.powf(-q);
                        let x2 = base.powf(2.0 * n * q);
                        (-ks * x1).exp() * x / (1.0 - x2).sqrt()
                    },
                    0.0,
                    1.0,
                );
                let factor = 2.0 * k * i0 * s.powf(1.0 / n - 1.0) / (PI * re * (n - 1.0));
                // Every node underflowed
                let underflow = integral <= 0.0 && i0 > 0.0;
                if underflow {
                    trace!("Gauss-Legendre deprojection underflowed at n = {n}, R = {radius} pc");
                }
                QuadEstimate {
                    value: factor * integral,
                    error: 0.0,
                    evaluations: rule.order(),
                    converged: !underflow,
                }
            }
            None => {
                // z = s cosh(t) removes the inverse square root singularity at z = s. The integrand is
                // divided by its value at t = 0 so that it peaks at one whatever the radius.
                let a = k * s.powf(1.0 / n);
                let scaled = |t: f64| {
                    let c = t.cosh();
                    let cn = c.powf(1.0 / n);
                    (-a * (cn - 1.0)).exp() * cn / c
                };
                // The exponent has dropped by one at the split
                let t_split = (1.0 + 1.0 / a).powf(n).acosh().min(MAX_T_SPLIT);
                let core = adaptive_quad(scaled, 0.0, t_split, self.opts);
                let tail = adaptive_quad_semi_infinite(scaled, t_split, self.opts);

                let factor = i0 * a * (-a).exp() / (PI * n * re * s);
                QuadEstimate {
                    value: factor * (core.value + tail.value),
                    error: factor * (core.error + tail.error),
                    evaluations: core.evaluations + tail.evaluations,
                    converged: core.converged && tail.converged,
                }
            }
        }
    }
}

/// Volume density of the Sersic law at `radius` (pc), in Msun/pc^3 and including the M/L ratio.
///
/// The error estimate is zero for the Gauss strategy, since a fixed-order rule carries none. A Gauss
/// integral that underflows to zero is reported as not converged.
pub fn density(
    params: &SersicParams,
    radius: f64,
    strategy: SersicStrategy,
    opts: &IntegrationOptions,
) -> Result<QuadEstimate, DomainError> {
    ensure!(
        radius.is_finite() && radius > 0.0,
        InvalidRadiusSnafu {
            index: 0_usize,
            radius
        }
    );
    let mut est = Deprojection::new(params, strategy, opts)?.density(radius);
    est.value *= params.mass_to_light;
    est.error *= params.mass_to_light;
    Ok(est)
}

/// Rotation curve and enclosed mass of a Sersic bulge.
pub fn evaluate(
    params: &SersicParams,
    strategy: SersicStrategy,
    grid: &RadialGrid,
    ctx: &ModelContext,
) -> Result<ProfileCurve, DomainError> {
    let opts = &ctx.integration;
    let deprojection = Deprojection::new(params, strategy, opts)?;

    let zeros = grid.leading_zeros();
    let positive = &grid.radii()[zeros..];

    let samples = SimpsonGrid::new(positive, opts);
    let estimates: Vec<(f64, QuadEstimate)> = samples
        .points()
        .par_iter()
        .map(|r| (*r, deprojection.density(*r)))
        .collect();

    let warnings: Vec<_> = estimates
        .iter()
        .filter_map(|(r, est)| est.warning(*r, opts.warn_threshold))
        .collect();
    if let Some(worst) = warnings
        .iter()
        .max_by(|a, b| (a.error / a.value.abs()).total_cmp(&(b.error / b.value.abs())))
    {
        warn!(
            "{} of {} Sersic density quadratures exceeded the error threshold, worst {worst}",
            warnings.len(),
            estimates.len()
        );
    }

    let integrand: Vec<f64> = estimates
        .iter()
        .map(|(r, est)| 4.0 * PI * r * r * est.value)
        .collect();

    let mut mass = vec![0.0; zeros];
    mass.extend(
        samples
            .cumulative(&integrand)
            .into_iter()
            .map(|m| m * params.mass_to_light),
    );

    debug!(
        "Sersic n = {} ({} strategy, b_n = {}) evaluated at {} radii from {} density samples",
        params.index,
        deprojection.strategy,
        deprojection.bn,
        grid.len(),
        estimates.len()
    );

    Ok(ProfileCurve::from_mass(grid, mass, &ctx.constants, warnings))
}
