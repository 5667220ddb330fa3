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

use super::{IntegrationOptions, QuadEstimate};

/// Abscissae of the 15-point Kronrod rule, the odd entries are the 7-point Gauss abscissae.
/// (Source)[QUADPACK, qk15.f]
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.000_000_000_000_000_000_000_000_000_000_000,
];

/// Weights of the 15-point Kronrod rule
const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

/// Weights of the 7-point Gauss rule
const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

#[derive(Copy, Clone, Debug)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

/// Applies the 7/15 Gauss-Kronrod pair on [a, b], returning the Kronrod estimate and the
/// absolute difference with the embedded Gauss estimate.
fn gk15<F>(f: &F, a: f64, b: f64) -> Segment
where
    F: Fn(f64) -> f64,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let fc = finite_or_zero(f(center));
    let mut kronrod = fc * WGK[7];
    let mut gauss = fc * WG[3];

    for (j, x) in XGK.iter().take(7).enumerate() {
        let dx = half * x;
        let pair = finite_or_zero(f(center - dx)) + finite_or_zero(f(center + dx));
        kronrod += WGK[j] * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    }
}

/// Integrands are allowed to underflow or overflow far in the tails, treat those samples as negligible.
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Globally adaptive integration of `f` over the finite interval `[a, b]`.
///
/// The interval with the largest error estimate is bisected until the total error estimate is below
/// `max(abs_tol, rel_tol * |value|)` or the subinterval budget is exhausted. In the latter case the best
/// estimate is still returned, flagged as not converged, with its (large) error estimate.
pub fn adaptive_quad<F>(f: F, a: f64, b: f64, opts: &IntegrationOptions) -> QuadEstimate
where
    F: Fn(f64) -> f64,
{
    if a == b {
        return QuadEstimate {
            value: 0.0,
            error: 0.0,
            evaluations: 0,
            converged: true,
        };
    }

    let mut segments = vec![gk15(&f, a, b)];
    let mut evaluations = 15;
    let max_subintervals = opts.max_subintervals.max(1);

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = opts.abs_tol.max(opts.rel_tol * value.abs());

        if error <= tolerance {
            return QuadEstimate {
                value,
                error,
                evaluations,
                converged: true,
            };
        }

        if segments.len() >= max_subintervals {
            trace!(
                "adaptive quadrature on [{a}, {b}] exhausted {max_subintervals} subintervals: {value:e} ± {error:e}"
            );
            return QuadEstimate {
                value,
                error,
                evaluations,
                converged: false,
            };
        }

        // Bisect the worst segment
        let (worst_idx, _) = segments
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |(bi, be), (i, s)| {
                if s.error > be {
                    (i, s.error)
                } else {
                    (bi, be)
                }
            });
        let worst = segments.swap_remove(worst_idx);
        let mid = 0.5 * (worst.a + worst.b);
        if mid <= worst.a || mid >= worst.b {
            // The interval cannot be split any further in floating point
            segments.push(worst);
            let value: f64 = segments.iter().map(|s| s.value).sum();
            let error: f64 = segments.iter().map(|s| s.error).sum();
            return QuadEstimate {
                value,
                error,
                evaluations,
                converged: false,
            };
        }
        segments.push(gk15(&f, worst.a, mid));
        segments.push(gk15(&f, mid, worst.b));
        evaluations += 30;
    }
}

/// Globally adaptive integration of `f` over `[a, +inf)`.
///
/// Uses the mapping `x = a + u / (1 - u)` for `u` in `[0, 1)`, so `f` must decay fast enough for the
/// transformed integrand `f(x) / (1 - u)^2` to be integrable.
pub fn adaptive_quad_semi_infinite<F>(f: F, a: f64, opts: &IntegrationOptions) -> QuadEstimate
where
    F: Fn(f64) -> f64,
{
    adaptive_quad(
        |u: f64| {
            let one_minus = 1.0 - u;
            f(a + u / one_minus) / (one_minus * one_minus)
        },
        0.0,
        1.0,
        opts,
    )
}
