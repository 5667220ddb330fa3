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

use super::IntegrationOptions;
use rayon::prelude::*;

/// A piecewise uniform sampling of `[floor, r_last]` on which a composite Simpson rule is applied per segment.
///
/// The first segment spans from the inner floor to the first radius with a fine step count, every
/// subsequent segment spans two consecutive radii with a coarse step count. Segments share their
/// end points, so the samples are stored once.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpsonGrid {
    points: Vec<f64>,
    /// Index in `points` of each requested radius
    breaks: Vec<usize>,
}

impl SimpsonGrid {
    /// Builds the grid for strictly positive, non-decreasing `radii`.
    pub fn new(radii: &[f64], opts: &IntegrationOptions) -> Self {
        let mut points = Vec::new();
        let mut breaks = Vec::with_capacity(radii.len());

        let first = match radii.first() {
            Some(first) => *first,
            None => return Self { points, breaks },
        };

        let floor = if first > opts.inner_floor {
            opts.inner_floor
        } else {
            first * 1e-3
        };

        points.push(floor);
        push_segment(&mut points, floor, first, even(opts.fine_steps));
        breaks.push(points.len() - 1);

        for pair in radii.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b > a {
                push_segment(&mut points, a, b, even(opts.coarse_steps));
            }
            breaks.push(points.len() - 1);
        }

        Self { points, breaks }
    }

    /// All abscissae where the integrand must be sampled.
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Integral of the sampled function from the floor up to each requested radius.
    ///
    /// `values` must hold the integrand evaluated at every entry of `points()`.
    pub fn cumulative(&self, values: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.breaks.len());
        let mut total = 0.0;
        let mut start = 0;
        for &stop in &self.breaks {
            if stop > start {
                total += simpson(&self.points[start..=stop], &values[start..=stop]);
            }
            out.push(total);
            start = stop;
        }
        out
    }
}

fn even(steps: usize) -> usize {
    let steps = steps.max(2);
    steps + steps % 2
}

/// Appends the `steps` uniform samples of `(a, b]`, the left end point is already stored.
fn push_segment(points: &mut Vec<f64>, a: f64, b: f64, steps: usize) {
    let h = (b - a) / steps as f64;
    for i in 1..steps {
        points.push(a + h * i as f64);
    }
    points.push(b);
}

/// Composite Simpson rule on uniformly spaced samples, the number of intervals must be even.
fn simpson(x: &[f64], y: &[f64]) -> f64 {
    let intervals = x.len() - 1;
    let h = (x[intervals] - x[0]) / intervals as f64;
    let mut sum = y[0] + y[intervals];
    for (i, yi) in y.iter().enumerate().take(intervals).skip(1) {
        sum += if i % 2 == 1 { 4.0 * yi } else { 2.0 * yi };
    }
    sum * h / 3.0
}

/// Cumulative integral of `f` up to each of the strictly positive, non-decreasing `radii`, starting
/// from the inner floor of the options. Samples of `f` are evaluated in parallel.
pub fn cumulative_simpson_segments<F>(f: F, radii: &[f64], opts: &IntegrationOptions) -> Vec<f64>
where
    F: Fn(f64) -> f64 + Sync,
{
    let grid = SimpsonGrid::new(radii, opts);
    let values: Vec<f64> = grid.points().par_iter().map(|x| f(*x)).collect();
    grid.cumulative(&values)
}
