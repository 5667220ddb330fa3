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

/// Newton iterations used to polish each Legendre root, more than enough to reach machine precision.
const MAX_NEWTON: usize = 100;

/// A fixed-order Gauss-Legendre quadrature rule on [-1, 1].
///
/// An order `N` rule integrates polynomials of degree up to `2N - 1` exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Builds the rule of the requested order (at least one node).
    ///
    /// Nodes are the roots of the Legendre polynomial P_N, found by Newton iteration from
    /// the Chebyshev-like initial guess `cos(pi (i + 3/4) / (N + 1/2))`.
    pub fn new(order: usize) -> Self {
        let order = order.max(1);
        let mut nodes = vec![0.0; order];
        let mut weights = vec![0.0; order];
        let nf = order as f64;

        // Roots are symmetric, only compute half of them.
        for i in 0..order.div_ceil(2) {
            let mut x = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
            let mut deriv = 0.0;
            for _ in 0..MAX_NEWTON {
                let (p, dp) = legendre(order, x);
                deriv = dp;
                let dx = p / dp;
                x -= dx;
                if dx.abs() < 1e-15 {
                    let (_, dp) = legendre(order, x);
                    deriv = dp;
                    break;
                }
            }
            let w = 2.0 / ((1.0 - x * x) * deriv * deriv);
            nodes[i] = -x;
            nodes[order - 1 - i] = x;
            weights[i] = w;
            weights[order - 1 - i] = w;
        }
        if order % 2 == 1 {
            // The middle node is exactly zero
            nodes[order / 2] = 0.0;
        }

        Self { nodes, weights }
    }

    /// Order (number of nodes) of this rule
    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Integrates `f` over `[a, b]` with this rule.
    pub fn integrate<F>(&self, f: F, a: f64, b: f64) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let half = 0.5 * (b - a);
        let center = 0.5 * (b + a);
        let sum: f64 = self
            .nodes
            .iter()
            .zip(self.weights.iter())
            .map(|(x, w)| w * f(center + half * x))
            .sum();
        half * sum
    }
}

/// Returns (P_n(x), P_n'(x)) using the three-term recurrence.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    let pn = if n == 0 { 1.0 } else { p1 };
    let pn_1 = if n == 0 { 0.0 } else { p0 };
    let dp = n as f64 * (x * pn - pn_1) / (x * x - 1.0);
    (pn, dp)
}
