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

use crate::diagnostics::ResidualStats;
use crate::integrators::IntegrationWarning;

/// Whether the optimizer met one of its tolerances within its iteration budget.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    Converged,
    /// The iteration budget was exhausted or no damping produced an acceptable step, the result holds
    /// the last accepted iterate
    DidNotConverge,
}

/// Outcome of a fit. Fixed parameters are returned unchanged with a zero standard error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub fitted_params: Vec<f64>,
    pub param_std_errors: Vec<f64>,
    /// Weighted cost divided by the number of observations minus the number of free parameters
    pub reduced_chi_square: f64,
    pub status: FitStatus,
    /// Number of accepted steps
    pub iterations: usize,
    /// Final weighted sum of squared residuals, including the x corrections in orthogonal distance regression
    pub cost: f64,
    /// Corrections of the independent variable, only in orthogonal distance regression
    pub x_corrections: Option<Vec<f64>>,
    /// Unweighted residuals between the data and the fitted model
    pub residuals: ResidualStats,
    /// Integration warnings of the final model evaluation
    pub warnings: Vec<IntegrationWarning>,
}

impl FitResult {
    pub fn converged(&self) -> bool {
        self.status == FitStatus::Converged
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:?} after {} iterations: cost = {:.6e}, reduced chi2 = {:.6}",
            self.status, self.iterations, self.cost, self.reduced_chi_square
        )?;
        for (i, (p, s)) in self
            .fitted_params
            .iter()
            .zip(self.param_std_errors.iter())
            .enumerate()
        {
            writeln!(f, "\tp[{i}] = {p:.6e} ± {s:.3e}")?;
        }
        write!(f, "Residuals: {}", self.residuals)
    }
}
