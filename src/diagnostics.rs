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

//! Goodness of fit statistics.

use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use statrs::statistics::Statistics;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DiagnosticsError {
    #[snafu(display("{observed} observations but {model} model values"))]
    LengthMismatch { observed: usize, model: usize },
    #[snafu(display("sigma #{index} is {value}, it must be strictly positive"))]
    NonPositiveSigma { index: usize, value: f64 },
    #[snafu(display("{len} observations leave no degrees of freedom for {dof} free parameters"))]
    NotEnoughDegreesOfFreedom { len: usize, dof: usize },
}

fn residuals(y_obs: &[f64], y_model: &[f64]) -> Result<Vec<f64>, DiagnosticsError> {
    ensure!(
        y_obs.len() == y_model.len(),
        LengthMismatchSnafu {
            observed: y_obs.len(),
            model: y_model.len()
        }
    );
    Ok(y_obs.iter().zip(y_model).map(|(o, m)| o - m).collect())
}

/// Sum of squared residuals, standardized by `sigma` when provided.
pub fn chi_square(
    y_obs: &[f64],
    y_model: &[f64],
    sigma: Option<&[f64]>,
) -> Result<f64, DiagnosticsError> {
    let res = residuals(y_obs, y_model)?;
    match sigma {
        None => Ok(res.iter().map(|r| r * r).sum()),
        Some(sigma) => {
            ensure!(
                sigma.len() == res.len(),
                LengthMismatchSnafu {
                    observed: res.len(),
                    model: sigma.len()
                }
            );
            let mut chi2 = 0.0;
            for (index, (r, s)) in res.iter().zip(sigma).enumerate() {
                ensure!(*s > 0.0, NonPositiveSigmaSnafu { index, value: *s });
                chi2 += (r / s).powi(2);
            }
            Ok(chi2)
        }
    }
}

/// Chi square divided by `len(y_obs) - degrees_of_freedom`.
///
/// The degrees of freedom must be the number of free parameters of the fit which produced `y_model`,
/// they are never inferred.
pub fn reduced_chi_square(
    y_obs: &[f64],
    y_model: &[f64],
    degrees_of_freedom: usize,
    sigma: Option<&[f64]>,
) -> Result<f64, DiagnosticsError> {
    ensure!(
        y_obs.len() > degrees_of_freedom,
        NotEnoughDegreesOfFreedomSnafu {
            len: y_obs.len(),
            dof: degrees_of_freedom
        }
    );
    Ok(chi_square(y_obs, y_model, sigma)? / (y_obs.len() - degrees_of_freedom) as f64)
}

/// Summary of the unweighted residuals `y_obs - y_model`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    pub rms: f64,
    pub max_abs: f64,
}

impl fmt::Display for ResidualStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean = {:.3e}, std dev = {:.3e}, rms = {:.3e}, max |r| = {:.3e}",
            self.mean, self.std_dev, self.rms, self.max_abs
        )
    }
}

pub fn residual_stats(y_obs: &[f64], y_model: &[f64]) -> Result<ResidualStats, DiagnosticsError> {
    let res = residuals(y_obs, y_model)?;
    Ok(ResidualStats {
        mean: res.iter().mean(),
        std_dev: res.iter().std_dev(),
        rms: res.iter().quadratic_mean(),
        max_abs: res.iter().abs_max(),
    })
}
