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
use snafu::prelude::*;
use std::fmt;
use typed_builder::TypedBuilder;

use crate::diagnostics::{self, DiagnosticsError};
use crate::errors::DomainError;
use crate::linalg::{DMatrix, DVector};
use crate::model::{ModelContext, ModelKind, RotationCurve};
use crate::profiles::RadialGrid;

mod jacobian;
mod problem;
mod solution;

use problem::Problem;
pub use solution::{FitResult, FitStatus};

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FitError {
    #[snafu(display("model evaluation failed: {source}"))]
    Domain { source: DomainError },
    #[snafu(display("{what} has {got} entries but {expected} were expected"))]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[snafu(display("fixed mask has {got} entries but the model has {expected} parameters"))]
    MaskLengthMismatch { expected: usize, got: usize },
    #[snafu(display("{which} #{index} is {value}, it must be finite and strictly positive"))]
    InvalidWeight {
        which: &'static str,
        index: usize,
        value: f64,
    },
    #[snafu(display("too few observations ({count}) to estimate {free} free parameters"))]
    TooFewObservations { count: usize, free: usize },
    #[snafu(display("all parameters are fixed, nothing to fit"))]
    NoFreeParameters,
    #[snafu(display("unknown model `{name}`"))]
    UnknownModel { name: String },
    #[snafu(display("residual diagnostics failed: {source}"))]
    Diagnostics { source: DiagnosticsError },
    #[snafu(display("observation #{index} is {value}, it must be finite"))]
    NonFiniteObservation { index: usize, value: f64 },
    #[snafu(display("the cost at the initial parameters is {cost}"))]
    NonFiniteCost { cost: f64 },
}

/// Bound on the number of rejected steps in a row, whatever the lambda factors.
const MAX_CONSECUTIVE_REJECTIONS: usize = 100;

/// Model output compared to the dependent variable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observable {
    /// Circular velocity squared, in (km/s)^2
    #[default]
    VelocitySquared,
    /// Circular velocity, in km/s
    Velocity,
    /// Enclosed mass, in solar masses
    Mass,
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VelocitySquared => write!(f, "V^2"),
            Self::Velocity => write!(f, "V"),
            Self::Mass => write!(f, "M"),
        }
    }
}

/// Data and starting point of a fit.
///
/// Weights are inverse variances, use [weights_from_sigma] to convert standard deviations. Providing
/// `weight_x` turns the fit into an orthogonal distance regression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct FitSpec {
    pub initial_params: Vec<f64>,
    /// `true` marks a parameter held at its initial value
    #[builder(default, setter(strip_option))]
    pub fixed_mask: Option<Vec<bool>>,
    pub x: RadialGrid,
    pub y: Vec<f64>,
    #[builder(default, setter(strip_option))]
    pub weight_y: Option<Vec<f64>>,
    #[builder(default, setter(strip_option))]
    pub weight_x: Option<Vec<f64>>,
    #[builder(default)]
    pub observable: Observable,
}

/// Levenberg-Marquardt settings.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct FitOptions {
    /// Maximum number of accepted steps. Rejected steps only increase lambda and are not counted.
    #[builder(default = 50)]
    pub max_iterations: usize,
    /// Convergence on the norm of the step relative to the norm of the unknowns
    #[builder(default = 1e-10)]
    pub step_tolerance: f64,
    /// Convergence on the relative decrease of the cost
    #[builder(default = 1e-12)]
    pub cost_tolerance: f64,
    #[builder(default = 1e-3)]
    pub lambda_init: f64,
    /// Factor to decrease lambda by when a step is accepted
    #[builder(default = 10.0)]
    pub lambda_decrease: f64,
    /// Factor to increase lambda by when a step is rejected
    #[builder(default = 10.0)]
    pub lambda_increase: f64,
    #[builder(default = 1e-12)]
    pub lambda_min: f64,
    #[builder(default = 1e12)]
    pub lambda_max: f64,
    /// Damp with diag(H^T W H) instead of the identity
    #[builder(default = true)]
    pub diag_scaling: bool,
    /// Relative finite difference step
    #[builder(default = 1e-6)]
    pub fd_step: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Converts standard deviations into the inverse variance weights used by [FitSpec].
pub fn weights_from_sigma(sigma: &[f64]) -> Result<Vec<f64>, FitError> {
    sigma
        .iter()
        .enumerate()
        .map(|(index, s)| {
            ensure!(
                s.is_finite() && *s > 0.0,
                InvalidWeightSnafu {
                    which: "sigma",
                    index,
                    value: *s
                }
            );
            Ok(1.0 / (s * s))
        })
        .collect()
}

fn validate_weights(which: &'static str, weights: &[f64], expected: usize) -> Result<(), FitError> {
    ensure!(
        weights.len() == expected,
        LengthMismatchSnafu {
            what: which,
            expected,
            got: weights.len()
        }
    );
    for (index, w) in weights.iter().enumerate() {
        ensure!(
            w.is_finite() && *w > 0.0,
            InvalidWeightSnafu {
                which,
                index,
                value: *w
            }
        );
    }
    Ok(())
}

/// Fits any [RotationCurve] to data with a damped Gauss-Newton (Levenberg-Marquardt) iteration.
pub struct Fitter<'a, M: RotationCurve + ?Sized> {
    pub model: &'a M,
    pub ctx: ModelContext,
    pub options: FitOptions,
}

impl<'a, M: RotationCurve + ?Sized> Fitter<'a, M> {
    pub fn new(model: &'a M, ctx: ModelContext, options: FitOptions) -> Self {
        Self {
            model,
            ctx,
            options,
        }
    }

    /// Checks the fit inputs and builds the least squares problem.
    fn problem<'s>(&'s self, spec: &'s FitSpec) -> Result<Problem<'s, M>, FitError> {
        let n_obs = spec.y.len();
        ensure!(
            spec.x.len() == n_obs,
            LengthMismatchSnafu {
                what: "y",
                expected: spec.x.len(),
                got: n_obs
            }
        );
        let arity = self.model.arity();
        ensure!(
            spec.initial_params.len() == arity,
            LengthMismatchSnafu {
                what: "initial parameters",
                expected: arity,
                got: spec.initial_params.len()
            }
        );

        let free: Vec<usize> = match &spec.fixed_mask {
            Some(mask) => {
                ensure!(
                    mask.len() == arity,
                    MaskLengthMismatchSnafu {
                        expected: arity,
                        got: mask.len()
                    }
                );
                (0..arity).filter(|i| !mask[*i]).collect()
            }
            None => (0..arity).collect(),
        };
        ensure!(!free.is_empty(), NoFreeParametersSnafu);
        if let Some((index, value)) = spec.y.iter().enumerate().find(|(_, y)| !y.is_finite()) {
            return NonFiniteObservationSnafu {
                index,
                value: *value,
            }
            .fail();
        }
        ensure!(
            n_obs > free.len(),
            TooFewObservationsSnafu {
                count: n_obs,
                free: free.len()
            }
        );

        let weight_y = match &spec.weight_y {
            Some(w) => {
                validate_weights("y weight", w, n_obs)?;
                w.clone()
            }
            None => vec![1.0; n_obs],
        };
        if let Some(w) = &spec.weight_x {
            validate_weights("x weight", w, n_obs)?;
        }

        Ok(Problem {
            model: self.model,
            ctx: &self.ctx,
            spec,
            free,
            weight_y,
            weight_x: spec.weight_x.clone(),
            fd_step: self.options.fd_step,
        })
    }

    /// Damping matrix diagonal.
    fn scaling(&self, info: &DMatrix<f64>) -> DVector<f64> {
        let n = info.nrows();
        if !self.options.diag_scaling {
            return DVector::from_element(n, 1.0);
        }
        let diag = info.diagonal();
        let floor = match diag.max() * f64::EPSILON {
            floor if floor > 0.0 => floor,
            _ => 1e-6,
        };
        diag.map(|d| {
            if d > floor {
                d
            } else {
                warn!("LM scaling: non-positive diagonal element {d:.3e} in H^TWH, using floor {floor:.3e}");
                floor
            }
        })
    }

    pub fn fit(&self, spec: &FitSpec) -> Result<FitResult, FitError> {
        let problem = self.problem(spec)?;
        let opts = &self.options;

        let mut z = problem.initial_unknowns();
        let mut current = problem.evaluate(&z).context(DomainSnafu)?;
        let mut cost = problem.cost(&z, &current.values);
        let mut lambda = opts.lambda_init;
        let mut status = FitStatus::DidNotConverge;
        let mut iterations = 0;
        let mut rejections = 0;
        let mut normal_eqns: Option<(DMatrix<f64>, DVector<f64>)> = None;

        info!(
            "Fitting {} with {} observations, {} free parameters{}; initial cost {cost:.6e}",
            spec.observable,
            problem.n_obs(),
            problem.n_free(),
            if problem.is_odr() { " (ODR)" } else { "" }
        );

        ensure!(cost.is_finite(), NonFiniteCostSnafu { cost });
        if cost == 0.0 {
            info!("Initial parameters already match the data");
            status = FitStatus::Converged;
        }

        while status != FitStatus::Converged && iterations < opts.max_iterations {
            // The normal equations only change when a step is accepted
            let (info_matrix, normal) = match normal_eqns.take() {
                Some(eqns) => eqns,
                None => problem
                    .normal_equations(&z, &current.values)
                    .context(DomainSnafu)?,
            };

            let d_sq = DMatrix::from_diagonal(&self.scaling(&info_matrix));
            let augmented = &info_matrix + d_sq * lambda;

            let step = match augmented.cholesky() {
                Some(chol) => chol.solve(&normal),
                None if lambda >= opts.lambda_max => {
                    warn!("LM: augmented matrix (H^TWH + lambda*D^2) singular at the maximum lambda={lambda:.1e}, stopping");
                    break;
                }
                None => {
                    warn!("LM: augmented matrix (H^TWH + lambda*D^2) singular with lambda={lambda:.1e}, increasing lambda");
                    lambda = (lambda * opts.lambda_increase * 10.0).min(opts.lambda_max);
                    normal_eqns = Some((info_matrix, normal));
                    continue;
                }
            };

            let step_norm = step.norm();
            let rel_step = step_norm / (z.norm() + opts.step_tolerance);
            let trial = &z + &step;

            let outcome = problem.evaluate(&trial).map(|eval| {
                let trial_cost = problem.cost(&trial, &eval.values);
                (eval, trial_cost)
            });

            match outcome {
                Ok((eval, trial_cost)) if trial_cost < cost => {
                    iterations += 1;
                    rejections = 0;
                    let decrease = (cost - trial_cost) / cost;
                    z = trial;
                    current = eval;
                    cost = trial_cost;
                    lambda = (lambda / opts.lambda_decrease).max(opts.lambda_min);
                    info!(
                        "[{iterations}/{}] cost: {cost:.6e}; step: {step_norm:.3e}; lambda: {lambda:.1e}",
                        opts.max_iterations
                    );

                    if rel_step <= opts.step_tolerance
                        || decrease <= opts.cost_tolerance
                        || cost == 0.0
                    {
                        info!("Converged in {iterations} iterations (relative step {rel_step:.3e}, relative cost decrease {decrease:.3e})");
                        status = FitStatus::Converged;
                    }
                }
                rejected => {
                    rejections += 1;
                    match rejected {
                        Ok((_, trial_cost)) => {
                            debug!("LM: cost increased ({cost:.6e} -> {trial_cost:.6e}), rejecting step")
                        }
                        Err(e) => debug!("LM: step left the model domain ({e}), rejecting step"),
                    }

                    if rel_step <= opts.step_tolerance || lambda >= opts.lambda_max {
                        // No step can decrease the cost any further
                        info!("Converged in {iterations} iterations, no further decrease of the cost (lambda = {lambda:.1e})");
                        status = FitStatus::Converged;
                    } else if rejections >= MAX_CONSECUTIVE_REJECTIONS {
                        warn!("LM: {rejections} consecutive steps rejected with lambda = {lambda:.1e}, stopping");
                        break;
                    } else {
                        lambda = (lambda * opts.lambda_increase).min(opts.lambda_max);
                        normal_eqns = Some((info_matrix, normal));
                    }
                }
            }
        }

        if status == FitStatus::DidNotConverge && iterations >= opts.max_iterations {
            warn!(
                "Maximum iterations ({}) reached without convergence, returning the last accepted iterate (cost {cost:.6e})",
                opts.max_iterations
            );
        }

        let param_std_errors = self.std_errors(&problem, &z, &current.values, cost)?;
        let residuals =
            diagnostics::residual_stats(&spec.y, &current.values).context(DiagnosticsSnafu)?;

        Ok(FitResult {
            fitted_params: problem.full_params(&z),
            param_std_errors,
            reduced_chi_square: cost / (problem.n_obs() - problem.n_free()) as f64,
            status,
            iterations,
            cost,
            x_corrections: problem
                .is_odr()
                .then(|| problem.x_corrections(&z).to_vec()),
            residuals,
            warnings: current.warnings,
        })
    }

    /// Standard errors from the final information matrix, scaled by the residual variance.
    fn std_errors(
        &self,
        problem: &Problem<'_, M>,
        z: &DVector<f64>,
        values: &[f64],
        cost: f64,
    ) -> Result<Vec<f64>, FitError> {
        let (info_matrix, _) = problem
            .normal_equations(z, values)
            .context(DomainSnafu)?;
        let n = info_matrix.nrows();
        let res_var = cost / (problem.n_obs() - problem.n_free()) as f64;

        let covariance = match info_matrix.clone().cholesky() {
            Some(chol) => chol.inverse(),
            None => {
                warn!("Final information matrix H^TWH is singular, using its pseudo-inverse");
                info_matrix
                    .pseudo_inverse(f64::EPSILON)
                    .unwrap_or_else(|e| {
                        warn!("Pseudo-inverse failed ({e}), standard errors are undefined");
                        DMatrix::from_element(n, n, f64::NAN)
                    })
            }
        };

        let mut std_errors = vec![0.0; problem.spec.initial_params.len()];
        for (k, idx) in problem.free.iter().enumerate() {
            std_errors[*idx] = (covariance[(k, k)].max(0.0) * res_var).sqrt();
        }
        Ok(std_errors)
    }
}

/// Fits a named model to a rotation curve `y = V^2(x)` with the default context and options.
///
/// `weight_y` and `weight_x` are inverse variances; providing `weight_x` performs an orthogonal distance
/// regression. Parameters flagged in `fixed_mask` keep their initial value.
pub fn fit(
    model_name: &str,
    x: &[f64],
    y: &[f64],
    initial_params: &[f64],
    weight_y: Option<&[f64]>,
    weight_x: Option<&[f64]>,
    fixed_mask: Option<&[bool]>,
) -> Result<FitResult, FitError> {
    let kind: ModelKind = model_name.parse().map_err(|_| FitError::UnknownModel {
        name: model_name.to_string(),
    })?;
    let model = kind.model();
    let grid = RadialGrid::new(x.to_vec()).context(DomainSnafu)?;

    let spec = FitSpec {
        initial_params: initial_params.to_vec(),
        fixed_mask: fixed_mask.map(<[bool]>::to_vec),
        x: grid,
        y: y.to_vec(),
        weight_y: weight_y.map(<[f64]>::to_vec),
        weight_x: weight_x.map(<[f64]>::to_vec),
        observable: Observable::VelocitySquared,
    };

    Fitter::new(&model, ModelContext::default(), FitOptions::default()).fit(&spec)
}
