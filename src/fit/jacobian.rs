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

use crate::errors::DomainError;
use crate::linalg::{DMatrix, DVector};
use crate::model::RotationCurve;

use super::problem::Problem;

/// Perturbation applied to a value, relative unless the value is too small.
pub(crate) fn perturbation(value: f64, fd_step: f64) -> f64 {
    fd_step * value.abs().max(fd_step.sqrt())
}

/// Finite difference Jacobian of the model output with respect to the unknowns.
///
/// The parameter columns are computed in parallel. A parameter perturbation that leaves the profile domain
/// is opposed, i.e. the column is computed with a backward difference instead. In orthogonal distance
/// regression, the x correction block is diagonal and obtained from a single shifted evaluation.
pub(crate) fn compute_jacobian<M: RotationCurve + ?Sized>(
    problem: &Problem<'_, M>,
    z: &DVector<f64>,
    nominal: &[f64],
) -> Result<DMatrix<f64>, DomainError> {
    let params = problem.full_params(z);
    let xs = problem.abscissae(z);
    let fd_step = problem.fd_step;

    let mut pert_calc: Vec<(usize, usize, Result<Vec<f64>, DomainError>)> = problem
        .free
        .iter()
        .enumerate()
        .map(|(j, idx)| (j, *idx, Ok(Vec::new())))
        .collect();

    pert_calc
        .par_iter_mut()
        .for_each(|(_, idx, column)| {
            let pert = perturbation(params[*idx], fd_step);
            let mut this_params = params.clone();
            this_params[*idx] += pert;

            *column = match problem.model_at(&this_params, &xs) {
                Ok(eval) => Ok(eval
                    .values
                    .iter()
                    .zip(nominal)
                    .map(|(f, f0)| (f - f0) / pert)
                    .collect()),
                Err(e) => {
                    trace!("p[{idx}] + {pert:.3e} left the domain ({e}), opposing the perturbation");
                    this_params[*idx] = params[*idx] - pert;
                    problem.model_at(&this_params, &xs).map(|eval| {
                        nominal
                            .iter()
                            .zip(eval.values.iter())
                            .map(|(f0, f)| (f0 - f) / pert)
                            .collect()
                    })
                }
            };
        });

    let mut jac = DMatrix::zeros(problem.n_obs(), problem.n_unknowns());
    for (j, _, column) in pert_calc {
        for (i, value) in column?.into_iter().enumerate() {
            jac[(i, j)] = value;
        }
    }

    if problem.is_odr() {
        let steps: Vec<f64> = xs.iter().map(|x| perturbation(*x, fd_step)).collect();
        let shifted: Vec<f64> = xs.iter().zip(&steps).map(|(x, h)| x + h).collect();
        let eval = problem.model_at(&params, &shifted)?;
        let nf = problem.n_free();
        for (i, ((f, f0), h)) in eval.values.iter().zip(nominal).zip(&steps).enumerate() {
            jac[(i, nf + i)] = (f - f0) / h;
        }
    }

    Ok(jac)
}
