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

use crate::errors::DomainError;
use crate::integrators::IntegrationWarning;
use crate::linalg::{DMatrix, DVector};
use crate::model::{ModelContext, RotationCurve};
use crate::profiles::RadialGrid;

use super::jacobian::compute_jacobian;
use super::{FitSpec, Observable};

/// Model output at a set of abscissae.
pub(crate) struct Evaluation {
    pub values: Vec<f64>,
    pub warnings: Vec<IntegrationWarning>,
}

/// The least squares problem built from a fit specification.
///
/// The unknowns are the free parameters followed, in orthogonal distance regression, by one correction
/// of the independent variable per observation.
pub(crate) struct Problem<'a, M: RotationCurve + ?Sized> {
    pub model: &'a M,
    pub ctx: &'a ModelContext,
    pub spec: &'a FitSpec,
    /// Indices of the free parameters in the full parameter vector
    pub free: Vec<usize>,
    pub weight_y: Vec<f64>,
    pub weight_x: Option<Vec<f64>>,
    pub fd_step: f64,
}

impl<'a, M: RotationCurve + ?Sized> Problem<'a, M> {
    pub fn n_obs(&self) -> usize {
        self.spec.y.len()
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    pub fn is_odr(&self) -> bool {
        self.weight_x.is_some()
    }

    pub fn n_unknowns(&self) -> usize {
        if self.is_odr() {
            self.n_free() + self.n_obs()
        } else {
            self.n_free()
        }
    }

    /// Initial unknowns: the free initial parameters and zero x corrections.
    pub fn initial_unknowns(&self) -> DVector<f64> {
        let mut z = DVector::zeros(self.n_unknowns());
        for (k, idx) in self.free.iter().enumerate() {
            z[k] = self.spec.initial_params[*idx];
        }
        z
    }

    /// Full parameter vector, fixed parameters keep their initial value.
    pub fn full_params(&self, z: &DVector<f64>) -> Vec<f64> {
        let mut params = self.spec.initial_params.clone();
        for (k, idx) in self.free.iter().enumerate() {
            params[*idx] = z[k];
        }
        params
    }

    /// Corrections of the independent variable, empty without orthogonal distance regression.
    pub fn x_corrections<'z>(&self, z: &'z DVector<f64>) -> &'z [f64] {
        &z.as_slice()[self.n_free()..]
    }

    /// Abscissae where the model is compared to the data.
    pub fn abscissae(&self, z: &DVector<f64>) -> Vec<f64> {
        if self.is_odr() {
            self.spec
                .x
                .iter()
                .zip(self.x_corrections(z))
                .map(|(x, dx)| x + dx)
                .collect()
        } else {
            self.spec.x.to_vec()
        }
    }

    /// Evaluates the observable at arbitrary abscissae, which are clamped to the center and sorted
    /// before being handed to the model. Output `i` corresponds to input `i`.
    pub fn model_at(&self, params: &[f64], xs: &[f64]) -> Result<Evaluation, DomainError> {
        let clamped: Vec<f64> = xs.iter().map(|x| x.max(0.0)).collect();
        let mut order: Vec<usize> = (0..clamped.len()).collect();
        order.sort_by(|a, b| clamped[*a].total_cmp(&clamped[*b]));
        let grid = RadialGrid::new(order.iter().map(|i| clamped[*i]).collect())?;

        let curve = self.model.evaluate(params, &grid, self.ctx)?;
        let observed = self.spec.observable.select(&curve);

        let mut values = vec![0.0; observed.len()];
        for (k, i) in order.iter().enumerate() {
            values[*i] = observed[k];
        }
        Ok(Evaluation {
            values,
            warnings: curve.warnings,
        })
    }

    pub fn evaluate(&self, z: &DVector<f64>) -> Result<Evaluation, DomainError> {
        self.model_at(&self.full_params(z), &self.abscissae(z))
    }

    /// Weighted sum of squared residuals, including the x correction penalty.
    pub fn cost(&self, z: &DVector<f64>, values: &[f64]) -> f64 {
        let data: f64 = self
            .spec
            .y
            .iter()
            .zip(values)
            .zip(&self.weight_y)
            .map(|((y, f), w)| w * (y - f).powi(2))
            .sum();
        let penalty: f64 = match &self.weight_x {
            Some(wd) => wd
                .iter()
                .zip(self.x_corrections(z))
                .map(|(w, dx)| w * dx * dx)
                .sum(),
            None => 0.0,
        };
        data + penalty
    }

    /// Information matrix `H^T W H` and normal vector `H^T W dy` at the current unknowns.
    pub fn normal_equations(
        &self,
        z: &DVector<f64>,
        values: &[f64],
    ) -> Result<(DMatrix<f64>, DVector<f64>), DomainError> {
        let h = compute_jacobian(self, z, values)?;
        let w = DVector::from_column_slice(&self.weight_y);
        let dy = DVector::from_iterator(
            self.n_obs(),
            self.spec.y.iter().zip(values).map(|(y, f)| y - f),
        );

        // Scale the rows by the weights once: H^T W = (W H)^T
        let mut wh = h.clone();
        for (mut row, wi) in wh.row_iter_mut().zip(w.iter()) {
            row *= *wi;
        }
        let mut info = wh.transpose() * &h;
        let mut normal = wh.transpose() * dy;

        if let Some(wd) = &self.weight_x {
            let nf = self.n_free();
            for (i, (wdi, dx)) in wd.iter().zip(self.x_corrections(z)).enumerate() {
                // Pseudo-observation dx = 0
                info[(nf + i, nf + i)] += wdi;
                normal[nf + i] -= wdi * dx;
            }
        }

        Ok((info, normal))
    }
}

impl Observable {
    /// Picks the compared quantity out of a profile curve.
    pub fn select(&self, curve: &crate::profiles::ProfileCurve) -> Vec<f64> {
        match self {
            Self::VelocitySquared => curve.v_squared.clone(),
            Self::Velocity => curve.velocity(),
            Self::Mass => curve.mass.clone(),
        }
    }
}
