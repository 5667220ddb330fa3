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

/*! # galmass

Galaxy mass and circular velocity modeling: cumulative mass and rotation curves of exponential disks,
deprojected Sersic bulges and several dark matter halos, their composition into multi-component rotation
curve models, and the regression of these models against observed rotation curves.

All quantities are in model units: parsec, solar masses and km/s.
*/

/// Physical constants and their conversion to model units.
pub mod constants;

mod errors;
/// Profile evaluations never panic on user data, invalid parameters are reported as a [DomainError].
pub use self::errors::DomainError;

/// Numerical quadrature: adaptive Gauss-Kronrod, fixed order Gauss-Legendre and cumulative Simpson sums.
pub mod integrators;

/// Radial mass profiles and their rotation curves.
pub mod profiles;

/// Multi-component rotation curve models.
pub mod model;

/// Regression of rotation curve models against observations.
pub mod fit;

pub mod diagnostics;

/// YAML configuration of the model context and fit options.
pub mod io;

#[macro_use]
extern crate log;
extern crate nalgebra as na;

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::constants::Constants;
pub use self::fit::{fit, FitError, FitOptions, FitResult, FitSpec, FitStatus, Fitter, Observable};
pub use self::model::{CompositeModel, ModelContext, ModelKind, RotationCurve};
pub use self::profiles::{ProfileCurve, RadialGrid, RadialProfile};
