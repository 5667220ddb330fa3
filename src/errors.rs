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

use snafu::prelude::*;

/// Precondition violations of the profile evaluators.
///
/// These are raised immediately and never clamped: an invalid Sersic index or a negative scale length
/// is a bug in the caller's setup, whereas numerical accuracy issues are reported as data.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DomainError {
    #[snafu(display("{profile} expects between {min} and {max} parameters but {got} were provided"))]
    Arity {
        profile: &'static str,
        min: usize,
        max: usize,
        got: usize,
    },
    #[snafu(display("{profile}: parameter `{name}` must be finite, got {value}"))]
    NonFinite {
        profile: &'static str,
        name: &'static str,
        value: f64,
    },
    #[snafu(display("{profile}: parameter `{name}` must be non-negative, got {value}"))]
    Negative {
        profile: &'static str,
        name: &'static str,
        value: f64,
    },
    #[snafu(display("{profile}: parameter `{name}` must be strictly positive, got {value}"))]
    NonPositive {
        profile: &'static str,
        name: &'static str,
        value: f64,
    },
    #[snafu(display("Sersic index n = {n} is invalid for the {strategy} strategy (requires n > {bound})"))]
    SersicIndex {
        n: f64,
        strategy: &'static str,
        bound: f64,
    },
    #[snafu(display("{normalization} normalization is undefined for Sersic index n = {n}"))]
    Normalization {
        n: f64,
        normalization: &'static str,
    },
    #[snafu(display("radius #{index} is invalid ({radius}): radii must be finite and non-negative"))]
    InvalidRadius { index: usize, radius: f64 },
    #[snafu(display("radius #{index} ({radius}) is smaller than the previous one ({previous})"))]
    DecreasingRadius {
        index: usize,
        radius: f64,
        previous: f64,
    },
    #[snafu(display("composite expects {expected} parameters but {got} were provided"))]
    CompositeArity { expected: usize, got: usize },
    #[snafu(display("unknown radial profile `{name}`"))]
    UnknownProfile { name: String },
    #[snafu(display("unknown model `{name}`"))]
    UnknownModel { name: String },
}
