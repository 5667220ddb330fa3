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

use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use std::str::FromStr;

use crate::errors::{CompositeAritySnafu, DomainError};
use crate::profiles::{ProfileCurve, RadialGrid, RadialProfile, SersicStrategy};

mod context;

pub use context::ModelContext;

/// Anything that maps a parameter vector and a radial grid to a rotation curve.
///
/// The fitting engine only relies on this trait, so it accepts single profiles and composite models alike.
pub trait RotationCurve: Sync {
    /// Length of the parameter vector
    fn arity(&self) -> usize;

    fn evaluate(
        &self,
        params: &[f64],
        grid: &RadialGrid,
        ctx: &ModelContext,
    ) -> Result<ProfileCurve, DomainError>;
}

/// Physical role of a component in a composite model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    Bulge,
    Disk,
    Halo,
}

impl ComponentRole {
    /// The role a profile plays when fitted on its own.
    pub fn of(profile: RadialProfile) -> Self {
        match profile {
            RadialProfile::Disk => Self::Disk,
            RadialProfile::SersicQuad | RadialProfile::SersicGauss | RadialProfile::BulgeHernquist => {
                Self::Bulge
            }
            _ => Self::Halo,
        }
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bulge => write!(f, "bulge"),
            Self::Disk => write!(f, "disk"),
            Self::Halo => write!(f, "halo"),
        }
    }
}

/// One member of a composite model.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub role: ComponentRole,
    pub profile: RadialProfile,
    /// A disabled component contributes zeros but keeps its parameter slots
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Overrides the Sersic strategy implied by the profile, ignored for other profiles
    #[serde(default)]
    pub sersic: Option<SersicStrategy>,
}

fn enabled() -> bool {
    true
}

impl Component {
    pub fn new(role: ComponentRole, profile: RadialProfile) -> Self {
        Self {
            role,
            profile,
            enabled: true,
            sersic: None,
        }
    }

    /// A Sersic bulge whose strategy is picked from its index at each evaluation.
    pub fn auto_sersic_bulge() -> Self {
        Self {
            role: ComponentRole::Bulge,
            profile: RadialProfile::SersicGauss,
            enabled: true,
            sersic: Some(SersicStrategy::Auto),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn arity(&self) -> usize {
        self.profile.arity()
    }

    /// Evaluates this component, or returns zeros of the grid length if it is disabled.
    pub fn evaluate(
        &self,
        params: &[f64],
        grid: &RadialGrid,
        ctx: &ModelContext,
    ) -> Result<ProfileCurve, DomainError> {
        if !self.enabled {
            return Ok(ProfileCurve::zeros(grid.len()));
        }
        match self.sersic {
            Some(strategy) if self.profile.is_sersic() => {
                self.profile.evaluate_with(params, grid, ctx, strategy)
            }
            _ => self.profile.evaluate(params, grid, ctx),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.role, self.profile)?;
        if let Some(strategy) = self.sersic {
            write!(f, " [{strategy}]")?;
        }
        if !self.enabled {
            write!(f, " disabled")?;
        }
        Ok(())
    }
}

/// Rotation curve of a composite model with the contribution of each component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeCurve {
    /// Sum of all components, including all their integration warnings
    pub total: ProfileCurve,
    pub components: Vec<(ComponentRole, ProfileCurve)>,
}

/// Superposition of independent components, additive in velocity squared.
///
/// The parameter vector is the concatenation of the full parameter vectors of each component, in order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeModel {
    pub components: Vec<Component>,
}

impl CompositeModel {
    pub fn new(components: Vec<Component>) -> Self {
        Self { components }
    }

    /// The bulge + disk (+ halo) model. Parameters are laid out disk first, then bulge, then halo.
    pub fn bulge_disk_halo(
        bulge: RadialProfile,
        disk: RadialProfile,
        halo: Option<RadialProfile>,
    ) -> Self {
        let mut components = vec![
            Component::new(ComponentRole::Disk, disk),
            Component::new(ComponentRole::Bulge, bulge),
        ];
        if let Some(halo) = halo {
            components.push(Component::new(ComponentRole::Halo, halo));
        }
        Self { components }
    }

    /// Disables every component of that role, the arity is unchanged.
    pub fn with_disabled(mut self, role: ComponentRole) -> Self {
        for component in self.components.iter_mut().filter(|c| c.role == role) {
            component.enabled = false;
        }
        self
    }

    pub fn arity(&self) -> usize {
        self.components.iter().map(|c| c.arity()).sum()
    }

    /// Splits the parameter vector into the slice of each component.
    pub fn split_params<'a>(&self, params: &'a [f64]) -> Result<Vec<&'a [f64]>, DomainError> {
        let expected = self.arity();
        ensure!(
            params.len() == expected,
            CompositeAritySnafu {
                expected,
                got: params.len()
            }
        );
        let mut slices = Vec::with_capacity(self.components.len());
        let mut start = 0;
        for component in &self.components {
            let end = start + component.arity();
            slices.push(&params[start..end]);
            start = end;
        }
        Ok(slices)
    }

    pub fn evaluate(
        &self,
        params: &[f64],
        grid: &RadialGrid,
        ctx: &ModelContext,
    ) -> Result<CompositeCurve, DomainError> {
        let slices = self.split_params(params)?;
        let mut total = ProfileCurve::zeros(grid.len());
        let mut components = Vec::with_capacity(self.components.len());

        for (component, slice) in self.components.iter().zip(slices) {
            let curve = component.evaluate(slice, grid, ctx)?;
            for (acc, v2) in total.v_squared.iter_mut().zip(&curve.v_squared) {
                *acc += v2;
            }
            for (acc, m) in total.mass.iter_mut().zip(&curve.mass) {
                *acc += m;
            }
            total.warnings.extend_from_slice(&curve.warnings);
            components.push((component.role, curve));
        }

        Ok(CompositeCurve { total, components })
    }
}

impl fmt::Display for CompositeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<String> = self.components.iter().map(|c| format!("{c}")).collect();
        write!(f, "{}", members.join(" + "))
    }
}

impl RotationCurve for CompositeModel {
    fn arity(&self) -> usize {
        CompositeModel::arity(self)
    }

    fn evaluate(
        &self,
        params: &[f64],
        grid: &RadialGrid,
        ctx: &ModelContext,
    ) -> Result<ProfileCurve, DomainError> {
        Ok(CompositeModel::evaluate(self, params, grid, ctx)?.total)
    }
}

/// The named rotation curve models.
///
/// Every composite is an automatic-strategy Sersic bulge plus an exponential disk, with the named halo
/// if any. The parameter layout is `[Sigma0, Rd, M/L_d, I0, Re, n, M/L_b, halo...]`.
///
/// Composite names are not always the names of their halo profile: the NFW halo parametrized by
/// concentration is the `nfwm200` composite but the `nfw_m200` profile. Both resolve through
/// [FromStr](std::str::FromStr).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Sersic bulge and exponential disk, no halo
    BulgeDisk,
    Jaffe,
    Hernquist,
    BulgeHernquist,
    HaloHernquist,
    Nfw,
    NfwM200,
    Isothermal,
    PseudoIsothermal,
    /// A single profile
    Profile(RadialProfile),
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BulgeDisk => "bulgedisk",
            Self::Jaffe => "jaffe",
            Self::Hernquist => "hernquist",
            Self::BulgeHernquist => "bulgehernq",
            Self::HaloHernquist => "halohernq",
            Self::Nfw => "nfw",
            Self::NfwM200 => "nfwm200",
            Self::Isothermal => "iso",
            Self::PseudoIsothermal => "pseudoiso",
            Self::Profile(profile) => profile.name(),
        }
    }

    /// Halo profile of the composite models
    pub fn halo(&self) -> Option<RadialProfile> {
        match self {
            Self::BulgeDisk | Self::Profile(_) => None,
            Self::Jaffe => Some(RadialProfile::Jaffe),
            Self::Hernquist => Some(RadialProfile::Hernquist),
            Self::BulgeHernquist => Some(RadialProfile::BulgeHernquist),
            Self::HaloHernquist => Some(RadialProfile::HaloHernquist),
            Self::Nfw => Some(RadialProfile::Nfw),
            Self::NfwM200 => Some(RadialProfile::NfwM200),
            Self::Isothermal => Some(RadialProfile::Isothermal),
            Self::PseudoIsothermal => Some(RadialProfile::PseudoIsothermal),
        }
    }

    pub fn model(&self) -> CompositeModel {
        match self {
            Self::Profile(profile) => CompositeModel::new(vec![Component::new(
                ComponentRole::of(*profile),
                *profile,
            )]),
            _ => {
                let mut components = vec![
                    Component::new(ComponentRole::Disk, RadialProfile::Disk),
                    Component::auto_sersic_bulge(),
                ];
                if let Some(halo) = self.halo() {
                    components.push(Component::new(ComponentRole::Halo, halo));
                }
                CompositeModel::new(components)
            }
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModelKind {
    type Err = DomainError;

    /// Composite names take precedence, so `jaffe` is the bulge + disk + Jaffe halo model. Profile names
    /// that are not also composite names (e.g. `disk` or `sersic_gauss`) resolve to that single profile.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if let Some(kind) = enum_iterator::all::<Self>()
            .filter(|kind| !matches!(kind, Self::Profile(_)))
            .find(|kind| kind.name() == name)
        {
            return Ok(kind);
        }
        RadialProfile::from_str(&name)
            .map(Self::Profile)
            .map_err(|_| DomainError::UnknownModel { name })
    }
}
