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

use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use crate::constants::Constants;
use crate::fit::FitOptions;
use crate::integrators::IntegrationOptions;
use crate::model::ModelContext;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file {}: {source}", path.display()))]
    ReadConfig { path: PathBuf, source: io::Error },
    #[snafu(display("failed to parse YAML configuration: {source}"))]
    ParseConfig { source: serde_yaml::Error },
    #[snafu(display("invalid configuration: {details}"))]
    InvalidConfig { details: String },
}

impl PartialEq for ConfigError {
    /// No two configuration errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

fn reader<P: AsRef<Path>>(path: P) -> Result<BufReader<File>, ConfigError> {
    let path = path.as_ref();
    let file = File::open(path).context(ReadConfigSnafu { path })?;
    Ok(BufReader::new(file))
}

/// A configuration structure which can be read from and written to YAML.
pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Checks the values once deserialized
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let me: Self = serde_yaml::from_reader(reader(path)?).context(ParseConfigSnafu)?;
        me.validate()?;
        Ok(me)
    }

    /// Builds the configuration representation from a yaml string
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        let me: Self = serde_yaml::from_str(data).context(ParseConfigSnafu)?;
        me.validate()?;
        Ok(me)
    }

    /// Builds a sequence of "Selves" from the provided path to a yaml
    fn load_many<P>(path: P) -> Result<Vec<Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let many: Vec<Self> = serde_yaml::from_reader(reader(path)?).context(ParseConfigSnafu)?;
        many.iter().try_for_each(Self::validate)?;
        Ok(many)
    }

    /// Builds a map of names to "selves" from the provided path to a yaml
    fn load_named<P>(path: P) -> Result<BTreeMap<String, Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let named: BTreeMap<String, Self> =
            serde_yaml::from_reader(reader(path)?).context(ParseConfigSnafu)?;
        named.values().try_for_each(Self::validate)?;
        Ok(named)
    }

    /// Builds a sequence of "Selves" from the provided string of a yaml
    fn loads_many(data: &str) -> Result<Vec<Self>, ConfigError> {
        debug!("Loading YAML:\n{data}");
        let many: Vec<Self> = serde_yaml::from_str(data).context(ParseConfigSnafu)?;
        many.iter().try_for_each(Self::validate)?;
        Ok(many)
    }

    /// Serializes to a yaml string
    fn dumps(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).context(ParseConfigSnafu)
    }
}

impl ConfigRepr for Constants {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            [self.g, self.parsec, self.solar_mass]
                .iter()
                .all(|c| c.is_finite() && *c > 0.0),
            InvalidConfigSnafu {
                details: format!("physical constants must be strictly positive: {self:?}")
            }
        );
        Ok(())
    }
}

impl ConfigRepr for IntegrationOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.rel_tol >= 0.0 && self.abs_tol >= 0.0 && self.warn_threshold >= 0.0,
            InvalidConfigSnafu {
                details: "integration tolerances must be non-negative"
            }
        );
        ensure!(
            self.max_subintervals > 0 && self.gauss_order > 0,
            InvalidConfigSnafu {
                details: "the subinterval budget and the Gauss-Legendre order must be positive"
            }
        );
        ensure!(
            self.fine_steps > 0 && self.coarse_steps > 0 && self.inner_floor > 0.0,
            InvalidConfigSnafu {
                details: "Simpson steps and the inner floor must be positive"
            }
        );
        Ok(())
    }
}

impl ConfigRepr for ModelContext {
    fn validate(&self) -> Result<(), ConfigError> {
        self.constants.validate()?;
        self.integration.validate()
    }
}

impl ConfigRepr for FitOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.lambda_decrease > 1.0 && self.lambda_increase > 1.0,
            InvalidConfigSnafu {
                details: "lambda factors must be greater than one"
            }
        );
        ensure!(
            self.lambda_min > 0.0
                && self.lambda_min <= self.lambda_init
                && self.lambda_init <= self.lambda_max,
            InvalidConfigSnafu {
                details: format!(
                    "lambda bounds must satisfy 0 < {} <= {} <= {}",
                    self.lambda_min, self.lambda_init, self.lambda_max
                )
            }
        );
        ensure!(
            self.fd_step > 0.0,
            InvalidConfigSnafu {
                details: "the finite difference step must be positive"
            }
        );
        Ok(())
    }
}
