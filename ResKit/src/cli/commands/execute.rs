//! Command execution implementations

use super::Commands;
use super::{build, inspect, lookup, raw};
use crate::settings::Settings;

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self, settings: &Settings) -> anyhow::Result<()> {
        match self {
            Commands::Inspect { source, ids } => inspect::execute(source, *ids, settings),
            Commands::Lookup {
                source,
                id,
                name,
                res_type,
                config,
                density,
                overlay,
                system,
                all,
            } => lookup::execute(
                &lookup::LookupArgs {
                    source,
                    id: id.as_deref(),
                    name: name.as_deref(),
                    res_type: res_type.as_deref(),
                    config,
                    density: *density,
                    overlays: overlay,
                    system: system.as_deref(),
                    all: *all,
                },
                settings,
            ),
            Commands::Build {
                source,
                destination,
                lazy,
            } => build::execute(source, destination, *lazy),
            Commands::Raw { source, dir } => raw::execute(source, dir),
        }
    }
}
