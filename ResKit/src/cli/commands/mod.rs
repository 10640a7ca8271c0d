use clap::Subcommand;
use std::path::PathBuf;

pub mod build;
pub mod execute;
pub mod inspect;
pub mod lookup;
pub mod raw;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the keys, locales and resources declared by an index
    Inspect {
        /// Index file or .hap/.hsp package
        source: PathBuf,

        /// List every resource id
        #[arg(long)]
        ids: bool,
    },

    /// Find the variant of a resource that fits a configuration
    Lookup {
        /// Index file or .hap/.hsp package
        source: PathBuf,

        /// Resource id, decimal or 0x-prefixed hex
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        id: Option<String>,

        /// Resource name (requires --type)
        #[arg(long, requires = "res_type")]
        name: Option<String>,

        /// Resource type (string, color, pattern, ...)
        #[arg(short = 't', long = "type")]
        res_type: Option<String>,

        /// Device configuration as a qualifier folder name, e.g. "zh_CN-dark-xldpi"
        #[arg(short, long, default_value = "base")]
        config: String,

        /// Target density in dpi (0 uses the configuration's own)
        #[arg(long, default_value_t = 0)]
        density: u32,

        /// Overlay packages, lowest priority first
        #[arg(long)]
        overlay: Vec<PathBuf>,

        /// System package consulted after the application package
        #[arg(long)]
        system: Option<PathBuf>,

        /// Print every variant instead of resolving the best one
        #[arg(long)]
        all: bool,
    },

    /// Build an index from a TOML manifest
    Build {
        /// TOML manifest
        source: PathBuf,

        /// Output index file
        destination: PathBuf,

        /// Write the lazy layout instead of the eager one
        #[arg(long)]
        lazy: bool,
    },

    /// List raw files shipped in a package
    Raw {
        /// Index file or .hap/.hsp package
        source: PathBuf,

        /// Directory below the raw file root
        #[arg(default_value = "")]
        dir: String,
    },
}
