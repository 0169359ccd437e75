use apkwatch_apps::App;
use apkwatch_core::{Abi, CacheBehaviour};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "apkwatch")]
#[command(
    version,
    about = "Find the latest builds of Android apps distributed outside app stores"
)]
pub struct Cli {
    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the maintained apps
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Look up the latest version of apps
    Check(CheckArgs),
    /// Print the effective settings
    Config {
        /// Write the settings file with defaults if it does not exist
        #[arg(long)]
        init: bool,
    },
    /// Delete all cached responses
    ClearCache,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// App ids (see `apkwatch list`); all enabled apps when omitted
    pub apps: Vec<App>,

    /// Ignore cached responses
    #[arg(long, conflicts_with = "cache_only")]
    pub force_network: bool,

    /// Only use cached responses, never the network
    #[arg(long)]
    pub cache_only: bool,

    /// Device ABI, most preferred first; repeat for several
    #[arg(long = "abi", value_name = "ABI")]
    pub abis: Vec<Abi>,

    /// Android API level of the device
    #[arg(long, value_name = "LEVEL")]
    pub sdk: Option<u32>,

    /// Prefer 32-bit builds when the device supports both
    #[arg(long)]
    pub prefer_32bit: bool,

    /// Installed version of an app; marks the app when a newer build exists
    #[arg(long = "installed", value_name = "APP=VERSION", value_parser = parse_installed)]
    pub installed: Vec<(App, String)>,

    /// Print JSON instead of one line per app
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn cache_behaviour(&self) -> CacheBehaviour {
        if self.force_network {
            CacheBehaviour::ForceNetwork
        } else if self.cache_only {
            CacheBehaviour::ForceCache
        } else {
            CacheBehaviour::UseCache
        }
    }

    pub fn installed_version(&self, app: App) -> Option<&str> {
        self.installed
            .iter()
            .find_map(|(candidate, version)| (*candidate == app).then_some(version.as_str()))
    }
}

fn parse_installed(value: &str) -> Result<(App, String), String> {
    let (app, version) = value
        .split_once('=')
        .ok_or_else(|| format!("expected APP=VERSION, got `{value}`"))?;
    let app = app.parse::<App>().map_err(|error| error.to_string())?;
    let version = version.trim();
    if version.is_empty() {
        return Err(format!("missing version for {app}"));
    }
    Ok((app, version.to_string()))
}
