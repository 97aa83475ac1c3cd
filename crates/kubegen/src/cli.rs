//! Common command line options for tools working on a manifest directory, using the `clap` crate.
//!
//! ```
//! use clap::Parser;
//! use kubegen::cli::ClusterOptions;
//!
//! #[derive(Parser)]
//! struct Opts {
//!     #[command(flatten)]
//!     cluster: ClusterOptions,
//! }
//!
//! let opts = Opts::parse_from(["kubegen", "--root", "deploy"]);
//! assert_eq!(opts.cluster.new_files_dir(), std::path::Path::new("deploy/new"));
//! ```
use std::path::PathBuf;

use crate::cluster::{self, Cluster};

/// The directory name for new files used when `--new-files-dir` is not given.
pub const DEFAULT_NEW_FILES_DIR: &str = "new";

#[derive(Clone, Debug, PartialEq, Eq, clap::Args)]
#[command(next_help_heading = "Cluster Options")]
pub struct ClusterOptions {
    /// The directory containing the manifest files. It is searched recursively for `.yaml` files.
    #[arg(long, env = "KUBEGEN_ROOT")]
    pub root: PathBuf,

    /// The directory new objects are written to, `<ROOT>/new` by default.
    #[arg(long, env = "KUBEGEN_NEW_FILES_DIR")]
    pub new_files_dir: Option<PathBuf>,
}

impl ClusterOptions {
    pub fn new_files_dir(&self) -> PathBuf {
        self.new_files_dir
            .clone()
            .unwrap_or_else(|| self.root.join(DEFAULT_NEW_FILES_DIR))
    }

    /// Loads the cluster described by these options.
    pub fn load(&self) -> Result<Cluster, cluster::Error> {
        Cluster::load(&self.root, self.new_files_dir())
    }
}
