//! Edit a directory of Kubernetes manifests in place.
//!
//! Every `.yaml` file below a root directory holds exactly one object. A [`Cluster`] loads all of
//! them into typed [`k8s_openapi`] objects, hands out selections of them for mutation through
//! [operators](ops) and writes every object back in a canonical, diff friendly form: mapping keys
//! are sorted and server managed fields such as `status` are dropped (see [`codec`]).
//!
//! ```no_run
//! use kubegen::{
//!     modify_cluster,
//!     ops::{container, pod, secret, workload},
//! };
//!
//! # fn main() -> Result<(), kubegen::cluster::Error> {
//! modify_cluster("deploy", "deploy/new", |cluster| {
//!     cluster.deployments(&["*"])?.apply(&[workload::pod(vec![pod::container(
//!         "",
//!         vec![container::env([("LOG_LEVEL", "info")], false)],
//!     )])]);
//!
//!     // Secrets which don't exist yet are created in `deploy/new`.
//!     cluster
//!         .secrets(&["api-token"])?
//!         .apply(&[secret::secret_data([("token", "changeme")])]);
//!     Ok(())
//! })
//! # }
//! ```
pub mod builder;
#[cfg(feature = "clap")]
pub mod cli;
pub mod cluster;
pub mod codec;
pub mod document;
pub mod logging;
pub mod manifest;
pub mod ops;

pub use cluster::{Cluster, Selection, WILDCARD, modify_cluster};
pub use manifest::{Manifest, ManifestKind};

// External re-exports
pub use k8s_openapi;
