//! Composable mutation operators.
//!
//! An [`Op<T>`] changes one aspect of a mutable target and leaves everything else alone. Chains of
//! operators are plain slices which are applied front to back on the same target, see
//! [`apply_all`]. Operators exist on three levels:
//!
//! - whole resources, e.g. [`workload::replicas`] or [`secret::secret_data`],
//! - pod specs, see [`pod`],
//! - containers, see [`container`].
//!
//! Higher levels embed chains of the lower ones, e.g. [`workload::pod`] takes a chain of
//! [`pod::PodSpecOp`]s and [`pod::container`] takes a chain of [`container::ContainerOp`]s.
//!
//! Unless documented otherwise, applying a chain twice yields the same object as applying it once.
//!
//! ```
//! use k8s_openapi::api::apps::v1::Deployment;
//! use kubegen::ops::{apply_all, container, pod, workload};
//!
//! let mut deployment = Deployment::default();
//! apply_all(&mut deployment, &[
//!     workload::replicas(3),
//!     workload::pod(vec![pod::container("web", vec![
//!         container::image("nginx"),
//!         container::env([("LOG_LEVEL", "debug")], true),
//!     ])]),
//! ]);
//!
//! let spec = deployment.spec.unwrap();
//! assert_eq!(spec.replicas, Some(3));
//! assert_eq!(spec.template.spec.unwrap().containers[0].name, "web");
//! ```
use std::fmt;

pub mod config_map;
pub mod container;
pub mod meta;
pub mod pod;
pub mod pvc;
pub mod secret;
pub mod service;
pub mod workload;

/// A single mutation of a `T`.
pub struct Op<T>(Box<dyn Fn(&mut T)>);

impl<T> Op<T> {
    pub fn new(op: impl Fn(&mut T) + 'static) -> Self {
        Self(Box::new(op))
    }

    pub fn apply(&self, target: &mut T) {
        (self.0)(target);
    }
}

impl<T> fmt::Debug for Op<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Op(..)")
    }
}

/// Applies `ops` to `target` in order.
pub fn apply_all<T>(target: &mut T, ops: &[Op<T>]) {
    for op in ops {
        op.apply(target);
    }
}
