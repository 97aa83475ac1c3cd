//! This module provides builders for objects which don't exist in the manifest directory yet.
//!
//! They are not _pure_ builders but fill in the defaults the rest of the directory expects, e.g.
//! the `app` label on deployments and services. Built objects are added to a
//! [`Cluster`](crate::cluster::Cluster) with [`Cluster::create`](crate::cluster::Cluster::create).
use k8s_openapi::{
    api::core::v1::{ConfigMap, PodSpec, Secret},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};

use crate::ops::{apply_all, pod::PodSpecOp};

pub mod rbac;
pub mod service;
pub mod volume;
pub mod workload;

pub use rbac::{
    cluster_role, cluster_role_binding_for_service_account, role,
    role_binding_for_service_account, service_account,
};
pub use service::{grouped_service, service, service_for_app};
pub use volume::{VolumeBuilder, fixed_volume, volume_claim};
pub use workload::{deployment, grouped_deployment};

/// Metadata carrying nothing but `name`.
pub fn metadata(name: impl Into<String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        ..ObjectMeta::default()
    }
}

/// An empty secret called `name`.
pub fn secret(name: impl Into<String>) -> Secret {
    Secret {
        metadata: metadata(name),
        ..Secret::default()
    }
}

pub fn config_map(name: impl Into<String>) -> ConfigMap {
    ConfigMap {
        metadata: metadata(name),
        ..ConfigMap::default()
    }
}

/// Builds a pod spec by applying `ops` to an empty one.
pub fn pod_spec(ops: &[PodSpecOp]) -> PodSpec {
    let mut pod = PodSpec::default();
    apply_all(&mut pod, ops);
    pod
}
