//! Operators on workloads, the resources which run pods from a template.
use k8s_openapi::api::{
    apps::v1::{DaemonSet, Deployment, StatefulSet},
    core::v1::{PodSpec, PodTemplateSpec},
};

use crate::{
    manifest::ManifestKind,
    ops::{Op, apply_all, meta::collect, pod::PodSpecOp},
};

/// A resource which runs pods from a [`PodTemplateSpec`].
pub trait Workload: ManifestKind {
    /// The pod template, created empty if the workload has no spec yet.
    fn pod_template_mut(&mut self) -> &mut PodTemplateSpec;

    fn pod_spec_mut(&mut self) -> &mut PodSpec {
        self.pod_template_mut().spec.get_or_insert_default()
    }
}

/// A [`Workload`] with a configurable number of replicas.
pub trait Replicated: Workload {
    fn replicas_mut(&mut self) -> &mut Option<i32>;
}

impl Workload for Deployment {
    fn pod_template_mut(&mut self) -> &mut PodTemplateSpec {
        &mut self.spec.get_or_insert_default().template
    }
}

impl Replicated for Deployment {
    fn replicas_mut(&mut self) -> &mut Option<i32> {
        &mut self.spec.get_or_insert_default().replicas
    }
}

impl Workload for StatefulSet {
    fn pod_template_mut(&mut self) -> &mut PodTemplateSpec {
        &mut self.spec.get_or_insert_default().template
    }
}

impl Replicated for StatefulSet {
    fn replicas_mut(&mut self) -> &mut Option<i32> {
        &mut self.spec.get_or_insert_default().replicas
    }
}

impl Workload for DaemonSet {
    fn pod_template_mut(&mut self) -> &mut PodTemplateSpec {
        &mut self.spec.get_or_insert_default().template
    }
}

pub fn replicas<T: Replicated>(count: i32) -> Op<T> {
    Op::new(move |workload: &mut T| *workload.replicas_mut() = Some(count))
}

/// Applies `ops` to the pod spec of the workload.
pub fn pod<T: Workload>(ops: Vec<PodSpecOp>) -> Op<T> {
    Op::new(move |workload: &mut T| apply_all(workload.pod_spec_mut(), &ops))
}

/// Merges `labels` into the labels of the pod template.
pub fn pod_labels<T, I, K, V>(labels: I) -> Op<T>
where
    T: Workload,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let labels = collect(labels);
    Op::new(move |workload: &mut T| {
        workload
            .pod_template_mut()
            .metadata
            .get_or_insert_default()
            .labels
            .get_or_insert_default()
            .extend(labels.clone());
    })
}
