//! Operators on a [`PodSpec`].
use k8s_openapi::api::core::v1::{Container, PodSecurityContext, PodSpec, Volume};

use crate::{
    builder::volume::VolumeBuilder,
    ops::{Op, apply_all, container::ContainerOp, meta::collect},
};

pub type PodSpecOp = Op<PodSpec>;

/// Merges `selector` into the node selector of the pod.
pub fn node_selector<I, K, V>(selector: I) -> PodSpecOp
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let selector = collect(selector);
    Op::new(move |pod: &mut PodSpec| {
        pod.node_selector
            .get_or_insert_default()
            .extend(selector.clone());
    })
}

pub fn security_context(security_context: PodSecurityContext) -> PodSpecOp {
    Op::new(move |pod: &mut PodSpec| pod.security_context = Some(security_context.clone()))
}

/// Replaces the volume with the same name, or adds `volume` if the pod has no such volume.
pub fn volume(volume: Volume) -> PodSpecOp {
    Op::new(move |pod: &mut PodSpec| {
        let volumes = pod.volumes.get_or_insert_with(Vec::new);
        let mut found = false;
        for existing in volumes.iter_mut().filter(|existing| existing.name == volume.name) {
            *existing = volume.clone();
            found = true;
        }

        if !found {
            volumes.push(volume.clone());
        }
    })
}

pub fn claimed_volume(name: impl Into<String>, claim_name: impl Into<String>) -> PodSpecOp {
    volume(
        VolumeBuilder::new(name)
            .with_persistent_volume_claim(claim_name)
            .build(),
    )
}

pub fn secret_volume(name: impl Into<String>, secret_name: impl Into<String>) -> PodSpecOp {
    volume(VolumeBuilder::new(name).with_secret(secret_name).build())
}

pub fn config_map_volume(
    name: impl Into<String>,
    config_map_name: impl Into<String>,
) -> PodSpecOp {
    volume(VolumeBuilder::new(name).with_config_map(config_map_name).build())
}

/// Appends `volume` without looking for an existing volume of the same name.
///
/// This operator is not idempotent, every application adds another volume.
pub fn append_volume(volume: Volume) -> PodSpecOp {
    Op::new(move |pod: &mut PodSpec| {
        pod.volumes
            .get_or_insert_with(Vec::new)
            .push(volume.clone());
    })
}

pub fn termination_grace_period(seconds: i64) -> PodSpecOp {
    Op::new(move |pod: &mut PodSpec| pod.termination_grace_period_seconds = Some(seconds))
}

pub fn service_account(name: impl Into<String>) -> PodSpecOp {
    let name = name.into();
    Op::new(move |pod: &mut PodSpec| pod.service_account_name = Some(name.clone()))
}

/// Applies `ops` to the container called `name`.
///
/// An empty `name` applies `ops` to every existing container. A container which doesn't exist yet
/// is appended before `ops` are applied.
pub fn container(name: impl Into<String>, ops: Vec<ContainerOp>) -> PodSpecOp {
    let name = name.into();
    Op::new(move |pod: &mut PodSpec| {
        for container in select_containers(&mut pod.containers, &name) {
            apply_all(container, &ops);
        }
    })
}

/// Like [`container`], for the init containers of the pod.
pub fn init_container(name: impl Into<String>, ops: Vec<ContainerOp>) -> PodSpecOp {
    let name = name.into();
    Op::new(move |pod: &mut PodSpec| {
        let init_containers = pod.init_containers.get_or_insert_with(Vec::new);
        for container in select_containers(init_containers, &name) {
            apply_all(container, &ops);
        }

        if pod.init_containers.as_ref().is_some_and(Vec::is_empty) {
            pod.init_containers = None;
        }
    })
}

fn select_containers<'a>(containers: &'a mut Vec<Container>, name: &str) -> &'a mut [Container] {
    if name.is_empty() {
        return containers.as_mut_slice();
    }

    let index = match containers.iter().position(|container| container.name == name) {
        Some(index) => index,
        None => {
            containers.push(Container {
                name: name.to_owned(),
                ..Container::default()
            });
            containers.len() - 1
        }
    };
    &mut containers[index..=index]
}
