//! Operators on a single [`Container`].
//!
//! Every operator which touches the environment leaves `env` sorted by variable name, using a
//! stable sort so variables sharing a name keep their relative order.
use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{
        Container, ContainerPort, EnvVar, EnvVarSource, ObjectFieldSelector, Probe,
        ResourceRequirements, SecretKeySelector, VolumeMount,
    },
    apimachinery::pkg::api::resource::Quantity,
};

use crate::ops::Op;

pub type ContainerOp = Op<Container>;
pub type VolumeMountOp = Op<VolumeMount>;

pub fn image(image: impl Into<String>) -> ContainerOp {
    let image = image.into();
    Op::new(move |container: &mut Container| container.image = Some(image.clone()))
}

pub fn command<I, S>(command: I) -> ContainerOp
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let command: Vec<String> = command.into_iter().map(Into::into).collect();
    Op::new(move |container: &mut Container| container.command = Some(command.clone()))
}

pub fn args<I, S>(args: I) -> ContainerOp
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    Op::new(move |container: &mut Container| container.args = Some(args.clone()))
}

/// Sets the value of every variable in `vars` which the container already defines.
///
/// Variables the container doesn't define yet are only added when `add_if_absent` is set. An
/// empty value is stored as an unset value, use [`env_allow_empty`] to persist an empty string.
pub fn env<I, K, V>(vars: I, add_if_absent: bool) -> ContainerOp
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: Vec<(String, String)> = vars
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect();

    Op::new(move |container: &mut Container| {
        let env = container.env.get_or_insert_with(Vec::new);
        for (name, value) in &vars {
            let mut exists = false;
            for var in env.iter_mut().filter(|var| &var.name == name) {
                var.value = non_empty(value);
                var.value_from = None;
                exists = true;
            }

            if !exists && add_if_absent {
                env.push(EnvVar {
                    name: name.clone(),
                    value: non_empty(value),
                    ..EnvVar::default()
                });
            }
        }
        normalize_env(container);
    })
}

/// Appends a variable with `value`, even if it is empty.
///
/// This operator is not idempotent: every application appends another entry, also when a
/// variable called `name` already exists.
pub fn env_allow_empty(name: impl Into<String>, value: impl Into<String>) -> ContainerOp {
    let var = EnvVar {
        name: name.into(),
        value: Some(value.into()),
        ..EnvVar::default()
    };

    Op::new(move |container: &mut Container| {
        container
            .env
            .get_or_insert_with(Vec::new)
            .push(var.clone());
        normalize_env(container);
    })
}

/// Sources the variable `name` from `source`, replacing a plain value if there is one.
pub fn env_var_from(name: impl Into<String>, source: EnvVarSource) -> ContainerOp {
    let name = name.into();

    Op::new(move |container: &mut Container| {
        let env = container.env.get_or_insert_with(Vec::new);
        let mut exists = false;
        for var in env.iter_mut().filter(|var| var.name == name) {
            var.value = None;
            var.value_from = Some(source.clone());
            exists = true;
        }

        if !exists {
            env.push(EnvVar {
                name: name.clone(),
                value_from: Some(source.clone()),
                ..EnvVar::default()
            });
        }
        normalize_env(container);
    })
}

pub fn env_var_from_secret(
    env_var_name: impl Into<String>,
    secret_name: impl Into<String>,
    secret_key: impl Into<String>,
    optional: bool,
) -> ContainerOp {
    env_var_from(
        env_var_name,
        EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret_name.into(),
                key: secret_key.into(),
                optional: Some(optional),
            }),
            ..EnvVarSource::default()
        },
    )
}

/// Sources the variable `name` from a field of the pod, e.g. `metadata.name`.
pub fn env_var_from_field_path(
    name: impl Into<String>,
    field_path: impl Into<String>,
) -> ContainerOp {
    env_var_from(
        name,
        EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.into(),
                ..ObjectFieldSelector::default()
            }),
            ..EnvVarSource::default()
        },
    )
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

fn normalize_env(container: &mut Container) {
    if let Some(env) = &mut container.env {
        env.sort_by(|a, b| a.name.cmp(&b.name));
        if env.is_empty() {
            container.env = None;
        }
    }
}

/// Replaces the CPU and memory requests of the container.
pub fn resource_requests(cpu: impl Into<String>, memory: impl Into<String>) -> ContainerOp {
    let requests = cpu_and_memory(cpu.into(), memory.into());
    Op::new(move |container: &mut Container| {
        resources(container).requests = Some(requests.clone());
    })
}

/// Replaces the CPU and memory limits of the container.
pub fn resource_limits(cpu: impl Into<String>, memory: impl Into<String>) -> ContainerOp {
    let limits = cpu_and_memory(cpu.into(), memory.into());
    Op::new(move |container: &mut Container| {
        resources(container).limits = Some(limits.clone());
    })
}

fn cpu_and_memory(cpu: String, memory: String) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_owned(), Quantity(cpu)),
        ("memory".to_owned(), Quantity(memory)),
    ])
}

fn resources(container: &mut Container) -> &mut ResourceRequirements {
    container.resources.get_or_insert_with(ResourceRequirements::default)
}

/// Exposes `port` under `name`, updating the port number if the name is already in use.
pub fn container_port(name: impl Into<String>, port: i32) -> ContainerOp {
    let name = name.into();

    Op::new(move |container: &mut Container| {
        let ports = container.ports.get_or_insert_with(Vec::new);
        match ports
            .iter_mut()
            .find(|existing| existing.name.as_deref() == Some(name.as_str()))
        {
            Some(existing) => existing.container_port = port,
            None => ports.push(ContainerPort {
                name: Some(name.clone()),
                container_port: port,
                ..ContainerPort::default()
            }),
        }
    })
}

/// Finds the mount of volume `name`, creating it at `mount_path` if the container doesn't mount
/// the volume yet, and applies `ops` to it.
///
/// The mount path of an existing mount is left untouched.
pub fn volume_mount(
    name: impl Into<String>,
    mount_path: impl Into<String>,
    ops: Vec<VolumeMountOp>,
) -> ContainerOp {
    let name = name.into();
    let mount_path = mount_path.into();

    Op::new(move |container: &mut Container| {
        let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
        let index = match mounts.iter().position(|mount| mount.name == name) {
            Some(index) => index,
            None => {
                mounts.push(VolumeMount {
                    name: name.clone(),
                    mount_path: mount_path.clone(),
                    ..VolumeMount::default()
                });
                mounts.len() - 1
            }
        };

        for op in &ops {
            op.apply(&mut mounts[index]);
        }
    })
}

pub fn read_only() -> VolumeMountOp {
    Op::new(|mount: &mut VolumeMount| mount.read_only = Some(true))
}

pub fn sub_path(sub_path: impl Into<String>) -> VolumeMountOp {
    let sub_path = sub_path.into();
    Op::new(move |mount: &mut VolumeMount| mount.sub_path = Some(sub_path.clone()))
}

pub fn readiness_probe(probe: Probe) -> ContainerOp {
    Op::new(move |container: &mut Container| container.readiness_probe = Some(probe.clone()))
}

pub fn liveness_probe(probe: Probe) -> ContainerOp {
    Op::new(move |container: &mut Container| container.liveness_probe = Some(probe.clone()))
}
