use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment},
        core::v1::{PodSpec, PodTemplateSpec},
    },
    apimachinery::pkg::{
        apis::meta::v1::{LabelSelector, ObjectMeta},
        util::intstr::IntOrString,
    },
};

use crate::ops::{Op, apply_all};

pub const APP_LABEL: &str = "app";
pub const GROUP_LABEL: &str = "group";
pub const DESCRIPTION_ANNOTATION: &str = "description";

/// A single replica deployment of `pod_spec`, labeled `app: <name>`.
///
/// Pods which only mount config maps are rolled out without downtime (no pod may be
/// unavailable). Any other volume allows one unavailable pod, so the volume can be remounted on
/// the new node.
pub fn deployment(
    name: impl Into<String>,
    description: impl Into<String>,
    pod_spec: PodSpec,
    ops: &[Op<Deployment>],
) -> Deployment {
    let name = name.into();
    let stateless = pod_spec
        .volumes
        .iter()
        .flatten()
        .all(|volume| volume.config_map.is_some());
    let app_labels = BTreeMap::from([(APP_LABEL.to_owned(), name.clone())]);

    let mut deployment = Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            annotations: Some(
                [(DESCRIPTION_ANNOTATION.to_owned(), description.into())].into(),
            ),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            revision_history_limit: Some(10),
            min_ready_seconds: Some(10),
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_owned()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_unavailable: Some(IntOrString::Int(if stateless { 0 } else { 1 })),
                    max_surge: Some(IntOrString::Int(1)),
                }),
            }),
            selector: LabelSelector {
                match_labels: Some(app_labels.clone()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(app_labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(pod_spec),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    };

    apply_all(&mut deployment, ops);
    deployment
}

/// A [`deployment`] whose pods also carry the label `group: <group>`.
///
/// Pods of one group are meant to be spread across nodes, see
/// [`grouped_service`](crate::builder::service::grouped_service).
pub fn grouped_deployment(
    group: impl Into<String>,
    name: impl Into<String>,
    description: impl Into<String>,
    pod_spec: PodSpec,
) -> Deployment {
    let mut deployment = deployment(name, description, pod_spec, &[]);
    if let Some(spec) = &mut deployment.spec {
        spec.template
            .metadata
            .get_or_insert_default()
            .labels
            .get_or_insert_default()
            .insert(GROUP_LABEL.to_owned(), group.into());
    }
    deployment
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        builder::pod_spec,
        ops::{pod, pod::PodSpecOp, workload},
    };

    fn max_unavailable(deployment: &Deployment) -> Option<&IntOrString> {
        deployment
            .spec
            .as_ref()?
            .strategy
            .as_ref()?
            .rolling_update
            .as_ref()?
            .max_unavailable
            .as_ref()
    }

    #[rstest]
    #[case::no_volumes(vec![], 0)]
    #[case::config_maps_only(vec![pod::config_map_volume("config", "settings")], 0)]
    #[case::claimed(
        vec![
            pod::config_map_volume("config", "settings"),
            pod::claimed_volume("data", "data-claim"),
        ],
        1
    )]
    #[case::secret(vec![pod::secret_volume("tls", "tls-cert")], 1)]
    fn rollout_depends_on_volumes(#[case] ops: Vec<PodSpecOp>, #[case] expected: i32) {
        let deployment = deployment("web", "Web frontend", pod_spec(&ops), &[]);
        assert_eq!(
            max_unavailable(&deployment),
            Some(&IntOrString::Int(expected))
        );
    }

    #[test]
    fn sets_defaults_and_applies_ops() {
        let deployment = deployment(
            "web",
            "Web frontend",
            PodSpec::default(),
            &[workload::replicas(3)],
        );

        assert_eq!(
            deployment
                .metadata
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get(DESCRIPTION_ANNOTATION))
                .map(String::as_str),
            Some("Web frontend")
        );

        let spec = deployment.spec.expect("spec is set");
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(spec.revision_history_limit, Some(10));
        assert_eq!(spec.min_ready_seconds, Some(10));
        assert_eq!(
            spec.selector.match_labels,
            Some([(APP_LABEL.to_owned(), "web".to_owned())].into())
        );
        assert_eq!(
            spec.template.metadata.and_then(|metadata| metadata.labels),
            Some([(APP_LABEL.to_owned(), "web".to_owned())].into())
        );
    }

    #[test]
    fn grouped_deployment_adds_group_label() {
        let deployment = grouped_deployment("cache", "redis-0", "Cache", PodSpec::default());
        let labels = deployment
            .spec
            .and_then(|spec| spec.template.metadata)
            .and_then(|metadata| metadata.labels)
            .expect("pod labels are set");

        assert_eq!(labels.get(APP_LABEL).map(String::as_str), Some("redis-0"));
        assert_eq!(labels.get(GROUP_LABEL).map(String::as_str), Some("cache"));
    }
}
