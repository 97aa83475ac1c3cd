use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{Service, ServiceSpec},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};

use crate::{
    builder::workload::{APP_LABEL, GROUP_LABEL},
    ops::{
        Op, apply_all,
        service::{headless, selector},
    },
};

/// A [`service_for_app`] selecting the pods of the app called `name`.
pub fn service(name: impl Into<String>, ops: &[Op<Service>]) -> Service {
    let name = name.into();
    service_for_app(name.clone(), name, ops)
}

/// A `ClusterIP` service called `name` which selects the pods labeled `app: <app>`.
pub fn service_for_app(
    name: impl Into<String>,
    app: impl Into<String>,
    ops: &[Op<Service>],
) -> Service {
    let app_labels = BTreeMap::from([(APP_LABEL.to_owned(), app.into())]);

    let mut service = Service {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(app_labels.clone()),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_owned()),
            selector: Some(app_labels),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    };

    apply_all(&mut service, ops);
    service
}

/// A headless service over the pods labeled `group: <group>`.
///
/// The service hints the scheduler to place pods of one group on different nodes.
pub fn grouped_service(group: impl Into<String>) -> Service {
    let group = group.into();
    service(
        group.clone(),
        &[
            headless(),
            selector([(GROUP_LABEL, group)]),
        ],
    )
}
