//! Operators on a [`Service`].
//!
//! Ports are identified by name: adding a port whose name is already in use replaces that port.
use k8s_openapi::{
    api::core::v1::{Service, ServicePort, ServiceSpec},
    apimachinery::pkg::util::intstr::IntOrString,
};

use crate::ops::{Op, meta::collect};

pub type ServiceOp = Op<Service>;

const SCRAPE_ANNOTATION: &str = "prometheus.io/scrape";
const PORT_ANNOTATION: &str = "prometheus.io/port";
const PATH_ANNOTATION: &str = "prometheus.io/path";

const HEADLESS_PORT_NAME: &str = "unused";
const HEADLESS_PORT: i32 = 10811;

/// Exposes `port`, forwarding to the container port called `name`.
pub fn service_port(name: impl Into<String>, port: i32) -> ServiceOp {
    let name = name.into();
    let port = ServicePort {
        target_port: Some(IntOrString::String(name.clone())),
        ..named_port(name, port)
    };

    Op::new(move |service: &mut Service| upsert_port(spec(service), port.clone()))
}

/// Like [`service_port`], additionally exposing `port` on every node.
pub fn node_port(name: impl Into<String>, port: i32) -> ServiceOp {
    let name = name.into();
    let port = ServicePort {
        node_port: Some(port),
        target_port: Some(IntOrString::String(name.clone())),
        ..named_port(name, port)
    };

    Op::new(move |service: &mut Service| {
        let spec = spec(service);
        spec.type_ = Some("NodePort".to_owned());
        upsert_port(spec, port.clone());
    })
}

/// Annotates the service so its endpoints are scraped for metrics on `port`.
pub fn metrics_port(port: i32) -> ServiceOp {
    metrics_annotations(port, None)
}

pub fn metrics_port_with_path(port: i32, path: impl Into<String>) -> ServiceOp {
    metrics_annotations(port, Some(path.into()))
}

fn metrics_annotations(port: i32, path: Option<String>) -> ServiceOp {
    let mut annotations = collect([
        (SCRAPE_ANNOTATION, "true".to_owned()),
        (PORT_ANNOTATION, port.to_string()),
    ]);
    if let Some(path) = path {
        annotations.insert(PATH_ANNOTATION.to_owned(), path);
    }

    Op::new(move |service: &mut Service| {
        service
            .metadata
            .annotations
            .get_or_insert_default()
            .extend(annotations.clone());
    })
}

/// Turns the service into a load balancer on the static address `ip`.
pub fn public_ip(ip: impl Into<String>) -> ServiceOp {
    let ip = ip.into();
    Op::new(move |service: &mut Service| {
        let spec = spec(service);
        spec.type_ = Some("LoadBalancer".to_owned());
        spec.load_balancer_ip = Some(ip.clone());
    })
}

/// Removes the cluster IP of the service.
///
/// A placeholder port is added, since a service needs at least one port.
pub fn headless() -> ServiceOp {
    Op::new(|service: &mut Service| {
        let spec = spec(service);
        spec.cluster_ip = Some("None".to_owned());
        upsert_port(
            spec,
            ServicePort {
                target_port: Some(IntOrString::Int(HEADLESS_PORT)),
                ..named_port(HEADLESS_PORT_NAME.to_owned(), HEADLESS_PORT)
            },
        );
    })
}

/// Replaces both the labels and the pod selector of the service with `labels`.
pub fn selector<I, K, V>(labels: I) -> ServiceOp
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let labels = collect(labels);
    Op::new(move |service: &mut Service| {
        service.metadata.labels = Some(labels.clone());
        spec(service).selector = Some(labels.clone());
    })
}

fn spec(service: &mut Service) -> &mut ServiceSpec {
    service.spec.get_or_insert_default()
}

fn named_port(name: String, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name),
        port,
        ..ServicePort::default()
    }
}

fn upsert_port(spec: &mut ServiceSpec, port: ServicePort) {
    let ports = spec.ports.get_or_insert_with(Vec::new);
    match ports.iter_mut().find(|existing| existing.name == port.name) {
        Some(existing) => *existing = port,
        None => ports.push(port),
    }
}
