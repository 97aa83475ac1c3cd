//! The typed, kind discriminated representation of a single manifest file.
use k8s_openapi::{
    Metadata, Resource,
    api::{
        apps::v1::{DaemonSet, Deployment, StatefulSet},
        batch::v1::{CronJob, Job},
        core::v1::{
            ConfigMap, Namespace, PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service,
            ServiceAccount,
        },
        networking::v1::Ingress,
        policy::v1::PodDisruptionBudget,
        rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
        storage::v1::StorageClass,
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};

use crate::builder;

/// A kind which can be stored in a [`Manifest`] and selected from a
/// [`Cluster`](crate::cluster::Cluster).
pub trait ManifestKind:
    Resource + Metadata<Ty = ObjectMeta> + Into<Manifest> + Sized + 'static
{
    fn from_manifest(manifest: &Manifest) -> Option<&Self>;

    fn from_manifest_mut(manifest: &mut Manifest) -> Option<&mut Self>;

    /// Creates an empty object called `name` when a selection asks for a name which doesn't
    /// exist yet. Kinds which are never created implicitly return [`None`].
    fn materialize(name: &str) -> Option<Self>;
}

macro_rules! manifests {
    (@materialize $name:ident) => {{
        let _ = $name;
        None
    }};
    (@materialize $name:ident $constructor:path) => { Some($constructor($name)) };

    ($($variant:ident $(materialized by $constructor:path)?),* $(,)?) => {
        /// A decoded manifest. Each variant wraps the [`k8s_openapi`] type of the same name.
        #[derive(Clone, Debug, PartialEq)]
        pub enum Manifest {
            $($variant($variant),)*
        }

        impl Manifest {
            /// The `kind` of the wrapped object, e.g. `Deployment`.
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$variant as Resource>::KIND,)*
                }
            }

            /// The `apiVersion` of the wrapped object, e.g. `apps/v1`.
            pub fn api_version(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$variant as Resource>::API_VERSION,)*
                }
            }

            pub fn metadata(&self) -> &ObjectMeta {
                match self {
                    $(Self::$variant(object) => object.metadata(),)*
                }
            }

            pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
                match self {
                    $(Self::$variant(object) => object.metadata_mut(),)*
                }
            }

            /// Deserializes `value` into the type registered for `api_version` and `kind`.
            ///
            /// Returns [`None`] if no type is registered for the combination.
            pub(crate) fn from_typed_value(
                api_version: &str,
                kind: &str,
                value: serde_yaml::Value,
            ) -> Option<serde_yaml::Result<Self>> {
                $(
                    if api_version == <$variant as Resource>::API_VERSION
                        && kind == <$variant as Resource>::KIND
                    {
                        return Some(serde_yaml::from_value::<$variant>(value).map(Self::$variant));
                    }
                )*
                None
            }

            /// Serializes the wrapped object into its standard (typed) YAML form.
            pub(crate) fn to_typed_value(&self) -> serde_yaml::Result<serde_yaml::Value> {
                match self {
                    $(Self::$variant(object) => serde_yaml::to_value(object),)*
                }
            }
        }

        $(
            impl From<$variant> for Manifest {
                fn from(object: $variant) -> Self {
                    Self::$variant(object)
                }
            }

            impl ManifestKind for $variant {
                fn from_manifest(manifest: &Manifest) -> Option<&Self> {
                    match manifest {
                        Manifest::$variant(object) => Some(object),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_manifest_mut(manifest: &mut Manifest) -> Option<&mut Self> {
                    match manifest {
                        Manifest::$variant(object) => Some(object),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn materialize(name: &str) -> Option<Self> {
                    manifests!(@materialize name $($constructor)?)
                }
            }
        )*
    };
}

manifests! {
    ClusterRole,
    ClusterRoleBinding,
    ConfigMap,
    CronJob,
    DaemonSet,
    Deployment,
    Ingress,
    Job,
    Namespace,
    PersistentVolume,
    PersistentVolumeClaim,
    Pod,
    PodDisruptionBudget,
    Role,
    RoleBinding,
    Secret materialized by builder::secret,
    Service,
    ServiceAccount,
    StatefulSet,
    StorageClass,
}

impl Manifest {
    pub fn name(&self) -> Option<&str> {
        self.metadata().name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::ConfigMap;

    use super::*;

    #[test]
    fn reports_kind_and_api_version() {
        let manifest = Manifest::from(builder::config_map("settings"));
        assert_eq!(manifest.kind(), "ConfigMap");
        assert_eq!(manifest.api_version(), "v1");
        assert_eq!(manifest.name(), Some("settings"));

        let manifest = Manifest::from(Deployment::default());
        assert_eq!(manifest.kind(), "Deployment");
        assert_eq!(manifest.api_version(), "apps/v1");
        assert_eq!(manifest.name(), None);
    }

    #[test]
    fn only_secrets_materialize() {
        let secret = Secret::materialize("token").expect("secrets are materialized");
        assert_eq!(secret.metadata.name.as_deref(), Some("token"));
        assert!(ConfigMap::materialize("settings").is_none());
        assert!(Deployment::materialize("web").is_none());
    }

    #[test]
    fn downcasts_to_the_wrapped_kind() {
        let mut manifest = Manifest::from(builder::secret("token"));
        assert!(Secret::from_manifest(&manifest).is_some());
        assert!(ConfigMap::from_manifest(&manifest).is_none());

        if let Some(secret) = Secret::from_manifest_mut(&mut manifest) {
            secret.type_ = Some("Opaque".to_owned());
        }
        assert_eq!(
            Secret::from_manifest(&manifest).and_then(|s| s.type_.as_deref()),
            Some("Opaque")
        );
    }
}
