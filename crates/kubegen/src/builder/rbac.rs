use k8s_openapi::api::{
    core::v1::ServiceAccount,
    rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject},
};

use crate::builder::metadata;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
const SERVICE_ACCOUNT_KIND: &str = "ServiceAccount";

pub fn service_account(name: impl Into<String>) -> ServiceAccount {
    ServiceAccount {
        metadata: metadata(name),
        ..ServiceAccount::default()
    }
}

pub fn role(name: impl Into<String>, rules: Vec<PolicyRule>) -> Role {
    Role {
        metadata: metadata(name),
        rules: Some(rules),
    }
}

pub fn cluster_role(name: impl Into<String>, rules: Vec<PolicyRule>) -> ClusterRole {
    ClusterRole {
        metadata: metadata(name),
        rules: Some(rules),
        ..ClusterRole::default()
    }
}

/// Binds the role `role` to the service account `name`. The binding is called `name` as well.
pub fn role_binding_for_service_account(
    name: impl Into<String>,
    role: impl Into<String>,
) -> RoleBinding {
    let name = name.into();
    RoleBinding {
        metadata: metadata(name.clone()),
        role_ref: role_ref("Role", role.into()),
        subjects: Some(vec![Subject {
            kind: SERVICE_ACCOUNT_KIND.to_owned(),
            name,
            ..Subject::default()
        }]),
    }
}

/// Binds the cluster role `role` to the service account `name` in `namespace`.
///
/// Cluster role bindings are not namespaced, so the binding is called `<namespace>-<name>`.
pub fn cluster_role_binding_for_service_account(
    namespace: impl Into<String>,
    name: impl Into<String>,
    role: impl Into<String>,
) -> ClusterRoleBinding {
    let namespace = namespace.into();
    let name = name.into();
    ClusterRoleBinding {
        metadata: metadata(format!("{namespace}-{name}")),
        role_ref: role_ref("ClusterRole", role.into()),
        subjects: Some(vec![Subject {
            kind: SERVICE_ACCOUNT_KIND.to_owned(),
            name,
            namespace: Some(namespace),
            ..Subject::default()
        }]),
    }
}

fn role_ref(kind: &str, name: String) -> RoleRef {
    RoleRef {
        api_group: RBAC_API_GROUP.to_owned(),
        kind: kind.to_owned(),
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_role_binding_is_prefixed_with_namespace() {
        let binding = cluster_role_binding_for_service_account("monitoring", "agent", "reader");

        assert_eq!(binding.metadata.name.as_deref(), Some("monitoring-agent"));
        assert_eq!(binding.role_ref.kind, "ClusterRole");
        assert_eq!(binding.role_ref.name, "reader");

        let subjects = binding.subjects.expect("subjects are set");
        assert_eq!(subjects[0].name, "agent");
        assert_eq!(subjects[0].namespace.as_deref(), Some("monitoring"));
    }

    #[test]
    fn role_binding_uses_account_name() {
        let binding = role_binding_for_service_account("deployer", "edit");

        assert_eq!(binding.metadata.name.as_deref(), Some("deployer"));
        assert_eq!(binding.role_ref.kind, "Role");
        assert_eq!(
            binding.subjects.expect("subjects are set")[0].kind,
            SERVICE_ACCOUNT_KIND
        );
    }
}
