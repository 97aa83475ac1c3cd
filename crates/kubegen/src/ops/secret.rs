use k8s_openapi::{api::core::v1::Secret, apimachinery::pkg::apis::meta::v1::ObjectMeta};

use crate::ops::{Op, meta::collect};

pub type SecretOp = Op<Secret>;

/// Merges `data` into the plain text `stringData` of the secret.
pub fn secret_data<I, K, V>(data: I) -> SecretOp
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let data = collect(data);
    Op::new(move |secret: &mut Secret| {
        secret
            .string_data
            .get_or_insert_default()
            .extend(data.clone());
    })
}

/// Sets the secret type, e.g. `kubernetes.io/tls`.
pub fn secret_type(type_: impl Into<String>) -> SecretOp {
    let type_ = type_.into();
    Op::new(move |secret: &mut Secret| secret.type_ = Some(type_.clone()))
}

/// Replaces the whole metadata of the secret, including its name.
pub fn secret_meta(metadata: ObjectMeta) -> SecretOp {
    Op::new(move |secret: &mut Secret| secret.metadata = metadata.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder, ops::apply_all};

    #[test]
    fn merges_string_data() {
        let mut secret = builder::secret("credentials");
        apply_all(
            &mut secret,
            &[
                secret_data([("user", "admin"), ("password", "changeme")]),
                secret_data([("password", "hunter2")]),
                secret_type("Opaque"),
            ],
        );

        assert_eq!(
            secret.string_data,
            Some(collect([("password", "hunter2"), ("user", "admin")]))
        );
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
    }

    #[test]
    fn secret_meta_replaces_metadata() {
        let mut secret = builder::secret("credentials");
        secret_meta(ObjectMeta {
            namespace: Some("prod".to_owned()),
            ..builder::metadata("db-credentials")
        })
        .apply(&mut secret);

        assert_eq!(secret.metadata.name.as_deref(), Some("db-credentials"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("prod"));
    }
}
