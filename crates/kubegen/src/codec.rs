//! Decoding manifest files into [`Manifest`]s and encoding them back into their canonical text.
//!
//! The canonical form is the typed object serialized through [`serde`], sanitized (see
//! [`Value::sanitize`]) and emitted with sorted mapping keys. Encoding an already canonical file
//! reproduces it byte for byte, so files only change when their content does.
use snafu::{OptionExt, ResultExt, Snafu};

use crate::{document::Value, manifest::Manifest};

/// The file extension of manifest files.
pub const MANIFEST_EXTENSION: &str = "yaml";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse manifest as YAML"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display("manifest is missing the {field:?} field"))]
    MissingTypeInformation { field: &'static str },

    #[snafu(display("unsupported manifest kind {kind:?} in apiVersion {api_version:?}"))]
    UnknownKind { api_version: String, kind: String },

    #[snafu(display("failed to deserialize manifest of kind {kind:?}"))]
    DeserializeManifest {
        source: serde_yaml::Error,
        kind: String,
    },

    #[snafu(display("failed to serialize {kind} object"))]
    SerializeManifest {
        source: serde_yaml::Error,
        kind: &'static str,
    },

    #[snafu(display("failed to convert serialized {kind} object into a document"))]
    ConvertDocument {
        source: crate::document::Error,
        kind: &'static str,
    },

    #[snafu(display("failed to serialize sanitized document"))]
    SerializeDocument { source: crate::document::Error },
}

/// Decodes one manifest document into its typed representation.
///
/// The `apiVersion` and `kind` fields select the target type, which then enforces its own
/// schema during deserialization.
pub fn decode(bytes: &[u8]) -> Result<Manifest> {
    let value: serde_yaml::Value = serde_yaml::from_slice(bytes).context(ParseYamlSnafu)?;

    let api_version = type_field(&value, "apiVersion")?;
    let kind = type_field(&value, "kind")?;

    Manifest::from_typed_value(&api_version, &kind, value)
        .context(UnknownKindSnafu {
            api_version,
            kind: &kind,
        })?
        .context(DeserializeManifestSnafu { kind })
}

fn type_field(value: &serde_yaml::Value, field: &'static str) -> Result<String> {
    value
        .get(field)
        .and_then(serde_yaml::Value::as_str)
        .map(ToOwned::to_owned)
        .context(MissingTypeInformationSnafu { field })
}

/// Encodes a manifest into its canonical text.
pub fn encode(manifest: &Manifest) -> Result<String> {
    let document = to_document(manifest)?;
    document.to_yaml_string().context(SerializeDocumentSnafu)
}

/// Serializes a manifest into a sanitized [`Value`] tree.
pub fn to_document(manifest: &Manifest) -> Result<Value> {
    let kind = manifest.kind();
    let typed = manifest
        .to_typed_value()
        .context(SerializeManifestSnafu { kind })?;

    let mut document = Value::try_from(typed).context(ConvertDocumentSnafu { kind })?;
    document.sanitize();
    Ok(document)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
    use rstest::rstest;

    use super::*;
    use crate::manifest::ManifestKind;

    const DEPLOYMENT: &str = indoc! {"
        apiVersion: apps/v1
        kind: Deployment
        metadata:
          creationTimestamp: null
          name: web
          labels:
            app: web
        spec:
          replicas: 2
          selector:
            matchLabels:
              app: web
          template:
            metadata:
              creationTimestamp: null
              labels:
                app: web
            spec:
              containers:
              - name: web
                image: nginx
                resources: {}
                env:
                - name: B
                  value: two
                - name: A
                  value: one
        status:
          replicas: 2
          readyReplicas: 2
    "};

    #[test]
    fn decodes_by_kind() {
        let manifest = decode(DEPLOYMENT.as_bytes()).expect("deployment decodes");
        assert_eq!(manifest.kind(), "Deployment");

        let deployment = Deployment::from_manifest(&manifest).expect("manifest is a deployment");
        assert_eq!(deployment.metadata.name.as_deref(), Some("web"));
        assert_eq!(
            deployment.spec.as_ref().and_then(|spec| spec.replicas),
            Some(2)
        );
    }

    #[test]
    fn encode_strips_server_fields_and_sorts_keys() {
        let manifest = decode(DEPLOYMENT.as_bytes()).expect("deployment decodes");
        let encoded = encode(&manifest).expect("deployment encodes");

        assert_eq!(
            encoded,
            indoc! {"
                apiVersion: apps/v1
                kind: Deployment
                metadata:
                  labels:
                    app: web
                  name: web
                spec:
                  replicas: 2
                  selector:
                    matchLabels:
                      app: web
                  template:
                    metadata:
                      labels:
                        app: web
                    spec:
                      containers:
                      - env:
                        - name: B
                          value: two
                        - name: A
                          value: one
                        image: nginx
                        name: web
            "}
        );
    }

    #[test]
    fn canonical_output_is_stable() {
        let first = encode(&decode(DEPLOYMENT.as_bytes()).expect("deployment decodes"))
            .expect("deployment encodes");
        let second =
            encode(&decode(first.as_bytes()).expect("canonical text decodes")).expect("encodes");
        assert_eq!(first, second);
    }

    #[test]
    fn encodes_config_map() {
        let manifest: Manifest = ConfigMap {
            data: Some([("key".to_owned(), "value".to_owned())].into()),
            ..crate::builder::config_map("settings")
        }
        .into();

        assert_eq!(
            encode(&manifest).expect("config map encodes"),
            indoc! {"
                apiVersion: v1
                data:
                  key: value
                kind: ConfigMap
                metadata:
                  name: settings
            "}
        );
    }

    #[test]
    fn encodes_empty_deployment() {
        let manifest = Manifest::from(Deployment::default());
        assert_eq!(
            encode(&manifest).expect("deployment encodes"),
            "apiVersion: apps/v1\nkind: Deployment\nmetadata: {}\n"
        );
    }

    #[rstest]
    #[case::unknown_kind("apiVersion: v1\nkind: Widget\n", "UnknownKind")]
    #[case::wrong_group("apiVersion: v1\nkind: Deployment\n", "UnknownKind")]
    #[case::missing_kind("apiVersion: v1\nmetadata: {}\n", "MissingTypeInformation")]
    #[case::missing_api_version("kind: Secret\n", "MissingTypeInformation")]
    #[case::null_document("~\n", "MissingTypeInformation")]
    #[case::malformed("kind: [unclosed\n", "ParseYaml")]
    #[case::two_documents("kind: Secret\n---\nkind: Secret\n", "ParseYaml")]
    #[case::schema_violation(
        "apiVersion: v1\nkind: ConfigMap\nmetadata: {name: [not, a, string]}\n",
        "DeserializeManifest"
    )]
    fn decode_failures(#[case] input: &str, #[case] expected: &str) {
        let error = decode(input.as_bytes()).expect_err("input must not decode");
        let variant = match error {
            Error::ParseYaml { .. } => "ParseYaml",
            Error::MissingTypeInformation { .. } => "MissingTypeInformation",
            Error::UnknownKind { .. } => "UnknownKind",
            Error::DeserializeManifest { .. } => "DeserializeManifest",
            _ => "other",
        };
        assert_eq!(variant, expected, "unexpected error: {error}");
    }
}
