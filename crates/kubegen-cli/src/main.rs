use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use kubegen::{
    cli::ClusterOptions,
    cluster::{self, Cluster},
    document::{self, Value},
    k8s_openapi::api::{
        apps::v1::{DaemonSet, Deployment, StatefulSet},
        core::v1::Secret,
    },
    logging,
    ops::{Op, container, pod, secret, workload},
};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitializeLogging { source: logging::Error },

    #[snafu(display("failed to load manifests"))]
    LoadCluster { source: cluster::Error },

    #[snafu(display("failed to select {kind} {name:?}"))]
    Select {
        source: cluster::Error,
        kind: String,
        name: String,
    },

    #[snafu(display("failed to write manifests"))]
    WriteCluster { source: cluster::Error },

    #[snafu(display("failed to read YAML fragment"))]
    ReadFragment { source: document::Error },

    #[snafu(display("failed to render merged document"))]
    RenderDocument { source: document::Error },
}

/// Edit a directory of Kubernetes manifests in place.
#[derive(Debug, Parser)]
#[command(name = "kubegen", version, about)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rewrite every manifest in its canonical form.
    Fmt {
        #[command(flatten)]
        cluster: ClusterOptions,
    },

    /// Deep merge YAML fragments from left to right and print the result.
    Merge {
        /// Print the result as JSON instead of YAML.
        #[arg(long)]
        json: bool,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Set the number of replicas of a workload.
    Scale {
        #[command(flatten)]
        cluster: ClusterOptions,

        #[arg(long, value_enum)]
        kind: ReplicatedKind,

        /// The name of the workload, `*` selects all of them.
        #[arg(long)]
        name: String,

        #[arg(long)]
        replicas: i32,
    },

    /// Set environment variables of the containers of a workload.
    SetEnv {
        #[command(flatten)]
        cluster: ClusterOptions,

        #[arg(long, value_enum)]
        kind: WorkloadKind,

        /// The name of the workload, `*` selects all of them.
        #[arg(long)]
        name: String,

        /// The container to change. All containers are changed if omitted.
        #[arg(long, default_value = "")]
        container: String,

        /// Add variables which the container doesn't define yet.
        #[arg(long)]
        add: bool,

        #[arg(value_parser = parse_key_value, required = true)]
        vars: Vec<(String, String)>,
    },

    /// Create a secret, or add data to an existing one.
    CreateSecret {
        #[command(flatten)]
        cluster: ClusterOptions,

        #[arg(long)]
        name: String,

        #[arg(value_parser = parse_key_value)]
        data: Vec<(String, String)>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum, strum::Display)]
enum ReplicatedKind {
    Deployment,
    #[value(name = "statefulset")]
    StatefulSet,
}

#[derive(Clone, Copy, Debug, ValueEnum, strum::Display)]
enum WorkloadKind {
    Deployment,
    #[value(name = "statefulset")]
    StatefulSet,
    #[value(name = "daemonset")]
    DaemonSet,
}

fn parse_key_value(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {input:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {input:?}"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

/// Selects the objects called `name` and applies `ops`, logging how many were changed.
fn apply<T: kubegen::ManifestKind>(
    cluster: &mut Cluster,
    name: &str,
    ops: &[Op<T>],
) -> Result<(), Error> {
    let changed = cluster.apply(&[name], ops).context(SelectSnafu {
        kind: T::KIND,
        name,
    })?;
    if changed == 0 {
        tracing::warn!(kind = T::KIND, name, "no matching object found");
    } else {
        tracing::info!(kind = T::KIND, name, changed, "applied changes");
    }
    Ok(())
}

fn modify(
    options: &ClusterOptions,
    callback: impl FnOnce(&mut Cluster) -> Result<(), Error>,
) -> Result<(), Error> {
    let mut cluster = options.load().context(LoadClusterSnafu)?;
    callback(&mut cluster)?;
    cluster.write().context(WriteClusterSnafu)
}

#[snafu::report]
fn main() -> Result<(), Error> {
    logging::initialize_logging("KUBEGEN_LOG", "kubegen").context(InitializeLoggingSnafu)?;
    let opts = Opts::parse();

    match opts.command {
        Command::Fmt { cluster: options } => modify(&options, |_| Ok(())),
        Command::Merge { json, files } => {
            let mut merged = Value::default();
            for file in files {
                merged.merge(&document::read_yaml(file).context(ReadFragmentSnafu)?);
            }

            let rendered = if json {
                merged.to_json_string()
            } else {
                merged.to_yaml_string()
            }
            .context(RenderDocumentSnafu)?;
            println!("{}", rendered.trim_end());
            Ok(())
        }
        Command::Scale {
            cluster: options,
            kind,
            name,
            replicas,
        } => {
            tracing::debug!(%kind, %name, replicas, "scaling workload");
            modify(&options, |cluster| match kind {
                ReplicatedKind::Deployment => {
                    apply::<Deployment>(cluster, &name, &[workload::replicas(replicas)])
                }
                ReplicatedKind::StatefulSet => {
                    apply::<StatefulSet>(cluster, &name, &[workload::replicas(replicas)])
                }
            })
        }
        Command::SetEnv {
            cluster: options,
            kind,
            name,
            container: container_name,
            add,
            vars,
        } => {
            tracing::debug!(%kind, %name, container = %container_name, "setting environment");
            let set_env = || {
                vec![pod::container(
                    container_name.clone(),
                    vec![container::env(vars.clone(), add)],
                )]
            };
            modify(&options, |cluster| match kind {
                WorkloadKind::Deployment => {
                    apply::<Deployment>(cluster, &name, &[workload::pod(set_env())])
                }
                WorkloadKind::StatefulSet => {
                    apply::<StatefulSet>(cluster, &name, &[workload::pod(set_env())])
                }
                WorkloadKind::DaemonSet => {
                    apply::<DaemonSet>(cluster, &name, &[workload::pod(set_env())])
                }
            })
        }
        Command::CreateSecret {
            cluster: options,
            name,
            data,
        } => modify(&options, |cluster| {
            apply::<Secret>(cluster, &name, &[secret::secret_data(data)])
        }),
    }
}
