use std::{fs, path::Path};

use indoc::indoc;
use kubegen::{
    WILDCARD, builder,
    cluster::{self, Cluster},
    k8s_openapi::api::{apps::v1::StatefulSet, core::v1::PersistentVolumeClaim},
    modify_cluster,
    ops::{container, pod, pvc, secret, workload},
};
use tempfile::TempDir;

const DATABASE: &str = indoc! {"
    apiVersion: apps/v1
    kind: StatefulSet
    metadata:
      creationTimestamp: null
      name: db
      namespace: storage
    spec:
      selector:
        matchLabels:
          app: db
      serviceName: db
      template:
        metadata:
          creationTimestamp: null
          labels:
            app: db
        spec:
          containers:
          - env:
            - name: PGDATA
              value: /var/lib/postgresql/data
            image: postgres
            name: postgres
            resources: {}
      volumeClaimTemplates:
      - metadata:
          creationTimestamp: null
          name: data
        spec:
          accessModes:
          - ReadWriteOnce
          dataSource:
            kind: VolumeSnapshot
            name: nightly
          resources:
            requests:
              storage: 10Gi
        status:
          phase: Pending
    status:
      replicas: 0
      availableReplicas: 0
"};

const CLAIM: &str = indoc! {"
    apiVersion: v1
    kind: PersistentVolumeClaim
    metadata:
      name: uploads
    spec:
      accessModes:
      - ReadWriteOnce
      resources:
        requests:
          storage: 1Gi
"};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("fixture path has a parent"))
        .expect("fixture directory is created");
    fs::write(path, content).expect("fixture file is written");
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).expect("manifest is readable")
}

#[test]
fn canonicalizes_and_mutates_in_place() {
    let dir = TempDir::new().expect("temporary directory is created");
    let root = dir.path();
    write(root, "storage/db.yaml", DATABASE);
    write(root, "storage/uploads.yaml", CLAIM);

    modify_cluster(root, root.join("new"), |cluster| {
        cluster.stateful_sets(&["db"])?.apply(&[
            workload::replicas(1),
            workload::pod(vec![pod::container(
                "postgres",
                vec![
                    container::env_var_from_secret("POSTGRES_PASSWORD", "db", "password", false),
                    container::env([("PGDATA", "/data")], false),
                ],
            )]),
        ]);
        cluster
            .persistent_volume_claims(&[WILDCARD])?
            .apply(&[pvc::disk_size("5Gi")]);
        cluster
            .secrets(&["db"])?
            .apply(&[secret::secret_data([("password", "changeme")])]);
        Ok(())
    })
    .expect("cluster is modified");

    assert_eq!(
        read(root, "storage/db.yaml"),
        indoc! {"
            apiVersion: apps/v1
            kind: StatefulSet
            metadata:
              name: db
              namespace: storage
            spec:
              replicas: 1
              selector:
                matchLabels:
                  app: db
              serviceName: db
              template:
                metadata:
                  labels:
                    app: db
                spec:
                  containers:
                  - env:
                    - name: PGDATA
                      value: /data
                    - name: POSTGRES_PASSWORD
                      valueFrom:
                        secretKeyRef:
                          key: password
                          name: db
                          optional: false
                    image: postgres
                    name: postgres
              volumeClaimTemplates:
              - metadata:
                  name: data
                spec:
                  accessModes:
                  - ReadWriteOnce
                  resources:
                    requests:
                      storage: 10Gi
        "}
    );
    assert!(read(root, "storage/uploads.yaml").contains("storage: 5Gi"));
    assert_eq!(
        read(root, "new/db.Secret.yaml"),
        indoc! {"
            apiVersion: v1
            kind: Secret
            metadata:
              name: db
            stringData:
              password: changeme
        "}
    );
}

#[test]
fn rewriting_canonical_files_is_stable() {
    let dir = TempDir::new().expect("temporary directory is created");
    let root = dir.path();
    write(root, "db.yaml", DATABASE);

    modify_cluster(root, root.join("new"), |_| Ok(())).expect("first rewrite succeeds");
    let first = read(root, "db.yaml");
    modify_cluster(root, root.join("new"), |_| Ok(())).expect("second rewrite succeeds");

    assert_eq!(first, read(root, "db.yaml"));
    assert!(!first.contains("status"));
    assert!(!first.contains("creationTimestamp"));
    assert!(!first.contains("dataSource"));
}

#[test]
fn builder_objects_are_written_to_new_files_dir() {
    let dir = TempDir::new().expect("temporary directory is created");
    let root = dir.path();
    write(root, "uploads.yaml", CLAIM);

    let mut cluster = Cluster::load(root, root.join("generated")).expect("cluster loads");
    cluster
        .create(builder::fixed_volume("uploads-disk", "20Gi"))
        .expect("volume is created");
    cluster
        .create(builder::grouped_service("cache"))
        .expect("service is created");
    cluster.write().expect("cluster is written");

    assert!(root.join("generated/uploads-disk.PersistentVolume.yaml").is_file());
    assert!(root.join("generated/cache.Service.yaml").is_file());

    let reloaded = Cluster::load(root, root.join("generated")).expect("cluster reloads");
    assert_eq!(reloaded.len(), 3);
}

#[test]
fn failed_callback_writes_nothing() {
    let dir = TempDir::new().expect("temporary directory is created");
    let root = dir.path();
    write(root, "uploads.yaml", CLAIM);
    write(root, "new/uploads.Secret.yaml", CLAIM.replace("uploads", "other").as_str());

    let error = modify_cluster(root, root.join("new"), |cluster| {
        cluster
            .persistent_volume_claims(&["uploads"])?
            .apply(&[pvc::disk_size("2Gi")]);
        cluster.secrets(&["uploads"])?;
        Ok(())
    })
    .expect_err("secret path is taken");

    assert!(matches!(error, cluster::Error::PathCollision { .. }));
    assert_eq!(read(root, "uploads.yaml"), CLAIM);
}

#[test]
fn selections_without_matches_are_empty() {
    let dir = TempDir::new().expect("temporary directory is created");
    let root = dir.path();
    write(root, "uploads.yaml", CLAIM);

    let mut cluster = Cluster::load(root, root.join("new")).expect("cluster loads");
    assert!(
        cluster
            .select::<StatefulSet>(&[WILDCARD])
            .expect("selection succeeds")
            .is_empty()
    );

    let mut claims = cluster
        .select::<PersistentVolumeClaim>(&["uploads", "missing"])
        .expect("selection succeeds");
    assert_eq!(claims.len(), 1);
    assert_eq!(
        claims.iter_mut().next().and_then(|claim| claim.metadata.name.clone()),
        Some("uploads".to_owned())
    );
}
