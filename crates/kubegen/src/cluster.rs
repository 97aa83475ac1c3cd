//! The in-memory store of every manifest below a root directory.
//!
//! A [`Cluster`] goes through one lifecycle per invocation: it is loaded from the manifest files,
//! selections of it are mutated through [operators](crate::ops), and finally every object is
//! written back to its file in canonical form (see [`codec`]). [`modify_cluster`] runs the
//! whole lifecycle around a callback.
//!
//! Objects are selected by kind and name. The name [`WILDCARD`] selects every object of a kind.
//! Selecting an exact name which doesn't exist creates a new object for kinds which support it
//! (see [`ManifestKind::materialize`]). New objects are stored in the new files directory as
//! `<name>.<Kind>.yaml`.
use std::{
    collections::{BTreeMap, HashMap, btree_map::Entry},
    fs,
    path::{Path, PathBuf},
};

use k8s_openapi::api::{
    apps::v1::{DaemonSet, Deployment, StatefulSet},
    core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service},
};
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use walkdir::WalkDir;

use crate::{
    codec::{self, MANIFEST_EXTENSION},
    manifest::{Manifest, ManifestKind},
    ops::{Op, apply_all},
};

/// The name which selects every object of a kind.
pub const WILDCARD: &str = "*";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to walk manifest directory {}", root.display()))]
    Walk {
        source: walkdir::Error,
        root: PathBuf,
    },

    #[snafu(display("failed to read manifest {}", path.display()))]
    ReadManifest {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to decode manifest {}", path.display()))]
    DecodeManifest { source: codec::Error, path: PathBuf },

    #[snafu(display(
        "{kind} {name:?} is defined twice, in {} and {}",
        first.display(),
        second.display()
    ))]
    DuplicateName {
        kind: &'static str,
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[snafu(display("cannot create {kind} {name:?}, because {} already exists", path.display()))]
    PathCollision {
        kind: &'static str,
        name: String,
        path: PathBuf,
    },

    #[snafu(display("cannot create {kind} without a name"))]
    MissingName { kind: &'static str },

    #[snafu(display("failed to create new files directory {}", path.display()))]
    CreateNewFilesDir {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to encode manifest {}", path.display()))]
    EncodeManifest { source: codec::Error, path: PathBuf },

    #[snafu(display("failed to write manifest {}", path.display()))]
    WriteManifest {
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Returns every manifest file below `root`, ordered by file name.
///
/// Directories and files without the `.yaml` extension are skipped.
pub fn discover_manifests(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.context(WalkSnafu { root })?;
        if entry.file_type().is_dir() {
            continue;
        }

        if entry.path().extension().is_some_and(|ext| ext == MANIFEST_EXTENSION) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(root = %root.display(), manifests = files.len(), "discovered manifests");
    Ok(files)
}

/// Loads the manifests below `root_dir`, passes them to `callback` and writes them back.
///
/// Nothing is written if loading or `callback` fails.
pub fn modify_cluster<F>(
    root_dir: impl AsRef<Path>,
    new_files_dir: impl Into<PathBuf>,
    callback: F,
) -> Result<()>
where
    F: FnOnce(&mut Cluster) -> Result<()>,
{
    let mut cluster = Cluster::load(root_dir, new_files_dir)?;
    callback(&mut cluster)?;
    cluster.write()
}

/// Identifies an object within its kind.
type ObjectKey = (&'static str, Option<String>, String);

fn object_key(manifest: &Manifest) -> Option<ObjectKey> {
    let name = manifest.name()?;
    Some((
        manifest.kind(),
        manifest.namespace().map(ToOwned::to_owned),
        name.to_owned(),
    ))
}

#[derive(Debug)]
pub struct Cluster {
    files: BTreeMap<PathBuf, Manifest>,
    new_files_dir: PathBuf,
}

impl Cluster {
    /// Loads every manifest below `root_dir`, see [`discover_manifests`].
    pub fn load(root_dir: impl AsRef<Path>, new_files_dir: impl Into<PathBuf>) -> Result<Self> {
        let files = discover_manifests(root_dir.as_ref())?;
        Self::from_files(files, new_files_dir)
    }

    /// Loads the manifests in `files`.
    ///
    /// Fails if any file can't be read or decoded, or if two files define an object of the same
    /// kind, namespace and name.
    pub fn from_files<I, P>(files: I, new_files_dir: impl Into<PathBuf>) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut loaded = BTreeMap::new();
        let mut seen: HashMap<ObjectKey, PathBuf> = HashMap::new();

        for path in files {
            let path = path.into();
            let bytes = fs::read(&path).context(ReadManifestSnafu { path: &path })?;
            let manifest = codec::decode(&bytes).context(DecodeManifestSnafu { path: &path })?;

            if let Some(key) = object_key(&manifest) {
                if let Some(first) = seen.get(&key) {
                    return DuplicateNameSnafu {
                        kind: key.0,
                        name: key.2,
                        first,
                        second: path,
                    }
                    .fail();
                }
                seen.insert(key, path.clone());
            }

            tracing::debug!(
                path = %path.display(),
                kind = manifest.kind(),
                name = manifest.name(),
                "loaded manifest"
            );
            loaded.insert(path, manifest);
        }

        tracing::info!(manifests = loaded.len(), "loaded cluster");
        Ok(Self {
            files: loaded,
            new_files_dir: new_files_dir.into(),
        })
    }

    /// Selects the objects of kind `T` called one of `names`.
    ///
    /// Names which don't exist yet are created first if `T` supports it, so they are part of the
    /// selection. [`WILDCARD`] never creates anything. Fails with [`Error::PathCollision`] if the
    /// file of a new object already holds another object, in which case nothing is created.
    pub fn select<T: ManifestKind>(&mut self, names: &[&str]) -> Result<Selection<'_, T>> {
        self.materialize_missing::<T>(names)?;
        Ok(self.select_existing(names))
    }

    /// Like [`Cluster::select`], without creating missing objects.
    pub fn select_existing<T: ManifestKind>(&mut self, names: &[&str]) -> Selection<'_, T> {
        let all = names.contains(&WILDCARD);
        let objects = self
            .files
            .values_mut()
            .filter_map(T::from_manifest_mut)
            .filter(|object| {
                all || object
                    .metadata()
                    .name
                    .as_deref()
                    .is_some_and(|name| names.contains(&name))
            })
            .collect();

        Selection { objects }
    }

    fn materialize_missing<T: ManifestKind>(&mut self, names: &[&str]) -> Result<()> {
        let mut created: Vec<(PathBuf, T)> = Vec::new();

        for &name in names {
            if name == WILDCARD
                || self.contains::<T>(name)
                || created
                    .iter()
                    .any(|(_, object)| object.metadata().name.as_deref() == Some(name))
            {
                continue;
            }

            let Some(object) = T::materialize(name) else {
                return Ok(());
            };

            let path = self.new_file_path(T::KIND, name);
            ensure!(
                !self.files.contains_key(&path),
                PathCollisionSnafu {
                    kind: T::KIND,
                    name,
                    path,
                }
            );
            created.push((path, object));
        }

        for (path, object) in created {
            tracing::info!(path = %path.display(), kind = T::KIND, "created missing object");
            self.files.insert(path, object.into());
        }
        Ok(())
    }

    fn contains<T: ManifestKind>(&self, name: &str) -> bool {
        self.files
            .values()
            .filter_map(T::from_manifest)
            .any(|object| object.metadata().name.as_deref() == Some(name))
    }

    fn new_file_path(&self, kind: &str, name: &str) -> PathBuf {
        self.new_files_dir
            .join(format!("{name}.{kind}.{MANIFEST_EXTENSION}"))
    }

    pub fn deployments(&mut self, names: &[&str]) -> Result<Selection<'_, Deployment>> {
        self.select(names)
    }

    pub fn stateful_sets(&mut self, names: &[&str]) -> Result<Selection<'_, StatefulSet>> {
        self.select(names)
    }

    pub fn daemon_sets(&mut self, names: &[&str]) -> Result<Selection<'_, DaemonSet>> {
        self.select(names)
    }

    pub fn persistent_volume_claims(
        &mut self,
        names: &[&str],
    ) -> Result<Selection<'_, PersistentVolumeClaim>> {
        self.select(names)
    }

    pub fn secrets(&mut self, names: &[&str]) -> Result<Selection<'_, Secret>> {
        self.select(names)
    }

    pub fn config_maps(&mut self, names: &[&str]) -> Result<Selection<'_, ConfigMap>> {
        self.select(names)
    }

    pub fn services(&mut self, names: &[&str]) -> Result<Selection<'_, Service>> {
        self.select(names)
    }

    /// Selects the objects of kind `T` called one of `names` and applies `ops` to each of them.
    ///
    /// Returns the number of objects `ops` were applied to.
    pub fn apply<T: ManifestKind>(&mut self, names: &[&str], ops: &[Op<T>]) -> Result<usize> {
        let mut selection = self.select::<T>(names)?;
        selection.apply(ops);
        Ok(selection.len())
    }

    /// Adds a new object, typically made by one of the [builders](crate::builder), to the new
    /// files directory.
    pub fn create(&mut self, manifest: impl Into<Manifest>) -> Result<&mut Manifest> {
        let manifest = manifest.into();
        let kind = manifest.kind();
        let key = object_key(&manifest).context(MissingNameSnafu { kind })?;
        let path = self.new_file_path(kind, &key.2);

        if let Some(first) = self.path_of(&key) {
            return DuplicateNameSnafu {
                kind,
                name: key.2,
                first,
                second: path,
            }
            .fail();
        }

        match self.files.entry(path) {
            Entry::Occupied(entry) => PathCollisionSnafu {
                kind,
                name: key.2,
                path: entry.key(),
            }
            .fail(),
            Entry::Vacant(entry) => {
                tracing::info!(path = %entry.key().display(), kind, "created object");
                Ok(entry.insert(manifest))
            }
        }
    }

    fn path_of(&self, key: &ObjectKey) -> Option<&Path> {
        self.files
            .iter()
            .find(|(_, manifest)| object_key(manifest).as_ref() == Some(key))
            .map(|(path, _)| path.as_path())
    }

    /// Writes every object back to its file, including objects created during this session.
    ///
    /// The new files directory is created if it holds any object. Files are written one after
    /// another; when a write fails, the files written before it keep their new content.
    pub fn write(&self) -> Result<()> {
        if self
            .files
            .keys()
            .any(|path| path.starts_with(&self.new_files_dir))
        {
            fs::create_dir_all(&self.new_files_dir).context(CreateNewFilesDirSnafu {
                path: &self.new_files_dir,
            })?;
        }

        for (path, manifest) in &self.files {
            let encoded = codec::encode(manifest).context(EncodeManifestSnafu { path })?;
            fs::write(path, encoded).context(WriteManifestSnafu { path })?;
            tracing::debug!(path = %path.display(), kind = manifest.kind(), "wrote manifest");
        }

        tracing::info!(manifests = self.files.len(), "wrote cluster");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&Manifest> {
        self.files.get(path.as_ref())
    }

    /// Iterates over all objects, ordered by path.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Manifest)> {
        self.files
            .iter()
            .map(|(path, manifest)| (path.as_path(), manifest))
    }

    pub fn new_files_dir(&self) -> &Path {
        &self.new_files_dir
    }
}

/// Mutable references to the selected objects of one kind, ordered by path.
#[derive(Debug)]
pub struct Selection<'a, T> {
    objects: Vec<&'a mut T>,
}

impl<'a, T> Selection<'a, T> {
    /// Applies `ops` to every selected object.
    pub fn apply(&mut self, ops: &[Op<T>]) {
        for object in &mut self.objects {
            apply_all(&mut **object, ops);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.objects.iter().map(|object| &**object)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.objects.iter_mut().map(|object| &mut **object)
    }
}

impl<'a, T> IntoIterator for Selection<'a, T> {
    type IntoIter = std::vec::IntoIter<&'a mut T>;
    type Item = &'a mut T;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}
