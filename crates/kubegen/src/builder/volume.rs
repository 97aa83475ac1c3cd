use k8s_openapi::{
    api::core::v1::{
        ConfigMapVolumeSource, EmptyDirVolumeSource, GCEPersistentDiskVolumeSource,
        PersistentVolume, PersistentVolumeClaim, PersistentVolumeClaimSpec,
        PersistentVolumeClaimVolumeSource, PersistentVolumeSpec, SecretVolumeSource, Volume,
        VolumeResourceRequirements,
    },
    apimachinery::pkg::api::resource::Quantity,
};

use crate::builder::metadata;

const READ_WRITE_ONCE: &str = "ReadWriteOnce";
const STORAGE: &str = "storage";

/// A builder to build [`Volume`] objects. May only contain one `volume_source`
/// at a time. E.g. a call like `with_secret` after `with_config_map` will overwrite the
/// config map.
#[derive(Clone, Debug, Default)]
pub struct VolumeBuilder {
    name: String,
    volume_source: VolumeSource,
}

#[derive(Clone, Debug)]
pub enum VolumeSource {
    ConfigMap(ConfigMapVolumeSource),
    EmptyDir(EmptyDirVolumeSource),
    PersistentVolumeClaim(PersistentVolumeClaimVolumeSource),
    Secret(SecretVolumeSource),
}

impl Default for VolumeSource {
    fn default() -> Self {
        Self::EmptyDir(EmptyDirVolumeSource::default())
    }
}

impl VolumeBuilder {
    pub fn new(name: impl Into<String>) -> VolumeBuilder {
        VolumeBuilder {
            name: name.into(),
            ..VolumeBuilder::default()
        }
    }

    pub fn with_config_map(&mut self, name: impl Into<String>) -> &mut Self {
        self.volume_source = VolumeSource::ConfigMap(ConfigMapVolumeSource {
            name: name.into(),
            ..ConfigMapVolumeSource::default()
        });
        self
    }

    pub fn with_persistent_volume_claim(&mut self, claim_name: impl Into<String>) -> &mut Self {
        self.volume_source =
            VolumeSource::PersistentVolumeClaim(PersistentVolumeClaimVolumeSource {
                claim_name: claim_name.into(),
                ..PersistentVolumeClaimVolumeSource::default()
            });
        self
    }

    pub fn with_secret(&mut self, secret_name: impl Into<String>) -> &mut Self {
        self.volume_source = VolumeSource::Secret(SecretVolumeSource {
            secret_name: Some(secret_name.into()),
            ..SecretVolumeSource::default()
        });
        self
    }

    pub fn build(&self) -> Volume {
        let name = self.name.clone();
        match &self.volume_source {
            VolumeSource::ConfigMap(config_map) => Volume {
                name,
                config_map: Some(config_map.clone()),
                ..Volume::default()
            },
            VolumeSource::EmptyDir(empty_dir) => Volume {
                name,
                empty_dir: Some(empty_dir.clone()),
                ..Volume::default()
            },
            VolumeSource::PersistentVolumeClaim(claim) => Volume {
                name,
                persistent_volume_claim: Some(claim.clone()),
                ..Volume::default()
            },
            VolumeSource::Secret(secret) => Volume {
                name,
                secret: Some(secret.clone()),
                ..Volume::default()
            },
        }
    }
}

/// A pre-provisioned GCE persistent disk called `name`, formatted as ext4.
pub fn fixed_volume(name: impl Into<String>, size: impl Into<String>) -> PersistentVolume {
    let name = name.into();
    PersistentVolume {
        spec: Some(PersistentVolumeSpec {
            gce_persistent_disk: Some(GCEPersistentDiskVolumeSource {
                pd_name: name.clone(),
                fs_type: Some("ext4".to_owned()),
                ..GCEPersistentDiskVolumeSource::default()
            }),
            access_modes: Some(vec![READ_WRITE_ONCE.to_owned()]),
            capacity: Some([(STORAGE.to_owned(), Quantity(size.into()))].into()),
            ..PersistentVolumeSpec::default()
        }),
        metadata: metadata(name),
        ..PersistentVolume::default()
    }
}

/// A claim for `size` of storage, bound to the persistent volume `volume_name`.
pub fn volume_claim(
    name: impl Into<String>,
    size: impl Into<String>,
    volume_name: impl Into<String>,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: metadata(name),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec![READ_WRITE_ONCE.to_owned()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some([(STORAGE.to_owned(), Quantity(size.into()))].into()),
                ..VolumeResourceRequirements::default()
            }),
            volume_name: Some(volume_name.into()),
            ..PersistentVolumeClaimSpec::default()
        }),
        ..PersistentVolumeClaim::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_volume_with_last_source() {
        let volume = VolumeBuilder::new("config")
            .with_secret("credentials")
            .with_config_map("settings")
            .build();

        assert_eq!(volume.name, "config");
        assert!(volume.secret.is_none());
        assert_eq!(
            volume.config_map.map(|config_map| config_map.name),
            Some("settings".to_owned())
        );
    }

    #[test]
    fn defaults_to_empty_dir() {
        let volume = VolumeBuilder::new("scratch").build();
        assert_eq!(volume.empty_dir, Some(EmptyDirVolumeSource::default()));
    }

    #[test]
    fn fixed_volume_uses_name_as_disk() {
        let volume = fixed_volume("data", "10Gi");
        assert_eq!(volume.metadata.name.as_deref(), Some("data"));

        let spec = volume.spec.expect("spec is set");
        let disk = spec.gce_persistent_disk.expect("disk is set");
        assert_eq!(disk.pd_name, "data");
        assert_eq!(disk.fs_type.as_deref(), Some("ext4"));
        assert_eq!(
            spec.capacity.and_then(|capacity| capacity.get(STORAGE).cloned()),
            Some(Quantity("10Gi".to_owned()))
        );
    }

    #[test]
    fn volume_claim_binds_volume() {
        let claim = volume_claim("data-claim", "10Gi", "data");
        let spec = claim.spec.expect("spec is set");
        assert_eq!(spec.volume_name.as_deref(), Some("data"));
        assert_eq!(spec.access_modes, Some(vec![READ_WRITE_ONCE.to_owned()]));
        assert_eq!(
            spec.resources
                .and_then(|resources| resources.requests)
                .and_then(|requests| requests.get(STORAGE).cloned()),
            Some(Quantity("10Gi".to_owned()))
        );
    }
}
