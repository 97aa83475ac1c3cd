use k8s_openapi::{
    api::core::v1::PersistentVolumeClaim, apimachinery::pkg::api::resource::Quantity,
};

use crate::ops::Op;

/// Sets the requested storage of the claim, e.g. `20Gi`.
pub fn disk_size(size: impl Into<String>) -> Op<PersistentVolumeClaim> {
    let size = Quantity(size.into());
    Op::new(move |claim: &mut PersistentVolumeClaim| {
        claim
            .spec
            .get_or_insert_default()
            .resources
            .get_or_insert_default()
            .requests
            .get_or_insert_default()
            .insert("storage".to_owned(), size.clone());
    })
}
