//! Operators on the metadata of any resource.
use std::collections::BTreeMap;

use k8s_openapi::{Metadata, apimachinery::pkg::apis::meta::v1::ObjectMeta};

use crate::ops::Op;

/// Merges `labels` into the labels of the resource.
pub fn labels<T, I, K, V>(labels: I) -> Op<T>
where
    T: Metadata<Ty = ObjectMeta>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let labels = collect(labels);
    Op::new(move |resource: &mut T| {
        resource
            .metadata_mut()
            .labels
            .get_or_insert_default()
            .extend(labels.clone());
    })
}

/// Merges `annotations` into the annotations of the resource.
pub fn annotations<T, I, K, V>(annotations: I) -> Op<T>
where
    T: Metadata<Ty = ObjectMeta>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let annotations = collect(annotations);
    Op::new(move |resource: &mut T| {
        resource
            .metadata_mut()
            .annotations
            .get_or_insert_default()
            .extend(annotations.clone());
    })
}

pub(crate) fn collect<I, K, V>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
