use k8s_openapi::api::core::v1::ConfigMap;

use crate::ops::{Op, meta::collect};

/// Merges `data` into the data of the config map.
pub fn config_map_data<I, K, V>(data: I) -> Op<ConfigMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let data = collect(data);
    Op::new(move |config_map: &mut ConfigMap| {
        config_map.data.get_or_insert_default().extend(data.clone());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;

    #[test]
    fn merges_data() {
        let mut config_map = ConfigMap {
            data: Some(collect([("a", "1"), ("b", "2")])),
            ..builder::config_map("settings")
        };
        config_map_data([("b", "3"), ("c", "4")]).apply(&mut config_map);

        assert_eq!(
            config_map.data,
            Some(collect([("a", "1"), ("b", "3"), ("c", "4")]))
        );
    }
}
