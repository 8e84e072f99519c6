use crate::error::{Result, StoreError};
use crate::resource::Resource;
use crate::store::JsonStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Append `record` to a list resource. Returns the new length.
pub fn append<T>(store: &JsonStore, resource: &Resource<Vec<T>>, record: T) -> Result<usize>
where
    T: Serialize + DeserializeOwned,
{
    store.update(resource, |records| {
        records.push(record);
        Ok::<_, StoreError>(records.len())
    })
}

/// Append `record`, then drop the oldest entries so at most `window` remain.
/// A window of 0 is treated as 1. Returns the new length.
pub fn append_windowed<T>(
    store: &JsonStore,
    resource: &Resource<Vec<T>>,
    record: T,
    window: usize,
) -> Result<usize>
where
    T: Serialize + DeserializeOwned,
{
    let window = window.max(1);
    store.update(resource, |records| {
        records.push(record);
        if records.len() > window {
            let excess = records.len() - window;
            records.drain(..excess);
        }
        Ok::<_, StoreError>(records.len())
    })
}
