//! Result type for [`ObjectStoreClient::put`](super::ObjectStoreClient::put).

/// Versioning information returned after writing an object.
#[derive(Debug, Clone, Default)]
pub struct PutOutput {
    /// Entity tag of the written object, if the backend provides one.
    pub e_tag: Option<String>,
    /// Version of the written object, if the backend provides one.
    pub version: Option<String>,
}

impl From<object_store::PutResult> for PutOutput {
    fn from(r: object_store::PutResult) -> Self {
        Self {
            e_tag: r.e_tag,
            version: r.version,
        }
    }
}
