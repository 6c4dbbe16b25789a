//! Result type for [`ObjectStoreClient::get`](super::ObjectStoreClient::get).

use bytes::Bytes;
use object_store::ObjectMeta;

/// Content and metadata of an object read from a container.
#[derive(Debug, Clone)]
pub struct GetOutput {
    /// Raw bytes of the retrieved object.
    pub data: Bytes,
    /// MIME content-type, if the backend provides one.
    pub content_type: Option<String>,
    /// Object metadata (size, etag, last_modified, location).
    pub meta: ObjectMeta,
}
