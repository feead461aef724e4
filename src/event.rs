use percent_encoding::percent_decode_str;
use serde::Deserialize;

use crate::error::{MetadataError, MetadataResult};

/// An S3 event notification, reduced to the fields that identify the stored objects
#[derive(Deserialize, Debug, Clone)]
pub struct StorageNotification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Deserialize, Debug, Clone)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ObjectEntity {
    /// form-encoded
    pub key: String,
}

/// A stored object with its key decoded
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl StorageNotification {
    /// All objects of the notification in record order
    pub fn objects(&self) -> MetadataResult<Vec<ObjectRef>> {
        self.records.iter()
            .map(|r| -> MetadataResult<ObjectRef> {
                Ok(ObjectRef {
                    bucket: r.s3.bucket.name.clone(),
                    key: decode_key(&r.s3.object.key)?,
                })
            })
            .collect()
    }
}

/// Keys in S3 notifications are encoded like form values: '+' for a space, everything else
///  percent-encoded UTF-8
pub fn decode_key(raw: &str) -> MetadataResult<String> {
    let with_spaces = raw.replace('+', " ");
    percent_decode_str(&with_spaces)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|_| MetadataError::MalformedKey(raw.to_string()))
}
