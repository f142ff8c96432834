use serde::{Deserialize, Serialize};

/// How an uploaded payload is stored on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PayloadKind {
    /// The complete artifact in one piece.
    Whole,
    /// One piece of a chunked upload, keyed by its sequence index.
    Chunk { index: u32 },
}

/// A single uploaded file or chunk.
///
/// The `data` field is base64-encoded in JSON, matching how the transport
/// layer carries raw bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    /// Relative file name of the target artifact.
    pub file_name: String,
    #[serde(flatten)]
    pub kind: PayloadKind,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl FilePayload {
    /// A whole-file payload for `file_name`.
    pub fn whole(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: PayloadKind::Whole,
            data,
        }
    }

    /// A chunk payload at `index` for `file_name`.
    pub fn chunk(file_name: impl Into<String>, index: u32, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: PayloadKind::Chunk { index },
            data,
        }
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
