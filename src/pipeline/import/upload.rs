use serde::Serialize;

/// One candidate upload. Lives only for the duration of a single analysis.
#[derive(Clone)]
pub struct Upload {
    pub file_name: String,
    /// Media type as declared by the client (multipart `Content-Type`), may be empty.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn describe(&self) -> UploadInfo {
        UploadInfo {
            file_name: self.file_name.clone(),
            media_type: self.media_type.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}

// Bytes are deliberately left out of Debug output.
impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// Byte-free summary of an upload, safe to log or return to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadInfo {
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: u64,
}
