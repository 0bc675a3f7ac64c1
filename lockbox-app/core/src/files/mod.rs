mod blobs;
mod mime;

pub use blobs::{ScratchFile, StoredBlob, VaultFiles};
pub use mime::{format_file_size, DocumentKind, FileType};
