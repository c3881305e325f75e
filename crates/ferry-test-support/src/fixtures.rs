//! Deterministic payloads and sample records.

use std::io::Cursor;

use ferry_core::{ByteSource, CatalogEntry, TransferDescriptor};

/// Byte at position `index` of every generated payload.
#[must_use]
pub fn payload_byte(index: u64) -> u8 {
    u8::try_from(index % 251).unwrap_or_default()
}

/// `len` deterministic bytes.
#[must_use]
pub fn payload(len: u64) -> Vec<u8> {
    (0..len).map(payload_byte).collect()
}

/// In-memory byte source yielding [`payload`]`(len)`.
#[must_use]
pub fn byte_source(len: u64) -> ByteSource {
    Box::new(Cursor::new(payload(len)))
}

/// Magnet descriptor with a display name.
#[must_use]
pub fn magnet(name: &str) -> TransferDescriptor {
    TransferDescriptor::magnet(format!(
        "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn={}",
        name.replace(' ', "+")
    ))
}

/// Minimal bencoded metainfo dictionary carrying `name`.
#[must_use]
pub fn torrent_file(name: &str) -> TransferDescriptor {
    TransferDescriptor::torrent_file(
        format!("d4:infod6:lengthi1e4:name{}:{name}ee", name.len()).into_bytes(),
    )
}

/// Catalog record stored under `folder`.
#[must_use]
pub fn catalog_entry(folder: &str, file_name: &str, size_bytes: u64) -> CatalogEntry {
    let path = format!("{folder}/{file_name}");
    CatalogEntry {
        url: format!("https://store.test{path}"),
        path,
        name: file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem)
            .to_string(),
        file_name: file_name.to_string(),
        size_bytes,
        title_id: None,
        version: None,
        indexed_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn byte_source_yields_exact_payload() {
        let mut source = byte_source(300);
        let mut buffer = Vec::new();
        source.read_to_end(&mut buffer).await.expect("read");
        assert_eq!(buffer.len(), 300);
        assert_eq!(buffer[251], 0);
        assert_eq!(buffer, payload(300));
    }

    #[test]
    fn descriptors_validate() {
        assert!(magnet("Celeste").validate().is_ok());
        assert!(torrent_file("Celeste.nsp").validate().is_ok());
        assert_eq!(torrent_file("Celeste.nsp").display_name(), "Celeste.nsp");
    }
}
