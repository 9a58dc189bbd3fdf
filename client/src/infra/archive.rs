//! Template archive packaging

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Packs in-memory template files into an upload archive
pub trait Packager: Send + Sync {
    fn pack(&self, files: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>>;
}

/// Uncompressed ustar archive, one owner-only entry per file
#[derive(Debug, Default, Clone, Copy)]
pub struct TarPackager;

const FILE_MODE: u32 = 0o600;

impl Packager for TarPackager {
    fn pack(&self, files: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());

        for (name, content) in files {
            let mut header = tar::Header::new_ustar();
            header.set_size(content.len() as u64);
            header.set_mode(FILE_MODE);
            header.set_mtime(0);
            header.set_entry_type(tar::EntryType::Regular);

            builder
                .append_data(&mut header, name, content.as_slice())
                .map_err(|e| Error::Archive(format!("Failed to add {}: {}", name, e)))?;
        }

        builder
            .into_inner()
            .map_err(|e| Error::Archive(format!("Failed to finish archive: {}", e)))
    }
}
