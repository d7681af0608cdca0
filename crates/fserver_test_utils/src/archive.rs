//! In-memory tar archive builder.
//!
//! Entry names are written into the header verbatim, so tests can produce
//! archives with `./` prefixes or `..` components that `tar::Builder`
//! would refuse to create.

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tar::{EntryType, Header};

#[derive(Debug, Clone)]
enum Entry {
    File { path: String, contents: Vec<u8> },
    Dir { path: String },
    Symlink { path: String, target: String },
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    gzip: bool,
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compress the archive with gzip.
    pub fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    pub fn file(mut self, path: &str, contents: impl AsRef<[u8]>) -> Self {
        self.entries.push(Entry::File {
            path: path.to_string(),
            contents: contents.as_ref().to_vec(),
        });
        self
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.entries.push(Entry::Dir {
            path: path.to_string(),
        });
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.entries.push(Entry::Symlink {
            path: path.to_string(),
            target: target.to_string(),
        });
        self
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        if self.gzip {
            let encoder = GzEncoder::new(Vec::new(), Compression::default());
            let encoder = self.write_entries(encoder)?;
            encoder.finish().context("Failed to finish gzip stream")
        } else {
            self.write_entries(Vec::new())
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.build()?;
        fs::write(path, bytes)
            .with_context(|| format!("Failed to write archive {}", path.display()))
    }

    fn write_entries<W: Write>(&self, writer: W) -> Result<W> {
        let mut builder = tar::Builder::new(writer);
        for entry in &self.entries {
            append_entry(&mut builder, entry)?;
        }
        builder.into_inner().context("Failed to finish tar stream")
    }
}

fn append_entry<W: Write>(builder: &mut tar::Builder<W>, entry: &Entry) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_mtime(0);
    match entry {
        Entry::File { path, contents } => {
            set_raw_path(&mut header, path)?;
            header.set_entry_type(EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(contents.len() as u64);
            header.set_cksum();
            builder.append(&header, contents.as_slice())?;
        }
        Entry::Dir { path } => {
            set_raw_path(&mut header, path)?;
            header.set_entry_type(EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            header.set_cksum();
            builder.append(&header, io::empty())?;
        }
        Entry::Symlink { path, target } => {
            set_raw_path(&mut header, path)?;
            header.set_entry_type(EntryType::Symlink);
            header.set_link_name(target)?;
            header.set_mode(0o777);
            header.set_size(0);
            header.set_cksum();
            builder.append(&header, io::empty())?;
        }
    }
    Ok(())
}

fn set_raw_path(header: &mut Header, path: &str) -> Result<()> {
    let bytes = path.as_bytes();
    let name = &mut header.as_old_mut().name;
    if bytes.len() >= name.len() {
        bail!("Entry name too long for a test archive: {}", path);
    }
    name[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}
