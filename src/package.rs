use crate::error::PackageError;
use crate::project::ProjectDocument;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const PROJECT_ENTRY: &str = "project.json";
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageMode {
    /// `project.json` alone, written to the destination path.
    Json,
    /// A `.sb3` zip holding `project.json` and every asset.
    #[default]
    Archive,
}

/// Writes the package through a temporary file next to `destination` and
/// renames it into place only once everything has been written.
pub fn write_package(
    document: &ProjectDocument,
    assets: &BTreeMap<String, Vec<u8>>,
    destination: &Path,
    mode: PackageMode,
) -> Result<(), PackageError> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| PackageError::io(&dir, e))?;
    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| PackageError::io(&dir, e))?;

    match mode {
        PackageMode::Json => {
            let bytes = document.to_bytes()?;
            temp.write_all(&bytes)
                .map_err(|e| PackageError::io(temp.path(), e))?;
        }
        PackageMode::Archive => {
            write_archive(temp.as_file_mut(), document, assets)?;
        }
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| PackageError::io(temp.path(), e))?;
    temp.persist(destination).map_err(|e| PackageError::Persist {
        path: destination.to_path_buf(),
        source: e.error,
    })?;

    tracing::info!(
        path = %destination.display(),
        ?mode,
        assets = assets.len(),
        "wrote project package"
    );
    Ok(())
}

/// The `.sb3` archive as an in-memory buffer.
pub fn build_archive_bytes(
    document: &ProjectDocument,
    assets: &BTreeMap<String, Vec<u8>>,
) -> Result<Vec<u8>, PackageError> {
    let mut buffer = Cursor::new(Vec::<u8>::new());
    write_archive(&mut buffer, document, assets)?;
    Ok(buffer.into_inner())
}

fn write_archive<W: Write + Seek>(
    sink: W,
    document: &ProjectDocument,
    assets: &BTreeMap<String, Vec<u8>>,
) -> Result<(), PackageError> {
    for name in assets.keys() {
        if name.trim().is_empty() || name == PROJECT_ENTRY {
            return Err(PackageError::ReservedEntry(name.clone()));
        }
    }
    let mut zip = ZipWriter::new(sink);
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(PROJECT_ENTRY, opts)?;
    let project_bytes = document.to_bytes()?;
    zip.write_all(&project_bytes)
        .map_err(|e| PackageError::Archive(e.into()))?;

    for (name, bytes) in assets {
        zip.start_file(name.as_str(), opts)?;
        zip.write_all(bytes)
            .map_err(|e| PackageError::Archive(e.into()))?;
    }
    zip.finish()?;
    Ok(())
}

/// Reads either package shape back into the document and its assets.
pub fn read_package(path: &Path) -> Result<(Value, BTreeMap<String, Vec<u8>>), PackageError> {
    let bytes = fs::read(path).map_err(|e| PackageError::io(path, e))?;
    if !bytes.starts_with(ZIP_SIGNATURE) {
        let document = serde_json::from_slice(&bytes)
            .map_err(|e| PackageError::invalid(path, format!("invalid {}: {}", PROJECT_ENTRY, e)))?;
        return Ok((document, BTreeMap::new()));
    }

    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let mut document_text = String::new();
    {
        let mut entry = zip
            .by_name(PROJECT_ENTRY)
            .map_err(|_| PackageError::invalid(path, format!("{} not found", PROJECT_ENTRY)))?;
        entry
            .read_to_string(&mut document_text)
            .map_err(|e| PackageError::io(path, e))?;
    }
    let document = serde_json::from_str(&document_text)
        .map_err(|e| PackageError::invalid(path, format!("invalid {}: {}", PROJECT_ENTRY, e)))?;

    let mut assets = BTreeMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if name == PROJECT_ENTRY || name.ends_with('/') {
            continue;
        }
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| PackageError::io(path, e))?;
        assets.insert(name, data);
    }
    Ok((document, assets))
}

/// Raw `project.json` bytes from an archive, without re-encoding.
pub fn read_archive_document_bytes(archive: &[u8]) -> Result<Vec<u8>, PackageError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let mut entry = zip.by_name(PROJECT_ENTRY)?;
    let mut out = Vec::new();
    entry
        .read_to_end(&mut out)
        .map_err(|e| PackageError::Archive(e.into()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;

    fn sample_document() -> ProjectDocument {
        let mut project = Project::new("pkg");
        let mut cat = project.new_sprite("Cat");
        cat.move_steps(100.0);
        project.add_sprite(cat).unwrap();
        project.build()
    }

    #[test]
    fn archive_document_bytes_match_plain_document() {
        let document = sample_document();
        let archive = build_archive_bytes(&document, &BTreeMap::new()).unwrap();
        assert!(archive.starts_with(ZIP_SIGNATURE));
        assert_eq!(
            read_archive_document_bytes(&archive).unwrap(),
            document.to_bytes().unwrap()
        );
    }

    #[test]
    fn reserved_asset_names_are_rejected() {
        let document = sample_document();
        let mut assets = BTreeMap::new();
        assets.insert(PROJECT_ENTRY.to_string(), b"{}".to_vec());
        let err = build_archive_bytes(&document, &assets).unwrap_err();
        assert!(matches!(err, PackageError::ReservedEntry(_)));
    }

    #[test]
    fn failed_write_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.sb3");
        let mut assets = BTreeMap::new();
        assets.insert(String::new(), b"x".to_vec());
        let err = write_package(&sample_document(), &assets, &dest, PackageMode::Archive);
        assert!(err.is_err());
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_write_keeps_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.sb3");
        fs::write(&dest, b"previous").unwrap();
        let mut assets = BTreeMap::new();
        assets.insert(PROJECT_ENTRY.to_string(), b"x".to_vec());
        assert!(write_package(&sample_document(), &assets, &dest, PackageMode::Archive).is_err());
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
    }
}
