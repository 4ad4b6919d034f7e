//! # Empaquetador de Archivos
//! src/archive.rs
//!
//! Arma un ZIP en memoria con los archivos de un lote y los borra después,
//! haya salido bien o no. Los errores de borrado solo se loguean.

use crate::error::ArchiveError;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Construye un ZIP (deflate) con una entrada por archivo existente
///
/// - El nombre de cada entrada es el nombre base del archivo
/// - Los paths que ya no existen se omiten
/// - Si dos archivos comparten nombre base, queda una sola entrada en la
///   posición del primero con el contenido del último
pub fn archive<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<u8>, ArchiveError> {
    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            debug!(path = %path.display(), "skipping path without file name");
            continue;
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "skipping missing file");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => {
                warn!(name = %name, "duplicate archive entry, keeping the last file");
                entry.1 = bytes;
            }
            None => entries.push((name, bytes)),
        }
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, bytes) in &entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }

    let archive = writer.finish()?.into_inner();
    info!(entries = entries.len(), bytes = archive.len(), "archive built");

    Ok(archive)
}

/// Borra cada path; un archivo que ya no existe no es error
pub fn cleanup<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "temporary file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temporary file"),
        }
    }
}

/// `archive` + `cleanup`, con limpieza aunque el ZIP falle
pub fn bundle<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<u8>, ArchiveError> {
    let result = archive(paths);
    cleanup(paths);
    result
}

/// Archivos temporales de una petición; se borran al destruirse
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Arma el ZIP y libera los archivos
    pub fn bundle(self) -> Result<Vec<u8>, ArchiveError> {
        archive(&self.paths)
    }
}

impl Extend<PathBuf> for TempFiles {
    fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, iter: I) {
        self.paths.extend(iter);
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        cleanup(&self.paths);
    }
}
