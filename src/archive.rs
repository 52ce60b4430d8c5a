use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::Path;

use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ExportError;

/// Packs the output tree into a ZIP archive at `dest`, with entry names
/// relative to the tree root. The tree itself is left in place. Returns the
/// number of files archived.
pub fn archive_directory(root: &Path, dest: &Path) -> Result<usize, ExportError> {
    let file = File::create(dest).map_err(|e| ExportError::filesystem(dest, e))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    add_dir(&mut zip, root, root, options, &mut count)?;
    zip.finish()
        .map_err(|e| ExportError::filesystem(dest, io::Error::new(io::ErrorKind::Other, e)))?;

    info!(archive = %dest.display(), files = count, "wrote archive");
    Ok(count)
}

fn add_dir<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    dir: &Path,
    options: FileOptions,
    count: &mut usize,
) -> Result<(), ExportError> {
    let entries = fs::read_dir(dir).map_err(|e| ExportError::filesystem(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ExportError::filesystem(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            add_dir(zip, root, &path, options, count)?;
        } else {
            let name = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            zip.start_file(name, options)
                .map_err(|e| ExportError::filesystem(&path, io::Error::new(io::ErrorKind::Other, e)))?;
            let bytes = fs::read(&path).map_err(|e| ExportError::filesystem(&path, e))?;
            zip.write_all(&bytes)
                .map_err(|e| ExportError::filesystem(&path, e))?;
            *count += 1;
        }
    }
    Ok(())
}
