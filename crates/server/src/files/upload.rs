//! Uploads with sanitized, collision-free file names.
//!
//! An upload happens in two steps. [`FileManager::reserve_upload`] checks the
//! feature gate, resolves the destination directory and creates an empty file
//! under a name nothing else holds. Only then is the incoming stream copied
//! in, through [`UploadProgress`], which enforces the size limit and computes
//! the SHA-256 digest of what was stored.
//!
//! The reserved file is owned by a [`PartialUpload`] guard. Unless the guard
//! is kept after the last byte is flushed, dropping it removes the file, so
//! an upload abandoned at any await point leaves nothing behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use protocol::UploadResponse;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::error::{Feature, FileError};
use super::manager::FileManager;
use super::resolver::ResolvedPath;

/// Buffer size used when copying an upload to disk.
pub const UPLOAD_BUFFER_SIZE: usize = 64 * 1024;

/// Give up on finding a free name after this many candidates.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce an untrusted file name to a safe single path component.
///
/// Path separators become word breaks, whitespace runs become `_`, and
/// everything outside ASCII letters, digits and `._-` is dropped. Leading
/// and trailing dots and underscores are trimmed, so the result can never
/// be `.`, `..` or a hidden file. Windows device names get a `_` prefix.
pub fn sanitize_filename(file_name: &str) -> Result<String, FileError> {
    let spaced: String = file_name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return Err(FileError::InvalidInput(format!(
            "file name {:?} has no usable characters",
            file_name
        )));
    }

    let device = trimmed.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if WINDOWS_DEVICE_NAMES.contains(&device.as_str()) {
        return Ok(format!("_{}", trimmed));
    }

    Ok(trimmed.to_string())
}

/// Split a file name into stem and extension, keeping the dot on the
/// extension. Leading dots never start an extension.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(index) if !file_name[..index].chars().all(|c| c == '.') => {
            file_name.split_at(index)
        }
        _ => (file_name, ""),
    }
}

fn candidate_name(stem: &str, extension: &str, counter: u32) -> String {
    if counter == 0 {
        format!("{}{}", stem, extension)
    } else {
        format!("{} ({}){}", stem, counter, extension)
    }
}

/// An empty file created for an incoming upload.
#[derive(Debug)]
pub struct ReservedUpload {
    /// Open handle to the new file.
    pub file: File,
    /// Removes the new file unless the upload completes.
    pub guard: PartialUpload,
    /// Final, collision-free file name.
    pub stored_name: String,
    /// Root-relative path of the new file.
    pub relative_path: String,
}

/// Running size and checksum of an upload in progress.
#[derive(Debug)]
pub struct UploadProgress {
    hasher: Sha256,
    written: u64,
    limit: u64,
}

impl UploadProgress {
    /// Track an upload limited to `limit` bytes.
    pub fn new(limit: u64) -> Self {
        Self {
            hasher: Sha256::new(),
            written: 0,
            limit,
        }
    }

    /// Account for a chunk before it is written.
    pub fn record(&mut self, chunk: &[u8]) -> Result<(), FileError> {
        let written = self.written.saturating_add(chunk.len() as u64);
        if written > self.limit {
            return Err(FileError::TooLarge { limit: self.limit });
        }

        self.hasher.update(chunk);
        self.written = written;
        Ok(())
    }

    /// Bytes accepted so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Total size and hex SHA-256 digest.
    pub fn finish(self) -> (u64, String) {
        (self.written, hex::encode(self.hasher.finalize()))
    }
}

fn discard_upload(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = ?path, error = %e, "Failed to remove partial upload");
        }
    }
}

/// Deletes an upload target on drop unless [`PartialUpload::keep`] was called.
#[derive(Debug)]
pub struct PartialUpload {
    path: PathBuf,
    keep: bool,
}

impl PartialUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            keep: false,
        }
    }

    /// Absolute path of the guarded file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The upload is complete; leave the file in place.
    pub fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialUpload {
    fn drop(&mut self) {
        if !self.keep {
            debug!(path = ?self.path, "Discarding unfinished upload");
            discard_upload(&self.path);
        }
    }
}

impl FileManager {
    /// Create an empty file for an upload of `file_name` into `destination`.
    ///
    /// Nothing is read from the client until this succeeds. The destination
    /// must be an existing directory inside the root.
    pub fn reserve_upload(
        &self,
        destination: &str,
        file_name: &str,
    ) -> Result<ReservedUpload, FileError> {
        self.require(Feature::Upload)?;

        let dir = self.resolver.resolve(destination)?;
        if !dir.absolute().is_dir() {
            return Err(FileError::NotFound(dir.relative().to_string()));
        }

        self.reserve_in(&dir, file_name)
    }

    /// Store everything `reader` yields as a new file in `destination`.
    pub fn upload<R: Read>(
        &self,
        destination: &str,
        file_name: &str,
        mut reader: R,
    ) -> Result<UploadResponse, FileError> {
        let reserved = self.reserve_upload(destination, file_name)?;
        self.write_reserved(reserved, &mut reader)
    }

    pub(crate) fn reserve_in(
        &self,
        dir: &ResolvedPath,
        file_name: &str,
    ) -> Result<ReservedUpload, FileError> {
        let sanitized = sanitize_filename(file_name)?;
        let (stem, extension) = split_extension(&sanitized);

        for counter in 0..MAX_NAME_ATTEMPTS {
            let name = candidate_name(stem, extension, counter);
            let path = dir.absolute().join(&name);

            if fs::symlink_metadata(&path).is_ok() {
                continue;
            }

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    debug!(path = %dir.join_name(&name), "Reserved upload target");
                    return Ok(ReservedUpload {
                        file,
                        guard: PartialUpload::new(path),
                        relative_path: dir.join_name(&name),
                        stored_name: name,
                    });
                }
                // Lost a race with a concurrent upload, try the next counter.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(FileError::from_io(e, &dir.join_name(&name))),
            }
        }

        Err(FileError::Internal(format!(
            "no free name for {} in {}",
            sanitized,
            dir.relative()
        )))
    }

    pub(crate) fn write_reserved<R: Read>(
        &self,
        reserved: ReservedUpload,
        reader: &mut R,
    ) -> Result<UploadResponse, FileError> {
        let ReservedUpload {
            mut file,
            guard,
            stored_name,
            relative_path,
        } = reserved;

        let mut progress = UploadProgress::new(self.max_upload_size());
        copy_upload(reader, &mut file, &mut progress).map_err(|e| match e {
            CopyError::Io(e) => FileError::from_io(e, &relative_path),
            CopyError::File(e) => e,
        })?;
        drop(file);
        guard.keep();

        let (size, sha256) = progress.finish();
        info!(path = %relative_path, size, "Stored upload");

        Ok(UploadResponse {
            stored_name,
            relative_path,
            size,
            sha256,
        })
    }
}

enum CopyError {
    Io(io::Error),
    File(FileError),
}

fn copy_upload<R: Read>(
    reader: &mut R,
    file: &mut File,
    progress: &mut UploadProgress,
) -> Result<(), CopyError> {
    let mut buffer = vec![0u8; UPLOAD_BUFFER_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Io(e)),
        };

        progress.record(&buffer[..read]).map_err(CopyError::File)?;
        file.write_all(&buffer[..read]).map_err(CopyError::Io)?;
    }

    file.flush().map_err(CopyError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::resolver::Root;
    use protocol::FeatureFlags;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn upload_manager(temp_dir: &TempDir) -> FileManager {
        FileManager::new(Root::new(temp_dir.path()).unwrap()).with_features(FeatureFlags {
            upload: true,
            new_folder: false,
        })
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My cool movie.mov").unwrap(), "My_cool_movie.mov");
        assert_eq!(sanitize_filename("../../../etc/passwd").unwrap(), "etc_passwd");
        assert_eq!(sanitize_filename("..\\windows\\win.ini").unwrap(), "windows_win.ini");
        assert_eq!(sanitize_filename("report (1).txt").unwrap(), "report_1.txt");
        assert_eq!(sanitize_filename(".bashrc").unwrap(), "bashrc");
        assert_eq!(sanitize_filename("caf\u{e9}.txt").unwrap(), "caf.txt");
        assert_eq!(sanitize_filename("con.txt").unwrap(), "_con.txt");
        assert_eq!(sanitize_filename("console.txt").unwrap(), "console.txt");
    }

    #[test]
    fn test_sanitize_filename_empty() {
        for name in ["", "..", "/", "___", "\u{4f60}\u{597d}"] {
            assert!(
                matches!(sanitize_filename(name), Err(FileError::InvalidInput(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("report.txt"), ("report", ".txt"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".profile"), (".profile", ""));
    }

    #[test]
    fn test_upload_stores_bytes_and_checksum() {
        let temp_dir = TempDir::new().unwrap();
        let manager = upload_manager(&temp_dir);

        let response = manager
            .upload("/", "hello.txt", Cursor::new(b"Hello, World!".to_vec()))
            .unwrap();

        assert_eq!(response.stored_name, "hello.txt");
        assert_eq!(response.relative_path, "/hello.txt");
        assert_eq!(response.size, 13);
        assert_eq!(
            response.sha256,
            hex::encode(Sha256::digest(b"Hello, World!"))
        );
        assert_eq!(
            fs::read(temp_dir.path().join("hello.txt")).unwrap(),
            b"Hello, World!"
        );
    }

    #[test]
    fn test_upload_collision_counter() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("report.txt"), "original").unwrap();
        fs::write(temp_dir.path().join("report (1).txt"), "first copy").unwrap();
        let manager = upload_manager(&temp_dir);

        let response = manager
            .upload("", "report.txt", Cursor::new(b"new".to_vec()))
            .unwrap();

        assert_eq!(response.stored_name, "report (2).txt");
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("report.txt")).unwrap(),
            "original"
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("report (1).txt")).unwrap(),
            "first copy"
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("report (2).txt")).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_upload_collision_with_directory_and_no_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("Makefile")).unwrap();
        let manager = upload_manager(&temp_dir);

        let response = manager
            .upload("/", "Makefile", Cursor::new(Vec::new()))
            .unwrap();
        assert_eq!(response.stored_name, "Makefile (1)");
        assert_eq!(response.size, 0);
    }

    #[test]
    fn test_upload_into_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("docs")).unwrap();
        let manager = upload_manager(&temp_dir);

        let response = manager
            .upload("/docs", "../../escape.txt", Cursor::new(b"x".to_vec()))
            .unwrap();

        assert_eq!(response.stored_name, "escape.txt");
        assert_eq!(response.relative_path, "/docs/escape.txt");
        assert!(temp_dir.path().join("docs/escape.txt").exists());
    }

    #[test]
    fn test_upload_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let manager = FileManager::new(Root::new(temp_dir.path()).unwrap());

        let result = manager.upload("/", "a.txt", Cursor::new(b"x".to_vec()));
        assert!(matches!(
            result,
            Err(FileError::FeatureDisabled(Feature::Upload))
        ));
        assert!(!temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_upload_destination_escape() {
        let temp_dir = TempDir::new().unwrap();
        let manager = upload_manager(&temp_dir);

        let result = manager.upload("../", "a.txt", Cursor::new(b"x".to_vec()));
        assert!(matches!(result, Err(FileError::PathEscapesRoot(_))));
    }

    #[test]
    fn test_upload_destination_must_be_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("file.txt"), "x").unwrap();
        let manager = upload_manager(&temp_dir);

        assert!(matches!(
            manager.upload("/missing", "a.txt", Cursor::new(Vec::new())),
            Err(FileError::NotFound(_))
        ));
        assert!(matches!(
            manager.upload("/file.txt", "a.txt", Cursor::new(Vec::new())),
            Err(FileError::NotFound(_))
        ));
    }

    #[test]
    fn test_upload_too_large_removes_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = upload_manager(&temp_dir).with_max_upload_size(10);

        let result = manager.upload("/", "big.bin", Cursor::new(vec![7u8; 11]));
        assert!(matches!(result, Err(FileError::TooLarge { limit: 10 })));
        assert!(!temp_dir.path().join("big.bin").exists());

        let response = manager
            .upload("/", "big.bin", Cursor::new(vec![7u8; 10]))
            .unwrap();
        assert_eq!(response.size, 10);
    }

    #[test]
    fn test_reader_error_removes_partial_file() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("connection reset"))
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let manager = upload_manager(&temp_dir);

        let result = manager.upload("/", "broken.txt", Failing);
        assert!(matches!(result, Err(FileError::Internal(_))));
        assert!(!temp_dir.path().join("broken.txt").exists());
    }

    #[test]
    fn test_reserve_never_overwrites_symlink() {
        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink("/nonexistent", temp_dir.path().join("link.txt")).unwrap();
        let manager = upload_manager(&temp_dir);

        let reserved = manager.reserve_upload("/", "link.txt").unwrap();
        assert_eq!(reserved.stored_name, "link (1).txt");
    }

    #[test]
    fn test_dropped_reservation_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let manager = upload_manager(&temp_dir);

        let mut reserved = manager.reserve_upload("/", "half.bin").unwrap();
        let path = reserved.guard.path().to_path_buf();
        assert_eq!(path, temp_dir.path().join("half.bin"));
        reserved.file.write_all(b"partial").unwrap();
        drop(reserved);
        assert!(!path.exists());

        let response = manager
            .upload("/", "half.bin", Cursor::new(b"whole".to_vec()))
            .unwrap();
        assert_eq!(response.stored_name, "half.bin");
    }

    #[test]
    fn test_kept_guard_leaves_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("done.bin");
        fs::write(&path, "x").unwrap();

        PartialUpload::new(&path).keep();
        assert!(path.exists());

        drop(PartialUpload::new(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_progress_limit() {
        let mut progress = UploadProgress::new(4);
        progress.record(b"ab").unwrap();
        progress.record(b"cd").unwrap();
        assert!(matches!(
            progress.record(b"e"),
            Err(FileError::TooLarge { limit: 4 })
        ));
        assert_eq!(progress.written(), 4);

        let (size, digest) = progress.finish();
        assert_eq!(size, 4);
        assert_eq!(digest, hex::encode(Sha256::digest(b"abcd")));
    }
}
