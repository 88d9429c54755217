//! Filesystem identity capture and TOCTOU-safe verification.
//!
//! [`PathIdentity::capture`] records the native identity (device+inode on
//! unix, volume-serial+file-index on Windows) of a path at approval time.
//! [`PathIdentity::verify`] does a cheap stat-based re-check.
//! [`PathIdentity::verify_and_open`] does the strong check: it opens the
//! *user-supplied* path with symlink-refusing flags so a symlink planted
//! between approval and use is rejected rather than silently followed.

use std::fs::File;
use std::path::{Path, PathBuf};

use toolgate_commons::paths::split_parent_and_name;

use crate::errors::VerifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

#[derive(Debug, Clone)]
pub struct ExistingIdentity {
    pub user_path: PathBuf,
    pub resolved_path: PathBuf,
    pub device: u64,
    pub inode: u64,
    #[cfg(windows)]
    pub volume_serial: u32,
    #[cfg(windows)]
    pub file_index_high: u32,
    #[cfg(windows)]
    pub file_index_low: u32,
    pub on_network_filesystem: bool,
}

#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub user_path: PathBuf,
    pub resolved_path: PathBuf,
    pub parent_path: PathBuf,
    pub parent_device: u64,
    pub parent_inode: u64,
    #[cfg(windows)]
    pub parent_volume_serial: u32,
    #[cfg(windows)]
    pub parent_file_index_high: u32,
    #[cfg(windows)]
    pub parent_file_index_low: u32,
    pub on_network_filesystem: bool,
}

/// Identity of a filesystem object captured at approval time.
#[derive(Debug, Clone)]
pub enum PathIdentity {
    Existing(ExistingIdentity),
    New(NewIdentity),
}

impl PathIdentity {
    pub fn user_path(&self) -> &Path {
        match self {
            Self::Existing(e) => &e.user_path,
            Self::New(n) => &n.user_path,
        }
    }

    pub fn on_network_filesystem(&self) -> bool {
        match self {
            Self::Existing(e) => e.on_network_filesystem,
            Self::New(n) => n.on_network_filesystem,
        }
    }

    /// Captures identity for `path`: the file's own identity if it exists,
    /// otherwise its parent directory's identity plus the intended name.
    pub fn capture(path: &Path) -> Result<Self, VerifyError> {
        if path.as_os_str().is_empty() {
            return Err(VerifyError::InvalidPath);
        }

        match std::fs::symlink_metadata(path) {
            Ok(_) => {
                let resolved_path = std::fs::canonicalize(path).map_err(|_| VerifyError::StatFailed)?;
                let metadata = std::fs::metadata(&resolved_path).map_err(|_| VerifyError::StatFailed)?;
                let on_network_filesystem = platform::is_network_filesystem(&resolved_path);
                let (device, inode) = platform::identity_of_metadata(&metadata);
                #[cfg(windows)]
                let (volume_serial, file_index_high, file_index_low) =
                    platform::windows_identity(&resolved_path)?;

                Ok(Self::Existing(ExistingIdentity {
                    user_path: path.to_path_buf(),
                    resolved_path,
                    device,
                    inode,
                    #[cfg(windows)]
                    volume_serial,
                    #[cfg(windows)]
                    file_index_high,
                    #[cfg(windows)]
                    file_index_low,
                    on_network_filesystem,
                }))
            }
            Err(_) => {
                let (parent, name) =
                    split_parent_and_name(path).ok_or(VerifyError::InvalidPath)?;
                let parent_for_lookup = if parent.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    parent
                };
                let canonical_parent = std::fs::canonicalize(&parent_for_lookup)
                    .map_err(|_| VerifyError::ParentInaccessible)?;
                let parent_metadata =
                    std::fs::metadata(&canonical_parent).map_err(|_| VerifyError::ParentInaccessible)?;
                let (parent_device, parent_inode) = platform::identity_of_metadata(&parent_metadata);
                let resolved_path = canonical_parent.join(&name);
                let on_network_filesystem = platform::is_network_filesystem(&canonical_parent);
                #[cfg(windows)]
                let (parent_volume_serial, parent_file_index_high, parent_file_index_low) =
                    platform::windows_identity(&canonical_parent)?;

                Ok(Self::New(NewIdentity {
                    user_path: path.to_path_buf(),
                    resolved_path,
                    parent_path: canonical_parent,
                    parent_device,
                    parent_inode,
                    #[cfg(windows)]
                    parent_volume_serial,
                    #[cfg(windows)]
                    parent_file_index_high,
                    #[cfg(windows)]
                    parent_file_index_low,
                    on_network_filesystem,
                }))
            }
        }
    }

    /// Cheap stat-based re-check; does not open anything.
    pub fn verify(&self) -> Result<(), VerifyError> {
        match self {
            Self::Existing(existing) => {
                let metadata = match std::fs::metadata(&existing.resolved_path) {
                    Ok(metadata) => metadata,
                    Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                        return Err(VerifyError::Deleted)
                    }
                    Err(_) => return Err(VerifyError::StatFailed),
                };
                let (device, inode) = platform::identity_of_metadata(&metadata);
                if device != existing.device || inode != existing.inode {
                    return Err(VerifyError::IdentityChanged);
                }
                Ok(())
            }
            Self::New(new) => {
                let parent_metadata = std::fs::metadata(&new.parent_path)
                    .map_err(|_| VerifyError::ParentInaccessible)?;
                let (parent_device, parent_inode) = platform::identity_of_metadata(&parent_metadata);
                if parent_device != new.parent_device || parent_inode != new.parent_inode {
                    return Err(VerifyError::ParentChanged);
                }
                if std::fs::symlink_metadata(&new.resolved_path).is_ok() {
                    return Err(VerifyError::AlreadyExists);
                }
                Ok(())
            }
        }
    }

    /// Re-verifies and atomically opens the approved path, refusing to
    /// follow a symlink planted at `user_path` since capture.
    pub fn verify_and_open(&self, mode: OpenMode) -> Result<File, VerifyError> {
        match self {
            Self::Existing(existing) => platform::open_existing_no_follow(existing, mode),
            Self::New(new) => platform::create_new_no_follow(new),
        }
    }
}

#[cfg(unix)]
mod platform {
    use std::ffi::CString;
    use std::fs::{File, Metadata, OpenOptions};
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::MetadataExt;
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::FromRawFd;
    use std::path::Path;

    use super::{ExistingIdentity, NewIdentity, OpenMode};
    use crate::errors::VerifyError;

    pub(super) fn identity_of_metadata(metadata: &Metadata) -> (u64, u64) {
        (metadata.dev(), metadata.ino())
    }

    pub(super) fn is_network_filesystem(path: &Path) -> bool {
        let mounts = match std::fs::read_to_string("/proc/mounts") {
            Ok(text) => text,
            Err(_) => return false,
        };
        let network_fstypes = ["nfs", "nfs4", "cifs", "smb", "smbfs", "fuse.sshfs"];

        let mut best_match: Option<(usize, bool)> = None;
        for line in mounts.lines() {
            let mut fields = line.split_whitespace();
            let _device = fields.next();
            let Some(mount_point) = fields.next() else {
                continue;
            };
            let Some(fstype) = fields.next() else {
                continue;
            };
            if path.starts_with(mount_point) {
                let len = mount_point.len();
                let is_network = network_fstypes.iter().any(|nf| fstype.eq_ignore_ascii_case(nf));
                if best_match.map(|(best_len, _)| len > best_len).unwrap_or(true) {
                    best_match = Some((len, is_network));
                }
            }
        }
        best_match.map(|(_, is_network)| is_network).unwrap_or(false)
    }

    pub(super) fn open_existing_no_follow(
        existing: &ExistingIdentity,
        mode: OpenMode,
    ) -> Result<File, VerifyError> {
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => {
                options.read(true);
            }
            OpenMode::Write => {
                options.write(true);
            }
        }
        options.custom_flags(libc::O_NOFOLLOW);

        let file = match options.open(&existing.user_path) {
            Ok(file) => file,
            Err(error) => {
                return Err(classify_open_error(&error));
            }
        };

        let metadata = file.metadata().map_err(|_| VerifyError::StatFailed)?;
        let (device, inode) = identity_of_metadata(&metadata);
        if device != existing.device || inode != existing.inode {
            drop(file);
            return Err(VerifyError::IdentityChanged);
        }
        Ok(file)
    }

    pub(super) fn create_new_no_follow(new: &NewIdentity) -> Result<File, VerifyError> {
        let parent_dir = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY)
            .open(&new.parent_path)
            .map_err(|_| VerifyError::ParentInaccessible)?;

        let parent_metadata = parent_dir.metadata().map_err(|_| VerifyError::ParentInaccessible)?;
        let (parent_device, parent_inode) = identity_of_metadata(&parent_metadata);
        if parent_device != new.parent_device || parent_inode != new.parent_inode {
            return Err(VerifyError::ParentChanged);
        }

        let file_name = new
            .resolved_path
            .file_name()
            .ok_or(VerifyError::InvalidPath)?;
        let file_name = CString::new(file_name.as_bytes()).map_err(|_| VerifyError::InvalidPath)?;

        use std::os::unix::io::AsRawFd;
        let fd = unsafe {
            libc::openat(
                parent_dir.as_raw_fd(),
                file_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_NOFOLLOW | libc::O_WRONLY,
                0o644,
            )
        };
        if fd < 0 {
            let error = std::io::Error::last_os_error();
            return Err(match error.raw_os_error() {
                Some(libc::EEXIST) => VerifyError::AlreadyExists,
                Some(libc::ELOOP) => VerifyError::IsSymlink,
                _ => VerifyError::CreateFailed,
            });
        }
        Ok(unsafe { File::from_raw_fd(fd) })
    }

    fn classify_open_error(error: &std::io::Error) -> VerifyError {
        match error.raw_os_error() {
            Some(libc::ENOENT) => VerifyError::Deleted,
            Some(libc::ELOOP) => VerifyError::IsSymlink,
            _ => VerifyError::OpenFailed,
        }
    }
}

#[cfg(windows)]
mod platform {
    use std::fs::{File, Metadata, OpenOptions};
    use std::os::windows::fs::OpenOptionsExt;
    use std::os::windows::io::AsRawHandle;
    use std::path::Path;

    use winapi::um::fileapi::{GetFileInformationByHandle, BY_HANDLE_FILE_INFORMATION};
    use winapi::um::winbase::FILE_FLAG_OPEN_REPARSE_POINT;
    use winapi::um::winnt::HANDLE;

    use super::{ExistingIdentity, NewIdentity, OpenMode};
    use crate::errors::VerifyError;

    // std's Metadata on Windows does not expose a device+inode pair the
    // way unix does, so the `(u64, u64)` returned here is a synthetic
    // placeholder; the authoritative identity lives in the
    // volume-serial/file-index triple captured separately.
    pub(super) fn identity_of_metadata(_metadata: &Metadata) -> (u64, u64) {
        (0, 0)
    }

    pub(super) fn is_network_filesystem(path: &Path) -> bool {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDriveTypeW;
        use winapi::um::winbase::DRIVE_REMOTE;

        let Some(root) = path.ancestors().last() else {
            return false;
        };
        let mut wide: Vec<u16> = root.as_os_str().encode_wide().collect();
        wide.push(0);
        let drive_type = unsafe { GetDriveTypeW(wide.as_ptr()) };
        drive_type == DRIVE_REMOTE
    }

    pub(super) fn windows_identity(path: &Path) -> Result<(u32, u32, u32), VerifyError> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(FILE_FLAG_OPEN_REPARSE_POINT)
            .open(path)
            .map_err(|_| VerifyError::StatFailed)?;
        by_handle_identity(file.as_raw_handle() as HANDLE)
    }

    fn by_handle_identity(handle: HANDLE) -> Result<(u32, u32, u32), VerifyError> {
        unsafe {
            let mut info: BY_HANDLE_FILE_INFORMATION = std::mem::zeroed();
            if GetFileInformationByHandle(handle, &mut info) == 0 {
                return Err(VerifyError::StatFailed);
            }
            Ok((
                info.dwVolumeSerialNumber,
                info.nFileIndexHigh,
                info.nFileIndexLow,
            ))
        }
    }

    pub(super) fn open_existing_no_follow(
        existing: &ExistingIdentity,
        mode: OpenMode,
    ) -> Result<File, VerifyError> {
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => {
                options.read(true);
            }
            OpenMode::Write => {
                options.write(true);
            }
        }
        options.custom_flags(FILE_FLAG_OPEN_REPARSE_POINT);

        let file = options.open(&existing.user_path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                VerifyError::Deleted
            } else {
                VerifyError::OpenFailed
            }
        })?;

        let (volume_serial, file_index_high, file_index_low) =
            by_handle_identity(file.as_raw_handle() as HANDLE)?;
        if volume_serial != existing.volume_serial
            || file_index_high != existing.file_index_high
            || file_index_low != existing.file_index_low
        {
            drop(file);
            return Err(VerifyError::IdentityChanged);
        }
        Ok(file)
    }

    pub(super) fn create_new_no_follow(new: &NewIdentity) -> Result<File, VerifyError> {
        let (parent_volume_serial, parent_file_index_high, parent_file_index_low) =
            windows_identity(&new.parent_path)?;
        if parent_volume_serial != new.parent_volume_serial
            || parent_file_index_high != new.parent_file_index_high
            || parent_file_index_low != new.parent_file_index_low
        {
            return Err(VerifyError::ParentChanged);
        }

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .custom_flags(FILE_FLAG_OPEN_REPARSE_POINT)
            .open(&new.resolved_path)
            .map_err(|error| match error.kind() {
                std::io::ErrorKind::AlreadyExists => VerifyError::AlreadyExists,
                _ => VerifyError::CreateFailed,
            })
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use std::fs::{File, Metadata};
    use std::path::Path;

    use super::{ExistingIdentity, NewIdentity, OpenMode};
    use crate::errors::VerifyError;

    pub(super) fn identity_of_metadata(_metadata: &Metadata) -> (u64, u64) {
        (0, 0)
    }

    pub(super) fn is_network_filesystem(_path: &Path) -> bool {
        false
    }

    pub(super) fn open_existing_no_follow(
        existing: &ExistingIdentity,
        mode: OpenMode,
    ) -> Result<File, VerifyError> {
        let mut options = std::fs::OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true),
        };
        options.open(&existing.user_path).map_err(|_| VerifyError::OpenFailed)
    }

    pub(super) fn create_new_no_follow(new: &NewIdentity) -> Result<File, VerifyError> {
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&new.resolved_path)
            .map_err(|_| VerifyError::CreateFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn capture_existing_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"hello").unwrap();

        let identity = PathIdentity::capture(&path).unwrap();
        assert!(matches!(identity, PathIdentity::Existing(_)));
        assert!(identity.verify().is_ok());
    }

    #[test]
    fn verify_detects_deletion() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"hello").unwrap();
        let identity = PathIdentity::capture(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        assert_eq!(identity.verify().unwrap_err(), VerifyError::Deleted);
    }

    #[test]
    fn verify_detects_replacement() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"hello").unwrap();
        let identity = PathIdentity::capture(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"world").unwrap();
        assert_eq!(identity.verify().unwrap_err(), VerifyError::IdentityChanged);
    }

    #[test]
    fn capture_new_file_tracks_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");

        let identity = PathIdentity::capture(&path).unwrap();
        assert!(matches!(identity, PathIdentity::New(_)));
        assert!(identity.verify().is_ok());
    }

    #[test]
    fn verify_new_detects_already_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        let identity = PathIdentity::capture(&path).unwrap();

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"raced").unwrap();
        assert_eq!(identity.verify().unwrap_err(), VerifyError::AlreadyExists);
    }

    #[cfg(unix)]
    #[test]
    fn verify_and_open_rejects_symlink_swap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"hello").unwrap();
        let identity = PathIdentity::capture(&path).unwrap();

        let target = dir.path().join("target.txt");
        std::fs::write(&target, b"other").unwrap();
        std::fs::remove_file(&path).unwrap();
        std::os::unix::fs::symlink(&target, &path).unwrap();

        let result = identity.verify_and_open(OpenMode::Read);
        assert_eq!(result.unwrap_err(), VerifyError::IsSymlink);
    }

    #[cfg(unix)]
    #[test]
    fn verify_and_open_new_creates_exclusively() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        let identity = PathIdentity::capture(&path).unwrap();

        let mut file = identity.verify_and_open(OpenMode::Write).unwrap();
        file.write_all(b"content").unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn verify_and_open_new_rejects_race() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        let identity = PathIdentity::capture(&path).unwrap();

        std::fs::write(&path, b"raced").unwrap();
        let result = identity.verify_and_open(OpenMode::Write);
        assert_eq!(result.unwrap_err(), VerifyError::AlreadyExists);
    }
}
