use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Component, Path, PathBuf},
};

use tracing::{debug, error, warn};

use crate::error::LaunchError;

/// Home folders that should never get deleted
pub const PROTECTED_HOME_FOLDERS: [&str; 7] = [
    "Documents",
    "Downloads",
    "Desktop",
    "Pictures",
    "Videos",
    "Projects",
    "Games",
];

/// Top level directories which belong to the system
const SYSTEM_FOLDERS: [&str; 7] = ["usr", "var", "lib", "etc", "boot", "sbin", "bin"];

/// Returns an Option containing the given `PathBuf`, if the `PathBuf` points to an actual file
pub fn some_if_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Returns an Option containing the given `PathBuf`, if the `PathBuf` points to an actual directory
pub fn some_if_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}

/// Replaces a leading `~` with the home directory of the current user
pub fn expand_user(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Whether the file at `path` has any of its executable bits set
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

/// Adds the user executable bit to the file at `path`
pub fn make_executable(path: &Path) -> Result<(), LaunchError> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o100);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Tests if `child` is `parent` itself, or anywhere inside of it. Relative paths and `~` are
/// resolved first, and symlinks too if asked for.
pub fn path_contains(parent: &Path, child: &Path, resolve_symlinks: bool) -> bool {
    let resolve = |path: &Path| {
        let path = expand_user(path);
        let path = std::path::absolute(&path).unwrap_or(path);
        if resolve_symlinks {
            fs::canonicalize(&path).unwrap_or(path)
        } else {
            path
        }
    };

    resolve(child).starts_with(resolve(parent))
}

/// Check if a folder is safe to remove, i.e. it is not a system folder, a home folder, one of the
/// protected folders inside of it, or a folder holding the default game directory
pub fn is_removeable(path: &Path, default_game_path: Option<&Path>) -> bool {
    if !path.exists() {
        return false;
    }

    let parts: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();

    match parts.as_slice() {
        [] => return false,
        [first, ..] if SYSTEM_FOLDERS.contains(&first.as_ref()) => return false,
        [first, ..] if first == "home" && parts.len() <= 2 => return false,
        [first, _, folder] if first == "home" && PROTECTED_HOME_FOLDERS.contains(&folder.as_ref()) => {
            return false;
        }
        _ => {}
    }

    default_game_path.is_none_or(|game_path| !path_contains(path, game_path, false))
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn delete_folder_guarded(path: &Path, path_home: Option<&Path>) -> Result<bool, LaunchError> {
    if !path.exists() {
        warn!("Non existent path: {path:?}");
        return Ok(false);
    }

    if path_home.is_some_and(|home| is_same_file(home, path)) {
        return Err(LaunchError::FilesystemGuard(path.to_path_buf()));
    }

    debug!("Deleting folder {path:?}");
    if let Err(e) = fs::remove_dir_all(path) {
        error!("Failed to delete folder {path:?}: {e}");
        return Ok(false);
    }

    Ok(true)
}

/// Delete a folder and everything in it. Returns whether the folder was deleted, or an error if
/// `path` is the home directory.
pub fn delete_folder(path: &Path) -> Result<bool, LaunchError> {
    delete_folder_guarded(path, dirs::home_dir().as_deref())
}
