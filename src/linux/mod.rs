pub mod steam;
pub mod vulkan;
pub mod wine;

#[cfg(test)]
pub(crate) mod test_utils;

use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing::{debug, trace};

use crate::{
    data::CapabilityProbe, error::LaunchError, launch::gamescope::get_gamescope_fsr_option,
    utils::paths::is_executable,
};

const COMPONENT: &str = "System";

/// Library directories searched for the gamemode client library
const GAMEMODE_LIB_DIRS: [&str; 6] = [
    "/usr/lib",
    "/usr/lib64",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/local/lib",
    "/usr/local/lib64",
    "/app/lib",
];

/// Return the absolute path of an executable, looking it up on `PATH` unless a path was given.
/// A file which exists but can not be executed is reported as such.
pub fn find_executable(name: &str) -> Result<PathBuf, LaunchError> {
    if name.is_empty() {
        return Err(LaunchError::MissingExecutable(String::new()));
    }

    match which::which(name) {
        Ok(path) => Ok(path),
        Err(_) if name.contains('/') && Path::new(name).is_file() && !is_executable(Path::new(name)) => {
            Err(LaunchError::NotExecutable(PathBuf::from(name)))
        }
        Err(_) => Err(LaunchError::MissingExecutable(name.to_owned())),
    }
}

/// Checks if an executable can be located; if false, [`find_executable`] returns an error
pub fn can_find_executable(name: &str) -> bool {
    find_executable(name).is_ok()
}

/// Answers capability questions about the machine this process is running on. Answers which
/// need an external command are worked out once and kept for the lifetime of the probe.
#[derive(Debug, Default)]
pub struct SystemProbe {
    gamescope_fsr_option: OnceLock<Vec<String>>,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CapabilityProbe for SystemProbe {
    fn find_executable(&self, name: &str) -> Result<PathBuf, LaunchError> {
        find_executable(name)
    }

    fn gamemode_available(&self) -> bool {
        if !self.can_find_executable("gamemoderun") {
            trace!("{COMPONENT} - gamemoderun not found");
            return false;
        }

        let has_library = GAMEMODE_LIB_DIRS
            .iter()
            .map(|dir| Path::new(dir).join("libgamemodeauto.so.0"))
            .any(|path| path.exists());

        debug!("{COMPONENT} - gamemode client library found: {has_library}");
        has_library
    }

    fn gamescope_fsr_option(&self) -> Vec<String> {
        self.gamescope_fsr_option
            .get_or_init(|| get_gamescope_fsr_option(self))
            .clone()
    }

    fn host_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}
