use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use tracing::{debug, error};

use crate::{
    macros::logs::debug_path,
    parsers::parse_value_vdf,
    utils::paths::some_if_dir,
};

const COMPONENT: &str = "Steam";

fn get_steam_dir(path_data: &Path) -> PathBuf {
    path_data.join("Steam")
}

fn get_steam_flatpak_dir(path_home: &Path) -> PathBuf {
    path_home.join(".var/app/com.valvesoftware.Steam/data/Steam")
}

/// Locates the Steam libraries of the current user, which is where Proton builds are installed
#[derive(Debug)]
pub struct SteamLibraries {
    path_steam_dir: PathBuf,
    is_using_flatpak: bool,
}

impl SteamLibraries {
    pub fn new(path_home: &Path, path_data: &Path) -> Self {
        let mut path_steam_dir = get_steam_dir(path_data);
        let mut is_using_flatpak = false;

        if !path_steam_dir.is_dir() {
            debug!("{COMPONENT} - Attempting to fall back to flatpak");

            is_using_flatpak = true;
            path_steam_dir = get_steam_flatpak_dir(path_home);
        };

        debug_path!("main Steam directory", path_steam_dir);

        SteamLibraries {
            path_steam_dir,
            is_using_flatpak,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.path_steam_dir.is_dir()
    }

    pub fn is_using_flatpak(&self) -> bool {
        self.is_using_flatpak
    }

    /// Get the paths of all Steam libraries by parsing the `libraryfolders.vdf` file
    #[tracing::instrument(level = "trace")]
    pub fn get_library_paths(&self) -> Result<Vec<PathBuf>, io::Error> {
        let libraries_vdf_path = self.path_steam_dir.join("steamapps/libraryfolders.vdf");

        debug!("{COMPONENT} - libraryfolders.vdf path: {libraries_vdf_path:?}");

        Ok(BufReader::new(File::open(libraries_vdf_path)?)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| {
                parse_value_vdf(&line, "path")
                    .ok()
                    .map(|(_, library_path)| PathBuf::from(library_path))
            })
            .collect())
    }

    /// Existing `steamapps` directories, starting with the one in the main Steam directory.
    /// Unreadable Steam configuration gives back whatever could be found without it.
    #[tracing::instrument(level = "trace")]
    pub fn get_steamapps_dirs(&self) -> Vec<PathBuf> {
        let library_paths = self.get_library_paths().unwrap_or_else(|e| {
            error!("{COMPONENT} - Error with parsing steam libraries:\n{e}");
            Vec::new()
        });

        std::iter::once(self.path_steam_dir.clone())
            .chain(library_paths)
            .filter_map(|library| some_if_dir(library.join("steamapps")))
            .unique()
            .collect()
    }
}
