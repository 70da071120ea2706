use std::{
    cmp::Reverse,
    collections::BTreeMap,
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use itertools::Itertools;
use tracing::{debug, error, trace, warn};

use crate::{
    data::{CapabilityProbe, RunnerConfig, WineArch, non_empty},
    error::LaunchError,
    linux::steam::SteamLibraries,
    macros::logs::debug_path,
    parsers::{ParsedVersion, parse_version},
    utils::{commands::read_process_output, paths::expand_user},
};

const COMPONENT: &str = "Wine";

/// Well known Wine builds installed by system packages
const WINE_PATHS: [(&str, &str); 4] = [
    ("winehq-devel", "/opt/wine-devel/bin/wine"),
    ("winehq-staging", "/opt/wine-staging/bin/wine"),
    ("wine-development", "/usr/lib/wine-development/wine"),
    ("system", "wine"),
];

/// Relative paths of the Wine executable inside a Proton install
const PROTON_WINE_PATHS: [&str; 2] = ["dist/bin/wine", "files/bin/wine"];

/// Override buckets of `WINEDLLOVERRIDES`, in the order they are written out
const OVERRIDE_BUCKETS: [&str; 6] = ["n,b", "b,n", "b", "n", "d", ""];

/// Number of lines at the start of `system.reg` which can hold the prefix architecture
const ARCH_SCAN_LINES: usize = 5;

// VERSIONS -----------------------------------------------------------------------------
/// [`parse_version`], with some odd Proton version names rewritten first
pub fn parse_wine_version(version: &str) -> ParsedVersion {
    let version = version
        .replace("Proton7-", "Proton-7.")
        .replace("Proton8-", "Proton-8.");

    parse_version(&version)
}

fn version_key(version: &str) -> (Vec<u64>, String, String) {
    let ParsedVersion {
        mut numbers,
        prefix,
        suffix,
    } = parse_wine_version(version);

    if numbers.len() < 10 {
        numbers.resize(10, 0);
    }

    (numbers, prefix, suffix)
}

/// Sorts Wine versions by their numbers, then what comes before and after them. Equal versions
/// keep their order in both directions.
pub fn version_sort(mut versions: Vec<String>, reverse: bool) -> Vec<String> {
    if reverse {
        versions.sort_by_cached_key(|version| Reverse(version_key(version)));
    } else {
        versions.sort_by_cached_key(|version| version_key(version));
    }

    versions
}

// BUILDS -------------------------------------------------------------------------------
/// Static Wine builds, plus any `wine-*` builds found in `path_lib`
fn get_system_builds(path_lib: &Path) -> Vec<(String, String)> {
    let mut builds: Vec<_> = WINE_PATHS
        .iter()
        .map(|(name, path)| (name.to_string(), path.to_string()))
        .collect();

    let entries = match fs::read_dir(path_lib) {
        Ok(entries) => entries,
        Err(e) => {
            error!("{COMPONENT} - Unable to enumerate system Wine versions: {e}");
            return builds;
        }
    };

    builds.extend(
        entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("wine-"))
            .sorted()
            .filter_map(|name| {
                let wine_path = path_lib.join(&name).join("bin/wine");
                wine_path
                    .is_file()
                    .then(|| (format!("System {name}"), wine_path.to_string_lossy().into_owned()))
            }),
    );

    builds
}

/// Whether a Wine build ships its own gstreamer libraries
pub fn is_gstreamer_build(wine_path: &Path) -> bool {
    wine_path
        .parent()
        .and_then(Path::parent)
        .is_some_and(|base| base.join("lib64/gstreamer-1.0").exists())
}

/// Finds and resolves every Wine version this system can use: system builds, builds managed by
/// the launcher and Proton builds from Steam
#[derive(Debug)]
pub struct WineVersionRegistry {
    path_wine_dir: PathBuf,
    steamapps_dirs: Vec<PathBuf>,
    system_builds: Vec<(String, String)>,
    probe: Arc<dyn CapabilityProbe>,
    installed_versions: OnceLock<Vec<String>>,
}

impl WineVersionRegistry {
    pub fn new(path_home: &Path, path_data: &Path, probe: Arc<dyn CapabilityProbe>) -> Self {
        let steam = SteamLibraries::new(path_home, path_data);

        Self::with_paths(
            path_data.join("lutris/runners/wine"),
            steam.get_steamapps_dirs(),
            Path::new("/usr/lib"),
            probe,
        )
    }

    pub fn with_paths(
        path_wine_dir: PathBuf,
        steamapps_dirs: Vec<PathBuf>,
        path_system_lib: &Path,
        probe: Arc<dyn CapabilityProbe>,
    ) -> Self {
        debug_path!("managed Wine directory", path_wine_dir);

        WineVersionRegistry {
            path_wine_dir,
            steamapps_dirs,
            system_builds: get_system_builds(path_system_lib),
            probe,
            installed_versions: OnceLock::new(),
        }
    }

    pub fn path_wine_dir(&self) -> &Path {
        &self.path_wine_dir
    }

    /// Directories directly holding Proton versions. `steamapps/common` folders are listed
    /// before the `steamapps` folders themselves.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn get_proton_paths(&self) -> Vec<PathBuf> {
        let common_dirs = self.steamapps_dirs.iter().map(|dir| dir.join("common"));
        let root_dirs = self.steamapps_dirs.iter().cloned();

        common_dirs
            .chain(root_dirs)
            .filter(|dir| dir.is_dir())
            .filter(|dir| {
                get_proton_dir_names(dir).iter().any(|version| {
                    PROTON_WINE_PATHS
                        .iter()
                        .any(|wine| dir.join(version).join(wine).exists())
                })
            })
            .unique()
            .collect()
    }

    fn get_proton_wine_path(&self, version: &str) -> Option<PathBuf> {
        self.get_proton_paths().iter().find_map(|proton_path| {
            PROTON_WINE_PATHS
                .iter()
                .map(|wine| proton_path.join(version).join(wine))
                .find(|path| path.is_file())
        })
    }

    /// Absolute path of the Wine executable of `version`, or of the version set in `config` when
    /// `version` is not given
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn get_wine_path_for_version(
        &self,
        version: Option<&str>,
        config: Option<&RunnerConfig>,
    ) -> Result<PathBuf, LaunchError> {
        let version = version
            .filter(|v| !v.is_empty())
            .or_else(|| config.and_then(|c| non_empty(&c.version)))
            .ok_or(LaunchError::UnspecifiedVersion)?;

        if let Some((_, path)) = self.system_builds.iter().find(|(name, _)| name == version) {
            return self.probe.find_executable(path);
        }

        if version.contains("Proton") {
            if let Some(path) = self.get_proton_wine_path(version) {
                return Ok(path);
            }

            let managed = self.path_wine_dir.join(version).join("bin/wine");
            if managed.is_file() {
                return Ok(managed);
            }

            return Err(LaunchError::UnresolvableVersion(version.to_owned()));
        }

        if version == "custom" {
            let Some(config) = config else {
                return Err(LaunchError::MisconfiguredPrefix(
                    "Custom wine paths are only supported when a configuration is available."
                        .to_owned(),
                ));
            };

            return match &config.custom_wine_path {
                Some(path) if !path.as_os_str().is_empty() => Ok(path.clone()),
                _ => Err(LaunchError::MisconfiguredPrefix(
                    "The 'custom' Wine version can be used only if the custom wine path is set."
                        .to_owned(),
                )),
            };
        }

        Ok(self.path_wine_dir.join(version).join("bin/wine"))
    }

    /// Version of a Wine build, e.g. `8.0` for `wine-8.0`, or an empty string if it can not be
    /// run
    pub fn get_system_wine_version(&self, wine_path: &str) -> String {
        if wine_path == "wine" {
            if !self.probe.can_find_executable("wine") {
                return String::new();
            }
        } else if !Path::new(wine_path).exists() {
            return String::new();
        }

        let version = read_process_output(&[wine_path.to_owned(), "--version".to_owned()], None);
        if version.is_empty() {
            error!("{COMPONENT} - Error reading wine version for {wine_path}");
            return String::new();
        }

        version
            .strip_prefix("wine-")
            .map_or(version.clone(), str::to_owned)
    }

    /// Whether Wine is installed outside of the launcher's own directory
    pub fn is_installed_systemwide(&self) -> bool {
        self.system_builds
            .iter()
            .any(|(_, path)| self.probe.can_find_executable(path))
    }

    pub fn list_system_wine_versions(&self) -> Vec<String> {
        self.system_builds
            .iter()
            .filter(|(_, path)| !self.get_system_wine_version(path).is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Versions installed in the launcher's Wine directory, most recent first
    pub fn list_lutris_wine_versions(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.path_wine_dir) {
            Ok(entries) => entries,
            Err(e) => {
                trace!("{COMPONENT} - No managed Wine versions: {e}");
                return Vec::new();
            }
        };

        let names = entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();

        version_sort(names, true)
            .into_iter()
            .filter(|name| {
                self.get_wine_path_for_version(Some(name), None)
                    .is_ok_and(|path| path.is_file())
            })
            .collect()
    }

    pub fn list_proton_versions(&self) -> Vec<String> {
        self.get_proton_paths()
            .iter()
            .flat_map(|proton_path| {
                get_proton_dir_names(proton_path)
                    .into_iter()
                    .filter(|version| {
                        PROTON_WINE_PATHS
                            .iter()
                            .any(|wine| proton_path.join(version).join(wine).is_file())
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Every installed version: system builds, then managed builds, then Proton. Worked out on
    /// first use and kept for the lifetime of the registry.
    pub fn get_installed_wine_versions(&self) -> &[String] {
        self.installed_versions.get_or_init(|| {
            let versions: Vec<String> = self
                .list_system_wine_versions()
                .into_iter()
                .chain(self.list_lutris_wine_versions())
                .chain(self.list_proton_versions())
                .collect();

            debug!("{COMPONENT} - Installed versions: {versions:?}");
            versions
        })
    }

    /// `preferred` if it is installed, otherwise the first installed version
    pub fn get_default_wine_version(&self, preferred: Option<&str>) -> Result<String, LaunchError> {
        let installed = self.get_installed_wine_versions();

        if let Some(version) = preferred.and_then(|p| installed.iter().find(|v| *v == p)) {
            return Ok(version.clone());
        }

        installed
            .first()
            .cloned()
            .ok_or_else(|| LaunchError::UnavailableRunner("Wine".to_owned()))
    }
}

fn get_proton_dir_names(path: &Path) -> Vec<String> {
    match fs::read_dir(path) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains("Proton"))
            .sorted()
            .collect(),
        Err(e) => {
            warn!("{COMPONENT} - Could not read {path:?}: {e}");
            Vec::new()
        }
    }
}

// EXECUTABLES --------------------------------------------------------------------------
/// Program able to start a Windows file, with its arguments and working directory
pub fn get_real_executable(
    windows_executable: &str,
    working_dir: Option<&str>,
) -> (String, Vec<String>, Option<String>) {
    let exec_name = windows_executable.to_lowercase();
    let working_dir = working_dir.filter(|dir| !dir.is_empty()).map(str::to_owned);

    if exec_name.ends_with(".msi") {
        return (
            "msiexec".to_owned(),
            vec!["/i".to_owned(), windows_executable.to_owned()],
            working_dir,
        );
    }

    if exec_name.ends_with(".bat") {
        let path = Path::new(windows_executable);
        let script_dir = path
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (script, working_dir) = match &working_dir {
            Some(dir) if *dir != script_dir => (windows_executable.to_owned(), working_dir.clone()),
            _ => (
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                Some(script_dir).filter(|dir| !dir.is_empty()),
            ),
        };

        return ("cmd".to_owned(), vec!["/C".to_owned(), script], working_dir);
    }

    if exec_name.ends_with(".lnk") {
        return (
            "start".to_owned(),
            vec!["/unix".to_owned(), windows_executable.to_owned()],
            working_dir,
        );
    }

    (windows_executable.to_owned(), Vec::new(), working_dir)
}

/// Builds a `WINEDLLOVERRIDES` value from DLL names and their override modes, which can be
/// spelled out, e.g. `native,builtin`, or abbreviated, e.g. `n,b`
pub fn get_overrides_env(overrides: &BTreeMap<String, String>) -> String {
    let mut buckets: BTreeMap<usize, Vec<&str>> = BTreeMap::new();

    for (dll, value) in overrides {
        let value = value
            .replace(' ', "")
            .replace("builtin", "b")
            .replace("native", "n")
            .replace("disabled", "d");

        match OVERRIDE_BUCKETS.iter().position(|bucket| *bucket == value) {
            Some(index) => buckets.entry(index).or_default().push(dll),
            None => error!("{COMPONENT} - Invalid override value {value} for {dll}"),
        }
    }

    buckets
        .into_iter()
        .map(|(index, dlls)| format!("{}={}", dlls.iter().sorted().join(","), OVERRIDE_BUCKETS[index]))
        .join(";")
}

// PREFIXES -----------------------------------------------------------------------------
/// A prefix root is a directory with a `system.reg` file in it
pub fn is_prefix_directory(prefix_path: &Path) -> bool {
    if prefix_path.as_os_str().is_empty() {
        return false;
    }

    let prefix_path = expand_user(prefix_path);
    prefix_path.is_dir() && prefix_path.join("system.reg").is_file()
}

/// Architecture of the prefix at `prefix_path`, read from the header of its `system.reg`
pub fn detect_prefix_arch(prefix_path: &Path) -> Result<WineArch, LaunchError> {
    if !is_prefix_directory(prefix_path) {
        return Err(LaunchError::MisconfiguredPrefix(format!(
            "Prefix not found: {}",
            prefix_path.display()
        )));
    }

    let registry = File::open(expand_user(prefix_path).join("system.reg"))?;
    for line in BufReader::new(registry)
        .lines()
        .take(ARCH_SCAN_LINES)
        .map_while(Result::ok)
    {
        if line.contains("win64") {
            return Ok(WineArch::Win64);
        }
        if line.contains("win32") {
            return Ok(WineArch::Win32);
        }
    }

    error!(
        "{COMPONENT} - Failed to detect Wine prefix architecture in {}; defaulting to 32-bit.",
        prefix_path.display()
    );
    Ok(WineArch::Win32)
}

/// Architecture of a prefix if there is one, otherwise whether the Wine build has a 64-bit
/// executable next to it
pub fn detect_arch(prefix_path: Option<&Path>, wine_path: Option<&Path>) -> WineArch {
    if let Some(prefix_path) = prefix_path.filter(|p| is_prefix_directory(p)) {
        if let Ok(arch) = detect_prefix_arch(prefix_path) {
            return arch;
        }
    }

    let has_wine64 = wine_path.is_some_and(|wine_path| {
        let mut wine64 = wine_path.as_os_str().to_owned();
        wine64.push("64");
        Path::new(&wine64).exists()
    });

    if has_wine64 {
        WineArch::Win64
    } else {
        WineArch::Win32
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, write};

    use pretty_assertions::assert_eq;
    use tempfile::{TempDir, tempdir};
    use test_case::test_case;

    use super::*;
    use crate::{linux::test_utils::MockProbe, utils::paths::make_executable};

    fn touch(path: &Path) {
        create_dir_all(path.parent().unwrap()).unwrap();
        write(path, "").unwrap();
    }

    fn write_fake_wine(path: &Path, version: &str) {
        create_dir_all(path.parent().unwrap()).unwrap();
        write(path, format!("#!/bin/sh\necho wine-{version}\n")).unwrap();
        make_executable(path).unwrap();
    }

    /// Registry over a fake system with managed, Proton and `/usr/lib` builds
    fn fake_registry(probe: MockProbe) -> (TempDir, WineVersionRegistry) {
        let root = tempdir().unwrap();
        let path = root.path();

        touch(&path.join("wine/lutris-7.2-x86_64/bin/wine"));
        touch(&path.join("wine/lutris-GE-Proton8-26-x86_64/bin/wine"));
        touch(&path.join("wine/lutris-6.21-x86_64/bin/wine"));
        create_dir_all(path.join("wine/broken-1.0")).unwrap();

        touch(&path.join("steam/steamapps/common/Proton 8.0/dist/bin/wine"));
        touch(&path.join("steam/steamapps/Proton - Experimental/files/bin/wine"));
        create_dir_all(path.join("steam/steamapps/common/Half-Life")).unwrap();

        write_fake_wine(&path.join("lib/wine-9.0/bin/wine"), "9.0");
        create_dir_all(path.join("lib/wine-empty")).unwrap();

        let registry = WineVersionRegistry::with_paths(
            path.join("wine"),
            vec![path.join("steam/steamapps")],
            &path.join("lib"),
            Arc::new(probe),
        );

        (root, registry)
    }

    #[test_case(&["Proton7-10", "Proton8-1", "winehq-staging"], &["Proton8-1", "Proton7-10", "winehq-staging"]; "proton renames")]
    #[test_case(&["lutris-6.21-x86_64", "lutris-7.2-x86_64", "lutris-7.10-x86_64"], &["lutris-7.10-x86_64", "lutris-7.2-x86_64", "lutris-6.21-x86_64"]; "numeric")]
    #[test_case(&["wine-8.0-staging", "wine-8.0-amd64", "lutris-8.0"], &["wine-8.0-staging", "wine-8.0-amd64", "lutris-8.0"]; "tiebreaks")]
    #[test_case(&["custom", "system"], &["custom", "system"]; "no numbers keep order")]
    fn test_version_sort_descending(versions: &[&str], expected: &[&str]) {
        let versions = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(version_sort(versions, true), expected);
    }

    #[test]
    fn test_version_sort_ascending() {
        let versions = vec!["Proton8-1".to_owned(), "winehq-staging".to_owned(), "Proton7-10".to_owned()];
        assert_eq!(
            version_sort(versions, false),
            vec!["winehq-staging", "Proton7-10", "Proton8-1"]
        );
    }

    #[test]
    fn test_parse_wine_version() {
        let parsed = parse_wine_version("Proton7-10");
        assert_eq!(parsed.numbers, vec![7, 10]);
        assert_eq!(parsed.prefix, "Proton-");
    }

    #[test]
    fn test_get_wine_path_for_version() {
        let (root, registry) = fake_registry(MockProbe::with_tools(&["wine"]));
        let path = root.path();

        assert_eq!(
            registry.get_wine_path_for_version(Some("system"), None).unwrap(),
            PathBuf::from("/usr/bin/wine")
        );
        assert!(matches!(
            registry.get_wine_path_for_version(Some("winehq-staging"), None),
            Err(LaunchError::MissingExecutable(_))
        ));
        assert_eq!(
            registry.get_wine_path_for_version(Some("Proton 8.0"), None).unwrap(),
            path.join("steam/steamapps/common/Proton 8.0/dist/bin/wine")
        );
        assert_eq!(
            registry
                .get_wine_path_for_version(Some("Proton - Experimental"), None)
                .unwrap(),
            path.join("steam/steamapps/Proton - Experimental/files/bin/wine")
        );
        assert_eq!(
            registry
                .get_wine_path_for_version(Some("lutris-GE-Proton8-26-x86_64"), None)
                .unwrap(),
            path.join("wine/lutris-GE-Proton8-26-x86_64/bin/wine")
        );
        assert!(matches!(
            registry.get_wine_path_for_version(Some("Proton 3.7"), None),
            Err(LaunchError::UnresolvableVersion(_))
        ));
        assert_eq!(
            registry.get_wine_path_for_version(Some("lutris-5.0"), None).unwrap(),
            path.join("wine/lutris-5.0/bin/wine")
        );
    }

    #[test]
    fn test_get_wine_path_from_config() {
        let (root, registry) = fake_registry(MockProbe::default());
        let config = RunnerConfig {
            version: Some("lutris-7.2-x86_64".to_owned()),
            custom_wine_path: None,
        };

        assert_eq!(
            registry.get_wine_path_for_version(None, Some(&config)).unwrap(),
            root.path().join("wine/lutris-7.2-x86_64/bin/wine")
        );
        assert_eq!(
            registry.get_wine_path_for_version(Some(""), Some(&config)).unwrap(),
            root.path().join("wine/lutris-7.2-x86_64/bin/wine")
        );
        assert!(matches!(
            registry.get_wine_path_for_version(None, None),
            Err(LaunchError::UnspecifiedVersion)
        ));
        assert!(matches!(
            registry.get_wine_path_for_version(None, Some(&RunnerConfig::default())),
            Err(LaunchError::UnspecifiedVersion)
        ));
    }

    #[test_case(None; "no config")]
    #[test_case(Some(RunnerConfig::default()); "no custom path")]
    #[test_case(Some(RunnerConfig { version: None, custom_wine_path: Some(PathBuf::new()) }); "empty custom path")]
    fn test_custom_version_misconfigured(config: Option<RunnerConfig>) {
        let (_root, registry) = fake_registry(MockProbe::default());

        assert!(matches!(
            registry.get_wine_path_for_version(Some("custom"), config.as_ref()),
            Err(LaunchError::MisconfiguredPrefix(_))
        ));
    }

    #[test]
    fn test_custom_version() {
        let (_root, registry) = fake_registry(MockProbe::default());
        let config = RunnerConfig {
            version: Some("custom".to_owned()),
            custom_wine_path: Some(PathBuf::from("/opt/my-wine/bin/wine")),
        };

        assert_eq!(
            registry.get_wine_path_for_version(None, Some(&config)).unwrap(),
            PathBuf::from("/opt/my-wine/bin/wine")
        );
    }

    #[test]
    fn test_list_versions() {
        let (root, registry) = fake_registry(MockProbe::default());

        assert_eq!(
            registry.get_proton_paths(),
            vec![
                root.path().join("steam/steamapps/common"),
                root.path().join("steam/steamapps"),
            ]
        );
        assert_eq!(
            registry.list_proton_versions(),
            vec!["Proton 8.0", "Proton - Experimental"]
        );
        assert_eq!(
            registry.list_lutris_wine_versions(),
            vec![
                "lutris-GE-Proton8-26-x86_64",
                "lutris-7.2-x86_64",
                "lutris-6.21-x86_64"
            ]
        );

        let system_versions = registry.list_system_wine_versions();
        assert!(system_versions.contains(&"System wine-9.0".to_owned()));
        assert!(!system_versions.contains(&"system".to_owned()));
        assert!(!system_versions.contains(&"System wine-empty".to_owned()));
    }

    #[test]
    fn test_installed_and_default_versions() {
        let (_root, registry) = fake_registry(MockProbe::default());
        let installed = registry.get_installed_wine_versions().to_vec();

        assert!(installed.contains(&"lutris-7.2-x86_64".to_owned()));
        assert!(installed.ends_with(&["Proton 8.0".to_owned(), "Proton - Experimental".to_owned()]));
        assert_eq!(
            registry.get_default_wine_version(Some("lutris-7.2-x86_64")).unwrap(),
            "lutris-7.2-x86_64"
        );
        assert_eq!(
            registry.get_default_wine_version(Some("lutris-1.0")).unwrap(),
            installed[0]
        );
    }

    #[test]
    fn test_no_versions_installed() {
        let root = tempdir().unwrap();
        let registry = WineVersionRegistry::with_paths(
            root.path().join("wine"),
            Vec::new(),
            &root.path().join("lib"),
            Arc::new(MockProbe::default()),
        );

        assert!(registry.list_lutris_wine_versions().is_empty());
        assert!(registry.get_proton_paths().is_empty());
        assert!(!registry.is_installed_systemwide());
    }

    #[test]
    fn test_get_system_wine_version() {
        let (root, registry) = fake_registry(MockProbe::default());
        let wine_path = root.path().join("lib/wine-9.0/bin/wine");

        assert_eq!(registry.get_system_wine_version(&wine_path.to_string_lossy()), "9.0");
        assert_eq!(registry.get_system_wine_version("/not/a/wine"), "");
        assert_eq!(registry.get_system_wine_version("wine"), "");
    }

    #[test]
    fn test_is_installed_systemwide() {
        let (_root, registry) = fake_registry(MockProbe::with_tools(&["wine"]));
        assert!(registry.is_installed_systemwide());
    }

    #[test]
    fn test_is_gstreamer_build() {
        let root = tempdir().unwrap();
        let wine_path = root.path().join("lutris-8.0/bin/wine");
        touch(&wine_path);

        assert!(!is_gstreamer_build(&wine_path));
        create_dir_all(root.path().join("lutris-8.0/lib64/gstreamer-1.0")).unwrap();
        assert!(is_gstreamer_build(&wine_path));
    }

    #[test_case("setup.msi", None, "msiexec", &["/i", "setup.msi"], None)]
    #[test_case("C:/Games/SETUP.MSI", Some("/games"), "msiexec", &["/i", "C:/Games/SETUP.MSI"], Some("/games"))]
    #[test_case("/games/run.bat", None, "cmd", &["/C", "run.bat"], Some("/games"); "bat moves to its dir")]
    #[test_case("/games/run.bat", Some("/games"), "cmd", &["/C", "run.bat"], Some("/games"); "bat already in its dir")]
    #[test_case("/games/run.bat", Some("/other"), "cmd", &["/C", "/games/run.bat"], Some("/other"); "bat elsewhere")]
    #[test_case("game.lnk", Some(""), "start", &["/unix", "game.lnk"], None)]
    #[test_case("game.exe", Some("/games"), "game.exe", &[], Some("/games"))]
    fn test_get_real_executable(
        exe: &str,
        working_dir: Option<&str>,
        program: &str,
        args: &[&str],
        expected_dir: Option<&str>,
    ) {
        let (real_program, real_args, real_dir) = get_real_executable(exe, working_dir);
        assert_eq!(real_program, program);
        assert_eq!(real_args, args);
        assert_eq!(real_dir.as_deref(), expected_dir);
    }

    #[test_case(&[("d3d9", "native"), ("mscoree", "disabled")], "d3d9=n;mscoree=d"; "native and disabled")]
    #[test_case(&[("xinput1_3", "builtin, native"), ("d3d11", "native,builtin"), ("dxgi", "n,b")], "d3d11,dxgi=n,b;xinput1_3=b,n"; "buckets and sorting")]
    #[test_case(&[("winemenubuilder", ""), ("d3dx9", "b")], "d3dx9=b;winemenubuilder="; "empty bucket last")]
    #[test_case(&[("d3d9", "sometimes"), ("dinput8", "n")], "dinput8=n"; "invalid skipped")]
    #[test_case(&[], ""; "nothing")]
    fn test_get_overrides_env(overrides: &[(&str, &str)], expected: &str) {
        let overrides = overrides
            .iter()
            .map(|(dll, value)| (dll.to_string(), value.to_string()))
            .collect();
        assert_eq!(get_overrides_env(&overrides), expected);
    }

    #[test_case("WINE REGISTRY Version 2\n;; All keys relative to \\\\Machine\n\n#arch=win64\n", WineArch::Win64; "win64")]
    #[test_case("WINE REGISTRY Version 2\n#arch=win32\n", WineArch::Win32; "win32")]
    #[test_case("WINE REGISTRY Version 2\n\n\n\n\n#arch=win64\n", WineArch::Win32; "marker too late")]
    fn test_detect_prefix_arch(registry: &str, expected: WineArch) {
        let prefix = tempdir().unwrap();
        write(prefix.path().join("system.reg"), registry).unwrap();

        assert!(is_prefix_directory(prefix.path()));
        assert_eq!(detect_prefix_arch(prefix.path()).unwrap(), expected);
        assert_eq!(detect_arch(Some(prefix.path()), None), expected);
    }

    #[test]
    fn test_detect_arch_without_prefix() {
        let root = tempdir().unwrap();
        let wine_path = root.path().join("bin/wine");
        touch(&wine_path);

        assert!(!is_prefix_directory(root.path()));
        assert!(matches!(
            detect_prefix_arch(root.path()),
            Err(LaunchError::MisconfiguredPrefix(_))
        ));
        assert_eq!(detect_arch(Some(root.path()), Some(wine_path.as_path())), WineArch::Win32);

        touch(&root.path().join("bin/wine64"));
        assert_eq!(detect_arch(Some(root.path()), Some(wine_path.as_path())), WineArch::Win64);
        assert_eq!(detect_arch(None, None), WineArch::Win32);
    }
}
