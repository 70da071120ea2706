use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
    thread::{self, JoinHandle},
};

use itertools::Itertools;
use tracing::{debug, error, trace, warn};
use walkdir::WalkDir;

use crate::{
    data::{EnvMap, IcdFileSets, VendorTag},
    linux::can_find_executable,
    parsers::{parse_vulkaninfo_device_name, strip_parentheticals},
    utils::commands::{DEFAULT_OUTPUT_TIMEOUT, ExecOptions, run_command},
};

const COMPONENT: &str = "Vulkan";

/// Name reported for an ICD set while its background lookup is still running
pub const GPU_INFO_NOT_READY: &str = "GPU Info Not Ready";

/// Distribution specific directories which can hold a `vulkan` folder, searched last
const FALLBACK_DIRS: [&str; 7] = [
    "/usr/local/etc",
    "/usr/local/share",
    "/etc",
    "/usr/share",
    "/usr/lib/x86_64-linux-gnu/GL",
    "/usr/lib/i386-linux-gnu/GL",
    "/opt/amdgpu-pro/etc",
];

// ICD DISCOVERY ------------------------------------------------------------------------
/// Environment the Vulkan loader uses to find ICD files
#[derive(Debug, Clone, Default)]
pub struct IcdSearchEnv {
    pub xdg_config_home: Option<String>,
    pub xdg_config_dirs: Option<String>,
    pub xdg_data_home: Option<String>,
    pub xdg_data_dirs: Option<String>,
    pub home: Option<PathBuf>,
    pub fallback_dirs: Vec<PathBuf>,
}

impl IcdSearchEnv {
    pub fn from_env() -> Self {
        let var = |key: &str| env::var(key).ok().filter(|v| !v.is_empty());

        IcdSearchEnv {
            xdg_config_home: var("XDG_CONFIG_HOME"),
            xdg_config_dirs: var("XDG_CONFIG_DIRS"),
            xdg_data_home: var("XDG_DATA_HOME"),
            xdg_data_dirs: var("XDG_DATA_DIRS"),
            home: var("HOME").map(PathBuf::from).or_else(dirs::home_dir),
            fallback_dirs: FALLBACK_DIRS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Existing `vulkan` directories, in the order the loader reads them
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let home_or = |var: &Option<String>, relative: &str| -> Vec<PathBuf> {
            match (var, &self.home) {
                (Some(dir), _) => vec![PathBuf::from(dir)],
                (None, Some(home)) => vec![home.join(relative)],
                (None, None) => Vec::new(),
            }
        };
        let split_or = |var: &Option<String>, default: &str| -> Vec<PathBuf> {
            var.as_deref()
                .unwrap_or(default)
                .split(':')
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .collect()
        };

        home_or(&self.xdg_config_home, ".config")
            .into_iter()
            .chain(split_or(&self.xdg_config_dirs, "/etc/xdg"))
            .chain([PathBuf::from("/etc")])
            .chain(home_or(&self.xdg_data_home, ".local/share"))
            .chain(split_or(&self.xdg_data_dirs, "/usr/local/share:/usr/share"))
            .chain(self.fallback_dirs.iter().cloned())
            .map(|dir| dir.join("vulkan"))
            .unique()
            .filter(|dir| dir.exists())
            .collect()
    }
}

fn get_icd_files_in(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir.join("icd.d"))
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
}

/// All ICD files found with the given search environment
#[tracing::instrument(level = "trace")]
pub fn get_vk_icd_files_with(search_env: &IcdSearchEnv) -> Vec<PathBuf> {
    search_env
        .search_paths()
        .iter()
        .flat_map(|dir| get_icd_files_in(dir))
        .collect()
}

/// All ICD files the Vulkan loader of this system can see
pub fn get_vk_icd_files() -> Vec<PathBuf> {
    get_vk_icd_files_with(&IcdSearchEnv::from_env())
}

/// Vendor of an ICD file, going by its file name
pub fn classify_icd_file(path: &Path) -> VendorTag {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if name.contains("intel") {
        VendorTag::Intel
    } else if name.contains("radeon") {
        VendorTag::AmdRadv
    } else if name.contains("nvidia") {
        VendorTag::Nvidia
    } else if name.contains("amd") && name.contains("pro") {
        VendorTag::AmdVlkPro
    } else if name.contains("amd") {
        VendorTag::AmdVlk
    } else {
        VendorTag::Unknown
    }
}

/// Groups ICD files by vendor, keeping their search order within each group
pub fn group_icd_files(files: impl IntoIterator<Item = PathBuf>) -> IcdFileSets {
    files.into_iter().fold(IcdFileSets::new(), |mut sets, file| {
        sets.entry(classify_icd_file(&file)).or_default().push(file);
        sets
    })
}

pub fn get_vk_icd_file_sets() -> IcdFileSets {
    let sets = group_icd_files(get_vk_icd_files());
    debug!("{COMPONENT} - ICD file sets: {sets:?}");
    sets
}

/// Joins a set of ICD files the way `VK_DRIVER_FILES` expects them
pub fn join_icd_files(files: &[PathBuf]) -> String {
    files.iter().map(|file| file.to_string_lossy()).join(":")
}

// GPU NAMES ----------------------------------------------------------------------------
/// Reads the name of the GPU the loader picks for an ICD set, with or without `DRI_PRIME`
pub type GpuNameFetcher = Arc<dyn Fn(&str, bool) -> String + Send + Sync>;

/// Turns the standard output of `vulkaninfo --summary` into a GPU name, empty if none is listed.
/// Only the first `deviceName` counts, loader errors about other ICD files in the set do not.
pub fn gpu_name_from_vulkaninfo(output: &str) -> String {
    let is_failure = |text: &str| {
        text.contains("Failed to detect any valid GPUs") || text.contains("ERROR: [Loader Message]")
    };

    match parse_vulkaninfo_device_name(output) {
        Some(name) if is_failure(&name) => "No GPU".to_owned(),
        Some(name) => strip_parentheticals(&name),
        None if is_failure(output) => "No GPU".to_owned(),
        None => String::new(),
    }
}

fn fetch_vulkan_gpu_name(icd_files: &str, use_dri_prime: bool) -> String {
    let mut env = EnvMap::new();
    if !icd_files.is_empty() {
        env.insert("VK_DRIVER_FILES".to_owned(), icd_files.to_owned());
        env.insert("VK_ICD_FILENAMES".to_owned(), icd_files.to_owned());
    }
    if use_dri_prime {
        env.insert("DRI_PRIME".to_owned(), "1".to_owned());
    }

    let options = ExecOptions {
        env,
        timeout: Some(DEFAULT_OUTPUT_TIMEOUT),
        quiet: true,
        ..Default::default()
    };

    match run_command(&["vulkaninfo".to_owned(), "--summary".to_owned()], &options) {
        Ok(output) => gpu_name_from_vulkaninfo(&output.stdout),
        Err(e) => {
            error!("{COMPONENT} - Could not run vulkaninfo: {e}");
            String::new()
        }
    }
}

/// Works out the display name for an ICD set. When `use_dri_prime` is set and the discrete GPU
/// differs from the default one, it is added in parentheses.
pub fn resolve_gpu_name(
    icd_files: &str,
    use_dri_prime: bool,
    fetch: impl Fn(&str, bool) -> String,
) -> String {
    let mut name = fetch(icd_files, false);

    if use_dri_prime {
        let prime_name = fetch(icd_files, true);
        if prime_name != name {
            name = format!("{name} (Discrete GPU: {prime_name})");
        }
    }

    if name.is_empty() {
        "Not Found".to_owned()
    } else {
        name
    }
}

/// Name of the GPU used with the given ICD files, read through `vulkaninfo`
pub fn load_vulkan_gpu_name(icd_files: &str, use_dri_prime: bool) -> String {
    if !can_find_executable("vulkaninfo") {
        warn!("{COMPONENT} - vulkaninfo not available, unable to list GPUs");
        return "Unknown GPU".to_owned();
    }

    resolve_gpu_name(icd_files, use_dri_prime, fetch_vulkan_gpu_name)
}

/// GPU names per `(ICD files, use DRI_PRIME)`, filled in the background. Clones share the same
/// names.
#[derive(Debug, Clone, Default)]
pub struct GpuNameCache {
    names: Arc<RwLock<HashMap<(String, bool), String>>>,
}

/// Handle on the background lookups started by [`GpuNameCache::load`]
#[derive(Debug)]
pub struct GpuNameLoad {
    handles: Vec<JoinHandle<()>>,
}

impl GpuNameLoad {
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(JoinHandle::is_finished)
    }

    /// Blocks until every lookup has stored its result
    pub fn wait(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                error!("{COMPONENT} - A GPU name lookup panicked");
            }
        }
    }
}

impl GpuNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for a `:` joined set of ICD files, or [`GPU_INFO_NOT_READY`] until it is loaded
    pub fn get(&self, icd_files: &str, use_dri_prime: bool) -> String {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(icd_files.to_owned(), use_dri_prime))
            .cloned()
            .unwrap_or_else(|| GPU_INFO_NOT_READY.to_owned())
    }

    /// Starts looking up the GPU names of every ICD set on this system, along with the loader's
    /// default choice
    pub fn load(&self, use_dri_prime: bool) -> GpuNameLoad {
        self.load_with(
            &get_vk_icd_file_sets(),
            use_dri_prime,
            Arc::new(load_vulkan_gpu_name),
        )
    }

    /// Starts one background lookup per ICD set, plus one for the empty default set
    pub fn load_with(
        &self,
        icd_file_sets: &IcdFileSets,
        use_dri_prime: bool,
        fetcher: GpuNameFetcher,
    ) -> GpuNameLoad {
        let handles = icd_file_sets
            .values()
            .map(|files| join_icd_files(files))
            .chain([String::new()])
            .unique()
            .map(|icd_files| {
                let names = Arc::clone(&self.names);
                let fetcher = Arc::clone(&fetcher);

                thread::spawn(move || {
                    let name = fetcher(&icd_files, use_dri_prime);
                    trace!("{COMPONENT} - GPU name for {icd_files:?}: {name}");

                    names
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert((icd_files, use_dri_prime), name);
                })
            })
            .collect();

        GpuNameLoad { handles }
    }
}
