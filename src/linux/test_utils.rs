use std::{
    cell::Cell,
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::{
    data::{CapabilityProbe, EnvMap, Runner, SystemConfig},
    error::LaunchError,
};

/// Probe with a fixed set of answers, so tests do not depend on what is installed
#[derive(Debug, Default)]
pub struct MockProbe {
    pub executables: HashSet<String>,
    pub gamemode: bool,
    pub fsr_option: Vec<String>,
    pub env: HashMap<String, String>,
}

impl MockProbe {
    pub fn with_tools(tools: &[&str]) -> Self {
        MockProbe {
            executables: tools.iter().map(|t| t.to_string()).collect(),
            fsr_option: vec!["-F".to_owned(), "fsr".to_owned()],
            ..Default::default()
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl CapabilityProbe for MockProbe {
    fn find_executable(&self, name: &str) -> Result<PathBuf, LaunchError> {
        if !self.executables.contains(name) {
            return Err(LaunchError::MissingExecutable(name.to_owned()));
        }

        if Path::new(name).is_absolute() {
            Ok(PathBuf::from(name))
        } else {
            Ok(Path::new("/usr/bin").join(name))
        }
    }

    fn gamemode_available(&self) -> bool {
        self.gamemode
    }

    fn gamescope_fsr_option(&self) -> Vec<String> {
        self.fsr_option.clone()
    }

    fn host_env(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }
}

/// Runner with a fixed configuration, which remembers whether it was prepared
#[derive(Debug, Default)]
pub struct MockRunner {
    pub config: SystemConfig,
    pub env: EnvMap,
    pub prelaunched: Cell<bool>,
}

impl MockRunner {
    pub fn new(config: SystemConfig, env: EnvMap) -> Self {
        MockRunner {
            config,
            env,
            prelaunched: Cell::new(false),
        }
    }
}

impl Runner for MockRunner {
    fn system_config(&self) -> &SystemConfig {
        &self.config
    }

    fn get_env(&self) -> EnvMap {
        self.env.clone()
    }

    fn prelaunch(&self) -> Result<(), LaunchError> {
        self.prelaunched.set(true);
        Ok(())
    }
}
