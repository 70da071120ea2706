//! Turns a runner's base command into the final command line and environment of a game, by
//! wrapping it with every helper program the configuration asks for.

pub mod gamescope;
pub mod script;

use std::sync::Arc;

use itertools::Itertools;
use tracing::{info, trace, warn};

use crate::{
    data::{CapabilityProbe, EnvMap, GameplayInfo, LaunchResult, Runner, SystemConfig, non_empty},
    error::LaunchError,
    launch::gamescope::get_gamescope_args,
    macros::logs::{debug_stage, warn_missing_tool},
    parsers::{expand_vars, split_shell_words},
    utils::strings::is_valid_env_name,
};

const COMPONENT: &str = "Launch";

/// Command line made of a base command and the wrappers around it. Each wrapper goes around
/// everything added before it, so the last one added runs first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchCommand {
    base: Vec<String>,
    wrappers: Vec<Vec<String>>,
}

impl LaunchCommand {
    pub fn new(base: Vec<String>) -> Self {
        LaunchCommand {
            base,
            wrappers: Vec::new(),
        }
    }

    /// Adds an outer layer. Empty layers are ignored.
    pub fn wrap<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let layer: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if !layer.is_empty() {
            self.wrappers.push(layer);
        }
    }

    /// Wrapper layers, innermost first
    pub fn wrappers(&self) -> &[Vec<String>] {
        &self.wrappers
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.wrappers.is_empty()
    }

    /// Outermost wrapper first, base command last
    pub fn build(self) -> Vec<String> {
        self.wrappers
            .into_iter()
            .rev()
            .flatten()
            .chain(self.base)
            .collect()
    }
}

/// Mangohud wrapper and its environment, if it is enabled and installed
pub fn get_mangohud_conf(
    config: &SystemConfig,
    probe: &dyn CapabilityProbe,
) -> Option<(Vec<String>, EnvMap)> {
    if !config.mangohud || !probe.can_find_executable("mangohud") {
        return None;
    }

    // Anything other than 0 crashes games running inside gamescope
    let mangohud = if config.gamescope { "0" } else { "1" };

    Some((
        vec!["mangohud".to_owned()],
        EnvMap::from([
            ("MANGOHUD".to_owned(), mangohud.to_owned()),
            ("MANGOHUD_DLSYM".to_owned(), "1".to_owned()),
        ]),
    ))
}

/// `taskset` arguments restricting a game to its first cores. Anything but a plain number
/// counts as a single core.
pub fn get_taskset_args(limit_cpu_count: Option<&str>) -> Vec<String> {
    let count = limit_cpu_count
        .filter(|limit| !limit.is_empty() && limit.chars().all(|c| c.is_ascii_digit()))
        .and_then(|limit| limit.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);

    info!("{COMPONENT} - The game will run on {count} CPU core(s)");

    vec!["taskset".to_owned(), "-c".to_owned(), format!("0-{}", count - 1)]
}

/// Adds `overrides` on top of `env`, skipping names a process environment can not hold
fn merge_env(env: &mut EnvMap, overrides: &EnvMap, source: &str) {
    for (key, value) in overrides {
        if is_valid_env_name(key) {
            env.insert(key.clone(), value.clone());
        } else {
            warn!("{COMPONENT} - Dropping invalid environment variable {key:?} from {source}");
        }
    }
}

/// Builds launch commands using what a [`CapabilityProbe`] reports about the system
#[derive(Debug, Clone)]
pub struct LaunchComposer {
    probe: Arc<dyn CapabilityProbe>,
}

impl LaunchComposer {
    pub fn new(probe: Arc<dyn CapabilityProbe>) -> Self {
        LaunchComposer { probe }
    }

    pub fn probe(&self) -> &dyn CapabilityProbe {
        self.probe.as_ref()
    }

    /// Command line and environment for the game described by `gameplay`, using the system
    /// configuration and environment of `runner`
    pub fn get_launch_parameters(
        &self,
        runner: &dyn Runner,
        gameplay: &GameplayInfo,
    ) -> Result<LaunchResult, LaunchError> {
        self.compose(runner.system_config(), &runner.get_env(), gameplay)
    }

    /// Wraps the command of `gameplay` with every enabled wrapper. Missing optional tools only
    /// disable their own wrapper. Fails on a `prefix_command` or `gamescope_flags` value which
    /// can not be split into words.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn compose(
        &self,
        config: &SystemConfig,
        runner_env: &EnvMap,
        gameplay: &GameplayInfo,
    ) -> Result<LaunchResult, LaunchError> {
        let probe = self.probe();
        let mut command = LaunchCommand::new(gameplay.command.clone());
        let mut env = EnvMap::from([(
            "DISABLE_LAYER_AMD_SWITCHABLE_GRAPHICS_1".to_owned(),
            "1".to_owned(),
        )]);

        if let Some(app_id) = probe.host_env("SteamAppId").filter(|id| !id.is_empty()) {
            info!("{COMPONENT} - Game launched from steam (AppId: {app_id})");
            env.insert("LC_ALL".to_owned(), String::new());
        }

        if let Some(locale) = non_empty(&config.locale) {
            env.insert("LC_ALL".to_owned(), locale.to_owned());
        }

        if let Some((tool, tokens)) = config.optimus.wrapper() {
            if probe.can_find_executable(tool) {
                debug_stage!("Optimus", tokens);
                command.wrap(tokens.iter().copied());
            } else {
                trace!("{COMPONENT} - {tool} not found, skipping Optimus");
            }
        }

        if let Some((tokens, mangohud_env)) = get_mangohud_conf(config, probe) {
            debug_stage!("Mangohud", tokens);
            command.wrap(tokens);
            env.extend(mangohud_env);
        }

        if let Some(fps_limit) = non_empty(&config.fps_limit) {
            match probe.find_executable("strangle") {
                Ok(strangle) => {
                    let tokens = [strangle.to_string_lossy().into_owned(), fps_limit.to_owned()];
                    debug_stage!("FPS limiter", tokens);
                    command.wrap(tokens);
                }
                Err(_) => {
                    warn_missing_tool!("FPS limiter", "libstrangle");
                }
            }
        }

        if let Some(prefix_command) = non_empty(&config.prefix_command) {
            let expanded = expand_vars(prefix_command, |name| probe.host_env(name));
            let tokens = split_shell_words(&expanded)?;
            debug_stage!("Prefix command", tokens);
            command.wrap(tokens);
        }

        if config.single_cpu {
            let tokens = get_taskset_args(config.limit_cpu_count.as_deref());
            debug_stage!("CPU limit", tokens);
            command.wrap(tokens);
        }

        merge_env(&mut env, runner_env, "runner");
        merge_env(&mut env, &gameplay.env, "game");

        if let Some(ld_preload) = non_empty(&gameplay.ld_preload) {
            env.insert("LD_PRELOAD".to_owned(), ld_preload.to_owned());
        }

        if let Some(game_ld_library_path) = non_empty(&gameplay.ld_library_path) {
            let current = env.get("LD_LIBRARY_PATH").map(String::as_str);
            let ld_library_path = [Some(game_ld_library_path), current]
                .into_iter()
                .flatten()
                .filter(|path| !path.is_empty())
                .join(":");
            env.insert("LD_LIBRARY_PATH".to_owned(), ld_library_path);
        }

        if config.gamemode && probe.gamemode_available() {
            debug_stage!("Gamemode", ["gamemoderun"]);
            command.wrap(["gamemoderun"]);
        }

        if config.gamescope {
            if probe.can_find_executable("gamescope") {
                let tokens = get_gamescope_args(config, probe)?;
                debug_stage!("Gamescope", tokens);
                command.wrap(tokens);
            } else {
                warn_missing_tool!("Gamescope", "gamescope");
            }
        }

        Ok(LaunchResult {
            command: command.build(),
            env,
        })
    }
}
