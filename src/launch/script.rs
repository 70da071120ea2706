use std::{fs, path::Path};

use itertools::Itertools;
use tracing::debug;

use crate::{
    data::{EnvMap, GameplayInfo, Runner},
    error::LaunchError,
    launch::LaunchComposer,
    parsers::parse_export_line,
    utils::{paths::make_executable, strings::quote},
};

const COMPONENT: &str = "Script";

/// Bash script which sets `env`, moves into `working_dir` and runs `command`.
///
/// Values are written between double quotes without any escaping, so a value holding `"`, `$`
/// or a backtick is not read back as it was.
pub fn render_bash_script(command: &[String], env: &EnvMap, working_dir: Option<&Path>) -> String {
    let mut script = String::from("#!/bin/bash\n\n\n# Environment variables\n");

    for (name, value) in env {
        script.push_str(&format!("export {name}=\"{value}\"\n"));
    }

    if let Some(working_dir) = working_dir {
        script.push_str("\n# Working Directory\n");
        script.push_str(&format!("cd {}\n", quote(&working_dir.to_string_lossy())));
    }

    script.push_str("\n# Command\n");
    script.push_str(&command.iter().map(|token| quote(token)).join(" "));

    script
}

/// Environment set by the `export` lines of a script written by [`render_bash_script`]
pub fn read_exported_env(script: &str) -> EnvMap {
    script
        .lines()
        .filter_map(|line| parse_export_line(line).ok())
        .map(|(_, (name, value))| (name.to_owned(), value.to_owned()))
        .collect()
}

/// Writes a script to `script_path` which launches the game the same way the launcher would,
/// and makes it executable
#[tracing::instrument(level = "trace", skip(composer))]
pub fn export_bash_script(
    composer: &LaunchComposer,
    runner: &dyn Runner,
    gameplay: &GameplayInfo,
    script_path: &Path,
) -> Result<(), LaunchError> {
    runner.prelaunch()?;

    let mut launch = composer.get_launch_parameters(runner, gameplay)?;
    // Some terminals set TERM to values the script can not run with
    launch.env.insert("TERM".to_owned(), "xterm".to_owned());

    let script = render_bash_script(&launch.command, &launch.env, gameplay.working_dir.as_deref());
    fs::write(script_path, script)?;
    make_executable(script_path)?;

    debug!("{COMPONENT} - Launch script written to {script_path:?}");
    Ok(())
}
