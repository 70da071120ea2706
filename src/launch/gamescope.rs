use tracing::debug;

use crate::{
    data::{CapabilityProbe, Resolution, SystemConfig, non_empty},
    error::LaunchError,
    parsers::split_shell_words,
    utils::commands::{DEFAULT_OUTPUT_TIMEOUT, ExecOptions, execute_with_error},
};

const COMPONENT: &str = "Gamescope";

fn push_resolution(args: &mut Vec<String>, flags: [&str; 2], resolution: Option<Resolution>) {
    if let Some(Resolution { width, height }) = resolution {
        args.extend([
            flags[0].to_owned(),
            width.to_string(),
            flags[1].to_owned(),
            height.to_string(),
        ]);
    }
}

/// Gamescope invocation which runs whatever follows it inside of the compositor. Ends with
/// `--`, so the game's command can be appended as is.
pub fn get_gamescope_args(
    config: &SystemConfig,
    probe: &dyn CapabilityProbe,
) -> Result<Vec<String>, LaunchError> {
    let mut args = vec!["gamescope".to_owned()];

    push_resolution(&mut args, ["-w", "-h"], config.gamescope_game_res);
    push_resolution(&mut args, ["-W", "-H"], config.gamescope_output_res);

    if let Some(fps_limiter) = non_empty(&config.gamescope_fps_limiter) {
        args.extend(["-r".to_owned(), fps_limiter.to_owned()]);
    }

    if let Some(window_mode) = non_empty(&config.gamescope_window_mode) {
        args.push(window_mode.to_owned());
    }

    if let Some(flags) = non_empty(&config.gamescope_flags) {
        args.extend(split_shell_words(flags)?);
    }

    if let Some(sharpness) = non_empty(&config.gamescope_fsr_sharpness) {
        args.extend(probe.gamescope_fsr_option());
        args.extend(["--fsr-sharpness".to_owned(), sharpness.to_owned()]);
    }

    if config.gamescope_force_grab_cursor {
        args.push("--force-grab-cursor".to_owned());
    }

    args.push("--".to_owned());
    Ok(args)
}

/// Flags turning on FSR, going by gamescope's help text. `-F fsr` replaced `-U` in 3.12.
pub fn fsr_option_from_help(help_text: &str) -> Vec<String> {
    if help_text.contains("-F, --filter") {
        vec!["-F".to_owned(), "fsr".to_owned()]
    } else {
        vec!["-U".to_owned()]
    }
}

/// Works out the FSR flags of the installed gamescope. There is no direct way to query its
/// version, so its help text is checked.
pub fn get_gamescope_fsr_option(probe: &dyn CapabilityProbe) -> Vec<String> {
    if !probe.can_find_executable("gamescope") {
        return fsr_option_from_help("");
    }

    let (stdout, stderr) = execute_with_error(
        &["gamescope".to_owned(), "--help".to_owned()],
        &ExecOptions {
            timeout: Some(DEFAULT_OUTPUT_TIMEOUT),
            quiet: true,
            ..Default::default()
        },
    );

    let option = fsr_option_from_help(&format!("{stdout}{stderr}"));
    debug!("{COMPONENT} - FSR option: {option:?}");
    option
}
