use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display, Formatter},
    path::PathBuf,
    str::FromStr,
};

use crate::error::LaunchError;

/// Environment variables handed to a launched process
pub type EnvMap = BTreeMap<String, String>;

/// Returns the contained string, unless it is unset or empty
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// CONFIGURATION ------------------------------------------------------------------------
/// Display resolution given as `WxH`, e.g. `1920x1080`. The separator is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LaunchError::InvalidResolution(s.to_owned());

        let lowered = s.to_lowercase();
        let (width, height) = lowered.split_once('x').ok_or_else(invalid)?;

        Ok(Resolution {
            width: width.parse().map_err(|_| invalid())?,
            height: height.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for Resolution {
    type Error = LaunchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(resolution: Resolution) -> Self {
        resolution.to_string()
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Tool used to run the game on the discrete GPU of an Optimus laptop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum OptimusMode {
    #[default]
    Off,
    Primusrun,
    Optirun,
    Pvkrun,
}

impl OptimusMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimusMode::Off => "off",
            OptimusMode::Primusrun => "primusrun",
            OptimusMode::Optirun => "optirun",
            OptimusMode::Pvkrun => "pvkrun",
        }
    }

    /// Executable which has to be available for this mode, and the tokens it wraps a command with
    pub fn wrapper(&self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            OptimusMode::Off => None,
            OptimusMode::Primusrun => Some(("primusrun", &["primusrun"])),
            OptimusMode::Optirun => Some(("optirun", &["optirun", "-b", "virtualgl"])),
            OptimusMode::Pvkrun => Some(("pvkrun", &["pvkrun"])),
        }
    }
}

impl FromStr for OptimusMode {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "off" => Ok(OptimusMode::Off),
            "primusrun" => Ok(OptimusMode::Primusrun),
            "optirun" => Ok(OptimusMode::Optirun),
            "pvkrun" => Ok(OptimusMode::Pvkrun),
            other => Err(LaunchError::InvalidConfigValue {
                key: "optimus",
                value: other.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for OptimusMode {
    type Error = LaunchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptimusMode> for String {
    fn from(mode: OptimusMode) -> Self {
        mode.as_str().to_owned()
    }
}

#[cfg(feature = "serde")]
fn deserialize_optional_resolution<'de, D>(deserializer: D) -> Result<Option<Resolution>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    Option::<String>::deserialize(deserializer)?
        .filter(|raw| !raw.is_empty())
        .map(|raw| raw.parse().map_err(serde::de::Error::custom))
        .transpose()
}

/// System level options for launching a game. Unset and empty values both leave the related
/// wrapper out of the launch command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SystemConfig {
    /// Value for `LC_ALL`
    pub locale: Option<String>,
    pub optimus: OptimusMode,
    /// Show the MangoHud overlay
    pub mangohud: bool,
    /// Frame rate cap applied through libstrangle
    pub fps_limit: Option<String>,
    /// Shell-style command placed in front of the game's command
    pub prefix_command: Option<String>,
    /// Restrict the game to the first `limit_cpu_count` cores
    pub single_cpu: bool,
    pub limit_cpu_count: Option<String>,
    /// Run through Feral's gamemode
    pub gamemode: bool,
    /// Run inside the gamescope compositor
    pub gamescope: bool,
    pub gamescope_force_grab_cursor: bool,
    pub gamescope_fsr_sharpness: Option<String>,
    /// Extra flags passed verbatim to gamescope
    pub gamescope_flags: Option<String>,
    /// Raw gamescope flag, e.g. `-f` for fullscreen or `-b` for borderless
    pub gamescope_window_mode: Option<String>,
    pub gamescope_fps_limiter: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(deserialize_with = "deserialize_optional_resolution")
    )]
    pub gamescope_output_res: Option<Resolution>,
    #[cfg_attr(
        feature = "serde",
        serde(deserialize_with = "deserialize_optional_resolution")
    )]
    pub gamescope_game_res: Option<Resolution>,
}

/// Runner level options used to pick a Wine build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RunnerConfig {
    /// Name of the Wine version, e.g. `lutris-7.2-x86_64`, `Proton-8.0` or `custom`
    pub version: Option<String>,
    /// Wine executable to use when `version` is `custom`
    pub custom_wine_path: Option<PathBuf>,
}

// LAUNCH DATA --------------------------------------------------------------------------
/// What a runner wants to execute, before any wrappers are applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct GameplayInfo {
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: EnvMap,
    pub ld_preload: Option<String>,
    pub ld_library_path: Option<String>,
}

impl GameplayInfo {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GameplayInfo {
            command: command.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Final command line and environment for a game
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaunchResult {
    pub command: Vec<String>,
    pub env: EnvMap,
}

// WINE ---------------------------------------------------------------------------------
/// Architecture of a Wine prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WineArch {
    Win32,
    Win64,
}

impl Display for WineArch {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                WineArch::Win32 => "win32",
                WineArch::Win64 => "win64",
            }
        )
    }
}

// VULKAN -------------------------------------------------------------------------------
/// Driver vendor an ICD file belongs to
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum VendorTag {
    Intel,
    AmdRadv,
    Nvidia,
    AmdVlk,
    AmdVlkPro,
    Unknown,
}

impl Debug for VendorTag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                VendorTag::Intel => "intel",
                VendorTag::AmdRadv => "amdradv",
                VendorTag::Nvidia => "nvidia",
                VendorTag::AmdVlk => "amdvlk",
                VendorTag::AmdVlkPro => "amdvlkpro",
                VendorTag::Unknown => "unknown",
            }
        )
    }
}

/// Vulkan ICD files grouped by vendor, in loader search order
pub type IcdFileSets = BTreeMap<VendorTag, Vec<PathBuf>>;

// TRAITS -------------------------------------------------------------------------------
/// Read-only questions about the host system which decide whether a wrapper can be used
pub trait CapabilityProbe: Send + Sync + Debug {
    /// Absolute path of an executable, looked up on `PATH` when not given as a path
    fn find_executable(&self, name: &str) -> Result<PathBuf, LaunchError>;

    fn can_find_executable(&self, name: &str) -> bool {
        !name.is_empty() && self.find_executable(name).is_ok()
    }

    fn gamemode_available(&self) -> bool;

    /// Gamescope flags which turn on FSR upscaling for the installed gamescope version
    fn gamescope_fsr_option(&self) -> Vec<String>;

    /// Variable from the environment this process was started with
    fn host_env(&self, key: &str) -> Option<String>;
}

// Runners are what turn a game's configuration into the base command, e.g. Wine or Linux
pub trait Runner: Debug {
    fn system_config(&self) -> &SystemConfig;
    fn get_env(&self) -> EnvMap;

    /// Work to do before the game's command is built, like setting up a prefix
    fn prelaunch(&self) -> Result<(), LaunchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case("1920x1080", 1920, 1080)]
    #[test_case("1920X1080", 1920, 1080)]
    #[test_case("800x600", 800, 600)]
    fn test_resolution_from_str(raw: &str, width: u32, height: u32) {
        let resolution: Resolution = raw.parse().unwrap();
        assert_eq!(resolution, Resolution { width, height });
        assert_eq!(resolution.to_string(), format!("{width}x{height}"));
    }

    #[test_case(""; "empty")]
    #[test_case("1920"; "missing height")]
    #[test_case("1920x1080x60"; "too many parts")]
    #[test_case("widexhigh"; "not numbers")]
    fn test_resolution_invalid(raw: &str) {
        assert!(matches!(
            raw.parse::<Resolution>(),
            Err(LaunchError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_optimus_wrapper() {
        assert_eq!(OptimusMode::Off.wrapper(), None);
        assert_eq!(
            "optirun".parse::<OptimusMode>().unwrap().wrapper(),
            Some(("optirun", &["optirun", "-b", "virtualgl"][..]))
        );
        assert_eq!("".parse::<OptimusMode>().unwrap(), OptimusMode::Off);
        assert!("bumblebee".parse::<OptimusMode>().is_err());
    }

    #[test]
    fn test_vendor_tag_debug() {
        assert_eq!(format!("{:?}", VendorTag::AmdVlkPro), "amdvlkpro");
        assert_eq!(WineArch::Win64.to_string(), "win64");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_system_config_from_json() {
        let config: SystemConfig = serde_json::from_str(
            r#"{
                "gamescope": true,
                "gamescope_output_res": "2560X1440",
                "gamescope_game_res": "",
                "optimus": "pvkrun",
                "limit_cpu_count": "4"
            }"#,
        )
        .unwrap();

        assert!(config.gamescope);
        assert!(!config.mangohud);
        assert_eq!(config.optimus, OptimusMode::Pvkrun);
        assert_eq!(
            config.gamescope_output_res,
            Some(Resolution {
                width: 2560,
                height: 1440
            })
        );
        assert_eq!(config.gamescope_game_res, None);
        assert_eq!(config.limit_cpu_count.as_deref(), Some("4"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_system_config_rejects_bad_resolution() {
        let config = serde_json::from_str::<SystemConfig>(r#"{"gamescope_output_res": "big"}"#);
        assert!(config.is_err());
    }

    #[cfg(feature = "serde")]
    #[test_case(r#""""#, Some(OptimusMode::Off))]
    #[test_case(r#""off""#, Some(OptimusMode::Off))]
    #[test_case(r#""optirun""#, Some(OptimusMode::Optirun))]
    #[test_case(r#""bumblebee""#, None)]
    fn test_optimus_mode_from_json(json: &str, expected: Option<OptimusMode>) {
        assert_eq!(serde_json::from_str::<OptimusMode>(json).ok(), expected);
        assert_eq!(json.trim_matches('"').parse::<OptimusMode>().ok(), expected);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_optimus_mode_to_json() {
        assert_eq!(
            serde_json::to_string(&OptimusMode::Pvkrun).unwrap(),
            r#""pvkrun""#
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_gameplay_info_from_partial_json() {
        let gameplay: GameplayInfo =
            serde_json::from_str(r#"{"command": ["wine", "game.exe"]}"#).unwrap();
        assert_eq!(gameplay, GameplayInfo::new(["wine", "game.exe"]));
    }
}
