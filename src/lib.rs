//! A Rust library for working out how to launch a game on Linux: which command line and which
//! environment variables to hand to the process, and which Wine build to run it with.
//!
//! # Description
//!
//! This library is intended to be used by game launchers. Given a runner's base command and the
//! system configuration of a game, it wraps the command with optional helper programs (Optimus
//! GPU switching, MangoHud, libstrangle, `taskset`, Feral's gamemode and gamescope) in a fixed
//! order, skipping any which are not installed. It can also list and resolve Wine and Proton
//! versions, detect the architecture of Wine prefixes and find Vulkan drivers and GPU names.
//!
//! # Usage
//!
//! ```rust
//! use lib_game_launch::{
//!     data::{GameplayInfo, SystemConfig},
//!     get_composer,
//! };
//!
//! let composer = get_composer();
//! let config = SystemConfig {
//!     gamemode: true,
//!     ..Default::default()
//! };
//!
//! let launch = composer
//!     .compose(&config, &Default::default(), &GameplayInfo::new(["/usr/bin/true"]))
//!     .unwrap();
//! assert_eq!(launch.command.last().map(String::as_str), Some("/usr/bin/true"));
//! ```
//!
//! # Wrapper order
//!
//! Wrappers are applied innermost first, so the last one applied is the first program to run:
//!
//! 1. Optimus (`primusrun`, `optirun -b virtualgl` or `pvkrun`)
//! 2. MangoHud
//! 3. libstrangle FPS limiter
//! 4. Custom prefix command
//! 5. `taskset` CPU limit
//! 6. gamemode
//! 7. gamescope

use cfg_if::cfg_if;

pub mod data;
pub mod error;
pub mod launch;
mod macros;
mod parsers;
pub mod utils;

pub use parsers::{expand_vars, split_shell_words};

cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub mod linux;

        use std::sync::Arc;

        use tracing::error;

        use launch::LaunchComposer;
        use linux::{SystemProbe, wine::WineVersionRegistry};

        /// Primary entry point into the crate - get a [`LaunchComposer`] which checks for tools
        /// on the current system
        pub fn get_composer() -> LaunchComposer {
            LaunchComposer::new(Arc::new(SystemProbe::new()))
        }

        /// Get a [`WineVersionRegistry`] for the current user, or `None` without a home directory
        pub fn get_wine_registry() -> Option<WineVersionRegistry> {
            let (Some(path_home), Some(path_data)) = (dirs::home_dir(), dirs::data_dir()) else {
                error!("No valid $HOME directory found");
                return None;
            };

            Some(WineVersionRegistry::new(
                &path_home,
                &path_data,
                Arc::new(SystemProbe::new()),
            ))
        }
    } else {
        compile_error!("This platform is currently not supported by lib_game_launch");
    }
}
