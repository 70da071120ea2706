use std::io::{Write, stdout};

use lib_game_launch::{
    data::{GameplayInfo, SystemConfig},
    get_composer,
};
use tracing::debug;

fn main() {
    // Init tracing
    tracing_subscriber::fmt::init();

    let config = SystemConfig {
        mangohud: true,
        gamemode: true,
        gamescope: true,
        gamescope_output_res: "1920x1080".parse().ok(),
        gamescope_window_mode: Some("-f".to_owned()),
        ..Default::default()
    };

    debug!("Initialising composer");
    let composer = get_composer();

    // Wrappers whose tools are not installed are left out
    match composer.compose(&config, &Default::default(), &GameplayInfo::new(["/usr/games/quake"])) {
        Ok(launch) => {
            let serialized =
                serde_json::to_string_pretty(&launch).expect("failed to serialize launch");
            let mut stdout = stdout().lock();
            writeln!(&mut stdout, "{serialized}").expect("failed to write to stdout");
        }
        Err(e) => eprintln!("Could not compose the launch command: {e}"),
    }
}
