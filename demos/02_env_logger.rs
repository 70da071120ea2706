use is_terminal::IsTerminal;
use lib_game_launch::{
    data::{GameplayInfo, SystemConfig},
    get_composer,
    linux::vulkan::GpuNameCache,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// NOTE: run with, e.g. `RUST_LOG=debug cargo run --example 02_env_logger > logs.txt`
fn main() {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .without_time()
                .with_line_number(true)
                // Don't output colours for logs not being printed to a terminal
                .with_ansi(std::io::stdout().is_terminal()),
        )
        .with(EnvFilter::from_default_env())
        .init();

    let config = SystemConfig {
        fps_limit: Some("60".to_owned()),
        single_cpu: true,
        limit_cpu_count: Some("4".to_owned()),
        ..Default::default()
    };

    let _ = get_composer().compose(&config, &Default::default(), &GameplayInfo::new(["true"]));

    let gpu_names = GpuNameCache::new();
    gpu_names.load(true).wait();
    println!("Default GPU: {}", gpu_names.get("", true));
}
