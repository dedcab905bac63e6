mod app;

use rendev::config::{CONFIG_PATH, GfxConfig};
use rendev::logging::{self, LogLevel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    logging::init(LogLevel::Warn);

    let config = GfxConfig::load(CONFIG_PATH);
    log::set_max_level(config.log_level.as_level_filter());
    app::run(config)
}
