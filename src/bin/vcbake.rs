//! Vice City baker binary.
//!
//! Usage: cargo run --release --bin vcbake
//!
//! Run from the game directory. Paths and zones default to the stock
//! layout and can be overridden in `vcbake.json`. Writes
//! `texturebuckets.blob`, `meshes.blob`, `instances.blob`,
//! `drawables.blob` and `bake_summary.json`.
//!
//! Exit codes: 1 IDE, 2 IPL, 3 extraction, 4 DFF, 5 TXD, 6 mesh blob,
//! 7 texture blob, 8 batching, 9 drawable blob, 10 config.

use std::path::Path;
use std::process::ExitCode;

use vcbake::bake::{self, CONFIG_EXIT_CODE};
use vcbake::core::config::{BAKE_CONFIG_FILE, BakeConfig};
use vcbake::core::logging;

fn main() -> ExitCode {
    logging::init();

    let config = match BakeConfig::load_or_default(Path::new(BAKE_CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid {}: {}", BAKE_CONFIG_FILE, e);
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };

    match bake::run(&config) {
        Ok(summary) => {
            log::info!(
                "Baked {} draw calls over {} instances",
                summary.draw_calls,
                summary.instances
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
