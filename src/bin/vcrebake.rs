//! Big-endian blob transcoder.
//!
//! Usage: cargo run --release --bin vcrebake
//!
//! Converts the four baked blobs in the working directory into
//! `*.ps3.blob`: big-endian words, row-major instance matrices and RGBA
//! instead of RGB texture splits. `vcrebake.json` can override the
//! directories, the suffix and the options.
//!
//! Exit codes: 1 textures, 2 meshes, 3 instances, 4 drawables, 5 config.

use std::path::Path;
use std::process::ExitCode;

use vcbake::blob::{BlobKind, transcode_file};
use vcbake::core::config::{REBAKE_CONFIG_FILE, RebakeConfig};
use vcbake::core::logging;

const CONFIG_EXIT_CODE: u8 = 5;

fn main() -> ExitCode {
    logging::init();

    let config = match RebakeConfig::load_or_default(Path::new(REBAKE_CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid {}: {}", REBAKE_CONFIG_FILE, e);
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };
    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        log::error!("Cannot create {}: {}", config.output_dir.display(), e);
        return ExitCode::from(CONFIG_EXIT_CODE);
    }

    let options = config.options();
    for (code, kind) in (1u8..).zip(BlobKind::ALL) {
        let input = config.input_dir.join(kind.file_name());
        let output = config.output_path(kind.file_name());
        if let Err(e) = transcode_file(kind, &input, &output, &options) {
            log::error!("Failed to transcode {}: {}", input.display(), e);
            return ExitCode::from(code);
        }
    }
    log::info!("Transcoded {} blobs", BlobKind::ALL.len());
    ExitCode::SUCCESS
}
