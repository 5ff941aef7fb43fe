//! Run configuration for the baker and the transcoder.
//!
//! Neither tool takes command-line flags. Defaults reproduce the fixed Vice
//! City layout relative to the working directory; a JSON file placed next to
//! the game data can override any field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blob::{Endian, TranscodeOptions};
use crate::core::Result;

/// Config file the baker looks for in the working directory
pub const BAKE_CONFIG_FILE: &str = "vcbake.json";

/// Config file the transcoder looks for in the working directory
pub const REBAKE_CONFIG_FILE: &str = "vcrebake.json";

/// Map zones baked by default, in processing order.
pub const DEFAULT_ZONES: [&str; 22] = [
    "oceandrv", "oceandn", "washints", "washintn", "nbeachbt", "nbeach", "nbeachw", "mall",
    "littleha", "downtown", "downtows", "docks", "airport", "airportN", "haiti", "haitin",
    "islandsf", "golf", "bridge", "starisl", "mansion", "cisland",
];

/// Maximum layer count of one GPU texture array
pub const DEFAULT_MAX_ARRAY_TEXTURE_LAYERS: u32 = 2048;

/// Configuration for one baking run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Directory holding `<zone>/<zone>.ide` and `<zone>/<zone>.ipl`
    pub maps_dir: PathBuf,
    /// Shared definition file parsed before any zone
    pub generic_ide: PathBuf,
    /// Zone names, parsed in order
    pub zones: Vec<String>,
    /// IMG directory (table of contents)
    pub img_dir: PathBuf,
    /// IMG archive with DFF and TXD files
    pub img_archive: PathBuf,
    /// Loose texture dictionary that is not stored in the archive
    pub generic_txd: PathBuf,
    /// Where referenced archive files are extracted to
    pub extract_dir: PathBuf,
    /// Where the four blobs are written
    pub output_dir: PathBuf,
    /// Layer limit of a single texture array slice
    pub max_array_texture_layers: u32,
    /// Hour at which timed objects must be visible to be baked
    pub render_hour: i32,
    /// Interior zones whose placements are kept
    pub interiors: Vec<i32>,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            maps_dir: PathBuf::from("data/maps"),
            generic_ide: PathBuf::from("data/maps/generic.ide"),
            zones: DEFAULT_ZONES.iter().map(|z| z.to_string()).collect(),
            img_dir: PathBuf::from("models/gta3.dir"),
            img_archive: PathBuf::from("models/gta3.img"),
            generic_txd: PathBuf::from("models/generic.txd"),
            extract_dir: PathBuf::from("_extracted"),
            output_dir: PathBuf::from("."),
            max_array_texture_layers: DEFAULT_MAX_ARRAY_TEXTURE_LAYERS,
            render_hour: 12,
            interiors: vec![0, 13],
        }
    }
}

impl BakeConfig {
    /// Load the config from `path` if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        load_json_or_default(path)
    }

    /// Definition file of a zone
    pub fn zone_ide(&self, zone: &str) -> PathBuf {
        self.maps_dir.join(zone).join(format!("{}.ide", zone))
    }

    /// Placement file of a zone
    pub fn zone_ipl(&self, zone: &str) -> PathBuf {
        self.maps_dir.join(zone).join(format!("{}.ipl", zone))
    }
}

/// Configuration for one transcoding run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RebakeConfig {
    /// Directory holding the little-endian blobs
    pub input_dir: PathBuf,
    /// Directory the converted blobs are written to
    pub output_dir: PathBuf,
    /// Inserted before the extension: `meshes.blob` -> `meshes.<suffix>.blob`
    pub output_suffix: String,
    /// Byte order of the target platform
    pub target: Endian,
    /// Convert instance matrices between column- and row-major
    pub transpose_matrices: bool,
    /// Expand RGB texture splits to RGBA
    pub expand_rgb: bool,
}

impl Default for RebakeConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            output_suffix: "ps3".to_string(),
            target: Endian::Big,
            transpose_matrices: true,
            expand_rgb: true,
        }
    }
}

impl RebakeConfig {
    /// Load the config from `path` if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        load_json_or_default(path)
    }

    /// Transcoder options derived from this config
    pub fn options(&self) -> TranscodeOptions {
        TranscodeOptions {
            source: Endian::Little,
            target: self.target,
            compressed_input: cfg!(feature = "lz4"),
            transpose_matrices: self.transpose_matrices,
            expand_rgb: self.expand_rgb,
        }
    }

    /// Output path for an input blob file name
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        let stem = file_name.strip_suffix(".blob").unwrap_or(file_name);
        self.output_dir.join(format!("{}.{}.blob", stem, self.output_suffix))
    }
}

fn load_json_or_default<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let json = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&json)?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}
