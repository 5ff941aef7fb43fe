//! Item definitions (IDE `objs` and `tobj` records)

use super::tokenizer::{parse_f32, parse_i32, parse_id, parse_name, tokenize};

/// Draw distance at or above which a definition is a level-of-detail model
pub const LOD_DRAW_DISTANCE: f32 = 900.0;

bitflags::bitflags! {
    /// Rendering flags of an item definition
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemFlags: u32 {
        /// Wet effect (object appears darker)
        const WET = 1 << 0;
        /// Do not fade the object in or out of view
        const DONT_FADE = 1 << 1;
        /// Transparencies of other objects are visible through this one
        const VISIBLE_THROUGH = 1 << 2;
        const ALPHA_TRANSPARENCY_2 = 1 << 3;
        /// Object belongs to an interior
        const INTERIOR = 1 << 5;
        const NO_SHADOW_MESH = 1 << 6;
        /// Surfaces are not backface culled
        const DONT_CULL = 1 << 7;
        /// Only used by LOD objects with draw distance above 299
        const NO_DRAW_DISTANCE = 1 << 8;
        const BREAKABLE = 1 << 9;
        /// Cracks on a strong collision, then breaks
        const BREAKABLE_2 = 1 << 10;
    }
}

/// Which IDE section a definition came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    /// `objs`: always visible
    Static,
    /// `tobj`: visible inside a time window
    Timed,
}

/// One object type from an IDE file
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDefinition {
    /// Unique object id
    pub id: u32,
    /// DFF model name without extension
    pub model_name: String,
    /// TXD dictionary name without extension
    pub txd_name: String,
    /// Number of meshes, equal to the number of draw distances
    pub mesh_count: i32,
    /// Draw distance per mesh; unused entries are zero
    pub draw_distance: [f32; 3],
    pub flags: ItemFlags,
    /// First visible hour
    pub time_on: i32,
    /// First invisible hour; the window wraps when below `time_on`
    pub time_off: i32,
    pub kind: DefinitionKind,
}

impl ItemDefinition {
    /// Whether this definition is a level-of-detail stand-in
    pub fn is_lod(&self) -> bool {
        self.draw_distance[0] >= LOD_DRAW_DISTANCE
            || self.model_name.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("lod"))
    }

    /// Whether the object is visible at `hour` on a 24-hour clock
    pub fn visible_at(&self, hour: i32) -> bool {
        if self.time_off > self.time_on {
            hour >= self.time_on && hour < self.time_off
        } else {
            !(hour >= self.time_off && hour < self.time_on)
        }
    }
}

/// A candidate record layout, identified by its field count
#[derive(Debug, Clone, Copy)]
struct Layout {
    arity: usize,
    distances: usize,
    timed: bool,
}

/// `objs` layouts with one, two and three draw distances, tried in order
const STATIC_LAYOUTS: [Layout; 3] = [
    Layout { arity: 6, distances: 1, timed: false },
    Layout { arity: 7, distances: 2, timed: false },
    Layout { arity: 8, distances: 3, timed: false },
];

/// `tobj` layouts with one, two and three draw distances, tried in order
const TIMED_LAYOUTS: [Layout; 3] = [
    Layout { arity: 8, distances: 1, timed: true },
    Layout { arity: 9, distances: 2, timed: true },
    Layout { arity: 10, distances: 3, timed: true },
];

impl Layout {
    fn parse(&self, fields: &[&str]) -> Option<ItemDefinition> {
        if fields.len() != self.arity {
            return None;
        }
        let id = parse_id(fields[0])?;
        let model_name = parse_name(fields[1])?;
        let txd_name = parse_name(fields[2])?;
        let mesh_count = parse_i32(fields[3])?;

        let mut draw_distance = [0.0f32; 3];
        for (i, slot) in draw_distance.iter_mut().take(self.distances).enumerate() {
            *slot = parse_f32(fields[4 + i])?;
        }

        let rest = &fields[4 + self.distances..];
        let flags = ItemFlags::from_bits_retain(parse_i32(rest[0])? as u32);
        let (time_on, time_off, kind) = if self.timed {
            (parse_i32(rest[1])?, parse_i32(rest[2])?, DefinitionKind::Timed)
        } else {
            (0, 24, DefinitionKind::Static)
        };

        Some(ItemDefinition {
            id,
            model_name,
            txd_name,
            mesh_count,
            draw_distance,
            flags,
            time_on,
            time_off,
            kind,
        })
    }
}

fn parse_with(layouts: &[Layout], line: &str) -> Option<ItemDefinition> {
    let fields = tokenize(line);
    layouts.iter().find_map(|layout| layout.parse(&fields))
}

/// Parse an `objs` record line
pub fn parse_static_line(line: &str) -> Option<ItemDefinition> {
    parse_with(&STATIC_LAYOUTS, line)
}

/// Parse a `tobj` record line
pub fn parse_timed_line(line: &str) -> Option<ItemDefinition> {
    parse_with(&TIMED_LAYOUTS, line)
}
