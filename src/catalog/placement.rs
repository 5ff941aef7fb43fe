//! Item placements (IPL `inst` records)

use glam::{Mat4, Quat, Vec3};

use super::tokenizer::{parse_f32, parse_i32, parse_id, parse_name, tokenize};
use crate::math::{normalize_or_identity, placement_rotation};

/// One placed instance of an item definition
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPlacement {
    /// Id of the referenced definition
    pub id: u32,
    pub model_name: String,
    /// Interior zone selector, 0 = outside
    pub interior: i32,
    pub position: Vec3,
    /// Parsed but not applied to the transform
    pub scale: Vec3,
    /// Unit rotation
    pub rotation: Quat,
    /// `T(position) * Rx * Ry * Rz(-roll)`
    pub world_from_object: Mat4,
}

impl ItemPlacement {
    /// Build a placement, normalizing the rotation and deriving its transform
    pub fn new(id: u32, model_name: impl Into<String>, interior: i32, position: Vec3, scale: Vec3, rotation: Quat) -> Self {
        let rotation = normalize_or_identity(rotation);
        let world_from_object = Mat4::from_translation(position) * placement_rotation(rotation);
        Self {
            id,
            model_name: model_name.into(),
            interior,
            position,
            scale,
            rotation,
            world_from_object,
        }
    }
}

/// Field count of an `inst` line with an explicit interior
const ARITY_WITH_INTERIOR: usize = 13;
/// Field count of an `inst` line without an interior
const ARITY_WITHOUT_INTERIOR: usize = 12;

fn parse_vec3(fields: &[&str]) -> Option<Vec3> {
    Some(Vec3::new(parse_f32(fields[0])?, parse_f32(fields[1])?, parse_f32(fields[2])?))
}

fn parse_layout(fields: &[&str], has_interior: bool) -> Option<ItemPlacement> {
    let expected = if has_interior { ARITY_WITH_INTERIOR } else { ARITY_WITHOUT_INTERIOR };
    if fields.len() != expected {
        return None;
    }
    let id = parse_id(fields[0])?;
    let model_name = parse_name(fields[1])?;
    let (interior, rest) = if has_interior {
        (parse_i32(fields[2])?, &fields[3..])
    } else {
        (0, &fields[2..])
    };
    let position = parse_vec3(&rest[0..3])?;
    let scale = parse_vec3(&rest[3..6])?;
    let rotation = Quat::from_xyzw(
        parse_f32(rest[6])?,
        parse_f32(rest[7])?,
        parse_f32(rest[8])?,
        parse_f32(rest[9])?,
    );
    Some(ItemPlacement::new(id, model_name, interior, position, scale, rotation))
}

/// Parse an `inst` record line; the interior field is optional and defaults to 0
pub fn parse_placement_line(line: &str) -> Option<ItemPlacement> {
    let fields = tokenize(line);
    parse_layout(&fields, true).or_else(|| parse_layout(&fields, false))
}
