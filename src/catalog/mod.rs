//! Item catalog: definitions (IDE) and placements (IPL).
//!
//! Definitions are keyed by id in a `BTreeMap`, so every later phase walks
//! them in ascending id order and the baked output is deterministic.
//! Placements are grouped by id in file order.

pub mod tokenizer;
pub mod definition;
pub mod placement;

pub use definition::{DefinitionKind, ItemDefinition, ItemFlags, parse_static_line, parse_timed_line};
pub use placement::{ItemPlacement, parse_placement_line};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::core::{BakeConfig, Result};
use tokenizer::section_lines;

/// Definitions, placements and the asset files they depend on
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    definitions: BTreeMap<u32, ItemDefinition>,
    placements: BTreeMap<u32, Vec<ItemPlacement>>,
    /// Model name -> id; rebound to the placement id when a placement is accepted
    model_ids: HashMap<String, u32>,
    dependent_dff: BTreeSet<String>,
    dependent_txd: BTreeSet<String>,
    render_hour: i32,
    interiors: Vec<i32>,
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::new(12, vec![0, 13])
    }
}

impl ItemCatalog {
    /// Create an empty catalog with the given visibility filters
    pub fn new(render_hour: i32, interiors: Vec<i32>) -> Self {
        Self {
            definitions: BTreeMap::new(),
            placements: BTreeMap::new(),
            model_ids: HashMap::new(),
            dependent_dff: BTreeSet::new(),
            dependent_txd: BTreeSet::new(),
            render_hour,
            interiors,
        }
    }

    /// Create an empty catalog using the filters of a bake config
    pub fn from_config(config: &BakeConfig) -> Self {
        Self::new(config.render_hour, config.interiors.clone())
    }

    /// Load the `objs` and `tobj` sections of an IDE file.
    ///
    /// Returns the number of accepted definitions.
    pub fn load_definitions(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.parse_definitions(&text, &path.display().to_string()))
    }

    /// Parse IDE text; `source` only labels diagnostics
    pub fn parse_definitions(&mut self, text: &str, source: &str) -> usize {
        let mut accepted = 0;
        for line in section_lines(text, "objs") {
            match parse_static_line(line) {
                Some(def) => {
                    if self.add_definition(def) {
                        accepted += 1;
                    }
                }
                None => log::error!("{}: cannot match OBJS line as IDE type 1, 2 nor 3: '{}'. Skipping!", source, line),
            }
        }
        for line in section_lines(text, "tobj") {
            match parse_timed_line(line) {
                Some(def) => {
                    if self.add_definition(def) {
                        accepted += 1;
                    }
                }
                None => log::error!("{}: cannot match TOBJ line as IDE type 1, 2 nor 3: '{}'. Skipping!", source, line),
            }
        }
        log::debug!("{}: {} definitions accepted", source, accepted);
        accepted
    }

    /// Add a definition unless it is a LOD, nameless, or (when timed)
    /// invisible at the render hour. Returns whether it was accepted.
    pub fn add_definition(&mut self, def: ItemDefinition) -> bool {
        if def.model_name.is_empty() || def.is_lod() {
            return false;
        }
        if def.kind == DefinitionKind::Timed && !def.visible_at(self.render_hour) {
            return false;
        }

        self.model_ids.insert(def.model_name.clone(), def.id);
        self.dependent_dff.insert(format!("{}.dff", def.model_name));
        self.dependent_txd.insert(format!("{}.txd", def.txd_name));
        self.definitions.insert(def.id, def);
        true
    }

    /// Load the `inst` section of an IPL file for `zone`.
    ///
    /// Returns the number of accepted placements.
    pub fn load_placements(&mut self, path: &Path, zone: &str) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.parse_placements(&text, zone))
    }

    /// Parse IPL text for `zone`
    pub fn parse_placements(&mut self, text: &str, zone: &str) -> usize {
        let mut accepted = 0;
        for line in section_lines(text, "inst") {
            match parse_placement_line(line) {
                Some(placement) => {
                    if self.add_placement(placement, zone) {
                        accepted += 1;
                    }
                }
                None => log::error!("{}: cannot parse as IPL line: '{}'. Skipping!", zone, line),
            }
        }
        log::debug!("{}: {} placements accepted", zone, accepted);
        accepted
    }

    /// Add a placement if its model is defined and its interior is kept
    pub fn add_placement(&mut self, placement: ItemPlacement, zone: &str) -> bool {
        if !self.model_ids.contains_key(&placement.model_name) {
            log::warn!(
                "Item placement references UNLOADED DFF! IPL={} DFF={}",
                zone, placement.model_name
            );
            return false;
        }
        if !self.interiors.contains(&placement.interior) {
            return false;
        }

        self.model_ids.insert(placement.model_name.clone(), placement.id);
        self.placements.entry(placement.id).or_default().push(placement);
        true
    }

    /// Definitions in ascending id order
    pub fn definitions(&self) -> &BTreeMap<u32, ItemDefinition> {
        &self.definitions
    }

    /// Placements grouped by id, ascending
    pub fn placements(&self) -> &BTreeMap<u32, Vec<ItemPlacement>> {
        &self.placements
    }

    /// Get a definition by id
    pub fn definition(&self, id: u32) -> Option<&ItemDefinition> {
        self.definitions.get(&id)
    }

    /// Id currently bound to a model name
    pub fn model_id(&self, model_name: &str) -> Option<u32> {
        self.model_ids.get(model_name).copied()
    }

    /// DFF file names referenced by accepted definitions
    pub fn dependent_dff(&self) -> &BTreeSet<String> {
        &self.dependent_dff
    }

    /// TXD file names referenced by accepted definitions
    pub fn dependent_txd(&self) -> &BTreeSet<String> {
        &self.dependent_txd
    }

    /// Total number of accepted placements
    pub fn placement_count(&self) -> usize {
        self.placements.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDE: &str = "\
# generic objects
objs
5, foo, bar, 1, 50, 0
6, lodfoo, bar, 1, 50, 0
7, LODbar, bar, 1, 50, 0
8, far, bar, 1, 950, 0
9, two, bar, 2, 50, 100, 0
broken line
end
tobj
20, night, bar, 1, 50, 0, 20, 5
21, day, bar, 1, 50, 0, 5, 20
end
";

    #[test]
    fn test_lods_and_invisible_timed_objects_are_excluded() {
        let mut catalog = ItemCatalog::default();
        let accepted = catalog.parse_definitions(IDE, "test.ide");
        assert_eq!(accepted, 3);

        let ids: Vec<u32> = catalog.definitions().keys().copied().collect();
        assert_eq!(ids, vec![5, 9, 21]);
        for def in catalog.definitions().values() {
            assert!(def.draw_distance[0] < 900.0);
            assert!(!def.model_name.to_ascii_lowercase().starts_with("lod"));
        }
    }

    #[test]
    fn test_render_hour_is_configurable() {
        let mut catalog = ItemCatalog::new(22, vec![0]);
        catalog.parse_definitions(IDE, "test.ide");
        assert!(catalog.definition(20).is_some());
        assert!(catalog.definition(21).is_none());
    }

    #[test]
    fn test_dependencies_are_tracked() {
        let mut catalog = ItemCatalog::default();
        catalog.parse_definitions(IDE, "test.ide");
        assert!(catalog.dependent_dff().contains("foo.dff"));
        assert!(catalog.dependent_dff().contains("day.dff"));
        assert!(!catalog.dependent_dff().contains("lodfoo.dff"));
        assert_eq!(catalog.dependent_txd().len(), 1);
        assert!(catalog.dependent_txd().contains("bar.txd"));
    }

    #[test]
    fn test_placement_filters() {
        let mut catalog = ItemCatalog::default();
        catalog.parse_definitions(IDE, "test.ide");

        let ipl = "\
inst
5, foo, 0, 1, 2, 3, 1, 1, 1, 0, 0, 0, 1
5, foo, 13, 4, 5, 6, 1, 1, 1, 0, 0, 0, 1
5, foo, 3, 7, 8, 9, 1, 1, 1, 0, 0, 0, 1
5, foo, 1, 1, 1, 1, 1, 1, 0, 0, 0, 1
6, lodfoo, 0, 1, 2, 3, 1, 1, 1, 0, 0, 0, 1
99, missing, 0, 1, 2, 3, 1, 1, 1, 0, 0, 0, 1
end
";
        let accepted = catalog.parse_placements(ipl, "test");
        assert_eq!(accepted, 3);
        let foo = &catalog.placements()[&5];
        assert_eq!(foo.len(), 3);
        assert_eq!(foo[0].position, glam::Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(foo[1].interior, 13);
        assert_eq!(foo[2].interior, 0);
        assert_eq!(catalog.placement_count(), 3);
    }

    #[test]
    fn test_placement_rebinds_model_id() {
        let mut catalog = ItemCatalog::default();
        catalog.parse_definitions(IDE, "test.ide");
        catalog.parse_placements("inst\n42, foo, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 1\nend\n", "test");
        assert_eq!(catalog.model_id("foo"), Some(42));
        assert_eq!(catalog.placements()[&42].len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("zone.ide");
        std::fs::write(&path, IDE).expect("write");
        let mut catalog = ItemCatalog::default();
        assert_eq!(catalog.load_definitions(&path).expect("load"), 3);
        assert!(catalog.load_definitions(&dir.path().join("missing.ide")).is_err());
    }
}
