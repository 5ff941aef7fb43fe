//! vcbake - Vice City world asset baker
//!
//! Turns the IDE/IPL catalog, DFF models and TXD dictionaries of the PC
//! release into four flat GPU-ready blobs plus a sorted draw call list, and
//! transcodes those blobs for big-endian targets.

pub mod core;
pub mod math;
pub mod catalog;
pub mod archive;
pub mod rw;
pub mod mesh;
pub mod texture;
pub mod batch;
pub mod blob;
pub mod bake;
