//! The review pipeline, stage by stage.
//!
//! ```text
//! input    path / URL / raw bytes  →  ResolvedInput (bytes + format)
//! extract  ResolvedInput           →  ordered Blocks + format body
//! filter   Blocks × patterns       →  FlaggedBlocks (keyed, order kept)
//! disposition  FlaggedBlocks × plan →  modification map + outcomes
//! splice   body × modifications    →  revised bytes
//! plural   revised text            →  pluralized text (optional)
//! ```
//!
//! Stages are plain functions over explicit inputs; orchestration and
//! timing live in [`crate::review`].

pub mod disposition;
pub mod extract;
pub mod filter;
pub mod input;
pub mod plural;
pub mod splice;
