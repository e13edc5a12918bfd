//! Input parsing and output rendering, kept separate from the core engine
//! per spec.md §6 ("parsed by the collaborator, out of scope" for the
//! engine itself — this module is the concrete collaborator this crate
//! ships with).

pub mod json_format;
pub mod render;
