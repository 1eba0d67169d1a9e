//! Frame catalog and frame-element resolution

mod catalog;
mod relations;
mod resolver;

pub use catalog::{
    lexical_unit_key, normalize_frame_name, CatalogEntry, CatalogError, CatalogFrame, CatalogMiss, FeGroup,
    FePattern, FrameCatalog, StaticCatalog, Valence,
};
pub use relations::{RelationRule, RelationTable};
pub use resolver::{
    children_of, resolve, Assignment, FrameDraft, FrameElementResolver, MatchStrategy, Resolution, ResolveError,
    ResolveResult,
};
