//! Document annotation model
//!
//! Annotation, page and window types shared by the cache and the editing core.
//! Shapes mirror the backend page JSON, which is parsed as-is.

mod annotation;
mod category;
mod geometry;
mod page;
mod range;

pub use annotation::{
    Annotation, AnnotationChanges, AnnotationId, BoundType, CellSpan, DataAttribute, Link,
    LinkType, ModelError, Token,
};
pub use category::{Category, CategoryDataAttribute};
pub use geometry::{Bound, PageSize, Point};
pub use page::{Page, PageNumbered, TokenPage};
pub use range::Range;
