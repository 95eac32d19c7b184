//! Annotator Core Library
//!
//! Client-side annotation state for one open task: per-page store, undo
//! history, link geometry, validation workflow and split review, tied
//! together by [`TaskAnnotator`].

pub mod annotator;
pub mod api;
pub mod catalog;
pub mod clipboard;
pub mod error;
pub mod ids;
pub mod invariants;
pub mod links;
pub mod loader;
pub mod settings;
pub mod split;
pub mod store;
pub mod tokens;
pub mod undo;
pub mod validation;

pub use annotator::TaskAnnotator;
pub use api::{
    AnnotationBackend, AnnotationsQuery, AnnotationsResponse, AnnotatorAnnotations, OtherAnnotators,
    RevisionSelector, SaveAck, SaveRequest, ValidatedPageSummary,
};
pub use catalog::CategoryCatalog;
pub use clipboard::Clipboard;
pub use error::{AnnotatorError, AnnotatorResult, BackendError, BackendResult};
pub use ids::TimestampIds;
pub use invariants::{check_page, InvariantViolation};
pub use links::{
    connect, resolve_link_points, BoundLookup, LayeredLookup, LinkSegment, ResolvedShape,
};
pub use loader::{fetch_window, FetchedWindow};
pub use settings::{TaskSettings, ValidationType};
pub use split::{find_equivalent, SplitReview};
pub use store::{AnnotationStore, Deletion, Selection};
pub use undo::{UndoAction, UndoHistory, UndoItem};
pub use validation::{PageStatus, PageValidation};
