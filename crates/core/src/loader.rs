//! Concurrent fetch of both page feeds for one loading window.

use crate::api::{AnnotationBackend, AnnotationsQuery, AnnotationsResponse, RevisionSelector};
use crate::error::BackendResult;
use annotator_cache::LoadRequest;
use doc_model::TokenPage;

/// Both feed results for one [`LoadRequest`].
#[derive(Debug)]
pub struct FetchedWindow {
    pub request: LoadRequest,
    pub annotations: BackendResult<AnnotationsResponse>,
    pub tokens: BackendResult<Vec<TokenPage>>,
}

/// Issue the annotation and token fetches together and wait for both.
pub async fn fetch_window(
    backend: &dyn AnnotationBackend,
    request: LoadRequest,
    selector: RevisionSelector,
    file_id: u64,
    user_id: Option<String>,
) -> FetchedWindow {
    let query = AnnotationsQuery {
        job_or_revision: selector,
        file_id,
        page_numbers: request.page_numbers.clone(),
        user_id,
    };

    let (annotations, tokens) = tokio::join!(
        backend.fetch_annotations(query),
        backend.fetch_tokens(file_id, request.page_numbers.clone()),
    );

    FetchedWindow { request, annotations, tokens }
}
