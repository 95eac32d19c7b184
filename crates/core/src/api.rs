//! Backend contract
//!
//! Request and response shapes are dictated by the backend and parsed as-is.
//! Transport, auth and retries live behind [`AnnotationBackend`].

use crate::error::BackendResult;
use async_trait::async_trait;
use doc_model::{Annotation, Page, TokenPage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which snapshot of the annotations to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionSelector {
    /// Latest state of the job
    Job(u64),
    Revision(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationsQuery {
    pub job_or_revision: RevisionSelector,
    pub file_id: u64,
    pub page_numbers: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationsResponse {
    pub revision: String,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub validated: Vec<u32>,
    #[serde(default)]
    pub failed_validation_pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub task_id: u64,
    pub pages: Vec<Page>,
    pub user_id: String,
    pub base_revision: String,
    pub validated: Vec<u32>,
    pub failed_validation_pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveAck {
    pub revision: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatedPageSummary {
    #[serde(default)]
    pub validated: Vec<u32>,
    #[serde(default)]
    pub failed_validation_pages: Vec<u32>,
    #[serde(default)]
    pub not_processed: Vec<u32>,
}

/// One other annotator's work on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorAnnotations {
    pub user_id: String,
    #[serde(default)]
    pub objs: Vec<Annotation>,
}

pub type OtherAnnotators = BTreeMap<u32, Vec<AnnotatorAnnotations>>;

#[async_trait]
pub trait AnnotationBackend: Send + Sync {
    async fn fetch_annotations(
        &self,
        query: AnnotationsQuery,
    ) -> BackendResult<AnnotationsResponse>;

    async fn fetch_tokens(
        &self,
        file_id: u64,
        page_numbers: Vec<u32>,
    ) -> BackendResult<Vec<TokenPage>>;

    async fn save_annotations(&self, request: SaveRequest) -> BackendResult<SaveAck>;

    async fn fetch_validated_page_summary(
        &self,
        task_id: u64,
    ) -> BackendResult<ValidatedPageSummary>;

    async fn fetch_other_annotators(
        &self,
        file_id: u64,
        job_id: u64,
        page_numbers: Vec<u32>,
    ) -> BackendResult<OtherAnnotators>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_annotations_response() {
        let value = json!({
            "revision": "r7",
            "pages": [{
                "page_num": 1,
                "size": {"width": 100.0, "height": 200.0},
                "objs": [{
                    "id": 5,
                    "boundType": "box",
                    "bound": {"x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0},
                    "category": "3"
                }]
            }],
            "validated": [1]
        });

        let response: AnnotationsResponse =
            serde_json::from_value(value).expect("response should parse");
        assert_eq!(response.revision, "r7");
        assert_eq!(response.pages[0].objs.len(), 1);
        assert_eq!(response.validated, vec![1]);
        assert!(response.failed_validation_pages.is_empty());
    }

    #[test]
    fn parses_other_annotators_keyed_by_page() {
        let value = json!({
            "2": [{"user_id": "u1", "objs": []}, {"user_id": "u2"}]
        });

        let others: OtherAnnotators = serde_json::from_value(value).expect("map should parse");
        assert_eq!(others[&2].len(), 2);
        assert_eq!(others[&2][1].user_id, "u2");
    }
}
