use crate::annotation::{Annotation, AnnotationId, Token};
use crate::geometry::PageSize;
use serde::{Deserialize, Serialize};

/// Anything keyed by a page number inside a paginated feed.
pub trait PageNumbered {
    fn page_num(&self) -> u32;
}

/// Annotation feed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_num: u32,
    #[serde(default)]
    pub size: PageSize,
    #[serde(default)]
    pub objs: Vec<Annotation>,
}

impl Page {
    pub fn new(page_num: u32, size: PageSize, objs: Vec<Annotation>) -> Self {
        Self { page_num, size, objs }
    }

    pub fn find(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.objs.iter().find(|annotation| &annotation.id == id)
    }
}

impl PageNumbered for Page {
    fn page_num(&self) -> u32 {
        self.page_num
    }
}

/// Token feed page. Shares page numbers with [`Page`] but carries its own size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPage {
    pub page_num: u32,
    #[serde(default)]
    pub size: PageSize,
    #[serde(default)]
    pub objs: Vec<Token>,
}

impl TokenPage {
    pub fn new(page_num: u32, size: PageSize, objs: Vec<Token>) -> Self {
        Self { page_num, size, objs }
    }
}

impl PageNumbered for TokenPage {
    fn page_num(&self) -> u32 {
        self.page_num
    }
}
