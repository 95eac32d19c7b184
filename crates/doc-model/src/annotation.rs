//! Annotation entity and the value types hanging off it.
//!
//! Field names follow the backend JSON contract, so most types here derive
//! serde directly and are parsed as-is from fetched pages.

use crate::geometry::{Bound, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque annotation identifier. The backend hands out numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationId {
    Number(i64),
    Text(String),
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationId::Number(value) => write!(f, "{value}"),
            AnnotationId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for AnnotationId {
    fn from(value: i64) -> Self {
        AnnotationId::Number(value)
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        AnnotationId::Text(value.to_owned())
    }
}

impl FromStr for AnnotationId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(number) => AnnotationId::Number(number),
            Err(_) => AnnotationId::Text(s.to_owned()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown bound type: {0}")]
    UnknownBoundType(String),
    #[error("unknown link type: {0}")]
    UnknownLinkType(String),
}

/// Geometric kind of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundType {
    #[serde(rename = "box")]
    Box,
    #[serde(rename = "free-box")]
    FreeBox,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "table_cell")]
    TableCell,
    #[serde(rename = "polygon")]
    Polygon,
    #[serde(rename = "link-only")]
    LinkOnly,
}

impl BoundType {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundType::Box => "box",
            BoundType::FreeBox => "free-box",
            BoundType::Text => "text",
            BoundType::Table => "table",
            BoundType::TableCell => "table_cell",
            BoundType::Polygon => "polygon",
            BoundType::LinkOnly => "link-only",
        }
    }

    /// Types compared by geometry rather than by text content.
    pub fn is_geometric(self) -> bool {
        !matches!(self, BoundType::Text)
    }
}

impl FromStr for BoundType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(BoundType::Box),
            "free-box" => Ok(BoundType::FreeBox),
            "text" => Ok(BoundType::Text),
            "table" => Ok(BoundType::Table),
            "table_cell" => Ok(BoundType::TableCell),
            "polygon" => Ok(BoundType::Polygon),
            "link-only" => Ok(BoundType::LinkOnly),
            other => Err(ModelError::UnknownBoundType(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Directional,
    Undirectional,
    Omnidirectional,
}

impl FromStr for LinkType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "directional" => Ok(LinkType::Directional),
            "undirectional" => Ok(LinkType::Undirectional),
            "omnidirectional" => Ok(LinkType::Omnidirectional),
            other => Err(ModelError::UnknownLinkType(other.to_owned())),
        }
    }
}

/// Directed edge from the owning annotation to `to` on `page_num`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub to: AnnotationId,
    pub category_id: String,
    pub page_num: u32,
    #[serde(rename = "type")]
    pub link_type: LinkType,
}

impl Link {
    pub fn new(
        to: impl Into<AnnotationId>,
        category_id: impl Into<String>,
        page_num: u32,
        link_type: LinkType,
    ) -> Self {
        Self { to: to.into(), category_id: category_id.into(), page_num, link_type }
    }

    /// Two links address the same edge when target, page and category agree.
    pub fn same_edge(&self, other: &Link) -> bool {
        self.to == other.to
            && self.page_num == other.page_num
            && self.category_id == other.category_id
    }
}

/// Text token in page space, as produced by the token feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Token {
    pub fn new(text: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { id: None, text: text.into(), x, y, width, height }
    }

    pub fn bound(&self) -> Bound {
        Bound::new(self.x, self.y, self.width, self.height)
    }
}

/// One data attribute instance attached to an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl DataAttribute {
    pub fn new(
        name: impl Into<String>,
        attr_type: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self { name: name.into(), attr_type: attr_type.into(), value }
    }
}

/// Grid placement of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSpan {
    pub row: u32,
    pub col: u32,
    #[serde(default = "one")]
    pub rowspan: u32,
    #[serde(default = "one")]
    pub colspan: u32,
}

fn one() -> u32 {
    1
}

impl CellSpan {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col, rowspan: 1, colspan: 1 }
    }
}

/// A labeled region (or text span) on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(rename = "boundType")]
    pub bound_type: BoundType,
    pub bound: Bound,
    pub category: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub children: Vec<AnnotationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<Token>>,
    #[serde(default)]
    pub data: Vec<DataAttribute>,
    #[serde(default, rename = "tableCell", skip_serializing_if = "Option::is_none")]
    pub table_cell: Option<CellSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "originalAnnotationId", skip_serializing_if = "Option::is_none")]
    pub original_annotation_id: Option<AnnotationId>,
}

impl Annotation {
    pub fn new(
        id: impl Into<AnnotationId>,
        bound_type: BoundType,
        bound: Bound,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            bound_type,
            bound,
            category: category.into(),
            links: Vec::new(),
            children: Vec::new(),
            tokens: None,
            data: Vec::new(),
            table_cell: None,
            segments: None,
            label: None,
            original_annotation_id: None,
        }
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = AnnotationId>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }

    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_data(mut self, data: Vec<DataAttribute>) -> Self {
        self.data = data;
        self
    }

    pub fn with_cell(mut self, cell: CellSpan) -> Self {
        self.table_cell = Some(cell);
        self
    }

    pub fn is_table(&self) -> bool {
        self.bound_type == BoundType::Table
    }

    pub fn is_table_cell(&self) -> bool {
        self.bound_type == BoundType::TableCell
    }

    pub fn owns(&self, id: &AnnotationId) -> bool {
        self.children.contains(id)
    }

    /// Rendered text: token texts joined by single spaces.
    pub fn text(&self) -> String {
        self.tokens
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Copy under a new id with no outgoing links and no owned children.
    pub fn duplicate_as(&self, id: AnnotationId) -> Self {
        Self {
            id,
            links: Vec::new(),
            children: Vec::new(),
            original_annotation_id: None,
            ..self.clone()
        }
    }

    /// Overwrite every field present in `changes`.
    pub fn apply(&mut self, changes: &AnnotationChanges) {
        if let Some(bound_type) = changes.bound_type {
            self.bound_type = bound_type;
        }
        if let Some(bound) = changes.bound {
            self.bound = bound;
        }
        if let Some(category) = &changes.category {
            self.category.clone_from(category);
        }
        if let Some(links) = &changes.links {
            self.links.clone_from(links);
        }
        if let Some(children) = &changes.children {
            self.children.clone_from(children);
        }
        if let Some(tokens) = &changes.tokens {
            self.tokens = Some(tokens.clone());
        }
        if let Some(data) = &changes.data {
            self.data.clone_from(data);
        }
        if let Some(cell) = changes.table_cell {
            self.table_cell = Some(cell);
        }
        if let Some(segments) = &changes.segments {
            self.segments = Some(segments.clone());
        }
        if let Some(label) = &changes.label {
            self.label = Some(label.clone());
        }
    }
}

/// Partial update for [`Annotation::apply`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationChanges {
    pub bound_type: Option<BoundType>,
    pub bound: Option<Bound>,
    pub category: Option<String>,
    pub links: Option<Vec<Link>>,
    pub children: Option<Vec<AnnotationId>>,
    pub tokens: Option<Vec<Token>>,
    pub data: Option<Vec<DataAttribute>>,
    pub table_cell: Option<CellSpan>,
    pub segments: Option<Vec<Point>>,
    pub label: Option<String>,
}

impl AnnotationChanges {
    pub fn bound(bound: Bound) -> Self {
        Self { bound: Some(bound), ..Self::default() }
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self { category: Some(category.into()), ..Self::default() }
    }

    pub fn links(links: Vec<Link>) -> Self {
        Self { links: Some(links), ..Self::default() }
    }

    pub fn children(children: Vec<AnnotationId>) -> Self {
        Self { children: Some(children), ..Self::default() }
    }

    pub fn data(data: Vec<DataAttribute>) -> Self {
        Self { data: Some(data), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
