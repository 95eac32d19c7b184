use crate::annotation::DataAttribute;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDataAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
}

/// Entry of the external category catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub data_attributes: Vec<CategoryDataAttribute>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            kind: None,
            data_attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attr_type: impl Into<String>) -> Self {
        self.data_attributes
            .push(CategoryDataAttribute { name: name.into(), attr_type: attr_type.into() });
        self
    }

    /// One empty data attribute instance per attribute the category declares.
    pub fn data_template(&self) -> Vec<DataAttribute> {
        self.data_attributes
            .iter()
            .map(|attr| DataAttribute::new(&attr.name, &attr.attr_type, serde_json::Value::Null))
            .collect()
    }
}
