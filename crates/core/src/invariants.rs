//! Structural checks over one page of annotations.
//!
//! Ownership is explicit through `children`; these checks catch pages where
//! that ownership and the geometry disagree.

use doc_model::{Annotation, AnnotationId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    DuplicateId { id: AnnotationId },
    /// A `children` entry names nothing on the page
    DanglingChild { parent: AnnotationId, child: AnnotationId },
    TableChildNotCell { table: AnnotationId, child: AnnotationId },
    CellOutsideTable { table: AnnotationId, cell: AnnotationId },
    /// A cell lies inside a table's bound but the table does not list it
    UnownedCell { table: AnnotationId, cell: AnnotationId },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::DuplicateId { id } => write!(f, "duplicate id {id}"),
            InvariantViolation::DanglingChild { parent, child } => {
                write!(f, "{parent} lists missing child {child}")
            }
            InvariantViolation::TableChildNotCell { table, child } => {
                write!(f, "table {table} owns {child}, which is not a table cell")
            }
            InvariantViolation::CellOutsideTable { table, cell } => {
                write!(f, "cell {cell} of table {table} lies outside the table bound")
            }
            InvariantViolation::UnownedCell { table, cell } => {
                write!(f, "cell {cell} lies inside table {table} but is not owned by it")
            }
        }
    }
}

pub fn check_page(annotations: &[Annotation]) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut by_id: HashMap<&AnnotationId, &Annotation> = HashMap::new();

    for annotation in annotations {
        if by_id.insert(&annotation.id, annotation).is_some() {
            violations.push(InvariantViolation::DuplicateId { id: annotation.id.clone() });
        }
    }

    for parent in annotations {
        for child in &parent.children {
            let Some(owned) = by_id.get(child) else {
                violations.push(InvariantViolation::DanglingChild {
                    parent: parent.id.clone(),
                    child: child.clone(),
                });
                continue;
            };

            if !parent.is_table() {
                continue;
            }
            if !owned.is_table_cell() {
                violations.push(InvariantViolation::TableChildNotCell {
                    table: parent.id.clone(),
                    child: child.clone(),
                });
            } else if !parent.bound.contains_bound(&owned.bound) {
                violations.push(InvariantViolation::CellOutsideTable {
                    table: parent.id.clone(),
                    cell: child.clone(),
                });
            }
        }
    }

    let owned_cells: BTreeSet<&AnnotationId> = annotations
        .iter()
        .filter(|annotation| annotation.is_table())
        .flat_map(|table| table.children.iter())
        .collect();

    for table in annotations.iter().filter(|annotation| annotation.is_table()) {
        for cell in annotations.iter().filter(|annotation| annotation.is_table_cell()) {
            if table.bound.contains_bound(&cell.bound) && !owned_cells.contains(&cell.id) {
                violations.push(InvariantViolation::UnownedCell {
                    table: table.id.clone(),
                    cell: cell.id.clone(),
                });
            }
        }
    }

    violations
}
