use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::choices::UnitType;

/// A node in the organizational hierarchy (faculty, department, ...).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UnitRow {
    pub id: Uuid,
    pub name: String,
    pub unit_type: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewUnit {
    pub name: String,
    pub unit_type: UnitType,
    pub parent_id: Option<Uuid>,
}

#[cfg(test)]
impl NewUnit {
    pub fn to_row(&self, id: Uuid) -> UnitRow {
        UnitRow {
            id,
            name: self.name.clone(),
            unit_type: self.unit_type.as_str().to_string(),
            parent_id: self.parent_id,
        }
    }
}
