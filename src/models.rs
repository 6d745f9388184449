use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::errors::DbError;

/// One value in a person's open-ended attribute bag.
///
/// Self-describing when serialized: JSON null/bool/number/string map onto
/// the variants directly, so the `additional_data` column stays readable
/// without any type coercion on the way back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Open-ended attribute map carried alongside the fixed person columns.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// A person record.
///
/// The id is assigned by the caller, not the database, and uniquely
/// identifies the row; equality and hashing consider the id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub email: String,
    #[serde(default)]
    pub additional_data: AttrMap,
}

impl Person {
    /// Creates a validated person: non-negative id and age, non-empty
    /// first name. The last name may be empty.
    pub fn new(
        id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        age: i32,
        email: impl Into<String>,
    ) -> Result<Self, DbError> {
        let first_name = first_name.into();

        if id < 0 {
            return Err(DbError::data_access("person id must be non-negative"));
        }
        if first_name.trim().is_empty() {
            return Err(DbError::data_access("first name must not be empty"));
        }
        if age < 0 {
            return Err(DbError::data_access("age must be non-negative"));
        }

        Ok(Self {
            id,
            first_name,
            last_name: last_name.into(),
            age,
            email: email.into(),
            additional_data: AttrMap::new(),
        })
    }

    /// Adds one attribute to the bag.
    pub fn with_attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.additional_data.insert(name.into(), value);
        self
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Person {}

impl Hash for Person {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
