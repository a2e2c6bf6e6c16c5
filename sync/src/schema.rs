//! Collection schemas and row decoding.
//!
//! The backend hands out untyped rows. Each collection carries a schema that
//! validates those rows and decodes them into [`Record`]s at the source
//! boundary, so the reconciler and everything above it operate on checked
//! data rather than duck-typed maps.

use crate::{error::Result, CollectionName, Error, FieldName, Record};
use serde::{Deserialize, Serialize};

/// Field types supported in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Timestamp,
    /// Arbitrary nested JSON
    Json,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Bool => write!(f, "Bool"),
            FieldType::Timestamp => write!(f, "Timestamp"),
            FieldType::Json => write!(f, "Json"),
        }
    }
}

/// Definition of a field in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name
    pub name: FieldName,
    /// Field type
    pub field_type: FieldType,
    /// Whether this field is required
    pub required: bool,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<FieldName>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<FieldName>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    /// Validate a JSON value against this field definition.
    pub fn validate(&self, value: Option<&serde_json::Value>) -> Result<()> {
        match value {
            None if self.required => Err(Error::MissingRequiredField(self.name.clone())),
            None => Ok(()),
            Some(serde_json::Value::Null) if self.required => {
                Err(Error::MissingRequiredField(self.name.clone()))
            }
            Some(serde_json::Value::Null) => Ok(()),
            Some(v) => self.validate_type(v),
        }
    }

    fn validate_type(&self, value: &serde_json::Value) -> Result<()> {
        let valid = match self.field_type {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_f64() || value.is_i64() || value.is_u64(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Timestamp => value.is_u64() || value.is_i64(),
            FieldType::Json => true, // Any JSON is valid
        };

        if valid {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type.to_string(),
                got: json_type_name(value).to_string(),
            })
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "Null",
        serde_json::Value::Bool(_) => "Bool",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "Int",
        serde_json::Value::Number(_) => "Float",
        serde_json::Value::String(_) => "String",
        serde_json::Value::Array(_) => "Array",
        serde_json::Value::Object(_) => "Object",
    }
}

/// Schema for a collection.
///
/// Carries the designated identifier field (defaults to `id`) and the
/// declared field definitions. Fields not declared in the schema pass through
/// untouched; only declared fields are type-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchema {
    /// Collection name
    pub name: CollectionName,
    /// Name of the identifier field
    pub id_field: FieldName,
    /// Field definitions
    pub fields: Vec<FieldDef>,
}

impl CollectionSchema {
    /// Create a new collection schema with the default `id` identifier field.
    pub fn new(name: impl Into<CollectionName>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            id_field: "id".to_string(),
            fields,
        }
    }

    /// Builder-style method to use a different identifier field.
    pub fn with_id_field(mut self, id_field: impl Into<FieldName>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Extract the identifier from a raw row.
    ///
    /// String identifiers are taken as-is; integer identifiers are rendered
    /// to their decimal form so identity comparison stays uniform.
    pub fn extract_id(&self, row: &serde_json::Value) -> Result<String> {
        let obj = row.as_object().ok_or(Error::RowNotObject)?;

        match obj.get(&self.id_field) {
            None | Some(serde_json::Value::Null) => {
                Err(Error::MissingIdentifier(self.id_field.clone()))
            }
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(serde_json::Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            Some(_) => Err(Error::InvalidIdentifier {
                field: self.id_field.clone(),
            }),
        }
    }

    /// Validate a raw row against the declared fields.
    pub fn validate_row(&self, row: &serde_json::Value) -> Result<()> {
        let obj = row.as_object().ok_or(Error::RowNotObject)?;

        for field in &self.fields {
            field.validate(obj.get(&field.name))?;
        }

        Ok(())
    }

    /// Decode a raw row into a [`Record`].
    ///
    /// This is the single entry point from untyped backend data into the
    /// typed local view: identifier extraction plus field validation.
    pub fn decode(&self, row: &serde_json::Value) -> Result<Record> {
        let id = self.extract_id(row)?;
        self.validate_row(row)?;
        Ok(Record::new(id, self.name.clone(), row.clone()))
    }

    /// Decode a whole snapshot, failing on the first invalid row.
    pub fn decode_all(&self, rows: &[serde_json::Value]) -> Result<Vec<Record>> {
        rows.iter().map(|row| self.decode(row)).collect()
    }
}
