use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Error, Result};
use crate::core::types::Document;

/// Runtime type declared for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "STRING")]
    String,
    #[serde(rename = "STRING_ARRAY")]
    StringArray,
    #[serde(rename = "INT32")]
    Int32,
    #[serde(rename = "INT32_ARRAY")]
    Int32Array,
    #[serde(rename = "INT64")]
    Int64,
    #[serde(rename = "INT64_ARRAY")]
    Int64Array,
    #[serde(rename = "FLOAT")]
    Float,
    #[serde(rename = "FLOAT_ARRAY")]
    FloatArray,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::StringArray => "STRING_ARRAY",
            FieldType::Int32 => "INT32",
            FieldType::Int32Array => "INT32_ARRAY",
            FieldType::Int64 => "INT64",
            FieldType::Int64Array => "INT64_ARRAY",
            FieldType::Float => "FLOAT",
            FieldType::FloatArray => "FLOAT_ARRAY",
        }
    }

    pub fn is_string_type(&self) -> bool {
        matches!(self, FieldType::String | FieldType::StringArray)
    }

    pub fn is_numeric(&self) -> bool {
        !self.is_string_type()
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            FieldType::StringArray
                | FieldType::Int32Array
                | FieldType::Int64Array
                | FieldType::FloatArray
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, FieldType::Float | FieldType::FloatArray)
    }
}

/// A declared field: name plus runtime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Field {
            name: name.to_string(),
            field_type,
        }
    }
}

/// Collection schema: three disjoint field sets, fixed at creation.
///
/// Search fields are tokenized and inverted; facet fields are stored verbatim
/// for exact-match filtering and counting; sort fields back range filters and
/// `sort_by` (scalars only for sorting). One sort field may be designated the
/// token ranking field whose value feeds MAX_SCORE ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub search_fields: Vec<Field>,
    pub facet_fields: Vec<Field>,
    pub sort_fields: Vec<Field>,
    pub token_ranking_field: Option<String>,
}

impl Schema {
    pub fn new(
        search_fields: Vec<Field>,
        facet_fields: Vec<Field>,
        sort_fields: Vec<Field>,
        token_ranking_field: Option<&str>,
    ) -> Result<Self> {
        for field in &search_fields {
            if !field.field_type.is_string_type() {
                return Err(Error::invalid(format!(
                    "Search field `{}` must be a STRING or a STRING_ARRAY.",
                    field.name
                )));
            }
        }
        for field in &facet_fields {
            if !field.field_type.is_string_type() {
                return Err(Error::invalid(format!(
                    "Facet field `{}` must be a STRING or a STRING_ARRAY.",
                    field.name
                )));
            }
        }
        for field in &sort_fields {
            if !field.field_type.is_numeric() {
                return Err(Error::invalid(format!(
                    "Sort field `{}` must be a number.",
                    field.name
                )));
            }
        }
        if let Some(name) = token_ranking_field {
            let declared = sort_fields
                .iter()
                .any(|f| f.name == name && f.field_type == FieldType::Int32);
            if !declared {
                return Err(Error::invalid(format!(
                    "Token ranking field `{}` must be declared as an INT32 sort field.",
                    name
                )));
            }
        }

        Ok(Schema {
            search_fields,
            facet_fields,
            sort_fields,
            token_ranking_field: token_ranking_field.map(str::to_string),
        })
    }

    pub fn search_field(&self, name: &str) -> Option<&Field> {
        self.search_fields.iter().find(|f| f.name == name)
    }

    pub fn facet_field(&self, name: &str) -> Option<&Field> {
        self.facet_fields.iter().find(|f| f.name == name)
    }

    pub fn sort_field(&self, name: &str) -> Option<&Field> {
        self.sort_fields.iter().find(|f| f.name == name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.search_field(name).is_some()
            || self.facet_field(name).is_some()
            || self.sort_field(name).is_some()
    }

    /// Fields backing the exact-value tag index: every facet field plus every
    /// STRING_ARRAY search field.
    pub fn tag_fields(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.facet_fields.iter().collect();
        for field in &self.search_fields {
            if field.field_type == FieldType::StringArray
                && !fields.iter().any(|f| f.name == field.name)
            {
                fields.push(field);
            }
        }
        fields
    }

    pub fn tag_field(&self, name: &str) -> Option<&Field> {
        self.tag_fields().into_iter().find(|f| f.name == name)
    }

    /// Scalar sort fields, the only ones eligible for `sort_by`.
    pub fn scalar_sort_fields(&self) -> impl Iterator<Item = &Field> {
        self.sort_fields.iter().filter(|f| !f.field_type.is_array())
    }

    /// Checks that every declared field is present in the document with the
    /// correct runtime type. Runs before any index or store mutation, so a
    /// rejected document leaves no trace.
    pub fn validate_document(&self, doc: &Document) -> Result<()> {
        for field in &self.search_fields {
            let value = doc.get(&field.name).ok_or_else(|| {
                Error::invalid(format!(
                    "Field `{}` has been declared as a search field in the schema, \
                     but is not found in the document.",
                    field.name
                ))
            })?;
            match field.field_type {
                FieldType::String if !value.is_string() => {
                    return Err(Error::invalid(format!(
                        "Search field `{}` must be a STRING.",
                        field.name
                    )));
                }
                FieldType::StringArray if !is_string_array(value) => {
                    return Err(Error::invalid(format!(
                        "Search field `{}` must be a STRING_ARRAY.",
                        field.name
                    )));
                }
                _ => {}
            }
        }

        for field in &self.facet_fields {
            let value = doc.get(&field.name).ok_or_else(|| {
                Error::invalid(format!(
                    "Field `{}` has been declared as a facet field in the schema, \
                     but is not found in the document.",
                    field.name
                ))
            })?;
            match field.field_type {
                FieldType::String if !value.is_string() => {
                    return Err(Error::invalid(format!(
                        "Facet field `{}` must be a STRING.",
                        field.name
                    )));
                }
                FieldType::StringArray if !is_string_array(value) => {
                    return Err(Error::invalid(format!(
                        "Facet field `{}` must be a STRING_ARRAY.",
                        field.name
                    )));
                }
                _ => {}
            }
        }

        // The token ranking field has stricter checks than its sort-field
        // declaration, and its messages take precedence.
        if let Some(name) = &self.token_ranking_field {
            let value = doc.get(name).ok_or_else(|| {
                Error::invalid(format!(
                    "Field `{}` has been declared as a token ranking field, \
                     but is not found in the document.",
                    name
                ))
            })?;
            match value.as_i64() {
                Some(v) if v < 0 => {
                    return Err(Error::invalid(format!(
                        "Token ranking field `{}` must be an unsigned INT32.",
                        name
                    )));
                }
                Some(v) if v > i32::MAX as i64 => {
                    return Err(Error::invalid(format!(
                        "Token ranking field `{}` exceeds maximum value of INT32.",
                        name
                    )));
                }
                Some(_) => {}
                None => {
                    return Err(Error::invalid(format!(
                        "Token ranking field `{}` must be an unsigned INT32.",
                        name
                    )));
                }
            }
        }

        for field in &self.sort_fields {
            let value = doc.get(&field.name).ok_or_else(|| {
                Error::invalid(format!(
                    "Field `{}` has been declared as a sort field in the schema, \
                     but is not found in the document.",
                    field.name
                ))
            })?;
            self.check_sort_value(field, value)?;
        }

        Ok(())
    }

    fn check_sort_value(&self, field: &Field, value: &Value) -> Result<()> {
        let bad = || {
            Error::invalid(format!(
                "Sort field `{}` must be a number.",
                field.name
            ))
        };
        match field.field_type {
            FieldType::Int32 => {
                let v = value.as_i64().ok_or_else(bad)?;
                if v < i32::MIN as i64 || v > i32::MAX as i64 {
                    return Err(Error::invalid(format!(
                        "Sort field `{}` exceeds maximum value of INT32.",
                        field.name
                    )));
                }
            }
            FieldType::Int64 => {
                value.as_i64().ok_or_else(bad)?;
            }
            FieldType::Float => {
                value.as_f64().ok_or_else(bad)?;
            }
            FieldType::Int32Array => {
                let items = value.as_array().ok_or_else(bad)?;
                for item in items {
                    let v = item.as_i64().ok_or_else(bad)?;
                    if v < i32::MIN as i64 || v > i32::MAX as i64 {
                        return Err(Error::invalid(format!(
                            "Sort field `{}` exceeds maximum value of INT32.",
                            field.name
                        )));
                    }
                }
            }
            FieldType::Int64Array => {
                let items = value.as_array().ok_or_else(bad)?;
                for item in items {
                    item.as_i64().ok_or_else(bad)?;
                }
            }
            FieldType::FloatArray => {
                let items = value.as_array().ok_or_else(bad)?;
                for item in items {
                    item.as_f64().ok_or_else(bad)?;
                }
            }
            FieldType::String | FieldType::StringArray => return Err(bad()),
        }
        Ok(())
    }
}

fn is_string_array(value: &Value) -> bool {
    value
        .as_array()
        .map(|items| items.iter().all(|v| v.is_string()))
        .unwrap_or(false)
}
