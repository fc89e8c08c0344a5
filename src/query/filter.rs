use crate::index::numeric::{CompareOp, NumericValue};
use crate::schema::{FieldType, Schema};

/// One `field: rhs` conjunct of a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    NumCompare {
        field: String,
        op: CompareOp,
        value: NumericValue,
    },
    NumIn {
        field: String,
        values: Vec<NumericValue>,
    },
    TagEq {
        field: String,
        value: String,
    },
    TagIn {
        field: String,
        values: Vec<String>,
    },
}

/// Parses a conjunctive filter expression against the schema.
///
/// Filters are user-supplied free text, so nothing here is an error: any
/// malformed predicate (unknown field, non-numeric value for a numeric
/// field, quoted number, missing `:`, unclosed list, blank expression)
/// returns `None` and the search responds with zero hits.
pub fn parse(expr: &str, schema: &Schema) -> Option<Vec<FilterClause>> {
    let mut clauses = Vec::new();
    for predicate in expr.split("&&") {
        let predicate = predicate.trim();
        let (field, rhs) = predicate.split_once(':')?;
        let field = field.trim();
        let rhs = rhs.trim();
        if field.is_empty() || rhs.is_empty() {
            return None;
        }
        if let Some(decl) = schema.sort_field(field) {
            clauses.push(parse_numeric(field, decl.field_type, rhs)?);
        } else if schema.tag_field(field).is_some() {
            clauses.push(parse_tag(field, rhs)?);
        } else {
            return None;
        }
    }
    Some(clauses)
}

fn parse_numeric(field: &str, field_type: FieldType, rhs: &str) -> Option<FilterClause> {
    if let Some(inner) = list_body(rhs) {
        let mut values = Vec::new();
        for item in inner.split(',') {
            values.push(parse_literal(field_type, item.trim())?);
        }
        return Some(FilterClause::NumIn {
            field: field.to_string(),
            values,
        });
    }

    // Two-byte comparators before their one-byte prefixes
    let (op, rest) = if let Some(rest) = rhs.strip_prefix(">=") {
        (CompareOp::Gte, rest)
    } else if let Some(rest) = rhs.strip_prefix("<=") {
        (CompareOp::Lte, rest)
    } else if let Some(rest) = rhs.strip_prefix('>') {
        (CompareOp::Gt, rest)
    } else if let Some(rest) = rhs.strip_prefix('<') {
        (CompareOp::Lt, rest)
    } else if let Some(rest) = rhs.strip_prefix('=') {
        (CompareOp::Eq, rest)
    } else {
        (CompareOp::Eq, rhs)
    };

    Some(FilterClause::NumCompare {
        field: field.to_string(),
        op,
        value: parse_literal(field_type, rest.trim())?,
    })
}

fn parse_tag(field: &str, rhs: &str) -> Option<FilterClause> {
    if let Some(inner) = list_body(rhs) {
        let mut values = Vec::new();
        for item in inner.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return None;
            }
            values.push(item.to_string());
        }
        return Some(FilterClause::TagIn {
            field: field.to_string(),
            values,
        });
    }
    Some(FilterClause::TagEq {
        field: field.to_string(),
        value: rhs.to_string(),
    })
}

fn list_body(rhs: &str) -> Option<&str> {
    let inner = rhs.strip_prefix('[')?;
    inner.strip_suffix(']')
}

fn parse_literal(field_type: FieldType, text: &str) -> Option<NumericValue> {
    if field_type.is_float() {
        let value: f64 = text.parse().ok()?;
        value.is_finite().then_some(NumericValue::Float(value))
    } else {
        text.parse().ok().map(NumericValue::Int)
    }
}
