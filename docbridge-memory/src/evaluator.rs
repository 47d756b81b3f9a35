//! Evaluation of native filter and sort documents against stored documents.
//!
//! Filters arrive in the native query document format. They are parsed into
//! [`Expr`] trees by [`FilterParser`] and evaluated per document by
//! [`DocumentEvaluator`]. Supported operators: `$eq $ne $gt $gte $lt $lte $in
//! $nin $exists $not $and $or $nor` plus implicit equality. Dotted field names
//! address nested documents.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docbridge_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor, SortDirection, native_flag},
};


/// Comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that `Int32(1)`, `Int64(1)` and
/// `Double(1.0)` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of this value's type in the cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order used for sorting: by type first, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a possibly dotted field path inside a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;

    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Parses native filter documents into expression trees.
pub(crate) struct FilterParser;

impl FilterParser {
    pub(crate) fn parse(filter: &Document) -> DocumentStoreResult<Expr> {
        let mut exprs = Vec::with_capacity(filter.len());

        for (key, value) in filter {
            exprs.push(match key.as_str() {
                "$and" => Expr::And(Self::parse_list(key, value)?),
                "$or" => Expr::Or(Self::parse_list(key, value)?),
                "$nor" => Expr::Or(Self::parse_list(key, value)?).not(),
                op if op.starts_with('$') => return Err(unsupported(op)),
                field => Self::parse_field(field, value)?,
            });
        }

        Ok(collapse(exprs))
    }

    fn parse_list(key: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
        match value {
            Bson::Array(items) => items
                .iter()
                .map(|item| match item {
                    Bson::Document(inner) => Self::parse(inner),
                    _ => Err(DocumentStoreError::Store(format!("{key} entries must be documents"))),
                })
                .collect(),
            _ => Err(DocumentStoreError::Store(format!("{key} requires an array"))),
        }
    }

    fn parse_field(field: &str, value: &Bson) -> DocumentStoreResult<Expr> {
        let operators = match value {
            Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => ops,
            _ => return Ok(Expr::field(field.to_string(), FieldOp::Eq, value.clone())),
        };

        let mut exprs = Vec::with_capacity(operators.len());
        for (keyword, operand) in operators {
            exprs.push(match keyword.as_str() {
                "$exists" => Expr::Exists(field.to_string(), native_flag(operand)? != 0),
                "$not" => match operand {
                    Bson::Document(_) => Self::parse_field(field, operand)?.not(),
                    _ => return Err(DocumentStoreError::Store("$not requires a document".into())),
                },
                keyword => match FieldOp::from_keyword(keyword) {
                    Some(op @ (FieldOp::AnyOf | FieldOp::NoneOf)) if !matches!(operand, Bson::Array(_)) => {
                        return Err(DocumentStoreError::Store(format!(
                            "{} requires an array",
                            op.keyword()
                        )));
                    }
                    Some(op) => Expr::field(field.to_string(), op, operand.clone()),
                    None => return Err(unsupported(keyword)),
                },
            });
        }

        Ok(collapse(exprs))
    }
}

fn collapse(mut exprs: Vec<Expr>) -> Expr {
    if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        Expr::And(exprs)
    }
}

fn unsupported(op: &str) -> DocumentStoreError {
    DocumentStoreError::Store(format!("unsupported query operator {op}"))
}

/// Evaluates an expression against a single document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub(crate) fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub(crate) fn evaluate(&mut self, expr: &Expr) -> bool {
        self.visit_expr(expr)
    }

    /// Equality with array-membership semantics: an array field equals a value
    /// if it contains it.
    fn equals(field_value: &Bson, value: &Bson) -> bool {
        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        if left == right {
            return true;
        }

        match left {
            Comparable::Array(items) => items.iter().any(|item| item == &right),
            _ => false,
        }
    }

    fn any_of(field_value: &Bson, values: &Bson) -> bool {
        match values {
            Bson::Array(candidates) => candidates
                .iter()
                .any(|candidate| Self::equals(field_value, candidate)),
            _ => false,
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;

    fn visit_and(&mut self, exprs: &[Expr]) -> bool {
        exprs.iter().all(|expr| self.visit_expr(expr))
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> bool {
        exprs.iter().any(|expr| self.visit_expr(expr))
    }

    fn visit_not(&mut self, expr: &Expr) -> bool {
        !self.visit_expr(expr)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> bool {
        lookup(self.document, field).is_some() == should_exist
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> bool {
        let Some(field_value) = lookup(self.document, field) else {
            // A missing field behaves like null.
            return match op {
                FieldOp::Eq => matches!(value, Bson::Null),
                FieldOp::Ne => !matches!(value, Bson::Null),
                FieldOp::NoneOf => !Self::any_of(&Bson::Null, value),
                FieldOp::AnyOf => Self::any_of(&Bson::Null, value),
                _ => false,
            };
        };

        match op {
            FieldOp::Eq => Self::equals(field_value, value),
            FieldOp::Ne => !Self::equals(field_value, value),
            FieldOp::AnyOf => Self::any_of(field_value, value),
            FieldOp::NoneOf => !Self::any_of(field_value, value),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            }
        }
    }
}

/// Parsed native sort document.
pub(crate) struct SortKeys(Vec<(String, SortDirection)>);

impl SortKeys {
    pub(crate) fn parse(sort: &Document) -> DocumentStoreResult<Self> {
        sort.iter()
            .map(|(field, flag)| {
                Ok((
                    field.clone(),
                    if native_flag(flag)? < 0 { SortDirection::Desc } else { SortDirection::Asc },
                ))
            })
            .collect::<DocumentStoreResult<Vec<_>>>()
            .map(Self)
    }

    pub(crate) fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, direction) in &self.0 {
            let left = lookup(a, field).map(Comparable::from).unwrap_or(Comparable::Null);
            let right = lookup(b, field).map(Comparable::from).unwrap_or(Comparable::Null);

            let ordering = match direction {
                SortDirection::Asc => left.sort_cmp(&right),
                SortDirection::Desc => right.sort_cmp(&left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn matches(filter: Document, document: &Document) -> bool {
        let expr = FilterParser::parse(&filter).unwrap();
        DocumentEvaluator::new(document).evaluate(&expr)
    }

    fn person() -> Document {
        doc! {
            "name": "Ada",
            "age": 36,
            "tags": ["math", "engines"],
            "address": { "city": "London" },
        }
    }

    #[test]
    fn implicit_and_explicit_equality() {
        let doc = person();

        assert!(matches(doc! { "name": "Ada" }, &doc));
        assert!(matches(doc! { "name": { "$eq": "Ada" } }, &doc));
        assert!(!matches(doc! { "name": "Grace" }, &doc));
        assert!(matches(doc! { "age": 36.0 }, &doc));
        assert!(matches(doc! {}, &doc));
    }

    #[test]
    fn comparisons() {
        let doc = person();

        assert!(matches(doc! { "age": { "$gt": 30, "$lte": 36 } }, &doc));
        assert!(!matches(doc! { "age": { "$lt": 36 } }, &doc));
        assert!(matches(doc! { "age": { "$gte": 36_i64 } }, &doc));
        assert!(!matches(doc! { "name": { "$gt": 5 } }, &doc));
    }

    #[test]
    fn membership_and_arrays() {
        let doc = person();

        assert!(matches(doc! { "tags": "math" }, &doc));
        assert!(matches(doc! { "name": { "$in": ["Ada", "Grace"] } }, &doc));
        assert!(matches(doc! { "tags": { "$nin": ["poetry"] } }, &doc));
        assert!(!matches(doc! { "tags": { "$in": ["poetry"] } }, &doc));
    }

    #[test]
    fn missing_fields_behave_like_null() {
        let doc = person();

        assert!(matches(doc! { "email": { "$ne": "x" } }, &doc));
        assert!(matches(doc! { "email": Bson::Null }, &doc));
        assert!(!matches(doc! { "email": { "$gt": 1 } }, &doc));
        assert!(matches(doc! { "email": { "$exists": false } }, &doc));
        assert!(!matches(doc! { "name": { "$exists": false } }, &doc));
    }

    #[test]
    fn logical_operators_and_nested_paths() {
        let doc = person();

        assert!(matches(doc! { "address.city": "London" }, &doc));
        assert!(matches(doc! { "$or": [{ "name": "Grace" }, { "age": 36 }] }, &doc));
        assert!(!matches(doc! { "$and": [{ "name": "Ada" }, { "age": 37 }] }, &doc));
        assert!(matches(doc! { "$nor": [{ "name": "Grace" }] }, &doc));
        assert!(matches(doc! { "age": { "$not": { "$lt": 18 } } }, &doc));
    }

    #[test]
    fn rejects_unknown_operators_and_malformed_operands() {
        assert!(FilterParser::parse(&doc! { "$where": "true" }).is_err());
        assert!(FilterParser::parse(&doc! { "name": { "$regex": "^A" } }).is_err());
        assert!(FilterParser::parse(&doc! { "name": { "$in": "Ada" } }).is_err());
        assert!(FilterParser::parse(&doc! { "$or": { "name": "Ada" } }).is_err());
    }

    #[test]
    fn sort_keys_order_across_fields_and_types() {
        let keys = SortKeys::parse(&doc! { "group": 1, "rank": -1 }).unwrap();
        let a = doc! { "group": "a", "rank": 1 };
        let b = doc! { "group": "a", "rank": 2 };
        let c = doc! { "group": "b", "rank": 9 };
        let missing = doc! { "rank": 0 };

        assert_eq!(keys.compare(&b, &a), Ordering::Less);
        assert_eq!(keys.compare(&a, &c), Ordering::Less);
        assert_eq!(keys.compare(&missing, &a), Ordering::Less);
    }
}
