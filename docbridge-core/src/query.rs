//! Query construction: filters, sort specifications and projections.
//!
//! Filters, sorts and projections are all expressed in the store's native query
//! document format and handed to the backend unchanged. A [`Filter`] can be
//! written directly as a BSON document, or built from typed [`Expr`] trees that
//! are translated into that format.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::query::{Query, Field, Filter, SortSpec, Projection};
//! use docbridge::page::PageWindow;
//!
//! let query = Query::builder()
//!     .filter(Filter::and([
//!         Field::new("status").eq("active"),
//!         Field::new("age").gte(18),
//!     ]))
//!     .sort(SortSpec::new().desc("created_at"))
//!     .projection(Projection::new().include("name"))
//!     .page(PageWindow::new(0, 20))
//!     .build();
//! ```

use bson::{Bson, Document, doc};

use crate::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    page::PageWindow,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// Parses a request-style direction: `asc` or `dsc`/`desc`, case-insensitive.
    pub fn parse(direction: &str) -> Option<Self> {
        match direction.to_ascii_lowercase().as_str() {
            "asc" | "1" => Some(Self::Asc),
            "dsc" | "desc" | "-1" => Some(Self::Desc),
            _ => None,
        }
    }

    /// The native representation of this direction (`1` or `-1`).
    pub fn as_native(&self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

/// Ordered list of sort keys. Empty means "use the default order".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    keys: Vec<(String, SortDirection)>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an ascending key.
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.then(field, SortDirection::Asc)
    }

    /// Appends a descending key.
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.then(field, SortDirection::Desc)
    }

    /// Appends a key with the given direction.
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    /// Builds a single-key sort from request input such as `("name", "dsc")`.
    ///
    /// Unknown directions fall back to ascending.
    pub fn parse(field: impl Into<String>, direction: &str) -> Self {
        Self::new().then(field, SortDirection::parse(direction).unwrap_or(SortDirection::Asc))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }

    /// Native sort document, falling back to identifier ascending when empty.
    ///
    /// The fallback keeps pagination stable across repeated queries.
    pub fn to_document(&self) -> Document {
        if self.keys.is_empty() {
            return doc! { ID_FIELD: 1 };
        }

        self.keys
            .iter()
            .map(|(field, direction)| (field.clone(), Bson::Int32(direction.as_native())))
            .collect()
    }
}

/// Field include/exclude mask. Empty means "return all fields".
///
/// Projected records are still decoded into the queried record type, so every
/// field left out must be optional there. Query with a narrower type, or one
/// whose omitted fields are `Option` or `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    fields: Vec<(String, bool)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a field to be returned.
    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), true));
        self
    }

    /// Marks a field to be left out.
    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), false));
        self
    }

    /// Builds an inclusion projection from a list of field names.
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields.into_iter().fold(Self::new(), Self::include)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Native projection document, or `None` when every field is wanted.
    pub fn to_document(&self) -> Option<Document> {
        if self.fields.is_empty() {
            return None;
        }

        Some(
            self.fields
                .iter()
                .map(|(field, include)| (field.clone(), Bson::Int32(i32::from(*include))))
                .collect(),
        )
    }
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to.
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Field equals any of the listed values.
    AnyOf,
    /// Field equals none of the listed values.
    NoneOf,
}

impl FieldOp {
    /// The native operator keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
            FieldOp::Gt => "$gt",
            FieldOp::Gte => "$gte",
            FieldOp::Lt => "$lt",
            FieldOp::Lte => "$lte",
            FieldOp::AnyOf => "$in",
            FieldOp::NoneOf => "$nin",
        }
    }

    /// Looks up an operator by its native keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "$eq" => FieldOp::Eq,
            "$ne" => FieldOp::Ne,
            "$gt" => FieldOp::Gt,
            "$gte" => FieldOp::Gte,
            "$lt" => FieldOp::Lt,
            "$lte" => FieldOp::Lte,
            "$in" => FieldOp::AnyOf,
            "$nin" => FieldOp::NoneOf,
            _ => return None,
        })
    }

    /// Looks up an operator by the short alias used in request filters.
    pub fn from_alias(alias: &str) -> Option<Self> {
        Some(match alias {
            "eq" => FieldOp::Eq,
            "ne" => FieldOp::Ne,
            "gt" => FieldOp::Gt,
            "ge" => FieldOp::Gte,
            "lt" => FieldOp::Lt,
            "le" => FieldOp::Lte,
            "in_" => FieldOp::AnyOf,
            "notin_" => FieldOp::NoneOf,
            _ => return None,
        })
    }
}

/// A typed filter expression.
///
/// Expressions combine with [`Expr::and`], [`Expr::or`] and [`Expr::not`] and
/// translate into the native format through [`Filter::from`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression.
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name (dotted paths address nested documents).
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Starting point for field predicates: `Field::new("age").gt(18)`.
pub struct Field(String);

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn eq(self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.0, FieldOp::Eq, value.into())
    }

    pub fn ne(self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.0, FieldOp::Ne, value.into())
    }

    pub fn gt(self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.0, FieldOp::Gt, value.into())
    }

    pub fn gte(self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.0, FieldOp::Gte, value.into())
    }

    pub fn lt(self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.0, FieldOp::Lt, value.into())
    }

    pub fn lte(self, value: impl Into<Bson>) -> Expr {
        Expr::field(self.0, FieldOp::Lte, value.into())
    }

    /// Matches when the field equals any of `values`.
    pub fn any_of<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Expr::field(self.0, FieldOp::AnyOf, Bson::Array(values.into_iter().map(Into::into).collect()))
    }

    /// Matches when the field equals none of `values`.
    pub fn none_of<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Expr::field(self.0, FieldOp::NoneOf, Bson::Array(values.into_iter().map(Into::into).collect()))
    }

    pub fn exists(self) -> Expr {
        Expr::Exists(self.0, true)
    }

    pub fn not_exists(self) -> Expr {
        Expr::Exists(self.0, false)
    }
}

/// A filter in the store's native query document format.
///
/// The access layer never inspects a filter; it is passed straight to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Document);

impl Filter {
    /// A filter matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Logical AND of several expressions.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Logical OR of several expressions.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Builds a filter from request triples of field name, operator alias and value.
    ///
    /// Aliases are those of [`FieldOp::from_alias`], plus `is_` (the field
    /// exists when the value is truthy) and `isnot` (the field does not equal the
    /// value). An unknown alias compares for equality. All triples must match.
    ///
    /// ```ignore
    /// let filter = Filter::from_params([("level", "ge", 3), ("class", "ne", 0)]);
    /// ```
    pub fn from_params<I, N, O, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (N, O, V)>,
        N: Into<String>,
        O: AsRef<str>,
        V: Into<Bson>,
    {
        let mut exprs = params
            .into_iter()
            .map(|(name, alias, value)| {
                let (name, value) = (name.into(), value.into());
                match alias.as_ref() {
                    "is_" => Expr::Exists(name, is_truthy(&value)),
                    "isnot" => Expr::field(name, FieldOp::Eq, value).not(),
                    alias => Expr::field(name, FieldOp::from_alias(alias).unwrap_or(FieldOp::Eq), value),
                }
            })
            .collect::<Vec<_>>();

        if exprs.len() == 1 {
            Self::from(exprs.remove(0))
        } else {
            Self::from(Expr::And(exprs))
        }
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}

impl From<Document> for Filter {
    fn from(document: Document) -> Self {
        Self(document)
    }
}

impl From<Expr> for Filter {
    fn from(expr: Expr) -> Self {
        Self(FilterTranslator.visit_expr(&expr))
    }
}

/// Walks an [`Expr`] tree.
pub trait QueryVisitor {
    type Output;

    fn visit_and(&mut self, exprs: &[Expr]) -> Self::Output;
    fn visit_or(&mut self, exprs: &[Expr]) -> Self::Output;
    fn visit_not(&mut self, expr: &Expr) -> Self::Output;
    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Self::Output;
    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Self::Output;

    fn visit_expr(&mut self, expr: &Expr) -> Self::Output {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

/// Translates expression trees into native query documents.
pub(crate) struct FilterTranslator;

impl QueryVisitor for FilterTranslator {
    type Output = Document;

    fn visit_and(&mut self, exprs: &[Expr]) -> Document {
        if exprs.is_empty() {
            return Document::new();
        }

        doc! {
            "$and": exprs
                .iter()
                .map(|expr| Bson::Document(self.visit_expr(expr)))
                .collect::<Vec<_>>(),
        }
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Document {
        // Every stored document has an identifier, so this matches nothing.
        if exprs.is_empty() {
            return doc! { ID_FIELD: { "$exists": false } };
        }

        doc! {
            "$or": exprs
                .iter()
                .map(|expr| Bson::Document(self.visit_expr(expr)))
                .collect::<Vec<_>>(),
        }
    }

    fn visit_not(&mut self, expr: &Expr) -> Document {
        // `$not` only applies to a single field's operator; anything else needs `$nor`.
        match expr {
            Expr::Field { field, op, value } => doc! {
                field.as_str(): { "$not": { op.keyword(): value.clone() } },
            },
            _ => doc! { "$nor": [self.visit_expr(expr)] },
        }
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Document {
        doc! {
            field: { "$exists": should_exist },
        }
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Document {
        doc! {
            field: { op.keyword(): value.clone() },
        }
    }
}

/// A complete query: filter, order, projection and page window.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: SortSpec,
    /// Fields to return; see [`Projection`] for how this meets decoding.
    pub projection: Projection,
    pub page: PageWindow,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: Filter::all(),
            sort: SortSpec::default(),
            projection: Projection::default(),
            page: PageWindow::all(),
        }
    }
}

impl Query {
    /// A query for every document in identifier order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter, either a native document or a typed expression.
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.query.filter = filter.into();
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.query.sort = sort;
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.query.projection = projection;
        self
    }

    pub fn page(mut self, page: PageWindow) -> Self {
        self.query.page = page;
        self
    }

    /// Sets the number of matches to skip.
    pub fn start(mut self, start: u64) -> Self {
        self.query.page.start = start;
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, limit: u64) -> Self {
        self.query.page.limit = limit;
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Null => false,
        Bson::String(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "0" | "false"),
        other => native_flag(other).map_or(true, |flag| flag != 0),
    }
}

/// Reads a native projection/sort flag value (`1`, `-1`, `0`, `true`, `false`).
pub fn native_flag(value: &Bson) -> DocumentStoreResult<i64> {
    match value {
        Bson::Int32(v) => Ok(i64::from(*v)),
        Bson::Int64(v) => Ok(*v),
        Bson::Double(v) => Ok(*v as i64),
        Bson::Boolean(v) => Ok(i64::from(*v)),
        other => Err(DocumentStoreError::Store(format!(
            "expected a numeric or boolean flag, found {:?}",
            other.element_type()
        ))),
    }
}
