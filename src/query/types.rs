use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Query parameters that steer the listing instead of filtering it.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Sort applied when a request names none: newest first.
pub const DEFAULT_SORT: &str = "-createdAt";

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 25;

/// Identifier field every store returns regardless of projection.
pub const ID_FIELD: &str = "id";

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.iter().any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// `[A-Za-z_][A-Za-z0-9_]*` segments joined by `.`
pub fn is_field_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                }
                _ => false,
            }
        })
}

/// Query-string parameters exactly as received, repeated keys included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery {
    pairs: Vec<(String, String)>,
}

impl RawQuery {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Decode an `application/x-www-form-urlencoded` query string.
    pub fn parse(query_string: &str) -> Self {
        let pairs = url::form_urlencoded::parse(query_string.as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Values of a control key, matched case-insensitively, in arrival order.
    pub fn control_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawQuery {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,
    #[serde(rename = "$in")] In,
}

impl FilterOp {
    /// Maps the bracket suffix of `field[op]`. Only these operators are ever
    /// forwarded to a store.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Scalar(Value),
    Set(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub op: FilterOp,
    pub operand: Operand,
}

impl Predicate {
    pub fn eq(value: impl Into<Value>) -> Self {
        Self { op: FilterOp::Eq, operand: Operand::Scalar(value.into()) }
    }

    pub fn compare(op: FilterOp, value: impl Into<Value>) -> Self {
        Self { op, operand: Operand::Scalar(value.into()) }
    }

    /// Set membership; duplicate members are dropped, first occurrence kept.
    pub fn in_set(values: impl IntoIterator<Item = Value>) -> Self {
        let mut members: Vec<Value> = Vec::new();
        for value in values {
            if !members.contains(&value) {
                members.push(value);
            }
        }
        Self { op: FilterOp::In, operand: Operand::Set(members) }
    }
}

/// Field name to AND-ed predicates. Never holds a reserved key when produced
/// by the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CompiledFilter {
    fields: BTreeMap<String, Vec<Predicate>>,
}

impl CompiledFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.push(field, predicate);
        self
    }

    /// Adds a predicate unless an identical one is already present.
    pub fn push(&mut self, field: impl Into<String>, predicate: Predicate) {
        let predicates = self.fields.entry(field.into()).or_default();
        if !predicates.contains(&predicate) {
            predicates.push(predicate);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[Predicate]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Predicate])> {
        self.fields.iter().map(|(field, preds)| (field.as_str(), preds.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Projection {
    #[default]
    All,
    Fields(Vec<String>),
}

impl Projection {
    /// Ordered, deduplicated field list; an empty list means all fields.
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        if fields.is_empty() { Projection::All } else { Projection::Fields(fields) }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Projection::All)
    }

    /// Selected names; empty for all fields.
    pub fn names(&self) -> &[String] {
        match self {
            Projection::All => &[],
            Projection::Fields(fields) => fields,
        }
    }

    pub fn includes(&self, field: &str) -> bool {
        match self {
            Projection::All => true,
            Projection::Fields(fields) => field == ID_FIELD || fields.iter().any(|f| f == field),
        }
    }

    /// Same projection, widened to also carry `field`.
    pub fn including(&self, field: &str) -> Self {
        match self {
            Projection::All => Projection::All,
            Projection::Fields(fields) if fields.iter().any(|f| f == field) => self.clone(),
            Projection::Fields(fields) => {
                let mut fields = fields.clone();
                fields.push(field.to_string());
                Projection::Fields(fields)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SortSpec {
    fields: Vec<SortField>,
}

impl SortSpec {
    pub fn new(fields: Vec<SortField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn push_unique(&mut self, field: SortField) {
        if !self.contains(&field.field) {
            self.fields.push(field);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub filter: CompiledFilter,
    pub projection: Projection,
    pub sort: SortSpec,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Route-configured join of a related collection into listed records.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    /// Output key on each record.
    pub field: String,
    pub collection: String,
    pub local_field: String,
    pub foreign_field: String,
    pub cardinality: Cardinality,
    pub projection: Projection,
}

impl Expansion {
    pub fn one(field: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::build(field.into(), collection.into(), Cardinality::One)
    }

    pub fn many(field: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::build(field.into(), collection.into(), Cardinality::Many)
    }

    fn build(field: String, collection: String, cardinality: Cardinality) -> Self {
        Self {
            local_field: field.clone(),
            foreign_field: ID_FIELD.to_string(),
            field,
            collection,
            cardinality,
            projection: Projection::All,
        }
    }

    pub fn join(mut self, local_field: impl Into<String>, foreign_field: impl Into<String>) -> Self {
        self.local_field = local_field.into();
        self.foreign_field = foreign_field.into();
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Projection::fields(fields);
        self
    }
}
