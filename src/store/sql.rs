use serde_json::Value;

use super::{numeric_text, FindOptions};
use crate::query::{
    validate_collection, validate_field, CompiledFilter, FilterOp, Operand, Predicate, QueryError,
    SortSpec, ID_FIELD,
};

pub const DOCUMENTS_TABLE: &str = "documents";

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    /// Bound after the collection name, which is always `$1`.
    pub params: Vec<Value>,
}

/// WHERE-clause builder over the `data` JSONB column.
pub struct SqlWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl SqlWhere {
    fn new() -> Self {
        // $1 is reserved for the collection name
        Self { param_values: vec![], param_index: 1 }
    }

    pub fn generate(filter: &CompiledFilter) -> Result<(String, Vec<Value>), QueryError> {
        let mut sql_where = Self::new();
        let mut conditions = vec!["collection = $1".to_string()];
        for (field, predicates) in filter.iter() {
            let path = path_expr(field)?;
            for predicate in predicates {
                conditions.push(sql_where.build_condition(&path, predicate)?);
            }
        }
        Ok((conditions.join(" AND "), sql_where.param_values))
    }

    fn build_condition(&mut self, path: &str, predicate: &Predicate) -> Result<String, QueryError> {
        match (&predicate.operand, predicate.op) {
            (Operand::Set(values), _) => {
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| {
                        let p = self.param(v.clone());
                        eq_expr(path, &p)
                    })
                    .collect();
                Ok(format!("({})", parts.join(" OR ")))
            }
            (Operand::Scalar(value), FilterOp::Eq) => {
                let p = self.param(value.clone());
                Ok(eq_expr(path, &p))
            }
            (Operand::Scalar(value), op @ (FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte)) => {
                let p = self.param(value.clone());
                Ok(compare_expr(path, comparison_sql(op), &p, value))
            }
            (Operand::Scalar(_), FilterOp::In) => {
                Err(QueryError::InvalidOperatorData("$in requires a set of values".to_string()))
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Mirrors `numeric_text` for values read out of JSONB.
const NUMERIC_TEXT_RE: &str = r"^[-+]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][-+]?[0-9]+)?$";

/// Largest OFFSET/LIMIT Postgres accepts.
const MAX_ROWS: u64 = i64::MAX as u64;

fn comparison_sql(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Gt => ">",
        FilterOp::Gte => ">=",
        FilterOp::Lt => "<",
        FilterOp::Lte => "<=",
        FilterOp::Eq | FilterOp::In => "=",
    }
}

/// Loose equality: containment covers same-typed values and array members,
/// text equality covers numbers and booleans held as strings and vice versa.
fn eq_expr(path: &str, p: &str) -> String {
    format!(
        "(CASE jsonb_typeof({path}) \
         WHEN 'array' THEN {path} @> {p} OR EXISTS \
         (SELECT 1 FROM jsonb_array_elements_text({path}) AS elem WHERE elem = ({p} #>> '{{}}')) \
         ELSE {path} @> {p} OR ({path} #>> '{{}}') = ({p} #>> '{{}}') END)",
        path = path,
        p = p
    )
}

/// Ordering comparison; arrays match when any element does.
fn compare_expr(path: &str, op: &str, p: &str, operand: &Value) -> String {
    format!(
        "(CASE jsonb_typeof({path}) \
         WHEN 'array' THEN EXISTS (SELECT 1 FROM jsonb_array_elements({path}) AS elem WHERE {element}) \
         ELSE {scalar} END)",
        path = path,
        element = scalar_compare("elem", op, p, operand),
        scalar = scalar_compare(path, op, p, operand),
    )
}

/// Same-typed values compare natively (strings bytewise); text and numbers
/// cross-compare numerically when the text is numeric.
fn scalar_compare(x: &str, op: &str, p: &str, operand: &Value) -> String {
    let as_text = format!("({x} #>> '{{}}')", x = x);
    let operand_text = format!("({p} #>> '{{}}')", p = p);
    let same_string = format!(
        "(jsonb_typeof({x}) = 'string' AND {t} COLLATE \"C\" {op} {o} COLLATE \"C\")",
        x = x,
        t = as_text,
        op = op,
        o = operand_text
    );
    match operand {
        Value::Number(_) => format!(
            "((jsonb_typeof({x}) = 'number' AND {x} {op} {p}) OR \
             (CASE WHEN jsonb_typeof({x}) = 'string' AND btrim({t}) ~ '{re}' \
             THEN btrim({t})::numeric {op} {o}::numeric ELSE false END))",
            x = x,
            op = op,
            p = p,
            t = as_text,
            o = operand_text,
            re = NUMERIC_TEXT_RE
        ),
        Value::String(text) if numeric_text(text).is_some() => format!(
            "({same} OR (CASE WHEN jsonb_typeof({x}) = 'number' \
             THEN {t}::numeric {op} btrim({o})::numeric ELSE false END))",
            same = same_string,
            x = x,
            t = as_text,
            op = op,
            o = operand_text
        ),
        Value::String(_) => same_string,
        Value::Bool(_) => format!("(jsonb_typeof({x}) = 'boolean' AND {x} {op} {p})", x = x, op = op, p = p),
        _ => "false".to_string(),
    }
}

pub struct SqlOrder;

impl SqlOrder {
    /// Missing values sort first ascending and last descending, matching
    /// JSONB's own placement of `null`. `id` closes every ordering.
    pub fn generate(sort: &SortSpec) -> Result<String, QueryError> {
        let mut parts = Vec::new();
        for field in sort.fields() {
            let nulls = match field.direction {
                crate::query::SortDirection::Asc => "NULLS FIRST",
                crate::query::SortDirection::Desc => "NULLS LAST",
            };
            parts.push(format!("{} {} {}", path_expr(&field.field)?, field.direction.to_sql(), nulls));
        }
        if !sort.contains(ID_FIELD) {
            parts.push(format!("{} ASC", path_expr(ID_FIELD)?));
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}

/// `location.city` → `data #> '{location,city}'`. Only validated identifiers
/// reach the literal.
pub fn path_expr(field: &str) -> Result<String, QueryError> {
    validate_field(field)?;
    Ok(format!("data #> '{{{}}}'", field.split('.').collect::<Vec<_>>().join(",")))
}

pub fn to_count_sql(collection: &str, filter: &CompiledFilter) -> Result<SqlResult, QueryError> {
    validate_collection(collection)?;
    let (where_clause, params) = SqlWhere::generate(filter)?;
    Ok(SqlResult {
        query: format!("SELECT COUNT(*) AS count FROM {} WHERE {}", DOCUMENTS_TABLE, where_clause),
        params,
    })
}

/// Projection is applied after the fetch, so the full document is selected.
pub fn to_find_sql(collection: &str, options: &FindOptions<'_>) -> Result<SqlResult, QueryError> {
    validate_collection(collection)?;
    let (where_clause, params) = SqlWhere::generate(options.filter)?;
    let order_clause = SqlOrder::generate(options.sort)?;
    let skip = options.skip.min(MAX_ROWS);
    let limit_clause = match (options.limit.map(|limit| limit.min(MAX_ROWS)), skip) {
        (Some(limit), 0) => format!("LIMIT {}", limit),
        (Some(limit), skip) => format!("LIMIT {} OFFSET {}", limit, skip),
        (None, 0) => String::new(),
        (None, skip) => format!("OFFSET {}", skip),
    };

    let query = [
        format!("SELECT data FROM {}", DOCUMENTS_TABLE),
        format!("WHERE {}", where_clause),
        order_clause,
        limit_clause,
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

    Ok(SqlResult { query, params })
}

pub fn to_delete_sql(collection: &str, filter: &CompiledFilter) -> Result<SqlResult, QueryError> {
    validate_collection(collection)?;
    let (where_clause, params) = SqlWhere::generate(filter)?;
    Ok(SqlResult {
        query: format!("DELETE FROM {} WHERE {}", DOCUMENTS_TABLE, where_clause),
        params,
    })
}
