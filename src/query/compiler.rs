use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{
    CompiledQuery, PageRequest, Projection, RawQuery, SortSpec, DEFAULT_LIMIT, DEFAULT_PAGE,
    DEFAULT_SORT, is_field_path,
};
use crate::config::QueryConfig;

/// Deployment-level knobs the compiler falls back on.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDefaults {
    pub sort: SortSpec,
    pub limit: u64,
    pub max_limit: Option<u64>,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            sort: FilterOrder::parse([DEFAULT_SORT]),
            limit: DEFAULT_LIMIT,
            max_limit: None,
        }
    }
}

impl QueryDefaults {
    pub fn from_config(config: &QueryConfig) -> Self {
        let sort = FilterOrder::parse([config.default_sort.as_str()]);
        Self {
            sort: if sort.is_empty() { FilterOrder::parse([DEFAULT_SORT]) } else { sort },
            limit: if config.default_limit > 0 { config.default_limit } else { DEFAULT_LIMIT },
            max_limit: config.max_limit.filter(|max| *max > 0),
        }
    }
}

/// Turns list-endpoint query strings into store-agnostic queries.
///
/// Compilation is pure and total: malformed filter tokens are dropped and bad
/// pagination input falls back to the defaults, so any input yields a query.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    defaults: QueryDefaults,
}

impl QueryCompiler {
    pub fn new(defaults: QueryDefaults) -> Self {
        Self { defaults }
    }

    pub fn from_config(config: &QueryConfig) -> Self {
        Self::new(QueryDefaults::from_config(config))
    }

    pub fn defaults(&self) -> &QueryDefaults {
        &self.defaults
    }

    pub fn compile(&self, raw: &RawQuery) -> CompiledQuery {
        CompiledQuery {
            filter: FilterWhere::compile(raw),
            projection: Self::parse_projection(raw),
            sort: FilterOrder::with_defaults(
                FilterOrder::parse(raw.control_values("sort")),
                &self.defaults.sort,
            ),
            page: self.parse_page(raw),
        }
    }

    fn parse_projection(raw: &RawQuery) -> Projection {
        let fields = raw
            .control_values("select")
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|field| is_field_path(field));
        Projection::fields(fields)
    }

    fn parse_page(&self, raw: &RawQuery) -> PageRequest {
        let page = Self::positive(raw, "page").unwrap_or(DEFAULT_PAGE);
        let limit = Self::positive(raw, "limit").unwrap_or(self.defaults.limit);
        let limit = match self.defaults.max_limit {
            Some(max) => limit.min(max),
            None => limit,
        };
        PageRequest { page, limit }
    }

    /// First value of `key` if it is a positive integer.
    fn positive(raw: &RawQuery, key: &str) -> Option<u64> {
        raw.control_values(key)
            .next()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::{FilterOp, Predicate, SortField};

    fn compile(query: &str) -> CompiledQuery {
        QueryCompiler::default().compile(&RawQuery::parse(query))
    }

    #[test]
    fn empty_query_uses_defaults() {
        let query = compile("");
        assert!(query.filter.is_empty());
        assert_eq!(query.projection, Projection::All);
        assert_eq!(query.sort.fields(), &[SortField::desc("createdAt")]);
        assert_eq!(query.page, PageRequest { page: 1, limit: 25 });
    }

    #[test]
    fn full_query() {
        let query = compile("select=name,description&sort=-averageCost&page=2&limit=10&averageCost[lte]=10000&housing=true");
        assert_eq!(query.projection, Projection::fields(["name", "description"]));
        assert_eq!(
            query.sort.fields(),
            &[SortField::desc("averageCost"), SortField::desc("createdAt")]
        );
        assert_eq!(query.page, PageRequest { page: 2, limit: 10 });
        assert_eq!(query.filter.get("averageCost"), Some(&[Predicate::compare(FilterOp::Lte, 10000)][..]));
        assert_eq!(query.filter.get("housing"), Some(&[Predicate::eq(true)][..]));
        assert_eq!(query.filter.len(), 2);
    }

    #[test]
    fn bad_pagination_falls_back() {
        assert_eq!(compile("limit=0&page=-1").page, PageRequest { page: 1, limit: 25 });
        assert_eq!(compile("limit=ten&page=2.5").page, PageRequest { page: 1, limit: 25 });
        assert_eq!(compile("limit=&page=").page, PageRequest { page: 1, limit: 25 });
        assert_eq!(compile("limit=%207%20&page=3").page, PageRequest { page: 3, limit: 7 });
    }

    #[test]
    fn first_pagination_value_wins() {
        assert_eq!(compile("page=4&page=9").page.page, 4);
    }

    #[test]
    fn limit_is_clamped_to_max() {
        let compiler = QueryCompiler::new(QueryDefaults { max_limit: Some(100), ..Default::default() });
        let query = compiler.compile(&RawQuery::parse("limit=5000"));
        assert_eq!(query.page.limit, 100);
    }

    #[test]
    fn control_keys_are_case_insensitive() {
        let query = compile("SELECT=name&Sort=name&PAGE=2");
        assert!(query.filter.is_empty());
        assert_eq!(query.projection, Projection::fields(["name"]));
        assert_eq!(query.sort.fields()[0], SortField::asc("name"));
        assert_eq!(query.page.page, 2);
    }

    #[test]
    fn invalid_select_tokens_are_dropped() {
        assert_eq!(compile("select=,%24where, name ,").projection, Projection::fields(["name"]));
        assert_eq!(compile("select=").projection, Projection::All);
    }

    #[test]
    fn raw_query_is_not_modified() {
        let raw = RawQuery::parse("sort=name&name=x");
        let before = raw.clone();
        let _ = QueryCompiler::default().compile(&raw);
        assert_eq!(raw, before);
    }

    #[test]
    fn configured_defaults() {
        let config = QueryConfig { default_limit: 10, max_limit: Some(50), default_sort: "name".into() };
        let compiler = QueryCompiler::from_config(&config);
        let query = compiler.compile(&RawQuery::default());
        assert_eq!(query.sort.fields(), &[SortField::asc("name")]);
        assert_eq!(query.page.limit, 10);

        let broken = QueryConfig { default_limit: 0, max_limit: Some(0), default_sort: "$bad".into() };
        let defaults = QueryDefaults::from_config(&broken);
        assert_eq!(defaults, QueryDefaults::default());
    }
}
