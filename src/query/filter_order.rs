use super::types::{is_field_path, SortDirection, SortField, SortSpec};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses `sort` values such as `name,-averageCost`. Invalid tokens are
    /// dropped; the first mention of a field wins.
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> SortSpec {
        let mut spec = SortSpec::default();
        for value in values {
            for token in value.split(',') {
                if let Some(field) = Self::parse_token(token) {
                    spec.push_unique(field);
                }
            }
        }
        spec
    }

    fn parse_token(token: &str) -> Option<SortField> {
        let trimmed = token.trim();
        let (column, direction) = match trimmed.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Desc),
            None => (trimmed, SortDirection::Asc),
        };
        if !is_field_path(column) {
            return None;
        }
        Some(SortField { field: column.to_string(), direction })
    }

    /// Requested order followed by the default fields it does not mention, so
    /// ties always resolve the same way. An empty request yields the defaults.
    pub fn with_defaults(requested: SortSpec, defaults: &SortSpec) -> SortSpec {
        let mut spec = requested;
        for field in defaults.fields() {
            spec.push_unique(field.clone());
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> SortSpec {
        SortSpec::new(vec![SortField::desc("createdAt")])
    }

    #[test]
    fn parses_directions() {
        let spec = FilterOrder::parse(["name,-averageCost"]);
        assert_eq!(spec.fields(), &[SortField::asc("name"), SortField::desc("averageCost")]);
    }

    #[test]
    fn repeated_values_concatenate() {
        let spec = FilterOrder::parse(["name", "-weeks"]);
        assert_eq!(spec.fields(), &[SortField::asc("name"), SortField::desc("weeks")]);
    }

    #[test]
    fn drops_invalid_and_duplicate_tokens() {
        let spec = FilterOrder::parse([" ,--name, name desc,$natural,title,-title"]);
        assert_eq!(spec.fields(), &[SortField::asc("title")]);
    }

    #[test]
    fn empty_request_uses_defaults() {
        let spec = FilterOrder::with_defaults(FilterOrder::parse([""]), &defaults());
        assert_eq!(spec, defaults());
    }

    #[test]
    fn defaults_break_ties() {
        let spec = FilterOrder::with_defaults(FilterOrder::parse(["name"]), &defaults());
        assert_eq!(spec.fields(), &[SortField::asc("name"), SortField::desc("createdAt")]);

        let spec = FilterOrder::with_defaults(FilterOrder::parse(["createdAt"]), &defaults());
        assert_eq!(spec.fields(), &[SortField::asc("createdAt")]);
    }
}
