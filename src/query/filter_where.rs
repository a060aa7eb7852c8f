use serde_json::{Number, Value};

use super::types::{is_field_path, is_reserved, CompiledFilter, FilterOp, Predicate, RawQuery};

/// Translates the non-control part of a raw query into a [`CompiledFilter`].
pub struct FilterWhere {
    filter: CompiledFilter,
}

impl FilterWhere {
    fn new() -> Self {
        Self { filter: CompiledFilter::new() }
    }

    /// Builds a fresh filter from a copy of the query's pairs; the raw query is
    /// left untouched.
    pub fn compile(raw: &RawQuery) -> CompiledFilter {
        let mut filter_where = Self::new();
        for (key, value) in raw.pairs() {
            filter_where.parse_pair(key, value);
        }
        filter_where.filter
    }

    fn parse_pair(&mut self, key: &str, value: &str) {
        let Some((field, op)) = Self::split_key(key) else { return };
        if is_reserved(field) || !is_field_path(field) {
            return;
        }
        let predicate = match op {
            FilterOp::In => match Self::parse_set(value) {
                Some(predicate) => predicate,
                None => return,
            },
            op => Predicate::compare(op, infer_scalar(value)),
        };
        self.filter.push(field, predicate);
    }

    /// `field` → equality, `field[op]` → whitelisted operator, anything else
    /// bracketed is dropped.
    fn split_key(key: &str) -> Option<(&str, FilterOp)> {
        match key.find('[') {
            None if key.contains(']') => None,
            None => Some((key, FilterOp::Eq)),
            Some(open) => {
                let suffix = key[open + 1..].strip_suffix(']')?;
                if suffix.contains('[') || suffix.contains(']') {
                    return None;
                }
                Some((&key[..open], FilterOp::from_suffix(suffix)?))
            }
        }
    }

    fn parse_set(value: &str) -> Option<Predicate> {
        let members: Vec<Value> = value
            .split(',')
            .map(str::trim)
            .filter(|member| !member.is_empty())
            .map(infer_scalar)
            .collect();
        if members.is_empty() { None } else { Some(Predicate::in_set(members)) }
    }
}

/// Types a query-string operand: canonical integers and decimals become
/// numbers, `true`/`false` booleans, everything else stays text. Text such as
/// `02118` keeps its leading zero.
pub fn infer_scalar(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = text.parse::<i64>() {
        if int.to_string() == text {
            return Value::from(int);
        }
    }
    if is_plain_decimal(text) {
        if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(text.to_string())
}

fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let Some((whole, fraction)) = unsigned.split_once('.') else { return false };
    let whole_ok = whole == "0" || (!whole.is_empty() && !whole.starts_with('0'));
    whole_ok
        && whole.chars().all(|c| c.is_ascii_digit())
        && !fraction.is_empty()
        && fraction.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::Operand;
    use serde_json::json;

    fn compile(pairs: &[(&str, &str)]) -> CompiledFilter {
        FilterWhere::compile(&pairs.iter().copied().collect())
    }

    #[test]
    fn plain_keys_become_equality() {
        let filter = compile(&[("housing", "true"), ("location.state", "MA")]);
        assert_eq!(filter.get("housing"), Some(&[Predicate::eq(true)][..]));
        assert_eq!(filter.get("location.state"), Some(&[Predicate::eq("MA")][..]));
    }

    #[test]
    fn bracket_operators_translate() {
        let filter = compile(&[("averageCost[gte]", "100"), ("averageCost[lt]", "500.5")]);
        assert_eq!(
            filter.get("averageCost"),
            Some(&[
                Predicate::compare(FilterOp::Gte, 100),
                Predicate::compare(FilterOp::Lt, 500.5),
            ][..])
        );
    }

    #[test]
    fn unknown_or_malformed_operators_are_dropped() {
        let filter = compile(&[
            ("price[ne]", "3"),
            ("price[$where]", "1"),
            ("price[gt", "1"),
            ("price]", "1"),
            ("price[gt][lt]", "1"),
            ("$where", "sleep(1)"),
            ("[gt]", "1"),
        ]);
        assert!(filter.is_empty(), "unexpected filter: {:?}", filter);
    }

    #[test]
    fn reserved_keys_are_never_filters() {
        let filter = compile(&[("Sort", "name"), ("page[gt]", "1"), ("LIMIT", "5"), ("name", "x")]);
        assert_eq!(filter.fields().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn in_lists_are_deduplicated() {
        let filter = compile(&[("careers[in]", "UI/UX, Business,UI/UX,,")]);
        let predicates = filter.get("careers").unwrap();
        assert_eq!(predicates.len(), 1);
        assert_eq!(predicates[0].operand, Operand::Set(vec![json!("UI/UX"), json!("Business")]));
    }

    #[test]
    fn empty_in_list_is_dropped() {
        assert!(compile(&[("careers[in]", " , ")]).is_empty());
    }

    #[test]
    fn scalar_inference() {
        assert_eq!(infer_scalar("42"), json!(42));
        assert_eq!(infer_scalar("-7"), json!(-7));
        assert_eq!(infer_scalar("1.5"), json!(1.5));
        assert_eq!(infer_scalar("02118"), json!("02118"));
        assert_eq!(infer_scalar("1e3"), json!("1e3"));
        assert_eq!(infer_scalar(".5"), json!(".5"));
        assert_eq!(infer_scalar("false"), json!(false));
        assert_eq!(infer_scalar("True"), json!("True"));
        assert_eq!(infer_scalar(""), json!(""));
    }
}
