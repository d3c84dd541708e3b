//! Types and functions to filter the country list by name or ISO code

use nonempty::{nonempty, NonEmpty};
use polars::lazy::dsl::{col, lit, Expr};
use serde::{Deserialize, Serialize};

use crate::COL;

/// Combine a non-empty list of queries with OR
fn combine_exprs_with_or1(exprs: NonEmpty<Expr>) -> Expr {
    let mut query: Expr = exprs.head;
    for expr in exprs.tail.into_iter() {
        query = query.or(expr);
    }
    query
}

/// Regex for `value` under the match type. Every type but `Regex` matches the value literally.
fn match_pattern(value: &str, match_type: MatchType, case_sensitivity: CaseSensitivity) -> String {
    let pattern = match match_type {
        MatchType::Regex => value.to_string(),
        MatchType::Contains => regex::escape(value),
        MatchType::Startswith => format!("^{}", regex::escape(value)),
        MatchType::Exact => format!("^{}$", regex::escape(value)),
    };
    match case_sensitivity {
        CaseSensitivity::Insensitive => format!("(?i){pattern}"),
        CaseSensitivity::Sensitive => pattern,
    }
}

fn column_matches(column: &str, pattern: &str) -> Expr {
    col(column).str().contains(lit(pattern.to_string()), false)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum MatchType {
    Regex,
    #[default]
    Exact,
    Contains,
    Startswith,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum CaseSensitivity {
    #[default]
    Insensitive,
    Sensitive,
}

/// Configuration for searching.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Whether string matching is exact or uses regex.
    pub match_type: MatchType,
    /// Whether matching is case sensitive or insensitive.
    pub case_sensitivity: CaseSensitivity,
}

/// Search over country names and ISO codes
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CountrySearch {
    pub value: String,
    pub config: SearchConfig,
}

impl CountrySearch {
    /// Whole-value, case insensitive match on name or code
    pub fn exact(value: &str) -> Self {
        Self {
            value: value.to_string(),
            config: SearchConfig::default(),
        }
    }
}

/// Implementing conversion from `CountrySearch` to a polars expression enables a search to be
/// passed to a polars dataframe for filtering the country index.
impl From<CountrySearch> for Expr {
    fn from(value: CountrySearch) -> Self {
        let pattern = match_pattern(
            &value.value,
            value.config.match_type,
            value.config.case_sensitivity,
        );
        combine_exprs_with_or1(nonempty![
            column_matches(COL::COUNTRY, &pattern),
            column_matches(COL::COUNTRY_CODE, &pattern),
        ])
    }
}

#[cfg(test)]
mod tests {
    use polars::df;
    use polars::prelude::{DataFrame, IntoLazy};

    use super::*;

    fn test_df() -> DataFrame {
        df!(
            COL::COUNTRY => &["India", "Indonesia", "United States", "World", "Chad"],
            COL::COUNTRY_CODE => &[Some("IND"), Some("IDN"), Some("USA"), None, Some("TCD")],
            "index" => &[0u32, 1, 2, 3, 4]
        )
        .unwrap()
    }

    fn test_from_args(
        value: &str,
        match_type: MatchType,
        case_sensitivity: CaseSensitivity,
        expected_ids: &[u32],
    ) -> anyhow::Result<()> {
        let df = test_df();
        let search = CountrySearch {
            value: value.to_string(),
            config: SearchConfig {
                match_type,
                case_sensitivity,
            },
        };
        let filtered = df.clone().lazy().filter(search.into()).collect()?;
        assert_eq!(filtered.select(["index"])?, df!("index" => expected_ids)?);
        Ok(())
    }

    #[test]
    fn literal_match_types_should_escape_the_value() {
        assert_eq!(
            match_pattern("a.b", MatchType::Exact, CaseSensitivity::Sensitive),
            r"^a\.b$"
        );
        assert_eq!(
            match_pattern("a.b", MatchType::Startswith, CaseSensitivity::Insensitive),
            r"(?i)^a\.b"
        );
        assert_eq!(
            match_pattern("a.b", MatchType::Regex, CaseSensitivity::Sensitive),
            "a.b"
        );
    }

    #[test]
    #[rustfmt::skip]
    fn test_country_search() -> anyhow::Result<()> {
        // 1. Exact, insensitive, matches codes as well as names
        test_from_args("usa", MatchType::Exact, CaseSensitivity::Insensitive, &[2])?;
        // 2. Exact, sensitive
        test_from_args("usa", MatchType::Exact, CaseSensitivity::Sensitive, &[])?;
        // 3. Startswith, insensitive
        test_from_args("ind", MatchType::Startswith, CaseSensitivity::Insensitive, &[0, 1])?;
        // 4. Contains, insensitive
        test_from_args("d", MatchType::Contains, CaseSensitivity::Insensitive, &[0, 1, 2, 3, 4])?;
        // 5. Regex, sensitive
        test_from_args("^[CW]", MatchType::Regex, CaseSensitivity::Sensitive, &[3, 4])?;
        // 6. Contains escapes regex characters
        test_from_args(".", MatchType::Contains, CaseSensitivity::Insensitive, &[])?;
        Ok(())
    }
}
