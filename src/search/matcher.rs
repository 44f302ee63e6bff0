//! Query matcher - one boolean predicate for every adapter / 匹配器

use super::schema::{Query, Record, SearchMode};

/// Decide whether a record satisfies the query
pub fn matches(query: &Query, record: &Record) -> bool {
    let surface: Vec<String> = record.values().into_iter().map(str::to_lowercase).collect();
    matches_surface(query, &surface)
}

/// Match against already lower-cased values
fn matches_surface(query: &Query, surface: &[String]) -> bool {
    let terms = query.terms();

    match query.mode() {
        SearchMode::Exact => {
            if !query.is_satisfiable() {
                return false;
            }
            // Unicode White_Space on both ends; the SQL side trims the same ASCII set
            let target = terms[0].trim();
            surface.iter().any(|v| v.trim() == target)
        }
        SearchMode::Any => terms
            .iter()
            .any(|term| surface.iter().any(|v| v.contains(term.as_str()))),
        SearchMode::All => terms
            .iter()
            .all(|term| surface.iter().any(|v| v.contains(term.as_str()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    fn row(values: &[(&str, &str)]) -> Record {
        Record::fields(
            Arc::from(Path::new("t.csv")),
            values.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        )
    }

    fn line(text: &str) -> Record {
        Record::line(Arc::from(Path::new("t.txt")), text.to_string())
    }

    #[test]
    fn test_all_requires_every_term() {
        let q = Query::new(["ivan", "7999"], SearchMode::All).unwrap();
        assert!(matches(&q, &row(&[("name", "Ivan Petrov"), ("phone", "+79991234567")])));
        assert!(!matches(&q, &row(&[("name", "Ivan Petrov"), ("phone", "+71110000000")])));
        assert!(matches(&q, &line("IVAN;79990000000")));
    }

    #[test]
    fn test_any_accepts_either_term() {
        let q = Query::new(["ivan", "7999"], SearchMode::Any).unwrap();
        assert!(matches(&q, &row(&[("name", "Oleg"), ("phone", "79990001122")])));
        assert!(matches(&q, &row(&[("name", "ivanova")])));
        assert!(!matches(&q, &row(&[("name", "Oleg"), ("phone", "71110001122")])));
    }

    #[test]
    fn test_exact_compares_whole_trimmed_value() {
        let q = Query::new(["ivan"], SearchMode::Exact).unwrap();
        assert!(matches(&q, &row(&[("first", "  Ivan "), ("last", "Petrov")])));
        assert!(!matches(&q, &row(&[("first", "Ivanov")])));
        assert!(matches(&q, &line("IVAN")));
        assert!(!matches(&q, &line("ivan petrov")));
    }

    #[test]
    fn test_exact_trim_set() {
        let q = Query::new(["ivan"], SearchMode::Exact).unwrap();
        assert!(matches(&q, &line("ivan\u{a0}")));
        assert!(matches(&q, &line("\u{b}IVAN\u{c}")));
        assert!(matches(&q, &line("\u{3000}ivan")));
        assert!(!matches(&q, &line("ivan\u{1c}")));
        assert!(!matches(&q, &line("ivan\u{200b}")));
    }

    #[test]
    fn test_exact_with_many_terms_never_matches() {
        let q = Query::new(["ivan", "petrov"], SearchMode::Exact).unwrap();
        assert!(!matches(&q, &row(&[("a", "ivan"), ("b", "petrov")])));
    }

    #[test]
    fn test_case_folding_is_unicode_aware() {
        let q = Query::any("ИВАН").unwrap();
        assert!(matches(&q, &line("Иванов Иван Иванович")));
    }
}
