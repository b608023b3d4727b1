//! Parser for the `remove` command's index list: `N` or `N-M` terms,
//! comma separated, collapsed to a deduplicated descending list so
//! removal can be applied highest-first without earlier removals
//! invalidating later indices.

use crate::error::RouterError;
use std::collections::BTreeSet;

/// Parses `input` into a descending, deduplicated list of 1-based
/// positions. Rejects empty terms, non-numeric terms, zero, and
/// inverted ranges (`N > M`).
pub fn parse_indexes(input: &str) -> Result<Vec<usize>, RouterError> {
    let mut seen = BTreeSet::new();

    for term in input.split(',') {
        let term = term.trim();
        if term.is_empty() {
            return Err(RouterError::user("index list has an empty term"));
        }

        match term.split_once('-') {
            Some((low, high)) => {
                let low = parse_positive(low)?;
                let high = parse_positive(high)?;
                if low > high {
                    return Err(RouterError::user(format!(
                        "invalid range '{term}': start must not exceed end"
                    )));
                }
                for i in low..=high {
                    seen.insert(i);
                }
            }
            None => {
                seen.insert(parse_positive(term)?);
            }
        }
    }

    Ok(seen.into_iter().rev().collect())
}

fn parse_positive(raw: &str) -> Result<usize, RouterError> {
    let value: usize = raw
        .trim()
        .parse()
        .map_err(|_| RouterError::user(format!("'{raw}' is not a positive integer")))?;
    if value == 0 {
        return Err(RouterError::user("indexes are 1-based; 0 is not valid"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_indexes_sorted_descending() {
        assert_eq!(parse_indexes("1,3,2").unwrap(), vec![3, 2, 1]);
    }

    #[test]
    fn ranges_expand_and_dedup() {
        assert_eq!(parse_indexes("1-3,5,7-9").unwrap(), vec![9, 8, 7, 5, 3, 2, 1]);
    }

    #[test]
    fn duplicates_collapse() {
        assert_eq!(parse_indexes("2,2,1-2").unwrap(), vec![2, 1]);
    }

    #[test]
    fn zero_is_rejected() {
        assert!(parse_indexes("0").is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(parse_indexes("5-3").is_err());
    }

    #[test]
    fn non_numeric_term_is_rejected() {
        assert!(parse_indexes("abc").is_err());
    }

    #[test]
    fn empty_term_is_rejected() {
        assert!(parse_indexes("1,,2").is_err());
    }
}
