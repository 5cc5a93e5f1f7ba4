//! Server-evaluated filter formula construction.
//!
//! Filters are boolean formula strings evaluated by the store. Every
//! user-supplied value embedded into a formula goes through [`escape`] so a
//! quote in a dish name cannot break out of the string literal.

/// Escape a value for embedding inside a single-quoted formula literal.
/// The store's escape convention doubles the quote: `'` → `''`.
pub fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// `{Field} = 'value'`
pub fn eq(field: &str, value: &str) -> String {
    format!("{{{field}}} = '{}'", escape(value))
}

/// `AND(a, b, ...)`
pub fn and(clauses: &[String]) -> String {
    format!("AND({})", clauses.join(", "))
}

/// `NOT(clause)`
pub fn not(clause: &str) -> String {
    format!("NOT({clause})")
}

/// Case-insensitive substring match: `SEARCH(LOWER('needle'), LOWER({Field}))`
pub fn contains_ci(field: &str, needle: &str) -> String {
    format!("SEARCH(LOWER('{}'), LOWER({{{field}}}))", escape(needle))
}

/// Batch point-lookup by record id: `OR(RECORD_ID() = 'a', RECORD_ID() = 'b')`.
/// Ids are store-assigned and never user-supplied, but they are escaped anyway.
pub fn record_ids(ids: &[String]) -> String {
    let clauses: Vec<String> = ids
        .iter()
        .map(|id| format!("RECORD_ID() = '{}'", escape(id)))
        .collect();
    if clauses.len() == 1 {
        clauses.into_iter().next().unwrap()
    } else {
        format!("OR({})", clauses.join(", "))
    }
}
