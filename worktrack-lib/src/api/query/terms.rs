//! Rendering of selection lists and where terms.

/// Dotted-path prefixes of an attribute path, shortest first, excluding the
/// full path itself: `"A.B.C"` yields `["A", "A.B"]`.
pub(crate) fn path_prefixes(path: &str) -> Vec<String> {
    let parts: Vec<&str> = path.split('.').collect();
    (1..parts.len()).map(|i| parts[..i].join(".")).collect()
}

/// Adds a field path to a selection list, inserting the implied prefixes
/// first so the server returns the intermediate reference objects. Order is
/// preserved and exact duplicates are suppressed.
pub(crate) fn add_selection(sel_list: &mut Vec<String>, path: &str) {
    for prefix in path_prefixes(path) {
        if !sel_list.contains(&prefix) {
            sel_list.push(prefix);
        }
    }
    if !sel_list.iter().any(|existing| existing == path) {
        sel_list.push(path.to_string());
    }
}

/// Comma-joined selection list.
pub(crate) fn render_selection(sel_list: &[String]) -> String {
    sel_list.join(",")
}

/// Renders equality terms as `name='value'` joined by `;`, with the raw
/// filter expression appended as the final segment. Values are substituted
/// literally; callers own value safety.
pub(crate) fn render_where(terms: &[(String, String)], filter: Option<&str>) -> String {
    let mut segments: Vec<String> = terms
        .iter()
        .map(|(name, value)| format!("{name}='{value}'"))
        .collect();
    if let Some(filter) = filter {
        segments.push(filter.to_string());
    }
    segments.join(";")
}

/// Merges an equality term, overwriting an earlier value for the same key
/// while keeping the key's original position.
pub(crate) fn merge_term(terms: &mut Vec<(String, String)>, name: String, value: String) {
    match terms.iter_mut().find(|(existing, _)| *existing == name) {
        Some((_, existing_value)) => *existing_value = value,
        None => terms.push((name, value)),
    }
}
