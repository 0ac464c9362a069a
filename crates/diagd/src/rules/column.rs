// rules/column.rs
// Keyword → column resolution

/// A resolved column: its index and the header text as written in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn<'a> {
    pub index: usize,
    pub header: &'a str,
}

/// Find the first header containing `keyword`, case-insensitively.
///
/// Matching is a plain substring test, so a short keyword like "DO" also
/// hits "Dosing pump". Rule authors order sheet columns to disambiguate.
/// A blank keyword matches nothing.
pub fn resolve_column<'a>(headers: &'a [String], keyword: &str) -> Option<ResolvedColumn<'a>> {
    let needle = keyword.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    headers
        .iter()
        .enumerate()
        .find(|(_, h)| h.to_lowercase().contains(&needle))
        .map(|(index, header)| ResolvedColumn {
            index,
            header: header.as_str(),
        })
}

/// Resolve an instrument column: an exact header match (case-insensitive,
/// trimmed) wins over any substring match, so "pH" picks `pH` even when a
/// `Phone` column sits to its left. Falls back to `resolve_column`.
pub fn resolve_instrument_column<'a>(
    headers: &'a [String],
    keyword: &str,
) -> Option<ResolvedColumn<'a>> {
    let needle = keyword.trim();
    if needle.is_empty() {
        return None;
    }
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(needle))
        .map(|index| ResolvedColumn {
            index,
            header: headers[index].as_str(),
        })
        .or_else(|| resolve_column(headers, keyword))
}
