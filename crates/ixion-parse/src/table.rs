//! Table reference grammar: `Table[Column]`, `[Column]` (implicit table),
//! `Table[[#Area1],[#Area2],[Column]]`, `Table[[#Area],[Col1]:[Col2]]`.
//! The `:` is only meaningful inside the final column scope; area tokens
//! accumulate by OR, with `#All` overriding the other three.

use ixion_common::{TableAreas, TableReference};

enum Segment {
    Area(TableAreas),
    Column(String),
    ColumnRange(String, String),
}

fn parse_area(name: &str) -> Option<TableAreas> {
    match name.to_ascii_lowercase().as_str() {
        "headers" => Some(TableAreas::HEADERS),
        "data" => Some(TableAreas::DATA),
        "totals" => Some(TableAreas::TOTALS),
        "all" => Some(TableAreas::ALL),
        _ => None,
    }
}

/// Split `content` into `[...]`-delimited segments, joining a `[x]:[y]`
/// pair into a single `ColumnRange`. Brackets don't nest within a segment.
fn parse_segments(content: &str) -> Option<Vec<Segment>> {
    let bytes = content.as_bytes();
    let mut pos = 0;
    let mut segments = Vec::new();

    let take_bracket = |pos: &mut usize| -> Option<String> {
        if bytes.get(*pos) != Some(&b'[') {
            return None;
        }
        let start = *pos + 1;
        let close = content[start..].find(']')? + start;
        *pos = close + 1;
        Some(content[start..close].to_string())
    };

    while pos < bytes.len() {
        let item = take_bracket(&mut pos)?;
        if let Some(name) = item.strip_prefix('#') {
            segments.push(Segment::Area(parse_area(name)?));
        } else if bytes.get(pos) == Some(&b':') {
            pos += 1;
            let second = take_bracket(&mut pos)?;
            segments.push(Segment::ColumnRange(item, second));
        } else {
            segments.push(Segment::Column(item));
        }
        match bytes.get(pos) {
            Some(b',') => pos += 1,
            None => break,
            Some(_) => return None,
        }
    }
    Some(segments)
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Recognize a table reference. Returns `None` for anything that doesn't
/// match the grammar, letting the caller fall through to the reference
/// dialects and then to a plain named expression.
pub fn try_parse_table(text: &str) -> Option<TableReference> {
    let bracket_start = text.find('[')?;
    if !text.ends_with(']') {
        return None;
    }
    let name_part = &text[..bracket_start];
    let name = if name_part.is_empty() {
        None
    } else if is_identifier(name_part) {
        Some(name_part.to_string())
    } else {
        return None;
    };
    let content = &text[bracket_start + 1..text.len() - 1];

    if content.starts_with('[') {
        let segments = parse_segments(content)?;
        let mut areas = TableAreas::empty();
        let mut column_first = None;
        let mut column_last = None;
        for segment in segments {
            match segment {
                Segment::Area(a) => areas |= a,
                Segment::Column(c) => column_first = Some(c),
                Segment::ColumnRange(first, last) => {
                    column_first = Some(first);
                    column_last = Some(last);
                }
            }
        }
        if areas.is_empty() {
            areas = TableAreas::DATA;
        }
        Some(TableReference {
            name,
            column_first,
            column_last,
            areas,
        })
    } else if is_identifier(content) {
        Some(TableReference::single_column(name, content.to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_single_column() {
        let table = try_parse_table("Sales[Amount]").unwrap();
        assert_eq!(table.name.as_deref(), Some("Sales"));
        assert_eq!(table.column_first.as_deref(), Some("Amount"));
        assert_eq!(table.areas, TableAreas::DATA);
    }

    #[test]
    fn parses_implicit_table_column() {
        let table = try_parse_table("[Amount]").unwrap();
        assert_eq!(table.name, None);
        assert_eq!(table.column_first.as_deref(), Some("Amount"));
    }

    #[test]
    fn parses_area_specifiers_with_column() {
        let table = try_parse_table("Sales[[#Headers],[#Data],[Amount]]").unwrap();
        assert_eq!(table.areas, TableAreas::HEADERS | TableAreas::DATA);
        assert_eq!(table.column_first.as_deref(), Some("Amount"));
    }

    #[test]
    fn parses_area_with_column_range() {
        let table = try_parse_table("Sales[[#Data],[Start]:[End]]").unwrap();
        assert_eq!(table.column_first.as_deref(), Some("Start"));
        assert_eq!(table.column_last.as_deref(), Some("End"));
    }

    #[test]
    fn all_area_overrides_others() {
        let table = try_parse_table("Sales[[#Headers],[#All],[Amount]]").unwrap();
        assert!(table.areas.contains(TableAreas::ALL));
        assert!(table.areas.contains(TableAreas::HEADERS));
    }

    #[test]
    fn rejects_text_with_no_brackets() {
        assert!(try_parse_table("Amount").is_none());
    }
}
