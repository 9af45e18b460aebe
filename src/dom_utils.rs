use super::*;

pub(crate) fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attrs
        .get("class")
        .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
}

/// Escapes text content. Attribute values additionally escape `"`.
pub(crate) fn escape_html(value: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        let replacement = match ch {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' if in_attribute => "&quot;",
            _ => {
                out.push(ch);
                continue;
            }
        };
        out.push_str(replacement);
    }
    out
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

/// Splits an inline `style` attribute into lowercase property names and
/// trimmed values. Semicolons inside quotes or parentheses do not end a
/// declaration; a repeated property keeps its first position and last value.
pub(crate) fn parse_style_declarations(style: Option<&str>) -> Vec<(String, String)> {
    let mut decls: Vec<(String, String)> = Vec::new();
    for raw in split_style_declarations(style.unwrap_or("")) {
        let Some((name, value)) = raw.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        match decls.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => decls.push((name, value)),
        }
    }
    decls
}

fn split_style_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;

    for (at, ch) in style.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                parts.push(&style[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);
    parts
}

/// Declaration value without a trailing `!important` flag.
pub(crate) fn strip_important(value: &str) -> &str {
    let value = value.trim_end();
    match value.rfind('!') {
        Some(bang) if value[bang + 1..].trim_start().eq_ignore_ascii_case("important") => {
            value[..bang].trim_end()
        }
        _ => value,
    }
}

pub(crate) fn serialize_style_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}
