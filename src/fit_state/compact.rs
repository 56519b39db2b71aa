//! Cosmetic folding of pretty-printed JSON: every array whose body is only
//! numbers, whitespace and commas is rewritten onto a single line.

fn is_numeric_body(body: &str) -> bool {
    body.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, 'e' | 'E' | '+' | '-' | '.' | ',' | ' ' | '\t' | '\r' | '\n'))
}

/// Index one past the `]` matching the `[` at `open`, or `None` if unbalanced.
fn matching_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;
    for (j, &b) in bytes.iter().enumerate().skip(open) {
        if in_str {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_str = false;
            }
            continue;
        }
        match b {
            b'"' => in_str = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index one past the closing quote of the string starting at `open`.
fn string_end(bytes: &[u8], open: usize) -> usize {
    let mut j = open + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'"' => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

pub fn compact_numeric_arrays(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = string_end(bytes, i).min(bytes.len()),
            b'[' => {
                let Some(end) = matching_bracket(bytes, i) else {
                    i += 1;
                    continue;
                };
                let body = &s[i + 1..end - 1];
                let nested = body.contains(['[', '{', '}']);
                if !nested && is_numeric_body(body) {
                    out.push_str(&s[copied..i]);
                    let items: Vec<&str> = body
                        .split(',')
                        .map(str::trim)
                        .filter(|x| !x.is_empty())
                        .collect();
                    out.push('[');
                    out.push_str(&items.join(", "));
                    out.push(']');
                    copied = end;
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&s[copied..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_arrays_fold_onto_one_line() {
        let pretty = serde_json::to_string_pretty(&json!({"AC": [45.0, 999.0, -1.5e3], "L": 65})).unwrap();
        let compact = compact_numeric_arrays(&pretty);
        assert!(compact.contains("\"AC\": [45.0, 999.0, -1500.0]"), "{}", compact);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&compact).unwrap(),
            serde_json::from_str::<serde_json::Value>(&pretty).unwrap()
        );
    }

    #[test]
    fn test_nested_and_string_arrays_untouched() {
        let pretty = serde_json::to_string_pretty(&json!({
            "templates": [{"params": ["L", "AC"]}],
            "names": ["a", "b"],
            "grid": [[1, 2], [3, 4]]
        }))
        .unwrap();
        let compact = compact_numeric_arrays(&pretty);
        assert!(compact.contains("\"L\",\n"));
        assert!(compact.contains("\"a\",\n"));
        // inner numeric arrays of a nested array are left as printed
        assert!(compact.contains("[\n      1,\n"));
    }

    #[test]
    fn test_brackets_inside_strings_ignored() {
        let src = "{\n  \"note\": \"[1, \\\"2\\\"]\",\n  \"x\": [\n    1,\n    2\n  ]\n}";
        let compact = compact_numeric_arrays(src);
        assert!(compact.contains("\"note\": \"[1, \\\"2\\\"]\""));
        assert!(compact.contains("\"x\": [1, 2]"));
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(compact_numeric_arrays("{\"a\": []}"), "{\"a\": []}");
    }
}
