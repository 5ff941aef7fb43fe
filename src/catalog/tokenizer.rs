//! Line tokenizer and typed field parsers for IDE/IPL text.
//!
//! Catalog lines are comma-separated records whose layout is identified by
//! field count. Each record type keeps an ordered list of candidate
//! layouts; the first layout whose arity matches and whose fields all parse
//! wins.

/// Split a record line into trimmed comma-separated fields
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// Parse an integer the way C's `%i` does: optional sign, then `0x` hex,
/// leading-`0` octal, or decimal.
pub fn parse_c_int(field: &str) -> Option<i64> {
    let s = field.trim();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() {
        return None;
    }
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

/// Parse an `i32` field with `%i` semantics
pub fn parse_i32(field: &str) -> Option<i32> {
    parse_c_int(field).and_then(|v| i32::try_from(v).ok())
}

/// Parse a non-negative id field with `%i` semantics
pub fn parse_id(field: &str) -> Option<u32> {
    parse_c_int(field).and_then(|v| u32::try_from(v).ok())
}

/// Parse a float field
pub fn parse_f32(field: &str) -> Option<f32> {
    field.trim().parse::<f32>().ok()
}

/// Parse a name field; names may not be empty
pub fn parse_name(field: &str) -> Option<String> {
    let name = field.trim();
    if name.is_empty() { None } else { Some(name.to_string()) }
}

/// Iterate over the record lines of every section called `section`.
///
/// Section headers and the closing `end` are matched case-insensitively
/// after trimming. Comment lines (`#`) and blank lines are skipped.
pub fn section_lines<'a>(text: &'a str, section: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let mut inside = false;
    text.lines().filter_map(move |raw| {
        let line = raw.trim();
        if !inside {
            if line.eq_ignore_ascii_case(section) {
                inside = true;
            }
            return None;
        }
        if line.eq_ignore_ascii_case("end") {
            inside = false;
            return None;
        }
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        Some(line)
    })
}
