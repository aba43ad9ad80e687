//! Textual tag literals ("SNBT").
//!
//! Grammar: compounds `{key:value,...}` with quoted or bare keys, lists
//! `[a,b,...]`, typed arrays `[B;...]`, `[I;...]`, `[L;...]`, numbers
//! with an optional type suffix (`b`, `s`, `L`, `f`, `d`; none means int
//! or, with a decimal point, double), `true`/`false` as bytes, and
//! strings, quoted with `"` or `'` or bare.

use super::{
    error::{SnbtError, SnbtErrorKind},
    CompoundTag, ListTag, Tag, TagType, MAX_DEPTH,
};
use std::fmt::{self, Write as _};

/// Parses a compound literal, rejecting trailing input.
pub fn parse_snbt(input: &str) -> Result<CompoundTag, SnbtError> {
    let mut parser = Parser::new(input);
    let compound = parser.read_compound()?;
    parser.finish()?;
    Ok(compound)
}

/// Parses any single value literal, rejecting trailing input.
pub fn parse_snbt_value(input: &str) -> Result<Tag, SnbtError> {
    let mut parser = Parser::new(input);
    let value = parser.read_value()?;
    parser.finish()?;
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            cursor: 0,
            depth: 0,
        }
    }

    fn error(&self, kind: SnbtErrorKind) -> SnbtError {
        let start = self.cursor.saturating_sub(10);
        let mut context: String = self.chars[start..self.cursor.min(self.chars.len())]
            .iter()
            .collect();
        if start > 0 {
            context.insert_str(0, "...");
        }
        SnbtError {
            kind,
            cursor: self.cursor,
            context,
        }
    }

    fn can_read(&self) -> bool {
        self.cursor < self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.cursor + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.cursor += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), SnbtError> {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.cursor += 1;
            Ok(())
        } else {
            Err(self.error(SnbtErrorKind::Expected(c)))
        }
    }

    fn finish(&mut self) -> Result<(), SnbtError> {
        self.skip_whitespace();
        if self.can_read() {
            Err(self.error(SnbtErrorKind::TrailingData))
        } else {
            Ok(())
        }
    }

    /// Consumes a `,` separator if present.
    fn has_element_separator(&mut self) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(',') {
            self.cursor += 1;
            self.skip_whitespace();
            true
        } else {
            false
        }
    }

    fn read_unquoted(&mut self) -> String {
        let start = self.cursor;
        while self.peek().is_some_and(is_unquoted_char) {
            self.cursor += 1;
        }
        self.chars[start..self.cursor].iter().collect()
    }

    fn read_quoted(&mut self) -> Result<String, SnbtError> {
        let Some(quote) = self.peek() else {
            return Err(self.error(SnbtErrorKind::UnclosedQuote));
        };
        self.cursor += 1;
        let mut result = String::new();
        let mut escaped = false;
        while let Some(c) = self.peek() {
            self.cursor += 1;
            if escaped {
                if c == quote || c == '\\' {
                    result.push(c);
                    escaped = false;
                } else {
                    self.cursor -= 1;
                    return Err(self.error(SnbtErrorKind::InvalidEscape(c)));
                }
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                return Ok(result);
            } else {
                result.push(c);
            }
        }
        Err(self.error(SnbtErrorKind::UnclosedQuote))
    }

    fn read_key(&mut self) -> Result<String, SnbtError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error(SnbtErrorKind::ExpectedKey)),
            Some(c) if is_quote(c) => self.read_quoted(),
            Some(_) => Ok(self.read_unquoted()),
        }
    }

    fn read_value(&mut self) -> Result<Tag, SnbtError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error(SnbtErrorKind::ExpectedValue)),
            Some('{') => self.nested(|parser| parser.read_compound().map(Tag::Compound)),
            Some('[') => self.nested(Self::read_list_or_array),
            Some(_) => self.read_typed_value(),
        }
    }

    /// Reads a container one level deeper, failing past [`MAX_DEPTH`].
    fn nested(&mut self, read: impl FnOnce(&mut Self) -> Result<Tag, SnbtError>) -> Result<Tag, SnbtError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(SnbtErrorKind::DepthExceeded(MAX_DEPTH)));
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    fn read_typed_value(&mut self) -> Result<Tag, SnbtError> {
        self.skip_whitespace();
        if self.peek().is_some_and(is_quote) {
            return self.read_quoted().map(Tag::String);
        }
        let start = self.cursor;
        let s = self.read_unquoted();
        if s.is_empty() {
            self.cursor = start;
            return Err(self.error(SnbtErrorKind::ExpectedValue));
        }
        Ok(type_value(s))
    }

    fn read_compound(&mut self) -> Result<CompoundTag, SnbtError> {
        self.expect('{')?;
        let mut compound = CompoundTag::new();
        self.skip_whitespace();
        while self.can_read() && self.peek() != Some('}') {
            let start = self.cursor;
            let key = self.read_key()?;
            if key.is_empty() {
                self.cursor = start;
                return Err(self.error(SnbtErrorKind::ExpectedKey));
            }
            self.expect(':')?;
            let value = self.read_value()?;
            // A value parsed from text is never an end tag.
            let _ = compound.put(key, value);
            if !self.has_element_separator() {
                break;
            }
            if !self.can_read() {
                return Err(self.error(SnbtErrorKind::ExpectedKey));
            }
        }
        self.expect('}')?;
        Ok(compound)
    }

    fn read_list_or_array(&mut self) -> Result<Tag, SnbtError> {
        let is_array = self.peek_at(1).is_some_and(|c| !is_quote(c)) && self.peek_at(2) == Some(';');
        if is_array {
            self.read_array()
        } else {
            self.read_list().map(Tag::List)
        }
    }

    fn read_list(&mut self) -> Result<ListTag, SnbtError> {
        self.expect('[')?;
        self.skip_whitespace();
        if !self.can_read() {
            return Err(self.error(SnbtErrorKind::ExpectedValue));
        }
        let mut list = ListTag::new();
        while self.peek() != Some(']') {
            let start = self.cursor;
            let value = self.read_value()?;
            let found = value.tag_type();
            if !list.is_empty() && found != list.element_type() {
                let expected = list.element_type();
                self.cursor = start;
                return Err(self.error(SnbtErrorKind::MixedList { found, expected }));
            }
            if list.push(value).is_err() {
                self.cursor = start;
                return Err(self.error(SnbtErrorKind::ExpectedValue));
            }
            if !self.has_element_separator() {
                break;
            }
            if !self.can_read() {
                return Err(self.error(SnbtErrorKind::ExpectedValue));
            }
        }
        self.expect(']')?;
        Ok(list)
    }

    fn read_array(&mut self) -> Result<Tag, SnbtError> {
        self.expect('[')?;
        let start = self.cursor;
        let kind = self.peek().unwrap_or(' ');
        self.cursor += 2;
        self.skip_whitespace();
        if !self.can_read() {
            return Err(self.error(SnbtErrorKind::ExpectedValue));
        }
        let (array, element) = match kind {
            'B' => (TagType::ByteArray, TagType::Byte),
            'I' => (TagType::IntArray, TagType::Int),
            'L' => (TagType::LongArray, TagType::Long),
            other => {
                self.cursor = start;
                return Err(self.error(SnbtErrorKind::InvalidArray(other)));
            }
        };

        let mut values = Vec::new();
        while self.peek() != Some(']') {
            let start = self.cursor;
            let value = self.read_value()?;
            if value.tag_type() != element {
                self.cursor = start;
                return Err(self.error(SnbtErrorKind::MixedArray {
                    found: value.tag_type(),
                    array,
                }));
            }
            values.push(value);
            if !self.has_element_separator() {
                break;
            }
            if !self.can_read() {
                return Err(self.error(SnbtErrorKind::ExpectedValue));
            }
        }
        self.expect(']')?;

        Ok(match array {
            TagType::ByteArray => Tag::ByteArray(values.iter().filter_map(Tag::as_byte).collect()),
            TagType::LongArray => Tag::LongArray(values.iter().filter_map(Tag::as_long).collect()),
            _ => Tag::IntArray(values.iter().filter_map(Tag::as_int).collect()),
        })
    }
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

fn is_unquoted_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+')
}

/// `[-+]?(0|[1-9][0-9]*)`
fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    match digits.as_bytes() {
        [b'0'] => true,
        [first, rest @ ..] => (b'1'..=b'9').contains(first) && rest.iter().all(u8::is_ascii_digit),
        [] => false,
    }
}

/// `[-+]?([0-9]+[.]?|[0-9]*[.][0-9]+)(e[-+]?[0-9]+)?`, where the
/// decimal point is mandatory if `require_point` is set.
fn is_decimal(s: &str, require_point: bool) -> bool {
    let s = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    if let Some(exponent) = exponent {
        let digits = exponent.strip_prefix(['-', '+']).unwrap_or(exponent);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    match mantissa.split_once('.') {
        Some((whole, fraction)) => {
            whole.bytes().all(|b| b.is_ascii_digit())
                && fraction.bytes().all(|b| b.is_ascii_digit())
                && (!whole.is_empty() && fraction.is_empty() || !fraction.is_empty())
        }
        None => !require_point && !mantissa.is_empty() && mantissa.bytes().all(|b| b.is_ascii_digit()),
    }
}

fn strip_suffix_ci(s: &str, suffix: char) -> Option<&str> {
    s.strip_suffix(suffix)
        .or_else(|| s.strip_suffix(suffix.to_ascii_uppercase()))
}

/// Interprets a bare literal. Anything that does not parse as a number
/// or boolean becomes a string.
fn type_value(s: String) -> Tag {
    let parsed = if let Some(body) = strip_suffix_ci(&s, 'f').filter(|b| is_decimal(b, false)) {
        body.parse().ok().map(Tag::Float)
    } else if let Some(body) = strip_suffix_ci(&s, 'b').filter(|b| is_integer(b)) {
        body.parse().ok().map(Tag::Byte)
    } else if let Some(body) = strip_suffix_ci(&s, 'l').filter(|b| is_integer(b)) {
        body.parse().ok().map(Tag::Long)
    } else if let Some(body) = strip_suffix_ci(&s, 's').filter(|b| is_integer(b)) {
        body.parse().ok().map(Tag::Short)
    } else if is_integer(&s) {
        s.parse().ok().map(Tag::Int)
    } else if let Some(body) = strip_suffix_ci(&s, 'd').filter(|b| is_decimal(b, false)) {
        body.parse().ok().map(Tag::Double)
    } else if is_decimal(&s, true) {
        s.parse().ok().map(Tag::Double)
    } else if s.eq_ignore_ascii_case("true") {
        Some(Tag::Byte(1))
    } else if s.eq_ignore_ascii_case("false") {
        Some(Tag::Byte(0))
    } else {
        None
    };
    parsed.unwrap_or(Tag::String(s))
}

/// Quotes `s`, preferring `"` unless the string contains one.
pub fn quote_and_escape(s: &str) -> String {
    let mut quote = None;
    let mut body = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        if c == '\\' {
            body.push('\\');
        } else if is_quote(c) {
            let q = *quote.get_or_insert(if c == '"' { '\'' } else { '"' });
            if q == c {
                body.push('\\');
            }
        }
        body.push(c);
    }
    let quote = quote.unwrap_or('"');
    format!("{quote}{body}{quote}")
}

fn write_key(f: &mut impl fmt::Write, key: &str) -> fmt::Result {
    if !key.is_empty() && key.chars().all(is_unquoted_char) {
        f.write_str(key)
    } else {
        f.write_str(&quote_and_escape(key))
    }
}

fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e7 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

fn format_f32(x: f32) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e7 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

fn write_joined<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut each: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        each(f, item)?;
    }
    Ok(())
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::End => f.write_str("END"),
            Tag::Byte(x) => write!(f, "{x}b"),
            Tag::Short(x) => write!(f, "{x}s"),
            Tag::Int(x) => write!(f, "{x}"),
            Tag::Long(x) => write!(f, "{x}L"),
            Tag::Float(x) => write!(f, "{}f", format_f32(*x)),
            Tag::Double(x) => write!(f, "{}d", format_float(*x)),
            Tag::ByteArray(bytes) => {
                f.write_str("[B;")?;
                write_joined(f, bytes, |f, x| write!(f, "{x}B"))?;
                f.write_char(']')
            }
            Tag::String(s) => f.write_str(&quote_and_escape(s)),
            Tag::List(list) => write!(f, "{list}"),
            Tag::Compound(compound) => write!(f, "{compound}"),
            Tag::IntArray(ints) => {
                f.write_str("[I;")?;
                write_joined(f, ints, |f, x| write!(f, "{x}"))?;
                f.write_char(']')
            }
            Tag::LongArray(longs) => {
                f.write_str("[L;")?;
                write_joined(f, longs, |f, x| write!(f, "{x}L"))?;
                f.write_char(']')
            }
        }
    }
}

impl fmt::Display for ListTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        for (i, tag) in self.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "{tag}")?;
        }
        f.write_char(']')
    }
}

impl fmt::Display for CompoundTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        for (i, (key, tag)) in self.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write_key(f, key)?;
            write!(f, ":{tag}")?;
        }
        f.write_char('}')
    }
}

impl Tag {
    /// Multi-line SNBT with compound keys sorted, for display.
    pub fn to_pretty_snbt(&self, indent: &str) -> String {
        let mut out = String::new();
        write_pretty(&mut out, self, indent, 0);
        out
    }
}

fn write_pretty(out: &mut String, tag: &Tag, indent: &str, level: usize) {
    let pad = |out: &mut String, level: usize| {
        for _ in 0..level {
            out.push_str(indent);
        }
    };
    match tag {
        Tag::Compound(compound) if !compound.is_empty() => {
            out.push_str("{\n");
            let entries = compound.sorted_entries();
            for (i, (key, value)) in entries.iter().enumerate() {
                pad(out, level + 1);
                let _ = write_key(out, key);
                out.push_str(": ");
                write_pretty(out, value, indent, level + 1);
                if i + 1 < entries.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            pad(out, level);
            out.push('}');
        }
        Tag::List(list) if !list.is_empty() && !list.element_type().is_value() => {
            out.push_str("[\n");
            for (i, value) in list.iter().enumerate() {
                pad(out, level + 1);
                write_pretty(out, value, indent, level + 1);
                if i + 1 < list.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            pad(out, level);
            out.push(']');
        }
        other => {
            let _ = write!(out, "{other}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_select_types() {
        assert_eq!(parse_snbt_value("5b").unwrap(), Tag::Byte(5));
        assert_eq!(parse_snbt_value("5s").unwrap(), Tag::Short(5));
        assert_eq!(parse_snbt_value("7L").unwrap(), Tag::Long(7));
        assert_eq!(parse_snbt_value("7l").unwrap(), Tag::Long(7));
        assert_eq!(parse_snbt_value("3.2f").unwrap(), Tag::Float(3.2));
        assert_eq!(parse_snbt_value("3d").unwrap(), Tag::Double(3.0));
        assert_eq!(parse_snbt_value("3.5").unwrap(), Tag::Double(3.5));
        assert_eq!(parse_snbt_value("-12").unwrap(), Tag::Int(-12));
        assert_eq!(parse_snbt_value("1.5e3").unwrap(), Tag::Double(1500.0));
    }

    #[test]
    fn out_of_range_numbers_become_strings() {
        assert_eq!(parse_snbt_value("300b").unwrap(), Tag::from("300b"));
        assert_eq!(parse_snbt_value("012").unwrap(), Tag::from("012"));
    }

    #[test]
    fn booleans_map_to_bytes() {
        assert_eq!(parse_snbt_value("true").unwrap(), Tag::Byte(1));
        assert_eq!(parse_snbt_value("FALSE").unwrap(), Tag::Byte(0));
    }

    #[test]
    fn quoting_prefers_double_quotes() {
        assert_eq!(quote_and_escape("plain"), "\"plain\"");
        assert_eq!(quote_and_escape("say \"hi\""), "'say \"hi\"'");
        assert_eq!(quote_and_escape("it's"), "\"it's\"");
        assert_eq!(quote_and_escape("a\\b"), "\"a\\\\b\"");
    }

    #[test]
    fn decimal_pattern() {
        assert!(is_decimal("1.", true));
        assert!(is_decimal(".5", true));
        assert!(is_decimal("1.5e-3", true));
        assert!(!is_decimal("1", true));
        assert!(is_decimal("1", false));
        assert!(!is_decimal(".", false));
        assert!(!is_decimal("1e", false));
    }

    #[test]
    fn float_display_keeps_point() {
        assert_eq!(Tag::Float(5.0).to_string(), "5.0f");
        assert_eq!(Tag::Double(-0.25).to_string(), "-0.25d");
    }
}
