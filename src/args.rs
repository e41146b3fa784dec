// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Argument codec
//!
//! Declarative definitions carry argument lists as a single raw attribute
//! string: comma separated, single-quote delimited, with `''` as the
//! escaped quote inside a quoted token. The codec turns such a string into
//! typed [`Value`] literals and back.
//!
//! Unquoted tokens are trimmed and type-inferred (`true`/`false` →
//! boolean, integer syntax → integer, a token containing `.` that parses
//! as a decimal → decimal, anything else → string). Quoted tokens are
//! forced strings with inner whitespace preserved.

use crate::error::{ExpressionError, Result};
use crate::value::Value;
use rust_decimal::Decimal;

/// Parse a raw comma-separated argument string into typed literals.
///
/// Empty input yields a single empty-string element, matching the
/// declarative format where `args=""` still passes one argument.
///
/// # Errors
///
/// [`ExpressionError::MalformedArgument`] on an unterminated quote or a
/// quote not followed by end-of-token or another quote.
pub fn parse_arguments(args: &str) -> Result<Vec<Value>> {
    let mut result = Vec::new();
    let mut start = 0;
    loop {
        match find_next_comma(args, start)? {
            Some(comma) => {
                result.push(convert_token(args[start..comma].trim())?);
                start = comma + 1;
            }
            None => {
                result.push(convert_token(args[start..].trim())?);
                break;
            }
        }
    }
    Ok(result)
}

/// Convert a single argument token, `None` passing through untouched.
///
/// # Errors
///
/// [`ExpressionError::MalformedArgument`] on bad quoting.
pub fn convert_argument(arg: Option<&str>) -> Result<Option<Value>> {
    arg.map(convert_token).transpose()
}

/// Render a literal string as a quoted argument token, doubling embedded
/// quotes so that [`parse_arguments`] recovers the original.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Convert doubled quotes in an already-quote-stripped token back into
/// single quote characters.
///
/// # Errors
///
/// [`ExpressionError::MalformedArgument`] if an unpaired quote character
/// remains.
pub fn unescape_string(value: &str) -> Result<String> {
    if !value.contains('\'') {
        return Ok(value.to_string());
    }
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            match chars.next() {
                Some('\'') => result.push('\''),
                _ => {
                    return Err(ExpressionError::malformed(format!(
                        "unpaired quote character in {value:?}"
                    )));
                }
            }
        } else {
            result.push(ch);
        }
    }
    Ok(result)
}

/// Byte offset of the next token-separating comma at or after `start`,
/// skipping commas inside quoted sections.
fn find_next_comma(args: &str, start: usize) -> Result<Option<usize>> {
    let mut in_string = false;
    let mut chars = args[start..].char_indices().peekable();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            ',' if !in_string => return Ok(Some(start + offset)),
            '\'' => {
                if !in_string {
                    in_string = true;
                } else if matches!(chars.peek(), Some((_, '\''))) {
                    // escaped quote inside a quoted section
                    chars.next();
                } else {
                    in_string = false;
                }
            }
            _ => {}
        }
    }
    if in_string {
        return Err(ExpressionError::malformed(format!(
            "unterminated quoted section in {args:?}"
        )));
    }
    Ok(None)
}

pub(crate) fn convert_token(arg: &str) -> Result<Value> {
    if arg.is_empty() {
        return Ok(Value::String("".into()));
    }
    if arg.starts_with('\'') && arg.ends_with('\'') {
        if arg.len() < 2 {
            return Err(ExpressionError::malformed(format!(
                "unterminated quoted section in {arg:?}"
            )));
        }
        return Ok(Value::String(
            unescape_string(&arg[1..arg.len() - 1])?.into(),
        ));
    }
    match arg {
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),
        _ => {
            if arg.contains('.') {
                if let Ok(decimal) = arg.parse::<Decimal>() {
                    return Ok(Value::Decimal(decimal));
                }
            } else if let Ok(integer) = arg.parse::<i64>() {
                return Ok(Value::Integer(integer));
            }
            Ok(Value::String(arg.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn string(value: &str) -> Value {
        Value::String(value.into())
    }

    #[test]
    fn unescape() {
        assert_eq!(unescape_string("Str''ing").unwrap(), "Str'ing");
        assert_eq!(unescape_string("''").unwrap(), "'");
        assert!(unescape_string("'").is_err());
    }

    #[test]
    fn escape_round_trip() {
        for literal in ["','", "plain", " spaced ", "it''s", "'"] {
            let parsed = parse_arguments(&escape_string(literal)).unwrap();
            assert_eq!(parsed, vec![string(literal)]);
        }
    }

    #[test]
    fn argument_conversion() {
        assert_eq!(convert_argument(None).unwrap(), None);
        assert_eq!(convert_argument(Some("")).unwrap(), Some(string("")));
        assert_eq!(convert_argument(Some("''")).unwrap(), Some(string("")));
        assert_eq!(
            convert_argument(Some("engine")).unwrap(),
            Some(string("engine"))
        );
        // interior quotes in an unquoted token stay literal
        assert_eq!(
            convert_argument(Some("e'ngin'e")).unwrap(),
            Some(string("e'ngin'e"))
        );
        assert_eq!(
            convert_argument(Some("'engine'")).unwrap(),
            Some(string("engine"))
        );
        assert_eq!(
            convert_argument(Some("'''en''gine'''")).unwrap(),
            Some(string("'en'gine'"))
        );
        // quoting forces string typing
        assert_eq!(convert_argument(Some("'true'")).unwrap(), Some(string("true")));
        assert_eq!(convert_argument(Some("'1.7'")).unwrap(), Some(string("1.7")));
        assert_eq!(convert_argument(Some("'007'")).unwrap(), Some(string("007")));
        assert_eq!(
            convert_argument(Some("true")).unwrap(),
            Some(Value::Boolean(true))
        );
        assert_eq!(
            convert_argument(Some("false")).unwrap(),
            Some(Value::Boolean(false))
        );
        assert_eq!(
            convert_argument(Some("100")).unwrap(),
            Some(Value::Integer(100))
        );
        assert_eq!(
            convert_argument(Some("1.7")).unwrap(),
            Some(Value::Decimal(Decimal::new(17, 1)))
        );
    }

    #[test]
    fn argument_parsing() {
        assert_eq!(parse_arguments("").unwrap(), vec![string("")]);
        assert_eq!(parse_arguments("s1").unwrap(), vec![string("s1")]);
        assert_eq!(parse_arguments(" s1 ").unwrap(), vec![string("s1")]);
        assert_eq!(
            parse_arguments("s1,s2").unwrap(),
            vec![string("s1"), string("s2")]
        );
        assert_eq!(
            parse_arguments(" s1 , s2 ").unwrap(),
            vec![string("s1"), string("s2")]
        );
        assert_eq!(
            parse_arguments("' s1 ',' s2 '").unwrap(),
            vec![string(" s1 "), string(" s2 ")]
        );
        assert_eq!(
            parse_arguments(" s1 , ' s2 '").unwrap(),
            vec![string("s1"), string(" s2 ")]
        );
        assert_eq!(
            parse_arguments("' s1 ', s2 ").unwrap(),
            vec![string(" s1 "), string("s2")]
        );
        assert_eq!(parse_arguments("''''").unwrap(), vec![string("'")]);
        assert_eq!(
            parse_arguments("''',''',','").unwrap(),
            vec![string("','"), string(",")]
        );
        assert_eq!(
            parse_arguments("' s1 ', true ").unwrap(),
            vec![string(" s1 "), Value::Boolean(true)]
        );
        assert!(parse_arguments("' s1").is_err());
        assert!(parse_arguments("'''s1").is_err());
    }
}
