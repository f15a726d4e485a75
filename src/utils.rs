//! String helpers shared by the compiler and the renderer

use std::borrow::Cow;

/// Escape the characters that are unsafe in HTML text and attribute values
///
/// `& < > " ' `` are replaced with entity references, preferring named
/// references where HTML4 has one. Returns the input untouched when there is
/// nothing to escape.
pub fn escape_html_cow(input: &str) -> Cow<str> {
    if !input.contains(['&', '<', '>', '"', '\'', '`']) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + input.len() / 4);
    for ch in input.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            '`' => result.push_str("&#x60;"),
            _ => result.push(ch),
        }
    }

    Cow::Owned(result)
}

/// Trim template-formatting whitespace from both ends of a text run
///
/// A leading (or trailing) run of spaces, tabs, carriage returns and
/// newlines is removed only if it contains at least one newline. Runs
/// without a newline are meaningful and kept verbatim. Linear time.
pub fn trim_newline_whitespace(text: &str) -> &str {
    let bytes = text.as_bytes();
    let is_blank = |b: u8| matches!(b, b' ' | b'\t' | b'\r' | b'\n');

    let mut start = 0;
    let mut leading_newline = false;
    while start < bytes.len() && is_blank(bytes[start]) {
        leading_newline |= bytes[start] == b'\n';
        start += 1;
    }
    if !leading_newline {
        start = 0;
    }

    let mut end = bytes.len();
    let mut trailing_newline = false;
    while end > start && is_blank(bytes[end - 1]) {
        trailing_newline |= bytes[end - 1] == b'\n';
        end -= 1;
    }
    if !trailing_newline {
        end = bytes.len();
    }

    &text[start..end]
}

/// Format a number the way JavaScript's `String(n)` does
///
/// Integral values print without a fractional part, `-0` prints as `0`,
/// and very large or very small magnitudes switch to exponent notation
/// with an explicit sign (`1e+21`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }

    format!("{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_cow() {
        let result = escape_html_cow("simple text");
        assert!(matches!(result, Cow::Borrowed(_)));

        let result = escape_html_cow("text with <tags> & \"quotes\"");
        assert_eq!(result, "text with &lt;tags&gt; &amp; &quot;quotes&quot;");
        assert!(matches!(result, Cow::Owned(_)));

        assert_eq!(escape_html_cow("it's `code`"), "it&#x27;s &#x60;code&#x60;");
    }

    #[test]
    fn test_escape_keeps_non_ascii() {
        assert_eq!(escape_html_cow("ça & ß"), "ça &amp; ß");
    }

    #[test]
    fn test_trim_newline_whitespace() {
        assert_eq!(trim_newline_whitespace("  \n  hello  \n  "), "hello");
        assert_eq!(trim_newline_whitespace("  hello  "), "  hello  ");
        assert_eq!(trim_newline_whitespace("\n\nhello"), "hello");
        assert_eq!(trim_newline_whitespace("hello\n\n"), "hello");
        assert_eq!(trim_newline_whitespace("  hello\n"), "  hello");
        assert_eq!(trim_newline_whitespace("\n   \n"), "");
        assert_eq!(trim_newline_whitespace(""), "");
        assert_eq!(trim_newline_whitespace("a \n b"), "a \n b");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(123.0), "123");
        assert_eq!(format_number(-7.0), "-7");
        assert_eq!(format_number(0.001), "0.001");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
    }
}
