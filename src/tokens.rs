//! Token field declarations and the string operations used to normalize them.

use fancy_regex::Regex as FancyRegex;
use serde::Serialize;
use std::sync::LazyLock;

/// Signals that a mandatory operation failed while normalizing a token or
/// building a URL/name.
///
/// This is deliberately not an error type: a failed mandatory operation
/// invalidates the enclosing [`Citation`] or [`StringBuilder`] build and is
/// never surfaced to a caller as an error.
///
/// [`Citation`]: crate::citation::Citation
/// [`StringBuilder`]: crate::builder::StringBuilder
#[derive(Clone, Copy, Debug)]
pub(crate) struct OperationFailed;

/// Case-folding styles for the `case` operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Case {
    /// ALL UPPERCASE.
    Upper,
    /// all lowercase.
    Lower,
    /// Title Case, Word By Word.
    Title,
}

/// Target representations for the `number_style` operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberStyle {
    /// Arabic digits, e.g. `27`.
    Digit,
    /// Roman numerals, e.g. `XXVII`.
    Roman,
    /// Cardinal number words, e.g. `twenty-seven`.
    Cardinal,
    /// Ordinal number words, e.g. `twenty-seventh`.
    Ordinal,
}

/// The kind of string transform a [`TokenOperation`] performs, and the data
/// it needs to perform it.
#[derive(Debug)]
pub enum OperationKind {
    /// Regex substitution: `(pattern, replacement)`.
    Sub(FancyRegex, String),
    /// Case-insensitive full-match lookup against an ordered list of
    /// `(pattern, replacement)` pairs; first match wins.
    Lookup(Vec<(FancyRegex, String)>),
    /// Case-fold the value.
    Case(Case),
    /// Left-pad the value with `pad_char` until it is at least `min_len`
    /// characters long.
    LPad {
        /// Minimum output length.
        min_len: usize,
        /// Padding character.
        pad_char: char,
    },
    /// Reinterpret the value as a number (digits, Roman numerals, or English
    /// number words, 1-40 inclusive) and re-emit it in `style`.
    NumberStyle(NumberStyle),
}

/// A single named string transform.
///
/// `token`/`output` are only meaningful when the operation runs as part of a
/// [`StringBuilder`](crate::builder::StringBuilder) edit list, where they
/// select which entry of an ephemeral token map to read from and write to.
/// When run as part of a [`TokenType`]'s own `edits`, the operation acts
/// directly on the single string being normalized and `token`/`output` are
/// unused.
#[derive(Debug)]
pub struct TokenOperation {
    /// The transform to perform.
    pub kind: OperationKind,
    /// Whether a failed lookup/number-style conversion invalidates the
    /// enclosing build. `sub`, `case`, and `lpad` never fail.
    pub mandatory: bool,
    /// The token name to read from, when used inside a `StringBuilder`.
    pub token: Option<String>,
    /// The token name to write to, when used inside a `StringBuilder`. When
    /// unset, the operation rewrites `token` in place.
    pub output: Option<String>,
}

impl TokenOperation {
    /// Applies this operation to a single string value.
    pub(crate) fn apply(&self, value: &str) -> Result<String, OperationFailed> {
        match &self.kind {
            OperationKind::Sub(pattern, replacement) => Ok(pattern
                .replace_all(value, replacement.as_str())
                .into_owned()),
            OperationKind::Lookup(table) => {
                for (pattern, replacement) in table {
                    if pattern.is_match(value).unwrap_or(false) {
                        return Ok(replacement.clone());
                    }
                }
                if self.mandatory {
                    Err(OperationFailed)
                } else {
                    Ok(value.to_string())
                }
            }
            OperationKind::Case(case) => Ok(set_case(value, *case)),
            OperationKind::LPad { min_len, pad_char } => Ok(left_pad(value, *min_len, *pad_char)),
            OperationKind::NumberStyle(style) => number_style(value, *style, self.mandatory),
        }
    }

    /// Applies this operation to a token map: reads `self.token`, writes to
    /// `self.output` (or back to `self.token` if unset). A missing input
    /// token is a no-op, not a failure.
    pub(crate) fn modify_tokens(
        &self,
        tokens: &mut indexmap::IndexMap<String, String>,
    ) -> Result<(), OperationFailed> {
        let Some(token_name) = &self.token else {
            return Ok(());
        };
        let Some(input) = tokens.get(token_name) else {
            return Ok(());
        };
        let output = self.apply(input)?;
        let target = self.output.as_ref().unwrap_or(token_name);
        tokens.insert(target.clone(), output);
        Ok(())
    }
}

/// A named field declaration: a regex fragment, normalization edits, an
/// optional default, and severability.
#[derive(Debug)]
pub struct TokenType {
    /// The unwrapped regex fragment matching the token's raw text. Must not
    /// contain a named group; the owning [`Template`](crate::template::Template)
    /// wraps it as `(?P<name>fragment)(?!\w)`.
    pub regex: String,
    /// Edits applied in order to the captured substring.
    pub edits: Vec<TokenOperation>,
    /// Value to use when the token was not captured.
    pub default: Option<String>,
    /// Whether a value that is a prefix of another counts as the same
    /// [`Authority`](crate::authority::Authority).
    pub severable: bool,
}

impl TokenType {
    /// Normalizes a captured (or absent) raw value. Returns `Ok(None)` only
    /// when both the input and the default are absent. Returns `Err` when a
    /// mandatory edit failed; this must collapse the enclosing Citation's
    /// construction.
    pub(crate) fn normalize(&self, raw: Option<&str>) -> Result<Option<String>, OperationFailed> {
        let Some(raw) = raw else {
            return Ok(self.default.clone());
        };
        let mut value = raw.to_string();
        for edit in &self.edits {
            value = edit.apply(&value)?;
        }
        Ok(Some(value))
    }
}

fn set_case(value: &str, case: Case) -> String {
    match case {
        Case::Upper => value.to_uppercase(),
        Case::Lower => value.to_lowercase(),
        Case::Title => value
            .split_inclusive(char::is_whitespace)
            .map(title_case_word)
            .collect(),
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn left_pad(value: &str, min_len: usize, pad_char: char) -> String {
    let len = value.chars().count();
    if len >= min_len {
        return value.to_string();
    }
    let mut out = String::with_capacity(min_len);
    for _ in 0..(min_len - len) {
        out.push(pad_char);
    }
    out.push_str(value);
    out
}

fn number_style(value: &str, style: NumberStyle, mandatory: bool) -> Result<String, OperationFailed> {
    let parsed = parse_number(value);
    let Some(n) = parsed else {
        return if mandatory {
            Err(OperationFailed)
        } else {
            Ok(value.to_string())
        };
    };
    if !(1..=40).contains(&n) {
        return if mandatory {
            Err(OperationFailed)
        } else {
            Ok(value.to_string())
        };
    }
    let (roman, cardinal, ordinal) = NUMBER_WORDS[n as usize - 1];
    Ok(match style {
        NumberStyle::Digit => n.to_string(),
        NumberStyle::Roman => roman.to_uppercase(),
        NumberStyle::Cardinal => cardinal.to_string(),
        NumberStyle::Ordinal => ordinal.to_string(),
    })
}

/// Parses an input that may be digits (`27`), an ordinal-digit form (`27th`),
/// a cardinal word (`twenty-seven`), an ordinal word (`twenty-seventh`), or a
/// Roman numeral (case-insensitive).
fn parse_number(value: &str) -> Option<u32> {
    if let Ok(n) = value.parse::<u32>() {
        return Some(n);
    }
    let trimmed = value.trim_end_matches(|c: char| c.is_alphabetic());
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = trimmed.parse::<u32>() {
            return Some(n);
        }
    }
    let lower = value.to_lowercase();
    for (i, (roman, cardinal, ordinal)) in NUMBER_WORDS.iter().enumerate() {
        if lower == roman.to_lowercase() || lower == *cardinal || lower == *ordinal {
            return Some(i as u32 + 1);
        }
    }
    None
}

/// `(roman numeral, cardinal word, ordinal word)` for 1 through 40,
/// zero-indexed.
static NUMBER_WORDS: LazyLock<[(&str, &str, &str); 40]> = LazyLock::new(|| {
    [
        ("i", "one", "first"),
        ("ii", "two", "second"),
        ("iii", "three", "third"),
        ("iv", "four", "fourth"),
        ("v", "five", "fifth"),
        ("vi", "six", "sixth"),
        ("vii", "seven", "seventh"),
        ("viii", "eight", "eighth"),
        ("ix", "nine", "ninth"),
        ("x", "ten", "tenth"),
        ("xi", "eleven", "eleventh"),
        ("xii", "twelve", "twelfth"),
        ("xiii", "thirteen", "thirteenth"),
        ("xiv", "fourteen", "fourteenth"),
        ("xv", "fifteen", "fifteenth"),
        ("xvi", "sixteen", "sixteenth"),
        ("xvii", "seventeen", "seventeenth"),
        ("xviii", "eighteen", "eighteenth"),
        ("xix", "nineteen", "nineteenth"),
        ("xx", "twenty", "twentieth"),
        ("xxi", "twenty-one", "twenty-first"),
        ("xxii", "twenty-two", "twenty-second"),
        ("xxiii", "twenty-three", "twenty-third"),
        ("xxiv", "twenty-four", "twenty-fourth"),
        ("xxv", "twenty-five", "twenty-fifth"),
        ("xxvi", "twenty-six", "twenty-sixth"),
        ("xxvii", "twenty-seven", "twenty-seventh"),
        ("xxviii", "twenty-eight", "twenty-eighth"),
        ("xxix", "twenty-nine", "twenty-ninth"),
        ("xxx", "thirty", "thirtieth"),
        ("xxxi", "thirty-one", "thirty-first"),
        ("xxxii", "thirty-two", "thirty-second"),
        ("xxxiii", "thirty-three", "thirty-third"),
        ("xxxiv", "thirty-four", "thirty-fourth"),
        ("xxxv", "thirty-five", "thirty-fifth"),
        ("xxxvi", "thirty-six", "thirty-sixth"),
        ("xxxvii", "thirty-seven", "thirty-seventh"),
        ("xxxviii", "thirty-eight", "thirty-eighth"),
        ("xxxix", "thirty-nine", "thirty-ninth"),
        ("xl", "forty", "fortieth"),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lpad_pads_to_minimum_length() {
        assert_eq!(left_pad("7", 4, '0'), "0007");
        assert_eq!(left_pad("1234", 4, '0'), "1234");
        assert_eq!(left_pad("12345", 4, '0'), "12345");
    }

    #[test]
    fn title_case_handles_multiple_words() {
        assert_eq!(set_case("UNITED states", Case::Title), "United States");
    }

    #[test]
    fn number_style_round_trips_digit_to_ordinal() {
        assert_eq!(
            number_style("27", NumberStyle::Ordinal, true).unwrap(),
            "twenty-seventh"
        );
        assert_eq!(
            number_style("XXVII", NumberStyle::Digit, true).unwrap(),
            "27"
        );
        assert_eq!(
            number_style("thirty-seven", NumberStyle::Roman, true).unwrap(),
            "XXXVII"
        );
    }

    #[test]
    fn number_style_out_of_range_is_mandatory_failure() {
        assert!(number_style("41", NumberStyle::Digit, true).is_err());
        assert_eq!(number_style("41", NumberStyle::Digit, false).unwrap(), "41");
    }

    #[test]
    fn token_type_uses_default_when_absent() {
        let token = TokenType {
            regex: r"\d+".to_string(),
            edits: vec![],
            default: Some("1".to_string()),
            severable: false,
        };
        assert_eq!(token.normalize(None).unwrap(), Some("1".to_string()));
        assert_eq!(
            token.normalize(Some("42")).unwrap(),
            Some("42".to_string())
        );
    }
}
