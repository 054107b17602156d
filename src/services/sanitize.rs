//! Object-name sanitizer.
//!
//! Cloud Storage object names may not contain XML control characters and
//! treat `[`, `]`, `*`, `?` and `#` as wildcard/versioning syntax, so every
//! key and URL the adapter emits passes through [`sanitize`] first.
//! See <https://cloud.google.com/storage/docs/objects#naming>.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

static XML_CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{7F}-\x{84}\x{86}-\x{9F}]").expect("valid regex"));
static RESERVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\]*?#]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static BACKSLASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\+").expect("valid regex"));
static SLASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(:?)/{2,}").expect("valid regex"));

/// Switches for the optional stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    pub lowercase: bool,
    pub strip_diacritics: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_diacritics: true,
        }
    }
}

/// Normalize a key, file name or URL for the object store.
///
/// Stages run in a fixed order:
/// 1. drop XML control characters (`U+007F..=U+0084`, `U+0086..=U+009F`)
/// 2. drop `[ ] * ? #`
/// 3. collapse whitespace runs into `-`
/// 4. fold diacritics to ASCII (optional)
/// 5. lowercase (optional)
/// 6. collapse slash/backslash runs into a single `/`, keeping the `//` of a scheme
///
/// The function is total and idempotent.
pub fn sanitize(input: &str, opts: SanitizeOptions) -> String {
    let out = XML_CONTROL.replace_all(input, "");
    let out = RESERVED.replace_all(&out, "");
    let out = WHITESPACE.replace_all(&out, "-");

    let mut out = out.into_owned();
    if opts.strip_diacritics {
        out = fold_diacritics(&out);
    }
    if opts.lowercase {
        out = out.to_lowercase();
    }

    let out = BACKSLASHES.replace_all(&out, "/");
    SLASHES
        .replace_all(&out, |caps: &Captures<'_>| {
            if caps[1].is_empty() { "/" } else { "://" }
        })
        .into_owned()
}

/// Fold accented Latin letters to their ASCII base.
///
/// Canonical decomposition handles letters built from a base and a combining
/// mark; the table covers Latin-1 and Latin Extended-A letters that have no
/// decomposition (ligatures, stroked letters).
pub fn fold_diacritics(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.nfd() {
        if is_combining_mark(c) {
            continue;
        }
        match fold_letter(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

fn fold_letter(c: char) -> Option<&'static str> {
    let folded = match c {
        'Æ' => "Ae",
        'æ' => "ae",
        'Ð' | 'Đ' => "D",
        'ð' | 'đ' => "d",
        'Ø' => "O",
        'ø' => "o",
        'Þ' => "Th",
        'þ' => "th",
        'ß' => "ss",
        'ẞ' => "SS",
        'Ħ' => "H",
        'ħ' => "h",
        'ı' => "i",
        'Ĳ' => "IJ",
        'ĳ' => "ij",
        'ĸ' => "k",
        'Ŀ' | 'Ł' => "L",
        'ŀ' | 'ł' => "l",
        'ŉ' => "'n",
        'Ŋ' => "N",
        'ŋ' => "n",
        'Œ' => "Oe",
        'œ' => "oe",
        'Ŧ' => "T",
        'ŧ' => "t",
        'ſ' => "s",
        _ => return None,
    };
    Some(folded)
}
