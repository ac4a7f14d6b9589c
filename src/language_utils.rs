/*!
 * Language utilities for ISO language code handling.
 *
 * Detection services report ISO 639-1 codes ("en"), sometimes 639-2 codes
 * ("eng", "fre") and sometimes region-qualified tags ("zh-CN"). The router
 * relies on `same_language` to decide whether a target needs translation.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminology(&normalized_code).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Validate a language tag such as "de", "eng" or "zh-CN"
///
/// The primary subtag must be an ISO 639 code; any further subtags must be
/// 2 to 8 ASCII alphanumerics.
pub fn validate_language_tag(tag: &str) -> Result<()> {
    let mut parts = tag.trim().split(['-', '_']);
    let primary = parts.next().unwrap_or_default();
    validate_language_code(primary)?;

    for subtag in parts {
        let valid = (2..=8).contains(&subtag.len())
            && subtag.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(anyhow!("Invalid subtag '{}' in language tag: {}", subtag, tag));
        }
    }

    Ok(())
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(terminology) = bibliographic_to_terminology(&normalized_code) {
            return Ok(terminology.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Decide whether text detected as `detected` is already in `target`
///
/// Identical tags (ignoring case and `_`/`-`) always match. Plain ISO codes
/// match across their 2-letter, 3-letter and bibliographic forms. A
/// region-qualified tag only matches the identical tag, so "zh-CN" text is
/// still translated into "zh-TW".
pub fn same_language(detected: &str, target: &str) -> bool {
    let canonical = |tag: &str| tag.trim().to_lowercase().replace('_', "-");
    let detected = canonical(detected);
    let target = canonical(target);

    if detected == target {
        return true;
    }

    if detected.contains('-') || target.contains('-') {
        return false;
    }

    language_codes_match(&detected, &target)
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Human readable form of a language tag for log lines, e.g. "zh-CN (Chinese)"
///
/// Tags whose primary subtag is not a known ISO code are returned unchanged.
pub fn describe_language(tag: &str) -> String {
    let primary = tag.trim().split(['-', '_']).next().unwrap_or_default();
    match get_language_name(primary) {
        Ok(name) => format!("{} ({})", tag.trim(), name),
        Err(_) => tag.trim().to_string(),
    }
}
