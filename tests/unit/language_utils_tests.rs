/*!
 * Tests for language utility functions
 */

use ocrpipe::language_utils::{
    get_language_name, language_codes_match, normalize_to_part2t, same_language, validate_language_code,
    validate_language_tag, LanguageCodeType,
};

/// Test validation of language codes
#[test]
fn test_validateLanguageCode_withValidCodes_shouldReturnCorrectType() {
    assert_eq!(validate_language_code("ja").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("rus").unwrap(), LanguageCodeType::Part2T);
    assert_eq!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B);
    assert_eq!(validate_language_code(" ES ").unwrap(), LanguageCodeType::Part1);

    assert!(validate_language_code("123").is_err());
    assert!(validate_language_code("e").is_err());
}

#[test]
fn test_validateLanguageTag_withRegionTags_shouldAccept() {
    assert!(validate_language_tag("zh-CN").is_ok());
    assert!(validate_language_tag("pt_BR").is_ok());
    assert!(validate_language_tag("sr-Latn-RS").is_ok());

    assert!(validate_language_tag("zh-").is_err());
    assert!(validate_language_tag("zz-CN").is_err());
    assert!(validate_language_tag("en-c").is_err());
}

#[test]
fn test_normalizeToPart2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(normalize_to_part2t("spa").unwrap(), "spa");
}

#[test]
fn test_languageCodesMatch_acrossForms_shouldMatch() {
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("fra", "fr"));
    assert!(!language_codes_match("fr", "es"));
    assert!(!language_codes_match("fr", "zz"));
}

/// The router compares detected and target languages with `same_language`
#[test]
fn test_sameLanguage_withDetectedAndTarget_shouldDecidePassThrough() {
    assert!(same_language("en", "en"));
    assert!(same_language("en", "eng"));
    assert!(same_language("DE", "de"));
    assert!(same_language("zh-CN", "zh_cn"));

    assert!(!same_language("en", "fr"));
    assert!(!same_language("zh-CN", "zh-TW"));
    assert!(!same_language("zh", "zh-TW"));
    assert!(!same_language("und", "en"));
    assert!(!same_language("", "en"));
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("de").unwrap(), "German");
    assert!(get_language_name("zz").is_err());
}
