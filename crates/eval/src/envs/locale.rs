//! Languages, countries and locales.
//!
//! Languages are ISO 639-3 codes (`eng`), countries ISO 3166-1 alpha-2 codes
//! (`US`). A locale joins them as `eng-US`. A country is meaningless without a
//! language, so such a pair collapses to the empty locale.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ValueError;

/// An ISO 639-3 language code. The empty code means "no language".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    /// Parses a three-letter lowercase code. The empty string is the nil
    /// language.
    pub fn parse(code: &str) -> Result<Language, ValueError> {
        if code.is_empty() || (code.len() == 3 && code.bytes().all(|b| b.is_ascii_lowercase())) {
            Ok(Language(code.to_string()))
        } else {
            Err(ValueError::message(format!(
                "'{}' is not a valid language code",
                code
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The ISO 639-1 two-letter code, if this language has one.
    pub fn iso639_1(&self) -> Option<&'static str> {
        iso639_1(&self.0)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ISO 3166-1 alpha-2 country code. The empty code means "no country".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Country(String);

impl Country {
    pub fn parse(code: &str) -> Result<Country, ValueError> {
        if code.is_empty() || (code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())) {
            Ok(Country(code.to_string()))
        } else {
            Err(ValueError::message(format!(
                "'{}' is not a valid country code",
                code
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A language plus optional country, written `eng` or `eng-US`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(language: &Language, country: &Country) -> Locale {
        if language.is_empty() {
            Locale::default()
        } else if country.is_empty() {
            Locale(language.0.clone())
        } else {
            Locale(format!("{}-{}", language, country))
        }
    }

    /// Parses `eng` or `eng-US`.
    pub fn parse(text: &str) -> Result<Locale, ValueError> {
        let (language, country) = match text.split_once('-') {
            Some((l, c)) => (Language::parse(l)?, Country::parse(c)?),
            None => (Language::parse(text)?, Country::default()),
        };
        Ok(Locale::new(&language, &country))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_parts(&self) -> (Language, Country) {
        match self.0.split_once('-') {
            Some((l, c)) => (Language(l.to_string()), Country(c.to_string())),
            None => (Language(self.0.clone()), Country::default()),
        }
    }

    /// Converts to a BCP 47 tag such as `en-US`.
    ///
    /// Languages without a two-letter code (including `mul`, `und`, `mis` and
    /// `zxx`) produce the empty string.
    pub fn to_bcp47(&self) -> String {
        let (language, country) = self.to_parts();
        match language.iso639_1() {
            None => String::new(),
            Some(code) if country.is_empty() => code.to_string(),
            Some(code) => format!("{}-{}", code, country),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn iso639_1(code: &str) -> Option<&'static str> {
    Some(match code {
        "abk" => "ab",
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "arg" => "an",
        "asm" => "as",
        "ava" => "av",
        "aym" => "ay",
        "aze" => "az",
        "bak" => "ba",
        "bam" => "bm",
        "bel" => "be",
        "ben" => "bn",
        "bod" => "bo",
        "bos" => "bs",
        "bre" => "br",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "che" => "ce",
        "chv" => "cv",
        "cor" => "kw",
        "cos" => "co",
        "cre" => "cr",
        "cym" => "cy",
        "dan" => "da",
        "deu" => "de",
        "div" => "dv",
        "dzo" => "dz",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "eus" => "eu",
        "ewe" => "ee",
        "fao" => "fo",
        "fas" => "fa",
        "fij" => "fj",
        "fin" => "fi",
        "fra" => "fr",
        "fry" => "fy",
        "ful" => "ff",
        "gla" => "gd",
        "gle" => "ga",
        "glg" => "gl",
        "glv" => "gv",
        "grn" => "gn",
        "guj" => "gu",
        "hat" => "ht",
        "hau" => "ha",
        "heb" => "he",
        "her" => "hz",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ibo" => "ig",
        "ido" => "io",
        "iii" => "ii",
        "iku" => "iu",
        "ile" => "ie",
        "ina" => "ia",
        "ind" => "id",
        "isl" => "is",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kal" => "kl",
        "kan" => "kn",
        "kas" => "ks",
        "kat" => "ka",
        "kaz" => "kk",
        "khm" => "km",
        "kik" => "ki",
        "kin" => "rw",
        "kir" => "ky",
        "kon" => "kg",
        "kor" => "ko",
        "kua" => "kj",
        "kur" => "ku",
        "lao" => "lo",
        "lat" => "la",
        "lav" => "lv",
        "lim" => "li",
        "lin" => "ln",
        "lit" => "lt",
        "ltz" => "lb",
        "lug" => "lg",
        "mah" => "mh",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mlg" => "mg",
        "mlt" => "mt",
        "mon" => "mn",
        "mri" => "mi",
        "msa" => "ms",
        "mya" => "my",
        "nau" => "na",
        "nav" => "nv",
        "nbl" => "nr",
        "nde" => "nd",
        "ndo" => "ng",
        "nep" => "ne",
        "nld" => "nl",
        "nno" => "nn",
        "nob" => "nb",
        "nor" => "no",
        "nya" => "ny",
        "oci" => "oc",
        "oji" => "oj",
        "ori" => "or",
        "orm" => "om",
        "oss" => "os",
        "pan" => "pa",
        "pol" => "pl",
        "por" => "pt",
        "pus" => "ps",
        "que" => "qu",
        "roh" => "rm",
        "ron" => "ro",
        "run" => "rn",
        "rus" => "ru",
        "sag" => "sg",
        "san" => "sa",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sme" => "se",
        "smo" => "sm",
        "sna" => "sn",
        "snd" => "sd",
        "som" => "so",
        "sot" => "st",
        "spa" => "es",
        "sqi" => "sq",
        "srd" => "sc",
        "srp" => "sr",
        "ssw" => "ss",
        "sun" => "su",
        "swa" => "sw",
        "swe" => "sv",
        "tah" => "ty",
        "tam" => "ta",
        "tat" => "tt",
        "tel" => "te",
        "tgk" => "tg",
        "tgl" => "tl",
        "tha" => "th",
        "tir" => "ti",
        "ton" => "to",
        "tsn" => "tn",
        "tso" => "ts",
        "tuk" => "tk",
        "tur" => "tr",
        "twi" => "tw",
        "uig" => "ug",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "ven" => "ve",
        "vie" => "vi",
        "vol" => "vo",
        "wln" => "wa",
        "wol" => "wo",
        "xho" => "xh",
        "yid" => "yi",
        "yor" => "yo",
        "zha" => "za",
        "zho" => "zh",
        "zul" => "zu",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(s: &str) -> Language {
        Language::parse(s).unwrap()
    }

    fn country(s: &str) -> Country {
        Country::parse(s).unwrap()
    }

    #[test]
    fn new_locale() {
        assert_eq!(Locale::new(&lang(""), &country("")), Locale::default());
        // a country without a language is meaningless
        assert_eq!(Locale::new(&lang(""), &country("US")), Locale::default());
        assert_eq!(Locale::new(&lang("eng"), &country("")).as_str(), "eng");
        assert_eq!(Locale::new(&lang("eng"), &country("US")).as_str(), "eng-US");
    }

    #[test]
    fn to_parts() {
        let (l, c) = Locale::parse("eng-US").unwrap().to_parts();
        assert_eq!(l, lang("eng"));
        assert_eq!(c, country("US"));

        let (l, c) = Locale::default().to_parts();
        assert!(l.is_empty());
        assert!(c.is_empty());
    }

    #[test]
    fn parse_rejects_bad_codes() {
        assert!(Language::parse("english").is_err());
        assert!(Language::parse("EN").is_err());
        assert!(Country::parse("usa").is_err());
        assert!(Locale::parse("eng-us").is_err());
    }

    #[test]
    fn to_bcp47() {
        let cases = [
            ("", ""),
            ("cat", "ca"),
            ("deu", "de"),
            ("eng", "en"),
            ("fin", "fi"),
            ("fra", "fr"),
            ("jpn", "ja"),
            ("kor", "ko"),
            ("pol", "pl"),
            ("por", "pt"),
            ("rus", "ru"),
            ("spa", "es"),
            ("swe", "sv"),
            ("zho", "zh"),
            ("eng-US", "en-US"),
            ("spa-EC", "es-EC"),
            ("zho-CN", "zh-CN"),
            ("yue", ""),
            ("und", ""),
            ("mul", ""),
            ("xyz", ""),
        ];
        for (locale, expected) in cases {
            assert_eq!(
                Locale::parse(locale).unwrap().to_bcp47(),
                expected,
                "locale {:?}",
                locale
            );
        }
    }
}
