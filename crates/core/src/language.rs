//! Supported response languages.

use serde::{Deserialize, Serialize};

/// A language the assistant can be locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Tamil,
    Bengali,
    Assamese,
    Odia,
    Telugu,
    Marathi,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::English,
        Language::Hindi,
        Language::Tamil,
        Language::Bengali,
        Language::Assamese,
        Language::Odia,
        Language::Telugu,
        Language::Marathi,
    ];

    /// English name, as used in the language-lock clause.
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
            Self::Tamil => "Tamil",
            Self::Bengali => "Bengali",
            Self::Assamese => "Assamese",
            Self::Odia => "Odia",
            Self::Telugu => "Telugu",
            Self::Marathi => "Marathi",
        }
    }

    /// Name in the language's own script.
    pub fn native_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "हिन्दी",
            Self::Tamil => "தமிழ்",
            Self::Bengali => "বাংলা",
            Self::Assamese => "অসমীয়া",
            Self::Odia => "ଓଡ଼ିଆ",
            Self::Telugu => "తెలుగు",
            Self::Marathi => "मराठी",
        }
    }

    /// ISO-639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Hindi => "hi",
            Self::Tamil => "ta",
            Self::Bengali => "bn",
            Self::Assamese => "as",
            Self::Odia => "or",
            Self::Telugu => "te",
            Self::Marathi => "mr",
        }
    }

    /// Parse a language from its English name, native name, or code.
    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Language> {
        let needle = input.trim();
        if needle.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|lang| {
            lang.name().eq_ignore_ascii_case(needle)
                || lang.code().eq_ignore_ascii_case(needle)
                || lang.native_name() == needle
        })
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unsupported language: '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_codes_and_native_script() {
        assert_eq!(Language::parse("hindi"), Some(Language::Hindi));
        assert_eq!(Language::parse(" Tamil "), Some(Language::Tamil));
        assert_eq!(Language::parse("ta"), Some(Language::Tamil));
        assert_eq!(Language::parse("हिन्दी"), Some(Language::Hindi));
        assert_eq!(Language::parse("தமிழ்"), Some(Language::Tamil));
    }

    #[test]
    fn unknown_or_empty_is_unparsed() {
        assert_eq!(Language::parse("Klingon"), None);
        assert_eq!(Language::parse("   "), None);
    }

    #[test]
    fn from_str_reports_unsupported() {
        let err = "Latin".parse::<Language>().unwrap_err();
        assert!(err.contains("Latin"));
        assert_eq!("en".parse::<Language>().unwrap(), Language::English);
    }
}
