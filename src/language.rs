use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target translation language. Fixed set matching what the translation
/// backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    Fr,
    De,
    It,
    Pt,
    Ja,
    Ko,
    Zh,
}

impl Language {
    /// Wire code sent as the `target_language` form field.
    pub fn code(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Zh => "zh",
        }
    }

    /// Human-readable name for display.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
            Language::Zh => "Chinese",
        }
    }

    pub fn all() -> &'static [Language] {
        &[
            Language::Es,
            Language::Fr,
            Language::De,
            Language::It,
            Language::Pt,
            Language::Ja,
            Language::Ko,
            Language::Zh,
        ]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::all()
            .iter()
            .find(|l| l.code() == s.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| format!("unsupported target language: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_code() {
        for &lang in Language::all() {
            assert_eq!(lang.code().parse::<Language>().unwrap(), lang);
        }
    }

    #[test]
    fn rejects_unknown_code() {
        assert!("en".parse::<Language>().is_err());
        assert!("".parse::<Language>().is_err());
    }

    #[test]
    fn serde_round_trip_uses_wire_codes() {
        let json = serde_json::to_string(&Language::Ja).unwrap();
        assert_eq!(json, "\"ja\"");
        let back: Language = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Language::Ja);
    }
}
