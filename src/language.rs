//! Output languages offered to the user

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A language the diagnosis can be translated into and spoken in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Telugu,
    Tamil,
    Malayalam,
    Kannada,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported language '{0}' (expected one of: English, Hindi, Telugu, Tamil, Malayalam, Kannada)")]
pub struct UnknownLanguageError(pub String);

impl Language {
    /// Languages in the order they are offered in the UI
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Hindi,
        Language::Telugu,
        Language::Tamil,
        Language::Malayalam,
        Language::Kannada,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Telugu => "Telugu",
            Language::Tamil => "Tamil",
            Language::Malayalam => "Malayalam",
            Language::Kannada => "Kannada",
        }
    }

    /// Locale code used by both the translation and speech services
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Telugu => "te",
            Language::Tamil => "ta",
            Language::Malayalam => "ml",
            Language::Kannada => "kn",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Accepts either the display name (any case) or the locale code
impl FromStr for Language {
    type Err = UnknownLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| {
                lang.display_name().eq_ignore_ascii_case(wanted)
                    || lang.code().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownLanguageError(s.to_string()))
    }
}
