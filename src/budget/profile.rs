//! Provider profiles for token estimation and truncation.
//!
//! Each provider family maps to one tokenizer model used when the configured
//! model is unknown to the tokenizer tables, and to a pair of
//! characters-per-token ratios used when text has to be cut by length.

use std::ops::RangeInclusive;

/// Token-estimation parameters for one provider family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderProfile {
    /// Provider identifier as passed on the command line (lowercase).
    pub name: &'static str,
    /// Model whose tokenizer approximates this provider's tokenizer.
    pub tokenizer_model: &'static str,
    /// Characters per token for Latin-script text.
    pub latin_chars_per_token: f64,
    /// Characters per token for CJK text.
    pub cjk_chars_per_token: f64,
}

const PROFILES: &[ProviderProfile] = &[
    ProviderProfile {
        name: "openai",
        tokenizer_model: "gpt-4o",
        latin_chars_per_token: 4.0,
        cjk_chars_per_token: 1.0,
    },
    ProviderProfile {
        name: "openrouter",
        tokenizer_model: "gpt-4o",
        latin_chars_per_token: 3.8,
        cjk_chars_per_token: 1.0,
    },
    ProviderProfile {
        name: "gemini",
        tokenizer_model: "gpt-4o",
        latin_chars_per_token: 4.0,
        cjk_chars_per_token: 1.5,
    },
    ProviderProfile {
        name: "nvidia",
        tokenizer_model: "gpt-4",
        latin_chars_per_token: 3.5,
        cjk_chars_per_token: 0.9,
    },
    ProviderProfile {
        name: "ollama",
        tokenizer_model: "gpt-4",
        latin_chars_per_token: 3.5,
        cjk_chars_per_token: 0.9,
    },
];

/// Profile used for provider identifiers not in the table.
pub const DEFAULT_PROFILE: ProviderProfile = ProviderProfile {
    name: "default",
    tokenizer_model: "gpt-4",
    latin_chars_per_token: 3.5,
    cjk_chars_per_token: 1.2,
};

/// Unicode blocks counted as wide CJK script.
const CJK_RANGES: &[RangeInclusive<u32>] = &[
    0x1100..=0x11FF,   // Hangul Jamo
    0x2E80..=0x2FDF,   // CJK radicals
    0x3000..=0x303F,   // CJK symbols and punctuation
    0x3040..=0x30FF,   // Hiragana, Katakana
    0x3100..=0x31FF,   // Bopomofo, Hangul compatibility jamo, Katakana ext
    0x3400..=0x4DBF,   // CJK extension A
    0x4E00..=0x9FFF,   // CJK unified ideographs
    0xAC00..=0xD7AF,   // Hangul syllables
    0xF900..=0xFAFF,   // CJK compatibility ideographs
    0xFF00..=0xFFEF,   // Halfwidth and fullwidth forms
    0x20000..=0x2FA1F, // CJK extensions B-F, compatibility supplement
];

/// Look up the profile for a provider identifier.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
/// Unknown identifiers get [`DEFAULT_PROFILE`].
pub fn profile_for(provider: &str) -> &'static ProviderProfile {
    let provider = provider.trim();
    PROFILES
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(provider))
        .unwrap_or(&DEFAULT_PROFILE)
}

impl ProviderProfile {
    /// Characters-per-token ratio for this text.
    ///
    /// Blends the Latin and CJK ratios by the share of CJK characters, so
    /// mostly-Latin text gets the higher ratio and mostly-CJK text the lower.
    pub fn chars_per_token(&self, text: &str) -> f64 {
        let fraction = cjk_fraction(text);
        self.latin_chars_per_token * (1.0 - fraction) + self.cjk_chars_per_token * fraction
    }
}

/// Whether a character falls in one of the CJK blocks.
pub fn is_cjk(c: char) -> bool {
    let code = c as u32;
    CJK_RANGES.iter().any(|range| range.contains(&code))
}

/// Share of non-whitespace characters that are CJK, in `[0, 1]`.
pub fn cjk_fraction(text: &str) -> f64 {
    let mut total = 0usize;
    let mut cjk = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if is_cjk(c) {
            cjk += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        cjk as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_providers_resolve_to_their_profile() {
        for name in ["openai", "openrouter", "gemini", "nvidia", "ollama"] {
            assert_eq!(profile_for(name).name, name);
        }
    }

    #[test]
    fn test_provider_lookup_is_case_insensitive() {
        assert_eq!(profile_for("Gemini").name, "gemini");
        assert_eq!(profile_for("  OPENAI ").name, "openai");
    }

    #[test]
    fn test_unknown_provider_uses_default() {
        assert_eq!(profile_for("unknown-provider"), &DEFAULT_PROFILE);
        assert_eq!(profile_for(""), &DEFAULT_PROFILE);
    }

    #[test]
    fn test_every_profile_has_lower_cjk_ratio() {
        for profile in PROFILES.iter().chain(std::iter::once(&DEFAULT_PROFILE)) {
            assert!(profile.cjk_chars_per_token < profile.latin_chars_per_token);
            assert!(profile.cjk_chars_per_token > 0.0);
        }
    }

    #[test]
    fn test_cjk_fraction() {
        assert_eq!(cjk_fraction(""), 0.0);
        assert_eq!(cjk_fraction("fn main() {}"), 0.0);
        assert_eq!(cjk_fraction("修复登录问题"), 1.0);
        assert_eq!(cjk_fraction("ab 修复"), 0.5);
        assert_eq!(cjk_fraction("ログイン"), 1.0);
        assert_eq!(cjk_fraction("한국어"), 1.0);
    }

    #[test]
    fn test_chars_per_token_follows_script() {
        let profile = profile_for("gemini");
        assert_eq!(profile.chars_per_token("plain english text"), 4.0);
        assert_eq!(profile.chars_per_token("中文文本"), 1.5);

        let mixed = profile.chars_per_token("ab中文");
        assert!(mixed < 4.0 && mixed > 1.5);
    }
}
