//! Model code tables: maps the short codes stored on runs to readable names.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Embedding,
    Enrichment,
    Tester,
}

pub const EMBEDDING_MODELS: &[(&str, &str)] = &[
    ("gem004", "Google text-embedding-004"),
    ("oai3l", "OpenAI text-embedding-3-large"),
    ("oai3s", "OpenAI text-embedding-3-small"),
    ("voy3", "Voyage AI 3"),
    ("voy35", "Voyage AI 3.5"),
    ("unknown", "Unknown Embedding Model"),
];

pub const ENRICHMENT_MODELS: &[(&str, &str)] = &[
    ("g25f", "Gemini 2.5 Flash"),
    ("g25fl", "Gemini 2.5 Flash Lite"),
    ("g25p", "Gemini 2.5 Pro"),
    ("gpt5n", "GPT-5 Nano"),
    ("gpt4m", "GPT-4o Mini"),
    ("gpt4o", "GPT-4o"),
    ("none", "No Enrichment"),
    ("", "No Enrichment"),
];

pub const TESTER_MODELS: &[(&str, &str)] = &[
    ("gpt4o", "GPT-4o"),
    ("gpt4m", "GPT-4o Mini"),
    ("g25f", "Gemini 2.5 Flash"),
    ("unknown", "Unknown Tester Model"),
];

/// Embedding codes with their bare model name and provider, for the appendix.
pub const EMBEDDING_PROVIDERS: &[(&str, &str, &str)] = &[
    ("gem004", "text-embedding-004", "Google"),
    ("oai3l", "text-embedding-3-large", "OpenAI"),
    ("oai3s", "text-embedding-3-small", "OpenAI"),
    ("voy3", "Voyage AI 3", "Voyage"),
    ("voy35", "Voyage AI 3.5", "Voyage"),
];

impl ModelKind {
    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ModelKind::Embedding => EMBEDDING_MODELS,
            ModelKind::Enrichment => ENRICHMENT_MODELS,
            ModelKind::Tester => TESTER_MODELS,
        }
    }

    /// Codes listed in the appendix (sentinel codes left out).
    pub fn documented_codes(self) -> Vec<(&'static str, &'static str)> {
        self.table()
            .iter()
            .filter(|(code, _)| !code.is_empty() && *code != "unknown")
            .copied()
            .collect()
    }
}

/// Readable name for a model code; unknown codes are returned unchanged.
pub fn readable_name(code: &str, kind: ModelKind) -> &str {
    kind.table()
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Compact embedding name for summary tables (at most 15 chars).
pub fn short_embedding_name(code: &str) -> String {
    let name = readable_name(code, ModelKind::Embedding)
        .replace("text-embedding-", "")
        .replace("OpenAI ", "OAI ")
        .replace("Google ", "");
    truncate_chars(&name, 15)
}

/// Compact enrichment name for summary tables (at most 12 chars).
pub fn short_enrichment_name(code: &str) -> String {
    let name = readable_name(code, ModelKind::Enrichment)
        .replace("Gemini ", "G")
        .replace("GPT-", "G");
    truncate_chars(&name, 12)
}

/// Truncate on char boundaries; run and query names are user text.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(readable_name("oai3l", ModelKind::Embedding), "OpenAI text-embedding-3-large");
        assert_eq!(readable_name("g25f", ModelKind::Enrichment), "Gemini 2.5 Flash");
        assert_eq!(readable_name("", ModelKind::Enrichment), "No Enrichment");
        assert_eq!(readable_name("gpt4m", ModelKind::Tester), "GPT-4o Mini");
    }

    #[test]
    fn unknown_codes_pass_through() {
        assert_eq!(readable_name("cohere3", ModelKind::Embedding), "cohere3");
        assert_eq!(readable_name("voy3", ModelKind::Tester), "voy3");
    }

    #[test]
    fn short_names() {
        assert_eq!(short_embedding_name("oai3l"), "OAI 3-large");
        assert_eq!(short_embedding_name("gem004"), "004");
        assert_eq!(short_enrichment_name("g25fl"), "G2.5 Flash L");
        assert_eq!(short_enrichment_name("gpt4m"), "G4o Mini");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("żółta lampa", 4), "żółt");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn documented_codes_skip_sentinels() {
        let codes = ModelKind::Enrichment.documented_codes();
        assert_eq!(codes.len(), 7);
        assert!(codes.iter().all(|(code, _)| !code.is_empty()));
        assert!(ModelKind::Tester
            .documented_codes()
            .iter()
            .all(|(code, _)| *code != "unknown"));
    }
}
