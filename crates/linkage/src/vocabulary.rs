//! Common-word vocabulary for stripping generic words from organization names.

use std::collections::HashSet;
use std::io::BufRead;

use log::debug;

use crate::error::LinkError;
use crate::model::RecordSet;

/// Uppercase and fold German umlauts the way standardized names are written.
pub fn fold_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    for ch in word.chars() {
        match ch {
            'Ä' | 'ä' => out.push_str("AE"),
            'Ö' | 'ö' => out.push_str("OE"),
            'Ü' | 'ü' => out.push_str("UE"),
            'ß' | 'ẞ' => out.push_str("SS"),
            c => out.extend(c.to_uppercase()),
        }
    }
    out
}

/// A read-only set of folded words.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: HashSet<String>,
}

impl Vocabulary {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| fold_word(w.as_ref().trim()))
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// One word per line; only the first whitespace-separated field counts
    /// (frequency lists carry extra columns). `#` lines are skipped.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, LinkError> {
        let mut words = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(word) = line.split_whitespace().next() {
                words.push(word.to_string());
            }
        }
        let vocab = Self::from_words(words);
        debug!("vocabulary: {} word(s)", vocab.len());
        Ok(vocab)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Drop every vocabulary word, collapse whitespace.
    pub fn clean(&self, name: &str) -> String {
        name.split_whitespace()
            .filter(|w| !self.contains(w))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl RecordSet {
    /// Write `into` as `from` with vocabulary words removed. A missing source
    /// value, or one made only of vocabulary words, leaves `into` empty.
    pub fn derive_dict_clean(
        &mut self,
        from: &str,
        into: &str,
        vocabulary: &Vocabulary,
    ) -> Result<(), LinkError> {
        self.require_columns([from])?;
        self.add_column(into);
        for record in self.records_mut() {
            let cleaned = record.get(from).map(|v| vocabulary.clean(v)).unwrap_or_default();
            record.fields.insert(into.to_string(), cleaned);
        }
        Ok(())
    }
}
