use regex::Regex;

use crate::users::IdentityMap;

/// Replacement token for sensitive spans.
pub const REDACTION_TOKEN: &str = "<redacted>";

/// Replace every match of every pattern with [`REDACTION_TOKEN`].
///
/// Patterns run in list order over the already-rewritten text, so a later
/// pattern may see (and match across) earlier redaction tokens. Overlap
/// between patterns is implementation-defined.
pub fn redact(text: &str, patterns: &[Regex]) -> String {
    let mut redacted = text.to_string();
    for pattern in patterns {
        redacted = pattern.replace_all(&redacted, REDACTION_TOKEN).into_owned();
    }
    redacted
}

/// Origin metadata appended to a migrated body or comment.
#[derive(Clone, Debug, PartialEq)]
pub struct ProvenanceRecord {
    pub creator: String,
    pub origin_url: Option<String>,
    pub created_at: Option<String>,
}

impl ProvenanceRecord {
    pub fn new(creator: &str) -> Self {
        ProvenanceRecord {
            creator: creator.to_string(),
            origin_url: None,
            created_at: None,
        }
    }

    pub fn origin_url(mut self, url: &str) -> Self {
        self.origin_url = Some(url.to_string());
        self
    }

    pub fn created_at(mut self, timestamp: &str) -> Self {
        self.created_at = Some(timestamp.to_string());
        self
    }
}

/// Append the provenance block.
///
/// Always appends; callers gate on their `add_provenance` setting and call
/// at most once per migrated unit per run. Calling twice stacks two blocks.
pub fn add_provenance(text: &str, record: &ProvenanceRecord) -> String {
    let mut block = String::from("\n\nProvenance: \n```\n");
    if let Some(origin) = &record.origin_url {
        block.push_str(&format!("Origin: {origin}\n"));
    }
    block.push_str(&format!("Creator: {}\n", record.creator));
    if let Some(created_at) = &record.created_at {
        block.push_str(&format!("Created at: {created_at}\n"));
    }
    block.push_str("```");

    format!("{text}{block}")
}

/// Substitute every source handle occurrence with its destination handle.
///
/// Substitution is literal, in map order. [`IdentityMap`] sorts its pairs
/// longest-source-first so a handle that prefixes another cannot shadow it.
pub fn remap_identities(text: &str, identities: &IdentityMap) -> String {
    let mut remapped = text.to_string();
    for (source, destination) in identities.pairs() {
        remapped = remapped.replace(source, destination);
    }
    remapped
}
