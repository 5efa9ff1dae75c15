//! Derived parameter planning.
//!
//! Derived parameters configure a stage from a measured property of a
//! sibling artifact (e.g. how many images a narration of a given
//! duration needs). They are computed fresh on every invocation and
//! never cached, so a regenerated upstream artifact changes the derived
//! value on the next run without an explicit invalidation step.

use crate::errors::ConfigurationError;

/// Computes how many items a reference measure requires at a given
/// per-item measure: `ceil(reference / unit)`, never less than 1.
///
/// Both measures must be positive and finite; a zero-length reference
/// (e.g. zero-duration audio) is a configuration failure, detected
/// before any external collaborator is invoked.
pub fn plan_item_count(reference_measure: f64, unit_measure: f64) -> Result<usize, ConfigurationError> {
    if !unit_measure.is_finite() || unit_measure <= 0.0 {
        return Err(ConfigurationError::new(format!(
            "unit measure must be positive, got {unit_measure}"
        )));
    }
    if !reference_measure.is_finite() || reference_measure <= 0.0 {
        return Err(ConfigurationError::new(format!(
            "reference measure must be positive, got {reference_measure}"
        )));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = (reference_measure / unit_measure).ceil() as usize;
    Ok(count.max(1))
}

/// Splits `text` into exactly `item_count` contiguous segments cut at
/// word boundaries, balanced by word count.
///
/// Segments are substrings of the input: inter-word whitespace stays
/// attached to the preceding segment (leading whitespace to the first),
/// so concatenating the segments reproduces the input exactly. The
/// partition is deterministic for identical input and count.
///
/// If `item_count` exceeds the number of words, the partition degrades
/// to one word per segment; empty segments are never produced. An input
/// with no words yields an empty partition.
#[must_use]
pub fn plan_partition(text: &str, item_count: usize) -> Vec<&str> {
    let word_starts = word_start_offsets(text);
    if word_starts.is_empty() || item_count == 0 {
        return Vec::new();
    }

    let segments = item_count.min(word_starts.len());
    let base = word_starts.len() / segments;
    let remainder = word_starts.len() % segments;

    let mut cuts = Vec::with_capacity(segments);
    let mut word_index = 0;
    for segment in 0..segments {
        let words_here = base + usize::from(segment < remainder);
        cuts.push(word_index);
        word_index += words_here;
    }

    let mut parts = Vec::with_capacity(segments);
    for (i, &cut) in cuts.iter().enumerate() {
        let start = if i == 0 { 0 } else { word_starts[cut] };
        let end = cuts.get(i + 1).map_or(text.len(), |&next| word_starts[next]);
        parts.push(&text[start..end]);
    }
    parts
}

/// Byte offsets at which words start.
fn word_start_offsets(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(offset);
            in_word = true;
        }
    }
    starts
}
