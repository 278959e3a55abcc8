//! Text extraction from reply envelopes.

use tickerbot_core::ResponseEnvelope;

/// Collect the text of a reply.
///
/// Every non-blank text part, across all candidates in order, is joined with
/// a newline. A single part is returned unchanged. Returns `None` when the
/// envelope carries no usable text at any level.
///
/// # Examples
///
/// ```
/// use tickerbot_core::ResponseEnvelope;
/// use tickerbot_models::extract_text;
///
/// let envelope = ResponseEnvelope::from_texts(["Stocks rose.", "  ", "Bonds fell."]);
/// assert_eq!(extract_text(&envelope).as_deref(), Some("Stocks rose.\nBonds fell."));
///
/// assert_eq!(extract_text(&ResponseEnvelope::default()), None);
/// ```
pub fn extract_text(envelope: &ResponseEnvelope) -> Option<String> {
    let fragments: Vec<&str> = envelope
        .candidates
        .iter()
        .flatten()
        .filter_map(|candidate| candidate.content.as_ref())
        .filter_map(|content| content.parts.as_ref())
        .flatten()
        .filter_map(|part| part.text.as_deref())
        .filter(|text| !text.trim().is_empty())
        .collect();

    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join("\n"))
    }
}
