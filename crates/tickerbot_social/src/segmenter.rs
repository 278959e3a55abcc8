//! Escaping and size-bounded splitting of outgoing text.
//!
//! Text is escaped once, as a whole, then packed line by line into chunks.
//! The first chunk may double as an image caption and is packed against the
//! caption limit; the rest use the message limit. Lengths are counted in
//! Unicode scalar values, the unit Telegram limits are expressed in.

use derive_getters::Getters;
use tickerbot_core::{MessageChunk, ParseMode};
use tickerbot_error::ConfigError;

/// Marker that escapes the following character.
pub const ESCAPE_MARKER: char = '\\';

/// Characters Telegram MarkdownV2 reserves, including the marker itself.
pub const MARKDOWN_V2_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ESCAPE_MARKER,
];

/// Characters legacy Telegram Markdown reserves.
pub const MARKDOWN_RESERVED: &[char] = &['_', '*', '`', '['];

/// Default Telegram message limit used by the bot, below the hard 4096.
pub const DEFAULT_MESSAGE_LIMIT: usize = 4000;

/// Default caption limit used by the bot, below the hard 1024.
pub const DEFAULT_CAPTION_LIMIT: usize = 1000;

/// Smallest usable limit; an escaped pair must fit in one chunk.
pub const MIN_LIMIT: usize = 2;

fn reserved(parse_mode: ParseMode) -> &'static [char] {
    match parse_mode {
        ParseMode::MarkdownV2 => MARKDOWN_V2_RESERVED,
        ParseMode::Markdown => MARKDOWN_RESERVED,
        ParseMode::Plain => &[],
    }
}

/// Escape every reserved character of `parse_mode` with [`ESCAPE_MARKER`].
///
/// # Examples
///
/// ```
/// use tickerbot_core::ParseMode;
/// use tickerbot_social::escape;
///
/// assert_eq!(escape("S&P 500 +1.2%!", ParseMode::MarkdownV2), r"S&P 500 \+1\.2%\!");
/// assert_eq!(escape("a_b", ParseMode::Plain), "a_b");
/// ```
pub fn escape(text: &str, parse_mode: ParseMode) -> String {
    let reserved = reserved(parse_mode);
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if reserved.contains(&c) {
            out.push(ESCAPE_MARKER);
        }
        out.push(c);
    }
    out
}

/// Remove escape markers added by [`escape`].
///
/// `unescape(&escape(t, mode), mode) == t` for every text and mode.
pub fn unescape(text: &str, parse_mode: ParseMode) -> String {
    units(text, reserved(parse_mode))
        .filter_map(|unit| unit.chars().last())
        .collect()
}

/// Split escaped text into indivisible units: an escaped pair or one char.
fn units<'a>(text: &'a str, reserved: &'static [char]) -> impl Iterator<Item = &'a str> + 'a {
    let mut rest = text;
    std::iter::from_fn(move || {
        let mut chars = rest.char_indices();
        let (_, first) = chars.next()?;
        let end = match chars.next() {
            Some((idx, next)) if first == ESCAPE_MARKER && reserved.contains(&next) => {
                idx + next.len_utf8()
            }
            Some((idx, _)) => idx,
            None => rest.len(),
        };
        let (unit, tail) = rest.split_at(end);
        rest = tail;
        Some(unit)
    })
}

/// Per-role size limits, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Getters)]
pub struct SegmentLimits {
    /// Limit for standalone messages
    message: usize,
    /// Limit for the first chunk when it is an image caption
    caption: usize,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE_LIMIT,
            caption: DEFAULT_CAPTION_LIMIT,
        }
    }
}

impl SegmentLimits {
    /// Creates limits.
    ///
    /// # Errors
    ///
    /// Returns an error if either limit is below [`MIN_LIMIT`].
    pub fn new(message: usize, caption: usize) -> Result<Self, ConfigError> {
        if message < MIN_LIMIT || caption < MIN_LIMIT {
            return Err(ConfigError::new(format!(
                "message and caption limits must be at least {MIN_LIMIT} (got {message} and {caption})"
            )));
        }
        Ok(Self { message, caption })
    }

    /// Limits to use when the first chunk is sent without an image.
    pub fn without_caption(self) -> Self {
        Self {
            caption: self.message,
            ..self
        }
    }

    /// Limits for a delivery with or without an image attachment.
    pub fn for_delivery(self, with_image: bool) -> Self {
        if with_image {
            self
        } else {
            self.without_caption()
        }
    }
}

/// Escapes and splits text into ordered chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Getters)]
pub struct MessageSegmenter {
    /// Size limits
    limits: SegmentLimits,
    /// Formatting syntax to escape for
    parse_mode: ParseMode,
}

impl MessageSegmenter {
    /// Creates a segmenter.
    pub fn new(limits: SegmentLimits, parse_mode: ParseMode) -> Self {
        Self { limits, parse_mode }
    }

    /// Same segmenter with different limits.
    pub fn with_limits(self, limits: SegmentLimits) -> Self {
        Self { limits, ..self }
    }

    /// Escape `text` and split it into chunks.
    ///
    /// The first chunk is at most `caption` characters, every later one at
    /// most `message`. Lines are kept whole when they fit; a longer line is
    /// cut at the limit, never between a marker and the character it
    /// escapes. A chunk that would hold only whitespace takes trailing units
    /// from the chunk before it, since Telegram rejects blank messages.
    /// Empty input yields one empty chunk.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerbot_core::ParseMode;
    /// use tickerbot_social::{MessageSegmenter, SegmentLimits};
    ///
    /// let segmenter = MessageSegmenter::new(SegmentLimits::new(10, 6).unwrap(), ParseMode::Plain);
    /// let chunks = segmenter.segment("first\nsecond\nthird");
    /// let texts: Vec<&str> = chunks.iter().map(|c| c.text().as_str()).collect();
    /// assert_eq!(texts, vec!["first\n", "second\n", "third"]);
    /// ```
    pub fn segment(&self, text: &str) -> Vec<MessageChunk> {
        let escaped = escape(text, self.parse_mode);
        let reserved = reserved(self.parse_mode);
        let mut packer = Packer::new(self.limits);

        for line in escaped.split_inclusive('\n') {
            let line_len = line.chars().count();
            if packer.fits(line_len) {
                packer.push(line, line_len);
                continue;
            }
            packer.flush();
            if packer.fits(line_len) {
                packer.push(line, line_len);
                continue;
            }
            for unit in units(line, reserved) {
                let unit_len = unit.chars().count();
                if !packer.fits(unit_len) {
                    packer.flush();
                }
                packer.push(unit, unit_len);
            }
        }

        let mut chunks = packer.finish();
        fill_blank_chunks(&mut chunks, self.limits.message, reserved);
        chunks
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Move trailing units of the previous chunk into each whitespace-only chunk
/// until it carries visible text. Runs back to front so a donor left blank is
/// repaired in turn. A chunk that cannot be repaired within the limit is kept.
fn fill_blank_chunks(
    chunks: &mut [MessageChunk],
    message_limit: usize,
    reserved: &'static [char],
) {
    for index in (1..chunks.len()).rev() {
        if !is_blank(chunks[index].text()) {
            continue;
        }
        let previous = chunks[index - 1].text().clone();
        let mut head: Vec<&str> = units(&previous, reserved).collect();
        let mut tail = chunks[index].text().clone();
        let mut tail_len = tail.chars().count();

        while is_blank(&tail) && head.len() > 1 {
            let Some(unit) = head.last().copied() else {
                break;
            };
            let unit_len = unit.chars().count();
            if tail_len + unit_len > message_limit {
                break;
            }
            tail.insert_str(0, unit);
            tail_len += unit_len;
            head.pop();
        }
        if is_blank(&tail) {
            continue;
        }

        chunks[index - 1] = MessageChunk::new(head.concat(), index == 1);
        chunks[index] = MessageChunk::new(tail, false);
    }
}

/// Segment `text` with the given limits and parse mode.
pub fn segment(text: &str, limits: SegmentLimits, parse_mode: ParseMode) -> Vec<MessageChunk> {
    MessageSegmenter::new(limits, parse_mode).segment(text)
}

struct Packer {
    limits: SegmentLimits,
    chunks: Vec<MessageChunk>,
    current: String,
    current_len: usize,
}

impl Packer {
    fn new(limits: SegmentLimits) -> Self {
        Self {
            limits,
            chunks: Vec::new(),
            current: String::new(),
            current_len: 0,
        }
    }

    fn limit(&self) -> usize {
        if self.chunks.is_empty() {
            self.limits.caption
        } else {
            self.limits.message
        }
    }

    fn fits(&self, len: usize) -> bool {
        self.current_len + len <= self.limit()
    }

    fn push(&mut self, piece: &str, len: usize) {
        self.current.push_str(piece);
        self.current_len += len;
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let is_first = self.chunks.is_empty();
        self.chunks
            .push(MessageChunk::new(std::mem::take(&mut self.current), is_first));
        self.current_len = 0;
    }

    fn finish(mut self) -> Vec<MessageChunk> {
        self.flush();
        if self.chunks.is_empty() {
            self.chunks.push(MessageChunk::new(String::new(), true));
        }
        self.chunks
    }
}
