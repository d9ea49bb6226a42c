//! Splitting of long replies into Telegram-sized messages.

/// Telegram rejects text messages longer than this many characters.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Split `text` into consecutive chunks of at most `max_chars` characters.
///
/// Chunks are cut at fixed offsets, never inside a character, and their
/// concatenation is exactly `text`. Empty input yields no chunks.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::with_capacity(text.len() / max_chars + 1);
    let mut current = String::new();
    let mut count = 0;

    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Length as Telegram measures it.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split a reply into messages Telegram will accept.
///
/// Same cuts as [`split_message`] at the Telegram limit, except that a chunk whose
/// UTF-16 length is still over the limit (emoji and other astral characters count
/// twice) is cut again. For text without astral characters the two are identical.
pub fn split_for_telegram(text: &str) -> Vec<String> {
    split_message(text, TELEGRAM_MAX_MESSAGE_LEN)
        .into_iter()
        .flat_map(|chunk| {
            if utf16_len(&chunk) <= TELEGRAM_MAX_MESSAGE_LEN {
                vec![chunk]
            } else {
                split_utf16(&chunk, TELEGRAM_MAX_MESSAGE_LEN)
            }
        })
        .collect()
}

fn split_utf16(text: &str, max_units: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut units = 0;

    for c in text.chars() {
        if units + c.len_utf16() > max_units {
            chunks.push(std::mem::take(&mut current));
            units = 0;
        }
        current.push(c);
        units += c.len_utf16();
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
