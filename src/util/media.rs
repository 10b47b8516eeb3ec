//! Image URLs for post cards.
//!
//! Telegram message links (`t.me/<channel>/<id>`) are not directly loadable
//! images. Cards get a deterministic placeholder per message id instead, so
//! the same post always shows the same picture.

pub const PLACEHOLDER_IMAGE_URL: &str = "https://picsum.photos/400/200?random=1";

const PLACEHOLDER_BASE: &str = "https://picsum.photos/400/200?random=";
const PLACEHOLDER_VARIANTS: u32 = 50;
const TELEGRAM_HOST_MARKER: &str = "t.me/";

/// `(channel, message_id)` of the first `t.me/<channel>/<digits>` in `raw`.
///
/// The digit run may be followed by anything (`?single`, `/`, ...).
fn parse_telegram_link(raw: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    while let Some(pos) = raw[offset..].find(TELEGRAM_HOST_MARKER) {
        let start = offset + pos + TELEGRAM_HOST_MARKER.len();
        let rest = &raw[start..];
        if let Some((channel, tail)) = rest.split_once('/') {
            let digits_len = tail.bytes().take_while(u8::is_ascii_digit).count();
            if !channel.is_empty() && digits_len > 0 {
                return Some((channel, &tail[..digits_len]));
            }
        }
        offset = start;
    }
    None
}

/// Reduce an arbitrarily long decimal string modulo `m` without overflow.
fn decimal_mod(digits: &str, m: u32) -> u32 {
    digits
        .bytes()
        .fold(0u32, |acc, b| (acc * 10 + u32::from(b - b'0')) % m)
}

/// Image URL to display for a post.
///
/// - absent or empty: the fixed placeholder
/// - a Telegram message link: placeholder variant `message_id mod 50`
/// - anything else: returned unchanged
///
/// ```
/// use telepulse::util::resolve_image_url;
///
/// assert_eq!(
///     resolve_image_url(Some("https://t.me/durov/123")),
///     "https://picsum.photos/400/200?random=23"
/// );
/// assert_eq!(resolve_image_url(None), "https://picsum.photos/400/200?random=1");
/// ```
pub fn resolve_image_url(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return PLACEHOLDER_IMAGE_URL.to_string();
    };
    match parse_telegram_link(raw) {
        Some((_, message_id)) => format!(
            "{}{}",
            PLACEHOLDER_BASE,
            decimal_mod(message_id, PLACEHOLDER_VARIANTS)
        ),
        None => raw.to_string(),
    }
}

/// Telegram CDN form of a message link, `None` for anything else.
pub fn telegram_media_url(raw: &str) -> Option<String> {
    let (channel, message_id) = parse_telegram_link(raw)?;
    Some(format!(
        "https://cdn4.telesco.pe/file/{}/{}.jpg",
        channel, message_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_image_uses_placeholder() {
        assert_eq!(resolve_image_url(None), PLACEHOLDER_IMAGE_URL);
        assert_eq!(resolve_image_url(Some("")), PLACEHOLDER_IMAGE_URL);
    }

    #[test]
    fn test_telegram_links_map_to_variant() {
        assert_eq!(
            resolve_image_url(Some("https://t.me/channel/50")),
            "https://picsum.photos/400/200?random=0"
        );
        assert_eq!(
            resolve_image_url(Some("https://t.me/channel/149?single")),
            "https://picsum.photos/400/200?random=49"
        );
    }

    #[test]
    fn test_huge_message_id_does_not_overflow() {
        let link = format!("https://t.me/c/{}", "9".repeat(40));
        // 10^40 - 1 ≡ -1 (mod 50)
        assert_eq!(
            resolve_image_url(Some(&link)),
            "https://picsum.photos/400/200?random=49"
        );
    }

    #[test]
    fn test_other_urls_pass_through() {
        let url = "https://example.com/a.png";
        assert_eq!(resolve_image_url(Some(url)), url);
        // No message id
        assert_eq!(resolve_image_url(Some("https://t.me/channel")), "https://t.me/channel");
        assert_eq!(resolve_image_url(Some("https://t.me/channel/abc")), "https://t.me/channel/abc");
    }

    #[test]
    fn test_telegram_media_url() {
        assert_eq!(
            telegram_media_url("https://t.me/durov/42").as_deref(),
            Some("https://cdn4.telesco.pe/file/durov/42.jpg")
        );
        assert_eq!(telegram_media_url("https://example.com/x/1"), None);
    }

    #[test]
    fn test_later_occurrence_is_found() {
        assert_eq!(
            telegram_media_url("see t.me/ then https://t.me/news/7").as_deref(),
            Some("https://cdn4.telesco.pe/file/news/7.jpg")
        );
    }

    proptest! {
        #[test]
        fn prop_resolve_is_total(raw in ".*") {
            let out = resolve_image_url(Some(&raw));
            prop_assert!(!out.is_empty());
        }

        #[test]
        fn prop_variant_matches_numeric_mod(id in 0u64..u64::MAX) {
            let out = resolve_image_url(Some(&format!("https://t.me/c/{}", id)));
            prop_assert_eq!(out, format!("{}{}", PLACEHOLDER_BASE, id % 50));
        }
    }
}
