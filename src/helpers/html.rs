//! HTML helper functions

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Whether a URL may be placed in an `href`/`src` attribute.
///
/// Allows http(s), mailto, protocol-relative and relative URLs; anything with
/// another scheme (`javascript:`, `data:`, ...) is rejected.
pub fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }

    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:")
    {
        return true;
    }

    // No scheme: a colon may only appear after the first path, query or fragment delimiter
    match lower.find(':') {
        None => true,
        Some(colon) => lower[..colon].contains(['/', '?', '#']),
    }
}

/// Escape text for HTML and turn newlines into line breaks
pub fn text_to_html(s: &str) -> String {
    html_escape(s).replace('\n', "<br />")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_is_safe_url() {
        assert!(is_safe_url("https://example.com/a?b=c"));
        assert!(is_safe_url("HTTP://EXAMPLE.COM"));
        assert!(is_safe_url("mailto:me@example.com"));
        assert!(is_safe_url("/post/hello"));
        assert!(is_safe_url("//cdn.example.com/img.png"));
        assert!(is_safe_url("images/a:b.png"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("  JavaScript:alert(1)"));
        assert!(!is_safe_url("data:text/html;base64,AAAA"));
        assert!(!is_safe_url(""));
    }

    #[test]
    fn test_text_to_html() {
        assert_eq!(text_to_html("a < b\nc"), "a &lt; b<br />c");
    }
}
