//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hello") // -> "/blog/post/hello"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Route of a post detail page, relative to the site root
pub fn post_route(slug: &str) -> String {
    format!("/post/{}", utf8_percent_encode(slug, SEGMENT))
}

/// Route of the static post list showing `pages` pages
pub fn home_page_route(pages: usize) -> String {
    if pages <= 1 {
        "/".to_string()
    } else {
        format!("/page/{}/", pages)
    }
}

/// Route of the page-data endpoint of a post
pub fn post_data_route(slug: &str) -> String {
    format!("/_data/post/{}", utf8_percent_encode(slug, SEGMENT))
}

/// Whether a slug can be used as a directory name under `public/post/`
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && !slug.contains(['/', '\\'])
        && !slug.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_with_root() {
        let config = SiteConfig {
            root: "/blog/".to_string(),
            ..Default::default()
        };
        assert_eq!(url_for(&config, "/post/a"), "/blog/post/a");
        assert_eq!(url_for(&config, ""), "/blog/");
    }

    #[test]
    fn test_post_route_encodes_segment() {
        assert_eq!(post_route("hello-world"), "/post/hello-world");
        assert_eq!(post_route("a b?c"), "/post/a%20b%3Fc");
        assert_eq!(post_data_route("x"), "/_data/post/x");
    }

    #[test]
    fn test_home_page_route() {
        assert_eq!(home_page_route(0), "/");
        assert_eq!(home_page_route(1), "/");
        assert_eq!(home_page_route(3), "/page/3/");
    }

    #[test]
    fn test_is_safe_slug() {
        assert!(is_safe_slug("como-utilizar-hooks"));
        assert!(!is_safe_slug(""));
        assert!(!is_safe_slug(".."));
        assert!(!is_safe_slug("a/b"));
        assert!(!is_safe_slug("a\\b"));
    }
}
