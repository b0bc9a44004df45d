use std::sync::LazyLock;

use regex::Regex;

/// Matches a URL scheme such as `https:` or `data:`.
static URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").expect("valid regex")
});

/// Matches a template prefix that names a whole package followed by `/`.
static PACKAGE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@[^/]+/[^/]+|[^@/][^/]*)/").expect("valid regex")
});

/// What kind of target a specifier points at, before touching the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind<'a> {
    /// Absolute or protocol-relative URL.
    Url,
    /// `./x`, `../x` or `/x`.
    Local,
    /// `name`, `name/sub/path`, `@scope/name` or `@scope/name/sub/path`.
    Package {
        name: &'a str,
        subpath: Option<&'a str>,
    },
}

/// Classify a specifier.
///
/// ```
/// use autodep::resolver::{SpecifierKind, classify};
///
/// assert_eq!(classify("https://cdn.example.com/x.js"), SpecifierKind::Url);
/// assert_eq!(classify("./utils"), SpecifierKind::Local);
/// assert_eq!(
///     classify("@scope/pkg/lib/a"),
///     SpecifierKind::Package { name: "@scope/pkg", subpath: Some("lib/a") }
/// );
/// ```
pub fn classify(specifier: &str) -> SpecifierKind<'_> {
    if specifier.starts_with("//") || URL_SCHEME.is_match(specifier) {
        return SpecifierKind::Url;
    }
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        return SpecifierKind::Local;
    }
    let (name, subpath) = split_package(specifier);
    SpecifierKind::Package { name, subpath }
}

/// Package name of a bare specifier, if it is one.
pub fn package_name(specifier: &str) -> Option<&str> {
    match classify(specifier) {
        SpecifierKind::Package { name, .. } => Some(name),
        _ => None,
    }
}

/// Split `@scope/name/rest` or `name/rest` into the name and the rest.
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if specifier.starts_with('@') {
        // the scope's slash is part of the name
        specifier
            .find('/')
            .and_then(|scope_end| {
                specifier[scope_end + 1..]
                    .find('/')
                    .map(|rest| scope_end + 1 + rest)
            })
    } else {
        specifier.find('/')
    };

    match name_end {
        Some(end) => {
            let rest = &specifier[end + 1..];
            (&specifier[..end], (!rest.is_empty()).then_some(rest))
        }
        None => (specifier, None),
    }
}

/// Whether a template prefix is precise enough to name its package.
///
/// `"lodash/"` and `"@scope/pkg/locale-"` are; `"lodash"` and `"@scope/"` are
/// not, since the package boundary lies in the runtime-computed part.
pub fn is_precise_prefix(prefix: &str) -> bool {
    PACKAGE_PREFIX.is_match(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        assert_eq!(classify("http://x.com/a.js"), SpecifierKind::Url);
        assert_eq!(classify("data:text/javascript,1"), SpecifierKind::Url);
        assert_eq!(classify("//cdn.example.com/a.js"), SpecifierKind::Url);
    }

    #[test]
    fn locals() {
        assert_eq!(classify("./a"), SpecifierKind::Local);
        assert_eq!(classify("../a/b"), SpecifierKind::Local);
        assert_eq!(classify("/abs/a"), SpecifierKind::Local);
    }

    #[test]
    fn packages() {
        assert_eq!(
            classify("lodash"),
            SpecifierKind::Package {
                name: "lodash",
                subpath: None
            }
        );
        assert_eq!(
            classify("lodash/fp/map"),
            SpecifierKind::Package {
                name: "lodash",
                subpath: Some("fp/map")
            }
        );
        assert_eq!(
            classify("@ember/string"),
            SpecifierKind::Package {
                name: "@ember/string",
                subpath: None
            }
        );
        assert_eq!(package_name("@scope/pkg/x"), Some("@scope/pkg"));
        assert_eq!(package_name("./x"), None);
    }

    #[test]
    fn template_prefixes() {
        assert!(is_precise_prefix("lodash/"));
        assert!(is_precise_prefix("moment/locale/"));
        assert!(is_precise_prefix("@scope/pkg/locale-"));
        assert!(!is_precise_prefix("lodash"));
        assert!(!is_precise_prefix("@scope/"));
        assert!(!is_precise_prefix("@scope/pkg"));
    }
}
