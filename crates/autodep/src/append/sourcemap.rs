//! Splicing generated fragments ahead of a trailing source map comment.

use std::sync::LazyLock;

use regex::Regex;

/// A `sourceMappingURL` comment at the very end of a file, line or block
/// form. Block comments may span lines.
static TRAILING_SOURCE_MAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:/\*[#@]?[ \t]*sourceMappingURL=[^*]*\*+(?:[^/*][^*]*\*+)*/|//[#@]?[ \t]*sourceMappingURL=[^\r\n]*)\s*\z",
    )
    .expect("valid regex")
});

/// Separator between concatenated pieces of a file with this extension.
pub fn separator_for(extension: &str) -> &'static str {
    match extension {
        "js" | "mjs" | "cjs" => ";\n",
        _ => "\n",
    }
}

/// Append `fragments` to `upstream`.
///
/// When `upstream` ends with a source map comment the fragments go
/// immediately before it and the comment stays last.
pub fn splice(upstream: &str, fragments: &[String], separator: &str) -> String {
    let (head, comment) = match TRAILING_SOURCE_MAP.find(upstream) {
        Some(m) => (&upstream[..m.start()], Some(&upstream[m.start()..])),
        None => (upstream, None),
    };

    let mut out = String::with_capacity(
        upstream.len() + fragments.iter().map(|f| f.len() + separator.len()).sum::<usize>() + 1,
    );
    out.push_str(head);
    for fragment in fragments {
        out.push_str(separator);
        out.push_str(fragment);
    }
    if let Some(comment) = comment {
        out.push('\n');
        out.push_str(comment);
    }
    out
}
