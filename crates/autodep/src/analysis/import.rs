use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::package::Package;

/// Placeholder joining template quasis into a merge key.
pub const TEMPLATE_PLACEHOLDER: &str = "${e}";

/// An import found by the parser, before it is tied to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedImport {
    Literal {
        specifier: String,
        is_dynamic: bool,
    },
    /// `import(`…${x}…`)` with at least one expression.
    Template {
        cooked_quasis: Vec<String>,
        expression_name_hints: Vec<Option<String>>,
    },
}

fn package_name<S: Serializer>(package: &Arc<Package>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&package.name)
}

/// A static import, re-export, or `import()` of a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralImport {
    pub specifier: String,
    pub is_dynamic: bool,
    /// Path with the tree's prefix, as seen by bundle policies.
    pub source_file: String,
    #[serde(serialize_with = "package_name")]
    pub package: Arc<Package>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_kind: Option<String>,
}

/// A dynamic `import()` of a template literal with substitutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateImport {
    /// Never empty; only the first is used for resolution.
    pub cooked_quasis: Vec<String>,
    /// One per substitution: the identifier's name, or `None`.
    pub expression_name_hints: Vec<Option<String>>,
    pub source_file: String,
    #[serde(serialize_with = "package_name")]
    pub package: Arc<Package>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_kind: Option<String>,
}

impl TemplateImport {
    pub fn leading_quasi(&self) -> &str {
        self.cooked_quasis.first().map(String::as_str).unwrap_or_default()
    }

    /// Two templates are the same import when every literal segment matches.
    pub fn key(&self) -> String {
        self.cooked_quasis.join(TEMPLATE_PLACEHOLDER)
    }
}

/// An import usage found in one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Import {
    Literal(LiteralImport),
    Template(TemplateImport),
}

impl Import {
    /// Attach file and package information to a parser result.
    pub fn from_parsed(
        parsed: ParsedImport,
        source_file: &str,
        package: &Arc<Package>,
        tree_kind: Option<&str>,
    ) -> Self {
        let source_file = source_file.to_string();
        let package = Arc::clone(package);
        let tree_kind = tree_kind.map(str::to_string);
        match parsed {
            ParsedImport::Literal {
                specifier,
                is_dynamic,
            } => Import::Literal(LiteralImport {
                specifier,
                is_dynamic,
                source_file,
                package,
                tree_kind,
            }),
            ParsedImport::Template {
                cooked_quasis,
                expression_name_hints,
            } => Import::Template(TemplateImport {
                cooked_quasis,
                expression_name_hints,
                source_file,
                package,
                tree_kind,
            }),
        }
    }

    pub fn source_file(&self) -> &str {
        match self {
            Import::Literal(import) => &import.source_file,
            Import::Template(import) => &import.source_file,
        }
    }

    pub fn package(&self) -> &Arc<Package> {
        match self {
            Import::Literal(import) => &import.package,
            Import::Template(import) => &import.package,
        }
    }

    pub fn tree_kind(&self) -> Option<&str> {
        match self {
            Import::Literal(import) => import.tree_kind.as_deref(),
            Import::Template(import) => import.tree_kind.as_deref(),
        }
    }
}
