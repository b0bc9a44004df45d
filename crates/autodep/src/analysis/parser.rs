//! Import extraction from JavaScript and TypeScript sources.
//!
//! The default [`OxcModuleParser`] parses with `oxc_parser` and walks the AST
//! with an `oxc_ast_visit::Visit` implementation that records:
//!
//! - `import … from "x"` and `import "x"` as static imports
//! - `export … from "x"` and `export * from "x"` as static imports
//! - `import("x")` and `` import(`x`) `` as dynamic imports
//! - `` import(`x/${y}`) `` as template imports
//!
//! Type-only imports and re-exports are skipped since they never reach the
//! bundle.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration, ImportExpression,
    TemplateLiteral,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser, ParserReturn};
use oxc_span::SourceType;

use super::import::ParsedImport;

/// Errors raised while extracting imports from one file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error in '{path}': {message}")]
    Syntax { path: String, message: String },

    #[error("Cannot read '{path}' as source: {reason}")]
    InvalidSource { path: String, reason: String },

    #[error(
        "Unsupported import() in '{path}': the argument must be a string or template literal, found {found}"
    )]
    AmbiguousDynamicImport { path: String, found: String },

    #[error("Unsupported import() in '{path}': import() takes exactly one argument")]
    DynamicImportArity { path: String },
}

impl ParseError {
    /// Syntax errors are recoverable: the file contributes no imports.
    pub fn is_syntax(&self) -> bool {
        matches!(self, ParseError::Syntax { .. })
    }
}

/// Extracts imports from a source file.
pub trait ModuleParser: Send + Sync + std::fmt::Debug {
    /// `path` is used for error messages and to pick the source type.
    fn parse(&self, path: &str, source: &str) -> Result<Vec<ParsedImport>, ParseError>;
}

/// [`ModuleParser`] backed by `oxc_parser`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OxcModuleParser;

impl OxcModuleParser {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleParser for OxcModuleParser {
    fn parse(&self, path: &str, source: &str) -> Result<Vec<ParsedImport>, ParseError> {
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::mjs());

        let ParserReturn {
            program,
            errors,
            panicked,
            ..
        } = Parser::new(&allocator, source, source_type).parse();

        if panicked || !errors.is_empty() {
            let message = errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "parser aborted".to_string());
            return Err(ParseError::Syntax {
                path: path.to_string(),
                message,
            });
        }

        let mut collector = ImportCollector {
            path,
            imports: Vec::new(),
            error: None,
        };
        collector.visit_program(&program);

        match collector.error {
            Some(error) => Err(error),
            None => Ok(collector.imports),
        }
    }
}

struct ImportCollector<'p> {
    path: &'p str,
    imports: Vec<ParsedImport>,
    /// First fatal problem; later ones are not reported.
    error: Option<ParseError>,
}

impl ImportCollector<'_> {
    fn push_static(&mut self, specifier: &str) {
        self.imports.push(ParsedImport::Literal {
            specifier: specifier.to_string(),
            is_dynamic: false,
        });
    }

    fn fail(&mut self, error: ParseError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push_template(&mut self, template: &TemplateLiteral<'_>) {
        let cooked = |i: usize| {
            template.quasis.get(i).map(|quasi| {
                quasi
                    .value
                    .cooked
                    .as_ref()
                    .unwrap_or(&quasi.value.raw)
                    .to_string()
            })
        };

        if template.expressions.is_empty() {
            self.imports.push(ParsedImport::Literal {
                specifier: cooked(0).unwrap_or_default(),
                is_dynamic: true,
            });
            return;
        }

        let cooked_quasis = (0..template.quasis.len()).filter_map(cooked).collect();
        let expression_name_hints = template
            .expressions
            .iter()
            .map(|expression| match expression {
                Expression::Identifier(ident) => Some(ident.name.to_string()),
                _ => None,
            })
            .collect();

        self.imports.push(ParsedImport::Template {
            cooked_quasis,
            expression_name_hints,
        });
    }
}

fn describe(expression: &Expression<'_>) -> String {
    match expression {
        Expression::Identifier(ident) => format!("identifier '{}'", ident.name),
        Expression::CallExpression(_) => "a call expression".to_string(),
        Expression::BinaryExpression(_) => "a binary expression".to_string(),
        Expression::StaticMemberExpression(_) | Expression::ComputedMemberExpression(_) => {
            "a member expression".to_string()
        }
        _ => "a non-literal expression".to_string(),
    }
}

impl<'a> Visit<'a> for ImportCollector<'_> {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        if !decl.import_kind.is_type() {
            self.push_static(decl.source.value.as_str());
        }
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = decl.source.as_ref().filter(|_| !decl.export_kind.is_type()) {
            self.push_static(source.value.as_str());
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        if !decl.export_kind.is_type() {
            self.push_static(decl.source.value.as_str());
        }
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if expr.options.is_some() {
            self.fail(ParseError::DynamicImportArity {
                path: self.path.to_string(),
            });
            return;
        }

        match &expr.source {
            Expression::StringLiteral(literal) => self.imports.push(ParsedImport::Literal {
                specifier: literal.value.to_string(),
                is_dynamic: true,
            }),
            Expression::TemplateLiteral(template) => {
                self.push_template(template);
                walk::walk_import_expression(self, expr);
            }
            other => {
                let found = describe(other);
                self.fail(ParseError::AmbiguousDynamicImport {
                    path: self.path.to_string(),
                    found,
                });
            }
        }
    }
}
