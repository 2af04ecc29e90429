//! Markdown export.
//!
//! Output layout:
//!
//! ```text
//! # <title>
//! ## <document name>
//! Type: <label>
//!
//! | Name | Type | Tag | Comment |
//! | ----- | ----- | ----- | ----- |
//! | ... |
//! ```
//!
//! Constant groups use a `| Name | Value | Comment |` table instead. Each
//! document is followed by three newlines.

use std::fmt::Write;

use log::debug;

use gloss_core::document::{Document, Field};

use super::{Error, Exporter};

#[derive(Debug, Default)]
pub struct Markdown;

impl Markdown {
    pub fn new() -> Self {
        Self
    }

    fn write_document(out: &mut String, document: &Document) -> Result<(), Error> {
        writeln!(out, "## {}", document.name())?;
        if !document.underlying().is_empty() {
            write!(out, "Type: {}\n\n", document.underlying())?;
        }
        Self::write_table(out, document)?;
        out.push_str("\n\n\n");
        Ok(())
    }

    fn write_table(out: &mut String, document: &Document) -> Result<(), Error> {
        let fields = document.fields();
        if fields.is_empty() {
            return Ok(());
        }

        if document.is_constant_group() {
            out.push_str("| Name | Value | Comment |\n");
            out.push_str("| ----- | ----- | ----- |\n");
            for field in fields {
                writeln!(
                    out,
                    "| {} | {} | {} |",
                    field.name(),
                    field.value(),
                    line_breaks(field.comment())
                )?;
            }
        } else {
            out.push_str("| Name | Type | Tag | Comment |\n");
            out.push_str("| ----- | ----- | ----- | ----- |\n");
            for field in fields {
                write_member(out, field)?;
            }
        }
        Ok(())
    }
}

fn write_member(out: &mut String, field: &Field) -> Result<(), Error> {
    writeln!(
        out,
        "| {} | {} | {} | {} |",
        field.name(),
        escape_signature(field.signature()),
        field.tag(),
        line_breaks(field.comment())
    )?;
    Ok(())
}

/// Backslash-escape the characters Markdown would read as markup.
fn escape_signature(signature: &str) -> String {
    let mut escaped = String::with_capacity(signature.len());
    for c in signature.chars() {
        if matches!(c, '[' | ']' | '(' | ')' | '*' | '.') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn line_breaks(comment: &str) -> String {
    comment.replace('\n', " <br>")
}

impl Exporter for Markdown {
    fn export(&self, title: &str, documents: &[Document]) -> Result<String, Error> {
        let mut out = String::new();
        writeln!(out, "# {title}")?;
        for document in documents {
            Self::write_document(&mut out, document)?;
        }
        debug!(documents = documents.len(), bytes = out.len(); "Rendered Markdown");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(documents: &[Document]) -> String {
        Markdown::new().export("API", documents).unwrap()
    }

    #[test]
    fn test_struct_table() {
        let user = Document::new_struct(
            "User",
            vec![
                Field::member("Name", "string", r#"json:"name""#, "Display name.\n\nrequired").with_index(0),
                Field::member("Roles", "[]*auth.Role", "", "").with_index(1),
            ],
            0,
        );

        assert_eq!(
            render(&[user]),
            "# API\n\
             ## User\n\
             | Name | Type | Tag | Comment |\n\
             | ----- | ----- | ----- | ----- |\n\
             | Name | string | json:\"name\" | Display name. <br> <br>required |\n\
             | Roles | \\[\\]\\*auth\\.Role |  |  |\n\
             \n\n\n"
        );
    }

    #[test]
    fn test_constant_group_table() {
        let mut color = Document::new_constants("Color", "int", Vec::new(), 0);
        color.push_field(Field::constant("Red", "Color", "0", "warm"));
        color.push_field(Field::constant("Green", "Color", "1", ""));

        assert_eq!(
            render(&[color]),
            "# API\n\
             ## Color\n\
             Type: int\n\
             \n\
             | Name | Value | Comment |\n\
             | ----- | ----- | ----- |\n\
             | Red | 0 | warm |\n\
             | Green | 1 |  |\n\
             \n\n\n"
        );
    }

    #[test]
    fn test_named_type_without_fields() {
        let handler = Document::new_named("internal/api/Handler", "func(Request) Response", 0);
        assert_eq!(
            render(&[handler]),
            "# API\n## internal/api/Handler\nType: func(Request) Response\n\n\n\n\n"
        );
    }

    #[test]
    fn test_empty_document_list() {
        assert_eq!(render(&[]), "# API\n");
    }
}
