//! Struct member flattening.

use gloss_core::document::Field;
use gloss_parser::{
    SourceFile,
    ast::{CommentId, StructField, TypeExpr},
};

use super::format::Formatter;

/// Flatten the members of a struct into fields.
///
/// Anonymous struct members are inlined with dot-joined names
/// (`Meta.Created`). Embedded members are formatted, so their references are
/// recorded, but yield no field. Field indices follow the flattened order.
pub fn flatten(members: &[StructField], file: &SourceFile, formatter: &mut Formatter) -> Vec<Field> {
    let mut fields = Vec::new();
    flatten_into(members, None, file, formatter, &mut fields);
    fields
        .into_iter()
        .enumerate()
        .map(|(index, field)| field.with_index(index))
        .collect()
}

fn flatten_into(
    members: &[StructField],
    parent: Option<&str>,
    file: &SourceFile,
    formatter: &mut Formatter,
    fields: &mut Vec<Field>,
) {
    for member in members {
        let joined = |name: String| match parent {
            Some(parent) => format!("{parent}.{name}"),
            None => name,
        };

        if let TypeExpr::Struct(nested) = &member.ty {
            if !member.is_embedded() {
                for name in &member.names {
                    flatten_into(nested, Some(&joined(name.to_string())), file, formatter, fields);
                }
                continue;
            }
        }

        let signature = formatter.format(&member.ty);
        let tag = member.tag.as_deref().map(strip_quotes).unwrap_or_default();
        let comment = combine_comments(file, member.doc, member.comment);

        for name in &member.names {
            fields.push(Field::member(
                joined(name.to_string()),
                signature.clone(),
                tag,
                comment.clone(),
            ));
        }
    }
}

/// Leading doc comment, then a blank line, then the trailing comment.
pub fn combine_comments(file: &SourceFile, doc: Option<CommentId>, trailing: Option<CommentId>) -> String {
    let doc = doc.map(|id| file.comment_text(id)).unwrap_or_default();
    let trailing = trailing.map(|id| file.comment_text(id)).unwrap_or_default();

    match (doc.is_empty(), trailing.is_empty()) {
        (false, false) => format!("{doc}\n\n{trailing}"),
        (false, true) => doc,
        _ => trailing,
    }
}

/// Tag text without its back quotes or double quotes.
fn strip_quotes(tag: &str) -> &str {
    tag.strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .or_else(|| tag.strip_prefix('"').and_then(|t| t.strip_suffix('"')))
        .unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloss_parser::parse_file;

    fn flatten_type(src: &str, name: &str) -> (Vec<Field>, Vec<String>) {
        let file = parse_file(src).expect("source should parse");
        let spec = file.lookup_type(name).expect("type should exist");
        let TypeExpr::Struct(members) = &spec.ty else {
            panic!("{name} is not a struct");
        };
        let mut formatter = Formatter::default();
        let fields = flatten(members, &file, &mut formatter);
        let references = formatter
            .into_references()
            .iter()
            .map(ToString::to_string)
            .collect();
        (fields, references)
    }

    #[test]
    fn test_nested_struct_flattened() {
        let (fields, references) = flatten_type(
            r#"package p

type Record struct {
	ID   int
	Meta struct {
		Created time.Time
		Audit   struct {
			By User
		}
	}
}
"#,
            "Record",
        );

        let names: Vec<&str> = fields.iter().map(Field::name).collect();
        assert_eq!(names, vec!["ID", "Meta.Created", "Meta.Audit.By"]);
        assert_eq!(fields[1].signature(), "time.Time");
        assert_eq!(fields[2].index(), 2);
        assert_eq!(references, vec!["time.Time".to_string(), "User".to_string()]);
    }

    #[test]
    fn test_tags_and_comments() {
        let (fields, _) = flatten_type(
            r#"package p

type User struct {
	// Name shown in the UI.
	// Never empty.
	Name  string `json:"name" db:"name"` // indexed
	Email string "email"
	Age   int    // years
	Nick  string // TODO: drop
}
"#,
            "User",
        );

        assert_eq!(fields[0].tag(), r#"json:"name" db:"name""#);
        assert_eq!(
            fields[0].comment(),
            "Name shown in the UI.\nNever empty.\n\nindexed"
        );
        assert_eq!(fields[1].tag(), "email");
        assert_eq!(fields[2].tag(), "");
        assert_eq!(fields[2].comment(), "years");
    }

    #[test]
    fn test_multiple_names_share_type() {
        let (fields, _) = flatten_type("package p\n\ntype Point struct {\n\tX, Y float64\n}\n", "Point");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name(), "X");
        assert_eq!(fields[1].name(), "Y");
        assert_eq!(fields[1].signature(), "float64");
        assert_eq!(fields[1].index(), 1);
    }

    #[test]
    fn test_embedded_member_dropped_but_referenced() {
        let (fields, references) = flatten_type(
            "package p\n\ntype Admin struct {\n\tUser\n\t*shared.Audit\n\tLevel int\n}\n",
            "Admin",
        );
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name(), "Level");
        assert_eq!(references, vec!["User".to_string(), "shared.Audit".to_string()]);
    }
}
