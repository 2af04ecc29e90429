//! Constant groups.
//!
//! Constants are grouped by type across every const block of the files
//! given, the usual way Go spells an enumeration:
//!
//! ```go
//! type Color int
//!
//! const (
//!     Red Color = iota // warm
//!     Green
//! )
//! ```
//!
//! yields one group `Color` with label `int` and fields `Red = 0`,
//! `Green = 1`.

use indexmap::IndexMap;
use log::trace;

use gloss_core::document::{Document, Field};
use gloss_parser::{PackageInfo, SourceFile};

use super::flatten::combine_comments;

/// Group the constants declared in `files` by type.
///
/// Named types are keyed by their bare name, everything else by its display
/// text (`untyped int`). Group documents are named after their key and sit
/// at index zero until placed.
pub fn extract(files: &[&SourceFile], info: &PackageInfo) -> IndexMap<String, Document> {
    let mut groups: IndexMap<String, Document> = IndexMap::new();

    for file in files {
        for block in file.const_blocks() {
            for spec in block {
                let comment = combine_comments(file, spec.doc, spec.comment);
                for name in spec.names.iter().filter(|name| !name.is_blank()) {
                    let Some(constant) = info.constant(&name.to_string()) else {
                        trace!(name = name.to_string(); "Constant without checked value");
                        continue;
                    };

                    let key = constant.ty.group_key();
                    let group = groups.entry(key.clone()).or_insert_with(|| {
                        Document::new_constants(&key, info.underlying_label(&constant.ty), Vec::new(), 0)
                    });
                    group.push_field(Field::constant(
                        name.to_string(),
                        key.as_str(),
                        constant.value.to_string(),
                        comment.clone(),
                    ));
                }
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloss_parser::{check_package, parse_file};

    fn groups(sources: &[&str]) -> IndexMap<String, Document> {
        let files: Vec<SourceFile> = sources.iter().map(|src| parse_file(src).unwrap()).collect();
        let refs: Vec<&SourceFile> = files.iter().collect();
        let info = check_package(&refs);
        extract(&refs, &info)
    }

    fn values(document: &Document) -> Vec<(&str, &str)> {
        document
            .fields()
            .iter()
            .map(|field| (field.name(), field.value()))
            .collect()
    }

    #[test]
    fn test_groups_across_blocks() {
        let groups = groups(&[r#"package p

type Color int

const (
	// Red is warm.
	Red Color = iota // first
	Green
	_
	Blue
)

const Max = 3

const Purple Color = 10
"#]);

        let color = &groups["Color"];
        assert!(color.is_constant_group());
        assert_eq!(color.underlying(), "int");
        assert_eq!(
            values(color),
            vec![("Red", "0"), ("Green", "1"), ("Blue", "3"), ("Purple", "10")]
        );
        assert_eq!(color.fields()[0].comment(), "Red is warm.\n\nfirst");
        assert_eq!(color.fields()[0].signature(), "Color");
        assert_eq!(color.fields()[3].index(), 3);

        let untyped = &groups["untyped int"];
        assert_eq!(values(untyped), vec![("Max", "3")]);
    }

    #[test]
    fn test_string_and_float_values() {
        let groups = groups(&[r#"package p

type Mode string

const (
	Read  Mode = "r"
	Write Mode = "w"
)

const Ratio = 1.5
const Name string = "gloss"
"#]);

        assert_eq!(values(&groups["Mode"]), vec![("Read", "\"r\""), ("Write", "\"w\"")]);
        assert_eq!(groups["Mode"].underlying(), "string");
        assert_eq!(values(&groups["untyped float"]), vec![("Ratio", "1.5")]);
        assert_eq!(values(&groups["string"]), vec![("Name", "\"gloss\"")]);
    }

    #[test]
    fn test_only_given_files_contribute() {
        let first = parse_file("package p\n\ntype Level uint8\n\nconst Low Level = 1\n").unwrap();
        let second = parse_file("package p\n\nconst High Level = 9\n").unwrap();
        let info = check_package(&[&first, &second]);

        let file_scope = extract(&[&first], &info);
        assert_eq!(values(&file_scope["Level"]), vec![("Low", "1")]);
        assert_eq!(file_scope["Level"].underlying(), "uint8");

        let package_scope = extract(&[&first, &second], &info);
        assert_eq!(values(&package_scope["Level"]), vec![("Low", "1"), ("High", "9")]);
    }
}
