//! JSON export.

use serde::Serialize;

use gloss_core::document::Document;

use super::{Error, Exporter};

/// Top-level JSON object.
#[derive(Serialize)]
struct Output<'a> {
    title: &'a str,
    documents: &'a [Document],
}

/// Pretty-printed `{ "title": ..., "documents": [...] }`.
#[derive(Debug, Default)]
pub struct Json;

impl Json {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for Json {
    fn export(&self, title: &str, documents: &[Document]) -> Result<String, Error> {
        let mut out = serde_json::to_string_pretty(&Output { title, documents })?;
        out.push('\n');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloss_core::document::Field;
    use serde_json::{Value, json};

    #[test]
    fn test_json_shape() {
        let mut level = Document::new_constants("models/Level", "uint8", Vec::new(), 1);
        level.push_field(Field::constant("Low", "Level", "1", "lowest"));
        let documents = vec![
            Document::new_struct("Task", vec![Field::member("Level", "models.Level", "", "")], 0),
            level,
        ];

        let out = Json::new().export("Task", &documents).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["title"], "Task");
        assert_eq!(value["documents"][0]["kind"], "struct");
        assert_eq!(value["documents"][0]["type"], "");
        assert_eq!(value["documents"][0]["fields"][0]["type"], "models.Level");
        assert_eq!(
            value["documents"][1],
            json!({
                "name": "models/Level",
                "kind": "constants",
                "type": "uint8",
                "fields": [{
                    "name": "Low",
                    "type": "Level",
                    "tag": "",
                    "comment": "lowest",
                    "value": "1",
                    "index": 0
                }],
                "index": 1
            })
        );
        assert!(out.ends_with("}\n"));
    }
}
