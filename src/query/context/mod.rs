
use serde::{Deserialize, Serialize};

use crate::document::Metadata;
use crate::store::ScoredDocument;

/// One rendered line of a context block.
///
/// Keys that are missing or hold an empty value are skipped, and the line is
/// left out when none of its keys has a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextField {
    pub label: String,
    /// Metadata keys whose values are shown, joined with ", "
    pub keys: Vec<String>,
}

impl ContextField {
    #[inline]
    pub fn new(label: &str, keys: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keys: keys.iter().map(|key| (*key).to_string()).collect(),
        }
    }

    fn render(&self, metadata: &Metadata) -> Option<String> {
        let values: Vec<&str> = self
            .keys
            .iter()
            .filter_map(|key| metadata.get(key))
            .filter(|value| !value.is_empty())
            .collect();

        (!values.is_empty()).then(|| format!("- {}: {}", self.label, values.join(", ")))
    }
}

/// Which metadata keys are shown to the model, and under what labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSchema {
    /// Heading word of each block, followed by its 1-based position
    pub item_label: String,
    pub fields: Vec<ContextField>,
}

impl Default for ContextSchema {
    #[inline]
    fn default() -> Self {
        Self {
            item_label: "Filme".to_string(),
            fields: vec![
                ContextField::new("Título", &["Series_Title"]),
                ContextField::new("Ano", &["Released_Year"]),
                ContextField::new("Gênero", &["Genre"]),
                ContextField::new("Nota IMDB", &["IMDB_Rating"]),
                ContextField::new("Diretor", &["Director"]),
                ContextField::new("Elenco", &["Star1", "Star2"]),
                ContextField::new("Sinopse", &["Overview"]),
            ],
        }
    }
}

impl ContextSchema {
    /// Render the block for the document at 1-based `position`
    #[inline]
    pub fn format_document(&self, position: usize, metadata: &Metadata) -> String {
        let mut lines = vec![format!("**{} {}:**", self.item_label, position)];
        lines.extend(self.fields.iter().filter_map(|field| field.render(metadata)));
        lines.join("\n")
    }
}

/// Render retrieved documents in ranking order, one block each, separated by
/// blank lines
#[inline]
pub fn format_context(schema: &ContextSchema, results: &[ScoredDocument]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| schema.format_document(index + 1, &result.document.metadata))
        .collect::<Vec<_>>()
        .join("\n\n")
}
