//! Question catalog
//!
//! The catalog is read once at startup and never mutated. Every routing
//! operation borrows from it.

use crate::error::{RouterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDefinition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub question_template: String,
    pub agent: String,
    pub backend_question_id: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default)]
    pub followups: Vec<String>,
    #[serde(default)]
    pub followup_label: Option<String>,
}

impl QuestionDefinition {
    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Text the question matcher scores user messages against
    pub fn search_text(&self) -> String {
        format!("{} {}", self.label, self.question_template)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(default)]
    pub subtype: ParamSubtype,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub api: Option<ApiBinding>,
    #[serde(default)]
    pub multiple: bool,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, subtype: ParamSubtype) -> Self {
        Self {
            name: name.into(),
            subtype,
            ..Self::default()
        }
    }

    pub fn is_remote(&self) -> bool {
        self.subtype == ParamSubtype::Remote
    }
}

/// How a parameter's valid values are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSubtype {
    /// Values come from a fixed option list
    Static,
    /// Values must be fetched from a lookup endpoint
    Remote,
    /// Free text or fixed-pattern identifiers
    #[default]
    #[serde(other)]
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
}

/// Ties a parameter to the request body of its lookup endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiBinding {
    #[serde(default)]
    pub params: BTreeMap<String, FieldBinding>,
    /// Mapping expression applied to lookup results, e.g.
    /// `{'label': $.OUTCOME_SUMMARY, 'value': $.OUTCOME_ID}`
    #[serde(default)]
    pub transform: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBinding {
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub transform: Option<String>,
}

impl FieldBinding {
    pub fn wants_array(&self) -> bool {
        self.transform.as_deref() == Some("to-array")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Followup {
    pub id: String,
    pub label: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<QuestionDefinition>),
    Wrapped {
        #[serde(alias = "data")]
        questions: Vec<QuestionDefinition>,
    },
}

/// Immutable, ordered set of question definitions.
#[derive(Debug, Clone)]
pub struct Catalog {
    questions: Vec<QuestionDefinition>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RouterError::Catalog(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(
            "Loaded {} catalog questions from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)
            .map_err(|e| RouterError::Catalog(format!("Malformed catalog: {}", e)))?;
        let questions = match file {
            CatalogFile::List(questions) => questions,
            CatalogFile::Wrapped { questions } => questions,
        };
        Self::new(questions)
    }

    pub fn new(questions: Vec<QuestionDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(questions.len());
        for (pos, q) in questions.iter().enumerate() {
            if index.insert(q.id.clone(), pos).is_some() {
                return Err(RouterError::Catalog(format!(
                    "Duplicate question id '{}'",
                    q.id
                )));
            }
        }
        Ok(Self { questions, index })
    }

    pub fn questions(&self) -> &[QuestionDefinition] {
        &self.questions
    }

    pub fn get(&self, id: &str) -> Option<&QuestionDefinition> {
        self.index.get(id).map(|&pos| &self.questions[pos])
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Follow-up suggestions declared by `question`, in declaration order.
    /// Ids missing from the catalog are skipped.
    pub fn followups(&self, question: &QuestionDefinition) -> Vec<Followup> {
        question
            .followups
            .iter()
            .filter_map(|id| {
                self.get(id).map(|fq| Followup {
                    id: id.clone(),
                    label: fq
                        .followup_label
                        .clone()
                        .filter(|l| !l.is_empty())
                        .unwrap_or_else(|| fq.label.clone()),
                })
            })
            .collect()
    }
}
