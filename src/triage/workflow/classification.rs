// SPDX-License-Identifier: MIT

//! Classification types shared by the classifier node and the router

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of specialized handlers a query can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerId {
    #[serde(rename = "appointments")]
    Appointments,
    #[serde(rename = "medical-qa", alias = "question")]
    MedicalQa,
    #[serde(rename = "blog")]
    Blog,
}

impl HandlerId {
    pub const ALL: [HandlerId; 3] = [HandlerId::Appointments, HandlerId::MedicalQa, HandlerId::Blog];

    /// Node id of the handler in the attendant graph
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerId::Appointments => "appointments",
            HandlerId::MedicalQa => "medical-qa",
            HandlerId::Blog => "blog",
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appointments" => Ok(HandlerId::Appointments),
            "medical-qa" | "question" => Ok(HandlerId::MedicalQa),
            "blog" => Ok(HandlerId::Blog),
            other => Err(format!("unknown handler '{}'", other)),
        }
    }
}

/// One routing decision: which handler, and the sub-query it should answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub source: HandlerId,
    pub query: String,
}

impl Classification {
    pub fn new(source: HandlerId, query: impl Into<String>) -> Self {
        Self {
            source,
            query: query.into(),
        }
    }
}

/// Value of the `classification` state field when it is not null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationOutput {
    Single(Classification),
    Multiple(Vec<Classification>),
}

impl ClassificationOutput {
    /// Collapse a list into the narrowest representation; `None` when empty
    pub fn from_vec(mut items: Vec<Classification>) -> Option<Self> {
        match items.len() {
            0 => None,
            1 => items.pop().map(ClassificationOutput::Single),
            _ => Some(ClassificationOutput::Multiple(items)),
        }
    }

    pub fn into_vec(self) -> Vec<Classification> {
        match self {
            ClassificationOutput::Single(c) => vec![c],
            ClassificationOutput::Multiple(list) => list,
        }
    }
}

/// Shape the classifier model is asked to answer with
#[derive(Debug, Deserialize)]
pub struct ClassifierResponse {
    #[serde(default)]
    pub classification: Option<ClassificationOutput>,
}

struct KeywordRule {
    handler: HandlerId,
    keywords: &'static [&'static str],
}

const RULES: &[KeywordRule] = &[
    KeywordRule {
        handler: HandlerId::Appointments,
        keywords: &[
            "appointment", "book", "schedul", "reschedul", "cancel", "consulta", "agend",
            "marcar", "desmarcar",
        ],
    },
    KeywordRule {
        handler: HandlerId::MedicalQa,
        keywords: &[
            "symptom", "fever", "pain", "headache", "treatment", "medication", "medicine",
            "dose", "diagnos", "febre", "dor", "sintoma", "tratamento", "remédio", "remedio",
            "diagnóstico",
        ],
    },
    KeywordRule {
        handler: HandlerId::Blog,
        keywords: &[
            "ai", "blog", "article", "post", "technolog", "trend", "industry", "artigo",
            "tecnologia", "inteligência", "tendência",
        ],
    },
];

/// Keyword classifier used when the model-based classification is unavailable.
///
/// Every handler with at least one matching keyword gets the whole query as its
/// sub-query, in handler declaration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn classify(&self, query: &str) -> Option<ClassificationOutput> {
        let words: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();

        let matches = RULES
            .iter()
            .filter(|rule| {
                rule.keywords
                    .iter()
                    .any(|kw| words.iter().any(|w| keyword_matches(w, kw)))
            })
            .map(|rule| Classification::new(rule.handler, query.trim()))
            .collect();

        ClassificationOutput::from_vec(matches)
    }
}

// Short keywords must match the whole word, longer ones act as stems
fn keyword_matches(word: &str, keyword: &str) -> bool {
    if keyword.chars().count() <= 3 {
        word == keyword
    } else {
        word.starts_with(keyword)
    }
}
