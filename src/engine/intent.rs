//! Keyword intent classifier.
//!
//! An explicit ordered rule list evaluated in a fixed sequence, first
//! match wins. The ordering is load-bearing: a message containing both a
//! greeting token and a brand token is a greeting, a price phrase beats a
//! product mention, and so on. Matching is lower-cased substring
//! containment throughout.

use crate::catalog::Product;

/// The classified purpose of a user utterance. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    SpecsRequest,
    PriceRequest,
    /// A specific product was mentioned and the catalog has it.
    ProductAvailable,
    /// A specific product was mentioned but the catalog does not have it.
    ProductUnavailable,
    GeneralInterest,
    Fallback,
}

/// One classification rule.
enum Rule {
    /// Any token present → this intent.
    Keywords {
        intent: Intent,
        tokens: &'static [&'static str],
    },
    /// Any brand/model token present → resolve against the catalog.
    ProductMention { tokens: &'static [&'static str] },
}

const GREETING_TOKENS: &[&str] = &[
    "oi", "olá", "ola", "bom dia", "boa tarde", "boa noite", "hey", "e ai",
];

const SPEC_TOKENS: &[&str] = &[
    "especificacao",
    "caracteristica",
    "camera",
    "bateria",
    "tela",
    "memoria",
    "processador",
    "ficha tecnica",
];

const PRICE_TOKENS: &[&str] = &[
    "quanto custa",
    "qual o preço",
    "quanto é",
    "valor do",
    "preço do",
    "quanto ta",
];

const BRAND_MODEL_TOKENS: &[&str] = &[
    "iphone", "samsung", "galaxy", "xiaomi", "redmi", "motorola", "moto", "poco", "realme",
    "s24", "s23", "s22", "note", "a54", "a34",
];

const INTEREST_TOKENS: &[&str] = &[
    "produto",
    "celular",
    "smartphone",
    "telefone",
    "o que tem",
    "tem o que",
    "quero ver",
];

/// Ordered keyword classifier.
pub struct IntentClassifier {
    rules: Vec<Rule>,
}

impl IntentClassifier {
    /// Create the classifier with the default rule sequence.
    pub fn default_rules() -> Self {
        Self {
            rules: vec![
                Rule::Keywords {
                    intent: Intent::Greeting,
                    tokens: GREETING_TOKENS,
                },
                Rule::Keywords {
                    intent: Intent::SpecsRequest,
                    tokens: SPEC_TOKENS,
                },
                Rule::Keywords {
                    intent: Intent::PriceRequest,
                    tokens: PRICE_TOKENS,
                },
                Rule::ProductMention {
                    tokens: BRAND_MODEL_TOKENS,
                },
                Rule::Keywords {
                    intent: Intent::GeneralInterest,
                    tokens: INTEREST_TOKENS,
                },
            ],
        }
    }

    /// Classify one utterance against the current catalog.
    ///
    /// Empty or whitespace-only input falls through every rule to
    /// `Fallback`.
    pub fn classify(&self, text: &str, products: &[Product]) -> Intent {
        let lower = text.to_lowercase();
        for rule in &self.rules {
            match rule {
                Rule::Keywords { intent, tokens } => {
                    if tokens.iter().any(|t| lower.contains(t)) {
                        return *intent;
                    }
                }
                Rule::ProductMention { tokens } => {
                    if tokens.iter().any(|t| lower.contains(t)) {
                        return if mentioned_product(&lower, products).is_some() {
                            Intent::ProductAvailable
                        } else {
                            Intent::ProductUnavailable
                        };
                    }
                }
            }
        }
        Intent::Fallback
    }
}

/// Find the first catalog product whose name contains any input word
/// longer than 2 characters (case-insensitive). Input must already be
/// lower-cased.
pub fn mentioned_product<'a>(lower_text: &str, products: &'a [Product]) -> Option<&'a Product> {
    products.iter().find(|p| {
        let name = p.name.to_lowercase();
        lower_text
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .any(|w| name.contains(w))
    })
}
