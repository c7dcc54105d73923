//! Response generation — the one operation the engine exposes.
//!
//! `handle()` always returns a usable reply. Model success, model failure,
//! and no-model-configured are three explicit branches, not a blanket
//! catch: failure degrades to a fixed apology without touching history,
//! and a missing backend answers from intent-keyed canned text.

use std::sync::Arc;

use tracing::{debug, warn};

use super::enrich::SpecEnricher;
use super::history::ConversationStore;
use super::intent::{Intent, IntentClassifier, mentioned_product};
use super::{prompt, truncate_chars};
use crate::catalog::Product;
use crate::config::{CompletionOptions, Persona, SearchConfig};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::search::WebSearch;

/// Fixed degraded reply when the configured model fails.
pub const APOLOGY: &str = "Desculpe, tive um problema. Pode repetir?";

/// Fixed reply shown to the customer when escalation is detected. The
/// caller substitutes this for the model's answer.
pub const HANDOFF: &str =
    "Vou transferir você para um atendente humano que pode ajudar com encomendas especiais!";

/// Order-request keywords that route the conversation to a human.
const ESCALATION_TOKENS: &[&str] = &[
    "encomendar",
    "pedir",
    "trazer",
    "conseguir",
    "importar",
    "buscar para mim",
];

/// Hard cap on the user-visible reply.
const MAX_REPLY_CHARS: usize = 250;

/// A generated reply plus the human-handoff signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// True when the input asks for an order the store must handle
    /// manually. Computed from the raw input, independent of the model.
    pub escalate: bool,
}

/// The conversational engine.
pub struct ResponseEngine {
    persona: Persona,
    options: CompletionOptions,
    history: ConversationStore,
    classifier: IntentClassifier,
    enricher: SpecEnricher,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl ResponseEngine {
    pub fn new(
        persona: Persona,
        options: CompletionOptions,
        llm: Option<Arc<dyn LlmProvider>>,
        search: Arc<dyn WebSearch>,
        search_config: &SearchConfig,
    ) -> Self {
        Self {
            persona,
            options,
            history: ConversationStore::new(),
            classifier: IntentClassifier::default_rules(),
            enricher: SpecEnricher::new(search, search_config.max_results),
            llm,
        }
    }

    /// Per-user conversation history (also used by the admin clear).
    pub fn history(&self) -> &ConversationStore {
        &self.history
    }

    /// Whether the input asks for an order that needs a human.
    pub fn detects_escalation(text: &str) -> bool {
        let lower = text.to_lowercase();
        ESCALATION_TOKENS.iter().any(|t| lower.contains(t))
    }

    /// Answer one customer message against the current active catalog.
    pub async fn handle(&self, text: &str, user_id: &str, products: &[Product]) -> Reply {
        let escalate = Self::detects_escalation(text);

        // Per-turn clone: enriched specs are never persisted.
        let mut products = products.to_vec();
        self.enricher.enrich(&mut products, text).await;

        let reply_text = match &self.llm {
            Some(llm) => self.model_reply(llm, text, user_id, &products).await,
            None => self.canned_reply(text, &products),
        };

        Reply {
            text: reply_text,
            escalate,
        }
    }

    async fn model_reply(
        &self,
        llm: &Arc<dyn LlmProvider>,
        text: &str,
        user_id: &str,
        products: &[Product],
    ) -> String {
        let mut messages = vec![ChatMessage::system(prompt::system_prompt(
            &self.persona,
            products,
        ))];
        for turn in self.history.turns(user_id) {
            messages.push(ChatMessage {
                role: turn.role,
                content: turn.content,
            });
        }
        messages.push(ChatMessage::user(text));

        let request = CompletionRequest::new(messages, self.options.clone());
        match llm.complete(request).await {
            Ok(raw) => {
                let clean = postprocess(&raw);
                self.history.append_exchange(user_id, text, &clean);
                debug!(user_id = %user_id, model = %llm.model_name(), "Model reply generated");
                clean
            }
            Err(e) => {
                // History untouched: a failed exchange never becomes context.
                warn!(user_id = %user_id, error = %e, "Completion failed, degrading to apology");
                APOLOGY.to_string()
            }
        }
    }

    /// Deterministic keyword-driven reply used when no model is reachable.
    fn canned_reply(&self, text: &str, products: &[Product]) -> String {
        let lower = text.to_lowercase();
        match self.classifier.classify(text, products) {
            Intent::Greeting => format!(
                "E aí! Sou o {}. Procurando algum celular?",
                self.persona.seller_name
            ),
            Intent::SpecsRequest => match mentioned_product(&lower, products) {
                Some(p) if !p.specs.is_empty() => {
                    format!("{}: {}", p.name, truncate_chars(&p.specs, 150))
                }
                _ => "Me diz qual modelo e eu te passo a ficha técnica!".to_string(),
            },
            Intent::PriceRequest => match mentioned_product(&lower, products) {
                Some(p) => format!("O {} tá R$ {:.2}. Quer parcelar?", p.name, p.price),
                None => "Qual modelo você quer saber o preço?".to_string(),
            },
            Intent::ProductAvailable => match mentioned_product(&lower, products) {
                Some(p) => format!("Tenho {} sim! Quer saber o preço?", p.name),
                None => "Temos sim! Quer saber o preço?".to_string(),
            },
            Intent::ProductUnavailable => {
                "Não temos esse modelo no momento. Posso sugerir um parecido?".to_string()
            }
            Intent::GeneralInterest => {
                "Beleza! Tem preferência de marca? iPhone, Samsung, Xiaomi?".to_string()
            }
            Intent::Fallback => format!(
                "Sou o {}, da {}. Como posso ajudar?",
                self.persona.seller_name, self.persona.store_name
            ),
        }
    }
}

/// First line only, hard-truncated.
fn postprocess(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or("").trim();
    truncate_chars(first_line, MAX_REPLY_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::catalog::Condition;
    use crate::error::{LlmError, SearchError};
    use crate::search::SearchHit;

    struct NoSearch;

    #[async_trait]
    impl WebSearch for NoSearch {
        async fn search(
            &self,
            query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchHit>, SearchError> {
            Err(SearchError::NoResults(query.to_string()))
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl crate::llm::LlmProvider for EchoLlm {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            let last = request.messages.last().unwrap();
            Ok(format!("eco: {}\nsegunda linha ignorada", last.content))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct BrokenLlm;

    #[async_trait]
    impl crate::llm::LlmProvider for BrokenLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::BadStatus {
                provider: "test".to_string(),
                status: 503,
            })
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    fn product(name: &str) -> Product {
        Product {
            id: "p1".to_string(),
            name: name.to_string(),
            category_id: None,
            brand_id: None,
            category_name: None,
            brand_name: None,
            price: dec!(8999),
            description: String::new(),
            specs: String::new(),
            condition: Condition::New,
            stock: 1,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn engine(llm: Option<Arc<dyn LlmProvider>>) -> ResponseEngine {
        ResponseEngine::new(
            Persona::default(),
            CompletionOptions::default(),
            llm,
            Arc::new(NoSearch),
            &SearchConfig::default(),
        )
    }

    #[tokio::test]
    async fn model_reply_takes_first_line_and_updates_history() {
        let engine = engine(Some(Arc::new(EchoLlm)));
        let reply = engine.handle("oi", "u1", &[]).await;

        assert_eq!(reply.text, "eco: oi");
        assert!(!reply.escalate);

        let turns = engine.history().turns("u1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "oi");
        assert_eq!(turns[1].content, "eco: oi");
    }

    #[tokio::test]
    async fn failed_completion_returns_apology_without_history_mutation() {
        let engine = engine(Some(Arc::new(BrokenLlm)));
        engine.history().append_exchange("u1", "antes", "resposta");
        let before = engine.history().len("u1");

        let reply = engine.handle("oi", "u1", &[]).await;
        assert_eq!(reply.text, APOLOGY);
        assert_eq!(engine.history().len("u1"), before);
    }

    #[tokio::test]
    async fn escalation_flag_is_independent_of_model_output() {
        let engine = engine(Some(Arc::new(EchoLlm)));
        let reply = engine.handle("quero encomendar um iphone 17", "u1", &[]).await;
        assert!(reply.escalate);
        assert_ne!(reply.text, HANDOFF);

        let reply = engine.handle("tem iphone 12?", "u1", &[]).await;
        assert!(!reply.escalate);
    }

    #[tokio::test]
    async fn escalation_also_set_when_model_fails() {
        let engine = engine(Some(Arc::new(BrokenLlm)));
        let reply = engine.handle("da pra importar?", "u1", &[]).await;
        assert!(reply.escalate);
        assert_eq!(reply.text, APOLOGY);
    }

    #[tokio::test]
    async fn canned_greeting_without_model() {
        let engine = engine(None);
        let reply = engine.handle("Oi, tudo bem?", "u1", &[]).await;
        assert_eq!(reply.text, "E aí! Sou o Alex. Procurando algum celular?");
    }

    #[tokio::test]
    async fn canned_price_quotes_the_mentioned_product() {
        let engine = engine(None);
        let reply = engine
            .handle("quanto custa o iphone 12?", "u1", &[product("iPhone 12")])
            .await;
        assert_eq!(reply.text, "O iPhone 12 tá R$ 8999.00. Quer parcelar?");
    }

    #[tokio::test]
    async fn canned_replies_leave_history_empty() {
        let engine = engine(None);
        engine.handle("oi", "u1", &[]).await;
        assert!(engine.history().is_empty("u1"));
    }

    #[test]
    fn postprocess_truncates_to_250_chars() {
        let long = "x".repeat(400);
        assert_eq!(postprocess(&long).chars().count(), 250);
        assert_eq!(postprocess("  uma linha  \noutra"), "uma linha");
        assert_eq!(postprocess(""), "");
    }

    #[test]
    fn escalation_tokens() {
        assert!(ResponseEngine::detects_escalation("quero ENCOMENDAR um celular"));
        assert!(ResponseEngine::detects_escalation("pode buscar para mim?"));
        assert!(!ResponseEngine::detects_escalation("tem iphone?"));
    }
}
