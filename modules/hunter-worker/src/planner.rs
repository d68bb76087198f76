use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tracing::{info, warn};

use ai_client::{strip_code_blocks, truncate_to_char_boundary};

use crate::traits::TextCompleter;

/// JSON key the model is asked to put the query list under.
const PLAN_KEY: &str = "plan_de_busqueda";

/// Upper bound on search terms per campaign.
pub const MAX_TERMS: usize = 10;

/// Result of planning. Either way there is at least one term to search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// The model produced a usable plan.
    Planned(Vec<String>),
    /// The model failed; a single term synthesized from the criteria is used.
    Fallback { terms: Vec<String>, reason: String },
}

impl PlanOutcome {
    pub fn terms(&self) -> &[String] {
        match self {
            PlanOutcome::Planned(terms) => terms,
            PlanOutcome::Fallback { terms, .. } => terms,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PlanOutcome::Fallback { .. })
    }
}

/// Turns campaign criteria into concrete place-search queries.
pub struct SearchPlanner {
    ai: Arc<dyn TextCompleter>,
    language: String,
}

impl SearchPlanner {
    pub fn new(ai: Arc<dyn TextCompleter>, language: impl Into<String>) -> Self {
        Self {
            ai,
            language: language.into(),
        }
    }

    /// Ask the model for 5–10 search queries. Never fails: any backend or
    /// parse problem yields the single fallback term.
    pub async fn plan(&self, what_is_sold: &str, ideal_customer: &str, location: &str) -> PlanOutcome {
        info!("Planning search terms");
        let prompt = self.build_prompt(what_is_sold, ideal_customer, location);

        let result = match self.ai.complete(&prompt).await {
            Ok(text) => parse_plan(&text),
            Err(e) => Err(anyhow!("completion request failed: {e:#}")),
        };

        match result {
            Ok(terms) => {
                info!(count = terms.len(), terms = ?terms, "Search plan generated");
                PlanOutcome::Planned(terms)
            }
            Err(e) => {
                let term = fallback_term(ideal_customer, location);
                warn!(error = %e, fallback = %term, "Search planning failed, using fallback term");
                PlanOutcome::Fallback {
                    terms: vec![term],
                    reason: e.to_string(),
                }
            }
        }
    }

    fn build_prompt(&self, what_is_sold: &str, ideal_customer: &str, location: &str) -> String {
        format!(
            r#"Actúa como un director de estrategia de marketing de clase mundial.
Mi cliente vende: "{what_is_sold}".
Su cliente ideal es: "{ideal_customer}".
La búsqueda se centrará en la siguiente ubicación: "{location}".
Tu misión es crear un "Plan de Caza" en formato JSON. Este plan debe contener una lista de 5 a {MAX_TERMS} términos de búsqueda para Google Maps que sean específicos, creativos y con alta probabilidad de encontrar clientes potenciales de calidad.
Escribe los términos en el idioma con código "{language}".
Genera únicamente el objeto JSON con una clave "{PLAN_KEY}" que contenga la lista de términos."#,
            language = self.language,
        )
    }
}

/// The term used when planning fails.
pub fn fallback_term(ideal_customer: &str, location: &str) -> String {
    format!("{} en {}", ideal_customer.trim(), location.trim())
}

/// Extract the term list from a model response. Blank and repeated terms are
/// dropped, order is kept, and the list is capped at `MAX_TERMS`.
pub fn parse_plan(response: &str) -> Result<Vec<String>> {
    let json_text = strip_code_blocks(response);
    let value: serde_json::Value = serde_json::from_str(json_text).map_err(|e| {
        anyhow!(
            "response is not JSON ({e}): {:?}",
            truncate_to_char_boundary(json_text, 120)
        )
    })?;

    let list = value
        .get(PLAN_KEY)
        .ok_or_else(|| anyhow!("response has no {PLAN_KEY:?} key"))?
        .as_array()
        .ok_or_else(|| anyhow!("{PLAN_KEY:?} is not a list"))?;

    let mut terms: Vec<String> = Vec::with_capacity(list.len().min(MAX_TERMS));
    for item in list {
        let Some(term) = item.as_str().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        if !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
        if terms.len() == MAX_TERMS {
            break;
        }
    }

    if terms.is_empty() {
        bail!("{PLAN_KEY:?} contains no usable terms");
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompleter;

    fn planner(ai: ScriptedCompleter) -> SearchPlanner {
        SearchPlanner::new(Arc::new(ai), "es")
    }

    #[tokio::test]
    async fn fenced_json_plan_is_used_in_order() {
        let ai = ScriptedCompleter::reply(
            "```json\n{\"plan_de_busqueda\": [\"estudios de arquitectura en Miami\", \"desarrolladores inmobiliarios Brickell\"]}\n```",
        );
        let outcome = planner(ai).plan("X", "Y", "Miami").await;
        assert_eq!(
            outcome,
            PlanOutcome::Planned(vec![
                "estudios de arquitectura en Miami".to_string(),
                "desarrolladores inmobiliarios Brickell".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn malformed_response_falls_back() {
        let outcome = planner(ScriptedCompleter::reply("not json"))
            .plan("X", "Y", "Miami")
            .await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.terms(), ["Y en Miami".to_string()]);
    }

    #[tokio::test]
    async fn backend_error_falls_back() {
        let outcome = planner(ScriptedCompleter::failing("quota exceeded"))
            .plan("X", "Arquitectos", "Miami, Florida")
            .await;
        match outcome {
            PlanOutcome::Fallback { terms, reason } => {
                assert_eq!(terms, vec!["Arquitectos en Miami, Florida".to_string()]);
                assert!(reason.contains("quota exceeded"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_falls_back() {
        let outcome = planner(ScriptedCompleter::reply(r#"{"terms": ["a", "b"]}"#))
            .plan("X", "Y", "Miami")
            .await;
        assert_eq!(outcome.terms(), ["Y en Miami".to_string()]);
    }

    #[tokio::test]
    async fn prompt_carries_criteria_and_language() {
        let ai = Arc::new(ScriptedCompleter::reply(r#"{"plan_de_busqueda": ["a"]}"#));
        let planner = SearchPlanner::new(ai.clone(), "es");
        planner.plan("Reformas de lujo", "Hoteles boutique", "Madrid").await;

        let prompts = ai.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("\"Reformas de lujo\""));
        assert!(prompts[0].contains("\"Hoteles boutique\""));
        assert!(prompts[0].contains("\"Madrid\""));
        assert!(prompts[0].contains("\"es\""));
        assert!(prompts[0].contains("plan_de_busqueda"));
    }

    #[test]
    fn parse_plan_caps_and_cleans() {
        let many: Vec<String> = (0..14).map(|i| format!("term {i}")).collect();
        let response = serde_json::json!({ "plan_de_busqueda": many }).to_string();
        let terms = parse_plan(&response).unwrap();
        assert_eq!(terms.len(), MAX_TERMS);
        assert_eq!(terms[0], "term 0");
        assert_eq!(terms[9], "term 9");

        let messy = r#"{"plan_de_busqueda": ["  a  ", "", 3, "a", "b"]}"#;
        assert_eq!(parse_plan(messy).unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn parse_plan_rejects_empty_and_non_list() {
        assert!(parse_plan(r#"{"plan_de_busqueda": []}"#).is_err());
        assert!(parse_plan(r#"{"plan_de_busqueda": "a, b"}"#).is_err());
        assert!(parse_plan(r#"["a", "b"]"#).is_err());
    }
}
