use crate::agent::LlmAgent;
use crate::prompts::{CAPITAL_INSTRUCTION, JOKES_INSTRUCTION, ORCHESTRATOR_INSTRUCTION};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub fn jokes_agent(model: &str) -> LlmAgent {
    LlmAgent::new("jokes_agent", model)
        .with_description("Agent to tell jokes")
        .with_instruction(JOKES_INSTRUCTION)
}

pub fn capital_agent(model: &str) -> LlmAgent {
    LlmAgent::new("capital_agent", model)
        .with_description("Agent to provide information about capital cities")
        .with_instruction(CAPITAL_INSTRUCTION)
}

pub fn orchestrator_agent(model: &str) -> LlmAgent {
    LlmAgent::new("orchestrator_agent", model)
        .with_description("An agent to orchestrate tasks among multiple agents")
        .with_instruction(ORCHESTRATOR_INSTRUCTION)
        .with_sub_agent(capital_agent(model))
        .with_sub_agent(jokes_agent(model))
}

/// The pre-configured root agents, keyed by name.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: BTreeMap<String, Arc<LlmAgent>>,
}

impl AgentCatalog {
    /// `model_override` replaces the model id of every agent, e.g. to point
    /// them all at a local mock server.
    pub fn new(model_override: Option<&str>) -> Self {
        let model = model_override.unwrap_or(DEFAULT_MODEL);
        let agents = [jokes_agent(model), capital_agent(model), orchestrator_agent(model)]
            .into_iter()
            .map(|a| (a.name.clone(), Arc::new(a)))
            .collect();
        Self { agents }
    }

    pub fn get(&self, name: &str) -> Option<Arc<LlmAgent>> {
        self.agents.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<LlmAgent>)> {
        self.agents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_sorted() {
        let catalog = AgentCatalog::new(None);
        assert_eq!(
            catalog.names(),
            vec!["capital_agent", "jokes_agent", "orchestrator_agent"]
        );
    }

    #[test]
    fn test_orchestrator_routes_to_capital_and_jokes() {
        let catalog = AgentCatalog::new(None);
        let root = catalog.get("orchestrator_agent").unwrap();
        let children: Vec<_> = root.sub_agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(children, vec!["capital_agent", "jokes_agent"]);
        assert_eq!(root.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_model_override_applies_to_sub_agents() {
        let catalog = AgentCatalog::new(Some("test_model"));
        let root = catalog.get("orchestrator_agent").unwrap();
        assert_eq!(root.model, "test_model");
        assert!(root.sub_agents.iter().all(|a| a.model == "test_model"));
    }

    #[test]
    fn test_capital_instruction_keeps_fallback_phrase() {
        let agent = capital_agent(DEFAULT_MODEL);
        assert!(agent.instruction.contains("Sorry, I don't know about that country."));
    }
}
