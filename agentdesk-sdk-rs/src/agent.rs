use crate::error::{Result, SdkError};
use crate::events::{
    Content, Event, FunctionCall, FunctionResponse, Part, ROLE_MODEL, ROLE_USER,
};
use crate::llm::{ChatModel, FunctionDeclaration, LlmRequest};
use crate::prompts::{PARENT_TRANSFER_INSTRUCTION, TRANSFER_INSTRUCTION};
use serde_json::{Value, json};
use std::sync::Arc;

pub const TRANSFER_TOOL: &str = "transfer_to_agent";
pub const MAX_ITERATIONS: usize = 10;

/// A named model configuration. Agents form a tree through `sub_agents`.
///
/// An agent can hand the conversation to its children, and unless told
/// otherwise also to its parent and to its peers.
#[derive(Debug, Clone)]
pub struct LlmAgent {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
    pub sub_agents: Vec<Arc<LlmAgent>>,
    pub disallow_transfer_to_parent: bool,
    pub disallow_transfer_to_peers: bool,
}

/// Outcome of a single model call inside [`LlmAgent::step`].
#[derive(Debug, Clone)]
pub struct Turn {
    pub events: Vec<Event>,
    /// The model answered in text or handed the conversation over.
    pub finished: bool,
}

impl LlmAgent {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            description: String::new(),
            instruction: String::new(),
            sub_agents: Vec::new(),
            disallow_transfer_to_parent: false,
            disallow_transfer_to_peers: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_sub_agent(mut self, agent: LlmAgent) -> Self {
        self.sub_agents.push(Arc::new(agent));
        self
    }

    pub fn disallow_transfer_to_parent(mut self, disallow: bool) -> Self {
        self.disallow_transfer_to_parent = disallow;
        self
    }

    pub fn disallow_transfer_to_peers(mut self, disallow: bool) -> Self {
        self.disallow_transfer_to_peers = disallow;
        self
    }

    pub fn find_agent(&self, name: &str) -> Option<&LlmAgent> {
        if self.name == name {
            return Some(self);
        }
        self.sub_agents.iter().find_map(|a| a.find_agent(name))
    }

    pub fn find_parent(&self, name: &str) -> Option<&LlmAgent> {
        if self.sub_agents.iter().any(|a| a.name == name) {
            return Some(self);
        }
        self.sub_agents.iter().find_map(|a| a.find_parent(name))
    }

    /// Agents this one may transfer to inside the tree rooted at `root`:
    /// children first, then the parent, then peers.
    pub fn transfer_targets<'a>(&'a self, root: &'a LlmAgent) -> Vec<&'a LlmAgent> {
        let mut targets: Vec<&LlmAgent> = self.sub_agents.iter().map(|a| a.as_ref()).collect();
        if let Some(parent) = root.find_parent(&self.name) {
            if !self.disallow_transfer_to_parent {
                targets.push(parent);
            }
            if !self.disallow_transfer_to_peers {
                targets.extend(
                    parent
                        .sub_agents
                        .iter()
                        .map(|a| a.as_ref())
                        .filter(|a| a.name != self.name),
                );
            }
        }
        targets
    }

    pub fn system_instruction(&self, root: &LlmAgent) -> String {
        let mut instruction = self.instruction.trim().to_string();
        let targets = self.transfer_targets(root);
        if targets.is_empty() {
            return instruction;
        }

        instruction.push_str("\n\n");
        instruction.push_str(TRANSFER_INSTRUCTION);
        for agent in &targets {
            instruction.push_str(&format!("- {}: {}\n", agent.name, agent.description));
        }
        if let Some(parent) = root.find_parent(&self.name) {
            if !self.disallow_transfer_to_parent {
                instruction.push_str(PARENT_TRANSFER_INSTRUCTION);
                instruction.push_str(&format!("`{}`.\n", parent.name));
            }
        }
        instruction.push_str("</AGENT_TRANSFER>");
        instruction
    }

    pub fn tools(&self, root: &LlmAgent) -> Vec<FunctionDeclaration> {
        if self.transfer_targets(root).is_empty() {
            return vec![];
        }
        vec![FunctionDeclaration {
            name: TRANSFER_TOOL.to_string(),
            description: "Transfer the conversation to another agent.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "agent_name": {
                        "type": "string",
                        "description": "The name of the agent to transfer to."
                    }
                },
                "required": ["agent_name"]
            }),
        }]
    }

    /// Turns session history into model contents from this agent's point of
    /// view. Replies of other agents are replayed as user-side context.
    pub fn build_contents<'a>(&self, history: impl IntoIterator<Item = &'a Event>) -> Vec<Content> {
        let mut contents = Vec::new();
        for event in history {
            let Some(content) = &event.content else {
                continue;
            };
            if content.parts.is_empty() {
                continue;
            }
            if event.author == ROLE_USER || event.author == self.name {
                contents.push(content.clone());
                continue;
            }
            let text = content.text();
            if text.is_empty() {
                continue;
            }
            contents.push(Content::user_text(format!(
                "For context: [{}] said: {}",
                event.author, text
            )));
        }
        contents
    }

    /// One model call: a text reply, or the call event followed by an event
    /// with the function responses. `root` is the tree the agent lives in.
    pub async fn turn(
        &self,
        model: &dyn ChatModel,
        root: &LlmAgent,
        history: &[Event],
        invocation_id: &str,
    ) -> Result<Turn> {
        let request = LlmRequest {
            model: self.model.clone(),
            system_instruction: self.system_instruction(root),
            contents: self.build_contents(history),
            tools: self.tools(root),
        };
        let response = model.generate(&request).await?;

        let mut content = response
            .content
            .unwrap_or_else(|| Content::new(ROLE_MODEL, vec![]));
        content.role = ROLE_MODEL.to_string();

        let calls: Vec<FunctionCall> = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall(c) => Some(c.clone()),
                _ => None,
            })
            .collect();

        let mut events = vec![Event::new(invocation_id, &self.name).with_content(content)];
        if calls.is_empty() {
            return Ok(Turn {
                events,
                finished: true,
            });
        }

        let targets = self.transfer_targets(root);
        let mut transfer = None;
        let mut responses = Vec::new();
        for call in &calls {
            tracing::info!(agent = %self.name, tool = %call.name, "agent calling tool");
            let (response, target) = self.handle_call(call, &targets);
            if target.is_some() {
                transfer = target;
            }
            responses.push(Part::FunctionResponse(FunctionResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response,
            }));
        }

        let mut response_event = Event::new(invocation_id, &self.name)
            .with_content(Content::new(ROLE_USER, responses));
        response_event.actions.transfer_to_agent = transfer.clone();
        events.push(response_event);

        Ok(Turn {
            events,
            finished: transfer.is_some(),
        })
    }

    /// Runs the model until it answers in text or hands the conversation to
    /// another agent. Returns the events produced along the way.
    pub async fn step(
        &self,
        model: &dyn ChatModel,
        root: &LlmAgent,
        history: &[Event],
        invocation_id: &str,
    ) -> Result<Vec<Event>> {
        let mut seen = history.to_vec();
        let mut produced: Vec<Event> = Vec::new();

        for _ in 0..MAX_ITERATIONS {
            let turn = self.turn(model, root, &seen, invocation_id).await?;
            seen.extend(turn.events.iter().cloned());
            produced.extend(turn.events);
            if turn.finished {
                return Ok(produced);
            }
        }

        Err(SdkError::MaxIterations(MAX_ITERATIONS))
    }

    fn handle_call(&self, call: &FunctionCall, targets: &[&LlmAgent]) -> (Value, Option<String>) {
        if call.name != TRANSFER_TOOL {
            tracing::warn!(agent = %self.name, tool = %call.name, "unknown tool requested");
            return (json!({"error": format!("Tool {} not found", call.name)}), None);
        }
        let target = call
            .args
            .get("agent_name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if targets.iter().any(|a| a.name == target) {
            (
                json!({"result": format!("Transferred to {}", target)}),
                Some(target.to_string()),
            )
        } else {
            (json!({"error": format!("Agent {} not found", target)}), None)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::LlmResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request it receives.
    #[derive(Default)]
    pub struct ScriptedModel {
        responses: Mutex<VecDeque<LlmResponse>>,
        pub requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<LlmResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| SdkError::Llm("no scripted response left".to_string()))
        }
    }

    pub fn call(name: &str, args: Value) -> LlmResponse {
        LlmResponse {
            content: Some(Content::new(
                ROLE_MODEL,
                vec![Part::FunctionCall(FunctionCall {
                    id: format!("call-{}", name),
                    name: name.to_string(),
                    args,
                })],
            )),
        }
    }

    fn orchestrator() -> LlmAgent {
        LlmAgent::new("orchestrator_agent", "gemini-2.0-flash")
            .with_instruction("route")
            .with_sub_agent(
                LlmAgent::new("capital_agent", "gemini-2.0-flash")
                    .with_description("Agent to provide information about capital cities"),
            )
            .with_sub_agent(
                LlmAgent::new("jokes_agent", "gemini-2.0-flash")
                    .with_description("Agent to tell jokes"),
            )
    }

    fn user_event(text: &str) -> Event {
        Event::new("inv-1", ROLE_USER).with_content(Content::user_text(text))
    }

    #[test]
    fn test_find_agent_and_parent() {
        let root = orchestrator();
        assert_eq!(root.find_agent("capital_agent").unwrap().name, "capital_agent");
        assert!(root.find_agent("missing").is_none());
        assert_eq!(root.find_parent("capital_agent").unwrap().name, "orchestrator_agent");
        assert!(root.find_parent("orchestrator_agent").is_none());
    }

    #[test]
    fn test_transfer_targets_children_parent_and_peers() {
        let root = orchestrator();
        let names = |agent: &LlmAgent| -> Vec<String> {
            agent
                .transfer_targets(&root)
                .iter()
                .map(|a| a.name.clone())
                .collect()
        };
        assert_eq!(names(&root), vec!["capital_agent", "jokes_agent"]);

        let capital = root.find_agent("capital_agent").unwrap();
        assert_eq!(names(capital), vec!["orchestrator_agent", "jokes_agent"]);
        assert_eq!(capital.tools(&root).len(), 1);
        let instruction = capital.system_instruction(&root);
        assert!(instruction.contains("- jokes_agent: Agent to tell jokes"));
        assert!(instruction.contains("transfer back to `orchestrator_agent`"));
    }

    #[test]
    fn test_transfer_flags_restrict_targets() {
        let root = LlmAgent::new("orchestrator_agent", "gemini-2.0-flash").with_sub_agent(
            LlmAgent::new("capital_agent", "gemini-2.0-flash")
                .disallow_transfer_to_parent(true)
                .disallow_transfer_to_peers(true),
        );
        let leaf = root.find_agent("capital_agent").unwrap();
        assert!(leaf.transfer_targets(&root).is_empty());
        assert!(leaf.tools(&root).is_empty());
        assert!(!leaf.system_instruction(&root).contains("AGENT_TRANSFER"));
    }

    #[test]
    fn test_standalone_agent_has_no_transfer_tool() {
        let agent = LlmAgent::new("jokes_agent", "gemini-2.0-flash").with_instruction("jokes");
        assert!(agent.tools(&agent).is_empty());
        assert_eq!(agent.system_instruction(&agent), "jokes");
    }

    #[test]
    fn test_other_agents_replayed_as_context() {
        let root = orchestrator();
        let history = vec![
            user_event("hi"),
            Event::new("inv-1", "capital_agent").with_content(Content::model_text("Paris")),
        ];
        let contents = root.build_contents(&history);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1].role, ROLE_USER);
        assert_eq!(contents[1].text(), "For context: [capital_agent] said: Paris");
    }

    #[tokio::test]
    async fn test_step_text_reply() {
        let agent = LlmAgent::new("jokes_agent", "gemini-2.0-flash");
        let model = ScriptedModel::new(vec![LlmResponse::text("A joke")]);

        let events = agent.step(&model, &agent, &[user_event("joke?")], "inv-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_final_response());
        assert_eq!(events[0].author, "jokes_agent");
        assert_eq!(events[0].first_text(), Some("A joke"));

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[0].model, "gemini-2.0-flash");
        assert!(requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_step_transfer() {
        let agent = orchestrator();
        let model = ScriptedModel::new(vec![call(
            TRANSFER_TOOL,
            json!({"agent_name": "capital_agent"}),
        )]);

        let events = agent.step(&model, &agent, &[user_event("capital?")], "inv-1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_final_response());
        assert_eq!(
            events[1].actions.transfer_to_agent.as_deref(),
            Some("capital_agent")
        );
    }

    #[tokio::test]
    async fn test_sub_agent_can_transfer_to_peer() {
        let root = orchestrator();
        let capital = root.find_agent("capital_agent").unwrap();
        let model = ScriptedModel::new(vec![call(
            TRANSFER_TOOL,
            json!({"agent_name": "jokes_agent"}),
        )]);

        let events = capital
            .step(&model, &root, &[user_event("Tell me a joke")], "inv-1")
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].author, "capital_agent");
        assert_eq!(events[1].actions.transfer_to_agent.as_deref(), Some("jokes_agent"));
    }

    #[tokio::test]
    async fn test_turn_reports_unfinished_after_failed_call() {
        let agent = orchestrator();
        let model = ScriptedModel::new(vec![call("lookup", json!({}))]);
        let turn = agent
            .turn(&model, &agent, &[user_event("hi")], "inv-1")
            .await
            .unwrap();
        assert!(!turn.finished);
        assert_eq!(turn.events.len(), 2);
    }

    #[tokio::test]
    async fn test_step_unknown_target_keeps_looping() {
        let agent = orchestrator();
        let model = ScriptedModel::new(vec![
            call(TRANSFER_TOOL, json!({"agent_name": "weather_agent"})),
            LlmResponse::text("Sorry, I cannot handle that request."),
        ]);

        let events = agent.step(&model, &agent, &[user_event("weather?")], "inv-1").await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(events[1].actions.transfer_to_agent.is_none());
        let response = &events[1].function_responses()[0].response;
        assert!(response["error"].as_str().unwrap().contains("weather_agent"));
        assert!(events[2].is_final_response());

        // The second request carries the failed call and its response.
        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[1].contents.len(), 3);
    }

    #[tokio::test]
    async fn test_step_max_iterations() {
        let agent = orchestrator();
        let responses = (0..MAX_ITERATIONS)
            .map(|_| call("lookup", json!({})))
            .collect();
        let model = ScriptedModel::new(responses);

        let err = agent.step(&model, &agent, &[user_event("loop")], "inv-1").await.unwrap_err();
        assert!(matches!(err, SdkError::MaxIterations(10)));
    }
}
