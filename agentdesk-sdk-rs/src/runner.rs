use crate::agent::{LlmAgent, MAX_ITERATIONS};
use crate::error::{Result, SdkError};
use crate::events::{Content, Event, ROLE_USER};
use crate::llm::ChatModel;
use crate::session::{Session, SessionKey, SessionService};
use async_stream::try_stream;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

const MAX_TRANSFERS: usize = 10;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

/// Drives one agent tree for one application against a session store.
#[derive(Clone)]
pub struct Runner {
    pub app_name: String,
    pub root_agent: Arc<LlmAgent>,
    pub session_service: Arc<dyn SessionService>,
    pub model: Arc<dyn ChatModel>,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        root_agent: Arc<LlmAgent>,
        session_service: Arc<dyn SessionService>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            root_agent,
            session_service,
            model,
        }
    }

    /// Handles one user message and returns the events the agents produced,
    /// in order. Every event, including the user's, is appended to the session.
    ///
    /// The session must exist.
    pub async fn run(
        &self,
        user_id: &str,
        session_id: &str,
        new_message: Content,
    ) -> Result<Vec<Event>> {
        self.run_stream(user_id, session_id, new_message)
            .try_collect()
            .await
    }

    /// Same as [`Runner::run`], but yields each event as soon as it has been
    /// appended to the session. A failure ends the stream with its error;
    /// events yielded before it stay persisted.
    pub fn run_stream(&self, user_id: &str, session_id: &str, new_message: Content) -> EventStream {
        let key = SessionKey::new(&self.app_name, user_id, session_id);
        Box::pin(self.clone().events(key, new_message))
    }

    fn events(self, key: SessionKey, new_message: Content) -> impl Stream<Item = Result<Event>> + Send {
        try_stream! {
            let session = self
                .session_service
                .get_session(&key)
                .await?
                .ok_or_else(|| key.not_found())?;

            let invocation_id = format!("e-{}", Uuid::new_v4());
            let mut history = session.events.clone();

            let mut message = new_message;
            message.role = ROLE_USER.to_string();
            let user_event = Event::new(&invocation_id, ROLE_USER).with_content(message);
            self
                .session_service
                .append_event(&key, user_event.clone())
                .await?;
            history.push(user_event);

            let root = self.root_agent.as_ref();
            let mut agent = self.agent_to_run(&session);
            tracing::info!(
                app = %self.app_name,
                session = %key.session_id,
                agent = %agent.name,
                invocation = %invocation_id,
                "running agent"
            );

            let mut transfers = 0;
            let mut calls = 0;
            loop {
                if calls == MAX_ITERATIONS {
                    Err::<(), _>(SdkError::MaxIterations(MAX_ITERATIONS))?;
                }
                calls += 1;

                let turn = agent
                    .turn(self.model.as_ref(), root, &history, &invocation_id)
                    .await?;

                let mut transfer = None;
                for event in turn.events {
                    if let Some(target) = &event.actions.transfer_to_agent {
                        transfer = Some(target.clone());
                    }
                    self.session_service.append_event(&key, event.clone()).await?;
                    history.push(event.clone());
                    yield event;
                }

                if !turn.finished {
                    continue;
                }
                let Some(target) = transfer else {
                    break;
                };
                transfers += 1;
                if transfers > MAX_TRANSFERS {
                    Err::<(), _>(SdkError::MaxIterations(MAX_TRANSFERS))?;
                }
                agent = root
                    .find_agent(&target)
                    .ok_or(SdkError::AgentNotFound(target))?;
                calls = 0;
                tracing::info!(agent = %agent.name, "transferred to agent");
            }
        }
    }

    /// The agent that answered last keeps the conversation; otherwise the
    /// root agent starts it.
    fn agent_to_run(&self, session: &Session) -> &LlmAgent {
        session
            .events
            .iter()
            .rev()
            .filter(|e| e.author != ROLE_USER)
            .find_map(|e| self.root_agent.find_agent(&e.author))
            .unwrap_or(self.root_agent.as_ref())
    }
}
