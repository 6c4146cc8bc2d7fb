//! User-action handlers over [`WorkflowState`].

use std::sync::Arc;

use rand::Rng;
use url::Url;

use crate::error::{ConfigError, Error};
use crate::llm::{ChatRelay, PersonaGenerator};
use crate::mint::{EventSink, MintOrchestrator};
use crate::storage::ImageSource;
use crate::workflow::state::{Avatar, InputTab, WorkflowState};

const REGENERATE_PROMPT: &str =
    "You have already generated a persona. Regenerate and discard current one?";
const LEAVE_PROMPT: &str = "You have generated content. Leave this page and discard it?";
const DRAFT_ID_LEN: usize = 8;

/// Yes/no question put to the user before discarding work.
pub trait Confirm: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Answers every question the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

/// What a user action ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The user said no to a confirmation.
    Declined,
    /// Preconditions not met; nothing happened.
    Skipped,
    /// Failed with a user-facing message (also stored as the last error).
    Failed(String),
}

/// Drives one persona session: generate, mint, chat.
pub struct PersonaWorkflow {
    state: WorkflowState,
    generator: PersonaGenerator,
    relay: ChatRelay,
    orchestrator: Option<Arc<MintOrchestrator>>,
    confirm: Box<dyn Confirm>,
    share_base: Url,
}

impl PersonaWorkflow {
    pub fn new(
        generator: PersonaGenerator,
        relay: ChatRelay,
        confirm: Box<dyn Confirm>,
        share_base_url: &str,
    ) -> Result<Self, ConfigError> {
        let share_base = Url::parse(share_base_url).map_err(|e| ConfigError::InvalidValue {
            key: "SHARE_BASE_URL".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            state: WorkflowState::default(),
            generator,
            relay,
            orchestrator: None,
            confirm,
            share_base,
        })
    }

    pub fn with_orchestrator(mut self, orchestrator: Arc<MintOrchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn set_avatar(&mut self, label: impl Into<String>, source: ImageSource) {
        let label = label.into();
        self.state.log.push(format!("Avatar selected: {label}"));
        self.state.avatar = Some(Avatar { label, source });
    }

    pub fn set_tab(&mut self, tab: InputTab) {
        self.state.tab = tab;
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.state.url_input = url.into();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.state.text_input = text.into();
    }

    pub fn can_submit(&self) -> bool {
        self.state.source_text().is_some() && !self.state.generating
    }

    /// Generate a persona from the current input.
    pub async fn generate(&mut self) -> Outcome {
        if !self.can_submit() {
            return Outcome::Skipped;
        }
        if self.state.generated_once && !self.confirm.confirm(REGENERATE_PROMPT) {
            return Outcome::Declined;
        }
        let Some(source) = self.state.source_text().map(str::to_string) else {
            return Outcome::Skipped;
        };

        self.state.generating = true;
        self.state.last_error = None;
        self.state.log.push("Generating persona...");

        let result = self.generator.generate(&source).await;
        self.state.generating = false;

        match result {
            Ok(persona) => {
                self.state
                    .log
                    .push(format!("Persona generated: {}", persona.name));
                self.state.persona = Some(persona);
                self.state.pointers = None;
                self.state.last_mint = None;
                self.state.minted = false;
                self.state.generated_once = true;
                self.state.draft_id = Some(new_draft_id());
                Outcome::Completed
            }
            Err(e) => {
                self.state.log.push(format!("Generate error: {e}"));
                self.fail(Error::from(e))
            }
        }
    }

    /// Mint the current persona with the selected avatar.
    pub async fn mint(&mut self) -> Outcome {
        self.mint_observed(|_| {}).await
    }

    /// Like [`mint`](Self::mint), handing each stamped log line to
    /// `on_line` as soon as it is appended.
    pub async fn mint_observed(&mut self, mut on_line: impl FnMut(&str)) -> Outcome {
        if self.state.minting {
            return Outcome::Skipped;
        }
        let Some(persona) = self.state.persona.clone() else {
            return Outcome::Skipped;
        };
        let Some(orchestrator) = self.orchestrator.clone() else {
            return self.fail(Error::from(ConfigError::MissingRequired {
                key: "INFT_CONTRACT_ADDRESS".to_string(),
                hint: "Minting is not configured".to_string(),
            }));
        };
        let image = self.state.avatar.as_ref().map(|avatar| avatar.source.clone());

        self.state.minting = true;
        self.state.last_error = None;

        let (sink, mut events) = EventSink::channel();
        let attempt = async move {
            let result = orchestrator.mint(&persona, image.as_ref(), &sink).await;
            drop(sink);
            result
        };
        let log = &mut self.state.log;
        let on_line = &mut on_line;
        let forward = async {
            while let Some(event) = events.recv().await {
                log.push(event.log_line());
                if let Some(line) = log.last() {
                    on_line(line);
                }
            }
        };
        let (result, ()) = tokio::join!(attempt, forward);
        self.state.minting = false;

        match result {
            Ok(receipt) => {
                self.state.log.push("Minted successfully.");
                if let Some(line) = self.state.log.last() {
                    on_line(line);
                }
                self.state.minted = true;
                self.state.pointers = Some(receipt.pointers.clone());
                self.state.last_mint = Some(receipt);
                self.state.confirmation_open = true;
                Outcome::Completed
            }
            Err(e) => self.fail(Error::from(e)),
        }
    }

    /// Open or close the chat panel. Only available once minted.
    pub fn toggle_chat(&mut self) -> bool {
        if !self.state.minted {
            return false;
        }
        self.state.chat_open = !self.state.chat_open;
        true
    }

    /// Relay a chat message. Only while minted with the chat panel open.
    pub async fn send_chat(&mut self, message: &str) {
        if !(self.state.minted && self.state.chat_open) {
            return;
        }
        self.state
            .chat
            .send(&self.relay, self.state.persona.as_ref(), message)
            .await;
    }

    /// Whether leaving may proceed; asks first when work would be lost.
    pub fn leave(&self) -> bool {
        if self.state.generated_once || self.state.persona.is_some() {
            return self.confirm.confirm(LEAVE_PROMPT);
        }
        true
    }

    pub fn close_confirmation(&mut self) {
        self.state.confirmation_open = false;
    }

    /// Shareable address of the current draft (`?draftId=`).
    pub fn share_url(&self) -> Option<String> {
        let draft_id = self.state.draft_id.as_ref()?;
        let mut url = self.share_base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("draftId", draft_id);
        Some(url.to_string())
    }

    fn fail(&mut self, error: Error) -> Outcome {
        let message = error.user_message();
        tracing::warn!(domain = ?error.domain(), "{message}");
        self.state.last_error = Some(message.clone());
        Outcome::Failed(message)
    }
}

/// Eight random base-36 characters.
fn new_draft_id() -> String {
    let mut rng = rand::thread_rng();
    (0..DRAFT_ID_LEN)
        .map(|_| std::char::from_digit(rng.gen_range(0..36), 36).unwrap_or('0'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{CompletionProvider, CompletionRequest, CompletionResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VEX: &str = r#"{"name":"Vex","tagline":"Shadows answer to her.","tags":["rogue"],"longDescription":"A thief of light."}"#;
    const NYX: &str = r#"{"name":"Nyx","tagline":"Night keeps her secrets.","tags":["oracle"],"longDescription":"A seer of dusk."}"#;

    struct Scripted {
        replies: Mutex<Vec<&'static str>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let content = self.replies.lock().unwrap().remove(0);
            Ok(serde_json::from_value(serde_json::json!({
                "choices": [{"message": {"content": content}}]
            }))
            .unwrap())
        }
    }

    fn workflow(replies: Vec<&'static str>, answer: bool) -> (PersonaWorkflow, Arc<Scripted>) {
        let provider = Arc::new(Scripted {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
        });
        let workflow = PersonaWorkflow::new(
            PersonaGenerator::new(provider.clone()),
            ChatRelay::new(provider.clone()),
            Box::new(FixedAnswer(answer)),
            "http://localhost:5173/explore",
        )
        .unwrap();
        (workflow, provider)
    }

    #[test]
    fn draft_ids_are_eight_base36_chars() {
        let id = new_draft_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn generate_requires_input() {
        let (mut workflow, provider) = workflow(vec![], true);
        assert!(!workflow.can_submit());
        assert_eq!(workflow.generate().await, Outcome::Skipped);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generate_sets_persona_draft_and_share_url() {
        let (mut workflow, _) = workflow(vec![VEX], true);
        workflow.set_text("a neon thief");

        assert_eq!(workflow.generate().await, Outcome::Completed);
        let state = workflow.state();
        assert_eq!(state.persona.as_ref().unwrap().name, "Vex");
        assert!(state.generated_once);
        assert!(!state.generating);
        let draft = state.draft_id.clone().unwrap();
        assert_eq!(
            workflow.share_url().unwrap(),
            format!("http://localhost:5173/explore?draftId={draft}")
        );
        assert!(state.log.last().unwrap().ends_with("Persona generated: Vex"));
    }

    #[tokio::test]
    async fn declined_regeneration_keeps_persona_and_draft() {
        let (mut workflow, provider) = workflow(vec![VEX, NYX], false);
        workflow.set_text("a neon thief");
        workflow.generate().await;
        let draft = workflow.state().draft_id.clone();

        assert_eq!(workflow.generate().await, Outcome::Declined);
        assert_eq!(workflow.state().persona.as_ref().unwrap().name, "Vex");
        assert_eq!(workflow.state().draft_id, draft);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn accepted_regeneration_replaces_persona() {
        let (mut workflow, _) = workflow(vec![VEX, NYX], true);
        workflow.set_url("https://example.com/nyx");
        workflow.generate().await;
        assert_eq!(workflow.generate().await, Outcome::Completed);
        assert_eq!(workflow.state().persona.as_ref().unwrap().name, "Nyx");
    }

    #[tokio::test]
    async fn malformed_output_sets_error_and_resets_flag() {
        let (mut workflow, _) = workflow(vec!["not json"], true);
        workflow.set_text("x");
        match workflow.generate().await {
            Outcome::Failed(message) => assert!(message.contains("malformed persona output")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!workflow.state().generating);
        assert!(workflow.state().persona.is_none());
        assert!(workflow.state().last_error.is_some());
    }

    #[tokio::test]
    async fn chat_is_gated_on_mint() {
        let (mut workflow, _) = workflow(vec![VEX], true);
        assert!(!workflow.toggle_chat());
        assert!(!workflow.state().chat_open);
        workflow.set_text("a neon thief");
        workflow.generate().await;
        assert!(!workflow.toggle_chat());
    }

    #[tokio::test]
    async fn chat_before_mint_sends_nothing() {
        let (mut workflow, provider) = workflow(vec![VEX, "Hello, stranger."], true);
        workflow.set_text("a neon thief");
        workflow.generate().await;

        workflow.send_chat("hi").await;
        workflow.state.chat_open = true;
        workflow.send_chat("hi").await;
        assert!(workflow.state().chat.entries().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        workflow.state.minted = true;
        workflow.state.chat_open = false;
        workflow.send_chat("hi").await;
        assert!(workflow.state().chat.entries().is_empty());

        workflow.state.chat_open = true;
        workflow.send_chat("hi").await;
        assert_eq!(workflow.state().chat.entries().len(), 2);
        assert_eq!(workflow.state().chat.entries()[1].content, "Hello, stranger.");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mint_without_orchestrator_fails_with_config_message() {
        let (mut workflow, _) = workflow(vec![VEX], true);
        assert_eq!(workflow.mint().await, Outcome::Skipped);

        workflow.set_text("a neon thief");
        workflow.generate().await;
        match workflow.mint().await {
            Outcome::Failed(message) => assert!(message.contains("INFT_CONTRACT_ADDRESS")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!workflow.state().minting);
    }

    #[test]
    fn leave_asks_only_with_content() {
        let (workflow, _) = workflow(vec![], false);
        assert!(workflow.leave());
    }

    #[test]
    fn close_confirmation_clears_surface() {
        let (mut workflow, _) = workflow(vec![], true);
        workflow.state.confirmation_open = true;
        workflow.close_confirmation();
        assert!(!workflow.state().confirmation_open);
    }
}
