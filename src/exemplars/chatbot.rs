//! Multi-turn chat.
//!
//! [ChatSession] keeps one conversation in memory for as long as the session lives. [Chatbot] keeps many
//! conversations keyed by thread id in a shared [MemoryCheckpointer] and can stream its replies.
//!
//! Before every call the conversation can be cut to a [ContextWindow]: the oldest messages are dropped
//! first and the system message is always kept.

use std::collections::HashMap;
use std::iter;
use std::sync::Arc;
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use log::{debug, info};
use tokio::sync::RwLock;
use crate::pipeline::PipelineError;
use crate::utils::llm::{chat_reply, non_empty, ChatMessage, Generate};
use crate::utils::token::tiktoken::Tiktoken;
use crate::utils::token::{truncate_messages, CountToken};

/// A token budget for the messages sent to the endpoint.
#[derive(Clone)]
pub struct ContextWindow {
    counter: Arc<dyn CountToken + Send + Sync>,
    pub max_tokens: usize,
}

impl ContextWindow {
    pub fn new(counter: impl CountToken + Send + Sync + 'static, max_tokens: usize) -> Self {
        Self {
            counter: Arc::new(counter),
            max_tokens,
        }
    }

    /// Counts with the tokenizer of `model` and leaves `reserved` tokens of its context for the reply.
    pub fn for_model(model: &str, reserved: usize) -> anyhow::Result<Self> {
        let tiktoken = Tiktoken::new(model)?;
        let max_tokens = tiktoken.max_tokens.saturating_sub(reserved);
        Ok(Self::new(tiktoken, max_tokens))
    }

    pub fn fit(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        truncate_messages(self.counter.as_ref(), messages, self.max_tokens)
    }
}

fn user_message(input: &str) -> Result<ChatMessage, PipelineError> {
    if input.trim().is_empty() {
        return Err(PipelineError::input("Please enter a message"));
    }
    Ok(ChatMessage::user(input))
}

/// System message, then history, then the new user message, cut to the context window if there is one.
fn compose(system_message: Option<&ChatMessage>,
           history: &[ChatMessage],
           user: &ChatMessage,
           context: Option<&ContextWindow>) -> Result<Vec<ChatMessage>, PipelineError> {
    let messages: Vec<ChatMessage> = system_message
        .into_iter()
        .chain(history)
        .chain(iter::once(user))
        .cloned()
        .collect();
    let Some(context) = context else {
        return Ok(messages);
    };
    let fitted = context.fit(&messages);
    if fitted.last() != Some(user) {
        return Err(PipelineError::input(format!("message does not fit in the context window of {} tokens", context.max_tokens)));
    }
    if fitted.len() < messages.len() {
        debug!("dropped {} old messages to fit the context window", messages.len() - fitted.len());
    }
    Ok(fitted)
}

/// One in-memory conversation.
pub struct ChatSession {
    endpoint: Arc<dyn Generate>,
    system_message: Option<ChatMessage>,
    context: Option<ContextWindow>,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(endpoint: Arc<dyn Generate>) -> Self {
        Self {
            endpoint,
            system_message: None,
            context: None,
            history: Vec::new(),
        }
    }

    pub fn with_system_message(mut self, content: impl Into<String>) -> Self {
        self.system_message = Some(ChatMessage::system(content));
        self
    }

    pub fn with_context_window(mut self, context: ContextWindow) -> Self {
        self.context = Some(context);
        self
    }

    /// User and assistant messages so far, oldest first. The system message is not part of the history.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Sends one user message and returns the reply. The exchange is only recorded if the call succeeds.
    pub async fn send(&mut self, input: &str) -> Result<String, PipelineError> {
        let user = user_message(input)?;
        let messages = compose(self.system_message.as_ref(), &self.history, &user, self.context.as_ref())?;
        let reply = chat_reply(self.endpoint.as_ref(), &messages).await?;
        self.history.push(user);
        self.history.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }
}

/// Conversations keyed by thread id, kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of a thread, oldest first. Unknown threads are empty.
    pub async fn history(&self, thread_id: &str) -> Vec<ChatMessage> {
        self.threads.read().await.get(thread_id).cloned().unwrap_or_default()
    }

    pub async fn commit(&self, thread_id: &str, messages: impl IntoIterator<Item=ChatMessage>) {
        let mut threads = self.threads.write().await;
        threads.entry(thread_id.to_string()).or_default().extend(messages);
    }

    /// Known thread ids, sorted.
    pub async fn threads(&self) -> Vec<String> {
        let mut thread_ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        thread_ids.sort();
        thread_ids
    }

    /// Returns whether the thread existed.
    pub async fn forget(&self, thread_id: &str) -> bool {
        self.threads.write().await.remove(thread_id).is_some()
    }
}

/// Chat over checkpointed threads.
pub struct Chatbot {
    endpoint: Arc<dyn Generate>,
    checkpointer: Arc<MemoryCheckpointer>,
    system_message: Option<ChatMessage>,
    context: Option<ContextWindow>,
}

impl Chatbot {
    pub fn new(endpoint: Arc<dyn Generate>, checkpointer: Arc<MemoryCheckpointer>) -> Self {
        Self {
            endpoint,
            checkpointer,
            system_message: None,
            context: None,
        }
    }

    pub fn with_system_message(mut self, content: impl Into<String>) -> Self {
        self.system_message = Some(ChatMessage::system(content));
        self
    }

    pub fn with_context_window(mut self, context: ContextWindow) -> Self {
        self.context = Some(context);
        self
    }

    pub fn checkpointer(&self) -> &MemoryCheckpointer {
        &self.checkpointer
    }

    async fn prepare(&self, thread_id: &str, user: &ChatMessage) -> Result<Vec<ChatMessage>, PipelineError> {
        let history = self.checkpointer.history(thread_id).await;
        compose(self.system_message.as_ref(), &history, user, self.context.as_ref())
    }

    /// One turn on a thread. The exchange is committed once the reply is complete.
    pub async fn turn(&self, thread_id: &str, input: &str) -> Result<String, PipelineError> {
        let user = user_message(input)?;
        let messages = self.prepare(thread_id, &user).await?;
        let reply = chat_reply(self.endpoint.as_ref(), &messages).await?;
        self.checkpointer.commit(thread_id, [user, ChatMessage::assistant(reply.clone())]).await;
        info!("thread {}: turn committed", thread_id);
        Ok(reply)
    }

    /// Like [Chatbot::turn], but yields the reply chunk by chunk. The exchange is committed after the last
    /// chunk; a stream that fails or is dropped early commits nothing.
    pub fn stream_turn<'a>(&'a self,
                           thread_id: &'a str,
                           input: &'a str) -> impl Stream<Item=Result<String, PipelineError>> + 'a {
        try_stream! {
            let user = user_message(input)?;
            let messages = self.prepare(thread_id, &user).await?;
            let mut chunks = self.endpoint.chat_stream(&messages).await.map_err(PipelineError::from)?;
            let mut reply = String::new();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(PipelineError::from)?;
                reply.push_str(&chunk);
                yield chunk;
            }
            let reply = non_empty(reply).map_err(PipelineError::from)?;
            self.checkpointer.commit(thread_id, [user, ChatMessage::assistant(reply)]).await;
            info!("thread {}: streamed turn committed", thread_id);
        }
    }
}

#[cfg(test)]
mod test_chatbot {
    use std::sync::Arc;
    use futures::{pin_mut, StreamExt};
    use super::{ChatSession, Chatbot, ContextWindow, MemoryCheckpointer};
    use crate::pipeline::PipelineError;
    use crate::testing::ScriptedEndpoint;
    use crate::utils::llm::{ChatMessage, GenerationError, Role};
    use crate::utils::token::count_tokens_by_len;

    fn endpoint() -> Arc<ScriptedEndpoint> {
        Arc::new(ScriptedEndpoint::new()
            .fail("please fail")
            .reply("hello", "hi there friend")
            .reply("again", "welcome back")
            .reply("silence", "  "))
    }

    #[tokio::test]
    async fn test_session_keeps_history() {
        let endpoint = endpoint();
        let mut session = ChatSession::new(endpoint.clone()).with_system_message("be brief");
        assert_eq!("hi there friend", session.send("hello").await.unwrap());
        assert_eq!("welcome back", session.send("again").await.unwrap());

        let calls = endpoint.calls();
        assert_eq!(vec![ChatMessage::system("be brief"), ChatMessage::user("hello")], calls[0]);
        assert_eq!(4, calls[1].len());
        assert_eq!(ChatMessage::assistant("hi there friend"), calls[1][2]);
        assert_eq!(4, session.history().len());

        session.clear();
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_session_failures_leave_history_untouched() {
        let endpoint = endpoint();
        let mut session = ChatSession::new(endpoint.clone());
        assert!(matches!(session.send("   ").await, Err(PipelineError::Input(_))));
        assert!(endpoint.calls().is_empty());
        assert!(matches!(session.send("please fail").await, Err(PipelineError::Generation(_))));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_error() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let mut session = ChatSession::new(endpoint());
        assert!(matches!(session.send("silence").await, Err(PipelineError::Generation(GenerationError::EmptyReply))));
        assert!(session.history().is_empty());

        let chatbot = Chatbot::new(endpoint(), checkpointer.clone());
        assert!(matches!(chatbot.turn("t", "silence").await, Err(PipelineError::Generation(GenerationError::EmptyReply))));
        let items: Vec<_> = chatbot.stream_turn("t", "silence").collect().await;
        assert!(matches!(items.last(), Some(Err(PipelineError::Generation(GenerationError::EmptyReply)))));
        assert!(checkpointer.threads().await.is_empty());
    }

    #[tokio::test]
    async fn test_context_window_drops_oldest_keeps_system() {
        let endpoint = endpoint();
        // "sys" costs 3 + 3, "hello" 5 + 3, "hi there friend" 15 + 3, "again" 5 + 3
        let mut session = ChatSession::new(endpoint.clone())
            .with_system_message("sys")
            .with_context_window(ContextWindow::new(count_tokens_by_len, 35));
        session.send("hello").await.unwrap();
        session.send("again").await.unwrap();

        let last_call = endpoint.calls().pop().unwrap();
        assert_eq!(vec![ChatMessage::system("sys"), ChatMessage::assistant("hi there friend"), ChatMessage::user("again")],
                   last_call);
        assert_eq!(4, session.history().len());
    }

    #[tokio::test]
    async fn test_message_larger_than_window() {
        let mut session = ChatSession::new(endpoint()).with_context_window(ContextWindow::new(count_tokens_by_len, 4));
        assert!(matches!(session.send("hello").await, Err(PipelineError::Input(_))));
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let endpoint = endpoint();
        let chatbot = Chatbot::new(endpoint.clone(), checkpointer.clone());
        chatbot.turn("a", "hello").await.unwrap();
        chatbot.turn("b", "hello").await.unwrap();
        chatbot.turn("a", "again").await.unwrap();

        assert_eq!(4, checkpointer.history("a").await.len());
        assert_eq!(2, checkpointer.history("b").await.len());
        assert_eq!(vec!["a", "b"], checkpointer.threads().await);
        assert_eq!(3, endpoint.calls()[2].len());

        assert!(chatbot.checkpointer().forget("a").await);
        assert!(!checkpointer.forget("a").await);
        assert!(checkpointer.history("a").await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_turn_commits_after_completion() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let chatbot = Chatbot::new(endpoint(), checkpointer.clone());
        let stream = chatbot.stream_turn("t", "hello");
        pin_mut!(stream);
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.unwrap());
        }
        assert_eq!(vec!["hi ", "there ", "friend"], chunks);

        let history = checkpointer.history("t").await;
        assert_eq!(2, history.len());
        assert_eq!(Role::User, history[0].role);
        assert_eq!(ChatMessage::assistant("hi there friend"), history[1]);
    }

    #[tokio::test]
    async fn test_failed_stream_commits_nothing() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let chatbot = Chatbot::new(endpoint(), checkpointer.clone());
        let items: Vec<_> = chatbot.stream_turn("t", "please fail").collect().await;
        assert_eq!(1, items.len());
        assert!(matches!(items[0], Err(PipelineError::Generation(_))));
        assert!(checkpointer.threads().await.is_empty());
    }
}
