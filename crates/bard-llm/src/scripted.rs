//! Chat model that replays queued replies.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use bard_core::{BardError, ChatModel, ChatRequest, Provider, Result};

enum Reply {
    Text(String),
    Failure(String),
}

/// Replays queued replies in order and records every request it receives.
pub struct ScriptedModel {
    provider: Provider,
    model: String,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            model: "scripted".to_string(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Model whose replies are `replies`, in order.
    pub fn with_replies<I, S>(provider: Provider, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new(provider);
        for reply in replies {
            model.push_reply(reply);
        }
        model
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Reply::Text(reply.into()));
        }
    }

    /// Queue a call that fails with a model error.
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Reply::Failure(message.into()));
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests
            .lock()
            .map_err(|e| BardError::internal(e.to_string()))?
            .push(request.clone());

        let next = self
            .replies
            .lock()
            .map_err(|e| BardError::internal(e.to_string()))?
            .pop_front();

        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Failure(message)) => Err(BardError::llm("scripted", message)),
            None => Err(BardError::llm("scripted", "No scripted reply left")),
        }
    }
}
