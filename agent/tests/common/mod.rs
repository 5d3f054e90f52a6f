#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use hyperfocus_core::{Completion, LLMRequest, LanguageModel, ToolCall};
use serde_json::Value;

/// Replies shared by every backend role, plus a log of which role answered what.
#[derive(Clone, Default)]
pub struct Script {
    replies: Arc<Mutex<VecDeque<Completion>>>,
    log: Arc<Mutex<Vec<(&'static str, LLMRequest)>>>,
}

impl Script {
    pub fn new(replies: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            log: Arc::default(),
        }
    }

    /// A backend answering from this script under `role`.
    pub fn backend(&self, role: &'static str) -> Scripted {
        Scripted {
            role,
            script: self.clone(),
            refuse: |_| false,
        }
    }

    /// Like [`Script::backend`], but fails every request matching `refuse`
    /// without consuming a reply.
    pub fn refusing(&self, role: &'static str, refuse: fn(&LLMRequest) -> bool) -> Scripted {
        Scripted {
            role,
            script: self.clone(),
            refuse,
        }
    }

    /// Roles in the order they answered.
    pub fn roles(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().iter().map(|(role, _)| *role).collect()
    }

    /// Request number `index`.
    pub fn request(&self, index: usize) -> LLMRequest {
        self.log.lock().unwrap()[index].1.clone()
    }
}

#[derive(Clone)]
pub struct Scripted {
    role: &'static str,
    script: Script,
    refuse: fn(&LLMRequest) -> bool,
}

impl LanguageModel for Scripted {
    type Error = io::Error;

    async fn respond(&self, request: LLMRequest) -> Result<Completion, Self::Error> {
        let refused = (self.refuse)(&request);
        self.script.log.lock().unwrap().push((self.role, request));
        if refused {
            return Err(io::Error::other("backend down"));
        }
        Ok(self
            .script
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Completion::text("done")))
    }
}

/// Answers page prompts with the number of data lines it was given.
/// Fails any page containing `FAIL`.
#[derive(Clone, Default)]
pub struct LineCounter {
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl LanguageModel for LineCounter {
    type Error = io::Error;

    async fn respond(&self, request: LLMRequest) -> Result<Completion, Self::Error> {
        let prompt = request.messages().last().map(|m| m.content().to_owned()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());
        let data = prompt.split("Data to process:\n").nth(1).unwrap_or_default();
        if data.contains("FAIL") {
            return Err(io::Error::other("model refused the page"));
        }
        Ok(Completion::text(data.lines().count().to_string()))
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> Completion {
    Completion::text("").with_tool_call(ToolCall::new(id, name, arguments))
}
