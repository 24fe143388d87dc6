// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory chat history, keyed by user and conversation.
//!
//! History lives only in this process and is lost on restart.

use crate::services::openai::ChatMessage;
use dashmap::DashMap;
use std::sync::Arc;

/// Maximum messages kept per conversation (oldest dropped first).
pub const MAX_HISTORY: usize = 20;

pub const SYSTEM_PROMPT: &str = "You are Learnrithm AI, a patient tutor. \
Explain concepts step by step, check the learner's understanding, \
and keep answers focused on the question asked.";

/// Conversation store shared across requests.
#[derive(Clone, Default)]
pub struct ChatHistory {
    conversations: Arc<DashMap<(String, String), Vec<ChatMessage>>>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompt for a new message: system prompt, stored history, then the
    /// message itself, capped at [`MAX_HISTORY`] turns. Nothing is stored.
    pub fn prompt(
        &self,
        user_id: &str,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Vec<ChatMessage> {
        let mut turns = self.get(user_id, conversation_id);
        push_capped(&mut turns, message.clone());

        let mut prompt = Vec::with_capacity(turns.len() + 1);
        prompt.push(ChatMessage::system(SYSTEM_PROMPT));
        prompt.extend(turns);
        prompt
    }

    /// Store a completed question and reply together.
    pub fn record_exchange(
        &self,
        user_id: &str,
        conversation_id: &str,
        question: ChatMessage,
        reply: ChatMessage,
    ) {
        let mut entry = self
            .conversations
            .entry((user_id.to_string(), conversation_id.to_string()))
            .or_default();
        push_capped(&mut entry, question);
        push_capped(&mut entry, reply);
    }

    /// Messages of one conversation (without the system prompt).
    pub fn get(&self, user_id: &str, conversation_id: &str) -> Vec<ChatMessage> {
        self.conversations
            .get(&(user_id.to_string(), conversation_id.to_string()))
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Remove a conversation. Returns whether it existed.
    pub fn clear(&self, user_id: &str, conversation_id: &str) -> bool {
        self.conversations
            .remove(&(user_id.to_string(), conversation_id.to_string()))
            .is_some()
    }

    /// Remove every conversation of a user (account deletion).
    pub fn clear_user(&self, user_id: &str) {
        self.conversations.retain(|(owner, _), _| owner != user_id);
    }
}

fn push_capped(history: &mut Vec<ChatMessage>, message: ChatMessage) {
    history.push(message);
    if history.len() > MAX_HISTORY {
        let excess = history.len() - MAX_HISTORY;
        history.drain(..excess);
    }
}
