use crate::provider::{Message, Role};

/// Completed exchanges, replayed into every request.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    exchanges: Vec<Exchange>,
}

#[derive(Debug, Clone)]
struct Exchange {
    input: String,
    reply: String,
}

impl ConversationMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a completed exchange. Exchanges with an empty reply are
    /// dropped so the history keeps strict user/assistant alternation.
    pub fn record(&mut self, input: impl Into<String>, reply: impl Into<String>) {
        let reply = reply.into();
        if reply.trim().is_empty() {
            return;
        }
        self.exchanges.push(Exchange {
            input: input.into(),
            reply,
        });
    }

    /// History as alternating user/assistant messages.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.exchanges
            .iter()
            .flat_map(|exchange| {
                [
                    Message::text(Role::User, exchange.input.clone()),
                    Message::text(Role::Assistant, exchange.reply.clone()),
                ]
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}
