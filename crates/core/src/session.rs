use crate::llm::{Message, Role};
use crate::model::Model;

/// Conversation transcript plus the credential and model picked for it.
///
/// Messages are only appended through [`crate::turn::Turn`], which keeps the
/// user/assistant alternation intact.
#[derive(Clone, Debug, Default)]
pub struct Session {
    messages: Vec<Message>,
    credential: String,
    model: Model,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: Model) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn set_credential<S: Into<String>>(&mut self, credential: S) {
        self.credential = credential.into();
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    pub fn is_ready(&self) -> bool {
        !self.credential.is_empty()
    }

    /// Clears the transcript. Credential and model stay selected.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub(crate) fn push(&mut self, role: Role, content: String) {
        self.messages.push(Message { role, content });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_without_credential() {
        let s = Session::new();
        assert!(s.messages().is_empty());
        assert!(!s.is_ready());
        assert_eq!(s.model(), Model::Llama3_8b8192);
    }

    #[test]
    fn reset_keeps_selections() {
        let mut s = Session::with_model(Model::Gemma2_9bIt);
        s.set_credential("gsk_test");
        s.push(Role::User, "hi".into());
        s.push(Role::Assistant, "hello".into());
        s.reset();
        assert!(s.messages().is_empty());
        assert_eq!(s.credential(), "gsk_test");
        assert_eq!(s.model(), Model::Gemma2_9bIt);
        assert!(s.is_ready());
    }
}
