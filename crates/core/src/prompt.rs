use crate::llm::{ChatError, Message, Role};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant powered by Groq. Answer questions clearly and concisely.";
pub const QUESTION_VAR: &str = "question";

/// Ordered role/text pairs; text may contain `{name}` placeholders.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatPromptTemplate {
    turns: Vec<(Role, String)>,
}

impl ChatPromptTemplate {
    pub fn from_messages<I, S>(turns: I) -> Self
    where
        I: IntoIterator<Item = (Role, S)>,
        S: Into<String>,
    {
        Self {
            turns: turns.into_iter().map(|(r, t)| (r, t.into())).collect(),
        }
    }

    /// System instruction followed by the user's question.
    pub fn question_answer() -> Self {
        Self::from_messages([
            (Role::System, SYSTEM_PROMPT.to_string()),
            (Role::User, format!("{{{}}}", QUESTION_VAR)),
        ])
    }

    pub fn render(&self, vars: &[(&str, &str)]) -> Result<Vec<Message>, ChatError> {
        self.turns
            .iter()
            .map(|(role, text)| {
                Ok(Message {
                    role: role.clone(),
                    content: substitute(text, vars)?,
                })
            })
            .collect()
    }
}

// `{{` and `}}` escape literal braces.
fn substitute(text: &str, vars: &[(&str, &str)]) -> Result<String, ChatError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(ChatError::Template(format!(
                                "unterminated placeholder '{{{}'",
                                name
                            )))
                        }
                    }
                }
                let name = name.trim();
                let value = vars
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| ChatError::Template(format!("missing variable '{}'", name)))?;
                out.push_str(value);
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_answer_renders_two_turns() {
        let t = ChatPromptTemplate::question_answer();
        let msgs = t.render(&[(QUESTION_VAR, "What is LangChain?")]).unwrap();
        assert_eq!(
            msgs,
            vec![
                Message::system(SYSTEM_PROMPT),
                Message::user("What is LangChain?"),
            ]
        );
    }

    #[test]
    fn value_braces_are_not_reinterpreted() {
        let t = ChatPromptTemplate::question_answer();
        let msgs = t.render(&[(QUESTION_VAR, "fn main() { {x} }")]).unwrap();
        assert_eq!(msgs[1].content, "fn main() { {x} }");
    }

    #[test]
    fn missing_variable_is_template_error() {
        let t = ChatPromptTemplate::question_answer();
        let err = t.render(&[]).unwrap_err();
        assert_eq!(err, ChatError::Template("missing variable 'question'".into()));
    }

    #[test]
    fn escaped_braces_render_literally() {
        let t = ChatPromptTemplate::from_messages([(Role::User, "{{json}} for {q}")]);
        let msgs = t.render(&[("q", "me")]).unwrap();
        assert_eq!(msgs[0].content, "{json} for me");
    }

    #[test]
    fn unterminated_placeholder_fails() {
        let t = ChatPromptTemplate::from_messages([(Role::User, "hello {q")]);
        assert!(matches!(t.render(&[("q", "x")]), Err(ChatError::Template(_))));
    }
}
