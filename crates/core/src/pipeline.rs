use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::{future, stream, Stream, StreamExt};
use tracing::{debug, info};

use crate::llm::{ChatDelta, ChatError, ChatOpts, ChatStream, ModelClient};
use crate::model::Model;
use crate::prompt::{ChatPromptTemplate, QUESTION_VAR};

pub const TEMPERATURE: f32 = 0.7;

/// Plain-text fragments of one answer, ending at the provider's finish signal.
pub type TextStream<'a> = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + 'a>>;

/// Template, remote model and text extraction chained together.
pub struct Pipeline<C> {
    template: ChatPromptTemplate,
    client: C,
    opts: ChatOpts,
}

impl<C: ModelClient> Pipeline<C> {
    pub fn new(template: ChatPromptTemplate, client: C, model: Model) -> Self {
        Self {
            template,
            client,
            opts: ChatOpts {
                model: model.id().to_string(),
                temperature: Some(TEMPERATURE),
            },
        }
    }

    pub fn model(&self) -> &str {
        &self.opts.model
    }

    /// Renders the prompt and streams the answer text. Template and request
    /// errors arrive as the first (and only) item.
    pub fn stream<'a>(&'a self, vars: &[(&str, &str)]) -> TextStream<'a> {
        let msgs = match self.template.render(vars) {
            Ok(m) => m,
            Err(e) => return Box::pin(stream::once(future::ready(Err(e)))),
        };
        let opts = self.opts.clone();
        debug!(target: "core::pipeline", "stream start model={} turns={}", opts.model, msgs.len());
        let started = async move { self.client.stream_chat(msgs, opts).await };
        Box::pin(stream::once(started).flat_map(|res| match res {
            Ok(deltas) => extract_text(deltas).left_stream(),
            Err(e) => stream::once(future::ready(Err(e))).right_stream(),
        }))
    }

    /// Streams the answer to `question`, handing each fragment to `sink`.
    /// Stops quietly once `sink` returns false; the first error ends the answer.
    pub async fn answer<F>(&self, question: &str, mut sink: F) -> Result<(), ChatError>
    where
        F: FnMut(String) -> bool,
    {
        let mut s = self.stream(&[(QUESTION_VAR, question)]);
        while let Some(item) = s.next().await {
            if !sink(item?) {
                debug!(target: "core::pipeline", "answer abandoned by receiver");
                break;
            }
        }
        Ok(())
    }
}

fn extract_text(deltas: ChatStream<'_>) -> impl Stream<Item = Result<String, ChatError>> + '_ {
    deltas
        .take_while(|d| future::ready(!matches!(d, Ok(ChatDelta::Finish(_)))))
        .filter_map(|d| {
            future::ready(match d {
                Ok(ChatDelta::Text(t)) if !t.is_empty() => Some(Ok(t)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        })
}

type ClientFactory<C> = Box<dyn Fn(&str, Model) -> Result<C, ChatError>>;

/// Builds pipelines on demand and keeps one per (credential, model).
pub struct PipelineCache<C> {
    factory: ClientFactory<C>,
    entries: HashMap<(String, Model), Arc<Pipeline<C>>>,
}

impl<C: ModelClient> PipelineCache<C> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&str, Model) -> Result<C, ChatError> + 'static,
    {
        Self {
            factory: Box::new(factory),
            entries: HashMap::new(),
        }
    }

    /// `Ok(None)` when no credential has been entered yet.
    pub fn build(
        &mut self,
        credential: &str,
        model: Model,
    ) -> Result<Option<Arc<Pipeline<C>>>, ChatError> {
        if credential.is_empty() {
            return Ok(None);
        }
        let key = (credential.to_string(), model);
        if let Some(p) = self.entries.get(&key) {
            return Ok(Some(Arc::clone(p)));
        }
        let client = (self.factory)(credential, model)?;
        let pipeline = Arc::new(Pipeline::new(
            ChatPromptTemplate::question_answer(),
            client,
            model,
        ));
        info!(target: "core::pipeline", "built pipeline model={} cached={}", model, self.entries.len() + 1);
        self.entries.insert(key, Arc::clone(&pipeline));
        Ok(Some(pipeline))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
