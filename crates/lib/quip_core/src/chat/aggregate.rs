//! Folding streamed chunks into one logical response.

use futures_util::{Stream, StreamExt, stream};

use super::{ChatResponse, Generation, ResponseMetadata};

/// Accumulates streamed [`ChatResponse`] chunks.
///
/// Text is concatenated in arrival order. The last non-empty finish reason
/// and the last reported usage win; id, model and creation time come from
/// the first chunk that carries them.
#[derive(Debug, Default)]
pub struct MessageAggregator {
    content: String,
    saw_result: bool,
    finish_reason: Option<String>,
    metadata: ResponseMetadata,
    chunks: usize,
}

impl MessageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &ChatResponse) {
        self.chunks += 1;

        if let Some(generation) = &chunk.result {
            self.saw_result = true;
            self.content.push_str(&generation.content);
            if let Some(reason) = generation.finish_reason.as_deref().filter(|r| !r.is_empty()) {
                self.finish_reason = Some(reason.to_string());
            }
        }

        let meta = &chunk.metadata;
        if self.metadata.id.is_none() {
            self.metadata.id.clone_from(&meta.id);
        }
        if self.metadata.model.is_none() {
            self.metadata.model.clone_from(&meta.model);
        }
        if self.metadata.created.is_none() {
            self.metadata.created = meta.created;
        }
        if meta.usage.is_some() {
            self.metadata.usage = meta.usage;
        }
    }

    /// Number of chunks folded so far.
    pub fn len(&self) -> usize {
        self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    pub fn finish(self) -> ChatResponse {
        let result = self.saw_result.then(|| Generation {
            content: self.content,
            finish_reason: self.finish_reason,
        });
        ChatResponse::new(result, self.metadata)
    }
}

impl<'a> Extend<&'a ChatResponse> for MessageAggregator {
    fn extend<I: IntoIterator<Item = &'a ChatResponse>>(&mut self, iter: I) {
        for chunk in iter {
            self.push(chunk);
        }
    }
}

/// State carried between polls of [`aggregate_stream`].
struct FoldState<S, F> {
    inner: S,
    /// `None` once an error has been seen; the aggregate is then abandoned.
    acc: Option<MessageAggregator>,
    on_complete: Option<F>,
}

/// Forward every item of `inner` unchanged while folding the chunks.
///
/// `on_complete` receives the aggregated response once, after `inner`
/// reports its end. It never runs if the returned stream is dropped early or
/// if `inner` yielded an error.
pub fn aggregate_stream<S, E, F>(
    inner: S,
    on_complete: F,
) -> impl Stream<Item = Result<ChatResponse, E>>
where
    S: Stream<Item = Result<ChatResponse, E>> + Unpin,
    F: FnOnce(ChatResponse),
{
    let state = FoldState {
        inner,
        acc: Some(MessageAggregator::new()),
        on_complete: Some(on_complete),
    };

    stream::unfold(state, |mut state| async move {
        match state.inner.next().await {
            Some(Ok(chunk)) => {
                if let Some(acc) = state.acc.as_mut() {
                    acc.push(&chunk);
                }
                Some((Ok(chunk), state))
            }
            Some(Err(e)) => {
                state.acc = None;
                Some((Err(e), state))
            }
            None => {
                if let (Some(acc), Some(done)) = (state.acc.take(), state.on_complete.take()) {
                    done(acc.finish());
                }
                None
            }
        }
    })
}
