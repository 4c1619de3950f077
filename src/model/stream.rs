//! Streaming responses: server-sent event decoding and fragment collection.

use eventsource_stream::{EventStreamError, Eventsource};
use futures::future;
use futures::stream::{BoxStream, Stream};
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;

use super::client::ModelError;

/// Ordered text fragments of one model response.
pub type FragmentStream = BoxStream<'static, Result<String, ModelError>>;

/// Concatenate all fragments of a stream in order.
///
/// Fails with the first fragment error; partial text is discarded.
pub async fn collect_response(mut stream: FragmentStream) -> Result<String, ModelError> {
    let mut response = String::new();
    while let Some(fragment) = stream.next().await {
        response.push_str(&fragment?);
    }
    Ok(response)
}

/// Marks the end of a chat completion event stream.
const DONE_MARKER: &str = "[DONE]";

/// Turn a `text/event-stream` body into text fragments.
///
/// Stops at the `[DONE]` event; the first transport or decoding error ends
/// the stream.
pub fn event_fragments<S, B>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    body.eventsource()
        .map(|event| match event {
            Ok(event) => Ok(event.data),
            Err(EventStreamError::Transport(e)) => Err(ModelError::from(e)),
            Err(e) => Err(ModelError::ParseError(e.to_string())),
        })
        .try_take_while(|data| future::ready(Ok::<_, ModelError>(data != DONE_MARKER)))
        .try_filter_map(|data| {
            future::ready(if data.is_empty() {
                Ok(None)
            } else {
                parse_chunk(&data)
            })
        })
        .boxed()
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the text delta of a chat completion chunk, if any.
pub fn parse_chunk(data: &str) -> Result<Option<String>, ModelError> {
    let chunk: ChunkResponse =
        serde_json::from_str(data).map_err(|e| ModelError::ParseError(e.to_string()))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}
