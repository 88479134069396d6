//! HTTP client for the upstream movies service.

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::time::Duration;

use crate::decode::JsonArrayDecoder;
use crate::error::GatewayError;
use crate::types::Movie;

/// A lazy, non-restartable stream of decoded movie records.
pub type MovieStream = BoxStream<'static, Result<Movie, GatewayError>>;

/// Client for the upstream movies service.
///
/// Wraps a shared [`reqwest::Client`], so the connection pool is reused
/// across requests and clones.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Create a client for the given base URL with a bounded per-request
    /// timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// The configured upstream base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client, for reverse-proxy forwards.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch the movie list as a lazy stream.
    ///
    /// Records are decoded incrementally as body chunks arrive; the stream
    /// yields each movie in upstream delivery order. A malformed record
    /// yields `Err(Decode)` for that item only and the stream continues. A
    /// connect failure, non-success status, or timeout fails the whole call
    /// before any item is produced. The stream is not restartable.
    pub async fn fetch_movies(&self) -> Result<MovieStream, GatewayError> {
        let response = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(GatewayError::from_upstream)?
            .error_for_status()
            .map_err(GatewayError::from_upstream)?;

        Ok(decode_movies(response.bytes_stream()).boxed())
    }
}

/// Turn a chunked byte stream into a stream of decoded movies.
///
/// The source stream is terminated with a `None` sentinel so the framing
/// decoder can flush a trailing element once the body ends.
fn decode_movies(
    bytes: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send,
) -> impl Stream<Item = Result<Movie, GatewayError>> + Send {
    bytes
        .map(Some)
        .chain(stream::once(async { None }))
        .scan(JsonArrayDecoder::new(), |decoder, chunk| {
            let items: Vec<Result<Movie, GatewayError>> = match chunk {
                Some(Ok(chunk)) => decoder
                    .feed(&chunk)
                    .into_iter()
                    .map(|raw| decode_movie(&raw))
                    .collect(),
                // A transport failure mid-body ends the stream; the caller
                // has already committed to a response status by now
                Some(Err(e)) => vec![Err(GatewayError::from_upstream(e))],
                None => decoder
                    .finish()
                    .map(|raw| decode_movie(&raw))
                    .into_iter()
                    .collect(),
            };
            futures::future::ready(Some(stream::iter(items)))
        })
        .flatten()
}

fn decode_movie(raw: &[u8]) -> Result<Movie, GatewayError> {
    serde_json::from_slice(raw).map_err(GatewayError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c))))
    }

    #[tokio::test]
    async fn test_decodes_movies_in_order() {
        let movies: Vec<_> = decode_movies(chunked(vec![
            br#"[{"id":"1","title":"Jaws"},"#,
            br#"{"id":"2","title":"Alien"}]"#,
        ]))
        .collect()
        .await;

        let titles: Vec<_> = movies
            .into_iter()
            .map(|m| m.unwrap().title.unwrap())
            .collect();
        assert_eq!(titles, vec!["Jaws", "Alien"]);
    }

    #[tokio::test]
    async fn test_malformed_record_fails_alone() {
        let results: Vec<_> = decode_movies(chunked(vec![
            br#"[{"title":"Jaws"},{"title":},{"title":"Alien"}]"#,
        ]))
        .collect()
        .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(GatewayError::Decode(_))));
        assert!(results[2].is_ok(), "stream continues past a bad record");
    }

    #[tokio::test]
    async fn test_movies_yielded_before_stream_ends() {
        // First chunk completes one element; it must come out without
        // waiting for the closing bracket
        let stream = decode_movies(chunked(vec![
            br#"[{"title":"Jaws"},"#,
            br#"{"title":"Alien"}]"#,
        ]));
        futures::pin_mut!(stream);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.title.as_deref(), Some("Jaws"));
    }

    #[tokio::test]
    async fn test_empty_upstream_body() {
        let results: Vec<_> = decode_movies(chunked(vec![b"[]"])).collect().await;
        assert!(results.is_empty());
    }
}
