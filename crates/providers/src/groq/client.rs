use crate::groq::config::GroqConfig;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use qa_core::llm::{ChatDelta, ChatError, ChatOpts, ChatStream, Message, ModelClient, Role};
use reqwest::{header, Client, StatusCode};
use std::time::Instant;
use tokio::time::Duration;
use tracing::{debug, error, info};

/// Streaming chat client for Groq's OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    cfg: GroqConfig,
}

impl GroqClient {
    pub fn new(cfg: GroqConfig, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", api_key))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .timeout(cfg.timeout);
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let http = builder.build()?;
        Ok(Self { http, cfg })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }
}

fn request_body(msgs: &[Message], opts: &ChatOpts) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = msgs
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            serde_json::json!({"role": role, "content": m.content})
        })
        .collect();
    let mut body = serde_json::json!({
        "model": opts.model,
        "messages": messages,
        "stream": true,
    });
    if let Some(map) = body.as_object_mut() {
        if let Some(t) = opts.temperature {
            map.insert("temperature".into(), serde_json::json!(t));
        }
    }
    body
}

#[allow(async_fn_in_trait)]
impl ModelClient for GroqClient {
    async fn stream_chat<'a>(
        &'a self,
        msgs: Vec<Message>,
        opts: ChatOpts,
    ) -> Result<ChatStream<'a>, ChatError> {
        let url = self.completions_url();
        info!(target:"providers::groq","start chat stream model={} url={}", opts.model, url);
        let body = request_body(&msgs, &opts);
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.ok();
            error!(target:"providers::groq","chat stream non-200 status={} body={:?}", status, body);
            return Err(map_status_err(status, body));
        }
        let bytes = resp.bytes_stream().map(|r| r.map_err(map_reqwest_err));
        Ok(Box::pin(sse_deltas(bytes, self.cfg.stream_idle_timeout)))
    }
}

/// Splits a server-sent event body into chat deltas. Ends with
/// `ChatError::Timeout("idle")` if no bytes arrive for `idle`.
pub fn sse_deltas<S>(mut stream: S, idle: Duration) -> impl Stream<Item = Result<ChatDelta, ChatError>> + Send
where
    S: Stream<Item = Result<Bytes, ChatError>> + Send + Unpin,
{
    async_stream::stream! {
        let mut buf = bytes::BytesMut::new();
        let mut last = Instant::now();
        'outer: loop {
            tokio::select! {
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(b)) => {
                            buf.extend_from_slice(&b);
                            last = Instant::now();
                            while let Some((pos, delim)) = find_event_boundary(&buf) {
                                let ev = buf.split_to(pos).freeze();
                                let _ = buf.split_to(delim);
                                match parse_chat_sse_event(&ev) {
                                    Ok(Some(delta)) => { yield Ok(delta); }
                                    Ok(None) => {}
                                    Err(e) => { yield Err(e); break 'outer; }
                                }
                            }
                        }
                        Some(Err(e)) => { yield Err(e); break 'outer; }
                        None => {
                            // Last event may arrive without its blank line.
                            if !buf.iter().all(u8::is_ascii_whitespace) {
                                let ev = buf.split().freeze();
                                match parse_chat_sse_event(&ev) {
                                    Ok(Some(delta)) => { yield Ok(delta); }
                                    Ok(None) => {}
                                    Err(e) => { yield Err(e); }
                                }
                            }
                            break 'outer;
                        }
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(500)) => {
                    if last.elapsed() > idle {
                        debug!(target:"providers::groq","stream idle for {:?}", last.elapsed());
                        yield Err(ChatError::Timeout("idle".into()));
                        break 'outer;
                    }
                }
            }
        }
    }
}

fn map_reqwest_err(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout(e.to_string())
    } else if e.is_request() || e.is_connect() {
        ChatError::Network(e.to_string())
    } else {
        ChatError::Other(e.to_string())
    }
}

fn map_status_err(status: StatusCode, body: Option<String>) -> ChatError {
    let detail = body.as_deref().map(error_message).unwrap_or_default();
    let s = format!("{} {}", status.as_u16(), detail).trim_end().to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Auth(s),
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimit(s),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ChatError::Network(s),
        StatusCode::NOT_FOUND => ChatError::Protocol(s),
        _ => ChatError::Other(s),
    }
}

// Prefer `error.message` from a JSON error body; otherwise the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

// Earliest blank line in `buf`, as (position, delimiter length).
fn find_event_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let crlf = twoway::find_bytes(buf, b"\r\n\r\n").map(|p| (p, 4));
    let lf = twoway::find_bytes(buf, b"\n\n").map(|p| (p, 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_chat_sse_event(ev: &Bytes) -> Result<Option<ChatDelta>, ChatError> {
    let s = std::str::from_utf8(ev).map_err(|e| ChatError::Decode(e.to_string()))?;
    let mut data_lines = Vec::new();
    for line in s.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start());
        }
    }
    if data_lines.is_empty() {
        return Ok(None);
    }
    if data_lines.len() == 1 && data_lines[0] == "[DONE]" {
        return Ok(Some(ChatDelta::Finish(None)));
    }
    let json_text = data_lines.join("\n");
    let v: serde_json::Value =
        serde_json::from_str(&json_text).map_err(|e| ChatError::Decode(e.to_string()))?;
    if let Some(msg) = v["error"]["message"].as_str() {
        return Err(ChatError::Protocol(msg.to_string()));
    }
    if let Some(content) = v["choices"][0]["delta"]["content"].as_str() {
        if !content.is_empty() {
            return Ok(Some(ChatDelta::Text(content.to_string())));
        }
    }
    if let Some(fr) = v["choices"][0]["finish_reason"].as_str() {
        return Ok(Some(ChatDelta::Finish(Some(fr.to_string()))));
    }
    if let Some(role) = v["choices"][0]["delta"]["role"].as_str() {
        let r = match role {
            "user" => Role::User,
            "system" => Role::System,
            _ => Role::Assistant,
        };
        return Ok(Some(ChatDelta::RoleStart(r)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    fn chunk(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices":[{"index":0,"delta":{"content":content},"finish_reason":null}]})
        )
    }

    #[test]
    fn parses_text_delta() {
        let d = parse_chat_sse_event(&ev(
            r#"data: {"choices":[{"delta":{"content":"Lang"},"finish_reason":null}]}"#,
        ))
        .unwrap();
        assert!(matches!(d, Some(ChatDelta::Text(t)) if t == "Lang"));
    }

    #[test]
    fn parses_role_start_and_finish() {
        let role = parse_chat_sse_event(&ev(
            r#"data: {"choices":[{"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#,
        ))
        .unwrap();
        assert!(matches!(role, Some(ChatDelta::RoleStart(Role::Assistant))));

        let fin = parse_chat_sse_event(&ev(
            r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}],"x_groq":{"usage":{"prompt_tokens":10}}}"#,
        ))
        .unwrap();
        assert!(matches!(fin, Some(ChatDelta::Finish(Some(r))) if r == "stop"));

        let done = parse_chat_sse_event(&ev("data: [DONE]")).unwrap();
        assert!(matches!(done, Some(ChatDelta::Finish(None))));
    }

    #[test]
    fn comments_are_skipped() {
        assert!(parse_chat_sse_event(&ev(": keep-alive")).unwrap().is_none());
    }

    #[test]
    fn error_payload_is_protocol_error() {
        let e = parse_chat_sse_event(&ev(
            r#"data: {"error":{"message":"model overloaded","type":"server_error"}}"#,
        ))
        .unwrap_err();
        assert_eq!(e, ChatError::Protocol("model overloaded".into()));
    }

    #[test]
    fn bad_json_is_decode_error() {
        assert!(matches!(
            parse_chat_sse_event(&ev("data: {not json")),
            Err(ChatError::Decode(_))
        ));
    }

    #[test]
    fn status_mapping() {
        let body = Some(r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#.to_string());
        assert_eq!(
            map_status_err(StatusCode::UNAUTHORIZED, body),
            ChatError::Auth("401 Invalid API Key".into())
        );
        assert!(matches!(map_status_err(StatusCode::TOO_MANY_REQUESTS, None), ChatError::RateLimit(s) if s == "429"));
        assert!(matches!(map_status_err(StatusCode::BAD_GATEWAY, Some("oops".into())), ChatError::Network(s) if s == "502 oops"));
        assert!(matches!(map_status_err(StatusCode::NOT_FOUND, None), ChatError::Protocol(_)));
        assert!(matches!(map_status_err(StatusCode::BAD_REQUEST, None), ChatError::Other(_)));
    }

    #[test]
    fn body_carries_model_and_temperature() {
        let opts = ChatOpts {
            model: "llama3-8b-8192".into(),
            temperature: Some(0.7),
        };
        let body = request_body(&[Message::system("sys"), Message::user("Hi")], &opts);
        assert_eq!(body["model"], "llama3-8b-8192");
        assert_eq!(body["stream"], true);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        let cfg = GroqConfig {
            base_url: "http://localhost:9/v1/".into(),
            ..GroqConfig::default()
        };
        let c = GroqClient::new(cfg, "gsk_test").unwrap();
        assert_eq!(c.completions_url(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn newline_in_key_is_rejected() {
        assert!(GroqClient::new(GroqConfig::default(), "bad\nkey").is_err());
    }

    #[tokio::test]
    async fn events_split_across_chunks() {
        let whole = format!(
            "{}{}{}data: [DONE]\n\n",
            chunk("Lang"),
            chunk("Chain is "),
            chunk("a framework.")
        );
        let (a, b) = whole.split_at(37);
        let (b, c) = b.split_at(50);
        let parts: Vec<Result<Bytes, ChatError>> =
            vec![Ok(ev(a)), Ok(ev(b)), Ok(ev(c))];
        let deltas: Vec<_> = sse_deltas(futures::stream::iter(parts), Duration::from_secs(5))
            .collect()
            .await;
        let texts: Vec<String> = deltas
            .iter()
            .filter_map(|d| match d {
                Ok(ChatDelta::Text(t)) => Some(t.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Lang", "Chain is ", "a framework."]);
        assert!(matches!(deltas.last(), Some(Ok(ChatDelta::Finish(None)))));
    }

    #[tokio::test]
    async fn crlf_framing() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\r\n\r\n";
        let parts: Vec<Result<Bytes, ChatError>> = vec![Ok(ev(body))];
        let deltas: Vec<_> = sse_deltas(futures::stream::iter(parts), Duration::from_secs(5))
            .collect()
            .await;
        assert_eq!(deltas.len(), 1);
        assert!(matches!(&deltas[0], Ok(ChatDelta::Text(t)) if t == "hi"));
    }

    #[test]
    fn boundary_picks_earliest_delimiter() {
        assert_eq!(find_event_boundary(b"a\n\nb\r\n\r\n"), Some((1, 2)));
        assert_eq!(find_event_boundary(b"a\r\n\r\nb\n\n"), Some((1, 4)));
        assert_eq!(find_event_boundary(b"data: x\n"), None);
    }

    #[tokio::test]
    async fn mixed_line_endings_keep_events_apart() {
        let body = format!(
            "{}{}\r\n\r\n",
            chunk("Lang"),
            chunk("Chain").trim_end()
        );
        let parts: Vec<Result<Bytes, ChatError>> = vec![Ok(ev(&body))];
        let deltas: Vec<_> = sse_deltas(futures::stream::iter(parts), Duration::from_secs(5))
            .collect()
            .await;
        assert_eq!(
            deltas,
            vec![
                Ok(ChatDelta::Text("Lang".into())),
                Ok(ChatDelta::Text("Chain".into())),
            ]
        );
    }

    #[tokio::test]
    async fn unterminated_last_event_is_kept() {
        let body = format!("{}{}", chunk("Lang"), chunk("Chain").trim_end());
        let parts: Vec<Result<Bytes, ChatError>> = vec![Ok(ev(&body))];
        let deltas: Vec<_> = sse_deltas(futures::stream::iter(parts), Duration::from_secs(5))
            .collect()
            .await;
        assert_eq!(
            deltas,
            vec![
                Ok(ChatDelta::Text("Lang".into())),
                Ok(ChatDelta::Text("Chain".into())),
            ]
        );

        let tail = vec![Ok(ev("data: {\"choices\":[{\"delta\":{\"content\":\"cut"))];
        let deltas: Vec<_> = sse_deltas(futures::stream::iter(tail), Duration::from_secs(5))
            .collect()
            .await;
        assert!(matches!(deltas.as_slice(), [Err(ChatError::Decode(_))]));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let parts: Vec<Result<Bytes, ChatError>> = vec![
            Ok(ev(&chunk("partial"))),
            Err(ChatError::Network("reset".into())),
            Ok(ev(&chunk("never"))),
        ];
        let deltas: Vec<_> = sse_deltas(futures::stream::iter(parts), Duration::from_secs(5))
            .collect()
            .await;
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[1].as_ref().unwrap_err(), &ChatError::Network("reset".into()));
    }

    #[tokio::test]
    async fn idle_stream_times_out() {
        let silent = futures::stream::pending::<Result<Bytes, ChatError>>();
        let deltas: Vec<_> = sse_deltas(silent, Duration::from_millis(10)).collect().await;
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].as_ref().unwrap_err(), &ChatError::Timeout("idle".into()));
    }
}
