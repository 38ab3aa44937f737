//! Line-oriented request loop: one JSON request per input line, one
//! rendered envelope per output line.

use proto::{Envelope, WireFormat, codes, err};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tools::Adapter;
use tracing::{debug, info};

/// Parses request text, turning malformed JSON into an error envelope.
pub fn parse_request(text: &str) -> Result<serde_json::Value, Envelope> {
    serde_json::from_str(text).map_err(|e| err(codes::E_SCHEMA, format!("invalid JSON: {e}")))
}

/// Dispatches one request text and returns the envelope.
pub async fn dispatch_text(adapter: &Adapter, text: &str) -> Envelope {
    match parse_request(text) {
        Ok(request) => adapter.handle(request).await,
        Err(envelope) => envelope,
    }
}

/// Renders an envelope as a single line of JSON.
pub fn render_line(envelope: &Envelope, format: WireFormat) -> String {
    envelope.render(format).to_string()
}

/// Serves requests from `input` until EOF or `/quit`, returning how many
/// requests were answered.
pub async fn serve<R, W>(
    adapter: &Adapter,
    format: WireFormat,
    mut input: R,
    mut output: W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut answered = 0;

    info!(tool = adapter.tool_name(), %format, "Serving requests");

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let envelope = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let Some(line) = normalize_input_line(line) else {
                    continue;
                };
                if is_quit_command(line) {
                    debug!("Quit command received");
                    break;
                }
                dispatch_text(adapter, line).await
            }
            Err(e) => {
                debug!(error = %e, "Request line is not UTF-8");
                err(codes::E_SCHEMA, format!("invalid UTF-8: {e}"))
            }
        };
        let mut rendered = render_line(&envelope, format);
        rendered.push('\n');
        output.write_all(rendered.as_bytes()).await?;
        output.flush().await?;
        answered += 1;
    }

    info!(answered, "Request loop stopped");
    Ok(answered)
}

/// Trims an input line and drops empty lines.
fn normalize_input_line(raw: &str) -> Option<&str> {
    let line = raw.trim();
    if line.is_empty() { None } else { Some(line) }
}

/// Returns true when input requests loop termination.
fn is_quit_command(line: &str) -> bool {
    line == "/quit"
}
