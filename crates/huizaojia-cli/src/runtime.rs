// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crossterm::execute;
use crossterm::style::Print;
use huizaojia_llm::Client;
use huizaojia_tui::InternalEvent;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Reply shown when `[llm].enabled = false`.
pub const ASSISTANT_DISABLED_REPLY: &str = "智能助手未启用，请在配置文件的 [llm] 中设置 enabled = true。";

/// Runtime backing the TUI: model requests, terminal clipboard and local
/// image previews.
pub struct CliRuntime<W: Write> {
    client: Option<Client>,
    analysis_delay: Duration,
    terminal: W,
}

impl CliRuntime<io::Stdout> {
    pub fn new(client: Option<Client>, analysis_delay: Duration) -> Self {
        Self::with_terminal(client, analysis_delay, io::stdout())
    }
}

impl<W: Write> CliRuntime<W> {
    pub fn with_terminal(client: Option<Client>, analysis_delay: Duration, terminal: W) -> Self {
        Self {
            client,
            analysis_delay,
            terminal,
        }
    }

    #[cfg(test)]
    fn terminal(&self) -> &W {
        &self.terminal
    }
}

impl<W: Write> huizaojia_tui::AppRuntime for CliRuntime<W> {
    fn ask_assistant(&mut self, category: &str, question: &str) -> String {
        match &self.client {
            Some(client) => huizaojia_llm::consult(client, category, question),
            None => ASSISTANT_DISABLED_REPLY.to_owned(),
        }
    }

    fn spawn_assistant(
        &mut self,
        request_id: u64,
        category: &str,
        question: &str,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let Some(client) = self.client.clone() else {
            tx.send(InternalEvent::AssistantReply {
                request_id,
                reply: ASSISTANT_DISABLED_REPLY.to_owned(),
            })
            .map_err(|_| anyhow!("chat event channel closed"))?;
            return Ok(());
        };

        let category = category.to_owned();
        let question = question.to_owned();
        thread::Builder::new()
            .name(format!("assistant-{request_id}"))
            .spawn(move || {
                let reply = huizaojia_llm::consult(&client, &category, &question);
                if tx
                    .send(InternalEvent::AssistantReply { request_id, reply })
                    .is_err()
                {
                    debug!(request_id, "tui gone before assistant reply arrived");
                }
            })
            .context("spawn assistant request thread")?;
        Ok(())
    }

    fn copy_to_clipboard(&mut self, text: &str) -> Result<()> {
        let sequence = osc52_sequence(text);
        execute!(self.terminal, Print(sequence)).context("write clipboard escape sequence")?;
        info!(chars = text.chars().count(), "copied to clipboard");
        Ok(())
    }

    fn load_avatar(&mut self, path: &str) -> Result<String> {
        let url = image_data_url(Path::new(path.trim()))?;
        debug!(path, bytes = url.len(), "avatar preview loaded");
        Ok(url)
    }

    fn analysis_delay(&self) -> Duration {
        self.analysis_delay
    }
}

/// OSC 52 "set clipboard" for the system selection.
fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

fn image_mime(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "" => bail!(
            "{} has no file extension; use a png, jpg, gif, webp, bmp or svg image",
            path.display()
        ),
        other => bail!(
            "unsupported image type .{other}; use a png, jpg, gif, webp, bmp or svg image"
        ),
    };
    Ok(mime)
}

fn image_data_url(path: &Path) -> Result<String> {
    let mime = image_mime(path)?;
    let bytes = fs::read(path).with_context(|| format!("read image {}", path.display()))?;
    if bytes.is_empty() {
        warn!(path = %path.display(), "avatar image is empty");
        bail!("image {} is empty", path.display());
    }
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::{ASSISTANT_DISABLED_REPLY, CliRuntime, image_mime, osc52_sequence};
    use anyhow::Result;
    use huizaojia_llm::{CONNECTION_ERROR_REPLY, Client};
    use huizaojia_testkit::{MockChatServer, MockReply, UNREACHABLE_BASE_URL};
    use huizaojia_tui::{AppRuntime, InternalEvent};
    use std::path::Path;
    use std::sync::mpsc;
    use std::time::Duration;

    fn runtime_with(client: Option<Client>) -> CliRuntime<Vec<u8>> {
        CliRuntime::with_terminal(client, Duration::from_millis(250), Vec::new())
    }

    #[test]
    fn spawned_request_delivers_reply_with_request_id() -> Result<()> {
        let server = MockChatServer::start(vec![MockReply::chat("清单编码为12位。")])?;
        let client = Client::new(server.base_url(), "qwen3", Duration::from_secs(5))?;
        let mut runtime = runtime_with(Some(client));

        let (tx, rx) = mpsc::channel();
        runtime.spawn_assistant(7, "2024清单", "清单编码有几位？", tx)?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(
            event,
            InternalEvent::AssistantReply {
                request_id: 7,
                reply: "清单编码为12位。".to_owned(),
            }
        );

        let requests = server.finish()?;
        assert_eq!(requests.len(), 1);
        let body = requests[0].json()?;
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
        assert!(prompt.contains("2024清单"));
        assert!(prompt.contains("清单编码有几位？"));
        Ok(())
    }

    #[test]
    fn unreachable_endpoint_yields_apology() -> Result<()> {
        let client = Client::new(UNREACHABLE_BASE_URL, "qwen3", Duration::from_secs(1))?;
        let mut runtime = runtime_with(Some(client));
        assert_eq!(
            runtime.ask_assistant("定额", "人工费怎么调？"),
            CONNECTION_ERROR_REPLY
        );
        Ok(())
    }

    #[test]
    fn disabled_assistant_replies_without_network() -> Result<()> {
        let mut runtime = runtime_with(None);
        let (tx, rx) = mpsc::channel();
        runtime.spawn_assistant(3, "政策文件", "hello", tx)?;
        assert_eq!(
            rx.try_recv()?,
            InternalEvent::AssistantReply {
                request_id: 3,
                reply: ASSISTANT_DISABLED_REPLY.to_owned(),
            }
        );
        Ok(())
    }

    #[test]
    fn clipboard_writes_osc52_sequence() -> Result<()> {
        let mut runtime = runtime_with(None);
        runtime.copy_to_clipboard("113.00")?;
        let written = String::from_utf8(runtime.terminal().clone())?;
        assert_eq!(written, "\x1b]52;c;MTEzLjAw\x07");
        assert_eq!(osc52_sequence(""), "\x1b]52;c;\x07");
        Ok(())
    }

    #[test]
    fn avatar_is_read_into_data_url() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("avatar.PNG");
        std::fs::write(&path, [0x89, b'P', b'N', b'G'])?;

        let mut runtime = runtime_with(None);
        let url = runtime.load_avatar(&path.display().to_string())?;
        assert_eq!(url, "data:image/png;base64,iVBORw==");
        Ok(())
    }

    #[test]
    fn avatar_errors_name_the_problem() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_with(None);

        let missing = temp.path().join("missing.jpg");
        let error = runtime
            .load_avatar(&missing.display().to_string())
            .expect_err("missing file should fail");
        assert!(error.to_string().contains("read image"));

        let empty = temp.path().join("empty.gif");
        std::fs::write(&empty, b"")?;
        let error = runtime
            .load_avatar(&empty.display().to_string())
            .expect_err("empty file should fail");
        assert!(error.to_string().contains("is empty"));

        let error = image_mime(Path::new("notes.txt")).expect_err("txt is not an image");
        assert!(error.to_string().contains("unsupported image type .txt"));
        Ok(())
    }

    #[test]
    fn analysis_delay_comes_from_config() {
        let runtime = runtime_with(None);
        assert_eq!(runtime.analysis_delay(), Duration::from_millis(250));
    }
}
