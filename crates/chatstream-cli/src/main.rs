//! Terminal chat client for a streaming model backend.

mod renderer;

use std::time::Duration;

use chatstream_core::Transport;
use chatstream_core::prelude::*;
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt as _;
use tracing::debug;

use crate::renderer::TerminalRenderer;

#[derive(Parser, Debug)]
#[command(name = "chatstream", version, about = "Chat with a streaming model backend")]
struct Cli {
    /// Backend base URL.
    #[arg(long, env = "CHATSTREAM_BASE_URL")]
    base_url: Option<String>,
    /// Model name sent with every prompt.
    #[arg(long, env = "CHATSTREAM_MODEL")]
    model: Option<String>,
    /// Conversation id sent with every prompt (required to chat).
    #[arg(long, env = "CHATSTREAM_CHAT_ID")]
    chat_id: Option<u64>,
    /// Wait for the complete answer instead of streaming it.
    #[arg(long)]
    instant: bool,
    /// Seconds to wait for the next chunk of a stream (0 waits forever).
    #[arg(long, env = "CHATSTREAM_READ_TIMEOUT_SECS")]
    read_timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one prompt and print the answer.
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Read prompts line by line. Commands: /stream, /instant, /clear, /model <name>, /quit.
    Repl,
    /// Probe the backend once.
    Health,
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig, ChatError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(base_url) = &self.base_url {
            config = config.base_url(base_url.clone());
        }
        if let Some(model) = &self.model {
            config = config.model(model.clone());
        }
        if let Some(chat_id) = self.chat_id {
            config = config.conversation_id(chat_id);
        }
        if let Some(secs) = self.read_timeout_secs {
            config = config.read_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    chatstream_core::init_observability();

    let cli = Cli::parse();
    let mut client = ChatClient::new(cli.client_config()?)?;
    if cli.instant {
        client.set_mode(DeliveryMode::Instant);
    }

    match cli.command {
        Command::Ask { prompt } => {
            let mut renderer = TerminalRenderer::new(std::io::stdout());
            let report = ask(&mut client, &prompt.join(" "), &mut renderer, interrupted()).await?;
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Command::Repl => repl(&mut client).await?,
        Command::Health => {
            let status = client.health().await;
            println!("{}", health_label(status));
            if status == HealthStatus::Offline {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        debug!(event = "cli.signal_unavailable", error = %err);
        std::future::pending::<()>().await;
    }
}

/// Sends one prompt; `interrupt` resolving cancels only this exchange.
async fn ask<T: Transport>(
    client: &mut ChatClient<T>,
    prompt: &str,
    renderer: &mut dyn Renderer,
    interrupt: impl Future<Output = ()>,
) -> Result<SessionReport, ChatError> {
    let abort = AbortHandle::new();
    let result = {
        let exchange = client.send_with_abort(prompt, renderer, abort.signal());
        tokio::pin!(exchange);
        tokio::select! {
            result = &mut exchange => result,
            _ = interrupt => {
                abort.abort();
                exchange.await
            }
        }
    };

    if let Ok(report) = &result {
        debug!(
            event = "cli.exchange_done",
            session_id = %report.session_id,
            phase = ?report.phase,
            total_words = client.word_total() as u64
        );
    }
    result
}

/// Ctrl-C cancels the running exchange, or exits when waiting for input.
async fn repl(client: &mut ChatClient) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "chatstream ({} mode, model {}): type a prompt, or /stream /instant /clear /model <name> /quit",
        client.mode(),
        client.config().model
    );
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = interrupted() => None,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/stream" => client.set_mode(DeliveryMode::Streaming),
            "/instant" => client.set_mode(DeliveryMode::Instant),
            "/clear" => client.clear(),
            _ => {
                if let Some(model) = line.strip_prefix("/model ") {
                    client.set_model(model.trim());
                } else {
                    let mut renderer = TerminalRenderer::new(std::io::stdout());
                    if let Err(err) = ask(client, line, &mut renderer, interrupted()).await {
                        eprintln!("{err}");
                        continue;
                    }
                }
            }
        }
        println!("[{} | words: {}]", client.mode(), client.word_total());
    }
    Ok(())
}

fn health_label(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Online => "API online",
        HealthStatus::Offline => "API offline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatstream_core::{ByteStream, ChatRequest, SessionFailure, TransportError};

    #[test]
    fn ask_joins_trailing_words() {
        let cli = Cli::try_parse_from(["chatstream", "--chat-id", "3", "ask", "hello", "there"])
            .expect("parse");
        assert_eq!(cli.chat_id, Some(3));
        match cli.command {
            Command::Ask { prompt } => assert_eq!(prompt.join(" "), "hello there"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "chatstream",
            "--base-url",
            "http://example.test:9000",
            "--model",
            "llama3",
            "--read-timeout-secs",
            "0",
            "health",
        ])
        .expect("parse");
        let config = cli.client_config().expect("config");
        assert_eq!(config.base_url, "http://example.test:9000");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.read_timeout, None);
    }

    #[test]
    fn ask_requires_a_prompt() {
        assert!(Cli::try_parse_from(["chatstream", "ask"]).is_err());
    }

    struct StalledTransport;

    #[async_trait::async_trait]
    impl Transport for StalledTransport {
        async fn open_stream(
            &self,
            _request: &ChatRequest,
        ) -> Result<ByteStream, TransportError> {
            Ok(Box::pin(futures::stream::pending()))
        }

        async fn generate(&self, _request: &ChatRequest) -> Result<String, TransportError> {
            futures::future::pending().await
        }

        async fn health(&self) -> Result<HealthStatus, TransportError> {
            Ok(HealthStatus::Online)
        }
    }

    fn stalled_client() -> ChatClient<StalledTransport> {
        let config = ClientConfig::default()
            .conversation_id(1)
            .read_timeout(None);
        ChatClient::with_transport(StalledTransport, config)
    }

    #[tokio::test]
    async fn interrupt_cancels_a_stalled_stream() {
        let mut client = stalled_client();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut renderer = TerminalRenderer::new(Vec::new());

        let exchange = ask(&mut client, "hi", &mut renderer, async move {
            let _ = rx.await;
        });
        tx.send(()).expect("interrupt");
        let report = exchange.await.expect("ask");

        assert_eq!(report.phase, SessionPhase::Failed);
        assert_eq!(report.failure, Some(SessionFailure::Cancelled));
        let out = String::from_utf8(renderer.into_inner()).expect("utf8");
        assert_eq!(out, "error: request cancelled\n[+0 words]\n");
    }

    #[tokio::test]
    async fn interrupt_cancels_a_pending_instant_reply() {
        let mut client = stalled_client();
        client.set_mode(DeliveryMode::Instant);
        let mut renderer = TerminalRenderer::new(Vec::new());

        let report = ask(&mut client, "hi", &mut renderer, async {})
            .await
            .expect("ask");
        assert_eq!(report.failure, Some(SessionFailure::Cancelled));
        assert_eq!(client.word_total(), 0);
    }

    #[tokio::test]
    async fn missing_chat_id_is_reported_without_interrupt() {
        let mut client = ChatClient::with_transport(StalledTransport, ClientConfig::default());
        let mut renderer = TerminalRenderer::new(Vec::new());
        let err = ask(&mut client, "hi", &mut renderer, std::future::pending())
            .await
            .expect_err("chat id required");
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn health_labels() {
        assert_eq!(health_label(HealthStatus::Online), "API online");
        assert_eq!(health_label(HealthStatus::Offline), "API offline");
    }
}
