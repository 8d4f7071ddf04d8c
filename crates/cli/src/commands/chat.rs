//! `agrishield chat`: interactive or single-message chat in the terminal.
//!
//! The whole run is one session. `/lang <name>` switches the response
//! language from the next message on; `exit` or Ctrl+D quits.

use agrishield_config::AppConfig;
use agrishield_core::SessionId;
use agrishield_relay::{Relay, RelayRequest};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::ContextArgs;

pub async fn run(
    context: ContextArgs,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY=...       (default provider)");
        eprintln!("    AGRISHIELD_API_KEY=...   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = agrishield_providers::build_from_config(&config)?;
    let relay = Relay::from_config(provider, &config);
    let mut chat = ChatSession::new(&relay, context);

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = chat.send(&msg).await;
        eprint!("\r              \r");
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  AgriShield Farming Assistant");
    println!();
    println!("  Provider:  {}", relay.provider_name());
    println!("  Model:     {}", relay.model());
    println!("  Language:  {}", chat.language_label());
    println!();
    println!("  Type your question and press Enter.");
    println!("  '/lang <name>' switches language; 'exit' or Ctrl+D quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt_user()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "exit" | "quit" => break,
            _ => {
                if let Some(name) = line.strip_prefix("/lang") {
                    let language = chat.switch_language(name.trim());
                    println!("  Language set to {language}.\n");
                } else {
                    eprint!("  ...");
                    let reply = chat.send(line).await;
                    eprint!("\r     \r");
                    println!();
                    for text in reply.lines() {
                        println!("  Assistant > {text}");
                    }
                    println!();
                }
            }
        }
        prompt_user()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

fn prompt_user() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// One terminal conversation: a fixed session id plus the context flags.
struct ChatSession<'a> {
    relay: &'a Relay,
    session_id: SessionId,
    context: ContextArgs,
}

impl<'a> ChatSession<'a> {
    fn new(relay: &'a Relay, context: ContextArgs) -> Self {
        Self {
            relay,
            session_id: SessionId::new(),
            context,
        }
    }

    fn language_label(&self) -> String {
        match self.context.language.as_deref() {
            Some(l) => self.relay.resolve_language(l).to_string(),
            None => "default".into(),
        }
    }

    fn switch_language(&mut self, name: &str) -> String {
        let language = self.relay.resolve_language(name);
        self.context.language = Some(language.name().to_string());
        language.to_string()
    }

    /// Relay one message; failures come back as the farmer-facing apology.
    async fn send(&self, text: &str) -> String {
        let mut request = RelayRequest::new(self.session_id.clone(), text);
        request.language = self.context.language.clone();
        request.location = self.context.location();
        request.date = Some(self.context.date_or_today());

        match self.relay.relay(request).await {
            Ok(reply) => reply.text,
            Err(e) => {
                tracing::warn!(kind = %e.kind, detail = %e.detail, "Chat message failed");
                e.kind.apology().to_string()
            }
        }
    }
}
