//! Interactive persona session with line editing and history.
//!
//! ## Commands
//!
//! - `/avatar <path|url|data-url>` - Select the avatar image
//! - `/tab url|text` - Switch the active description input
//! - `/url <url>` / `/text <description>` - Set the description
//! - `/generate` - Generate (or regenerate) the persona
//! - `/mint` - Upload to 0G storage and mint the INFT
//! - `/chat` - Open or close the chat panel (after minting)
//! - `/say <message>` - Talk to the persona; plain lines work while chat is open
//! - `/show`, `/log`, `/link` - Inspect the session
//! - `/help`, `/quit`

use std::borrow::Cow;
use std::io::{self, BufRead, Write};

use rustyline::completion::Completer;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Editor, Helper};

use crate::app::App;
use crate::llm::{ChatEntry, ChatRole, Persona};
use crate::mint::MintReceipt;
use crate::storage::ImageSource;
use crate::workflow::{Confirm, InputTab, Outcome, PersonaWorkflow, WorkflowState};

/// Slash commands available in the session.
const SLASH_COMMANDS: &[&str] = &[
    "/avatar", "/tab", "/url", "/text", "/generate", "/mint", "/chat", "/say", "/show", "/log",
    "/link", "/help", "/quit", "/exit",
];

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionCommand {
    Avatar(String),
    Tab(InputTab),
    Url(String),
    Text(String),
    Generate,
    Mint,
    Chat,
    Say(String),
    Show,
    Log,
    Link,
    Help,
    Quit,
}

impl SessionCommand {
    /// Plain lines are chat messages while the chat panel is open.
    fn parse(line: &str, chat_open: bool) -> Result<Self, String> {
        let line = line.trim();
        if !line.starts_with('/') {
            if chat_open {
                return Ok(Self::Say(line.to_string()));
            }
            return Err("Unknown input. Type /help for commands.".to_string());
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let required = |usage: &str| {
            if rest.is_empty() {
                Err(format!("usage: {usage}"))
            } else {
                Ok(rest.to_string())
            }
        };

        match command.to_lowercase().as_str() {
            "/avatar" => required("/avatar <path|url|data-url>").map(Self::Avatar),
            "/tab" => rest.parse().map(Self::Tab),
            "/url" => required("/url <url>").map(Self::Url),
            "/text" => required("/text <description>").map(Self::Text),
            "/generate" => Ok(Self::Generate),
            "/mint" => Ok(Self::Mint),
            "/chat" => Ok(Self::Chat),
            "/say" => required("/say <message>").map(Self::Say),
            "/show" => Ok(Self::Show),
            "/log" => Ok(Self::Log),
            "/link" => Ok(Self::Link),
            "/help" => Ok(Self::Help),
            "/quit" | "/exit" => Ok(Self::Quit),
            other => Err(format!("Unknown command {other}. Type /help for commands.")),
        }
    }
}

/// Rustyline helper for slash-command tab completion.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if !line.starts_with('/') || line[..pos].contains(' ') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches: Vec<String> = SLASH_COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| cmd.to_string())
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if !line.starts_with('/') || pos < line.len() {
            return None;
        }

        SLASH_COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{hint}\x1b[0m"))
    }
}

impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// Asks y/N questions on the terminal.
struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> bool {
        tokio::task::block_in_place(|| {
            print!("{question} [y/N] ");
            let _ = io::stdout().flush();
            read_answer(&mut io::stdin().lock())
        })
    }
}

/// Closed input or a read error counts as "no".
fn read_answer(input: &mut impl BufRead) -> bool {
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_yes(&answer),
    }
}

/// What the prompt loop does after `readline` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadFailure {
    Retry,
    Exit,
}

/// Ctrl-C keeps the session. EOF ends it without a leave prompt, since
/// closed input cannot answer one.
fn on_read_failure(err: &ReadlineError) -> ReadFailure {
    match err {
        ReadlineError::Interrupted => ReadFailure::Retry,
        _ => ReadFailure::Exit,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Run the interactive session until the user quits.
pub async fn run_session(app: &App) -> anyhow::Result<()> {
    let mut workflow = app.workflow(Box::new(TerminalConfirm)).await?;

    let config = Config::builder()
        .history_ignore_dups(true)?
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .build();
    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(ReplHelper));

    let hist_path = crate::bootstrap::session_history_path();
    if let Some(parent) = hist_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.load_history(&hist_path);

    println!("\x1b[1mpersona-forge\x1b[0m  /help for commands, /quit to exit");
    println!();

    loop {
        let prompt = if workflow.state().chat_open {
            "\x1b[1;35mchat\x1b[0m \x1b[1;36m\u{203A}\x1b[0m "
        } else {
            "\x1b[1;36m\u{203A}\x1b[0m "
        };

        let line = match tokio::task::block_in_place(|| rl.readline(prompt)) {
            Ok(line) => line,
            Err(e) => match on_read_failure(&e) {
                ReadFailure::Retry => {
                    println!("\x1b[90m(use /quit to exit)\x1b[0m");
                    continue;
                }
                ReadFailure::Exit => {
                    if !matches!(e, ReadlineError::Eof) {
                        eprintln!("Input error: {e}");
                    }
                    break;
                }
            },
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match SessionCommand::parse(&line, workflow.state().chat_open) {
            Ok(command) => command,
            Err(message) => {
                println!("\x1b[33m{message}\x1b[0m");
                continue;
            }
        };
        if command == SessionCommand::Quit {
            if workflow.leave() {
                break;
            }
            continue;
        }
        execute(&mut workflow, command).await;
    }

    let _ = rl.save_history(&hist_path);
    Ok(())
}

async fn execute(workflow: &mut PersonaWorkflow, command: SessionCommand) {
    match command {
        SessionCommand::Avatar(raw) => match super::parse_image_arg(&raw) {
            Ok(source) => {
                let label = avatar_label(&raw, &source);
                workflow.set_avatar(label, source);
                println!("Avatar set.");
            }
            Err(e) => println!("\x1b[31m{e:#}\x1b[0m"),
        },
        SessionCommand::Tab(tab) => {
            workflow.set_tab(tab);
            println!("Input tab: {}", tab.as_str());
        }
        SessionCommand::Url(url) => {
            workflow.set_tab(InputTab::Url);
            workflow.set_url(url);
        }
        SessionCommand::Text(text) => {
            workflow.set_tab(InputTab::Text);
            workflow.set_text(text);
        }
        SessionCommand::Generate => {
            println!("\x1b[90mGenerating...\x1b[0m");
            match workflow.generate().await {
                Outcome::Completed => {
                    if let Some(persona) = &workflow.state().persona {
                        print_persona(persona);
                    }
                }
                Outcome::Declined => println!("Kept the current persona."),
                Outcome::Skipped => println!("Set a description first with /text or /url."),
                Outcome::Failed(message) => print_error(&message),
            }
        }
        SessionCommand::Mint => {
            let outcome = workflow
                .mint_observed(|line| println!("\x1b[90m{line}\x1b[0m"))
                .await;
            match outcome {
                Outcome::Completed => {
                    if let Some(receipt) = &workflow.state().last_mint {
                        print_confirmation(receipt);
                    }
                    workflow.close_confirmation();
                }
                Outcome::Skipped => println!("Generate a persona before minting."),
                Outcome::Declined => {}
                Outcome::Failed(message) => print_error(&message),
            }
        }
        SessionCommand::Chat => {
            if workflow.toggle_chat() {
                if workflow.state().chat_open {
                    println!("Chat opened. Type a message, /chat to close.");
                    print_transcript(workflow.state().chat.entries());
                } else {
                    println!("Chat closed.");
                }
            } else {
                println!("Mint the persona to unlock chat.");
            }
        }
        SessionCommand::Say(message) => {
            if !workflow.state().chat_open {
                println!("Open the chat with /chat first.");
                return;
            }
            let before = workflow.state().chat.entries().len();
            workflow.send_chat(&message).await;
            let entries = workflow.state().chat.entries();
            let assistant = workflow
                .state()
                .persona
                .as_ref()
                .map(|persona| persona.name.as_str());
            for entry in entries.iter().skip(before) {
                if entry.role != ChatRole::User {
                    print_entry(entry, assistant);
                }
            }
        }
        SessionCommand::Show => print_status(workflow.state()),
        SessionCommand::Log => {
            for line in workflow.state().log.lines() {
                println!("{line}");
            }
        }
        SessionCommand::Link => match workflow.share_url() {
            Some(url) => println!("{url}"),
            None => println!("Generate a persona to get a share link."),
        },
        SessionCommand::Help => print_help(),
        SessionCommand::Quit => {}
    }
}

fn avatar_label(raw: &str, source: &ImageSource) -> String {
    match source {
        ImageSource::Bytes(_) => std::path::Path::new(raw)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw.to_string()),
        ImageSource::Url(url) => url.clone(),
        ImageSource::Base64(_) => "inline image".to_string(),
    }
}

fn print_persona(persona: &Persona) {
    println!();
    println!("  \x1b[1m{}\x1b[0m", persona.name);
    println!("  \x1b[3m{}\x1b[0m", persona.tagline);
    println!("  \x1b[36m{}\x1b[0m", persona.tags.join(" · "));
    println!();
    for line in persona.long_description.lines() {
        println!("  {line}");
    }
    println!();
}

fn print_status(state: &WorkflowState) {
    match &state.persona {
        Some(persona) => print_persona(persona),
        None => println!("No persona yet."),
    }
    let avatar = state
        .avatar
        .as_ref()
        .map(|avatar| avatar.label.as_str())
        .unwrap_or("none");
    println!("  avatar: {avatar}");
    println!("  input:  {} tab", state.tab.as_str());
    println!("  minted: {}", if state.minted { "yes" } else { "no" });
    if let Some(pointers) = &state.pointers {
        println!("  metadata: {} ({})", pointers.metadata_uri, pointers.metadata_hash);
        println!("  image root: {}", pointers.image_root);
    }
    if let Some(error) = &state.last_error {
        println!("  last error: \x1b[31m{error}\x1b[0m");
    }
}

fn print_confirmation(receipt: &MintReceipt) {
    println!();
    println!("  \x1b[1;32mMinted successfully\x1b[0m");
    println!("  tx:       {}", receipt.tx_hash);
    if let Some(url) = &receipt.explorer_url {
        println!("  explorer: {url}");
    }
    println!("  metadata: {}", receipt.pointers.metadata_uri);
    println!("  owner:    {}", receipt.account);
    println!();
    println!("  \x1b[90m/chat to talk to your persona\x1b[0m");
}

fn print_transcript(entries: &[ChatEntry]) {
    for entry in entries {
        print_entry(entry, None);
    }
}

fn print_entry(entry: &ChatEntry, assistant: Option<&str>) {
    let time = entry.timestamp.format("%H:%M");
    match entry.role {
        ChatRole::User => println!("\x1b[90m{time}\x1b[0m \x1b[1myou\x1b[0m: {}", entry.content),
        ChatRole::Assistant => println!(
            "\x1b[90m{time}\x1b[0m \x1b[1;35m{}\x1b[0m: {}",
            assistant.unwrap_or("persona"),
            entry.content
        ),
        ChatRole::System => println!("\x1b[90m{time}\x1b[0m \x1b[31m{}\x1b[0m", entry.content),
    }
}

fn print_error(message: &str) {
    eprintln!("\x1b[31m{message}\x1b[0m");
}

fn print_help() {
    let h = "\x1b[1m";
    let c = "\x1b[1;36m";
    let d = "\x1b[90m";
    let r = "\x1b[0m";

    println!();
    println!("  {h}persona-forge session{r}");
    println!();
    println!("  {h}Describe{r}");
    println!("  {c}/avatar <src>{r}      {d}avatar file, URL or data URL{r}");
    println!("  {c}/tab url|text{r}      {d}switch description input{r}");
    println!("  {c}/url <url>{r}         {d}character page URL{r}");
    println!("  {c}/text <desc>{r}       {d}rough character description{r}");
    println!();
    println!("  {h}Create{r}");
    println!("  {c}/generate{r}          {d}generate or regenerate the persona{r}");
    println!("  {c}/mint{r}              {d}upload to 0G storage and mint the INFT{r}");
    println!();
    println!("  {h}Talk{r}");
    println!("  {c}/chat{r}              {d}open or close chat (after minting){r}");
    println!("  {c}/say <msg>{r}         {d}send a message{r}");
    println!();
    println!("  {h}Inspect{r}");
    println!("  {c}/show{r}              {d}persona and mint status{r}");
    println!("  {c}/log{r}               {d}activity log{r}");
    println!("  {c}/link{r}              {d}shareable draft link{r}");
    println!("  {c}/help{r}              {d}show this help{r}");
    println!("  {c}/quit{r} {c}/exit{r}        {d}leave the session{r}");
    println!();
}
