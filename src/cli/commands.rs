// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands, `serve`, `ask` and `chat`,
// and all their configurable flags.
//
// The model flags are shared by every command and can also be
// set through the environment (PDF_CHAT_MODEL_ID, ...), which is
// handy when the server runs under a process manager.
//
// Reference: Rust Book §12 (Building a CLI Program)
//            clap docs (derive, env feature)

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Args, Subcommand, ValueEnum};

use crate::application::session::{ReuploadPolicy, SessionSettings, DEFAULT_LATENCY_FLOOR};
use crate::infra::model_store::{ModelSource, DEFAULT_MODEL_ID, DEFAULT_REVISION};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the chat page in the browser
    Serve(ServeArgs),

    /// Answer a single question about a PDF and exit
    Ask(AskArgs),

    /// Chat with a PDF in the terminal
    Chat(ChatArgs),
}

/// Which model to use and where to get it
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// HuggingFace model id of a T5 checkpoint
    #[arg(long, env = "PDF_CHAT_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Hub revision (branch, tag or commit)
    #[arg(long, env = "PDF_CHAT_MODEL_REVISION", default_value = DEFAULT_REVISION)]
    pub revision: String,

    /// Local directory with config.json, tokenizer.json and
    /// model.safetensors; the hub is not contacted when set
    #[arg(long, env = "PDF_CHAT_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
}

impl From<ModelArgs> for ModelSource {
    fn from(a: ModelArgs) -> Self {
        ModelSource {
            model_id:  a.model_id,
            revision:  a.revision,
            local_dir: a.model_dir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReuploadArg {
    /// Keep chatting with the first document
    Ignore,
    /// Start over with the newly uploaded document
    Replace,
}

impl From<ReuploadArg> for ReuploadPolicy {
    fn from(a: ReuploadArg) -> Self {
        match a {
            ReuploadArg::Ignore  => ReuploadPolicy::Ignore,
            ReuploadArg::Replace => ReuploadPolicy::Replace,
        }
    }
}

/// All arguments for the `serve` command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8501")]
    pub addr: SocketAddr,

    /// Load the model before accepting requests instead of on
    /// the first upload
    #[arg(long)]
    pub preload: bool,

    /// What an upload does while a document is already loaded
    #[arg(long, value_enum, default_value_t = ReuploadArg::Ignore)]
    pub reupload: ReuploadArg,

    /// Minimum time before an answer is shown, in milliseconds
    #[arg(long, default_value_t = DEFAULT_LATENCY_FLOOR.as_millis() as u64)]
    pub latency_floor_ms: u64,

    /// Seconds a browser session may sit unused before it is dropped
    #[arg(long, default_value_t = 3600)]
    pub session_ttl_secs: u64,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl ServeArgs {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl From<&ServeArgs> for SessionSettings {
    fn from(a: &ServeArgs) -> Self {
        SessionSettings {
            latency_floor: Duration::from_millis(a.latency_floor_ms),
            reupload:      a.reupload.into(),
        }
    }
}

/// All arguments for the `ask` command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// PDF file to read
    #[arg(long)]
    pub pdf: PathBuf,

    /// The natural language question to answer
    #[arg(long)]
    pub question: String,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// All arguments for the `chat` command
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// PDF file to chat with
    #[arg(long)]
    pub pdf: PathBuf,

    /// Minimum time before an answer is shown, in milliseconds
    #[arg(long, default_value_t = DEFAULT_LATENCY_FLOOR.as_millis() as u64)]
    pub latency_floor_ms: u64,

    #[command(flatten)]
    pub model: ModelArgs,
}
