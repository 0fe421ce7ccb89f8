//! Init command implementation
//!
//! Writes a starter `selfquery.toml` and `.env.example`.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// selfquery.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing selfquery project");

    let base_path = &config.path;
    let config_path = base_path.join("selfquery.toml");
    if config_path.exists() && !config.force {
        output.warning("selfquery.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = base_path.join("data");
    if !data_dir.exists() {
        if let Err(e) = fs::create_dir_all(&data_dir) {
            output.error(&format!("Failed to create data: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.created("directory", "data");
    } else {
        output.skipped("data", "already exists");
    }

    if let Err(e) = write_file(&config_path, DEFAULT_CONFIG, config.force) {
        output.error(&format!("Failed to create selfquery.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "selfquery.toml");

    let env_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_path, ENV_EXAMPLE, config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    output.complete("Project initialized");
    output.hint("Copy .env.example to .env and set DASHSCOPE_API_KEY, then try:");
    output.command("selfquery videos \"videos longer than 600 seconds\"");
    output.command("selfquery ask --file notes.md \"What is reinforcement learning?\"");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(()); // Skip existing files unless force is true
    }
    fs::write(path, content)
}

/// Starter configuration written by `init`.
pub const DEFAULT_CONFIG: &str = r#"# selfquery configuration

[logging]
# Used when RUST_LOG is not set
level = "info"

[llm]
# "openai" (any OpenAI-compatible endpoint) or "ollama"
type = "openai"
model = "qwen3-max"
api_base = "https://dashscope.aliyuncs.com/compatible-mode/v1"
api_key_env = "DASHSCOPE_API_KEY"
temperature = 0.7
max_tokens = 2048
timeout_secs = 60

[embedding]
# "openai" (any OpenAI-compatible /embeddings endpoint) or "fastembed"
# (local, needs the local-embeddings feature, e.g. model = "BAAI/bge-small-zh-v1.5")
type = "openai"
model = "text-embedding-v3"
api_base = "https://dashscope.aliyuncs.com/compatible-mode/v1"
api_key_env = "DASHSCOPE_API_KEY"
normalize = true
cache_entries = 1024

[rag]
chunk_size = 1000
chunk_overlap = 200
top_k = 3
# snapshot_path = "data/videos.snapshot.json"

[retriever]
default_limit = 4
enable_limit = true
document_contents = "Video metadata recording each video's title, author, view count and duration"
queries = [
    "the shortest video",
    "videos longer than 600 seconds",
    "the most viewed video",
    "videos whose author is 'Datawhale'",
]

[[retriever.fields]]
name = "title"
type = "string"
description = "Video title"

[[retriever.fields]]
name = "author"
type = "string"
description = "Video author (uploader name)"

[[retriever.fields]]
name = "view_count"
type = "integer"
description = "Number of views"

[[retriever.fields]]
name = "length"
type = "integer"
description = "Video length in seconds"

[source]
base_url = "https://api.bilibili.com"
referer = "https://www.bilibili.com/"
timeout_secs = 10
request_interval_ms = 1000
videos = [
    "https://www.bilibili.com/video/BV1Bo4y1A7FU",
    "https://www.bilibili.com/video/BV1ug4y157xA",
    "https://www.bilibili.com/video/BV1yh411V7ge",
]
"#;

const ENV_EXAMPLE: &str = r#"# selfquery environment variables
# Copy this file to .env and fill in the values.

# API key for the OpenAI-compatible endpoint (DashScope by default)
DASHSCOPE_API_KEY=sk-...

# Optional: Logging level (trace, debug, info, warn, error)
RUST_LOG=info,selfquery=debug
"#;
