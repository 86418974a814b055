//! Clap derive structures for the `zealnet` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// zealnet -- captive-portal client for ZealNet deployments
#[derive(Debug, Parser)]
#[command(
    name = "zealnet",
    version,
    about = "Work with ZealNet captive portals from the command line",
    long_about = "Client tooling for the ZealNet WiFi billing portal.\n\n\
        Parses MikroTik hotspot redirects and submits the login, keeps a durable\n\
        queue of payments and profile changes made while offline, and listens\n\
        on the portal's live socket.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Portal profile to use
    #[arg(long, short = 'p', env = "ZEALNET_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Portal API base URL (overrides profile)
    #[arg(long, env = "ZEALNET_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Directory holding the offline queue and auth token (overrides profile)
    #[arg(long, env = "ZEALNET_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ZEALNET_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ZEALNET_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ZEALNET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse MikroTik hotspot redirects and submit the login
    #[command(alias = "hs")]
    Hotspot(HotspotArgs),

    /// Manage the offline action queue
    #[command(alias = "q")]
    Queue(QueueArgs),

    /// Talk to the portal's live socket
    #[command(alias = "ws")]
    Socket(SocketArgs),

    /// Manage the stored portal auth token
    Auth(AuthArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HOTSPOT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HotspotArgs {
    #[command(subcommand)]
    pub command: HotspotCommand,
}

#[derive(Debug, Subcommand)]
pub enum HotspotCommand {
    /// Show the router parameters carried by a redirect URL
    Parse {
        /// Redirect URL (or bare query string) the router sent the client to
        url: String,
    },

    /// Build the controller login URL and optionally submit it
    Login {
        /// Redirect URL (or bare query string) the router sent the client to
        url: String,

        /// Username (default: username, MAC or IP from the redirect)
        #[arg(long, short = 'u')]
        username: Option<String>,

        /// Password (default: derived from the client MAC)
        #[arg(long, conflicts_with = "prompt_password")]
        password: Option<String>,

        /// Prompt for the password instead of deriving it
        #[arg(long)]
        prompt_password: bool,

        /// Perform the login request instead of printing the URL
        #[arg(long)]
        follow: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  QUEUE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionKindArg {
    /// POST /api/payments
    Payment,
    /// POST /api/plans/purchase
    PlanPurchase,
    /// PUT /api/user/profile
    ProfileUpdate,
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Queue an action for delivery
    Add {
        /// Action kind
        kind: ActionKindArg,

        /// JSON payload
        #[arg(long, short = 'd', required_unless_present = "from_file", conflicts_with = "from_file")]
        data: Option<String>,

        /// Read the JSON payload from a file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,

        /// Try to deliver the queue right away
        #[arg(long)]
        process: bool,
    },

    /// List pending actions, oldest first
    #[command(alias = "ls")]
    List,

    /// Print the number of pending actions
    Len,

    /// Deliver pending actions now
    Process,

    /// Drop every pending action
    Clear,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SOCKET
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SocketArgs {
    #[command(subcommand)]
    pub command: SocketCommand,
}

#[derive(Debug, Subcommand)]
pub enum SocketCommand {
    /// Print incoming messages until interrupted
    Listen {
        /// Only show messages of these types (comma-separated)
        #[arg(long = "type", short = 't', value_delimiter = ',')]
        types: Option<Vec<String>>,

        /// Exit after this many messages
        #[arg(long, short = 'n')]
        count: Option<usize>,
    },

    /// Send one message and exit
    Send {
        /// Message type
        #[arg(value_name = "TYPE")]
        kind: String,

        /// JSON payload (default: null)
        #[arg(long, short = 'd')]
        data: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store the portal auth token
    SetToken {
        /// Token value (prompted for when omitted)
        token: Option<String>,
    },

    /// Remove the stored auth token
    ClearToken,

    /// Show whether a token is stored
    Status,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
