use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use pinvault_core::VERSION;

/// PinVault - notes behind a passcode anyone may try to guess once a day
#[derive(Parser)]
#[command(name = "pinvault")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the vault store
    #[arg(short, long, global = true, env = "PINVAULT_STORE")]
    pub store: Option<String>,

    /// Act as this identity (device:<token> or account:<id>)
    #[arg(long = "as", global = true, env = "PINVAULT_AS", value_name = "IDENTITY")]
    pub identity: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a config file and an empty vault store
    Init(InitArgs),

    /// Publish a new entry under a keyword
    Create(CreateArgs),

    /// Look up an entry by keyword
    Show(ShowArgs),

    /// List entries you own
    List,

    /// Guess the passcode of an entry
    Challenge(ChallengeArgs),

    /// Set the passcode of an entry you own
    SetPasscode(SetPasscodeArgs),

    /// Edit the body or media of an entry you own
    Edit(EditArgs),

    /// Set or clear the failed-attempt notification threshold
    Notify(NotifyArgs),

    /// Raise the passcode length of an entry using a purchase
    Upgrade(UpgradeArgs),

    /// Record a passcode-length purchase
    Grant(GrantArgs),

    /// Publish stolen entries whose grace period has passed
    Sweep,

    /// Delete an entry you own
    Delete(DeleteArgs),

    /// Check store integrity
    Check,

    /// Back up the store
    Backup(BackupArgs),

    /// Notification outbox commands
    #[command(subcommand)]
    Notifications(NotificationCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Path where the store will be created
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Device token to act as (generated when omitted)
    #[arg(long)]
    pub device_token: Option<String>,

    /// Attempt window
    #[arg(long, value_enum, default_value_t = WindowArg::Rolling)]
    pub window: WindowArg,

    /// IANA timezone for the calendar-day window
    #[arg(long)]
    pub timezone: Option<String>,

    /// Hours a stolen entry stays hidden
    #[arg(long, default_value_t = 24)]
    pub grace_period_hours: u32,

    /// Config path override
    #[arg(long)]
    pub config_path: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WindowArg {
    Rolling,
    CalendarDay,
}

/// Arguments for the `create` command
#[derive(Args)]
pub struct CreateArgs {
    /// Keyword the entry is found by (case-sensitive)
    #[arg(value_name = "KEYWORD")]
    pub keyword: String,

    /// Entry body
    #[arg(long, default_value = "")]
    pub body: String,

    /// Media URL (repeatable)
    #[arg(long, value_name = "URL")]
    pub media: Vec<String>,

    /// Initial 3-digit passcode (prompted when omitted on a terminal)
    #[arg(long)]
    pub passcode: Option<String>,
}

/// Arguments for the `show` command
#[derive(Args)]
pub struct ShowArgs {
    /// Keyword of the entry
    #[arg(value_name = "KEYWORD")]
    pub keyword: String,

    /// Print the passcode (owner only)
    #[arg(long)]
    pub reveal: bool,
}

/// Arguments for the `challenge` command
#[derive(Args)]
pub struct ChallengeArgs {
    /// Entry keyword or ID
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// Guessed passcode
    #[arg(value_name = "GUESS")]
    pub guess: String,
}

/// Arguments for the `set-passcode` command
#[derive(Args)]
pub struct SetPasscodeArgs {
    /// Entry keyword or ID
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// New passcode (prompted when omitted on a terminal)
    #[arg(long)]
    pub passcode: Option<String>,
}

/// Arguments for the `edit` command
#[derive(Args)]
pub struct EditArgs {
    /// Entry keyword or ID
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// New body
    #[arg(long)]
    pub body: Option<String>,

    /// Replacement media URL list (repeatable)
    #[arg(long, value_name = "URL")]
    pub media: Vec<String>,

    /// Remove all media
    #[arg(long, conflicts_with = "media")]
    pub clear_media: bool,
}

/// Arguments for the `notify` command
#[derive(Args)]
pub struct NotifyArgs {
    /// Entry keyword or ID
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// Notify after every N failed attempts
    #[arg(long, value_name = "N", conflicts_with = "off")]
    pub every: Option<u32>,

    /// Stop failed-attempt notifications
    #[arg(long)]
    pub off: bool,
}

/// Arguments for the `upgrade` command
#[derive(Args)]
pub struct UpgradeArgs {
    /// Entry keyword or ID
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// New passcode length
    #[arg(long, value_name = "DIGITS")]
    pub length: u8,
}

/// Arguments for the `grant` command
#[derive(Args)]
pub struct GrantArgs {
    /// Passcode length purchased
    #[arg(long, value_name = "DIGITS")]
    pub length: u8,

    /// Purchase reference; recording the same reference twice is a no-op
    #[arg(long)]
    pub reference: String,

    /// Buyer identity (defaults to the acting identity)
    #[arg(long, value_name = "IDENTITY")]
    pub owner: Option<String>,
}

/// Arguments for the `delete` command
#[derive(Args)]
pub struct DeleteArgs {
    /// Entry keyword or ID
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `backup` command
#[derive(Args)]
pub struct BackupArgs {
    /// Destination path
    #[arg(value_name = "DEST")]
    pub destination: String,
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// Retry delivery of pending notifications
    Flush,
}
