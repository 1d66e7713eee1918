//! vlt - labeled secrets from the command line
//!
//! Commands:
//! - init: Store the vault master key
//! - save: Store a new secret with labels
//! - find: Search secrets by label and name globs
//! - show <ID>: Print a secret
//! - describe <ID>...: Show names and labels
//! - set <ID>: Replace a secret's value
//! - label / unlabel: Attach or remove labels
//! - rename <ID> <NAME>: Change a secret's name
//! - rm <ID>...: Delete secrets

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vlt::{schema, Column, LabeledSecrets, Store, StoreError};
use vlt_core::{process, Config};

#[derive(Parser)]
#[command(name = "vlt")]
#[command(about = "Labeled secrets in a local SQLite vault")]
#[command(version)]
#[command(after_help = r#"PATTERNS:
    --name and --label take shell-style globs, matched case-sensitively:
      *      any run of characters
      ?      any single character
      [ab]   one character from the set

    Several --label patterns match secrets carrying ANY of them.
    --label with --name matches secrets carrying any of the labels
    AND whose name matches.

EXAMPLES:
    vlt init
    vlt save --name github -l work -l ci
    vlt find -l work --name 'git*'
    vlt show 3 -n | pbcopy

CONFIG:
    ~/.config/vlt/config.yaml (database path, post_write/post_read hooks)
    VLT_DATABASE overrides the database location."#)]
struct Cli {
    /// Config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vault database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the vault master key (no-op if already set)
    Init {
        /// Master key (omit for a hidden prompt)
        #[arg(long)]
        key: Option<String>,
    },

    /// Store a new secret
    Save {
        /// Display name
        #[arg(long)]
        name: String,

        /// Label to attach (repeatable)
        #[arg(short = 'l', long = "label", required = true)]
        labels: Vec<String>,

        /// Secret value (omit for a hidden prompt)
        #[arg(conflicts_with = "stdin")]
        value: Option<String>,

        /// Read the value from stdin (one trailing newline is dropped)
        #[arg(long)]
        stdin: bool,
    },

    /// Search secrets by label and name globs (lists all with no filters)
    #[command(alias = "ls")]
    Find {
        /// Name glob
        #[arg(long)]
        name: Option<String>,

        /// Label glob (repeatable, any may match)
        #[arg(short = 'l', long = "label")]
        labels: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a secret's value
    Show {
        /// Don't print trailing newline (useful for piping)
        #[arg(short = 'n')]
        no_newline: bool,

        /// Secret ID
        id: i64,
    },

    /// Show names and labels of secrets
    Describe {
        /// Secret IDs
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a secret's value, creating it if the ID is unused
    Set {
        /// Secret ID
        id: i64,

        /// New value (omit for a hidden prompt)
        #[arg(conflicts_with = "stdin")]
        value: Option<String>,

        /// Read the value from stdin (one trailing newline is dropped)
        #[arg(long)]
        stdin: bool,
    },

    /// Attach labels to a secret
    Label {
        /// Secret ID
        id: i64,

        /// Labels to attach
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Remove labels matching globs from a secret
    Unlabel {
        /// Secret ID
        id: i64,

        /// Label globs
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Change a secret's name
    Rename {
        /// Secret ID
        id: i64,

        /// New name
        name: String,
    },

    /// Delete secrets and their labels
    #[command(alias = "remove")]
    Rm {
        /// Secret IDs
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

/// Everything a command needs
struct App {
    conn: Connection,
    config: Config,
    cancel: CancellationToken,
}

impl App {
    fn store(&self) -> Store<'_> {
        Store::new(&self.conn)
    }

    fn post_write(&self) -> Result<()> {
        process::run_hook(&self.cancel, &self.config.hooks.post_write)
            .context("post_write hook failed")
    }

    fn post_read(&self) -> Result<()> {
        process::run_hook(&self.cancel, &self.config.hooks.post_read)
            .context("post_read hook failed")
    }
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries secret values and JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let db_path = cli
        .database
        .clone()
        .unwrap_or_else(|| config.database_path());

    let conn = schema::open(&db_path)
        .with_context(|| format!("Failed to open vault: {}", db_path.display()))?;

    let cancel = CancellationToken::new();
    let rt = tokio::runtime::Runtime::new()?;
    rt.spawn(cancel_on_interrupt(cancel.clone()));

    let app = App {
        conn,
        config,
        cancel,
    };

    run(&app, cli.command)
}

/// First Ctrl-C cancels the running operation, a second one exits
async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("interrupted, cancelling (Ctrl-C again to force quit)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(130);
    }
}

fn run(app: &App, command: Option<Commands>) -> Result<()> {
    match command {
        Some(Commands::Init { key }) => cmd_init(app, key),
        command => {
            require_master_key(app)?;
            dispatch(app, command)
        }
    }
}

/// Commands that need an initialized vault
fn dispatch(app: &App, command: Option<Commands>) -> Result<()> {
    match command {
        Some(Commands::Init { key }) => cmd_init(app, key),
        Some(Commands::Save {
            name,
            labels,
            value,
            stdin,
        }) => cmd_save(app, &name, &labels, value, stdin),
        Some(Commands::Find { name, labels, json }) => cmd_find(app, name, &labels, json),
        Some(Commands::Show { no_newline, id }) => cmd_show(app, id, no_newline),
        Some(Commands::Describe { ids, json }) => cmd_describe(app, &ids, json),
        Some(Commands::Set { id, value, stdin }) => cmd_set(app, id, value, stdin),
        Some(Commands::Label { id, labels }) => cmd_label(app, id, &labels),
        Some(Commands::Unlabel { id, patterns }) => cmd_unlabel(app, id, &patterns),
        Some(Commands::Rename { id, name }) => cmd_rename(app, id, &name),
        Some(Commands::Rm { ids }) => cmd_rm(app, &ids),
        None => cmd_find(app, None, &[], false),
    }
}

fn require_master_key(app: &App) -> Result<()> {
    match app.store().query_master_key(&app.cancel) {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound(_)) => bail!("Vault not initialized - run 'vlt init' first"),
        Err(e) => Err(e).context("Failed to read master key"),
    }
}

/// Value from the argument, stdin, or a hidden prompt
fn read_value(value: Option<String>, stdin: bool) -> Result<String> {
    let value = if stdin {
        read_piped_value(io::stdin())?
    } else {
        match value {
            Some(v) => v,
            None => rpassword::prompt_password("Enter secret value: ")
                .context("Failed to read secret value")?,
        }
    };

    if value.is_empty() {
        bail!("Empty value not allowed");
    }
    Ok(value)
}

/// Everything read from `reader`, minus the single line ending `echo` adds
fn read_piped_value(mut reader: impl Read) -> Result<String> {
    let mut buffer = String::new();
    reader
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;

    if buffer.ends_with('\n') {
        buffer.pop();
        if buffer.ends_with('\r') {
            buffer.pop();
        }
    }
    Ok(buffer)
}

/// Store the master key
fn cmd_init(app: &App, key: Option<String>) -> Result<()> {
    let store = app.store();

    match store.query_master_key(&app.cancel) {
        Ok(_) => {
            println!("warning: Vault already initialized");
            return Ok(());
        }
        Err(StoreError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let key = match key {
        Some(k) => k,
        None => rpassword::prompt_password("Choose master key: ")
            .context("Failed to read master key")?,
    };
    if key.is_empty() {
        bail!("Empty master key not allowed");
    }

    store.insert_master_key(&app.cancel, &key)?;
    info!("vault initialized");

    println!("success: Vault initialized");
    app.post_write()
}

/// Store a secret and its labels in one transaction
fn cmd_save(
    app: &App,
    name: &str,
    labels: &[String],
    value: Option<String>,
    stdin: bool,
) -> Result<()> {
    let secret = read_value(value, stdin)?;

    let tx = app.conn.unchecked_transaction()?;
    let store = app.store().with_tx(&tx);

    let id = store.insert_new_secret(&app.cancel, name, &secret)?;
    for label in labels {
        store.insert_label(&app.cancel, label, id)?;
    }
    tx.commit().context("Failed to save secret")?;

    println!("success: Secret saved: {} ({})", id, name);
    app.post_write()
}

/// Search and print secrets
fn cmd_find(app: &App, name: Option<String>, labels: &[String], json: bool) -> Result<()> {
    let store = app.store();

    let found = match (name, labels.is_empty()) {
        (Some(name), false) => store.secrets_by_labels_and_name(&app.cancel, &name, labels)?,
        (None, false) => store.secrets_by_column(&app.cancel, Column::Label, labels)?,
        (Some(name), true) => store.secrets_by_column(&app.cancel, Column::SecretName, &[name])?,
        (None, true) => store.secrets_by_column::<&str>(&app.cancel, Column::Label, &[])?,
    };

    // A label search only returns the labels that matched; show them all.
    let secrets = if labels.is_empty() || found.is_empty() {
        found
    } else {
        let ids: Vec<i64> = found.keys().copied().collect();
        store.secrets_by_ids(&app.cancel, &ids)?
    };

    print_secrets(&secrets, json)
}

/// Print a secret
fn cmd_show(app: &App, id: i64, no_newline: bool) -> Result<()> {
    show_to(app, id, no_newline, &mut io::stdout())
}

fn show_to(app: &App, id: i64, no_newline: bool, out: &mut dyn Write) -> Result<()> {
    let value = app.store().secret(&app.cancel, id).map_err(|e| match e {
        StoreError::NotFound(_) => anyhow::anyhow!("Secret not found: {}", id),
        other => other.into(),
    })?;

    if no_newline {
        write!(out, "{}", value)?;
    } else {
        writeln!(out, "{}", value)?;
    }
    // The hook shares our stdout; the value must land first.
    out.flush()?;

    app.post_read()
}

fn cmd_describe(app: &App, ids: &[i64], json: bool) -> Result<()> {
    let secrets = app.store().secrets_by_ids(&app.cancel, ids)?;
    print_secrets(&secrets, json)
}

/// Replace a secret's value
fn cmd_set(app: &App, id: i64, value: Option<String>, stdin: bool) -> Result<()> {
    let secret = read_value(value, stdin)?;
    let affected = app.store().upsert_secret(&app.cancel, id, &secret)?;
    info!(id, affected, "secret value set");

    println!("success: Secret updated: {}", id);
    app.post_write()
}

fn cmd_label(app: &App, id: i64, labels: &[String]) -> Result<()> {
    let tx = app.conn.unchecked_transaction()?;
    let store = app.store().with_tx(&tx);
    for label in labels {
        store.insert_label(&app.cancel, label, id)?;
    }
    tx.commit()?;

    println!("success: Labeled {}: {}", id, labels.join(", "));
    app.post_write()
}

fn cmd_unlabel(app: &App, id: i64, patterns: &[String]) -> Result<()> {
    let removed = app.store().delete_labels(&app.cancel, id, patterns)?;

    println!("success: Removed {} label(s) from {}", removed, id);
    app.post_write()
}

fn cmd_rename(app: &App, id: i64, name: &str) -> Result<()> {
    app.store()
        .rename_secret(&app.cancel, id, name)
        .map_err(|e| match e {
            StoreError::NotFound(_) => anyhow::anyhow!("Secret not found: {}", id),
            other => other.into(),
        })?;

    println!("success: Renamed {} to {}", id, name);
    app.post_write()
}

fn cmd_rm(app: &App, ids: &[i64]) -> Result<()> {
    let removed = app.store().delete_secrets(&app.cancel, ids)?;
    if removed < ids.len() {
        warn!(requested = ids.len(), removed, "some secrets did not exist");
    }

    println!("success: Deleted {} secret(s)", removed);
    app.post_write()
}

fn print_secrets(secrets: &LabeledSecrets, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(secrets)?);
        return Ok(());
    }

    if secrets.is_empty() {
        println!("No matching secrets.");
        return Ok(());
    }

    println!("{:<6} {:<24} LABELS", "ID", "NAME");
    for (id, secret) in secrets {
        println!("{:<6} {:<24} {}", id, secret.name, secret.labels.join(", "));
    }

    Ok(())
}
