use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncReadExt;

use crate::secret::Secret;
use crate::types::{Action, AuxStrings, Notification, Request};
use crate::ui::Bar;
use crate::worker::Worker;

/// Parameters shared by every subcommand.
#[derive(Args)]
pub struct CryptoArgs {
    /// Password to derive the layer keys from.
    #[arg(short, long)]
    password: String,

    /// Nesting rule: a non-negative decimal integer whose binary expansion
    /// selects the cipher for each layer.
    #[arg(short, long)]
    rule: String,

    /// Per-byte password transform expression over `b` (byte) and `i` (round).
    #[arg(short, long, default_value = "b")]
    transform: String,

    /// Auxiliary salt string applied to the password stretch.
    #[arg(long, default_value = "")]
    path: String,

    /// Auxiliary salt string applied to the key expansion.
    #[arg(long, default_value = "")]
    upper: String,

    /// Auxiliary info string applied to the key expansion.
    #[arg(long, default_value = "")]
    lower: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encrypt text into a layered wire ciphertext.
    Encrypt {
        /// Plaintext to encrypt; read from stdin when omitted.
        #[arg(short, long)]
        input: Option<String>,

        #[command(flatten)]
        args: CryptoArgs,
    },

    /// Decrypt a wire ciphertext back to text.
    Decrypt {
        /// Wire ciphertext; read from stdin when omitted.
        #[arg(short, long)]
        input: Option<String>,

        #[command(flatten)]
        args: CryptoArgs,
    },

    /// Run the decryption pipeline without printing the plaintext.
    Verify {
        /// Wire ciphertext; read from stdin when omitted.
        #[arg(short, long)]
        input: Option<String>,

        #[command(flatten)]
        args: CryptoArgs,
    },
}

#[derive(Parser)]
#[command(
    name = "nestlock",
    version = "1.2.0",
    about = "Layered text encryption with nested AES-256-GCM and ChaCha20-Poly1305 layers."
)]
pub struct App {
    #[command(subcommand)]
    command: Commands,
}

impl App {
    pub fn init() -> Result<Self> {
        let subscriber = tracing_subscriber::fmt().with_file(true).with_line_number(true).finish();
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(Self::parse())
    }

    pub async fn execute(self) -> Result<()> {
        let (action, input, args) = match self.command {
            Commands::Encrypt { input, args } => (Action::Encrypt, input, args),
            Commands::Decrypt { input, args } => (Action::Decrypt, input, args),
            Commands::Verify { input, args } => (Action::Verify, input, args),
        };

        let payload = match input {
            Some(text) => text,
            None => Self::read_stdin().await?,
        };

        let request = Request {
            action,
            payload,
            password: Secret::new(&args.password),
            rule: args.rule,
            transform: args.transform,
            aux: AuxStrings::new(&args.path, &args.upper, &args.lower),
        };

        let worker = Worker::spawn();
        let mut notifications = worker.submit(request);

        let mut bar: Option<Bar> = None;
        while let Some(notification) = notifications.recv().await {
            match notification {
                Notification::Progress { current_step, total_steps, .. } => {
                    let bar = bar.get_or_insert_with(|| {
                        Bar::new(total_steps as u64, action.label())
                    });
                    bar.set_step(current_step as u64);
                }
                Notification::Success { result, .. } => {
                    if let Some(bar) = bar.take() {
                        bar.finish();
                    }
                    match action {
                        Action::Verify => println!("ok: ciphertext verified"),
                        _ => println!("{result}"),
                    }
                    return Ok(());
                }
                Notification::Error { error, .. } => {
                    if let Some(bar) = bar.take() {
                        bar.finish();
                    }
                    bail!("{action} failed: {error}");
                }
            }
        }

        bail!("{action} failed: worker closed without a result");
    }

    async fn read_stdin() -> Result<String> {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("reading stdin")?;

        // A trailing newline is shell noise, not payload.
        while buffer.ends_with('\n') || buffer.ends_with('\r') {
            buffer.pop();
        }

        if buffer.is_empty() {
            bail!("no input provided");
        }

        Ok(buffer)
    }
}
