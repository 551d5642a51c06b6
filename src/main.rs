//! Binary entrypoint for the kit administration CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and an empty kit document
//! - `list [--all]` - list kit names (hidden kits with `--all`)
//! - `view <kit>` - print one kit definition
//! - `create <kit> [--item material:amount]... [--command cmd]... [options]`
//! - `remove <kit>` / `rename <old> <new>`
//! - `reset-usage <uuid> [kit]` - forget a user's usage of one kit or all kits
//!
//! See the library crate docs for module-level details: `kitredeem::`.
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use uuid::Uuid;

use kitredeem::config::Config;
use kitredeem::kits::{ItemStack, KitService};

#[derive(Parser)]
#[command(name = "kitredeem")]
#[command(about = "Administer kit definitions and redemption usage")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration and kit document
    Init,
    /// List kit names
    List {
        /// Include hidden kits
        #[arg(short, long)]
        all: bool,
    },
    /// Show a kit definition
    View { kit: String },
    /// Create a new kit
    Create {
        kit: String,
        /// Item stack as material:amount (repeatable)
        #[arg(short, long = "item")]
        items: Vec<String>,
        /// Console command run on redemption; {player} is substituted (repeatable)
        #[arg(long = "command")]
        commands: Vec<String>,
        #[arg(long, default_value_t = 0.0)]
        cost: f64,
        /// Cooldown in seconds
        #[arg(long)]
        cooldown: Option<i64>,
        #[arg(long)]
        one_time: bool,
        /// Grant automatically on a user's first join
        #[arg(long)]
        first_join: bool,
        /// Usable without the per-kit permission
        #[arg(long)]
        no_permission: bool,
        #[arg(long)]
        hidden: bool,
    },
    /// Delete a kit
    Remove { kit: String },
    /// Rename a kit
    Rename { old: String, new: String },
    /// Forget a user's usage of one kit, or of all kits
    ResetUsage { uuid: String, kit: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            Config::load(&cli.config).await?
        }
        _ => Config::load(&cli.config).await?,
    };
    init_logging(&Some(config.clone()), cli.verbose);
    let mut service = KitService::open(&config)?;

    match cli.command {
        Commands::Init => {
            info!("Initialized kit configuration at {}", cli.config);
            println!("Created {}", cli.config);
            println!("Kits are stored in {}", service.store().path().display());
        }
        Commands::List { all } => {
            let names = service.list_kits(all);
            if names.is_empty() {
                println!("No kits defined.");
            }
            for name in names {
                println!("{}", name);
            }
        }
        Commands::View { kit } => {
            let kit = service
                .view_kit(&kit)
                .ok_or_else(|| anyhow!("Unknown kit: {}", kit))?;
            println!("{}", serde_json::to_string_pretty(kit)?);
        }
        Commands::Create {
            kit,
            items,
            commands,
            cost,
            cooldown,
            one_time,
            first_join,
            no_permission,
            hidden,
        } => {
            let stacks = items
                .iter()
                .map(|text| parse_item(text))
                .collect::<Result<Vec<_>>>()?;
            service.add_kit(&kit, stacks)?;
            for command in &commands {
                service.add_command(&kit, command)?;
            }
            if cost > 0.0 {
                service.set_cost(&kit, cost)?;
            }
            if let Some(secs) = cooldown {
                let cooldown = chrono::Duration::try_seconds(secs)
                    .ok_or_else(|| anyhow!("Cooldown of {} seconds is out of range", secs))?;
                service.set_cooldown(&kit, Some(cooldown))?;
            }
            if one_time {
                service.set_one_time(&kit, true)?;
            }
            if first_join {
                service.set_auto_redeem(&kit, true)?;
            }
            if no_permission {
                service.set_permission_bypass(&kit, true)?;
            }
            if hidden {
                service.set_hidden(&kit, true)?;
            }
            println!("Created kit {}", kit);
        }
        Commands::Remove { kit } => {
            if service.remove_kit(&kit)? {
                println!("Removed kit {}", kit);
            } else {
                println!("No kit named {}", kit);
            }
        }
        Commands::Rename { old, new } => {
            service.rename_kit(&old, &new)?;
            println!("Renamed kit {} to {}", old, new);
        }
        Commands::ResetUsage { uuid, kit } => {
            let user = Uuid::parse_str(&uuid).with_context(|| format!("Invalid uuid {}", uuid))?;
            let cleared = service.reset_usage(&user, kit.as_deref())?;
            println!("Cleared {} usage record(s) for {}", cleared, user);
        }
    }

    Ok(())
}

/// Parse `material[:amount]`; the amount defaults to 1.
fn parse_item(text: &str) -> Result<ItemStack> {
    let (material, amount) = match text.split_once(':') {
        Some((material, amount)) => (
            material,
            amount
                .trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid amount in item {}", text))?,
        ),
        None => (text, 1),
    };
    let material = material.trim();
    if material.is_empty() {
        return Err(anyhow!("Item {} has no material", text));
    }
    Ok(ItemStack::new(material, amount))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.log_level())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    let Some(file) = log_file else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
        let _ = builder.try_init();
        return;
    };

    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());
    let file = std::sync::Arc::new(std::sync::Mutex::new(file));
    // Console output only when attached to a terminal; otherwise the file is enough.
    let is_tty = atty::is(atty::Stream::Stdout);

    builder.format(move |fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{} [{}] {}", ts, record.level(), record.args());

        if let Ok(mut guard) = file.lock() {
            let _ = writeln!(guard, "{}", line);
        }

        if record.target() == "security" {
            if let Some(ref sec_path) = security_path {
                if let Ok(mut sf) = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(sec_path)
                {
                    let _ = writeln!(sf, "{}", line);
                }
            }
        }

        if is_tty {
            writeln!(fmt, "{}", line)
        } else {
            Ok(())
        }
    });
    let _ = builder.try_init();
}
