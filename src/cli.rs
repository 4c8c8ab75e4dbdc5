use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::discord::DiscordClient;
use crate::load_config::{load_config, BatchConfig};
use crate::render::render_report;
use ideograbber_core::contract::Destination;
use ideograbber_core::extract::emojis_in_text;
use ideograbber_core::{Item, ReplicationEngine, SelectionModel};

/// Identity recorded in audit-log reasons when neither `--as` nor `requested_by` is set.
const DEFAULT_IDENTITY: &str = "ideograbber";

/// CLI for ideograbber: copy custom expressions into many servers at once.
#[derive(Parser)]
#[clap(
    name = "ideograbber",
    version,
    about = "Copy custom emoji, stickers and image attachments into Discord servers"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy the items of a batch file into its destination servers
    Copy {
        /// Path to the YAML batch file
        #[clap(long)]
        config: PathBuf,
        /// Also copy every custom emoji and sticker of this server
        #[clap(long = "from-guild")]
        from_guild: Option<u64>,
        /// Only copy these item ids (default: every item in the batch)
        #[clap(long = "item")]
        items: Vec<u64>,
        /// Only copy into these server ids (default: every destination in the batch)
        #[clap(long = "destination")]
        destinations: Vec<u64>,
        /// Name recorded in audit-log reasons; overrides `requested_by`
        #[clap(long = "as")]
        requested_by: Option<String>,
        /// Print the report as JSON
        #[clap(long)]
        json: bool,
    },
    /// List the custom emoji referenced in a piece of message text
    Extract {
        #[clap(long)]
        text: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Copy {
            config,
            from_guild,
            items,
            destinations,
            requested_by,
            json,
        } => {
            let batch = load_config(&config)?;
            let request = CopyRequest {
                from_guild,
                item_ids: items,
                destination_ids: destinations,
                requested_by,
                json,
            };
            copy(batch, request).await
        }
        Commands::Extract { text } => {
            extract(&text);
            Ok(())
        }
    }
}

/// Command-line choices for one `copy` run.
struct CopyRequest {
    from_guild: Option<u64>,
    item_ids: Vec<u64>,
    destination_ids: Vec<u64>,
    requested_by: Option<String>,
    json: bool,
}

async fn copy(batch: BatchConfig, request: CopyRequest) -> Result<()> {
    let CopyRequest {
        from_guild,
        item_ids,
        destination_ids,
        requested_by,
        json,
    } = request;
    let identity = requested_by
        .or(batch.requested_by)
        .unwrap_or_else(|| DEFAULT_IDENTITY.to_string());

    for id in &destination_ids {
        if !batch.destinations.contains(id) {
            anyhow::bail!("Destination {id} is not listed in the batch file");
        }
    }
    // Server expressions are only known once listed remotely.
    if from_guild.is_none() {
        for id in &item_ids {
            if !batch.items.iter().any(|spec| spec.id() == *id) {
                anyhow::bail!("Item {id} is not listed in the batch file");
            }
        }
    }

    let client = Arc::new(DiscordClient::new_from_env().map_err(anyhow::Error::msg)?);

    // Only servers that will be written to are resolved.
    let wanted = if destination_ids.is_empty() {
        batch.destinations.as_slice()
    } else {
        destination_ids.as_slice()
    };
    let mut guilds: Vec<Arc<dyn Destination>> = Vec::with_capacity(wanted.len());
    for &id in wanted {
        let guild = client
            .guild(id)
            .await
            .with_context(|| format!("Failed to resolve server {id}"))?;
        tracing::info!(guild_id = id, guild = %guild.name(), "Resolved destination server");
        guilds.push(Arc::new(guild));
    }

    let mut catalog: Vec<Item> = batch
        .items
        .into_iter()
        .map(|spec| {
            let url = spec.content_url();
            spec.into_item(Arc::new(client.content(url)))
        })
        .collect();
    if let Some(source) = from_guild {
        let expressions = client
            .guild_expressions(source)
            .await
            .with_context(|| format!("Failed to list expressions of server {source}"))?;
        if expressions.is_empty() {
            tracing::warn!(guild_id = source, "Source server has no copyable emoji or stickers");
        }
        catalog.extend(expressions);
    }

    let mut model = SelectionModel::new(catalog, guilds);
    if item_ids.is_empty() {
        model.select_all()?;
    } else {
        if let Some(id) = item_ids.iter().find(|id| !model.has_item(**id)) {
            anyhow::bail!("Item {id} is not listed in the batch file or the source server");
        }
        let all_guilds: Vec<u64> = model.destinations().iter().map(|d| d.id()).collect();
        model.set_selected_items(&item_ids)?;
        model.set_selected_destinations(&all_guilds)?;
    }
    let selection = model.commit();

    let engine = ReplicationEngine::new(batch.replication)
        .with_span(tracing::info_span!("copy_batch", requested_by = %identity));
    if !json {
        println!("Replication starting...");
    }
    match engine.replicate(&selection, &identity).await {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_report(&report));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("[ERROR] Replication aborted: {}", e);
            Err(anyhow::anyhow!("Replication aborted: {e}"))
        }
    }
}

fn extract(text: &str) {
    let found = emojis_in_text(text);
    if found.is_empty() {
        println!("No custom emoji found.");
        return;
    }
    for emoji in found {
        let kind = if emoji.animated { "animated" } else { "static" };
        println!("{} {} {} {}", emoji.name, emoji.id, kind, emoji.url());
    }
}
