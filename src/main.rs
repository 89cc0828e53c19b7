use anyhow::{Context, Result};
use clap::Parser;
use remote_memory::cli::{Cli, Commands, MemoryTarget};
use remote_memory::{
    utils, AddressSpec, FileSystemResourceStore, HttpMemory, MemoryRecord, Message,
    OperationContext, ResourceLocator, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::new().context("Failed to load settings")?;
    remote_memory::init_logging(&settings);

    let cli = Cli::parse();
    let root = cli.store.clone().unwrap_or_else(|| settings.store.root.clone());
    let store = Arc::new(FileSystemResourceStore::new(PathBuf::from(root)).await?);

    let result = match cli.command {
        Commands::Add {
            target,
            session,
            file,
        } => handle_add(&settings, store, target, session, file).await,
        Commands::Get {
            target,
            session,
            json,
        } => handle_get(&settings, store, target, session, json).await,
        Commands::Show { target } => handle_show(store, target).await,
        Commands::Register { target, address } => handle_register(store, target, address).await,
    };

    if let Err(e) = result {
        utils::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn connect(
    settings: &Settings,
    store: Arc<FileSystemResourceStore>,
    target: &MemoryTarget,
    session: Option<String>,
) -> Result<HttpMemory> {
    let mut builder = HttpMemory::builder()
        .store(store)
        .name(&target.name)
        .namespace(&target.namespace)
        .settings(settings.memory.clone());
    if let Some(session) = session {
        builder = builder.session_id(session);
    }
    Ok(builder.build().await?)
}

async fn read_messages(file: &str) -> Result<Vec<Message>> {
    let json = if file == "-" {
        let mut input = String::new();
        tokio::io::stdin().read_to_string(&mut input).await?;
        input
    } else {
        tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file))?
    };
    serde_json::from_str(&json).context("Expected a JSON array of messages")
}

async fn handle_add(
    settings: &Settings,
    store: Arc<FileSystemResourceStore>,
    target: MemoryTarget,
    session: Option<String>,
    file: String,
) -> Result<()> {
    let messages = read_messages(&file).await?;
    let memory = connect(settings, store, &target, session).await?;

    memory
        .add_messages(&OperationContext::background(), &messages)
        .await?;
    memory.close().await;

    utils::print_success(&format!(
        "Added {} messages to session '{}'",
        messages.len(),
        memory.session_id()
    ));
    Ok(())
}

async fn handle_get(
    settings: &Settings,
    store: Arc<FileSystemResourceStore>,
    target: MemoryTarget,
    session: Option<String>,
    json: bool,
) -> Result<()> {
    let memory = connect(settings, store, &target, session).await?;
    let messages = memory.get_messages(&OperationContext::background()).await?;
    memory.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    utils::print_header(&format!("Session {}", memory.session_id()));
    if messages.is_empty() {
        utils::print_info("No messages");
    }
    for message in &messages {
        utils::print_message(message);
    }
    Ok(())
}

async fn handle_show(store: Arc<FileSystemResourceStore>, target: MemoryTarget) -> Result<()> {
    let record = store.get(&target.name, &target.namespace).await?;

    utils::print_header(&format!("Memory {}", record.target()));
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn handle_register(
    store: Arc<FileSystemResourceStore>,
    target: MemoryTarget,
    address: String,
) -> Result<()> {
    let record = MemoryRecord::new(
        &target.name,
        &target.namespace,
        AddressSpec::literal(&address),
    )
    .with_uid(format!("{}.{}", target.namespace, target.name))
    .with_resolved_address(&address);

    let stored = store.put(record).await?;
    utils::print_success(&format!(
        "Registered {} at {} (version {})",
        stored.target(),
        address,
        stored.metadata.resource_version
    ));
    Ok(())
}
