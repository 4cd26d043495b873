//! # chatvault CLI
//!
//! Command-line interface for the chatvault library.

use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;

use chatvault::cli::Args;
use chatvault::events::stderr_events;
use chatvault::logging;
use chatvault::source::DumpSource;
use chatvault::{Backup, VaultError};

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(e) = run().await {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), VaultError> {
    let total_start = Instant::now();
    let args = <Args as ClapParser>::parse();
    let config = args.backup_config()?;

    // Print header
    println!("📦 chatvault v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Dump:    {}", args.dump.display());
    println!("💾 Output:  {}", config.backup_dir.display());
    if config.targets.is_empty() {
        println!("🎯 Targets: all");
    } else {
        println!("🎯 Targets: {}", config.targets.join(", "));
    }
    println!("📄 Chunk:   {} messages", config.chunk_size);
    if let Some(limit) = config.limit() {
        println!("✂️  Limit:   {} messages", limit);
    }
    if config.media.is_enabled() {
        println!(
            "🖼️  Media:   photos={} documents={}",
            config.media.photos, config.media.documents
        );
    }
    println!();

    let source = DumpSource::open(&args.dump).await?;
    let backup = Backup::new(source, config).with_events(stderr_events());

    if args.list {
        let queue = backup.select().await?;
        println!("📋 {} conversation(s) selected:", queue.len());
        for peer in queue.pending() {
            println!("   {}", peer);
        }
        return Ok(());
    }

    let report = backup.run().await?;
    let total_time = total_start.elapsed();

    println!();
    if report.is_empty() {
        println!("ℹ️  Nothing to back up");
        return Ok(());
    }
    println!("✅ Done! Backups saved to {}", backup.config().backup_dir.display());

    // Summary
    println!();
    println!("📊 Summary:");
    for conversation in &report.conversations {
        println!(
            "   {}: {} messages, {} page(s) -> {}",
            conversation.conversation,
            conversation.stats.messages_written,
            conversation.stats.pages_fetched,
            conversation.path.display()
        );
    }
    println!("   Messages:  {}", report.messages_written());
    if backup.config().media.is_enabled() {
        println!(
            "   Media:     {} saved, {} failed",
            report.media_saved(),
            report.media_failed()
        );
    }
    if report.missing_timestamps() > 0 {
        println!("   Undated:   {}", report.missing_timestamps());
    }

    // Performance stats
    println!();
    println!("⚡ Performance:");
    println!("   Total time:  {:.2}s", total_time.as_secs_f64());

    Ok(())
}
