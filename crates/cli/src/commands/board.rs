//! `slotboard list|place|remove|reorder|rebuild|upsert` — Board operations.

use clap::{Args, ValueEnum};
use slotboard_core::{SlotContent, SlotEntry};
use slotboard_engine::SlotAssignment;

use super::{cancel_on_ctrl_c, open_board};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum KindArg {
    #[default]
    Article,
    Event,
    Video,
}

/// Payload flags shared by `place` and `upsert`.
#[derive(Debug, Clone, Default, Args)]
pub struct ContentArgs {
    /// Content type
    #[arg(long, value_enum, default_value_t = KindArg::Article)]
    pub kind: KindArg,

    /// Title; without it `place` uses the stored payload
    #[arg(long)]
    pub title: Option<String>,

    /// Link (required for videos)
    #[arg(long)]
    pub url: Option<String>,

    /// Article summary
    #[arg(long)]
    pub summary: Option<String>,

    /// Event venue
    #[arg(long)]
    pub venue: Option<String>,
}

impl ContentArgs {
    /// Build a payload, or `None` when no title was given.
    pub fn into_content(self) -> Result<Option<SlotContent>, String> {
        let Some(title) = self.title else {
            return Ok(None);
        };
        let content = match self.kind {
            KindArg::Article => SlotContent::Article {
                title,
                summary: self.summary,
                url: self.url,
                image_url: None,
                topic_id: None,
            },
            KindArg::Event => SlotContent::Event {
                title,
                venue: self.venue,
                starts_at: None,
                ends_at: None,
                image_url: None,
            },
            KindArg::Video => SlotContent::Video {
                title,
                url: self.url.ok_or("--url is required for videos")?,
                thumbnail_url: None,
                duration_secs: None,
            },
        };
        Ok(Some(content))
    }
}

/// Parse `slot=contentId`; an empty id leaves the slot empty.
pub fn parse_assignment(raw: &str) -> Result<SlotAssignment, String> {
    let (slot, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected slot=contentId, got '{raw}'"))?;
    let slot: u32 = slot
        .trim()
        .parse()
        .map_err(|_| format!("invalid slot number in '{raw}'"))?;
    let id = id.trim();
    Ok(if id.is_empty() {
        SlotAssignment::empty(slot)
    } else {
        SlotAssignment::new(slot, id)
    })
}

fn print_entries(board: &str, entries: &[SlotEntry]) {
    if entries.is_empty() {
        println!("   Board '{board}' is empty.");
        return;
    }
    for entry in entries {
        println!(
            "  {:>2}. {:<24} [{:?}] {}",
            entry.slot,
            entry.content_id,
            entry.record.content.kind(),
            entry.record.content.title()
        );
    }
}

pub async fn list(board: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_board(board).await?;
    let entries = engine.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("📋 Board '{board}' ({}/{})", entries.len(), engine.scope().capacity);
        print_entries(board, &entries);
    }
    Ok(())
}

pub async fn place(
    board: &str,
    slot: u32,
    content_id: &str,
    content: ContentArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_board(board).await?;
    let payload = content.into_content()?;
    let outcome = engine
        .place(slot, content_id, payload, &cancel_on_ctrl_c())
        .await?;

    println!("✅ Placed '{content_id}' at slot {}", outcome.slot);
    for moved in &outcome.shifted {
        println!("   moved '{}' {} → {}", moved.content_id, moved.from, moved.to);
    }
    if let Some(evicted) = &outcome.evicted {
        println!("   ⚠️  evicted '{evicted}' (board full)");
    }
    Ok(())
}

pub async fn remove(board: &str, content_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_board(board).await?;
    let outcome = engine.delete(content_id, &cancel_on_ctrl_c()).await?;

    let verb = if outcome.purged { "Deleted" } else { "Unlinked" };
    println!("🗑️  {verb} '{content_id}' from slot {}", outcome.slot);
    for moved in &outcome.shifted {
        println!("   moved '{}' {} → {}", moved.content_id, moved.from, moved.to);
    }
    Ok(())
}

pub async fn reorder(board: &str, raw: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let assignments = raw
        .iter()
        .map(|r| parse_assignment(r))
        .collect::<Result<Vec<_>, _>>()?;

    let engine = open_board(board).await?;
    let entries = engine.reorder(assignments, &cancel_on_ctrl_c()).await?;

    println!("✅ Board '{board}' reordered");
    print_entries(board, &entries);
    Ok(())
}

pub async fn rebuild(board: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_board(board).await?;
    let report = engine.rebuild(&cancel_on_ctrl_c()).await?;

    println!("🔧 Rebuilt board '{board}'");
    println!(
        "   Index:   {}",
        if report.index_was_stale { "rewritten (was stale)" } else { "up to date" }
    );
    if !report.healed_records.is_empty() {
        println!("   Healed:  {}", report.healed_records.join(", "));
    }
    if !report.duplicates.is_empty() {
        println!("   ⚠️  In more than one slot: {}", report.duplicates.join(", "));
    }
    print_entries(board, &report.entries);
    Ok(())
}

pub async fn upsert(
    board: &str,
    content_id: &str,
    content: ContentArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = content.into_content()?.ok_or("--title is required")?;
    let engine = open_board(board).await?;
    let record = engine.upsert_content(content_id, content).await?;

    match record.slot_in(&engine.scope().name) {
        Some(slot) => println!("✅ Updated '{content_id}' (slot {slot})"),
        None => println!("✅ Saved '{content_id}' (not placed)"),
    }
    Ok(())
}
