//! Synthetic dump generator for stress testing chatvault.
//!
//! Usage: cargo run --features gen-test --bin gen_dump -- [conversations] [messages] [output]
//! Example: cargo run --features gen-test --bin gen_dump -- 20 5000 stress/dump.json
//!
//! Writes the dump plus a `media/` directory next to it. Histories contain
//! empty slots, undated messages, forwards, service actions and media, some
//! of which point at files that do not exist.

use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use chatvault::Result;
use chatvault::peer::Peer;
use chatvault::record::{MediaKind, RawMedia, RawMessage};
use chatvault::source::{DumpConversation, DumpFile};

const NAMES: &[&str] = &[
    "My Chat",
    "Family",
    "Work / Ops",
    "Иван",
    "村上",
    "🔥 Fire Group 🔥",
    "name;with,odd.chars-ok",
    "   ",
];

const TEXTS: &[&str] = &[
    "Normal message",
    "Message with \"quotes\" and 'apostrophes'",
    "Message with\nnewlines\nand\ttabs",
    "Кириллица: Привет мир!",
    "日本語: こんにちは",
    "Mixed: Hello Привет 你好 🌍",
    "",
];

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let conversations: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10);
    let messages: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1_000);
    let output = Path::new(args.get(3).map_or("stress_dump.json", String::as_str));

    println!("🧪 Dump Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Conversations: {}", conversations);
    println!("   Messages:      {} each", messages);
    println!("   Output:        {}", output.display());
    println!();

    let start = Instant::now();
    let root = output.parent().unwrap_or_else(|| Path::new("."));
    let media_dir = root.join("media");
    fs::create_dir_all(&media_dir)?;

    let mut rng = rand::thread_rng();
    let mut dump = DumpFile::default();
    let mut media_files = 0usize;

    for c in 0..conversations {
        let peer = random_peer(&mut rng, c as i64 + 1);
        let mut history = Vec::with_capacity(messages);
        for m in (1..=messages).rev() {
            let slot = random_message(&mut rng, m as i64, &media_dir, &mut media_files)?;
            history.push(slot);
        }
        dump.conversations.push(DumpConversation {
            peer,
            messages: history,
        });
        eprint!("\r   Generated {}/{} conversations", c + 1, conversations);
    }

    let mut writer = BufWriter::with_capacity(1024 * 1024, File::create(output)?);
    serde_json::to_writer(&mut writer, &dump)?;
    writer.flush()?;

    println!("\n\n✅ Done!");
    println!("   Media files: {}", media_files);
    println!("   Time: {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn random_peer(rng: &mut impl Rng, id: i64) -> Peer {
    let name = NAMES.choose(rng).copied().unwrap_or("Chat");
    match rng.gen_range(0..4) {
        0 => Peer::user(id, name).with_username(format!("user{id}")),
        1 => Peer::channel(id, name),
        2 => Peer::secret_chat(id, name, id * 10),
        _ => Peer::group(id, name),
    }
}

fn random_date(rng: &mut impl Rng, id: i64) -> Option<DateTime<Utc>> {
    // roughly one in fifty messages comes back undated
    if rng.gen_ratio(1, 50) {
        return None;
    }
    DateTime::from_timestamp(1_700_000_000 + id * 60, 0)
}

fn random_message(
    rng: &mut impl Rng,
    id: i64,
    media_dir: &Path,
    media_files: &mut usize,
) -> Result<Option<RawMessage>> {
    if rng.gen_ratio(1, 40) {
        return Ok(None);
    }

    let mut msg = RawMessage::new(id)
        .with_src(Peer::user(id % 7 + 100, "Sender"))
        .with_text(TEXTS.choose(rng).copied().unwrap_or_default());
    msg.date = random_date(rng, id);
    msg.out = rng.gen_bool(0.3);
    msg.unread = rng.gen_bool(0.05);

    match rng.gen_range(0..20) {
        0 => msg = msg.with_forward(Peer::channel(900, "News"), random_date(rng, id - 1)),
        1 => {
            msg.service = true;
            msg.text = None;
            msg = msg.with_action(rng.gen_range(0..26));
        }
        2..=4 => {
            let (kind, ext) = *[
                (MediaKind::Photo, "jpg"),
                (MediaKind::Document, "pdf"),
                (MediaKind::Video, "mp4"),
                (MediaKind::Audio, "oga"),
            ]
            .choose(rng)
            .unwrap_or(&(MediaKind::Photo, "jpg"));
            let file_name = format!("{id}.{ext}");
            // every tenth reference is dangling
            if !rng.gen_ratio(1, 10) {
                fs::write(media_dir.join(&file_name), format!("{kind} payload of {id}"))?;
                *media_files += 1;
            }
            msg = msg.with_media(
                RawMedia::new(kind)
                    .with_file_name(file_name.clone())
                    .with_location(format!("media/{file_name}")),
            );
        }
        5 => msg.reply_id = Some(id - 1),
        _ => {}
    }
    Ok(Some(msg))
}
