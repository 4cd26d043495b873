//! Media download and relocation.
//!
//! For every record that references media, [`MediaFetcher::fetch`] decides
//! whether a download is due, awaits it, moves the downloaded file into the
//! conversation's media directory and patches the record:
//!
//! | Situation | `media.file` | Pause afterwards |
//! |-----------|--------------|------------------|
//! | kind disabled / no media | absent | no |
//! | download and move succeeded | `"<Name>_files/<file>"` | yes |
//! | download or move failed | `null` | yes |
//!
//! A failure never aborts the backup; it only degrades the one record.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::record::{MessageRecord, RawMessage};
use crate::source::HistorySource;

/// File extensions the service is known to get wrong.
const EXTENSION_FIXES: &[(&str, &str)] = &[("oga", "ogg"), ("mpga", "mp3")];

/// Returns `name` with a known-wrong extension replaced.
///
/// ```
/// use chatvault::core::media::corrected_file_name;
///
/// assert_eq!(corrected_file_name("voice_12.oga"), "voice_12.ogg");
/// assert_eq!(corrected_file_name("photo.jpg"), "photo.jpg");
/// ```
pub fn corrected_file_name(name: &str) -> String {
    let path = Path::new(name);
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return name.to_string();
    };
    EXTENSION_FIXES
        .iter()
        .find(|(wrong, _)| wrong.eq_ignore_ascii_case(ext))
        .map(|(_, right)| path.with_extension(right).to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// A conversation's media directory, created on first use.
#[derive(Debug, Clone)]
pub struct MediaDir {
    path: PathBuf,
    relative: String,
    created: bool,
}

impl MediaDir {
    /// Describes `<backup_dir>/<stem>_files` without touching the disk.
    pub fn new(backup_dir: &Path, stem: &str) -> Self {
        let relative = format!("{stem}_files");
        Self {
            path: backup_dir.join(&relative),
            relative,
            created: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` once the directory has been created by this run.
    pub fn is_created(&self) -> bool {
        self.created
    }

    async fn ensure(&mut self) -> io::Result<()> {
        if !self.created {
            tokio::fs::create_dir_all(&self.path).await?;
            self.created = true;
        }
        Ok(())
    }

    /// Moves `file` into the directory, fixing its extension.
    ///
    /// A name already present in the directory is never replaced; the file
    /// is stored as `<stem>_<message_id>.<ext>` instead, with a counter added
    /// if that is taken too. Returns the path relative to the backup
    /// directory.
    async fn adopt(&mut self, file: &Path, message_id: i64) -> io::Result<String> {
        self.ensure().await?;
        let name = file
            .file_name()
            .and_then(OsStr::to_str)
            .map(corrected_file_name)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("downloaded file has no usable name: {}", file.display()),
                )
            })?;
        let name = self.free_name(&name, message_id).await?;
        move_file(file, &self.path.join(&name)).await?;
        Ok(format!("{}/{name}", self.relative))
    }

    async fn free_name(&self, name: &str, message_id: i64) -> io::Result<String> {
        if !tokio::fs::try_exists(self.path.join(name)).await? {
            return Ok(name.to_string());
        }

        let path = Path::new(name);
        let stem = path.file_stem().and_then(OsStr::to_str).unwrap_or(name);
        let ext = path.extension().and_then(OsStr::to_str);
        let mut attempt = 1;
        loop {
            let base = if attempt == 1 {
                format!("{stem}_{message_id}")
            } else {
                format!("{stem}_{message_id}_{attempt}")
            };
            let candidate = match ext {
                Some(ext) => format!("{base}.{ext}"),
                None => base,
            };
            if !tokio::fs::try_exists(self.path.join(&candidate)).await? {
                debug!(message_id, taken = name, name = %candidate, "media name already taken");
                return Ok(candidate);
            }
            attempt += 1;
        }
    }
}

/// Renames `from` to `to`, falling back to copy and delete across filesystems.
async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to).await,
        Err(e) => Err(e),
    }
}

async fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

/// What happened to one record's media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    /// No download was due.
    Skipped,
    /// Downloaded to the given path, relative to the backup directory.
    Saved(String),
    /// Download or relocation failed.
    Failed(String),
}

impl MediaOutcome {
    /// Returns `true` if a download was attempted.
    pub fn attempted(&self) -> bool {
        !matches!(self, MediaOutcome::Skipped)
    }
}

/// Downloads media for records, one at a time.
pub struct MediaFetcher<'a> {
    source: &'a dyn HistorySource,
    config: MediaConfig,
    delay: Duration,
}

impl<'a> MediaFetcher<'a> {
    pub fn new(source: &'a dyn HistorySource, config: MediaConfig, delay: Duration) -> Self {
        Self {
            source,
            config,
            delay,
        }
    }

    /// Resolves the media of one record.
    ///
    /// Exactly one download is attempted per eligible record. When a download
    /// was attempted, the configured pause is observed before returning,
    /// whatever the result.
    pub async fn fetch(
        &self,
        raw: &RawMessage,
        record: &mut MessageRecord,
        dir: &mut MediaDir,
    ) -> MediaOutcome {
        let Some(media) = record.media.as_mut() else {
            return MediaOutcome::Skipped;
        };
        if !self.config.allows(media.kind) {
            return MediaOutcome::Skipped;
        }

        let outcome = match self.source.fetch_media(media.kind, raw).await {
            Ok(temp) => match dir.adopt(&temp, raw.id).await {
                Ok(relative) => {
                    debug!(message_id = raw.id, path = %relative, "saved media");
                    media.mark_saved(relative.clone());
                    MediaOutcome::Saved(relative)
                }
                Err(e) => {
                    warn!(message_id = raw.id, error = %e, "could not move downloaded media");
                    media.mark_failed();
                    MediaOutcome::Failed(e.to_string())
                }
            },
            Err(e) => {
                warn!(message_id = raw.id, kind = %media.kind, error = %e, "media download failed");
                media.mark_failed();
                MediaOutcome::Failed(e.to_string())
            }
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MediaKind, RawMedia};
    use crate::source::MemorySource;

    fn photo(id: i64) -> RawMessage {
        RawMessage::new(id).with_media(RawMedia::new(MediaKind::Photo))
    }

    #[test]
    fn test_extension_fixes() {
        assert_eq!(corrected_file_name("a.oga"), "a.ogg");
        assert_eq!(corrected_file_name("a.OGA"), "a.ogg");
        assert_eq!(corrected_file_name("song.mpga"), "song.mp3");
        assert_eq!(corrected_file_name("noext"), "noext");
        assert_eq!(corrected_file_name("archive.tar.gz"), "archive.tar.gz");
    }

    #[test]
    fn test_media_dir_layout() {
        let dir = MediaDir::new(Path::new("/backup"), "My_Chat");
        assert_eq!(dir.path(), Path::new("/backup/My_Chat_files"));
        assert!(!dir.is_created());
    }

    #[tokio::test]
    async fn test_disabled_kind_is_skipped() {
        let backup = tempfile::tempdir().unwrap();
        let source = MemorySource::new();
        let fetcher = MediaFetcher::new(&source, MediaConfig::new().with_documents(true), Duration::ZERO);

        let raw = photo(1);
        let mut record = MessageRecord::from(&raw);
        let mut dir = MediaDir::new(backup.path(), "Chat");

        assert_eq!(fetcher.fetch(&raw, &mut record, &mut dir).await, MediaOutcome::Skipped);
        assert!(!record.media.unwrap().fetch_attempted());
        assert!(source.media_requests().is_empty());
        assert!(!dir.is_created());
    }

    #[tokio::test]
    async fn test_message_without_media_is_skipped() {
        let backup = tempfile::tempdir().unwrap();
        let source = MemorySource::new();
        let fetcher = MediaFetcher::new(&source, MediaConfig::all(), Duration::ZERO);

        let raw = RawMessage::new(1).with_text("plain");
        let mut record = MessageRecord::from(&raw);
        let mut dir = MediaDir::new(backup.path(), "Chat");

        assert_eq!(fetcher.fetch(&raw, &mut record, &mut dir).await, MediaOutcome::Skipped);
        assert!(record.media.is_none());
    }

    #[tokio::test]
    async fn test_success_moves_file_and_patches_record() {
        let backup = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_staging_dir(staging.path());
        let fetcher = MediaFetcher::new(&source, MediaConfig::all(), Duration::ZERO);

        let raw = RawMessage::new(7).with_media(RawMedia::new(MediaKind::Audio));
        let mut record = MessageRecord::from(&raw);
        let mut dir = MediaDir::new(backup.path(), "Chat");

        let outcome = fetcher.fetch(&raw, &mut record, &mut dir).await;
        assert_eq!(outcome, MediaOutcome::Saved("Chat_files/7.ogg".into()));
        assert_eq!(record.media.unwrap().saved_path(), Some("Chat_files/7.ogg"));
        assert!(backup.path().join("Chat_files/7.ogg").exists());
        assert!(!staging.path().join("7.oga").exists());
    }

    #[tokio::test]
    async fn test_failure_marks_record() {
        let backup = tempfile::tempdir().unwrap();
        let source = MemorySource::new();
        source.fail_media(5);
        let fetcher = MediaFetcher::new(&source, MediaConfig::all(), Duration::ZERO);

        let raw = photo(5);
        let mut record = MessageRecord::from(&raw);
        let mut dir = MediaDir::new(backup.path(), "Chat");

        let outcome = fetcher.fetch(&raw, &mut record, &mut dir).await;
        assert!(matches!(outcome, MediaOutcome::Failed(_)));
        let media = record.media.unwrap();
        assert!(media.fetch_attempted());
        assert_eq!(media.saved_path(), None);
        assert_eq!(source.media_requests(), vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_follows_attempted_downloads_only() {
        let backup = tempfile::tempdir().unwrap();
        let source = MemorySource::new();
        source.fail_media(1);
        let delay = Duration::from_secs(2);
        let fetcher = MediaFetcher::new(&source, MediaConfig::new().with_photos(true), delay);
        let mut dir = MediaDir::new(backup.path(), "Chat");

        let start = tokio::time::Instant::now();
        let raw = photo(1);
        let mut record = MessageRecord::from(&raw);
        fetcher.fetch(&raw, &mut record, &mut dir).await;
        assert!(start.elapsed() >= delay);

        let start = tokio::time::Instant::now();
        let raw = RawMessage::new(2).with_media(RawMedia::new(MediaKind::Video));
        let mut record = MessageRecord::from(&raw);
        fetcher.fetch(&raw, &mut record, &mut dir).await;
        assert!(start.elapsed() < delay);
    }

    #[tokio::test]
    async fn test_same_file_name_does_not_overwrite() {
        let backup = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_staging_dir(staging.path());
        let fetcher = MediaFetcher::new(&source, MediaConfig::all(), Duration::ZERO);
        let mut dir = MediaDir::new(backup.path(), "Docs");

        let mut saved = Vec::new();
        for id in [1, 2, 3] {
            let raw = RawMessage::new(id)
                .with_media(RawMedia::new(MediaKind::Document).with_file_name("report.pdf"));
            let mut record = MessageRecord::from(&raw);
            fetcher.fetch(&raw, &mut record, &mut dir).await;
            saved.push(record.media.unwrap().saved_path().unwrap().to_string());
        }

        assert_eq!(
            saved,
            vec!["Docs_files/report.pdf", "Docs_files/report_2.pdf", "Docs_files/report_3.pdf"]
        );
        for (id, path) in [1, 2, 3].iter().zip(&saved) {
            let content = std::fs::read_to_string(backup.path().join(path)).unwrap();
            assert!(content.ends_with(&format!("message {id}")), "{path}: {content}");
        }
    }

    #[tokio::test]
    async fn test_fixed_extension_does_not_overwrite() {
        let backup = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_staging_dir(staging.path());
        let fetcher = MediaFetcher::new(&source, MediaConfig::all(), Duration::ZERO);
        let mut dir = MediaDir::new(backup.path(), "Chat");

        let ogg = RawMessage::new(1).with_media(RawMedia::new(MediaKind::Audio).with_file_name("x.ogg"));
        let oga = RawMessage::new(2).with_media(RawMedia::new(MediaKind::Audio).with_file_name("x.oga"));
        let mut first = MessageRecord::from(&ogg);
        let mut second = MessageRecord::from(&oga);
        fetcher.fetch(&ogg, &mut first, &mut dir).await;
        let outcome = fetcher.fetch(&oga, &mut second, &mut dir).await;

        assert_eq!(outcome, MediaOutcome::Saved("Chat_files/x_2.ogg".into()));
        assert_eq!(first.media.unwrap().saved_path(), Some("Chat_files/x.ogg"));
    }

    #[tokio::test]
    async fn test_failed_move_marks_record() {
        let backup = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = MemorySource::new().with_staging_dir(staging.path());
        let fetcher = MediaFetcher::new(&source, MediaConfig::all(), Duration::ZERO);
        // a plain file where the media directory should go
        std::fs::write(backup.path().join("Chat_files"), b"in the way").unwrap();
        let mut dir = MediaDir::new(backup.path(), "Chat");

        let raw = photo(4);
        let mut record = MessageRecord::from(&raw);
        let outcome = fetcher.fetch(&raw, &mut record, &mut dir).await;

        assert!(matches!(outcome, MediaOutcome::Failed(_)));
        assert_eq!(source.media_requests(), vec![4]);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["media"]["file"].is_null());
        assert!(value["media"].as_object().unwrap().contains_key("file"));
    }

    #[tokio::test]
    async fn test_missing_download_is_a_failure() {
        let backup = tempfile::tempdir().unwrap();
        let mut dir = MediaDir::new(backup.path(), "Chat");

        let err = dir
            .adopt(&backup.path().join("vanished.jpg"), 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(dir.is_created());
    }

    #[tokio::test]
    async fn test_copy_then_remove_relocates() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("staged.bin");
        let to = dir.path().join("final.bin");
        std::fs::write(&from, b"payload").unwrap();

        copy_then_remove(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"payload");
    }
}
