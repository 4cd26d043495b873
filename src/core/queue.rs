//! Conversation selection and the backup queue.
//!
//! The queue is filled once from the dialog list. Unidentifiable peers are
//! dropped, then the [`TargetFilter`] keeps the conversations whose sanitized
//! name contains at least one target keyword.
//!
//! Every selected conversation gets its own file stem. When two names
//! sanitize to the same stem (`"Чат"` and `"Мир"` both become `"___"`), the
//! later one is suffixed with its peer id.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::peer::Peer;

/// Case-sensitive substring filter over sanitized conversation names.
///
/// Spaces in a keyword are turned into underscores so that `"My Chat"`
/// matches the sanitized `"My_Chat"`. An empty filter selects everything.
///
/// ```
/// use chatvault::core::queue::TargetFilter;
///
/// let filter = TargetFilter::new(["My Chat"]);
/// assert!(filter.matches("My_Chat_2024"));
/// assert!(!filter.matches("OtherChat"));
/// assert!(TargetFilter::all().matches("anything"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    keywords: Vec<String>,
}

impl TargetFilter {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: targets
                .into_iter()
                .map(|t| t.as_ref().replace(' ', "_"))
                .collect(),
        }
    }

    /// A filter that selects every conversation.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Tests an already sanitized name.
    pub fn matches(&self, sanitized: &str) -> bool {
        self.is_empty() || self.keywords.iter().any(|k| sanitized.contains(k.as_str()))
    }

    /// Tests a peer by its sanitized name.
    pub fn selects(&self, peer: &Peer) -> bool {
        self.matches(&peer.file_stem())
    }
}

/// A conversation picked for backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedConversation {
    pub peer: Peer,
    /// Stem of `<stem>.jsonl` and `<stem>_files/`, unique within the run.
    pub stem: String,
}

impl SelectedConversation {
    /// Selects `peer` under its plain sanitized name.
    pub fn new(peer: Peer) -> Self {
        let stem = peer.file_stem();
        Self { peer, stem }
    }
}

/// Picks a stem for `peer` that no earlier conversation of the run uses.
fn unique_stem(peer: &Peer, taken: &mut HashSet<String>) -> String {
    let base = peer.file_stem();
    let mut stem = base.clone();
    let mut attempt = 0;
    while taken.contains(&stem) {
        attempt += 1;
        stem = if attempt == 1 {
            format!("{base}_{}", peer.id)
        } else {
            format!("{base}_{}_{attempt}", peer.id)
        };
    }
    if stem != base {
        warn!(conversation = %peer.name, id = peer.id, %stem, "file name already taken, using a suffixed one");
    }
    taken.insert(stem.clone());
    stem
}

/// What the queue asks the caller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStep {
    /// Back up this conversation.
    Next(SelectedConversation),
    /// The filter matched nothing; the run ends here.
    NothingSelected,
    /// Every selected conversation has been backed up.
    AllCompleted,
}

/// Progress of the queue as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    InProgress,
    Completed,
}

/// FIFO of selected conversations.
#[derive(Debug, Clone)]
pub struct BackupQueue {
    pending: VecDeque<SelectedConversation>,
    selected: usize,
    completed: usize,
    status: QueueStatus,
}

impl BackupQueue {
    /// Builds the queue from the dialog list, keeping the listing order.
    pub fn select(conversations: Vec<Peer>, filter: &TargetFilter) -> Self {
        let mut taken = HashSet::new();
        let pending: VecDeque<SelectedConversation> = conversations
            .into_iter()
            .filter(|peer| {
                if peer.is_unidentifiable() {
                    debug!(id = peer.id, "skipping unidentifiable peer");
                    return false;
                }
                filter.selects(peer)
            })
            .map(|peer| {
                let stem = unique_stem(&peer, &mut taken);
                SelectedConversation { peer, stem }
            })
            .collect();

        Self {
            selected: pending.len(),
            pending,
            completed: 0,
            status: QueueStatus::Pending,
        }
    }

    /// Number of conversations selected.
    pub fn len(&self) -> usize {
        self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.selected == 0
    }

    /// Conversations not yet handed out.
    pub fn pending(&self) -> impl Iterator<Item = &Peer> {
        self.pending.iter().map(|s| &s.peer)
    }

    /// Stems of the conversations not yet handed out.
    pub fn stems(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|s| s.stem.as_str())
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn status(&self) -> QueueStatus {
        self.status
    }

    /// Hands out the first conversation, or reports that nothing matched.
    pub fn start(&mut self) -> QueueStep {
        if self.pending.is_empty() {
            self.status = QueueStatus::Completed;
            return QueueStep::NothingSelected;
        }
        self.status = QueueStatus::InProgress;
        self.pop()
    }

    /// Marks the current conversation complete and hands out the next one.
    pub fn advance(&mut self) -> QueueStep {
        self.completed += 1;
        self.pop()
    }

    fn pop(&mut self) -> QueueStep {
        match self.pending.pop_front() {
            Some(selected) => QueueStep::Next(selected),
            None => {
                self.status = QueueStatus::Completed;
                QueueStep::AllCompleted
            }
        }
    }
}
