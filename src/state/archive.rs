//! Archival hand-off for finished sessions.
//!
//! The registry hands each finished session's summary over exactly once.
//! Failure is logged by the caller and never affects the delivered outcome.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::session::SessionSummary;

/// Archival errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to encode session summary: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write session summary: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator for finished sessions.
pub trait Archive: Send + Sync {
    fn archive(&self, summary: SessionSummary) -> Result<(), ArchiveError>;
}

/// Keeps summaries in memory.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    summaries: Mutex<Vec<SessionSummary>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SessionSummary>> {
        self.summaries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Archive for MemoryArchive {
    fn archive(&self, summary: SessionSummary) -> Result<(), ArchiveError> {
        self.lock().push(summary);
        Ok(())
    }
}

/// Writes one JSON document per line.
#[derive(Debug)]
pub struct JsonLinesArchive<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesArchive<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Archive for JsonLinesArchive<W> {
    fn archive(&self, summary: SessionSummary) -> Result<(), ArchiveError> {
        let line = serde_json::to_string(&summary)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::participant::{ParticipantId, Role};
    use crate::state::session::{Ending, MessageRecord, ParticipantHistory, SessionId};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn summary() -> SessionSummary {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        SessionSummary {
            session_id: SessionId(9),
            host: ParticipantId(1),
            knight: ParticipantId(2),
            knave: ParticipantId(3),
            histories: vec![ParticipantHistory {
                participant: ParticipantId(1),
                role: Role::Host,
                messages: vec![MessageRecord {
                    role: Role::Host,
                    text: "Q1".to_string(),
                    offset_secs: 4,
                }],
            }],
            started_at: start,
            ended_at: start + chrono::Duration::minutes(3),
            successful: true,
            finished: true,
            ending: Ending::Guessed,
        }
    }

    #[test]
    fn test_memory_archive() {
        let archive = MemoryArchive::new();
        archive.archive(summary()).unwrap();
        assert_eq!(archive.count(), 1);
        assert_eq!(archive.summaries()[0], summary());
    }

    #[test]
    fn test_json_lines_archive() {
        let archive = JsonLinesArchive::new(Vec::new());
        archive.archive(summary()).unwrap();
        archive.archive(summary()).unwrap();

        let out = String::from_utf8(archive.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["session_id"], 9);
        assert_eq!(value["host"], 1);
        assert_eq!(value["ending"], "guessed");
        assert_eq!(value["histories"][0]["role"], "host");
        assert_eq!(value["histories"][0]["messages"][0]["offset_secs"], 4);

        let back: SessionSummary = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back, summary());
    }
}
