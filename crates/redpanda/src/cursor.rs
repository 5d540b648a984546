//! Read position of the queue consumer.
//!
//! `position` is the offset after the last id handed out and is what gets
//! saved. `fetch_from` runs ahead of it while fetched ids wait in the
//! buffer.

use funnel_core::{Error, FeedbackId, Result};
use std::collections::VecDeque;
use tracing::warn;

use crate::log::LogRecord;

#[derive(Debug, Default)]
pub struct ReadCursor {
    position: Option<i64>,
    fetch_from: i64,
    buffered: VecDeque<(i64, FeedbackId)>,
}

impl ReadCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.position.is_some()
    }

    /// Sets the starting offset unless one is already set.
    pub fn init(&mut self, start: i64) {
        if self.position.is_none() {
            self.position = Some(start);
            self.fetch_from = start;
        }
    }

    pub fn position(&self) -> Option<i64> {
        self.position
    }

    pub fn fetch_from(&self) -> i64 {
        self.fetch_from
    }

    /// The next id to hand out and the position after it.
    pub fn peek(&self) -> Option<(FeedbackId, i64)> {
        self.buffered.front().map(|(offset, id)| (*id, offset + 1))
    }

    /// Hands out the front id.
    pub fn advance(&mut self) -> Option<FeedbackId> {
        let (offset, id) = self.buffered.pop_front()?;
        self.position = Some(offset + 1);
        Some(id)
    }

    /// Buffers the ids of a fetch made from `requested`.
    ///
    /// A fetch that no longer matches `fetch_from` is stale and dropped.
    pub fn absorb(&mut self, requested: i64, records: Vec<LogRecord>) {
        if requested != self.fetch_from {
            return;
        }

        for record in records {
            // Compressed batches can start before the requested offset.
            if record.offset < self.fetch_from {
                continue;
            }
            self.fetch_from = record.offset + 1;

            match record.value.as_deref().map(parse_id) {
                Some(Ok(id)) => self.buffered.push_back((record.offset, id)),
                Some(Err(e)) => {
                    warn!(offset = record.offset, error = %e, "Skipping unreadable queue entry");
                    self.skip_past(record.offset);
                }
                None => {
                    warn!(offset = record.offset, "Skipping empty queue entry");
                    self.skip_past(record.offset);
                }
            }
        }
    }

    /// Moves the position past an unusable entry when nothing is waiting
    /// in front of it.
    fn skip_past(&mut self, offset: i64) {
        if self.buffered.is_empty() {
            self.position = Some(offset + 1);
        }
    }

    /// Restarts reading at `offset`, dropping anything buffered.
    pub fn reset(&mut self, offset: i64) {
        self.buffered.clear();
        self.position = Some(offset);
        self.fetch_from = offset;
    }

    /// Entries between the position and `latest`.
    pub fn depth(&self, latest: i64) -> u64 {
        self.position
            .map(|position| (latest - position).max(0) as u64)
            .unwrap_or(0)
    }
}

pub(crate) fn parse_id(bytes: &[u8]) -> Result<FeedbackId> {
    std::str::from_utf8(bytes)
        .map_err(|e| Error::validation(format!("queue entry is not UTF-8: {}", e)))?
        .parse()
}
