//! Confidence feedback on notes.
//!
//! Up-votes raise a note's confidence by 0.2 (capped at 1.0) and count as five
//! accesses; down-votes lower it by 0.3 (floored at 0.05). Only anchor rows are
//! touched, since the anchor carries per-note confidence.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::{Error, Result};

pub const BOOST_UP_DELTA: f64 = 0.2;
pub const BOOST_DOWN_DELTA: f64 = 0.3;
pub const CONFIDENCE_CEILING: f64 = 1.0;
pub const CONFIDENCE_FLOOR: f64 = 0.05;

/// Access count credited per up-vote.
pub const UP_VOTE_ACCESSES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackDirection {
    Up,
    Down,
}

impl FeedbackDirection {
    pub fn apply(self, confidence: f64) -> f64 {
        match self {
            Self::Up => (confidence + BOOST_UP_DELTA).min(CONFIDENCE_CEILING),
            Self::Down => (confidence - BOOST_DOWN_DELTA).max(CONFIDENCE_FLOOR),
        }
    }
}

impl std::str::FromStr for FeedbackDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(Error::InvalidDirection(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackChange {
    pub path: String,
    pub previous: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResult {
    pub direction: FeedbackDirection,
    pub pattern: String,
    pub changes: Vec<FeedbackChange>,
}

pub fn boost_up(conn: &mut Connection, pattern: &str) -> Result<FeedbackResult> {
    adjust(conn, pattern, FeedbackDirection::Up)
}

pub fn boost_down(conn: &mut Connection, pattern: &str) -> Result<FeedbackResult> {
    adjust(conn, pattern, FeedbackDirection::Down)
}

/// Parse `direction` (`up`/`down`, any case) and apply it to every note matching `pattern`.
pub fn apply_feedback(conn: &mut Connection, pattern: &str, direction: &str) -> Result<FeedbackResult> {
    let direction: FeedbackDirection = direction.parse()?;
    adjust(conn, pattern, direction)
}

/// Translate a path pattern into a SQLite GLOB where only `*` is special.
pub fn pattern_to_glob(pattern: &str) -> String {
    let mut glob = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '?' => glob.push_str("[?]"),
            '[' => glob.push_str("[[]"),
            _ => glob.push(c),
        }
    }
    glob
}

fn adjust(conn: &mut Connection, pattern: &str, direction: FeedbackDirection) -> Result<FeedbackResult> {
    if pattern.trim().is_empty() {
        return Err(Error::InvalidInput("feedback pattern must not be empty".into()));
    }
    let glob = pattern_to_glob(pattern);

    let tx = conn.transaction()?;

    let matched: Vec<(String, f64)> = {
        let mut stmt = tx.prepare(
            "SELECT path, confidence FROM chunks \
             WHERE chunk_index = 0 AND path GLOB ?1 ORDER BY path",
        )?;
        let rows = stmt
            .query_map(params![glob], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };
    if matched.is_empty() {
        return Err(Error::NotFound(format!("no notes match {pattern}")));
    }

    let accesses = match direction {
        FeedbackDirection::Up => UP_VOTE_ACCESSES,
        FeedbackDirection::Down => 0,
    };

    let mut changes = Vec::with_capacity(matched.len());
    for (path, previous) in matched {
        let confidence = direction.apply(previous);
        tx.execute(
            "UPDATE chunks SET confidence = ?1, access_count = access_count + ?2 \
             WHERE path = ?3 AND chunk_index = 0",
            params![confidence, accesses, path],
        )?;
        changes.push(FeedbackChange {
            path,
            previous,
            confidence,
        });
    }

    tx.commit()?;

    tracing::info!(pattern, direction = ?direction, notes = changes.len(), "feedback applied");
    Ok(FeedbackResult {
        direction,
        pattern: pattern.to_string(),
        changes,
    })
}
