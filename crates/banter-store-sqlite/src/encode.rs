//! Encoding and decoding helpers between Rust domain types and the values
//! stored in SQLite columns.
//!
//! Ids are u64 on the API surface but stored as signed INTEGER; the id
//! generator never mints values above 2^63, so the casts are lossless.
//! Timestamps are RFC 3339 strings; mention lists are compact JSON.

use banter_core::{comment::Comment, subject::Subject};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── Ids ─────────────────────────────────────────────────────────────────────

pub fn encode_id(id: u64) -> i64 { id as i64 }

pub fn decode_id(raw: i64) -> u64 { raw as u64 }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Mention lists ───────────────────────────────────────────────────────────

pub fn encode_members(ids: &[u64]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_members(s: &str) -> Result<Vec<u64>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list for the index-joined-with-content SELECT that backs every
/// comment read. Matches [`RawComment::from_row`] positionally.
pub const COMMENT_COLS: &str = "\
  i.id, i.subject_id, i.obj_id, i.obj_type, i.member_id, i.root, i.parent, \
  i.floor, i.reply_count, i.root_reply_count, i.like_count, i.hate_count, \
  i.state, i.created_at, i.updated_at, \
  c.at_member_ids, c.ip, c.platform, c.device, c.message, c.meta";

/// Raw values read directly from a `comment_index` row joined with its
/// `comment_content` row.
pub struct RawComment {
  pub id:         i64,
  pub subject_id: i64,
  pub obj_id:     i64,
  pub obj_type:   i32,
  pub member_id:  i64,
  pub root:       i64,
  pub parent:     i64,
  pub floor:      i64,
  pub reply_count:      i64,
  pub root_reply_count: i64,
  pub like_count: i64,
  pub hate_count: i64,
  pub state:      i8,
  pub created_at: String,
  pub updated_at: String,
  pub at_member_ids: String,
  pub ip:       String,
  pub platform: i8,
  pub device:   String,
  pub message:  String,
  pub meta:     String,
  /// Filled by the parent-resolution pass where the caller asked for it;
  /// zero otherwise.
  pub parent_member_id: i64,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawComment {
      id:         row.get(0)?,
      subject_id: row.get(1)?,
      obj_id:     row.get(2)?,
      obj_type:   row.get(3)?,
      member_id:  row.get(4)?,
      root:       row.get(5)?,
      parent:     row.get(6)?,
      floor:      row.get(7)?,
      reply_count:      row.get(8)?,
      root_reply_count: row.get(9)?,
      like_count: row.get(10)?,
      hate_count: row.get(11)?,
      state:      row.get(12)?,
      created_at: row.get(13)?,
      updated_at: row.get(14)?,
      at_member_ids: row.get(15)?,
      ip:       row.get(16)?,
      platform: row.get(17)?,
      device:   row.get(18)?,
      message:  row.get(19)?,
      meta:     row.get(20)?,
      parent_member_id: 0,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      id:         decode_id(self.id),
      subject_id: decode_id(self.subject_id),
      obj_id:     decode_id(self.obj_id),
      obj_type:   self.obj_type,
      member_id:  decode_id(self.member_id),
      root:       decode_id(self.root),
      parent:     decode_id(self.parent),
      parent_member_id: decode_id(self.parent_member_id),
      floor:      self.floor,
      reply_count:      self.reply_count,
      root_reply_count: self.root_reply_count,
      like_count: self.like_count,
      hate_count: self.hate_count,
      state:      self.state,
      at_member_ids: decode_members(&self.at_member_ids)?,
      ip:       self.ip,
      platform: self.platform,
      device:   self.device,
      message:  self.message,
      meta:     self.meta,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      replies: Vec::new(),
    })
  }
}

/// Raw values read directly from a `comment_subject` row.
pub struct RawSubject {
  pub id:         i64,
  pub obj_id:     i64,
  pub obj_type:   i32,
  pub member_id:  i64,
  pub comment_count: i64,
  pub root_count: i64,
  pub all_count:  i64,
  pub state:      i8,
  pub created_at: String,
  pub updated_at: String,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawSubject {
      id:         row.get(0)?,
      obj_id:     row.get(1)?,
      obj_type:   row.get(2)?,
      member_id:  row.get(3)?,
      comment_count: row.get(4)?,
      root_count: row.get(5)?,
      all_count:  row.get(6)?,
      state:      row.get(7)?,
      created_at: row.get(8)?,
      updated_at: row.get(9)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      id:         decode_id(self.id),
      obj_id:     decode_id(self.obj_id),
      obj_type:   self.obj_type,
      member_id:  decode_id(self.member_id),
      comment_count: self.comment_count,
      root_count: self.root_count,
      all_count:  self.all_count,
      state:      self.state,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawSubject::from_row`] positionally.
pub const SUBJECT_COLS: &str = "\
  id, obj_id, obj_type, member_id, comment_count, root_count, all_count, \
  state, created_at, updated_at";
