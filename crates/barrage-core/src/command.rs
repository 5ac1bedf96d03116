//! Command payload parsing
//!
//! COMMAND frames carry a JSON envelope `{"cmd": "...", ...}`. Only comment
//! commands (`DANMU_MSG`, possibly with a `:`-suffixed variant) become events;
//! everything else, including malformed JSON, yields `None`.
//!
//! Comment layout (positional arrays):
//! ```text
//! info[0][1]        mode (4 = bottom, 5 = top)
//! info[0][3]        colour, RGB decimal
//! info[0][4]        send time, ms
//! info[0][15].extra JSON string holding recommend_score
//! info[1]           text
//! info[2][0..2]     user id, user name
//! ```

use crate::time::now_millis;
use crate::{Comment, CommentMode, Event};
use serde_json::Value;

const DANMU_CMD_PREFIX: &str = "DANMU_MSG";
const DEFAULT_RGB: u32 = 0xFFFFFF;
const MAX_RECOMMEND_SCORE: i64 = 10;

/// Parse one command envelope into an event.
pub fn parse_command(json: &str) -> Option<Event> {
    if json.trim().is_empty() {
        return None;
    }
    let root: Value = serde_json::from_str(json).ok()?;
    let cmd = root.get("cmd")?.as_str()?.trim();

    if cmd.starts_with(DANMU_CMD_PREFIX) {
        parse_danmu_msg(&root).map(Event::Comment)
    } else {
        None
    }
}

fn parse_danmu_msg(root: &Value) -> Option<Comment> {
    let info = root.get("info")?.as_array()?;

    let text = info.get(1)?.as_str()?;
    if text.trim().is_empty() {
        return None;
    }

    let meta = info.first().and_then(Value::as_array);
    let meta_at = |i: usize| meta.and_then(|m| m.get(i));

    let mode = meta_at(1)
        .and_then(Value::as_i64)
        .map(CommentMode::from_code)
        .unwrap_or_default();

    let rgb = meta_at(3)
        .and_then(Value::as_i64)
        .map(|c| (c as u32) & 0x00FF_FFFF)
        .unwrap_or(DEFAULT_RGB);

    let timestamp_ms = meta_at(4)
        .and_then(Value::as_i64)
        .filter(|ts| *ts > 0)
        .unwrap_or_else(now_millis);

    let recommend_score = meta_at(15)
        .and_then(parse_recommend_score)
        .unwrap_or(0)
        .clamp(0, MAX_RECOMMEND_SCORE) as u8;

    let sender = info.get(2).and_then(Value::as_array);
    let user_id = sender
        .and_then(|s| s.first())
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let user_name = sender
        .and_then(|s| s.get(1))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(Comment {
        text: text.to_string(),
        mode,
        color: 0xFF00_0000 | rgb,
        timestamp_ms,
        recommend_score,
        user_id,
        user_name,
    })
}

/// `extra` is itself a JSON document encoded as a string.
fn parse_recommend_score(ext: &Value) -> Option<i64> {
    let extra = ext.get("extra")?.as_str()?;
    if extra.trim().is_empty() {
        return None;
    }
    let extra: Value = serde_json::from_str(extra).ok()?;
    extra.get("recommend_score")?.as_i64()
}
