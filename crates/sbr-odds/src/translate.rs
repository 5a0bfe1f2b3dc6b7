//! Result Translator
//!
//! The odds service answers with terse field tags (`eid`, `mtid`, `adj`, ...).
//! Every record handed to callers is rewritten so those tags become readable
//! names (`event id`, `market id`, `spread / total`, ...).
//!
//! # Rules
//! 1. The tag table is a closed set; unknown keys pass through untouched
//! 2. No canonical name is itself a tag, so translating twice is a no-op
//! 3. Values landing under a datetime key are epoch milliseconds and become
//!    local ISO-8601 strings with whole-second precision
//! 4. Nested objects and arrays are rewritten recursively

use chrono::{Local, SecondsFormat, TimeZone};
use serde_json::{Map, Value};

/// Canonical keys whose values are epoch-millisecond timestamps
pub const DATETIME_KEYS: [&str; 3] = ["datetime", "start datetime", "end datetime"];

/// Every tag the translator knows, in table order
pub const FIELD_TAGS: &[&str] = &[
    // events
    "eid", "des", "dt", "es", "lid", "spid", "egid", "seid", "cit", "cou", "st", "vn",
    // participants
    "partid", "ih", "tmid", "nam", "nn", "sn", "abbr", "fn", "lsn", "sbrabbr",
    // scores
    "val", "perid",
    // lines
    "mtid", "paid", "adj", "ap", "dec", "pmid",
    // consensus
    "bb", "bp", "cbb", "cbp",
    // event groups
    "sdt", "edt", "alias",
    // search
    "rid",
];

/// Map a service field tag to its readable name
pub fn canonical_key(tag: &str) -> Option<&'static str> {
    let key = match tag {
        "eid" => "event id",
        "des" => "description",
        "dt" => "datetime",
        "es" => "event status",
        "lid" => "league id",
        "spid" => "sport id",
        "egid" => "event group id",
        "seid" => "season id",
        "cit" => "city",
        "cou" => "country",
        "st" => "state",
        "vn" => "venue",
        "partid" => "participant id",
        "ih" => "is home",
        "tmid" => "team id",
        "nam" => "name",
        "nn" => "nickname",
        "sn" => "short name",
        "abbr" => "abbreviation",
        "fn" => "first name",
        "lsn" => "last name",
        "sbrabbr" => "sbr abbreviation",
        "val" => "points scored",
        "perid" => "period",
        "mtid" => "market id",
        "paid" => "sportsbook id",
        "adj" => "spread / total",
        "ap" => "american odds",
        "dec" => "decimal odds",
        "pmid" => "participant market id",
        "bb" => "consensus bets",
        "bp" => "consensus bet percentage",
        "cbb" => "consensus bets opposite",
        "cbp" => "consensus bet percentage opposite",
        "sdt" => "start datetime",
        "edt" => "end datetime",
        "alias" => "league alias",
        "rid" => "region id",
        _ => return None,
    };
    Some(key)
}

/// Convert epoch milliseconds to a local ISO-8601 string, truncated to seconds
///
/// e.g. `1604016000000` -> `"2020-10-29T20:00:00-04:00"` in US/Eastern
pub fn timestamp_to_iso(ms: i64) -> Option<String> {
    let dt = Local.timestamp_millis_opt(ms).single()?;
    Some(dt.to_rfc3339_opts(SecondsFormat::Secs, false))
}

fn datetime_value(v: Value) -> Value {
    let ms = match &v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        _ => None,
    };
    match ms.and_then(timestamp_to_iso) {
        Some(iso) => Value::String(iso),
        None => v,
    }
}

/// Rewrite a JSON tree in place
pub fn translate(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let old = std::mem::take(map);
            let mut new = Map::with_capacity(old.len());
            for (k, v) in old {
                let (k, mut v) = match canonical_key(&k) {
                    Some(key) if DATETIME_KEYS.contains(&key) => (key.to_string(), datetime_value(v)),
                    Some(key) => (key.to_string(), v),
                    None => (k, v),
                };
                translate(&mut v);
                new.insert(k, v);
            }
            *map = new;
        }
        Value::Array(items) => items.iter_mut().for_each(translate),
        _ => {}
    }
}

/// Translate a copy, leaving the input untouched
pub fn translated(value: &Value) -> Value {
    let mut copy = value.clone();
    translate(&mut copy);
    copy
}
