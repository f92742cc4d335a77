//! Synthetic tracking events for load runs.

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde_json::{json, Value};
use uuid::Uuid;

const EVENT_NAMES: &[&str] = &["page_view", "button_click", "form_submit", "video_play", "scroll"];
const PAGES: &[&str] = &["/home", "/products", "/about", "/contact", "/checkout"];
const REFERRERS: &[Option<&str>] =
    &[Some("google"), Some("facebook"), Some("direct"), Some("email"), None];
const BROWSERS: &[&str] = &["Chrome", "Firefox", "Safari", "Edge"];
const OPERATING_SYSTEMS: &[&str] = &["Windows", "MacOS", "iOS", "Android"];
const SCREEN_SIZES: &[&str] = &["1920x1080", "1366x768", "375x812"];

/// Builds one random tracking event shaped like real client traffic.
pub(crate) fn random_event() -> Value {
    let mut rng = rand::thread_rng();
    let user_hex = Uuid::new_v4().simple().to_string();
    let session_hex = Uuid::new_v4().simple().to_string();

    json!({
        "event_name": pick(&mut rng, EVENT_NAMES),
        "event_time": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        "user_id": format!("user_{}", &user_hex[..8]),
        "session_id": format!("session_{session_hex}"),
        "properties": {
            "page": pick(&mut rng, PAGES),
            "referrer": REFERRERS[rng.gen_range(0..REFERRERS.len())],
            "duration": rng.gen_range(1..=300),
            "value": (rng.gen_range(0.0..100.0_f64) * 100.0).round() / 100.0,
        },
        "client_info": {
            "browser": pick(&mut rng, BROWSERS),
            "os": pick(&mut rng, OPERATING_SYSTEMS),
            "screen_size": pick(&mut rng, SCREEN_SIZES),
        },
    })
}

/// Builds a batch of `batch_size` random events.
pub(crate) fn random_batch(batch_size: usize) -> Vec<Value> {
    (0..batch_size).map(|_| random_event()).collect()
}

fn pick<'a>(rng: &mut impl Rng, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}
