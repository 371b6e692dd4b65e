//! Plain-text rendering of the session card and the post list.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Timelike, Utc};
use fbdeck_core::models::Post;
use fbdeck_core::session::Session;
use fbdeck_core::toast::Toast;

const TITLE_MAX_CHARS: usize = 60;
const SKELETON_CARDS: usize = 3;
const RULE: &str = "────────────────────────────────────────";

pub fn login_card(session: &Session) -> String {
    let mut out = String::new();
    match (&session.user, session.authenticated) {
        (Some(user), true) => {
            let _ = writeln!(out, "Welcome, {}", user.display_name);
            let _ = writeln!(out, "Connected to Facebook");
            if let Some(avatar) = &user.avatar_url {
                let _ = writeln!(out, "Avatar: {avatar}");
            }
        }
        _ => {
            let _ = writeln!(out, "Facebook Integration");
            let _ = writeln!(out, "Connect with your Facebook account to view your posts");
        }
    }
    out
}

/// Placeholder shown while posts load.
pub fn loading_placeholder() -> String {
    let mut out = posts_header();
    for _ in 0..SKELETON_CARDS {
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "░░░░░░░░░░░░░░░░░░░░░░░░░░");
        let _ = writeln!(out, "░░░░░░░░░░░░");
        let _ = writeln!(out);
        let _ = writeln!(out, "░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░");
    }
    out
}

pub fn posts_list(posts: &[Post], now: DateTime<Utc>) -> String {
    let mut out = posts_header();
    if posts.is_empty() {
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "No posts found on your Facebook account");
        return out;
    }
    for post in posts {
        out.push_str(&post_card(post, now));
    }
    out
}

fn posts_header() -> String {
    "Your Facebook Posts\n".to_string()
}

pub fn post_card(post: &Post, now: DateTime<Utc>) -> String {
    let text = post.text.as_deref().filter(|t| !t.is_empty());
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{}", post_title(text));
    let _ = writeln!(out, "{}", relative_time(post.created_at, now));
    if let Some(image) = &post.image_url {
        let _ = writeln!(out, "Image: {image}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", text.unwrap_or("This post has no text content"));
    if let Some(permalink) = &post.permalink {
        let _ = writeln!(out);
        let _ = writeln!(out, "View on Facebook: {permalink}");
    }
    out
}

/// First 60 characters of the text, with an ellipsis when cut.
pub fn post_title(text: Option<&str>) -> String {
    match text.filter(|t| !t.is_empty()) {
        None => "Facebook Post".to_string(),
        Some(text) => {
            let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
            if text.chars().count() > TITLE_MAX_CHARS {
                title.push_str("...");
            }
            title
        }
    }
}

pub fn toast_line(toast: &Toast) -> String {
    let mark = if toast.is_destructive() { "✗" } else { "✓" };
    format!("{mark} {toast}")
}

/// Distance between `then` and `now` in words, e.g. "about 3 hours ago".
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let (earlier, later, future) = if then <= now {
        (then, now, false)
    } else {
        (now, then, true)
    };
    let distance = distance_in_words(earlier, later);
    if future {
        format!("in {distance}")
    } else {
        format!("{distance} ago")
    }
}

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2520;
const MINUTES_IN_MONTH: i64 = 43200;
const MINUTES_IN_TWO_MONTHS: i64 = 86400;

fn distance_in_words(earlier: DateTime<Utc>, later: DateTime<Utc>) -> String {
    let seconds = (later - earlier).num_seconds();
    let minutes = div_round(seconds, 60);

    if minutes < 1 {
        return "less than a minute".to_string();
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        return format!("about {}", plural(div_round(minutes, 60), "hour"));
    }
    if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        return plural(div_round(minutes, MINUTES_IN_DAY), "day");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        return format!("about {}", plural(div_round(minutes, MINUTES_IN_MONTH), "month"));
    }

    let months = months_between(earlier, later);
    if months < 12 {
        return plural(div_round(minutes, MINUTES_IN_MONTH).max(1), "month");
    }

    let years = months / 12;
    match months % 12 {
        0..=2 => format!("about {}", plural(years, "year")),
        3..=8 => format!("over {}", plural(years, "year")),
        _ => format!("almost {}", plural(years + 1, "year")),
    }
}

fn div_round(value: i64, divisor: i64) -> i64 {
    (value + divisor / 2).div_euclid(divisor)
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Whole calendar months from `earlier` to `later`.
fn months_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    let mut months = i64::from(later.year() - earlier.year()) * 12
        + i64::from(later.month()) - i64::from(earlier.month());
    let later_rest = (later.day(), later.num_seconds_from_midnight());
    let earlier_rest = (earlier.day(), earlier.num_seconds_from_midnight());
    if months > 0 && later_rest < earlier_rest {
        months -= 1;
    }
    months
}
