use serde_json::{Map, Value, json};

pub const TIMEZONE: &str = "IST";

const TABLE: &[(&str, &[(&str, &[&str])])] = &[
    (
        "instagram",
        &[
            ("reel", &["7:00 PM", "9:00 PM", "12:00 PM"]),
            ("carousel", &["9:00 AM", "6:00 PM"]),
            ("image", &["11:00 AM", "3:00 PM"]),
        ],
    ),
    ("youtube", &[("video", &["5:00 PM", "8:00 PM"])]),
    ("twitter", &[("post", &["9:00 AM", "12:00 PM", "5:00 PM"])]),
    ("linkedin", &[("post", &["8:00 AM", "12:00 PM", "5:00 PM"])]),
];

fn platform_times(content: &[(&str, &[&str])]) -> Map<String, Value> {
    content
        .iter()
        .map(|(kind, times)| ((*kind).to_string(), json!(times)))
        .collect()
}

/// Best posting times, optionally narrowed to a platform and content type.
///
/// An unknown platform returns the full table; an unknown content type
/// returns the whole platform.
pub fn best_times(platform: Option<&str>, content_type: Option<&str>) -> Value {
    let Some((name, content)) = platform.and_then(|p| TABLE.iter().find(|(name, _)| *name == p))
    else {
        let all: Map<String, Value> = TABLE
            .iter()
            .map(|(name, content)| ((*name).to_string(), Value::Object(platform_times(content))))
            .collect();
        return json!({ "all_platforms": all, "timezone": TIMEZONE });
    };

    if let Some((kind, times)) =
        content_type.and_then(|c| content.iter().find(|(kind, _)| *kind == c))
    {
        return json!({
            "platform": name,
            "content_type": kind,
            "best_times": times,
            "timezone": TIMEZONE,
        });
    }

    json!({
        "platform": name,
        "best_times": platform_times(content),
        "timezone": TIMEZONE,
    })
}
