use std::collections::BTreeMap;

use rp_common::{FormatOption, MAX_HEIGHT};

/// Pick one format id per video height from a yt-dlp `--dump-json` document.
///
/// Audio-only entries (`vcodec == "none"`), entries without a height and
/// anything taller than [`MAX_HEIGHT`] are skipped. The first format listed
/// for a height wins. Output is ascending by height.
pub fn select_formats(info: &serde_json::Value) -> Vec<FormatOption> {
    let Some(formats) = info.get("formats").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut by_height: BTreeMap<u32, String> = BTreeMap::new();

    for fmt in formats {
        let vcodec = fmt.get("vcodec").and_then(|v| v.as_str());
        if vcodec == Some("none") {
            continue;
        }

        let height = fmt
            .get("height")
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|h| h as u64)))
            .unwrap_or(0);
        if height == 0 || height > MAX_HEIGHT as u64 {
            continue;
        }

        let format_id = fmt
            .get("format_id")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        by_height.entry(height as u32).or_insert(format_id);
    }

    by_height
        .into_iter()
        .map(|(height, format_id)| FormatOption { height, format_id })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_first_id_per_height_sorted_ascending() {
        let info = json!({
            "formats": [
                { "format_id": "137", "vcodec": "avc1.640028", "height": 1080 },
                { "format_id": "136", "vcodec": "avc1.4d401f", "height": 720 },
                { "format_id": "247", "vcodec": "vp9", "height": 720 },
                { "format_id": "160", "vcodec": "avc1.4d400c", "height": 144 },
                { "format_id": "134", "vcodec": "avc1.4d401e", "height": 360 },
            ]
        });

        let formats = select_formats(&info);
        assert_eq!(
            formats,
            vec![
                FormatOption::new(144, "160"),
                FormatOption::new(360, "134"),
                FormatOption::new(720, "136"),
            ]
        );
    }

    #[test]
    fn skips_audio_only_and_missing_heights() {
        let info = json!({
            "formats": [
                { "format_id": "140", "vcodec": "none", "acodec": "mp4a.40.2" },
                { "format_id": "sb0", "vcodec": "none", "height": 90 },
                { "format_id": "x", "vcodec": "avc1", "height": null },
                { "format_id": "y", "vcodec": "avc1", "height": 0 },
                { "format_id": "18", "height": 360 },
            ]
        });

        assert_eq!(select_formats(&info), vec![FormatOption::new(360, "18")]);
    }

    #[test]
    fn height_cap_is_inclusive() {
        let info = json!({
            "formats": [
                { "format_id": "a", "vcodec": "vp9", "height": 1024 },
                { "format_id": "b", "vcodec": "vp9", "height": 1025 },
            ]
        });

        assert_eq!(select_formats(&info), vec![FormatOption::new(1024, "a")]);
    }

    #[test]
    fn missing_formats_array_yields_empty() {
        assert!(select_formats(&json!({ "title": "x" })).is_empty());
        assert!(select_formats(&json!({ "formats": "nope" })).is_empty());
    }
}
