//! Turns raw upstream strings into display values.
//!
//! Nothing here fails: unusable input becomes [`PLACEHOLDER_IMAGE`] or
//! [`UNKNOWN_TIME`].

use crate::api::models::RawImages;
use chrono::NaiveTime;
use regex::Regex;
use std::sync::LazyLock;

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";
pub const UNKNOWN_TIME: &str = "Unknown";

const STORAGE_PREFIX: &str = "storage/";
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

static DOUBLE_STORAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/?storage/+storage/").expect("invalid storage regex"));
static IFRAME_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src\s*=\s*"([^"]+)""#).expect("invalid iframe regex"));

#[derive(Debug, Clone)]
pub struct Normalizer {
    base_url: String,
}

impl Normalizer {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    /// Canonical absolute URL for an image reference, or the placeholder.
    pub fn image_url(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == PLACEHOLDER_IMAGE {
            return PLACEHOLDER_IMAGE.to_string();
        }

        let mut url = trimmed.replace('\\', "");
        while DOUBLE_STORAGE.is_match(&url) {
            url = DOUBLE_STORAGE.replace_all(&url, "/storage/").into_owned();
        }

        // `http://localhost:8000storage/...`
        let glued = url
            .strip_prefix(&self.base_url)
            .filter(|rest| rest.starts_with(STORAGE_PREFIX))
            .map(|rest| format!("{}/{rest}", self.base_url));
        if let Some(fixed) = glued {
            url = fixed;
        }

        if has_scheme(&url) {
            return match url.strip_prefix(&self.base_url) {
                Some(path) if path.starts_with('/') => self.storage_url(path),
                // Some other host, leave its layout alone.
                _ => url.clone(),
            };
        }

        self.storage_url(&url)
    }

    fn storage_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return PLACEHOLDER_IMAGE.to_string();
        }
        if path.starts_with(STORAGE_PREFIX) {
            format!("{}/{path}", self.base_url)
        } else {
            format!("{}/{STORAGE_PREFIX}{path}", self.base_url)
        }
    }

    /// Normalized images of a record, skipping entries that normalize to the placeholder.
    pub fn image_list(&self, raw: Option<&RawImages>) -> Vec<String> {
        raw.map(decode_image_list)
            .unwrap_or_default()
            .iter()
            .map(|path| self.image_url(path))
            .filter(|url| url != PLACEHOLDER_IMAGE)
            .collect()
    }
}

/// Decodes the doubly-encoded `images` field. Malformed input yields no images.
pub fn decode_image_list(raw: &RawImages) -> Vec<String> {
    let encoded = match raw {
        RawImages::List(items) => return string_elements(items.iter().cloned()),
        RawImages::Encoded(s) => s.replace('\\', ""),
        RawImages::Other(_) => return Vec::new(),
    };
    if encoded.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<serde_json::Value>>(&encoded) {
        Ok(values) => string_elements(values),
        Err(e) => {
            tracing::warn!(raw = %encoded, error = %e, "could not decode image list");
            Vec::new()
        }
    }
}

fn string_elements(values: impl IntoIterator<Item = serde_json::Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

/// Renders a time of day as `HH:MM`, or [`UNKNOWN_TIME`] when absent or unparseable.
pub fn format_time(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return UNKNOWN_TIME.to_string();
    };

    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| {
            tracing::debug!(raw, "unparseable time of day");
            UNKNOWN_TIME.to_string()
        })
}

/// Embeddable map URL from a `location_url` value: an iframe fragment or a bare URL.
pub fn map_embed_src(location: &str) -> Option<String> {
    let location = location.trim();
    if let Some(caps) = IFRAME_SRC.captures(location) {
        return Some(caps[1].replace("&amp;", "&"));
    }
    has_scheme(location).then(|| location.to_string())
}

/// Like [`map_embed_src`], also accepting a bare `lat,lng` pair.
pub fn map_embed(location: &str, api_key: Option<&str>) -> Option<String> {
    map_embed_src(location).or_else(|| {
        let (lat, lng) = parse_coordinates(location)?;
        Some(coordinates_embed(lat, lng, api_key))
    })
}

fn parse_coordinates(s: &str) -> Option<(f64, f64)> {
    let (lat, lng) = s.trim().split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)).then_some((lat, lng))
}

pub fn coordinates_embed(latitude: f64, longitude: f64, api_key: Option<&str>) -> String {
    let mut url = format!(
        "https://www.google.com/maps/embed/v1/place?q={latitude},{longitude}&zoom=15"
    );
    if let Some(key) = api_key {
        url.push_str("&key=");
        url.push_str(key);
    }
    url
}

fn has_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.example.com";

    fn normalizer() -> Normalizer {
        Normalizer::new(BASE)
    }

    #[test]
    fn duplicated_storage_segment_collapses() {
        let n = normalizer();
        for raw in [
            "storage/storage/umkm_images/a.png",
            "/storage/storage/umkm_images/a.png",
            "storage//storage/umkm_images/a.png",
            "storage/storage/storage/umkm_images/a.png",
            "https://api.example.com/storage/storage/umkm_images/a.png",
        ] {
            let url = n.image_url(raw);
            assert_eq!(url, "https://api.example.com/storage/umkm_images/a.png", "{raw}");
            assert_eq!(url.matches("storage").count(), 1);
        }
    }

    #[test]
    fn empty_input_yields_placeholder() {
        let n = normalizer();
        assert_eq!(n.image_url(""), PLACEHOLDER_IMAGE);
        assert_eq!(n.image_url("   "), PLACEHOLDER_IMAGE);
        assert_eq!(n.image_url("/"), PLACEHOLDER_IMAGE);
        assert_eq!(n.image_url(PLACEHOLDER_IMAGE), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn missing_storage_marker_is_inserted() {
        let n = normalizer();
        assert_eq!(
            n.image_url("umkm_images/b.jpg"),
            "https://api.example.com/storage/umkm_images/b.jpg"
        );
        assert_eq!(
            n.image_url("https://api.example.com/umkm_images/b.jpg"),
            "https://api.example.com/storage/umkm_images/b.jpg"
        );
    }

    #[test]
    fn escapes_and_glued_host_are_repaired() {
        let n = normalizer();
        assert_eq!(
            n.image_url(r"storage\/product_images\/c.png"),
            "https://api.example.com/storage/product_images/c.png"
        );

        let local = Normalizer::new("http://localhost:8000/");
        assert_eq!(
            local.image_url("http://localhost:8000storage/umkm_images/d.png"),
            "http://localhost:8000/storage/umkm_images/d.png"
        );
    }

    #[test]
    fn foreign_hosts_are_left_alone() {
        let n = normalizer();
        let cdn = "https://cdn.other.net/pics/e.webp";
        assert_eq!(n.image_url(cdn), cdn);
        let lookalike = "https://api.example.com.evil.net/x.png";
        assert_eq!(n.image_url(lookalike), lookalike);
    }

    #[test]
    fn normalizing_is_idempotent() {
        let n = normalizer();
        for raw in [
            "storage/storage/umkm_images/a.png",
            "umkm_images/b.jpg",
            "https://cdn.other.net/pics/e.webp",
            "",
        ] {
            let once = n.image_url(raw);
            assert_eq!(n.image_url(&once), once, "{raw}");
        }
    }

    #[test]
    fn image_list_decodes_double_encoding() {
        let n = normalizer();
        let raw = RawImages::Encoded(r#"[\"storage/storage/umkm_images/a.png\", \"\"]"#.into());
        assert_eq!(
            n.image_list(Some(&raw)),
            vec!["https://api.example.com/storage/umkm_images/a.png".to_string()]
        );
    }

    #[test]
    fn malformed_image_list_is_empty() {
        assert!(decode_image_list(&RawImages::Encoded("[not json".into())).is_empty());
        assert!(decode_image_list(&RawImages::Encoded("".into())).is_empty());
        assert!(decode_image_list(&RawImages::Encoded("{\"a\":1}".into())).is_empty());
        assert!(decode_image_list(&RawImages::Other(serde_json::json!(7))).is_empty());
        let mixed = RawImages::List(vec!["a.png".into(), serde_json::Value::Null, 3.into()]);
        assert_eq!(decode_image_list(&mixed), ["a.png"]);
    }

    #[test]
    fn time_is_rendered_as_hours_and_minutes() {
        assert_eq!(format_time(Some("09:00:00")), "09:00");
        assert_eq!(format_time(Some("18:00:00")), "18:00");
        assert_eq!(format_time(Some("07:30")), "07:30");
        assert_eq!(format_time(None), UNKNOWN_TIME);
        assert_eq!(format_time(Some("")), UNKNOWN_TIME);
        assert_eq!(format_time(Some("25:99:00")), UNKNOWN_TIME);
        assert_eq!(format_time(Some("soon")), UNKNOWN_TIME);
    }

    #[test]
    fn map_src_comes_from_iframe_or_bare_url() {
        let iframe = r#"<iframe src="https://www.google.com/maps/embed?pb=!1m18&amp;x=1" width="600"></iframe>"#;
        assert_eq!(
            map_embed_src(iframe).as_deref(),
            Some("https://www.google.com/maps/embed?pb=!1m18&x=1")
        );
        assert_eq!(
            map_embed_src("https://maps.app.goo.gl/abc").as_deref(),
            Some("https://maps.app.goo.gl/abc")
        );
        assert_eq!(map_embed_src("Jl. Merdeka 1"), None);
    }

    #[test]
    fn coordinate_pairs_become_embeds() {
        assert_eq!(
            map_embed(" -7.8, 110.36 ", None).as_deref(),
            Some("https://www.google.com/maps/embed/v1/place?q=-7.8,110.36&zoom=15")
        );
        assert_eq!(map_embed("91,0", None), None);
        assert_eq!(map_embed("Jl. Merdeka, 1", None), None);
        assert_eq!(
            map_embed("https://maps.app.goo.gl/abc", Some("k")).as_deref(),
            Some("https://maps.app.goo.gl/abc")
        );
    }

    #[test]
    fn coordinate_embed_includes_optional_key() {
        assert_eq!(
            coordinates_embed(-6.2, 106.8, None),
            "https://www.google.com/maps/embed/v1/place?q=-6.2,106.8&zoom=15"
        );
        assert!(coordinates_embed(-6.2, 106.8, Some("k")).ends_with("&key=k"));
    }
}
