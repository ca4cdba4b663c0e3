//! Maps a parsed feed entry onto the stored article shape.
//!
//! Every lookup is by runtime key and tolerates absence at every level, so
//! no entry mapping can make normalization fail.

use serde_json::Value;

use crate::config::FieldPaths;
use crate::feed::image::fetch_image;
use crate::feed::parser::Entry;
use crate::storage::ArticleRecord;

/// Key holding the entry's tag list. Not configurable.
const TAGS_KEY: &str = "tags";

/// Article fields read from an entry, before the image is downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedEntry {
    pub title: String,
    pub publication_timestamp: String,
    pub weblink: String,
    /// Empty when the entry carries no usable image reference.
    pub image_url: String,
    pub tags: Vec<String>,
    pub summary: String,
}

impl ExtractedEntry {
    /// Attaches the downloaded picture, producing the record to persist.
    pub fn into_record(self, picture: Option<Vec<u8>>) -> ArticleRecord {
        ArticleRecord {
            title: self.title,
            publication_timestamp: self.publication_timestamp,
            weblink: self.weblink,
            picture,
            tags: self.tags,
            summary: self.summary,
        }
    }
}

/// Reads the article fields out of `entry` using the configured keys.
pub fn extract(entry: &Entry, fields: &FieldPaths) -> ExtractedEntry {
    let text_at = |key: &str| entry.get(key).and_then(value_text).unwrap_or_default();

    ExtractedEntry {
        title: text_at(&fields.title),
        publication_timestamp: text_at(&fields.timestamp),
        weblink: text_at(&fields.weblink),
        image_url: image_url(entry, fields),
        tags: flatten_tags(entry.get(TAGS_KEY)),
        summary: text_at(&fields.summary),
    }
}

/// Extracts the entry's fields and downloads its image.
///
/// A failed image download leaves `picture` empty; the other fields are
/// unaffected.
pub async fn normalize(
    entry: &Entry,
    fields: &FieldPaths,
    client: &reqwest::Client,
) -> ArticleRecord {
    let extracted = extract(entry, fields);
    let picture = fetch_image(client, &extracted.image_url).await;
    extracted.into_record(picture)
}

/// `entry[image][0][image_url]`, or `""` if any step is missing.
fn image_url(entry: &Entry, fields: &FieldPaths) -> String {
    entry
        .get(&fields.image)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_object)
        .and_then(|first| first.get(&fields.image_url))
        .and_then(value_text)
        .unwrap_or_default()
}

/// Collects every truthy value of every tag mapping, whatever its key,
/// in encounter order.
pub fn flatten_tags(tags: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(tags)) = tags else {
        return Vec::new();
    };

    tags.iter()
        .filter_map(Value::as_object)
        .flat_map(|tag| tag.values())
        .filter_map(tag_text)
        .collect()
}

/// Tag values follow truthiness: `0` and `false` are dropped along with the
/// empty values, and `true` is spelled `True`.
fn tag_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(false) => None,
        Value::Bool(true) => Some("True".to_string()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        _ => value_text(value),
    }
}

/// Coerces a value to text, or `None` when it is empty.
///
/// Strings are used as-is, numbers and booleans through their display form,
/// nested arrays and objects as compact JSON.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(value: Value) -> Entry {
        match value {
            Value::Object(map) => map,
            other => panic!("test entry must be an object, got {other}"),
        }
    }

    #[test]
    fn test_extract_full_entry() {
        let e = entry(json!({
            "title": "A",
            "published": "2024-01-01T00:00:00",
            "link": "http://x/a",
            "media_content": [{"url": "http://img/1.png"}],
            "tags": [{"term": "world"}],
            "summary": "s"
        }));

        let extracted = extract(&e, &FieldPaths::default());
        assert_eq!(
            extracted,
            ExtractedEntry {
                title: "A".to_string(),
                publication_timestamp: "2024-01-01T00:00:00".to_string(),
                weblink: "http://x/a".to_string(),
                image_url: "http://img/1.png".to_string(),
                tags: vec!["world".to_string()],
                summary: "s".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_empty_entry_uses_defaults() {
        let extracted = extract(&Entry::new(), &FieldPaths::default());
        assert_eq!(extracted, ExtractedEntry::default());
    }

    #[test]
    fn test_missing_optional_fields_keep_present_ones() {
        let e = entry(json!({"title": "B", "link": "http://x/b"}));
        let extracted = extract(&e, &FieldPaths::default());
        assert_eq!(extracted.title, "B");
        assert_eq!(extracted.weblink, "http://x/b");
        assert_eq!(extracted.publication_timestamp, "");
        assert_eq!(extracted.image_url, "");
        assert!(extracted.tags.is_empty());
        assert_eq!(extracted.summary, "");
    }

    #[test]
    fn test_custom_field_paths() {
        let fields = FieldPaths {
            title: "headline".to_string(),
            timestamp: "updated".to_string(),
            weblink: "id".to_string(),
            image: "media_thumbnail".to_string(),
            image_url: "href".to_string(),
            summary: "content".to_string(),
        };
        let e = entry(json!({
            "title": "ignored",
            "headline": "H",
            "updated": "2024-03-03T03:03:03+00:00",
            "id": "urn:1",
            "media_thumbnail": [{"href": "https://img/t.jpg"}, {"href": "https://img/u.jpg"}],
            "content": "body"
        }));

        let extracted = extract(&e, &fields);
        assert_eq!(extracted.title, "H");
        assert_eq!(extracted.publication_timestamp, "2024-03-03T03:03:03+00:00");
        assert_eq!(extracted.weblink, "urn:1");
        assert_eq!(extracted.image_url, "https://img/t.jpg");
        assert_eq!(extracted.summary, "body");
    }

    #[test]
    fn test_image_lookup_tolerates_wrong_shapes() {
        let fields = FieldPaths::default();
        let cases = [
            json!({"media_content": []}),
            json!({"media_content": null}),
            json!({"media_content": "http://img/1.png"}),
            json!({"media_content": [{}]}),
            json!({"media_content": ["http://img/1.png"]}),
            json!({"media_content": [{"href": "http://img/1.png"}]}),
            json!({"media_content": [{"url": ""}]}),
        ];
        for case in cases {
            assert_eq!(extract(&entry(case.clone()), &fields).image_url, "", "{case}");
        }
    }

    #[test]
    fn test_flatten_tags_collects_all_non_empty_values() {
        let tags = json!([
            {"term": "world", "scheme": null, "label": ""},
            {"term": "politics", "label": "Politics"},
            "not-a-mapping",
            {},
            {"rank": 3}
        ]);
        assert_eq!(
            flatten_tags(Some(&tags)),
            vec!["world", "politics", "Politics", "3"]
        );
    }

    #[test]
    fn test_flatten_tags_drops_falsy_values() {
        let tags = json!([
            {"term": "world", "rank": 0, "weight": 0.0, "hidden": false},
            {"featured": true, "extra": [], "meta": {}},
            {"rank": 2, "aliases": ["a", "b"]}
        ]);
        assert_eq!(
            flatten_tags(Some(&tags)),
            vec!["world", "True", "2", r#"["a","b"]"#]
        );
    }

    #[test]
    fn test_flatten_tags_absent_or_wrong_type() {
        assert!(flatten_tags(None).is_empty());
        assert!(flatten_tags(Some(&json!([]))).is_empty());
        assert!(flatten_tags(Some(&json!("world"))).is_empty());
    }

    #[test]
    fn test_non_string_fields_are_coerced() {
        let e = entry(json!({"title": 42, "published": true, "summary": ""}));
        let extracted = extract(&e, &FieldPaths::default());
        assert_eq!(extracted.title, "42");
        assert_eq!(extracted.publication_timestamp, "true");
        assert_eq!(extracted.summary, "");
    }

    #[tokio::test]
    async fn test_normalize_fetches_picture() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let e = entry(json!({
            "title": "A",
            "media_content": [{"url": format!("{}/1.png", mock_server.uri())}]
        }));
        let client = reqwest::Client::new();
        let record = normalize(&e, &FieldPaths::default(), &client).await;

        assert_eq!(record.title, "A");
        assert_eq!(record.picture.as_deref(), Some(&b"png-bytes"[..]));
    }

    #[tokio::test]
    async fn test_normalize_image_failure_keeps_other_fields() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let e = entry(json!({
            "title": "A",
            "link": "http://x/a",
            "summary": "s",
            "media_content": [{"url": format!("{}/gone.png", mock_server.uri())}]
        }));
        let client = reqwest::Client::new();
        let record = normalize(&e, &FieldPaths::default(), &client).await;

        assert_eq!(record.picture, None);
        assert_eq!(record.title, "A");
        assert_eq!(record.weblink, "http://x/a");
        assert_eq!(record.summary, "s");
    }

    proptest! {
        #[test]
        fn prop_flatten_keeps_non_empty_strings_in_order(
            tags in prop::collection::vec(
                prop::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9 ]{0,8}", 0..4),
                0..6,
            )
        ) {
            let value = Value::Array(
                tags.iter()
                    .map(|m| json!(m))
                    .collect(),
            );
            let expected: Vec<String> = tags
                .iter()
                .flat_map(|m| m.values())
                .filter(|v| !v.is_empty())
                .cloned()
                .collect();
            prop_assert_eq!(flatten_tags(Some(&value)), expected);
        }
    }
}
