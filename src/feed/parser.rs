use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use feed_rs::model;
use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

/// One parsed feed item as a key/value mapping.
///
/// Keys follow the names feedparser uses (`title`, `published`, `link`,
/// `media_content`, `tags`, ...) so field lookups can be configured by name
/// at runtime. Absent values are left out rather than stored as `null`.
pub type Entry = Map<String, Value>;

/// Parses an RSS, Atom or JSON Feed document into entry mappings, in
/// document order.
///
/// `published` and `updated` hold the date text exactly as the document
/// wrote it. Only when that text cannot be located (JSON Feed, or an item
/// layout the XML scan does not line up with) is the parsed date rendered
/// as RFC 3339 instead.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<Entry>> {
    let feed = parser::parse(bytes)?;

    let raw_dates = match scan_item_dates(bytes) {
        Some(dates) if dates.len() == feed.entries.len() => dates,
        scanned => {
            if !feed.entries.is_empty() {
                tracing::debug!(
                    entries = feed.entries.len(),
                    scanned = scanned.map(|d| d.len()),
                    "Raw item dates unavailable, using parsed dates"
                );
            }
            Vec::new()
        }
    };
    let mut raw_dates = raw_dates.into_iter();

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| entry_to_map(entry, raw_dates.next().unwrap_or_default()))
        .collect())
}

fn entry_to_map(entry: model::Entry, raw: RawDates) -> Entry {
    let mut map = Entry::new();

    if !entry.id.is_empty() {
        map.insert("id".to_string(), Value::String(entry.id));
    }
    insert_opt(&mut map, "title", entry.title.map(|t| t.content));
    insert_opt(
        &mut map,
        "link",
        entry.links.first().map(|l| l.href.clone()),
    );
    if !entry.links.is_empty() {
        let links = entry
            .links
            .iter()
            .map(|l| {
                let mut link = Entry::new();
                link.insert("href".to_string(), Value::String(l.href.clone()));
                insert_opt(&mut link, "rel", l.rel.clone());
                insert_opt(&mut link, "type", l.media_type.clone());
                Value::Object(link)
            })
            .collect();
        map.insert("links".to_string(), Value::Array(links));
    }
    insert_opt(
        &mut map,
        "published",
        raw.published.or_else(|| entry.published.map(format_date)),
    );
    insert_opt(
        &mut map,
        "updated",
        raw.updated.or_else(|| entry.updated.map(format_date)),
    );
    insert_opt(&mut map, "summary", entry.summary.map(|s| s.content));
    insert_opt(&mut map, "content", entry.content.and_then(|c| c.body));
    insert_opt(
        &mut map,
        "author",
        entry.authors.first().map(|a| a.name.clone()),
    );

    if !entry.categories.is_empty() {
        let tags = entry
            .categories
            .into_iter()
            .map(|c| {
                // feedparser keeps the unset keys as nulls; tag flattening skips them
                let mut tag = Entry::new();
                tag.insert("term".to_string(), Value::String(c.term));
                tag.insert("scheme".to_string(), c.scheme.map_or(Value::Null, Value::String));
                tag.insert("label".to_string(), c.label.map_or(Value::Null, Value::String));
                Value::Object(tag)
            })
            .collect();
        map.insert("tags".to_string(), Value::Array(tags));
    }

    let media_content: Vec<Value> = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|c| {
            let url = c.url.as_ref()?.to_string();
            let mut item = Entry::new();
            item.insert("url".to_string(), Value::String(url));
            insert_opt(&mut item, "type", c.content_type.as_ref().map(|t| t.to_string()));
            insert_opt(&mut item, "width", c.width);
            insert_opt(&mut item, "height", c.height);
            Some(Value::Object(item))
        })
        .collect();
    if !media_content.is_empty() {
        map.insert("media_content".to_string(), Value::Array(media_content));
    }

    let media_thumbnail: Vec<Value> = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| {
            let mut item = Entry::new();
            item.insert("url".to_string(), Value::String(t.image.uri.clone()));
            insert_opt(&mut item, "width", t.image.width);
            insert_opt(&mut item, "height", t.image.height);
            Value::Object(item)
        })
        .collect();
    if !media_thumbnail.is_empty() {
        map.insert("media_thumbnail".to_string(), Value::Array(media_thumbnail));
    }

    map
}

/// Fallback rendering for dates with no raw text available.
fn format_date(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// Raw date text
// ============================================================================

/// Date text of one `<item>`/`<entry>`, as written in the document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct RawDates {
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum DateField {
    Published,
    Updated,
}

impl RawDates {
    /// Keeps the first non-empty value seen for each field.
    fn set(&mut self, field: DateField, text: String) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let slot = match field {
            DateField::Published => &mut self.published,
            DateField::Updated => &mut self.updated,
        };
        if slot.is_none() {
            *slot = Some(text.to_string());
        }
    }
}

fn is_item(local_name: &[u8]) -> bool {
    matches!(local_name, b"item" | b"entry")
}

fn date_field(local_name: &[u8]) -> Option<DateField> {
    match local_name {
        b"pubDate" | b"published" | b"issued" => Some(DateField::Published),
        b"updated" | b"modified" | b"date" => Some(DateField::Updated),
        _ => None,
    }
}

/// Collects the date text of every top-level item, in document order.
///
/// Returns `None` when the document is not well-formed XML. feed-rs does
/// the real parsing; this pass only recovers text that feed-rs would
/// otherwise reinterpret or drop when the date format is unfamiliar.
fn scan_item_dates(bytes: &[u8]) -> Option<Vec<RawDates>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut item_depth: Option<usize> = None;
    let mut current = RawDates::default();
    let mut field: Option<(DateField, String)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match item_depth {
                    None if is_item(name.as_ref()) => {
                        item_depth = Some(depth);
                        current = RawDates::default();
                    }
                    Some(item) if depth == item + 1 => {
                        field = date_field(name.as_ref()).map(|f| (f, String::new()));
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                // <item/> still counts as an entry
                if item_depth.is_none() && is_item(e.local_name().as_ref()) {
                    items.push(RawDates::default());
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, text)) = field.as_mut() {
                    match e.unescape() {
                        Ok(unescaped) => text.push_str(&unescaped),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                match item_depth {
                    Some(item) if depth == item + 1 => {
                        if let Some((f, text)) = field.take() {
                            current.set(f, text);
                        }
                    }
                    Some(item) if depth == item => {
                        items.push(std::mem::take(&mut current));
                        item_depth = None;
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }

    Some(items)
}

fn insert_opt<V: Into<Value>>(map: &mut Entry, key: &str, value: Option<V>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}
