//! Normalized search and detail records, plus the upstream wire shapes
//! they are decoded from
//!
//! Upstream records are loosely typed: almost every field is optional, the
//! record type arrives either as a bare string or as a `{".tag": ...}` union,
//! and timestamps are usually integers but occasionally numeric strings.
//! Everything here decodes leniently into `Option`s; only a missing `uuid`
//! makes a search record unusable.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum number of characters of inlined file content kept in a detail record.
pub const MAX_CONTENT_CHARS: usize = 20_000;

/// Record type sentinel meaning "upstream didn't classify this record".
const UNKNOWN_RECORD_TYPE: &str = "unknown_record_type";

/// Coarse file category used for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Image,
    Video,
    Audio,
    Pdf,
    Presentation,
    Spreadsheet,
    Unknown,
}

impl FileType {
    /// Types a caller may filter a search by.
    pub const FILTERABLE: [FileType; 7] = [
        FileType::Document,
        FileType::Image,
        FileType::Video,
        FileType::Audio,
        FileType::Pdf,
        FileType::Presentation,
        FileType::Spreadsheet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Document => "document",
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Pdf => "pdf",
            FileType::Presentation => "presentation",
            FileType::Spreadsheet => "spreadsheet",
            FileType::Unknown => "unknown",
        }
    }

    /// Classify from the upstream display label, falling back to the MIME type.
    pub fn classify(label: Option<&str>, mime_type: Option<&str>) -> FileType {
        label
            .and_then(Self::from_label)
            .or_else(|| mime_type.and_then(Self::from_mime))
            .unwrap_or(FileType::Unknown)
    }

    fn from_label(label: &str) -> Option<FileType> {
        let label = label.to_ascii_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| label.contains(n));
        if has(&["pdf"]) {
            Some(FileType::Pdf)
        } else if has(&["presentation", "slide", "powerpoint", "keynote"]) {
            Some(FileType::Presentation)
        } else if has(&["spreadsheet", "sheet", "excel", "csv"]) {
            Some(FileType::Spreadsheet)
        } else if has(&["image", "photo", "picture"]) {
            Some(FileType::Image)
        } else if has(&["video", "movie"]) {
            Some(FileType::Video)
        } else if has(&["audio", "music", "sound"]) {
            Some(FileType::Audio)
        } else if has(&["document", "doc", "text", "paper", "note"]) {
            Some(FileType::Document)
        } else {
            None
        }
    }

    fn from_mime(mime: &str) -> Option<FileType> {
        let mime = mime.to_ascii_lowercase();
        if mime == "application/pdf" {
            Some(FileType::Pdf)
        } else if mime.starts_with("image/") {
            Some(FileType::Image)
        } else if mime.starts_with("video/") {
            Some(FileType::Video)
        } else if mime.starts_with("audio/") {
            Some(FileType::Audio)
        } else if mime.contains("presentation") || mime.contains("powerpoint") {
            Some(FileType::Presentation)
        } else if mime.contains("spreadsheet") || mime.contains("excel") || mime == "text/csv" {
            Some(FileType::Spreadsheet)
        } else if mime.starts_with("text/")
            || mime.contains("document")
            || mime.contains("msword")
        {
            Some(FileType::Document)
        } else {
            None
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a file type name outside [`FileType::FILTERABLE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFileType(pub String);

impl fmt::Display for UnknownFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allowed: Vec<&str> = FileType::FILTERABLE.iter().map(|t| t.as_str()).collect();
        write!(
            f,
            "unsupported file_type '{}'; allowed: {}",
            self.0,
            allowed.join(", ")
        )
    }
}

impl std::error::Error for UnknownFileType {}

impl FromStr for FileType {
    type Err = UnknownFileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FileType::FILTERABLE
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| UnknownFileType(s.to_string()))
    }
}

/// One normalized search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub uuid: String,
    /// Upstream record kind (`file`, `link`, `person`, ...), if classified.
    pub record_type: Option<String>,
    pub relevance: Option<f64>,
    pub body: ResultBody,
}

/// Kind-specific part of a search hit.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultBody {
    Content(ContentResult),
    Person(PersonResult),
}

/// Files, links, messages, events, and any kind not recognized otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResult {
    pub title: Option<String>,
    pub url: Option<String>,
    pub preview_text: Option<String>,
    pub description: Option<String>,
    pub file_type: Option<FileType>,
    pub file_type_label: Option<String>,
    pub mime_type: Option<String>,
    pub source_name: Option<String>,
    pub creator: Option<String>,
    pub last_modified_by: Option<String>,
    /// Unix milliseconds.
    pub updated_at: Option<i64>,
    /// Unix milliseconds, as reported by the source system.
    pub source_updated_at: Option<i64>,
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonResult {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub source_name: Option<String>,
}

/// Metadata and optional inlined content for one uuid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailRecord {
    pub title: Option<String>,
    pub link: Option<String>,
    pub updated_at: Option<i64>,
    pub source_updated_at: Option<i64>,
    pub mime_type: Option<String>,
    pub source_name: Option<String>,
    pub creator: Option<String>,
    pub last_modified_by: Option<String>,
    pub media: Option<MediaMetadata>,
    pub thumbnail_mime_type: Option<String>,
    pub content: Option<DetailContent>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub video: Option<VideoMetadata>,
    pub image: Option<ImageMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoMetadata {
    pub duration_ms: Option<u64>,
    pub width: Option<u64>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub creator: Option<String>,
    pub date_taken: Option<String>,
}

/// Inlined file body, capped at [`MAX_CONTENT_CHARS`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetailContent {
    pub text: String,
    pub mime_type: Option<String>,
    /// Length of the original body in characters.
    pub total_chars: usize,
    pub truncated: bool,
}

impl DetailContent {
    /// Keep the longest prefix of at most `MAX_CONTENT_CHARS` characters.
    pub fn capped(text: &str, mime_type: Option<String>) -> Self {
        let total_chars = text.chars().count();
        let (text, truncated) = match text.char_indices().nth(MAX_CONTENT_CHARS) {
            Some((cut, _)) => (text[..cut].to_string(), true),
            None => (text.to_string(), false),
        };
        Self {
            text,
            mime_type,
            total_chars,
            truncated,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

/// `results[].query_result` from `/2/dcs/search`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawQueryResult {
    uuid: Option<String>,
    record_type: Option<RecordTypeValue>,
    title: Option<String>,
    url: Option<String>,
    preview: Option<String>,
    #[serde(deserialize_with = "lenient_millis")]
    updated_at_ms: Option<i64>,
    #[serde(deserialize_with = "lenient_millis")]
    provider_updated_at_ms: Option<i64>,
    display_name: Option<String>,
    email: Option<String>,
    relevance_score: Option<f64>,
    file_type_info: Option<FileTypeInfo>,
    connector_info: Option<ConnectorInfo>,
    creator: Option<RawPerson>,
    last_modifier: Option<RawPerson>,
    description: Option<String>,
    upstream_id: Option<String>,
    mime_type: Option<String>,
}

/// Either `"file"` or `{".tag": "file"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordTypeValue {
    Plain(String),
    Tagged {
        #[serde(rename = ".tag")]
        tag: String,
    },
}

impl RecordTypeValue {
    fn normalized(self) -> Option<String> {
        let tag = match self {
            RecordTypeValue::Plain(s) => s,
            RecordTypeValue::Tagged { tag } => tag,
        };
        let tag = tag.trim();
        (!tag.is_empty() && tag != UNKNOWN_RECORD_TYPE).then(|| tag.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileTypeInfo {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConnectorInfo {
    connector_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPerson {
    display_name: Option<String>,
    email: Option<String>,
}

impl RawPerson {
    fn name(self) -> Option<String> {
        non_empty(self.display_name).or_else(|| non_empty(self.email))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn person_name(person: Option<RawPerson>) -> Option<String> {
    person.and_then(RawPerson::name)
}

/// Accept integer, float, or numeric-string millisecond timestamps.
fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl RawQueryResult {
    /// Normalize; `None` when the record has no usable uuid.
    pub(crate) fn normalize(self) -> Option<SearchResult> {
        let uuid = non_empty(self.uuid)?;
        let record_type = self.record_type.and_then(RecordTypeValue::normalized);
        let relevance = self.relevance_score.filter(|r| r.is_finite());
        let source_name = self.connector_info.and_then(|c| non_empty(c.connector_id));

        let is_person = record_type.as_deref() == Some("person")
            || (self.title.is_none() && (self.display_name.is_some() || self.email.is_some()));

        let body = if is_person {
            ResultBody::Person(PersonResult {
                display_name: non_empty(self.display_name),
                email: non_empty(self.email),
                url: non_empty(self.url),
                source_name,
            })
        } else {
            let file_type_label = self.file_type_info.and_then(|f| non_empty(f.display_name));
            let mime_type = non_empty(self.mime_type);
            let file_type = (file_type_label.is_some() || mime_type.is_some())
                .then(|| FileType::classify(file_type_label.as_deref(), mime_type.as_deref()));
            ResultBody::Content(ContentResult {
                title: non_empty(self.title),
                url: non_empty(self.url),
                preview_text: non_empty(self.preview),
                description: non_empty(self.description),
                file_type,
                file_type_label,
                mime_type,
                source_name,
                creator: person_name(self.creator),
                last_modified_by: person_name(self.last_modifier),
                updated_at: self.updated_at_ms.filter(|ms| *ms > 0),
                source_updated_at: self.provider_updated_at_ms.filter(|ms| *ms > 0),
                source_id: non_empty(self.upstream_id),
            })
        };

        Some(SearchResult {
            uuid,
            record_type,
            relevance,
            body,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetadataResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

/// Decode a field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// `results[]` from `/2/dcs/get_link_metadata`.
///
/// Every field decodes on its own, so one mistyped field drops only that
/// field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawFileMetadata {
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    link: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub error_code: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub error_message: Option<String>,
    #[serde(deserialize_with = "lenient_millis")]
    provider_last_updated_at_ms: Option<i64>,
    #[serde(deserialize_with = "lenient_millis")]
    updated_at_ms: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    mime_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    connector_info: Option<ConnectorInfo>,
    #[serde(deserialize_with = "lenient")]
    creator: Option<RawPerson>,
    #[serde(deserialize_with = "lenient")]
    last_modifier: Option<RawPerson>,
    #[serde(deserialize_with = "lenient")]
    media_metadata: Option<RawMediaMetadata>,
    #[serde(deserialize_with = "lenient")]
    thumbnail: Option<RawBlob>,
    #[serde(deserialize_with = "lenient")]
    body: Option<RawBlob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMediaMetadata {
    video_metadata: Option<RawVideoMetadata>,
    image_metadata: Option<RawImageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVideoMetadata {
    duration_ms: Option<u64>,
    width: Option<u64>,
    height: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImageMetadata {
    image_width: Option<u64>,
    image_height: Option<u64>,
    camera_make: Option<String>,
    camera_model: Option<String>,
    creator: Option<String>,
    date_time_original: Option<String>,
}

/// `{"blob_content": {"raw": "...", "mime_type": "..."}}`, or for thumbnails
/// `{"blob_content": {"raw_content": {"mime_type": "..."}}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBlob {
    blob_content: Option<RawBlobContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBlobContent {
    raw: Option<String>,
    mime_type: Option<String>,
    raw_content: Option<RawContentInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContentInfo {
    mime_type: Option<String>,
}

impl RawFileMetadata {
    pub(crate) fn normalize(self) -> DetailRecord {
        let media = self.media_metadata.and_then(|m| {
            let video = m.video_metadata.map(|v| VideoMetadata {
                duration_ms: v.duration_ms,
                width: v.width,
                height: v.height,
            });
            let image = m.image_metadata.map(|i| ImageMetadata {
                width: i.image_width,
                height: i.image_height,
                camera_make: non_empty(i.camera_make),
                camera_model: non_empty(i.camera_model),
                creator: non_empty(i.creator),
                date_taken: non_empty(i.date_time_original),
            });
            (video.is_some() || image.is_some()).then_some(MediaMetadata { video, image })
        });

        let thumbnail_mime_type = self
            .thumbnail
            .and_then(|t| t.blob_content)
            .and_then(|b| b.raw_content)
            .and_then(|r| non_empty(r.mime_type));

        let content = self.body.and_then(|b| b.blob_content).and_then(|blob| {
            let raw = blob.raw.filter(|r| !r.is_empty())?;
            Some(DetailContent::capped(&raw, non_empty(blob.mime_type)))
        });

        DetailRecord {
            title: non_empty(self.title),
            link: non_empty(self.link),
            updated_at: self.updated_at_ms.filter(|ms| *ms > 0),
            source_updated_at: self.provider_last_updated_at_ms.filter(|ms| *ms > 0),
            mime_type: non_empty(self.mime_type),
            source_name: self.connector_info.and_then(|c| non_empty(c.connector_id)),
            creator: person_name(self.creator),
            last_modified_by: person_name(self.last_modifier),
            media,
            thumbnail_mime_type,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Option<SearchResult> {
        serde_json::from_value::<RawQueryResult>(value)
            .ok()
            .and_then(RawQueryResult::normalize)
    }

    #[test]
    fn file_type_parses_filterable_names_only() {
        assert_eq!("pdf".parse::<FileType>(), Ok(FileType::Pdf));
        assert_eq!(" Spreadsheet ".parse::<FileType>(), Ok(FileType::Spreadsheet));
        let err = "unknown".parse::<FileType>().unwrap_err();
        assert!(err.to_string().contains("allowed: document, image"));
        assert!("archive".parse::<FileType>().is_err());
    }

    #[test]
    fn file_type_classification_prefers_label() {
        assert_eq!(
            FileType::classify(Some("Google Slides"), Some("application/pdf")),
            FileType::Presentation
        );
        assert_eq!(FileType::classify(None, Some("image/png")), FileType::Image);
        assert_eq!(
            FileType::classify(Some("Mystery"), Some("application/pdf")),
            FileType::Pdf
        );
        assert_eq!(
            FileType::classify(Some("Mystery"), Some("application/zip")),
            FileType::Unknown
        );
    }

    #[test]
    fn content_record_normalizes_all_fields() {
        let result = parse(json!({
            "uuid": "u-1",
            "record_type": {".tag": "file"},
            "title": "Q3 Plan",
            "url": "https://example.com/q3",
            "preview": "Plan for Q3",
            "description": "Quarterly plan",
            "file_type_info": {"display_name": "PDF"},
            "mime_type": "application/pdf",
            "connector_info": {"connector_id": "google_drive"},
            "creator": {"display_name": "Ada"},
            "last_modifier": {"email": "bob@example.com"},
            "updated_at_ms": 1_735_689_600_000i64,
            "provider_updated_at_ms": "1735603200000",
            "relevance_score": 0.87,
            "upstream_id": "drive-123",
            "extra_field": {"ignored": true}
        }))
        .unwrap();

        assert_eq!(result.uuid, "u-1");
        assert_eq!(result.record_type.as_deref(), Some("file"));
        assert_eq!(result.relevance, Some(0.87));
        let ResultBody::Content(content) = result.body else {
            panic!("expected content body");
        };
        assert_eq!(content.title.as_deref(), Some("Q3 Plan"));
        assert_eq!(content.file_type, Some(FileType::Pdf));
        assert_eq!(content.file_type_label.as_deref(), Some("PDF"));
        assert_eq!(content.source_name.as_deref(), Some("google_drive"));
        assert_eq!(content.creator.as_deref(), Some("Ada"));
        assert_eq!(content.last_modified_by.as_deref(), Some("bob@example.com"));
        assert_eq!(content.updated_at, Some(1_735_689_600_000));
        assert_eq!(content.source_updated_at, Some(1_735_603_200_000));
        assert_eq!(content.source_id.as_deref(), Some("drive-123"));
    }

    #[test]
    fn person_record_normalizes() {
        let result = parse(json!({
            "uuid": "p-1",
            "record_type": "person",
            "display_name": "Grace Hopper",
            "email": "grace@example.com",
            "connector_info": {"connector_id": "slack"}
        }))
        .unwrap();

        assert_eq!(result.record_type.as_deref(), Some("person"));
        assert_eq!(
            result.body,
            ResultBody::Person(PersonResult {
                display_name: Some("Grace Hopper".into()),
                email: Some("grace@example.com".into()),
                url: None,
                source_name: Some("slack".into()),
            })
        );
    }

    #[test]
    fn unknown_record_type_sentinel_is_absent() {
        let result = parse(json!({"uuid": "u", "record_type": "unknown_record_type"})).unwrap();
        assert_eq!(result.record_type, None);
        assert!(matches!(result.body, ResultBody::Content(_)));
    }

    #[test]
    fn record_without_uuid_is_rejected() {
        assert!(parse(json!({"title": "orphan"})).is_none());
        assert!(parse(json!({"uuid": "  ", "title": "blank"})).is_none());
    }

    #[test]
    fn mistyped_field_fails_the_record() {
        assert!(parse(json!({"uuid": "u", "title": 42})).is_none());
    }

    #[test]
    fn zero_timestamps_are_absent() {
        let result = parse(json!({"uuid": "u", "title": "t", "updated_at_ms": 0})).unwrap();
        let ResultBody::Content(content) = result.body else {
            panic!("expected content body");
        };
        assert_eq!(content.updated_at, None);
    }

    #[test]
    fn content_is_capped_on_char_boundaries() {
        let short = DetailContent::capped("hello", None);
        assert_eq!(short.text, "hello");
        assert!(!short.truncated);
        assert_eq!(short.total_chars, 5);

        let exact = "a".repeat(MAX_CONTENT_CHARS);
        let capped = DetailContent::capped(&exact, None);
        assert!(!capped.truncated);

        // Multi-byte characters must never be split
        let long = "é".repeat(MAX_CONTENT_CHARS + 5);
        let capped = DetailContent::capped(&long, Some("text/plain".into()));
        assert!(capped.truncated);
        assert_eq!(capped.text.chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(capped.total_chars, MAX_CONTENT_CHARS + 5);
        assert_eq!(capped.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn file_metadata_normalizes_media_thumbnail_and_body() {
        let raw: RawFileMetadata = serde_json::from_value(json!({
            "title": "clip.mp4",
            "link": "https://example.com/clip",
            "updated_at_ms": 1_735_689_600_000i64,
            "mime_type": "video/mp4",
            "creator": {"display_name": "Ada"},
            "media_metadata": {
                "video_metadata": {"duration_ms": 12_500, "width": 1920, "height": 1080}
            },
            "thumbnail": {"blob_content": {"raw_content": {"mime_type": "image/jpeg"}}},
            "body": {"blob_content": {"raw": "transcript", "mime_type": "text/plain"}}
        }))
        .unwrap();
        let record = raw.normalize();

        assert_eq!(record.title.as_deref(), Some("clip.mp4"));
        let video = record.media.unwrap().video.unwrap();
        assert_eq!(video.duration_ms, Some(12_500));
        assert_eq!(video.width, Some(1920));
        assert_eq!(record.thumbnail_mime_type.as_deref(), Some("image/jpeg"));
        let content = record.content.unwrap();
        assert_eq!(content.text, "transcript");
        assert_eq!(content.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn empty_media_payload_is_absent() {
        let raw: RawFileMetadata =
            serde_json::from_value(json!({"title": "t", "media_metadata": {}})).unwrap();
        assert!(raw.normalize().media.is_none());
    }
}
