//! Plain-text rendering of tool results
//!
//! Every detail line has the shape `<icon> <Label>: <value>`; lines with no
//! value are omitted. Search results are separated by a divider of 50 em
//! dashes.

use std::fmt::Display;

use chrono::DateTime;
use dash_api::{DetailRecord, ResultBody, SearchResult};
use dash_auth::{AccountIdentity, AuthorizationRequest};

const DIVIDER_WIDTH: usize = 50;

/// `YYYY-MM-DD HH:MM:SS UTC`, or `Unknown` for absent or non-positive values.
pub fn format_timestamp(millis: Option<i64>) -> String {
    millis
        .filter(|ms| *ms > 0)
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[derive(Default)]
struct Lines(String);

impl Lines {
    fn line(&mut self, text: impl AsRef<str>) {
        self.0.push_str(text.as_ref());
        self.0.push('\n');
    }

    fn field(&mut self, icon: &str, label: &str, value: Option<impl Display>) {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.trim().is_empty() {
                self.line(format!("{icon} {label}: {value}"));
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append `section` under `title` if it has any lines.
    fn section(&mut self, title: &str, section: Lines) {
        if !section.is_empty() {
            self.line(title);
            self.0.push_str(&section.0);
        }
    }

    fn finish(self) -> String {
        self.0.trim_end().to_string()
    }
}

pub fn auth_url(request: &AuthorizationRequest) -> String {
    format!(
        "Visit this URL to authorize Dropbox Dash. After authorizing, copy the code and \
         call authenticate with it. The URL expires in 10 minutes.\n\n{}",
        request.url
    )
}

pub fn authenticated(identity: &AccountIdentity) -> String {
    let mut out = Lines::default();
    out.line("Successfully authenticated with Dropbox!");
    out.line("");
    out.field("👤", "Account", identity.display_name.as_deref());
    out.field("📧", "Email", identity.email.as_deref());
    if identity.display_name.is_none() && identity.email.is_none() {
        out.field("🔑", "Account ID", Some(identity.account_id.as_str()));
    }
    out.line("");
    out.line("You can now use all Dropbox tools.");
    out.finish()
}

pub fn search_results(query: &str, results: &[SearchResult]) -> String {
    let mut out = Lines::default();
    out.line(format!("Found {} results for '{query}':", results.len()));

    for (i, result) in results.iter().enumerate() {
        out.line("");
        out.line(format!("📄 Result {}", i + 1));
        match &result.body {
            ResultBody::Content(content) => {
                out.field("📝", "Title", content.title.as_deref());
                out.field("🔑", "UUID", Some(&result.uuid));
                out.field("📋", "Type", result.record_type.as_deref());
                out.field("🔗", "URL", content.url.as_deref());
                out.field("📝", "Preview", content.preview_text.as_deref());
                out.field(
                    "📄",
                    "Description",
                    content
                        .description
                        .as_deref()
                        .filter(|d| content.preview_text.as_deref() != Some(*d)),
                );
                let file_type = content.file_type_label.clone().or_else(|| {
                    content
                        .file_type
                        .filter(|t| *t != dash_api::FileType::Unknown)
                        .map(|t| t.to_string())
                });
                out.field("📁", "File Type", file_type);
                out.field("🔧", "MIME Type", content.mime_type.as_deref());
                out.field("🔌", "Source", content.source_name.as_deref());
                out.field("✍️", "Creator", content.creator.as_deref());
                out.field("🔄", "Last Modified By", content.last_modified_by.as_deref());
                out.field("📅", "Updated", Some(format_timestamp(content.updated_at)));
                out.field(
                    "📅",
                    "Source Updated",
                    content
                        .source_updated_at
                        .filter(|ts| Some(*ts) != content.updated_at)
                        .map(|ts| format_timestamp(Some(ts))),
                );
            }
            ResultBody::Person(person) => {
                out.field("🔑", "UUID", Some(&result.uuid));
                out.field("📋", "Type", result.record_type.as_deref());
                out.field("🔗", "URL", person.url.as_deref());
                out.field("👤", "Display Name", person.display_name.as_deref());
                out.field("📧", "Email", person.email.as_deref());
                out.field("🔌", "Source", person.source_name.as_deref());
            }
        }
        out.field(
            "⭐",
            "Relevance",
            result.relevance.filter(|r| *r > 0.0).map(|r| format!("{r:.2}")),
        );
        if let ResultBody::Content(content) = &result.body {
            out.field("🔗", "Source ID", content.source_id.as_deref());
        }
        out.line("—".repeat(DIVIDER_WIDTH));
    }

    out.finish()
}

pub fn details(uuid: &str, record: &DetailRecord) -> String {
    let mut out = Lines::default();
    out.line(format!("📄 File Details for UUID: {uuid}"));
    out.line("");
    out.line(format!(
        "📝 Title: {}",
        record.title.as_deref().unwrap_or("Untitled")
    ));
    out.field("🔗", "Link", record.link.as_deref());
    out.field("📅", "Updated", Some(format_timestamp(record.updated_at)));
    out.field(
        "📅",
        "Source Updated",
        record
            .source_updated_at
            .filter(|ts| Some(*ts) != record.updated_at)
            .map(|ts| format_timestamp(Some(ts))),
    );
    out.field("🔧", "MIME Type", record.mime_type.as_deref());
    out.field("🔌", "Source", record.source_name.as_deref());
    out.field("✍️", "Creator", record.creator.as_deref());
    out.field("🔄", "Last Modified By", record.last_modified_by.as_deref());

    if let Some(media) = &record.media {
        if let Some(video) = &media.video {
            let mut section = Lines::default();
            section.field(
                "⏱️",
                "Duration",
                video
                    .duration_ms
                    .map(|ms| format!("{:.2} seconds", ms as f64 / 1000.0)),
            );
            section.field("📐", "Dimensions", dimensions(video.width, video.height));
            out.section("🎞️ Video Metadata:", section);
        }
        if let Some(image) = &media.image {
            let mut section = Lines::default();
            section.field("📐", "Dimensions", dimensions(image.width, image.height));
            let camera = [image.camera_make.as_deref(), image.camera_model.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            section.field("📸", "Camera", Some(camera));
            section.field("👤", "Creator", image.creator.as_deref());
            section.field("📅", "Date Taken", image.date_taken.as_deref());
            out.section("📷 Image Metadata:", section);
        }
    }

    out.field("🖼️", "Thumbnail Available", record.thumbnail_mime_type.as_deref());

    if let Some(content) = &record.content {
        let mut section = Lines::default();
        section.field("🔧", "MIME Type", content.mime_type.as_deref());
        let text = if content.truncated {
            format!(
                "{}...\n[Content truncated - total length: {} characters]",
                content.text, content.total_chars
            )
        } else {
            content.text.clone()
        };
        section.field("📝", "Content", Some(text));
        out.section("📄 File Content:", section);
    }

    out.finish()
}

fn dimensions(width: Option<u64>, height: Option<u64>) -> Option<String> {
    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(format!("{w} x {h} pixels")),
        _ => None,
    }
}
