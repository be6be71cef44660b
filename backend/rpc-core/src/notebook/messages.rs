//! Typed notebook messages and their positional schemas.
//!
//! Layouts (index: field):
//!
//! ```text
//! Project  0: title  1: [Source]  2: project_id  3: emoji
//! Source   0: [id]   1: title     2: metadata    3: settings
//! metadata 1: word_count
//! settings 1: status
//! ```

use crate::decoder::PositionalMessage;

use models::{EnumTable, EnumValue, FieldValue, Record, ScalarType, Schema};

use std::sync::{Arc, OnceLock};

// ============================================
// SCHEMAS
// ============================================

static SOURCE_STATUS_TABLE: OnceLock<Arc<EnumTable>> = OnceLock::new();
static SOURCE_SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
static PROJECT_SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
static PROJECT_LIST_SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
static NOTE_LIST_SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
static SHARE_AUDIO_SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();

pub fn source_status_table() -> Arc<EnumTable> {
    SOURCE_STATUS_TABLE
        .get_or_init(|| {
            Arc::new(EnumTable::new(
                "SourceStatus",
                [
                    (0, "SOURCE_STATUS_UNSPECIFIED"),
                    (1, "SOURCE_STATUS_ENABLED"),
                    (2, "SOURCE_STATUS_DISABLED"),
                    (3, "SOURCE_STATUS_ERROR"),
                ],
            ))
        })
        .clone()
}

pub fn source_schema() -> Arc<Schema> {
    SOURCE_SCHEMA
        .get_or_init(|| {
            let source_id = Schema::builder("SourceId")
                .scalar("id", 0, ScalarType::String)
                .build()
                .expect("valid SourceId schema");
            let metadata = Schema::builder("SourceMetadata")
                .scalar("word_count", 1, ScalarType::Int)
                .build()
                .expect("valid SourceMetadata schema");
            let settings = Schema::builder("SourceSettings")
                .enumeration("status", 1, source_status_table())
                .build()
                .expect("valid SourceSettings schema");

            Arc::new(
                Schema::builder("Source")
                    .message("source_id", 0, Arc::new(source_id))
                    .scalar("title", 1, ScalarType::String)
                    .message("metadata", 2, Arc::new(metadata))
                    .message("settings", 3, Arc::new(settings))
                    .build()
                    .expect("valid Source schema"),
            )
        })
        .clone()
}

pub fn project_schema() -> Arc<Schema> {
    PROJECT_SCHEMA
        .get_or_init(|| {
            Arc::new(
                Schema::builder("Project")
                    .scalar("title", 0, ScalarType::String)
                    .repeated_message("sources", 1, source_schema())
                    .scalar("project_id", 2, ScalarType::String)
                    .scalar("emoji", 3, ScalarType::String)
                    .build()
                    .expect("valid Project schema"),
            )
        })
        .clone()
}

pub fn project_list_schema() -> Arc<Schema> {
    PROJECT_LIST_SCHEMA
        .get_or_init(|| {
            Arc::new(
                Schema::builder("ListRecentlyViewedProjectsResponse")
                    .repeated_message("projects", 0, project_schema())
                    .build()
                    .expect("valid project list schema"),
            )
        })
        .clone()
}

pub fn note_list_schema() -> Arc<Schema> {
    NOTE_LIST_SCHEMA
        .get_or_init(|| {
            Arc::new(
                Schema::builder("GetNotesResponse")
                    .repeated_message("notes", 0, source_schema())
                    .build()
                    .expect("valid note list schema"),
            )
        })
        .clone()
}

pub fn share_audio_schema() -> Arc<Schema> {
    SHARE_AUDIO_SCHEMA
        .get_or_init(|| {
            let share = Schema::builder("AudioShare")
                .scalar("url", 0, ScalarType::String)
                .scalar("id", 1, ScalarType::String)
                .build()
                .expect("valid AudioShare schema");
            Arc::new(
                Schema::builder("ShareAudioResponse")
                    .message("share", 0, Arc::new(share))
                    .build()
                    .expect("valid ShareAudioResponse schema"),
            )
        })
        .clone()
}

// ============================================
// MESSAGES
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceStatus {
    #[default]
    Unspecified,
    Enabled,
    Disabled,
    Error,
    /// A number this client does not know yet.
    Unknown(i64),
}

impl From<&EnumValue> for SourceStatus {
    fn from(value: &EnumValue) -> Self {
        match value.number() {
            0 => SourceStatus::Unspecified,
            1 => SourceStatus::Enabled,
            2 => SourceStatus::Disabled,
            3 => SourceStatus::Error,
            other => SourceStatus::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub source_id: String,
    pub title: String,
    pub word_count: i64,
    pub status: SourceStatus,
}

/// Notes share the source layout.
pub type Note = Source;

impl PositionalMessage for Source {
    fn schema() -> Arc<Schema> {
        source_schema()
    }

    fn from_record(record: Record) -> Self {
        Self {
            source_id: record
                .message("source_id")
                .and_then(|id| id.str("id"))
                .unwrap_or_default()
                .to_string(),
            title: record.str("title").unwrap_or_default().to_string(),
            word_count: record
                .message("metadata")
                .and_then(|metadata| metadata.i64("word_count"))
                .unwrap_or_default(),
            status: record
                .message("settings")
                .and_then(|settings| settings.enum_value("status"))
                .map(SourceStatus::from)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Project {
    pub title: String,
    pub sources: Vec<Source>,
    pub project_id: String,
    pub emoji: String,
}

impl PositionalMessage for Project {
    fn schema() -> Arc<Schema> {
        project_schema()
    }

    fn from_record(mut record: Record) -> Self {
        Self {
            sources: take_messages(&mut record, "sources"),
            title: record.str("title").unwrap_or_default().to_string(),
            project_id: record.str("project_id").unwrap_or_default().to_string(),
            emoji: record.str("emoji").unwrap_or_default().to_string(),
        }
    }
}

/// Payload of the list call: a single repeated `Project` at index 0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectList {
    pub projects: Vec<Project>,
}

impl PositionalMessage for ProjectList {
    fn schema() -> Arc<Schema> {
        project_list_schema()
    }

    fn from_record(mut record: Record) -> Self {
        Self {
            projects: take_messages(&mut record, "projects"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoteList {
    pub notes: Vec<Note>,
}

impl PositionalMessage for NoteList {
    fn schema() -> Arc<Schema> {
        note_list_schema()
    }

    fn from_record(mut record: Record) -> Self {
        Self {
            notes: take_messages(&mut record, "notes"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOption {
    Private = 0,
    Public = 1,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShareAudioResult {
    pub share_url: String,
    pub share_id: String,
    pub is_public: bool,
}

impl ShareAudioResult {
    pub(crate) fn from_record(record: &Record, option: ShareOption) -> Self {
        let share = record.message("share");
        Self {
            share_url: share
                .and_then(|share| share.str("url"))
                .unwrap_or_default()
                .to_string(),
            share_id: share
                .and_then(|share| share.str("id"))
                .unwrap_or_default()
                .to_string(),
            is_public: option == ShareOption::Public,
        }
    }
}

fn take_messages<T: PositionalMessage>(record: &mut Record, name: &str) -> Vec<T> {
    match record.take(name) {
        Some(FieldValue::Messages(records)) => records.into_iter().map(T::from_record).collect(),
        _ => Vec::new(),
    }
}
