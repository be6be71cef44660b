//! Notebook service client.
//!
//! Thin: each operation builds a [`Call`], executes it through the
//! [`BatchClient`] and maps the decoded record onto a typed message.

pub mod messages;
pub mod rpc_ids;

pub use messages::{
    Note, NoteList, Project, ProjectList, ShareAudioResult, ShareOption, Source, SourceStatus,
};

use crate::batch_client::BatchClient;
use crate::decoder::json_type_name;
use crate::error::{CoreError, DecodeError, RpcError};

use common::ErrorLocation;
use models::{ArgValue, Call, ModelError};

use std::panic::Location;

use log::info;
use serde_json::Value;
use url::Url;

/// Source type tag for pasted text.
const TEXT_SOURCE_TYPE: i64 = 2;
/// Source type tag for a YouTube video.
const YOUTUBE_SOURCE_TYPE: i64 = 9;
/// Note type list sent with a new note.
const NOTE_TYPE: i64 = 1;

pub struct NotebookClient {
    client: BatchClient,
}

impl NotebookClient {
    pub fn new(client: BatchClient) -> Self {
        Self { client }
    }

    pub fn batch_client(&self) -> &BatchClient {
        &self.client
    }

    pub async fn list_recently_viewed_projects(&self) -> Result<Vec<Project>, CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::LIST_RECENTLY_VIEWED_PROJECTS)
            .with_arg(ArgValue::Null)
            .with_arg(ArgValue::Int(1))
            .build()?;
        let list: ProjectList = self.client.execute_typed(&call).await?;
        Ok(list.projects)
    }

    pub async fn create_project(&self, title: &str, emoji: &str) -> Result<Project, CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::CREATE_PROJECT)
            .with_arg(title)
            .with_arg(emoji)
            .build()?;
        let project: Project = self.client.execute_typed(&call).await?;
        info!("Created project {}", project.project_id);
        Ok(project)
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project, CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::GET_PROJECT)
            .with_arg(project_id)
            .with_scope_key(project_id)
            .build()?;
        Ok(self.client.execute_typed(&call).await?)
    }

    pub async fn delete_projects(&self, project_ids: &[String]) -> Result<(), CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::DELETE_PROJECTS)
            .with_arg(ArgValue::list(project_ids))
            .build()?;
        self.client.execute_raw(&call).await?;
        Ok(())
    }

    /// Add pasted text as a source; returns the new source id.
    pub async fn add_source_from_text(
        &self,
        project_id: &str,
        content: &str,
        title: &str,
    ) -> Result<String, CoreError> {
        let source = ArgValue::list([
            ArgValue::Null,
            ArgValue::list([title, content]),
            ArgValue::Null,
            ArgValue::Int(TEXT_SOURCE_TYPE),
        ]);
        self.add_source(project_id, source).await
    }

    /// Add a web page or YouTube video as a source; returns the new source id.
    pub async fn add_source_from_url(&self, project_id: &str, url: &str) -> Result<String, CoreError> {
        let source = if is_youtube_url(url) {
            let video_id = extract_youtube_video_id(url)?;
            ArgValue::list([
                ArgValue::Null,
                ArgValue::Null,
                ArgValue::Str(video_id),
                ArgValue::Null,
                ArgValue::Int(YOUTUBE_SOURCE_TYPE),
            ])
        } else {
            ArgValue::list([ArgValue::Null, ArgValue::Null, ArgValue::list([url])])
        };
        self.add_source(project_id, source).await
    }

    async fn add_source(&self, project_id: &str, source: ArgValue) -> Result<String, CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::ADD_SOURCES)
            .with_arg(ArgValue::list([source]))
            .with_arg(project_id)
            .with_scope_key(project_id)
            .build()?;
        let raw = self.client.execute_raw(&call).await?;
        let source_id = extract_source_id(&raw).map_err(RpcError::from)?;
        info!("Added source {source_id} to project {project_id}");
        Ok(source_id)
    }

    pub async fn delete_sources(
        &self,
        project_id: &str,
        source_ids: &[String],
    ) -> Result<(), CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::DELETE_SOURCES)
            .with_arg(nested_id_list(source_ids))
            .with_scope_key(project_id)
            .build()?;
        self.client.execute_raw(&call).await?;
        Ok(())
    }

    pub async fn create_note(
        &self,
        project_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Note, CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::CREATE_NOTE)
            .with_args(vec![
                project_id.into(),
                content.into(),
                ArgValue::list([NOTE_TYPE]),
                ArgValue::Null,
                title.into(),
            ])
            .with_scope_key(project_id)
            .build()?;
        Ok(self.client.execute_typed(&call).await?)
    }

    pub async fn get_notes(&self, project_id: &str) -> Result<Vec<Note>, CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::GET_NOTES)
            .with_arg(project_id)
            .with_scope_key(project_id)
            .build()?;
        let list: NoteList = self.client.execute_typed(&call).await?;
        Ok(list.notes)
    }

    pub async fn delete_notes(&self, project_id: &str, note_ids: &[String]) -> Result<(), CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::DELETE_NOTES)
            .with_arg(nested_id_list(note_ids))
            .with_scope_key(project_id)
            .build()?;
        self.client.execute_raw(&call).await?;
        Ok(())
    }

    pub async fn share_audio(
        &self,
        project_id: &str,
        option: ShareOption,
    ) -> Result<ShareAudioResult, CoreError> {
        let call = Call::builder()
            .with_id(rpc_ids::SHARE_AUDIO)
            .with_arg(ArgValue::list([option as i64]))
            .with_arg(project_id)
            .with_scope_key(project_id)
            .build()?;
        let record = self
            .client
            .execute(&call, &messages::share_audio_schema())
            .await?;
        Ok(ShareAudioResult::from_record(&record, option))
    }
}

/// `[[[ids]]]`, the shape the delete calls expect.
fn nested_id_list(ids: &[String]) -> ArgValue {
    ArgValue::list([ArgValue::list([ArgValue::list(ids)])])
}

/// Locate the new source id in an add-source payload.
///
/// The id sits at the head of a variable number of nested arrays
/// (`[[[["id", ...]]]]`, `[[["id", ...]]]`, ...); descend through first
/// elements until a string turns up.
pub fn extract_source_id(raw: &Value) -> Result<String, DecodeError> {
    let mut current = raw;
    let mut path = String::from("$");
    loop {
        match current {
            Value::String(id) if path != "$" => return Ok(id.clone()),
            Value::Array(items) if !items.is_empty() => {
                current = &items[0];
                path.push_str("[0]");
            }
            other => {
                return Err(DecodeError::SchemaMismatch {
                    schema: String::from("AddSourcesResponse"),
                    field: Some(String::from("source_id")),
                    index: Some(0),
                    path,
                    expected: String::from("nested array headed by a string source id"),
                    found: json_type_name(other),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
    }
}

pub fn is_youtube_url(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// Video id from `youtu.be/<id>` or `youtube.com/watch?v=<id>`.
pub fn extract_youtube_video_id(url: &str) -> Result<String, ModelError> {
    let parsed = Url::parse(url).map_err(|e| unsupported_youtube_url(url, &e.to_string()))?;
    let host = parsed.host_str().unwrap_or_default();

    let video_id = if host == "youtu.be" {
        parsed.path().trim_start_matches('/').to_string()
    } else if host.ends_with("youtube.com") && parsed.path() == "/watch" {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default()
    } else {
        return Err(unsupported_youtube_url(
            url,
            "expected youtu.be/<id> or youtube.com/watch?v=<id>",
        ));
    };

    if video_id.is_empty() {
        return Err(unsupported_youtube_url(url, "missing video id"));
    }
    Ok(video_id)
}

#[track_caller]
fn unsupported_youtube_url(url: &str, reason: &str) -> ModelError {
    ModelError::Validation {
        message: format!("Unsupported YouTube URL {url:?}: {reason}"),
        location: ErrorLocation::from(Location::caller()),
    }
}
