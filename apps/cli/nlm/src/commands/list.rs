use crate::error::NlmError;

use rpc_core::notebook::{NotebookClient, Project};

use log::debug;

pub async fn run(notebook: &NotebookClient) -> Result<String, NlmError> {
    let projects = notebook.list_recently_viewed_projects().await?;
    debug!("Listed {} notebooks", projects.len());
    Ok(format_projects(&projects))
}

/// One line per notebook: id, emoji, title, source count.
pub fn format_projects(projects: &[Project]) -> String {
    if projects.is_empty() {
        return String::from("No notebooks found.");
    }

    let id_width = projects
        .iter()
        .map(|project| project.project_id.len())
        .max()
        .unwrap_or_default();

    projects
        .iter()
        .map(|project| {
            let emoji = if project.emoji.is_empty() { "-" } else { project.emoji.as_str() };
            format!(
                "{id:<id_width$}  {emoji}  {title} ({sources} sources)",
                id = project.project_id,
                title = project.title,
                sources = project.sources.len(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
