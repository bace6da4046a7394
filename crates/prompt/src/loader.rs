//! Prompt loader: workspace overrides first, built-ins second.

use crate::builtin::{builtin_prompt, BUILTIN_IDS};
use crate::types::{PromptDefinition, PromptSource};
use knowhub_core::{AppError, AppResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One row of `knowhub prompts`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptListing {
    pub id: String,
    pub title: String,
    pub source: PromptSource,
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path
        .join(knowhub_core::config::STATE_DIR)
        .join("prompts")
}

/// Load a prompt definition by ID.
///
/// Looks for `<workspace>/.knowhub/prompts/<id>.yml` first and falls back to
/// the built-in definition with the same id.
///
/// # Example
/// ```no_run
/// use knowhub_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "answer.summary")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);
        let definition = read_prompt_file(&prompt_file)?;

        if definition.id != prompt_id {
            return Err(AppError::Prompt(format!(
                "Prompt file {:?} declares id '{}', expected '{}'",
                prompt_file, definition.id, prompt_id
            )));
        }

        tracing::info!("Using workspace prompt: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    builtin_prompt(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
}

fn read_prompt_file(prompt_file: &Path) -> AppResult<PromptDefinition> {
    let contents = std::fs::read_to_string(prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    Ok(definition)
}

/// List built-in prompts and workspace overrides.
///
/// An override replaces the built-in row with the same id; overrides with new
/// ids are listed after the built-ins, sorted by id.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<PromptListing>> {
    let mut listings: Vec<PromptListing> = BUILTIN_IDS
        .iter()
        .filter_map(|id| builtin_prompt(id))
        .map(|def| PromptListing {
            id: def.id,
            title: def.title,
            source: PromptSource::Builtin,
        })
        .collect();

    let dir = prompts_dir(workspace_path);
    if !dir.exists() {
        return Ok(listings);
    }

    let mut extra = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("yml") {
            continue;
        }

        let definition = read_prompt_file(path)?;
        let listing = PromptListing {
            id: definition.id,
            title: definition.title,
            source: PromptSource::Workspace,
        };

        match listings.iter_mut().find(|l| l.id == listing.id) {
            Some(existing) => *existing = listing,
            None => extra.push(listing),
        }
    }

    extra.sort_by(|a, b| a.id.cmp(&b.id));
    listings.extend(extra);

    Ok(listings)
}

/// Validate a prompt definition.
pub fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if def.generation.max_tokens == 0 {
        return Err(AppError::Prompt(format!(
            "Prompt {} must allow at least one token",
            def.id
        )));
    }

    if !(0.0..=2.0).contains(&def.generation.temperature) {
        return Err(AppError::Prompt(format!(
            "Prompt {} temperature {} is outside 0.0-2.0",
            def.id, def.generation.temperature
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{ANSWER_SPECIFIC, ANSWER_SUMMARY};
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, file_id: &str, body: &str) {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join(format!("{}.yml", file_id)), body).unwrap();
    }

    fn override_yaml(id: &str, max_tokens: u32) -> String {
        format!(
            r#"
id: {}
title: "Terse answers"
apiVersion: "1.0"
system: "Answer in five words."
template: "{{{{query}}}}"
generation:
  maxTokens: {}
  temperature: 0.0
"#,
            id, max_tokens
        )
    }

    #[test]
    fn test_builtin_when_no_override() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), ANSWER_SUMMARY).unwrap();
        assert_eq!(prompt.generation.max_tokens, 400);
    }

    #[test]
    fn test_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), ANSWER_SPECIFIC, &override_yaml(ANSWER_SPECIFIC, 40));

        let prompt = load_prompt(temp_dir.path(), ANSWER_SPECIFIC).unwrap();
        assert_eq!(prompt.system, "Answer in five words.");
        assert_eq!(prompt.generation.max_tokens, 40);
    }

    #[test]
    fn test_override_id_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), ANSWER_SPECIFIC, &override_yaml("answer.other", 40));

        let err = load_prompt(temp_dir.path(), ANSWER_SPECIFIC).unwrap_err();
        assert_eq!(err.kind(), "prompt");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), ANSWER_SPECIFIC, &override_yaml(ANSWER_SPECIFIC, 0));
        assert!(load_prompt(temp_dir.path(), ANSWER_SPECIFIC).is_err());

        write_override(temp_dir.path(), ANSWER_SUMMARY, "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), ANSWER_SUMMARY).is_err());
    }

    #[test]
    fn test_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_list_prompts_merges_overrides() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), ANSWER_SPECIFIC, &override_yaml(ANSWER_SPECIFIC, 40));
        write_override(temp_dir.path(), "answer.custom", &override_yaml("answer.custom", 60));

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts.len(), BUILTIN_IDS.len() + 1);

        let specific = prompts.iter().find(|p| p.id == ANSWER_SPECIFIC).unwrap();
        assert_eq!(specific.source, PromptSource::Workspace);

        let last = prompts.last().unwrap();
        assert_eq!(last.id, "answer.custom");
    }
}
