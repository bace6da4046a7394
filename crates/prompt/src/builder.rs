//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use knowhub_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the system prompt and the user template are rendered with
/// Handlebars. HTML escaping is disabled since document excerpts are passed
/// through verbatim.
///
/// # Example
/// ```no_run
/// use knowhub_prompt::{build_prompt, load_prompt};
/// use std::collections::HashMap;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_prompt(Path::new("."), "answer.summary")?;
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What is in the Q3 report?".to_string());
/// vars.insert("context".to_string(), "=== q3.txt ===\nRevenue grew.\n\n".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let system = render_template(&definition.system, &variables)?;
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.generation,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
