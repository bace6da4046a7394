//! Prompts shipped with the binary.
//!
//! Answer prompts receive `{{query}}` and `{{context}}`; the expansion prompt
//! receives `{{query}}` only.

use crate::types::{GenerationSettings, PromptDefinition};

pub const ANSWER_CALCULATION: &str = "answer.calculation";
pub const ANSWER_SPECIFIC: &str = "answer.specific";
pub const ANSWER_LIST: &str = "answer.list";
pub const ANSWER_SUMMARY: &str = "answer.summary";
pub const QUERY_EXPAND: &str = "query.expand";

/// Every built-in prompt id, in display order.
pub const BUILTIN_IDS: [&str; 5] = [
    ANSWER_CALCULATION,
    ANSWER_SPECIFIC,
    ANSWER_LIST,
    ANSWER_SUMMARY,
    QUERY_EXPAND,
];

const CALCULATION_SYSTEM: &str = r#"You are a highly intelligent financial and data analysis assistant with strong mathematical capabilities.

CALCULATION RULES:
- Extract all relevant numbers from the documents
- Perform accurate calculations (addition, subtraction, multiplication, division, percentages)
- Show your work: explain which numbers you used and how you calculated
- Format numbers clearly with currency symbols or units when appropriate
- If data is missing, clearly state what's needed

ANSWER FORMAT:
**Answer:** [Clear final result with units/currency]

**Calculation:**
- Found: [list the numbers and their sources]
- Formula: [show the calculation]
- Result: [final answer]

**Source:** *[document name]*

Be precise and accurate. Always double-check your math."#;

const SPECIFIC_SYSTEM: &str = r#"You are a precise information extraction assistant. Answer with ONLY the specific information requested.

CRITICAL RULES:
- Be extremely concise and direct
- Answer in 1-2 sentences maximum for specific queries
- Use **bold** for the key answer
- No unnecessary details or summaries

**[Answer]** from *[document]*"#;

const LIST_SYSTEM: &str = r#"You are a knowledgeable assistant providing clear, structured answers.

FORMATTING RULES:
- Use **bold** for key information
- Use one bullet point per item
- Include every matching item found in the documents
- Be concise but complete

**Items:**
• Item with **emphasis**

**Source:** *[document name]*"#;

const SUMMARY_SYSTEM: &str = r#"You are a knowledgeable assistant providing clear, structured answers.

FORMATTING RULES:
- Use **bold** for key information
- Use bullet points for lists
- Be concise but complete

**Summary:** [1-2 sentence overview]

**Key Points:**
• Point with **emphasis**

**Source:** *[document name]*"#;

const EXPAND_SYSTEM: &str = r#"You are a query expansion assistant. Given a search query, expand it to include synonyms and related terms that would help find relevant documents. Keep it concise (2-3 sentences max).

Example:
Input: "highest profit"
Output: "highest profit revenue earnings income financial performance top-performing best revenue-generating"

Input: "customer complaints"
Output: "customer complaints feedback issues concerns problems customer service negative reviews""#;

fn answer_template(instruction: &str) -> String {
    format!(
        "QUESTION: {{{{query}}}}\n\nDOCUMENTS:\n{{{{context}}}}\n\n{}",
        instruction
    )
}

fn definition(
    id: &str,
    title: &str,
    system: &str,
    template: String,
    max_tokens: u32,
    temperature: f32,
) -> PromptDefinition {
    PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        created_by: "knowhub".to_string(),
        system: system.to_string(),
        template,
        generation: GenerationSettings {
            max_tokens,
            temperature,
        },
    }
}

/// Look up a built-in prompt by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let def = match id {
        ANSWER_CALCULATION => definition(
            id,
            "Calculation answer",
            CALCULATION_SYSTEM,
            answer_template(
                "Extract relevant numbers, perform the calculation, and provide a clear answer with your working.",
            ),
            500,
            0.1,
        ),
        ANSWER_SPECIFIC => definition(
            id,
            "Specific fact answer",
            SPECIFIC_SYSTEM,
            answer_template("Answer directly and concisely."),
            150,
            0.3,
        ),
        ANSWER_LIST => definition(
            id,
            "List answer",
            LIST_SYSTEM,
            answer_template("Provide a clear, well-structured answer."),
            400,
            0.3,
        ),
        ANSWER_SUMMARY => definition(
            id,
            "Summary answer",
            SUMMARY_SYSTEM,
            answer_template("Provide a clear, well-structured answer."),
            400,
            0.3,
        ),
        QUERY_EXPAND => definition(
            id,
            "Query expansion",
            EXPAND_SYSTEM,
            "Expand this search query: \"{{query}}\"".to_string(),
            100,
            0.3,
        ),
        _ => return None,
    };
    Some(def)
}
