const LORE_DETECTIVE: &str = r#"You are a Lore Detective. Read the passage and map who is who and how they relate.

Find:
- characters, including ones only mentioned by name or title
- factions, houses, guilds or orders that characters belong to
- the relationships between any two of them

Answer with a single JSON object in exactly this shape:
{
  "nodes": [
    {"id": "Name as written", "description": "one sentence on who they are"}
  ],
  "edges": [
    {"source": "Name as written", "target": "Other name", "label": "ALLY"}
  ]
}

Rules:
- A node id is the name as it appears in the passage; use the fullest form
- Every edge endpoint must also be listed under "nodes"
- Labels are short uppercase phrases such as ALLY, ENEMY, MENTOR, SIBLING, PARENT, MEMBER OF, SERVES
- No markdown, no commentary, nothing outside the JSON object

Passage:
"#;

pub fn build_extraction_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(LORE_DETECTIVE.len() + text.len() + 16);
    prompt.push_str(LORE_DETECTIVE);
    prompt.push_str(text);
    prompt.push_str("\n\nJSON:");
    prompt
}

/// Ask the model to repair output that did not parse as JSON.
pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        "Your previous answer was not valid JSON:\n\n{invalid_json}\n\n\
         Return the same nodes and edges as one valid JSON object with keys \"nodes\" and \"edges\". \
         Raw JSON only, without code fences or explanations."
    )
}
