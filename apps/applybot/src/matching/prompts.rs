// Prompt constants for the strict relevance check.

/// System prompt for the strict relevance check.
pub const RELEVANCE_SYSTEM: &str = "You are a job matching assistant. \
    Be strict about role relevance. \
    You MUST respond with valid JSON only. \
    Do NOT use markdown code fences.";

/// Replace `{targets}`, `{related}`, `{title}` and `{description}` before sending.
pub const RELEVANCE_PROMPT_TEMPLATE: &str = r#"Decide whether this job is a good match for someone looking for: {targets}

Related titles that also count: {related}

JOB TITLE: {title}

JOB DESCRIPTION (excerpt):
{description}

Rules:
- If the job is primarily sales, customer service, retail or call centre work, reject it
  unless those are the target roles.
- If the job matches the target roles or the related titles, accept it.
- Be strict: "Project Manager" should NOT apply to "Sales Manager".

Return a JSON object with this EXACT schema:
{"accept": true, "reason": "at most 15 words"}"#;
