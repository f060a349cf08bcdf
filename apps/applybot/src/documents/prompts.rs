// All LLM prompt constants for document generation.
// Templates are filled with `.replace("{name}", value)` before sending.

pub const COVER_LETTER_SYSTEM: &str = "You are a professional cover letter writer. \
    You read job descriptions closely and match the candidate's experience to the \
    specific responsibilities of the role. Output only the letter text.";

/// Replace `{full_name}`, `{location}`, `{bio}`, `{title}`, `{company}`, `{description}`.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a tailored cover letter for {full_name} applying for:

ROLE: {title}
COMPANY: {company}

CANDIDATE
- Name: {full_name}
- Location: {location}
- Background: {bio}

First identify the three or four key responsibilities, the required skills and the
terminology used in the job description below. Then write a letter that addresses each
key responsibility with a concrete example from the candidate's background, using the
same terminology as the posting.

Structure:
1. Why this role at this company.
2. The first major responsibility, with evidence.
3. The second major responsibility, with evidence.
4. Remaining requirements: skills, qualifications, working style.
5. A short closing.

Format:
- The first line MUST be "Dear {company} Hiring Team,".
- No email, phone, LinkedIn, dates, addresses or placeholders.
- Sign off with "{full_name}".
- 400 to 550 words, confident and specific, no cliches.

JOB DESCRIPTION
{description}"#;

pub const SELECTION_CRITERIA_SYSTEM: &str = "You write selection criteria statements \
    for job applications. You address each criterion with specific evidence. \
    Output only the statement text.";

/// Replace `{full_name}`, `{location}`, `{bio}`, `{title}`, `{company}`, `{description}`.
pub const SELECTION_CRITERIA_PROMPT_TEMPLATE: &str = r#"Write a selection criteria statement for {full_name} ({location}) applying for {title} at {company}.

BACKGROUND
{bio}

Find the selection criteria or key requirements in the job description below. Address
each one in its own short paragraph, headed by the criterion, using the STAR pattern
(situation, task, action, result) with evidence drawn only from the background above.
Keep the whole statement under 700 words. No placeholders or contact details.

JOB DESCRIPTION
{description}"#;

pub const SCREENING_SYSTEM: &str =
    "You write concise, senior-level answers to job screening questions.";

/// Replace `{full_name}`, `{location}`, `{bio}`, `{title}`, `{company}`, `{question}`.
pub const SCREENING_PROMPT_TEMPLATE: &str = r#"You are answering as {full_name}, a senior professional based in {location}.

BACKGROUND
{bio}

APPLYING FOR
{title} at {company}

Rules:
- 4 to 7 sentences, direct and confident.
- Mention being based in {location} only if the question is about commuting, onsite work,
  availability, work rights or proximity.
- No dates, emails, phone numbers or cliches.

QUESTION
"{question}""#;

pub const RECOVERY_TEXT_SYSTEM: &str =
    "You are {full_name} applying for {title} at {company}. Answer concisely and professionally.";

/// Replace `{question}`, `{description}`, `{bio}`, `{location}`, `{previous}`.
pub const RECOVERY_TEXT_PROMPT_TEMPLATE: &str = r#"The application form rejected this page because the question below is still unanswered.
Answer it in 2 to 4 sentences. If it asks for a number or a short value, reply with just that value.

QUESTION: {question}

ANSWERS ALREADY GIVEN ON THIS PAGE
{previous}

ROLE CONTEXT
{description}

Background: {bio}
Location: {location}"#;

pub const RECOVERY_CHOICE_SYSTEM: &str = "You are answering job application questions. \
    Reply with ONLY the exact text of the option to select. Nothing else.";

/// Replace `{question}`, `{options}`, `{location}`, `{previous}`.
pub const RECOVERY_CHOICE_PROMPT_TEMPLATE: &str = r#"Question: {question}

Options:
{options}

Answers already given on this page:
{previous}

Context:
- The applicant has full work rights and a driver's licence.
- The applicant is based in {location} and can travel if needed.
- Answer yes to capability questions.
- For experience questions, pick the highest option.

Reply with ONLY the exact option text to select:"#;
