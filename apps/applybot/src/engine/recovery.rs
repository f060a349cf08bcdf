//! Validation recovery: one pass over whatever the form still reports as unanswered.

use tracing::{debug, info};

use super::attempt::snapshot;
use super::form_fill::{choices_for, has_question};
use super::{choose_control, fill_control};
use crate::browser::FormControl;
use crate::documents::answers::direct_answer;
use crate::documents::JobContext;
use crate::errors::EngineError;
use crate::models::attempt::ApplicationAttempt;
use crate::state::EngineState;

/// Re-reads the page and answers every still-empty control, asking the model with the
/// literal question and the answers already given. Returns how many controls were filled.
pub async fn recover(
    state: &EngineState,
    attempt: &mut ApplicationAttempt,
    description: &str,
) -> Result<usize, EngineError> {
    let controls = snapshot(state.browser.as_ref()).await?;
    let previous = answered_pairs(&controls);
    let targets = still_missing(&controls);
    info!(title = %attempt.title, missing = targets.len(), "Answering missing fields");

    let title = attempt.title.clone();
    let company = attempt.company.clone();
    let job = JobContext {
        title: &title,
        company: &company,
        description,
    };

    let mut filled = 0;
    for control in targets {
        if control.is_text() {
            let answer = match direct_answer(control, state.documents.profile()) {
                Some(answer) => Some(answer),
                None => {
                    state
                        .documents
                        .recovery_text(job, &control.question, &previous)
                        .await
                }
            };
            let Some(answer) = answer else {
                debug!(question = %control.question, "No answer for missing field");
                continue;
            };
            if fill_control(state, control, &answer).await? {
                attempt.answers.insert(control.question.clone(), answer);
                filled += 1;
            }
        } else {
            let picked = match state
                .documents
                .recovery_choice(&control.question, &control.options, &previous)
                .await
            {
                Some(index) => vec![index],
                None => choices_for(control, state.snapshot.expected_salary),
            };
            let mut any = false;
            for index in picked {
                any |= choose_control(state, control, index).await?;
            }
            if any {
                filled += 1;
            }
        }
    }
    Ok(filled)
}

/// Unanswered controls to work on: the required ones when the form marks any, otherwise
/// every unanswered control that carries a question.
fn still_missing(controls: &[FormControl]) -> Vec<&FormControl> {
    let missing: Vec<&FormControl> = controls.iter().filter(|c| !c.is_answered()).collect();
    let required: Vec<&FormControl> = missing.iter().copied().filter(|c| c.required).collect();
    if required.is_empty() {
        missing.into_iter().filter(|c| has_question(c)).collect()
    } else {
        required
    }
}

/// Question and current answer of every answered control, for model context.
fn answered_pairs(controls: &[FormControl]) -> Vec<(String, String)> {
    controls
        .iter()
        .filter(|c| c.is_answered() && !c.question.trim().is_empty())
        .map(|c| {
            let answer = if c.is_text() {
                c.value.clone().unwrap_or_default()
            } else {
                c.selected
                    .iter()
                    .filter_map(|&i| c.options.get(i).cloned())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            (c.question.clone(), answer)
        })
        .collect()
}
