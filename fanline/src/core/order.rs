//! Re-association of completion-order results with session order.

use crate::core::types::ValidationOutcome;

/// Arrange `received` outcomes in the order of `session_order`.
///
/// Completion order is discarded. Every id in `session_order` must have exactly
/// one outcome and no outcome may name an untracked id; violations are returned
/// as messages.
pub fn in_session_order(
    session_order: &[String],
    received: Vec<ValidationOutcome>,
) -> Result<Vec<ValidationOutcome>, Vec<String>> {
    let mut slots: Vec<Option<ValidationOutcome>> = vec![None; session_order.len()];
    let mut errors = Vec::new();

    for outcome in received {
        match session_order.iter().position(|id| *id == outcome.workspace) {
            Some(idx) if slots[idx].is_some() => {
                errors.push(format!("duplicate outcome for {}", outcome.workspace));
            }
            Some(idx) => slots[idx] = Some(outcome),
            None => errors.push(format!("outcome for untracked workspace {}", outcome.workspace)),
        }
    }

    let mut ordered = Vec::with_capacity(session_order.len());
    for (id, slot) in session_order.iter().zip(slots) {
        match slot {
            Some(outcome) => ordered.push(outcome),
            None => errors.push(format!("missing outcome for {id}")),
        }
    }

    if errors.is_empty() {
        Ok(ordered)
    } else {
        Err(errors)
    }
}
