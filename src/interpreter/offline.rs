//! Keyword interpreter that needs no network.
//!
//! [`OfflineInterpreter`] understands the navigation vocabulary of a cooking
//! walkthrough and answers with the instruction text itself, so it drives the
//! same hands-free loop as the remote interpreter (instruction echoes arm the
//! auto-advance timer).  Anything it does not recognise gets a short help
//! message and keeps the current step.
//!
//! | Utterance                              | Next step              |
//! |----------------------------------------|------------------------|
//! | start, start cooking, begin            | 0                      |
//! | next, continue, done, okay next        | current + 1, or -1     |
//! | previous, back, go back                | current - 1 (min 0)    |
//! | repeat, again, say that again          | current                |
//! | first step, last step, step N          | that step              |
//! | where am I, which step                 | current                |
//! | stop, end, finish, quit                | -1                     |

use async_trait::async_trait;

use crate::interpreter::client::{
    InstructionInterpreter, InstructionRequest, InstructionResponse, InterpreterError,
    END_OF_SESSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Start,
    Next,
    Previous,
    Repeat,
    Goto(usize),
    Last,
    WhereAmI,
    Stop,
    Unknown,
}

/// Deterministic navigation interpreter.
#[derive(Debug, Default, Clone)]
pub struct OfflineInterpreter;

impl OfflineInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Callers guarantee a non-empty instruction list.
    fn answer(&self, request: &InstructionRequest) -> InstructionResponse {
        let total = request.instructions.len();
        let current = request.current_step.min(total.saturating_sub(1));
        let instruction = |i: usize| request.instructions[i].clone();

        match classify(&request.user_query) {
            Intent::Start => InstructionResponse::new(instruction(0), 0),
            Intent::Next => {
                if current + 1 < total {
                    InstructionResponse::new(instruction(current + 1), (current + 1) as i64)
                } else {
                    InstructionResponse::new(
                        format!(
                            "That was the last step. Enjoy your {}!",
                            request.recipe_title
                        ),
                        END_OF_SESSION,
                    )
                }
            }
            Intent::Previous => {
                let target = current.saturating_sub(1);
                InstructionResponse::new(instruction(target), target as i64)
            }
            Intent::Repeat => InstructionResponse::new(instruction(current), current as i64),
            Intent::Goto(n) if (1..=total).contains(&n) => {
                InstructionResponse::new(instruction(n - 1), (n - 1) as i64)
            }
            Intent::Goto(n) => InstructionResponse::new(
                format!("There is no step {n}. This recipe has {total} steps."),
                current as i64,
            ),
            Intent::Last => InstructionResponse::new(instruction(total - 1), (total - 1) as i64),
            Intent::WhereAmI => InstructionResponse::new(
                format!(
                    "You are on step {} of {}: {}",
                    current + 1,
                    total,
                    instruction(current)
                ),
                current as i64,
            ),
            Intent::Stop => InstructionResponse::new(
                "Ending the cooking session. Happy cooking!",
                END_OF_SESSION,
            ),
            Intent::Unknown => InstructionResponse::new(
                "You can say next, previous, repeat, go to step, or stop.",
                current as i64,
            ),
        }
    }
}

#[async_trait]
impl InstructionInterpreter for OfflineInterpreter {
    async fn interpret(
        &self,
        request: &InstructionRequest,
    ) -> Result<InstructionResponse, InterpreterError> {
        if request.instructions.is_empty() {
            return Err(InterpreterError::EmptyResponse);
        }
        Ok(self.answer(request))
    }
}

/// Lower-case, strip punctuation and collapse whitespace.
pub(crate) fn normalise(query: &str) -> String {
    query
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn classify(query: &str) -> Intent {
    let q = normalise(query);
    let words: Vec<&str> = q.split(' ').collect();
    let has = |w: &str| words.iter().any(|word| *word == w);

    if let Some(n) = step_number(&words) {
        return Intent::Goto(n);
    }

    if has("stop") || has("end") || has("finish") || has("quit") || has("exit") {
        Intent::Stop
    } else if has("start") || has("begin") {
        Intent::Start
    } else if has("previous") || has("back") {
        Intent::Previous
    } else if has("repeat") || has("again") {
        Intent::Repeat
    } else if has("first") {
        Intent::Goto(1)
    } else if has("last") || has("final") {
        Intent::Last
    } else if has("next") || has("continue") || has("done") || has("skip") {
        Intent::Next
    } else if q.contains("where am i") || q.contains("which step") || q.contains("what step") {
        Intent::WhereAmI
    } else {
        Intent::Unknown
    }
}

/// `"step 3"` / `"go to step 3"` → 3.
fn step_number(words: &[&str]) -> Option<usize> {
    words
        .windows(2)
        .find(|pair| pair[0] == "step")
        .and_then(|pair| pair[1].parse().ok())
}
