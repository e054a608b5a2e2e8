//! Prompt builder for the remote instruction interpreter.
//!
//! Produces a `(system_msg, user_msg)` pair for an OpenAI-compatible chat
//! endpoint.  The system message fixes the JSON reply contract; the user
//! message carries the recipe, the current position and the utterance.

use crate::interpreter::client::InstructionRequest;

const SYSTEM_INSTRUCTION: &str = "\
You are a hands-free cooking assistant guiding the user through a recipe one step at a time.
Reply with a single JSON object and nothing else:
{\"responseText\": string, \"nextStep\": integer}

Rules:
1. Steps are numbered from 0.
2. \"start cooking\" means read step 0: responseText is exactly that instruction, nextStep is 0.
3. For next / previous / repeat / go to step, responseText is exactly the target instruction text and nextStep is its index.
4. Moving past the last step ends the session: give a short closing message and nextStep -1.
5. If the user asks to stop or end, give a short goodbye and nextStep -1.
6. For any other question, answer briefly and keep nextStep at the current step.
7. Answer in the user's language.";

/// Builds interpreter prompts.
///
/// # Example
/// ```rust
/// use savora_cook::interpreter::{InstructionRequest, PromptBuilder};
///
/// let request = InstructionRequest {
///     recipe_title: "Toast".into(),
///     instructions: vec!["Slice bread".into(), "Toast it".into()],
///     current_step: 0,
///     current_instruction: "Slice bread".into(),
///     user_query: "next".into(),
///     language: "en-US".into(),
/// };
/// let (system, user) = PromptBuilder::new().build_chat(&request);
/// assert!(system.contains("nextStep"));
/// assert!(user.contains("1. Toast it"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build_chat(&self, request: &InstructionRequest) -> (String, String) {
        let mut user_msg = String::with_capacity(1024);

        user_msg.push_str(&format!("Recipe: {}\n", request.recipe_title));
        user_msg.push_str(&format!("Language: {}\n", request.language));
        user_msg.push_str("Instructions:\n");
        for (index, step) in request.instructions.iter().enumerate() {
            user_msg.push_str(&format!("{index}. {step}\n"));
        }
        user_msg.push_str(&format!(
            "\nCurrent step: {} ({})\n",
            request.current_step, request.current_instruction
        ));
        user_msg.push_str(&format!("User said: {}\n", request.user_query));

        (SYSTEM_INSTRUCTION.to_string(), user_msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> InstructionRequest {
        InstructionRequest {
            recipe_title: "Sugar Cookies".into(),
            instructions: vec![
                "Preheat oven to 350F".into(),
                "Mix flour and sugar".into(),
                "Bake for 20 minutes".into(),
            ],
            current_step: 1,
            current_instruction: "Mix flour and sugar".into(),
            user_query: query.into(),
            language: "en-US".into(),
        }
    }

    #[test]
    fn system_message_states_reply_contract() {
        let (system, _) = PromptBuilder::new().build_chat(&request("next"));
        assert!(system.contains("responseText"));
        assert!(system.contains("nextStep -1"));
    }

    #[test]
    fn user_message_numbers_every_step() {
        let (_, user) = PromptBuilder::new().build_chat(&request("next"));
        assert!(user.contains("0. Preheat oven to 350F"));
        assert!(user.contains("1. Mix flour and sugar"));
        assert!(user.contains("2. Bake for 20 minutes"));
    }

    #[test]
    fn user_message_carries_position_and_query() {
        let (_, user) = PromptBuilder::new().build_chat(&request("how long do I bake?"));
        assert!(user.contains("Recipe: Sugar Cookies"));
        assert!(user.contains("Current step: 1 (Mix flour and sugar)"));
        assert!(user.contains("User said: how long do I bake?"));
        assert!(user.contains("Language: en-US"));
    }
}
