use super::GenerationAction;

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI writing assistant embedded in a document editor. \
Your output should be direct text content suitable for insertion into a document. \
Do not wrap in markdown code blocks unless requested. \
Do not include conversational filler like 'Here is the summary:'.";

type PromptFn = fn(&str, Option<&str>) -> String;

const PROMPTS: [(GenerationAction, PromptFn); 5] = [
    (GenerationAction::Summarize, summarize),
    (GenerationAction::FixSpelling, fix_spelling),
    (GenerationAction::ImproveWriting, improve_writing),
    (GenerationAction::ContinueWriting, continue_writing),
    (GenerationAction::GenerateFromPrompt, from_prompt),
];

pub fn build_prompt(action: GenerationAction, context: &str, instruction: Option<&str>) -> String {
    let build = PROMPTS
        .iter()
        .find(|(kind, _)| *kind == action)
        .map(|(_, build)| *build)
        .unwrap_or(from_prompt);
    build(context, instruction)
}

fn summarize(context: &str, _: Option<&str>) -> String {
    format!("Summarize the following text concisely:\n\n{context}")
}

fn fix_spelling(context: &str, _: Option<&str>) -> String {
    format!(
        "Fix spelling and grammar in the following text, maintaining the original tone:\n\n{context}"
    )
}

fn improve_writing(context: &str, _: Option<&str>) -> String {
    format!(
        "Rewrite the following text to be more clear, professional, and concise:\n\n{context}"
    )
}

fn continue_writing(context: &str, _: Option<&str>) -> String {
    format!("Continue writing based on the context below. Keep the flow natural:\n\n{context}")
}

fn from_prompt(context: &str, instruction: Option<&str>) -> String {
    let mut prompt = instruction.unwrap_or_default().to_string();
    if !context.is_empty() {
        prompt.push_str("\n\nContext to consider:\n");
        prompt.push_str(context);
    }
    prompt
}

/// Structured dashboard request: asks for JSON matching [`super::Insights`].
pub fn insights_prompt(context: &str) -> String {
    format!(
        "Analyze the following notes and respond with a JSON object of this shape:\n\
{{\"metrics\": {{\"projectHealth\": number 0-100, \"completedTasks\": number, \"totalTasks\": number, \
\"sentiment\": \"Positive\" | \"Neutral\" | \"Critical\"}}, \
\"topics\": [{{\"topic\": string, \"count\": number}}], \
\"actionItems\": [{{\"id\": string, \"task\": string, \"assignee\": string, \
\"priority\": \"High\" | \"Medium\" | \"Low\", \"status\": \"To Do\" | \"In Progress\" | \"Done\"}}]}}\n\n\
Notes:\n{context}"
    )
}

#[cfg(test)]
mod tests {
    use super::{build_prompt, insights_prompt, PROMPTS};
    use crate::generation::GenerationAction;

    #[test]
    fn every_action_has_a_prompt() {
        for action in GenerationAction::ALL {
            assert!(PROMPTS.iter().any(|(kind, _)| *kind == action), "{action:?}");
        }
    }

    #[test]
    fn editing_actions_wrap_context() {
        let prompt = build_prompt(GenerationAction::FixSpelling, "teh cat", None);
        assert!(prompt.starts_with("Fix spelling and grammar"));
        assert!(prompt.ends_with("\n\nteh cat"));

        let prompt = build_prompt(GenerationAction::ContinueWriting, "Once", Some("ignored"));
        assert!(!prompt.contains("ignored"));
    }

    #[test]
    fn insights_prompt_names_every_dashboard_field() {
        let prompt = insights_prompt("Ship on Friday");
        for field in ["projectHealth", "completedTasks", "sentiment", "topics", "actionItems", "\"In Progress\""] {
            assert!(prompt.contains(field), "{field}");
        }
        assert!(prompt.ends_with("Notes:\nShip on Friday"));
    }

    #[test]
    fn free_prompt_appends_context_when_present() {
        assert_eq!(
            build_prompt(GenerationAction::GenerateFromPrompt, "", Some("Write a haiku")),
            "Write a haiku"
        );
        assert_eq!(
            build_prompt(GenerationAction::GenerateFromPrompt, "notes", Some("Outline")),
            "Outline\n\nContext to consider:\nnotes"
        );
    }
}
