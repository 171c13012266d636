//! Grounded prompt assembly.

use healthrag_core::RagSettings;
use healthrag_retrieve::RetrievedPassage;

/// `{language}` is replaced with the configured response language.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
You are a caring, knowledgeable AI health assistant.
Your task is to answer the user's question BASED ON the context provided below.

IMPORTANT RULES:
1. Answer ONLY from facts found in the context. Do not make anything up.
2. If the answer is not in the context, say so honestly: you could not find specific information about it in your knowledge base.
3. Include a disclaimer that you are not a substitute for a doctor.
4. Respond in {language}, in a warm, plain register that is easy to understand.
5. Make use of every supplied source where it is relevant.";

/// The prompt for one question plus the sources it cites, in passage order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPrompt {
    pub user_prompt: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system_instruction: String,
}

impl PromptTemplate {
    pub fn new(instruction_template: &str, language: &str) -> Self {
        Self {
            system_instruction: instruction_template.replace("{language}", language),
        }
    }

    pub fn from_settings(settings: &RagSettings) -> Self {
        let template = settings
            .system_instruction
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_INSTRUCTION);
        Self::new(template, &settings.response_language)
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Label each passage, collect its source, and wrap context + query.
    pub fn build(&self, passages: &[RetrievedPassage], search_query: &str) -> BuiltPrompt {
        let mut context = String::new();
        let mut sources = Vec::with_capacity(passages.len());

        for (i, passage) in passages.iter().enumerate() {
            context.push_str(&format!(
                "SOURCE {} ({}):\n{}\n\n",
                i + 1,
                passage.section_title,
                passage.text.trim()
            ));
            sources.push(passage.source_url.clone());
        }

        let user_prompt = format!(
            "CONTEXT:\n{}\nUSER QUESTION:\n{}",
            context,
            search_query.trim()
        );

        BuiltPrompt {
            user_prompt,
            sources,
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(
            DEFAULT_SYSTEM_INSTRUCTION,
            healthrag_core::config::DEFAULT_RESPONSE_LANGUAGE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(text: &str, url: &str, title: &str) -> RetrievedPassage {
        RetrievedPassage::new(text, url, title)
    }

    #[test]
    fn test_build_labels_passages() {
        let template = PromptTemplate::default();
        let built = template.build(
            &[
                passage("Paracetamol lowers fever.", "A", "Fever"),
                passage("Drink plenty of water.", "A", "Hydration"),
                passage("See a doctor after 3 days.", "B", "Warning signs"),
            ],
            "What medicine helps a fever?",
        );

        assert!(built.user_prompt.contains("SOURCE 1 (Fever):\nParacetamol lowers fever."));
        assert!(built.user_prompt.contains("SOURCE 3 (Warning signs):"));
        assert!(built.user_prompt.ends_with("USER QUESTION:\nWhat medicine helps a fever?"));
        assert_eq!(built.sources, vec!["A", "A", "B"]);
    }

    #[test]
    fn test_language_is_configurable() {
        let template = PromptTemplate::new(DEFAULT_SYSTEM_INSTRUCTION, "Indonesian");
        assert!(template.system_instruction().contains("Respond in Indonesian"));
        assert!(!template.system_instruction().contains("{language}"));
    }

    #[test]
    fn test_default_instruction_rules() {
        let text = PromptTemplate::default().system_instruction().to_lowercase();
        assert!(text.contains("only from facts"));
        assert!(text.contains("not a substitute for a doctor"));
        assert!(text.contains("every supplied source"));
    }

    #[test]
    fn test_custom_instruction_from_settings() {
        let settings = RagSettings {
            system_instruction: Some("Answer briefly in {language}.".into()),
            response_language: "Javanese".into(),
            ..RagSettings::default()
        };
        let template = PromptTemplate::from_settings(&settings);
        assert_eq!(template.system_instruction(), "Answer briefly in Javanese.");
    }
}
