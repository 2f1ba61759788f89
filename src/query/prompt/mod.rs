
use serde::{Deserialize, Serialize};

/// Wording of the grounded prompt sent to the generation model.
///
/// Sections are rendered in a fixed order: persona, instructions, the
/// caller's extra context, the retrieved documents and the question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    pub persona: String,
    pub instructions_heading: String,
    pub instructions: Vec<String>,
    pub extra_context_heading: String,
    /// Used when the caller supplies no extra context
    pub no_context_placeholder: String,
    pub documents_heading: String,
    pub question_heading: String,
    pub answer_heading: String,
}

impl Default for PromptTemplate {
    #[inline]
    fn default() -> Self {
        Self {
            persona: "Você é um especialista em cinema com vasto conhecimento sobre filmes e séries."
                .to_string(),
            instructions_heading: "**INSTRUÇÕES IMPORTANTES:**".to_string(),
            instructions: [
                "Use APENAS as informações dos filmes fornecidas abaixo",
                "Seja entusiasta, detalhista e persuasivo nas recomendações",
                "Explique POR QUE cada filme é interessante",
                "Destaque aspectos únicos de cada título",
                "Use um tom amigável e conversacional",
                "Se a pergunta for sobre recomendação, ordene do melhor para o menos indicado",
                "Se a pergunta for sobre um filme específico, dê análises profundas",
            ]
            .iter()
            .map(|line| (*line).to_string())
            .collect(),
            extra_context_heading: "**CONTEXTO ADICIONAL DO USUÁRIO:**".to_string(),
            no_context_placeholder: "Nenhum contexto adicional fornecido.".to_string(),
            documents_heading: "**FILMES DISPONÍVEIS PARA ANÁLISE:**".to_string(),
            question_heading: "**PERGUNTA DO USUÁRIO:**".to_string(),
            answer_heading: "**SUA RESPOSTA (seja detalhada, entusiasmada e útil):**".to_string(),
        }
    }
}

impl PromptTemplate {
    /// Assemble the final prompt. Blank `extra_context` is replaced by the
    /// placeholder.
    #[inline]
    pub fn render(&self, question: &str, extra_context: &str, context: &str) -> String {
        let instructions = self
            .instructions
            .iter()
            .map(|line| format!("- {line}"))
            .collect::<Vec<_>>()
            .join("\n");

        let extra = if extra_context.trim().is_empty() {
            self.no_context_placeholder.as_str()
        } else {
            extra_context
        };

        [
            self.persona.clone(),
            format!("{}\n{}", self.instructions_heading, instructions),
            format!("{}\n{}", self.extra_context_heading, extra),
            format!("{}\n{}", self.documents_heading, context),
            format!("{}\n{}", self.question_heading, question),
            self.answer_heading.clone(),
        ]
        .join("\n\n")
    }
}
