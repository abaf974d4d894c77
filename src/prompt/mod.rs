// Prompt module
// Deterministic prompt assembly and answer post-processing


use fancy_regex::Regex;
use itertools::Itertools;
use std::sync::LazyLock;

use crate::index::ScoredChunk;

/// Wrapping quote pairs stripped from model output
const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}'), ('«', '»')];

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z]*\n(.*?)\n?```$").expect("fence pattern is valid")
});

/// Join retrieved chunk texts in retrieval order, separated by a blank line
#[inline]
pub fn assemble_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|scored| scored.chunk.content.trim())
        .filter(|text| !text.is_empty())
        .join("\n\n")
}

/// Assemble the full prompt from context and question.
///
/// The instructional wrapper constrains the model to answer only from the
/// given context, in the configured language, as plain text, and to reply
/// with the exact sentinel phrase when the context does not contain the
/// answer. Identical inputs always produce the identical prompt.
#[inline]
pub fn build_prompt(question: &str, context: &str, language: &str, sentinel: &str) -> String {
    format!(
        "Responde la pregunta basándote únicamente en el contexto provisto. \
         Responde en {language}, en texto plano: sin notación matemática, sin marcado, \
         sin comillas y sin directivas de formato escapadas. \
         Si la respuesta no se encuentra en el contexto, responde exactamente: {sentinel}.\n\n\
         Contexto:\n{context}\n\nPregunta: {question}\nRespuesta:"
    )
}

/// Trim the raw model output and strip formatting artifacts the model
/// emitted despite the plain-text instruction
#[inline]
pub fn sanitize_answer(raw: &str) -> String {
    let mut text = raw.trim();

    if let Ok(Some(captures)) = CODE_FENCE.captures(text) {
        if let Some(inner) = captures.get(1) {
            text = inner.as_str().trim();
        }
    }

    for (open, close) in QUOTE_PAIRS {
        if let Some(stripped) = text
            .strip_prefix(open)
            .and_then(|inner| inner.strip_suffix(close))
        {
            text = stripped.trim();
        }
    }

    text.to_string()
}
