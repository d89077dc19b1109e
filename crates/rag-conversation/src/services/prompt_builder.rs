use crate::models::chat::{ChatMessage, ReferenceDocument};

const FOLLOW_UP_INSTRUCTION: &str = "Instruksi: Jawab pertanyaan saat ini dengan mempertimbangkan konteks percakapan sebelumnya. \
Jika pertanyaan ini adalah lanjutan dari pertanyaan sebelumnya, berikan jawaban yang konsisten dan terhubung. \
Gunakan informasi dari dokumen referensi untuk memberikan jawaban yang akurat dan lengkap.";

const PLAIN_INSTRUCTION: &str =
    "Instruksi: Berdasarkan dokumen referensi di atas, jawab pertanyaan dengan akurat dan lengkap.";

/// Builds the single-message prompt sent to the model.
pub struct PromptBuilder;

impl PromptBuilder {
    /// `conversation_context` is the rendered Q/A transcript, empty when the
    /// session has no history. The raw question is embedded, not the
    /// enhanced one.
    pub fn build(question: &str, conversation_context: &str, documents: &[ReferenceDocument]) -> Vec<ChatMessage> {
        let separator = format!("\n{}\n", "=".repeat(50));
        let has_history = !conversation_context.is_empty();
        let mut parts: Vec<String> = Vec::new();

        if has_history {
            parts.push("CONVERSATION HISTORY:".to_string());
            parts.push(conversation_context.to_string());
            parts.push(separator.clone());
        }

        parts.push("DOKUMEN REFERENSI:".to_string());
        parts.push(Self::document_context(documents));
        parts.push(separator);

        if has_history {
            parts.push(format!("PERTANYAAN SAAT INI: {}", question));
            parts.push(format!("\n{}", FOLLOW_UP_INSTRUCTION));
        } else {
            parts.push(format!("PERTANYAAN: {}", question));
            parts.push(format!("\n{}", PLAIN_INSTRUCTION));
        }

        parts.push("\nJAWABAN:".to_string());

        vec![ChatMessage::user(parts.join("\n"))]
    }

    pub fn document_context(documents: &[ReferenceDocument]) -> String {
        documents
            .iter()
            .map(|doc| format!("[File: {}]\n{}", doc.filename, doc.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}
