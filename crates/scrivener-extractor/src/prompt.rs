//! Prompt configuration and assembly
//!
//! A prompt document pairs a system message and a human message with a sampling
//! temperature. Both messages are templates over two placeholders:
//!
//! - `{format_instructions}`: the rendering of the compiled type model
//! - `{document_text}`: the text extracted from the document
//!
//! `{{` and `}}` produce literal braces. Any other `{...}` is a configuration error,
//! caught when the document is loaded rather than when the first prompt is built.

use crate::error::ExtractorError;
use scrivener_domain::ChatMessage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder for the rendered format instructions
pub const FORMAT_INSTRUCTIONS: &str = "format_instructions";

/// Placeholder for the extracted document text
pub const DOCUMENT_TEXT: &str = "document_text";

/// Prompt document as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    /// Template for the system turn
    pub system_message: String,

    /// Template for the human turn
    pub human_message: String,

    /// Sampling temperature, within `[0, 2]`
    #[serde(default)]
    pub temperature: f32,
}

impl PromptConfig {
    /// Parse and validate a prompt document
    pub fn from_json(json: &str) -> Result<Self, ExtractorError> {
        let config: PromptConfig = serde_json::from_str(json)
            .map_err(|e| ExtractorError::Config(format!("Invalid prompt document: {}", e)))?;
        config.validate().map_err(ExtractorError::Config)?;
        Ok(config)
    }

    /// Read, parse and validate a prompt document file
    pub fn load(path: &Path) -> Result<Self, ExtractorError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ExtractorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json).map_err(|e| match e {
            ExtractorError::Config(message) => {
                ExtractorError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Validate templates and temperature
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            ));
        }
        PromptBuilder::new(self).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    FormatInstructions,
    DocumentText,
}

/// Parse a template into literal and placeholder segments
fn parse_template(template: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let rest = &template[pos + 1..];
                let end = rest
                    .find('}')
                    .ok_or_else(|| format!("unclosed '{{' at offset {}", pos))?;
                let name = &rest[..end];
                let segment = match name {
                    FORMAT_INSTRUCTIONS => Segment::FormatInstructions,
                    DOCUMENT_TEXT => Segment::DocumentText,
                    _ => {
                        return Err(format!(
                            "unknown placeholder '{{{}}}' (expected {{{}}} or {{{}}}; write {{{{ for a literal brace)",
                            name, FORMAT_INSTRUCTIONS, DOCUMENT_TEXT
                        ));
                    }
                };
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(segment);
                // Skip the name and the closing brace
                for _ in 0..=name.chars().count() {
                    chars.next();
                }
            }
            '}' => return Err(format!("unmatched '}}' at offset {}", pos)),
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn render(segments: &[Segment], instructions: &str, text: &str) -> String {
    let mut out = String::with_capacity(instructions.len() + text.len() + 256);
    for segment in segments {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::FormatInstructions => out.push_str(instructions),
            Segment::DocumentText => out.push_str(text),
        }
    }
    out
}

/// Builds the two-message prompt for one document
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: Vec<Segment>,
    human: Vec<Segment>,
    temperature: f32,
}

impl PromptBuilder {
    /// Compile a prompt document's templates
    ///
    /// Fails if a template is malformed or if either placeholder is used by neither
    /// message.
    pub fn new(config: &PromptConfig) -> Result<Self, String> {
        let system = parse_template(&config.system_message)
            .map_err(|e| format!("system_message: {}", e))?;
        let human = parse_template(&config.human_message)
            .map_err(|e| format!("human_message: {}", e))?;

        let uses = |wanted: &Segment| system.iter().chain(human.iter()).any(|s| s == wanted);
        if !uses(&Segment::FormatInstructions) {
            return Err(format!("no template uses {{{}}}", FORMAT_INSTRUCTIONS));
        }
        if !uses(&Segment::DocumentText) {
            return Err(format!("no template uses {{{}}}", DOCUMENT_TEXT));
        }

        Ok(Self {
            system,
            human,
            temperature: config.temperature,
        })
    }

    /// Sampling temperature to request
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Assemble the system and human messages
    pub fn build(&self, instructions: &str, document_text: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(render(&self.system, instructions, document_text)),
            ChatMessage::user(render(&self.human, instructions, document_text)),
        ]
    }
}
