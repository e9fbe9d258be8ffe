//! Prompt templates for grounded generation
//!
//! A template is plain text with exactly two named placeholders, `{question}`
//! and `{context}`. Literal braces are written doubled (`{{` and `}}`).

use std::fmt;

use crate::error::{Error, Result};

/// Separator placed between retrieved chunks when building the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Question,
    Context,
}

/// A validated prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse and validate a template string.
    ///
    /// Fails with `InvalidPrompt` when the template is blank, has unbalanced
    /// braces, names a placeholder other than `question`/`context`, or is
    /// missing either of them.
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(Error::InvalidPrompt("prompt definition missing".to_string()));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();
        let (mut has_question, mut has_context) = (false, false);

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(Error::InvalidPrompt("unmatched '}' in template".to_string()));
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(Error::InvalidPrompt(
                                    "unterminated placeholder in template".to_string(),
                                ))
                            }
                        }
                    }

                    let segment = match name.trim() {
                        "question" => {
                            has_question = true;
                            Segment::Question
                        }
                        "context" => {
                            has_context = true;
                            Segment::Context
                        }
                        other => {
                            return Err(Error::InvalidPrompt(format!(
                                "unknown placeholder '{{{}}}', only {{question}} and {{context}} are allowed",
                                other
                            )))
                        }
                    };

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        match (has_question, has_context) {
            (true, true) => Ok(Self {
                source: source.to_string(),
                segments,
            }),
            (false, _) => Err(Error::InvalidPrompt("template is missing {question}".to_string())),
            (_, false) => Err(Error::InvalidPrompt("template is missing {context}".to_string())),
        }
    }

    /// Substitute the question and context into the template
    pub fn render(&self, question: &str, context: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + question.len() + context.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Question => out.push_str(question),
                Segment::Context => out.push_str(context),
            }
        }
        out
    }

    /// The template text as supplied
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Join retrieved chunks, in order, into one context block
pub fn build_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
