//! Prompt construction for article generation.
//!
//! The style templates are parsed once into [`PromptTemplate`]s when the
//! [`PromptBuilder`] is created and never change afterwards. Unknown length,
//! style or tone values fall back to `medium`, `informative` and `neutral`
//! when they are parsed, so building a prompt cannot fail.

use serde::{Deserialize, Serialize};

const INFORMATIVE_TEMPLATE: &str = "Write an informative article about {topic}.

{length_instruction}

{tone_instruction}

Structure the article with:
- A compelling introduction
- Well-organized main points with clear headings
- Supporting details and examples
- A strong conclusion

Make sure the content is accurate, well-researched, and engaging for readers.

Article:";

const CREATIVE_TEMPLATE: &str = "Write a creative and engaging article about {topic}.

{length_instruction}

{tone_instruction}

Use storytelling techniques, metaphors, and creative language to make the topic come alive. Include:
- An attention-grabbing opening
- Vivid descriptions and examples
- Personal anecdotes or scenarios when appropriate
- A memorable conclusion

Article:";

const TECHNICAL_TEMPLATE: &str = "Write a technical article about {topic}.

{length_instruction}

{tone_instruction}

The article should be:
- Technically accurate and detailed
- Well-structured with clear sections
- Include relevant technical concepts and terminology
- Provide practical insights and applications
- Be accessible to the target technical audience

Article:";

const CASUAL_TEMPLATE: &str = "Write a casual, conversational article about {topic}.

{length_instruction}

{tone_instruction}

Write in a friendly, approachable tone as if talking to a friend. Include:
- A warm, welcoming introduction
- Easy-to-understand explanations
- Personal touches and relatable examples
- A conversational conclusion

Article:";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ArticleLength {
    Short,
    #[default]
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ArticleStyle {
    #[default]
    Informative,
    Creative,
    Technical,
    Casual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ArticleTone {
    #[default]
    Neutral,
    Professional,
    Friendly,
    Authoritative,
}

impl ArticleLength {
    pub fn instruction(self) -> &'static str {
        match self {
            ArticleLength::Short => "Write a concise article of approximately 300-500 words.",
            ArticleLength::Medium => {
                "Write a comprehensive article of approximately 800-1200 words."
            }
            ArticleLength::Long => {
                "Write a detailed, in-depth article of approximately 1500-2500 words."
            }
        }
    }
}

impl ArticleTone {
    pub fn instruction(self) -> &'static str {
        match self {
            ArticleTone::Neutral => "Maintain an objective, balanced tone throughout the article.",
            ArticleTone::Professional => {
                "Use a formal, professional tone suitable for business or academic contexts."
            }
            ArticleTone::Friendly => "Write in a warm, approachable, and friendly tone.",
            ArticleTone::Authoritative => {
                "Write with confidence and authority, establishing expertise on the topic."
            }
        }
    }
}

impl From<&str> for ArticleLength {
    fn from(raw: &str) -> Self {
        match raw {
            "short" => ArticleLength::Short,
            "long" => ArticleLength::Long,
            _ => ArticleLength::Medium,
        }
    }
}

impl From<&str> for ArticleStyle {
    fn from(raw: &str) -> Self {
        match raw {
            "creative" => ArticleStyle::Creative,
            "technical" => ArticleStyle::Technical,
            "casual" => ArticleStyle::Casual,
            _ => ArticleStyle::Informative,
        }
    }
}

impl From<&str> for ArticleTone {
    fn from(raw: &str) -> Self {
        match raw {
            "professional" => ArticleTone::Professional,
            "friendly" => ArticleTone::Friendly,
            "authoritative" => ArticleTone::Authoritative,
            _ => ArticleTone::Neutral,
        }
    }
}

impl From<String> for ArticleLength {
    fn from(raw: String) -> Self {
        raw.as_str().into()
    }
}

impl From<String> for ArticleStyle {
    fn from(raw: String) -> Self {
        raw.as_str().into()
    }
}

impl From<String> for ArticleTone {
    fn from(raw: String) -> Self {
        raw.as_str().into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Topic,
    LengthInstruction,
    ToneInstruction,
}

impl Slot {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "topic" => Some(Slot::Topic),
            "length_instruction" => Some(Slot::LengthInstruction),
            "tone_instruction" => Some(Slot::ToneInstruction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Slot(Slot),
}

/// A template split into literal text and named slots.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Splits `source` on `{name}` markers. Braces that do not name a known
    /// slot are kept as literal text.
    pub fn parse(source: &'static str) -> Self {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|idx| open + idx) else {
                break;
            };
            match Slot::from_name(&rest[open + 1..close]) {
                Some(slot) => {
                    if open > 0 {
                        segments.push(Segment::Literal(&rest[..open]));
                    }
                    segments.push(Segment::Slot(slot));
                }
                None => segments.push(Segment::Literal(&rest[..=close])),
            }
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }

        Self { segments }
    }

    #[cfg(test)]
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(slot) => Some(*slot),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, topic: &str, length_instruction: &str, tone_instruction: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push_str(match segment {
                Segment::Literal(text) => *text,
                Segment::Slot(Slot::Topic) => topic,
                Segment::Slot(Slot::LengthInstruction) => length_instruction,
                Segment::Slot(Slot::ToneInstruction) => tone_instruction,
            });
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    informative: PromptTemplate,
    creative: PromptTemplate,
    technical: PromptTemplate,
    casual: PromptTemplate,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            informative: PromptTemplate::parse(INFORMATIVE_TEMPLATE),
            creative: PromptTemplate::parse(CREATIVE_TEMPLATE),
            technical: PromptTemplate::parse(TECHNICAL_TEMPLATE),
            casual: PromptTemplate::parse(CASUAL_TEMPLATE),
        }
    }

    pub fn template(&self, style: ArticleStyle) -> &PromptTemplate {
        match style {
            ArticleStyle::Informative => &self.informative,
            ArticleStyle::Creative => &self.creative,
            ArticleStyle::Technical => &self.technical,
            ArticleStyle::Casual => &self.casual,
        }
    }

    /// The topic is inserted verbatim. Slot markers inside it are not expanded.
    pub fn build(
        &self,
        topic: &str,
        length: ArticleLength,
        style: ArticleStyle,
        tone: ArticleTone,
    ) -> String {
        self.template(style)
            .render(topic, length.instruction(), tone.instruction())
    }
}
