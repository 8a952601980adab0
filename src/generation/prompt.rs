//! Prompt construction for portrait generation

use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "photo of ";

pub const DEFAULT_STYLE_SUFFIX: &str = " (cinematic lighting:1.1) dynamic angle, highest quality,  (movie poster pose), analog style, high-resolution, detailed, concept art";

pub const DEFAULT_NEGATIVE_PROMPT: &str = "(nude), breasts, photoshop, airbrush, kitsch, oversaturated, low-res, Deformed, bad anatomy, disfigured, poorly drawn face, mutation, mutated, extra limb,poorly drawn hands, missing limb, floating limbs, disconnected limbs, malformed hands, long neck, long body, disgusting, poorly drawn, mutilated, mangled, conjoined twins, extra legs, extra arms, meme, deformed, elongated, strabismus, heterochromia, watermark, extra fingers, blind eyes, dead eyes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    pub prefix: String,
    pub style_suffix: String,
    pub negative: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            style_suffix: DEFAULT_STYLE_SUFFIX.to_string(),
            negative: DEFAULT_NEGATIVE_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn positive(&self, description: &str) -> String {
        format!("{}{}{}", self.prefix, description, self.style_suffix)
    }

    pub fn negative(&self) -> &str {
        &self.negative
    }
}
