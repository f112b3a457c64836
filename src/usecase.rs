//! Usage presets: beam width and token counts for common serving workloads.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Beam width and token counts of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageProfile {
    pub beam_size: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum UseCase {
    #[default]
    #[value(name = "qa", alias = "ques-ans")]
    QuesAns,
    #[value(name = "summarization", alias = "text-summarization")]
    TextSummarization,
    #[value(name = "chatbot", alias = "chatbots")]
    Chatbots,
    #[value(name = "codegen", alias = "code-gen")]
    CodeGen,
    /// Explicit values only
    Custom,
}

/// Immutable preset table.
pub const USE_CASES: [(UseCase, UsageProfile); 4] = [
    (UseCase::QuesAns, UsageProfile { beam_size: 4, input_tokens: 1000, output_tokens: 200 }),
    (UseCase::TextSummarization, UsageProfile { beam_size: 4, input_tokens: 15000, output_tokens: 1000 }),
    (UseCase::Chatbots, UsageProfile { beam_size: 2, input_tokens: 2048, output_tokens: 128 }),
    (UseCase::CodeGen, UsageProfile { beam_size: 4, input_tokens: 20000, output_tokens: 50 }),
];

impl UseCase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::QuesAns => "Ques-Ans",
            Self::TextSummarization => "Text Summarization",
            Self::Chatbots => "Chatbots",
            Self::CodeGen => "Code Gen.",
            Self::Custom => "Custom",
        }
    }

    /// Preset values, `None` for [`UseCase::Custom`].
    pub fn preset(&self) -> Option<UsageProfile> {
        USE_CASES.iter().find(|(uc, _)| uc == self).map(|(_, p)| *p)
    }

    /// Preset with explicit overrides applied. `Custom` starts from Ques-Ans.
    pub fn resolve(&self, beam: Option<u32>, input: Option<u32>, output: Option<u32>) -> UsageProfile {
        let base = self
            .preset()
            .or_else(|| UseCase::QuesAns.preset())
            .unwrap_or(UsageProfile { beam_size: 4, input_tokens: 1000, output_tokens: 200 });
        UsageProfile {
            beam_size: beam.unwrap_or(base.beam_size),
            input_tokens: input.unwrap_or(base.input_tokens),
            output_tokens: output.unwrap_or(base.output_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let chat = UseCase::Chatbots.preset().unwrap();
        assert_eq!((chat.beam_size, chat.input_tokens, chat.output_tokens), (2, 2048, 128));
        let code = UseCase::CodeGen.preset().unwrap();
        assert_eq!(code.input_tokens, 20000);
        assert!(UseCase::Custom.preset().is_none());
    }

    #[test]
    fn test_overrides() {
        let p = UseCase::TextSummarization.resolve(Some(1), None, Some(64));
        assert_eq!(p, UsageProfile { beam_size: 1, input_tokens: 15000, output_tokens: 64 });

        let custom = UseCase::Custom.resolve(None, Some(512), None);
        assert_eq!(custom, UsageProfile { beam_size: 4, input_tokens: 512, output_tokens: 200 });
    }
}
