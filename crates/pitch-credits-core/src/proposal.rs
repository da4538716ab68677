//! Generated proposals, the artifact produced by a metered generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProposalId, UserId};

/// Placeholder the generator leaves for the author's name.
pub const NAME_PLACEHOLDER: &str = "[Your Name]";

/// Freelance platform a proposal is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Upwork.
    Upwork,
    /// Fiverr.
    Fiverr,
    /// LinkedIn.
    Linkedin,
    /// Freelancer.com.
    Freelancer,
    /// Anything else.
    #[default]
    Generic,
}

impl Platform {
    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upwork => "Upwork",
            Self::Fiverr => "Fiverr",
            Self::Linkedin => "LinkedIn",
            Self::Freelancer => "Freelancer",
            Self::Generic => "Generic",
        }
    }
}

/// What the user asked to be drafted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalBrief {
    /// Target platform.
    #[serde(default)]
    pub platform: Platform,
    /// Desired tone, e.g. "Formal" or "Friendly".
    #[serde(default)]
    pub tone: String,
    /// Job title, may be empty.
    #[serde(default)]
    pub job_title: String,
    /// The job description to respond to.
    pub job_description: String,
    /// Name to sign the proposal with.
    #[serde(default)]
    pub author_name: Option<String>,
}

/// A proposal whose text was produced by the paid generator.
///
/// It exists only together with the generation charge that paid for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedProposal {
    /// Unique proposal ID.
    pub id: ProposalId,
    /// Owner.
    pub user_id: UserId,
    /// Target platform.
    pub platform: Platform,
    /// Tone used.
    pub tone: String,
    /// Job title.
    pub job_title: String,
    /// Job description the proposal answers.
    pub job_description: String,
    /// The generated text.
    pub proposal_text: String,
    /// When it was saved.
    pub created_at: DateTime<Utc>,
}

impl GeneratedProposal {
    /// Build a proposal from a brief and the generator's output.
    ///
    /// The name placeholder is replaced with `author`.
    #[must_use]
    pub fn from_brief(user_id: UserId, brief: &ProposalBrief, text: &str, author: &str) -> Self {
        Self {
            id: ProposalId::generate(),
            user_id,
            platform: brief.platform,
            tone: brief.tone.clone(),
            job_title: brief.job_title.clone(),
            job_description: brief.job_description.clone(),
            proposal_text: text.trim().replace(NAME_PLACEHOLDER, author),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief() -> ProposalBrief {
        ProposalBrief {
            platform: Platform::Upwork,
            tone: "Formal".into(),
            job_title: "Rust developer".into(),
            job_description: "Build a ledger".into(),
            author_name: None,
        }
    }

    #[test]
    fn placeholder_is_replaced_with_author() {
        let proposal = GeneratedProposal::from_brief(
            UserId::generate(),
            &brief(),
            "  Hi,\nI can help.\n[Your Name]  ",
            "Asha",
        );
        assert_eq!(proposal.proposal_text, "Hi,\nI can help.\nAsha");
        assert_eq!(proposal.platform, Platform::Upwork);
    }

    #[test]
    fn platform_defaults_to_generic() {
        let parsed: ProposalBrief =
            serde_json::from_str(r#"{"tone":"Friendly","job_description":"x"}"#).unwrap();
        assert_eq!(parsed.platform, Platform::Generic);
        assert!(parsed.job_title.is_empty());
    }
}
