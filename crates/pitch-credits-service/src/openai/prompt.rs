//! Prompt construction for proposal generation.

use pitch_credits_core::{Platform, ProposalBrief, NAME_PLACEHOLDER};

use super::types::ChatMessage;

const ADDRESSING: &str =
    "Address the proposal to the client or hiring manager, never to the freelancer.";

/// System instruction for a platform.
#[must_use]
pub fn system_prompt(platform: Platform) -> String {
    let style = match platform {
        Platform::Upwork => {
            "You write winning Upwork proposals. Open with a sentence that answers the \
             client's need, list 2-3 directly relevant skills as bullet points, state \
             deliverables and timeline, and close with a call to action. At most 200 words."
        }
        Platform::Fiverr => {
            "You write Fiverr gig responses. Use short, catchy sentences, highlight 2-3 \
             services on offer and stay persuasive but friendly. At most 120 words."
        }
        Platform::Linkedin => {
            "You write LinkedIn outreach messages. Keep it conversational, reference the \
             client's work and suggest a short call. At most 100 words."
        }
        Platform::Freelancer | Platform::Generic => {
            "You write freelance proposals. Produce a concise, persuasive proposal of \
             80-200 words with an opening, 2-3 key points, a timeline and a closing call \
             to action."
        }
    };
    format!("{style} {ADDRESSING}")
}

/// User turn describing the job.
///
/// The sign-off uses the name placeholder; it is replaced with the author's
/// name once the text comes back.
#[must_use]
pub fn user_prompt(brief: &ProposalBrief) -> String {
    let mut prompt = String::new();
    if !brief.job_title.trim().is_empty() {
        prompt.push_str(&format!("Job title: {}\n\n", brief.job_title.trim()));
    }
    prompt.push_str(&format!(
        "Job description:\n{}\n\nWrite a {} proposal for the above job for {}. \
         End the proposal with:\n\nBest regards,\n{NAME_PLACEHOLDER}\n",
        brief.job_description.trim(),
        tone(brief),
        brief.platform.label(),
    ));
    prompt
}

/// Full message list for one generation.
#[must_use]
pub fn messages(brief: &ProposalBrief) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(brief.platform)),
        ChatMessage::user(user_prompt(brief)),
    ]
}

fn tone(brief: &ProposalBrief) -> &str {
    let tone = brief.tone.trim();
    if tone.is_empty() {
        "professional"
    } else {
        tone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief(platform: Platform, tone: &str) -> ProposalBrief {
        ProposalBrief {
            platform,
            tone: tone.into(),
            job_title: "Landing page".into(),
            job_description: "  Build a landing page in Astro.  ".into(),
            author_name: None,
        }
    }

    #[test]
    fn user_prompt_carries_job_and_placeholder() {
        let prompt = user_prompt(&brief(Platform::Upwork, "Confident"));

        assert!(prompt.starts_with("Job title: Landing page"));
        assert!(prompt.contains("Build a landing page in Astro.\n"));
        assert!(prompt.contains("Write a Confident proposal"));
        assert!(prompt.trim_end().ends_with(NAME_PLACEHOLDER));
    }

    #[test]
    fn blank_tone_falls_back_to_professional() {
        assert!(user_prompt(&brief(Platform::Generic, "  ")).contains("Write a professional"));
    }

    #[test]
    fn every_platform_has_its_own_instructions() {
        let upwork = system_prompt(Platform::Upwork);
        let fiverr = system_prompt(Platform::Fiverr);
        assert_ne!(upwork, fiverr);
        assert!(upwork.contains("Upwork"));
        assert!(system_prompt(Platform::Linkedin).ends_with(ADDRESSING));
        assert_eq!(messages(&brief(Platform::Fiverr, "x"))[0].role, "system");
    }
}
