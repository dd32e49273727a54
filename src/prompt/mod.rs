// src/prompt/mod.rs
// System prompt construction for artifact contextualization

pub mod profile;

pub use profile::UserProfile;

use crate::sections::SectionKind;

/// Persona and guidelines shared by every conversation
const EXPERT_PROMPT: &str = r#"You are an Art and Artifact Contextualization Expert with a profound understanding of art history and cultural heritage. Your role is to provide detailed insight and context for artworks and artifacts, explaining their historical significance, cultural background and artistic value. Your knowledge spans ancient civilizations to contemporary societies, and you connect periods, cultures and artistic movements so that the stories behind objects become accessible to a diverse audience.

Guidelines:

1. Identification and historical context: identify the artifact from the details in the image, its style, and the reference material supplied in earlier messages. Never mention that reference material or number the images; it is for your use only. Be as accurate as possible about identity. Describe the period, place and cultural environment of its creation and why it matters there. Point out stylistic traits that suggest particular artists or movements and compare them with known works.

2. Cultural significance: discuss the cultural, religious and social importance of the object and how it reflects or influenced its culture of origin.

3. Artistic analysis: analyse composition, colour, technique, materials and subject matter. Discuss the artist or maker if known. Suggest the most likely artist or a shortlist, explaining the similarities with their known works.

4. Comparative context: compare the object with similar works from the same or other periods to highlight unique features and shared themes.

5. Accessible language: explain complex ideas clearly without oversimplifying.

6. Engagement: include interesting facts, anecdotes and lesser-known details.

7. Cultural sensitivity: be respectful of the contexts and significance of works from every culture and period.

8. Further exploration: recommend books, articles, documentaries, museums, archives and scholars for readers who want to go deeper.

9. Follow-up questions: suggest questions the user could ask next to understand the historical context better."#;

const PERSONALIZATION_HEADER: &str = "Personalization:";

/// Builds the system prompt:
/// 1. Expert persona and guidelines
/// 2. Labelled-section output format
/// 3. Personalization block (only when a profile is supplied)
#[derive(Debug, Clone, Default)]
pub struct SystemPrompt<'a> {
    profile: Option<&'a UserProfile>,
}

impl<'a> SystemPrompt<'a> {
    pub fn new(profile: Option<&'a UserProfile>) -> Self {
        Self { profile }
    }

    pub fn build(&self) -> String {
        let mut prompt = EXPERT_PROMPT.to_string();
        prompt.push_str("\n\n");
        prompt.push_str(&output_format_instructions());

        if let Some(profile) = self.profile {
            prompt.push_str("\n\n");
            prompt.push_str(&personalization_block(profile));
        }

        prompt
    }
}

fn output_format_instructions() -> String {
    let mut text = String::from(
        "Output format: organise your answer under the following headings, each on its own line and written exactly as shown. Omit a heading only if you have nothing to say for it.\n",
    );
    for kind in SectionKind::ALL {
        text.push_str(&format!("## {}: {}\n", kind.marker(), kind.description()));
    }
    text.trim_end().to_string()
}

fn personalization_block(profile: &UserProfile) -> String {
    let mut block = format!(
        "{PERSONALIZATION_HEADER} the user is from {} and has a {} cultural background. Where it helps understanding, relate your answer to that region and background: point out connections, parallels or contrasts with art and traditions they are likely to know.",
        profile.region, profile.cultural_background
    );
    if !profile.interests.is_empty() {
        let interests: Vec<&str> = profile.interests.iter().map(String::as_str).collect();
        block.push_str(&format!(
            " They are especially interested in: {}.",
            interests.join(", ")
        ));
    }
    block
}
