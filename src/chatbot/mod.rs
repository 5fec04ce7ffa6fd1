//! Scheme assistant.
//!
//! Classifies a visitor's prompt against an ordered keyword table. Category
//! intents answer with a few schemes of that category, the fallback with
//! featured schemes, and small talk with no schemes at all.

use serde::Serialize;

use crate::catalog::SchemeCatalog;
use crate::errors::AppError;
use crate::filter::FilterCriteria;
use crate::models::{Category, SchemeSummary};
use crate::pagination::PageRequest;

/// Schemes attached to one reply.
const REPLY_SCHEMES: u32 = 3;

/// What the visitor is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Category(Category),
    Greeting,
    Help,
    Thanks,
    Fallback,
}

struct Rule {
    /// Matched against the start of each word of the prompt
    keywords: &'static [&'static str],
    /// Stems too short to match as prefixes; matched as whole words
    words: &'static [&'static str],
    category: Category,
    message: &'static str,
    suggestions: [&'static str; 3],
}

const RULES: &[Rule] = &[
    Rule {
        keywords: &["education", "study", "student", "school", "scholarship"],
        words: &[],
        category: Category::Education,
        message: "I found some great education schemes for you! Here are some options:",
        suggestions: [
            "Tell me about healthcare schemes",
            "Show me employment opportunities",
            "What about housing schemes?",
        ],
    },
    Rule {
        keywords: &["health", "medical", "hospital"],
        words: &[],
        category: Category::Healthcare,
        message: "Here are some healthcare schemes that might interest you:",
        suggestions: [
            "Show me education schemes",
            "What about employment schemes?",
            "Tell me about housing schemes",
        ],
    },
    Rule {
        keywords: &["job", "employment", "work"],
        words: &[],
        category: Category::Employment,
        message: "I found some employment and job-related schemes:",
        suggestions: [
            "Show me education schemes",
            "What about healthcare schemes?",
            "Tell me about housing schemes",
        ],
    },
    Rule {
        keywords: &["house", "home", "housing"],
        words: &[],
        category: Category::Housing,
        message: "Here are some housing schemes available:",
        suggestions: [
            "Show me education schemes",
            "What about healthcare schemes?",
            "Tell me about employment schemes",
        ],
    },
    Rule {
        keywords: &["agriculture", "farm", "crop"],
        words: &[],
        category: Category::Agriculture,
        message: "I found some agriculture schemes for farmers:",
        suggestions: [
            "Show me education schemes",
            "What about healthcare schemes?",
            "Tell me about employment schemes",
        ],
    },
    Rule {
        keywords: &["women", "woman", "female", "girl"],
        words: &[],
        category: Category::WomenEmpowerment,
        message: "Here are some women empowerment schemes:",
        suggestions: [
            "Show me education schemes",
            "What about healthcare schemes?",
            "Tell me about employment schemes",
        ],
    },
    Rule {
        keywords: &["youth", "young"],
        words: &[],
        category: Category::YouthDevelopment,
        message: "Here are some youth development schemes:",
        suggestions: [
            "Show me education schemes",
            "What about healthcare schemes?",
            "Tell me about employment schemes",
        ],
    },
    Rule {
        keywords: &["senior", "elderly", "old", "pension"],
        words: &[],
        category: Category::SeniorCitizens,
        message: "Here are some schemes for senior citizens:",
        suggestions: [
            "Show me healthcare schemes",
            "What about housing schemes?",
            "Tell me about financial inclusion",
        ],
    },
    Rule {
        keywords: &["disability", "disabled", "handicap"],
        words: &[],
        category: Category::Disability,
        message: "Here are some schemes for persons with disabilities:",
        suggestions: [
            "Show me healthcare schemes",
            "What about employment schemes?",
            "Tell me about education schemes",
        ],
    },
    Rule {
        keywords: &["loan", "finance", "financial", "money", "bank"],
        words: &[],
        category: Category::FinancialInclusion,
        message: "Here are some financial inclusion schemes:",
        suggestions: [
            "Show me education schemes",
            "What about employment schemes?",
            "Tell me about housing schemes",
        ],
    },
    Rule {
        keywords: &["technolog", "digital", "computer"],
        words: &["tech"],
        category: Category::Technology,
        message: "Here are some technology-related schemes:",
        suggestions: [
            "Show me education schemes",
            "What about employment schemes?",
            "Tell me about financial inclusion",
        ],
    },
    Rule {
        keywords: &["environment", "green", "ecolog", "solar"],
        words: &["eco"],
        category: Category::Environment,
        message: "Here are some environment-friendly schemes:",
        suggestions: [
            "Show me education schemes",
            "What about technology schemes?",
            "Tell me about agriculture schemes",
        ],
    },
    Rule {
        keywords: &["rural", "village"],
        words: &[],
        category: Category::RuralDevelopment,
        message: "Here are some rural development schemes:",
        suggestions: [
            "Show me agriculture schemes",
            "What about healthcare schemes?",
            "Tell me about education schemes",
        ],
    },
    Rule {
        keywords: &["urban", "city"],
        words: &[],
        category: Category::UrbanDevelopment,
        message: "Here are some urban development schemes:",
        suggestions: [
            "Show me housing schemes",
            "What about employment schemes?",
            "Tell me about technology schemes",
        ],
    },
];

// Small talk is matched on whole words only
const GREETINGS: &[&str] = &["hello", "hi", "hey", "vanakkam", "namaste"];
const HELP_WORDS: &[&str] = &["help"];
const THANKS_PREFIX: &str = "thank";

const GREETING_MESSAGE: &str = "Hello! I'm your Smart Scheme Assistant. I can help you find \
government schemes based on your needs. What type of scheme are you looking for? You can ask \
about education, healthcare, employment, housing, agriculture, women empowerment, youth \
development, senior citizens, disability, financial inclusion, technology, environment, rural \
development, or urban development schemes.";

const HELP_MESSAGE: &str = "I can help you find government schemes! Here's what I can do:\n\n\
• Find schemes by category (education, healthcare, employment, etc.)\n\
• Recommend schemes based on your needs\n\
• Provide information about scheme benefits and eligibility\n\
• Help you understand application processes\n\n\
Just tell me what you're looking for!";

const THANKS_MESSAGE: &str = "You're welcome! I'm here to help you find the best government \
schemes. Feel free to ask me anything else about schemes or if you need help with applications.";

const FALLBACK_MESSAGE: &str =
    "I understand you're looking for schemes. Here are some popular ones that might interest you:";

const DEFAULT_SUGGESTIONS: [&str; 3] = [
    "Show me education schemes",
    "What about healthcare schemes?",
    "Tell me about employment schemes",
];

const THANKS_SUGGESTIONS: [&str; 3] = [
    "Show me more schemes",
    "What about other categories?",
    "How do I apply for schemes?",
];

/// Prompts offered to a visitor who does not know what to ask.
pub const SUGGESTIONS: &[&str] = &[
    "Show me education schemes",
    "What about healthcare schemes?",
    "Tell me about employment schemes",
    "Show me housing schemes",
    "What about agriculture schemes?",
    "Tell me about women empowerment schemes",
    "Show me youth development schemes",
    "What about senior citizen schemes?",
    "Tell me about disability schemes",
    "Show me financial inclusion schemes",
    "What about technology schemes?",
    "Tell me about environment schemes",
];

/// Categories the assistant can route to.
pub fn categories() -> Vec<Category> {
    RULES.iter().map(|rule| rule.category).collect()
}

/// Answer to one prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: String,
    pub schemes: Vec<SchemeSummary>,
    pub suggestions: Vec<String>,
}

/// Map a prompt to an intent. The first matching rule wins.
pub fn classify(prompt: &str) -> Intent {
    let lowered = prompt.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let has_prefix = |keyword: &str| words.iter().any(|w| w.starts_with(keyword));
    let has_word = |set: &[&str]| words.iter().any(|w| set.iter().any(|k| k == w));

    if let Some(rule) = RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| has_prefix(k)) || has_word(rule.words))
    {
        return Intent::Category(rule.category);
    }

    if has_word(GREETINGS) {
        Intent::Greeting
    } else if has_word(HELP_WORDS) || lowered.contains("what can you do") {
        Intent::Help
    } else if has_prefix(THANKS_PREFIX) {
        Intent::Thanks
    } else {
        Intent::Fallback
    }
}

/// Classify the prompt and gather the schemes the intent calls for.
pub async fn respond(catalog: &SchemeCatalog, prompt: &str) -> Result<ChatReply, AppError> {
    if prompt.trim().is_empty() {
        return Err(AppError::validation("prompt", "Prompt is required"));
    }

    let intent = classify(prompt);
    tracing::debug!(?intent, "Chat prompt classified");

    let (message, suggestions, schemes) = match intent {
        Intent::Category(category) => {
            let rule = RULES.iter().find(|rule| rule.category == category);
            let criteria = FilterCriteria {
                category: Some(category),
                ..Default::default()
            };
            let page = PageRequest::new(1, REPLY_SCHEMES).unwrap_or_default();
            let schemes = catalog.filter(&criteria, page).await?.items;
            (
                rule.map_or(FALLBACK_MESSAGE, |r| r.message),
                rule.map_or(DEFAULT_SUGGESTIONS, |r| r.suggestions),
                schemes,
            )
        }
        Intent::Greeting => (GREETING_MESSAGE, DEFAULT_SUGGESTIONS, Vec::new()),
        Intent::Help => (HELP_MESSAGE, DEFAULT_SUGGESTIONS, Vec::new()),
        Intent::Thanks => (THANKS_MESSAGE, THANKS_SUGGESTIONS, Vec::new()),
        Intent::Fallback => (
            FALLBACK_MESSAGE,
            DEFAULT_SUGGESTIONS,
            catalog.list_featured(REPLY_SCHEMES).await?,
        ),
    };

    Ok(ChatReply {
        message: message.to_string(),
        schemes: schemes.into_iter().map(SchemeSummary::from).collect(),
        suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_keywords() {
        assert_eq!(
            classify("Any scholarships for my daughter?"),
            Intent::Category(Category::Education)
        );
        assert_eq!(
            classify("I am a FARMER in Salem"),
            Intent::Category(Category::Agriculture)
        );
        assert_eq!(
            classify("need a medical check"),
            Intent::Category(Category::Healthcare)
        );
        assert_eq!(
            classify("schemes for the elderly"),
            Intent::Category(Category::SeniorCitizens)
        );
        assert_eq!(
            classify("cheap loans please"),
            Intent::Category(Category::FinancialInclusion)
        );
    }

    #[test]
    fn test_first_rule_wins() {
        // both education and housing keywords; education is listed first
        assert_eq!(
            classify("student housing"),
            Intent::Category(Category::Education)
        );
    }

    #[test]
    fn test_keywords_match_word_starts_only() {
        // "hold" contains "old" and "this" contains "hi"
        assert_eq!(classify("hold this"), Intent::Fallback);
        assert_eq!(classify("history"), Intent::Fallback);
    }

    #[test]
    fn test_short_stems_match_whole_words() {
        assert_eq!(classify("tech"), Intent::Category(Category::Technology));
        assert_eq!(
            classify("eco-friendly cooking gas"),
            Intent::Category(Category::Environment)
        );
        assert_eq!(
            classify("ecological restoration"),
            Intent::Category(Category::Environment)
        );
        assert_eq!(
            classify("technologies for villages"),
            Intent::Category(Category::Technology)
        );

        assert_eq!(classify("economic support"), Intent::Fallback);
        assert_eq!(classify("the economy"), Intent::Fallback);
        assert_eq!(classify("a new technique"), Intent::Fallback);
    }

    #[test]
    fn test_small_talk() {
        assert_eq!(classify("Hi there"), Intent::Greeting);
        assert_eq!(classify("hello!"), Intent::Greeting);
        assert_eq!(classify("What can you do?"), Intent::Help);
        assert_eq!(classify("help"), Intent::Help);
        assert_eq!(classify("Thanks a lot"), Intent::Thanks);
        assert_eq!(classify("thank you"), Intent::Thanks);
    }

    #[test]
    fn test_category_beats_small_talk() {
        assert_eq!(
            classify("hello, any housing help?"),
            Intent::Category(Category::Housing)
        );
    }

    #[test]
    fn test_fallback() {
        assert_eq!(classify("what is new"), Intent::Fallback);
        assert_eq!(classify("???"), Intent::Fallback);
    }

    #[test]
    fn test_categories_list() {
        let categories = categories();
        assert_eq!(categories.len(), 14);
        assert_eq!(categories[0], Category::Education);
        assert!(!categories.contains(&Category::Other));
    }

    #[test]
    fn test_suggestions_are_prompts_the_bot_understands() {
        for suggestion in SUGGESTIONS {
            assert!(
                matches!(classify(suggestion), Intent::Category(_)),
                "{} should route to a category",
                suggestion
            );
        }
    }
}
