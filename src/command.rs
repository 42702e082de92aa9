//! Command interpreter - maps a spoken transcript to a navigation intent
//!
//! Rules are evaluated in a fixed order and the first match wins:
//! 1. Help - list what can be said, no navigation
//! 2. Fixed destinations - home, profile, messages, my listings
//! 3. Donate creation - "i want to donate", unless browsing ("find", "show", ...)
//! 4. Request creation - "make a request", unless browsing
//! 5. Requests for a category - "what can i donate in food", "furniture requests"
//! 6. Donations for a category - "show me furniture", "find books"
//! 7. Bare feed tabs - "show requests", "see donations"
//! 8. Free-text search - "search for winter coats"
//! 9. Fallback - unrecognized
//!
//! Order encodes precedence: "find donations" must never open the donation form,
//! and "requests" must win over "show" when both mention a category.

use std::fmt;
use tracing::debug;

/// Spoken and shown when the user asks for help
pub const HELP_TEXT: &str = "You can say: Go home, Go to profile, Go to messages, Go to my listings, I want to donate, I need help, or search for items like furniture or food.";

/// Item categories used for feed filtering, in match priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Clothes,
    Food,
    Electronics,
    Furniture,
    Books,
    Toys,
    Medical,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Clothes,
        Category::Food,
        Category::Electronics,
        Category::Furniture,
        Category::Books,
        Category::Toys,
        Category::Medical,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Clothes => "clothes",
            Category::Food => "food",
            Category::Electronics => "electronics",
            Category::Furniture => "furniture",
            Category::Books => "books",
            Category::Toys => "toys",
            Category::Medical => "medical",
            Category::Other => "other",
        }
    }

    /// First category (in declared order) whose name appears anywhere in the text
    pub fn find_in(text: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|cat| text.contains(cat.as_str()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feed tab selected by a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTab {
    Requests,
    Donations,
}

impl FeedTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedTab::Requests => "requests",
            FeedTab::Donations => "donations",
        }
    }
}

/// In-app destination reachable by voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Profile,
    Messages,
    MyListings,
    CreateListing,
    CreateRequest,
    Feed {
        tab: FeedTab,
        category: Option<Category>,
    },
}

impl Route {
    /// Client-side routing path, exactly as the router expects it
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Messages => "/messages".to_string(),
            Route::MyListings => "/my-listings".to_string(),
            Route::CreateListing => "/create-listing".to_string(),
            Route::CreateRequest => "/create-request".to_string(),
            Route::Feed { tab, category: None } => format!("/feed?tab={}", tab.as_str()),
            Route::Feed {
                tab,
                category: Some(cat),
            } => format!("/feed?tab={}&category={}", tab.as_str(), cat),
        }
    }

    /// Confirmation spoken and shown after navigating
    pub fn announcement(&self) -> String {
        match self {
            Route::Home => "Navigating home".to_string(),
            Route::Profile => "Navigating to profile".to_string(),
            Route::Messages => "Navigating to messages".to_string(),
            Route::MyListings => "Navigating to my listings".to_string(),
            Route::CreateListing => "Opening donation form".to_string(),
            Route::CreateRequest => "Opening request form".to_string(),
            Route::Feed { tab, category: None } => format!("Showing all {}", tab.as_str()),
            Route::Feed {
                tab,
                category: Some(cat),
            } => format!("Showing {} for {}", tab.as_str(), cat),
        }
    }
}

/// Result of interpreting one transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the available phrases; never navigates
    Help,
    Navigate { route: Route },
    Search { term: String },
    Unrecognized { raw_text: String },
}

impl Command {
    /// Path to navigate to, if this command navigates at all
    pub fn path(&self) -> Option<String> {
        match self {
            Command::Navigate { route } => Some(route.path()),
            Command::Search { term } => Some(format!("/feed?search={}", urlencoding::encode(term))),
            Command::Help | Command::Unrecognized { .. } => None,
        }
    }

    /// Confirmation for commands that navigate
    pub fn announcement(&self) -> Option<String> {
        match self {
            Command::Navigate { route } => Some(route.announcement()),
            Command::Search { term } => Some(format!("Searching for {}", term)),
            Command::Help | Command::Unrecognized { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Navigate { .. } => "navigate",
            Command::Search { .. } => "search",
            Command::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// Phrases that mark a transcript as browsing rather than creating
const BROWSE_WORDS: [&str; 4] = ["find", "search", "show", "see"];

struct Rule {
    name: &'static str,
    apply: fn(&str) -> Option<Command>,
}

impl Rule {
    const fn new(name: &'static str, apply: fn(&str) -> Option<Command>) -> Self {
        Self { name, apply }
    }
}

/// Interpretation rules, highest precedence first
const RULES: [Rule; 12] = [
    Rule::new("help", help),
    Rule::new("home", home),
    Rule::new("profile", profile),
    Rule::new("messages", messages),
    Rule::new("my-listings", my_listings),
    Rule::new("donate-creation", donate_creation),
    Rule::new("request-creation", request_creation),
    Rule::new("requests-for-category", requests_for_category),
    Rule::new("donations-for-category", donations_for_category),
    Rule::new("requests-tab", requests_tab),
    Rule::new("donations-tab", donations_tab),
    Rule::new("search", search),
];

/// Interpret a transcript. Total: every input yields exactly one command.
pub fn classify(transcript: &str) -> Command {
    let text = transcript.to_lowercase();
    if text.trim().is_empty() {
        return Command::Unrecognized {
            raw_text: transcript.to_string(),
        };
    }

    RULES
        .iter()
        .find_map(|rule| {
            let command = (rule.apply)(&text)?;
            debug!(rule = rule.name, "transcript matched");
            Some(command)
        })
        .unwrap_or_else(|| Command::Unrecognized {
            raw_text: transcript.to_string(),
        })
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

fn help(text: &str) -> Option<Command> {
    contains_any(text, &["help", "what can i say", "commands"]).then_some(Command::Help)
}

fn home(text: &str) -> Option<Command> {
    contains_any(text, &["home", "go to start"]).then_some(Command::Navigate {
        route: Route::Home,
    })
}

fn profile(text: &str) -> Option<Command> {
    text.contains("profile").then_some(Command::Navigate {
        route: Route::Profile,
    })
}

fn messages(text: &str) -> Option<Command> {
    contains_any(text, &["messages", "inbox"]).then_some(Command::Navigate {
        route: Route::Messages,
    })
}

fn my_listings(text: &str) -> Option<Command> {
    text.contains("my listings").then_some(Command::Navigate {
        route: Route::MyListings,
    })
}

// "i" is a bare substring test, so nearly any sentence mentioning "donate"
// qualifies. Likely overly broad, kept as the established behavior.
fn donate_creation(text: &str) -> Option<Command> {
    let matched = text.contains("donate")
        && contains_any(text, &["want to", "i", "create"])
        && !contains_any(text, &BROWSE_WORDS);
    matched.then_some(Command::Navigate {
        route: Route::CreateListing,
    })
}

fn request_creation(text: &str) -> Option<Command> {
    let matched = text.contains("request")
        && contains_any(text, &["want to", "create", "make", "need"])
        && !contains_any(text, &BROWSE_WORDS);
    matched.then_some(Command::Navigate {
        route: Route::CreateRequest,
    })
}

fn requests_for_category(text: &str) -> Option<Command> {
    let category = Category::find_in(text)?;
    contains_any(text, &["can donate", "requests"]).then(|| Command::Navigate {
        route: Route::Feed {
            tab: FeedTab::Requests,
            category: Some(category),
        },
    })
}

fn donations_for_category(text: &str) -> Option<Command> {
    let category = Category::find_in(text)?;
    contains_any(text, &["donations", "find", "show"]).then(|| Command::Navigate {
        route: Route::Feed {
            tab: FeedTab::Donations,
            category: Some(category),
        },
    })
}

fn requests_tab(text: &str) -> Option<Command> {
    contains_any(text, &["show requests", "see requests"]).then(|| Command::Navigate {
        route: Route::Feed {
            tab: FeedTab::Requests,
            category: None,
        },
    })
}

fn donations_tab(text: &str) -> Option<Command> {
    contains_any(text, &["show donations", "see donations"]).then(|| Command::Navigate {
        route: Route::Feed {
            tab: FeedTab::Donations,
            category: None,
        },
    })
}

fn search(text: &str) -> Option<Command> {
    let (_, rest) = text.split_once("search for")?;
    let term = rest.trim();
    if term.is_empty() {
        return None;
    }
    Some(Command::Search {
        term: term.to_string(),
    })
}
