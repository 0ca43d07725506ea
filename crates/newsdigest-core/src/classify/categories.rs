//! The category taxonomy and scoring constants.

/// Points for a keyword found anywhere in the email's searchable text.
pub(crate) const KEYWORD_HIT: u32 = 10;

/// Extra points when the keyword appears in the subject line.
pub(crate) const SUBJECT_HIT: u32 = 15;

/// Extra points when the keyword appears in an assigned topic.
pub(crate) const TOPIC_HIT: u32 = 10;

/// Bonus when the sender address matches a category's primary domains.
pub(crate) const PRIMARY_SENDER_BONUS: u32 = 20;

/// Bonus when the sender address matches a category's secondary domains.
pub(crate) const SECONDARY_SENDER_BONUS: u32 = 15;

/// Scores are capped here before confidence aggregation.
pub(crate) const SCORE_CAP: u32 = 100;

/// An email joins a category only with a score strictly above this.
///
/// A sender bonus alone (at most 20) can never qualify an email; some
/// keyword evidence is always required.
pub(crate) const QUALIFY_THRESHOLD: u32 = 30;

/// Label of the catch-all cluster for emails matching no category.
pub const OTHER_LABEL: &str = "Other";

/// Confidence floor.
pub(crate) const CONFIDENCE_MIN: u8 = 60;

/// Confidence ceiling.
pub(crate) const CONFIDENCE_MAX: u8 = 95;

/// Maximum representative keywords kept per cluster.
pub(crate) const MAX_CLUSTER_KEYWORDS: usize = 8;

/// One thematic category: a label, matching keywords, and sender domains.
#[derive(Debug, Clone)]
pub struct Category {
    /// Theme label shown in the digest.
    pub label: String,
    /// Lowercase keywords matched as substrings.
    pub keywords: Vec<String>,
    /// Sender domains strongly associated with the category.
    pub primary_domains: Vec<String>,
    /// Sender domains loosely associated with the category.
    pub secondary_domains: Vec<String>,
}

impl Category {
    /// Builds a category from static word lists.
    #[must_use]
    pub fn new(label: &str, keywords: &[&str], primary: &[&str], secondary: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            primary_domains: primary.iter().map(|d| d.to_lowercase()).collect(),
            secondary_domains: secondary.iter().map(|d| d.to_lowercase()).collect(),
        }
    }
}

/// The ordered set of categories used for classification.
#[derive(Debug, Clone)]
pub struct CategoryConfig {
    /// Categories in evaluation order.
    pub categories: Vec<Category>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CategoryConfig {
    /// The built-in nine-category taxonomy.
    #[must_use]
    pub fn builtin() -> Self {
        let categories = vec![
            Category::new(
                "Media and Entertainment",
                &[
                    "movie", "film", "television", "streaming", "music", "album", "celebrity",
                    "entertainment", "hollywood", "concert", "trailer", "box office", "podcast",
                    "premiere", "showrunner",
                ],
                &["variety.com", "hollywoodreporter.com", "rollingstone.com"],
                &["vulture.com", "ew.com", "pitchfork.com"],
            ),
            Category::new(
                "Sports",
                &[
                    "football", "basketball", "baseball", "soccer", "tennis", "olympics",
                    "championship", "playoff", "league", "tournament", "athlete", "coach",
                    "roster", "transfer window", "grand slam",
                ],
                &["espn.com", "theathletic.com"],
                &["si.com", "bleacherreport.com"],
            ),
            Category::new(
                "Programming and Computer Engineering",
                &[
                    "programming", "software", "developer", "machine learning",
                    "artificial intelligence", "open source", "database", "framework",
                    "kubernetes", "cloud computing", "javascript", "python", "rust",
                    "compiler", "api", "refactoring",
                ],
                &["github.com", "stackoverflow.com", "oreilly.com"],
                &["dev.to", "infoq.com", "changelog.com"],
            ),
            Category::new(
                "Science",
                &[
                    "research", "study finds", "scientists", "physics", "biology", "chemistry",
                    "climate", "spacecraft", "nasa", "telescope", "genome", "quantum",
                    "experiment", "astronomy", "peer review",
                ],
                &["nature.com", "science.org"],
                &["quantamagazine.org", "scientificamerican.com"],
            ),
            Category::new(
                "Business + Finance",
                &[
                    "earnings", "quarterly", "markets", "stocks", "investor", "revenue",
                    "startup", "funding", "acquisition", "merger", "economy", "inflation",
                    "interest rate", "venture capital", "valuation",
                ],
                &["bloomberg.com", "wsj.com", "ft.com"],
                &["morningbrew.com", "economist.com", "forbes.com"],
            ),
            Category::new(
                "Politics and Current Events",
                &[
                    "election", "congress", "senate", "president", "policy", "legislation",
                    "government", "campaign", "ballot", "supreme court", "diplomacy",
                    "parliament", "geopolitics", "sanctions",
                ],
                &["politico.com", "axios.com"],
                &["theatlantic.com", "semafor.com"],
            ),
            Category::new(
                "Health and Wellness",
                &[
                    "health", "fitness", "nutrition", "exercise", "mental health", "sleep",
                    "wellness", "meditation", "vaccine", "medicine", "therapy", "longevity",
                    "workout",
                ],
                &["webmd.com", "healthline.com"],
                &["examine.com", "outsideonline.com"],
            ),
            Category::new(
                "Travel and Lifestyle",
                &[
                    "travel", "flight", "hotel", "destination", "itinerary", "vacation",
                    "adventure", "airline", "passport", "tourism", "road trip", "packing",
                    "lifestyle",
                ],
                &["afar.com", "cntraveler.com"],
                &["lonelyplanet.com", "thepointsguy.com"],
            ),
            Category::new(
                "Food and Cooking",
                &[
                    "recipe", "cooking", "baking", "restaurant", "ingredient", "kitchen",
                    "chef", "dinner", "dessert", "cuisine", "wine", "coffee", "flavor",
                ],
                &["bonappetit.com", "seriouseats.com"],
                &["food52.com", "epicurious.com"],
            ),
        ];

        Self { categories }
    }
}
