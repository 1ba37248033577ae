// Query strings in GitHub's search grammar
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Language, SearchFilters};

/// Appended to every query so only live public repos come back
pub const PUBLIC_CLAUSE: &str = "is:public archived:false";

/// Base term when the user typed nothing
pub const FALLBACK_TERM: &str = "stars:>1";

const BEGINNER_TOPICS: &[&str] = &[
    "beginner",
    "good-first-issue",
    "hacktoberfest",
    "education",
    "learning",
    "tutorial",
    "student",
    "awesome",
    "resources",
    "guide",
    "course",
    "workshop",
    "bootcamp",
    "coding",
    "programming",
];

const BEGINNER_LABELS: &[&str] = &["good first issue", "beginner friendly", "help wanted"];

const DOCS_HINT: &str = "(README.md OR documentation OR docs OR wiki)";

/// (topic, star floor) pairs, all restricted to recent pushes
const EDUCATIONAL_TOPICS: &[(&str, u32)] = &[
    ("education", 20),
    ("learning", 15),
    ("tutorial", 25),
    ("course", 10),
    ("bootcamp", 5),
    ("programming", 30),
    ("coding", 20),
    ("student", 10),
    ("beginner", 15),
    ("awesome", 100),
    ("resources", 25),
    ("guide", 15),
];

/// Well-established repos, no recency predicate
const EDUCATIONAL_FALLBACKS: &[(&str, u32)] = &[("education", 500), ("learning", 300), ("tutorial", 400)];

const POPULAR_LANGUAGES: &[&str] = &[
    "javascript", "typescript", "python", "java", "go", "rust", "php", "ruby", "swift", "kotlin",
    "dart", "c", "cpp", "csharp", "html", "css", "vue", "react", "angular", "nodejs", "express",
    "django", "flask", "spring", "laravel", "rails",
];

/// Language tags offered by the language selector
pub fn popular_languages() -> &'static [&'static str] {
    POPULAR_LANGUAGES
}

/// Star range applied in beginner mode, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarBand {
    pub min: u32,
    pub max: u32,
}

impl Default for StarBand {
    fn default() -> Self {
        Self { min: 10, max: 10_000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Search,
    Trending,
    Educational,
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    beginner_band: StarBand,
}

impl QueryBuilder {
    pub fn new(beginner_band: StarBand) -> Self {
        Self { beginner_band }
    }

    pub fn beginner_band(&self) -> StarBand {
        self.beginner_band
    }

    /// All query strings for `mode`. Plain search always yields exactly one.
    pub fn build(&self, mode: QueryMode, filters: &SearchFilters, now: DateTime<Utc>) -> Vec<String> {
        match mode {
            QueryMode::Search => vec![self.search_query(filters)],
            QueryMode::Trending => self.trending_queries(&filters.language, now),
            QueryMode::Educational => self.educational_queries(now),
        }
    }

    pub fn search_query(&self, filters: &SearchFilters) -> String {
        let text = filters.query.trim();
        let mut query = if text.is_empty() {
            FALLBACK_TERM.to_string()
        } else {
            text.to_string()
        };

        push_language(&mut query, &filters.language);

        if filters.beginner_mode {
            query.push(' ');
            query.push_str(&beginner_disjunction());
            query.push(' ');
            query.push_str(DOCS_HINT);
            query.push_str(&format!(
                " stars:{}..{}",
                self.beginner_band.min, self.beginner_band.max
            ));
        }

        query.push(' ');
        query.push_str(PUBLIC_CLAUSE);
        query
    }

    pub fn trending_queries(&self, language: &Language, now: DateTime<Utc>) -> Vec<String> {
        let since = date_threshold(now);
        let bases = [
            format!("pushed:>={} stars:>100", since),
            format!("created:>={} stars:>10", since),
            format!(
                "pushed:>={} (topic:education OR topic:learning OR topic:tutorial) stars:>20",
                since
            ),
            format!("pushed:>={} (topic:beginner OR topic:good-first-issue) stars:>5", since),
            format!("pushed:>={} (topic:awesome OR topic:resources) stars:>50", since),
        ];

        bases
            .into_iter()
            .map(|mut query| {
                push_language(&mut query, language);
                query.push(' ');
                query.push_str(PUBLIC_CLAUSE);
                query
            })
            .collect()
    }

    pub fn educational_queries(&self, now: DateTime<Utc>) -> Vec<String> {
        let since = date_threshold(now);

        let recent = EDUCATIONAL_TOPICS.iter().map(|(topic, floor)| {
            format!("pushed:>={} topic:{} stars:>{} {}", since, topic, floor, PUBLIC_CLAUSE)
        });
        let fallbacks = EDUCATIONAL_FALLBACKS
            .iter()
            .map(|(topic, floor)| format!("topic:{} stars:>{} {}", topic, floor, PUBLIC_CLAUSE));

        recent.chain(fallbacks).collect()
    }
}

fn push_language(query: &mut String, language: &Language) {
    if let Some(tag) = language.tag().filter(|t| !t.is_empty()) {
        query.push_str(" language:");
        query.push_str(tag);
    }
}

fn beginner_disjunction() -> String {
    let terms: Vec<String> = BEGINNER_TOPICS
        .iter()
        .map(|t| format!("topic:{}", t))
        .chain(BEGINNER_LABELS.iter().map(|l| format!("label:\"{}\"", l)))
        .collect();
    format!("({})", terms.join(" OR "))
}

/// `now - 24h` as a calendar date
fn date_threshold(now: DateTime<Utc>) -> String {
    (now - Duration::hours(24)).format("%Y-%m-%d").to_string()
}
