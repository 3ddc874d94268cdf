//! Static keyword lexicon used by the bubble analyzer.
//!
//! Every keyword is compiled once into a case-insensitive, whole-word
//! matcher, so "war" does not match inside "software". A keyword counts at
//! most once per text; the indicators measure how many distinct terms of a
//! category an article touches, not how often it repeats them.

use once_cell::sync::Lazy;
use regex::Regex;

const HYPE: &[&str] = &[
    "revolutionary",
    "breakthrough",
    "game-changer",
    "disruptive",
    "transformative",
    "unprecedented",
    "explosive growth",
    "skyrocketing",
    "soaring",
    "surge",
];

const INVESTMENT: &[&str] = &[
    "funding",
    "investment",
    "valuation",
    "ipo",
    "acquisition",
    "merger",
    "venture capital",
    "private equity",
    "billion",
    "million",
    "unicorn",
];

const SPECULATION: &[&str] = &[
    "bubble",
    "overvalued",
    "overheated",
    "speculation",
    "frenzy",
    "mania",
    "euphoria",
    "irrational exuberance",
    "tulip mania",
];

const COMPETITION: &[&str] = &[
    "race",
    "competition",
    "battle",
    "war",
    "arms race",
    "gold rush",
    "land grab",
    "market share",
    "dominance",
];

const REGULATORY: &[&str] = &[
    "regulation",
    "oversight",
    "compliance",
    "policy",
    "government",
    "legislation",
    "ban",
    "restriction",
    "ethics",
    "safety",
];

const MARKET: &[&str] = &["market", "valuation", "price", "stock", "trading"];

const FUTURE: &[&str] = &[
    "will",
    "expected",
    "projected",
    "forecast",
    "prediction",
    "anticipate",
];

const CONCERN: &[&str] = &["concern", "risk", "threat", "challenge", "problem", "issue"];

const POSITIVE: &[&str] = &[
    "growth",
    "gain",
    "gains",
    "profit",
    "profitable",
    "success",
    "successful",
    "strong",
    "optimistic",
    "opportunity",
    "boom",
    "record",
    "rally",
    "innovation",
    "breakthrough",
    "bullish",
    "confident",
    "promising",
    "thriving",
    "soaring",
    "surge",
    "outperform",
];

const NEGATIVE: &[&str] = &[
    "loss",
    "losses",
    "decline",
    "crash",
    "fall",
    "fear",
    "risk",
    "concern",
    "weak",
    "pessimistic",
    "layoffs",
    "bearish",
    "slump",
    "downturn",
    "warning",
    "threat",
    "collapse",
    "overvalued",
    "bubble",
    "lawsuit",
    "fraud",
    "uncertainty",
    "struggle",
];

/// A single keyword with its compiled matchers.
#[derive(Debug)]
pub struct Term {
    pub word: &'static str,
    matcher: Regex,
    context: Regex,
}

impl Term {
    fn new(word: &'static str) -> Self {
        let escaped = regex::escape(word);
        Self {
            word,
            matcher: Regex::new(&format!(r"(?i)\b{escaped}\b"))
                .expect("escaped keyword is a valid regex"),
            context: Regex::new(&format!(r"(?i).{{0,50}}\b{escaped}\b.{{0,50}}"))
                .expect("escaped keyword is a valid regex"),
        }
    }

    pub fn is_in(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }

    /// Up to `limit` snippets of at most 50 characters either side of the term.
    pub fn contexts<'t>(&self, text: &'t str, limit: usize) -> Vec<&'t str> {
        self.context.find_iter(text).take(limit).map(|m| m.as_str()).collect()
    }
}

/// The full keyword lexicon, grouped by category.
#[derive(Debug)]
pub struct Lexicon {
    pub hype: Vec<Term>,
    pub investment: Vec<Term>,
    pub speculation: Vec<Term>,
    pub competition: Vec<Term>,
    pub regulatory: Vec<Term>,
    pub market: Vec<Term>,
    pub future: Vec<Term>,
    pub concern: Vec<Term>,
    pub positive: Vec<Term>,
    pub negative: Vec<Term>,
}

impl Lexicon {
    fn build() -> Self {
        let terms =
            |words: &[&'static str]| words.iter().copied().map(Term::new).collect::<Vec<_>>();
        Self {
            hype: terms(HYPE),
            investment: terms(INVESTMENT),
            speculation: terms(SPECULATION),
            competition: terms(COMPETITION),
            regulatory: terms(REGULATORY),
            market: terms(MARKET),
            future: terms(FUTURE),
            concern: terms(CONCERN),
            positive: terms(POSITIVE),
            negative: terms(NEGATIVE),
        }
    }

    /// The five indicator categories, in the order key phrases are extracted.
    pub fn bubble_categories(&self) -> [&[Term]; 5] {
        [
            self.hype.as_slice(),
            self.investment.as_slice(),
            self.speculation.as_slice(),
            self.competition.as_slice(),
            self.regulatory.as_slice(),
        ]
    }
}

pub static LEXICON: Lazy<Lexicon> = Lazy::new(Lexicon::build);

/// `<number> billion|million`, e.g. "4.5 billion".
pub static LARGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+\.?\d*\s*(billion|million)\b").expect("static regex"));

/// Runs of capitalized words, a rough proxy for company and product names.
pub static CAPITALIZED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("static regex"));

/// Number of distinct terms from `terms` present in `text`.
pub fn count_present(terms: &[Term], text: &str) -> usize {
    terms.iter().filter(|t| t.is_in(text)).count()
}
