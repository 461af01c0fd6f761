//! Lexical search: query parsing, expansion, fuzzy ranking and presentation.

mod category;
mod engine;
mod expand;
mod fuzzy;
mod query;
mod snippet;
mod stemmer;

pub use category::{CATEGORY_PRIORITY, Category, classify};
pub use engine::{
    ResultType, SearchEngine, SearchHit, SearchOptions, SearchResponse, normalize_query_key,
};
pub use expand::{MAX_QUERY_VARIANTS, SynonymDictionary, expand_query};
pub use fuzzy::{FieldWeights, RankingProfile, levenshtein_bounded, passes_threshold, score_document};
pub use query::{FieldFilter, ParsedQuery, matches_predicate, parse_query};
pub use snippet::{extract_snippet, highlight, highlight_pattern};
pub use stemmer::{Script, Stemmer, StemmerRegistry, SuffixTableStemmer, detect_script};
