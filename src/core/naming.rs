//! Display names, ids and aliases derived from description text.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::schema::entity::{EntityId, EntityKind, IdBase};

/// Longest generated display name, in characters.
pub const MAX_NAME_LEN: usize = 50;

const ARTICLES: &[&str] = &["a", "an", "the"];

/// Words kept lower-case inside a title unless they lead it.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "the", "of", "in", "on", "at", "to", "and", "or", "for", "by", "with", "from",
];

const LOCATION_PREFIXES: &[&str] = &[
    "you are standing in ",
    "you are standing on ",
    "you are standing at ",
    "you are in ",
    "you are at ",
    "you are on ",
    "this is ",
];

const CLAUSE_ENDS: &[char] = &['.', ',', ';', ':', '!', '?', '(', '\n'];

/// A display name and whether it was cut to fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedName {
    pub name: String,
    pub truncated: bool,
}

/// Pull a display name out of description text.
///
/// Tries "You are in/at/on/standing in the X" and "This is the X" first,
/// then falls back to the first sentence. Returns `None` for text with no
/// words in it.
pub fn extract_name(text: &str, max_len: usize) -> Option<ExtractedName> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return None;
    }

    let raw = match_location_phrase(&flat).unwrap_or_else(|| first_sentence(&flat));
    let raw = raw.trim_matches(|c: char| !c.is_alphanumeric());
    if raw.is_empty() {
        return None;
    }

    let titled = title_case(raw);
    let (name, truncated) = bound(&titled, max_len);
    Some(ExtractedName { name, truncated })
}

fn match_location_phrase(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    for prefix in LOCATION_PREFIXES {
        if !lower.starts_with(prefix) {
            continue;
        }
        let mut rest = &text[prefix.len()..];
        for article in ARTICLES {
            let with_space = rest.get(..article.len() + 1);
            if with_space.is_some_and(|w| w.eq_ignore_ascii_case(&format!("{} ", article))) {
                rest = &rest[article.len() + 1..];
                break;
            }
        }
        let end = rest.find(CLAUSE_ENDS).unwrap_or(rest.len());
        let clause = rest[..end].trim();
        if !clause.is_empty() {
            return Some(clause);
        }
    }
    None
}

fn first_sentence(text: &str) -> &str {
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let next = bytes.get(i + 1);
            if next.is_none() || next == Some(&b' ') {
                return &text[..i];
            }
        }
    }
    text
}

/// Capitalize significant words; minor words stay lower-case after the first.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_ascii_lowercase();
            if i > 0 && MINOR_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn bound(name: &str, max_len: usize) -> (String, bool) {
    if name.chars().count() <= max_len {
        return (name.to_string(), false);
    }
    let cut: String = name.chars().take(max_len).collect();
    let at_word = match cut.rfind(' ') {
        Some(space) if space > 0 => &cut[..space],
        _ => cut.as_str(),
    };
    let trimmed = at_word.trim_end_matches(|c: char| !c.is_alphanumeric());
    (trimmed.to_string(), true)
}

/// Lower-case, drop everything but ASCII letters and digits, and join the
/// remaining words with single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Id for a name, or the index fallback when the name slugs to nothing.
pub fn id_base(name: &str, kind: EntityKind, index: usize) -> IdBase {
    let slug = slugify(name);
    if slug.is_empty() {
        IdBase::Index { kind, index }
    } else {
        IdBase::Slug(slug)
    }
}

/// Hands out ids that are unique across everything allocated so far.
/// The first claimant of a base keeps it bare; later ones get `-2`, `-3`, ...
#[derive(Debug, Default)]
pub struct IdAllocator {
    taken: FxHashSet<String>,
    next_suffix: FxHashMap<String, u32>,
    collisions: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-claim ids that already exist elsewhere.
    pub fn reserve<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.taken.extend(ids.into_iter().map(Into::into));
    }

    pub fn allocate(&mut self, base: IdBase) -> EntityId {
        let id = EntityId {
            base,
            suffix: None,
        };
        let base_str = id.base_str();
        if self.taken.insert(base_str.clone()) {
            return id;
        }

        self.collisions += 1;
        let counter = self.next_suffix.entry(base_str).or_insert(2);
        loop {
            let candidate = id.clone().with_suffix(*counter);
            *counter += 1;
            if self.taken.insert(candidate.to_string()) {
                log::debug!("id collision resolved as {}", candidate);
                return candidate;
            }
        }
    }

    /// How many allocations needed a suffix.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}

/// Lower-cased full name plus each non-article word longer than two
/// characters, without duplicates.
pub fn aliases(name: &str) -> Vec<String> {
    let full = name.trim().to_lowercase();
    if full.is_empty() {
        return Vec::new();
    }
    let mut out = vec![full.clone()];
    for word in full.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if word.chars().count() <= 2 || ARTICLES.contains(&word) {
            continue;
        }
        if !out.iter().any(|a| a == word) {
            out.push(word.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> String {
        extract_name(text, MAX_NAME_LEN).unwrap().name
    }

    #[test]
    fn you_are_in_pattern() {
        assert_eq!(
            name("You are in the kitchen of the white house. A table seems to have been used."),
            "Kitchen of the White House"
        );
        assert_eq!(name("You are at the top of a steep cliff."), "Top of a Steep Cliff");
        assert_eq!(
            name("You are standing in an open field west of a white house, with a boarded front door."),
            "Open Field West of a White House"
        );
    }

    #[test]
    fn this_is_pattern() {
        assert_eq!(name("This is the attic. The only exit is stairs."), "Attic");
    }

    #[test]
    fn first_sentence_fallback() {
        assert_eq!(name("West of House"), "West of House");
        assert_eq!(name("Dam Lobby. There are exits here."), "Dam Lobby");
        assert_eq!(name("brass lantern"), "Brass Lantern");
    }

    #[test]
    fn multi_line_text_is_flattened() {
        assert_eq!(name("  Maze\n of twisty passages.  "), "Maze of Twisty Passages");
    }

    #[test]
    fn empty_text_has_no_name() {
        assert!(extract_name("   ", MAX_NAME_LEN).is_none());
        assert!(extract_name("...", MAX_NAME_LEN).is_none());
    }

    #[test]
    fn long_names_cut_at_word_boundary() {
        let text = "Enormous cavern whose ceiling is lost in darkness far overhead and echoing";
        let extracted = extract_name(text, 30).unwrap();
        assert!(extracted.truncated);
        assert!(extracted.name.chars().count() <= 30);
        assert!(!extracted.name.ends_with(' '));
        assert_eq!(extracted.name, "Enormous Cavern Whose Ceiling");
    }

    #[test]
    fn slug_rules() {
        assert_eq!(slugify("West of House"), "west-of-house");
        assert_eq!(slugify("  Dam  Lobby's -- Entrance! "), "dam-lobbys-entrance");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("Round-Room"), "round-room");
    }

    #[test]
    fn id_base_falls_back_to_index() {
        assert_eq!(
            id_base("???", EntityKind::Room, 7),
            IdBase::Index {
                kind: EntityKind::Room,
                index: 7
            }
        );
        assert_eq!(
            id_base("Attic", EntityKind::Room, 7),
            IdBase::Slug("attic".to_string())
        );
    }

    #[test]
    fn allocation_is_deterministic_and_suffixes_collisions() {
        let mut a = IdAllocator::new();
        let first = a.allocate(id_base("Forest", EntityKind::Room, 1));
        let second = a.allocate(id_base("Forest", EntityKind::Room, 2));
        let third = a.allocate(id_base("forest", EntityKind::Room, 3));
        assert_eq!(first.to_string(), "forest");
        assert_eq!(second.to_string(), "forest-2");
        assert_eq!(third.to_string(), "forest-3");
        assert_eq!(a.collisions(), 2);

        let mut b = IdAllocator::new();
        assert_eq!(b.allocate(id_base("Forest", EntityKind::Room, 9)), first);
    }

    #[test]
    fn suffix_skips_ids_already_taken() {
        let mut a = IdAllocator::new();
        a.reserve(["kitchen", "kitchen-2"]);
        assert_eq!(
            a.allocate(IdBase::Slug("kitchen".to_string())).to_string(),
            "kitchen-3"
        );
    }

    #[test]
    fn alias_generation() {
        assert_eq!(
            aliases("Brass Lantern"),
            vec!["brass lantern", "brass", "lantern"]
        );
        assert_eq!(aliases("The Box"), vec!["the box", "box"]);
        assert_eq!(aliases("Sword"), vec!["sword"]);
        assert_eq!(aliases("an ax of it"), vec!["an ax of it"]);
        assert!(aliases("").is_empty());
    }
}
