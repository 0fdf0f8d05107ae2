use crate::html::visible_text;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref RUSSIAN: Stemmer = Stemmer::create(Algorithm::Russian);
    static ref ENGLISH: Stemmer = Stemmer::create(Algorithm::English);
    // Closed word classes that carry no meaning of their own:
    // conjunctions, particles, prepositions and interjections.
    static ref FUNCTION_WORDS: HashSet<&'static str> = {
        let russian: &[&str] = &[
            // prepositions
            "в","во","без","до","из","к","ко","на","по","о","об","обо","от","ото","перед","передо","при",
            "через","с","со","у","за","над","надо","под","подо","про","для","между","меж","среди","вокруг",
            "около","после","кроме","вместо","вдоль","возле","мимо","сквозь","ради","благодаря","согласно",
            // conjunctions
            "и","а","но","или","либо","да","зато","однако","что","чтобы","чтоб","если","когда","пока","хотя",
            "хоть","потому","поэтому","так","как","будто","словно","точно","ибо","тоже","также","ни","то",
            "причем","притом","раз","едва","лишь","коли","дабы",
            // particles
            "не","же","ли","бы","б","ль","вот","вон","даже","уже","еще","ещё","только","разве","неужели",
            "ведь","пусть","пускай","давай","именно","почти","ка","таки","нет","ну",
            // interjections
            "ах","ох","эх","ой","ай","ого","увы","ура","эй","ага","угу","ух","фу","тьфу","ахах","хм","браво",
        ];
        let english: &[&str] = &[
            // articles, treated as particles
            "a","an","the",
            // prepositions
            "about","above","across","after","against","along","amid","among","around","at","before",
            "behind","below","beneath","beside","besides","between","beyond","by","despite","down","during",
            "except","for","from","in","inside","into","near","of","off","on","onto","out","outside","over",
            "past","per","since","through","throughout","till","to","toward","towards","under","underneath",
            "until","up","upon","via","with","within","without",
            // conjunctions
            "and","or","but","nor","so","yet","if","because","although","though","unless","whereas","while",
            "whether","than","that","once","whenever","wherever","either","neither","both",
            // particles
            "not","no","yes","just","only","even","also","too","very",
            // interjections
            "oh","ah","wow","hey","alas","oops","ouch","hmm","hooray","hello","hi","bravo",
        ];
        russian.iter().chain(english.iter()).copied().collect()
    };
}

fn is_function_word(token: &str) -> bool {
    FUNCTION_WORDS.contains(token)
}

fn is_cyrillic(c: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&c)
}

/// ASCII plus the Latin-1 and Latin Extended-A/B letters.
fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic() || (c.is_alphabetic() && ('\u{00C0}'..='\u{024F}').contains(&c))
}

/// Fold one lower-cased word form to its root, picking the stemmer by script.
fn root(token: &str) -> String {
    if token.chars().any(is_cyrillic) {
        RUSSIAN.stem(token).into_owned()
    } else if token.chars().all(|c| is_latin(c) || c.is_ascii_digit() || c == '\'' || c == '_') {
        ENGLISH.stem(token).into_owned()
    } else {
        token.to_string()
    }
}

fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase().replace('ё', "е")
}

/// Normalized meaningful word forms of `text`, in order of appearance.
fn words(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    WORD.find_iter(&normalized)
        .map(|m| m.as_str().trim_end_matches('\'').to_string())
        .filter(|w| !w.is_empty() && !is_function_word(w))
        .collect()
}

/// Byte ranges of the raw words of `text`, without normalization.
pub fn word_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    WORD.find_iter(text).map(|m| (m.start(), m.end()))
}

/// Lemma of a single word form, `None` for function words.
pub fn lemma_of(word: &str) -> Option<String> {
    let normalized = normalize(word);
    let word = normalized.trim_end_matches('\'');
    if word.is_empty() || is_function_word(word) {
        return None;
    }
    let lemma = root(word);
    (!lemma.is_empty()).then_some(lemma)
}

/// Count lemma occurrences in plain text. Word forms sharing a root are summed.
pub fn analyze(text: &str) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for word in words(text) {
        let lemma = root(&word);
        if lemma.is_empty() {
            continue;
        }
        *counts.entry(lemma).or_insert(0) += 1;
    }
    counts
}

/// Lemma counts of a page's visible text.
pub fn analyze_html(html: &str) -> HashMap<String, u32> {
    analyze(&visible_text(html))
}

/// Unique lemmas of a search phrase.
pub fn lemma_set(text: &str) -> HashSet<String> {
    analyze(text).into_keys().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_forms_fold_to_one_root() {
        let counts = analyze("Running, runner's run! Runs.");
        assert_eq!(counts.get("run"), Some(&3));
    }

    #[test]
    fn russian_forms_are_summed() {
        let counts = analyze("Лес, леса и лесу");
        assert_eq!(counts.get("лес"), Some(&3));
        assert!(!counts.contains_key("и"));
    }

    #[test]
    fn single_words_share_lemmas_with_text() {
        assert_eq!(lemma_of("Running").as_deref(), Some("run"));
        assert_eq!(lemma_of("the"), None);
        assert_eq!(lemma_of("Лесу").as_deref(), Some("лес"));
    }

    #[test]
    fn accented_latin_words_are_stemmed() {
        assert_eq!(lemma_of("cafés"), lemma_of("café"));
        assert_eq!(analyze("Café cafés").get("café"), Some(&2));
    }

    #[test]
    fn yo_is_folded() {
        assert_eq!(lemma_set("ЕЩЁ ёлка"), lemma_set("елка"));
    }
}
