use icu_locale::Locale;
use icu_plurals::{PluralCategory, PluralRuleType, PluralRules};
use tracing::debug;

/// Candidate numbers for detecting which categories a language uses.
const CATEGORY_PROBES: [(PluralCategory, &[usize]); 6] = [
    (PluralCategory::Zero, &[0]),
    (PluralCategory::One, &[1, 21, 31, 41]),
    (PluralCategory::Two, &[2, 22, 32]),
    (PluralCategory::Few, &[3, 4, 23, 24]),
    (PluralCategory::Many, &[5, 11, 101]),
    (PluralCategory::Other, &[6, 7, 8, 9, 10, 25, 100, 1000]),
];

fn rules_for(locale: &str) -> Option<PluralRules> {
    let parsed: Locale = match locale.parse() {
        Ok(l) => l,
        Err(e) => {
            debug!("Cannot parse locale '{}' for plural rules: {}", locale, e);
            return None;
        }
    };
    PluralRules::try_new(parsed.into(), PluralRuleType::Cardinal.into())
        .map_err(|e| debug!("No plural rules for locale '{}': {}", locale, e))
        .ok()
}

/// Categories used by the language, in the order MediaWiki expects the
/// forms of a `{{PLURAL:...}}` to be written.
pub fn plural_categories(locale: &str) -> Vec<PluralCategory> {
    let Some(rules) = rules_for(locale) else {
        return vec![PluralCategory::One, PluralCategory::Other];
    };
    CATEGORY_PROBES
        .iter()
        .filter(|(category, probes)| {
            probes
                .iter()
                .any(|&n| rules.category_for(n) == *category)
        })
        .map(|(category, _)| *category)
        .collect()
}

/// Pick the form for `count` among `forms`. Missing trailing forms fall back
/// to the last one given.
pub fn plural_form<'a>(locale: &str, count: usize, forms: &'a [String]) -> Option<&'a str> {
    let last = forms.last()?;
    let categories = plural_categories(locale);
    let category = match rules_for(locale) {
        Some(rules) => rules.category_for(count),
        None if count == 1 => PluralCategory::One,
        None => PluralCategory::Other,
    };
    let position = categories.iter().position(|c| *c == category);
    Some(
        position
            .and_then(|i| forms.get(i))
            .unwrap_or(last)
            .as_str(),
    )
}
