//! Translation lookup.
//!
//! Catalogs are flat JSON maps from dotted keys to messages, bundled with the
//! binary. `{{name}}` placeholders are filled from the supplied parameters.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

type Catalog = HashMap<String, String>;

const BUNDLED: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en.json")),
    ("uk", include_str!("../locales/uk.json")),
];

/// Message lookup for one language.
#[derive(Debug, Clone)]
pub struct Translator {
    lang: String,
    catalog: Arc<Catalog>,
}

impl Translator {
    /// Translator without messages; every lookup returns its key.
    pub fn empty(lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
            catalog: Arc::new(Catalog::new()),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Message for `key`, or the key itself when it is missing.
    pub fn t(&self, key: &str) -> String {
        self.catalog.get(key).cloned().unwrap_or_else(|| key.to_string())
    }

    /// Message for `key` with `{{name}}` placeholders replaced.
    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        params.iter().fold(self.t(key), |message, (name, value)| {
            message.replace(&format!("{{{{{name}}}}}"), value)
        })
    }
}

/// All bundled catalogs.
#[derive(Debug, Clone)]
pub struct Locales {
    catalogs: HashMap<String, Arc<Catalog>>,
    default_lang: String,
}

impl Locales {
    /// Loads the bundled catalogs. `default_lang` must be one of them.
    pub fn bundled(default_lang: &str) -> Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in BUNDLED {
            let catalog: Catalog = serde_json::from_str(raw)
                .with_context(|| format!("Invalid translation catalog for {lang}"))?;
            catalogs.insert(lang.to_string(), Arc::new(catalog));
        }

        anyhow::ensure!(
            catalogs.contains_key(default_lang),
            "DEFAULT_LANG_KEY {default_lang:?} has no bundled catalog"
        );

        Ok(Self {
            catalogs,
            default_lang: default_lang.to_string(),
        })
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    /// Available language keys, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.catalogs.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    /// Language to use for a user's stored preference.
    pub fn resolve<'a>(&'a self, lang: Option<&'a str>) -> &'a str {
        match lang {
            Some(lang) if self.supports(lang) => lang,
            _ => &self.default_lang,
        }
    }

    /// Translator for `lang`, falling back to the default language.
    pub fn translator(&self, lang: &str) -> Translator {
        let lang = self.resolve(Some(lang));
        Translator {
            lang: lang.to_string(),
            catalog: self.catalogs.get(lang).cloned().unwrap_or_default(),
        }
    }
}

/// Human readable size using decimal units, e.g. `3.1 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    let formatted = format!("{value:.1}");
    let formatted = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{formatted} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalogs_load_and_share_keys() {
        let locales = Locales::bundled("en").unwrap();
        assert_eq!(locales.languages(), vec!["en", "uk"]);

        let en = &locales.catalogs["en"];
        let uk = &locales.catalogs["uk"];
        let mut missing: Vec<&String> = en.keys().filter(|k| !uk.contains_key(*k)).collect();
        missing.sort();
        assert!(missing.is_empty(), "uk catalog is missing {missing:?}");
    }

    #[test]
    fn unknown_default_language_is_rejected() {
        assert!(Locales::bundled("xx").is_err());
    }

    #[test]
    fn lookup_falls_back_to_key_and_default_language() {
        let locales = Locales::bundled("en").unwrap();
        let t = locales.translator("de");
        assert_eq!(t.lang(), "en");
        assert_eq!(t.t("dashboard.account.form.none"), "None");
        assert_eq!(t.t("no.such.key"), "no.such.key");
        assert_eq!(locales.translator("uk").t("dashboard.account.form.none"), "Не вказано");
    }

    #[test]
    fn placeholders_are_interpolated() {
        let locales = Locales::bundled("en").unwrap();
        let message = locales
            .translator("en")
            .t_with("dashboard.account.form.avatar.dropHelperText", &[("maxSize", "3.1 MB")]);
        assert!(message.ends_with("max size of 3.1 MB"), "{message}");
    }

    #[test]
    fn resolve_prefers_supported_user_language() {
        let locales = Locales::bundled("en").unwrap();
        assert_eq!(locales.resolve(Some("uk")), "uk");
        assert_eq!(locales.resolve(Some("")), "en");
        assert_eq!(locales.resolve(None), "en");
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1500), "1.5 KB");
        assert_eq!(format_bytes(3_145_728), "3.1 MB");
        assert_eq!(format_bytes(2_000_000), "2 MB");
    }
}
