//! Internationalization (i18n) support
//!
//! English and Brazilian Portuguese ship with the binary; files in the
//! site's language directory add languages or override single keys.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Built-in language tables
const BUILTIN: &[(&str, &str)] = &[
    ("en", include_str!("en.yml")),
    ("pt-BR", include_str!("pt-BR.yml")),
];

/// Internationalization handler
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, serde_yaml::Value>>,
}

impl I18n {
    /// Create a new i18n handler with the built-in tables loaded
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        for (lang, source) in BUILTIN {
            match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(source) {
                Ok(data) => {
                    translations.insert(lang.to_string(), data);
                }
                Err(e) => tracing::warn!("Invalid built-in language table {}: {}", lang, e),
            }
        }

        Self {
            language: language.to_string(),
            translations,
        }
    }

    /// Load language files from a directory. Keys in a file override the
    /// built-in table of the same language.
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                let ext = path.extension().and_then(|e| e.to_str());
                if matches!(ext, Some("yml") | Some("yaml") | Some("json")) {
                    let lang = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("en")
                        .to_string();

                    let content = fs::read_to_string(&path)?;

                    // Try to parse, skip invalid files
                    let data: Option<HashMap<String, serde_yaml::Value>> = if ext == Some("json") {
                        match serde_json::from_str::<serde_json::Value>(&content) {
                            Ok(json) => Some(convert_json_to_yaml(json)),
                            Err(e) => {
                                tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                                None
                            }
                        }
                    } else {
                        match serde_yaml::from_str(&content) {
                            Ok(data) => Some(data),
                            Err(e) => {
                                tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                                None
                            }
                        }
                    };

                    if let Some(data) = data {
                        self.translations.entry(lang).or_default().extend(data);
                        tracing::debug!("Loaded language file: {:?}", path);
                    }
                }
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key. Key can be nested like "menu.home"
    pub fn get(&self, key: &str) -> String {
        self.get_for_lang(&self.language, key)
    }

    /// Get a translation for a specific language
    pub fn get_for_lang(&self, lang: &str, key: &str) -> String {
        match self.lookup(lang, key) {
            Some(value) => yaml_value_to_string(value),
            // Return key as fallback
            None => key.to_string(),
        }
    }

    /// Get a list translation (e.g. month names)
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.lookup(&self.language, key) {
            Some(serde_yaml::Value::Sequence(items)) => {
                items.iter().map(yaml_value_to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Abbreviated month name, `month` in 1..=12
    pub fn month_short(&self, month: u32) -> String {
        self.month_from("months_short", month)
    }

    /// Full month name, `month` in 1..=12
    pub fn month_long(&self, month: u32) -> String {
        self.month_from("months", month)
    }

    fn month_from(&self, key: &str, month: u32) -> String {
        let names = self.get_list(key);
        month
            .checked_sub(1)
            .and_then(|i| names.get(i as usize))
            .cloned()
            .unwrap_or_else(|| format!("{:02}", month))
    }

    /// Current language first, English second
    fn lookup(&self, lang: &str, key: &str) -> Option<&serde_yaml::Value> {
        if let Some(value) = self
            .translations
            .get(lang)
            .and_then(|data| get_nested_value(data, key))
        {
            return Some(value);
        }

        if lang != "en" {
            return self
                .translations
                .get("en")
                .and_then(|data| get_nested_value(data, key));
        }

        None
    }

    /// Get all scalar translations for the current language as a flat HashMap
    /// This flattens nested keys using dot notation (e.g., "menu.home")
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();

        if let Some(lang_data) = self.translations.get(&self.language) {
            flatten_translations(lang_data, "", &mut result);
        }

        // Merge with English fallback for missing keys
        if self.language != "en" {
            if let Some(en_data) = self.translations.get("en") {
                let mut en_result = HashMap::new();
                flatten_translations(en_data, "", &mut en_result);
                for (k, v) in en_result {
                    result.entry(k).or_insert(v);
                }
            }
        }

        result
    }
}

/// Get a nested value from a YAML map using dot notation
fn get_nested_value<'a>(
    data: &'a HashMap<String, serde_yaml::Value>,
    key: &str,
) -> Option<&'a serde_yaml::Value> {
    let mut parts = key.split('.');
    let mut current = data.get(parts.next()?);

    for part in parts {
        match current {
            Some(serde_yaml::Value::Mapping(map)) => {
                current = map.get(serde_yaml::Value::String(part.to_string()));
            }
            _ => return None,
        }
    }

    current
}

/// Convert a YAML value to a string
fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        _ => format!("{:?}", value),
    }
}

/// Flatten translations into a HashMap with dot-notation keys
fn flatten_translations(
    data: &HashMap<String, serde_yaml::Value>,
    prefix: &str,
    result: &mut HashMap<String, String>,
) {
    for (key, value) in data {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            serde_yaml::Value::String(s) => {
                result.insert(full_key, s.clone());
            }
            serde_yaml::Value::Number(n) => {
                result.insert(full_key, n.to_string());
            }
            serde_yaml::Value::Bool(b) => {
                result.insert(full_key, b.to_string());
            }
            serde_yaml::Value::Mapping(map) => {
                let mut nested = HashMap::new();
                for (k, v) in map {
                    if let serde_yaml::Value::String(key_str) = k {
                        nested.insert(key_str.clone(), v.clone());
                    }
                }
                flatten_translations(&nested, &full_key, result);
            }
            _ => {}
        }
    }
}

/// Convert JSON value to YAML HashMap
fn convert_json_to_yaml(json: serde_json::Value) -> HashMap<String, serde_yaml::Value> {
    let mut result = HashMap::new();

    if let serde_json::Value::Object(obj) = json {
        for (key, value) in obj {
            result.insert(key, json_value_to_yaml(value));
        }
    }

    result
}

fn json_value_to_yaml(json: serde_json::Value) -> serde_yaml::Value {
    match json {
        serde_json::Value::Null => serde_yaml::Value::Null,
        serde_json::Value::Bool(b) => serde_yaml::Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_yaml::Value::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                serde_yaml::Value::Number(serde_yaml::Number::from(f))
            } else {
                serde_yaml::Value::Null
            }
        }
        serde_json::Value::String(s) => serde_yaml::Value::String(s),
        serde_json::Value::Array(arr) => {
            serde_yaml::Value::Sequence(arr.into_iter().map(json_value_to_yaml).collect())
        }
        serde_json::Value::Object(obj) => {
            let mut map = serde_yaml::Mapping::new();
            for (k, v) in obj {
                map.insert(serde_yaml::Value::String(k), json_value_to_yaml(v));
            }
            serde_yaml::Value::Mapping(map)
        }
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("en")
    }
}
