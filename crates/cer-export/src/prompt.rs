//! Generation prompt and cover metadata.

use std::sync::LazyLock;

use cer_config::AuthorConfig;
use chrono::{Local, NaiveDate};
use regex::{Captures, Regex};

const PROMPT_TEMPLATE: &str = include_str!("prompt.md");

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("invalid regex"));

/// Text used when no resources are provided.
const NO_RESOURCES: &str = "Aucune ressource fournie, utilise tes connaissances.";

/// Cover-page details written at the top of the generated report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorInfo {
    pub name: String,
    pub promo: String,
    pub bloc: String,
    pub title: String,
    /// Display date, `dd/mm/yyyy`.
    pub date: String,
}

impl Default for AuthorInfo {
    fn default() -> Self {
        Self {
            name: "NOM Prénom".to_owned(),
            promo: "A3 FISA Info".to_owned(),
            bloc: "Bloc X".to_owned(),
            title: "Prosit X".to_owned(),
            date: Local::now().format("%d/%m/%Y").to_string(),
        }
    }
}

impl AuthorInfo {
    /// Fill missing or blank fields from the defaults.
    ///
    /// ISO dates (`yyyy-mm-dd`) are shown as `dd/mm/yyyy`; any other date
    /// text is kept as written.
    pub fn from_config(config: &AuthorConfig) -> Self {
        let defaults = Self::default();
        let pick = |value: &Option<String>, default: String| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map_or(default, str::to_owned)
        };

        Self {
            name: pick(&config.name, defaults.name),
            promo: pick(&config.promo, defaults.promo),
            bloc: pick(&config.bloc, defaults.bloc),
            title: pick(&config.title, defaults.title),
            date: config
                .date
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map_or(defaults.date, format_date),
        }
    }
}

/// Convert `yyyy-mm-dd` to `dd/mm/yyyy`, leaving other text unchanged.
pub fn format_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_or_else(|_| date.to_owned(), |d| d.format("%d/%m/%Y").to_string())
}

/// Build the prompt sent to the generation service.
///
/// The prompt fixes the report layout: cover lines, then the
/// `## Introduction`, `## Recherches & Expérimentations` and `## Bilan`
/// sections with their subsections.
pub fn build_prompt(notes: &str, resources: Option<&str>, author: &AuthorInfo) -> String {
    let resources = resources
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(NO_RESOURCES);

    let notes = notes.trim();
    PLACEHOLDER_RE
        .replace_all(PROMPT_TEMPLATE, |caps: &Captures| match &caps[1] {
            "notes" => notes.to_owned(),
            "resources" => resources.to_owned(),
            "name" => author.name.clone(),
            "promo" => author.promo.clone(),
            "bloc" => author.bloc.clone(),
            "title" => author.title.clone(),
            "date" => author.date.clone(),
            _ => caps[0].to_owned(),
        })
        .into_owned()
}
