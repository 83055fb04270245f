//! Initialize a new blog

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
language: en
timezone: UTC

# URL
url: http://localhost:3000
root: /

# Directory
public_dir: public
static_dir: static
i18n_dir: languages

# Date format (Moment.js tokens)
date_format: DD MMM YYYY

# Content source
# PRISMIC_API_ENDPOINT and PRISMIC_ACCESS_TOKEN override endpoint and token.
cms:
  endpoint: ''
  document_type: posts
  page_size: 1
  # Serve documents from a local file instead of the API
  fixtures: fixtures/posts.json

# Reading time
reading_time:
  words_per_minute: 200
  empty_post: zero

# Regeneration
revalidate: 86400
fallback: placeholder
max_loaded_pages: 50
"#;

const SAMPLE_POSTS: &str = r#"[
  {
    "id": "WELCOME",
    "uid": "welcome-aboard",
    "type": "posts",
    "first_publication_date": "2021-03-15T19:25:28+0000",
    "data": {
      "title": "Welcome aboard",
      "subtitle": "Your first post, served from a local fixture file",
      "author": "spacetraveling",
      "banner": { "url": null },
      "content": [
        {
          "heading": "Getting started",
          "body": [
            {
              "type": "paragraph",
              "text": "Point cms.endpoint at your Prismic repository and remove cms.fixtures to publish real posts.",
              "spans": [{ "start": 6, "end": 18, "type": "strong" }]
            }
          ]
        }
      ]
    }
  }
]
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    // Create directory structure
    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("static"))?;
    fs::create_dir_all(target_dir.join("languages"))?;
    fs::create_dir_all(target_dir.join("fixtures"))?;

    write_if_missing(&target_dir.join("_config.yml"), CONFIG_TEMPLATE)?;
    write_if_missing(&target_dir.join("fixtures/posts.json"), SAMPLE_POSTS)?;

    Ok(())
}

/// Keep files the user already has
fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        tracing::warn!("{:?} already exists, leaving it untouched", path);
        return Ok(());
    }
    fs::write(path, content)?;
    Ok(())
}
