//! Generate static files

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::cache::{self, Manifest};
use crate::generator::Generator;
use crate::Blog;

/// Generate the static site (with incremental support)
pub async fn run(blog: &Blog) -> Result<()> {
    run_with_options(blog, false).await
}

/// Generate with force option
pub async fn run_with_options(blog: &Blog, force: bool) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog, blog.content_source()?)?;
    let pages = generator.build_site().await?;
    tracing::info!("Rendered {} pages", pages.len());

    let mut manifest = if force {
        Manifest::new()
    } else {
        Manifest::load(&blog.base_dir)
    };

    let hashed: Vec<_> = pages
        .iter()
        .map(|p| (p.route.clone(), cache::hash_content(&p.html)))
        .collect();
    let changeset = manifest.plan(&blog.public_dir, &hashed);

    if changeset.has_changes() {
        tracing::info!("Changes detected: {}", changeset.summary());
    } else {
        tracing::info!("No page changes detected");
    }

    fs::create_dir_all(&blog.public_dir)?;

    for page in pages.iter().filter(|p| changeset.changed.contains(&p.route)) {
        let output_path = blog.public_dir.join(cache::output_path(&page.route));
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(&output_path, &page.html)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);
    }

    for (route, output) in &changeset.removed {
        remove_output(&blog.public_dir, output)?;
        tracing::debug!("Removed: {}", route);
    }

    copy_static_assets(&blog.static_dir, &blog.public_dir)?;

    let entries: Vec<_> = hashed
        .into_iter()
        .map(|(route, hash)| {
            let output = cache::output_path(&route);
            (route, hash, output)
        })
        .collect();
    manifest.update(&entries, Utc::now());
    manifest.save(&blog.base_dir)?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}

/// Delete a generated page and its directory when it becomes empty
fn remove_output(public_dir: &Path, output: &str) -> Result<()> {
    let path = public_dir.join(output);
    if path.exists() {
        fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
    }
    if let Some(parent) = path.parent() {
        if parent != public_dir && fs::read_dir(parent).map(|mut d| d.next().is_none())? {
            fs::remove_dir(parent)?;
        }
    }
    Ok(())
}

/// Copy static assets (images, styles, etc.) to the public directory
fn copy_static_assets(static_dir: &Path, public_dir: &Path) -> Result<()> {
    if !static_dir.exists() {
        return Ok(());
    }

    for entry in WalkDir::new(static_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if path.is_file() {
            let relative = path.strip_prefix(static_dir)?;
            let dest = public_dir.join(relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::copy(path, &dest)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init::init_site;
    use serde_json::json;

    fn write_fixtures(dir: &Path, uids: &[&str]) {
        let docs: Vec<_> = uids
            .iter()
            .map(|uid| {
                json!({
                    "id": uid.to_uppercase(),
                    "uid": uid,
                    "type": "posts",
                    "first_publication_date": "2021-03-15T19:25:28+0000",
                    "data": {
                        "title": format!("Title {}", uid),
                        "subtitle": "Sub",
                        "author": "Ana",
                        "content": []
                    }
                })
            })
            .collect();
        fs::write(
            dir.join("fixtures.json"),
            serde_json::to_string(&docs).unwrap(),
        )
        .unwrap();
        fs::write(dir.join("_config.yml"), "cms:\n  fixtures: fixtures.json\n").unwrap();
    }

    #[tokio::test]
    async fn test_generate_writes_pages_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path(), &["a", "b"]);
        fs::create_dir_all(dir.path().join("static/img")).unwrap();
        fs::write(dir.path().join("static/img/logo.svg"), "<svg/>").unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        run(&blog).await.unwrap();

        let public = dir.path().join("public");
        let home = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(home.contains("Title a"));
        assert!(public.join("post/a/index.html").exists());
        assert!(public.join("post/b/index.html").exists());
        assert!(public.join("img/logo.svg").exists());
        assert_eq!(Manifest::load(dir.path()).routes.len(), 4);
    }

    #[tokio::test]
    async fn test_static_load_more_link_leads_to_next_page() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path(), &["a", "b"]);
        run(&Blog::new(dir.path()).unwrap()).await.unwrap();

        let public = dir.path().join("public");
        let home = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(!home.contains("Title b"));

        let href = home
            .split("class=\"load-more\" href=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .replace("&#x2F;", "/");
        assert_eq!(href, "/page/2/");

        let next = fs::read_to_string(public.join(href.trim_matches('/')).join("index.html")).unwrap();
        let a = next.find("Title a").unwrap();
        let b = next.find("Title b").unwrap();
        assert!(a < b);
        assert!(!next.contains("class=\"load-more\""));
    }

    #[tokio::test]
    async fn test_rerun_removes_deleted_posts() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path(), &["a", "b"]);
        run(&Blog::new(dir.path()).unwrap()).await.unwrap();

        write_fixtures(dir.path(), &["a"]);
        run(&Blog::new(dir.path()).unwrap()).await.unwrap();

        let public = dir.path().join("public");
        assert!(public.join("post/a/index.html").exists());
        assert!(!public.join("post/b").exists());
        assert!(!Manifest::load(dir.path()).routes.contains_key("/post/b"));
    }

    #[tokio::test]
    async fn test_rerun_skips_unchanged_pages() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path(), &["a"]);
        let blog = Blog::new(dir.path()).unwrap();
        run(&blog).await.unwrap();

        let page = dir.path().join("public/post/a/index.html");
        fs::write(&page, "untouched").unwrap();
        run(&blog).await.unwrap();
        assert_eq!(fs::read_to_string(&page).unwrap(), "untouched");

        run_with_options(&blog, true).await.unwrap();
        assert!(fs::read_to_string(&page).unwrap().contains("Title a"));
    }

    #[tokio::test]
    async fn test_generate_fails_without_source() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();
        fs::write(dir.path().join("_config.yml"), "title: x\n").unwrap();

        let mut blog = Blog::new(dir.path()).unwrap();
        blog.config.cms.endpoint.clear();
        blog.config.cms.fixtures = None;
        assert!(run(&blog).await.is_err());
    }
}
