//! List site content

use anyhow::Result;

use crate::generator::Generator;
use crate::helpers::parse_timestamp;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let generator = Generator::new(blog, blog.content_source()?)?;

    match content_type {
        "post" | "posts" => {
            let page = generator.fetch_home().await?;
            println!("Posts ({}):", page.results.len());
            for post in &page.results {
                let date = post
                    .first_publication_date
                    .as_deref()
                    .and_then(parse_timestamp)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "----------".to_string());
                println!(
                    "  {} - {} [{}]",
                    date,
                    post.data.title,
                    post.uid.as_deref().unwrap_or("-")
                );
            }
            if let Some(next) = &page.next_page {
                println!("More: {}", next);
            }
        }
        "route" | "routes" => {
            let paths = generator.enumerate_paths().await?;
            println!("Routes ({}):", paths.len() + 1);
            println!("  /");
            for path in paths {
                println!("  {}", path.route);
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, route", content_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init::init_site;

    #[tokio::test]
    async fn test_list_types() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();
        let blog = Blog::new(dir.path()).unwrap();

        run(&blog, "post").await.unwrap();
        run(&blog, "route").await.unwrap();
        assert!(run(&blog, "tag").await.is_err());
    }
}
