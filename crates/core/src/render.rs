//! MDX rendering for blog posts committed to the site repository.
//!
//! A rendered post is a self-contained MDX module: component imports, one
//! import per generated image, an exported `meta` object the site's article
//! layout reads, and the markdown body with image placeholders expanded.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use crate::image::ImageAsset;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Directory (relative to the site repository root) that post files live in.
pub const POST_DIR: &str = "src/pages/blog";

/// Regex pattern matching `{{image:N}}` body placeholders (1-based).
pub const IMAGE_PLACEHOLDER_PATTERN: &str = r"\{\{image:(\d+)\}\}";

static IMAGE_PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IMAGE_PLACEHOLDER_PATTERN).expect("valid regex"));

const COMPONENT_IMPORTS: &str = "import { ArticleLayout } from '@/components/ArticleLayout'\n\
                                 import Image from 'next/image'";

const LAYOUT_EXPORT: &str =
    "export default (props) => <ArticleLayout meta={meta} {...props} />";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything needed to render one post file.
#[derive(Debug, Clone)]
pub struct PostDocument<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub content: &'a str,
    pub author: &'a str,
    pub date: NaiveDate,
    pub leader_image: Option<ImageAsset>,
    /// Body image slots in position order; `{{image:1}}` refers to the
    /// first. `None` is an image that has not been uploaded yet.
    pub body_images: Vec<Option<ImageAsset>>,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Path of the post file inside the site repository.
pub fn post_file_path(slug: &str) -> String {
    format!("{POST_DIR}/{slug}.mdx")
}

/// Render a post to MDX.
pub fn render_post(doc: &PostDocument<'_>) -> String {
    let mut out = String::new();

    out.push_str(COMPONENT_IMPORTS);
    out.push('\n');
    for statement in image_imports(doc) {
        out.push_str(&statement);
        out.push('\n');
    }

    out.push_str("\nexport const meta = {\n");
    out.push_str(&format!("  author: '{}',\n", escape_js(doc.author)));
    out.push_str(&format!("  date: '{}',\n", doc.date.format("%Y-%m-%d")));
    out.push_str(&format!("  title: '{}',\n", escape_js(doc.title)));
    out.push_str(&format!("  description: '{}',\n", escape_js(doc.summary)));
    if let Some(leader) = &doc.leader_image {
        out.push_str(&format!("  image: {},\n", leader.variable_name()));
    }
    out.push_str("}\n\n");

    out.push_str(LAYOUT_EXPORT);
    out.push_str("\n\n");

    out.push_str(&render_body(doc.content, &doc.body_images));
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Import statements for the leader image and then each body image,
/// skipping duplicates (two prompts can collapse to the same key).
fn image_imports(doc: &PostDocument<'_>) -> Vec<String> {
    let mut seen = HashSet::new();
    doc.leader_image
        .iter()
        .chain(doc.body_images.iter().flatten())
        .filter(|image| seen.insert(image.variable_name()))
        .map(ImageAsset::import_statement)
        .collect()
}

/// Expand `{{image:N}}` placeholders; images never referenced are appended.
/// Placeholders for empty slots stay as they are.
fn render_body(content: &str, images: &[Option<ImageAsset>]) -> String {
    let mut used = vec![false; images.len()];

    let expanded = IMAGE_PLACEHOLDER_RE.replace_all(content, |caps: &Captures<'_>| {
        let index = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|i| *i < images.len());
        match index.and_then(|i| images[i].as_ref().map(|image| (i, image))) {
            Some((i, image)) => {
                used[i] = true;
                image.render_tag()
            }
            None => caps[0].to_string(),
        }
    });

    let mut body = expanded.trim_end().to_string();
    let unused = images
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .filter_map(|(image, _)| image.as_ref());
    for image in unused {
        body.push_str("\n\n");
        body.push_str(&image.render_tag());
    }
    body
}

/// Escape a value for a single-quoted JS string literal.
fn escape_js(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}
