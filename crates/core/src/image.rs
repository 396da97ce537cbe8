//! Naming rules for generated post images.
//!
//! One prompt text determines everything about an image: its object-storage
//! key, its path inside the site repository, the JS identifier it is imported
//! as, and its alt text.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length of an image key derived from a prompt.
pub const MAX_KEY_LENGTH: usize = 35;

/// Directory (relative to the site repository root) that images are written to.
pub const REPO_IMAGE_DIR: &str = "src/images";

/// Module alias the site uses to import from [`REPO_IMAGE_DIR`].
pub const IMPORT_IMAGE_DIR: &str = "@/images";

/// Role an image plays in a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// Hero image, referenced from the post's `meta.image`.
    Leader,
    /// Inline image rendered inside the body.
    Body,
}

impl ImageKind {
    /// Database `kind` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::Body => "body",
        }
    }

    /// Parse from the database `kind` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "leader" => Ok(Self::Leader),
            "body" => Ok(Self::Body),
            other => Err(CoreError::Validation(format!(
                "Unknown image kind '{other}'"
            ))),
        }
    }
}

/// A generated image identified by the key derived from its prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    key: String,
}

impl ImageAsset {
    /// Derive an image from its prompt text.
    ///
    /// The key is the trimmed prompt, lowercased, with everything except
    /// `[a-z0-9_]` and whitespace removed, whitespace runs replaced by `-`,
    /// and truncated to [`MAX_KEY_LENGTH`] characters.
    pub fn from_prompt(prompt: &str) -> Result<Self, CoreError> {
        let key = key_from_prompt(prompt);
        if key.is_empty() {
            return Err(CoreError::Validation(format!(
                "Image prompt '{prompt}' does not contain any usable characters"
            )));
        }
        Ok(Self { key })
    }

    /// Object-storage key for the image.
    pub fn object_key(&self) -> &str {
        &self.key
    }

    /// Public URL of the image under `base_url`.
    pub fn public_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.key)
    }

    /// Path of the image file inside the site repository.
    pub fn repo_path(&self) -> String {
        format!("{REPO_IMAGE_DIR}/{}.png", self.key)
    }

    /// Module path used in the import statement.
    pub fn import_path(&self) -> String {
        format!("{IMPORT_IMAGE_DIR}/{}.png", self.key)
    }

    /// JS identifier the image is imported as, e.g. `aBananaRobbingABankImage`.
    pub fn variable_name(&self) -> String {
        let camel = to_camel_case(&self.key);
        if camel.starts_with(|c: char| c.is_ascii_digit()) {
            format!("img{camel}Image")
        } else {
            format!("{camel}Image")
        }
    }

    /// Alt text: the key with hyphens turned back into spaces.
    pub fn alt_text(&self) -> String {
        self.key.replace('-', " ")
    }

    /// `import fooImage from '@/images/foo.png'`
    pub fn import_statement(&self) -> String {
        format!(
            "import {} from '{}'",
            self.variable_name(),
            self.import_path()
        )
    }

    /// `<Image src={fooImage} alt="foo" />`
    pub fn render_tag(&self) -> String {
        format!(
            "<Image src={{{}}} alt=\"{}\" />",
            self.variable_name(),
            self.alt_text()
        )
    }
}

fn key_from_prompt(prompt: &str) -> String {
    let mut key = String::new();
    let mut pending_separator = false;

    for ch in prompt.trim().to_lowercase().chars() {
        if ch.is_whitespace() {
            pending_separator = true;
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_separator && !key.is_empty() {
                key.push('-');
            }
            pending_separator = false;
            key.push(ch);
        }
    }

    key.truncate(MAX_KEY_LENGTH);
    while key.ends_with('-') {
        key.pop();
    }
    key
}

/// `a-banana-robbing` -> `aBananaRobbing`; a trailing `-` is dropped.
fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for ch in s.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
