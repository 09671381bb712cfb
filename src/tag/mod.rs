//! Release tags and the registry tags derived from them.
//!
//! A single release tag `T` fans out into four registry tags: the two
//! per-platform tags `T-windows` and `T-linux`, the release manifest `T`,
//! and the floating manifest `latest`.

use crate::error::TagError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Floating tag that always points at the newest release manifest
pub const LATEST_TAG: &str = "latest";

/// Registry tag names are limited to 128 characters
pub const MAX_REGISTRY_TAG_LEN: usize = 128;

/// Prefix carried by git refs in trigger payloads
const GIT_TAG_REF_PREFIX: &str = "refs/tags/";

static TAG_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").unwrap_or_else(|e| panic!("tag grammar: {e}"))
});

/// Target platform of a per-platform image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows container image
    Windows,
    /// Linux container image
    Linux,
}

impl Platform {
    /// Both platforms, in manifest order
    pub const ALL: [Platform; 2] = [Platform::Windows, Platform::Linux];

    /// Lowercase platform name, also used as the tag suffix
    pub fn name(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated release tag, immutable for the lifetime of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// Longest release tag whose derived platform tags still fit the registry limit
    pub fn max_len() -> usize {
        let longest_suffix = Platform::ALL
            .iter()
            .map(|p| p.name().len() + 1)
            .max()
            .unwrap_or(0);
        MAX_REGISTRY_TAG_LEN - longest_suffix
    }

    /// Parse a release tag, accepting a leading `refs/tags/`
    pub fn parse(raw: &str) -> Result<Self, TagError> {
        let trimmed = raw.trim();
        let tag = trimmed.strip_prefix(GIT_TAG_REF_PREFIX).unwrap_or(trimmed);

        if tag.is_empty() {
            return Err(TagError::Empty);
        }
        if !TAG_GRAMMAR.is_match(tag) {
            return Err(TagError::InvalidCharacters {
                tag: tag.to_string(),
            });
        }
        if tag.len() > Self::max_len() {
            return Err(TagError::TooLong {
                tag: tag.to_string(),
                max: Self::max_len(),
            });
        }
        if tag == LATEST_TAG {
            return Err(TagError::Reserved {
                tag: tag.to_string(),
            });
        }

        Ok(Self(tag.to_string()))
    }

    /// The tag as given by the trigger
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive every registry tag this release touches
    pub fn derive(&self) -> TagSet {
        TagSet {
            windows: self.platform_tag(Platform::Windows),
            linux: self.platform_tag(Platform::Linux),
            release: self.0.clone(),
            latest: LATEST_TAG.to_string(),
        }
    }

    fn platform_tag(&self, platform: Platform) -> String {
        format!("{}-{}", self.0, platform.name())
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four registry tags derived from one release tag
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TagSet {
    /// `<tag>-windows`
    pub windows: String,
    /// `<tag>-linux`
    pub linux: String,
    /// `<tag>`
    pub release: String,
    /// `latest`
    pub latest: String,
}

impl TagSet {
    /// Intermediate tag for one platform
    pub fn platform(&self, platform: Platform) -> &str {
        match platform {
            Platform::Windows => &self.windows,
            Platform::Linux => &self.linux,
        }
    }

    /// Per-platform tags, pushed in stage A and deleted in stage B
    pub fn platform_tags(&self) -> [&str; 2] {
        [&self.windows, &self.linux]
    }

    /// Manifest list targets composed in stage B
    pub fn manifest_targets(&self) -> [&str; 2] {
        [&self.release, &self.latest]
    }
}

/// Fully qualified image reference `<registry>/<repository>:<tag>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Registry login server
    pub registry: String,
    /// Repository name
    pub repository: String,
    /// Tag name
    pub tag: String,
}

impl ImageRef {
    /// Build a reference from its parts
    pub fn new(registry: &str, repository: &str, tag: &str) -> Self {
        Self {
            registry: registry.trim_end_matches('/').to_string(),
            repository: repository.trim_matches('/').to_string(),
            tag: tag.to_string(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}
