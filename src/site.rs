//! Site discovery.
//!
//! A site is an immediate subdirectory of the portfolio root. The directory
//! name is the site's identity and its URL path:
//!
//! ```text
//! root/
//! ├── main/          → ""            (always, if present)
//! │   ├── index.html
//! │   └── resume.tex
//! ├── projects/      → "/projects"   (has index.html)
//! ├── fonts/         → ignored       (infrastructure)
//! └── drafts/        → ignored       (neither resume.tex nor index.html)
//! ```

use crate::log;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names that are never treated as sites.
pub const EXCLUDED_DIRS: &[&str] = &[".git", "fonts", "__pycache__", ".vscode"];

/// The site served at the portfolio root.
pub const MAIN_SITE: &str = "main";

pub const RESUME_SOURCE: &str = "resume.tex";
pub const HTML_ENTRY: &str = "index.html";
pub const RESUME_PDF: &str = "resume.pdf";
pub const QR_IMAGE: &str = "qr_code.png";

/// One discovered site directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub name: String,
    /// `""` for the main site, `/<name>` otherwise.
    pub url_path: String,
    pub dir: PathBuf,
    pub has_resume: bool,
    pub has_index: bool,
}

impl Site {
    fn inspect(name: &str, dir: PathBuf) -> Self {
        let url_path = if name == MAIN_SITE {
            String::new()
        } else {
            format!("/{name}")
        };
        Self {
            name: name.to_owned(),
            url_path,
            has_resume: dir.join(RESUME_SOURCE).exists(),
            has_index: dir.join(HTML_ENTRY).exists(),
            dir,
        }
    }

    #[inline]
    pub fn is_main(&self) -> bool {
        self.name == MAIN_SITE
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{base_url}{}", self.url_path)
    }

    pub fn resume_source(&self) -> PathBuf {
        self.dir.join(RESUME_SOURCE)
    }

    #[cfg(test)]
    pub fn resume_pdf(&self) -> PathBuf {
        self.dir.join(RESUME_PDF)
    }

    pub fn qr_target(&self) -> PathBuf {
        self.dir.join(QR_IMAGE)
    }
}

/// Sites in processing order: `main` first, then the rest by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteRegistry {
    sites: Vec<Site>,
}

impl SiteRegistry {
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&Site> {
        self.sites.iter().find(|site| site.name == name)
    }

    /// `(name, url_path)` pairs in registry order.
    #[cfg(test)]
    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.sites
            .iter()
            .map(|site| (site.name.as_str(), site.url_path.as_str()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a SiteRegistry {
    type Item = &'a Site;
    type IntoIter = std::slice::Iter<'a, Site>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}

/// Whether a directory with this name and contents counts as a site.
fn qualifies(name: &str, dir: &Path) -> bool {
    if name == MAIN_SITE {
        return true;
    }
    if EXCLUDED_DIRS.contains(&name) {
        return false;
    }
    dir.join(RESUME_SOURCE).exists() || dir.join(HTML_ENTRY).exists()
}

/// Scan `root` for site directories.
///
/// Never fails: unreadable entries are skipped, and an unreadable root
/// yields an empty registry.
pub fn discover(root: &Path) -> SiteRegistry {
    let mut sites = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                log!("error"; "cannot list `{}`: {e}", root.display());
                break;
            }
            Err(_) => continue,
        };

        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if qualifies(name, entry.path()) {
            sites.push(Site::inspect(name, entry.path().to_path_buf()));
        }
    }

    // main first, then lexicographic
    sites.sort_by(|a, b| {
        b.is_main()
            .cmp(&a.is_main())
            .then_with(|| a.name.cmp(&b.name))
    });

    SiteRegistry { sites }
}
