//! Page router: derives the active page sequence from form data.
//!
//! The router walks every page of a [`FormConfig`] in order, expanding
//! per-item pages into one slot per array element, and evaluates each
//! slot's `depends`. Only active slots are routable; navigating to an
//! inactive one yields a redirect to the nearest active slot.

use serde::Serialize;

use crate::config::{FormConfig, Page};
use crate::data::{get_path, FormData};
use crate::depends::DependsError;

/// Route shown after the last active page.
pub const REVIEW_PATH: &str = "review-and-submit";

/// Route shown before the first active page.
pub const INTRODUCTION_PATH: &str = "introduction";

/// A concrete page in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivePage {
    pub page_key: String,
    pub chapter_key: String,
    /// Page path with `:index` substituted, relative to the URL prefix.
    pub path: String,
    pub title: String,
    /// Item index for per-item pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Clone)]
struct Slot {
    page: ActivePage,
    active: bool,
}

/// Outcome of resolving a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// The route is a currently active page.
    Active { page: ActivePage },
    /// The route names a page that is currently excluded.
    Redirect { to: String },
    /// The introduction or review route.
    Terminal { route: String },
    /// No page has this path.
    NotFound,
}

/// Router over one form config.
#[derive(Debug, Clone, Copy)]
pub struct PageRouter<'a> {
    config: &'a FormConfig,
}

impl<'a> PageRouter<'a> {
    pub fn new(config: &'a FormConfig) -> Self {
        PageRouter { config }
    }

    fn slots(&self, data: &FormData) -> Result<Vec<Slot>, DependsError> {
        let mut slots = Vec::new();
        for chapter in &self.config.chapters {
            for page in &chapter.pages {
                if page.show_page_per_item {
                    let count = page
                        .array_path
                        .as_deref()
                        .and_then(|p| get_path(data, p))
                        .and_then(|v| v.as_array())
                        .map(|items| items.len())
                        .unwrap_or(0);
                    for index in 0..count {
                        slots.push(Slot {
                            page: concrete(page, &chapter.key, Some(index)),
                            active: is_active(page, data, Some(index))?,
                        });
                    }
                } else {
                    slots.push(Slot {
                        page: concrete(page, &chapter.key, None),
                        active: is_active(page, data, None)?,
                    });
                }
            }
        }
        Ok(slots)
    }

    /// Active pages in order.
    pub fn active_pages(&self, data: &FormData) -> Result<Vec<ActivePage>, DependsError> {
        Ok(self
            .slots(data)?
            .into_iter()
            .filter(|s| s.active)
            .map(|s| s.page)
            .collect())
    }

    /// Keys of pages with no active instance. Per-item pages with an empty
    /// array count as inactive.
    pub fn inactive_page_keys(&self, data: &FormData) -> Result<Vec<String>, DependsError> {
        let active = self.active_pages(data)?;
        Ok(self
            .config
            .pages()
            .filter(|p| !active.iter().any(|a| a.page_key == p.key))
            .map(|p| p.key.clone())
            .collect())
    }

    /// Full routes of the active pages, followed by the review route.
    pub fn routes(&self, data: &FormData) -> Result<Vec<String>, DependsError> {
        let mut routes: Vec<String> = self
            .active_pages(data)?
            .iter()
            .map(|p| self.config.route(&p.path))
            .collect();
        routes.push(self.config.route(REVIEW_PATH));
        Ok(routes)
    }

    /// Strip the URL prefix and surrounding slashes from a route.
    pub fn normalize(&self, route: &str) -> String {
        let prefix = self.config.url_prefix.trim_matches('/');
        let trimmed = route.trim_matches('/');
        if prefix.is_empty() {
            return trimmed.to_string();
        }
        match trimmed.strip_prefix(prefix) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                rest.trim_matches('/').to_string()
            }
            _ => trimmed.to_string(),
        }
    }

    /// Resolve a route (with or without the URL prefix).
    ///
    /// An excluded page redirects to the nearest active page before it in
    /// config order, else the nearest one after it, else the introduction.
    pub fn resolve(&self, route: &str, data: &FormData) -> Result<Resolution, DependsError> {
        let path = self.normalize(route);
        if path == INTRODUCTION_PATH || path == REVIEW_PATH {
            return Ok(Resolution::Terminal {
                route: self.config.route(&path),
            });
        }

        let slots = self.slots(data)?;
        let Some(pos) = slots.iter().position(|s| s.page.path == path) else {
            return Ok(Resolution::NotFound);
        };
        if slots[pos].active {
            return Ok(Resolution::Active {
                page: slots[pos].page.clone(),
            });
        }

        let before = slots[..pos].iter().rev().find(|s| s.active);
        let after = slots[pos + 1..].iter().find(|s| s.active);
        let to = match before.or(after) {
            Some(slot) => self.config.route(&slot.page.path),
            None => self.config.route(INTRODUCTION_PATH),
        };
        tracing::debug!(from = %path, to = %to, "page excluded by depends, redirecting");
        Ok(Resolution::Redirect { to })
    }

    /// Whether a route can be navigated to directly.
    pub fn is_navigable(&self, route: &str, data: &FormData) -> Result<bool, DependsError> {
        Ok(matches!(
            self.resolve(route, data)?,
            Resolution::Active { .. } | Resolution::Terminal { .. }
        ))
    }

    /// Route after `current`. The last page continues to review; the
    /// introduction continues to the first page.
    pub fn next_route(&self, current: &str, data: &FormData) -> Result<Option<String>, DependsError> {
        let path = self.normalize(current);
        let active = self.active_pages(data)?;
        if path == REVIEW_PATH {
            return Ok(None);
        }
        let next = if path == INTRODUCTION_PATH {
            active.first().map(|p| p.path.clone())
        } else {
            match active.iter().position(|p| p.path == path) {
                Some(i) => active.get(i + 1).map(|p| p.path.clone()),
                None => return Ok(None),
            }
        };
        Ok(Some(self.config.route(next.as_deref().unwrap_or(REVIEW_PATH))))
    }

    /// Route before `current`. The first page goes back to the introduction.
    pub fn previous_route(
        &self,
        current: &str,
        data: &FormData,
    ) -> Result<Option<String>, DependsError> {
        let path = self.normalize(current);
        let active = self.active_pages(data)?;
        if path == INTRODUCTION_PATH {
            return Ok(None);
        }
        let prev = if path == REVIEW_PATH {
            active.last().map(|p| p.path.clone())
        } else {
            match active.iter().position(|p| p.path == path) {
                Some(0) => None,
                Some(i) => active.get(i - 1).map(|p| p.path.clone()),
                None => return Ok(None),
            }
        };
        Ok(Some(self.config.route(prev.as_deref().unwrap_or(INTRODUCTION_PATH))))
    }
}

fn concrete(page: &Page, chapter_key: &str, index: Option<usize>) -> ActivePage {
    let path = match index {
        Some(i) => page.path.replace(":index", &i.to_string()),
        None => page.path.clone(),
    };
    ActivePage {
        page_key: page.key.clone(),
        chapter_key: chapter_key.to_string(),
        path,
        title: page.title.clone(),
        index,
    }
}

fn is_active(page: &Page, data: &FormData, index: Option<usize>) -> Result<bool, DependsError> {
    match &page.depends {
        None => Ok(true),
        Some(dep) => dep.evaluate(data, index),
    }
}
