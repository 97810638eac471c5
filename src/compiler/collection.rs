//! The content collection exposed to templates as `site`.

use super::meta::ContentItem;
use std::{cmp::Ordering, collections::BTreeMap};

/// Type whose items form `site.posts` and the posts listing page.
pub const POSTS_TYPE: &str = "posts";
/// Type whose items form `site.projects`.
pub const PROJECTS_TYPE: &str = "project";

/// All items of one build, sorted and grouped.
///
/// `items` is ordered newest first; undated items follow every dated one in
/// walk order. The groups preserve that order.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub items: Vec<ContentItem>,
    pub by_type: BTreeMap<String, Vec<ContentItem>>,
    pub posts: Vec<ContentItem>,
    pub projects: Vec<ContentItem>,
}

impl Collection {
    /// Sort and group items given in directory-walk order.
    pub fn new(mut items: Vec<ContentItem>) -> Self {
        // `sort_by` is stable: equal keys keep walk order.
        items.sort_by(|a, b| match (&a.date, &b.date) {
            (Some(a), Some(b)) => b.cmp(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let mut by_type: BTreeMap<String, Vec<ContentItem>> = BTreeMap::new();
        for item in &items {
            by_type
                .entry(item.kind.clone())
                .or_default()
                .push(item.clone());
        }

        let posts = by_type.get(POSTS_TYPE).cloned().unwrap_or_default();
        let projects = by_type.get(PROJECTS_TYPE).cloned().unwrap_or_default();

        Self {
            items,
            by_type,
            posts,
            projects,
        }
    }
}
