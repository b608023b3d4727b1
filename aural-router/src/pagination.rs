//! Paginated views (`queue`, `playlist show`) and the follow-up
//! interaction contract: a page is rendered with five navigation
//! controls, and a later click carries a `customID` of the form
//! `"<view>:<args>:<action>"` that the router parses back into a page
//! request.

use crate::error::RouterError;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    First,
    Prev,
    Current,
    Next,
    Last,
}

impl NavAction {
    fn as_str(self) -> &'static str {
        match self {
            NavAction::First => "first",
            NavAction::Prev => "prev",
            NavAction::Current => "current",
            NavAction::Next => "next",
            NavAction::Last => "last",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "first" => Some(NavAction::First),
            "prev" => Some(NavAction::Prev),
            "current" => Some(NavAction::Current),
            "next" => Some(NavAction::Next),
            "last" => Some(NavAction::Last),
            _ => None,
        }
    }
}

/// One navigation control: the label to render and the `customID` to
/// attach, or `None` when the control is disabled (`Current`, or
/// `First`/`Prev` on page 0, `Next`/`Last` on the final page).
#[derive(Debug, Clone)]
pub struct NavControl {
    pub label: &'static str,
    pub custom_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub page_count: usize,
    pub controls: [NavControl; 5],
}

/// A decoded follow-up interaction: which view, with what arguments,
/// requesting which navigation action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomId {
    pub view: String,
    pub args: String,
    pub action: NavAction,
}

impl CustomId {
    pub fn format(view: &str, args: &str, action: NavAction) -> String {
        format!("{view}:{args}:{}", action.as_str())
    }

    /// `view` is taken up to the first `:` and `action` after the last
    /// `:`, so `args` in between may itself contain colons (e.g. a
    /// `tenant:page` pair) without breaking the split.
    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        let (view, rest) = raw
            .split_once(':')
            .ok_or_else(|| RouterError::user("malformed pagination control id"))?;
        let (args, action) = rest
            .rsplit_once(':')
            .ok_or_else(|| RouterError::user("malformed pagination control id"))?;
        let action = NavAction::parse(action)
            .ok_or_else(|| RouterError::user(format!("unknown pagination action '{action}'")))?;
        Ok(Self { view: view.to_string(), args: args.to_string(), action })
    }
}

/// Slices `items` into the requested page and builds its navigation
/// controls, keyed under `view`/`args` so a click can be routed back
/// to the same data source.
pub fn paginate<T: Clone>(items: &[T], page_index: usize, view: &str, args: &str) -> PageView<T> {
    let page_count = page_count(items.len());
    let page_index = page_index.min(page_count.saturating_sub(1));
    let start = page_index * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());
    let page_items = items.get(start..end).map(|s| s.to_vec()).unwrap_or_default();

    let control = |label: &'static str, action: NavAction, enabled: bool| NavControl {
        label,
        custom_id: enabled.then(|| CustomId::format(view, args, action)),
    };

    let on_first = page_index == 0;
    let on_last = page_index + 1 >= page_count;

    PageView {
        items: page_items,
        page_index,
        page_count,
        controls: [
            control("First", NavAction::First, !on_first),
            control("Prev", NavAction::Prev, !on_first),
            control("Current", NavAction::Current, false),
            control("Next", NavAction::Next, !on_last),
            control("Last", NavAction::Last, !on_last),
        ],
    }
}

/// Resolves a navigation action against the current page index.
pub fn resolve_action(current: usize, page_count: usize, action: NavAction) -> usize {
    let last = page_count.saturating_sub(1);
    match action {
        NavAction::First => 0,
        NavAction::Prev => current.saturating_sub(1),
        NavAction::Current => current,
        NavAction::Next => (current + 1).min(last),
        NavAction::Last => last,
    }
}

pub fn page_count(len: usize) -> usize {
    if len == 0 {
        1
    } else {
        (len + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

/// Clamps a requested page index into range for `len` items, the way
/// `paginate` does internally; callers that need to embed the
/// resolved index in a `customID` before calling `paginate` use this
/// to keep both in sync.
pub fn clamp_page(len: usize, page_index: usize) -> usize {
    page_index.min(page_count(len).saturating_sub(1))
}
