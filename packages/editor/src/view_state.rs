//! View state preservation across structured rebuilds
//!
//! A re-parse replaces the site list wholesale, which would otherwise reset
//! scroll position and selection. [`ViewSnapshot`] captures both before the
//! rebuild and puts them back afterwards. Restoring never fails: a
//! reference that no longer resolves is simply skipped.

use sitefile_grammar::Site;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlign {
    /// Entry at the top of the visible region
    Start,
    /// Minimal scroll that makes the entry visible
    Nearest,
}

/// Vertical extent of one rendered site entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryBounds {
    pub site_index: usize,
    pub top: u32,
    pub bottom: u32,
}

/// The rendered site list, as far as scroll restoration needs it
pub trait SiteListView {
    /// Visible region as `(scroll_top, height)`
    fn viewport(&self) -> (u32, u32);

    /// Rendered entries in display order
    fn entries(&self) -> Vec<EntryBounds>;

    fn scroll_into_view(&mut self, site_index: usize, align: ScrollAlign);

    /// The list was discarded and recreated with `site_count` entries
    fn rebuilt(&mut self, _site_count: usize) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub first_visible: Option<usize>,
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Restored {
    pub scrolled_to: Option<usize>,
    /// Selection after the rebuild; `None` if the old one no longer exists
    pub selected: Option<usize>,
}

impl ViewSnapshot {
    pub fn capture(view: &dyn SiteListView, selected: Option<usize>) -> Self {
        let (top, height) = view.viewport();
        let bottom = top.saturating_add(height);

        let first_visible = view
            .entries()
            .into_iter()
            .find(|entry| entry.bottom > top && entry.top < bottom)
            .map(|entry| entry.site_index);

        Self {
            first_visible,
            selected,
        }
    }

    pub fn restore(&self, view: &mut dyn SiteListView, site_count: usize) -> Restored {
        let mut restored = Restored::default();

        if let Some(index) = self.first_visible.filter(|i| *i < site_count) {
            view.scroll_into_view(index, ScrollAlign::Start);
            restored.scrolled_to = Some(index);
        }

        if let Some(index) = self.selected.filter(|i| *i < site_count) {
            if restored.scrolled_to.is_none() {
                view.scroll_into_view(index, ScrollAlign::Nearest);
                restored.scrolled_to = Some(index);
            }
            restored.selected = Some(index);
        }

        restored
    }
}

/// 0-based text line to put the cursor on when a site is selected
///
/// `line_number` goes stale once the text is regenerated, so this is a
/// hint for navigation only.
pub fn text_line_for_site(site: &Site) -> Option<usize> {
    site.line_number.filter(|n| *n > 0).map(|n| n - 1)
}

/// Site list with one fixed-height row per site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedRowList {
    pub rows: usize,
    pub row_height: u32,
    pub scroll_top: u32,
    pub height: u32,
}

impl FixedRowList {
    pub fn new(rows: usize, row_height: u32, height: u32) -> Self {
        Self {
            rows,
            row_height: row_height.max(1),
            scroll_top: 0,
            height,
        }
    }

    /// Row indices currently inside the visible region
    pub fn visible_rows(&self) -> std::ops::Range<usize> {
        let first = (self.scroll_top / self.row_height) as usize;
        let last = self.scroll_top.saturating_add(self.height).div_ceil(self.row_height) as usize;
        first.min(self.rows)..last.min(self.rows)
    }

    fn max_scroll(&self) -> u32 {
        (self.rows as u32 * self.row_height).saturating_sub(self.height)
    }
}

impl SiteListView for FixedRowList {
    fn viewport(&self) -> (u32, u32) {
        (self.scroll_top, self.height)
    }

    fn entries(&self) -> Vec<EntryBounds> {
        (0..self.rows)
            .map(|i| {
                let top = i as u32 * self.row_height;
                EntryBounds {
                    site_index: i,
                    top,
                    bottom: top + self.row_height,
                }
            })
            .collect()
    }

    fn scroll_into_view(&mut self, site_index: usize, align: ScrollAlign) {
        if site_index >= self.rows {
            return;
        }
        let top = site_index as u32 * self.row_height;
        let bottom = top + self.row_height;

        self.scroll_top = match align {
            ScrollAlign::Start => top,
            ScrollAlign::Nearest if top < self.scroll_top => top,
            ScrollAlign::Nearest if bottom > self.scroll_top + self.height => {
                bottom.saturating_sub(self.height)
            }
            ScrollAlign::Nearest => self.scroll_top,
        }
        .min(self.max_scroll());
    }

    fn rebuilt(&mut self, site_count: usize) {
        self.rows = site_count;
        self.scroll_top = 0;
    }
}
