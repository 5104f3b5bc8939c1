pub mod clients;
pub mod files;
pub mod users;

use std::cmp::Ordering;

use crate::cli::SortColumn;
use crate::identity::UserDirectory;
use crate::model::WindowBucket;
use crate::resolve::ResolutionCache;
use crate::tui::theme::Theme;

/// The three navigable TUI views.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum View {
    Users,
    Clients,
    Files,
}

const VIEW_COUNT: usize = 3;

impl View {
    pub const ALL: [View; VIEW_COUNT] = [Self::Users, Self::Clients, Self::Files];

    /// Human-readable title for the tab bar.
    pub fn title(&self) -> &str {
        match self {
            Self::Users => "Users",
            Self::Clients => "Clients",
            Self::Files => "Files",
        }
    }

    /// Zero-based index (matches tab ordering).
    pub fn index(&self) -> usize {
        match self {
            Self::Users => 0,
            Self::Clients => 1,
            Self::Files => 2,
        }
    }

    /// Convert a zero-based index back into a View, if valid.
    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    /// Number of table rows this view shows for `total`.
    pub fn row_count(&self, total: &WindowBucket) -> usize {
        match self {
            Self::Users => total.users().count(),
            Self::Clients => total.ips().count(),
            Self::Files => total.len(),
        }
    }

    /// Cycle to the next view (wraps around).
    pub fn next(&self) -> Self {
        Self::from_index((self.index() + 1) % VIEW_COUNT).unwrap_or(Self::Users)
    }

    /// Cycle to the previous view (wraps around).
    pub fn prev(&self) -> Self {
        Self::from_index((self.index() + VIEW_COUNT - 1) % VIEW_COUNT).unwrap_or(Self::Files)
    }
}

/// Everything a view needs to render one frame.
pub struct ViewContext<'a> {
    pub total: &'a WindowBucket,
    pub names: &'a ResolutionCache,
    pub users: &'a UserDirectory,
    pub theme: &'a Theme,
    pub sort: SortColumn,
    pub ascending: bool,
    pub selected: usize,
}

/// Share of `part` in `whole`, in percent.
pub(crate) fn share(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

pub(crate) fn directed(ord: Ordering, ascending: bool) -> Ordering {
    if ascending { ord } else { ord.reverse() }
}

/// Clamp a scroll position to the row count.
pub(crate) fn clamp_selected(selected: usize, len: usize) -> Option<usize> {
    if len == 0 { None } else { Some(selected.min(len - 1)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_roundtrip() {
        for i in 0..VIEW_COUNT {
            let v = View::from_index(i).unwrap();
            assert_eq!(v.index(), i);
        }
        assert!(View::from_index(3).is_none());
    }

    #[test]
    fn test_row_count_per_view() {
        use crate::model::{CounterEntry, CounterKey, FileMetrics, aggregate};
        use std::net::Ipv4Addr;

        let m = FileMetrics::new(1, 10, 0, 0);
        let total = aggregate(&[
            CounterEntry::new(CounterKey::new(1, 1, Ipv4Addr::new(10, 0, 0, 1)), m),
            CounterEntry::new(CounterKey::new(1, 2, Ipv4Addr::new(10, 0, 0, 2)), m),
            CounterEntry::new(CounterKey::new(2, 1, Ipv4Addr::new(10, 0, 0, 1)), m),
        ]);
        assert_eq!(View::Users.row_count(&total), 2);
        assert_eq!(View::Clients.row_count(&total), 2);
        assert_eq!(View::Files.row_count(&total), 3);
    }

    #[test]
    fn test_view_next_prev_wrap() {
        assert_eq!(View::Users.next(), View::Clients);
        assert_eq!(View::Files.next(), View::Users);
        assert_eq!(View::Users.prev(), View::Files);
        assert_eq!(View::Clients.prev(), View::Users);
    }

    #[test]
    fn test_share() {
        assert_eq!(share(0, 0), 0.0);
        assert_eq!(share(25, 100), 25.0);
    }

    #[test]
    fn test_clamp_selected() {
        assert_eq!(clamp_selected(5, 0), None);
        assert_eq!(clamp_selected(usize::MAX, 3), Some(2));
        assert_eq!(clamp_selected(1, 3), Some(1));
    }
}
