use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};

use crate::cli::SortColumn;
use crate::identity::UserDirectory;
use crate::model::{FileMetrics, WindowBucket};
use crate::tui::views::{ViewContext, clamp_selected, directed, share};
use crate::tui::widgets::format_bytes;

/// Aggregated per-user row data for display.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub uid: u32,
    pub name: String,
    pub usage: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub share: f64,
    pub files: usize,
}

pub fn build_rows(
    total: &WindowBucket,
    users: &UserDirectory,
    sort: SortColumn,
    ascending: bool,
) -> Vec<UserRow> {
    let whole = total.usage();
    let mut rows: Vec<UserRow> = total
        .users()
        .map(|u| {
            let mut sum = FileMetrics::default();
            for (_, m) in total.files_of_user(u.uid()) {
                sum += m;
            }
            let (read_bytes, write_bytes) = (sum.read_bytes, sum.write_bytes);
            UserRow {
                uid: u.uid(),
                name: users.name(u.uid()),
                usage: u.usage(),
                read_bytes,
                write_bytes,
                share: share(u.usage(), whole),
                files: u.file_count(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        let ord = match sort {
            SortColumn::Usage => a.usage.cmp(&b.usage),
            SortColumn::User => a.name.cmp(&b.name),
            SortColumn::Reads => a.read_bytes.cmp(&b.read_bytes),
            SortColumn::Writes => a.write_bytes.cmp(&b.write_bytes),
        };
        directed(ord, ascending).then(a.uid.cmp(&b.uid))
    });
    rows
}

/// Render the per-user table.
///
/// Columns: User | UID | I/O | Share | Reads | Writes | Files
pub fn render(frame: &mut Frame, area: Rect, ctx: &ViewContext<'_>) {
    let rows = build_rows(ctx.total, ctx.users, ctx.sort, ctx.ascending);
    let header_style = ctx.theme.header_style();

    let header = Row::new(
        ["User", "UID", "I/O", "Share", "Read", "Written", "Files"]
            .into_iter()
            .map(|h| Cell::from(Span::styled(h, header_style))),
    );

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.name.clone()),
                Cell::from(r.uid.to_string()),
                Cell::from(format_bytes(r.usage)),
                Cell::from(Span::styled(
                    format!("{:.1}%", r.share),
                    Style::default().fg(ctx.theme.share_color(r.share)),
                )),
                Cell::from(format_bytes(r.read_bytes)),
                Cell::from(format_bytes(r.write_bytes)),
                Cell::from(r.files.to_string()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Min(12),    // User
        Constraint::Length(8),  // UID
        Constraint::Length(10), // I/O
        Constraint::Length(8),  // Share
        Constraint::Length(10), // Read
        Constraint::Length(10), // Written
        Constraint::Length(7),  // Files
    ];

    let title = format!(" Users ({}) ", rows.len());
    let table = Table::new(table_rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(ctx.theme.selected_style());

    let mut state = TableState::default().with_selected(clamp_selected(ctx.selected, rows.len()));
    frame.render_stateful_widget(table, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CounterEntry, CounterKey, FileMetrics, aggregate};
    use std::net::Ipv4Addr;

    fn total() -> WindowBucket {
        aggregate(&[
            CounterEntry::new(
                CounterKey::new(4_000_000_001, 1, Ipv4Addr::new(10, 0, 0, 1)),
                FileMetrics::new(1, 300, 0, 0),
            ),
            CounterEntry::new(
                CounterKey::new(4_000_000_001, 2, Ipv4Addr::new(10, 0, 0, 2)),
                FileMetrics::new(0, 0, 1, 100),
            ),
            CounterEntry::new(
                CounterKey::new(4_000_000_002, 1, Ipv4Addr::new(10, 0, 0, 1)),
                FileMetrics::new(0, 0, 2, 600),
            ),
        ])
    }

    #[test]
    fn rows_by_usage_descending() {
        let rows = build_rows(&total(), &UserDirectory::new(), SortColumn::Usage, false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].uid, 4_000_000_002);
        assert_eq!(rows[0].usage, 600);
        assert_eq!(rows[0].share, 60.0);
        assert_eq!(rows[1].files, 2);
        assert_eq!(rows[1].read_bytes, 300);
        assert_eq!(rows[1].write_bytes, 100);
    }

    #[test]
    fn rows_by_reads() {
        let rows = build_rows(&total(), &UserDirectory::new(), SortColumn::Reads, false);
        assert_eq!(rows[0].uid, 4_000_000_001);
    }

    #[test]
    fn unknown_user_named_by_uid() {
        let rows = build_rows(&total(), &UserDirectory::new(), SortColumn::User, true);
        assert_eq!(rows[0].name, "4000000001");
    }

    #[test]
    fn rows_saturate_byte_totals() {
        let near_max = FileMetrics::new(1, u64::MAX - 1, 1, u64::MAX - 1);
        let total = aggregate(&[
            CounterEntry::new(CounterKey::new(7, 1, Ipv4Addr::new(10, 0, 0, 1)), near_max),
            CounterEntry::new(CounterKey::new(7, 2, Ipv4Addr::new(10, 0, 0, 1)), near_max),
        ]);
        let rows = build_rows(&total, &UserDirectory::new(), SortColumn::Usage, false);
        assert_eq!(rows[0].read_bytes, u64::MAX);
        assert_eq!(rows[0].write_bytes, u64::MAX);
        assert_eq!(rows[0].usage, u64::MAX);
    }
}
