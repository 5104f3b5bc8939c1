use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};

use crate::cli::SortColumn;
use crate::output::{SnapshotRow, build_rows};
use crate::tui::views::{ViewContext, clamp_selected, directed};
use crate::tui::widgets::format_bytes;

fn sort_rows(rows: &mut [SnapshotRow], sort: SortColumn, ascending: bool) {
    rows.sort_by(|a, b| {
        let ord = match sort {
            SortColumn::Usage => a.io_bytes().cmp(&b.io_bytes()),
            SortColumn::User => a.user.cmp(&b.user),
            SortColumn::Reads => a.read_bytes.cmp(&b.read_bytes),
            SortColumn::Writes => a.write_bytes.cmp(&b.write_bytes),
        };
        directed(ord, ascending).then_with(|| (a.uid, a.ip, a.inode).cmp(&(b.uid, b.ip, b.inode)))
    });
}

/// Render the per-file traffic table.
///
/// Columns: File | Client | User | Reads | Read | Writes | Written
pub fn render(frame: &mut Frame, area: Rect, ctx: &ViewContext<'_>) {
    let mut rows = build_rows(ctx.total, ctx.names, ctx.users);
    sort_rows(&mut rows, ctx.sort, ctx.ascending);
    let header_style = ctx.theme.header_style();

    let header = Row::new(
        ["File", "Client", "User", "Reads", "Read", "Writes", "Written"]
            .into_iter()
            .map(|h| Cell::from(Span::styled(h, header_style))),
    );

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.name.clone()),
                Cell::from(r.ip.to_string()),
                Cell::from(r.user.clone()),
                Cell::from(r.read_ops.to_string()),
                Cell::from(format_bytes(r.read_bytes)),
                Cell::from(r.write_ops.to_string()),
                Cell::from(format_bytes(r.write_bytes)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Min(24),
        Constraint::Length(16),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(10),
    ];

    let title = format!(" Files ({}) ", rows.len());
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
    use std::net::Ipv4Addr;

    fn row(user: &str, uid: u32, read_bytes: u64, write_bytes: u64) -> SnapshotRow {
        SnapshotRow {
            user: user.to_string(),
            uid,
            ip: Ipv4Addr::new(10, 0, 0, 1),
            inode: 1,
            name: "1".to_string(),
            read_ops: 1,
            read_bytes,
            write_ops: 1,
            write_bytes,
        }
    }

    #[test]
    fn sort_by_writes_then_flip() {
        let mut rows = vec![row("a", 1, 500, 10), row("b", 2, 0, 20)];
        sort_rows(&mut rows, SortColumn::Writes, false);
        assert_eq!(rows[0].uid, 2);
        sort_rows(&mut rows, SortColumn::Usage, false);
        assert_eq!(rows[0].uid, 1);
        sort_rows(&mut rows, SortColumn::User, true);
        assert_eq!(rows[0].user, "a");
    }
}
