use std::net::Ipv4Addr;

use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};

use crate::cli::SortColumn;
use crate::model::{FileMetrics, WindowBucket};
use crate::tui::views::{ViewContext, clamp_selected, directed, share};
use crate::tui::widgets::format_bytes;

/// Aggregated per-client row data for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRow {
    pub addr: Ipv4Addr,
    pub usage: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub share: f64,
    pub users: usize,
    pub files: usize,
}

/// `SortColumn::User` orders clients by address.
pub fn build_rows(total: &WindowBucket, sort: SortColumn, ascending: bool) -> Vec<ClientRow> {
    let whole = total.usage();
    let mut rows: Vec<ClientRow> = total
        .ips()
        .map(|ip| {
            let mut sum = FileMetrics::default();
            for (_, m) in total.files_of_ip(ip.addr()) {
                sum += m;
            }
            let (read_bytes, write_bytes) = (sum.read_bytes, sum.write_bytes);
            ClientRow {
                addr: ip.addr(),
                usage: ip.usage(),
                read_bytes,
                write_bytes,
                share: share(ip.usage(), whole),
                users: ip.user_count(),
                files: ip.file_count(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        let ord = match sort {
            SortColumn::Usage => a.usage.cmp(&b.usage),
            SortColumn::User => a.addr.cmp(&b.addr),
            SortColumn::Reads => a.read_bytes.cmp(&b.read_bytes),
            SortColumn::Writes => a.write_bytes.cmp(&b.write_bytes),
        };
        directed(ord, ascending).then(a.addr.cmp(&b.addr))
    });
    rows
}

/// Render the per-client table.
///
/// Columns: Client | I/O | Share | Read | Written | Users | Files
pub fn render(frame: &mut Frame, area: Rect, ctx: &ViewContext<'_>) {
    let rows = build_rows(ctx.total, ctx.sort, ctx.ascending);
    let header_style = ctx.theme.header_style();

    let header = Row::new(
        ["Client", "I/O", "Share", "Read", "Written", "Users", "Files"]
            .into_iter()
            .map(|h| Cell::from(Span::styled(h, header_style))),
    );

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.addr.to_string()),
                Cell::from(format_bytes(r.usage)),
                Cell::from(Span::styled(
                    format!("{:.1}%", r.share),
                    Style::default().fg(ctx.theme.share_color(r.share)),
                )),
                Cell::from(format_bytes(r.read_bytes)),
                Cell::from(format_bytes(r.write_bytes)),
                Cell::from(r.users.to_string()),
                Cell::from(r.files.to_string()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(6),
        Constraint::Length(7),
    ];

    let title = format!(" Clients ({}) ", rows.len());
    let table = Table::new(table_rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(ctx.theme.selected_style());

    let mut state = TableState::default().with_selected(clamp_selected(ctx.selected, rows.len()));
    frame.render_stateful_widget(table, area, &mut state);
}
