//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::MachineState;
use super::app::{Bank, DebuggerApp};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(55),
        ])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, trace and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_trace(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly view around the PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(line, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(&line.addr) { "●" } else { " " };

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(&line.addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}{}", bp, prefix, line)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw register state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.machine.regs;
    let value = |v: u8| Span::styled(format!("{:02x} ({:>3})", v, v), Style::default().fg(Color::White));

    let content = vec![
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:02x}", regs.pc), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("A:  "),
            value(regs.a),
            Span::raw("   X: "),
            value(regs.x),
            Span::raw("   Y: "),
            value(regs.y),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", app.machine.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.machine.state), state_style(app.machine.state)),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw hex memory view of the selected bank.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let (title, mem) = match app.bank {
        Bank::Program => (" Program Memory ", &app.machine.program),
        Bank::Data => (" Data Memory ", &app.machine.data),
    };
    let allocation = mem.allocation();
    let visible_rows = (area.height as usize).saturating_sub(2);
    let pc = app.machine.regs.pc;

    let items: Vec<ListItem> = mem
        .dump()
        .into_iter()
        .skip(app.mem_scroll)
        .take(visible_rows)
        .map(|row| {
            let holds_pc = app.bank == Bank::Program
                && (row.base..row.base + row.bytes.len()).contains(&pc);

            let style = if holds_pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if row.bytes.iter().any(|&b| b != 0) {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(row.to_string()).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(format!("{}({:.2}% allocated) ", title, allocation.percent()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the most recent trace records.
fn draw_trace(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible = (area.height as usize).saturating_sub(2);
    let skip = app.trace.len().saturating_sub(visible);

    let items: Vec<ListItem> = app.trace
        .iter()
        .skip(skip)
        .map(|record| {
            let style = if record.is_halt() {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            ListItem::new(record.to_string()).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Trace (PC BINARY DEZ CMD ARGS) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint  x: Reset"),
        Line::from("m: Program/data memory  ↑↓: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Get color style for a machine state.
fn state_style(state: MachineState) -> Style {
    match state {
        MachineState::Running => Style::default().fg(Color::Green),
        MachineState::Halted => Style::default().fg(Color::Gray),
        MachineState::Faulted => Style::default().fg(Color::Red),
    }
}
