//! Table output formatting for CLI commands.

use std::env;

use chrono::{DateTime, Utc};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::cli::output::{short_id, truncate};
use crate::domain::models::{Agent, CascadeEntry, Cliente, ClienteStatus, Motivo};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    now: DateTime<Utc>,
}

impl TableFormatter {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            use_colors: supports_color(),
            now,
        }
    }

    pub fn without_colors(now: DateTime<Utc>) -> Self {
        Self {
            use_colors: false,
            now,
        }
    }

    /// Cascade entries with their time left, or overdue marker.
    pub fn format_entries(&self, entries: &[CascadeEntry]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Entry", "Cliente", "Agent", "Tier", "Status", "Expires", "Motivo"]));

        for entry in entries {
            let remaining = entry.expira_em - self.now;
            let expires = if entry.is_overdue(self.now) {
                self.colored(format!("overdue {}", humanize(-remaining)), Color::Red)
            } else if entry.is_active() {
                Cell::new(format!("in {}", humanize(remaining)))
            } else {
                Cell::new(entry.expira_em.format("%Y-%m-%d %H:%M").to_string())
            };
            let motivo = match entry.motivo {
                Some(m) => self.colored(m.as_str(), motivo_color(m)),
                None => Cell::new("-"),
            };

            table.add_row(vec![
                Cell::new(short_id(&entry.id)),
                Cell::new(short_id(&entry.cliente_id)),
                Cell::new(truncate(&entry.user_id, 20)),
                Cell::new(entry.sequencia),
                Cell::new(entry.status.as_str()),
                expires,
                motivo,
            ]);
        }

        table.to_string()
    }

    pub fn format_clientes(&self, clientes: &[Cliente]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Nome", "Telefone", "Status", "Created"]));

        for cliente in clientes {
            table.add_row(vec![
                Cell::new(cliente.id),
                Cell::new(truncate(&cliente.nome, 30)),
                Cell::new(cliente.telefone.as_deref().unwrap_or("-")),
                self.colored(cliente.status.as_str(), cliente_color(cliente.status)),
                Cell::new(cliente.created_at.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }

        table.to_string()
    }

    pub fn format_agents(&self, agents: &[Agent]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Nome", "Department", "On Duty", "Shift"]));

        for agent in agents {
            let shift = match (agent.shift_start_hour, agent.shift_end_hour) {
                (Some(start), Some(end)) => format!("{start:02}h-{end:02}h UTC"),
                _ => "any".to_string(),
            };
            let on_duty = if agent.on_duty {
                self.colored("yes", Color::Green)
            } else {
                self.colored("no", Color::DarkGrey)
            };
            table.add_row(vec![
                Cell::new(&agent.id),
                Cell::new(truncate(&agent.nome, 30)),
                Cell::new(&agent.department),
                on_duty,
                Cell::new(shift),
            ]);
        }

        table.to_string()
    }

    fn colored(&self, text: impl ToString, color: Color) -> Cell {
        let cell = Cell::new(text.to_string());
        if self.use_colors {
            cell.fg(color)
        } else {
            cell
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn motivo_color(motivo: Motivo) -> Color {
    match motivo {
        Motivo::Resolvido => Color::Green,
        Motivo::Duplicado => Color::DarkGrey,
        Motivo::Expirado => Color::Yellow,
        Motivo::Cancelado => Color::Magenta,
        Motivo::SemAtendimento => Color::Red,
    }
}

fn cliente_color(status: ClienteStatus) -> Color {
    match status {
        ClienteStatus::Novo => Color::White,
        ClienteStatus::AguardandoAtendimento => Color::Yellow,
        ClienteStatus::Atendido => Color::Green,
        ClienteStatus::SemAtendimento => Color::Red,
        ClienteStatus::Cancelado => Color::DarkGrey,
    }
}

fn humanize(d: chrono::Duration) -> String {
    let minutes = d.num_minutes();
    if minutes >= 60 {
        format!("{}h{:02}m", minutes / 60, minutes % 60)
    } else if minutes >= 1 {
        format!("{minutes}m")
    } else {
        format!("{}s", d.num_seconds().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Cascade;
    use uuid::Uuid;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize(chrono::Duration::minutes(95)), "1h35m");
        assert_eq!(humanize(chrono::Duration::minutes(5)), "5m");
        assert_eq!(humanize(chrono::Duration::seconds(12)), "12s");
    }

    #[test]
    fn test_overdue_entries_are_marked() {
        let now = Utc::now();
        let cascade = Cascade::new(Uuid::new_v4(), Uuid::new_v4(), now - chrono::Duration::hours(2));
        let entry = CascadeEntry::new(&cascade, "ana", 1, 1.0, cascade.aberta_em).unwrap();
        let rendered = TableFormatter::without_colors(now).format_entries(&[entry]);
        assert!(rendered.contains("overdue 1h00m"));
        assert!(rendered.contains("ana"));
    }
}
