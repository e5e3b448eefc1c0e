use time::OffsetDateTime;

use crate::aggregate::IncidentStore;
use crate::duty::DutyWindow;
use crate::normalize::timestamps::format_window_bound;

/// Messages containing this marker are already tied to a site pair and print no device suffix.
pub const OSM_MARKER: &str = " : OSM ";

pub const EMPTY_BLOCK: &str =
    r#"<h2 style="margin-left: 50px;"><small>Інцидентів не зареєстровано</small></h2>"#;

const SECTION_END: &str = "</ol><p>";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn group_heading(group: &str) -> String {
    format!(
        r#"<h2 style="margin-left: 25px;"><small>Зареєстровані інциденти на виносі {}</small></h2>"#,
        escape_html(group)
    )
}

fn line(message: &str, device: &str) -> String {
    if message.contains(OSM_MARKER) {
        format!(r#"<li style="margin-left: 75px;">{message}</li>"#)
    } else {
        format!(
            r#"<li style="margin-left: 75px;">{message} [{}]</li>"#,
            escape_html(device)
        )
    }
}

/// Render the incidents received in `[start, end]`.
///
/// Messages are already markup-safe; group and device names are escaped here.
pub fn render(store: &IncidentStore, start: OffsetDateTime, end: OffsetDateTime) -> String {
    let entries = store.entries_within(start, end);
    if entries.is_empty() {
        return EMPTY_BLOCK.to_string();
    }

    let mut out = String::new();
    let mut current_group: Option<&str> = None;
    let mut current_device: Option<(&str, &str)> = None;

    for entry in &entries {
        let group = entry.key.group.as_str();
        let device = entry.key.device.as_str();

        if current_device.is_some() && current_device != Some((group, device)) {
            out.push_str("<br>");
        }
        if current_group != Some(group) {
            out.push_str(&group_heading(group));
            current_group = Some(group);
        }
        current_device = Some((group, device));
        out.push_str(&line(entry.message, device));
    }
    out.push_str("<br>");

    tracing::debug!(
        lines = entries.len(),
        start = %format_window_bound(start),
        end = %format_window_bound(end),
        "rendered incident report"
    );
    out
}

/// Heading for the incident section of a duty report.
pub fn section_heading(window: &DutyWindow) -> String {
    format!(
        "<p><ol><h1><small><small>Інциденти, <u>зареєстровані в автоматичному режимі</u> \
         системами Zabbix та OSM,<br>що відбувалися в період з {} по {}</small></small></h1>",
        format_window_bound(window.begin),
        format_window_bound(window.end)
    )
}

/// [`render`] wrapped in the period heading, as it appears in the mailed document.
pub fn render_section(store: &IncidentStore, window: &DutyWindow) -> String {
    let mut out = section_heading(window);
    out.push_str(&render(store, window.begin, window.end));
    out.push_str(SECTION_END);
    out
}
