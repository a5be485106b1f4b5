//! # Report Renderer
//!
//! Turns the merged snapshot and change report into the weekly HTML mail.
//! Two optional sections: "New Users" (new handles above the rating
//! threshold) and "Updates" (changed handles above the threshold with at
//! least one notable field change, annotated with remark markers). When
//! both come up empty there is no document and the caller skips the mail.

use crate::{
    diff::{Change, ChangeReport, Field},
    models::{MergedSnapshot, UserRecord},
};

pub struct ReportOptions {
    pub rating_threshold: i64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            rating_threshold: 2000,
        }
    }
}

const COLUMNS: [&str; 9] = [
    "handle",
    "firstName",
    "lastName",
    "email",
    "country",
    "maxRank",
    "maxRating",
    "contribution",
    "languages",
];

const LEGEND: &str = "<p>* The email address has changed.</p>\
<p>** The languages list has changed.</p>\
<p>*** The ranking has changed.</p>";

fn marker(field: Field) -> Option<&'static str> {
    match field {
        Field::Email => Some("*"),
        Field::Languages => Some("**"),
        Field::MaxRank => Some("***"),
        _ => None,
    }
}

pub fn render(
    merged: &MergedSnapshot,
    report: &ChangeReport,
    options: &ReportOptions,
) -> Option<String> {
    let mut new_users: Vec<&UserRecord> = Vec::new();
    let mut updated_users: Vec<(&UserRecord, String)> = Vec::new();

    for (handle, change) in report {
        let Some(record) = merged.get(handle) else {
            continue;
        };

        match change {
            Change::NewUser => {
                if record.max_rating > options.rating_threshold {
                    new_users.push(record);
                }
            }
            Change::Changed { deltas } => {
                let remarks: Vec<&str> = deltas.keys().filter_map(|f| marker(*f)).collect();
                if !remarks.is_empty() && record.max_rating > options.rating_threshold {
                    updated_users.push((record, remarks.join(" ")));
                }
            }
        }
    }

    new_users.sort_by(|a, b| b.max_rating.cmp(&a.max_rating));
    updated_users.sort_by(|a, b| b.0.max_rating.cmp(&a.0.max_rating));

    if new_users.is_empty() && updated_users.is_empty() {
        return None;
    }

    let mut message = String::from("<html><body>");

    if !new_users.is_empty() {
        message.push_str("<h2>New Users</h2>");
        message.push_str(&user_table(
            new_users.iter().map(|record| (*record, None)),
            false,
        ));
    }

    if !updated_users.is_empty() {
        if !new_users.is_empty() {
            message.push_str("<br>");
        }
        message.push_str("<h2>Updates</h2>");
        message.push_str(&user_table(
            updated_users
                .iter()
                .map(|(record, remarks)| (*record, Some(remarks.as_str()))),
            true,
        ));
        message.push_str(LEGEND);
    }

    message.push_str("</body></html>");
    Some(message)
}

fn user_table<'a>(
    rows: impl Iterator<Item = (&'a UserRecord, Option<&'a str>)>,
    with_remarks: bool,
) -> String {
    let mut table = String::from("<table border=\"1\"><tr>");
    for column in COLUMNS {
        table.push_str(&format!("<th>{column}</th>"));
    }
    if with_remarks {
        table.push_str("<th>remarks</th>");
    }
    table.push_str("</tr>");

    for (record, remarks) in rows {
        table.push_str("<tr>");
        for cell in [
            Some(record.handle.as_str()),
            record.first_name.as_deref(),
            record.last_name.as_deref(),
            record.email.as_deref(),
            record.country.as_deref(),
            record.max_rank.as_deref(),
        ] {
            push_cell(&mut table, cell.unwrap_or(""));
        }
        push_cell(&mut table, &record.max_rating.to_string());
        push_cell(&mut table, &record.contribution.to_string());
        push_cell(&mut table, &languages_cell(record));
        if with_remarks {
            push_cell(&mut table, remarks.unwrap_or(""));
        }
        table.push_str("</tr>");
    }

    table.push_str("</table>");
    table
}

fn languages_cell(record: &UserRecord) -> String {
    record
        .languages
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_cell(table: &mut String, value: &str) {
    table.push_str("<td>");
    table.push_str(&escape(value));
    table.push_str("</td>");
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
