//! Read-only projections of the selection and the ledger into rows for display.
use crate::err::Error;
use crate::ledger::{Status, UploadRecord};
use crate::selection::SelectionItem;
use std::{collections::HashSet, fmt};

const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRow {
    pub label: String,
    pub value: u8,
    pub status: Status,
    pub description: String,
    pub additional_info: String,
    /// Only set once the upload succeeded and its URL is known
    pub link: Option<String>,
}

impl From<&UploadRecord> for ProgressRow {
    fn from(record: &UploadRecord) -> Self {
        let link = match (record.status, &record.file_url) {
            (Status::Success, Some(url)) => Some(url.clone()),
            _ => None,
        };
        Self {
            label: record.filename.clone(),
            value: record.percentage,
            status: record.status,
            description: record.filetype.clone(),
            additional_info: record.filesize.clone(),
            link,
        }
    }
}

impl fmt::Display for ProgressRow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let filled = self.value as usize * BAR_WIDTH / 100;
        write!(
            f,
            "{} [{}{}] {:>3}% {} ({}, {})",
            self.label,
            "#".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            self.value,
            self.status,
            self.additional_info,
            self.description,
        )?;
        if let Some(link) = &self.link {
            write!(f, "\n    {}", link)?;
        }
        Ok(())
    }
}

pub fn render_ledger(records: &[UploadRecord]) -> Vec<ProgressRow> {
    records.iter().map(ProgressRow::from).collect()
}

/// Outcome counts over a ledger. Records that were retried are left out in favour of their
/// retry, so every file counts once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub uploaded: usize,
    pub failed: usize,
    pub pending: usize,
}

pub fn summarize(records: &[UploadRecord]) -> Summary {
    let retried = records
        .iter()
        .filter_map(|record| record.retry_of)
        .collect::<HashSet<_>>();
    records
        .iter()
        .filter(|record| !retried.contains(&record.id))
        .fold(Summary::default(), |mut summary, record| {
            match record.status {
                Status::Error => summary.failed += 1,
                _ if record.is_finished() => summary.uploaded += 1,
                _ => summary.pending += 1,
            }
            summary
        })
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} uploaded, {} failed", self.uploaded, self.failed)?;
        if self.pending > 0 {
            write!(f, ", {} pending", self.pending)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub position: usize,
    pub label: String,
    pub label_tag: String,
    pub description: String,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} - {}",
            self.position, self.label, self.label_tag, self.description
        )
    }
}

pub fn render_selection(items: &[SelectionItem]) -> Vec<Token> {
    items
        .iter()
        .enumerate()
        .map(|(position, item)| Token {
            position,
            label: item.label.clone(),
            label_tag: item.label_tag.clone(),
            description: item.description.clone(),
        })
        .collect()
}

/// A dismissible error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub header: String,
    pub message: String,
}

impl Alert {
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::NoFilesSelected => Self {
                header: "No files selected".to_string(),
                message: "You must select the files that you want to upload.".to_string(),
            },
            other => Self {
                header: "Error".to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.header, self.message)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(status: Status, percentage: u8, file_url: Option<&str>) -> UploadRecord {
        UploadRecord {
            id: 0,
            filename: "a.txt".into(),
            filetype: "text/plain".into(),
            filesize: "100 Bytes".into(),
            status,
            percentage,
            file_url: file_url.map(str::to_string),
            error: None,
            elapsed: None,
            retry_of: None,
        }
    }

    #[test]
    fn link_requires_success_and_url() {
        let rows = render_ledger(&[
            record(Status::InProgress, 40, None),
            record(Status::Success, 100, None),
            record(Status::Success, 100, Some("https://b/a.txt")),
            record(Status::Error, 10, Some("https://b/a.txt")),
        ]);
        let links = rows.iter().map(|r| r.link.is_some()).collect::<Vec<_>>();
        assert_eq!(links, vec![false, false, true, false]);
        assert_eq!(rows[0].value, 40);
        assert_eq!(rows[0].additional_info, "100 Bytes");
        assert_eq!(rows[0].description, "text/plain");
    }

    #[test]
    fn text_progress_bar() {
        let row = ProgressRow::from(&record(Status::InProgress, 50, None));
        assert_eq!(
            row.to_string(),
            "a.txt [##########          ]  50% in-progress (100 Bytes, text/plain)"
        );
        let row = ProgressRow::from(&record(Status::Success, 100, Some("https://b/a.txt")));
        assert!(row.to_string().ends_with("success (100 Bytes, text/plain)\n    https://b/a.txt"));
    }

    #[test]
    fn summary_counts_each_file_once() {
        let mut failed = record(Status::Error, 30, None);
        failed.id = 0;
        let mut retried = record(Status::Success, 100, Some("https://b/a.txt"));
        retried.id = 1;
        retried.retry_of = Some(0);
        let mut other = record(Status::Error, 0, None);
        other.id = 2;
        let mut sending = record(Status::Success, 100, None);
        sending.id = 3;

        let summary = summarize(&[failed.clone(), retried, other, sending]);
        assert_eq!(
            summary,
            Summary {
                uploaded: 1,
                failed: 1,
                pending: 1
            }
        );
        assert_eq!(summary.to_string(), "1 uploaded, 1 failed, 1 pending");

        // A failed retry still counts as one failed file
        let mut retry_failed = record(Status::Error, 10, None);
        retry_failed.id = 1;
        retry_failed.retry_of = Some(0);
        let summary = summarize(&[failed, retry_failed]);
        assert_eq!(summary.to_string(), "0 uploaded, 1 failed");
    }

    #[test]
    fn tokens_are_positional() {
        let items = vec![
            SelectionItem {
                id: 0,
                label: "a.txt".into(),
                label_tag: "100 Bytes".into(),
                description: "File type: text/plain".into(),
            },
            SelectionItem {
                id: 2,
                label: "c.txt".into(),
                label_tag: "1 KB".into(),
                description: "File type: text/plain".into(),
            },
        ];
        let tokens = render_selection(&items);
        assert_eq!(tokens[1].position, 1);
        assert_eq!(tokens[1].to_string(), "[1] c.txt 1 KB - File type: text/plain");
    }

    #[test]
    fn empty_selection_alert() {
        let alert = Alert::from_error(&Error::NoFilesSelected);
        assert_eq!(alert.header, "No files selected");
        assert_eq!(
            alert.message,
            "You must select the files that you want to upload."
        );
    }
}
