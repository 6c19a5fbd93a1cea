//! Component D: the checklist extractor.
//!
//! Walks the attribute-run sequence once, grouping every run whose
//! `paragraph_style.checklist.uuid` matches into a single logical
//! [`ChecklistItem`]. Never fails; absence of checklists yields an empty
//! list.

use crate::decode::{Document, Note};

/// A single checkbox item reconstructed from one or more attribute runs
/// sharing a checklist UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    /// Lowercase hex encoding of the checklist UUID.
    pub id: String,
    pub text: String,
    pub is_completed: bool,
    pub uuid: Vec<u8>,
    /// Zero-indexed line the item starts on, counted by newlines in
    /// `note_text` preceding `range.start`.
    pub line_number: usize,
    pub range: std::ops::Range<usize>,
}

struct Group {
    uuid: Vec<u8>,
    ranges: Vec<std::ops::Range<usize>>,
    done: bool,
}

/// Extract checklist items from a decoded [`Document`]'s note.
pub fn extract_checklists(document: &Document) -> Vec<ChecklistItem> {
    match document.note.as_ref() {
        Some(note) => extract_from_note(note),
        None => Vec::new(),
    }
}

fn extract_from_note(note: &Note) -> Vec<ChecklistItem> {
    let text_chars: Vec<char> = note.note_text.as_deref().unwrap_or("").chars().collect();
    let total_chars = text_chars.len();

    let mut groups: Vec<Group> = Vec::new();
    let mut index_of: std::collections::HashMap<Vec<u8>, usize> = std::collections::HashMap::new();

    let mut offset: usize = 0;
    for run in &note.attribute_run {
        let length = run.length.unwrap_or(0) as usize;
        let start = offset.min(total_chars);
        let end = (offset + length).min(total_chars);
        offset += length;

        let checklist = run
            .paragraph_style
            .as_ref()
            .and_then(|ps| ps.checklist.as_ref());

        if let Some(checklist) = checklist {
            let uuid_bytes = checklist.uuid.as_deref().unwrap_or(&[]);
            if !uuid_bytes.is_empty() {
                let uuid = uuid_bytes.to_vec();
                let done = checklist.done.unwrap_or(0) != 0;

                let idx = *index_of.entry(uuid.clone()).or_insert_with(|| {
                    groups.push(Group {
                        uuid: uuid.clone(),
                        ranges: Vec::new(),
                        done: false,
                    });
                    groups.len() - 1
                });

                let group = &mut groups[idx];
                group.ranges.push(start..end);
                group.done = done;
            }
        }
    }

    let mut items: Vec<ChecklistItem> = groups
        .into_iter()
        .filter_map(|mut group| {
            group.ranges.sort_by_key(|r| r.start);
            let range_start = group.ranges.iter().map(|r| r.start).min().unwrap_or(0);
            let range_end = group.ranges.iter().map(|r| r.end).max().unwrap_or(0);

            let text: String = group
                .ranges
                .iter()
                .map(|r| text_chars[r.start..r.end].iter().collect::<String>())
                .collect::<Vec<_>>()
                .join("");
            let trimmed = text.trim().to_string();
            if trimmed.is_empty() {
                return None;
            }

            let line_number = text_chars[..range_start].iter().filter(|&&c| c == '\n').count();

            Some(ChecklistItem {
                id: hex::encode(&group.uuid),
                text: trimmed,
                is_completed: group.done,
                uuid: group.uuid,
                line_number,
                range: range_start..range_end,
            })
        })
        .collect();

    items.sort_by_key(|item| item.range.start);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{AttributeRun, Checklist, Document, Note, ParagraphStyle};

    fn checklist_run(length: u32, uuid: &[u8], done: bool) -> AttributeRun {
        AttributeRun {
            length: Some(length),
            paragraph_style: Some(ParagraphStyle {
                style_type: Some(103),
                indent_amount: None,
                checklist: Some(Checklist {
                    uuid: Some(uuid.to_vec()),
                    done: Some(if done { 1 } else { 0 }),
                }),
                block_quote: None,
            }),
            ..Default::default()
        }
    }

    fn doc_with_runs(text: &str, runs: Vec<AttributeRun>) -> Document {
        Document {
            version: Some(1),
            note: Some(Note {
                note_text: Some(text.to_string()),
                attribute_run: runs,
            }),
        }
    }

    #[test]
    fn two_independent_items_sorted_and_identified() {
        let doc = doc_with_runs(
            "Buy milk\nBuy eggs",
            vec![
                checklist_run(9, b"uuid-1", true),
                checklist_run(8, b"uuid-2", false),
            ],
        );
        let items = extract_checklists(&doc);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "Buy milk");
        assert!(items[0].is_completed);
        assert_eq!(items[1].text, "Buy eggs");
        assert!(!items[1].is_completed);
        assert_ne!(items[0].id, items[1].id);
    }

    #[test]
    fn merges_runs_sharing_a_uuid() {
        let doc = doc_with_runs(
            "Pay bill s",
            vec![
                checklist_run(3, b"U1", false),
                checklist_run(4, b"U1", false),
                checklist_run(2, b"U1", false),
            ],
        );
        let items = extract_checklists(&doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Pay bill s");
        assert_eq!(items[0].range, 0..9);
    }

    #[test]
    fn last_done_wins_on_inconsistent_group() {
        let mut a = checklist_run(4, b"U1", true);
        let b = checklist_run(4, b"U1", false);
        // simulate out-of-order done flags within one group
        if let Some(ps) = a.paragraph_style.as_mut() {
            ps.checklist.as_mut().unwrap().done = Some(1);
        }
        let doc = doc_with_runs("abcdabcd", vec![a, b]);
        let items = extract_checklists(&doc);
        assert_eq!(items.len(), 1);
        assert!(!items[0].is_completed);
    }

    #[test]
    fn discards_empty_trimmed_items() {
        let doc = doc_with_runs("   \n", vec![checklist_run(4, b"U1", false)]);
        assert!(extract_checklists(&doc).is_empty());
    }

    #[test]
    fn no_checklist_runs_yields_empty_list() {
        let doc = doc_with_runs("plain text", vec![]);
        assert!(extract_checklists(&doc).is_empty());
    }
}
