//! Splits a reference document into passages along its markdown headings.

use crate::reference::{City, Passage};

const SECTION_MARKER: &str = "\n## ";
const SUBSECTION_MARKER: &str = "\n### ";

/// Cuts `text` on `## ` sections, then on `### ` subsections.
///
/// One passage per block with content. A block holding nothing but its own
/// heading line (the lead-in of a section that only has subsections) is
/// skipped. Passage ids are `{city}_{section}_{subsection}`, so the same text
/// always yields the same ids.
pub fn chunk_document(text: &str, city: City) -> Vec<Passage> {
    let normalized = text.replace("\r\n", "\n");
    let mut passages = Vec::new();

    for (section_index, section) in normalized.split(SECTION_MARKER).enumerate() {
        if section.trim().is_empty() {
            continue;
        }
        let title = section_title(section);

        for (sub_index, block) in section.split(SUBSECTION_MARKER).enumerate() {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            let follows_marker = section_index > 0 || sub_index > 0 || block.starts_with('#');
            if follows_marker && non_empty_lines(block) == 1 {
                continue;
            }

            passages.push(Passage {
                id: format!("{}_{}_{}", city.id(), section_index, sub_index),
                city,
                section: title.clone(),
                content: block.to_string(),
                relevance: 0.0,
            });
        }
    }

    passages
}

fn section_title(section: &str) -> String {
    section
        .trim_start()
        .lines()
        .next()
        .unwrap_or_default()
        .replace('#', "")
        .trim()
        .to_string()
}

fn non_empty_lines(block: &str) -> usize {
    block.lines().filter(|l| !l.trim().is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::fixtures::MADURAI_REFERENCE;

    #[test]
    fn test_chunks_carry_section_titles() {
        let passages = chunk_document(MADURAI_REFERENCE, City::Madurai);
        let food: Vec<_> = passages.iter().filter(|p| p.section == "Food").collect();
        assert_eq!(food.len(), 2);
        assert!(food[0].content.starts_with("Jigarthanda"));
        assert!(food[1].content.starts_with("Breakfast"));
    }

    #[test]
    fn test_preamble_becomes_its_own_passage() {
        let passages = chunk_document(MADURAI_REFERENCE, City::Madurai);
        assert_eq!(passages[0].id, "madurai_0_0");
        assert_eq!(passages[0].section, "Madurai Local Context");
        assert!(passages[0].content.contains("temple city"));
    }

    #[test]
    fn test_heading_only_blocks_are_skipped() {
        let passages = chunk_document(MADURAI_REFERENCE, City::Madurai);
        assert!(passages.iter().all(|p| p.content != "Food"));
        assert!(passages.iter().all(|p| p.content.lines().count() > 1));
    }

    #[test]
    fn test_ids_are_stable_and_unique() {
        let first = chunk_document(MADURAI_REFERENCE, City::Madurai);
        let second = chunk_document(MADURAI_REFERENCE, City::Madurai);
        assert_eq!(first, second);

        let mut ids: Vec<_> = first.iter().map(|p| p.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), first.len());
        assert!(ids.contains(&"madurai_1_1".to_string()));
    }

    #[test]
    fn test_section_without_subsections_is_one_passage() {
        let text = "# Town\n\n## Safety\nStay on lit roads after 10pm.\nCall 100 in emergencies.";
        let passages = chunk_document(text, City::Dindigul);
        let safety: Vec<_> = passages.iter().filter(|p| p.section == "Safety").collect();
        assert_eq!(safety.len(), 1);
        assert!(safety[0].content.contains("Call 100"));
    }

    #[test]
    fn test_plain_text_without_headings_is_kept() {
        let passages = chunk_document("Dindigul has a rock fort.", City::Dindigul);
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].section, "Dindigul has a rock fort.");
    }

    #[test]
    fn test_crlf_line_endings_are_normalized() {
        let text = "# Town\r\n\r\n## Food\r\n### Biryani\r\nServed hot.\r\n";
        let passages = chunk_document(text, City::Dindigul);
        assert!(passages.iter().any(|p| p.section == "Food" && p.content.contains("Served hot")));
    }
}
