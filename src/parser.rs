use crate::models::{Chapter, KeywordHits};
use regex::Regex;
use std::collections::HashMap;

/// Title of the synthetic chapter emitted when no heading pattern matches.
/// Kept identical to the legacy tool so old progress records still resolve.
pub const WHOLE_DOCUMENT_TITLE: &str = "全文";

/// Heading patterns tried in priority order. The first pattern with at
/// least one match anywhere in the document wins; later patterns are never
/// tried, even if they would match more headings.
fn heading_patterns() -> Vec<Regex> {
    vec![
        Regex::new(r"(?m)^第[一二三四五六七八九十百千万\d]+章[：:\s]?(.+)$").unwrap(),
        Regex::new(r"(?m)^第[一二三四五六七八九十百千万\d]+节[：:\s]?(.+)$").unwrap(),
        Regex::new(r"(?mi)^Chapter\s*\d+[：:\s]?(.+)$").unwrap(),
        Regex::new(r"(?m)^\d+\.\s?(.+)$").unwrap(),
        Regex::new(r"(?m)^【(.+)】$").unwrap(),
    ]
}

struct HeadingMatch {
    start: usize,
    heading: String,
    title: String,
}

struct MergedSpan {
    start: usize,
    end: usize,
    heading: String,
}

/// Split a document into chapters.
///
/// Degrades to a single whole-document chapter when nothing matches; never
/// fails. Matches sharing the same trimmed title are merged into one
/// chapter spanning from the first occurrence's start to the last
/// occurrence's end, absorbing anything in between. Emission order is the
/// first-appearance order of distinct titles.
pub fn segment(document: &str) -> Vec<Chapter> {
    let matches = collect_headings(document);

    if matches.is_empty() {
        return vec![Chapter {
            title: WHOLE_DOCUMENT_TITLE.to_string(),
            content: document.trim().to_string(),
            start_offset: 0,
            end_offset: document.len(),
        }];
    }

    let mut order: Vec<String> = Vec::new();
    let mut spans: HashMap<String, MergedSpan> = HashMap::new();

    for (index, heading) in matches.iter().enumerate() {
        let end = match matches.get(index + 1) {
            Some(next) => next.start,
            None => document.len(),
        };
        let title = heading.title.trim().to_string();

        match spans.get_mut(&title) {
            Some(existing) => {
                // Repeated title: extend the first occurrence's span to
                // cover this one, swallowing whatever lies between.
                existing.end = end;
            }
            None => {
                spans.insert(
                    title.clone(),
                    MergedSpan {
                        start: heading.start,
                        end,
                        heading: heading.heading.clone(),
                    },
                );
                order.push(title);
            }
        }
    }

    order
        .into_iter()
        .map(|title| {
            let span = &spans[&title];
            let raw = &document[span.start..span.end];
            let content = strip_heading_once(raw, &span.heading);
            Chapter {
                title,
                content: content.trim().to_string(),
                start_offset: span.start,
                end_offset: span.end,
            }
        })
        .collect()
}

fn collect_headings(document: &str) -> Vec<HeadingMatch> {
    for pattern in heading_patterns() {
        let matches: Vec<HeadingMatch> = pattern
            .captures_iter(document)
            .map(|caps| {
                let full = caps.get(0).unwrap();
                let title = caps
                    .get(1)
                    .map(|m| m.as_str())
                    .filter(|s| !s.is_empty())
                    .unwrap_or(full.as_str());
                HeadingMatch {
                    start: full.start(),
                    heading: full.as_str().to_string(),
                    title: title.to_string(),
                }
            })
            .collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

/// Remove the first occurrence of the exact heading line from a chapter
/// span. The heading text is escaped, so it is matched literally.
fn strip_heading_once(span: &str, heading: &str) -> String {
    let pattern = Regex::new(&format!("(?m)^{}", regex::escape(heading))).unwrap();
    pattern.replace(span, "").into_owned()
}

/// Chunk text into pages of at most `lines_per_page` lines each.
pub fn paginate(text: &str, lines_per_page: usize) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    lines
        .chunks(lines_per_page.max(1))
        .map(|chunk| chunk.join("\n"))
        .collect()
}

/// Find a chapter by fuzzy bidirectional title match: the chapter title
/// containing the query or the query containing the chapter title. The
/// first chapter that matches wins.
pub fn locate_chapter(chapters: &[Chapter], title: &str) -> Option<usize> {
    chapters
        .iter()
        .position(|c| c.title.contains(title) || title.contains(&c.title))
}

/// A bounded slice of the document starting at `offset`, clamped to char
/// boundaries. Empty when `offset` is past the end.
pub fn content_at(document: &str, offset: usize, max_len: usize) -> &str {
    if offset >= document.len() {
        return "";
    }
    let mut start = offset;
    while start < document.len() && !document.is_char_boundary(start) {
        start += 1;
    }
    let mut end = (offset + max_len).min(document.len());
    while end > start && !document.is_char_boundary(end) {
        end -= 1;
    }
    if start >= end {
        return "";
    }
    &document[start..end]
}

/// Every occurrence offset of each keyword. Occurrences may overlap;
/// keywords without hits are omitted.
pub fn search_keywords(document: &str, keywords: &[String]) -> Vec<KeywordHits> {
    let mut results = Vec::new();

    for keyword in keywords {
        if keyword.is_empty() {
            continue;
        }
        let mut positions = Vec::new();
        let mut from = 0;
        while let Some(found) = document[from..].find(keyword.as_str()) {
            let absolute = from + found;
            positions.push(absolute);
            let step = document[absolute..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
            from = absolute + step;
        }
        if !positions.is_empty() {
            results.push(KeywordHits {
                keyword: keyword.clone(),
                positions,
            });
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_headings_yields_whole_document() {
        let document = "just some prose\nwith no chapter marks at all";
        let chapters = segment(document);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, WHOLE_DOCUMENT_TITLE);
        assert_eq!(chapters[0].start_offset, 0);
        assert_eq!(chapters[0].end_offset, document.len());
    }

    #[test]
    fn test_empty_document() {
        let chapters = segment("");
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, WHOLE_DOCUMENT_TITLE);
        assert_eq!(chapters[0].end_offset, 0);
    }

    #[test]
    fn test_chinese_chapter_headings() {
        let document = "第一章 开始\n内容A\n第二章 继续\n内容B";
        let chapters = segment(document);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "开始");
        assert_eq!(chapters[0].content, "内容A");
        assert_eq!(chapters[1].title, "继续");
        assert_eq!(chapters[1].content, "内容B");
    }

    #[test]
    fn test_offsets_cover_document_in_order() {
        let document = "第一章 一\naaa\n第二章 二\nbbb\n第三章 三\nccc";
        let chapters = segment(document);
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].start_offset, 0);
        for window in chapters.windows(2) {
            assert_eq!(window[0].end_offset, window[1].start_offset);
        }
        assert_eq!(chapters.last().unwrap().end_offset, document.len());
    }

    #[test]
    fn test_first_pattern_wins_even_with_fewer_matches() {
        // One Chinese heading beats three numbered-list headings because
        // the Chinese pattern has higher priority.
        let document = "第一章 唯一\n1. one\n2. two\n3. three";
        let chapters = segment(document);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "唯一");
    }

    #[test]
    fn test_english_chapter_headings() {
        let document = "Chapter 1: Intro\nbody one\nchapter 2 Next\nbody two";
        let chapters = segment(document);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Intro");
        assert_eq!(chapters[1].title, "Next");
    }

    #[test]
    fn test_bracket_headings() {
        let document = "【序幕】\nopening\n【终章】\nclosing";
        let chapters = segment(document);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "序幕");
        assert_eq!(chapters[0].content, "opening");
        assert_eq!(chapters[1].title, "终章");
    }

    #[test]
    fn test_duplicate_titles_merge_across_intervening_chapter() {
        let document = "第一章 序\n甲\n第二章 插曲\n乙\n第三章 序\n丙";
        let chapters = segment(document);
        // Both "序" headings merge into one chapter whose span swallows
        // the intervening "插曲" section.
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "序");
        assert_eq!(chapters[0].start_offset, 0);
        assert_eq!(chapters[0].end_offset, document.len());
        assert!(chapters[0].content.contains("甲"));
        assert!(chapters[0].content.contains("插曲"));
        assert!(chapters[0].content.contains("丙"));
        // The intervening title is still emitted with its own span.
        assert_eq!(chapters[1].title, "插曲");
    }

    #[test]
    fn test_merged_chapter_strips_only_first_heading() {
        let document = "第一章 序\n甲\n第二章 序\n乙";
        let chapters = segment(document);
        assert_eq!(chapters.len(), 1);
        assert!(!chapters[0].content.starts_with("第一章"));
        assert!(chapters[0].content.contains("第二章 序"));
    }

    #[test]
    fn test_adjacent_duplicate_titles_merge() {
        let document = "1. same\nfirst\n2. same\nsecond";
        let chapters = segment(document);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "same");
        assert!(chapters[0].content.contains("first"));
        assert!(chapters[0].content.contains("second"));
    }

    #[test]
    fn test_titles_are_trimmed() {
        let document = "第一章  多余空格\n正文";
        let chapters = segment(document);
        assert_eq!(chapters[0].title, "多余空格");
    }

    #[test]
    fn test_paginate_chunks_lines() {
        let text = "a\nb\nc\nd\ne";
        let pages = paginate(text, 2);
        assert_eq!(pages, vec!["a\nb", "c\nd", "e"]);
    }

    #[test]
    fn test_paginate_empty_text_is_one_page() {
        assert_eq!(paginate("", 20), vec![String::new()]);
    }

    #[test]
    fn test_paginate_zero_lines_per_page() {
        assert_eq!(paginate("a\nb", 0), vec!["a", "b"]);
    }

    #[test]
    fn test_locate_chapter_bidirectional() {
        let chapters = segment("第一章 漫长的开始\n甲\n第二章 继续\n乙");
        // Query contained in title.
        assert_eq!(locate_chapter(&chapters, "开始"), Some(0));
        // Title contained in query.
        assert_eq!(locate_chapter(&chapters, "继续（下）"), Some(1));
        assert_eq!(locate_chapter(&chapters, "不存在"), None);
    }

    #[test]
    fn test_content_at_bounds() {
        let document = "hello world";
        assert_eq!(content_at(document, 0, 5), "hello");
        assert_eq!(content_at(document, 6, 100), "world");
        assert_eq!(content_at(document, 11, 5), "");
        assert_eq!(content_at(document, 999, 5), "");
    }

    #[test]
    fn test_content_at_respects_char_boundaries() {
        let document = "第一章";
        // Offsets inside a multi-byte char must not panic; the slice is
        // clamped to the surrounding boundaries.
        assert_eq!(content_at(document, 3, 3), "一");
        assert_eq!(content_at(document, 0, 4), "第");
        assert_eq!(content_at(document, 1, 2), "");
    }

    #[test]
    fn test_search_keywords_overlapping_and_missing() {
        let hits = search_keywords("aaa", &["aa".to_string(), "zz".to_string()]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].keyword, "aa");
        assert_eq!(hits[0].positions, vec![0, 1]);
    }

    #[test]
    fn test_search_keywords_multibyte() {
        let hits = search_keywords("序言，序章", &["序".to_string()]);
        assert_eq!(hits[0].positions, vec![0, 9]);
    }
}
