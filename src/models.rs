use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A titled, contiguous span of the source document.
///
/// `content` excludes the heading line that introduced the chapter.
/// Offsets are byte offsets into the original document text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// The unit persisted after every chapter change and reconciled on sync.
/// The later `timestamp` wins; ties keep the existing copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    pub file_name: String,
    pub chapter_title: String,
    pub chapter_index: usize,
    pub timestamp: DateTime<Utc>,
}

/// A file visible on the remote share.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_dir: bool,
}

/// Mutually exclusive UI states of a reading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Reading,
    Help,
    ChapterList,
    Privacy,
}

/// A named user intent, decoupled from the physical keys bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Exit,
    PreviousChapter,
    NextChapter,
    Help,
    ResetPosition,
    ChapterList,
    PrivacyToggle,
    ScrollToEnd,
}

impl Action {
    /// Resolution order for tokens bound to more than one action.
    pub const PRIORITY: [Action; 8] = [
        Action::Exit,
        Action::PreviousChapter,
        Action::NextChapter,
        Action::Help,
        Action::ResetPosition,
        Action::ChapterList,
        Action::PrivacyToggle,
        Action::ScrollToEnd,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Action::Exit => "exit",
            Action::PreviousChapter => "prev chapter",
            Action::NextChapter => "next chapter",
            Action::Help => "help",
            Action::ResetPosition => "top",
            Action::ChapterList => "chapters",
            Action::PrivacyToggle => "privacy",
            Action::ScrollToEnd => "bottom",
        }
    }
}

/// A normalized keyboard token, comparable against configured bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyToken {
    /// A printable character. Matching against bindings ignores case.
    Char(char),
    /// A named key such as `up`, `home` or `enter`. Matching is exact.
    Named(&'static str),
    /// A control chord such as `ctrl+c`.
    Ctrl(char),
}

/// Offsets of every occurrence of one search keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHits {
    pub keyword: String,
    pub positions: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order_starts_with_exit() {
        assert_eq!(Action::PRIORITY[0], Action::Exit);
        assert_eq!(Action::PRIORITY[7], Action::ScrollToEnd);
    }

    #[test]
    fn test_reading_position_round_trip() {
        let position = ReadingPosition {
            file_name: "novel.txt".to_string(),
            chapter_title: "序".to_string(),
            chapter_index: 3,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&position).unwrap();
        assert!(json.contains("\"fileName\""));
        assert!(json.contains("\"chapterIndex\""));

        let back: ReadingPosition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, position);
    }

    #[test]
    fn test_chapter_equality() {
        let chapter = Chapter {
            title: "开始".to_string(),
            content: "内容A".to_string(),
            start_offset: 0,
            end_offset: 12,
        };
        assert_eq!(chapter.clone(), chapter);
    }
}
