//! Folder-derived tags: turns the directory segments of a path into tag
//! strings under a formatting policy.

use crate::path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How many directory segments become tags, and how they are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FolderDepth {
    /// Immediate parent only.
    #[default]
    Last1,
    /// Parent and grandparent as two tags, parent first.
    Last2Split,
    /// `grandparent/parent` as one tag.
    Last2Joined,
    /// Every segment joined into one tag.
    FullPath,
    /// One tag per segment, root first.
    AllSplit,
}

impl FolderDepth {
    pub const ALL: [FolderDepth; 5] = [
        FolderDepth::Last1,
        FolderDepth::Last2Split,
        FolderDepth::Last2Joined,
        FolderDepth::FullPath,
        FolderDepth::AllSplit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FolderDepth::Last1 => "last1",
            FolderDepth::Last2Split => "last2Split",
            FolderDepth::Last2Joined => "last2Joined",
            FolderDepth::FullPath => "fullPath",
            FolderDepth::AllSplit => "allSplit",
        }
    }
}

impl fmt::Display for FolderDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDepth(pub String);

impl fmt::Display for UnknownDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown folder depth '{}' (expected one of: last1, last2Split, last2Joined, fullPath, allSplit)",
            self.0
        )
    }
}

impl std::error::Error for UnknownDepth {}

impl FromStr for FolderDepth {
    type Err = UnknownDepth;

    /// Case-insensitive; `-` and `_` are ignored, so `last-2-split` works too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "last1" => Ok(FolderDepth::Last1),
            "last2split" => Ok(FolderDepth::Last2Split),
            "last2joined" => Ok(FolderDepth::Last2Joined),
            "fullpath" => Ok(FolderDepth::FullPath),
            "allsplit" => Ok(FolderDepth::AllSplit),
            _ => Err(UnknownDepth(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingPolicy<'a> {
    pub depth: FolderDepth,
    pub prefix: &'a str,
    pub suffix: &'a str,
}

impl<'a> FormattingPolicy<'a> {
    pub const fn new(depth: FolderDepth) -> FormattingPolicy<'static> {
        FormattingPolicy {
            depth,
            prefix: "",
            suffix: "",
        }
    }

    pub const fn with_affixes(depth: FolderDepth, prefix: &'a str, suffix: &'a str) -> Self {
        Self {
            depth,
            prefix,
            suffix,
        }
    }

    fn wrap(&self, core: &str) -> String {
        format!("{}{}{}", self.prefix, core, self.suffix)
    }
}

/// Tags derived from the directory segments of a normalized document path.
/// Root-level documents yield no tags.
pub fn derive_tags(doc_path: &str, policy: &FormattingPolicy<'_>) -> Vec<String> {
    derive_from_segments(&path::directory_segments(doc_path), policy)
}

pub fn derive_from_segments(segments: &[&str], policy: &FormattingPolicy<'_>) -> Vec<String> {
    let Some(last) = segments.last() else {
        return Vec::new();
    };
    let second_to_last = segments.len().checked_sub(2).map(|i| segments[i]);

    match (policy.depth, second_to_last) {
        (FolderDepth::Last1, _)
        | (FolderDepth::Last2Split, None)
        | (FolderDepth::Last2Joined, None) => vec![policy.wrap(last)],
        (FolderDepth::Last2Split, Some(parent)) => vec![policy.wrap(last), policy.wrap(parent)],
        (FolderDepth::Last2Joined, Some(parent)) => {
            vec![policy.wrap(&format!("{parent}/{last}"))]
        }
        (FolderDepth::FullPath, _) => vec![policy.wrap(&segments.join("/"))],
        (FolderDepth::AllSplit, _) => segments.iter().map(|s| policy.wrap(s)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(path: &str, depth: FolderDepth) -> Vec<String> {
        derive_tags(path, &FormattingPolicy::new(depth))
    }

    #[test]
    fn root_documents_have_no_folder_tags() {
        for depth in FolderDepth::ALL {
            assert!(derive("note.md", depth).is_empty(), "{depth}");
            let policy = FormattingPolicy::with_affixes(depth, "p-", "-s");
            assert!(derive_tags("note.md", &policy).is_empty(), "{depth}");
        }
    }

    #[test]
    fn each_depth_on_a_deep_path() {
        let p = "main/sub/leaf/note.md";
        assert_eq!(derive(p, FolderDepth::Last1), vec!["leaf"]);
        assert_eq!(derive(p, FolderDepth::Last2Split), vec!["leaf", "sub"]);
        assert_eq!(derive(p, FolderDepth::Last2Joined), vec!["sub/leaf"]);
        assert_eq!(derive(p, FolderDepth::FullPath), vec!["main/sub/leaf"]);
        assert_eq!(derive(p, FolderDepth::AllSplit), vec!["main", "sub", "leaf"]);
    }

    #[test]
    fn single_segment_agrees_with_last1() {
        let expected = derive("only/note.md", FolderDepth::Last1);
        assert_eq!(expected, vec!["only"]);
        for depth in FolderDepth::ALL {
            assert_eq!(derive("only/note.md", depth), expected, "{depth}");
        }
    }

    #[test]
    fn affixes_wrap_every_tag() {
        let policy = FormattingPolicy::with_affixes(FolderDepth::Last2Split, "f/", "_x");
        assert_eq!(derive_tags("a/b/n.md", &policy), vec!["f/b_x", "f/a_x"]);

        let policy = FormattingPolicy::with_affixes(FolderDepth::Last2Joined, "#", "");
        assert_eq!(derive_tags("a/b/n.md", &policy), vec!["#a/b"]);
    }

    #[test]
    fn depth_parses_leniently() {
        assert_eq!("last2Split".parse::<FolderDepth>(), Ok(FolderDepth::Last2Split));
        assert_eq!("all-split".parse::<FolderDepth>(), Ok(FolderDepth::AllSplit));
        assert_eq!("FULL_PATH".parse::<FolderDepth>(), Ok(FolderDepth::FullPath));
        assert!("last3".parse::<FolderDepth>().is_err());
        for depth in FolderDepth::ALL {
            assert_eq!(depth.as_str().parse::<FolderDepth>(), Ok(depth));
        }
    }

    #[test]
    fn serde_names_match_display() {
        for depth in FolderDepth::ALL {
            let json = serde_json::to_string(&depth).unwrap();
            assert_eq!(json, format!("\"{}\"", depth.as_str()));
        }
    }
}
