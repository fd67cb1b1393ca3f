use std::collections::HashSet;

/// 文件名主干（不含扩展名）的最大字符数
pub const MAX_STEM_LEN: usize = 100;

/// 默认扩展名
pub const DEFAULT_EXTENSION: &str = ".txt";

/// 标题和书名都清洗为空时使用的主干
pub const FALLBACK_STEM: &str = "chapter";

/// 追加序号后缀时至少保留的长度
const MIN_STEM_LEN: usize = 16;

/// 文件名候选
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate<'a> {
    /// 嗅探到的章节标题
    Title(&'a str),
    /// 章节序号
    Ordinal(usize),
}

/// 文件名策略
///
/// 清洗候选标题、限制长度、追加扩展名，并保证在已有名称集合中唯一
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePolicy {
    extension: String,
    max_len: usize,
}

impl FilenamePolicy {
    /// # 参数
    /// - `extension`: 固定扩展名（如 `.txt`，可以为空）
    /// - `max_len`: 主干最大字符数，限制在 16 到 100 之间
    pub fn new(extension: impl Into<String>, max_len: usize) -> Self {
        Self {
            extension: extension.into(),
            max_len: max_len.clamp(MIN_STEM_LEN, MAX_STEM_LEN),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// 生成唯一文件名
    ///
    /// 不修改 `existing`，调用方负责把返回值加入集合
    ///
    /// # 参数
    /// - `base_name`: 书名，用于序号命名和空标题回退
    /// - `candidate`: 标题或序号
    /// - `existing`: 已使用的名称
    pub fn make_filename(
        &self,
        base_name: &str,
        candidate: Candidate<'_>,
        existing: &HashSet<String>,
    ) -> String {
        let raw = match candidate {
            Candidate::Title(title) => title.to_string(),
            Candidate::Ordinal(n) => format!("{}_{:03}", base_name, n),
        };

        let mut stem = sanitize(&raw, self.max_len);
        if stem.is_empty() {
            stem = sanitize(base_name, self.max_len);
        }
        if stem.is_empty() {
            stem = FALLBACK_STEM.to_string();
        }

        let name = format!("{}{}", stem, self.extension);
        if !existing.contains(&name) {
            return name;
        }

        // 重名：在扩展名前追加 _1, _2, ...
        let mut counter = 1usize;
        loop {
            let suffix = format!("_{}", counter);
            let keep = self.max_len.saturating_sub(suffix.chars().count());
            let base: String = stem.chars().take(keep).collect();
            let name = format!("{}{}{}", base, suffix, self.extension);
            if !existing.contains(&name) {
                return name;
            }
            counter += 1;
        }
    }
}

impl Default for FilenamePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION, MAX_STEM_LEN)
    }
}

/// 使用默认策略（`.txt`，100 字符）生成文件名
pub fn make_filename(base_name: &str, candidate: Candidate<'_>, existing: &HashSet<String>) -> String {
    FilenamePolicy::default().make_filename(base_name, candidate, existing)
}

/// 允许的字符：字母数字、空格、连字符、下划线
pub fn is_allowed_char(c: char) -> bool {
    c.is_alphanumeric() || c == ' ' || c == '-' || c == '_'
}

/// 清洗文件名主干
///
/// 不允许的字符替换为 `_`，截断到 `max_len` 个字符，并去掉首尾空格
pub fn sanitize(candidate: &str, max_len: usize) -> String {
    let replaced: String = candidate
        .trim()
        .chars()
        .map(|c| if is_allowed_char(c) { c } else { '_' })
        .take(max_len)
        .collect();
    replaced.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stem_of<'a>(name: &'a str, extension: &str) -> &'a str {
        name.strip_suffix(extension).unwrap_or(name)
    }

    #[test]
    fn test_duplicate_titles() {
        let mut existing = HashSet::new();

        let first = make_filename("book", Candidate::Title("Notes"), &existing);
        existing.insert(first.clone());
        let second = make_filename("book", Candidate::Title("Notes"), &existing);
        existing.insert(second.clone());
        let third = make_filename("book", Candidate::Title("Notes"), &existing);

        assert_eq!(first, "Notes.txt");
        assert_eq!(second, "Notes_1.txt");
        assert_eq!(third, "Notes_2.txt");
    }

    #[test]
    fn test_sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize("Chapter 1: The Start?", 100), "Chapter 1_ The Start_");
        assert_eq!(sanitize("a/b\\c.d", 100), "a_b_c_d");
        assert_eq!(sanitize("第一章 开始", 100), "第一章 开始");
        assert_eq!(sanitize("  padded  ", 100), "padded");
    }

    #[test]
    fn test_long_titles_are_truncated() {
        let title = "x".repeat(250);
        let name = make_filename("book", Candidate::Title(&title), &HashSet::new());
        assert_eq!(stem_of(&name, ".txt").chars().count(), MAX_STEM_LEN);
    }

    #[test]
    fn test_suffix_respects_length_bound() {
        let title = "y".repeat(150);
        let mut existing = HashSet::new();
        for _ in 0..12 {
            let name = make_filename("book", Candidate::Title(&title), &existing);
            assert!(stem_of(&name, ".txt").chars().count() <= MAX_STEM_LEN);
            assert!(existing.insert(name));
        }
    }

    #[test]
    fn test_ordinal_candidate() {
        let name = make_filename("My Book", Candidate::Ordinal(7), &HashSet::new());
        assert_eq!(name, "My Book_007.txt");
    }

    #[test]
    fn test_empty_title_falls_back_to_book_name() {
        let name = make_filename("My Book", Candidate::Title("   "), &HashSet::new());
        assert_eq!(name, "My Book.txt");

        let name = make_filename("", Candidate::Title(""), &HashSet::new());
        assert_eq!(name, "chapter.txt");
    }

    #[test]
    fn test_names_are_unique_and_clean_for_any_sequence() {
        let titles = [
            "Notes", "Notes", "Notes?", "Notes!", "", "  ", "Intro/Outro", "Intro_Outro",
            "第一章", "第一章", "a.b", "a_b", "Notes_1",
        ];
        let mut existing = HashSet::new();
        for title in titles {
            let name = make_filename("book", Candidate::Title(title), &existing);
            let stem = stem_of(&name, ".txt");
            assert!(!stem.is_empty());
            assert!(stem.chars().count() <= MAX_STEM_LEN);
            assert!(stem.chars().all(is_allowed_char), "unexpected char in {name}");
            assert!(existing.insert(name), "duplicate name produced");
        }
        assert_eq!(existing.len(), titles.len());
    }

    #[test]
    fn test_custom_extension_and_minimum_length() {
        let policy = FilenamePolicy::new(".md", 2);
        assert_eq!(policy.max_len(), 16);
        assert_eq!(policy.extension(), ".md");

        let name = policy.make_filename("book", Candidate::Title("Notes"), &HashSet::new());
        assert_eq!(name, "Notes.md");
    }

    #[test]
    fn test_max_len_cannot_exceed_bound() {
        let policy = FilenamePolicy::new(".txt", 500);
        assert_eq!(policy.max_len(), MAX_STEM_LEN);

        let title = "t".repeat(300);
        let name = policy.make_filename("book", Candidate::Title(&title), &HashSet::new());
        assert_eq!(name.chars().count(), MAX_STEM_LEN + ".txt".len());
    }

    #[test]
    fn test_does_not_mutate_existing() {
        let existing: HashSet<String> = ["Notes.txt".to_string()].into_iter().collect();
        let _ = make_filename("book", Candidate::Title("Notes"), &existing);
        assert_eq!(existing.len(), 1);
    }
}
