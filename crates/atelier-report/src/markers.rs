//! Legacy wording shim.
//!
//! Chapter progress and phase states are inferred from the exact text of
//! workflow log lines. The `step_progress` counters on the wire are
//! per-node (a prepare step 2/6 is not a chapter step 2/6), so the
//! marker table below is the only chapter-level signal available.
//!
//! WARNING: this table is coupled to the backend's message wording. If
//! the wording changes, matching silently stops and progress freezes at
//! the last matched step. Keep it in sync with the report workflow
//! service, and keep every pattern covered by a test.

/// Number of tracked sub-steps per chapter.
pub const CHAPTER_STEPS: u32 = 6;

/// Map a log line to a chapter sub-step (1..=6).
///
/// Patterns are checked in ascending step order and later matches
/// overwrite, so when a line matches several steps the highest wins.
pub fn detect_step(text: &str) -> Option<u32> {
    let mut matched = None;
    // 1: search queries generated
    if text.contains("已生成") && text.contains("个检索查询") {
        matched = Some(1);
    }
    // 2: parallel retrieval finished
    if text.contains("✅ 并行检索完成") {
        matched = Some(2);
    }
    // 3: results filtered
    if text.contains("✅ 已筛选出") && text.contains("条高质量结果") {
        matched = Some(3);
    }
    // 4: saved to temporary knowledge base
    if text.contains("✅ 已保存") && text.contains("条结果到临时库") {
        matched = Some(4);
    }
    // 5: sufficiency evaluation done (carries a total-duration suffix)
    if (text.contains("✅ 信息充足") || text.contains("⚠️ 信息不足")) && text.contains("总耗时") {
        matched = Some(5);
    }
    // 6: chapter content generated (carries a duration suffix)
    if text.contains("✅ 已生成") && text.contains("字符") && text.contains("耗时") {
        matched = Some(6);
    }
    matched
}

const CHINESE_NUMERALS: [&str; 10] = ["一", "二", "三", "四", "五", "六", "七", "八", "九", "十"];

/// Ordinal chapter label as it appears in log text: 1 -> `第一`,
/// 10 -> `第十`, 11 -> `第11`.
pub fn chapter_label(index: usize) -> String {
    if (1..=10).contains(&index) {
        format!("第{}", CHINESE_NUMERALS[index - 1])
    } else {
        format!("第{}", index)
    }
}

/// The boundary line that opens a chapter's log range.
pub fn chapter_start_marker(index: usize) -> String {
    format!("正在准备{}章节资料", chapter_label(index))
}

/// True for any chapter-boundary line, regardless of which chapter.
pub fn is_chapter_boundary(text: &str) -> bool {
    text.contains("正在准备") && text.contains("章节资料")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_step() {
        assert_eq!(detect_step("已生成 3 个检索查询"), Some(1));
        assert_eq!(detect_step("✅ 并行检索完成，共 12 条结果"), Some(2));
        assert_eq!(
            detect_step("✅ 已筛选出 6 条高质量结果（从 12 条中）"),
            Some(3)
        );
        assert_eq!(detect_step("✅ 已保存 6 条结果到临时库"), Some(4));
        assert_eq!(detect_step("✅ 信息充足 (总耗时 4.2秒)"), Some(5));
        assert_eq!(detect_step("⚠️ 信息不足，已补充检索 3 条 (总耗时 9.1秒)"), Some(5));
        assert_eq!(detect_step("✅ 已生成 1862 字符 (耗时 21.3秒)"), Some(6));
    }

    #[test]
    fn unrelated_text_matches_nothing() {
        assert_eq!(detect_step("✅ 大纲校验通过"), None);
        assert_eq!(detect_step("章节保存完成"), None);
        // Sufficiency without the duration suffix is a phase line, not a step.
        assert_eq!(detect_step("✅ 信息充足"), None);
    }

    #[test]
    fn highest_step_wins_on_multiple_matches() {
        // Matches both step 1 (已生成 + 个检索查询) and step 6 (已生成 + 字符 + 耗时).
        let text = "✅ 已生成 4 个检索查询与 900 字符 (耗时 3秒)";
        assert_eq!(detect_step(text), Some(6));
    }

    #[test]
    fn chapter_labels() {
        assert_eq!(chapter_label(1), "第一");
        assert_eq!(chapter_label(2), "第二");
        assert_eq!(chapter_label(10), "第十");
        assert_eq!(chapter_label(11), "第11");
    }

    #[test]
    fn boundary_markers() {
        assert!(is_chapter_boundary("📚 正在准备第一章节资料..."));
        assert!(is_chapter_boundary("📚 正在准备第二章节资料..."));
        assert!(!is_chapter_boundary("✍️ 正在撰写章节内容..."));
        assert_eq!(chapter_start_marker(2), "正在准备第二章节资料");
    }
}
